//! Pipeline stages for record-to-PDF conversion.
//!
//! Each submodule implements exactly one step, so each is independently
//! testable and the rendering backend can be swapped without touching the
//! others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ parse ──▶ validate ──▶ template ──▶ pool/render ──▶ write
//! (path/URL) (CSV)   (non-blank)   (escape+fill)  (per worker)  (atomic)
//! ```
//!
//! 1. [`input`]:    read the record file from disk or download it
//! 2. [`parse`]:    quote-aware splitting into [`crate::record::Record`]s
//! 3. [`validate`]: drop records with blank fields
//! 4. [`template`]: escaped placeholder substitution and file naming
//! 5. [`pool`] / [`render`]: worker-affine rendering handles; rendering
//!    runs in `spawn_blocking` because engines are synchronous
//! 6. [`write`]:    collision policy and atomic file write

pub mod input;
pub mod parse;
pub mod pool;
pub mod render;
pub mod template;
pub mod validate;
pub mod write;
