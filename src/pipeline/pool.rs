//! Worker-affine pool of rendering handles.
//!
//! Creating a rendering handle is expensive (engine start-up, font loading),
//! and a handle must never be driven by two callers at once. The pool keeps
//! one *slot* per worker: a semaphore bounds how many tasks hold a slot, and
//! a free list hands each task a slot nobody else holds. A slot builds its
//! handle on first use and keeps it for the life of the pool, so a batch of
//! N records on W workers constructs at most W handles.
//!
//! Slots are returned by dropping the [`PooledRenderer`] guard, including
//! when the task holding it is cancelled or panics.

use crate::error::{BatchError, RenderError};
use crate::pipeline::render::{DocumentRenderer, RenderEngine, RenderOptions};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

struct Slot {
    id: usize,
    renderer: Option<Box<dyn DocumentRenderer>>,
}

/// Fixed-size set of lazily created, exclusively checked-out renderers.
pub struct RenderingPool {
    engine: Arc<dyn RenderEngine>,
    options: RenderOptions,
    permits: Arc<Semaphore>,
    free: Arc<Mutex<Vec<Slot>>>,
    created: Arc<AtomicUsize>,
    size: usize,
}

impl RenderingPool {
    /// Create a pool with `size` worker slots (at least one). No handle is
    /// built until a slot is first used.
    pub fn new(engine: Arc<dyn RenderEngine>, options: RenderOptions, size: usize) -> Self {
        let size = size.max(1);
        // Reversed so that slot 0 is handed out first.
        let free = (0..size)
            .rev()
            .map(|id| Slot { id, renderer: None })
            .collect();
        Self {
            engine,
            options,
            permits: Arc::new(Semaphore::new(size)),
            free: Arc::new(Mutex::new(free)),
            created: Arc::new(AtomicUsize::new(0)),
            size,
        }
    }

    /// Number of worker slots.
    pub fn size(&self) -> usize {
        self.size
    }

    /// How many handles have been constructed so far.
    pub fn handles_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Wait for a free slot and take exclusive ownership of it.
    pub async fn checkout(&self) -> Result<PooledRenderer, BatchError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| BatchError::Internal(format!("rendering pool closed: {e}")))?;

        let slot = lock(&self.free).pop().ok_or_else(|| {
            BatchError::Internal("rendering pool permit granted with no free slot".into())
        })?;

        Ok(PooledRenderer {
            slot: Some(slot),
            free: Arc::clone(&self.free),
            engine: Arc::clone(&self.engine),
            options: self.options.clone(),
            created: Arc::clone(&self.created),
            _permit: permit,
        })
    }
}

fn lock(free: &Mutex<Vec<Slot>>) -> std::sync::MutexGuard<'_, Vec<Slot>> {
    free.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Exclusive loan of one worker slot. Returned to the pool on drop.
pub struct PooledRenderer {
    slot: Option<Slot>,
    free: Arc<Mutex<Vec<Slot>>>,
    engine: Arc<dyn RenderEngine>,
    options: RenderOptions,
    created: Arc<AtomicUsize>,
    // Released after `Drop::drop` has pushed the slot back.
    _permit: OwnedSemaphorePermit,
}

impl PooledRenderer {
    /// Identity of the worker slot this guard holds.
    pub fn worker_id(&self) -> usize {
        self.slot.as_ref().map(|s| s.id).unwrap_or_default()
    }

    /// Render `markup` with this slot's handle, building it on first use.
    ///
    /// Blocking: call from a blocking-capable thread.
    pub fn render(&mut self, markup: &str) -> Result<Vec<u8>, RenderError> {
        let slot = self
            .slot
            .as_mut()
            .ok_or_else(|| RenderError::Engine("renderer already returned to pool".into()))?;

        if slot.renderer.is_none() {
            let renderer = self.engine.create_renderer(&self.options)?;
            let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
            info!(
                "Worker {}: created {} renderer ({} total)",
                slot.id,
                self.engine.name(),
                n
            );
            slot.renderer = Some(renderer);
        }

        match slot.renderer.as_mut() {
            Some(renderer) => renderer.render(markup),
            None => Err(RenderError::Engine("renderer missing after creation".into())),
        }
    }
}

impl Drop for PooledRenderer {
    fn drop(&mut self) {
        if let Some(mut slot) = self.slot.take() {
            if std::thread::panicking() && slot.renderer.is_some() {
                warn!("Worker {}: discarding renderer after panic", slot.id);
                slot.renderer = None;
            }
            debug!("Worker {}: slot returned", slot.id);
            lock(&self.free).push(slot);
        }
    }
}
