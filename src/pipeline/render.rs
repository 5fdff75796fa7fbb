//! The markup → PDF rendering seam.
//!
//! The real layout engine is an external collaborator. This module defines
//! the two traits the pipeline talks to and ships one small built-in engine:
//!
//! - [`RenderEngine`] is shared by all workers and only *creates* handles.
//! - [`DocumentRenderer`] is one warmed-up engine instance. Handles are
//!   assumed unsafe for concurrent use, so they are `Send` but not `Sync`
//!   and the pool hands each one to a single task at a time.
//!
//! ## The built-in engine
//!
//! [`TextPdfEngine`] does no layout at all: it drops `<script>`/`<style>`
//! blocks, strips tags, decodes the five entities the template filler emits
//! and writes the remaining text lines onto Helvetica pages with `lopdf`.
//! It exists so the CLI produces real, inspectable artifacts without a
//! browser engine installed.

use crate::error::RenderError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, StringFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// CSS media profile the engine should apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MediaProfile {
    /// `@media print` rules (default).
    #[default]
    Print,
    /// `@media screen` rules.
    Screen,
}

/// Page size of the produced document.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    /// Width and height in PDF points.
    Custom { width: f32, height: f32 },
}

impl PageSize {
    /// Dimensions in PDF points (1/72 inch).
    pub fn dimensions_pt(&self) -> (f32, f32) {
        match *self {
            PageSize::A4 => (595.0, 842.0),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Custom { width, height } => (width, height),
        }
    }
}

/// Settings every rendering handle is created with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub media: MediaProfile,
    /// Whether template script may execute. Templates embed untrusted
    /// record data, so this is off unless explicitly enabled.
    pub scripting_enabled: bool,
    pub page_size: PageSize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            media: MediaProfile::Print,
            scripting_enabled: false,
            page_size: PageSize::default(),
        }
    }
}

/// Factory for rendering handles. Shared across all workers.
pub trait RenderEngine: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Construct and warm up one handle. Called at most once per pool slot.
    fn create_renderer(
        &self,
        options: &RenderOptions,
    ) -> Result<Box<dyn DocumentRenderer>, RenderError>;
}

/// One engine instance, owned by exactly one worker at a time.
pub trait DocumentRenderer: Send {
    /// Convert filled markup into a binary document.
    fn render(&mut self, markup: &str) -> Result<Vec<u8>, RenderError>;
}

// ── Built-in engine ──────────────────────────────────────────────────────

/// Minimal text-only PDF engine backed by `lopdf`.
#[derive(Debug, Clone, Default)]
pub struct TextPdfEngine;

impl RenderEngine for TextPdfEngine {
    fn name(&self) -> &str {
        "text-pdf"
    }

    fn create_renderer(
        &self,
        options: &RenderOptions,
    ) -> Result<Box<dyn DocumentRenderer>, RenderError> {
        if options.scripting_enabled {
            return Err(RenderError::Unsupported(
                "the text-pdf engine cannot execute scripts".into(),
            ));
        }
        debug!("Creating text-pdf renderer ({:?})", options);
        Ok(Box::new(TextPdfRenderer {
            page_size: options.page_size,
            documents_rendered: 0,
        }))
    }
}

const FONT_SIZE: f32 = 11.0;
const LINE_HEIGHT: f32 = 15.0;
const MARGIN: f32 = 48.0;

struct TextPdfRenderer {
    page_size: PageSize,
    documents_rendered: u64,
}

impl DocumentRenderer for TextPdfRenderer {
    fn render(&mut self, markup: &str) -> Result<Vec<u8>, RenderError> {
        let lines = markup_to_lines(markup);
        let bytes = write_pdf(&lines, self.page_size)?;
        self.documents_rendered += 1;
        debug!(
            "text-pdf: document #{} → {} lines, {} bytes",
            self.documents_rendered,
            lines.len(),
            bytes.len()
        );
        Ok(bytes)
    }
}

static RE_SCRIPT_OR_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").unwrap());

static RE_BLOCK_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*(br|/p|/div|/h[1-6]|/li|/tr|/table|/section|/header|/footer)\b[^>]*>")
        .unwrap()
});

static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());

/// Reduce markup to the visible text lines, in document order.
fn markup_to_lines(markup: &str) -> Vec<String> {
    let s = RE_SCRIPT_OR_STYLE.replace_all(markup, "");
    let s = RE_BLOCK_BREAK.replace_all(&s, "\n");
    let s = RE_TAG.replace_all(&s, "");
    s.lines()
        .map(|l| decode_entities(RE_SPACES.replace_all(l, " ").trim()))
        .filter(|l| !l.is_empty())
        .collect()
}

/// Inverse of [`crate::pipeline::template::escape_markup`]; `&amp;` last.
fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Helvetica with the standard encoding only covers Latin-1.
fn to_win_ansi(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| if (c as u32) <= 255 { c as u8 } else { b'?' })
        .collect()
}

fn write_pdf(lines: &[String], page_size: PageSize) -> Result<Vec<u8>, RenderError> {
    let (width, height) = page_size.dimensions_pt();
    let lines_per_page = (((height - 2.0 * MARGIN) / LINE_HEIGHT).floor() as usize).max(1);

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut page_ids: Vec<ObjectId> = Vec::new();
    let empty: [String; 0] = [];
    let chunks: Vec<&[String]> = if lines.is_empty() {
        vec![&empty[..]]
    } else {
        lines.chunks(lines_per_page).collect()
    };

    for chunk in chunks {
        let mut ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
            Operation::new("TL", vec![LINE_HEIGHT.into()]),
            Operation::new("Td", vec![MARGIN.into(), (height - MARGIN).into()]),
        ];
        for line in chunk {
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(to_win_ansi(line), StringFormat::Literal)],
            ));
            ops.push(Operation::new("T*", vec![]));
        }
        ops.push(Operation::new("ET", vec![]));

        let content = Content { operations: ops };
        let encoded = content
            .encode()
            .map_err(|e| RenderError::Engine(format!("content encoding failed: {e}")))?;
        let content_id = doc.add_object(lopdf::Stream::new(lopdf::Dictionary::new(), encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        page_ids.push(page_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| Object::from(*id)).collect();
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| RenderError::Engine(format!("PDF serialisation failed: {e}")))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_print_without_scripts() {
        let o = RenderOptions::default();
        assert_eq!(o.media, MediaProfile::Print);
        assert!(!o.scripting_enabled);
    }

    #[test]
    fn engine_refuses_scripting() {
        let opts = RenderOptions {
            scripting_enabled: true,
            ..Default::default()
        };
        let err = TextPdfEngine.create_renderer(&opts).err().expect("must refuse");
        assert!(matches!(err, RenderError::Unsupported(_)));
    }

    #[test]
    fn markup_is_reduced_to_text_lines() {
        let html = "<html><head><style>p { color: red }</style>\
                    <script>alert('x')</script></head>\
                    <body><h1>Boarding Pass</h1><p>O&#39;Brien &lt;VIP&gt;</p>\
                    <div>Seat&nbsp;1A</div></body></html>";
        let lines = markup_to_lines(html);
        assert_eq!(lines, vec!["Boarding Pass", "O'Brien <VIP>", "Seat 1A"]);
    }

    #[test]
    fn decode_keeps_double_escaped_text_literal() {
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn renders_a_pdf() {
        let mut r = TextPdfEngine
            .create_renderer(&RenderOptions::default())
            .unwrap();
        let bytes = r.render("<p>Hello</p><p>World</p>").unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn long_documents_span_pages() {
        let mut r = TextPdfEngine
            .create_renderer(&RenderOptions::default())
            .unwrap();
        let html: String = (0..200).map(|i| format!("<p>line {i}</p>")).collect();
        let bytes = r.render(&html).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() > 1);
    }

    #[test]
    fn empty_markup_still_yields_one_page() {
        let mut r = TextPdfEngine
            .create_renderer(&RenderOptions::default())
            .unwrap();
        let bytes = r.render("").unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }
}
