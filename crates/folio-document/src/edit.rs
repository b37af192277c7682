// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page editing — rotation and text overlays (watermark, signature, free
// text) applied in place to a loaded document.
//
// Overlays are drawn with the standard Helvetica font. The page's existing
// content is wrapped in `q ... Q` so the overlay always starts from the
// default graphics state.

use folio_core::error::{FolioError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, ObjectId, Stream, StringFormat, dictionary};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::pdf::PdfReader;
use crate::pdf::reader::resolve;
use crate::selection::PageSelection;

const FONT_RESOURCE: &str = "FolioHelv";
const STATE_RESOURCE: &str = "FolioGS";

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

/// Add `degrees` to the rotation of every page in `pages` (all pages when
/// `None`). The stored value is `(effective + degrees) mod 360`, where the
/// effective rotation includes any value inherited from the page tree.
///
/// Returns how many pages were rotated.
#[instrument(skip(reader, pages))]
pub fn rotate_pages(
    reader: &mut PdfReader,
    degrees: i32,
    pages: Option<&PageSelection>,
) -> Result<u32> {
    if degrees % 90 != 0 {
        return Err(FolioError::InvalidRotation(degrees));
    }

    let targets: Vec<(ObjectId, i64)> = reader
        .document()
        .get_pages()
        .into_iter()
        .filter(|(number, _)| pages.is_none_or(|selection| selection.contains(*number)))
        .map(|(_, page_id)| (page_id, reader.rotation(page_id)))
        .collect();

    for &(page_id, existing) in &targets {
        let rotation = (existing + i64::from(degrees)).rem_euclid(360);
        page_dictionary_mut(reader, page_id)?.set("Rotate", rotation);
    }

    info!(rotated = targets.len(), degrees, "pages rotated");
    Ok(targets.len() as u32)
}

// ---------------------------------------------------------------------------
// Text overlays
// ---------------------------------------------------------------------------

/// Where on the page the text baseline starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// Absolute position in points from the lower-left corner.
    At { x: f32, y: f32 },
    /// `(width / 2 - 50, height / 2)` of each page.
    Centre,
}

/// Which pages receive the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageTarget {
    All,
    /// A single 0-based page index.
    Index(usize),
}

/// Text drawn on top of existing page content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    pub text: String,
    pub size: f32,
    /// RGB components in `0.0..=1.0`.
    pub color: [f32; 3],
    /// Fill opacity in `0.0..=1.0`.
    pub opacity: f32,
    /// Counter-clockwise rotation of the text in degrees.
    pub rotation_deg: f32,
    pub anchor: Anchor,
    pub target: PageTarget,
}

impl TextOverlay {
    /// Diagonal translucent gray text centred on every page.
    pub fn watermark(text: Option<&str>) -> Self {
        Self {
            text: text.unwrap_or("CONFIDENTIAL").to_string(),
            size: 48.0,
            color: [0.5, 0.5, 0.5],
            opacity: 0.3,
            rotation_deg: 45.0,
            anchor: Anchor::Centre,
            target: PageTarget::All,
        }
    }

    /// Red signature line near the bottom-left of the first page.
    pub fn signature(text: Option<&str>) -> Self {
        Self {
            text: text.unwrap_or("Signed").to_string(),
            size: 16.0,
            color: [1.0, 0.0, 0.0],
            opacity: 1.0,
            rotation_deg: 0.0,
            anchor: Anchor::At { x: 50.0, y: 50.0 },
            target: PageTarget::Index(0),
        }
    }

    /// Plain black text on the first page.
    pub fn note(text: &str) -> Self {
        Self {
            text: text.to_string(),
            size: 12.0,
            color: [0.0, 0.0, 0.0],
            opacity: 1.0,
            rotation_deg: 0.0,
            anchor: Anchor::At { x: 50.0, y: 500.0 },
            target: PageTarget::Index(0),
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.anchor = Anchor::At { x, y };
        self
    }

    pub fn on_page(mut self, index: usize) -> Self {
        self.target = PageTarget::Index(index);
        self
    }
}

/// Draw `overlay` on its target pages. A page index outside the document
/// leaves the document untouched.
///
/// Returns how many pages were drawn on.
#[instrument(skip_all, fields(page_target = ?overlay.target))]
pub fn overlay_text(reader: &mut PdfReader, overlay: &TextOverlay) -> Result<u32> {
    let page_ids = reader.page_ids();
    let targets: Vec<ObjectId> = match overlay.target {
        PageTarget::All => page_ids,
        PageTarget::Index(index) => page_ids.get(index).copied().into_iter().collect(),
    };
    if targets.is_empty() {
        debug!(pages = reader.page_count(), "no page matches overlay target");
        return Ok(0);
    }

    let opacity = overlay.opacity.clamp(0.0, 1.0);
    let document = reader.document_mut();
    let font_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let state_id = (opacity < 1.0).then(|| {
        document.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => opacity,
            "CA" => opacity,
        })
    });

    for &page_id in &targets {
        let [llx, lly, _, _] = reader.media_box(page_id);
        let (width, height) = reader.page_size(page_id);
        let (x, y) = match overlay.anchor {
            Anchor::At { x, y } => (x, y),
            Anchor::Centre => (llx + width / 2.0 - 50.0, lly + height / 2.0),
        };

        let resources = overlay_resources(reader, page_id, font_id, state_id);
        let existing = existing_contents(reader, page_id);
        let drawing = overlay_stream(overlay, x, y, state_id.is_some())?;

        let document = reader.document_mut();
        let open_id = document.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let overlay_id = document.add_object(Stream::new(Dictionary::new(), drawing));

        let mut contents = Vec::with_capacity(existing.len() + 2);
        contents.push(Object::Reference(open_id));
        contents.extend(existing);
        contents.push(Object::Reference(overlay_id));

        let page = page_dictionary_mut(reader, page_id)?;
        page.set("Contents", contents);
        page.set("Resources", resources);
    }

    info!(pages = targets.len(), "text overlay applied");
    Ok(targets.len() as u32)
}

/// Content stream that closes the wrapper `q` and draws the text.
fn overlay_stream(overlay: &TextOverlay, x: f32, y: f32, translucent: bool) -> Result<Vec<u8>> {
    let (sin, cos) = overlay.rotation_deg.to_radians().sin_cos();
    let [r, g, b] = overlay.color;

    let mut operations = vec![Operation::new("Q", vec![]), Operation::new("q", vec![])];
    if translucent {
        operations.push(Operation::new("gs", vec![Object::Name(STATE_RESOURCE.into())]));
    }
    operations.extend([
        Operation::new("rg", vec![r.into(), g.into(), b.into()]),
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(FONT_RESOURCE.into()), overlay.size.into()],
        ),
        Operation::new(
            "Tm",
            vec![
                cos.into(),
                sin.into(),
                (-sin).into(),
                cos.into(),
                x.into(),
                y.into(),
            ],
        ),
        Operation::new(
            "Tj",
            vec![Object::String(win_ansi(&overlay.text), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ]);

    let encoded = Content { operations }
        .encode()
        .map_err(|err| FolioError::PdfError(format!("failed to encode overlay: {}", err)))?;

    // Streams are concatenated when a page is read; keep the first token
    // separate from whatever precedes it.
    let mut stream = Vec::with_capacity(encoded.len() + 1);
    stream.push(b'\n');
    stream.extend(encoded);
    Ok(stream)
}

/// The page's effective resources with the overlay font (and graphics state)
/// added, as an inline dictionary.
fn overlay_resources(
    reader: &PdfReader,
    page_id: ObjectId,
    font_id: ObjectId,
    state_id: Option<ObjectId>,
) -> Dictionary {
    let document = reader.document();
    let mut resources = reader
        .inherited_attribute(page_id, b"Resources")
        .map(|obj| resolve(document, obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);

    let mut add = |category: &[u8], name: &str, id: ObjectId| {
        let mut entries = resources
            .get(category)
            .ok()
            .map(|obj| resolve(document, obj))
            .and_then(|obj| obj.as_dict().ok())
            .cloned()
            .unwrap_or_else(Dictionary::new);
        entries.set(name, id);
        resources.set(category.to_vec(), entries);
    };

    add(b"Font", FONT_RESOURCE, font_id);
    if let Some(state_id) = state_id {
        add(b"ExtGState", STATE_RESOURCE, state_id);
    }
    resources
}

/// Current /Contents of a page flattened to a list of stream references.
fn existing_contents(reader: &PdfReader, page_id: ObjectId) -> Vec<Object> {
    let document = reader.document();
    let Ok(page) = document.get_dictionary(page_id) else {
        return Vec::new();
    };
    match page.get(b"Contents") {
        Ok(Object::Array(items)) => items.clone(),
        Ok(reference @ Object::Reference(_)) => match resolve(document, reference) {
            Object::Array(items) => items.clone(),
            _ => vec![reference.clone()],
        },
        _ => Vec::new(),
    }
}

fn page_dictionary_mut(reader: &mut PdfReader, page_id: ObjectId) -> Result<&mut Dictionary> {
    reader
        .document_mut()
        .get_dictionary_mut(page_id)
        .map_err(|err| FolioError::PdfError(format!("cannot edit page {:?}: {}", page_id, err)))
}

/// Encode for the WinAnsi font encoding; characters outside Latin-1 become
/// `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
