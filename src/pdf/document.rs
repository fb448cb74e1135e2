//! In-memory page model.
//!
//! A [`PdfFile`] is the loaded/buildable form every composition and stamping
//! operation works on: a flat list of pages, each with its media box, decoded
//! content operators, and a direct-object resource dictionary. The model is
//! deliberately page-oriented; document-level structure is reconstructed on
//! save.

use std::collections::HashMap;

use super::content::literal_strings;
use super::encoding::decode_winansi;
use super::object::Object;
use super::{parser, writer};
use crate::error::{Error, Result};

/// One page: geometry, decoded content operators, and direct resources.
#[derive(Debug, Clone)]
pub struct Page {
    /// Media box `[x0, y0, x1, y1]` in default user-space units.
    pub media_box: [f32; 4],
    /// Decoded content stream operators.
    pub content: Vec<u8>,
    /// Resource dictionary with references resolved to direct objects.
    pub resources: Object,
}

impl Page {
    /// Create an empty page of the given size.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            media_box: [0.0, 0.0, width, height],
            content: Vec::new(),
            resources: Object::Dictionary(HashMap::new()),
        }
    }

    /// Page width in user-space units.
    pub fn width(&self) -> f32 {
        self.media_box[2] - self.media_box[0]
    }

    /// Page height in user-space units.
    pub fn height(&self) -> f32 {
        self.media_box[3] - self.media_box[1]
    }

    /// Append content operators, separated from existing ones by a newline.
    pub fn append_content(&mut self, ops: &[u8]) {
        if !self.content.is_empty() && !self.content.ends_with(b"\n") {
            self.content.push(b'\n');
        }
        self.content.extend_from_slice(ops);
    }

    fn resources_subdict(&mut self, key: &str) -> &mut HashMap<String, Object> {
        if !matches!(self.resources, Object::Dictionary(_)) {
            self.resources = Object::Dictionary(HashMap::new());
        }
        let dict = match &mut self.resources {
            Object::Dictionary(d) => d,
            _ => unreachable!("resources normalized above"),
        };
        let entry = dict
            .entry(key.to_string())
            .or_insert_with(|| Object::Dictionary(HashMap::new()));
        if !matches!(entry, Object::Dictionary(_)) {
            *entry = Object::Dictionary(HashMap::new());
        }
        match entry {
            Object::Dictionary(d) => d,
            _ => unreachable!("entry normalized above"),
        }
    }

    /// Register one of the standard 14 fonts under `resource_name`.
    pub fn add_base_font(&mut self, resource_name: &str, base_font: &str) {
        let font = Object::dict(vec![
            ("Type", Object::name("Font")),
            ("Subtype", Object::name("Type1")),
            ("BaseFont", Object::name(base_font)),
            ("Encoding", Object::name("WinAnsiEncoding")),
        ]);
        self.resources_subdict("Font").insert(resource_name.to_string(), font);
    }

    /// Register a form or image XObject under `resource_name`.
    pub fn add_xobject(&mut self, resource_name: &str, xobject: Object) {
        self.resources_subdict("XObject").insert(resource_name.to_string(), xobject);
    }

    /// Re-package this page as a `/Subtype /Form` XObject so it can be
    /// replayed onto other pages with a single `Do`.
    pub fn as_form_xobject(&self) -> Object {
        Object::Stream {
            dict: [
                ("Type".to_string(), Object::name("XObject")),
                ("Subtype".to_string(), Object::name("Form")),
                ("FormType".to_string(), Object::Integer(1)),
                ("BBox".to_string(), Object::rect(self.media_box)),
                ("Resources".to_string(), self.resources.clone()),
            ]
            .into_iter()
            .collect(),
            data: bytes::Bytes::from(self.content.clone()),
        }
    }

    /// Extract the page's literal-string text, WinAnsi-decoded, one string
    /// per line. Form XObjects in the resources are included. Only meant for
    /// stamp-marker detection and tests.
    pub fn extract_text(&self) -> String {
        let mut strings = literal_strings(&self.content);
        if let Object::Dictionary(res) = &self.resources {
            if let Some(Object::Dictionary(xobjects)) = res.get("XObject") {
                let mut names: Vec<&String> = xobjects.keys().collect();
                names.sort();
                for name in names {
                    if let Some(Object::Stream { dict, data }) = xobjects.get(name) {
                        if dict.get("Subtype").and_then(Object::as_name) == Some("Form") {
                            strings.extend(literal_strings(data));
                        }
                    }
                }
            }
        }
        strings
            .iter()
            .map(|s| decode_winansi(s))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A loaded or under-construction PDF document.
#[derive(Debug, Clone, Default)]
pub struct PdfFile {
    /// Document pages in order.
    pub pages: Vec<Page>,
}

impl PdfFile {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a PDF byte stream.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        parser::load(bytes)
    }

    /// Serialize to PDF bytes. Output is deterministic: the same logical
    /// document always serializes to the same bytes.
    pub fn save(&self) -> Result<Vec<u8>> {
        writer::save(self)
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Append a page.
    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// Remove the page at `index`.
    pub fn remove_page(&mut self, index: usize) -> Result<()> {
        if index >= self.pages.len() {
            return Err(Error::InvalidPdf(format!(
                "page index {} out of range ({} pages)",
                index,
                self.pages.len()
            )));
        }
        self.pages.remove(index);
        Ok(())
    }
}

/// Build an image XObject from PNG bytes. Samples are stored as 8-bit
/// DeviceRGB under FlateDecode.
pub fn image_xobject_from_png(png: &[u8]) -> Result<Object> {
    use std::io::Write;

    let decoded = image::load_from_memory_with_format(png, image::ImageFormat::Png)
        .map_err(|e| Error::Image(format!("PNG decode: {}", e)))?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder
        .write_all(rgb.as_raw())
        .and_then(|_| encoder.finish())
        .map(|compressed| Object::Stream {
            dict: [
                ("Type".to_string(), Object::name("XObject")),
                ("Subtype".to_string(), Object::name("Image")),
                ("Width".to_string(), Object::Integer(width as i64)),
                ("Height".to_string(), Object::Integer(height as i64)),
                ("ColorSpace".to_string(), Object::name("DeviceRGB")),
                ("BitsPerComponent".to_string(), Object::Integer(8)),
                ("Filter".to_string(), Object::name("FlateDecode")),
            ]
            .into_iter()
            .collect(),
            data: bytes::Bytes::from(compressed),
        })
        .map_err(Error::Io)
}
