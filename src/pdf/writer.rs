//! Deterministic PDF serializer.
//!
//! The writer always emits a classic body with a full cross-reference table,
//! dictionary keys in sorted order, and identical streams interned into a
//! single indirect object. Determinism is load-bearing: re-stamping an
//! unchanged ledger must reproduce the previous artifact byte for byte.

use std::collections::HashMap;

use bytes::Bytes;

use super::content::fmt_number;
use super::document::PdfFile;
use super::encoding::escape_literal;
use super::object::{Object, ObjectRef};
use crate::error::Result;

const HEADER: &[u8] = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n";

const CATALOG_ID: u32 = 1;
const PAGES_ID: u32 = 2;

/// Serialize the document to PDF bytes.
pub fn save(doc: &PdfFile) -> Result<Vec<u8>> {
    let mut body = Body::new();

    let mut kids = Vec::with_capacity(doc.pages.len());
    for page in &doc.pages {
        let resources = body.hoist_streams(&page.resources);
        let contents = body.push(Object::Stream {
            dict: HashMap::new(),
            data: Bytes::from(page.content.clone()),
        });
        let page_obj = Object::dict(vec![
            ("Type", Object::name("Page")),
            ("Parent", Object::Reference(ObjectRef::new(PAGES_ID, 0))),
            ("MediaBox", Object::rect(page.media_box)),
            ("Resources", resources),
            ("Contents", Object::Reference(contents)),
        ]);
        kids.push(Object::Reference(body.push(page_obj)));
    }

    let page_count = kids.len();
    let pages_obj = Object::dict(vec![
        ("Type", Object::name("Pages")),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(page_count as i64)),
    ]);
    let catalog_obj = Object::dict(vec![
        ("Type", Object::name("Catalog")),
        ("Pages", Object::Reference(ObjectRef::new(PAGES_ID, 0))),
    ]);

    Ok(body.emit(catalog_obj, pages_obj))
}

/// Indirect-object accumulator. Ids 1 and 2 are reserved for the catalog
/// and page tree root; everything else is numbered in push order.
struct Body {
    objects: Vec<Object>,
    interned: HashMap<Vec<u8>, ObjectRef>,
}

impl Body {
    fn new() -> Self {
        Self { objects: Vec::new(), interned: HashMap::new() }
    }

    fn push(&mut self, obj: Object) -> ObjectRef {
        self.objects.push(obj);
        ObjectRef::new(PAGES_ID + self.objects.len() as u32, 0)
    }

    /// Replace every stream nested in `obj` with a reference to an interned
    /// indirect object. Shared streams (the letterhead form on every page)
    /// collapse to one object.
    fn hoist_streams(&mut self, obj: &Object) -> Object {
        match obj {
            Object::Stream { dict, data } => {
                let hoisted_dict: HashMap<String, Object> = sorted_entries(dict)
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), self.hoist_streams(v)))
                    .collect();
                let mut key = Vec::new();
                serialize(&Object::Stream { dict: hoisted_dict.clone(), data: data.clone() }, &mut key);
                if let Some(existing) = self.interned.get(&key) {
                    return Object::Reference(*existing);
                }
                let r = self.push(Object::Stream { dict: hoisted_dict, data: data.clone() });
                self.interned.insert(key, r);
                Object::Reference(r)
            }
            Object::Dictionary(dict) => Object::Dictionary(
                sorted_entries(dict)
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), self.hoist_streams(v)))
                    .collect(),
            ),
            Object::Array(items) => {
                Object::Array(items.iter().map(|v| self.hoist_streams(v)).collect())
            }
            other => other.clone(),
        }
    }

    fn emit(self, catalog: Object, pages: Object) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(HEADER);

        let total = self.objects.len() + 2;
        let mut offsets = vec![0usize; total];

        let mut write_obj = |out: &mut Vec<u8>, offsets: &mut Vec<usize>, id: u32, obj: &Object| {
            offsets[id as usize - 1] = out.len();
            out.extend_from_slice(format!("{} 0 obj\n", id).as_bytes());
            serialize(obj, out);
            out.extend_from_slice(b"\nendobj\n");
        };

        write_obj(&mut out, &mut offsets, CATALOG_ID, &catalog);
        write_obj(&mut out, &mut offsets, PAGES_ID, &pages);
        for (i, obj) in self.objects.iter().enumerate() {
            write_obj(&mut out, &mut offsets, PAGES_ID + 1 + i as u32, obj);
        }

        let xref_offset = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", total + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for offset in &offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Root {} 0 R /Size {} >>\nstartxref\n{}\n%%EOF\n",
                CATALOG_ID,
                total + 1,
                xref_offset
            )
            .as_bytes(),
        );
        out
    }
}

fn sorted_entries(dict: &HashMap<String, Object>) -> Vec<(&str, &Object)> {
    let mut entries: Vec<(&str, &Object)> = dict.iter().map(|(k, v)| (k.as_str(), v)).collect();
    entries.sort_by_key(|(k, _)| *k);
    entries
}

fn serialize(obj: &Object, out: &mut Vec<u8>) {
    match obj {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Object::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
        Object::Real(r) => out.extend_from_slice(fmt_number(*r as f32).as_bytes()),
        Object::String(s) => {
            out.push(b'(');
            out.extend_from_slice(&escape_literal(s));
            out.push(b')');
        }
        Object::Name(n) => {
            out.push(b'/');
            for &b in n.as_bytes() {
                if is_regular(b) {
                    out.push(b);
                } else {
                    out.extend_from_slice(format!("#{:02X}", b).as_bytes());
                }
            }
        }
        Object::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                serialize(item, out);
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => serialize_dict(dict, None, out),
        Object::Stream { dict, data } => {
            serialize_dict(dict, Some(data.len()), out);
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(data);
            out.extend_from_slice(b"\nendstream");
        }
        Object::Reference(r) => out.extend_from_slice(r.to_string().as_bytes()),
    }
}

fn serialize_dict(dict: &HashMap<String, Object>, stream_len: Option<usize>, out: &mut Vec<u8>) {
    out.extend_from_slice(b"<< ");
    let mut entries = sorted_entries(dict);
    entries.retain(|(k, _)| stream_len.is_none() || *k != "Length");
    if let Some(len) = stream_len {
        // Length always reflects the actual payload.
        out.extend_from_slice(format!("/Length {} ", len).as_bytes());
    }
    for (key, value) in entries {
        serialize(&Object::Name(key.to_string()), out);
        out.push(b' ');
        serialize(value, out);
        out.push(b' ');
    }
    out.extend_from_slice(b">>");
}

fn is_regular(b: u8) -> bool {
    !matches!(
        b,
        0x00 | b'\t' | b'\n' | b'\x0C' | b'\r' | b' '
            | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' | b'#'
    ) && b > 0x20
        && b < 0x7F
}
