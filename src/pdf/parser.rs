//! PDF loader.
//!
//! Object offsets are always reconstructed by scanning the body for
//! `N G obj` headers instead of trusting the cross-reference table; the
//! engine round-trips its own output and letterhead assets, so a tolerant
//! scan is both simpler and more robust than xref bookkeeping. Streams may
//! be unfiltered or `/FlateDecode`.

use std::collections::HashMap;
use std::io::Read;

use lazy_static::lazy_static;
use regex::bytes::Regex;

use super::document::{Page, PdfFile};
use super::object::{Object, ObjectRef};
use crate::error::{Error, Result};

lazy_static! {
    static ref RE_OBJ_HEADER: Regex = Regex::new(r"(\d+)\s+(\d+)\s+obj").unwrap();
}

const MAX_RESOLVE_DEPTH: u32 = 32;

/// Parse a PDF byte stream into an in-memory page model.
pub fn load(bytes: &[u8]) -> Result<PdfFile> {
    if !bytes.starts_with(b"%PDF-") {
        let found: String = bytes.iter().take(8).map(|&b| b as char).collect();
        return Err(Error::InvalidHeader(found));
    }

    let objects = scan_objects(bytes);
    if objects.is_empty() {
        return Err(Error::InvalidPdf("no objects found".to_string()));
    }
    log::debug!("loaded {} objects from {} bytes", objects.len(), bytes.len());

    let catalog_id = find_catalog(&objects)?;
    let pages_ref = objects
        .get(&catalog_id)
        .and_then(|o| o.as_dict())
        .and_then(|d| d.get("Pages"))
        .ok_or_else(|| Error::InvalidPdf("catalog has no /Pages".to_string()))?
        .clone();

    let mut pages = Vec::new();
    collect_pages(&objects, &pages_ref, None, None, &mut pages, 0)?;
    if pages.is_empty() {
        return Err(Error::InvalidPdf("document has no pages".to_string()));
    }

    Ok(PdfFile { pages })
}

/// Scan the body for `N G obj` headers and parse each object found.
/// A later occurrence of the same object number wins, matching the
/// incremental-update convention.
fn scan_objects(bytes: &[u8]) -> HashMap<u32, Object> {
    let mut objects: HashMap<u32, Object> = HashMap::new();

    for capture in RE_OBJ_HEADER.captures_iter(bytes) {
        let full_match = capture.get(0).unwrap();
        // A digit right before the match means we landed mid-number
        // (e.g. inside stream data); skip it.
        if full_match.start() > 0 && bytes[full_match.start() - 1].is_ascii_digit() {
            continue;
        }

        let id: u32 = match std::str::from_utf8(capture.get(1).unwrap().as_bytes())
            .ok()
            .and_then(|s| s.parse().ok())
        {
            Some(n) => n,
            None => {
                log::warn!("unparseable object number at offset {}", full_match.start());
                continue;
            }
        };

        let mut cursor = Cursor::new(bytes, full_match.end());
        match cursor.parse_indirect_body() {
            Ok(obj) => {
                objects.insert(id, obj);
            }
            Err(err) => {
                log::debug!("skipping candidate object {} at {}: {}", id, full_match.start(), err);
            }
        }
    }

    objects
}

/// Find the document catalog. The highest-numbered catalog wins when several
/// are present (stale objects from incremental updates).
fn find_catalog(objects: &HashMap<u32, Object>) -> Result<u32> {
    objects
        .iter()
        .filter(|(_, obj)| {
            obj.as_dict()
                .and_then(|d| d.get("Type"))
                .and_then(Object::as_name)
                == Some("Catalog")
        })
        .map(|(id, _)| *id)
        .max()
        .ok_or_else(|| Error::InvalidPdf("no catalog object".to_string()))
}

/// Walk the page tree, inheriting `MediaBox` and `Resources` from interior
/// nodes, and materialize each leaf as a [`Page`].
fn collect_pages(
    objects: &HashMap<u32, Object>,
    node: &Object,
    inherited_media_box: Option<[f32; 4]>,
    inherited_resources: Option<&Object>,
    out: &mut Vec<Page>,
    depth: u32,
) -> Result<()> {
    if depth > MAX_RESOLVE_DEPTH {
        return Err(Error::InvalidPdf("page tree too deep".to_string()));
    }

    let node = resolve(objects, node, 0)?;
    let dict = node
        .as_dict()
        .ok_or_else(|| Error::InvalidPdf("page tree node is not a dictionary".to_string()))?;

    let media_box = dict
        .get("MediaBox")
        .and_then(|mb| parse_media_box(objects, mb))
        .or(inherited_media_box);
    let resources = match dict.get("Resources") {
        Some(r) => Some(deep_resolve(objects, r, 0)?),
        None => inherited_resources.cloned(),
    };

    match dict.get("Type").and_then(Object::as_name) {
        Some("Pages") => {
            let kids = dict
                .get("Kids")
                .map(|k| resolve(objects, k, 0))
                .transpose()?
                .and_then(|k| k.as_array().cloned())
                .ok_or_else(|| Error::InvalidPdf("pages node has no /Kids".to_string()))?;
            for kid in &kids {
                collect_pages(objects, kid, media_box, resources.as_ref(), out, depth + 1)?;
            }
            Ok(())
        }
        Some("Page") => {
            let content = page_content(objects, dict)?;
            out.push(Page {
                media_box: media_box.unwrap_or([0.0, 0.0, 612.0, 792.0]),
                content,
                resources: resources
                    .unwrap_or_else(|| Object::Dictionary(HashMap::new())),
            });
            Ok(())
        }
        other => Err(Error::InvalidPdf(format!(
            "unexpected page tree node type: {:?}",
            other
        ))),
    }
}

fn parse_media_box(objects: &HashMap<u32, Object>, obj: &Object) -> Option<[f32; 4]> {
    let resolved = resolve(objects, obj, 0).ok()?;
    let arr = resolved.as_array()?;
    if arr.len() != 4 {
        return None;
    }
    let mut rect = [0.0f32; 4];
    for (i, v) in arr.iter().enumerate() {
        rect[i] = resolve(objects, v, 0).ok()?.as_number()? as f32;
    }
    Some(rect)
}

/// Gather and decode a page's content streams into one operator buffer.
fn page_content(objects: &HashMap<u32, Object>, dict: &HashMap<String, Object>) -> Result<Vec<u8>> {
    let contents = match dict.get("Contents") {
        Some(c) => resolve(objects, c, 0)?,
        None => return Ok(Vec::new()),
    };

    let mut out = Vec::new();
    match &contents {
        Object::Stream { dict, data } => {
            out.extend_from_slice(&decode_stream(dict, data)?);
        }
        Object::Array(parts) => {
            for part in parts {
                let part = resolve(objects, part, 0)?;
                if let Object::Stream { dict, data } = &part {
                    if !out.is_empty() {
                        out.push(b'\n');
                    }
                    out.extend_from_slice(&decode_stream(dict, data)?);
                } else {
                    return Err(Error::InvalidPdf("content array entry is not a stream".to_string()));
                }
            }
        }
        other => {
            return Err(Error::InvalidPdf(format!(
                "contents must be a stream or array, found {}",
                other.type_name()
            )))
        }
    }
    Ok(out)
}

/// Decode a stream's data according to its `/Filter` chain.
pub(crate) fn decode_stream(dict: &HashMap<String, Object>, data: &[u8]) -> Result<Vec<u8>> {
    match dict.get("Filter") {
        None => Ok(data.to_vec()),
        Some(Object::Name(name)) if name == "FlateDecode" => inflate(data),
        Some(Object::Array(filters)) if filters.is_empty() => Ok(data.to_vec()),
        Some(Object::Array(filters)) if filters.len() == 1 => match &filters[0] {
            Object::Name(name) if name == "FlateDecode" => inflate(data),
            other => Err(Error::UnsupportedFilter(other.type_name().to_string())),
        },
        Some(Object::Name(name)) => Err(Error::UnsupportedFilter(name.clone())),
        Some(other) => Err(Error::UnsupportedFilter(other.type_name().to_string())),
    }
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Decode(format!("flate: {}", e)))?;
    Ok(out)
}

/// Follow reference chains to a concrete object.
fn resolve(objects: &HashMap<u32, Object>, obj: &Object, depth: u32) -> Result<Object> {
    if depth > MAX_RESOLVE_DEPTH {
        return Err(Error::InvalidPdf("reference chain too deep".to_string()));
    }
    match obj {
        Object::Reference(ObjectRef { id, .. }) => match objects.get(id) {
            Some(target) => resolve(objects, target, depth + 1),
            None => Ok(Object::Null),
        },
        other => Ok(other.clone()),
    }
}

/// Recursively replace references with the objects they point to, so the
/// result can be carried into a new document (form XObject resources).
fn deep_resolve(objects: &HashMap<u32, Object>, obj: &Object, depth: u32) -> Result<Object> {
    if depth > MAX_RESOLVE_DEPTH {
        return Err(Error::InvalidPdf("resource graph too deep".to_string()));
    }
    match obj {
        Object::Reference(ObjectRef { id, .. }) => match objects.get(id) {
            Some(target) => deep_resolve(objects, target, depth + 1),
            None => Ok(Object::Null),
        },
        Object::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(deep_resolve(objects, item, depth + 1)?);
            }
            Ok(Object::Array(out))
        }
        Object::Dictionary(dict) => {
            let mut out = HashMap::with_capacity(dict.len());
            for (k, v) in dict {
                // A resource dict never legitimately points back at the page
                // tree; dropping Parent avoids resolving the whole document
                // into every page's resources.
                if k == "Parent" {
                    continue;
                }
                out.insert(k.clone(), deep_resolve(objects, v, depth + 1)?);
            }
            Ok(Object::Dictionary(out))
        }
        Object::Stream { dict, data } => {
            let mut out = HashMap::with_capacity(dict.len());
            for (k, v) in dict {
                out.insert(k.clone(), deep_resolve(objects, v, depth + 1)?);
            }
            Ok(Object::Stream {
                dict: out,
                data: data.clone(),
            })
        }
        other => Ok(other.clone()),
    }
}

/// Byte cursor with a recursive-descent object parser.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn err(&self, reason: impl Into<String>) -> Error {
        Error::ParseError {
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn starts_with(&self, prefix: &[u8]) -> bool {
        self.data[self.pos..].starts_with(prefix)
    }

    fn skip_ws(&mut self) {
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\r' | b'\n' | b'\x0C' | b'\0' => self.pos += 1,
                b'%' => {
                    while let Some(c) = self.peek() {
                        self.pos += 1;
                        if c == b'\n' || c == b'\r' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    /// Parse the body of an indirect object (after `N G obj`), including an
    /// attached stream if one follows the dictionary.
    fn parse_indirect_body(&mut self) -> Result<Object> {
        let obj = self.parse_object()?;
        if let Object::Dictionary(dict) = obj {
            self.skip_ws();
            if self.starts_with(b"stream") {
                self.pos += b"stream".len();
                if self.starts_with(b"\r\n") {
                    self.pos += 2;
                } else if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
                let data = self.read_stream_data(&dict)?;
                return Ok(Object::Stream {
                    dict,
                    data: bytes::Bytes::from(data),
                });
            }
            return Ok(Object::Dictionary(dict));
        }
        Ok(obj)
    }

    /// Read stream data using `/Length` when it is a direct integer,
    /// otherwise by searching for the `endstream` keyword.
    fn read_stream_data(&mut self, dict: &HashMap<String, Object>) -> Result<Vec<u8>> {
        if let Some(len) = dict.get("Length").and_then(Object::as_integer) {
            let len = len as usize;
            let end = self.pos + len;
            if end <= self.data.len() {
                let tail = &self.data[end..];
                let trimmed = tail
                    .iter()
                    .position(|&b| !b.is_ascii_whitespace())
                    .unwrap_or(tail.len());
                if tail[trimmed..].starts_with(b"endstream") {
                    let data = self.data[self.pos..end].to_vec();
                    self.pos = end;
                    return Ok(data);
                }
            }
            // /Length disagrees with the body; fall through to the search.
        }

        let remaining = &self.data[self.pos..];
        let end = find_subslice(remaining, b"endstream")
            .ok_or_else(|| self.err("unterminated stream"))?;
        let mut data = &remaining[..end];
        // Strip the EOL that separates data from the keyword.
        if data.ends_with(b"\r\n") {
            data = &data[..data.len() - 2];
        } else if data.ends_with(b"\n") || data.ends_with(b"\r") {
            data = &data[..data.len() - 1];
        }
        let out = data.to_vec();
        self.pos += end;
        Ok(out)
    }

    fn parse_object(&mut self) -> Result<Object> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.err("unexpected end of data")),
            Some(b'<') => {
                if self.starts_with(b"<<") {
                    self.parse_dictionary()
                } else {
                    self.parse_hex_string()
                }
            }
            Some(b'[') => self.parse_array(),
            Some(b'/') => self.parse_name(),
            Some(b'(') => self.parse_literal_string(),
            Some(b't') => self.parse_keyword(b"true", Object::Boolean(true)),
            Some(b'f') => self.parse_keyword(b"false", Object::Boolean(false)),
            Some(b'n') => self.parse_keyword(b"null", Object::Null),
            Some(b) if b.is_ascii_digit() || b == b'+' || b == b'-' || b == b'.' => {
                self.parse_number_or_reference()
            }
            Some(b) => Err(self.err(format!("unexpected byte 0x{:02X}", b))),
        }
    }

    fn parse_keyword(&mut self, keyword: &[u8], value: Object) -> Result<Object> {
        if self.starts_with(keyword) {
            self.pos += keyword.len();
            Ok(value)
        } else {
            Err(self.err("unknown keyword"))
        }
    }

    fn parse_dictionary(&mut self) -> Result<Object> {
        self.pos += 2; // <<
        let mut dict = HashMap::new();
        loop {
            self.skip_ws();
            if self.starts_with(b">>") {
                self.pos += 2;
                return Ok(Object::Dictionary(dict));
            }
            if self.peek() != Some(b'/') {
                return Err(self.err("dictionary key must be a name"));
            }
            let key = match self.parse_name()? {
                Object::Name(n) => n,
                _ => unreachable!("parse_name returns Name"),
            };
            let value = self.parse_object()?;
            dict.insert(key, value);
        }
    }

    fn parse_array(&mut self) -> Result<Object> {
        self.pos += 1; // [
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(b']') {
                self.pos += 1;
                return Ok(Object::Array(items));
            }
            if self.peek().is_none() {
                return Err(self.err("unterminated array"));
            }
            items.push(self.parse_object()?);
        }
    }

    fn parse_name(&mut self) -> Result<Object> {
        self.pos += 1; // /
        let mut name = String::new();
        while let Some(b) = self.peek() {
            if is_delimiter_or_ws(b) {
                break;
            }
            self.pos += 1;
            if b == b'#' {
                let hi = self.peek().and_then(hex_value);
                if let Some(hi) = hi {
                    self.pos += 1;
                    let lo = self.peek().and_then(hex_value);
                    if let Some(lo) = lo {
                        self.pos += 1;
                        name.push((hi * 16 + lo) as char);
                        continue;
                    }
                }
                name.push('#');
            } else {
                name.push(b as char);
            }
        }
        Ok(Object::Name(name))
    }

    fn parse_literal_string(&mut self) -> Result<Object> {
        self.pos += 1; // (
        let mut out = Vec::new();
        let mut depth = 1usize;
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'\\' => {
                    let esc = self.peek().ok_or_else(|| self.err("dangling escape"))?;
                    self.pos += 1;
                    match esc {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0C),
                        b'(' => out.push(b'('),
                        b')' => out.push(b')'),
                        b'\\' => out.push(b'\\'),
                        b'\n' => {} // line continuation
                        b'\r' => {
                            if self.peek() == Some(b'\n') {
                                self.pos += 1;
                            }
                        }
                        b'0'..=b'7' => {
                            let mut value = (esc - b'0') as u32;
                            for _ in 0..2 {
                                match self.peek() {
                                    Some(d @ b'0'..=b'7') => {
                                        value = value * 8 + (d - b'0') as u32;
                                        self.pos += 1;
                                    }
                                    _ => break,
                                }
                            }
                            out.push((value & 0xFF) as u8);
                        }
                        other => out.push(other),
                    }
                }
                b'(' => {
                    depth += 1;
                    out.push(b'(');
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(Object::String(out));
                    }
                    out.push(b')');
                }
                other => out.push(other),
            }
        }
        Err(self.err("unterminated literal string"))
    }

    fn parse_hex_string(&mut self) -> Result<Object> {
        self.pos += 1; // <
        let mut digits = Vec::new();
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'>' => {
                    if digits.len() % 2 == 1 {
                        digits.push(0);
                    }
                    let out = digits
                        .chunks(2)
                        .map(|pair| pair[0] * 16 + pair[1])
                        .collect();
                    return Ok(Object::String(out));
                }
                b if b.is_ascii_whitespace() => {}
                b => {
                    let v = hex_value(b).ok_or_else(|| self.err("invalid hex digit"))?;
                    digits.push(v);
                }
            }
        }
        Err(self.err("unterminated hex string"))
    }

    fn parse_number_or_reference(&mut self) -> Result<Object> {
        let first = self.parse_number()?;
        if let Object::Integer(id) = first {
            // Lookahead: `<int> <int> R` is an indirect reference.
            let save = self.pos;
            self.skip_ws();
            if self.peek().map(|b| b.is_ascii_digit()).unwrap_or(false) {
                if let Ok(Object::Integer(gen)) = self.parse_number() {
                    self.skip_ws();
                    if self.peek() == Some(b'R')
                        && self
                            .data
                            .get(self.pos + 1)
                            .map(|&b| is_delimiter_or_ws(b))
                            .unwrap_or(true)
                        && id >= 0
                        && gen >= 0
                    {
                        self.pos += 1;
                        return Ok(Object::Reference(ObjectRef::new(id as u32, gen as u16)));
                    }
                }
            }
            self.pos = save;
        }
        Ok(first)
    }

    fn parse_number(&mut self) -> Result<Object> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            self.pos += 1;
        }
        let mut is_real = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' => self.pos += 1,
                b'.' if !is_real => {
                    is_real = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        let text = std::str::from_utf8(&self.data[start..self.pos])
            .map_err(|_| self.err("invalid number"))?;
        if text.is_empty() || text == "+" || text == "-" || text == "." {
            return Err(self.err("invalid number"));
        }
        if is_real {
            text.parse::<f64>()
                .map(Object::Real)
                .map_err(|_| self.err("invalid real"))
        } else {
            text.parse::<i64>()
                .map(Object::Integer)
                .map_err(|_| self.err("invalid integer"))
        }
    }
}

fn is_delimiter_or_ws(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'\t' | b'\r' | b'\n' | b'\x0C' | b'\0' | b'(' | b')' | b'<' | b'>' | b'[' | b']'
            | b'{' | b'}' | b'/' | b'%'
    )
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
