//! Minimal PDF toolkit: object model, tolerant loader, deterministic writer,
//! and the content-stream subset the composer and stamper emit.
//!
//! The loader targets the documents this crate itself produces plus simple
//! externally authored letterheads: classic bodies, uncompressed or
//! FlateDecode streams. It never trusts the cross-reference table; objects
//! are rediscovered by scanning for `N G obj` headers.

pub mod content;
pub mod document;
pub mod encoding;
pub mod object;
pub(crate) mod parser;
pub(crate) mod writer;

pub use content::ContentStreamBuilder;
pub use document::{image_xobject_from_png, Page, PdfFile};
pub use object::{Object, ObjectRef};
