//! Photosheet: assemble annotated photographs into criminal-case and
//! traffic-accident photo sheets.
//!
//! The [`session::Session`] owns the image collection and the form; the
//! [`layout`] module paginates a snapshot, and the [`export`] adapters turn
//! the layout into a DOCX document, printable HTML or a zip bundle.

pub mod collection;
pub mod config;
pub mod dates;
pub mod export;
pub mod form;
pub mod import;
pub mod layout;
pub mod logging;
pub mod manifest;
pub mod session;
