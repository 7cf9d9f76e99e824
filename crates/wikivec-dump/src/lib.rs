//! Parallel streaming reader for Wikidata JSON dumps
//!
//! Handles plain, gzip- and bzip2-compressed dumps under backpressure and
//! hands parsed entities to caller-supplied handlers.

pub mod error;
pub mod reader;

pub use error::{DumpError, DumpResult};
pub use reader::DumpReader;
