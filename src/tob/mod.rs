//! Campbell Scientific table file structures and parsing
//!
//! This module implements the table-oriented file formats written by
//! Campbell dataloggers:
//! - Six-line ASCII metadata header (all formats)
//! - Binary frame streams (TOB2/TOB3: header, packed records, footer)
//! - Proprietary column encodings (`FP2` decimal floats, `NSEC` timestamps)
//! - Textual TOA5 tables, delegated to a CSV reader

pub mod column;
pub mod format;
pub mod frame;
pub mod metadata;
pub mod reader;
pub mod schema;
pub(crate) mod toa5;
pub mod types;

pub use column::{Column, Table};
pub use format::{FrameHeader, TobFormat};
pub use frame::FrameDecoder;
pub use metadata::FileMetadata;
pub use reader::{Chunks, DecodeOptions, TobFile};
pub use schema::FrameSchema;
pub use types::CsType;

/// Name of the synthesised per-row timestamp column.
pub const TIMESTAMP_COLUMN: &str = "TIMESTAMP";

/// Name of the synthesised per-row record-number column (TOB3 only).
pub const RECORD_COLUMN: &str = "RECORD";
