//! Error and warning types shared across the decoder and the CLI.
//!
//! Fatal conditions abort header parsing or frame iteration and surface as
//! [`CampbellError`]. Recoverable conditions (a truncated trailing frame, a
//! drifting datalogger clock) never abort the stream; they are recorded as
//! [`CampbellWarning`] values on the reader and mirrored through `log::warn!`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Fatal decoder errors.
///
/// Variants carry the offending values so callers can report precisely what
/// the file claimed, not just that something failed.
#[derive(Error, Debug)]
pub enum CampbellError {
    /// I/O operation failed (open, map, read).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An ASCII header line did not split into the required fields.
    #[error("malformed header line {line}: {reason}")]
    MalformedHeader { line: usize, reason: String },

    /// The declared file format is unknown, or is recognised but has no
    /// binary frame decoder (TOB1).
    #[error("unsupported file format '{format}'")]
    UnsupportedFormat { format: String },

    /// A column dtype name is not in the type registry.
    #[error("unknown dtype '{dtype}' for field '{field}'")]
    UnknownDtype { field: String, dtype: String },

    /// The sample interval string uses an unrecognised shape or unit.
    #[error("unsupported sample interval '{interval}'")]
    UnsupportedInterval { interval: String },

    /// The frame data region is not an integer number of records.
    #[error(
        "frame data region of {data_size} bytes is not a multiple of the {row_stride}-byte record stride"
    )]
    SchemaMismatch { data_size: usize, row_stride: usize },

    /// The delegated TOA5 CSV reader failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CampbellError>;

/// Non-fatal conditions observed while decoding frames.
///
/// Serialized with a `name` discriminator so downstream tooling can match on
/// the warning kind without parsing the message text.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "name")]
pub enum CampbellWarning {
    /// The stream ended partway through a frame. Everything decoded before
    /// this frame remains valid; nothing after it is read.
    TruncatedFrame {
        frame_index: usize,
        expected: usize,
        got: usize,
    },

    /// A frame's reported header clock diverged from the reconstructed
    /// reference clock beyond the drift threshold.
    ClockDrift {
        frame_index: usize,
        reported: DateTime<Utc>,
        expected: DateTime<Utc>,
    },
}

impl fmt::Display for CampbellWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CampbellWarning::TruncatedFrame {
                frame_index,
                expected,
                got,
            } => write!(
                f,
                "frame {} is truncated ({} of {} bytes); stopping at the previous frame",
                frame_index, got, expected
            ),
            CampbellWarning::ClockDrift {
                frame_index,
                reported,
                expected,
            } => write!(
                f,
                "frame {} reports clock {} but the reference clock expects {}",
                frame_index, reported, expected
            ),
        }
    }
}
