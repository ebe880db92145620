//! Reader for Campbell Scientific datalogger files.
//!
//! Campbell dataloggers write table data in a small family of formats: the
//! binary TOB2/TOB3 (fixed-size frames of packed big-endian records behind a
//! six-line ASCII header) and the textual TOA5 (plain CSV). This crate
//! decodes them into columnar, timestamped tables: per-row `TIMESTAMP`
//! values are reconstructed from the frame headers and the table's sample
//! interval, and TOB3 record numbers become a `RECORD` column.
//!
//! ```no_run
//! use camp2ascii::decode_whole;
//!
//! let (metadata, table) = decode_whole("ts_data.dat")?;
//! println!("{} rows from station {}", table.nrows(), metadata.station);
//! # Ok::<(), camp2ascii::CampbellError>(())
//! ```

pub mod error;

/// Campbell table format parsing modules.
pub mod tob;

pub use error::{CampbellError, CampbellWarning, Result};
pub use tob::{
    Column, CsType, DecodeOptions, FileMetadata, FrameSchema, Table, TobFile, TobFormat,
    RECORD_COLUMN, TIMESTAMP_COLUMN,
};

use std::path::Path;

/// Decode a whole file into a single in-memory table.
///
/// Warnings raised during decoding are emitted through `log`; use
/// [`TobFile`] directly to inspect them programmatically.
pub fn decode_whole<P: AsRef<Path>>(path: P) -> Result<(FileMetadata, Table)> {
    let mut file = TobFile::open(path)?;
    let table = file.read_all()?;
    Ok((file.metadata().clone(), table))
}

/// Decode a file into successive tables of `chunksize` rows each (the final
/// chunk may be shorter).
///
/// This convenience collects the chunks eagerly; for a streaming consumer,
/// open a [`TobFile`] and iterate [`TobFile::chunks`].
pub fn decode_chunks<P: AsRef<Path>>(
    path: P,
    chunksize: usize,
) -> Result<(FileMetadata, Vec<Table>)> {
    let mut file = TobFile::open(path)?;
    let mut chunks = Vec::new();
    for chunk in file.chunks(Some(chunksize)) {
        chunks.push(chunk?);
    }
    Ok((file.metadata().clone(), chunks))
}
