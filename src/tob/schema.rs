//! Derived frame layout, computed once from the parsed metadata.
//!
//! The schema owns every quantity the frame decoder and the stream reader
//! need: per-column byte strides, rows per frame, frame count, and the
//! reconstructed time step. It is immutable after construction; the decoder
//! is built from it by value rather than holding a reference back.

use chrono::TimeDelta;

use crate::error::{CampbellError, Result};
use crate::tob::format::TobFormat;
use crate::tob::metadata::FileMetadata;
use crate::tob::types::CsType;

/// Frame and record layout for one binary table file.
#[derive(Debug, Clone)]
pub struct FrameSchema {
    /// File format the frames follow.
    pub format: TobFormat,
    /// Resolved column types, in declaration order.
    pub dtypes: Vec<CsType>,
    /// Byte width of each column within a record.
    pub strides: Vec<usize>,
    /// Byte width of one packed record.
    pub row_stride: usize,
    /// Whole frame size (header + data + footer) in bytes.
    pub frame_size: usize,
    /// Size of the data region of one frame in bytes.
    pub frame_data_size: usize,
    /// Number of records in one frame.
    pub frame_nrows: usize,
    /// Number of frames the table is sized for.
    pub nframes: usize,
    /// Duration of one record.
    pub sample_interval: TimeDelta,
    /// Duration of one whole frame (`frame_nrows × sample_interval`).
    pub frame_duration: TimeDelta,
    /// Whether every column is a native big-endian numeric, enabling the
    /// bulk decode path.
    pub vectorised: bool,
}

impl FrameSchema {
    /// Derive the frame layout from parsed file metadata.
    pub fn from_metadata(meta: &FileMetadata) -> Result<Self> {
        let format = meta.format;

        let mut dtypes = Vec::with_capacity(meta.dtype_names.len());
        for (field, dtype) in meta.field_names.iter().zip(&meta.dtype_names) {
            let resolved =
                CsType::from_name(dtype).ok_or_else(|| CampbellError::UnknownDtype {
                    field: field.clone(),
                    dtype: dtype.clone(),
                })?;
            dtypes.push(resolved);
        }

        let strides: Vec<usize> = dtypes.iter().map(|ty| ty.width()).collect();
        let row_stride: usize = strides.iter().sum();

        let overhead = format.frame_header_size() + format.frame_footer_size();
        let frame_data_size = meta.frame_size.checked_sub(overhead).unwrap_or(0);

        if row_stride == 0 || frame_data_size < row_stride || frame_data_size % row_stride != 0 {
            return Err(CampbellError::SchemaMismatch {
                data_size: frame_data_size,
                row_stride,
            });
        }

        let frame_nrows = frame_data_size / row_stride;
        let nframes = meta.intended_table_size / frame_nrows;

        let sample_interval = meta.sample_interval()?;
        let frame_duration = sample_interval * frame_nrows as i32;

        let vectorised = dtypes.iter().all(|ty| ty.is_native());

        Ok(Self {
            format,
            dtypes,
            strides,
            row_stride,
            frame_size: meta.frame_size,
            frame_data_size,
            frame_nrows,
            nframes,
            sample_interval,
            frame_duration,
            vectorised,
        })
    }

    /// Byte offset of each column within a packed record.
    pub fn field_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.strides.len());
        let mut offset = 0;
        for stride in &self.strides {
            offsets.push(offset);
            offset += stride;
        }
        offsets
    }
}
