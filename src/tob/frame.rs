//! Frame data-region decoding.
//!
//! A frame's data region is `frame_nrows` packed records, each the
//! concatenation of the schema's column values in declaration order, with
//! multi-byte numerics big-endian. When every column is a native numeric the
//! decoder walks the region column by column with bulk byte-order
//! conversion; one proprietary column (`FP2`, `NSEC`, `ASCII(n)`) forces the
//! row-by-row path. Both paths produce identical values.

use byteorder::{BigEndian, ByteOrder};

use crate::tob::column::Column;
use crate::tob::schema::FrameSchema;
use crate::tob::types::{fp2_to_f32, nsec_to_datetime, CsType};

/// Decoder for one file's frame data regions.
///
/// Built once per file from the derived schema; owns copies of the layout
/// quantities it needs.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    dtypes: Vec<CsType>,
    strides: Vec<usize>,
    offsets: Vec<usize>,
    row_stride: usize,
    frame_nrows: usize,
    vectorised: bool,
    truncate_nsec_to_millis: bool,
}

impl FrameDecoder {
    /// Build a decoder from the schema.
    pub fn new(schema: &FrameSchema, truncate_nsec_to_millis: bool) -> Self {
        Self {
            dtypes: schema.dtypes.clone(),
            strides: schema.strides.clone(),
            offsets: schema.field_offsets(),
            row_stride: schema.row_stride,
            frame_nrows: schema.frame_nrows,
            vectorised: schema.vectorised,
            truncate_nsec_to_millis,
        }
    }

    /// Decode one frame's data region into per-column buffers.
    ///
    /// `data` must be exactly the frame's data region
    /// (`frame_nrows × row_stride` bytes); the stream reader guarantees this
    /// by slicing whole frames only.
    pub fn decode(&self, data: &[u8]) -> Vec<Column> {
        debug_assert_eq!(data.len(), self.frame_nrows * self.row_stride);

        if self.vectorised {
            self.decode_vector(data)
        } else {
            self.decode_scalar(data)
        }
    }

    /// Bulk path: convert each column's bytes across all records at once.
    fn decode_vector(&self, data: &[u8]) -> Vec<Column> {
        self.dtypes
            .iter()
            .zip(&self.offsets)
            .map(|(&dtype, &off)| {
                let records = data.chunks_exact(self.row_stride);
                match dtype {
                    CsType::Ieee4 => Column::F32(
                        records
                            .map(|rec| BigEndian::read_f32(&rec[off..off + 4]))
                            .collect(),
                    ),
                    CsType::Ieee8 => Column::F64(
                        records
                            .map(|rec| BigEndian::read_f64(&rec[off..off + 8]))
                            .collect(),
                    ),
                    CsType::Long => Column::I32(
                        records
                            .map(|rec| BigEndian::read_i32(&rec[off..off + 4]))
                            .collect(),
                    ),
                    CsType::ULong => Column::U32(
                        records
                            .map(|rec| BigEndian::read_u32(&rec[off..off + 4]))
                            .collect(),
                    ),
                    CsType::UInt2 => Column::U16(
                        records
                            .map(|rec| BigEndian::read_u16(&rec[off..off + 2]))
                            .collect(),
                    ),
                    CsType::UInt1 => Column::U8(records.map(|rec| rec[off]).collect()),
                    CsType::Boolean => Column::Bool(records.map(|rec| rec[off] != 0).collect()),
                    CsType::Fp2 | CsType::Nsec | CsType::Ascii(_) => {
                        unreachable!("vector path requires native columns")
                    }
                }
            })
            .collect()
    }

    /// Element-wise path: decode each record's fields one value at a time.
    fn decode_scalar(&self, data: &[u8]) -> Vec<Column> {
        let mut columns: Vec<Column> = self
            .dtypes
            .iter()
            .map(|&dtype| Column::for_type(dtype, self.frame_nrows))
            .collect();

        for rec in data.chunks_exact(self.row_stride) {
            let fields = self.dtypes.iter().zip(self.offsets.iter().zip(&self.strides));
            for (column, (&dtype, (&off, &stride))) in columns.iter_mut().zip(fields) {
                push_value(
                    column,
                    dtype,
                    &rec[off..off + stride],
                    self.truncate_nsec_to_millis,
                );
            }
        }

        columns
    }
}

/// Decode one field's bytes and push the value onto its column buffer.
fn push_value(column: &mut Column, dtype: CsType, bytes: &[u8], truncate_nsec_to_millis: bool) {
    match (dtype, column) {
        (CsType::Ieee4, Column::F32(v)) => v.push(BigEndian::read_f32(bytes)),
        (CsType::Fp2, Column::F32(v)) => v.push(fp2_to_f32(BigEndian::read_u16(bytes))),
        (CsType::Ieee8, Column::F64(v)) => v.push(BigEndian::read_f64(bytes)),
        (CsType::Long, Column::I32(v)) => v.push(BigEndian::read_i32(bytes)),
        (CsType::ULong, Column::U32(v)) => v.push(BigEndian::read_u32(bytes)),
        (CsType::UInt2, Column::U16(v)) => v.push(BigEndian::read_u16(bytes)),
        (CsType::UInt1, Column::U8(v)) => v.push(bytes[0]),
        (CsType::Boolean, Column::Bool(v)) => v.push(bytes[0] != 0),
        (CsType::Nsec, Column::Timestamp(v)) => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(bytes);
            v.push(nsec_to_datetime(&raw, truncate_nsec_to_millis));
        }
        (CsType::Ascii(_), Column::Str(v)) => {
            v.push(String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string())
        }
        _ => unreachable!("column buffer variant matches its dtype"),
    }
}
