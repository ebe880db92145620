//! Columnar table model.
//!
//! Decoded frames land in typed column buffers rather than row structs; a
//! [`Table`] is an ordered set of named [`Column`]s of equal length. Tables
//! support the few bulk operations the stream reader needs: appending a
//! frame, sorting by the synthesised `TIMESTAMP` column, and splitting a
//! chunk off the front.

use chrono::{DateTime, Utc};

use crate::tob::types::CsType;

/// A typed column of decoded values.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// 32-bit floats (`IEEE4`, `FP2`)
    F32(Vec<f32>),
    /// 64-bit floats (`IEEE8`)
    F64(Vec<f64>),
    /// Signed 32-bit integers (`Long`)
    I32(Vec<i32>),
    /// Unsigned 32-bit integers (`ULONG`, synthesised `RECORD`)
    U32(Vec<u32>),
    /// Unsigned 16-bit integers (`UINT2`)
    U16(Vec<u16>),
    /// Unsigned 8-bit integers (`UINT1`, `Bool8`)
    U8(Vec<u8>),
    /// Booleans (`Boolean`)
    Bool(Vec<bool>),
    /// Instants (`NSEC`, synthesised `TIMESTAMP`)
    Timestamp(Vec<DateTime<Utc>>),
    /// Fixed-width strings (`ASCII(n)`)
    Str(Vec<String>),
}

impl Column {
    /// Allocate an empty column of the variant matching an on-disk type.
    pub fn for_type(dtype: CsType, capacity: usize) -> Self {
        match dtype {
            CsType::Ieee4 | CsType::Fp2 => Self::F32(Vec::with_capacity(capacity)),
            CsType::Ieee8 => Self::F64(Vec::with_capacity(capacity)),
            CsType::Long => Self::I32(Vec::with_capacity(capacity)),
            CsType::ULong => Self::U32(Vec::with_capacity(capacity)),
            CsType::UInt2 => Self::U16(Vec::with_capacity(capacity)),
            CsType::UInt1 => Self::U8(Vec::with_capacity(capacity)),
            CsType::Boolean => Self::Bool(Vec::with_capacity(capacity)),
            CsType::Nsec => Self::Timestamp(Vec::with_capacity(capacity)),
            CsType::Ascii(_) => Self::Str(Vec::with_capacity(capacity)),
        }
    }

    /// Number of values in the column.
    pub fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U8(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::Timestamp(v) => v.len(),
            Self::Str(v) => v.len(),
        }
    }

    /// Check if the column has no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move another column's values onto the end of this one.
    ///
    /// Both columns come from the same schema, so the variants always match.
    fn append(&mut self, other: Column) {
        match (self, other) {
            (Self::F32(a), Self::F32(b)) => a.extend(b),
            (Self::F64(a), Self::F64(b)) => a.extend(b),
            (Self::I32(a), Self::I32(b)) => a.extend(b),
            (Self::U32(a), Self::U32(b)) => a.extend(b),
            (Self::U16(a), Self::U16(b)) => a.extend(b),
            (Self::U8(a), Self::U8(b)) => a.extend(b),
            (Self::Bool(a), Self::Bool(b)) => a.extend(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.extend(b),
            (Self::Str(a), Self::Str(b)) => a.extend(b),
            _ => unreachable!("columns of one table share a schema"),
        }
    }

    /// Reorder the column by the given row permutation.
    fn permuted(&self, order: &[usize]) -> Column {
        match self {
            Self::F32(v) => Self::F32(order.iter().map(|&i| v[i]).collect()),
            Self::F64(v) => Self::F64(order.iter().map(|&i| v[i]).collect()),
            Self::I32(v) => Self::I32(order.iter().map(|&i| v[i]).collect()),
            Self::U32(v) => Self::U32(order.iter().map(|&i| v[i]).collect()),
            Self::U16(v) => Self::U16(order.iter().map(|&i| v[i]).collect()),
            Self::U8(v) => Self::U8(order.iter().map(|&i| v[i]).collect()),
            Self::Bool(v) => Self::Bool(order.iter().map(|&i| v[i]).collect()),
            Self::Timestamp(v) => Self::Timestamp(order.iter().map(|&i| v[i]).collect()),
            Self::Str(v) => Self::Str(order.iter().map(|&i| v[i].clone()).collect()),
        }
    }

    /// Split the first `n` values off into a new column, keeping the rest.
    fn split_front(&mut self, n: usize) -> Column {
        fn take<T>(v: &mut Vec<T>, n: usize) -> Vec<T> {
            let tail = v.split_off(n.min(v.len()));
            std::mem::replace(v, tail)
        }

        match self {
            Self::F32(v) => Self::F32(take(v, n)),
            Self::F64(v) => Self::F64(take(v, n)),
            Self::I32(v) => Self::I32(take(v, n)),
            Self::U32(v) => Self::U32(take(v, n)),
            Self::U16(v) => Self::U16(take(v, n)),
            Self::U8(v) => Self::U8(take(v, n)),
            Self::Bool(v) => Self::Bool(take(v, n)),
            Self::Timestamp(v) => Self::Timestamp(take(v, n)),
            Self::Str(v) => Self::Str(take(v, n)),
        }
    }

    /// Render one value for text output.
    ///
    /// Non-finite floats use the logger's own sentinels (`NAN`, `INF`,
    /// `-INF`); instants render as `YYYY-MM-DD HH:MM:SS[.fff]`.
    pub fn render(&self, row: usize) -> String {
        match self {
            Self::F32(v) => {
                let value = v[row];
                if value.is_finite() {
                    value.to_string()
                } else {
                    render_non_finite(value.is_nan(), value > 0.0)
                }
            }
            Self::F64(v) => {
                let value = v[row];
                if value.is_finite() {
                    value.to_string()
                } else {
                    render_non_finite(value.is_nan(), value > 0.0)
                }
            }
            Self::I32(v) => v[row].to_string(),
            Self::U32(v) => v[row].to_string(),
            Self::U16(v) => v[row].to_string(),
            Self::U8(v) => v[row].to_string(),
            Self::Bool(v) => v[row].to_string(),
            Self::Timestamp(v) => v[row].format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            Self::Str(v) => v[row].clone(),
        }
    }
}

fn render_non_finite(nan: bool, positive: bool) -> String {
    if nan {
        "NAN".to_string()
    } else if positive {
        "INF".to_string()
    } else {
        "-INF".to_string()
    }
}

/// An ordered collection of equally sized named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<(String, Column)>,
}

impl Table {
    /// Create an empty table with no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named column.
    ///
    /// Columns must be pushed at a common length; the table keeps them
    /// parallel from then on.
    pub fn push_column(&mut self, name: impl Into<String>, column: Column) {
        debug_assert!(
            self.columns.is_empty() || self.columns[0].1.len() == column.len(),
            "table columns must stay parallel"
        );
        self.columns.push((name.into(), column));
    }

    /// Number of rows.
    pub fn nrows(&self) -> usize {
        self.columns.first().map_or(0, |(_, c)| c.len())
    }

    /// Number of columns.
    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    /// Check whether the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.nrows() == 0
    }

    /// Column names in table order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Iterate over `(name, column)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(name, col)| (name.as_str(), col))
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    /// Append another table with the same column layout.
    pub fn append(&mut self, other: Table) {
        if self.columns.is_empty() {
            *self = other;
            return;
        }

        for ((_, dst), (_, src)) in self.columns.iter_mut().zip(other.columns) {
            dst.append(src);
        }
    }

    /// Stable-sort all rows by the column named `by` (ascending instants).
    ///
    /// A no-op when the column is absent or already in order.
    pub fn sort_by_instants(&mut self, by: &str) {
        let times = match self.column(by) {
            Some(Column::Timestamp(times)) => times,
            _ => return,
        };

        if times.windows(2).all(|w| w[0] <= w[1]) {
            return;
        }

        let mut order: Vec<usize> = (0..times.len()).collect();
        order.sort_by_key(|&i| times[i]);

        for (_, column) in &mut self.columns {
            *column = column.permuted(&order);
        }
    }

    /// Split the first `n` rows off into a new table, keeping the rest.
    pub fn split_front(&mut self, n: usize) -> Table {
        let columns = self
            .columns
            .iter_mut()
            .map(|(name, col)| (name.clone(), col.split_front(n)))
            .collect();
        Table { columns }
    }
}
