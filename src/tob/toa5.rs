//! Delegated TOA5 reader.
//!
//! TOA5 files are conventional CSV after their four ASCII header lines.
//! Parsing is handed to the `csv` crate; this module only maps rows into
//! the columnar table model. `-9999` and `NAN` are missing-value sentinels
//! in numeric columns, `TIMESTAMP` parses as instants, and `RECORD` as
//! record numbers. A column that is not uniformly numeric stays textual.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{CampbellError, Result};
use crate::tob::column::{Column, Table};
use crate::tob::metadata::FileMetadata;
use crate::tob::{RECORD_COLUMN, TIMESTAMP_COLUMN};

/// Missing-value sentinels written by the logger.
const NA_VALUES: [&str; 2] = ["-9999", "NAN"];

/// Timestamp layout used in TOA5 rows, with optional fractional seconds.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Parse the CSV body following the header lines into a table.
pub(crate) fn read_table(metadata: &FileMetadata, body: &[u8]) -> Result<Table> {
    let ncols = metadata.field_names.len();
    let mut cells: Vec<Vec<String>> = vec![Vec::new(); ncols];

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(body);
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != ncols {
            return Err(CampbellError::MalformedHeader {
                // Data rows start on file line five.
                line: row + 5,
                reason: format!(
                    "CSV row has {} fields but the header names {} columns",
                    record.len(),
                    ncols
                ),
            });
        }
        for (column, field) in cells.iter_mut().zip(record.iter()) {
            column.push(field.to_string());
        }
    }

    let mut table = Table::new();
    for (name, values) in metadata.field_names.iter().zip(cells) {
        table.push_column(name.clone(), build_column(name, values));
    }
    Ok(table)
}

/// Choose a typed representation for one column of raw CSV fields.
fn build_column(name: &str, values: Vec<String>) -> Column {
    if name == TIMESTAMP_COLUMN {
        if let Some(instants) = parse_instants(&values) {
            return Column::Timestamp(instants);
        }
    }
    if name == RECORD_COLUMN {
        if let Some(records) = parse_records(&values) {
            return Column::U32(records);
        }
    }
    if let Some(floats) = parse_floats(&values) {
        return Column::F64(floats);
    }
    Column::Str(values)
}

fn parse_instants(values: &[String]) -> Option<Vec<DateTime<Utc>>> {
    values
        .iter()
        .map(|value| {
            NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT)
                .ok()
                .map(|naive| naive.and_utc())
        })
        .collect()
}

fn parse_records(values: &[String]) -> Option<Vec<u32>> {
    values.iter().map(|value| value.trim().parse().ok()).collect()
}

fn parse_floats(values: &[String]) -> Option<Vec<f64>> {
    values
        .iter()
        .map(|value| {
            let trimmed = value.trim();
            if NA_VALUES.contains(&trimmed) {
                Some(f64::NAN)
            } else {
                trimmed.parse().ok()
            }
        })
        .collect()
}
