//! ASCII file header parsing.
//!
//! Every Campbell table file opens with ASCII lines of comma-separated,
//! double-quoted fields. The binary TOB formats carry six:
//!
//! ```text
//! "TOB3","2991","CR6","2991","CR6.Std.04","CPU:TEST.EC.v18.CR6","52714","2018-06-08 00:00:00"
//! "ts_data","100 MSEC","984","950400","26624","Sec100Usec","...","...","..."
//! "Ux","Uy","Uz","Ts","diag_sonic","H2O","CO2","amb_press","diag_irga"
//! "","","","degC","","mg/m^3","g/m^3","kPa","unitless"
//! "Smp","Smp","Smp","Smp","Smp","Smp","Smp","Smp","Smp"
//! "IEEE4B","IEEE4B","IEEE4B","IEEE4B","IEEE4B","IEEE4B","IEEE4B","IEEE4B","IEEE4B"
//! ```
//!
//! Lines one and two describe the station and the table layout; lines three
//! through six are per-column and must all have the same length. Textual
//! TOA5 files share line one but follow it with only field names, units,
//! and process labels before the CSV rows begin.

use chrono::TimeDelta;
use serde::Serialize;
use std::io::BufRead;

use crate::error::{CampbellError, Result};
use crate::tob::format::TobFormat;

/// Station and table metadata parsed from the ASCII header lines.
///
/// For TOA5 the table-layout fields (`table`, `interval`, `frame_size`,
/// `intended_table_size`, `validation`, `frame_time_res`) and the dtype
/// names are absent from the file and left empty; the delegated CSV reader
/// does not use them.
#[derive(Debug, Clone, Serialize)]
pub struct FileMetadata {
    /// Declared file format.
    pub format: TobFormat,
    /// Station name.
    pub station: String,
    /// Datalogger model (e.g. `CR6`).
    pub model: String,
    /// Datalogger serial number.
    pub serial_number: String,
    /// Logger OS version string.
    pub os_version: String,
    /// Name of the running logger program.
    pub program: String,
    /// Program signature reported by the logger.
    pub signature: String,
    /// File creation timestamp, verbatim.
    pub created: String,

    /// Table name.
    pub table: String,
    /// Sample interval, verbatim (e.g. `"100 MSEC"`).
    pub interval: String,
    /// Size of one binary frame in bytes.
    pub frame_size: usize,
    /// Total rows the table is sized for.
    pub intended_table_size: usize,
    /// Validation code, verbatim.
    pub validation: String,
    /// Frame time resolution label, verbatim.
    pub frame_time_res: String,

    /// Column names, in declaration order.
    pub field_names: Vec<String>,
    /// Per-column unit labels.
    pub units: Vec<String>,
    /// Per-column processing labels (e.g. `Smp`, `Avg`).
    pub process: Vec<String>,
    /// Per-column on-disk dtype names.
    pub dtype_names: Vec<String>,
}

impl FileMetadata {
    /// Parse the ASCII header from a reader positioned at byte zero.
    ///
    /// Leaves the reader positioned at the first byte after the final header
    /// line terminator: the start of the binary frame stream for TOB files,
    /// or the first CSV data row for TOA5.
    pub fn from_reader<R: BufRead>(reader: &mut R) -> Result<Self> {
        let environment = read_header_line(reader, 1)?;
        require_fields(&environment, 8, 1)?;
        let format = TobFormat::from_name(&environment[0])?;

        match format {
            TobFormat::Toa5 => Self::from_toa5_lines(format, environment, reader),
            _ => Self::from_tob_lines(format, environment, reader),
        }
    }

    /// Parse header lines two through six of a binary TOB file.
    fn from_tob_lines<R: BufRead>(
        format: TobFormat,
        environment: Vec<String>,
        reader: &mut R,
    ) -> Result<Self> {
        let table_info = read_header_line(reader, 2)?;
        require_fields(&table_info, 6, 2)?;

        let frame_size = parse_count(&table_info[2], 2, "frame size")?;
        let intended_table_size = parse_count(&table_info[3], 2, "intended table size")?;

        let field_names = read_header_line(reader, 3)?;
        let units = read_header_line(reader, 4)?;
        let process = read_header_line(reader, 5)?;
        let dtype_names = read_header_line(reader, 6)?;

        // Lines three through six are parallel per-column sequences.
        for (line_number, row) in [(4, &units), (5, &process), (6, &dtype_names)] {
            require_column_count(row, field_names.len(), line_number)?;
        }

        Ok(Self {
            format,
            station: environment[1].clone(),
            model: environment[2].clone(),
            serial_number: environment[3].clone(),
            os_version: environment[4].clone(),
            program: environment[5].clone(),
            signature: environment[6].clone(),
            created: environment[7].clone(),
            table: table_info[0].clone(),
            interval: table_info[1].clone(),
            frame_size,
            intended_table_size,
            validation: table_info[4].clone(),
            frame_time_res: table_info[5].clone(),
            field_names,
            units,
            process,
            dtype_names,
        })
    }

    /// Parse header lines two through four of a textual TOA5 file.
    fn from_toa5_lines<R: BufRead>(
        format: TobFormat,
        environment: Vec<String>,
        reader: &mut R,
    ) -> Result<Self> {
        let field_names = read_header_line(reader, 2)?;
        let units = read_header_line(reader, 3)?;
        let process = read_header_line(reader, 4)?;

        for (line_number, row) in [(3, &units), (4, &process)] {
            require_column_count(row, field_names.len(), line_number)?;
        }

        Ok(Self {
            format,
            station: environment[1].clone(),
            model: environment[2].clone(),
            serial_number: environment[3].clone(),
            os_version: environment[4].clone(),
            program: environment[5].clone(),
            signature: environment[6].clone(),
            created: environment[7].clone(),
            table: String::new(),
            interval: String::new(),
            frame_size: 0,
            intended_table_size: 0,
            validation: String::new(),
            frame_time_res: String::new(),
            field_names,
            units,
            process,
            dtype_names: Vec::new(),
        })
    }

    /// Parse the sample interval string into a duration.
    ///
    /// The recognised form is `"<integer> <unit>"` with units `MSEC` and
    /// `MIN`. Anything else is fatal until the vocabulary is extended.
    pub fn sample_interval(&self) -> Result<TimeDelta> {
        parse_interval(&self.interval)
    }
}

/// Read one header line, tolerating CRLF and LF terminators.
fn read_header_line<R: BufRead>(reader: &mut R, line_number: usize) -> Result<Vec<String>> {
    let mut line = String::new();
    let read = reader.read_line(&mut line)?;
    if read == 0 {
        return Err(CampbellError::MalformedHeader {
            line: line_number,
            reason: "unexpected end of file".to_string(),
        });
    }

    Ok(split_header_line(&line))
}

/// Split a header line into its fields, stripping the surrounding quotes.
fn split_header_line(line: &str) -> Vec<String> {
    line.trim()
        .split(',')
        .map(|field| field.trim().trim_matches('"').to_string())
        .collect()
}

/// Check that a split line has at least `min` fields. Extra fields are kept.
fn require_fields(fields: &[String], min: usize, line_number: usize) -> Result<()> {
    if fields.len() < min {
        return Err(CampbellError::MalformedHeader {
            line: line_number,
            reason: format!("expected at least {} fields, found {}", min, fields.len()),
        });
    }
    Ok(())
}

/// Check that a per-column line matches the field-name count.
fn require_column_count(row: &[String], expected: usize, line_number: usize) -> Result<()> {
    if row.len() != expected {
        return Err(CampbellError::MalformedHeader {
            line: line_number,
            reason: format!(
                "expected {} per-column fields, found {}",
                expected,
                row.len()
            ),
        });
    }
    Ok(())
}

/// Parse a non-negative integer header field.
fn parse_count(field: &str, line_number: usize, what: &str) -> Result<usize> {
    field
        .trim()
        .parse()
        .map_err(|_| CampbellError::MalformedHeader {
            line: line_number,
            reason: format!("{} '{}' is not an integer", what, field),
        })
}

/// Parse an interval string like `"100 MSEC"` or `"30 MIN"`.
pub(crate) fn parse_interval(interval: &str) -> Result<TimeDelta> {
    let unsupported = || CampbellError::UnsupportedInterval {
        interval: interval.to_string(),
    };

    let mut tokens = interval.split_whitespace();
    let count: i64 = tokens
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(unsupported)?;
    let unit = tokens.next().ok_or_else(unsupported)?;
    if tokens.next().is_some() {
        return Err(unsupported());
    }

    match unit {
        "MSEC" => Ok(TimeDelta::milliseconds(count)),
        "MIN" => Ok(TimeDelta::minutes(count)),
        _ => Err(unsupported()),
    }
}
