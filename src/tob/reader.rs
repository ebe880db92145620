//! Table file reader with memory-mapped IO.
//!
//! `TobFile` owns the mapped input, parses the ASCII header eagerly, and
//! decodes binary frames lazily. Frames live at fixed offsets past the
//! header, so iteration slices the map rather than issuing reads; a partial
//! trailing frame is detected as a short slice and everything before it
//! stands. Per-row `TIMESTAMP` values are reconstructed from a reference
//! clock that advances by one frame duration per frame, reconciled against
//! the clock each frame header reports.

use chrono::{DateTime, Utc};
use memmap2::Mmap;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use crate::error::{CampbellWarning, Result};
use crate::tob::column::{Column, Table};
use crate::tob::format::TobFormat;
use crate::tob::frame::FrameDecoder;
use crate::tob::metadata::FileMetadata;
use crate::tob::schema::FrameSchema;
use crate::tob::{toa5, RECORD_COLUMN, TIMESTAMP_COLUMN};

/// Decoder policy knobs.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    /// Quantise `NSEC` nanoseconds to milliseconds, matching logger output
    /// precision. On by default.
    pub truncate_nsec_to_millis: bool,
    /// Re-sync the reference clock to the reported clock when drift exceeds
    /// the `1.1 × frame_duration × frames_seen` threshold. Off by default;
    /// drift still raises a [`CampbellWarning::ClockDrift`] either way.
    pub resync_on_clock_drift: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            truncate_nsec_to_millis: true,
            resync_on_clock_drift: false,
        }
    }
}

/// Backing bytes for frame decoding.
enum FrameSource {
    /// Memory-mapped file.
    Mapped {
        mmap: Mmap,
        // Keep the file handle alive for the mmap lifetime (notably on
        // Windows).
        _file: File,
    },
    /// In-memory buffer, used by tests and non-file inputs.
    Memory(Vec<u8>),
}

impl FrameSource {
    fn bytes(&self) -> &[u8] {
        match self {
            FrameSource::Mapped { mmap, .. } => mmap,
            FrameSource::Memory(buf) => buf,
        }
    }
}

/// An opened Campbell table file.
pub struct TobFile {
    metadata: FileMetadata,
    schema: Option<FrameSchema>,
    decoder: Option<FrameDecoder>,
    options: DecodeOptions,
    source: FrameSource,
    data_start: usize,
    warnings: Vec<CampbellWarning>,
}

impl TobFile {
    /// Open and parse a table file from disk with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, DecodeOptions::default())
    }

    /// Open and parse a table file from disk.
    pub fn open_with<P: AsRef<Path>>(path: P, options: DecodeOptions) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file) }?;
        Self::from_source(FrameSource::Mapped { mmap, _file: file }, options)
    }

    /// Parse a table file already held in memory, with default options.
    pub fn from_bytes(buf: Vec<u8>) -> Result<Self> {
        Self::from_bytes_with(buf, DecodeOptions::default())
    }

    /// Parse a table file already held in memory.
    pub fn from_bytes_with(buf: Vec<u8>, options: DecodeOptions) -> Result<Self> {
        Self::from_source(FrameSource::Memory(buf), options)
    }

    fn from_source(source: FrameSource, options: DecodeOptions) -> Result<Self> {
        let mut cursor = Cursor::new(source.bytes());
        let metadata = FileMetadata::from_reader(&mut cursor)?;
        let data_start = cursor.position() as usize;

        let (schema, decoder) = match metadata.format {
            // The TOA5 body is CSV; no frame layout to derive.
            TobFormat::Toa5 => (None, None),
            _ => {
                let schema = FrameSchema::from_metadata(&metadata)?;
                let decoder = FrameDecoder::new(&schema, options.truncate_nsec_to_millis);
                (Some(schema), Some(decoder))
            }
        };

        Ok(Self {
            metadata,
            schema,
            decoder,
            options,
            source,
            data_start,
            warnings: Vec::new(),
        })
    }

    /// Station and table metadata from the ASCII header.
    pub fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    /// Derived frame layout (absent for TOA5).
    pub fn schema(&self) -> Option<&FrameSchema> {
        self.schema.as_ref()
    }

    /// Warnings accumulated by frame iteration so far.
    pub fn warnings(&self) -> &[CampbellWarning] {
        &self.warnings
    }

    /// Decode the whole file into a single table.
    pub fn read_all(&mut self) -> Result<Table> {
        let mut table = Table::new();
        for chunk in self.chunks(None) {
            table.append(chunk?);
        }
        Ok(table)
    }

    /// Decode the file as a lazy sequence of tables.
    ///
    /// With `chunksize = Some(n)` every yielded table holds exactly `n` rows
    /// except possibly the last; with `None` the whole file arrives as one
    /// final table. Each chunk is sorted by `TIMESTAMP` and chunks are
    /// monotonic in starting timestamp. Dropping the iterator abandons the
    /// remaining frames; re-calling restarts from the first frame.
    pub fn chunks(&mut self, chunksize: Option<usize>) -> Chunks<'_> {
        Chunks {
            file: self,
            chunksize,
            state: StreamState::Decoding,
            frame_index: 0,
            reference_clock: None,
            pending: Table::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    /// Decoding frames and accumulating rows.
    Decoding,
    /// Input exhausted; flushing the accumulator.
    Draining,
    /// Nothing left to yield.
    Done,
}

/// Lazy chunk iterator returned by [`TobFile::chunks`].
pub struct Chunks<'a> {
    file: &'a mut TobFile,
    chunksize: Option<usize>,
    state: StreamState,
    frame_index: usize,
    /// Reconstructed start time of the most recent frame.
    reference_clock: Option<DateTime<Utc>>,
    pending: Table,
}

impl Chunks<'_> {
    /// Decode one frame into the accumulator.
    ///
    /// Returns `Ok(false)` when the stream is exhausted: the intended table
    /// size is reached, the input ends cleanly at a frame boundary, or a
    /// truncated trailing frame is found (and warned about).
    fn step(&mut self) -> Result<bool> {
        let file = &mut *self.file;

        let (schema, decoder) = match (&file.schema, &file.decoder) {
            (Some(schema), Some(decoder)) => (schema, decoder),
            // Delegated TOA5 path: the whole table arrives at once.
            _ => {
                let body = &file.source.bytes()[file.data_start..];
                let table = toa5::read_table(&file.metadata, body)?;
                self.pending.append(table);
                return Ok(false);
            }
        };

        if self.frame_index >= schema.nframes {
            return Ok(false);
        }

        let bytes = file.source.bytes();
        let offset = file.data_start + self.frame_index * schema.frame_size;
        let remaining = bytes.len().saturating_sub(offset);
        if remaining == 0 {
            // Clean end of stream at a frame boundary.
            return Ok(false);
        }
        if remaining < schema.frame_size {
            let warning = CampbellWarning::TruncatedFrame {
                frame_index: self.frame_index,
                expected: schema.frame_size,
                got: remaining,
            };
            log::warn!("{}", warning);
            file.warnings.push(warning);
            return Ok(false);
        }

        let frame = &bytes[offset..offset + schema.frame_size];
        let header_size = schema.format.frame_header_size();
        let data_end = schema.frame_size - schema.format.frame_footer_size();

        let header = schema
            .format
            .parse_frame_header(&frame[..header_size], file.options.truncate_nsec_to_millis)?;
        let columns = decoder.decode(&frame[header_size..data_end]);
        schema.format.parse_frame_footer(&frame[data_end..]);

        // Advance the reference clock independently of the logger's reported
        // clock; the first frame seeds it.
        let start = match self.reference_clock {
            None => header.time,
            Some(previous) => {
                let mut start = previous + schema.frame_duration;
                let drift = (header.time - previous).abs();
                let threshold = schema.frame_duration * self.frame_index as i32 * 11 / 10;
                if drift > threshold {
                    let warning = CampbellWarning::ClockDrift {
                        frame_index: self.frame_index,
                        reported: header.time,
                        expected: start,
                    };
                    log::warn!("{}", warning);
                    file.warnings.push(warning);
                    if file.options.resync_on_clock_drift {
                        start = header.time;
                    }
                }
                start
            }
        };
        self.reference_clock = Some(start);

        let mut frame_table = Table::new();
        for (name, column) in file.metadata.field_names.iter().zip(columns) {
            frame_table.push_column(name.clone(), column);
        }

        let timestamps = (0..schema.frame_nrows)
            .map(|k| start + schema.sample_interval * k as i32)
            .collect();
        frame_table.push_column(TIMESTAMP_COLUMN, Column::Timestamp(timestamps));

        if let Some(start_record) = header.record {
            let records = (0..schema.frame_nrows)
                .map(|k| start_record.wrapping_add(k as u32))
                .collect();
            frame_table.push_column(RECORD_COLUMN, Column::U32(records));
        }

        self.pending.append(frame_table);
        self.frame_index += 1;
        Ok(true)
    }

    /// Sort the accumulator and take `size` rows off the front.
    fn emit(&mut self, size: usize) -> Table {
        self.pending.sort_by_instants(TIMESTAMP_COLUMN);
        self.pending.split_front(size)
    }
}

impl Iterator for Chunks<'_> {
    type Item = Result<Table>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                StreamState::Decoding => {
                    if let Some(size) = self.chunksize {
                        if self.pending.nrows() >= size {
                            return Some(Ok(self.emit(size)));
                        }
                    }
                    match self.step() {
                        Ok(true) => {}
                        Ok(false) => self.state = StreamState::Draining,
                        Err(error) => {
                            self.state = StreamState::Done;
                            return Some(Err(error));
                        }
                    }
                }
                StreamState::Draining => {
                    if self.pending.is_empty() {
                        self.state = StreamState::Done;
                        return None;
                    }
                    let size = self
                        .chunksize
                        .map_or(self.pending.nrows(), |s| s.min(self.pending.nrows()));
                    let chunk = self.emit(size);
                    if self.pending.is_empty() {
                        self.state = StreamState::Done;
                    }
                    return Some(Ok(chunk));
                }
                StreamState::Done => return None,
            }
        }
    }
}
