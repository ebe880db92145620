//! End-to-end decoding scenarios against synthetic table files.

use camp2ascii::tob::types::campbell_epoch;
use camp2ascii::{
    CampbellError, CampbellWarning, Column, DecodeOptions, Table, TobFile, TobFormat,
    RECORD_COLUMN, TIMESTAMP_COLUMN,
};
use chrono::{DateTime, TimeDelta, Utc};

/// Build the six ASCII header lines of a binary table file.
fn header(
    format: &str,
    interval: &str,
    frame_size: usize,
    table_size: usize,
    names: &[&str],
    dtypes: &[&str],
) -> Vec<u8> {
    fn quote(fields: &[String]) -> String {
        fields
            .iter()
            .map(|f| format!("\"{}\"", f))
            .collect::<Vec<_>>()
            .join(",")
    }

    let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
    let units = vec![String::new(); names.len()];
    let process = vec!["Smp".to_string(); names.len()];
    let dtypes: Vec<String> = dtypes.iter().map(|s| s.to_string()).collect();

    format!(
        "\"{}\",\"2991\",\"CR6\",\"2991\",\"CR6.Std.04\",\"CPU:TEST.CR6\",\"52714\",\"2018-06-08 00:00:00\"\r\n\
         \"ts_data\",\"{}\",\"{}\",\"{}\",\"26624\",\"Sec100Usec\"\r\n\
         {}\r\n{}\r\n{}\r\n{}\r\n",
        format,
        interval,
        frame_size,
        table_size,
        quote(&names),
        quote(&units),
        quote(&process),
        quote(&dtypes),
    )
    .into_bytes()
}

/// Encode an NSEC timestamp (little-endian seconds and nanoseconds).
fn nsec(seconds: u32, nanos: u32) -> [u8; 8] {
    let mut bytes = [0u8; 8];
    bytes[..4].copy_from_slice(&seconds.to_le_bytes());
    bytes[4..].copy_from_slice(&nanos.to_le_bytes());
    bytes
}

/// Append one TOB2 frame (8-byte header, data, 4-byte footer).
fn push_tob2_frame(out: &mut Vec<u8>, start_seconds: u32, data: &[u8]) {
    out.extend_from_slice(&nsec(start_seconds, 0));
    out.extend_from_slice(data);
    out.extend_from_slice(&[0u8; 4]);
}

/// Append one TOB3 frame (12-byte header, data, 4-byte footer).
fn push_tob3_frame(out: &mut Vec<u8>, start_seconds: u32, record: u32, data: &[u8]) {
    out.extend_from_slice(&nsec(start_seconds, 0));
    out.extend_from_slice(&record.to_be_bytes());
    out.extend_from_slice(data);
    out.extend_from_slice(&[0u8; 4]);
}

fn instants(offsets_seconds: &[i64]) -> Column {
    Column::Timestamp(
        offsets_seconds
            .iter()
            .map(|&s| campbell_epoch() + TimeDelta::seconds(s))
            .collect(),
    )
}

/// Assert a chunk's timestamps increase strictly by exactly `step`.
fn assert_evenly_spaced(table: &Table, step: TimeDelta) {
    let times: &Vec<DateTime<Utc>> = match table.column(TIMESTAMP_COLUMN) {
        Some(Column::Timestamp(times)) => times,
        other => panic!("missing timestamp column: {:?}", other),
    };
    for pair in times.windows(2) {
        assert_eq!(pair[1] - pair[0], step);
    }
}

#[test]
fn tob2_single_frame() {
    // Two IEEE4B columns, two records per frame: 8 + 2*2*4 + 4 = 28
    let mut bytes = header("TOB2", "1000 MSEC", 28, 4, &["a", "b"], &["IEEE4B", "IEEE4B"]);
    let mut data = Vec::new();
    for value in [1.0f32, 2.0, 3.0, 4.0] {
        data.extend_from_slice(&value.to_be_bytes());
    }
    push_tob2_frame(&mut bytes, 0, &data);

    let mut file = TobFile::from_bytes(bytes).unwrap();
    assert_eq!(file.metadata().format, TobFormat::Tob2);
    let table = file.read_all().unwrap();

    assert_eq!(table.nrows(), 2);
    assert_eq!(table.column("a"), Some(&Column::F32(vec![1.0, 3.0])));
    assert_eq!(table.column("b"), Some(&Column::F32(vec![2.0, 4.0])));
    assert_eq!(table.column(TIMESTAMP_COLUMN), Some(&instants(&[0, 1])));
    // TOB2 frames carry no record numbers
    assert_eq!(table.column(RECORD_COLUMN), None);
    // The stream ended cleanly at a frame boundary
    assert!(file.warnings().is_empty());
}

#[test]
fn tob3_record_numbers_across_frames() {
    // Two IEEE4B columns, two records per frame: 12 + 16 + 4 = 32
    let mut bytes = header("TOB3", "1000 MSEC", 32, 4, &["a", "b"], &["IEEE4B", "IEEE4B"]);
    let mut data = Vec::new();
    for value in [1.0f32, 2.0, 3.0, 4.0] {
        data.extend_from_slice(&value.to_be_bytes());
    }
    push_tob3_frame(&mut bytes, 0, 100, &data);
    push_tob3_frame(&mut bytes, 2, 102, &data);

    let mut file = TobFile::from_bytes(bytes).unwrap();
    let table = file.read_all().unwrap();

    assert_eq!(table.nrows(), 4);
    assert_eq!(
        table.column(RECORD_COLUMN),
        Some(&Column::U32(vec![100, 101, 102, 103]))
    );
    assert_eq!(table.column(TIMESTAMP_COLUMN), Some(&instants(&[0, 1, 2, 3])));
    assert!(file.warnings().is_empty());
}

#[test]
fn fp2_reserved_encodings() {
    // One FP2 column, four records per frame: 12 + 4*2 + 4 = 24
    let mut bytes = header("TOB3", "1000 MSEC", 24, 4, &["v"], &["FP2"]);
    let mut data = Vec::new();
    for raw in [0x1FFFu16, 0x9FFF, 0x9FFE, 0x0001] {
        data.extend_from_slice(&raw.to_be_bytes());
    }
    push_tob3_frame(&mut bytes, 0, 0, &data);

    let mut file = TobFile::from_bytes(bytes).unwrap();
    let table = file.read_all().unwrap();

    match table.column("v") {
        Some(Column::F32(v)) => {
            assert_eq!(v[0], f32::INFINITY);
            assert_eq!(v[1], f32::NEG_INFINITY);
            assert!(v[2].is_nan());
            assert_eq!(v[3], 1.0);
        }
        other => panic!("unexpected column {:?}", other),
    }
}

#[test]
fn truncated_final_frame_keeps_earlier_frames() {
    let mut data = Vec::new();
    for value in [1.0f32, 2.0, 3.0, 4.0] {
        data.extend_from_slice(&value.to_be_bytes());
    }

    // Cut the second frame at several points inside its 32 bytes
    for cut in [1, 11, 17, 31] {
        let mut bytes = header("TOB3", "1000 MSEC", 32, 4, &["a", "b"], &["IEEE4B", "IEEE4B"]);
        push_tob3_frame(&mut bytes, 0, 100, &data);

        let mut second = Vec::new();
        push_tob3_frame(&mut second, 2, 102, &data);
        bytes.extend_from_slice(&second[..cut]);

        let mut file = TobFile::from_bytes(bytes).unwrap();
        let table = file.read_all().unwrap();

        assert_eq!(table.nrows(), 2, "cut at {} bytes", cut);
        assert_eq!(
            table.column(RECORD_COLUMN),
            Some(&Column::U32(vec![100, 101]))
        );
        match file.warnings() {
            [CampbellWarning::TruncatedFrame {
                frame_index,
                expected,
                got,
            }] => {
                assert_eq!(*frame_index, 1);
                assert_eq!(*expected, 32);
                assert_eq!(*got, cut);
            }
            other => panic!("expected one truncation warning, got {:?}", other),
        }
    }
}

#[test]
fn chunked_decoding_splits_and_sorts() {
    // One IEEE4B column, one record per frame: 12 + 4 + 4 = 20
    let mut bytes = header("TOB3", "1000 MSEC", 20, 7, &["v"], &["IEEE4B"]);
    for k in 0..7u32 {
        push_tob3_frame(&mut bytes, k, k, &(k as f32).to_be_bytes());
    }

    let mut file = TobFile::from_bytes(bytes.clone()).unwrap();
    let chunks: Vec<Table> = file
        .chunks(Some(3))
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(
        chunks.iter().map(Table::nrows).collect::<Vec<_>>(),
        vec![3, 3, 1]
    );
    for chunk in &chunks {
        assert_evenly_spaced(chunk, TimeDelta::seconds(1));
    }

    // Concatenating the chunks reproduces the whole-file result
    let mut concatenated = Table::new();
    for chunk in chunks {
        concatenated.append(chunk);
    }
    let mut whole = TobFile::from_bytes(bytes).unwrap();
    assert_eq!(concatenated, whole.read_all().unwrap());
}

#[test]
fn output_never_exceeds_intended_table_size() {
    // Table sized for 2 frames (4 rows); the file holds 3 frames
    let mut bytes = header("TOB3", "1000 MSEC", 32, 4, &["a", "b"], &["IEEE4B", "IEEE4B"]);
    let mut data = Vec::new();
    for value in [1.0f32, 2.0, 3.0, 4.0] {
        data.extend_from_slice(&value.to_be_bytes());
    }
    for frame in 0..3u32 {
        push_tob3_frame(&mut bytes, frame * 2, 100 + frame * 2, &data);
    }

    let mut file = TobFile::from_bytes(bytes).unwrap();
    let table = file.read_all().unwrap();
    assert_eq!(table.nrows(), 4);
    assert!(file.warnings().is_empty());
}

#[test]
fn decoding_is_idempotent() {
    let mut bytes = header("TOB3", "100 MSEC", 32, 4, &["a", "b"], &["IEEE4B", "IEEE4B"]);
    let mut data = Vec::new();
    for value in [1.5f32, -2.5, 3.25, 0.0] {
        data.extend_from_slice(&value.to_be_bytes());
    }
    push_tob3_frame(&mut bytes, 0, 7, &data);

    let mut first = TobFile::from_bytes(bytes.clone()).unwrap();
    let mut second = TobFile::from_bytes(bytes).unwrap();
    assert_eq!(first.read_all().unwrap(), second.read_all().unwrap());
}

#[test]
fn round_trip_preserves_values() {
    // One record per frame over every decodable dtype:
    // row stride 8+4+4+2+1+1+2+8+4 = 34, frame 12 + 34 + 4 = 50
    let names = ["d", "l", "u", "s", "b", "flag", "f", "t", "note"];
    let dtypes = [
        "IEEE8B", "Long", "ULONG", "UINT2", "UINT1", "Boolean", "FP2", "NSEC", "ASCII(4)",
    ];
    let mut bytes = header("TOB3", "1000 MSEC", 50, 2, &names, &dtypes);

    let mut row0 = Vec::new();
    row0.extend_from_slice(&0.125f64.to_be_bytes());
    row0.extend_from_slice(&(-77i32).to_be_bytes());
    row0.extend_from_slice(&4_000_000_000u32.to_be_bytes());
    row0.extend_from_slice(&512u16.to_be_bytes());
    row0.push(9);
    row0.push(1);
    row0.extend_from_slice(&(0x2000u16 | 215).to_be_bytes()); // (S=0, E=1, M=215) = 21.5
    row0.extend_from_slice(&nsec(120, 250_000_000));
    row0.extend_from_slice(b"ab\0\0");

    let mut row1 = Vec::new();
    row1.extend_from_slice(&(-8.5f64).to_be_bytes());
    row1.extend_from_slice(&12i32.to_be_bytes());
    row1.extend_from_slice(&17u32.to_be_bytes());
    row1.extend_from_slice(&0u16.to_be_bytes());
    row1.push(0);
    row1.push(0);
    row1.extend_from_slice(&(0x8000u16 | 0x6000 | 3).to_be_bytes()); // (S=1, E=3, M=3) = -0.003
    row1.extend_from_slice(&nsec(121, 0));
    row1.extend_from_slice(b"wxyz");

    push_tob3_frame(&mut bytes, 0, 40, &row0);
    push_tob3_frame(&mut bytes, 1, 41, &row1);

    let mut file = TobFile::from_bytes(bytes).unwrap();
    let table = file.read_all().unwrap();

    assert_eq!(table.column("d"), Some(&Column::F64(vec![0.125, -8.5])));
    assert_eq!(table.column("l"), Some(&Column::I32(vec![-77, 12])));
    assert_eq!(table.column("u"), Some(&Column::U32(vec![4_000_000_000, 17])));
    assert_eq!(table.column("s"), Some(&Column::U16(vec![512, 0])));
    assert_eq!(table.column("b"), Some(&Column::U8(vec![9, 0])));
    assert_eq!(table.column("flag"), Some(&Column::Bool(vec![true, false])));
    assert_eq!(table.column("f"), Some(&Column::F32(vec![21.5, -0.003])));
    assert_eq!(
        table.column("t"),
        Some(&Column::Timestamp(vec![
            campbell_epoch() + TimeDelta::milliseconds(120_250),
            campbell_epoch() + TimeDelta::seconds(121),
        ])),
    );
    assert_eq!(
        table.column("note"),
        Some(&Column::Str(vec!["ab".to_string(), "wxyz".to_string()]))
    );
}

#[test]
fn clock_drift_warns_without_resync_by_default() {
    let mut bytes = header("TOB2", "1000 MSEC", 28, 4, &["a", "b"], &["IEEE4B", "IEEE4B"]);
    let mut data = Vec::new();
    for value in [1.0f32, 2.0, 3.0, 4.0] {
        data.extend_from_slice(&value.to_be_bytes());
    }
    // Second frame claims to start 100 s in, far past the 2.2 s threshold
    push_tob2_frame(&mut bytes, 0, &data);
    push_tob2_frame(&mut bytes, 100, &data);

    let mut file = TobFile::from_bytes(bytes).unwrap();
    let table = file.read_all().unwrap();

    // The reference clock keeps advancing by one frame duration per frame
    assert_eq!(table.column(TIMESTAMP_COLUMN), Some(&instants(&[0, 1, 2, 3])));
    match file.warnings() {
        [CampbellWarning::ClockDrift {
            frame_index,
            reported,
            expected,
        }] => {
            assert_eq!(*frame_index, 1);
            assert_eq!(*reported, campbell_epoch() + TimeDelta::seconds(100));
            assert_eq!(*expected, campbell_epoch() + TimeDelta::seconds(2));
        }
        other => panic!("expected one drift warning, got {:?}", other),
    }
}

#[test]
fn clock_drift_resyncs_when_enabled() {
    let mut bytes = header("TOB2", "1000 MSEC", 28, 4, &["a", "b"], &["IEEE4B", "IEEE4B"]);
    let mut data = Vec::new();
    for value in [1.0f32, 2.0, 3.0, 4.0] {
        data.extend_from_slice(&value.to_be_bytes());
    }
    push_tob2_frame(&mut bytes, 0, &data);
    push_tob2_frame(&mut bytes, 100, &data);

    let options = DecodeOptions {
        resync_on_clock_drift: true,
        ..DecodeOptions::default()
    };
    let mut file = TobFile::from_bytes_with(bytes, options).unwrap();
    let table = file.read_all().unwrap();

    assert_eq!(
        table.column(TIMESTAMP_COLUMN),
        Some(&instants(&[0, 1, 100, 101]))
    );
    assert_eq!(file.warnings().len(), 1);
}

#[test]
fn small_reported_drift_is_tolerated() {
    let mut bytes = header("TOB2", "1000 MSEC", 28, 4, &["a", "b"], &["IEEE4B", "IEEE4B"]);
    let mut data = Vec::new();
    for value in [1.0f32, 2.0, 3.0, 4.0] {
        data.extend_from_slice(&value.to_be_bytes());
    }
    push_tob2_frame(&mut bytes, 0, &data);
    // Reported start matches the expected cadence exactly
    push_tob2_frame(&mut bytes, 2, &data);

    let mut file = TobFile::from_bytes(bytes).unwrap();
    file.read_all().unwrap();
    assert!(file.warnings().is_empty());
}

#[test]
fn tob1_metadata_parses_but_frames_do_not() {
    // TOB1 frames: 8 + 2*8 + 4 = 28
    let mut bytes = header("TOB1", "1000 MSEC", 28, 4, &["a", "b"], &["IEEE4B", "IEEE4B"]);
    bytes.extend_from_slice(&[0u8; 28]);

    let mut file = TobFile::from_bytes(bytes).unwrap();
    assert_eq!(file.metadata().format, TobFormat::Tob1);
    assert!(matches!(
        file.read_all(),
        Err(CampbellError::UnsupportedFormat { .. })
    ));
}

#[test]
fn unknown_dtype_fails_at_open() {
    let bytes = header("TOB3", "1000 MSEC", 32, 4, &["a", "b"], &["IEEE4B", "FLOAT"]);
    assert!(matches!(
        TobFile::from_bytes(bytes),
        Err(CampbellError::UnknownDtype { .. })
    ));
}

#[test]
fn unsupported_interval_fails_at_open() {
    let bytes = header("TOB3", "10 HR", 32, 4, &["a", "b"], &["IEEE4B", "IEEE4B"]);
    assert!(matches!(
        TobFile::from_bytes(bytes),
        Err(CampbellError::UnsupportedInterval { .. })
    ));
}

#[test]
fn minute_interval_timestamps() {
    let mut bytes = header("TOB2", "30 MIN", 28, 4, &["a", "b"], &["IEEE4B", "IEEE4B"]);
    let mut data = Vec::new();
    for value in [1.0f32, 2.0, 3.0, 4.0] {
        data.extend_from_slice(&value.to_be_bytes());
    }
    push_tob2_frame(&mut bytes, 0, &data);

    let mut file = TobFile::from_bytes(bytes).unwrap();
    let table = file.read_all().unwrap();
    assert_evenly_spaced(&table, TimeDelta::minutes(30));
}
