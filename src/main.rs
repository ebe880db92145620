//! CLI entry point: decode a Campbell table file to CSV.

use std::path::{Path, PathBuf};

use clap::Parser;

use camp2ascii::{DecodeOptions, TobFile};

/// Convert Campbell Scientific datalogger files (TOB2/TOB3/TOA5) to CSV.
#[derive(Parser)]
#[command(name = "camp2ascii")]
struct Args {
    /// Input table file
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Output CSV file
    #[arg(short = 'o', long = "output", required_unless_present = "metadata")]
    output: Option<PathBuf>,

    /// Rows per output chunk (bounds memory; whole file when omitted)
    #[arg(long)]
    chunksize: Option<usize>,

    /// Print file metadata as JSON to stdout and exit
    #[arg(long)]
    metadata: bool,

    /// Keep raw NSEC nanoseconds instead of truncating to milliseconds
    #[arg(long)]
    raw_nanoseconds: bool,

    /// Re-sync the reference clock when the logger clock drifts
    #[arg(long)]
    resync_clock: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let options = DecodeOptions {
        truncate_nsec_to_millis: !args.raw_nanoseconds,
        resync_on_clock_drift: args.resync_clock,
    };

    let mut file = TobFile::open_with(&args.input, options)?;

    if args.metadata {
        println!("{}", serde_json::to_string_pretty(file.metadata())?);
        return Ok(());
    }

    let output = match args.output.as_deref() {
        Some(path) => path,
        // clap enforces --output when --metadata is absent
        None => return Ok(()),
    };
    write_csv(output, &mut file, args.chunksize)?;

    log::info!(
        "wrote {} ({} warnings)",
        output.display(),
        file.warnings().len()
    );
    Ok(())
}

/// Stream decoded chunks into a CSV file.
fn write_csv(
    path: &Path,
    file: &mut TobFile,
    chunksize: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut wrote_header = false;

    for chunk in file.chunks(chunksize) {
        let chunk = chunk?;
        if !wrote_header {
            writer.write_record(chunk.names())?;
            wrote_header = true;
        }
        for row in 0..chunk.nrows() {
            writer.write_record(chunk.iter().map(|(_, column)| column.render(row)))?;
        }
    }

    writer.flush()?;
    Ok(())
}
