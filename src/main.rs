use anyhow::{Context, Result};
use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::fs::File;
use std::io::{self, BufWriter, Read};
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use pcapparse_lib::{CaptureReader, Classifier, MacAddr, Matcher, OutputFormat, RecordWriter, records};

/// Extract device traffic events (timestamp, direction, length) from a PION
/// experiment packet trace.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The device is connected through the BLE bridge.
    #[arg(long)]
    ble: bool,
    /// The device runs in WiFi AP mode.
    #[arg(long)]
    ap: bool,
    /// The device runs in WiFi STA mode; the value is the access point's MAC address.
    #[arg(long, value_name = "AP_MAC")]
    sta: Option<MacAddr>,
    /// Capture file to read (pcap or pcapng). Reads standard input when omitted.
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Output format for the event log.
    #[arg(short, long, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Optional path to a file to write logs to, in addition to stderr.
    #[arg(short, long)]
    log_file: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
}

fn setup_logging(log_file_path: Option<PathBuf>, verbosity: &Verbosity<WarnLevel>) -> Result<Option<WorkerGuard>> {
    // stdout carries the event log, so logs go to stderr
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time();

    let (file_layer, guard) = if let Some(ref path) = log_file_path {
        let log_file = File::create(path).with_context(|| format!("Failed to create log file at: {:?}", path))?;
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(log_file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_ansi(false)
            .with_target(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_file_path {
        info!("Logging to file: {:?}", path);
    }

    Ok(guard)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let guard = setup_logging(cli.log_file.clone(), &cli.verbose)?;

    if let Err(e) = run(cli) {
        error!("pion-pcapparse failed: {:?}", e);
        drop(guard);
        process::exit(1);
    }

    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let matcher = Matcher::from_selection(cli.ble, cli.ap, cli.sta)?;
    info!(%matcher, "Matcher selected");

    let input: Box<dyn Read + Send> = match &cli.input {
        Some(path) => {
            Box::new(File::open(path).with_context(|| format!("Failed to open capture file: {:?}", path))?)
        }
        None => Box::new(io::stdin()),
    };
    let reader = CaptureReader::new(input).context("Failed to read capture header")?;

    let classifier = Classifier::new(matcher);
    let stdout = io::stdout();
    let mut writer = RecordWriter::new(BufWriter::new(stdout.lock()), cli.format);

    let mut frames = 0u64;
    let mut emitted = 0u64;
    let mut outcome = Ok(());
    for record in records(reader.inspect(|_| frames += 1), &classifier) {
        match record {
            Ok(record) => {
                writer.write(&record).context("Failed to write record")?;
                emitted += 1;
            }
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }

    // records classified before a capture error still reach the output
    writer.flush().context("Failed to flush output")?;
    outcome.context("Failed to read capture")?;

    info!(frames, records = emitted, "Capture processed");
    Ok(())
}
