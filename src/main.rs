//! `rohcstar-sniffer` command line.
//!
//! Captures packets on a network interface (or replays a pcap file with
//! `--offline`) and round-trips each one through the ROHC engine. Aborts on
//! the first packet that fails so the core dump shows the engine state.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rohcstar_sniffer::{
    CaptureSource, CidType, LiveCapture, PcapFileSource, Session, SessionConfig, SessionEnd,
    StopFlag,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Round-trip live IP traffic through a ROHC compressor and decompressor",
    long_about = None,
    disable_version_flag = true
)]
struct CliArgs {
    /// CID encoding used by the engine.
    #[arg(value_enum)]
    cid_type: CliCidType,

    /// Network interface to capture on, or a pcap file with --offline.
    device: String,

    /// Print version information.
    #[arg(short = 'v', long, action = clap::ArgAction::Version)]
    version: Option<bool>,

    /// Print every engine trace and enable debug logging.
    #[arg(long)]
    verbose: bool,

    /// Maximum number of ROHC contexts (1-16 for smallcid, 1-16384 for largecid).
    #[arg(long, value_name = "NUM", default_value_t = 16)]
    max_contexts: u32,

    /// Read packets from the pcap file DEVICE instead of a network interface.
    #[arg(long)]
    offline: bool,

    /// Directory receiving the per-context dump files.
    #[arg(long, value_name = "DIR", default_value = ".")]
    dump_dir: PathBuf,

    /// Exit with status 1 instead of aborting when a packet fails.
    #[arg(long)]
    no_abort: bool,

    /// Print the final statistics as JSON.
    #[arg(long)]
    json: bool,

    /// Do not print the packet counter.
    #[arg(long)]
    no_progress: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliCidType {
    /// Small CIDs (0-15).
    #[value(name = "smallcid")]
    Small,
    /// Large CIDs (0-16383).
    #[value(name = "largecid")]
    Large,
}

impl From<CliCidType> for CidType {
    fn from(value: CliCidType) -> Self {
        match value {
            CliCidType::Small => CidType::Small,
            CliCidType::Large => CidType::Large,
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Help and version go to stdout with status 0, usage errors to
            // stderr with status 1.
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    init_logging(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs) -> Result<ExitCode> {
    let config = SessionConfig::new(args.cid_type.into(), args.max_contexts, &args.dump_dir)?
        .verbose(args.verbose)
        .progress(!args.no_progress);

    let stop = StopFlag::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || handler_stop.request_stop())
        .context("failed to install the signal handler")?;

    let source: Box<dyn CaptureSource> = if args.offline {
        Box::new(
            PcapFileSource::open(&args.device)
                .with_context(|| format!("failed to open pcap file '{}'", args.device))?,
        )
    } else {
        Box::new(
            LiveCapture::open(&args.device, stop.clone())
                .with_context(|| format!("failed to open network device '{}'", args.device))?,
        )
    };
    info!(
        cid_type = %config.cid_type(),
        max_contexts = config.max_contexts(),
        link_layer = %source.link_layer(),
        "starting capture"
    );

    let session = Session::with_uncompressed_engine(&config, source, stop)
        .context("failed to configure the ROHC engine")?;

    match session.run() {
        SessionEnd::Completed(summary) => {
            if summary.stopped_by_signal {
                println!("program stopped by signal");
            }
            for cid in &summary.used_contexts {
                println!("close dump file for context with ID {}", cid.value());
            }
            if let Some(e) = &summary.capture_error {
                error!(error = %e, "capture ended with an error");
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary.stats)?);
            }
            Ok(ExitCode::SUCCESS)
        }
        SessionEnd::Halted(report) => {
            error!(packet = report.packet_number, "a packet failed the round trip, halting");
            if args.no_abort {
                Ok(ExitCode::FAILURE)
            } else {
                std::process::abort();
            }
        }
    }
}
