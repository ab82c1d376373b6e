//! `rohcstar-sniffer`: verifies a ROHC engine against live traffic.
//!
//! Every captured IP packet is compressed, decompressed and compared with the
//! original. The first packet that does not survive the round trip halts the
//! run with a diagnostic dump: the statistics so far, a hex comparison when
//! the bytes differ, and the last engine traces. Frames are also written to
//! one pcap file per ROHC context so a failing stream can be replayed.
//!
//! ## Core Concepts
//!
//! - **[`Session`]**: Owns a capture source, the engines and the dump files,
//!   and runs the capture loop until the stream ends, a stop is requested or
//!   a packet fails.
//! - **[`Pipeline`]**: The round trip of one frame, from link-layer stripping
//!   to comparison. Every failure is a [`PacketOutcome`].
//! - **Engines**: Anything implementing [`Compressor`] and [`Decompressor`].
//!   The crate ships the ROHC Uncompressed profile.
//! - **[`TraceSink`]**: Keeps the last engine traces for post-mortem output.
//!
//! ## Quick Start
//!
//! ```no_run
//! use rohcstar_sniffer::{CidType, PcapFileSource, Session, SessionConfig, SessionEnd, StopFlag};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::with_defaults(CidType::Small, ".")?;
//!     let source = PcapFileSource::open("capture.pcap")?;
//!     let session = Session::with_uncompressed_engine(&config, source, StopFlag::new())?;
//!     match session.run() {
//!         SessionEnd::Completed(summary) => println!("{} packets OK", summary.stats.successes),
//!         SessionEnd::Halted(report) => eprintln!("halted: {}", report.outcome),
//!     }
//!     Ok(())
//! }
//! ```

pub mod callbacks;
pub mod capture;
pub mod classifier;
pub mod compare;
pub mod config;
pub mod constants;
pub mod crc;
pub mod dumps;
pub mod engine;
pub mod error;
pub mod link;
pub mod pipeline;
pub mod session;
pub mod stats;
pub mod trace;
pub mod types;

pub use callbacks::SnifferCallbacks;
pub use capture::{CaptureSource, CapturedFrame, LiveCapture, PcapDumper, PcapFileSource, StopFlag};
pub use classifier::looks_like_rtp;
pub use compare::{DiffReport, PacketComparison, compare_packets};
pub use config::SessionConfig;
pub use dumps::DumpTable;
pub use engine::{
    Compressor, Decompressor, EngineCallbacks, EngineConfig, EnginePair, LastPacketInfo,
    PacketKind, RohcProfile,
};
pub use error::{CaptureError, ConfigError, DumpError, EngineError, SnifferError};
pub use link::LinkLayer;
pub use pipeline::{PacketOutcome, Pipeline};
pub use session::{HaltReport, Session, SessionEnd, SessionSummary};
pub use stats::RunStatistics;
pub use trace::{TraceEntity, TraceLevel, TraceRingBuffer, TraceSink};
pub use types::{CidType, ContextId};
