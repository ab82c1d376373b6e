//! Error types for the sniffer.
//!
//! Per-packet failures are not errors: they are reported as
//! [`PacketOutcome`](crate::pipeline::PacketOutcome) values and halt the
//! session. The types here cover everything that can go wrong around them:
//! capture I/O, dump files, engine operations and configuration.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::{CidType, ContextId};

/// Errors raised by a capture source.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The requested network interface does not exist.
    #[error("network device '{0}' not found")]
    DeviceNotFound(String),

    /// The capture channel or file could not be opened.
    #[error("failed to open capture on '{device}': {source}")]
    Open {
        device: String,
        #[source]
        source: io::Error,
    },

    /// The link layer of the capture is not Ethernet, Linux cooked or raw IP.
    #[error("link layer type {0} not supported (supported = 1, 113, 101)")]
    UnsupportedLinkType(i32),

    /// The capture file is not a valid legacy pcap stream.
    #[error("pcap parse error: {0}")]
    Pcap(String),

    /// Reading the next frame failed.
    #[error("capture read failed: {0}")]
    Read(#[from] io::Error),
}

/// Errors raised while writing capture dump files.
#[derive(Error, Debug)]
pub enum DumpError {
    /// The dump file could not be created.
    #[error("failed to open dump file '{}': {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Appending a frame or flushing failed.
    #[error("failed to write dump file '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The replaced dump file could not be removed.
    #[error("failed to remove dump file '{}': {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The engine reported a CID the dump table was not sized for.
    #[error("{cid} is outside the dump table ({capacity} contexts)")]
    ContextOutOfRange { cid: ContextId, capacity: usize },
}

/// Errors reported by a compression engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine configuration is inconsistent.
    #[error("invalid engine configuration: {0}")]
    Configuration(String),

    /// Input ended before a complete structure could be read.
    #[error("Incomplete packet data: needed {needed} bytes, got {got} for {context}")]
    NotEnoughData {
        needed: usize,
        got: usize,
        context: &'static str,
    },

    /// The ROHC packet type discriminator is not valid here.
    #[error("Invalid ROHC packet type discriminator: 0x{0:02X}")]
    InvalidPacketType(u8),

    /// The packet names a profile the engine does not implement.
    #[error("Unsupported ROHC profile: 0x{0:02X}")]
    UnsupportedProfile(u8),

    /// The packet carries a CID above the configured maximum.
    #[error("{cid} exceeds MAX_CID {max_cid}")]
    CidOutOfRange { cid: ContextId, max_cid: ContextId },

    /// No context exists for a packet that requires one.
    #[error("Context not found for {0}")]
    ContextNotFound(ContextId),

    /// CRC validation of an IR header failed.
    #[error("CRC mismatch: expected 0x{expected:02X}, got 0x{calculated:02X}")]
    CrcMismatch { expected: u8, calculated: u8 },

    /// `last_packet_info` was queried before any packet was compressed.
    #[error("no packet compressed yet")]
    NoPacketCompressed,
}

/// Errors in the sniffer configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The maximum number of contexts does not fit the CID type.
    #[error("the maximum number of ROHC contexts should be between 1 and {max} for {cid_type}")]
    MaxContextsOutOfRange {
        cid_type: CidType,
        requested: u32,
        max: u32,
    },

    /// The dump directory is missing or not a directory.
    #[error("dump directory '{}' does not exist", .0.display())]
    DumpDirMissing(PathBuf),
}

/// Top-level error for setting up a sniffer session.
#[derive(Error, Debug)]
pub enum SnifferError {
    /// Error in the capture source.
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Error in the dump files.
    #[error(transparent)]
    Dump(#[from] DumpError),

    /// Error in the engine.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Error in the configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
