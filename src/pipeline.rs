//! The compress, decompress and verify round trip of one captured frame.
//!
//! [`Pipeline::process`] never fails: every way a frame can go wrong is a
//! [`PacketOutcome`] variant, and the session decides what to do with it.

use std::fmt;

use tracing::{debug, warn};

use crate::capture::CapturedFrame;
use crate::compare::{DiffReport, PacketComparison, compare_packets};
use crate::dumps::DumpTable;
use crate::engine::EnginePair;
use crate::error::{DumpError, EngineError};
use crate::link::{LinkLayer, ethernet_padding_trim};
use crate::types::ContextId;

/// Result of processing one frame.
#[derive(Debug)]
pub enum PacketOutcome {
    /// The decompressed packet is identical to the original.
    Success { cid: ContextId },
    /// The compressor failed or produced nothing. `error` is `None` for an
    /// empty output.
    CompressionFailure { error: Option<EngineError> },
    /// The decompressor failed or produced nothing.
    DecompressionFailure {
        cid: ContextId,
        error: Option<EngineError>,
    },
    /// The decompressed packet differs from the original.
    Mismatch { cid: ContextId, report: DiffReport },
    /// The frame is shorter than its link header or was truncated by the
    /// capture.
    MalformedCapture { declared: u32, captured: usize },
    /// The compressor could not describe the packet it just compressed, or
    /// named a CID outside the configured range.
    EngineInfoUnavailable { error: EngineError },
    /// The frame could not be written to the dump file of its context.
    DumpFailure { cid: ContextId, error: DumpError },
}

impl PacketOutcome {
    /// Context the frame was compressed in, when known.
    pub fn cid(&self) -> Option<ContextId> {
        match self {
            PacketOutcome::Success { cid }
            | PacketOutcome::DecompressionFailure { cid, .. }
            | PacketOutcome::Mismatch { cid, .. }
            | PacketOutcome::DumpFailure { cid, .. } => Some(*cid),
            PacketOutcome::CompressionFailure { .. }
            | PacketOutcome::MalformedCapture { .. }
            | PacketOutcome::EngineInfoUnavailable { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PacketOutcome::Success { .. })
    }
}

impl fmt::Display for PacketOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketOutcome::Success { cid } => write!(f, "packet round-tripped in {cid}"),
            PacketOutcome::CompressionFailure { error: Some(e) } => {
                write!(f, "compression failed: {e}")
            }
            PacketOutcome::CompressionFailure { error: None } => {
                write!(f, "compression produced an empty packet")
            }
            PacketOutcome::DecompressionFailure {
                cid,
                error: Some(e),
            } => write!(f, "decompression failed in {cid}: {e}"),
            PacketOutcome::DecompressionFailure { cid, error: None } => {
                write!(f, "decompression produced an empty packet in {cid}")
            }
            PacketOutcome::Mismatch { cid, report } => write!(
                f,
                "decompressed packet differs from the original in {cid} (first difference at byte {})",
                report.first_difference()
            ),
            PacketOutcome::MalformedCapture { declared, captured } => write!(
                f,
                "malformed frame: {declared} bytes on the wire, {captured} bytes captured"
            ),
            PacketOutcome::EngineInfoUnavailable { error } => {
                write!(f, "cannot get compression info: {error}")
            }
            PacketOutcome::DumpFailure { cid, error } => {
                write!(f, "cannot dump frame of {cid}: {error}")
            }
        }
    }
}

/// Drives one frame at a time through an engine pair.
#[derive(Debug)]
pub struct Pipeline {
    link_layer: LinkLayer,
    engines: EnginePair,
    max_cid: ContextId,
}

impl Pipeline {
    /// Creates a pipeline for frames framed as `link_layer`.
    ///
    /// CIDs reported by the compressor above `max_cid` are treated as an
    /// engine failure.
    pub fn new(link_layer: LinkLayer, engines: EnginePair, max_cid: ContextId) -> Self {
        Self {
            link_layer,
            engines,
            max_cid,
        }
    }

    /// Runs one frame through compression, dump bookkeeping, decompression
    /// and comparison.
    ///
    /// # Parameters
    /// - `frame`: The captured frame, link-layer header included.
    /// - `dumps`: Dump table receiving the frame.
    ///
    /// # Returns
    /// The first failure encountered, or [`PacketOutcome::Success`].
    pub fn process(&mut self, frame: &CapturedFrame, dumps: &mut DumpTable) -> PacketOutcome {
        let header_len = self.link_layer.header_len();
        let declared = frame.declared_len;
        if usize::try_from(declared).is_ok_and(|len| len <= header_len) || frame.is_truncated() {
            warn!(
                declared,
                captured = frame.captured_len(),
                link_header = header_len,
                "bad packet captured"
            );
            return PacketOutcome::MalformedCapture {
                declared,
                captured: frame.captured_len(),
            };
        }

        let mut ip_packet = &frame.data[header_len..];
        if let Some(true_len) =
            ethernet_padding_trim(self.link_layer, frame.captured_len(), ip_packet)
        {
            warn!(
                padding = ip_packet.len() - true_len,
                "Ethernet frame has padding, trimming it"
            );
            ip_packet = &ip_packet[..true_len];
        }

        let rohc_packet = match self.engines.compressor.compress(ip_packet) {
            Ok(rohc_packet) if !rohc_packet.is_empty() => rohc_packet,
            result => {
                let error = result.err();
                if let Err(e) = dumps.dump_fallback(frame) {
                    warn!(error = %e, "failed to dump rejected frame");
                }
                return PacketOutcome::CompressionFailure { error };
            }
        };

        let info = match self.engines.compressor.last_packet_info() {
            Ok(info) if info.context_id > self.max_cid => {
                return PacketOutcome::EngineInfoUnavailable {
                    error: EngineError::CidOutOfRange {
                        cid: info.context_id,
                        max_cid: self.max_cid,
                    },
                };
            }
            Ok(info) => info,
            Err(error) => return PacketOutcome::EngineInfoUnavailable { error },
        };
        let cid = info.context_id;
        debug!(
            %cid,
            new_context = info.is_new_context,
            kind = ?info.packet_kind,
            uncompressed = info.uncompressed_len,
            compressed = info.compressed_len,
            "packet compressed"
        );

        if info.is_new_context {
            if let Err(error) = dumps.reinitialize(cid) {
                return PacketOutcome::DumpFailure { cid, error };
            }
        }
        if let Err(error) = dumps.append(cid, frame) {
            return PacketOutcome::DumpFailure { cid, error };
        }

        let decompressed = match self.engines.decompressor.decompress(&rohc_packet) {
            Ok(packet) if !packet.is_empty() => packet,
            result => {
                return PacketOutcome::DecompressionFailure {
                    cid,
                    error: result.err(),
                };
            }
        };

        match compare_packets(ip_packet, &decompressed) {
            PacketComparison::Equal => PacketOutcome::Success { cid },
            PacketComparison::Different(report) => PacketOutcome::Mismatch { cid, report },
        }
    }
}
