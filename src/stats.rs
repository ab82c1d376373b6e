//! Per-run packet counters.

use std::fmt;

use serde::Serialize;

use crate::pipeline::PacketOutcome;
use crate::types::ContextId;

/// Counters of a sniffer run. Only ever increase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    pub packets: u64,
    pub successes: u64,
    pub compression_failures: u64,
    pub decompression_failures: u64,
    pub mismatches: u64,
    pub engine_info_failures: u64,
    pub malformed_captures: u64,
    pub dump_failures: u64,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one processed packet.
    pub fn record(&mut self, outcome: &PacketOutcome) {
        self.packets += 1;
        let counter = match outcome {
            PacketOutcome::Success { .. } => &mut self.successes,
            PacketOutcome::CompressionFailure { .. } => &mut self.compression_failures,
            PacketOutcome::DecompressionFailure { .. } => &mut self.decompression_failures,
            PacketOutcome::Mismatch { .. } => &mut self.mismatches,
            PacketOutcome::MalformedCapture { .. } => &mut self.malformed_captures,
            PacketOutcome::EngineInfoUnavailable { .. } => &mut self.engine_info_failures,
            PacketOutcome::DumpFailure { .. } => &mut self.dump_failures,
        };
        *counter += 1;
    }

    /// Failures that are neither compression, decompression, mismatch nor
    /// capture problems.
    pub fn internal_failures(&self) -> u64 {
        self.engine_info_failures + self.dump_failures
    }

    /// Whether every packet went through successfully.
    pub fn all_succeeded(&self) -> bool {
        self.successes == self.packets
    }

    /// Console line printed when the run halts on `cid`.
    pub fn halt_line(&self, cid: Option<ContextId>) -> HaltLine<'_> {
        HaltLine { stats: self, cid }
    }
}

/// Display adapter for the statistics line printed on halt.
#[derive(Debug)]
pub struct HaltLine<'a> {
    stats: &'a RunStatistics,
    cid: Option<ContextId>,
}

impl fmt::Display for HaltLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats;
        write!(
            f,
            "packet #{}, CID {}: stats OK, ERR(COMP), ERR(DECOMP), ERR(REF), ERR(BAD), \
             ERR(INTERNAL)\t=\t{}\t{}\t{}\t{}\t{}\t{}",
            stats.packets,
            self.cid.map_or(0, ContextId::value),
            stats.successes,
            stats.compression_failures,
            stats.decompression_failures,
            stats.mismatches,
            stats.malformed_captures,
            stats.internal_failures(),
        )
    }
}
