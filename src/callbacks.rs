//! Engine callbacks provided by the sniffer.

use std::fmt;

use crate::classifier::looks_like_rtp;
use crate::engine::{EngineCallbacks, RohcProfile};
use crate::trace::{TraceEntity, TraceLevel, TraceSink};

/// Routes engine traces into the session's [`TraceSink`].
///
/// Random numbers are fixed at 0 so that runs over the same capture are
/// reproducible.
#[derive(Debug, Clone)]
pub struct SnifferCallbacks {
    traces: TraceSink,
}

impl SnifferCallbacks {
    pub fn new(traces: TraceSink) -> Self {
        Self { traces }
    }
}

impl EngineCallbacks for SnifferCallbacks {
    fn trace(
        &self,
        level: TraceLevel,
        entity: TraceEntity,
        profile: Option<RohcProfile>,
        message: fmt::Arguments<'_>,
    ) {
        self.traces.record(level, entity, profile, message);
    }

    fn random_number(&self) -> u32 {
        0
    }

    fn detect_rtp(&self, ip_header: &[u8], udp_header: &[u8], payload: &[u8]) -> bool {
        looks_like_rtp(ip_header, udp_header, payload)
    }
}
