//! Frame sources and the pcap dump writer.
//!
//! A [`CaptureSource`] yields [`CapturedFrame`]s one at a time together with
//! the link-layer framing they use. Two sources are provided: [`LiveCapture`]
//! reads from a network interface, [`PcapFileSource`] replays a legacy pcap
//! file. [`PcapDumper`] writes frames back out in the same legacy format.

mod dump;
mod live;
mod offline;

pub use dump::PcapDumper;
pub use live::LiveCapture;
pub use offline::PcapFileSource;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;

use crate::error::CaptureError;
use crate::link::LinkLayer;

/// One frame as delivered by a capture source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    /// Captured bytes, link-layer header included.
    pub data: Bytes,
    /// Length of the frame on the wire.
    pub declared_len: u32,
    /// Capture timestamp, seconds.
    pub ts_sec: u32,
    /// Capture timestamp, microseconds.
    pub ts_usec: u32,
}

impl CapturedFrame {
    /// Creates a frame whose declared length matches the captured bytes.
    pub fn new(data: impl Into<Bytes>, ts_sec: u32, ts_usec: u32) -> Self {
        let data = data.into();
        let declared_len = u32::try_from(data.len()).unwrap_or(u32::MAX);
        Self {
            data,
            declared_len,
            ts_sec,
            ts_usec,
        }
    }

    /// Number of bytes actually captured.
    pub fn captured_len(&self) -> usize {
        self.data.len()
    }

    /// Whether the capture truncated the frame (or overstated its length).
    pub fn is_truncated(&self) -> bool {
        usize::try_from(self.declared_len).map_or(true, |declared| declared != self.data.len())
    }
}

/// Source of captured frames.
pub trait CaptureSource {
    /// Framing of every frame this source yields.
    fn link_layer(&self) -> LinkLayer;

    /// Returns the next frame, or `None` at the end of the stream.
    ///
    /// Live sources also return `None` once a stop has been requested.
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError>;
}

impl<S: CaptureSource + ?Sized> CaptureSource for Box<S> {
    fn link_layer(&self) -> LinkLayer {
        (**self).link_layer()
    }

    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError> {
        (**self).next_frame()
    }
}

/// Cooperative cancellation token shared with the signal handler.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    /// Creates a flag in the "keep running" state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the session to stop after the current packet.
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
