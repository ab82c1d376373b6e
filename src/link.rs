//! Link-layer framing of captured frames.
//!
//! Maps pcap link types onto the three framings the sniffer understands and
//! recovers the true IP length of short Ethernet frames, which the network
//! pads to the 60-byte minimum.

use std::fmt;

use crate::constants::{
    DLT_RAW_ALIASES, ETHER_FRAME_MIN_LEN, ETHER_HDR_LEN, IPV4_MIN_HEADER_LENGTH_BYTES,
    IPV6_HEADER_LENGTH_BYTES, LINKTYPE_ETHERNET, LINKTYPE_LINUX_SLL, LINKTYPE_RAW,
    LINUX_COOKED_HDR_LEN,
};
use crate::error::CaptureError;

/// Framing of the frames delivered by a capture source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkLayer {
    /// Ethernet II, 14-byte header.
    Ethernet,
    /// Linux cooked capture, 16-byte header.
    LinuxCooked,
    /// Raw IP, no link header.
    Raw,
}

impl LinkLayer {
    /// Maps a pcap link type to a supported framing.
    ///
    /// # Errors
    /// - [`CaptureError::UnsupportedLinkType`] for anything other than
    ///   Ethernet, Linux cooked or raw IP.
    pub fn from_linktype(linktype: i32) -> Result<Self, CaptureError> {
        match linktype {
            LINKTYPE_ETHERNET => Ok(LinkLayer::Ethernet),
            LINKTYPE_LINUX_SLL => Ok(LinkLayer::LinuxCooked),
            LINKTYPE_RAW => Ok(LinkLayer::Raw),
            other if DLT_RAW_ALIASES.contains(&other) => Ok(LinkLayer::Raw),
            other => Err(CaptureError::UnsupportedLinkType(other)),
        }
    }

    /// The pcap link type written to dump files.
    pub const fn linktype(self) -> i32 {
        match self {
            LinkLayer::Ethernet => LINKTYPE_ETHERNET,
            LinkLayer::LinuxCooked => LINKTYPE_LINUX_SLL,
            LinkLayer::Raw => LINKTYPE_RAW,
        }
    }

    /// Number of bytes preceding the IP header.
    pub const fn header_len(self) -> usize {
        match self {
            LinkLayer::Ethernet => ETHER_HDR_LEN,
            LinkLayer::LinuxCooked => LINUX_COOKED_HDR_LEN,
            LinkLayer::Raw => 0,
        }
    }
}

impl fmt::Display for LinkLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkLayer::Ethernet => f.write_str("Ethernet"),
            LinkLayer::LinuxCooked => f.write_str("Linux cooked"),
            LinkLayer::Raw => f.write_str("raw IP"),
        }
    }
}

/// Length the IP packet at the start of `ip_payload` claims to have.
///
/// Returns `None` when the version nibble is neither 4 nor 6, or the header
/// is too short to hold the length field.
pub fn declared_ip_length(ip_payload: &[u8]) -> Option<usize> {
    match ip_payload.first()? >> 4 {
        4 if ip_payload.len() >= 4 => {
            Some(usize::from(u16::from_be_bytes([ip_payload[2], ip_payload[3]])))
        }
        6 if ip_payload.len() >= 6 => Some(
            IPV6_HEADER_LENGTH_BYTES + usize::from(u16::from_be_bytes([ip_payload[4], ip_payload[5]])),
        ),
        _ => None,
    }
}

/// Returns the true IP length of an Ethernet frame padded to the minimum
/// frame size, or `None` when the payload must be used as is.
///
/// Only frames of exactly [`ETHER_FRAME_MIN_LEN`] bytes on an Ethernet link
/// are candidates. The trim applies when the IP length is shorter than the
/// payload and still covers a minimal IP header.
pub fn ethernet_padding_trim(
    link_layer: LinkLayer,
    frame_len: usize,
    ip_payload: &[u8],
) -> Option<usize> {
    if link_layer != LinkLayer::Ethernet || frame_len != ETHER_FRAME_MIN_LEN {
        return None;
    }
    let minimal_header = match ip_payload.first()? >> 4 {
        4 => IPV4_MIN_HEADER_LENGTH_BYTES,
        6 => IPV6_HEADER_LENGTH_BYTES,
        _ => return None,
    };
    let true_len = declared_ip_length(ip_payload)?;
    (true_len < ip_payload.len() && true_len >= minimal_header).then_some(true_len)
}
