//! Flow identification and profile preference for IP packets.
//!
//! The compressor keys its contexts on a [`FlowKey`] and asks
//! [`preferred_profile`] which profile a new flow would ideally use.
//! Parsing is lenient: anything that is not a well-formed IPv4 or IPv6
//! header still compresses, under [`FlowKey::Other`].

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::constants::{
    IP_PROTOCOL_ESP, IP_PROTOCOL_TCP, IP_PROTOCOL_UDP, IP_PROTOCOL_UDPLITE,
    IPV4_MIN_HEADER_LENGTH_BYTES, IPV6_HEADER_LENGTH_BYTES, UDP_HEADER_LENGTH_BYTES,
};
use crate::engine::{EngineCallbacks, RohcProfile};

/// Parsed view of the network header of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpHeaderView {
    pub version: u8,
    pub header_len: usize,
    pub protocol: u8,
    pub source: IpAddr,
    pub destination: IpAddr,
}

impl IpHeaderView {
    /// Parses the IPv4 or IPv6 header at the start of `packet`.
    ///
    /// IPv6 extension headers are not walked: `protocol` is the first next
    /// header value.
    pub fn parse(packet: &[u8]) -> Option<Self> {
        match packet.first()? >> 4 {
            4 => {
                let header_len = usize::from(packet[0] & 0x0F) * 4;
                if header_len < IPV4_MIN_HEADER_LENGTH_BYTES || packet.len() < header_len {
                    return None;
                }
                let source: [u8; 4] = packet[12..16].try_into().ok()?;
                let destination: [u8; 4] = packet[16..20].try_into().ok()?;
                Some(Self {
                    version: 4,
                    header_len,
                    protocol: packet[9],
                    source: IpAddr::V4(Ipv4Addr::from(source)),
                    destination: IpAddr::V4(Ipv4Addr::from(destination)),
                })
            }
            6 => {
                if packet.len() < IPV6_HEADER_LENGTH_BYTES {
                    return None;
                }
                let source: [u8; 16] = packet[8..24].try_into().ok()?;
                let destination: [u8; 16] = packet[24..40].try_into().ok()?;
                Some(Self {
                    version: 6,
                    header_len: IPV6_HEADER_LENGTH_BYTES,
                    protocol: packet[6],
                    source: IpAddr::V6(Ipv6Addr::from(source)),
                    destination: IpAddr::V6(Ipv6Addr::from(destination)),
                })
            }
            _ => None,
        }
    }

    /// Source and destination ports, for transports that carry them.
    pub fn ports(&self, packet: &[u8]) -> Option<(u16, u16)> {
        if !matches!(
            self.protocol,
            IP_PROTOCOL_UDP | IP_PROTOCOL_UDPLITE | IP_PROTOCOL_TCP
        ) {
            return None;
        }
        let transport = packet.get(self.header_len..self.header_len + 4)?;
        Some((
            u16::from_be_bytes([transport[0], transport[1]]),
            u16::from_be_bytes([transport[2], transport[3]]),
        ))
    }
}

/// Identity of a compressed flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKey {
    /// An IP flow, keyed on addresses, protocol and ports.
    Ip {
        version: u8,
        protocol: u8,
        source: IpAddr,
        destination: IpAddr,
        ports: Option<(u16, u16)>,
    },
    /// Anything that does not parse as IP shares a single flow.
    Other,
}

impl FlowKey {
    /// Derives the flow key of `packet`.
    pub fn from_packet(packet: &[u8]) -> Self {
        match IpHeaderView::parse(packet) {
            Some(ip) => FlowKey::Ip {
                version: ip.version,
                protocol: ip.protocol,
                source: ip.source,
                destination: ip.destination,
                ports: ip.ports(packet),
            },
            None => FlowKey::Other,
        }
    }
}

/// The IP header, UDP header and UDP payload of a UDP packet.
pub fn udp_parts<'a>(packet: &'a [u8], ip: &IpHeaderView) -> Option<(&'a [u8], &'a [u8], &'a [u8])> {
    if ip.protocol != IP_PROTOCOL_UDP {
        return None;
    }
    let udp_end = ip.header_len + UDP_HEADER_LENGTH_BYTES;
    if packet.len() < udp_end {
        return None;
    }
    Some((
        &packet[..ip.header_len],
        &packet[ip.header_len..udp_end],
        &packet[udp_end..],
    ))
}

/// Profile a new flow would ideally be compressed with.
///
/// UDP flows are offered to the RTP classifier through the callbacks.
pub fn preferred_profile(packet: &[u8], callbacks: &dyn EngineCallbacks) -> RohcProfile {
    let Some(ip) = IpHeaderView::parse(packet) else {
        return RohcProfile::Uncompressed;
    };
    match ip.protocol {
        IP_PROTOCOL_UDP => match udp_parts(packet, &ip) {
            Some((ip_header, udp_header, payload))
                if callbacks.detect_rtp(ip_header, udp_header, payload) =>
            {
                RohcProfile::RtpUdpIp
            }
            _ => RohcProfile::UdpIp,
        },
        IP_PROTOCOL_UDPLITE => RohcProfile::UdpLiteIp,
        IP_PROTOCOL_ESP => RohcProfile::EspIp,
        _ => RohcProfile::Ip,
    }
}
