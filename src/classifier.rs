//! Heuristic detection of voice RTP traffic inside UDP datagrams.
//!
//! The engine asks this predicate whether a new UDP flow should be compressed
//! with the RTP profile. It is deliberately narrow: it only accepts small
//! datagrams on even ports whose payload looks like an RTP version 2 header
//! carrying one of a few common voice codecs.

use crate::constants::{
    RTP_DETECT_MAX_UDP_LENGTH, RTP_DETECT_PAYLOAD_TYPES, RTP_MIN_HEADER_LENGTH_BYTES, RTP_VERSION,
    SIP_PORT, UDP_HEADER_LENGTH_BYTES,
};

/// Returns `true` when the UDP payload is plausibly voice RTP.
///
/// # Parameters
/// - `_ip_header`: The IP header of the packet; not consulted by the heuristic.
/// - `udp_header`: The 8-byte UDP header (ports and length in network order).
/// - `payload`: The UDP payload.
///
/// # Returns
/// `false` as soon as one of these holds, `true` otherwise:
/// 1. both ports are the SIP port (5060);
/// 2. the destination port is odd (RTCP uses the odd port);
/// 3. the UDP length field is larger than 200 bytes;
/// 4. the payload is shorter than an RTP header;
/// 5. the RTP version bits are not `10`;
/// 6. the payload type is not GSM, G.723, G.729 or telephony-event.
pub fn looks_like_rtp(_ip_header: &[u8], udp_header: &[u8], payload: &[u8]) -> bool {
    if udp_header.len() < UDP_HEADER_LENGTH_BYTES {
        return false;
    }

    let source_port = u16::from_be_bytes([udp_header[0], udp_header[1]]);
    let destination_port = u16::from_be_bytes([udp_header[2], udp_header[3]]);
    let udp_length = u16::from_be_bytes([udp_header[4], udp_header[5]]);

    if source_port == SIP_PORT && destination_port == SIP_PORT {
        return false;
    }
    if destination_port % 2 != 0 {
        return false;
    }
    if udp_length > RTP_DETECT_MAX_UDP_LENGTH {
        return false;
    }
    if payload.len() < RTP_MIN_HEADER_LENGTH_BYTES {
        return false;
    }
    if payload[0] >> 6 != RTP_VERSION {
        return false;
    }

    let payload_type = payload[1] & 0x7F;
    RTP_DETECT_PAYLOAD_TYPES.contains(&payload_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn udp_header(source_port: u16, destination_port: u16, udp_length: u16) -> [u8; 8] {
        let mut header = [0u8; 8];
        header[0..2].copy_from_slice(&source_port.to_be_bytes());
        header[2..4].copy_from_slice(&destination_port.to_be_bytes());
        header[4..6].copy_from_slice(&udp_length.to_be_bytes());
        header
    }

    fn rtp_payload(len: usize, first: u8, second: u8) -> Vec<u8> {
        let mut payload = vec![0u8; len];
        payload[0] = first;
        payload[1] = second;
        payload
    }

    #[test]
    fn gsm_voice_on_even_port_is_rtp() {
        let udp = udp_header(4000, 5062, 28);
        assert!(looks_like_rtp(&[], &udp, &rtp_payload(20, 0x80, 0x03)));
    }

    #[test]
    fn every_accepted_payload_type_is_rtp() {
        let udp = udp_header(4000, 5062, 28);
        for payload_type in RTP_DETECT_PAYLOAD_TYPES {
            assert!(looks_like_rtp(&[], &udp, &rtp_payload(20, 0x80, payload_type)));
            // The marker bit does not affect the payload type.
            assert!(looks_like_rtp(&[], &udp, &rtp_payload(20, 0x80, payload_type | 0x80)));
        }
    }

    #[test]
    fn sip_to_sip_is_not_rtp() {
        let udp = udp_header(5060, 5060, 28);
        assert!(!looks_like_rtp(&[], &udp, &rtp_payload(20, 0x80, 0x03)));
    }

    #[test]
    fn odd_destination_port_is_not_rtp() {
        for destination in [5061, 5063] {
            let udp = udp_header(4000, destination, 28);
            assert!(!looks_like_rtp(&[], &udp, &rtp_payload(20, 0x80, 0x03)));
        }
    }

    #[test]
    fn large_datagram_is_not_rtp() {
        let udp = udp_header(4000, 5062, 201);
        assert!(!looks_like_rtp(&[], &udp, &rtp_payload(20, 0x80, 0x03)));
        let udp = udp_header(4000, 5062, 200);
        assert!(looks_like_rtp(&[], &udp, &rtp_payload(20, 0x80, 0x03)));
    }

    #[test]
    fn short_payload_is_not_rtp() {
        let udp = udp_header(4000, 5062, 19);
        assert!(!looks_like_rtp(&[], &udp, &rtp_payload(11, 0x80, 0x03)));
        assert!(looks_like_rtp(&[], &udp, &rtp_payload(12, 0x80, 0x03)));
    }

    #[test]
    fn wrong_version_is_not_rtp() {
        let udp = udp_header(4000, 5062, 28);
        assert!(!looks_like_rtp(&[], &udp, &rtp_payload(20, 0x40, 0x03)));
        assert!(!looks_like_rtp(&[], &udp, &rtp_payload(20, 0xC0, 0x03)));
    }

    #[test]
    fn unknown_codec_is_not_rtp() {
        let udp = udp_header(4000, 5062, 28);
        assert!(!looks_like_rtp(&[], &udp, &rtp_payload(20, 0x80, 0x00)));
        assert!(!looks_like_rtp(&[], &udp, &rtp_payload(20, 0x80, 0x60)));
    }

    #[test]
    fn truncated_udp_header_is_not_rtp() {
        let udp = udp_header(4000, 5062, 28);
        assert!(!looks_like_rtp(&[], &udp[..7], &rtp_payload(20, 0x80, 0x03)));
    }
}
