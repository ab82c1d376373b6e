//! Protocol and harness constants.
//!
//! Groups the ROHC framing values used by the built-in engine, the link-layer
//! and IP header sizes used by the pipeline, and the fixed limits of the
//! sniffer itself (trace retention, comparison window, dump file names).

// --- ROHC Packet Structure Constants (RFC 3095, Sec 5.2.3, 5.7.3, 5.10) ---

/// Mask for the prefix of an Add-CID octet.
pub const ROHC_ADD_CID_PREFIX_MASK: u8 = 0b1111_0000;
/// Expected prefix value for an Add-CID octet.
pub const ROHC_ADD_CID_PREFIX_VALUE: u8 = 0b1110_0000; // E0
/// Mask to extract the small CID (0-15) from an Add-CID octet.
pub const ROHC_SMALL_CID_MASK: u8 = 0x0F;
/// Padding octet; shares the Add-CID prefix but never carries CID 0.
pub const ROHC_PADDING_OCTET: u8 = 0xE0;
/// Base value for IR packet type discriminators (bits 7-1: `1111110`).
pub const ROHC_IR_PACKET_TYPE_BASE: u8 = 0b1111_1100; // 0xFC
/// Mask for the D-bit in an IR packet type's LSB.
pub const ROHC_IR_D_BIT_MASK: u8 = 0b0000_0001;
/// First octet of the range reserved for ROHC packet types and feedback.
/// A Normal packet of the Uncompressed profile must not start in this range.
pub const ROHC_RESERVED_TYPE_RANGE_START: u8 = 0xE0;

/// Largest CID representable with small CIDs.
pub const ROHC_SMALL_CID_MAX: u16 = 15;
/// Largest CID representable with the 2-octet SDVL large CID encoding.
pub const ROHC_LARGE_CID_MAX: u16 = (1 << 14) - 1;
/// Largest CID encodable in a single SDVL octet.
pub const ROHC_SDVL_ONE_OCTET_MAX: u16 = 0x7F;

/// Number of IR packets sent at the start of a context before Normal packets.
pub const DEFAULT_IR_REPETITIONS: u32 = 3;
/// Default interval (packets) between IR refreshes of an established context.
pub const DEFAULT_IR_REFRESH_INTERVAL: u32 = 20;

// --- ROHC Profile Identifiers ---

/// ROHC Uncompressed Profile Identifier (0x0000).
pub const PROFILE_ID_UNCOMPRESSED: u8 = 0x00;
/// ROHC RTP/UDP/IP Profile Identifier (0x0001).
pub const PROFILE_ID_RTP_UDP_IP: u8 = 0x01;
/// ROHC UDP/IP Profile Identifier (0x0002).
pub const PROFILE_ID_UDP_IP: u8 = 0x02;
/// ROHC ESP/IP Profile Identifier (0x0003).
pub const PROFILE_ID_ESP_IP: u8 = 0x03;
/// ROHC IP-only Profile Identifier (0x0004).
pub const PROFILE_ID_IP_ONLY: u8 = 0x04;
/// ROHC UDP-Lite/IP Profile Identifier (0x0008).
pub const PROFILE_ID_UDPLITE_IP: u8 = 0x08;

// --- Standard Internet Protocol Numbers (IANA Assigned) ---

/// IP protocol number for TCP.
pub const IP_PROTOCOL_TCP: u8 = 6;
/// IP protocol number for UDP.
pub const IP_PROTOCOL_UDP: u8 = 17;
/// IP protocol number for ESP.
pub const IP_PROTOCOL_ESP: u8 = 50;
/// IP protocol number for UDP-Lite.
pub const IP_PROTOCOL_UDPLITE: u8 = 136;

// --- Header sizes ---

/// Minimum IPv4 header length in bytes.
pub const IPV4_MIN_HEADER_LENGTH_BYTES: usize = 20;
/// Fixed IPv6 header length in bytes.
pub const IPV6_HEADER_LENGTH_BYTES: usize = 40;
/// UDP header length in bytes.
pub const UDP_HEADER_LENGTH_BYTES: usize = 8;
/// Minimum RTP header length in bytes (no CSRC list).
pub const RTP_MIN_HEADER_LENGTH_BYTES: usize = 12;
/// RTP version number carried in the two top bits of the first octet.
pub const RTP_VERSION: u8 = 2;

// --- Link layer ---

/// Ethernet II header length.
pub const ETHER_HDR_LEN: usize = 14;
/// Linux cooked capture (SLL) header length.
pub const LINUX_COOKED_HDR_LEN: usize = 16;
/// Minimum Ethernet frame length without FCS; shorter frames are padded.
pub const ETHER_FRAME_MIN_LEN: usize = 60;

/// pcap link type for Ethernet.
pub const LINKTYPE_ETHERNET: i32 = 1;
/// pcap link type for Linux cooked captures.
pub const LINKTYPE_LINUX_SLL: i32 = 113;
/// pcap link type for raw IP.
pub const LINKTYPE_RAW: i32 = 101;
/// Platform `DLT_RAW` values that also denote raw IP.
pub const DLT_RAW_ALIASES: [i32; 2] = [12, 14];

// --- Sniffer limits ---

/// Snap length written to dump files; covers jumbo and cooked frames.
pub const DUMP_SNAPLEN: u32 = 65535;
/// Number of engine trace lines retained for post-mortem dumps.
pub const MAX_LAST_TRACES: usize = 5000;
/// Maximum length of a retained trace line, in characters.
pub const MAX_TRACE_LEN: usize = 300;
/// Number of leading bytes shown when two packets differ.
pub const COMPARE_MAX_BYTES: usize = 180;
/// Bytes per row in the comparison dump.
pub const COMPARE_BYTES_PER_ROW: usize = 4;
/// Default maximum number of contexts (all small CIDs).
pub const DEFAULT_MAX_CONTEXTS: u32 = ROHC_SMALL_CID_MAX as u32 + 1;

/// File that receives frames the compressor rejected.
pub const FALLBACK_DUMP_FILE_NAME: &str = "dump_stream_default.pcap";

// --- RTP detection ---

/// Port used by SIP signalling.
pub const SIP_PORT: u16 = 5060;
/// UDP length above which a datagram is not treated as voice RTP.
pub const RTP_DETECT_MAX_UDP_LENGTH: u16 = 200;
/// RTP payload types accepted by the heuristic: GSM, G.723, G.729 and
/// telephony-event.
pub const RTP_DETECT_PAYLOAD_TYPES: [u8; 4] = [0x03, 0x04, 0x12, 0x65];
