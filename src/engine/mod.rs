//! Interface between the sniffer and a ROHC compression engine.
//!
//! The sniffer drives an engine through the [`Compressor`] and
//! [`Decompressor`] traits and hands it an [`EngineCallbacks`] implementation
//! at construction for traces, random numbers and RTP detection. The crate
//! ships one engine, the ROHC Uncompressed profile, in [`uncompressed`].

pub mod flow;
pub mod uncompressed;

use std::fmt;
use std::rc::Rc;

use crate::constants::{
    DEFAULT_IR_REFRESH_INTERVAL, DEFAULT_IR_REPETITIONS, PROFILE_ID_ESP_IP, PROFILE_ID_IP_ONLY,
    PROFILE_ID_RTP_UDP_IP, PROFILE_ID_UDP_IP, PROFILE_ID_UDPLITE_IP, PROFILE_ID_UNCOMPRESSED,
};
use crate::error::EngineError;
use crate::trace::{TraceEntity, TraceLevel};
use crate::types::{CidType, ContextId};

pub use uncompressed::{UncompressedCompressor, UncompressedDecompressor};

/// ROHC profile identifiers known to the sniffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RohcProfile {
    /// Uncompressed (profile 0x0000)
    Uncompressed,
    /// RTP/UDP/IP compression (profile 0x0001)
    RtpUdpIp,
    /// UDP/IP compression (profile 0x0002)
    UdpIp,
    /// ESP/IP compression (profile 0x0003)
    EspIp,
    /// IP-only compression (profile 0x0004)
    Ip,
    /// UDP-Lite/IP compression (profile 0x0008)
    UdpLiteIp,
    /// Unknown or unsupported profile
    Unknown(u8),
}

impl RohcProfile {
    /// Every profile the sniffer enables by default.
    pub const ALL: [RohcProfile; 6] = [
        RohcProfile::Uncompressed,
        RohcProfile::RtpUdpIp,
        RohcProfile::UdpIp,
        RohcProfile::EspIp,
        RohcProfile::Ip,
        RohcProfile::UdpLiteIp,
    ];
}

impl From<u8> for RohcProfile {
    fn from(value: u8) -> Self {
        match value {
            PROFILE_ID_UNCOMPRESSED => RohcProfile::Uncompressed,
            PROFILE_ID_RTP_UDP_IP => RohcProfile::RtpUdpIp,
            PROFILE_ID_UDP_IP => RohcProfile::UdpIp,
            PROFILE_ID_ESP_IP => RohcProfile::EspIp,
            PROFILE_ID_IP_ONLY => RohcProfile::Ip,
            PROFILE_ID_UDPLITE_IP => RohcProfile::UdpLiteIp,
            unknown_id => RohcProfile::Unknown(unknown_id),
        }
    }
}

impl From<RohcProfile> for u8 {
    fn from(profile: RohcProfile) -> Self {
        match profile {
            RohcProfile::Uncompressed => PROFILE_ID_UNCOMPRESSED,
            RohcProfile::RtpUdpIp => PROFILE_ID_RTP_UDP_IP,
            RohcProfile::UdpIp => PROFILE_ID_UDP_IP,
            RohcProfile::EspIp => PROFILE_ID_ESP_IP,
            RohcProfile::Ip => PROFILE_ID_IP_ONLY,
            RohcProfile::UdpLiteIp => PROFILE_ID_UDPLITE_IP,
            RohcProfile::Unknown(val) => val,
        }
    }
}

impl fmt::Display for RohcProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RohcProfile::Uncompressed => f.write_str("Uncompressed"),
            RohcProfile::RtpUdpIp => f.write_str("RTP/UDP/IP"),
            RohcProfile::UdpIp => f.write_str("UDP/IP"),
            RohcProfile::EspIp => f.write_str("ESP/IP"),
            RohcProfile::Ip => f.write_str("IP"),
            RohcProfile::UdpLiteIp => f.write_str("UDP-Lite/IP"),
            RohcProfile::Unknown(id) => write!(f, "Unknown(0x{id:02X})"),
        }
    }
}

/// Kind of ROHC packet produced by the last compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// Initialization and Refresh packet, establishes the context.
    Ir,
    /// Normal packet of the Uncompressed profile.
    Normal,
}

/// What the compressor did with the last packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastPacketInfo {
    /// Context the packet was compressed in.
    pub context_id: ContextId,
    /// Whether the context was created (or taken over) by this packet.
    pub is_new_context: bool,
    /// Profile of the context.
    pub profile: RohcProfile,
    /// Kind of ROHC packet emitted.
    pub packet_kind: PacketKind,
    /// Length of the packet handed to the compressor.
    pub uncompressed_len: usize,
    /// Length of the ROHC packet produced.
    pub compressed_len: usize,
}

/// Services the sniffer provides to the engine.
pub trait EngineCallbacks: fmt::Debug {
    /// Receives one diagnostic line.
    fn trace(
        &self,
        level: TraceLevel,
        entity: TraceEntity,
        profile: Option<RohcProfile>,
        message: fmt::Arguments<'_>,
    );

    /// Source of randomness for the engine.
    fn random_number(&self) -> u32;

    /// Whether a UDP datagram carries RTP.
    fn detect_rtp(&self, ip_header: &[u8], udp_header: &[u8], payload: &[u8]) -> bool;
}

/// Compressing half of an engine.
pub trait Compressor: fmt::Debug {
    /// Compresses one IP packet into a ROHC packet.
    fn compress(&mut self, packet: &[u8]) -> Result<Vec<u8>, EngineError>;

    /// Describes the last successful compression.
    ///
    /// # Errors
    /// - [`EngineError::NoPacketCompressed`] before the first compression.
    fn last_packet_info(&self) -> Result<LastPacketInfo, EngineError>;
}

/// Decompressing half of an engine.
pub trait Decompressor: fmt::Debug {
    /// Reconstructs the IP packet carried by a ROHC packet.
    fn decompress(&mut self, rohc_packet: &[u8]) -> Result<Vec<u8>, EngineError>;
}

/// Settings shared by both halves of an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// How CIDs are encoded.
    pub cid_type: CidType,
    /// Highest CID the engine may use.
    pub max_cid: ContextId,
    /// Profiles the engine may select.
    pub profiles: Vec<RohcProfile>,
    /// IR packets sent when a context starts.
    pub ir_repetitions: u32,
    /// Packets between IR refreshes once a context is established; 0 disables
    /// refreshes.
    pub ir_refresh_interval: u32,
}

impl EngineConfig {
    /// Creates a configuration supporting `max_contexts` contexts with every
    /// profile enabled.
    ///
    /// # Errors
    /// - [`EngineError::Configuration`] if `max_contexts` is 0 or exceeds what
    ///   `cid_type` can address.
    pub fn new(cid_type: CidType, max_contexts: u32) -> Result<Self, EngineError> {
        let max_cid = max_contexts
            .checked_sub(1)
            .and_then(|max| u16::try_from(max).ok())
            .map(ContextId::new)
            .ok_or_else(|| {
                EngineError::Configuration(format!(
                    "cannot support {max_contexts} contexts with {cid_type}"
                ))
            })?;
        let config = Self {
            cid_type,
            max_cid,
            profiles: RohcProfile::ALL.to_vec(),
            ir_repetitions: DEFAULT_IR_REPETITIONS,
            ir_refresh_interval: DEFAULT_IR_REFRESH_INTERVAL,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration is self-consistent.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_cid > self.cid_type.max_cid() {
            return Err(EngineError::Configuration(format!(
                "{} exceeds the {} limit of {}",
                self.max_cid,
                self.cid_type,
                self.cid_type.max_cid()
            )));
        }
        if self.profiles.is_empty() {
            return Err(EngineError::Configuration("no profile enabled".into()));
        }
        if self.ir_repetitions == 0 {
            return Err(EngineError::Configuration(
                "at least one IR packet is required to start a context".into(),
            ));
        }
        Ok(())
    }

    /// Number of contexts the engine may hold.
    pub fn max_contexts(&self) -> usize {
        self.max_cid.index() + 1
    }

    /// Whether `profile` is enabled.
    pub fn is_enabled(&self, profile: RohcProfile) -> bool {
        self.profiles.contains(&profile)
    }
}

/// A compressor and decompressor configured alike.
#[derive(Debug)]
pub struct EnginePair {
    pub compressor: Box<dyn Compressor>,
    pub decompressor: Box<dyn Decompressor>,
}

impl EnginePair {
    /// Builds the Uncompressed-profile engine.
    pub fn uncompressed(
        config: &EngineConfig,
        callbacks: Rc<dyn EngineCallbacks>,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            compressor: Box::new(UncompressedCompressor::new(config, Rc::clone(&callbacks))?),
            decompressor: Box::new(UncompressedDecompressor::new(config, callbacks)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_ids_round_trip() {
        for profile in RohcProfile::ALL {
            assert_eq!(RohcProfile::from(u8::from(profile)), profile);
        }
        assert_eq!(RohcProfile::from(0x42), RohcProfile::Unknown(0x42));
        assert_eq!(u8::from(RohcProfile::Unknown(0x42)), 0x42);
    }

    #[test]
    fn profile_display_names() {
        assert_eq!(RohcProfile::Uncompressed.to_string(), "Uncompressed");
        assert_eq!(RohcProfile::RtpUdpIp.to_string(), "RTP/UDP/IP");
        assert_eq!(RohcProfile::Unknown(0x42).to_string(), "Unknown(0x42)");
    }

    #[test]
    fn config_for_all_small_cids() {
        let config = EngineConfig::new(CidType::Small, 16).unwrap();
        assert_eq!(config.max_cid, 15);
        assert_eq!(config.max_contexts(), 16);
        assert_eq!(config.ir_repetitions, DEFAULT_IR_REPETITIONS);
        assert!(config.is_enabled(RohcProfile::Uncompressed));
    }

    #[test]
    fn config_rejects_out_of_range_contexts() {
        assert!(EngineConfig::new(CidType::Small, 17).is_err());
        assert!(EngineConfig::new(CidType::Small, 0).is_err());
        assert!(EngineConfig::new(CidType::Large, 16384).is_ok());
        assert!(EngineConfig::new(CidType::Large, 16385).is_err());
    }

    #[test]
    fn config_rejects_zero_ir_repetitions() {
        let mut config = EngineConfig::new(CidType::Small, 4).unwrap();
        config.ir_repetitions = 0;
        assert!(matches!(
            config.validate(),
            Err(EngineError::Configuration(_))
        ));
    }
}
