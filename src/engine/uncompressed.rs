//! ROHC Uncompressed profile (0x0000, RFC 3095 Section 5.10) in U-mode.
//!
//! The compressor carries each IP packet verbatim behind a small ROHC header:
//!
//! ```text
//! IR:      [Add-CID] 0xFC [large CID] profile CRC-8 | IP packet
//! Normal:  [Add-CID] first IP octet [large CID]     | rest of IP packet
//! ```
//!
//! A context starts with a few IR packets and refreshes periodically with a
//! single IR packet. Contexts are keyed on [`FlowKey`]; when every CID is taken
//! the least recently used context is handed over to the new flow.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::constants::{
    ROHC_ADD_CID_PREFIX_MASK, ROHC_ADD_CID_PREFIX_VALUE, ROHC_IR_D_BIT_MASK,
    ROHC_IR_PACKET_TYPE_BASE, ROHC_PADDING_OCTET, ROHC_RESERVED_TYPE_RANGE_START,
    ROHC_SDVL_ONE_OCTET_MAX, ROHC_SMALL_CID_MASK,
};
use crate::crc::CrcCalculator;
use crate::engine::flow::{FlowKey, preferred_profile};
use crate::engine::{
    Compressor, Decompressor, EngineCallbacks, EngineConfig, LastPacketInfo, PacketKind,
    RohcProfile,
};
use crate::error::EngineError;
use crate::trace::{TraceEntity, TraceLevel};
use crate::types::{CidType, ContextId};

/// Appends the CID octets that precede the packet type (small CIDs).
fn push_add_cid(out: &mut Vec<u8>, cid_type: CidType, cid: ContextId) {
    if cid_type == CidType::Small && cid.value() != 0 {
        out.push(ROHC_ADD_CID_PREFIX_VALUE | (cid.value() as u8 & ROHC_SMALL_CID_MASK));
    }
}

/// Appends the CID octets that follow the packet type (large CIDs).
fn push_large_cid(out: &mut Vec<u8>, cid_type: CidType, cid: ContextId) {
    if cid_type != CidType::Large {
        return;
    }
    let value = cid.value();
    if value <= ROHC_SDVL_ONE_OCTET_MAX {
        out.push(value as u8);
    } else {
        out.push(0x80 | ((value >> 8) as u8 & 0x3F));
        out.push(value as u8);
    }
}

/// Reads a 1 or 2 octet SDVL-encoded large CID.
///
/// # Returns
/// The CID and the number of octets consumed.
fn read_large_cid(data: &[u8]) -> Result<(ContextId, usize), EngineError> {
    let first = *data.first().ok_or(EngineError::NotEnoughData {
        needed: 1,
        got: 0,
        context: "ROHC large CID",
    })?;
    if first & 0x80 == 0 {
        return Ok((ContextId::new(u16::from(first)), 1));
    }
    if first & 0xC0 != 0x80 {
        return Err(EngineError::InvalidPacketType(first));
    }
    let second = *data.get(1).ok_or(EngineError::NotEnoughData {
        needed: 2,
        got: data.len(),
        context: "ROHC large CID",
    })?;
    Ok((
        ContextId::new(u16::from(first & 0x3F) << 8 | u16::from(second)),
        2,
    ))
}

fn is_ir_type(octet: u8) -> bool {
    octet & !ROHC_IR_D_BIT_MASK == ROHC_IR_PACKET_TYPE_BASE
}

#[derive(Debug, Clone)]
struct CompressorContext {
    flow: FlowKey,
    profile: RohcProfile,
    ir_sent: u32,
    packets_since_refresh: u32,
    last_used: u64,
}

/// Compressor half of the Uncompressed-profile engine.
pub struct UncompressedCompressor {
    config: EngineConfig,
    callbacks: Rc<dyn EngineCallbacks>,
    crc_calculator: CrcCalculator,
    contexts: Vec<Option<CompressorContext>>,
    flows: HashMap<FlowKey, ContextId>,
    clock: u64,
    last_packet: Option<LastPacketInfo>,
}

impl fmt::Debug for UncompressedCompressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UncompressedCompressor")
            .field("config", &self.config)
            .field("active_contexts", &self.flows.len())
            .field("last_packet", &self.last_packet)
            .finish_non_exhaustive()
    }
}

impl UncompressedCompressor {
    /// Creates a compressor with no context.
    ///
    /// # Errors
    /// - [`EngineError::Configuration`] if the configuration is invalid or
    ///   does not enable the Uncompressed profile, which every flow falls back
    ///   to.
    pub fn new(
        config: &EngineConfig,
        callbacks: Rc<dyn EngineCallbacks>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        if !config.is_enabled(RohcProfile::Uncompressed) {
            return Err(EngineError::Configuration(
                "the Uncompressed profile must be enabled".into(),
            ));
        }
        Ok(Self {
            config: config.clone(),
            callbacks,
            crc_calculator: CrcCalculator::new(),
            contexts: vec![None; config.max_contexts()],
            flows: HashMap::new(),
            clock: 0,
            last_packet: None,
        })
    }

    /// Number of contexts currently in use.
    pub fn active_contexts(&self) -> usize {
        self.flows.len()
    }

    fn trace(&self, level: TraceLevel, profile: Option<RohcProfile>, message: fmt::Arguments<'_>) {
        self.callbacks
            .trace(level, TraceEntity::Compressor, profile, message);
    }

    /// Picks the profile for a new flow, falling back to Uncompressed when
    /// the preferred one is disabled or not implemented here.
    fn select_profile(&self, packet: &[u8]) -> RohcProfile {
        let preferred = preferred_profile(packet, self.callbacks.as_ref());
        if preferred == RohcProfile::Uncompressed {
            return preferred;
        }
        if self.config.is_enabled(preferred) {
            self.trace(
                TraceLevel::Info,
                Some(preferred),
                format_args!("profile {preferred} not implemented, using Uncompressed"),
            );
        } else {
            self.trace(
                TraceLevel::Debug,
                Some(preferred),
                format_args!("profile {preferred} disabled, using Uncompressed"),
            );
        }
        RohcProfile::Uncompressed
    }

    /// Finds the context of the packet's flow, creating one if needed.
    ///
    /// # Returns
    /// The CID and whether the context is new.
    fn find_or_create_context(&mut self, packet: &[u8]) -> (ContextId, bool) {
        let flow = FlowKey::from_packet(packet);
        if let Some(&cid) = self.flows.get(&flow) {
            return (cid, false);
        }

        let cid = match self.contexts.iter().position(Option::is_none) {
            Some(free) => ContextId::new(free as u16),
            None => {
                let (oldest, _) = self
                    .contexts
                    .iter()
                    .enumerate()
                    .filter_map(|(index, context)| context.as_ref().map(|c| (index, c.last_used)))
                    .min_by_key(|&(_, last_used)| last_used)
                    .unwrap_or((0, 0));
                let cid = ContextId::new(oldest as u16);
                if let Some(evicted) = self.contexts[oldest].take() {
                    self.flows.remove(&evicted.flow);
                    self.trace(
                        TraceLevel::Debug,
                        Some(evicted.profile),
                        format_args!("no free context, recycling least recently used {cid}"),
                    );
                }
                cid
            }
        };

        let profile = self.select_profile(packet);
        let refresh_offset = match self.config.ir_refresh_interval {
            0 => 0,
            interval => self.callbacks.random_number() % interval,
        };
        self.contexts[cid.index()] = Some(CompressorContext {
            flow,
            profile,
            ir_sent: 0,
            packets_since_refresh: refresh_offset,
            last_used: self.clock,
        });
        self.flows.insert(flow, cid);
        self.trace(
            TraceLevel::Debug,
            Some(profile),
            format_args!("create context {cid} for {flow:?}"),
        );
        (cid, true)
    }

    /// Decides the packet kind and advances the context's refresh state.
    fn next_packet_kind(&mut self, cid: ContextId, first_octet: u8) -> PacketKind {
        let ir_repetitions = self.config.ir_repetitions;
        let refresh_interval = self.config.ir_refresh_interval;
        let clock = self.clock;
        let Some(context) = self.contexts[cid.index()].as_mut() else {
            return PacketKind::Ir;
        };
        context.last_used = clock;

        if context.ir_sent < ir_repetitions {
            context.ir_sent += 1;
            PacketKind::Ir
        } else if refresh_interval != 0 && context.packets_since_refresh >= refresh_interval {
            context.packets_since_refresh = 0;
            PacketKind::Ir
        } else if first_octet >= ROHC_RESERVED_TYPE_RANGE_START {
            // Would be mistaken for a ROHC packet type in a Normal packet.
            PacketKind::Ir
        } else {
            context.packets_since_refresh += 1;
            PacketKind::Normal
        }
    }

    fn build_ir(&self, cid: ContextId, packet: &[u8]) -> Vec<u8> {
        let cid_type = self.config.cid_type;
        let mut out = Vec::with_capacity(packet.len() + 5);
        push_add_cid(&mut out, cid_type, cid);
        out.push(ROHC_IR_PACKET_TYPE_BASE);
        push_large_cid(&mut out, cid_type, cid);
        out.push(RohcProfile::Uncompressed.into());
        let crc = self.crc_calculator.crc8(&out);
        out.push(crc);
        out.extend_from_slice(packet);
        out
    }

    fn build_normal(&self, cid: ContextId, packet: &[u8]) -> Vec<u8> {
        let cid_type = self.config.cid_type;
        let mut out = Vec::with_capacity(packet.len() + 3);
        push_add_cid(&mut out, cid_type, cid);
        out.push(packet[0]);
        push_large_cid(&mut out, cid_type, cid);
        out.extend_from_slice(&packet[1..]);
        out
    }
}

impl Compressor for UncompressedCompressor {
    fn compress(&mut self, packet: &[u8]) -> Result<Vec<u8>, EngineError> {
        let Some(&first_octet) = packet.first() else {
            self.trace(
                TraceLevel::Warning,
                None,
                format_args!("refuse to compress an empty packet"),
            );
            return Err(EngineError::NotEnoughData {
                needed: 1,
                got: 0,
                context: "uncompressed packet",
            });
        };

        self.clock += 1;
        let (cid, is_new_context) = self.find_or_create_context(packet);
        let packet_kind = self.next_packet_kind(cid, first_octet);
        let rohc_packet = match packet_kind {
            PacketKind::Ir => self.build_ir(cid, packet),
            PacketKind::Normal => self.build_normal(cid, packet),
        };

        self.trace(
            TraceLevel::Debug,
            Some(RohcProfile::Uncompressed),
            format_args!(
                "{cid}: {packet_kind:?} packet, {} -> {} bytes",
                packet.len(),
                rohc_packet.len()
            ),
        );
        self.last_packet = Some(LastPacketInfo {
            context_id: cid,
            is_new_context,
            profile: RohcProfile::Uncompressed,
            packet_kind,
            uncompressed_len: packet.len(),
            compressed_len: rohc_packet.len(),
        });
        Ok(rohc_packet)
    }

    fn last_packet_info(&self) -> Result<LastPacketInfo, EngineError> {
        self.last_packet.ok_or(EngineError::NoPacketCompressed)
    }
}

#[derive(Debug, Clone, Copy)]
struct DecompressorContext {
    profile: RohcProfile,
    packets: u64,
}

/// Decompressor half of the Uncompressed-profile engine.
pub struct UncompressedDecompressor {
    config: EngineConfig,
    callbacks: Rc<dyn EngineCallbacks>,
    crc_calculator: CrcCalculator,
    contexts: HashMap<ContextId, DecompressorContext>,
}

impl fmt::Debug for UncompressedDecompressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UncompressedDecompressor")
            .field("config", &self.config)
            .field("contexts", &self.contexts)
            .finish_non_exhaustive()
    }
}

impl UncompressedDecompressor {
    /// Creates a decompressor with no context.
    pub fn new(
        config: &EngineConfig,
        callbacks: Rc<dyn EngineCallbacks>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            callbacks,
            crc_calculator: CrcCalculator::new(),
            contexts: HashMap::new(),
        })
    }

    /// Whether a context exists for `cid`.
    pub fn has_context(&self, cid: ContextId) -> bool {
        self.contexts.contains_key(&cid)
    }

    fn trace(&self, level: TraceLevel, message: fmt::Arguments<'_>) {
        self.callbacks.trace(
            level,
            TraceEntity::Decompressor,
            Some(RohcProfile::Uncompressed),
            message,
        );
    }

    fn check_cid(&self, cid: ContextId) -> Result<(), EngineError> {
        if cid > self.config.max_cid {
            return Err(EngineError::CidOutOfRange {
                cid,
                max_cid: self.config.max_cid,
            });
        }
        Ok(())
    }

    fn parse(&mut self, rohc_packet: &[u8]) -> Result<Vec<u8>, EngineError> {
        let start = rohc_packet
            .iter()
            .position(|&octet| octet != ROHC_PADDING_OCTET)
            .ok_or(EngineError::NotEnoughData {
                needed: 1,
                got: 0,
                context: "ROHC packet",
            })?;
        let data = &rohc_packet[start..];

        let mut pos = 0;
        let mut cid = ContextId::new(0);
        if self.config.cid_type == CidType::Small
            && data[0] & ROHC_ADD_CID_PREFIX_MASK == ROHC_ADD_CID_PREFIX_VALUE
        {
            cid = ContextId::new(u16::from(data[0] & ROHC_SMALL_CID_MASK));
            pos = 1;
        }
        let packet_type = *data.get(pos).ok_or(EngineError::NotEnoughData {
            needed: pos + 1,
            got: data.len(),
            context: "ROHC packet type",
        })?;
        pos += 1;

        if is_ir_type(packet_type) {
            if packet_type & ROHC_IR_D_BIT_MASK != 0 {
                return Err(EngineError::InvalidPacketType(packet_type));
            }
            if self.config.cid_type == CidType::Large {
                let (large_cid, used) = read_large_cid(&data[pos..])?;
                cid = large_cid;
                pos += used;
            }
            self.check_cid(cid)?;
            if data.len() < pos + 2 {
                return Err(EngineError::NotEnoughData {
                    needed: pos + 2,
                    got: data.len(),
                    context: "ROHC IR header",
                });
            }
            let profile_id = data[pos];
            if RohcProfile::from(profile_id) != RohcProfile::Uncompressed {
                return Err(EngineError::UnsupportedProfile(profile_id));
            }
            let calculated = self.crc_calculator.crc8(&data[..=pos]);
            let expected = data[pos + 1];
            if calculated != expected {
                return Err(EngineError::CrcMismatch {
                    expected,
                    calculated,
                });
            }
            pos += 2;

            let context = self.contexts.entry(cid).or_insert(DecompressorContext {
                profile: RohcProfile::Uncompressed,
                packets: 0,
            });
            context.packets += 1;
            self.trace(
                TraceLevel::Debug,
                format_args!("{cid}: IR packet, context refreshed"),
            );
            return Ok(data[pos..].to_vec());
        }

        if packet_type >= ROHC_RESERVED_TYPE_RANGE_START {
            return Err(EngineError::InvalidPacketType(packet_type));
        }

        // Normal packet: the type octet is the first octet of the IP packet.
        if self.config.cid_type == CidType::Large {
            let (large_cid, used) = read_large_cid(&data[pos..])?;
            cid = large_cid;
            pos += used;
        }
        self.check_cid(cid)?;
        let context = self
            .contexts
            .get_mut(&cid)
            .ok_or(EngineError::ContextNotFound(cid))?;
        context.packets += 1;
        let profile = context.profile;

        let mut packet = Vec::with_capacity(data.len() - pos + 1);
        packet.push(packet_type);
        packet.extend_from_slice(&data[pos..]);
        self.trace(
            TraceLevel::Debug,
            format_args!("{cid}: Normal packet ({profile}), {} bytes", packet.len()),
        );
        Ok(packet)
    }
}

impl Decompressor for UncompressedDecompressor {
    fn decompress(&mut self, rohc_packet: &[u8]) -> Result<Vec<u8>, EngineError> {
        self.parse(rohc_packet).inspect_err(|e| {
            self.trace(
                TraceLevel::Warning,
                format_args!("failed to decompress {} bytes: {e}", rohc_packet.len()),
            );
        })
    }
}
