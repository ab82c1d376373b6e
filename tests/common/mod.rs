//! Common test utilities for the sniffer integration tests.
//!
//! Provides frame builders, an in-memory capture source and a scriptable
//! engine whose faults can be chosen per test.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use rohcstar_sniffer::{
    CaptureError, CaptureSource, CapturedFrame, Compressor, ContextId, Decompressor, EngineError,
    EnginePair, LastPacketInfo, LinkLayer, PacketKind, RohcProfile, TraceEntity, TraceLevel,
    TraceSink,
};

/// Builds an IPv4/UDP packet from 192.168.0.1 to 192.168.0.2 with a correct
/// total length field.
///
/// # Default values
/// - TTL: 64
/// - IP ID: 1
/// - Checksums: 0
pub fn ipv4_udp_packet(source_port: u16, destination_port: u16, payload: &[u8]) -> Vec<u8> {
    let total_length = (20 + 8 + payload.len()) as u16;
    let mut packet = vec![
        0x45, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x40, 0x11, 0x00, 0x00, 192, 168, 0, 1,
        192, 168, 0, 2,
    ];
    packet[2..4].copy_from_slice(&total_length.to_be_bytes());
    packet.extend_from_slice(&source_port.to_be_bytes());
    packet.extend_from_slice(&destination_port.to_be_bytes());
    packet.extend_from_slice(&((8 + payload.len()) as u16).to_be_bytes());
    packet.extend_from_slice(&[0x00, 0x00]);
    packet.extend_from_slice(payload);
    packet
}

/// Builds an IPv6/UDP packet from 2001:db8::1 to 2001:db8::2.
pub fn ipv6_udp_packet(source_port: u16, destination_port: u16, payload: &[u8]) -> Vec<u8> {
    let udp_length = (8 + payload.len()) as u16;
    let mut packet = vec![0x60, 0x00, 0x00, 0x00];
    packet.extend_from_slice(&udp_length.to_be_bytes());
    packet.extend_from_slice(&[17, 64]);
    packet.extend_from_slice(&[0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
    packet.extend_from_slice(&[0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2]);
    packet.extend_from_slice(&source_port.to_be_bytes());
    packet.extend_from_slice(&destination_port.to_be_bytes());
    packet.extend_from_slice(&udp_length.to_be_bytes());
    packet.extend_from_slice(&[0x00, 0x00]);
    packet.extend_from_slice(payload);
    packet
}

/// Wraps an IP packet in an Ethernet II header, padding the frame to the
/// 60-byte minimum like a NIC would.
pub fn ethernet_frame(ip_packet: &[u8]) -> CapturedFrame {
    let ethertype: [u8; 2] = if ip_packet.first().is_some_and(|b| b >> 4 == 6) {
        [0x86, 0xdd]
    } else {
        [0x08, 0x00]
    };
    let mut data = vec![
        0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb,
    ];
    data.extend_from_slice(&ethertype);
    data.extend_from_slice(ip_packet);
    if data.len() < 60 {
        data.resize(60, 0);
    }
    CapturedFrame::new(data, 1_700_000_000, 0)
}

/// A raw IP frame (no link header).
pub fn raw_frame(ip_packet: &[u8]) -> CapturedFrame {
    CapturedFrame::new(ip_packet.to_vec(), 1_700_000_000, 0)
}

/// Capture source replaying a fixed list of frames.
pub struct VecSource {
    link_layer: LinkLayer,
    frames: VecDeque<CapturedFrame>,
    reads: Rc<Cell<usize>>,
}

impl VecSource {
    pub fn new(link_layer: LinkLayer, frames: Vec<CapturedFrame>) -> Self {
        Self {
            link_layer,
            frames: frames.into(),
            reads: Rc::new(Cell::new(0)),
        }
    }

    /// Counter of `next_frame` calls, shared with the source.
    pub fn reads(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.reads)
    }
}

impl CaptureSource for VecSource {
    fn link_layer(&self) -> LinkLayer {
        self.link_layer
    }

    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError> {
        self.reads.set(self.reads.get() + 1);
        Ok(self.frames.pop_front())
    }
}

/// Fault injected by the scripted engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    CompressError,
    CompressEmpty,
    InfoError,
    CidOutOfRange(u16),
    DecompressError,
    DecompressEmpty,
    FlipByte(usize),
}

/// Observations of the scripted engine.
#[derive(Debug, Default)]
pub struct EngineProbe {
    pub compress_calls: Cell<usize>,
    pub decompress_calls: Cell<usize>,
    pub last_compress_input: RefCell<Vec<u8>>,
}

/// Compressor that passes packets through unchanged in CID 0.
#[derive(Debug)]
pub struct ScriptedCompressor {
    probe: Rc<EngineProbe>,
    fault: Fault,
    traces: TraceSink,
}

impl Compressor for ScriptedCompressor {
    fn compress(&mut self, packet: &[u8]) -> Result<Vec<u8>, EngineError> {
        let calls = self.probe.compress_calls.get() + 1;
        self.probe.compress_calls.set(calls);
        *self.probe.last_compress_input.borrow_mut() = packet.to_vec();
        self.traces.record(
            TraceLevel::Debug,
            TraceEntity::Compressor,
            Some(RohcProfile::Uncompressed),
            format_args!("compress #{calls}, {} bytes", packet.len()),
        );
        match self.fault {
            Fault::CompressError => Err(EngineError::NotEnoughData {
                needed: 1,
                got: 0,
                context: "scripted failure",
            }),
            Fault::CompressEmpty => Ok(Vec::new()),
            _ => Ok(packet.to_vec()),
        }
    }

    fn last_packet_info(&self) -> Result<LastPacketInfo, EngineError> {
        let length = self.probe.last_compress_input.borrow().len();
        let context_id = match self.fault {
            Fault::InfoError => return Err(EngineError::NoPacketCompressed),
            Fault::CidOutOfRange(cid) => ContextId::new(cid),
            _ => ContextId::new(0),
        };
        Ok(LastPacketInfo {
            context_id,
            is_new_context: self.probe.compress_calls.get() == 1,
            profile: RohcProfile::Uncompressed,
            packet_kind: PacketKind::Normal,
            uncompressed_len: length,
            compressed_len: length,
        })
    }
}

/// Decompressor that returns its input, optionally damaged.
#[derive(Debug)]
pub struct ScriptedDecompressor {
    probe: Rc<EngineProbe>,
    fault: Fault,
}

impl Decompressor for ScriptedDecompressor {
    fn decompress(&mut self, rohc_packet: &[u8]) -> Result<Vec<u8>, EngineError> {
        self.probe
            .decompress_calls
            .set(self.probe.decompress_calls.get() + 1);
        match self.fault {
            Fault::DecompressError => Err(EngineError::ContextNotFound(ContextId::new(0))),
            Fault::DecompressEmpty => Ok(Vec::new()),
            Fault::FlipByte(index) => {
                let mut packet = rohc_packet.to_vec();
                if let Some(byte) = packet.get_mut(index) {
                    *byte ^= 0xFF;
                }
                Ok(packet)
            }
            _ => Ok(rohc_packet.to_vec()),
        }
    }
}

/// Builds a scripted engine pair writing its traces into `traces`.
pub fn scripted_engines(fault: Fault, traces: &TraceSink) -> (EnginePair, Rc<EngineProbe>) {
    let probe = Rc::new(EngineProbe::default());
    let engines = EnginePair {
        compressor: Box::new(ScriptedCompressor {
            probe: Rc::clone(&probe),
            fault,
            traces: traces.clone(),
        }),
        decompressor: Box::new(ScriptedDecompressor {
            probe: Rc::clone(&probe),
            fault,
        }),
    };
    (engines, probe)
}

/// Number of records in a legacy pcap file.
pub fn pcap_record_count(path: &std::path::Path) -> usize {
    pcap_frames(path).len()
}

/// Every frame stored in a legacy pcap file.
pub fn pcap_frames(path: &std::path::Path) -> Vec<CapturedFrame> {
    let mut source = rohcstar_sniffer::PcapFileSource::open(path).unwrap();
    let mut frames = Vec::new();
    while let Some(frame) = source.next_frame().unwrap() {
        frames.push(frame);
    }
    frames
}
