//! Integration tests for the per-packet round trip, driven by a scripted
//! engine so every failure path can be reached.

mod common;

use common::{Fault, ethernet_frame, ipv4_udp_packet, raw_frame, scripted_engines};
use rohcstar_sniffer::{
    CapturedFrame, ContextId, DumpTable, EngineError, LinkLayer, PacketOutcome, Pipeline,
    TraceSink,
};

fn scripted_pipeline(
    link_layer: LinkLayer,
    fault: Fault,
) -> (Pipeline, std::rc::Rc<common::EngineProbe>) {
    let traces = TraceSink::new(false);
    let (engines, probe) = scripted_engines(fault, &traces);
    (
        Pipeline::new(link_layer, engines, ContextId::new(15)),
        probe,
    )
}

#[test]
fn truncated_frame_never_reaches_engine() {
    let dir = tempfile::tempdir().unwrap();
    let mut dumps = DumpTable::new(dir.path(), LinkLayer::Ethernet, 16);
    let (mut pipeline, probe) = scripted_pipeline(LinkLayer::Ethernet, Fault::None);

    let mut frame = ethernet_frame(&ipv4_udp_packet(1000, 2000, &[0u8; 40]));
    frame.data = frame.data.slice(..50);

    let outcome = pipeline.process(&frame, &mut dumps);
    assert!(matches!(
        outcome,
        PacketOutcome::MalformedCapture {
            declared: 82,
            captured: 50
        }
    ));
    assert_eq!(probe.compress_calls.get(), 0);
    assert_eq!(probe.decompress_calls.get(), 0);
}

#[test]
fn frame_no_longer_than_link_header_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let mut dumps = DumpTable::new(dir.path(), LinkLayer::Ethernet, 16);
    let (mut pipeline, probe) = scripted_pipeline(LinkLayer::Ethernet, Fault::None);

    let frame = CapturedFrame::new(vec![0u8; 14], 0, 0);
    assert!(matches!(
        pipeline.process(&frame, &mut dumps),
        PacketOutcome::MalformedCapture { .. }
    ));

    let (mut cooked, cooked_probe) = scripted_pipeline(LinkLayer::LinuxCooked, Fault::None);
    let frame = CapturedFrame::new(vec![0u8; 16], 0, 0);
    assert!(matches!(
        cooked.process(&frame, &mut dumps),
        PacketOutcome::MalformedCapture { .. }
    ));
    assert_eq!(probe.compress_calls.get(), 0);
    assert_eq!(cooked_probe.compress_calls.get(), 0);
}

#[test]
fn padded_ethernet_frame_compresses_declared_length_only() {
    let dir = tempfile::tempdir().unwrap();
    let mut dumps = DumpTable::new(dir.path(), LinkLayer::Ethernet, 16);
    let (mut pipeline, probe) = scripted_pipeline(LinkLayer::Ethernet, Fault::None);

    let ip_packet = ipv4_udp_packet(1000, 2000, &[]);
    assert_eq!(ip_packet.len(), 28);
    let frame = ethernet_frame(&ip_packet);
    assert_eq!(frame.captured_len(), 60);

    let outcome = pipeline.process(&frame, &mut dumps);
    assert!(outcome.is_success(), "unexpected outcome: {outcome}");
    assert_eq!(*probe.last_compress_input.borrow(), ip_packet);

    // The dump keeps the frame as captured, padding included.
    dumps.close_all();
    let dumped = common::pcap_frames(&dir.path().join("dump_stream_cid_0.pcap"));
    assert_eq!(dumped, vec![frame]);
}

#[test]
fn minimum_size_frame_without_padding_is_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let mut dumps = DumpTable::new(dir.path(), LinkLayer::Ethernet, 16);
    let (mut pipeline, probe) = scripted_pipeline(LinkLayer::Ethernet, Fault::None);

    let ip_packet = ipv4_udp_packet(1000, 2000, &[0xAB; 18]);
    assert_eq!(ip_packet.len(), 46);
    let outcome = pipeline.process(&ethernet_frame(&ip_packet), &mut dumps);
    assert!(outcome.is_success());
    assert_eq!(probe.last_compress_input.borrow().len(), 46);
}

#[test]
fn raw_frames_are_never_trimmed() {
    let dir = tempfile::tempdir().unwrap();
    let mut dumps = DumpTable::new(dir.path(), LinkLayer::Raw, 16);
    let (mut pipeline, probe) = scripted_pipeline(LinkLayer::Raw, Fault::None);

    let mut ip_packet = ipv4_udp_packet(1000, 2000, &[]);
    ip_packet.resize(60, 0);
    assert!(pipeline.process(&raw_frame(&ip_packet), &mut dumps).is_success());
    assert_eq!(probe.last_compress_input.borrow().len(), 60);
}

#[test]
fn corrupted_decompression_is_a_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let mut dumps = DumpTable::new(dir.path(), LinkLayer::Raw, 16);
    let (mut pipeline, _) = scripted_pipeline(LinkLayer::Raw, Fault::FlipByte(21));

    let ip_packet = ipv4_udp_packet(1000, 2000, b"voice");
    let outcome = pipeline.process(&raw_frame(&ip_packet), &mut dumps);
    let PacketOutcome::Mismatch { cid, report } = &outcome else {
        panic!("expected a mismatch, got {outcome}");
    };
    assert_eq!(*cid, ContextId::new(0));
    assert_eq!(report.first_difference(), 21);
    assert_eq!(report.differing_offsets().collect::<Vec<_>>(), vec![21]);
    assert!(report.to_string().contains("#0x"));
}

#[test]
fn compression_failure_goes_to_fallback_dump() {
    let dir = tempfile::tempdir().unwrap();
    let mut dumps = DumpTable::new(dir.path(), LinkLayer::Raw, 16);
    let (mut pipeline, probe) = scripted_pipeline(LinkLayer::Raw, Fault::CompressError);

    let frame = raw_frame(&ipv4_udp_packet(1000, 2000, b"x"));
    let outcome = pipeline.process(&frame, &mut dumps);
    assert!(matches!(
        outcome,
        PacketOutcome::CompressionFailure { error: Some(_) }
    ));
    assert_eq!(outcome.cid(), None);
    assert_eq!(probe.decompress_calls.get(), 0);

    dumps.close_all();
    assert_eq!(
        common::pcap_frames(&dir.path().join("dump_stream_default.pcap")),
        vec![frame]
    );
    assert!(!dir.path().join("dump_stream_cid_0.pcap").exists());
}

#[test]
fn empty_compression_output_is_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut dumps = DumpTable::new(dir.path(), LinkLayer::Raw, 16);
    let (mut pipeline, _) = scripted_pipeline(LinkLayer::Raw, Fault::CompressEmpty);

    let outcome = pipeline.process(&raw_frame(&ipv4_udp_packet(1, 2, b"")), &mut dumps);
    assert!(matches!(
        outcome,
        PacketOutcome::CompressionFailure { error: None }
    ));
}

#[test]
fn missing_packet_info_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut dumps = DumpTable::new(dir.path(), LinkLayer::Raw, 16);
    let (mut pipeline, probe) = scripted_pipeline(LinkLayer::Raw, Fault::InfoError);

    let outcome = pipeline.process(&raw_frame(&ipv4_udp_packet(1, 2, b"")), &mut dumps);
    assert!(matches!(
        outcome,
        PacketOutcome::EngineInfoUnavailable {
            error: EngineError::NoPacketCompressed
        }
    ));
    assert_eq!(probe.decompress_calls.get(), 0);
}

#[test]
fn out_of_range_cid_is_an_engine_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut dumps = DumpTable::new(dir.path(), LinkLayer::Raw, 16);
    let (mut pipeline, _) = scripted_pipeline(LinkLayer::Raw, Fault::CidOutOfRange(16));

    let outcome = pipeline.process(&raw_frame(&ipv4_udp_packet(1, 2, b"")), &mut dumps);
    assert!(matches!(
        outcome,
        PacketOutcome::EngineInfoUnavailable {
            error: EngineError::CidOutOfRange { .. }
        }
    ));
}

#[test]
fn decompression_failures_carry_the_context() {
    for fault in [Fault::DecompressError, Fault::DecompressEmpty] {
        let dir = tempfile::tempdir().unwrap();
        let mut dumps = DumpTable::new(dir.path(), LinkLayer::Raw, 16);
        let (mut pipeline, _) = scripted_pipeline(LinkLayer::Raw, fault);

        let outcome = pipeline.process(&raw_frame(&ipv4_udp_packet(1, 2, b"")), &mut dumps);
        assert!(matches!(
            outcome,
            PacketOutcome::DecompressionFailure { .. }
        ));
        assert_eq!(outcome.cid(), Some(ContextId::new(0)));
        // The frame was dumped before decompression.
        assert!(dir.path().join("dump_stream_cid_0.pcap").exists());
    }
}

#[test]
fn unwritable_dump_directory_is_a_dump_failure() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gone");
    let mut dumps = DumpTable::new(&missing, LinkLayer::Raw, 16);
    let (mut pipeline, probe) = scripted_pipeline(LinkLayer::Raw, Fault::None);

    let outcome = pipeline.process(&raw_frame(&ipv4_udp_packet(1, 2, b"")), &mut dumps);
    assert!(matches!(
        outcome,
        PacketOutcome::DumpFailure { cid, .. } if cid == ContextId::new(0)
    ));
    assert_eq!(probe.decompress_calls.get(), 0);
}
