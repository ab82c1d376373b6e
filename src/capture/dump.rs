//! Legacy pcap writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::capture::CapturedFrame;
use crate::constants::DUMP_SNAPLEN;
use crate::error::DumpError;
use crate::link::LinkLayer;

const PCAP_MAGIC: u32 = 0xa1b2_c3d4;
const PCAP_VERSION_MAJOR: u16 = 2;
const PCAP_VERSION_MINOR: u16 = 4;

/// Writes frames to a legacy (little-endian, microsecond) pcap file.
#[derive(Debug)]
pub struct PcapDumper {
    path: PathBuf,
    writer: BufWriter<File>,
    frames_written: u64,
}

impl PcapDumper {
    /// Creates (or truncates) `path` and writes the pcap global header.
    ///
    /// # Errors
    /// - [`DumpError::Create`] if the file cannot be created.
    /// - [`DumpError::Write`] if the header cannot be written.
    pub fn create(path: impl AsRef<Path>, link_layer: LinkLayer) -> Result<Self, DumpError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| DumpError::Create {
            path: path.clone(),
            source,
        })?;
        let mut dumper = Self {
            path,
            writer: BufWriter::new(file),
            frames_written: 0,
        };
        dumper.write_global_header(link_layer)?;
        Ok(dumper)
    }

    fn write_global_header(&mut self, link_layer: LinkLayer) -> Result<(), DumpError> {
        let mut header = Vec::with_capacity(24);
        header.extend_from_slice(&PCAP_MAGIC.to_le_bytes());
        header.extend_from_slice(&PCAP_VERSION_MAJOR.to_le_bytes());
        header.extend_from_slice(&PCAP_VERSION_MINOR.to_le_bytes());
        header.extend_from_slice(&0i32.to_le_bytes()); // thiszone
        header.extend_from_slice(&0u32.to_le_bytes()); // sigfigs
        header.extend_from_slice(&DUMP_SNAPLEN.to_le_bytes());
        header.extend_from_slice(&link_layer.linktype().to_le_bytes());
        self.write_bytes(&header)
    }

    /// Appends one frame record.
    ///
    /// The record keeps the frame's declared length and timestamp.
    pub fn append(&mut self, frame: &CapturedFrame) -> Result<(), DumpError> {
        let caplen = u32::try_from(frame.data.len()).unwrap_or(u32::MAX);
        let mut record = Vec::with_capacity(16 + frame.data.len());
        record.extend_from_slice(&frame.ts_sec.to_le_bytes());
        record.extend_from_slice(&frame.ts_usec.to_le_bytes());
        record.extend_from_slice(&caplen.to_le_bytes());
        record.extend_from_slice(&frame.declared_len.to_le_bytes());
        record.extend_from_slice(&frame.data);
        self.write_bytes(&record)?;
        self.frames_written += 1;
        Ok(())
    }

    /// Flushes buffered records to disk.
    pub fn flush(&mut self) -> Result<(), DumpError> {
        self.writer.flush().map_err(|source| DumpError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Flushes and closes the file.
    pub fn close(mut self) -> Result<(), DumpError> {
        self.flush()
    }

    /// Path of the dump file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records appended so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), DumpError> {
        self.writer.write_all(bytes).map_err(|source| DumpError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureSource, PcapFileSource};

    #[test]
    fn header_and_record_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.pcap");
        let mut dumper = PcapDumper::create(&path, LinkLayer::Ethernet).unwrap();
        let mut frame = CapturedFrame::new(vec![0xAB; 10], 7, 9);
        frame.declared_len = 12;
        dumper.append(&frame).unwrap();
        assert_eq!(dumper.frames_written(), 1);
        dumper.close().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 24 + 16 + 10);
        assert_eq!(&bytes[0..4], &[0xd4, 0xc3, 0xb2, 0xa1]);
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), 2);
        assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), 4);
        assert_eq!(u32::from_le_bytes(bytes[16..20].try_into().unwrap()), 65535);
        assert_eq!(u32::from_le_bytes(bytes[20..24].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(bytes[24..28].try_into().unwrap()), 7);
        assert_eq!(u32::from_le_bytes(bytes[28..32].try_into().unwrap()), 9);
        assert_eq!(u32::from_le_bytes(bytes[32..36].try_into().unwrap()), 10);
        assert_eq!(u32::from_le_bytes(bytes[36..40].try_into().unwrap()), 12);
        assert_eq!(&bytes[40..], &[0xAB; 10]);
    }

    #[test]
    fn jumbo_frame_fits_the_advertised_snap_length() {
        let dir = tempfile::tempdir().unwrap();
        let mut dumper =
            PcapDumper::create(dir.path().join("jumbo.pcap"), LinkLayer::Ethernet).unwrap();
        assert_eq!(dumper.path(), dir.path().join("jumbo.pcap"));
        let frame = CapturedFrame::new(vec![0x5A; 9000], 1, 2);
        dumper.append(&frame).unwrap();
        let path = dumper.path().to_path_buf();
        dumper.close().unwrap();

        let mut source = PcapFileSource::open(&path).unwrap();
        assert_eq!(source.next_frame().unwrap(), Some(frame));
        assert_eq!(source.next_frame().unwrap(), None);
    }

    #[test]
    fn create_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("dump.pcap");
        let err = PcapDumper::create(&path, LinkLayer::Raw).unwrap_err();
        assert!(matches!(err, DumpError::Create { .. }));
    }
}
