//! Replay of legacy pcap files.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use bytes::Bytes;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, PcapBlockOwned, PcapError};
use tracing::{debug, warn};

use crate::capture::{CaptureSource, CapturedFrame};
use crate::error::CaptureError;
use crate::link::LinkLayer;

const READER_BUFFER_SIZE: usize = 65536;

/// Capture source reading frames from a legacy pcap stream.
pub struct PcapFileSource<R: Read> {
    reader: LegacyPcapReader<R>,
    link_layer: LinkLayer,
}

impl PcapFileSource<BufReader<File>> {
    /// Opens a pcap file.
    ///
    /// # Errors
    /// - [`CaptureError::Open`] if the file cannot be opened.
    /// - [`CaptureError::Pcap`] if it is not a legacy pcap file.
    /// - [`CaptureError::UnsupportedLinkType`] for unsupported framings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CaptureError::Open {
            device: path.display().to_string(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read> PcapFileSource<R> {
    /// Wraps a reader positioned at the start of a pcap stream.
    ///
    /// Reads up to the global header to learn the link type.
    pub fn from_reader(reader: R) -> Result<Self, CaptureError> {
        let mut reader = LegacyPcapReader::new(READER_BUFFER_SIZE, reader)
            .map_err(|e| CaptureError::Pcap(format!("not a valid legacy pcap file: {e:?}")))?;

        loop {
            match reader.next() {
                Ok((offset, block)) => {
                    let linktype = match block {
                        PcapBlockOwned::LegacyHeader(header) => Some(header.network.0),
                        _ => None,
                    };
                    reader.consume(offset);
                    if let Some(linktype) = linktype {
                        let link_layer = LinkLayer::from_linktype(linktype)?;
                        debug!(%link_layer, "pcap file opened");
                        return Ok(Self { reader, link_layer });
                    }
                }
                Err(PcapError::Incomplete(_)) => {
                    reader
                        .refill()
                        .map_err(|e| CaptureError::Pcap(format!("refill error: {e:?}")))?;
                }
                Err(PcapError::Eof) => {
                    return Err(CaptureError::Pcap("missing pcap global header".into()));
                }
                Err(e) => return Err(CaptureError::Pcap(format!("{e:?}"))),
            }
        }
    }
}

impl<R: Read> CaptureSource for PcapFileSource<R> {
    fn link_layer(&self) -> LinkLayer {
        self.link_layer
    }

    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError> {
        loop {
            match self.reader.next() {
                Ok((offset, block)) => {
                    let frame = match block {
                        PcapBlockOwned::Legacy(packet) => Some(CapturedFrame {
                            data: Bytes::copy_from_slice(packet.data),
                            declared_len: packet.origlen,
                            ts_sec: packet.ts_sec,
                            ts_usec: packet.ts_usec,
                        }),
                        PcapBlockOwned::LegacyHeader(_) => None,
                        PcapBlockOwned::NG(_) => {
                            warn!("pcapng block encountered, only legacy pcap is supported");
                            None
                        }
                    };
                    self.reader.consume(offset);
                    if frame.is_some() {
                        return Ok(frame);
                    }
                }
                Err(PcapError::Eof) => return Ok(None),
                Err(PcapError::Incomplete(_)) => {
                    self.reader
                        .refill()
                        .map_err(|e| CaptureError::Pcap(format!("refill error: {e:?}")))?;
                }
                Err(e) => return Err(CaptureError::Pcap(format!("{e:?}"))),
            }
        }
    }
}
