//! Per-context capture dump files.
//!
//! Every context the compressor creates gets its own pcap file,
//! `dump_stream_cid_<id>.pcap`, holding the frames compressed in that
//! context. When the compressor reuses a CID for a new flow the old file is
//! deleted and a fresh one started, so each file always describes the
//! current stream of its context. Frames the compressor rejects go to
//! `dump_stream_default.pcap`.

use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::capture::{CapturedFrame, PcapDumper};
use crate::constants::FALLBACK_DUMP_FILE_NAME;
use crate::error::DumpError;
use crate::link::LinkLayer;
use crate::types::ContextId;

/// Map from ContextId to the open dump file of that context.
#[derive(Debug)]
pub struct DumpTable {
    dump_dir: PathBuf,
    link_layer: LinkLayer,
    handles: Vec<Option<PcapDumper>>,
    fallback: Option<PcapDumper>,
}

impl DumpTable {
    /// Creates an empty table for `max_contexts` contexts writing into
    /// `dump_dir`.
    pub fn new(dump_dir: impl Into<PathBuf>, link_layer: LinkLayer, max_contexts: usize) -> Self {
        let mut handles = Vec::with_capacity(max_contexts);
        handles.resize_with(max_contexts, || None);
        Self {
            dump_dir: dump_dir.into(),
            link_layer,
            handles,
            fallback: None,
        }
    }

    /// Path of the dump file of `cid`.
    pub fn context_path(&self, cid: ContextId) -> PathBuf {
        self.dump_dir
            .join(format!("dump_stream_cid_{}.pcap", cid.value()))
    }

    /// Path of the file receiving frames the compressor rejected.
    pub fn fallback_path(&self) -> PathBuf {
        self.dump_dir.join(FALLBACK_DUMP_FILE_NAME)
    }

    /// Number of contexts the table can hold.
    pub fn capacity(&self) -> usize {
        self.handles.len()
    }

    /// Whether a dump file is open for `cid`.
    pub fn is_open(&self, cid: ContextId) -> bool {
        self.handles
            .get(cid.index())
            .is_some_and(|handle| handle.is_some())
    }

    fn slot(&mut self, cid: ContextId) -> Result<&mut Option<PcapDumper>, DumpError> {
        let capacity = self.handles.len();
        self.handles
            .get_mut(cid.index())
            .ok_or(DumpError::ContextOutOfRange { cid, capacity })
    }

    /// Starts a fresh dump file for a context the compressor just created.
    ///
    /// Any file left by a previous stream of the same CID is closed and
    /// deleted first.
    ///
    /// # Errors
    /// - [`DumpError::ContextOutOfRange`] if `cid` does not fit the table.
    /// - [`DumpError::Remove`] / [`DumpError::Create`] on file system errors.
    pub fn reinitialize(&mut self, cid: ContextId) -> Result<(), DumpError> {
        let path = self.context_path(cid);
        let link_layer = self.link_layer;
        let slot = self.slot(cid)?;

        if let Some(previous) = slot.take() {
            debug!(%cid, "replacing dump file of reused context");
            if let Err(e) = previous.close() {
                warn!(%cid, error = %e, "failed to flush replaced dump file");
            }
        }
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(DumpError::Remove { path, source }),
        }

        *slot = Some(PcapDumper::create(&path, link_layer)?);
        debug!(%cid, path = %path.display(), "dump file opened");
        Ok(())
    }

    /// Appends a frame to the dump file of `cid`, opening the file if the
    /// context was never announced as new.
    ///
    /// Flushes after every frame so the file is complete if the process
    /// aborts on the next packet.
    pub fn append(&mut self, cid: ContextId, frame: &CapturedFrame) -> Result<(), DumpError> {
        if !self.is_open(cid) {
            warn!(%cid, "no dump file open for existing context, opening one");
            self.reinitialize(cid)?;
        }
        let capacity = self.handles.len();
        match self.slot(cid)? {
            Some(dumper) => {
                dumper.append(frame)?;
                dumper.flush()
            }
            None => Err(DumpError::ContextOutOfRange { cid, capacity }),
        }
    }

    /// Appends a frame to the fallback dump file, opening it on first use.
    pub fn dump_fallback(&mut self, frame: &CapturedFrame) -> Result<(), DumpError> {
        let dumper = match &mut self.fallback {
            Some(dumper) => dumper,
            fallback => fallback.insert(PcapDumper::create(
                self.dump_dir.join(FALLBACK_DUMP_FILE_NAME),
                self.link_layer,
            )?),
        };
        dumper.append(frame)?;
        dumper.flush()
    }

    /// Closes every open dump file.
    ///
    /// # Returns
    /// The contexts that had a dump file, in CID order.
    pub fn close_all(&mut self) -> Vec<ContextId> {
        let mut used = Vec::new();
        for (index, handle) in self.handles.iter_mut().enumerate() {
            if let Some(dumper) = handle.take() {
                let cid = ContextId::new(index as u16);
                if let Err(e) = dumper.close() {
                    warn!(%cid, error = %e, "failed to close dump file");
                }
                used.push(cid);
            }
        }
        if let Some(fallback) = self.fallback.take() {
            if let Err(e) = fallback.close() {
                warn!(error = %e, "failed to close fallback dump file");
            }
        }
        used
    }
}

impl Drop for DumpTable {
    fn drop(&mut self) {
        self.close_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(byte: u8) -> CapturedFrame {
        CapturedFrame::new(vec![byte; 20], 0, 0)
    }

    #[test]
    fn reinitialize_creates_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut dumps = DumpTable::new(dir.path(), LinkLayer::Raw, 16);
        assert_eq!(dumps.capacity(), 16);
        dumps.reinitialize(ContextId::new(3)).unwrap();
        assert!(dumps.is_open(ContextId::new(3)));
        assert!(dir.path().join("dump_stream_cid_3.pcap").exists());
    }

    #[test]
    fn reinitialize_replaces_previous_stream() {
        let dir = tempfile::tempdir().unwrap();
        let mut dumps = DumpTable::new(dir.path(), LinkLayer::Raw, 16);
        let cid = ContextId::new(0);
        dumps.reinitialize(cid).unwrap();
        dumps.append(cid, &frame(1)).unwrap();
        dumps.append(cid, &frame(2)).unwrap();

        dumps.reinitialize(cid).unwrap();
        dumps.append(cid, &frame(3)).unwrap();
        dumps.close_all();

        let bytes = std::fs::read(dir.path().join("dump_stream_cid_0.pcap")).unwrap();
        assert_eq!(bytes.len(), 24 + 16 + 20);
        assert_eq!(bytes[40], 3);
    }

    #[test]
    fn append_without_announcement_opens_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut dumps = DumpTable::new(dir.path(), LinkLayer::Raw, 4);
        dumps.append(ContextId::new(2), &frame(7)).unwrap();
        assert!(dumps.is_open(ContextId::new(2)));
    }

    #[test]
    fn out_of_range_cid_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut dumps = DumpTable::new(dir.path(), LinkLayer::Raw, 4);
        let err = dumps.reinitialize(ContextId::new(4)).unwrap_err();
        assert!(matches!(
            err,
            DumpError::ContextOutOfRange { capacity: 4, .. }
        ));
    }

    #[test]
    fn close_all_reports_used_contexts() {
        let dir = tempfile::tempdir().unwrap();
        let mut dumps = DumpTable::new(dir.path(), LinkLayer::Raw, 8);
        dumps.reinitialize(ContextId::new(5)).unwrap();
        dumps.reinitialize(ContextId::new(1)).unwrap();
        assert_eq!(
            dumps.close_all(),
            vec![ContextId::new(1), ContextId::new(5)]
        );
        assert!(!dumps.is_open(ContextId::new(1)));
        assert!(dumps.close_all().is_empty());
    }

    #[test]
    fn fallback_file_collects_rejected_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut dumps = DumpTable::new(dir.path(), LinkLayer::Ethernet, 4);
        dumps.dump_fallback(&frame(9)).unwrap();
        dumps.dump_fallback(&frame(9)).unwrap();
        let bytes = std::fs::read(dumps.fallback_path()).unwrap();
        assert_eq!(bytes.len(), 24 + 2 * (16 + 20));
    }
}
