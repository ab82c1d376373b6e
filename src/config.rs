//! Validated settings of a sniffer session.

use std::path::{Path, PathBuf};

use crate::constants::DEFAULT_MAX_CONTEXTS;
use crate::engine::EngineConfig;
use crate::error::{ConfigError, EngineError};
use crate::types::{CidType, ContextId};

/// Settings of one sniffer session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    cid_type: CidType,
    max_contexts: u32,
    dump_dir: PathBuf,
    verbose: bool,
    progress: bool,
}

impl SessionConfig {
    /// Creates a configuration, checking that `max_contexts` fits `cid_type`
    /// and that `dump_dir` is an existing directory.
    ///
    /// # Errors
    /// - [`ConfigError::MaxContextsOutOfRange`] if `max_contexts` is 0 or
    ///   exceeds what `cid_type` can address.
    /// - [`ConfigError::DumpDirMissing`] if `dump_dir` is not a directory.
    pub fn new(
        cid_type: CidType,
        max_contexts: u32,
        dump_dir: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let max = cid_type.max_contexts();
        if max_contexts == 0 || max_contexts > max {
            return Err(ConfigError::MaxContextsOutOfRange {
                cid_type,
                requested: max_contexts,
                max,
            });
        }
        let dump_dir = dump_dir.into();
        if !dump_dir.is_dir() {
            return Err(ConfigError::DumpDirMissing(dump_dir));
        }
        Ok(Self {
            cid_type,
            max_contexts,
            dump_dir,
            verbose: false,
            progress: true,
        })
    }

    /// Same as [`SessionConfig::new`] with the default number of contexts.
    pub fn with_defaults(
        cid_type: CidType,
        dump_dir: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        Self::new(cid_type, DEFAULT_MAX_CONTEXTS, dump_dir)
    }

    /// Echo every engine trace, not only warnings and errors.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Print a `packet #N` progress counter.
    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn cid_type(&self) -> CidType {
        self.cid_type
    }

    pub fn max_contexts(&self) -> u32 {
        self.max_contexts
    }

    /// Highest CID the engine may assign.
    pub fn max_cid(&self) -> ContextId {
        ContextId::new(u16::try_from(self.max_contexts - 1).unwrap_or(u16::MAX))
    }

    pub fn dump_dir(&self) -> &Path {
        &self.dump_dir
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn shows_progress(&self) -> bool {
        self.progress
    }

    /// Engine settings matching this session.
    pub fn engine_config(&self) -> Result<EngineConfig, EngineError> {
        EngineConfig::new(self.cid_type, self.max_contexts)
    }
}
