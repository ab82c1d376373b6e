//! Core type definitions shared by the engine, the dump table and the session.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::constants::{ROHC_LARGE_CID_MAX, ROHC_SMALL_CID_MAX};

/// Context identifier for a ROHC compression/decompression flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(Serialize, Deserialize)]
#[repr(transparent)]
pub struct ContextId(pub u16);

impl ContextId {
    /// Maximum valid context ID for small CID mode.
    pub const MAX_SMALL_CID: Self = Self::new(ROHC_SMALL_CID_MAX);
    /// Maximum valid context ID for large CID mode.
    pub const MAX_LARGE_CID: Self = Self::new(ROHC_LARGE_CID_MAX);

    /// Creates a new instance.
    #[inline]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Raw value.
    #[inline]
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Position of this context in a table indexed by CID.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CID{}", self.0)
    }
}

impl Deref for ContextId {
    type Target = u16;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<u16> for ContextId {
    #[inline]
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<ContextId> for u16 {
    #[inline]
    fn from(value: ContextId) -> Self {
        value.0
    }
}

impl PartialEq<u16> for ContextId {
    #[inline]
    fn eq(&self, other: &u16) -> bool {
        self.0 == *other
    }
}

/// How CIDs are carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CidType {
    /// CIDs 0-15, signalled with an Add-CID octet.
    Small,
    /// CIDs 0-16383, signalled with 1 or 2 SDVL octets.
    Large,
}

impl CidType {
    /// Highest CID usable with this CID type.
    pub const fn max_cid(self) -> ContextId {
        match self {
            CidType::Small => ContextId::MAX_SMALL_CID,
            CidType::Large => ContextId::MAX_LARGE_CID,
        }
    }

    /// Highest number of simultaneous contexts usable with this CID type.
    pub const fn max_contexts(self) -> u32 {
        self.max_cid().0 as u32 + 1
    }
}

impl fmt::Display for CidType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CidType::Small => f.write_str("smallcid"),
            CidType::Large => f.write_str("largecid"),
        }
    }
}
