//! Identifiers for scope-graph nodes.
//!
//! Both are plain arena indices, valid only within the [`ScopeGraph`] that
//! allocated them. A graph belongs to exactly one parsed buffer, so a
//! `(FileId, ScopeId)` pair is globally unique while the parse is alive.
//!
//! [`ScopeGraph`]: crate::hir::scope::ScopeGraph

use std::fmt;

/// Index of a scope node within one buffer's scope graph.
///
/// Assigned in creation order; reopened namespaces keep their first id, so
/// equal ids mean the same logical scope no matter how many physical
/// blocks contributed to it.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// Create a new ScopeId.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeId({})", self.0)
    }
}

impl From<u32> for ScopeId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Index of a declaration within one buffer's scope graph.
///
/// Assigned sequentially as declarations are discovered, which is also the
/// order completion candidates surface in.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct DeclId(pub u32);

impl DeclId {
    /// Create a new DeclId.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeclId({})", self.0)
    }
}

impl From<u32> for DeclId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}
