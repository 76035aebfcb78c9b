//! Buffer identifiers for tracking registered source text.

use std::fmt;

/// An interned identifier for a source buffer.
///
/// `FileId` is a plain u32 handle that names one registered buffer for the
/// lifetime of an analysis host. The path and contents live in the host's
/// file set; everything else in the crate passes the handle around.
///
/// Handles are cheap to copy, hash, and compare, which matters because the
/// parse cache, diagnostics, and every query are keyed by them.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FileId(pub u32);

impl FileId {
    /// Create a `FileId` from a raw index.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

impl From<u32> for FileId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<FileId> for u32 {
    #[inline]
    fn from(id: FileId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_id_roundtrip() {
        let id = FileId::new(7);
        assert_eq!(id.index(), 7);
        assert_eq!(u32::from(id), 7);
        assert_eq!(FileId::from(7u32), id);
    }

    #[test]
    fn test_file_id_distinct() {
        use std::collections::HashSet;

        let set: HashSet<_> = [FileId::new(0), FileId::new(1), FileId::new(0)]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_file_id_display() {
        assert_eq!(FileId::new(3).to_string(), "file#3");
        assert_eq!(format!("{:?}", FileId::new(3)), "FileId(3)");
    }

    #[test]
    fn test_file_id_size() {
        assert_eq!(std::mem::size_of::<FileId>(), 4);
    }
}
