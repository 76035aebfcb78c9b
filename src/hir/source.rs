//! Buffer registry: paths, contents, and edit versions.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::base::FileId;

/// Maps buffer paths to stable [`FileId`]s and holds the current text of
/// each buffer together with a version counter.
///
/// A buffer has no version until its text is first set; the first write
/// yields version 1, and every later [`set_contents`](FileSet::set_contents)
/// bumps it, including overwrites with identical text. Derived results
/// cached against a version are stale the moment the version moves.
#[derive(Debug, Default)]
pub struct FileSet {
    inner: RwLock<FileSetInner>,
}

#[derive(Debug, Default)]
struct FileSetInner {
    path_to_id: IndexMap<PathBuf, FileId>,
    id_to_path: IndexMap<FileId, PathBuf>,
    contents: IndexMap<FileId, Arc<str>>,
    versions: IndexMap<FileId, u64>,
    next_id: u32,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or assign the [`FileId`] for a path. The same path always maps
    /// to the same id for the lifetime of the set.
    pub fn file_id(&self, path: &Path) -> FileId {
        {
            let inner = self.inner.read();
            if let Some(&id) = inner.path_to_id.get(path) {
                return id;
            }
        }

        let mut inner = self.inner.write();

        // Double-check under the write lock
        if let Some(&id) = inner.path_to_id.get(path) {
            return id;
        }

        let id = FileId::new(inner.next_id);
        inner.next_id += 1;
        inner.path_to_id.insert(path.to_owned(), id);
        inner.id_to_path.insert(id, path.to_owned());
        id
    }

    /// The id for a path that has already been registered.
    pub fn existing_id(&self, path: &Path) -> Option<FileId> {
        self.inner.read().path_to_id.get(path).copied()
    }

    pub fn path(&self, file: FileId) -> Option<PathBuf> {
        self.inner.read().id_to_path.get(&file).cloned()
    }

    /// Replace the buffer's text and bump its version.
    pub fn set_contents(&self, file: FileId, contents: impl Into<Arc<str>>) {
        let mut inner = self.inner.write();
        inner.contents.insert(file, contents.into());
        *inner.versions.entry(file).or_insert(0) += 1;
    }

    pub fn contents(&self, file: FileId) -> Option<Arc<str>> {
        self.inner.read().contents.get(&file).cloned()
    }

    /// Current edit version of a buffer. `None` until text has been set.
    pub fn version(&self, file: FileId) -> Option<u64> {
        self.inner.read().versions.get(&file).copied()
    }

    /// Drop a buffer, its text, and its version.
    pub fn remove(&self, file: FileId) {
        let mut inner = self.inner.write();
        if let Some(path) = inner.id_to_path.swap_remove(&file) {
            inner.path_to_id.swap_remove(&path);
        }
        inner.contents.swap_remove(&file);
        inner.versions.swap_remove(&file);
    }

    pub fn len(&self) -> usize {
        self.inner.read().path_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of every registered buffer, in registration order.
    pub fn files(&self) -> Vec<FileId> {
        self.inner.read().id_to_path.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_set_id_assignment() {
        let files = FileSet::new();

        let id1 = files.file_id(Path::new("/a.cpp"));
        let id2 = files.file_id(Path::new("/b.cpp"));
        let id3 = files.file_id(Path::new("/a.cpp"));

        assert_ne!(id1, id2);
        assert_eq!(id1, id3);
    }

    #[test]
    fn test_file_set_contents() {
        let files = FileSet::new();
        let id = files.file_id(Path::new("/test.cpp"));

        assert!(files.contents(id).is_none());

        files.set_contents(id, "int x;");

        assert_eq!(files.contents(id).as_deref(), Some("int x;"));
    }

    #[test]
    fn test_version_bumps_on_every_write() {
        let files = FileSet::new();
        let id = files.file_id(Path::new("/test.cpp"));

        assert_eq!(files.version(id), None);

        files.set_contents(id, "int x;");
        assert_eq!(files.version(id), Some(1));

        // Identical text still counts as an edit
        files.set_contents(id, "int x;");
        assert_eq!(files.version(id), Some(2));
    }

    #[test]
    fn test_file_set_path_lookup() {
        let files = FileSet::new();
        let path = Path::new("/test.cpp");
        let id = files.file_id(path);

        assert_eq!(files.path(id).as_deref(), Some(path));
        assert_eq!(files.existing_id(path), Some(id));
        assert_eq!(files.existing_id(Path::new("/other.cpp")), None);
    }

    #[test]
    fn test_remove_clears_all_maps() {
        let files = FileSet::new();
        let id = files.file_id(Path::new("/gone.cpp"));
        files.set_contents(id, "int x;");

        files.remove(id);

        assert!(files.contents(id).is_none());
        assert_eq!(files.version(id), None);
        assert!(files.path(id).is_none());
        assert!(files.is_empty());
    }
}
