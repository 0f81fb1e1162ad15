//! Record and result types for database entries.
//!
//! `DatabaseEntry` is the decoded on-disk record. `SearchHit` is what the
//! query engine hands to a host layer: a copy of the matched entry stamped
//! with its reconstructed path, serializable as-is for IPC or JSON.

use serde::{Deserialize, Serialize};

/// One decoded index record: a file or folder name plus whatever metadata
/// the database's flag word says is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseEntry {
    /// Base name of the object, never a path.
    pub name: String,
    /// Byte size; 0 when the database was built without the size flag.
    pub size: u64,
    /// Modification time; 0 when the database was built without the
    /// modification-time flag.
    pub mtime: u64,
    /// Position of the containing folder in the folder collection. May be
    /// out of range or self-referential; path reconstruction treats both as
    /// root markers.
    pub parent_index: u32,
    /// Folders and files share the record shape; this discriminates them.
    pub is_folder: bool,
}

/// A search result: the matched entry plus the absolute path of its
/// containing folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub name: String,
    /// Absolute path of the containing folder, e.g. `/home/alice` for a hit
    /// named `notes.txt` stored under that folder.
    pub path: String,
    pub size: u64,
    pub mtime: u64,
    pub is_folder: bool,
}

impl SearchHit {
    /// Joins the containing folder path and the entry name into the full
    /// path of the object itself.
    pub fn absolute_path(&self) -> String {
        if self.path == "/" {
            format!("/{}", self.name)
        } else {
            format!("{}/{}", self.path, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(name: &str, path: &str) -> SearchHit {
        SearchHit {
            name: name.to_string(),
            path: path.to_string(),
            size: 0,
            mtime: 0,
            is_folder: false,
        }
    }

    #[test]
    fn absolute_path_joins_parent_and_name() {
        assert_eq!(hit("notes.txt", "/home/alice").absolute_path(), "/home/alice/notes.txt");
    }

    #[test]
    fn absolute_path_under_root_has_single_slash() {
        assert_eq!(hit("boot.img", "/").absolute_path(), "/boot.img");
    }
}
