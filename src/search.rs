//! Substring search over a decoded database snapshot.
//!
//! Matching is a case-folded containment test over entry names, nothing
//! more — no globbing, no ranking. Result order is scan order: the entire
//! file collection first, then folders, both as stored on disk. Hosts that
//! want relevance ordering score the returned hits themselves.

use memchr::memmem;

use crate::database::Database;
use crate::types::{DatabaseEntry, SearchHit};

/// Scans files, then folders, collecting entries whose folded name contains
/// the folded query, each stamped with its reconstructed path.
///
/// Stops as soon as `limit` hits are collected; a limit reached during the
/// file phase skips the folder phase entirely. Folders with empty decoded
/// names never match. An empty query matches every name.
pub fn search_entries(database: &Database, query: &str, limit: usize) -> Vec<SearchHit> {
    if limit == 0 {
        return Vec::new();
    }

    let needle = query.to_lowercase();
    let finder = memmem::Finder::new(needle.as_bytes());

    let mut hits = Vec::new();

    for file in database.files() {
        if hits.len() >= limit {
            return hits;
        }
        if name_contains(&finder, &file.name) {
            hits.push(to_hit(database, file));
        }
    }

    for folder in database.folders() {
        if hits.len() >= limit {
            break;
        }
        if !folder.name.is_empty() && name_contains(&finder, &folder.name) {
            hits.push(to_hit(database, folder));
        }
    }

    hits
}

/// Case-folded containment test. An empty needle matches every name.
fn name_contains(finder: &memmem::Finder<'_>, name: &str) -> bool {
    finder.find(name.to_lowercase().as_bytes()).is_some()
}

fn to_hit(database: &Database, entry: &DatabaseEntry) -> SearchHit {
    SearchHit {
        name: entry.name.clone(),
        path: database.full_path(entry),
        size: entry.size,
        mtime: entry.mtime,
        is_folder: entry.is_folder,
    }
}

#[cfg(test)]
mod tests {
    use crate::database::Database;
    use crate::testutil::{write_temp_db, TestDatabase};

    fn sample_database() -> (tempfile::TempDir, Database) {
        let db = TestDatabase::new()
            .folder("", 0)
            .folder("home", 0)
            .folder("Downloads", 1)
            .file("notes.txt", 2)
            .file("TODO.md", 2)
            .file("holiday-photo.jpg", 2);
        let (dir, path) = write_temp_db(&db);
        let database = Database::load(&path).unwrap();
        (dir, database)
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let (_dir, database) = sample_database();

        let hits = database.search("OT", 10);
        let names: Vec<&str> = hits.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, ["notes.txt", "holiday-photo.jpg"]);

        let hits = database.search("todo", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "TODO.md");
    }

    #[test]
    fn files_are_scanned_before_folders() {
        let (_dir, database) = sample_database();

        // "o" appears in every file and in both non-empty folder names.
        let hits = database.search("o", 10);
        let names: Vec<&str> = hits.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(
            names,
            ["notes.txt", "TODO.md", "holiday-photo.jpg", "home", "Downloads"]
        );
    }

    #[test]
    fn limit_caps_results_and_skips_the_folder_phase() {
        let (_dir, database) = sample_database();

        let hits = database.search("o", 3);
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|h| !h.is_folder));

        let hits = database.search("o", 4);
        assert_eq!(hits.len(), 4);
        assert_eq!(hits[3].name, "home");
    }

    #[test]
    fn empty_query_matches_everything_up_to_limit() {
        let (_dir, database) = sample_database();

        let hits = database.search("", 100);
        // Three files plus the two non-empty folders; the unnamed root
        // folder stays invisible.
        assert_eq!(hits.len(), 5);

        let hits = database.search("", 2);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn empty_folder_names_are_never_returned() {
        let (_dir, database) = sample_database();

        let hits = database.search("", 100);
        assert!(hits.iter().all(|h| !h.name.is_empty()));
    }

    #[test]
    fn zero_limit_returns_nothing() {
        let (_dir, database) = sample_database();
        assert!(database.search("notes", 0).is_empty());
    }

    #[test]
    fn no_match_returns_empty() {
        let (_dir, database) = sample_database();
        assert!(database.search("zzzzz", 10).is_empty());
    }

    #[test]
    fn hits_carry_reconstructed_paths() {
        let (_dir, database) = sample_database();

        let hits = database.search("holiday", 10);
        assert_eq!(hits[0].path, "/home/Downloads");
    }
}
