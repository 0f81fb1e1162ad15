//! Database decoding and the immutable snapshot.
//!
//! `Database::load` performs one blocking pass over the file: header, folder
//! block, file block. Decoding is all-or-nothing; a failure returns an error
//! without publishing any partial collection. The resulting `Database` is an
//! immutable snapshot — searches and path reconstruction borrow it, and a
//! fresh load replaces it wholesale.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Instant;

use crate::error::{DatabaseError, Result};
use crate::format::{BlockKind, DatabaseHeader, IndexFlags};
use crate::reader::BlockCursor;
use crate::search;
use crate::types::{DatabaseEntry, SearchHit};

/// Hard ceiling on parent-chain hops during path reconstruction.
///
/// The parent indices come from untrusted on-disk data and may form cycles;
/// traversal must stay bounded no matter what the file contains.
pub const MAX_PATH_DEPTH: usize = 100;

/// A fully decoded, immutable database snapshot.
#[derive(Debug, Clone)]
pub struct Database {
    header: DatabaseHeader,
    folders: Vec<DatabaseEntry>,
    files: Vec<DatabaseEntry>,
}

impl Database {
    /// Reads, validates and decodes the database file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_database(path.as_ref())
    }

    /// The decoded header, for status reporting.
    pub fn header(&self) -> &DatabaseHeader {
        &self.header
    }

    /// Folder entries in on-disk order. Positions in this slice are the
    /// index space `parent_index` refers to.
    pub fn folders(&self) -> &[DatabaseEntry] {
        &self.folders
    }

    /// File entries in on-disk order.
    pub fn files(&self) -> &[DatabaseEntry] {
        &self.files
    }

    pub fn number_of_folders(&self) -> usize {
        self.folders.len()
    }

    pub fn number_of_files(&self) -> usize {
        self.files.len()
    }

    /// Reconstructs the absolute path of the folder containing `entry`.
    ///
    /// Walks the parent chain through the folder collection, prepending
    /// non-empty folder names. The walk ends at an out-of-range index
    /// (root-level object), at a folder whose parent is itself (explicit
    /// root marker), or after [`MAX_PATH_DEPTH`] hops. With no collected
    /// components the path is `"/"`.
    pub fn full_path(&self, entry: &DatabaseEntry) -> String {
        let mut components: Vec<&str> = Vec::new();
        let mut index = entry.parent_index as usize;

        for _ in 0..MAX_PATH_DEPTH {
            let Some(folder) = self.folders.get(index) else {
                break;
            };
            if !folder.name.is_empty() {
                components.push(folder.name.as_str());
            }
            let parent = folder.parent_index as usize;
            if parent == index || parent >= self.folders.len() {
                break;
            }
            index = parent;
        }

        if components.is_empty() {
            return String::from("/");
        }

        components.reverse();
        let mut path = String::with_capacity(
            components.len() + components.iter().map(|c| c.len()).sum::<usize>(),
        );
        for component in components {
            path.push('/');
            path.push_str(component);
        }
        path
    }

    /// Case-insensitive substring search over entry names; see
    /// [`search::search_entries`].
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        search::search_entries(self, query, limit)
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn load_database(path: &Path) -> Result<Database> {
    let started = Instant::now();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let header = DatabaseHeader::read_from(&mut reader)?;
    log::debug!(
        "database header version={}.{} flags={:#x} folders={} files={}",
        header.major_version,
        header.minor_version,
        header.flags.bits(),
        header.num_folders,
        header.num_files,
    );

    let folders = read_block(&mut reader, &header, BlockKind::Folders)?;
    let files = read_block(&mut reader, &header, BlockKind::Files)?;

    log::info!(
        "loaded fsearch database path={} folders={} files={} load_ms={}",
        path.display(),
        folders.len(),
        files.len(),
        started.elapsed().as_millis(),
    );

    Ok(Database {
        header,
        folders,
        files,
    })
}

/// Reads one entry block into memory and decodes it.
///
/// A zero count or zero declared size skips the block entirely. The read
/// goes through `take` so a lying header cannot force an allocation larger
/// than what the file actually holds; a buffer shorter than the declared
/// block size is truncation.
fn read_block<R: Read>(
    reader: &mut R,
    header: &DatabaseHeader,
    block: BlockKind,
) -> Result<Vec<DatabaseEntry>> {
    let (count, block_size) = header.block_dimensions(block);
    if count == 0 || block_size == 0 {
        return Ok(Vec::new());
    }

    let mut buf = Vec::new();
    reader.by_ref().take(block_size).read_to_end(&mut buf)?;
    if buf.len() as u64 != block_size {
        return Err(DatabaseError::TruncatedBlock {
            block,
            expected: count,
            decoded: 0,
        });
    }

    decode_block(&buf, header, block)
}

/// Decodes the entries of one block.
///
/// A short read inside the block ends the loop rather than failing outright
/// — a block may legitimately end exactly at its declared size — and the
/// final count check decides whether the block held everything the header
/// promised.
fn decode_block(
    buf: &[u8],
    header: &DatabaseHeader,
    block: BlockKind,
) -> Result<Vec<DatabaseEntry>> {
    let (count, _) = header.block_dimensions(block);
    let is_folder = block == BlockKind::Folders;

    // The declared count is untrusted; never reserve more than the block
    // could physically hold.
    let max_entries = buf.len() as u64 / header.min_entry_width(block);
    let mut entries: Vec<DatabaseEntry> =
        Vec::with_capacity(u64::from(count).min(max_entries) as usize);

    let mut cursor = BlockCursor::new(buf);
    while (entries.len() as u32) < count {
        let previous_name = entries.last().map(|e| e.name.as_str()).unwrap_or("");
        let Some(entry) = decode_entry(&mut cursor, header, is_folder, previous_name) else {
            break;
        };
        entries.push(entry);
    }

    if entries.len() as u32 != count {
        return Err(DatabaseError::TruncatedBlock {
            block,
            expected: count,
            decoded: entries.len() as u32,
        });
    }

    Ok(entries)
}

/// Decodes a single entry record at the cursor, or `None` when the block
/// runs out of bytes mid-record.
fn decode_entry(
    cursor: &mut BlockCursor<'_>,
    header: &DatabaseHeader,
    is_folder: bool,
    previous_name: &str,
) -> Option<DatabaseEntry> {
    if is_folder {
        // Reserved per-folder index field.
        cursor.skip(2)?;
    }

    let name_offset = cursor.read_u8()? as usize;
    let name_len = cursor.read_u8()? as usize;

    // Front-coding: reuse the leading `name_offset` characters of the
    // previous name in this block, then append the literal suffix. The
    // suffix is decoded permissively; one malformed name must not sink a
    // multi-million-entry load.
    let mut name: String = previous_name.chars().take(name_offset).collect();
    if name_len > 0 {
        let suffix = cursor.read_bytes(name_len)?;
        name.push_str(&String::from_utf8_lossy(suffix));
    }

    let size = if header.flags.contains(IndexFlags::SIZE) {
        cursor.read_u64_le()?
    } else {
        0
    };
    let mtime = if header.flags.contains(IndexFlags::MODIFICATION_TIME) {
        cursor.read_u64_le()?
    } else {
        0
    };
    let parent_index = cursor.read_u32_le()?;

    Some(DatabaseEntry {
        name,
        size,
        mtime,
        parent_index,
        is_folder,
    })
}
