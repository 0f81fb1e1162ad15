//! On-disk format of the FSearch database file.
//!
//! The file starts with a fixed header (magic tag, version, index flags,
//! entry counts, block byte lengths) followed by two variable-length entry
//! blocks, folders first. All multi-byte integers are little-endian. The
//! index flags decide which optional fields each entry record carries, so
//! the record width is only known once the header has been read.

use std::fmt;
use std::io::Read;

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{DatabaseError, Result};

/// Magic tag at the start of every database file.
pub const DATABASE_MAGIC: [u8; 4] = *b"FSDB";

/// The single major version this decoder understands.
pub const DATABASE_MAJOR_VERSION: u8 = 0;

/// Highest minor version this decoder knows. Databases with a lower minor
/// version are forward-compatible subsets and load fine.
pub const DATABASE_MINOR_VERSION: u8 = 9;

bitflags! {
    /// Index feature bits from the database header.
    ///
    /// Only `SIZE` and `MODIFICATION_TIME` change the per-entry record
    /// width. Bits this decoder does not recognize are preserved but
    /// otherwise ignored.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IndexFlags: u64 {
        const NAME              = 1 << 0;
        const PATH              = 1 << 1;
        const SIZE              = 1 << 2;
        const MODIFICATION_TIME = 1 << 3;
    }
}

// ---------------------------------------------------------------------------
// Block identification
// ---------------------------------------------------------------------------

/// Which of the two on-disk entry blocks a decode step is working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Folders,
    Files,
}

impl BlockKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Folders => "folder",
            Self::Files => "file",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Decoded database header.
#[derive(Debug, Clone)]
pub struct DatabaseHeader {
    pub major_version: u8,
    pub minor_version: u8,
    pub flags: IndexFlags,
    pub num_folders: u32,
    pub num_files: u32,
    pub folder_block_size: u64,
    pub file_block_size: u64,
}

impl DatabaseHeader {
    /// Reads and validates the fixed-size header fields.
    ///
    /// The two trailing metadata counts (indexes, excludes) are reserved by
    /// the format without content behind them; they are read and discarded.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != DATABASE_MAGIC {
            return Err(DatabaseError::InvalidMagic {
                found: magic,
                expected: DATABASE_MAGIC,
            });
        }

        let major_version = reader.read_u8()?;
        let minor_version = reader.read_u8()?;
        if major_version != DATABASE_MAJOR_VERSION || minor_version > DATABASE_MINOR_VERSION {
            return Err(DatabaseError::UnsupportedVersion {
                major: major_version,
                minor: minor_version,
            });
        }

        let flags = IndexFlags::from_bits_retain(reader.read_u64::<LittleEndian>()?);
        let num_folders = reader.read_u32::<LittleEndian>()?;
        let num_files = reader.read_u32::<LittleEndian>()?;
        let folder_block_size = reader.read_u64::<LittleEndian>()?;
        let file_block_size = reader.read_u64::<LittleEndian>()?;

        // Reserved index/exclude metadata counts.
        let _num_indexes = reader.read_u32::<LittleEndian>()?;
        let _num_excludes = reader.read_u32::<LittleEndian>()?;

        Ok(Self {
            major_version,
            minor_version,
            flags,
            num_folders,
            num_files,
            folder_block_size,
            file_block_size,
        })
    }

    /// Count and declared byte length of the given block.
    pub fn block_dimensions(&self, block: BlockKind) -> (u32, u64) {
        match block {
            BlockKind::Folders => (self.num_folders, self.folder_block_size),
            BlockKind::Files => (self.num_files, self.file_block_size),
        }
    }

    /// Smallest number of bytes one entry of the given block can occupy
    /// under the active flags (an entry with an empty name suffix).
    ///
    /// Bounds pre-allocation: the declared entry count is untrusted, but a
    /// block of N bytes can never hold more than N / width entries.
    pub fn min_entry_width(&self, block: BlockKind) -> u64 {
        // name_offset + name_len + parent_index
        let mut width = 1 + 1 + 4;
        if block == BlockKind::Folders {
            // reserved per-folder index field
            width += 2;
        }
        if self.flags.contains(IndexFlags::SIZE) {
            width += 8;
        }
        if self.flags.contains(IndexFlags::MODIFICATION_TIME) {
            width += 8;
        }
        width
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::testutil::TestDatabase;

    #[test]
    fn parses_valid_header() {
        let bytes = TestDatabase::new()
            .with_flags(IndexFlags::NAME | IndexFlags::SIZE)
            .folder("home", 0)
            .file("notes.txt", 0)
            .encode();

        let header = DatabaseHeader::read_from(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(header.major_version, DATABASE_MAJOR_VERSION);
        assert_eq!(header.minor_version, DATABASE_MINOR_VERSION);
        assert!(header.flags.contains(IndexFlags::SIZE));
        assert!(!header.flags.contains(IndexFlags::MODIFICATION_TIME));
        assert_eq!(header.num_folders, 1);
        assert_eq!(header.num_files, 1);
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut bytes = TestDatabase::new().encode();
        bytes[0..4].copy_from_slice(b"NOPE");

        let error = DatabaseHeader::read_from(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(
            error,
            DatabaseError::InvalidMagic { found, .. } if &found == b"NOPE"
        ));
    }

    #[test]
    fn rejects_major_version_mismatch() {
        let bytes = TestDatabase::new().with_version(1, 0).encode();

        let error = DatabaseHeader::read_from(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(
            error,
            DatabaseError::UnsupportedVersion { major: 1, minor: 0 }
        ));
    }

    #[test]
    fn rejects_minor_version_from_the_future() {
        let bytes = TestDatabase::new()
            .with_version(DATABASE_MAJOR_VERSION, DATABASE_MINOR_VERSION + 1)
            .encode();

        let error = DatabaseHeader::read_from(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(error, DatabaseError::UnsupportedVersion { .. }));
    }

    #[test]
    fn accepts_older_minor_versions() {
        let bytes = TestDatabase::new().with_version(DATABASE_MAJOR_VERSION, 0).encode();

        let header = DatabaseHeader::read_from(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(header.minor_version, 0);
    }

    #[test]
    fn unknown_flag_bits_are_preserved() {
        let bytes = TestDatabase::new()
            .with_flags(IndexFlags::from_bits_retain(1 << 0 | 1 << 40))
            .encode();

        let header = DatabaseHeader::read_from(&mut Cursor::new(bytes)).unwrap();
        assert!(header.flags.contains(IndexFlags::NAME));
        assert_eq!(header.flags.bits() & (1 << 40), 1 << 40);
    }

    #[test]
    fn truncated_header_is_an_io_error() {
        let error = DatabaseHeader::read_from(&mut Cursor::new(b"FSDB\x00".to_vec())).unwrap_err();
        assert!(matches!(error, DatabaseError::Io(_)));
    }

    #[test]
    fn entry_width_tracks_flags() {
        let mut header = DatabaseHeader::read_from(&mut Cursor::new(TestDatabase::new().encode()))
            .unwrap();

        header.flags = IndexFlags::NAME;
        assert_eq!(header.min_entry_width(BlockKind::Files), 6);
        assert_eq!(header.min_entry_width(BlockKind::Folders), 8);

        header.flags = IndexFlags::NAME | IndexFlags::SIZE | IndexFlags::MODIFICATION_TIME;
        assert_eq!(header.min_entry_width(BlockKind::Files), 22);
        assert_eq!(header.min_entry_width(BlockKind::Folders), 24);
    }
}
