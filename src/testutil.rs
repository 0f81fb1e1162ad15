//! Test-only encoder for database fixtures.
//!
//! Produces byte-exact database files: header, then the two entry blocks
//! with front-coded names. Declared counts can be overridden to fabricate
//! headers that promise more entries than their blocks hold, and raw name
//! records can be injected to exercise lossy UTF-8 decoding.

use std::path::PathBuf;

use byteorder::{LittleEndian, WriteBytesExt};
use tempfile::TempDir;

use crate::format::{IndexFlags, DATABASE_MAGIC, DATABASE_MAJOR_VERSION, DATABASE_MINOR_VERSION};

pub(crate) struct TestEntry {
    name: NameSpec,
    size: u64,
    mtime: u64,
    parent: u32,
}

enum NameSpec {
    Text(String),
    /// Explicit `name_offset` plus literal suffix bytes, bypassing the
    /// front-coder.
    Raw(u8, Vec<u8>),
}

pub(crate) struct TestDatabase {
    major: u8,
    minor: u8,
    flags: IndexFlags,
    folders: Vec<TestEntry>,
    files: Vec<TestEntry>,
    declared_file_count: Option<u32>,
}

impl TestDatabase {
    pub fn new() -> Self {
        Self {
            major: DATABASE_MAJOR_VERSION,
            minor: DATABASE_MINOR_VERSION,
            flags: IndexFlags::NAME,
            folders: Vec::new(),
            files: Vec::new(),
            declared_file_count: None,
        }
    }

    pub fn with_version(mut self, major: u8, minor: u8) -> Self {
        self.major = major;
        self.minor = minor;
        self
    }

    pub fn with_flags(mut self, flags: IndexFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_declared_file_count(mut self, count: u32) -> Self {
        self.declared_file_count = Some(count);
        self
    }

    pub fn folder(mut self, name: &str, parent: u32) -> Self {
        self.folders.push(TestEntry {
            name: NameSpec::Text(name.to_string()),
            size: 0,
            mtime: 0,
            parent,
        });
        self
    }

    pub fn file(mut self, name: &str, parent: u32) -> Self {
        self.files.push(TestEntry {
            name: NameSpec::Text(name.to_string()),
            size: 0,
            mtime: 0,
            parent,
        });
        self
    }

    pub fn file_with(mut self, name: &str, parent: u32, size: u64, mtime: u64) -> Self {
        self.files.push(TestEntry {
            name: NameSpec::Text(name.to_string()),
            size,
            mtime,
            parent,
        });
        self
    }

    pub fn raw_file_record(mut self, name_offset: u8, suffix: &[u8], parent: u32) -> Self {
        self.files.push(TestEntry {
            name: NameSpec::Raw(name_offset, suffix.to_vec()),
            size: 0,
            mtime: 0,
            parent,
        });
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        let folder_block = encode_block(&self.folders, self.flags, true);
        let file_block = encode_block(&self.files, self.flags, false);

        let folder_count = self.folders.len() as u32;
        let file_count = self.declared_file_count.unwrap_or(self.files.len() as u32);

        let mut out = Vec::new();
        out.extend_from_slice(&DATABASE_MAGIC);
        out.push(self.major);
        out.push(self.minor);
        out.write_u64::<LittleEndian>(self.flags.bits()).unwrap();
        out.write_u32::<LittleEndian>(folder_count).unwrap();
        out.write_u32::<LittleEndian>(file_count).unwrap();
        out.write_u64::<LittleEndian>(folder_block.len() as u64)
            .unwrap();
        out.write_u64::<LittleEndian>(file_block.len() as u64)
            .unwrap();
        // Reserved index/exclude metadata counts.
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap();
        out.extend_from_slice(&folder_block);
        out.extend_from_slice(&file_block);
        out
    }
}

fn encode_block(entries: &[TestEntry], flags: IndexFlags, is_folder: bool) -> Vec<u8> {
    let mut out = Vec::new();
    let mut previous = String::new();

    for entry in entries {
        if is_folder {
            // Reserved per-folder index field.
            out.write_u16::<LittleEndian>(0).unwrap();
        }

        match &entry.name {
            NameSpec::Text(name) => {
                let shared = shared_prefix_chars(&previous, name);
                let prefix_bytes: usize = name.chars().take(shared).map(char::len_utf8).sum();
                let suffix = &name.as_bytes()[prefix_bytes..];
                assert!(suffix.len() <= u8::MAX as usize, "fixture name too long");

                out.push(shared as u8);
                out.push(suffix.len() as u8);
                out.extend_from_slice(suffix);
                previous = name.clone();
            }
            NameSpec::Raw(offset, suffix) => {
                out.push(*offset);
                out.push(suffix.len() as u8);
                out.extend_from_slice(suffix);
                previous = String::from_utf8_lossy(suffix).into_owned();
            }
        }

        if flags.contains(IndexFlags::SIZE) {
            out.write_u64::<LittleEndian>(entry.size).unwrap();
        }
        if flags.contains(IndexFlags::MODIFICATION_TIME) {
            out.write_u64::<LittleEndian>(entry.mtime).unwrap();
        }
        out.write_u32::<LittleEndian>(entry.parent).unwrap();
    }

    out
}

fn shared_prefix_chars(previous: &str, name: &str) -> usize {
    previous
        .chars()
        .zip(name.chars())
        .take_while(|(a, b)| a == b)
        .count()
        .min(u8::MAX as usize)
}

/// Writes the encoded database into a fresh temp directory.
pub(crate) fn write_temp_db(db: &TestDatabase) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fsearch.db");
    std::fs::write(&path, db.encode()).unwrap();
    (dir, path)
}
