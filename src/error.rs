use crate::format::BlockKind;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid magic number {found:?}, expected {expected:?}")]
    InvalidMagic { found: [u8; 4], expected: [u8; 4] },

    #[error("unsupported database version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("{block} block truncated: header declares {expected} entries, decoded {decoded}")]
    TruncatedBlock {
        block: BlockKind,
        expected: u32,
        decoded: u32,
    },
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
