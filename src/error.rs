use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Which part of a record frame a read was inside when the source ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Header,
    Payload,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Header => write!(f, "header"),
            Stage::Payload => write!(f, "payload"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    // ── Configuration ────────────────────────────────────────────────────
    #[error("unknown compression algorithm {0:?}, expected \"none\", \"lz4\", or \"zstd\"")]
    UnknownAlgorithm(String),

    #[error("unknown endianness {0:?}, expected \"big\" or \"little\"")]
    UnknownEndianness(String),

    #[error("unknown block type {0:?}, expected \"memory\" or \"file\"")]
    UnknownBlockType(String),

    #[error("block size must be at least one record")]
    ZeroBlockSize,

    #[error("file-backed blocks require a temp directory")]
    MissingTempDir,

    #[error("invalid stream options: {0}")]
    Options(String),

    // ── Protocol / framing ───────────────────────────────────────────────
    #[error("record length {length} exceeds maximum of {max} bytes")]
    RecordTooLarge { length: u64, max: u64 },

    #[error("source ended after {read} of {expected} record {stage} bytes")]
    Truncated {
        stage: Stage,
        expected: usize,
        read: usize,
    },

    #[error("skip failed at index {index}: {source}")]
    Skip { index: usize, source: Box<Error> },

    #[error("no record at position {position} in block")]
    NoSuchRecord { position: usize },

    #[error("end of block reached")]
    EndOfBlock,

    // ── I/O ──────────────────────────────────────────────────────────────
    #[error("failed to {op} {path:?}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed reading from block source: {source}")]
    SourceRead { source: io::Error },

    #[error("buffer write failed: {source}")]
    BufferWrite { source: io::Error },

    #[error("failed writing record header: {source}")]
    WriteHeader { source: io::Error },

    #[error("failed writing record payload after {written} header bytes: {source}")]
    WritePayload { written: usize, source: io::Error },

    #[error("compression error: {0}")]
    Compress(String),

    #[error("decompression error: {0}")]
    Decompress(String),

    // ── Bounds ───────────────────────────────────────────────────────────
    #[error("block index {index} out of range, only {count} blocks sealed")]
    BlockOutOfRange { index: usize, count: usize },

    #[error("failed reading block {index} at offset {offset}: {source}")]
    BlockRead {
        index: usize,
        offset: usize,
        source: Box<Error>,
    },

    // ── Lifecycle ────────────────────────────────────────────────────────
    #[error("block is already sealed")]
    AlreadySealed,

    #[error("block has no backing storage (not sealed, or already removed)")]
    NoStorage,

    #[error("stream has no active buffer, call init() before writing")]
    NoActiveBuffer,

    #[error("stream iterator needs at least one sealed block")]
    NoBlocks,
}

impl Error {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            op,
            path: path.into(),
            source,
        }
    }
}
