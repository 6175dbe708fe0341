//! Shared construction-time configuration.
//!
//! A [`BlockConfig`] is fixed when a stream is built and travels unchanged
//! into every block and every iterator derived from it.  Writer and reader
//! must agree on it; mixing configs over the same bytes is undefined.

use std::path::PathBuf;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::codec::Algorithm;
use crate::error::{Error, Result};

/// Byte order of the 8-byte record-length header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    Big,
    Little,
}

impl Endianness {
    pub fn name(self) -> &'static str {
        match self {
            Endianness::Big => "big",
            Endianness::Little => "little",
        }
    }

    pub fn from_name(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "big" => Ok(Endianness::Big),
            "little" => Ok(Endianness::Little),
            _ => Err(Error::UnknownEndianness(s.to_string())),
        }
    }

    /// Decode a record-length header.
    pub fn read_u64(self, buf: &[u8; 8]) -> u64 {
        match self {
            Endianness::Big => BigEndian::read_u64(buf),
            Endianness::Little => LittleEndian::read_u64(buf),
        }
    }

    /// Encode a record-length header.
    pub fn write_u64(self, buf: &mut [u8; 8], value: u64) {
        match self {
            Endianness::Big => BigEndian::write_u64(buf, value),
            Endianness::Little => LittleEndian::write_u64(buf, value),
        }
    }
}

/// Backing strategy for sealed blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Memory,
    File,
}

impl BlockType {
    pub fn name(self) -> &'static str {
        match self {
            BlockType::Memory => "memory",
            BlockType::File => "file",
        }
    }

    pub fn from_name(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(BlockType::Memory),
            "file" => Ok(BlockType::File),
            _ => Err(Error::UnknownBlockType(s.to_string())),
        }
    }
}

/// Configuration shared by a block and every iterator derived from it.
///
/// `max_record_len` bounds the decoded length header during reads so a
/// corrupt or mismatched length field fails fast instead of driving a huge
/// allocation.  It has no implied default; every stream states its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockConfig {
    pub algorithm: Algorithm,
    pub endianness: Endianness,
    pub max_record_len: u64,
}

impl BlockConfig {
    pub fn new(algorithm: Algorithm, endianness: Endianness, max_record_len: u64) -> Self {
        Self {
            algorithm,
            endianness,
            max_record_len,
        }
    }
}

/// Typed construction options for [`crate::Stream`].
///
/// Field names follow the recognized option tokens (`blockSize`, `tempDir`,
/// ...), so options round-trip through JSON configuration files unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamOptions {
    pub algorithm: Algorithm,
    pub endianness: Endianness,
    pub block_size: usize,
    pub block_type: BlockType,
    /// Required when `block_type` is [`BlockType::File`]; ignored otherwise.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    pub max_record_len: u64,
}

impl StreamOptions {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::Options(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Options(e.to_string()))
    }
}
