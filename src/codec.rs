//! Compression algorithm registry and the streaming adapters the engine
//! writes through and reads from.
//!
//! The engine never performs one-shot compression: records arrive one at a
//! time and are pushed through a [`Compressor`] that accumulates the block's
//! compressed bytes in memory until the stream seals it.  Reads pull through
//! a decompressing reader built by [`decode_reader`].
//!
//! "none" is a true pass-through on both paths — the stored bytes are the
//! framed records verbatim.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Compression applied to a block's framed records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    None,
    Lz4,
    Zstd,
}

impl Algorithm {
    /// Human-readable name, matching the construction token.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::None => "none",
            Algorithm::Lz4 => "lz4",
            Algorithm::Zstd => "zstd",
        }
    }

    /// Parse a construction token.
    pub fn from_name(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Algorithm::None),
            "lz4" => Ok(Algorithm::Lz4),
            "zstd" => Ok(Algorithm::Zstd),
            _ => Err(Error::UnknownAlgorithm(s.to_string())),
        }
    }
}

// ── Push side ────────────────────────────────────────────────────────────────

/// Push-style compressing writer accumulating one block's bytes in memory.
///
/// Created empty by [`Compressor::new`], fed through `io::Write`, drained
/// exactly once by [`Compressor::finish`], which finalizes any codec trailer
/// and returns the compressed bytes.
pub enum Compressor {
    Plain(Vec<u8>),
    Lz4(lz4_flex::frame::FrameEncoder<Vec<u8>>),
    Zstd(zstd::stream::write::Encoder<'static, Vec<u8>>),
}

impl Compressor {
    pub fn new(algorithm: Algorithm) -> Result<Self> {
        match algorithm {
            Algorithm::None => Ok(Compressor::Plain(Vec::new())),
            Algorithm::Lz4 => Ok(Compressor::Lz4(lz4_flex::frame::FrameEncoder::new(
                Vec::new(),
            ))),
            Algorithm::Zstd => {
                let enc = zstd::stream::write::Encoder::new(
                    Vec::new(),
                    zstd::DEFAULT_COMPRESSION_LEVEL,
                )
                .map_err(|e| Error::Compress(e.to_string()))?;
                Ok(Compressor::Zstd(enc))
            }
        }
    }

    /// Flush, write the codec trailer, and drain the accumulated bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        match self {
            Compressor::Plain(buf) => Ok(buf),
            Compressor::Lz4(enc) => enc.finish().map_err(|e| Error::Compress(e.to_string())),
            Compressor::Zstd(enc) => enc.finish().map_err(|e| Error::Compress(e.to_string())),
        }
    }
}

impl Write for Compressor {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Compressor::Plain(v) => v.write(buf),
            Compressor::Lz4(enc) => enc.write(buf),
            Compressor::Zstd(enc) => enc.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Compressor::Plain(v) => v.flush(),
            Compressor::Lz4(enc) => enc.flush(),
            Compressor::Zstd(enc) => enc.flush(),
        }
    }
}

// ── Pull side ────────────────────────────────────────────────────────────────

/// Build a decompressing reader over `inner` for the given algorithm.
///
/// For [`Algorithm::None`] the caller should read `inner` directly; this
/// returns it boxed unchanged so both paths share a type.
pub fn decode_reader<'a, R: Read + 'a>(
    algorithm: Algorithm,
    inner: R,
) -> Result<Box<dyn Read + 'a>> {
    match algorithm {
        Algorithm::None => Ok(Box::new(inner)),
        Algorithm::Lz4 => Ok(Box::new(lz4_flex::frame::FrameDecoder::new(inner))),
        Algorithm::Zstd => {
            let dec = zstd::stream::read::Decoder::new(inner)
                .map_err(|e| Error::Decompress(e.to_string()))?;
            Ok(Box::new(dec))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(algorithm: Algorithm, data: &[u8]) -> Vec<u8> {
        let mut enc = Compressor::new(algorithm).unwrap();
        enc.write_all(data).unwrap();
        let stored = enc.finish().unwrap();

        let mut dec = decode_reader(algorithm, &stored[..]).unwrap();
        let mut out = Vec::new();
        dec.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn roundtrip_all_algorithms() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(50);
        for algorithm in [Algorithm::None, Algorithm::Lz4, Algorithm::Zstd] {
            assert_eq!(roundtrip(algorithm, &data), data);
        }
    }

    #[test]
    fn none_is_passthrough() {
        let data = b"stored verbatim";
        let mut enc = Compressor::new(Algorithm::None).unwrap();
        enc.write_all(data).unwrap();
        assert_eq!(enc.finish().unwrap(), data);
    }

    #[test]
    fn empty_input_roundtrips() {
        for algorithm in [Algorithm::None, Algorithm::Lz4, Algorithm::Zstd] {
            assert!(roundtrip(algorithm, b"").is_empty());
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert!(matches!(
            Algorithm::from_name("snappy"),
            Err(Error::UnknownAlgorithm(_))
        ));
        assert_eq!(Algorithm::from_name("ZSTD").unwrap(), Algorithm::Zstd);
    }
}
