//! Uniform byte source over a block's storage.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};

use crate::codec::{decode_reader, Algorithm};
use crate::error::Result;

/// A single owned byte-producing resource behind a block read path.
///
/// Each variant carries exactly what it owns: a borrowed view of a sealed
/// in-memory buffer, a buffered spool-file handle, or a streaming
/// decompressor that owns whatever reader feeds it (including a file handle
/// for spooled blocks).  [`Source::close`] consumes the source and releases
/// all of it; the move makes a second close or a read-after-close a compile
/// error.
pub enum Source<'a> {
    /// Verbatim reads from a sealed in-memory buffer.
    Memory(Cursor<&'a [u8]>),
    /// Verbatim buffered reads from an owned spool file.
    File(BufReader<File>),
    /// Streaming decompressor over an owned or borrowed byte source.
    Decoder(Box<dyn Read + 'a>),
}

impl<'a> Source<'a> {
    /// Read path over sealed in-memory bytes.
    pub fn over_bytes(algorithm: Algorithm, bytes: &'a [u8]) -> Result<Source<'a>> {
        match algorithm {
            Algorithm::None => Ok(Source::Memory(Cursor::new(bytes))),
            _ => Ok(Source::Decoder(decode_reader(algorithm, bytes)?)),
        }
    }

    /// Read path over an opened spool file; the handle is owned by the
    /// source and released with it.
    pub fn over_file(algorithm: Algorithm, file: File) -> Result<Source<'static>> {
        let buffered = BufReader::new(file);
        match algorithm {
            Algorithm::None => Ok(Source::File(buffered)),
            _ => Ok(Source::Decoder(decode_reader(algorithm, buffered)?)),
        }
    }

    /// Release everything this source owns.
    ///
    /// Dropping releases the same resources; `close` gives callers a defined
    /// point to surface release-time failures.
    pub fn close(self) -> Result<()> {
        drop(self);
        Ok(())
    }
}

impl Read for Source<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Source::Memory(cursor) => cursor.read(buf),
            Source::File(reader) => reader.read(buf),
            Source::Decoder(reader) => reader.read(buf),
        }
    }
}
