//! Record framing and iteration.
//!
//! # Wire format
//!
//! Every record is an 8-byte unsigned length header (byte order per the
//! block's config) followed by exactly that many payload bytes.  There is
//! no magic number, version field, or checksum; compatibility is governed
//! entirely by writer and reader agreeing on algorithm and endianness.
//!
//! # End of sequence vs. corruption
//!
//! `next()` distinguishes three outcomes: `Ok(Some(payload))` for a complete
//! record, `Ok(None)` when the source ends exactly at a record boundary, and
//! `Err(Error::Truncated { .. })` when it ends partway through a header or
//! payload.  Truncation is never folded into the clean end signal.

use std::io::Read;

use crate::block::Block;
use crate::config::{BlockConfig, Endianness};
use crate::error::{Error, Result, Stage};
use crate::source::Source;

/// Reads framed records from a single block's [`Source`].
pub struct BlockIterator<'a> {
    source: Source<'a>,
    endianness: Endianness,
    max_record_len: u64,
}

impl<'a> BlockIterator<'a> {
    pub fn new(source: Source<'a>, config: BlockConfig) -> Self {
        Self {
            source,
            endianness: config.endianness,
            max_record_len: config.max_record_len,
        }
    }

    /// Return the next record payload, or `Ok(None)` at the clean end of
    /// the sequence.
    pub fn next(&mut self) -> Result<Option<Vec<u8>>> {
        let mut header = [0u8; 8];
        let mut filled = 0;
        while filled < header.len() {
            let n = self
                .source
                .read(&mut header[filled..])
                .map_err(|e| Error::SourceRead { source: e })?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(Error::Truncated {
                    stage: Stage::Header,
                    expected: header.len(),
                    read: filled,
                });
            }
            filled += n;
        }

        let length = self.endianness.read_u64(&header);
        if length > self.max_record_len {
            // Reject before allocating: a corrupt or byte-swapped length
            // field must not drive the allocation below.
            return Err(Error::RecordTooLarge {
                length,
                max: self.max_record_len,
            });
        }

        let mut payload = vec![0u8; length as usize];
        let mut filled = 0;
        while filled < payload.len() {
            let n = self
                .source
                .read(&mut payload[filled..])
                .map_err(|e| Error::SourceRead { source: e })?;
            if n == 0 {
                return Err(Error::Truncated {
                    stage: Stage::Payload,
                    expected: payload.len(),
                    read: filled,
                });
            }
            filled += n;
        }
        Ok(Some(payload))
    }

    /// Discard the next `n` records, failing on the first that cannot be
    /// read with the index it stopped at.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        for index in 0..n {
            match self.next() {
                Ok(Some(_)) => {}
                Ok(None) => {
                    return Err(Error::Skip {
                        index,
                        source: Box::new(Error::EndOfBlock),
                    })
                }
                Err(e) => {
                    return Err(Error::Skip {
                        index,
                        source: Box::new(e),
                    })
                }
            }
        }
        Ok(())
    }

    /// Release the underlying source.
    pub fn close(self) -> Result<()> {
        self.source.close()
    }
}

/// One logical forward pass over the records of an ordered block list.
///
/// Single pass, not restartable, not safe for concurrent callers.
pub struct StreamIterator<'a> {
    blocks: &'a [Block],
    index: usize,
    current: BlockIterator<'a>,
}

impl<'a> StreamIterator<'a> {
    /// Build an iterator over `blocks`; at least one block is required.
    pub fn new(blocks: &'a [Block]) -> Result<Self> {
        let first = blocks.first().ok_or(Error::NoBlocks)?;
        Ok(Self {
            blocks,
            index: 0,
            current: first.iterator()?,
        })
    }

    /// Return the next record across all blocks, or `Ok(None)` once the
    /// last block is exhausted (deterministically repeatable).
    ///
    /// Block boundaries are crossed with an explicit loop, so any run of
    /// empty or exhausted blocks costs constant stack.
    pub fn next(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            if let Some(record) = self.current.next()? {
                return Ok(Some(record));
            }
            if self.index + 1 >= self.blocks.len() {
                return Ok(None);
            }
            self.index += 1;
            let exhausted =
                std::mem::replace(&mut self.current, self.blocks[self.index].iterator()?);
            exhausted.close()?;
        }
    }

    /// Release the current block's source.
    pub fn close(self) -> Result<()> {
        self.current.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Algorithm;

    fn config(endianness: Endianness, max: u64) -> BlockConfig {
        BlockConfig::new(Algorithm::None, endianness, max)
    }

    fn frame(endianness: Endianness, payload: &[u8]) -> Vec<u8> {
        let mut header = [0u8; 8];
        endianness.write_u64(&mut header, payload.len() as u64);
        let mut out = header.to_vec();
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn reads_frames_in_order() {
        let mut bytes = frame(Endianness::Little, b"alpha");
        bytes.extend(frame(Endianness::Little, b""));
        bytes.extend(frame(Endianness::Little, b"beta"));

        let source = Source::over_bytes(Algorithm::None, &bytes).unwrap();
        let mut it = BlockIterator::new(source, config(Endianness::Little, 1024));
        assert_eq!(it.next().unwrap().unwrap(), b"alpha");
        assert_eq!(it.next().unwrap().unwrap(), b"");
        assert_eq!(it.next().unwrap().unwrap(), b"beta");
        assert!(it.next().unwrap().is_none());
        assert!(it.next().unwrap().is_none());
        it.close().unwrap();
    }

    #[test]
    fn truncated_header_is_an_error() {
        let bytes = [0u8; 5];
        let source = Source::over_bytes(Algorithm::None, &bytes).unwrap();
        let mut it = BlockIterator::new(source, config(Endianness::Little, 1024));
        assert!(matches!(
            it.next(),
            Err(Error::Truncated {
                stage: Stage::Header,
                expected: 8,
                read: 5,
            })
        ));
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let mut bytes = frame(Endianness::Big, b"abcdef");
        bytes.truncate(8 + 3);
        let source = Source::over_bytes(Algorithm::None, &bytes).unwrap();
        let mut it = BlockIterator::new(source, config(Endianness::Big, 1024));
        assert!(matches!(
            it.next(),
            Err(Error::Truncated {
                stage: Stage::Payload,
                expected: 6,
                read: 3,
            })
        ));
    }

    #[test]
    fn oversized_length_rejected_before_allocation() {
        // A header claiming u64::MAX must fail on the bound check, not by
        // attempting the allocation.
        let mut bytes = [0xffu8; 8].to_vec();
        bytes.extend_from_slice(b"x");
        let source = Source::over_bytes(Algorithm::None, &bytes).unwrap();
        let mut it = BlockIterator::new(source, config(Endianness::Little, 64));
        assert!(matches!(
            it.next(),
            Err(Error::RecordTooLarge {
                length: u64::MAX,
                max: 64,
            })
        ));
    }

    #[test]
    fn skip_reports_failing_index() {
        let mut bytes = frame(Endianness::Little, b"one");
        bytes.extend(frame(Endianness::Little, b"two"));

        let source = Source::over_bytes(Algorithm::None, &bytes).unwrap();
        let mut it = BlockIterator::new(source, config(Endianness::Little, 1024));
        match it.skip(5) {
            Err(Error::Skip { index, .. }) => assert_eq!(index, 2),
            other => panic!("expected skip error, got {other:?}"),
        }
    }
}
