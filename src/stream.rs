//! Stream engine — writer, block rotation, and the read surface.
//!
//! # Writer
//! A [`Stream`] owns one active compressing buffer at a time.  Callers frame
//! records into it with [`Stream::write_record`] (or hand-frame via
//! [`Stream::write`]), then seal the buffer into an immutable [`Block`] with
//! [`Stream::rotate`] at each block boundary, or [`Stream::close`] at the
//! end.  Sealed blocks are kept in insertion order; that order is the record
//! order.
//!
//! # Random access
//! [`Stream::get`] divides the logical record address space into fixed-size
//! windows of `block_size` records: `position / block_size` names the block,
//! `position % block_size` the record inside it.  This is only correct if
//! the caller rotated after exactly `block_size` records for every block but
//! possibly the last — the engine documents this contract and surfaces a
//! `debug!` diagnostic when a sealed block's record tally differs, but it
//! never rejects, because raw [`Stream::write`] legitimately bypasses the
//! tally.
//!
//! # Concurrency
//! Single-threaded, synchronous, blocking.  Mutating operations take
//! `&mut self`; sealed blocks are read through `&self`.  Removing storage
//! while another reader holds an open iterator on it is undefined at the
//! filesystem level and must be avoided by the caller.

use std::io::Write;
use std::path::PathBuf;

use log::{debug, trace};

use crate::block::Block;
use crate::codec::{Algorithm, Compressor};
use crate::config::{BlockConfig, BlockType, Endianness, StreamOptions};
use crate::error::{Error, Result};
use crate::iter::{BlockIterator, StreamIterator};
use crate::source::Source;

pub struct Stream {
    config: BlockConfig,
    block_type: BlockType,
    block_size: usize,
    temp_dir: Option<PathBuf>,
    blocks: Vec<Block>,
    compressor: Option<Compressor>,
    records_in_buffer: u64,
}

impl Stream {
    /// Build a stream from the construction tokens: algorithm
    /// (`"none"`/`"lz4"`/`"zstd"`), endianness (`"big"`/`"little"`), nominal
    /// records per block, block type (`"memory"`/`"file"`), temp directory
    /// (used only for file-backed blocks), and the maximum record length
    /// accepted on reads.
    ///
    /// Call [`Stream::init`] before the first write.
    pub fn new(
        algorithm: &str,
        endianness: &str,
        block_size: usize,
        block_type: &str,
        temp_dir: impl Into<PathBuf>,
        max_record_len: u64,
    ) -> Result<Self> {
        Self::with_options(StreamOptions {
            algorithm: Algorithm::from_name(algorithm)?,
            endianness: Endianness::from_name(endianness)?,
            block_size,
            block_type: BlockType::from_name(block_type)?,
            temp_dir: Some(temp_dir.into()),
            max_record_len,
        })
    }

    /// Build a stream from typed options.
    pub fn with_options(options: StreamOptions) -> Result<Self> {
        if options.block_size == 0 {
            return Err(Error::ZeroBlockSize);
        }
        if options.block_type == BlockType::File && options.temp_dir.is_none() {
            return Err(Error::MissingTempDir);
        }
        Ok(Self {
            config: BlockConfig::new(
                options.algorithm,
                options.endianness,
                options.max_record_len,
            ),
            block_type: options.block_type,
            block_size: options.block_size,
            temp_dir: options.temp_dir,
            blocks: Vec::new(),
            compressor: None,
            records_in_buffer: 0,
        })
    }

    pub fn config(&self) -> BlockConfig {
        self.config
    }

    /// Number of sealed blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Allocate a fresh compressing write buffer for the next block.
    ///
    /// Required before the first write and after [`Stream::close`]; a
    /// [`Stream::rotate`] re-invokes it automatically.
    pub fn init(&mut self) -> Result<()> {
        self.compressor = Some(Compressor::new(self.config.algorithm)?);
        self.records_in_buffer = 0;
        trace!("initialized {} write buffer", self.config.algorithm.name());
        Ok(())
    }

    /// Raw pass-through into the active compressor.  Callers using this
    /// instead of [`Stream::write_record`] are responsible for framing.
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let w = self.compressor.as_mut().ok_or(Error::NoActiveBuffer)?;
        w.write_all(bytes)
            .map_err(|e| Error::BufferWrite { source: e })?;
        Ok(bytes.len())
    }

    /// Frame one record: the 8-byte length header in the stream's byte
    /// order, then the payload.  Returns the total bytes written.
    ///
    /// A header failure and a payload failure are reported as distinct
    /// errors so the caller knows whether the header went in.
    pub fn write_record(&mut self, payload: &[u8]) -> Result<usize> {
        let mut header = [0u8; 8];
        self.config.endianness.write_u64(&mut header, payload.len() as u64);
        if payload.len() as u64 > self.config.max_record_len {
            debug!(
                "record of {} bytes exceeds this stream's read bound of {}",
                payload.len(),
                self.config.max_record_len
            );
        }

        let w = self.compressor.as_mut().ok_or(Error::NoActiveBuffer)?;
        w.write_all(&header)
            .map_err(|e| Error::WriteHeader { source: e })?;
        w.write_all(payload)
            .map_err(|e| Error::WritePayload { written: header.len(), source: e })?;
        self.records_in_buffer += 1;
        Ok(header.len() + payload.len())
    }

    /// Flush the active compressor without sealing it.
    pub fn flush(&mut self) -> Result<()> {
        let w = self.compressor.as_mut().ok_or(Error::NoActiveBuffer)?;
        w.flush().map_err(|e| Error::BufferWrite { source: e })
    }

    /// Seal the active buffer into a new block and start the next buffer.
    pub fn rotate(&mut self) -> Result<()> {
        let compressor = self.compressor.take().ok_or(Error::NoActiveBuffer)?;
        self.seal(compressor)?;
        self.init()
    }

    /// Seal whatever is buffered into a final block and stop.  The stream
    /// is no longer writable until [`Stream::init`] is called again.
    /// Closing an already-closed stream is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match self.compressor.take() {
            Some(compressor) => self.seal(compressor),
            None => Ok(()),
        }
    }

    fn seal(&mut self, compressor: Compressor) -> Result<()> {
        let bytes = compressor.finish()?;
        let byte_len = bytes.len();

        let mut block = match self.block_type {
            BlockType::Memory => Block::memory(self.config),
            BlockType::File => {
                let dir = self.temp_dir.clone().ok_or(Error::MissingTempDir)?;
                Block::spooled(self.config, dir)
            }
        };
        block.init(bytes)?;

        if self.records_in_buffer != self.block_size as u64 {
            // Expected for the final block and for hand-framed writes; a
            // mid-stream mismatch means get() will misaddress.
            debug!(
                "sealed block {} with {} framed records (nominal block size {})",
                self.blocks.len(),
                self.records_in_buffer,
                self.block_size
            );
        }
        debug!(
            "sealed block {} ({} bytes, {})",
            self.blocks.len(),
            byte_len,
            self.config.algorithm.name()
        );
        self.blocks.push(block);
        self.records_in_buffer = 0;
        Ok(())
    }

    /// The record at logical `position` across all sealed blocks.
    ///
    /// Addressing assumes every sealed block except possibly the last holds
    /// exactly `block_size` records; see the module docs.  O(position mod
    /// block_size) within the owning block.
    pub fn get(&self, position: usize) -> Result<Vec<u8>> {
        let index = position / self.block_size;
        let offset = position % self.block_size;
        let block = self.blocks.get(index).ok_or(Error::BlockOutOfRange {
            index,
            count: self.blocks.len(),
        })?;
        block.get(offset).map_err(|e| Error::BlockRead {
            index,
            offset,
            source: Box::new(e),
        })
    }

    /// One forward pass over every record in every sealed block.
    pub fn iterator(&self) -> Result<StreamIterator<'_>> {
        StreamIterator::new(&self.blocks)
    }

    /// Direct [`Source`] over the n-th block's bytes.
    pub fn reader(&self, n: usize) -> Result<Source<'_>> {
        self.block(n)?.reader()
    }

    /// Direct [`BlockIterator`] over the n-th block's records.
    pub fn block_iterator(&self, n: usize) -> Result<BlockIterator<'_>> {
        self.block(n)?.iterator()
    }

    /// Total stored size of the sealed blocks in bytes.  Bytes still in the
    /// active buffer are not counted.
    pub fn size(&self) -> Result<u64> {
        let mut total = 0;
        for block in &self.blocks {
            total += block.size()?;
        }
        Ok(total)
    }

    /// Destroy every sealed block's storage and clear the block list.
    ///
    /// All blocks are attempted even after a failure; the first error is
    /// returned.  Safe to call with zero blocks.
    pub fn remove(&mut self) -> Result<()> {
        let mut first_err = None;
        for block in self.blocks.iter_mut() {
            if let Err(e) = block.remove() {
                first_err.get_or_insert(e);
            }
        }
        debug!("removed {} blocks", self.blocks.len());
        self.blocks.clear();
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn block(&self, n: usize) -> Result<&Block> {
        self.blocks.get(n).ok_or(Error::BlockOutOfRange {
            index: n,
            count: self.blocks.len(),
        })
    }
}
