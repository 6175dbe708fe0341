//! Sealed blocks and their two backing strategies.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;

use crate::config::BlockConfig;
use crate::error::{Error, Result};
use crate::iter::BlockIterator;
use crate::source::Source;

/// An immutable, sealed, compressed container of framed records.
///
/// Lifecycle: constructed empty for a config, sealed exactly once with
/// [`Block::init`], read any number of times, destroyed with
/// [`Block::remove`].  A block exclusively owns its storage; a spooled
/// block's file is not shared with any other entity.
pub enum Block {
    Memory(MemoryBlock),
    Spooled(SpooledBlock),
}

impl Block {
    /// An empty memory-backed block.
    pub fn memory(config: BlockConfig) -> Self {
        Block::Memory(MemoryBlock {
            config,
            bytes: Vec::new(),
            sealed: false,
        })
    }

    /// An empty file-backed block spooling into `temp_dir` (a leading `~`
    /// is expanded against `$HOME` at init time).
    pub fn spooled(config: BlockConfig, temp_dir: impl Into<PathBuf>) -> Self {
        Block::Spooled(SpooledBlock {
            config,
            temp_dir: temp_dir.into(),
            path: None,
        })
    }

    pub fn config(&self) -> BlockConfig {
        match self {
            Block::Memory(b) => b.config,
            Block::Spooled(b) => b.config,
        }
    }

    /// Seal the block with its compressed content.  A second call is an
    /// error; the content is never replaced.
    pub fn init(&mut self, bytes: Vec<u8>) -> Result<()> {
        match self {
            Block::Memory(b) => b.init(bytes),
            Block::Spooled(b) => b.init(bytes),
        }
    }

    /// Stored (compressed) size in bytes.  For spooled blocks this stats
    /// the file on every call; nothing is cached.
    pub fn size(&self) -> Result<u64> {
        match self {
            Block::Memory(b) => Ok(b.bytes.len() as u64),
            Block::Spooled(b) => b.size(),
        }
    }

    /// A [`Source`] over the stored bytes, decompressing per the block's
    /// algorithm.
    pub fn reader(&self) -> Result<Source<'_>> {
        match self {
            Block::Memory(b) => Source::over_bytes(b.config.algorithm, &b.bytes),
            Block::Spooled(b) => b.reader(),
        }
    }

    /// A [`BlockIterator`] over the block's records.
    pub fn iterator(&self) -> Result<BlockIterator<'_>> {
        Ok(BlockIterator::new(self.reader()?, self.config()))
    }

    /// The record at `position`, by skipping from the start of the block.
    ///
    /// O(position) — the content is compressed, so every call decodes from
    /// the beginning.  Use [`Block::iterator`] for anything but occasional
    /// random access.
    pub fn get(&self, position: usize) -> Result<Vec<u8>> {
        let mut it = self.iterator()?;
        let outcome = it.skip(position).and_then(|_| it.next());
        // The source is released on every path, error paths included.
        let closed = it.close();
        let record = match outcome? {
            Some(bytes) => bytes,
            None => return Err(Error::NoSuchRecord { position }),
        };
        closed?;
        Ok(record)
    }

    /// Destroy the block's storage.  The block must not be read afterward.
    pub fn remove(&mut self) -> Result<()> {
        match self {
            Block::Memory(b) => {
                b.bytes = Vec::new();
                Ok(())
            }
            Block::Spooled(b) => b.remove(),
        }
    }
}

/// Block content held in an owned in-memory buffer.
pub struct MemoryBlock {
    config: BlockConfig,
    bytes: Vec<u8>,
    sealed: bool,
}

impl MemoryBlock {
    fn init(&mut self, bytes: Vec<u8>) -> Result<()> {
        if self.sealed {
            return Err(Error::AlreadySealed);
        }
        self.bytes = bytes;
        self.sealed = true;
        Ok(())
    }
}

/// Block content spooled to a uniquely named file in a temp directory.
pub struct SpooledBlock {
    config: BlockConfig,
    temp_dir: PathBuf,
    path: Option<PathBuf>,
}

impl SpooledBlock {
    /// Write the content to a fresh `blockspool_*` file: create the
    /// directory tree, write everything, flush, durably sync, and close
    /// before recording the path.  No in-memory copy is retained.
    fn init(&mut self, bytes: Vec<u8>) -> Result<()> {
        if self.path.is_some() {
            return Err(Error::AlreadySealed);
        }

        let dir = expand_home(&self.temp_dir);
        fs::create_dir_all(&dir).map_err(|e| Error::io("create temp directory", &dir, e))?;

        let mut spool = tempfile::Builder::new()
            .prefix("blockspool_")
            .tempfile_in(&dir)
            .map_err(|e| Error::io("create spool file", &dir, e))?;
        spool
            .write_all(&bytes)
            .map_err(|e| Error::io("write spool file", spool.path(), e))?;
        spool
            .flush()
            .map_err(|e| Error::io("flush spool file", spool.path(), e))?;
        spool
            .as_file()
            .sync_all()
            .map_err(|e| Error::io("sync spool file", spool.path(), e))?;

        let (file, path) = spool
            .keep()
            .map_err(|e| Error::io("persist spool file", &dir, e.error))?;
        drop(file);

        debug!("spooled {} bytes to {}", bytes.len(), path.display());
        self.path = Some(path);
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        let path = self.path.as_ref().ok_or(Error::NoStorage)?;
        let file = File::open(path).map_err(|e| Error::io("open spool file", path, e))?;
        let meta = file
            .metadata()
            .map_err(|e| Error::io("stat spool file", path, e))?;
        Ok(meta.len())
    }

    fn reader(&self) -> Result<Source<'static>> {
        let path = self.path.as_ref().ok_or(Error::NoStorage)?;
        let file = File::open(path).map_err(|e| Error::io("open spool file", path, e))?;
        Source::over_file(self.config.algorithm, file)
    }

    fn remove(&mut self) -> Result<()> {
        let path = self.path.take().ok_or(Error::NoStorage)?;
        fs::remove_file(&path).map_err(|e| Error::io("remove spool file", &path, e))?;
        debug!("removed spool file {}", path.display());
        Ok(())
    }
}

/// Expand a leading `~` or `~/` against `$HOME`.  Paths without a tilde and
/// environments without `$HOME` pass through unchanged.
fn expand_home(path: &Path) -> PathBuf {
    let Some(s) = path.to_str() else {
        return path.to_path_buf();
    };
    if s == "~" {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home);
        }
    } else if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Algorithm;
    use crate::config::Endianness;

    fn config() -> BlockConfig {
        BlockConfig::new(Algorithm::None, Endianness::Little, 1024)
    }

    fn framed(records: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for r in records {
            let mut header = [0u8; 8];
            Endianness::Little.write_u64(&mut header, r.len() as u64);
            out.extend_from_slice(&header);
            out.extend_from_slice(r);
        }
        out
    }

    #[test]
    fn memory_block_get_and_remove() {
        let records: [&[u8]; 3] = [b"a", b"bb", b"ccc"];
        let mut block = Block::memory(config());
        block.init(framed(&records)).unwrap();

        assert_eq!(block.get(0).unwrap(), b"a");
        assert_eq!(block.get(2).unwrap(), b"ccc");
        assert!(matches!(
            block.get(3),
            Err(Error::NoSuchRecord { position: 3 })
        ));

        block.remove().unwrap();
        assert_eq!(block.size().unwrap(), 0);
    }

    #[test]
    fn second_init_is_rejected() {
        let mut block = Block::memory(config());
        block.init(vec![1, 2, 3]).unwrap();
        assert!(matches!(block.init(vec![4]), Err(Error::AlreadySealed)));
    }

    #[test]
    fn spooled_block_reads_before_and_errors_after_remove() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut block = Block::spooled(config(), dir.path());
        block.init(framed(&[b"on disk" as &[u8]])).unwrap();

        assert!(block.size().unwrap() > 0);
        assert_eq!(block.get(0).unwrap(), b"on disk");

        block.remove().unwrap();
        assert!(block.size().is_err());
        assert!(block.reader().is_err());
    }

    #[test]
    fn expand_home_passthrough_for_absolute_paths() {
        assert_eq!(expand_home(Path::new("/tmp/x")), PathBuf::from("/tmp/x"));
        assert_eq!(
            expand_home(Path::new("relative/dir")),
            PathBuf::from("relative/dir")
        );
    }
}
