pub mod block;
pub mod codec;
pub mod config;
pub mod error;
pub mod iter;
pub mod source;
pub mod stream;

pub use block::Block;
pub use codec::{Algorithm, Compressor};
pub use config::{BlockConfig, BlockType, Endianness, StreamOptions};
pub use error::{Error, Result};
pub use iter::{BlockIterator, StreamIterator};
pub use source::Source;
pub use stream::Stream;
