//! LZ4 framing for stored file contents
//!
//! Every blob written to the object store carries a 4-byte header:
//! - `LZ4T`: an LZ4 block with its uncompressed size prepended follows
//! - `\0\0\0\0`: raw bytes follow
//!
//! so contents written under any strategy can always be read back.
//!
//! ```rust
//! use timedfile::compression::{CompressionEngine, CompressionStrategy};
//!
//! let mut engine = CompressionEngine::new(CompressionStrategy::Fast);
//! let data = b"Line 1\n".repeat(64);
//! let packed = engine.compress(&data);
//! assert!(packed.len() < data.len());
//! assert_eq!(engine.decompress(&packed).unwrap(), data);
//! ```

use crate::error::{Result, TimedFileError};
use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use std::str::FromStr;
use tracing::trace;

const LZ4_MAGIC: &[u8] = b"LZ4T";
const RAW_MAGIC: &[u8] = &[0, 0, 0, 0];

/// Payloads this small never shrink
const MIN_COMPRESS_LEN: usize = 64;

/// When stored contents get compressed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CompressionStrategy {
    /// Store everything raw
    None,
    /// LZ4 for everything that shrinks (default)
    #[default]
    Fast,
    /// LZ4 only for contents of at least `min_size` bytes
    Adaptive {
        /// Skip compression below this size
        min_size: usize,
    },
}

impl CompressionStrategy {
    /// Name used in configuration
    pub fn name(&self) -> &'static str {
        match self {
            CompressionStrategy::None => "none",
            CompressionStrategy::Fast => "fast",
            CompressionStrategy::Adaptive { .. } => "adaptive",
        }
    }
}

impl FromStr for CompressionStrategy {
    type Err = TimedFileError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(CompressionStrategy::None),
            "fast" => Ok(CompressionStrategy::Fast),
            "adaptive" => Ok(CompressionStrategy::Adaptive { min_size: 4096 }),
            other => Err(TimedFileError::InvalidConfiguration(format!(
                "unknown compression strategy '{}'",
                other
            ))),
        }
    }
}

/// Counters kept by a [`CompressionEngine`]
#[derive(Debug, Default, Clone)]
pub struct CompressionStats {
    /// Number of blobs compressed
    pub blobs_compressed: usize,
    /// Number of blobs stored raw
    pub blobs_stored_raw: usize,
    /// Total bytes saved by compression
    pub bytes_saved: usize,
}

/// Applies a [`CompressionStrategy`] and frames the result
#[derive(Debug)]
pub struct CompressionEngine {
    strategy: CompressionStrategy,
    stats: CompressionStats,
}

impl CompressionEngine {
    /// Create a new compression engine with the specified strategy
    pub fn new(strategy: CompressionStrategy) -> Self {
        Self {
            strategy,
            stats: CompressionStats::default(),
        }
    }

    /// Active strategy
    pub fn strategy(&self) -> &CompressionStrategy {
        &self.strategy
    }

    /// Counters since creation
    pub fn stats(&self) -> &CompressionStats {
        &self.stats
    }

    /// Frame `content`, compressing it when the strategy allows and it helps
    pub fn compress(&mut self, content: &[u8]) -> Vec<u8> {
        if self.should_compress(content.len()) {
            let compressed = compress_prepend_size(content);
            if compressed.len() < content.len() {
                self.stats.blobs_compressed += 1;
                self.stats.bytes_saved += content.len() - compressed.len();
                trace!("Compressed {} -> {} bytes", content.len(), compressed.len());
                return frame(LZ4_MAGIC, &compressed);
            }
        }

        self.stats.blobs_stored_raw += 1;
        frame(RAW_MAGIC, content)
    }

    /// Undo [`CompressionEngine::compress`]
    pub fn decompress(&self, content: &[u8]) -> Result<Vec<u8>> {
        if content.len() < 4 {
            return Err(TimedFileError::Decompression(format!(
                "blob too short ({} bytes)",
                content.len()
            )));
        }

        let (header, body) = content.split_at(4);
        if header == LZ4_MAGIC {
            decompress_size_prepended(body).map_err(|e| TimedFileError::Decompression(e.to_string()))
        } else if header == RAW_MAGIC {
            Ok(body.to_vec())
        } else {
            Err(TimedFileError::Decompression(format!(
                "unknown header {:02x?}",
                header
            )))
        }
    }

    fn should_compress(&self, len: usize) -> bool {
        if len < MIN_COMPRESS_LEN {
            return false;
        }
        match &self.strategy {
            CompressionStrategy::None => false,
            CompressionStrategy::Fast => true,
            CompressionStrategy::Adaptive { min_size } => len >= *min_size,
        }
    }
}

fn frame(header: &[u8], body: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(header.len() + body.len());
    result.extend_from_slice(header);
    result.extend_from_slice(body);
    result
}
