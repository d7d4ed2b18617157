// src/compression/mod.rs
//! zlib compression for captured compiler output
//!
//! Compiler output is usually a few kilobytes of diagnostics; zlib at the
//! default level is fast enough not to show up next to a compiler run and
//! still shrinks repetitive diagnostics well.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{self, Read, Write};
use thiserror::Error;

/// Compression-related errors
#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Failed to compress {len} bytes: {source}")]
    Compression { len: usize, source: io::Error },

    #[error("Failed to decompress zlib data: {source}")]
    Decompression { source: io::Error },
}

impl From<CompressionError> for crate::Error {
    fn from(err: CompressionError) -> Self {
        match err {
            CompressionError::Compression { .. } => crate::Error::StoreIoError(err.to_string()),
            CompressionError::Decompression { .. } => {
                crate::Error::StoreCorruption(err.to_string())
            }
        }
    }
}

/// Compress a byte slice with zlib
pub fn compress(data: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| CompressionError::Compression {
            len: data.len(),
            source: e,
        })
}

/// Decompress zlib data to a Vec
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut output = Vec::new();
    decoder
        .read_to_end(&mut output)
        .map_err(|e| CompressionError::Decompression { source: e })?;
    Ok(output)
}
