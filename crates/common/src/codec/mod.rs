//! Reversible payload compression.
//!
//! Payloads are compressed with flate2 and, for string-only backends, armoured
//! with base64 so the result is a plain ASCII string. The goal is safe
//! round-tripping through any backend, not ratio.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

use crate::error::{CommonError, CommonResult};

/// Compression algorithms supported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionAlgorithm {
    Gzip,
    Zlib,
}

impl CompressionAlgorithm {
    fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Zlib => "zlib",
        }
    }
}

/// Compresses and decompresses payload bytes.
#[derive(Debug, Clone, Copy)]
pub struct CompressionService {
    algorithm: CompressionAlgorithm,
    level: u32,
}

impl CompressionService {
    pub fn new(algorithm: CompressionAlgorithm, level: u32) -> Self {
        Self { algorithm, level: level.min(9) }
    }

    pub fn algorithm(&self) -> CompressionAlgorithm {
        self.algorithm
    }

    pub fn compress(&self, data: &[u8]) -> CommonResult<Vec<u8>> {
        let level = Compression::new(self.level);
        let result = match self.algorithm {
            CompressionAlgorithm::Gzip => {
                let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), level);
                encoder.write_all(data).and_then(|()| encoder.finish())
            }
            CompressionAlgorithm::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), level);
                encoder.write_all(data).and_then(|()| encoder.finish())
            }
        };
        result.map_err(|e| CommonError::serialization_format(self.algorithm.name(), e.to_string()))
    }

    pub fn decompress(&self, data: &[u8]) -> CommonResult<Vec<u8>> {
        let mut out = Vec::with_capacity(data.len() * 2);
        let result = match self.algorithm {
            CompressionAlgorithm::Gzip => GzDecoder::new(data).read_to_end(&mut out),
            CompressionAlgorithm::Zlib => ZlibDecoder::new(data).read_to_end(&mut out),
        };
        result
            .map(|_| out)
            .map_err(|e| CommonError::serialization_format(self.algorithm.name(), e.to_string()))
    }

    /// Compress UTF-8 text and armour the bytes as base64.
    pub fn encode_text(&self, text: &str) -> CommonResult<String> {
        let compressed = self.compress(text.as_bytes())?;
        Ok(STANDARD.encode(compressed))
    }

    /// Inverse of [`encode_text`](Self::encode_text).
    pub fn decode_text(&self, armoured: &str) -> CommonResult<String> {
        let compressed = STANDARD
            .decode(armoured.trim())
            .map_err(|e| CommonError::serialization_format("base64", e.to_string()))?;
        let bytes = self.decompress(&compressed)?;
        String::from_utf8(bytes).map_err(|e| CommonError::serialization_format("utf-8", e.to_string()))
    }

    /// Percentage saved by compression, 0 when `original` is empty.
    pub fn compression_ratio(original: usize, compressed: usize) -> f64 {
        if original == 0 {
            return 0.0;
        }
        (1.0 - (compressed as f64 / original as f64)) * 100.0
    }
}

impl Default for CompressionService {
    fn default() -> Self {
        Self::new(CompressionAlgorithm::Gzip, 6)
    }
}
