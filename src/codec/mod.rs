//! Codec registry for the compressed frame stream.
//!
//! # Containers
//! Replay frame streams are LZMA-compressed.  Two container framings are
//! recognised:
//!   - `.lzma` "alone": 13-byte header (properties, dictionary size,
//!     unpacked size) followed by the raw LZMA stream.  This is what the
//!     game writes.
//!   - `.xz`: identified by its 6-byte magic.
//!
//! [`CodecId::Auto`] sniffs the magic and falls back to LZMA-alone, so a
//! caller never has to know which framing a given file used.
//!
//! # Failure contract
//! A codec either returns the complete decompressed stream or an error.
//! Empty output is reported as [`CodecError::EmptyOutput`]; the replay
//! decoder treats it as a failed stream.

use std::io::{self, BufReader};
use thiserror::Error;

/// Magic bytes opening every `.xz` stream.
pub const XZ_MAGIC: [u8; 6] = [0xFD, b'7', b'z', b'X', b'Z', 0x00];

// ── CodecId enum ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodecId {
    /// Detect the container from its leading bytes.
    #[default]
    Auto,
    Lzma,
    Xz,
}

impl CodecId {
    /// Resolve `Auto` against the leading bytes of `data`.
    pub fn detect(data: &[u8]) -> Self {
        if data.starts_with(&XZ_MAGIC) {
            CodecId::Xz
        } else {
            CodecId::Lzma
        }
    }

    /// Human-readable name (for diagnostics only).
    pub fn name(self) -> &'static str {
        match self {
            CodecId::Auto => "auto",
            CodecId::Lzma => "lzma",
            CodecId::Xz   => "xz",
        }
    }

    /// Parse from a CLI string.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(CodecId::Auto),
            "lzma" => Some(CodecId::Lzma),
            "xz"   => Some(CodecId::Xz),
            _      => None,
        }
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Decompression error: {0}")]
    Decompression(String),
    #[error("Decompressed stream is empty")]
    EmptyOutput,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Codec trait ──────────────────────────────────────────────────────────────

pub trait Codec: Send + Sync {
    fn codec_id(&self) -> CodecId;
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
}

fn non_empty(out: Vec<u8>) -> Result<Vec<u8>, CodecError> {
    if out.is_empty() {
        Err(CodecError::EmptyOutput)
    } else {
        Ok(out)
    }
}

// ── Built-in codec implementations ──────────────────────────────────────────

/// LZMA-alone decoder.  `memlimit` caps the dictionary buffer.
#[derive(Debug, Clone, Default)]
pub struct LzmaCodec {
    pub memlimit: Option<usize>,
}

impl Codec for LzmaCodec {
    fn codec_id(&self) -> CodecId { CodecId::Lzma }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let options = lzma_rs::decompress::Options {
            memlimit: self.memlimit,
            ..Default::default()
        };
        let mut out = Vec::new();
        lzma_rs::lzma_decompress_with_options(&mut BufReader::new(data), &mut out, &options)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;
        non_empty(out)
    }
}

/// `.xz` decoder.  lzma-rs cannot bound its buffers for this container, so
/// a configured `memlimit` makes every stream fail instead of being ignored.
#[derive(Debug, Clone, Default)]
pub struct XzCodec {
    pub memlimit: Option<usize>,
}

impl Codec for XzCodec {
    fn codec_id(&self) -> CodecId { CodecId::Xz }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        if let Some(limit) = self.memlimit {
            return Err(CodecError::Decompression(format!(
                "memlimit of {limit} bytes is not supported for xz streams"
            )));
        }
        let mut out = Vec::new();
        lzma_rs::xz_decompress(&mut BufReader::new(data), &mut out)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;
        non_empty(out)
    }
}

/// Picks [`XzCodec`] or [`LzmaCodec`] per stream.
#[derive(Debug, Clone, Default)]
pub struct AutoCodec {
    lzma: LzmaCodec,
    xz:   XzCodec,
}

impl Codec for AutoCodec {
    fn codec_id(&self) -> CodecId { CodecId::Auto }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        match CodecId::detect(data) {
            CodecId::Xz => self.xz.decompress(data),
            _           => self.lzma.decompress(data),
        }
    }
}

// ── Factory ──────────────────────────────────────────────────────────────────

/// Resolve a CodecId to a built-in codec.
pub fn get_codec(id: CodecId, memlimit: Option<usize>) -> Box<dyn Codec> {
    match id {
        CodecId::Auto => Box::new(AutoCodec {
            lzma: LzmaCodec { memlimit },
            xz:   XzCodec { memlimit },
        }),
        CodecId::Lzma => Box::new(LzmaCodec { memlimit }),
        CodecId::Xz   => Box::new(XzCodec { memlimit }),
    }
}
