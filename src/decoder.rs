//! Replay decoder: binary layout → [`Replay`].
//!
//! # Layout
//! All integers are little-endian.
//!
//! ```text
//! u8   mode
//! i32  version
//! str  beatmap_hash, player_name, replay_hash
//! i16  count_300, count_100, count_50, count_geki, count_katu, count_miss
//! i32  score
//! i16  max_combo
//! u8   perfect
//! u32  mods
//! str  lifebar
//! i64  timestamp
//! i32  frame_stream_length
//! [u8] compressed frames
//! i64 | i32  online_score_id    (version-gated)
//! f64  target_practice_accuracy (only with the target-practice mod)
//! ```
//!
//! # Phases
//! Decoding runs three phases in order and never goes back:
//!   1. common fields, read verbatim;
//!   2. the lifebar and the compressed frame stream, including extraction
//!      of the RNG seed frame;
//!   3. optional trailer fields gated on `version` and `mods`.
//!
//! Any failure to read a mandatory field aborts the decode; no partial
//! replay is ever returned.  Trailing bytes after the last field are
//! ignored.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::codec::{get_codec, Codec, CodecError, CodecId};
use crate::cursor::{Cursor, CursorError, FixedWidth};
use crate::frames::{parse_frames, parse_lifebar};
use crate::replay::{
    GameMode, Mods, Position, Replay, VERSION_FIRST_OSZ2, VERSION_HAS_LONG_ID, VERSION_HAS_RNG,
};

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to read {field}: {source}")]
    Field {
        field:  &'static str,
        #[source]
        source: CursorError,
    },
    #[error("Invalid frame stream length: {0}")]
    InvalidFrameStreamLength(i32),
    #[error("Frame stream: {0}")]
    Decompression(#[from] CodecError),
    #[error("Replay file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl DecodeError {
    /// The underlying cursor failure, if this error came from a field read.
    pub fn cursor_error(&self) -> Option<&CursorError> {
        match self {
            DecodeError::Field { source, .. } => Some(source),
            _                                 => None,
        }
    }
}

/// Attach the field name to a cursor failure.
trait FieldContext<T> {
    fn field(self, field: &'static str) -> Result<T, DecodeError>;
}

impl<T> FieldContext<T> for Result<T, CursorError> {
    fn field(self, field: &'static str) -> Result<T, DecodeError> {
        self.map_err(|source| DecodeError::Field { field, source })
    }
}

fn read<T: FixedWidth>(cursor: &mut Cursor<'_>, field: &'static str) -> Result<T, DecodeError> {
    cursor.read_fixed::<T>().field(field)
}

// ── DecodeOptions ────────────────────────────────────────────────────────────

/// Configuration for [`ReplayDecoder::new`].
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Container of the frame stream; `Auto` sniffs it per file.
    pub codec:    CodecId,
    /// Upper bound on the LZMA dictionary buffer, in bytes.  `.xz` frame
    /// streams cannot be bounded and fail to decode while this is set.
    pub memlimit: Option<usize>,
}

// ── ReplayDecoder ────────────────────────────────────────────────────────────

pub struct ReplayDecoder {
    codec: Box<dyn Codec>,
}

impl Default for ReplayDecoder {
    fn default() -> Self {
        Self::new(DecodeOptions::default())
    }
}

impl ReplayDecoder {
    pub fn new(opts: DecodeOptions) -> Self {
        Self { codec: get_codec(opts.codec, opts.memlimit) }
    }

    /// Use a caller-supplied decompressor for the frame stream.
    pub fn with_codec(codec: Box<dyn Codec>) -> Self {
        Self { codec }
    }

    pub fn codec_id(&self) -> CodecId {
        self.codec.codec_id()
    }

    /// Decode a replay held in memory.
    pub fn decode(&self, data: &[u8]) -> Result<Replay, DecodeError> {
        let mut cursor = Cursor::new(data);

        let mut replay = decode_common_fields(&mut cursor)?;
        self.decode_complex_fields(&mut cursor, &mut replay)?;
        decode_optional_fields(&mut cursor, &mut replay)?;

        debug!(
            player    = %replay.player_name,
            version   = replay.version,
            frames    = replay.frames.len(),
            trailing  = cursor.remaining(),
            "decoded replay"
        );
        Ok(replay)
    }

    /// Read `path` once and decode it.
    pub fn decode_file<P: AsRef<Path>>(&self, path: P) -> Result<Replay, DecodeError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => DecodeError::NotFound(path.to_owned()),
            _                       => DecodeError::Io(e),
        })?;
        self.decode(&data)
    }

    // ── Phase 2 ──────────────────────────────────────────────────────────────

    fn decode_complex_fields(
        &self,
        cursor: &mut Cursor<'_>,
        replay: &mut Replay,
    ) -> Result<(), DecodeError> {
        let lifebar = cursor.read_string().field("lifebar")?;
        replay.lifebar   = parse_lifebar(&lifebar);
        replay.timestamp = read(cursor, "timestamp")?;

        let length: i32 = read(cursor, "frame stream length")?;
        let length = match usize::try_from(length) {
            Ok(n) if n > 0 => n,
            _              => return Err(DecodeError::InvalidFrameStreamLength(length)),
        };
        let compressed   = cursor.slice(length).field("compressed frames")?;
        let decompressed = self.codec.decompress(compressed)?;
        replay.frames    = parse_frames(&String::from_utf8_lossy(&decompressed));

        if replay.version >= VERSION_HAS_RNG {
            let seed = take_rng_seed(replay);
            replay.rng_seed = seed;
        } else if replay.frames.last().is_some_and(|f| f.is_sentinel()) {
            warn!(version = replay.version, "sentinel frame in a replay that predates RNG seeds");
        }
        Ok(())
    }
}

// ── Phase 1 ──────────────────────────────────────────────────────────────────

fn decode_common_fields(cursor: &mut Cursor<'_>) -> Result<Replay, DecodeError> {
    Ok(Replay {
        mode:         GameMode::from_u8(read(cursor, "mode")?),
        version:      read(cursor, "version")?,
        beatmap_hash: cursor.read_string().field("beatmap hash")?,
        player_name:  cursor.read_string().field("player name")?,
        replay_hash:  cursor.read_string().field("replay hash")?,
        count_300:    read(cursor, "300 count")?,
        count_100:    read(cursor, "100 count")?,
        count_50:     read(cursor, "50 count")?,
        count_geki:   read(cursor, "geki count")?,
        count_katu:   read(cursor, "katu count")?,
        count_miss:   read(cursor, "miss count")?,
        score:        read(cursor, "score")?,
        max_combo:    read(cursor, "max combo")?,
        perfect:      read(cursor, "perfect")?,
        mods:         Mods::from_bits_retain(read(cursor, "mods")?),

        lifebar:      Vec::new(),
        timestamp:    0,
        frames:       Vec::new(),

        rng_seed:                 None,
        online_score_id:          None,
        target_practice_accuracy: None,
    })
}

/// Pop the trailing `-12345|0|0|seed` frame, if present, and return its
/// seed.  Only the last frame is examined and the sequence is untouched
/// unless it matches.
fn take_rng_seed(replay: &mut Replay) -> Option<i32> {
    let last = replay.frames.last()?;
    if !last.is_sentinel() || last.position != Position::ORIGIN {
        return None;
    }
    let seed = last.keys.bits() as i32;
    replay.frames.pop();
    debug!(seed, "extracted RNG seed frame");
    Some(seed)
}

// ── Phase 3 ──────────────────────────────────────────────────────────────────

fn decode_optional_fields(cursor: &mut Cursor<'_>, replay: &mut Replay) -> Result<(), DecodeError> {
    replay.online_score_id = if replay.version >= VERSION_HAS_LONG_ID {
        Some(read::<i64>(cursor, "online score id")?)
    } else if replay.version >= VERSION_FIRST_OSZ2 {
        Some(i64::from(read::<i32>(cursor, "online score id")?))
    } else {
        None
    };

    if replay.mods.has(Mods::TARGET) {
        replay.target_practice_accuracy = Some(read(cursor, "target practice accuracy")?);
    }
    Ok(())
}

// ── Convenience entry points ─────────────────────────────────────────────────

/// Decode a replay held in memory with default options.
pub fn decode_from_bytes(data: &[u8]) -> Result<Replay, DecodeError> {
    ReplayDecoder::default().decode(data)
}

/// Read and decode a replay file with default options.
pub fn decode_from_path<P: AsRef<Path>>(path: P) -> Result<Replay, DecodeError> {
    ReplayDecoder::default().decode_file(path)
}
