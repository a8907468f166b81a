pub mod cursor;
pub mod codec;
pub mod frames;
pub mod replay;
pub mod decoder;
pub mod batch;

pub use cursor::{Cursor, CursorError};
pub use codec::{CodecId, get_codec};
pub use decoder::{decode_from_bytes, decode_from_path, DecodeError, DecodeOptions, ReplayDecoder};
pub use replay::{GameMode, KeyState, LifebarSample, Mods, Position, Replay, ReplayFrame};
