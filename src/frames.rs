//! Text decoding of the frame stream and the lifebar graph.
//!
//! Both are comma-separated lists of pipe-separated numeric tuples:
//!
//! | Stream  | Tuple                          |
//! |---------|--------------------------------|
//! | frames  | `delta \| x \| y \| keys`      |
//! | lifebar | `time \| percent`              |
//!
//! A segment with the wrong number of fields, or any field that fails to
//! parse, is dropped whole.  Fields are never defaulted to zero.  Dropped
//! segments are logged, not escalated: a damaged payload still yields every
//! intact tuple.

use std::str::FromStr;
use tracing::{debug, trace};

use crate::replay::{KeyState, LifebarSample, Position, ReplayFrame, SENTINEL_DELTA};

pub const SEGMENT_SEPARATOR: char = ',';
pub const FIELD_SEPARATOR:   char = '|';

/// Split `segment` into exactly `N` fields, or `None` on any other count.
fn split_fields<const N: usize>(segment: &str) -> Option<[&str; N]> {
    let mut out = [""; N];
    let mut fields = segment.split(FIELD_SEPARATOR);
    for slot in out.iter_mut() {
        *slot = fields.next()?;
    }
    match fields.next() {
        Some(_) => None,
        None    => Some(out),
    }
}

/// An explicit `+` sign is not part of the number grammar.
fn parse<T: FromStr>(field: &str) -> Option<T> {
    if field.starts_with('+') {
        return None;
    }
    field.parse().ok()
}

/// Like [`parse`], but `inf` and `NaN` spellings are rejected too.
fn parse_finite(field: &str) -> Option<f32> {
    parse::<f32>(field).filter(|v| v.is_finite())
}

fn parse_frame(segment: &str) -> Option<(i32, f32, f32, i32)> {
    let [delta, x, y, keys] = split_fields::<4>(segment)?;
    Some((parse(delta)?, parse_finite(x)?, parse_finite(y)?, parse(keys)?))
}

fn parse_sample(segment: &str) -> Option<LifebarSample> {
    let [time, percent] = split_fields::<2>(segment)?;
    Some(LifebarSample { time: parse(time)?, percent: parse_finite(percent)? })
}

/// Decode the decompressed frame stream.
///
/// `time` is a running sum of deltas, taken after the frame's own delta is
/// added.  Sentinel frames ([`SENTINEL_DELTA`]) do not contribute and repeat
/// the previous time.
pub fn parse_frames(text: &str) -> Vec<ReplayFrame> {
    let mut frames  = Vec::new();
    let mut elapsed = 0i32;
    let mut dropped = 0usize;

    for segment in text.split(SEGMENT_SEPARATOR) {
        let Some((delta, x, y, keys)) = parse_frame(segment) else {
            if !segment.is_empty() {
                trace!(segment, "dropping malformed frame");
            }
            dropped += 1;
            continue;
        };

        if delta != SENTINEL_DELTA {
            elapsed = elapsed.wrapping_add(delta);
        }

        frames.push(ReplayFrame {
            delta,
            time:     elapsed,
            position: Position::new(x, y),
            keys:     KeyState::from_bits_retain(keys as u32),
        });
    }

    debug!(frames = frames.len(), dropped, "parsed frame stream");
    frames
}

/// Decode the lifebar graph string.
pub fn parse_lifebar(text: &str) -> Vec<LifebarSample> {
    let mut samples = Vec::new();
    let mut dropped = 0usize;

    for segment in text.split(SEGMENT_SEPARATOR) {
        match parse_sample(segment) {
            Some(sample) => samples.push(sample),
            None => {
                if !segment.is_empty() {
                    trace!(segment, "dropping malformed lifebar sample");
                }
                dropped += 1;
            }
        }
    }

    debug!(samples = samples.len(), dropped, "parsed lifebar");
    samples
}
