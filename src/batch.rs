//! Decoding many replay files at once.
//!
//! Each decode owns its cursor and buffers, so independent files need no
//! synchronisation.  With the `parallel` feature the work is spread over
//! Rayon's global pool; otherwise files are decoded one after another.
//! Either way results come back in input order, and one bad file never
//! affects the others.

use std::path::{Path, PathBuf};

use crate::decoder::{DecodeError, ReplayDecoder};
use crate::replay::Replay;

/// Outcome for one input path.
#[derive(Debug)]
pub struct BatchEntry {
    pub path:   PathBuf,
    pub result: Result<Replay, DecodeError>,
}

impl BatchEntry {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Decode every path in `paths` with `decoder`.
///
/// Returns one [`BatchEntry`] per input, in the same order.
pub fn decode_files<P: AsRef<Path> + Sync>(decoder: &ReplayDecoder, paths: &[P]) -> Vec<BatchEntry> {
    let decode_one = |path: &P| {
        let path = path.as_ref();
        BatchEntry {
            path:   path.to_owned(),
            result: decoder.decode_file(path),
        }
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        paths.par_iter().map(decode_one).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        paths.iter().map(decode_one).collect()
    }
}

/// Decode in-memory buffers, in order.
pub fn decode_buffers(decoder: &ReplayDecoder, buffers: &[&[u8]]) -> Vec<Result<Replay, DecodeError>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        buffers.par_iter().map(|data| decoder.decode(data)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        buffers.iter().map(|data| decoder.decode(data)).collect()
    }
}
