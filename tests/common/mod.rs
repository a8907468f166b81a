//! Test-side writer for `.osr` buffers.
#![allow(dead_code)]

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

pub fn uleb128(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

pub fn tagged_string(s: &str) -> Vec<u8> {
    if s.is_empty() {
        return vec![0x00];
    }
    let mut out = vec![0x0B];
    out.extend(uleb128(s.len() as u64));
    out.extend_from_slice(s.as_bytes());
    out
}

pub fn lzma(text: &str) -> Vec<u8> {
    let mut out = Vec::new();
    lzma_rs::lzma_compress(&mut std::io::Cursor::new(text.as_bytes()), &mut out).unwrap();
    out
}

pub fn xz(text: &str) -> Vec<u8> {
    let mut out = Vec::new();
    lzma_rs::xz_compress(&mut std::io::Cursor::new(text.as_bytes()), &mut out).unwrap();
    out
}

#[derive(Debug, Clone)]
pub struct ReplayBuilder {
    pub mode:         u8,
    pub version:      i32,
    pub beatmap_hash: String,
    pub player_name:  String,
    pub replay_hash:  String,
    pub counts:       [i16; 6],
    pub score:        i32,
    pub max_combo:    i16,
    pub perfect:      bool,
    pub mods:         u32,
    pub lifebar:      String,
    pub timestamp:    i64,
    /// Already-compressed frame stream.
    pub frames:       Vec<u8>,
    /// Raw bytes appended after the frame stream.
    pub trailer:      Vec<u8>,
}

impl Default for ReplayBuilder {
    fn default() -> Self {
        Self {
            mode:         0,
            version:      20140721,
            beatmap_hash: "d41d8cd98f00b204e9800998ecf8427e".into(),
            player_name:  "peppy".into(),
            replay_hash:  "9e107d9d372bb6826bd81d3542a419d6".into(),
            counts:       [300, 20, 3, 50, 10, 2],
            score:        1_234_567,
            max_combo:    512,
            perfect:      false,
            mods:         0,
            lifebar:      "0|1,1500|0.5".into(),
            timestamp:    635_300_000_000_000_000,
            frames:       lzma("0|256|192|0,16|260|190|1"),
            trailer:      Vec::new(),
        }
    }
}

impl ReplayBuilder {
    pub fn version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn mods(mut self, mods: u32) -> Self {
        self.mods = mods;
        self
    }

    pub fn frame_text(mut self, text: &str) -> Self {
        self.frames = lzma(text);
        self
    }

    pub fn trailer(mut self, bytes: &[u8]) -> Self {
        self.trailer = bytes.to_vec();
        self
    }

    /// Everything up to and including the compressed frames.
    pub fn header(&self) -> Vec<u8> {
        let mut w = Vec::new();
        w.write_u8(self.mode).unwrap();
        w.write_i32::<LittleEndian>(self.version).unwrap();
        w.write_all(&tagged_string(&self.beatmap_hash)).unwrap();
        w.write_all(&tagged_string(&self.player_name)).unwrap();
        w.write_all(&tagged_string(&self.replay_hash)).unwrap();
        for c in self.counts {
            w.write_i16::<LittleEndian>(c).unwrap();
        }
        w.write_i32::<LittleEndian>(self.score).unwrap();
        w.write_i16::<LittleEndian>(self.max_combo).unwrap();
        w.write_u8(self.perfect as u8).unwrap();
        w.write_u32::<LittleEndian>(self.mods).unwrap();
        w.write_all(&tagged_string(&self.lifebar)).unwrap();
        w.write_i64::<LittleEndian>(self.timestamp).unwrap();
        w.write_i32::<LittleEndian>(self.frames.len() as i32).unwrap();
        w.write_all(&self.frames).unwrap();
        w
    }

    pub fn build(&self) -> Vec<u8> {
        let mut w = self.header();
        w.extend_from_slice(&self.trailer);
        w
    }
}

pub fn i32_le(v: i32) -> Vec<u8> { v.to_le_bytes().to_vec() }
pub fn i64_le(v: i64) -> Vec<u8> { v.to_le_bytes().to_vec() }
pub fn f64_le(v: f64) -> Vec<u8> { v.to_le_bytes().to_vec() }
