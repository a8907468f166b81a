//! Decoded replay data model.
//!
//! A [`Replay`] owns all of its strings and sequences.  Optional trailer
//! fields are `Option`s populated strictly from the version and mod values
//! read earlier in the same file; nothing is inferred from trailing bytes.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// First version that stores an online score id (as a 32-bit integer).
pub const VERSION_FIRST_OSZ2:  i32 = 20121008;
/// First version that may append an RNG seed frame to the frame stream.
pub const VERSION_HAS_RNG:     i32 = 20130319;
/// First version that stores the online score id as a 64-bit integer.
pub const VERSION_HAS_LONG_ID: i32 = 20140721;

/// Frame delta marking a non-chronological frame.  It never advances the
/// running time.
pub const SENTINEL_DELTA: i32 = -12345;

/// Windows ticks (100 ns since 0001-01-01) at the Unix epoch.
pub const TICKS_AT_UNIX_EPOCH: i64 = 621_355_968_000_000_000;
pub const TICKS_PER_SECOND:    i64 = 10_000_000;

// ── GameMode ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GameMode {
    Osu,
    Taiko,
    Catch,
    Mania,
    /// A mode byte this build does not know.  Kept, not rejected.
    Unknown(u8),
}

impl GameMode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => GameMode::Osu,
            1 => GameMode::Taiko,
            2 => GameMode::Catch,
            3 => GameMode::Mania,
            v => GameMode::Unknown(v),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            GameMode::Osu        => 0,
            GameMode::Taiko      => 1,
            GameMode::Catch      => 2,
            GameMode::Mania      => 3,
            GameMode::Unknown(v) => v,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GameMode::Osu        => "osu!",
            GameMode::Taiko      => "taiko",
            GameMode::Catch      => "catch",
            GameMode::Mania      => "mania",
            GameMode::Unknown(_) => "unknown",
        }
    }
}

// ── Bit-sets ─────────────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Gameplay modifiers active for the play.  Unknown bits are retained.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Mods: u32 {
        const NO_FAIL      = 1 << 0;
        const EASY         = 1 << 1;
        const NO_VIDEO     = 1 << 2;
        const HIDDEN       = 1 << 3;
        const HARD_ROCK    = 1 << 4;
        const SUDDEN_DEATH = 1 << 5;
        const DOUBLE_TIME  = 1 << 6;
        const RELAX        = 1 << 7;
        const HALF_TIME    = 1 << 8;
        const NIGHTCORE    = 1 << 9;
        const FLASHLIGHT   = 1 << 10;
        const AUTOPLAY     = 1 << 11;
        const SPUN_OUT     = 1 << 12;
        const AUTOPILOT    = 1 << 13;
        const PERFECT      = 1 << 14;
        const KEY4         = 1 << 15;
        const KEY5         = 1 << 16;
        const KEY6         = 1 << 17;
        const KEY7         = 1 << 18;
        const KEY8         = 1 << 19;
        const FADE_IN      = 1 << 20;
        const RANDOM       = 1 << 21;
        const CINEMA       = 1 << 22;
        const TARGET       = 1 << 23;
        const KEY9         = 1 << 24;
        const KEY_COOP     = 1 << 25;
        const KEY1         = 1 << 26;
        const KEY3         = 1 << 27;
        const KEY2         = 1 << 28;
        const SCORE_V2     = 1 << 29;
        const MIRROR       = 1 << 30;
    }
}

const MOD_ACRONYMS: &[(Mods, &str)] = &[
    (Mods::NO_FAIL, "NF"),
    (Mods::EASY, "EZ"),
    (Mods::NO_VIDEO, "NV"),
    (Mods::HIDDEN, "HD"),
    (Mods::HARD_ROCK, "HR"),
    (Mods::SUDDEN_DEATH, "SD"),
    (Mods::DOUBLE_TIME, "DT"),
    (Mods::RELAX, "RX"),
    (Mods::HALF_TIME, "HT"),
    (Mods::NIGHTCORE, "NC"),
    (Mods::FLASHLIGHT, "FL"),
    (Mods::AUTOPLAY, "AT"),
    (Mods::SPUN_OUT, "SO"),
    (Mods::AUTOPILOT, "AP"),
    (Mods::PERFECT, "PF"),
    (Mods::KEY4, "4K"),
    (Mods::KEY5, "5K"),
    (Mods::KEY6, "6K"),
    (Mods::KEY7, "7K"),
    (Mods::KEY8, "8K"),
    (Mods::FADE_IN, "FI"),
    (Mods::RANDOM, "RD"),
    (Mods::CINEMA, "CN"),
    (Mods::TARGET, "TP"),
    (Mods::KEY9, "9K"),
    (Mods::KEY_COOP, "COOP"),
    (Mods::KEY1, "1K"),
    (Mods::KEY3, "3K"),
    (Mods::KEY2, "2K"),
    (Mods::SCORE_V2, "V2"),
    (Mods::MIRROR, "MR"),
];

impl Mods {
    /// True if every bit of `flag` is set.
    #[inline]
    pub fn has(self, flag: Mods) -> bool {
        self.contains(flag)
    }

    /// Short display names, lowest bit first.  Nightcore and perfect imply
    /// double time and sudden death; the implied acronym is not repeated.
    pub fn acronyms(self) -> Vec<&'static str> {
        let mut shown = self;
        if shown.has(Mods::NIGHTCORE) {
            shown.remove(Mods::DOUBLE_TIME);
        }
        if shown.has(Mods::PERFECT) {
            shown.remove(Mods::SUDDEN_DEATH);
        }
        MOD_ACRONYMS
            .iter()
            .filter(|(m, _)| shown.has(*m))
            .map(|(_, name)| *name)
            .collect()
    }
}

bitflags::bitflags! {
    /// Input state of one frame.  Mania stores column bits here and the RNG
    /// seed frame stores the seed, so unknown bits are retained.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyState: u32 {
        const M1    = 1 << 0;
        const M2    = 1 << 1;
        const K1    = 1 << 2;
        const K2    = 1 << 3;
        const SMOKE = 1 << 4;
    }
}

// Bit-sets serialize as their raw bits.
impl Serialize for Mods {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bits().serialize(serializer)
    }
}

impl Serialize for KeyState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bits().serialize(serializer)
    }
}

// ── Value types ──────────────────────────────────────────────────────────────

/// Cursor position in playfield coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Position) -> f32 {
        Position::new(self.x - other.x, self.y - other.y).length()
    }

    /// Unit vector in the same direction.  The origin has no direction and
    /// normalizes to NaN components.
    pub fn normalize(self) -> Self {
        let len = self.length();
        Position::new(self.x / len, self.y / len)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LifebarSample {
    /// Milliseconds into the play.
    pub time:    i32,
    /// Health, 0.0 to 1.0.
    pub percent: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReplayFrame {
    /// Milliseconds since the previous frame.
    pub delta:    i32,
    /// Absolute time of the frame.  Sentinel frames repeat the previous time.
    pub time:     i32,
    pub position: Position,
    pub keys:     KeyState,
}

impl ReplayFrame {
    pub fn is_sentinel(&self) -> bool {
        self.delta == SENTINEL_DELTA
    }
}

// ── Replay ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Replay {
    pub mode:         GameMode,
    /// Game build the replay was recorded on, e.g. `20131216`.
    pub version:      i32,
    pub beatmap_hash: String,
    pub player_name:  String,
    pub replay_hash:  String,

    pub count_300:    i16,
    pub count_100:    i16,
    pub count_50:     i16,
    pub count_geki:   i16,
    pub count_katu:   i16,
    pub count_miss:   i16,

    pub score:        i32,
    pub max_combo:    i16,
    /// Full combo with no slider breaks.
    pub perfect:      bool,
    pub mods:         Mods,

    pub lifebar:      Vec<LifebarSample>,
    /// Windows ticks; see [`Replay::played_at`].
    pub timestamp:    i64,
    pub frames:       Vec<ReplayFrame>,

    pub rng_seed:                 Option<i32>,
    pub online_score_id:          Option<i64>,
    pub target_practice_accuracy: Option<f64>,
}

impl Replay {
    /// Taiko: 150s (goods) share the 100s slot.
    pub fn count_150(&self) -> i16 { self.count_100 }

    /// Catch: small fruit share the 50s slot.
    pub fn count_small_fruit(&self) -> i16 { self.count_50 }

    /// Mania: max 300s (rainbow) share the geki slot.
    pub fn count_max_300(&self) -> i16 { self.count_geki }

    /// Mania: 200s share the katu slot.
    pub fn count_200(&self) -> i16 { self.count_katu }

    /// Play date, or `None` if the tick count is outside chrono's range.
    pub fn played_at(&self) -> Option<DateTime<Utc>> {
        let since_epoch = self.timestamp.checked_sub(TICKS_AT_UNIX_EPOCH)?;
        let secs  = since_epoch.div_euclid(TICKS_PER_SECOND);
        let nanos = since_epoch.rem_euclid(TICKS_PER_SECOND) * 100;
        DateTime::<Utc>::from_timestamp(secs, nanos as u32)
    }

    /// Absolute time of the last frame, in milliseconds.
    pub fn duration_ms(&self) -> i32 {
        self.frames.last().map_or(0, |f| f.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn game_mode_bytes() {
        for v in 0..=5u8 {
            assert_eq!(GameMode::from_u8(v).as_u8(), v);
        }
        assert_eq!(GameMode::from_u8(3), GameMode::Mania);
        assert_eq!(GameMode::from_u8(9), GameMode::Unknown(9));
    }

    #[test]
    fn mods_set_algebra() {
        let a = Mods::HIDDEN | Mods::HARD_ROCK;
        let b = Mods::HARD_ROCK | Mods::DOUBLE_TIME;
        assert_eq!(a.union(b), Mods::HIDDEN | Mods::HARD_ROCK | Mods::DOUBLE_TIME);
        assert_eq!(a.intersection(b), Mods::HARD_ROCK);
        assert_eq!(a.difference(b), Mods::HIDDEN);
        assert!(a.has(Mods::HIDDEN));
        assert!(!a.has(Mods::TARGET));
        assert_eq!(Mods::TARGET.bits(), 0x0080_0000);
    }

    #[test]
    fn unknown_mod_bits_survive() {
        let mods = Mods::from_bits_retain(0x8000_0008);
        assert!(mods.has(Mods::HIDDEN));
        assert_eq!(mods.bits(), 0x8000_0008);
    }

    #[test]
    fn acronyms_collapse_implied_mods() {
        let mods = Mods::HIDDEN | Mods::DOUBLE_TIME | Mods::NIGHTCORE;
        assert_eq!(mods.acronyms(), vec!["HD", "NC"]);
        assert_eq!((Mods::SUDDEN_DEATH | Mods::PERFECT).acronyms(), vec!["PF"]);
        assert!(Mods::empty().acronyms().is_empty());
    }

    #[test]
    fn position_math() {
        let p = Position::new(3.0, 4.0);
        assert_eq!(p.length(), 5.0);
        assert_eq!(p.distance(Position::ORIGIN), 5.0);
        let n = p.normalize();
        assert!((n.length() - 1.0).abs() < 1e-6);
    }

    fn replay_at(timestamp: i64) -> Replay {
        Replay {
            mode: GameMode::Osu,
            version: VERSION_HAS_LONG_ID,
            beatmap_hash: String::new(),
            player_name: String::new(),
            replay_hash: String::new(),
            count_300: 1,
            count_100: 2,
            count_50: 3,
            count_geki: 4,
            count_katu: 5,
            count_miss: 6,
            score: 0,
            max_combo: 0,
            perfect: false,
            mods: Mods::empty(),
            lifebar: Vec::new(),
            timestamp,
            frames: Vec::new(),
            rng_seed: None,
            online_score_id: None,
            target_practice_accuracy: None,
        }
    }

    #[test]
    fn played_at_converts_windows_ticks() {
        // 2014-03-15T12:30:45.5Z
        let ticks = TICKS_AT_UNIX_EPOCH + 1_394_886_645 * TICKS_PER_SECOND + 5_000_000;
        let at = replay_at(ticks).played_at().unwrap();
        assert_eq!((at.year(), at.month(), at.day()), (2014, 3, 15));
        assert_eq!((at.hour(), at.minute(), at.second()), (12, 30, 45));
        assert_eq!(at.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn played_at_out_of_range() {
        assert!(replay_at(i64::MIN).played_at().is_none());
    }

    #[test]
    fn aliased_counters_share_slots() {
        let r = replay_at(0);
        assert_eq!(r.count_150(), r.count_100);
        assert_eq!(r.count_small_fruit(), r.count_50);
        assert_eq!(r.count_max_300(), r.count_geki);
        assert_eq!(r.count_200(), r.count_katu);
        assert_eq!(r.duration_ms(), 0);
    }
}
