use serde::{Deserialize, Serialize};

/// Share of each beat spent in the enlarged, glowing state.
const SYSTOLE_SHARE: f64 = 0.3;
const BEAT_SCALE: f64 = 1.2;

/// Milliseconds between beats at `bpm`.
pub fn beat_interval_ms(bpm: f64) -> u64 {
    (60_000.0 / bpm.max(1.0)).round() as u64
}

pub fn systole_ms(bpm: f64) -> u64 {
    (beat_interval_ms(bpm) as f64 * SYSTOLE_SHARE).round() as u64
}

/// Playback rate for the looped heartbeat sample, recorded at 70 bpm.
pub fn playback_rate(bpm: f64) -> f64 {
    bpm / 70.0
}

/// The pulsing heart icon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub scale: f64,
    pub glow: f64,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self { scale: 1.0, glow: 0.0 }
    }
}

impl Heartbeat {
    pub fn beat(&mut self, bpm: f64) {
        self.scale = BEAT_SCALE;
        self.glow = bpm / 60.0;
    }

    pub fn relax(&mut self) {
        *self = Self::default();
    }
}
