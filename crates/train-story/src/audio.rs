//! Volume plan for the five background tracks.
//!
//! The mix never touches a sound device; it emits [`AudioCommand`]s for the
//! host to apply and keeps its own view of every track's volume.

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Track {
    Train,
    Heartbeat,
    Breathing,
    Typing,
    Ambient,
}

impl Track {
    pub const ALL: [Track; 5] = [
        Track::Train,
        Track::Heartbeat,
        Track::Breathing,
        Track::Typing,
        Track::Ambient,
    ];

    pub fn asset_path(self) -> &'static str {
        match self {
            Track::Train => "/assets/audio/train.mp3",
            Track::Heartbeat => "/assets/audio/heartbeat.mp3",
            Track::Breathing => "/assets/audio/breathing.mp3",
            Track::Typing => "/assets/audio/typing.mp3",
            Track::Ambient => "/assets/audio/ambient.mp3",
        }
    }

    /// Typing is a one-shot click; everything else loops.
    pub fn looped(self) -> bool {
        self != Track::Typing
    }

    pub fn initial_volume(self) -> f64 {
        match self {
            Track::Train => 0.3,
            Track::Heartbeat => 0.2,
            Track::Breathing => 0.1,
            Track::Typing => 0.3,
            Track::Ambient => 0.1,
        }
    }

    fn index(self) -> usize {
        match self {
            Track::Train => 0,
            Track::Heartbeat => 1,
            Track::Breathing => 2,
            Track::Typing => 3,
            Track::Ambient => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AudioCommand {
    Play { track: Track },
    Pause { track: Track },
    /// Seek back to the start (retriggers the typing click).
    Rewind { track: Track },
    SetVolume { track: Track, volume: f64 },
    SetPlaybackRate { track: Track, rate: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Fade {
    track: Track,
    from: f64,
    to: f64,
    duration_ms: u64,
    elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioMix {
    enabled: bool,
    volumes: [f64; 5],
    fades: Vec<Fade>,
}

impl Default for AudioMix {
    fn default() -> Self {
        Self {
            enabled: false,
            volumes: Track::ALL.map(Track::initial_volume),
            fades: Vec::new(),
        }
    }
}

impl AudioMix {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.fades.clear();
        }
    }

    pub fn volume(&self, track: Track) -> f64 {
        self.volumes[track.index()]
    }

    pub fn is_fading(&self, track: Track) -> bool {
        self.fades.iter().any(|f| f.track == track)
    }

    pub fn play(&self, track: Track, out: &mut Vec<AudioCommand>) {
        if self.enabled {
            out.push(AudioCommand::Play { track });
        }
    }

    pub fn pause(&self, track: Track, out: &mut Vec<AudioCommand>) {
        if self.enabled {
            out.push(AudioCommand::Pause { track });
        }
    }

    /// Retrigger a one-shot sample from the top.
    pub fn retrigger(&self, track: Track, out: &mut Vec<AudioCommand>) {
        if self.enabled {
            out.push(AudioCommand::Rewind { track });
            out.push(AudioCommand::Play { track });
        }
    }

    pub fn set_volume(&mut self, track: Track, volume: f64, out: &mut Vec<AudioCommand>) {
        if !self.enabled {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.fades.retain(|f| f.track != track);
        self.volumes[track.index()] = volume;
        out.push(AudioCommand::SetVolume { track, volume });
    }

    pub fn set_playback_rate(&self, track: Track, rate: f64, out: &mut Vec<AudioCommand>) {
        if self.enabled {
            out.push(AudioCommand::SetPlaybackRate { track, rate });
        }
    }

    /// Start a linear fade from the current volume. A newer fade on the same
    /// track replaces the older one.
    pub fn fade(&mut self, track: Track, target: f64, duration_ms: u64) {
        if !self.enabled {
            return;
        }
        self.fades.retain(|f| f.track != track);
        self.fades.push(Fade {
            track,
            from: self.volume(track),
            to: target.clamp(0.0, 1.0),
            duration_ms: duration_ms.max(1),
            elapsed_ms: 0,
        });
    }

    /// Advance all running fades.
    pub fn advance(&mut self, dt_ms: u64, out: &mut Vec<AudioCommand>) {
        for fade in &mut self.fades {
            fade.elapsed_ms = (fade.elapsed_ms + dt_ms).min(fade.duration_ms);
            let t = fade.elapsed_ms as f64 / fade.duration_ms as f64;
            let volume = fade.from + (fade.to - fade.from) * t;
            self.volumes[fade.track.index()] = volume;
            out.push(AudioCommand::SetVolume { track: fade.track, volume });
        }
        self.fades.retain(|f| f.elapsed_ms < f.duration_ms);
    }

    /// Playback failures are expected (autoplay policies, missing files)
    /// and never stop the story.
    pub fn report_error(&self, track: Track, message: &str) {
        warn!(track = ?track, "Audio play error: {}", message);
    }
}
