//! Press-and-hold breathing exercise.
//!
//! The session is a pure reducer: events go in, commands come out, and the
//! owner turns commands into timers on the shared scheduler.

use serde::{Deserialize, Serialize};

pub const STEP_INTERVAL_MS: u64 = 40;
pub const FILL_STEP: f64 = 2.0;
pub const DRAIN_STEP: f64 = 1.5;
pub const HOLD_MS: u64 = 3_000;
pub const REST_MS: u64 = 1_000;
/// Without any press in this window the exercise completes itself.
pub const FALLBACK_MS: u64 = 15_000;
pub const TARGET_CYCLES: u8 = 4;
/// Heart rate drop per completed breath.
pub const HEART_EASE_PER_CYCLE: f64 = 8.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BreathPhase {
    #[default]
    Idle,
    /// Waiting for the press.
    Inhale,
    /// Pressed; progress fills.
    Inhaling,
    Hold,
    /// Full; waiting for the release.
    Exhale,
    /// Released; progress drains.
    Exhaling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreathEvent {
    Press,
    Release,
    FillTick,
    DrainTick,
    HoldElapsed,
    RestElapsed,
    FallbackElapsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreathCommand {
    StartFallback,
    CancelFallback,
    StartFill,
    StopFill,
    StartDrain,
    StopDrain,
    StartHold,
    CancelHold,
    StartRest,
    /// A full breath finished; carries the new cycle count.
    CycleCompleted(u8),
    /// The exercise is over; the session can be dropped.
    Finished,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreathingSession {
    phase: BreathPhase,
    progress: f64,
    cycles: u8,
    interacted: bool,
    /// Between a completed breath and the next inhale prompt.
    resting: bool,
    finished: bool,
}

impl BreathingSession {
    /// A fresh session waiting for the first press, plus its fallback timer.
    pub fn start() -> (Self, Vec<BreathCommand>) {
        let session = Self {
            phase: BreathPhase::Inhale,
            progress: 0.0,
            cycles: 0,
            interacted: false,
            resting: false,
            finished: false,
        };
        (session, vec![BreathCommand::StartFallback])
    }

    pub fn phase(&self) -> BreathPhase {
        self.phase
    }

    /// Fill level in [0, 100].
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn cycles(&self) -> u8 {
        self.cycles
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn handle(&mut self, event: BreathEvent) -> Vec<BreathCommand> {
        use BreathCommand as C;

        if self.finished {
            return Vec::new();
        }

        match event {
            BreathEvent::Press => {
                let mut cmds = Vec::new();
                if !self.interacted {
                    self.interacted = true;
                    cmds.push(C::CancelFallback);
                }
                if self.phase == BreathPhase::Inhale {
                    self.phase = BreathPhase::Inhaling;
                    cmds.extend([C::StopDrain, C::StartFill]);
                }
                cmds
            }
            BreathEvent::Release => match self.phase {
                BreathPhase::Inhaling | BreathPhase::Hold | BreathPhase::Exhale => {
                    self.phase = BreathPhase::Exhaling;
                    vec![C::StopFill, C::CancelHold, C::StartDrain]
                }
                _ => Vec::new(),
            },
            BreathEvent::FillTick => {
                if self.phase != BreathPhase::Inhaling {
                    return vec![C::StopFill];
                }
                if self.progress >= 100.0 {
                    self.progress = 100.0;
                    self.phase = BreathPhase::Hold;
                    return vec![C::StopFill, C::StartHold];
                }
                self.progress = (self.progress + FILL_STEP).min(100.0);
                Vec::new()
            }
            BreathEvent::HoldElapsed => {
                if self.phase == BreathPhase::Hold {
                    self.phase = BreathPhase::Exhale;
                }
                Vec::new()
            }
            BreathEvent::DrainTick => {
                if self.phase != BreathPhase::Exhaling || self.resting {
                    return vec![C::StopDrain];
                }
                if self.progress > 0.0 {
                    self.progress = (self.progress - DRAIN_STEP).max(0.0);
                    return Vec::new();
                }

                self.cycles = (self.cycles + 1).min(TARGET_CYCLES);
                let mut cmds = vec![C::StopDrain, C::CycleCompleted(self.cycles)];
                if self.cycles >= TARGET_CYCLES {
                    self.finish();
                    cmds.extend([C::CancelFallback, C::Finished]);
                } else {
                    self.resting = true;
                    cmds.push(C::StartRest);
                }
                cmds
            }
            BreathEvent::RestElapsed => {
                if self.resting {
                    self.resting = false;
                    self.phase = BreathPhase::Inhale;
                }
                Vec::new()
            }
            BreathEvent::FallbackElapsed => {
                if self.interacted {
                    return Vec::new();
                }
                self.cycles = TARGET_CYCLES;
                self.finish();
                vec![C::StopFill, C::StopDrain, C::CancelHold, C::Finished]
            }
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.phase = BreathPhase::Idle;
    }

    pub fn instruction(&self) -> &'static str {
        match self.phase {
            BreathPhase::Idle => "",
            BreathPhase::Inhale => "PRESS & HOLD TO BREATHE IN",
            BreathPhase::Inhaling => "BREATHE IN...",
            BreathPhase::Hold => "HOLD...",
            BreathPhase::Exhale => "RELEASE TO BREATHE OUT",
            BreathPhase::Exhaling => "BREATHE OUT...",
        }
    }

    /// Longer hint shown under the circle.
    pub fn hint(&self) -> &'static str {
        match self.phase {
            BreathPhase::Inhale => "Press and hold to breathe in deeply through your nose",
            BreathPhase::Exhale => "Release to breathe out slowly through your mouth",
            _ => "Follow the circle",
        }
    }

    /// Circle diameter in rem.
    pub fn circle_size_rem(&self) -> f64 {
        20.0 + self.progress * 0.6
    }

    /// Glow radius in px around the circle.
    pub fn circle_glow_px(&self) -> f64 {
        match self.phase {
            BreathPhase::Hold => 30.0 + self.progress / 2.0,
            BreathPhase::Idle => 10.0,
            _ => 20.0 + self.progress / 2.0,
        }
    }
}
