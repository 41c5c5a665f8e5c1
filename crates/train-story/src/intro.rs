//! Pre-story sequence: the warp into the train and the eyes opening.

pub const WARP_INTERVAL_MS: u64 = 20;
pub const WARP_STEP: f64 = 0.02;

/// Tunnel zoom shown right after the start screen.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Warp {
    progress: f64,
}

impl Warp {
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Returns true once the warp has reached the end.
    pub fn step(&mut self) -> bool {
        self.progress = (self.progress + WARP_STEP).min(1.0);
        // Float steps land a hair under 1.0
        if self.progress >= 1.0 - 1e-9 {
            self.progress = 1.0;
        }
        self.progress >= 1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EyeStep {
    Wait(u64),
    /// Lids open towards `target` with an ease-out curve.
    Open { target: f64, duration_ms: u64 },
    Blink(u64),
    /// Scene comes into focus.
    Settle { light: f64, blur: f64 },
}

pub const EYES_SEQUENCE: &[EyeStep] = &[
    EyeStep::Wait(1_000),
    EyeStep::Open { target: 0.3, duration_ms: 1_000 },
    EyeStep::Wait(800),
    EyeStep::Blink(200),
    EyeStep::Open { target: 0.6, duration_ms: 1_200 },
    EyeStep::Wait(1_000),
    EyeStep::Blink(200),
    EyeStep::Open { target: 0.9, duration_ms: 1_500 },
    EyeStep::Settle { light: 0.4, blur: 2.0 },
    EyeStep::Wait(1_500),
];

/// Scene values while the eyes are still closed.
pub const EYES_CLOSED_LIGHT: f64 = 0.01;
pub const EYES_CLOSED_BLUR: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EyeCue {
    Settle { light: f64, blur: f64 },
    /// Sequence over; the story can begin.
    Done,
}

pub fn ease_out_cubic(x: f64) -> f64 {
    1.0 - (1.0 - x.clamp(0.0, 1.0)).powi(3)
}

#[derive(Debug, Clone, PartialEq)]
pub struct EyesOpening {
    step: usize,
    elapsed: u64,
    openness: f64,
    from: f64,
    done: bool,
}

impl Default for EyesOpening {
    fn default() -> Self {
        Self::new()
    }
}

impl EyesOpening {
    pub fn new() -> Self {
        Self {
            step: 0,
            elapsed: 0,
            openness: 0.0,
            from: 0.0,
            done: false,
        }
    }

    pub fn openness(&self) -> f64 {
        self.openness
    }

    pub fn is_blinking(&self) -> bool {
        matches!(EYES_SEQUENCE.get(self.step), Some(EyeStep::Blink(_)))
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Opacity of the black eyelid overlay.
    pub fn overlay_opacity(&self) -> f64 {
        if self.is_blinking() { 1.0 } else { 1.0 - self.openness }
    }

    /// Move the sequence forward by `dt_ms`, carrying leftover time into
    /// the following steps.
    pub fn advance(&mut self, dt_ms: u64) -> Vec<EyeCue> {
        let mut cues = Vec::new();
        let mut remaining = dt_ms;

        while !self.done {
            let Some(step) = EYES_SEQUENCE.get(self.step).copied() else {
                self.done = true;
                cues.push(EyeCue::Done);
                break;
            };

            match step {
                EyeStep::Settle { light, blur } => {
                    cues.push(EyeCue::Settle { light, blur });
                    self.next_step();
                }
                EyeStep::Wait(duration) | EyeStep::Blink(duration) => {
                    let need = duration - self.elapsed;
                    if remaining < need {
                        self.elapsed += remaining;
                        break;
                    }
                    remaining -= need;
                    self.next_step();
                }
                EyeStep::Open { target, duration_ms } => {
                    let need = duration_ms - self.elapsed;
                    if remaining < need {
                        self.elapsed += remaining;
                        let t = self.elapsed as f64 / duration_ms as f64;
                        self.openness = self.from + (target - self.from) * ease_out_cubic(t);
                        break;
                    }
                    remaining -= need;
                    self.openness = target;
                    self.next_step();
                }
            }
        }

        cues
    }

    fn next_step(&mut self) {
        self.step += 1;
        self.elapsed = 0;
        self.from = self.openness;
    }
}

/// Total length of the eyes-opening sequence.
pub fn eyes_sequence_ms() -> u64 {
    EYES_SEQUENCE
        .iter()
        .map(|s| match s {
            EyeStep::Wait(d) | EyeStep::Blink(d) => *d,
            EyeStep::Open { duration_ms, .. } => *duration_ms,
            EyeStep::Settle { .. } => 0,
        })
        .sum()
}
