use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::stage::{Stage, TextStyle};

/// Where the current line sits on screen, in percent of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextPosition {
    pub x: f64,
    pub y: f64,
}

impl Default for TextPosition {
    fn default() -> Self {
        Self { x: 50.0, y: 50.0 }
    }
}

const FIRST_LINE_POSITION: TextPosition = TextPosition { x: 30.0, y: 30.0 };

/// New lines land somewhere in the middle 40% of the screen.
fn random_position<R: Rng>(rng: &mut R) -> TextPosition {
    TextPosition {
        x: rng.random_range(30.0..70.0),
        y: rng.random_range(30.0..70.0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    NextLine { index: usize },
    NextStage(Stage),
    /// Last line of the turning stage: the breathing exercise takes over.
    BeginBreathing,
    /// Nothing further to advance to.
    Stay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeState {
    stage: Stage,
    line_index: usize,
    position: TextPosition,
    style: TextStyle,
}

impl Default for NarrativeState {
    fn default() -> Self {
        Self {
            stage: Stage::Start,
            line_index: 0,
            position: TextPosition::default(),
            style: TextStyle::default(),
        }
    }
}

impl NarrativeState {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn line_index(&self) -> usize {
        self.line_index
    }

    pub fn position(&self) -> TextPosition {
        self.position
    }

    pub fn style(&self) -> TextStyle {
        self.style
    }

    pub fn current_line(&self) -> Option<&'static str> {
        self.stage.lines().get(self.line_index).copied()
    }

    /// Fraction of the stage's lines already behind us.
    pub fn progress(&self) -> f64 {
        let total = self.stage.lines().len().max(1);
        self.line_index as f64 / total as f64
    }

    /// Move forward to `stage`. Refuses (and returns false) for anything that
    /// is not strictly later than the current stage.
    pub fn enter(&mut self, stage: Stage) -> bool {
        if stage <= self.stage {
            warn!("Refusing to move from {:?} back to {:?}", self.stage, stage);
            return false;
        }
        debug!("Stage {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
        self.line_index = 0;
        self.style = stage.style();
        if stage == Stage::WakeUp {
            self.position = FIRST_LINE_POSITION;
        }
        true
    }

    pub fn advance<R: Rng>(&mut self, rng: &mut R) -> Advance {
        if !self.stage.is_story() {
            return Advance::Stay;
        }

        let next_index = self.line_index + 1;
        if next_index < self.stage.lines().len() {
            self.line_index = next_index;
            self.position = random_position(rng);
            return Advance::NextLine { index: next_index };
        }

        if self.stage == Stage::Turning {
            return Advance::BeginBreathing;
        }

        match self.stage.next() {
            Some(next) => {
                self.enter(next);
                Advance::NextStage(next)
            }
            None => Advance::Stay,
        }
    }

    /// Leave the turning stage once the breathing exercise is done.
    pub fn finish_breathing(&mut self) -> Option<Stage> {
        if self.stage != Stage::Turning {
            return None;
        }
        let next = self.stage.next()?;
        self.enter(next).then_some(next)
    }

    /// The only way back: return to the start screen.
    pub fn reset(&mut self) {
        debug!("Stage {:?} -> Start (reset)", self.stage);
        *self = Self::default();
    }
}
