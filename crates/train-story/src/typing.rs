/// One character is revealed per tick.
pub const TYPE_INTERVAL_MS: u64 = 60;
/// Delay between a line change and the first revealed character.
pub const LINE_START_DELAY_MS: u64 = 100;
/// A line is forced complete after this long, whatever the reveal state.
pub const SAFETY_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeStep {
    /// One more character became visible.
    Typed,
    /// Everything was already visible; the line is now complete.
    Finished,
    /// The line had completed earlier (stale tick).
    Idle,
}

/// Incremental reveal of a single line.
#[derive(Debug, Clone, Default)]
pub struct Typewriter {
    text: String,
    shown: usize,
    complete: bool,
}

impl Typewriter {
    /// Drop the current line. Nothing is visible and nothing is complete
    /// until [`Typewriter::load`] is called.
    pub fn clear(&mut self) {
        self.text.clear();
        self.shown = 0;
        self.complete = false;
    }

    pub fn load(&mut self, text: &str) {
        self.text.clear();
        self.text.push_str(text);
        self.shown = 0;
        self.complete = false;
    }

    pub fn step(&mut self) -> TypeStep {
        if self.complete {
            return TypeStep::Idle;
        }
        if self.shown < self.text.chars().count() {
            self.shown += 1;
            TypeStep::Typed
        } else {
            self.complete = true;
            TypeStep::Finished
        }
    }

    /// Reveal the whole line at once. Returns true if it was still typing.
    pub fn finish(&mut self) -> bool {
        if self.complete {
            return false;
        }
        self.shown = self.text.chars().count();
        self.complete = true;
        true
    }

    pub fn visible(&self) -> &str {
        match self.text.char_indices().nth(self.shown) {
            Some((byte, _)) => &self.text[..byte],
            None => &self.text,
        }
    }

    pub fn full_text(&self) -> &str {
        &self.text
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
}
