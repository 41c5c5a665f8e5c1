use serde::{Deserialize, Serialize};

/// Every stage of the journey, in the only order it may be travelled.
/// The derived `Ord` follows declaration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    #[default]
    Start,
    WarpIn,
    EyesOpening,
    WakeUp,
    Anxiety,
    Peak,
    Turning,
    Recovery,
    Calm,
    Arrival,
}

impl Stage {
    /// Stages that show narrative lines.
    pub const STORY: [Stage; 7] = [
        Stage::WakeUp,
        Stage::Anxiety,
        Stage::Peak,
        Stage::Turning,
        Stage::Recovery,
        Stage::Calm,
        Stage::Arrival,
    ];

    pub fn is_story(self) -> bool {
        self >= Stage::WakeUp
    }

    /// Next story stage; `None` for the terminal stage and pre-story stages.
    pub fn next(self) -> Option<Stage> {
        let idx = Self::STORY.iter().position(|s| *s == self)?;
        Self::STORY.get(idx + 1).copied()
    }

    pub fn is_terminal(self) -> bool {
        self == Stage::Arrival
    }

    pub fn lines(self) -> &'static [&'static str] {
        match self {
            Stage::Start | Stage::WarpIn | Stage::EyesOpening => &[],
            Stage::WakeUp => &[
                "Where... am I?",
                "The train... when did I get on?",
                "How did I get here?",
                "Where is everyone?",
                "This is scary and I don't like it.",
                "Why is it so hard to breathe?",
                "I need to... focus.",
            ],
            Stage::Anxiety => &[
                "My heart is beating too fast.",
                "I feel dizzy, please make it stop.",
                "People might be staring.",
                "What if I'm having a heart attack?",
                "I can't seem to get enough air.",
                "I need to get off this train.",
                "Am I going to die?",
                "SOMEBODY HELP ME!",
            ],
            Stage::Peak => &[
                "I CAN'T BREATHE!",
                "I'M GOING TO PASS OUT!",
                "*panting*",
                "IM GOING TO DIE",
                "MAKE IT STOP",
            ],
            Stage::Turning => &[
                "It's happened before.",
                "This is just panic.",
                "I need to breathe.",
                "In through the nose...",
                "Out through the mouth...",
            ],
            Stage::Recovery => &[
                "The feeling is passing.",
                "My body is calming down.",
                "I can breathe again.",
                "I'm still here.",
                "I made it through.",
            ],
            Stage::Calm => &[
                "The panic always ends.",
                "I survived again.",
                "The train keeps moving.",
                "And so do I.",
                "One moment at a time.",
            ],
            Stage::Arrival => &[
                "You're not alone in this journey.",
                "Every panic attack ends.",
                "You're stronger than you know.",
                "It's okay to ask for help.",
                "There's light after every tunnel.",
            ],
        }
    }

    pub fn style(self) -> TextStyle {
        let (font_size_rem, font_weight, radius_px, color) = match self {
            Stage::Start | Stage::WarpIn | Stage::EyesOpening => return TextStyle::default(),
            Stage::WakeUp => (2.5, 300, 10.0, Rgba::new(255, 255, 255, 0.5)),
            Stage::Anxiety => (2.8, 400, 15.0, Rgba::new(150, 150, 255, 0.6)),
            Stage::Peak => (3.0, 600, 20.0, Rgba::new(255, 150, 150, 0.7)),
            Stage::Turning => (2.7, 300, 15.0, Rgba::new(150, 255, 255, 0.6)),
            Stage::Recovery => (2.5, 300, 10.0, Rgba::new(150, 255, 150, 0.6)),
            Stage::Calm => (2.5, 300, 12.0, Rgba::new(255, 255, 255, 0.7)),
            Stage::Arrival => (2.6, 300, 15.0, Rgba::new(255, 255, 255, 0.8)),
        };
        TextStyle {
            font_size_rem,
            font_weight,
            glow: Some(Glow { radius_px, color }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn css(&self) -> String {
        format!("rgba({},{},{},{})", self.r, self.g, self.b, self.a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Glow {
    pub radius_px: f32,
    pub color: Rgba,
}

/// Static per-stage text style.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_size_rem: f32,
    pub font_weight: u16,
    pub glow: Option<Glow>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size_rem: 2.5,
            font_weight: 300,
            glow: None,
        }
    }
}

impl TextStyle {
    /// CSS `text-shadow` value, empty when the style has no glow.
    pub fn text_shadow(&self) -> String {
        self.glow
            .map(|g| format!("0 0 {}px {}", g.radius_px, g.color.css()))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_order_is_linear() {
        let mut stage = Stage::WakeUp;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            seen.push(next);
            stage = next;
        }
        assert_eq!(seen, Stage::STORY.to_vec());
        assert!(stage.is_terminal());
        assert_eq!(Stage::Start.next(), None);
        assert_eq!(Stage::EyesOpening.next(), None);
    }

    #[test]
    fn every_story_stage_has_lines_and_glow() {
        for stage in Stage::STORY {
            assert!(!stage.lines().is_empty(), "{stage:?} has no lines");
            assert!(stage.style().glow.is_some());
        }
        assert_eq!(Stage::Anxiety.lines().len(), 8);
        assert_eq!(Stage::WakeUp.lines().len(), 7);
    }

    #[test]
    fn renders_text_shadow() {
        assert_eq!(Stage::Peak.style().text_shadow(), "0 0 20px rgba(255,150,150,0.7)");
        assert_eq!(Stage::Start.style().text_shadow(), "");
    }

    #[test]
    fn serde_names_are_camel_case() {
        assert_eq!(serde_json::to_string(&Stage::EyesOpening).unwrap(), "\"eyesOpening\"");
        assert_eq!(serde_json::to_string(&Stage::WakeUp).unwrap(), "\"wakeUp\"");
    }
}
