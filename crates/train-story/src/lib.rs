/// Train of Thought: the story engine.
///
/// Everything here is pure state plus a virtual clock, so a host only has to
/// forward input, call `tick` once per frame and carry out the returned effects:
/// - Stage machine and scripted lines (`stage`, `narrative`)
/// - Typewriter, visual parameters, camera and heartbeat
/// - Warp and eyes-opening intro
/// - Press-and-hold breathing exercise
/// - Audio mix with volume fades
/// - Message board view state

pub mod audio;
pub mod board;
pub mod breathing;
pub mod camera;
pub mod experience;
pub mod heartbeat;
pub mod intro;
pub mod narrative;
pub mod scheduler;
pub mod stage;
pub mod typing;
pub mod visuals;

// Re-export key types for convenience.
pub use audio::{AudioCommand, AudioMix, Track};
pub use board::{MessageBoard, ReactionTicket, relative_date};
pub use breathing::{BreathPhase, BreathingSession};
pub use experience::{Effect, Experience, Input, Snapshot};
pub use narrative::{Advance, NarrativeState, TextPosition};
pub use scheduler::Scheduler;
pub use stage::{Stage, TextStyle};
pub use typing::Typewriter;
pub use visuals::VisualParams;
