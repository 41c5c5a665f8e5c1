//! The whole journey as one state machine.
//!
//! Inputs come from the host (clicks, keys, pointer presses) and time comes
//! from [`Experience::tick`]. Both return [`Effect`]s the host must carry
//! out: audio commands, board fetches, and stage notifications.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use train_types::{Message, SortBy};

use crate::audio::{AudioCommand, AudioMix, Track};
use crate::board::MessageBoard;
use crate::breathing::{
    BreathCommand, BreathEvent, BreathPhase, BreathingSession, FALLBACK_MS, HEART_EASE_PER_CYCLE,
    HOLD_MS, REST_MS, STEP_INTERVAL_MS,
};
use crate::camera::{CameraTransform, camera_transform};
use crate::heartbeat::{self, Heartbeat};
use crate::intro::{EYES_CLOSED_BLUR, EYES_CLOSED_LIGHT, EyeCue, EyesOpening, WARP_INTERVAL_MS, Warp};
use crate::narrative::{Advance, NarrativeState, TextPosition};
use crate::scheduler::Scheduler;
use crate::stage::{Stage, TextStyle};
use crate::typing::{LINE_START_DELAY_MS, SAFETY_TIMEOUT_MS, TYPE_INTERVAL_MS, TypeStep, Typewriter};
use crate::visuals::VisualParams;

/// Animation frame period.
pub const FRAME_MS: u64 = 16;
/// Length of the fade back to the start screen.
pub const ENDING_MS: u64 = 2_000;
/// Share of the arrival lines after which the board appears.
const BOARD_REVEAL_PROGRESS: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreathTimer {
    Fill,
    Drain,
    Hold,
    Rest,
    Fallback,
}

/// Where a click landed. Keys click the page itself, which is neither
/// inside nor outside the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClickTarget {
    Outside,
    Board,
    Page,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    Frame,
    Warp,
    LineStart,
    TypeTick,
    TypeTimeout,
    Beat,
    Relax,
    Breath(BreathTimer),
    Ending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Input {
    /// Leave the start screen, with or without sound.
    Start { audio: bool },
    /// A click anywhere; `on_board` when it landed inside the message board.
    Click { on_board: bool },
    /// Space and Enter advance the text. They never leave the board.
    Key { key: String },
    /// Explicit exit button.
    ReturnToStart,
    PointerDown,
    PointerUp,
    PointerCancel,
    SetSort { sort: SortBy },
    AudioError { track: Track, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Effect {
    StageChanged { stage: Stage },
    Audio { command: AudioCommand },
    BoardShown,
    BoardHidden,
    /// Load the board listing from the message service.
    FetchMessages { sort: SortBy },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreathingView {
    pub phase: BreathPhase,
    pub progress: f64,
    pub cycles: u8,
    pub instruction: String,
    pub hint: String,
    pub circle_size_rem: f64,
    pub circle_glow_px: f64,
}

/// Everything a host needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub now_ms: u64,
    pub stage: Stage,
    pub line: String,
    pub line_complete: bool,
    pub position: TextPosition,
    pub style: TextStyle,
    pub visuals: VisualParams,
    pub heartbeat: Heartbeat,
    pub camera: CameraTransform,
    pub warp_progress: f64,
    pub eyelid_opacity: f64,
    pub breathing: Option<BreathingView>,
    pub board_visible: bool,
    pub sort: SortBy,
    pub messages: Vec<Message>,
    pub ending: bool,
    pub audio_enabled: bool,
}

pub struct Experience {
    clock: Scheduler<Timer>,
    narrative: NarrativeState,
    typewriter: Typewriter,
    visuals: VisualParams,
    heartbeat: Heartbeat,
    beat_period: Option<u64>,
    camera: CameraTransform,
    warp: Warp,
    eyes: EyesOpening,
    breathing: Option<BreathingSession>,
    audio: AudioMix,
    board: MessageBoard,
    ending: bool,
}

impl Experience {
    pub fn new(board: MessageBoard) -> Self {
        let mut clock = Scheduler::new();
        clock.every(FRAME_MS, Timer::Frame);

        Self {
            clock,
            narrative: NarrativeState::default(),
            typewriter: Typewriter::default(),
            visuals: VisualParams::default(),
            heartbeat: Heartbeat::default(),
            beat_period: None,
            camera: CameraTransform::default(),
            warp: Warp::default(),
            eyes: EyesOpening::new(),
            breathing: None,
            audio: AudioMix::default(),
            board,
            ending: false,
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now()
    }

    pub fn stage(&self) -> Stage {
        self.narrative.stage()
    }

    pub fn narrative(&self) -> &NarrativeState {
        &self.narrative
    }

    pub fn typewriter(&self) -> &Typewriter {
        &self.typewriter
    }

    pub fn visuals(&self) -> &VisualParams {
        &self.visuals
    }

    pub fn breathing(&self) -> Option<&BreathingSession> {
        self.breathing.as_ref()
    }

    pub fn audio(&self) -> &AudioMix {
        &self.audio
    }

    pub fn board(&self) -> &MessageBoard {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut MessageBoard {
        &mut self.board
    }

    pub fn is_ending(&self) -> bool {
        self.ending
    }

    pub fn handle<R: Rng>(&mut self, input: Input, rng: &mut R) -> Vec<Effect> {
        let mut fx = Vec::new();
        match input {
            Input::Start { audio } => self.start(audio, &mut fx),
            Input::Click { on_board } => {
                let target = if on_board { ClickTarget::Board } else { ClickTarget::Outside };
                self.click(target, rng, &mut fx);
            }
            Input::Key { key } => {
                if (key == " " || key == "Enter") && self.breathing.is_none() {
                    self.click(ClickTarget::Page, rng, &mut fx);
                }
            }
            Input::ReturnToStart => {
                if self.stage().is_story() {
                    self.return_to_start();
                }
            }
            Input::PointerDown if !self.ending => self.breath_event(BreathEvent::Press, &mut fx),
            Input::PointerUp | Input::PointerCancel if !self.ending => {
                self.breath_event(BreathEvent::Release, &mut fx)
            }
            Input::PointerDown | Input::PointerUp | Input::PointerCancel => {}
            Input::SetSort { sort } => {
                if self.board.set_sort(sort) && self.board.is_visible() {
                    fx.push(Effect::FetchMessages { sort });
                }
            }
            Input::AudioError { track, message } => self.audio.report_error(track, &message),
        }
        fx
    }

    /// Advance the clock by `dt_ms`, firing every timer that falls due.
    pub fn tick<R: Rng>(&mut self, dt_ms: u64, rng: &mut R) -> Vec<Effect> {
        let mut fx = Vec::new();
        let target = self.clock.now() + dt_ms;
        while let Some(timer) = self.clock.pop_due(target) {
            self.on_timer(timer, rng, &mut fx);
        }
        self.clock.advance_to(target);
        fx
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            now_ms: self.clock.now(),
            stage: self.stage(),
            line: self.typewriter.visible().to_string(),
            line_complete: self.typewriter.is_complete(),
            position: self.narrative.position(),
            style: self.narrative.style(),
            visuals: self.visuals,
            heartbeat: self.heartbeat,
            camera: self.camera,
            warp_progress: self.warp.progress(),
            eyelid_opacity: self.eyes.overlay_opacity(),
            breathing: self.breathing.as_ref().map(|s| BreathingView {
                phase: s.phase(),
                progress: s.progress(),
                cycles: s.cycles(),
                instruction: s.instruction().to_string(),
                hint: s.hint().to_string(),
                circle_size_rem: s.circle_size_rem(),
                circle_glow_px: s.circle_glow_px(),
            }),
            board_visible: self.board.is_visible(),
            sort: self.board.sort(),
            messages: self.board.display().into_iter().cloned().collect(),
            ending: self.ending,
            audio_enabled: self.audio.is_enabled(),
        }
    }

    // -- Stage flow --

    fn enter_stage(&mut self, stage: Stage, fx: &mut Vec<Effect>) {
        if self.narrative.enter(stage) {
            fx.push(Effect::StageChanged { stage });
        }
    }

    fn start(&mut self, audio: bool, fx: &mut Vec<Effect>) {
        if self.stage() != Stage::Start || self.ending {
            return;
        }
        info!("Journey started (audio {})", if audio { "on" } else { "off" });

        self.audio.set_enabled(audio);
        let mut cmds = Vec::new();
        for (track, target) in [(Track::Train, 0.2), (Track::Ambient, 0.5), (Track::Heartbeat, 0.2)] {
            self.audio.play(track, &mut cmds);
            self.audio.set_volume(track, 0.0, &mut cmds);
            self.audio.fade(track, target, 3_000);
        }
        emit_audio(fx, cmds);

        self.warp = Warp::default();
        self.enter_stage(Stage::WarpIn, fx);
        self.clock.every(WARP_INTERVAL_MS, Timer::Warp);
    }

    fn open_eyes(&mut self, fx: &mut Vec<Effect>) {
        self.clock.cancel_matching(|t| *t == Timer::Warp);
        self.enter_stage(Stage::EyesOpening, fx);
        self.eyes = EyesOpening::new();
        self.visuals.light_level = EYES_CLOSED_LIGHT;
        self.visuals.blur = EYES_CLOSED_BLUR;
    }

    fn begin_story(&mut self, fx: &mut Vec<Effect>) {
        self.enter_stage(Stage::WakeUp, fx);
        self.apply_visuals(fx);
        self.queue_line();

        let mut cmds = Vec::new();
        self.audio.play(Track::Heartbeat, &mut cmds);
        self.audio.fade(Track::Heartbeat, 0.3, 2_000);
        emit_audio(fx, cmds);
    }

    fn click<R: Rng>(&mut self, target: ClickTarget, rng: &mut R, fx: &mut Vec<Effect>) {
        if self.ending {
            return;
        }
        let stage = self.stage();

        if stage == Stage::Arrival && self.board.is_visible() && target == ClickTarget::Outside {
            self.return_to_start();
            return;
        }

        if self.breathing.is_some() || !stage.is_story() || !self.typewriter.is_complete() {
            return;
        }

        match self.narrative.advance(rng) {
            Advance::NextLine { index } => {
                debug!("{:?} line {}", stage, index);
                self.apply_visuals(fx);
                self.queue_line();
            }
            Advance::NextStage(next) => {
                fx.push(Effect::StageChanged { stage: next });
                self.apply_visuals(fx);
                self.queue_line();
            }
            Advance::BeginBreathing => self.begin_breathing(fx),
            Advance::Stay => {}
        }
    }

    /// Visual parameters and stage audio for the current line, applied
    /// before any of the line's timers start.
    fn apply_visuals(&mut self, fx: &mut Vec<Effect>) {
        let stage = self.stage();
        let p = self.narrative.progress();
        self.visuals.apply(stage, p);

        let fades: &[(Track, f64, u64)] = match stage {
            Stage::Anxiety => &[(Track::Heartbeat, 0.5, 2_000)],
            Stage::Peak => &[(Track::Heartbeat, 0.8, 1_000), (Track::Train, 0.2, 3_000)],
            Stage::Recovery => &[(Track::Heartbeat, 0.3, 3_000), (Track::Train, 0.5, 2_000)],
            Stage::Calm => &[(Track::Heartbeat, 0.1, 4_000)],
            Stage::Arrival => &[
                (Track::Heartbeat, 0.3, 5_000),
                (Track::Train, 0.0, 3_000),
                (Track::Ambient, 0.4, 3_000),
            ],
            _ => &[],
        };
        for &(track, target, duration) in fades {
            self.audio.fade(track, target, duration);
        }

        if stage == Stage::Arrival && p > BOARD_REVEAL_PROGRESS && self.board.show() {
            info!("Message board revealed");
            fx.push(Effect::BoardShown);
            fx.push(Effect::FetchMessages { sort: self.board.sort() });
        }

        self.sync_heartbeat();
    }

    // -- Typing --

    fn cancel_typing(&mut self) {
        self.clock
            .cancel_matching(|t| matches!(t, Timer::LineStart | Timer::TypeTick | Timer::TypeTimeout));
    }

    /// Blank the line and start typing the current one shortly.
    fn queue_line(&mut self) {
        self.cancel_typing();
        self.typewriter.clear();
        self.clock.once(LINE_START_DELAY_MS, Timer::LineStart);
    }

    fn start_line(&mut self) {
        let Some(line) = self.narrative.current_line() else {
            return;
        };
        self.typewriter.load(line);
        self.clock.every(TYPE_INTERVAL_MS, Timer::TypeTick);
        self.clock.once(SAFETY_TIMEOUT_MS, Timer::TypeTimeout);
    }

    fn type_tick(&mut self, fx: &mut Vec<Effect>) {
        let mut cmds = Vec::new();
        match self.typewriter.step() {
            TypeStep::Typed => self.audio.retrigger(Track::Typing, &mut cmds),
            TypeStep::Finished => {
                self.cancel_typing();
                self.audio.pause(Track::Typing, &mut cmds);
            }
            TypeStep::Idle => self.cancel_typing(),
        }
        emit_audio(fx, cmds);
    }

    fn type_timeout(&mut self, fx: &mut Vec<Effect>) {
        if self.typewriter.finish() {
            debug!("Line forced complete after {} ms", SAFETY_TIMEOUT_MS);
        }
        self.cancel_typing();
        let mut cmds = Vec::new();
        self.audio.pause(Track::Typing, &mut cmds);
        emit_audio(fx, cmds);
    }

    // -- Heart --

    /// Keep the beat timer in step with the current heart rate.
    fn sync_heartbeat(&mut self) {
        if !self.stage().is_story() {
            self.clock.cancel_matching(|t| matches!(t, Timer::Beat | Timer::Relax));
            self.beat_period = None;
            return;
        }
        let period = heartbeat::beat_interval_ms(self.visuals.heart_rate);
        if self.beat_period != Some(period) {
            self.clock.cancel_matching(|t| *t == Timer::Beat);
            self.clock.every(period, Timer::Beat);
            self.beat_period = Some(period);
        }
    }

    fn on_beat(&mut self, fx: &mut Vec<Effect>) {
        let bpm = self.visuals.heart_rate;
        self.heartbeat.beat(bpm);
        self.clock.cancel_matching(|t| *t == Timer::Relax);
        self.clock.once(heartbeat::systole_ms(bpm), Timer::Relax);

        let mut cmds = Vec::new();
        self.audio
            .set_playback_rate(Track::Heartbeat, heartbeat::playback_rate(bpm), &mut cmds);
        emit_audio(fx, cmds);
    }

    // -- Breathing --

    fn begin_breathing(&mut self, fx: &mut Vec<Effect>) {
        if self.breathing.is_some() {
            return;
        }
        info!("Breathing exercise started");
        let (session, cmds) = BreathingSession::start();
        self.breathing = Some(session);
        self.run_breath_commands(cmds, fx);

        let mut audio = Vec::new();
        self.audio.play(Track::Breathing, &mut audio);
        self.audio.fade(Track::Train, 0.0, 1_000);
        self.audio.fade(Track::Breathing, 1.0, 2_000);
        emit_audio(fx, audio);
    }

    fn breath_event(&mut self, event: BreathEvent, fx: &mut Vec<Effect>) {
        let Some(session) = self.breathing.as_mut() else {
            return;
        };
        let cmds = session.handle(event);
        self.run_breath_commands(cmds, fx);
    }

    fn run_breath_commands(&mut self, cmds: Vec<BreathCommand>, fx: &mut Vec<Effect>) {
        for cmd in cmds {
            match cmd {
                BreathCommand::StartFallback => self.restart_breath_timer(BreathTimer::Fallback, FALLBACK_MS, false),
                BreathCommand::CancelFallback => self.cancel_breath_timer(BreathTimer::Fallback),
                BreathCommand::StartFill => self.restart_breath_timer(BreathTimer::Fill, STEP_INTERVAL_MS, true),
                BreathCommand::StopFill => self.cancel_breath_timer(BreathTimer::Fill),
                BreathCommand::StartDrain => self.restart_breath_timer(BreathTimer::Drain, STEP_INTERVAL_MS, true),
                BreathCommand::StopDrain => self.cancel_breath_timer(BreathTimer::Drain),
                BreathCommand::StartHold => self.restart_breath_timer(BreathTimer::Hold, HOLD_MS, false),
                BreathCommand::CancelHold => self.cancel_breath_timer(BreathTimer::Hold),
                BreathCommand::StartRest => self.restart_breath_timer(BreathTimer::Rest, REST_MS, false),
                BreathCommand::CycleCompleted(cycles) => {
                    debug!("Breath {} complete", cycles);
                    self.visuals.ease_heart(HEART_EASE_PER_CYCLE);
                    self.sync_heartbeat();
                }
                BreathCommand::Finished => self.finish_breathing(fx),
            }
        }
    }

    fn restart_breath_timer(&mut self, which: BreathTimer, ms: u64, repeat: bool) {
        self.cancel_breath_timer(which);
        if repeat {
            self.clock.every(ms, Timer::Breath(which));
        } else {
            self.clock.once(ms, Timer::Breath(which));
        }
    }

    fn cancel_breath_timer(&mut self, which: BreathTimer) {
        self.clock.cancel_matching(|t| *t == Timer::Breath(which));
    }

    fn finish_breathing(&mut self, fx: &mut Vec<Effect>) {
        self.clock.cancel_matching(|t| matches!(t, Timer::Breath(_)));
        if let Some(session) = self.breathing.take() {
            info!("Breathing exercise finished after {} cycles", session.cycles());
        }
        self.audio.fade(Track::Breathing, 0.0, 1_000);

        if let Some(next) = self.narrative.finish_breathing() {
            fx.push(Effect::StageChanged { stage: next });
            self.apply_visuals(fx);
            self.queue_line();
        }
    }

    // -- Ending --

    fn return_to_start(&mut self) {
        if self.ending {
            return;
        }
        info!("Returning to start");
        self.ending = true;
        self.clock.cancel_matching(|t| matches!(t, Timer::Breath(_)));
        for track in [Track::Train, Track::Ambient, Track::Heartbeat] {
            self.audio.fade(track, 0.0, ENDING_MS);
        }
        self.clock.once(ENDING_MS, Timer::Ending);
    }

    fn finish_return(&mut self, fx: &mut Vec<Effect>) {
        self.clock.cancel_matching(|t| *t != Timer::Frame);

        self.narrative.reset();
        fx.push(Effect::StageChanged { stage: Stage::Start });

        self.typewriter.clear();
        self.visuals = VisualParams::default();
        self.heartbeat = Heartbeat::default();
        self.beat_period = None;
        self.camera = CameraTransform::default();
        self.warp = Warp::default();
        self.eyes = EyesOpening::new();
        self.breathing = None;
        self.ending = false;

        if self.board.is_visible() {
            self.board.hide();
            fx.push(Effect::BoardHidden);
        }

        let mut cmds = Vec::new();
        for track in Track::ALL {
            self.audio.pause(track, &mut cmds);
        }
        emit_audio(fx, cmds);
    }

    // -- Timers --

    fn on_timer<R: Rng>(&mut self, timer: Timer, rng: &mut R, fx: &mut Vec<Effect>) {
        match timer {
            Timer::Frame => self.on_frame(rng, fx),
            Timer::Warp => {
                if self.warp.step() {
                    self.open_eyes(fx);
                }
            }
            Timer::LineStart => self.start_line(),
            Timer::TypeTick => self.type_tick(fx),
            Timer::TypeTimeout => self.type_timeout(fx),
            Timer::Beat => self.on_beat(fx),
            Timer::Relax => self.heartbeat.relax(),
            Timer::Breath(which) => {
                let event = match which {
                    BreathTimer::Fill => BreathEvent::FillTick,
                    BreathTimer::Drain => BreathEvent::DrainTick,
                    BreathTimer::Hold => BreathEvent::HoldElapsed,
                    BreathTimer::Rest => BreathEvent::RestElapsed,
                    BreathTimer::Fallback => BreathEvent::FallbackElapsed,
                };
                self.breath_event(event, fx);
            }
            Timer::Ending => self.finish_return(fx),
        }
    }

    fn on_frame<R: Rng>(&mut self, rng: &mut R, fx: &mut Vec<Effect>) {
        let mut cmds = Vec::new();
        self.audio.advance(FRAME_MS, &mut cmds);
        emit_audio(fx, cmds);

        match self.stage() {
            Stage::EyesOpening => {
                for cue in self.eyes.advance(FRAME_MS) {
                    match cue {
                        EyeCue::Settle { light, blur } => {
                            self.visuals.light_level = light;
                            self.visuals.blur = blur;
                        }
                        EyeCue::Done => self.begin_story(fx),
                    }
                }
            }
            stage if stage.is_story() => {
                let time_s = self.clock.now() as f64 / 1000.0;
                self.camera = camera_transform(
                    time_s,
                    self.visuals.camera_shake,
                    self.visuals.panic_level,
                    rng,
                );
            }
            _ => {}
        }
    }
}

fn emit_audio(fx: &mut Vec<Effect>, cmds: Vec<AudioCommand>) {
    fx.extend(cmds.into_iter().map(|command| Effect::Audio { command }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breathing::TARGET_CYCLES;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn setup() -> (Experience, StdRng) {
        let mut rng = StdRng::seed_from_u64(42);
        let board = MessageBoard::new("2026-07-01T00:00:00Z".parse().unwrap(), &mut rng);
        (Experience::new(board), rng)
    }

    fn run_until(
        exp: &mut Experience,
        rng: &mut StdRng,
        limit_ms: u64,
        done: impl Fn(&Experience) -> bool,
    ) -> Vec<Effect> {
        let mut fx = Vec::new();
        let mut elapsed = 0;
        while !done(exp) {
            fx.extend(exp.tick(FRAME_MS, rng));
            elapsed += FRAME_MS;
            assert!(elapsed <= limit_ms, "condition not reached within {limit_ms} ms");
        }
        fx
    }

    fn finish_line(exp: &mut Experience, rng: &mut StdRng) -> Vec<Effect> {
        run_until(exp, rng, SAFETY_TIMEOUT_MS + 500, |e| e.typewriter().is_complete())
    }

    fn click(exp: &mut Experience, rng: &mut StdRng) -> Vec<Effect> {
        exp.handle(Input::Click { on_board: false }, rng)
    }

    fn to_story(exp: &mut Experience, rng: &mut StdRng, audio: bool) -> Vec<Effect> {
        let mut fx = exp.handle(Input::Start { audio }, rng);
        fx.extend(run_until(exp, rng, 20_000, |e| e.stage() == Stage::WakeUp));
        fx.extend(finish_line(exp, rng));
        fx
    }

    /// Click through lines until the breathing exercise begins.
    fn to_breathing(exp: &mut Experience, rng: &mut StdRng) -> Vec<Effect> {
        let mut fx = to_story(exp, rng, false);
        while exp.breathing().is_none() {
            fx.extend(click(exp, rng));
            if exp.breathing().is_none() {
                fx.extend(finish_line(exp, rng));
            }
        }
        fx
    }

    /// Press and release on cue until the session is over.
    fn breathe(exp: &mut Experience, rng: &mut StdRng) -> Vec<Effect> {
        let mut fx = Vec::new();
        let mut elapsed = 0;
        while let Some(phase) = exp.breathing().map(|s| s.phase()) {
            match phase {
                BreathPhase::Inhale => fx.extend(exp.handle(Input::PointerDown, rng)),
                BreathPhase::Exhale => fx.extend(exp.handle(Input::PointerUp, rng)),
                _ => {}
            }
            fx.extend(exp.tick(FRAME_MS, rng));
            elapsed += FRAME_MS;
            assert!(elapsed < 60_000);
        }
        fx
    }

    /// Breathe through and click on until the board is showing.
    fn to_board(exp: &mut Experience, rng: &mut StdRng) -> Vec<Effect> {
        let mut fx = to_breathing(exp, rng);
        assert_eq!(exp.stage(), Stage::Turning);
        fx.extend(breathe(exp, rng));
        assert_eq!(exp.stage(), Stage::Recovery);
        while !exp.board().is_visible() {
            fx.extend(finish_line(exp, rng));
            fx.extend(click(exp, rng));
        }
        fx
    }

    fn stages(fx: &[Effect]) -> Vec<Stage> {
        fx.iter()
            .filter_map(|e| match e {
                Effect::StageChanged { stage } => Some(*stage),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn intro_leads_into_first_line() {
        let (mut exp, mut rng) = setup();
        let fx = to_story(&mut exp, &mut rng, false);
        assert_eq!(stages(&fx), vec![Stage::WarpIn, Stage::EyesOpening, Stage::WakeUp]);
        assert_eq!(exp.snapshot().line, "Where... am I?");
        assert!(exp.snapshot().line_complete);
        // Settled by the eyes sequence, then wake-up keeps the blur
        assert_eq!(exp.visuals().blur, 2.0);
        assert_eq!(exp.visuals().light_level, 0.4);
    }

    #[test]
    fn clicks_ignored_while_typing() {
        let (mut exp, mut rng) = setup();
        to_story(&mut exp, &mut rng, false);
        click(&mut exp, &mut rng);
        assert_eq!(exp.narrative().line_index(), 1);
        assert!(!exp.typewriter().is_complete());

        click(&mut exp, &mut rng);
        exp.tick(200, &mut rng);
        click(&mut exp, &mut rng);
        assert_eq!(exp.narrative().line_index(), 1);
    }

    #[test]
    fn space_and_enter_advance() {
        let (mut exp, mut rng) = setup();
        to_story(&mut exp, &mut rng, false);
        exp.handle(Input::Key { key: "a".into() }, &mut rng);
        assert_eq!(exp.narrative().line_index(), 0);
        exp.handle(Input::Key { key: " ".into() }, &mut rng);
        assert_eq!(exp.narrative().line_index(), 1);
        finish_line(&mut exp, &mut rng);
        exp.handle(Input::Key { key: "Enter".into() }, &mut rng);
        assert_eq!(exp.narrative().line_index(), 2);
    }

    #[test]
    fn full_journey_is_monotonic_until_reset() {
        let (mut exp, mut rng) = setup();
        let fx = to_board(&mut exp, &mut rng);
        assert_eq!(exp.stage(), Stage::Arrival);
        assert!(fx.contains(&Effect::BoardShown));
        assert!(fx.contains(&Effect::FetchMessages { sort: SortBy::Newest }));

        let seen = stages(&fx);
        assert_eq!(
            seen,
            vec![
                Stage::WarpIn,
                Stage::EyesOpening,
                Stage::WakeUp,
                Stage::Anxiety,
                Stage::Peak,
                Stage::Turning,
                Stage::Recovery,
                Stage::Calm,
                Stage::Arrival,
            ]
        );
        assert!(seen.windows(2).all(|w| w[0] < w[1]));

        // Clicks on the board never leave the story
        exp.handle(Input::Click { on_board: true }, &mut rng);
        assert!(!exp.is_ending());

        click(&mut exp, &mut rng);
        assert!(exp.is_ending());
        let fx = exp.tick(ENDING_MS, &mut rng);
        assert_eq!(stages(&fx), vec![Stage::Start]);
        assert!(fx.contains(&Effect::BoardHidden));
        assert!(!exp.board().is_visible());

        // Only the frame clock survives the reset
        assert_eq!(exp.clock.len(), 1);
        assert!(exp.clock.any_pending(|t| *t == Timer::Frame));
    }

    #[test]
    fn keys_never_leave_the_board() {
        let (mut exp, mut rng) = setup();
        to_board(&mut exp, &mut rng);

        // Keys and board clicks keep reading until the last line
        loop {
            finish_line(&mut exp, &mut rng);
            let index = exp.narrative().line_index();
            exp.handle(Input::Key { key: " ".into() }, &mut rng);
            if exp.narrative().line_index() == index {
                break;
            }
        }
        exp.handle(Input::Key { key: "Enter".into() }, &mut rng);
        exp.handle(Input::Click { on_board: true }, &mut rng);
        assert_eq!(exp.stage(), Stage::Arrival);
        assert!(!exp.is_ending());
        assert!(exp.board().is_visible());

        click(&mut exp, &mut rng);
        assert!(exp.is_ending());
    }

    #[test]
    fn stalled_line_is_forced_complete() {
        let (mut exp, mut rng) = setup();
        to_story(&mut exp, &mut rng, false);
        click(&mut exp, &mut rng);

        exp.tick(LINE_START_DELAY_MS, &mut rng);
        assert!(exp.clock.any_pending(|t| *t == Timer::TypeTimeout));
        exp.clock.cancel_matching(|t| *t == Timer::TypeTick);
        assert!(!exp.typewriter().is_complete());

        exp.tick(SAFETY_TIMEOUT_MS, &mut rng);
        assert!(exp.typewriter().is_complete());
        assert_eq!(Some(exp.typewriter().visible()), exp.narrative().current_line());
        assert!(!exp.clock.any_pending(|t| {
            matches!(t, Timer::LineStart | Timer::TypeTick | Timer::TypeTimeout)
        }));
    }

    #[test]
    fn leaving_mid_breath_skips_recovery() {
        let (mut exp, mut rng) = setup();
        to_breathing(&mut exp, &mut rng);
        exp.handle(Input::PointerDown, &mut rng);
        exp.tick(500, &mut rng);

        exp.handle(Input::ReturnToStart, &mut rng);
        assert!(!exp.clock.any_pending(|t| matches!(t, Timer::Breath(_))));
        assert!(exp.handle(Input::PointerUp, &mut rng).is_empty());
        assert!(!exp.clock.any_pending(|t| matches!(t, Timer::Breath(_))));

        let fx = exp.tick(ENDING_MS, &mut rng);
        assert_eq!(stages(&fx), vec![Stage::Start]);
    }

    #[test]
    fn leaving_before_fallback_skips_recovery() {
        let (mut exp, mut rng) = setup();
        to_breathing(&mut exp, &mut rng);
        exp.tick(FALLBACK_MS - 500, &mut rng);

        exp.handle(Input::ReturnToStart, &mut rng);
        let fx = exp.tick(ENDING_MS, &mut rng);
        assert_eq!(stages(&fx), vec![Stage::Start]);
        assert!(exp.breathing().is_none());
    }

    #[test]
    fn breathing_eases_heart_and_counts_to_four() {
        let (mut exp, mut rng) = setup();
        to_breathing(&mut exp, &mut rng);
        let before = exp.visuals().heart_rate;

        // Hold the first breath all the way through
        exp.handle(Input::PointerDown, &mut rng);
        run_until(&mut exp, &mut rng, 8_000, |e| {
            e.breathing().map(|s| s.phase()) == Some(BreathPhase::Exhale)
        });
        exp.handle(Input::PointerUp, &mut rng);
        run_until(&mut exp, &mut rng, 5_000, |e| e.breathing().map(|s| s.cycles()) == Some(1));
        assert_eq!(exp.visuals().heart_rate, (before - HEART_EASE_PER_CYCLE).max(60.0));

        breathe(&mut exp, &mut rng);
        assert!(exp.breathing().is_none());
        assert_eq!(exp.stage(), Stage::Recovery);
        assert!(!exp.clock.any_pending(|t| matches!(t, Timer::Breath(_))));
    }

    #[test]
    fn fallback_finishes_untouched_exercise() {
        let (mut exp, mut rng) = setup();
        to_breathing(&mut exp, &mut rng);
        assert_eq!(exp.breathing().map(|s| s.cycles()), Some(0));

        exp.tick(FALLBACK_MS - FRAME_MS, &mut rng);
        assert_eq!(exp.stage(), Stage::Turning);

        let fx = exp.tick(FRAME_MS, &mut rng);
        assert_eq!(stages(&fx), vec![Stage::Recovery]);
        assert!(exp.breathing().is_none());
    }

    #[test]
    fn pressing_cancels_fallback() {
        let (mut exp, mut rng) = setup();
        to_breathing(&mut exp, &mut rng);
        exp.handle(Input::PointerDown, &mut rng);
        exp.handle(Input::PointerUp, &mut rng);
        exp.tick(FALLBACK_MS + 1_000, &mut rng);
        assert_eq!(exp.stage(), Stage::Turning);
        let session = exp.breathing().unwrap();
        assert!(session.cycles() < TARGET_CYCLES);
    }

    #[test]
    fn clicks_do_nothing_during_breathing() {
        let (mut exp, mut rng) = setup();
        to_breathing(&mut exp, &mut rng);
        let index = exp.narrative().line_index();
        click(&mut exp, &mut rng);
        exp.handle(Input::Key { key: " ".into() }, &mut rng);
        assert_eq!(exp.narrative().line_index(), index);
        assert!(exp.breathing().is_some());
    }

    #[test]
    fn audio_start_plays_three_loops() {
        let (mut exp, mut rng) = setup();
        let fx = exp.handle(Input::Start { audio: true }, &mut rng);
        let played: Vec<Track> = fx
            .iter()
            .filter_map(|e| match e {
                Effect::Audio { command: AudioCommand::Play { track } } => Some(*track),
                _ => None,
            })
            .collect();
        assert_eq!(played, vec![Track::Train, Track::Ambient, Track::Heartbeat]);

        exp.tick(3_000 + FRAME_MS, &mut rng);
        assert!((exp.audio().volume(Track::Ambient) - 0.5).abs() < 1e-9);
        assert!(!exp.audio().is_fading(Track::Ambient));
    }

    #[test]
    fn silent_journey_emits_no_audio() {
        let (mut exp, mut rng) = setup();
        let fx = to_story(&mut exp, &mut rng, false);
        assert!(!fx.iter().any(|e| matches!(e, Effect::Audio { .. })));
    }

    #[test]
    fn audio_errors_never_block() {
        let (mut exp, mut rng) = setup();
        to_story(&mut exp, &mut rng, true);
        let fx = exp.handle(
            Input::AudioError { track: Track::Typing, message: "NotAllowedError".into() },
            &mut rng,
        );
        assert!(fx.is_empty());
        click(&mut exp, &mut rng);
        assert_eq!(exp.narrative().line_index(), 1);
    }

    #[test]
    fn sort_change_refetches_only_when_visible() {
        let (mut exp, mut rng) = setup();
        let fx = exp.handle(Input::SetSort { sort: SortBy::MostLiked }, &mut rng);
        assert!(fx.is_empty());
        exp.board_mut().show();
        let fx = exp.handle(Input::SetSort { sort: SortBy::MostDisliked }, &mut rng);
        assert_eq!(fx, vec![Effect::FetchMessages { sort: SortBy::MostDisliked }]);
    }

    #[test]
    fn heartbeat_follows_heart_rate() {
        let (mut exp, mut rng) = setup();
        to_story(&mut exp, &mut rng, false);
        assert_eq!(exp.beat_period, Some(heartbeat::beat_interval_ms(70.0)));
        run_until(&mut exp, &mut rng, 2_000, |e| e.snapshot().heartbeat.scale > 1.0);
    }

    #[test]
    fn exit_button_only_during_story() {
        let (mut exp, mut rng) = setup();
        exp.handle(Input::ReturnToStart, &mut rng);
        assert!(!exp.is_ending());

        to_story(&mut exp, &mut rng, false);
        exp.handle(Input::ReturnToStart, &mut rng);
        assert!(exp.is_ending());
        exp.tick(ENDING_MS, &mut rng);
        assert_eq!(exp.stage(), Stage::Start);

        // And the journey can begin again
        let fx = exp.handle(Input::Start { audio: false }, &mut rng);
        assert_eq!(stages(&fx), vec![Stage::WarpIn]);
    }

    #[test]
    fn snapshot_serializes() {
        let (mut exp, mut rng) = setup();
        to_breathing(&mut exp, &mut rng);
        let json = serde_json::to_value(exp.snapshot()).unwrap();
        assert_eq!(json["stage"], "turning");
        assert_eq!(json["breathing"]["phase"], "inhale");
        assert_eq!(json["breathing"]["instruction"], "PRESS & HOLD TO BREATHE IN");
    }
}
