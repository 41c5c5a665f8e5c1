//! Runs an [`Experience`] against real time and the message service.
//!
//! The experience itself never waits on the network: board requests are
//! spawned as tasks and their results come back through a channel, so
//! frames keep ticking while a request is in flight.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use train_story::board::ReactionTicket;
use train_story::experience::{Effect, Experience, FRAME_MS, Input, Snapshot};
use train_types::{Message, ReactionAction, SortBy};

use crate::api::MessageApi;
use crate::error::ClientError;
use crate::sync::{BoardSync, Source, Submitted};

/// Everything a host can send to the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum HostInput {
    Story(Input),
    /// The board's text box changed.
    Draft(String),
    Submit,
    React { id: String, action: ReactionAction },
}

#[derive(Debug)]
enum SyncDone {
    Listed {
        sort: SortBy,
        messages: Vec<Message>,
        source: Source,
    },
    Submitted(Submitted),
    Reacted {
        ticket: ReactionTicket,
        sort: SortBy,
        result: Result<(Vec<Message>, Source), ClientError>,
    },
}

pub struct Driver<A, R> {
    experience: Experience,
    sync: Arc<BoardSync<A>>,
    rng: R,
    effects: mpsc::UnboundedSender<Effect>,
    done_tx: mpsc::UnboundedSender<SyncDone>,
    done_rx: mpsc::UnboundedReceiver<SyncDone>,
}

impl<A, R> Driver<A, R>
where
    A: MessageApi + 'static,
    R: Rng,
{
    /// Every effect the experience emits is forwarded on `effects`; board
    /// fetches are also carried out here.
    pub fn new(
        experience: Experience,
        sync: Arc<BoardSync<A>>,
        rng: R,
        effects: mpsc::UnboundedSender<Effect>,
    ) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            experience,
            sync,
            rng,
            effects,
            done_tx,
            done_rx,
        }
    }

    pub fn experience(&self) -> &Experience {
        &self.experience
    }

    pub fn handle(&mut self, input: HostInput) {
        match input {
            HostInput::Story(input) => {
                let fx = self.experience.handle(input, &mut self.rng);
                self.dispatch(fx);
            }
            HostInput::Draft(text) => self.experience.board_mut().draft = text,
            HostInput::Submit => self.submit(),
            HostInput::React { id, action } => self.react(id, action),
        }
    }

    /// Bring the experience clock up to `elapsed_ms` since the loop began.
    pub fn tick_to(&mut self, elapsed_ms: u64) {
        let dt = elapsed_ms.saturating_sub(self.experience.now_ms());
        if dt > 0 {
            let fx = self.experience.tick(dt, &mut self.rng);
            self.dispatch(fx);
        }
    }

    /// Drive the experience until the input channel closes, publishing a
    /// snapshot after every step. Hands the experience back at the end.
    pub async fn run(
        mut self,
        mut inputs: mpsc::Receiver<HostInput>,
        snapshots: watch::Sender<Snapshot>,
    ) -> Experience {
        let mut frames = tokio::time::interval(Duration::from_millis(FRAME_MS));
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let started = Instant::now();
        info!("Experience loop started");

        loop {
            tokio::select! {
                _ = frames.tick() => {
                    self.tick_to(started.elapsed().as_millis() as u64);
                }
                input = inputs.recv() => {
                    let Some(input) = input else { break };
                    self.handle(input);
                }
                Some(done) = self.done_rx.recv() => self.apply(done),
            }
            snapshots.send_replace(self.experience.snapshot());
        }

        info!("Experience loop stopped at {} ms", self.experience.now_ms());
        self.experience
    }

    fn dispatch(&mut self, fx: Vec<Effect>) {
        for effect in fx {
            if let Effect::FetchMessages { sort } = effect {
                self.fetch(sort);
            }
            // Host gone; nothing left to play effects on
            let _ = self.effects.send(effect);
        }
    }

    fn fetch(&self, sort: SortBy) {
        let sync = self.sync.clone();
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            let (messages, source) = sync.refresh(sort).await;
            let _ = done.send(SyncDone::Listed { sort, messages, source });
        });
    }

    fn submit(&mut self) {
        let board = self.experience.board_mut();
        let Some(text) = board.begin_submit() else {
            return;
        };
        let current = board.messages().to_vec();

        let sync = self.sync.clone();
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            let result = sync.submit(&text, &current, Utc::now()).await;
            let _ = done.send(SyncDone::Submitted(result));
        });
    }

    fn react(&mut self, id: String, action: ReactionAction) {
        let board = self.experience.board_mut();
        let sort = board.sort();
        let Some(ticket) = board.begin_reaction(&id, action) else {
            debug!("Already reacted to {}", id);
            return;
        };

        let sync = self.sync.clone();
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            let result = sync.react(&id, action, sort).await;
            let _ = done.send(SyncDone::Reacted { ticket, sort, result });
        });
    }

    fn apply(&mut self, done: SyncDone) {
        let board = self.experience.board_mut();
        match done {
            SyncDone::Listed { sort, messages, source } => {
                if sort != board.sort() {
                    debug!("Dropping stale {} listing", sort);
                    return;
                }
                debug!("Board shows {} messages ({:?})", messages.len(), source);
                board.replace(messages);
            }
            SyncDone::Submitted(result) => match result {
                Submitted::Server(message) => {
                    info!("Message {} stored", message.id);
                    board.finish_submit(true);
                    let sort = board.sort();
                    self.fetch(sort);
                }
                Submitted::Local { message, cache } => {
                    info!("Message {} kept offline", message.id);
                    board.replace(cache);
                    board.finish_submit(true);
                }
                Submitted::Rejected(reason) => {
                    debug!("Draft kept: {}", reason);
                    board.finish_submit(false);
                }
                Submitted::Failed => board.finish_submit(false),
            },
            SyncDone::Reacted { ticket, sort, result } => match result {
                Ok((messages, _)) => {
                    if sort == board.sort() {
                        board.replace(messages);
                    }
                }
                Err(_) => board.rollback(ticket),
            },
        }
    }

    #[cfg(test)]
    async fn settle(&mut self) {
        if let Some(done) = self.done_rx.recv().await {
            self.apply(done);
        }
    }
}
