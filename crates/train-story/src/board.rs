//! Client-side message board state.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use train_types::{Message, ReactionAction, SortBy};

/// Messages kept in the client cache (and in the offline store).
pub const CACHE_LIMIT: usize = 20;
/// Cards rendered on the board, built-in messages included.
pub const DISPLAY_LIMIT: usize = 12;

const SUPPORT_MESSAGES: [&str; 5] = [
    "I used to have panic attacks daily. With help, now they're rare moments instead of my whole life.",
    "What helped me most was learning that panic can't actually harm me - it's just an adrenaline rush.",
    "Breathing techniques changed everything for me. They bring me back when I feel lost.",
    "Finding a therapist who understood panic disorder was my turning point.",
    "You're not broken. Your body's alarm system is just a little too sensitive right now.",
];

/// Remembers a reaction's previous flags so a failed request can undo it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionTicket {
    pub id: String,
    pub action: ReactionAction,
    had_like: bool,
    had_dislike: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBoard {
    visible: bool,
    sort: SortBy,
    messages: Vec<Message>,
    support: Vec<Message>,
    liked: HashSet<String>,
    disliked: HashSet<String>,
    pub draft: String,
    submitting: bool,
}

impl MessageBoard {
    /// Empty board with the built-in support messages, given plausible
    /// counters and ages within the last 30 days.
    pub fn new<R: Rng>(now: DateTime<Utc>, rng: &mut R) -> Self {
        let support = SUPPORT_MESSAGES
            .iter()
            .map(|text| {
                let prefix: String = text.chars().take(10).collect();
                Message {
                    id: format!("support-{prefix}"),
                    text: (*text).to_string(),
                    likes: rng.random_range(0..30),
                    dislikes: rng.random_range(0..5),
                    created_at: now - Duration::milliseconds(rng.random_range(0..30 * 24 * 60 * 60 * 1000)),
                }
            })
            .collect();

        Self {
            visible: false,
            sort: SortBy::Newest,
            messages: Vec::new(),
            support,
            liked: HashSet::new(),
            disliked: HashSet::new(),
            draft: String::new(),
            submitting: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Returns true if the board was hidden before.
    pub fn show(&mut self) -> bool {
        !std::mem::replace(&mut self.visible, true)
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn sort(&self) -> SortBy {
        self.sort
    }

    /// Returns true if the ordering changed.
    pub fn set_sort(&mut self, sort: SortBy) -> bool {
        std::mem::replace(&mut self.sort, sort) != sort
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Replace the cache with a server (or offline store) listing.
    pub fn replace(&mut self, mut messages: Vec<Message>) {
        messages.truncate(CACHE_LIMIT);
        self.messages = messages;
    }

    /// Optimistic insert at the top of the cache. Returns the new cache.
    pub fn insert_local(&mut self, message: Message) -> &[Message] {
        self.messages.insert(0, message);
        self.messages.truncate(CACHE_LIMIT);
        &self.messages
    }

    pub fn has_liked(&self, id: &str) -> bool {
        self.liked.contains(id)
    }

    pub fn has_disliked(&self, id: &str) -> bool {
        self.disliked.contains(id)
    }

    /// Flag a reaction for this session. `None` means the same reaction was
    /// already given and nothing should be sent.
    pub fn begin_reaction(&mut self, id: &str, action: ReactionAction) -> Option<ReactionTicket> {
        let ticket = ReactionTicket {
            id: id.to_string(),
            action,
            had_like: self.has_liked(id),
            had_dislike: self.has_disliked(id),
        };

        let (set, other) = match action {
            ReactionAction::Like => (&mut self.liked, &mut self.disliked),
            ReactionAction::Dislike => (&mut self.disliked, &mut self.liked),
        };
        if !set.insert(id.to_string()) {
            return None;
        }
        other.remove(id);
        Some(ticket)
    }

    /// Undo the flags changed by `ticket`.
    pub fn rollback(&mut self, ticket: ReactionTicket) {
        restore(&mut self.liked, &ticket.id, ticket.had_like);
        restore(&mut self.disliked, &ticket.id, ticket.had_dislike);
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn can_submit(&self) -> bool {
        !self.submitting && !self.draft.trim().is_empty()
    }

    /// Take the trimmed draft for sending and mark the board as submitting.
    pub fn begin_submit(&mut self) -> Option<String> {
        if !self.can_submit() {
            return None;
        }
        self.submitting = true;
        Some(self.draft.trim().to_string())
    }

    /// The draft is cleared whenever the message landed somewhere, remote
    /// or local.
    pub fn finish_submit(&mut self, stored: bool) {
        self.submitting = false;
        if stored {
            self.draft.clear();
        }
    }

    /// Cards in render order: cached messages, then the built-in ones.
    pub fn display(&self) -> Vec<&Message> {
        self.messages
            .iter()
            .chain(self.support.iter())
            .take(DISPLAY_LIMIT)
            .collect()
    }
}

fn restore(set: &mut HashSet<String>, id: &str, present: bool) {
    if present {
        set.insert(id.to_string());
    } else {
        set.remove(id);
    }
}

/// Human label for a message's age.
pub fn relative_date(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (now - created_at).num_milliseconds().unsigned_abs() / (1000 * 60 * 60 * 24);
    match days {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => format!("{days} days ago"),
        7..=29 => format!("{} weeks ago", days / 7),
        _ => created_at.format("%-m/%-d/%Y").to_string(),
    }
}
