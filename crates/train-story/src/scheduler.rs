//! Virtual clock that owns every timer in the experience.
//!
//! Nothing here sleeps: the host advances the clock and drains due timers
//! one at a time, so a handler may cancel or schedule other timers before
//! the next one is considered.

pub type TimerId = u64;

#[derive(Debug, Clone)]
struct Entry<T> {
    id: TimerId,
    due: u64,
    period: Option<u64>,
    payload: T,
}

#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    now: u64,
    next_id: TimerId,
    entries: Vec<Entry<T>>,
}

impl<T: Clone> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: 0,
            next_id: 1,
            entries: Vec::new(),
        }
    }

    /// Current virtual time in milliseconds.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Fire `payload` once, `delay_ms` from now.
    pub fn once(&mut self, delay_ms: u64, payload: T) -> TimerId {
        self.push(delay_ms, None, payload)
    }

    /// Fire `payload` every `period_ms`, first after one period.
    pub fn every(&mut self, period_ms: u64, payload: T) -> TimerId {
        let period = period_ms.max(1);
        self.push(period, Some(period), payload)
    }

    fn push(&mut self, delay_ms: u64, period: Option<u64>, payload: T) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            due: self.now + delay_ms,
            period,
            payload,
        });
        id
    }

    /// Returns true if the timer was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Cancel every timer whose payload matches. Returns how many were dropped.
    pub fn cancel_matching(&mut self, pred: impl Fn(&T) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !pred(&e.payload));
        before - self.entries.len()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn any_pending(&self, pred: impl Fn(&T) -> bool) -> bool {
        self.entries.iter().any(|e| pred(&e.payload))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pop the earliest timer due at or before `until`, moving the clock to
    /// its deadline. Ties fire in scheduling order. Repeating timers are
    /// re-armed before their payload is returned.
    pub fn pop_due(&mut self, until: u64) -> Option<T> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= until)
            .min_by_key(|(_, e)| (e.due, e.id))
            .map(|(i, _)| i)?;

        let due = self.entries[idx].due;
        self.now = self.now.max(due);

        match self.entries[idx].period {
            Some(period) => {
                let entry = &mut self.entries[idx];
                entry.due += period;
                Some(entry.payload.clone())
            }
            None => Some(self.entries.swap_remove(idx).payload),
        }
    }

    /// Move the clock forward without firing anything.
    pub fn advance_to(&mut self, until: u64) {
        self.now = self.now.max(until);
    }
}
