//! Deadline table for delayed effects.
//!
//! Nothing sleeps: an effect is stored with the match time it becomes due and
//! the tick loop drains whatever is due each step. The caller re-checks that
//! the target still exists when an effect fires, so an entity removed early
//! simply drops its pending effects.

use shared::{ClientId, EntityId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    RespawnPlayer(ClientId),
    DestroyBot(EntityId),
}

#[derive(Debug, Clone)]
struct Entry {
    due: f64,
    seq: u64,
    effect: Deferred,
}

#[derive(Debug, Default)]
pub struct Schedule {
    entries: Vec<Entry>,
    next_seq: u64,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, due: f64, effect: Deferred) {
        self.next_seq += 1;
        self.entries.push(Entry {
            due,
            seq: self.next_seq,
            effect,
        });
    }

    /// Removes and returns every effect due at `now`, earliest first.
    /// Effects sharing a deadline keep their insertion order.
    pub fn drain_due(&mut self, now: f64) -> Vec<Deferred> {
        let (mut due, pending): (Vec<Entry>, Vec<Entry>) =
            self.entries.drain(..).partition(|entry| entry.due <= now);
        self.entries = pending;
        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)));
        due.into_iter().map(|entry| entry.effect).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
