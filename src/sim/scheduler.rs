//! Virtual-clock timer scheduler
//!
//! Every delayed transition and periodic spawner in the battle is a timer here, keyed by
//! what it is for. Components never hold raw handles: they cancel by key, or drop every
//! outstanding timer at once with [`Scheduler::cancel_all`] on their exit paths.
//!
//! Time only moves when the owner pops due timers, so the whole battle is reproducible
//! from a seed and a sequence of `update` calls.

use serde::{Deserialize, Serialize};

/// One outstanding timer
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Timer<K> {
    key: K,
    due: u64,
    /// `Some` for repeating timers
    period: Option<u64>,
    /// Scheduling order, breaks ties between timers due at the same instant
    seq: u64,
}

/// Timers keyed by purpose on a millisecond virtual clock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scheduler<K> {
    now: u64,
    next_seq: u64,
    timers: Vec<Timer<K>>,
}

impl<K: Copy + PartialEq> Scheduler<K> {
    /// Create an empty scheduler whose clock starts at `now`
    pub fn new(now: u64) -> Self {
        Self {
            now,
            next_seq: 0,
            timers: Vec::new(),
        }
    }

    /// Current clock value
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Move the clock forward without firing anything (never backwards)
    pub fn advance_clock(&mut self, to: u64) {
        self.now = self.now.max(to);
    }

    /// Fire `key` once, `delay` ms from now. Replaces a pending timer with the same key.
    pub fn schedule_once(&mut self, key: K, delay: u64) {
        self.insert(key, delay, None);
    }

    /// Fire `key` every `period` ms, first one period from now. Replaces a pending timer
    /// with the same key.
    pub fn schedule_repeating(&mut self, key: K, period: u64) {
        self.insert(key, period, Some(period.max(1)));
    }

    fn insert(&mut self, key: K, delay: u64, period: Option<u64>) {
        self.cancel(key);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.push(Timer {
            key,
            due: self.now.saturating_add(delay),
            period,
            seq,
        });
    }

    /// Cancel the timer for `key`; returns whether one was pending
    pub fn cancel(&mut self, key: K) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.key != key);
        before != self.timers.len()
    }

    /// Cancel every outstanding timer
    pub fn cancel_all(&mut self) {
        if !self.timers.is_empty() {
            log::trace!("cancelling {} pending timers", self.timers.len());
        }
        self.timers.clear();
    }

    pub fn is_scheduled(&self, key: K) -> bool {
        self.timers.iter().any(|t| t.key == key)
    }

    /// Number of outstanding timers
    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Due time of the earliest outstanding timer
    pub fn next_due(&self) -> Option<u64> {
        self.earliest().map(|i| self.timers[i].due)
    }

    /// Pop the earliest timer due at or before `until`.
    ///
    /// The clock moves to the timer's due time so that anything the handler schedules is
    /// measured from the instant it fired. Repeating timers are re-armed one period later.
    pub fn pop_due(&mut self, until: u64) -> Option<K> {
        let idx = self.earliest()?;
        if self.timers[idx].due > until {
            return None;
        }

        let due = self.timers[idx].due;
        self.now = self.now.max(due);
        let key = self.timers[idx].key;

        match self.timers[idx].period {
            Some(period) => {
                let seq = self.next_seq;
                self.next_seq += 1;
                let timer = &mut self.timers[idx];
                timer.due = due.saturating_add(period);
                timer.seq = seq;
            }
            None => {
                self.timers.swap_remove(idx);
            }
        }

        Some(key)
    }

    fn earliest(&self) -> Option<usize> {
        self.timers
            .iter()
            .enumerate()
            .min_by_key(|(_, t)| (t.due, t.seq))
            .map(|(i, _)| i)
    }
}
