/// Single-threaded timeline of scheduled continuations.
///
/// Entries fire from `advance()` in (due time, insertion order). Two kinds:
///   - `after(delay, a)` : due at `now + delay`
///   - `next_tick(a)`    : due on the next `advance()`, whatever its `dt`
///
/// Nothing here runs concurrently; a continuation is just a value handed
/// back to the caller, which applies it on the same control thread.

use std::time::Duration;

#[derive(Clone, Debug)]
struct Entry<A> {
    due: Duration,
    seq: u64,
    next_tick: bool,
    action: A,
}

#[derive(Clone, Debug)]
pub struct Schedule<A> {
    now: Duration,
    seq: u64,
    entries: Vec<Entry<A>>,
}

impl<A> Default for Schedule<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Schedule<A> {
    pub fn new() -> Self {
        Schedule { now: Duration::ZERO, seq: 0, entries: Vec::new() }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn after(&mut self, delay: Duration, action: A) {
        let due = self.now + delay;
        self.push(due, false, action);
    }

    pub fn next_tick(&mut self, action: A) {
        let due = self.now;
        self.push(due, true, action);
    }

    /// Move time forward by `dt` and return every due action, in order.
    pub fn advance(&mut self, dt: Duration) -> Vec<A> {
        self.now += dt;
        let now = self.now;
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.next_tick || e.due <= now);
        self.entries = pending;
        due.sort_by_key(|e| (e.due, e.seq));
        due.into_iter().map(|e| e.action).collect()
    }

    /// Drop everything (level teardown). Time keeps running.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn push(&mut self, due: Duration, next_tick: bool, action: A) {
        self.seq += 1;
        self.entries.push(Entry { due, seq: self.seq, next_tick, action });
    }
}
