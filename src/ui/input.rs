/// Keyboard state tracker.
///
/// The sandbox is turn-like: one key press is one grid step. Holding a key
/// repeats the step after `REPEAT_DELAY`, then every `REPEAT_EVERY`.
///
/// Release events are honoured when the terminal reports them; otherwise a
/// key counts as released once no Press/Repeat arrived for `HOLD_TIMEOUT`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use mirrorgrid::domain::geometry::MoveDir;

const HOLD_TIMEOUT: Duration = Duration::from_millis(160);
const REPEAT_DELAY: Duration = Duration::from_millis(220);
const REPEAT_EVERY: Duration = Duration::from_millis(90);

struct Held {
    since: Instant,
    last_seen: Instant,
    last_fired: Instant,
}

pub struct InputState {
    held: HashMap<KeyCode, Held>,
    /// Keys that went from released to held during the last drain.
    fresh_presses: Vec<KeyCode>,
    pub raw_events: Vec<KeyEvent>,
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            held: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain pending terminal events. Call once per frame.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            let key = match event::read() {
                Ok(Event::Key(key)) => key,
                _ => continue,
            };
            self.raw_events.push(key);

            match key.kind {
                KeyEventKind::Release if self.honor_release => {
                    self.held.remove(&key.code);
                }
                KeyEventKind::Release => {}
                _ => {
                    let now = Instant::now();
                    match self.held.get_mut(&key.code) {
                        Some(h) if now.duration_since(h.last_seen) < HOLD_TIMEOUT => h.last_seen = now,
                        _ => {
                            self.held.insert(key.code, Held { since: now, last_seen: now, last_fired: now });
                            self.fresh_presses.push(key.code);
                        }
                    }
                }
            }
        }

        let now = Instant::now();
        self.held.retain(|_, h| now.duration_since(h.last_seen) < HOLD_TIMEOUT);
    }

    /// Edge trigger: pressed this frame.
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Fresh press, or a held key whose repeat is due.
    pub fn fire(&mut self, codes: &[KeyCode]) -> bool {
        if self.any_pressed(codes) {
            return true;
        }
        let now = Instant::now();
        for code in codes {
            if let Some(h) = self.held.get_mut(code) {
                if now.duration_since(h.since) >= REPEAT_DELAY
                    && now.duration_since(h.last_fired) >= REPEAT_EVERY
                {
                    h.last_fired = now;
                    return true;
                }
            }
        }
        false
    }

    /// First direction whose binding fires this frame.
    pub fn direction(&mut self, bindings: &[(MoveDir, &[KeyCode])]) -> Option<MoveDir> {
        bindings.iter().find_map(|&(dir, codes)| self.fire(codes).then_some(dir))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}
