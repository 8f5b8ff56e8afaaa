// Time-ordered event buffer drained once per update transition

use super::event::InputEvent;
use std::collections::VecDeque;

/// Pending events, kept sorted by timestamp
///
/// Events with equal timestamps keep their arrival order. Draining stops at
/// the target time; anything later waits for a later transition.
#[derive(Debug, Default)]
pub struct EventBuffer {
    events: VecDeque<InputEvent>,
}

impl EventBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    /// Insert an event at its timestamp position
    pub fn push(&mut self, event: InputEvent) {
        // Platforms deliver in order, so scanning from the back is short
        let position = self
            .events
            .iter()
            .rposition(|queued| queued.time <= event.time)
            .map_or(0, |index| index + 1);
        self.events.insert(position, event);
    }

    /// Remove the oldest event if it is due at `target_time`
    pub fn pop_due(&mut self, target_time: f64) -> Option<InputEvent> {
        match self.events.front() {
            Some(event) if event.time <= target_time => self.events.pop_front(),
            _ => None,
        }
    }

    /// Timestamp of the oldest pending event
    pub fn next_time(&self) -> Option<f64> {
        self.events.front().map(|event| event.time)
    }

    /// Drop every pending event
    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
