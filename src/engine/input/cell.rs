// Dual-timeline value storage for a single control

use serde::{Deserialize, Serialize};

/// The two independently advancing update clocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeline {
    /// Fixed-step simulation updates
    Fixed,
    /// Once-per-rendered-frame updates
    Variable,
}

impl Timeline {
    pub const ALL: [Timeline; 2] = [Timeline::Fixed, Timeline::Variable];

    /// Position of this timeline in per-timeline arrays
    pub fn slot(self) -> usize {
        match self {
            Self::Fixed => 0,
            Self::Variable => 1,
        }
    }
}

/// Values tracked for one timeline
#[derive(Debug, Clone, Copy, PartialEq)]
struct TimelineState<T> {
    raw: T,
    current: T,
    previous: T,
}

impl<T: Copy> TimelineState<T> {
    fn new(default: T) -> Self {
        Self {
            raw: default,
            current: default,
            previous: default,
        }
    }
}

/// Holds a control's raw, current and previous values on both timelines
///
/// `previous` only moves on [`ValueCell::advance`], never on a write, so
/// "changed this frame" stays correct when a value is written several
/// times between two advances.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueCell<T> {
    default: T,
    timelines: [TimelineState<T>; 2],
}

impl<T: Copy> ValueCell<T> {
    /// Create a cell where every slot starts at `default`
    pub fn new(default: T) -> Self {
        Self {
            default,
            timelines: [TimelineState::new(default); 2],
        }
    }

    pub fn default_value(&self) -> T {
        self.default
    }

    /// Current value on `timeline`
    pub fn current(&self, timeline: Timeline) -> T {
        self.timelines[timeline.slot()].current
    }

    /// Value captured by the last advance of `timeline`
    pub fn previous(&self, timeline: Timeline) -> T {
        self.timelines[timeline.slot()].previous
    }

    /// Unprocessed value last delivered by an event
    pub fn raw(&self, timeline: Timeline) -> T {
        self.timelines[timeline.slot()].raw
    }

    /// Write an event value into both timelines
    ///
    /// Hardware events must be visible whichever timeline reads next.
    pub fn set_from_event(&mut self, raw: T, value: T) {
        for state in &mut self.timelines {
            state.raw = raw;
            state.current = value;
        }
    }

    /// Write only the live timeline (end-of-update combination results)
    pub fn set(&mut self, timeline: Timeline, value: T) {
        self.timelines[timeline.slot()].current = value;
    }

    /// Capture the live timeline's current value as its previous value
    pub fn advance(&mut self, timeline: Timeline) {
        let state = &mut self.timelines[timeline.slot()];
        state.previous = state.current;
    }

    /// Put every slot of both timelines back to the default
    pub fn reset(&mut self) {
        self.timelines = [TimelineState::new(self.default); 2];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_previous_starts_at_default() {
        let cell = ValueCell::new(0.25f32);
        for timeline in Timeline::ALL {
            assert_eq!(cell.previous(timeline), 0.25);
            assert_eq!(cell.current(timeline), 0.25);
        }
    }

    #[test]
    fn test_event_writes_both_timelines() {
        let mut cell = ValueCell::new(0.0f32);
        cell.set_from_event(200.0, 1.0);
        assert_eq!(cell.current(Timeline::Fixed), 1.0);
        assert_eq!(cell.current(Timeline::Variable), 1.0);
        assert_eq!(cell.raw(Timeline::Fixed), 200.0);
        assert_eq!(cell.raw(Timeline::Variable), 200.0);
    }

    #[test]
    fn test_set_writes_live_timeline_only() {
        let mut cell = ValueCell::new(0.0f32);
        cell.set(Timeline::Fixed, 0.7);
        assert_eq!(cell.current(Timeline::Fixed), 0.7);
        assert_eq!(cell.current(Timeline::Variable), 0.0);
    }

    #[test]
    fn test_advance_captures_previous() {
        let mut cell = ValueCell::new(0.0f32);
        cell.set_from_event(1.0, 1.0);
        cell.advance(Timeline::Variable);
        assert_eq!(cell.previous(Timeline::Variable), 1.0);
        // The fixed timeline has not advanced yet
        assert_eq!(cell.previous(Timeline::Fixed), 0.0);
    }

    #[test]
    fn test_event_after_advance_keeps_previous() {
        let mut cell = ValueCell::new(0.0f32);
        cell.set_from_event(0.4, 0.4);
        cell.advance(Timeline::Fixed);
        cell.set_from_event(0.9, 0.9);
        cell.set_from_event(0.1, 0.1);
        assert_eq!(cell.previous(Timeline::Fixed), 0.4);
        assert_eq!(cell.current(Timeline::Fixed), 0.1);
    }

    #[test]
    fn test_reset() {
        let mut cell = ValueCell::new(0.0f32);
        cell.set_from_event(1.0, 1.0);
        cell.advance(Timeline::Fixed);
        cell.reset();
        assert_eq!(cell.previous(Timeline::Fixed), 0.0);
        assert_eq!(cell.current(Timeline::Variable), 0.0);
        assert_eq!(cell.raw(Timeline::Variable), 0.0);
    }
}
