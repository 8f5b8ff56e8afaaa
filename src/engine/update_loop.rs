/// Update clock for the two input timelines
///
/// Implements a fixed timestep clock with a variable step per frame.
/// Callers feed explicit frame times; the clock answers which fixed-step
/// target times fall into the frame and where the variable step ends.
use crate::engine::input::InputSettings;

/// Default fixed update rate (60 updates per second)
pub const FIXED_TIMESTEP: f64 = 1.0 / 60.0;

/// Maximum number of fixed steps per frame to prevent spiral of death
pub const MAX_FIXED_STEPS: u32 = 5;

/// Target times produced by one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSteps {
    /// End time of each fixed update to run, in order
    pub fixed_targets: Vec<f64>,

    /// End time of the frame's variable update
    pub variable_target: f64,
}

/// Frame timing state
#[derive(Debug, Clone)]
pub struct UpdateClock {
    /// Seconds per fixed step
    step: f64,

    /// Cap on fixed steps per frame
    max_steps: u32,

    /// Accumulated time not yet covered by fixed steps
    accumulator: f64,

    /// End time of the last fixed step
    fixed_time: f64,

    /// End time of the last frame
    variable_time: f64,

    /// Whether fixed updates are paused
    paused: bool,

    /// Current frame number
    frame_count: u64,

    /// Total fixed updates produced
    update_count: u64,
}

impl UpdateClock {
    /// Create a clock starting at time zero
    pub fn new(step: f64, max_steps: u32) -> Self {
        Self {
            step,
            max_steps,
            accumulator: 0.0,
            fixed_time: 0.0,
            variable_time: 0.0,
            paused: false,
            frame_count: 0,
            update_count: 0,
        }
    }

    pub fn from_settings(settings: &InputSettings) -> Self {
        Self::new(settings.fixed_timestep, settings.max_fixed_steps)
    }

    /// Account for `frame_time` seconds and return the frame's targets
    pub fn advance(&mut self, frame_time: f64) -> FrameSteps {
        let frame_time = frame_time.max(0.0);
        self.frame_count += 1;
        self.variable_time += frame_time;

        let mut fixed_targets = Vec::new();
        if !self.paused {
            self.accumulator += frame_time;
            while self.accumulator >= self.step && (fixed_targets.len() as u32) < self.max_steps {
                self.accumulator -= self.step;
                self.fixed_time += self.step;
                fixed_targets.push(self.fixed_time);
            }
            self.update_count += fixed_targets.len() as u64;
        }

        FrameSteps {
            fixed_targets,
            variable_target: self.variable_time,
        }
    }

    /// Get the fixed timestep (in seconds)
    pub fn fixed_timestep(&self) -> f64 {
        self.step
    }

    /// End time of the last fixed step
    pub fn fixed_time(&self) -> f64 {
        self.fixed_time
    }

    /// End time of the last frame
    pub fn variable_time(&self) -> f64 {
        self.variable_time
    }

    /// Fraction of a fixed step accumulated but not yet run
    pub fn alpha(&self) -> f64 {
        self.accumulator / self.step
    }

    /// Get total number of frames advanced
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get total number of fixed updates produced
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pause fixed updates
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            log::info!("Fixed updates paused");
        }
    }

    /// Resume fixed updates
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            // Reset accumulator to prevent update burst
            self.accumulator = 0.0;
            self.fixed_time = self.variable_time;
            log::info!("Fixed updates resumed");
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }
}

impl Default for UpdateClock {
    fn default() -> Self {
        Self::new(FIXED_TIMESTEP, MAX_FIXED_STEPS)
    }
}
