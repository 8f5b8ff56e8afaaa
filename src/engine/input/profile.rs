// Device profiles: raw hardware control indices to logical controls

use super::event::{EventPayload, GenericControlEvent, InputEvent};
use super::layout::gamepad;
use crate::core::math;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Closed numeric range used for rescaling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub const UNIT: ValueRange = ValueRange { min: 0.0, max: 1.0 };
    pub const SIGNED_UNIT: ValueRange = ValueRange {
        min: -1.0,
        max: 1.0,
    };

    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }
}

/// Logical destination of a mapped value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangedTarget {
    pub control: usize,
    pub from: Option<ValueRange>,
    pub to: Option<ValueRange>,
    /// Values whose magnitude falls below this become 0, the rest rescale
    pub dead_zone: Option<f32>,
}

impl RangedTarget {
    /// Identity mapping onto `control`
    pub fn to_control(control: usize) -> Self {
        Self {
            control,
            from: None,
            to: None,
            dead_zone: None,
        }
    }

    pub fn with_ranges(mut self, from: ValueRange, to: ValueRange) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn with_dead_zone(mut self, dead_zone: f32) -> Self {
        self.dead_zone = Some(dead_zone);
        self
    }

    /// Rescale and dead-zone a raw value
    ///
    /// With neither range declared the value passes through; a single
    /// missing range defaults to [-1, 1].
    pub fn apply(&self, raw: f32) -> f32 {
        let value = match (self.from, self.to) {
            (None, None) => raw,
            (from, to) => {
                let from = from.unwrap_or(ValueRange::SIGNED_UNIT);
                let to = to.unwrap_or(ValueRange::SIGNED_UNIT);
                math::remap(raw, (from.min, from.max), (to.min, to.max))
            }
        };
        match self.dead_zone {
            Some(dead_zone) if dead_zone > 0.0 && dead_zone < 1.0 => {
                let magnitude = value.abs();
                if magnitude < dead_zone {
                    0.0
                } else {
                    let scaled = (magnitude - dead_zone) / (1.0 - dead_zone);
                    value.signum() * math::clamp(scaled, 0.0, 1.0)
                }
            }
            _ => value,
        }
    }
}

/// How one raw control index is interpreted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlMapping {
    /// Rewrite onto a single logical control
    Direct(RangedTarget),
    /// Fan one axis out into its negative and positive halves
    Split {
        /// Normalizes the raw value onto [-1, 1] before splitting
        from: Option<ValueRange>,
        negative: RangedTarget,
        positive: RangedTarget,
    },
    /// Decode an 8-way hat into four direction buttons
    Hat {
        up: usize,
        right: usize,
        down: usize,
        left: usize,
        /// Raw value of the "up" position
        start: i32,
    },
    /// Known noise, swallowed
    Ignore,
}

/// Hat positions clockwise from up; odd entries are diagonals
const HAT_DIRECTIONS: [[bool; 4]; 8] = [
    [true, false, false, false],
    [true, true, false, false],
    [false, true, false, false],
    [false, true, true, false],
    [false, false, true, false],
    [false, false, true, true],
    [false, false, false, true],
    [true, false, false, true],
];

/// Decode a raw hat value into `[up, right, down, left]`
///
/// Position `raw - start` indexes the eight directions. This is not a
/// plain modulo 8: values outside `start..start + 8` decode as centered.
pub fn decode_hat(raw: f32, start: i32) -> [bool; 4] {
    let offset = raw.round() as i32 - start;
    usize::try_from(offset)
        .ok()
        .and_then(|offset| HAT_DIRECTIONS.get(offset))
        .copied()
        .unwrap_or([false; 4])
}

/// A per-device-family remapping table
///
/// Built once and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    name: String,
    mappings: HashMap<usize, ControlMapping>,
    /// Logical controls this family actually has; `None` means all
    supported_controls: Option<Vec<usize>>,
}

impl DeviceProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mappings: HashMap::new(),
            supported_controls: None,
        }
    }

    pub fn map_direct(mut self, raw: usize, target: RangedTarget) -> Self {
        self.mappings.insert(raw, ControlMapping::Direct(target));
        self
    }

    pub fn map_split(
        mut self,
        raw: usize,
        from: Option<ValueRange>,
        negative: RangedTarget,
        positive: RangedTarget,
    ) -> Self {
        self.mappings.insert(
            raw,
            ControlMapping::Split {
                from,
                negative,
                positive,
            },
        );
        self
    }

    /// Map a hat; `targets` are `[up, right, down, left]`
    pub fn map_hat(mut self, raw: usize, start: i32, targets: [usize; 4]) -> Self {
        let [up, right, down, left] = targets;
        self.mappings.insert(
            raw,
            ControlMapping::Hat {
                up,
                right,
                down,
                left,
                start,
            },
        );
        self
    }

    pub fn ignore(mut self, raw: usize) -> Self {
        self.mappings.insert(raw, ControlMapping::Ignore);
        self
    }

    pub fn with_supported_controls(mut self, controls: Vec<usize>) -> Self {
        self.supported_controls = Some(controls);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mapping(&self, raw: usize) -> Option<&ControlMapping> {
        self.mappings.get(&raw)
    }

    pub fn supported_controls(&self) -> Option<&[usize]> {
        self.supported_controls.as_deref()
    }

    /// Reinterpret a raw control event
    ///
    /// Direct mappings rewrite `event` in place and let it continue. Split
    /// and hat mappings push their fan-out onto `synthesized` and consume the
    /// original. Returns true when the original event is consumed.
    pub fn remap(&self, event: &mut InputEvent, synthesized: &mut Vec<InputEvent>) -> bool {
        let (device, time) = (event.device, event.time);
        let control = match &mut event.payload {
            EventPayload::GenericControl(control) if !control.already_remapped => control,
            _ => return false,
        };

        let Some(mapping) = self.mappings.get(&control.control_index) else {
            return false;
        };

        match mapping {
            ControlMapping::Direct(target) => {
                *control = GenericControlEvent {
                    control_index: target.control,
                    value: target.apply(control.value),
                    raw_value: control.raw_value,
                    already_remapped: true,
                };
                false
            }
            ControlMapping::Split {
                from,
                negative,
                positive,
            } => {
                let normalized = match from {
                    Some(from) => math::remap(
                        control.value,
                        (from.min, from.max),
                        (ValueRange::SIGNED_UNIT.min, ValueRange::SIGNED_UNIT.max),
                    ),
                    None => control.value,
                };
                let negative_half = (-normalized).max(0.0);
                let positive_half = normalized.max(0.0);
                synthesized.push(InputEvent::remapped(
                    device,
                    time,
                    negative.control,
                    negative.apply(negative_half),
                    control.raw_value,
                ));
                synthesized.push(InputEvent::remapped(
                    device,
                    time,
                    positive.control,
                    positive.apply(positive_half),
                    control.raw_value,
                ));
                true
            }
            ControlMapping::Hat {
                up,
                right,
                down,
                left,
                start,
            } => {
                let pressed = decode_hat(control.value, *start);
                let targets = [*up, *right, *down, *left];
                for (target, is_down) in targets.into_iter().zip(pressed) {
                    let value = if is_down { 1.0 } else { 0.0 };
                    synthesized.push(InputEvent::remapped(
                        device,
                        time,
                        target,
                        value,
                        control.raw_value,
                    ));
                }
                true
            }
            ControlMapping::Ignore => true,
        }
    }
}

/// Profile for HID pads that report sticks as 16-bit axes, both triggers on
/// one combined axis, and the d-pad as a hat
///
/// Raw layout: 0/1 left stick, 2 combined triggers, 3/4 right stick, 5 hat,
/// 6 the driver's duplicate trigger axis, 10.. face and shoulder buttons.
pub fn generic_hid_gamepad() -> DeviceProfile {
    let stick_range = ValueRange::new(0.0, 65535.0);
    let stick = |control| {
        RangedTarget::to_control(control)
            .with_ranges(stick_range, ValueRange::SIGNED_UNIT)
            .with_dead_zone(0.1)
    };
    let buttons = [
        gamepad::ACTION_SOUTH,
        gamepad::ACTION_EAST,
        gamepad::ACTION_WEST,
        gamepad::ACTION_NORTH,
        gamepad::LEFT_BUMPER,
        gamepad::RIGHT_BUMPER,
        gamepad::SELECT,
        gamepad::START,
        gamepad::LEFT_STICK_BUTTON,
        gamepad::RIGHT_STICK_BUTTON,
    ];

    let mut profile = DeviceProfile::new("Generic HID Gamepad")
        .map_direct(0, stick(gamepad::LEFT_STICK_X))
        .map_direct(1, stick(gamepad::LEFT_STICK_Y))
        .map_split(
            2,
            Some(stick_range),
            RangedTarget::to_control(gamepad::LEFT_TRIGGER),
            RangedTarget::to_control(gamepad::RIGHT_TRIGGER),
        )
        .map_direct(3, stick(gamepad::RIGHT_STICK_X))
        .map_direct(4, stick(gamepad::RIGHT_STICK_Y))
        .map_hat(
            5,
            0,
            [
                gamepad::DPAD_UP,
                gamepad::DPAD_RIGHT,
                gamepad::DPAD_DOWN,
                gamepad::DPAD_LEFT,
            ],
        )
        .ignore(6);
    for (offset, target) in buttons.into_iter().enumerate() {
        profile = profile.map_direct(10 + offset, RangedTarget::to_control(target));
    }
    profile
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::input::event::DeviceId;
    use approx::assert_relative_eq;

    fn control_of(event: &InputEvent) -> GenericControlEvent {
        match event.payload {
            EventPayload::GenericControl(control) => control,
            _ => panic!("expected a control event"),
        }
    }

    #[test]
    fn test_hat_diagonal_decodes_two_directions() {
        assert_eq!(decode_hat(1.0, 0), [true, true, false, false]);
        assert_eq!(decode_hat(0.0, 0), [true, false, false, false]);
        assert_eq!(decode_hat(7.0, 0), [true, false, false, true]);
    }

    #[test]
    fn test_hat_respects_start_and_centers_out_of_range() {
        assert_eq!(decode_hat(5.0, 1), [false, false, true, false]);
        assert_eq!(decode_hat(8.0, 0), [false; 4]);
        assert_eq!(decode_hat(-1.0, 0), [false; 4]);
        // No wrap-around past the last position
        assert_eq!(decode_hat(9.0, 1), [false; 4]);
        assert_eq!(decode_hat(15.0, 0), [false; 4]);
        assert_eq!(decode_hat(8.0, 1), [true, false, false, true]);
    }

    #[test]
    fn test_hat_event_fans_out_to_four_buttons() {
        let profile = DeviceProfile::new("hat").map_hat(5, 0, [10, 11, 12, 13]);
        let mut event = InputEvent::control(DeviceId(1), 2.0, 5, 1.0);
        let mut synthesized = Vec::new();

        assert!(profile.remap(&mut event, &mut synthesized));
        let values: Vec<(usize, f32)> = synthesized
            .iter()
            .map(control_of)
            .map(|c| (c.control_index, c.value))
            .collect();
        assert_eq!(values, vec![(10, 1.0), (11, 1.0), (12, 0.0), (13, 0.0)]);
        assert!(synthesized.iter().all(|e| control_of(e).already_remapped));
        assert!(synthesized.iter().all(|e| e.time == 2.0));
    }

    #[test]
    fn test_direct_rescales_in_place() {
        let profile = DeviceProfile::new("direct").map_direct(
            0,
            RangedTarget::to_control(4).with_ranges(ValueRange::new(0.0, 255.0), ValueRange::UNIT),
        );
        let mut event = InputEvent::control(DeviceId(1), 0.0, 0, 255.0);
        let mut synthesized = Vec::new();

        assert!(!profile.remap(&mut event, &mut synthesized));
        assert!(synthesized.is_empty());
        let control = control_of(&event);
        assert_eq!(control.control_index, 4);
        assert_relative_eq!(control.value, 1.0);
        assert_eq!(control.raw_value, 255.0);
        assert!(control.already_remapped);
    }

    #[test]
    fn test_already_remapped_is_left_alone() {
        let profile = DeviceProfile::new("direct").map_direct(0, RangedTarget::to_control(4));
        let mut event = InputEvent::remapped(DeviceId(1), 0.0, 0, 0.5, 0.5);
        let before = event.clone();
        assert!(!profile.remap(&mut event, &mut Vec::new()));
        assert_eq!(event, before);
    }

    #[test]
    fn test_split_produces_both_halves() {
        let profile = DeviceProfile::new("split").map_split(
            2,
            None,
            RangedTarget::to_control(4),
            RangedTarget::to_control(5),
        );
        let mut event = InputEvent::control(DeviceId(1), 0.0, 2, -0.75);
        let mut synthesized = Vec::new();

        assert!(profile.remap(&mut event, &mut synthesized));
        assert_eq!(synthesized.len(), 2);
        let negative = control_of(&synthesized[0]);
        let positive = control_of(&synthesized[1]);
        assert_eq!((negative.control_index, negative.value), (4, 0.75));
        assert_eq!((positive.control_index, positive.value), (5, 0.0));
    }

    #[test]
    fn test_ignored_and_unmapped_indices() {
        let profile = DeviceProfile::new("noise").ignore(6);
        let mut ignored = InputEvent::control(DeviceId(1), 0.0, 6, 1.0);
        let mut unmapped = InputEvent::control(DeviceId(1), 0.0, 7, 1.0);
        assert!(profile.remap(&mut ignored, &mut Vec::new()));
        assert!(!profile.remap(&mut unmapped, &mut Vec::new()));
        assert!(!control_of(&unmapped).already_remapped);
    }

    #[test]
    fn test_dead_zone_rescales_outside() {
        let target = RangedTarget::to_control(0).with_dead_zone(0.2);
        assert_eq!(target.apply(0.1), 0.0);
        assert_eq!(target.apply(-0.1), 0.0);
        assert_relative_eq!(target.apply(0.6), 0.5, epsilon = 1.0e-6);
        assert_relative_eq!(target.apply(-1.0), -1.0, epsilon = 1.0e-6);
    }

    #[test]
    fn test_generic_hid_gamepad_centers_sticks() {
        let profile = generic_hid_gamepad();
        let mut event = InputEvent::control(DeviceId(1), 0.0, 0, 32767.0);
        profile.remap(&mut event, &mut Vec::new());
        let control = control_of(&event);
        assert_eq!(control.control_index, gamepad::LEFT_STICK_X);
        assert_eq!(control.value, 0.0);
    }
}
