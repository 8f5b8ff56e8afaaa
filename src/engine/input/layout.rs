// Standard control layouts per device type

use super::control::ControlDescriptor;
use serde::{Deserialize, Serialize};
use winit::keyboard::KeyCode;

/// The closed set of device families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    Keyboard,
    /// Mouse, pen or touch surface
    Pointer,
    Gamepad,
    /// Generic HID joystick with a profile-defined layout
    Joystick,
    /// Tracked VR controller
    TrackedController,
}

impl DeviceType {
    /// Whether a device of this type can fill a slot asking for `required`
    ///
    /// Gamepads are joysticks with a known layout, so they satisfy joystick
    /// slots; everything else must match exactly.
    pub fn satisfies(&self, required: DeviceType) -> bool {
        *self == required || (*self == Self::Gamepad && required == Self::Joystick)
    }

    /// Layout used when a device registers without an explicit one
    pub fn standard_controls(&self) -> Vec<ControlDescriptor> {
        match self {
            Self::Keyboard => keyboard::controls(),
            Self::Pointer => pointer::controls(),
            Self::Gamepad => gamepad::controls(),
            Self::Joystick => joystick::controls(joystick::DEFAULT_AXES, joystick::DEFAULT_BUTTONS),
            Self::TrackedController => tracked::controls(),
        }
    }
}

pub mod keyboard {
    use super::*;

    /// Keys the keyboard layout exposes, in control order
    pub const KEYS: &[KeyCode] = &[
        KeyCode::KeyA,
        KeyCode::KeyB,
        KeyCode::KeyC,
        KeyCode::KeyD,
        KeyCode::KeyE,
        KeyCode::KeyF,
        KeyCode::KeyG,
        KeyCode::KeyH,
        KeyCode::KeyI,
        KeyCode::KeyJ,
        KeyCode::KeyK,
        KeyCode::KeyL,
        KeyCode::KeyM,
        KeyCode::KeyN,
        KeyCode::KeyO,
        KeyCode::KeyP,
        KeyCode::KeyQ,
        KeyCode::KeyR,
        KeyCode::KeyS,
        KeyCode::KeyT,
        KeyCode::KeyU,
        KeyCode::KeyV,
        KeyCode::KeyW,
        KeyCode::KeyX,
        KeyCode::KeyY,
        KeyCode::KeyZ,
        KeyCode::Digit0,
        KeyCode::Digit1,
        KeyCode::Digit2,
        KeyCode::Digit3,
        KeyCode::Digit4,
        KeyCode::Digit5,
        KeyCode::Digit6,
        KeyCode::Digit7,
        KeyCode::Digit8,
        KeyCode::Digit9,
        KeyCode::ArrowUp,
        KeyCode::ArrowDown,
        KeyCode::ArrowLeft,
        KeyCode::ArrowRight,
        KeyCode::Space,
        KeyCode::Enter,
        KeyCode::Escape,
        KeyCode::Tab,
        KeyCode::Backspace,
        KeyCode::ShiftLeft,
        KeyCode::ShiftRight,
        KeyCode::ControlLeft,
        KeyCode::ControlRight,
        KeyCode::AltLeft,
        KeyCode::AltRight,
        KeyCode::F1,
        KeyCode::F2,
        KeyCode::F3,
        KeyCode::F4,
        KeyCode::F5,
        KeyCode::F6,
        KeyCode::F7,
        KeyCode::F8,
        KeyCode::F9,
        KeyCode::F10,
        KeyCode::F11,
        KeyCode::F12,
    ];

    /// Control position of `key`, `None` for keys outside the layout
    pub fn key_index(key: KeyCode) -> Option<usize> {
        KEYS.iter().position(|candidate| *candidate == key)
    }

    /// Control name used for `key` (and therefore its hash)
    pub fn key_name(key: KeyCode) -> String {
        format!("{:?}", key)
    }

    pub fn controls() -> Vec<ControlDescriptor> {
        KEYS.iter()
            .map(|key| ControlDescriptor::button(key_name(*key)))
            .collect()
    }
}

pub mod pointer {
    use super::*;

    pub const POSITION: usize = 0;
    pub const DELTA: usize = 1;
    pub const PRESSURE: usize = 2;
    pub const TILT: usize = 3;
    pub const TWIST: usize = 4;
    pub const RADIUS: usize = 5;
    /// Left mouse button, or contact for pens and touch
    pub const PRIMARY: usize = 6;
    pub const SECONDARY: usize = 7;
    pub const MIDDLE: usize = 8;
    /// Pulses for one update when a click completes a double click
    pub const DOUBLE_CLICK: usize = 9;

    pub fn controls() -> Vec<ControlDescriptor> {
        vec![
            ControlDescriptor::vector3("Position"),
            ControlDescriptor::vector3("Delta").resetting(),
            ControlDescriptor::axis("Pressure"),
            ControlDescriptor::vector2("Tilt"),
            ControlDescriptor::axis("Twist"),
            ControlDescriptor::vector3("Radius"),
            ControlDescriptor::button("Primary"),
            ControlDescriptor::button("Secondary"),
            ControlDescriptor::button("Middle"),
            ControlDescriptor::button("DoubleClick").resetting(),
        ]
    }
}

pub mod gamepad {
    use super::*;

    pub const LEFT_STICK_X: usize = 0;
    pub const LEFT_STICK_Y: usize = 1;
    pub const RIGHT_STICK_X: usize = 2;
    pub const RIGHT_STICK_Y: usize = 3;
    pub const LEFT_TRIGGER: usize = 4;
    pub const RIGHT_TRIGGER: usize = 5;
    pub const ACTION_SOUTH: usize = 6;
    pub const ACTION_EAST: usize = 7;
    pub const ACTION_WEST: usize = 8;
    pub const ACTION_NORTH: usize = 9;
    pub const LEFT_BUMPER: usize = 10;
    pub const RIGHT_BUMPER: usize = 11;
    pub const START: usize = 12;
    pub const SELECT: usize = 13;
    pub const LEFT_STICK_BUTTON: usize = 14;
    pub const RIGHT_STICK_BUTTON: usize = 15;
    pub const DPAD_UP: usize = 16;
    pub const DPAD_RIGHT: usize = 17;
    pub const DPAD_DOWN: usize = 18;
    pub const DPAD_LEFT: usize = 19;

    pub const NAMES: [&str; 20] = [
        "LeftStickX",
        "LeftStickY",
        "RightStickX",
        "RightStickY",
        "LeftTrigger",
        "RightTrigger",
        "ActionSouth",
        "ActionEast",
        "ActionWest",
        "ActionNorth",
        "LeftBumper",
        "RightBumper",
        "Start",
        "Select",
        "LeftStickButton",
        "RightStickButton",
        "DPadUp",
        "DPadRight",
        "DPadDown",
        "DPadLeft",
    ];

    pub fn controls() -> Vec<ControlDescriptor> {
        NAMES
            .iter()
            .enumerate()
            .map(|(index, name)| {
                if index <= RIGHT_TRIGGER {
                    ControlDescriptor::axis(*name)
                } else {
                    ControlDescriptor::button(*name)
                }
            })
            .collect()
    }
}

pub mod joystick {
    use super::*;

    pub const DEFAULT_AXES: usize = 8;
    pub const DEFAULT_BUTTONS: usize = 16;

    /// Axes first, then buttons, then the four hat directions
    pub fn controls(axes: usize, buttons: usize) -> Vec<ControlDescriptor> {
        let mut controls: Vec<ControlDescriptor> = (0..axes)
            .map(|i| ControlDescriptor::axis(format!("Axis{}", i)))
            .chain((0..buttons).map(|i| ControlDescriptor::button(format!("Button{}", i))))
            .collect();
        for name in ["HatUp", "HatRight", "HatDown", "HatLeft"] {
            controls.push(ControlDescriptor::button(name));
        }
        controls
    }
}

pub mod tracked {
    use super::*;

    pub const POSITION: usize = 0;
    pub const ROTATION: usize = 1;
    pub const VELOCITY: usize = 2;
    pub const ANGULAR_VELOCITY: usize = 3;
    pub const ACCELERATION: usize = 4;
    pub const ANGULAR_ACCELERATION: usize = 5;
    pub const TRIGGER: usize = 6;
    pub const GRIP: usize = 7;
    pub const PRIMARY: usize = 8;
    pub const SECONDARY: usize = 9;
    pub const STICK_X: usize = 10;
    pub const STICK_Y: usize = 11;
    pub const STICK_CLICK: usize = 12;

    pub fn controls() -> Vec<ControlDescriptor> {
        vec![
            ControlDescriptor::vector3("Position"),
            ControlDescriptor::quaternion("Rotation"),
            ControlDescriptor::vector3("Velocity"),
            ControlDescriptor::vector3("AngularVelocity"),
            ControlDescriptor::vector3("Acceleration"),
            ControlDescriptor::vector3("AngularAcceleration"),
            ControlDescriptor::axis("Trigger"),
            ControlDescriptor::axis("Grip"),
            ControlDescriptor::button("PrimaryButton"),
            ControlDescriptor::button("SecondaryButton"),
            ControlDescriptor::axis("StickX"),
            ControlDescriptor::axis("StickY"),
            ControlDescriptor::button("StickClick"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::input::value::ControlKind;

    #[test]
    fn test_keyboard_key_index_round_trip() {
        let index = keyboard::key_index(KeyCode::Space).unwrap();
        assert_eq!(keyboard::KEYS[index], KeyCode::Space);
        assert_eq!(keyboard::key_index(KeyCode::NumLock), None);
        assert_eq!(keyboard::controls().len(), keyboard::KEYS.len());
    }

    #[test]
    fn test_gamepad_axes_then_buttons() {
        let controls = gamepad::controls();
        assert_eq!(controls[gamepad::LEFT_STICK_X].kind, ControlKind::Axis);
        assert_eq!(controls[gamepad::RIGHT_TRIGGER].kind, ControlKind::Axis);
        assert_eq!(controls[gamepad::ACTION_SOUTH].kind, ControlKind::Button);
        assert_eq!(controls[gamepad::DPAD_LEFT].name, "DPadLeft");
    }

    #[test]
    fn test_joystick_layout_sizes() {
        let controls = joystick::controls(3, 5);
        assert_eq!(controls.len(), 3 + 5 + 4);
        assert_eq!(controls[3].name, "Button0");
        assert_eq!(controls[8].name, "HatUp");
    }

    #[test]
    fn test_device_type_compatibility() {
        assert!(DeviceType::Gamepad.satisfies(DeviceType::Joystick));
        assert!(DeviceType::Gamepad.satisfies(DeviceType::Gamepad));
        assert!(!DeviceType::Joystick.satisfies(DeviceType::Gamepad));
        assert!(!DeviceType::Keyboard.satisfies(DeviceType::Pointer));
    }

    #[test]
    fn test_pointer_delta_resets() {
        let controls = pointer::controls();
        assert!(controls[pointer::DELTA].resets_each_frame);
        assert!(!controls[pointer::POSITION].resets_each_frame);
    }
}
