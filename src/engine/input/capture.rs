// Binding capture: listen for the next actuated control to rebind an action

use super::binding::{Binding, ControlReference, SlotKey};
use super::control::ControlHash;
use super::device::Device;
use super::event::{DeviceId, EventPayload, InputEvent};
use super::layout::{keyboard, pointer, DeviceType};
use super::provider::ControlProvider;
use super::value::ControlKind;

/// The control a capture picked up
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedControl {
    pub device: DeviceId,
    pub device_type: DeviceType,
    pub tags: Vec<String>,
    pub index: usize,
    pub name: String,
    pub hash: ControlHash,
    pub kind: ControlKind,
    pub time: f64,
}

impl CapturedControl {
    /// Reference to the captured control through `slot`
    pub fn reference(&self, slot: SlotKey) -> ControlReference {
        ControlReference::from_hash(slot, self.hash, self.kind)
    }

    pub fn binding(&self, slot: SlotKey) -> Binding {
        Binding::Control(self.reference(slot))
    }
}

/// A one-shot listener offered events before global players
///
/// Captures the first button press or axis movement past `threshold` that
/// happens at or after `started_at`. Abandoning a capture that never
/// completes is up to the caller.
#[derive(Debug, Clone)]
pub struct BindingCapture {
    started_at: f64,
    threshold: f32,
    captured: Option<CapturedControl>,
}

impl BindingCapture {
    pub fn new(started_at: f64, threshold: f32) -> Self {
        Self {
            started_at,
            threshold,
            captured: None,
        }
    }

    pub fn started_at(&self) -> f64 {
        self.started_at
    }

    pub fn elapsed(&self, now: f64) -> f64 {
        now - self.started_at
    }

    pub fn is_complete(&self) -> bool {
        self.captured.is_some()
    }

    pub fn captured(&self) -> Option<&CapturedControl> {
        self.captured.as_ref()
    }

    pub fn take(&mut self) -> Option<CapturedControl> {
        self.captured.take()
    }

    /// Offer an event from `device`; true when it completed the capture
    pub fn try_capture(&mut self, event: &InputEvent, device: &Device) -> bool {
        if self.is_complete() || event.time < self.started_at || event.device != device.id() {
            return false;
        }

        let device_type = device.device_type();
        let index = match &event.payload {
            EventPayload::Key(key) if key.is_down && device_type == DeviceType::Keyboard => {
                keyboard::key_index(key.key)
            }
            EventPayload::Click(click) if click.is_down => Some(click.control_index),
            EventPayload::PointerDown(_) if device_type == DeviceType::Pointer => {
                Some(pointer::PRIMARY)
            }
            EventPayload::GenericControl(control) if control.value.abs() > self.threshold => {
                Some(control.control_index)
            }
            _ => None,
        };
        let Some(control) = index
            .and_then(|index| device.state().get(index))
            .filter(|control| control.is_enabled())
        else {
            return false;
        };

        log::info!(
            "Captured control '{}' on device {:?} ({:?})",
            control.name(),
            device.id(),
            device.device_type()
        );
        self.captured = Some(CapturedControl {
            device: device.id(),
            device_type: device.device_type(),
            tags: device.tags().to_vec(),
            index: control.index(),
            name: control.name().to_string(),
            hash: control.hash(),
            kind: control.kind(),
            time: event.time,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::input::layout::gamepad;
    use crate::engine::input::provider::ProviderId;
    use winit::keyboard::KeyCode;

    fn pad() -> Device {
        Device::new(DeviceId(4), ProviderId(4), DeviceType::Gamepad, "Pad")
    }

    #[test]
    fn test_small_axis_motion_is_ignored() {
        let pad = pad();
        let mut capture = BindingCapture::new(1.0, 0.5);
        let nudge = InputEvent::control(pad.id(), 1.1, gamepad::LEFT_STICK_X, 0.3);
        assert!(!capture.try_capture(&nudge, &pad));

        let push = InputEvent::control(pad.id(), 1.2, gamepad::LEFT_STICK_X, -0.8);
        assert!(capture.try_capture(&push, &pad));
        let captured = capture.captured().unwrap();
        assert_eq!(captured.index, gamepad::LEFT_STICK_X);
        assert_eq!(captured.name, gamepad::NAMES[gamepad::LEFT_STICK_X]);
        assert_eq!(captured.kind, ControlKind::Axis);
    }

    #[test]
    fn test_events_before_start_are_ignored() {
        let pad = pad();
        let mut capture = BindingCapture::new(2.0, 0.5);
        let early = InputEvent::control(pad.id(), 1.9, gamepad::ACTION_SOUTH, 1.0);
        assert!(!capture.try_capture(&early, &pad));
        assert!(!capture.is_complete());
    }

    #[test]
    fn test_key_press_captures_keyboard_control() {
        let device = Device::new(DeviceId(1), ProviderId(1), DeviceType::Keyboard, "Keyboard");
        let mut capture = BindingCapture::new(0.0, 0.5);

        let release = InputEvent::key(device.id(), 0.1, KeyCode::KeyE, false);
        assert!(!capture.try_capture(&release, &device));

        let press = InputEvent::key(device.id(), 0.2, KeyCode::KeyE, true);
        assert!(capture.try_capture(&press, &device));
        let reference = capture.captured().unwrap().reference(SlotKey(0));
        let expected = ControlHash::new(&keyboard::key_name(KeyCode::KeyE), ControlKind::Button);
        assert_eq!(reference.hash, expected);

        // Complete captures ignore further input
        let other = InputEvent::key(device.id(), 0.3, KeyCode::KeyF, true);
        assert!(!capture.try_capture(&other, &device));
        assert_eq!(capture.take().unwrap().time, 0.2);
        assert!(capture.captured().is_none());
    }

    #[test]
    fn test_disabled_controls_are_not_captured() {
        let mut pad = pad();
        pad.state_mut().set_enabled(gamepad::ACTION_SOUTH, false);
        let mut capture = BindingCapture::new(0.0, 0.5);
        let press = InputEvent::control(pad.id(), 0.1, gamepad::ACTION_SOUTH, 1.0);
        assert!(!capture.try_capture(&press, &pad));
    }

    #[test]
    fn test_elapsed_time() {
        let capture = BindingCapture::new(3.0, 0.5);
        assert_eq!(capture.started_at(), 3.0);
        assert_eq!(capture.elapsed(4.5), 1.5);
    }
}
