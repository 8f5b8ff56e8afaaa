// Decoded input events as delivered by the platform layer

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use winit::keyboard::KeyCode;

/// Identifies a registered device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub u32);

/// A single input event from one device
#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    pub device: DeviceId,
    /// Seconds on the input clock; non-decreasing per source
    pub time: f64,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Key(KeyEvent),
    PointerDown(PointerEvent),
    PointerMove(PointerEvent),
    PointerUp(PointerEvent),
    Click(ClickEvent),
    GenericControl(GenericControlEvent),
    Tracking(TrackingEvent),
    Text(TextEvent),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub is_down: bool,
}

/// Shared shape of pointer down/move/up events
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerEvent {
    pub pointer_id: u32,
    pub position: Vec3,
    /// Only meaningful on move events
    pub delta: Vec3,
    pub pressure: f32,
    pub tilt: Vec2,
    pub twist: f32,
    pub radius: Vec3,
    pub display_index: u32,
}

/// When a platform reports the second click of a double click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoubleClickConvention {
    /// Counted when the second press goes down
    #[default]
    OnPress,
    /// Counted when the second press comes back up
    OnRelease,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickEvent {
    pub control_index: usize,
    pub is_down: bool,
    pub click_count: u32,
}

impl ClickEvent {
    /// Whether this event completes a double click on this platform
    pub fn is_double_click(&self, convention: DoubleClickConvention) -> bool {
        let even = self.click_count > 0 && self.click_count % 2 == 0;
        match convention {
            DoubleClickConvention::OnPress => even && self.is_down,
            DoubleClickConvention::OnRelease => even && !self.is_down,
        }
    }
}

/// Fallback event for any scalar control, before or after remapping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenericControlEvent {
    pub control_index: usize,
    pub value: f32,
    pub raw_value: f32,
    /// Set on events a profile produced, so they are not remapped again
    pub already_remapped: bool,
}

bitflags::bitflags! {
    /// Which fields of a tracking event carry data
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TrackingFields: u8 {
        const POSITION = 1 << 0;
        const ORIENTATION = 1 << 1;
        const VELOCITY = 1 << 2;
        const ANGULAR_VELOCITY = 1 << 3;
        const ACCELERATION = 1 << 4;
        const ANGULAR_ACCELERATION = 1 << 5;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingEvent {
    pub node_id: u32,
    pub available: TrackingFields,
    pub local_position: Vec3,
    pub local_rotation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub acceleration: Vec3,
    pub angular_acceleration: Vec3,
}

impl TrackingEvent {
    /// A pose-only update
    pub fn pose(node_id: u32, position: Vec3, rotation: Quat) -> Self {
        Self {
            node_id,
            available: TrackingFields::POSITION | TrackingFields::ORIENTATION,
            local_position: position,
            local_rotation: rotation,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            angular_acceleration: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextEvent {
    pub character: char,
}

impl InputEvent {
    pub fn new(device: DeviceId, time: f64, payload: EventPayload) -> Self {
        Self {
            device,
            time,
            payload,
        }
    }

    pub fn key(device: DeviceId, time: f64, key: KeyCode, is_down: bool) -> Self {
        Self::new(device, time, EventPayload::Key(KeyEvent { key, is_down }))
    }

    /// A raw scalar control event, value and raw value identical
    pub fn control(device: DeviceId, time: f64, control_index: usize, value: f32) -> Self {
        Self::new(
            device,
            time,
            EventPayload::GenericControl(GenericControlEvent {
                control_index,
                value,
                raw_value: value,
                already_remapped: false,
            }),
        )
    }

    /// A control event produced by a profile
    pub fn remapped(
        device: DeviceId,
        time: f64,
        control_index: usize,
        value: f32,
        raw_value: f32,
    ) -> Self {
        Self::new(
            device,
            time,
            EventPayload::GenericControl(GenericControlEvent {
                control_index,
                value,
                raw_value,
                already_remapped: true,
            }),
        )
    }

    pub fn click(
        device: DeviceId,
        time: f64,
        control_index: usize,
        is_down: bool,
        click_count: u32,
    ) -> Self {
        Self::new(
            device,
            time,
            EventPayload::Click(ClickEvent {
                control_index,
                is_down,
                click_count,
            }),
        )
    }

    pub fn tracking(device: DeviceId, time: f64, tracking: TrackingEvent) -> Self {
        Self::new(device, time, EventPayload::Tracking(tracking))
    }

    pub fn text(device: DeviceId, time: f64, character: char) -> Self {
        Self::new(device, time, EventPayload::Text(TextEvent { character }))
    }

    /// Short label for log lines
    pub fn kind_name(&self) -> &'static str {
        match self.payload {
            EventPayload::Key(_) => "key",
            EventPayload::PointerDown(_) => "pointer-down",
            EventPayload::PointerMove(_) => "pointer-move",
            EventPayload::PointerUp(_) => "pointer-up",
            EventPayload::Click(_) => "click",
            EventPayload::GenericControl(_) => "control",
            EventPayload::Tracking(_) => "tracking",
            EventPayload::Text(_) => "text",
        }
    }
}
