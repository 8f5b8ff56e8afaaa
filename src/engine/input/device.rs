// Physical devices and how events land in their state tables

use super::cell::Timeline;
use super::control::ControlDescriptor;
use super::event::{
    DeviceId, DoubleClickConvention, EventPayload, InputEvent, PointerEvent, TrackingFields,
};
use super::layout::{keyboard, pointer, tracked, DeviceType};
use super::profile::DeviceProfile;
use super::provider::{ControlProvider, ProviderId};
use super::state::StateTable;
use super::value::Value;
use std::sync::Arc;

/// Translates events for one device into control writes
///
/// Shared by a device's own table and by the per-slot copies players keep,
/// so both see identical values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateWriter {
    pub device_type: DeviceType,
    /// Tracking node this device reports; other nodes are ignored
    pub tracking_node: Option<u32>,
    pub double_click: DoubleClickConvention,
}

impl StateWriter {
    /// Apply `event` to `table`; false when nothing was written
    pub fn write(&self, table: &mut StateTable, event: &InputEvent) -> bool {
        match &event.payload {
            EventPayload::Key(key) => {
                if self.device_type != DeviceType::Keyboard {
                    return false;
                }
                match keyboard::key_index(key.key) {
                    Some(index) => {
                        let value = Value::Scalar(if key.is_down { 1.0 } else { 0.0 });
                        table.apply(index, value, value)
                    }
                    None => false,
                }
            }
            EventPayload::PointerDown(data) => self.write_pointer(table, data, Some(1.0)),
            EventPayload::PointerMove(data) => {
                let moved = self.write_pointer(table, data, None);
                table.accumulate(pointer::DELTA, Value::Vector3(data.delta)) || moved
            }
            EventPayload::PointerUp(data) => self.write_pointer(table, data, Some(0.0)),
            EventPayload::Click(click) => {
                let value = Value::Scalar(if click.is_down { 1.0 } else { 0.0 });
                let mut written = table.apply(click.control_index, value, value);
                let is_pointer = self.device_type == DeviceType::Pointer;
                if is_pointer && click.is_double_click(self.double_click) {
                    let pulse = Value::Scalar(1.0);
                    written |= table.apply(pointer::DOUBLE_CLICK, pulse, pulse);
                }
                written
            }
            EventPayload::GenericControl(control) => table.apply(
                control.control_index,
                Value::Scalar(control.raw_value),
                Value::Scalar(control.value),
            ),
            EventPayload::Tracking(tracking) => {
                if self.device_type != DeviceType::TrackedController
                    || self.tracking_node.is_some_and(|node| node != tracking.node_id)
                {
                    return false;
                }
                let fields = [
                    (
                        TrackingFields::POSITION,
                        tracked::POSITION,
                        Value::Vector3(tracking.local_position),
                    ),
                    (
                        TrackingFields::ORIENTATION,
                        tracked::ROTATION,
                        Value::Quaternion(tracking.local_rotation),
                    ),
                    (
                        TrackingFields::VELOCITY,
                        tracked::VELOCITY,
                        Value::Vector3(tracking.velocity),
                    ),
                    (
                        TrackingFields::ANGULAR_VELOCITY,
                        tracked::ANGULAR_VELOCITY,
                        Value::Vector3(tracking.angular_velocity),
                    ),
                    (
                        TrackingFields::ACCELERATION,
                        tracked::ACCELERATION,
                        Value::Vector3(tracking.acceleration),
                    ),
                    (
                        TrackingFields::ANGULAR_ACCELERATION,
                        tracked::ANGULAR_ACCELERATION,
                        Value::Vector3(tracking.angular_acceleration),
                    ),
                ];
                let mut written = false;
                for (field, index, value) in fields {
                    if tracking.available.contains(field) {
                        written |= table.apply(index, value, value);
                    }
                }
                written
            }
            EventPayload::Text(_) => false,
        }
    }

    fn write_pointer(
        &self,
        table: &mut StateTable,
        data: &PointerEvent,
        contact: Option<f32>,
    ) -> bool {
        if self.device_type != DeviceType::Pointer {
            return false;
        }
        let mut fields = vec![
            (pointer::POSITION, Value::Vector3(data.position)),
            (pointer::PRESSURE, Value::Scalar(data.pressure)),
            (pointer::TILT, Value::Vector2(data.tilt)),
            (pointer::TWIST, Value::Scalar(data.twist)),
            (pointer::RADIUS, Value::Vector3(data.radius)),
        ];
        if let Some(contact) = contact {
            fields.push((pointer::PRIMARY, Value::Scalar(contact)));
        }
        fields
            .into_iter()
            .fold(false, |written, (index, value)| table.apply(index, value, value) || written)
    }
}

/// A registered physical device
#[derive(Debug)]
pub struct Device {
    id: DeviceId,
    provider: ProviderId,
    device_type: DeviceType,
    descriptor: String,
    tags: Vec<String>,
    tracking_node: Option<u32>,
    double_click: DoubleClickConvention,
    profile: Option<Arc<DeviceProfile>>,
    state: StateTable,
    /// Time of the newest event seen, `f64::NEG_INFINITY` until the first
    last_event_time: f64,
    text: String,
    last_click_count: u32,
    display_index: u32,
}

impl Device {
    /// Create a device with its type's standard layout
    pub fn new(
        id: DeviceId,
        provider: ProviderId,
        device_type: DeviceType,
        descriptor: impl Into<String>,
    ) -> Self {
        let controls = device_type.standard_controls();
        Self::with_layout(id, provider, device_type, descriptor, &controls)
    }

    /// Create a device with an explicit control layout
    pub fn with_layout(
        id: DeviceId,
        provider: ProviderId,
        device_type: DeviceType,
        descriptor: impl Into<String>,
        controls: &[ControlDescriptor],
    ) -> Self {
        Self {
            id,
            provider,
            device_type,
            descriptor: descriptor.into(),
            tags: Vec::new(),
            tracking_node: None,
            double_click: DoubleClickConvention::default(),
            profile: None,
            state: StateTable::new(provider, controls),
            last_event_time: f64::NEG_INFINITY,
            text: String::new(),
            last_click_count: 0,
            display_index: 0,
        }
    }

    /// Add capability tags such as "Left" or "Right"
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_tracking_node(mut self, node: u32) -> Self {
        self.tracking_node = Some(node);
        self
    }

    pub fn set_double_click_convention(&mut self, convention: DoubleClickConvention) {
        self.double_click = convention;
    }

    /// Attach a profile; its supported controls become the enabled subset
    pub fn set_profile(&mut self, profile: Option<Arc<DeviceProfile>>) {
        match profile.as_ref().and_then(|p| p.supported_controls()) {
            Some(supported) => self.state.enable_only(supported),
            None => self.state.enable_all(),
        }
        if let Some(profile) = &profile {
            log::info!(
                "Device {:?} ('{}') uses profile '{}'",
                self.id,
                self.descriptor,
                profile.name()
            );
        }
        self.profile = profile;
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn profile(&self) -> Option<&DeviceProfile> {
        self.profile.as_deref()
    }

    pub fn last_event_time(&self) -> f64 {
        self.last_event_time
    }

    /// Characters typed since the last variable update began
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn last_click_count(&self) -> u32 {
        self.last_click_count
    }

    pub fn display_index(&self) -> u32 {
        self.display_index
    }

    /// Writer matching this device's layout
    pub fn writer(&self) -> StateWriter {
        StateWriter {
            device_type: self.device_type,
            tracking_node: self.tracking_node,
            double_click: self.double_click,
        }
    }

    /// Give the profile first refusal on an event from this device
    pub fn remap(&self, event: &mut InputEvent, synthesized: &mut Vec<InputEvent>) -> bool {
        if event.device != self.id {
            return false;
        }
        match &self.profile {
            Some(profile) => profile.remap(event, synthesized),
            None => false,
        }
    }

    /// Apply an event to the device's own state
    ///
    /// Returns whether any control changed; never consumes the event.
    pub fn process_event(&mut self, event: &InputEvent) -> bool {
        if event.device != self.id {
            return false;
        }
        self.last_event_time = self.last_event_time.max(event.time);
        match &event.payload {
            EventPayload::Text(text) => {
                self.text.push(text.character);
                true
            }
            EventPayload::Click(click) => {
                self.last_click_count = click.click_count;
                self.writer().write(&mut self.state, event)
            }
            EventPayload::PointerDown(data)
            | EventPayload::PointerMove(data)
            | EventPayload::PointerUp(data) => {
                self.display_index = data.display_index;
                self.writer().write(&mut self.state, event)
            }
            _ => self.writer().write(&mut self.state, event),
        }
    }

    /// Advance every control for the starting transition
    pub fn begin_update(&mut self, timeline: Timeline) {
        self.state.begin_update(timeline);
        if timeline == Timeline::Variable {
            self.text.clear();
        }
    }
}

impl ControlProvider for Device {
    fn provider_id(&self) -> ProviderId {
        self.provider
    }

    fn state(&self) -> &StateTable {
        &self.state
    }

    fn state_mut(&mut self) -> &mut StateTable {
        &mut self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::input::layout::gamepad;
    use crate::engine::input::profile::generic_hid_gamepad;
    use glam::{Quat, Vec3};
    use winit::keyboard::KeyCode;

    fn keyboard_device() -> Device {
        Device::new(DeviceId(1), ProviderId(1), DeviceType::Keyboard, "USB Keyboard")
    }

    #[test]
    fn test_key_event_presses_key_control() {
        let mut device = keyboard_device();
        let event = InputEvent::key(DeviceId(1), 0.25, KeyCode::Space, true);
        assert!(device.process_event(&event));

        let index = keyboard::key_index(KeyCode::Space).unwrap();
        assert_eq!(device.state().control(index).value(Timeline::Fixed), Value::Scalar(1.0));
        assert_eq!(device.last_event_time(), 0.25);
    }

    #[test]
    fn test_event_for_other_device_is_ignored() {
        let mut device = keyboard_device();
        let event = InputEvent::key(DeviceId(2), 0.25, KeyCode::Space, true);
        assert!(!device.process_event(&event));
        assert_eq!(device.last_event_time(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_unknown_key_is_dropped() {
        let mut device = keyboard_device();
        let event = InputEvent::key(DeviceId(1), 0.0, KeyCode::NumLock, true);
        assert!(!device.process_event(&event));
    }

    #[test]
    fn test_text_collected_until_variable_update() {
        let mut device = keyboard_device();
        device.process_event(&InputEvent::text(DeviceId(1), 0.0, 'h'));
        device.process_event(&InputEvent::text(DeviceId(1), 0.0, 'i'));
        device.begin_update(Timeline::Fixed);
        assert_eq!(device.text(), "hi");
        device.begin_update(Timeline::Variable);
        assert_eq!(device.text(), "");
    }

    #[test]
    fn test_pointer_move_accumulates_delta() {
        let mut device = Device::new(DeviceId(3), ProviderId(3), DeviceType::Pointer, "Mouse");
        let moved = PointerEvent {
            position: Vec3::new(10.0, 5.0, 0.0),
            delta: Vec3::new(2.0, 1.0, 0.0),
            display_index: 1,
            ..Default::default()
        };
        device.process_event(&InputEvent::new(DeviceId(3), 0.0, EventPayload::PointerMove(moved)));
        device.process_event(&InputEvent::new(DeviceId(3), 0.0, EventPayload::PointerMove(moved)));

        let delta =
            |device: &Device| device.state().control(pointer::DELTA).value(Timeline::Variable);
        let position = device.state().control(pointer::POSITION).value(Timeline::Variable);
        assert_eq!(delta(&device), Value::Vector3(Vec3::new(4.0, 2.0, 0.0)));
        assert_eq!(position, Value::Vector3(moved.position));
        assert_eq!(device.display_index(), 1);

        device.begin_update(Timeline::Variable);
        assert_eq!(delta(&device), Value::Vector3(Vec3::ZERO));
    }

    #[test]
    fn test_double_click_pulses_for_one_update() {
        let mut device = Device::new(DeviceId(3), ProviderId(3), DeviceType::Pointer, "Mouse");
        device.set_double_click_convention(DoubleClickConvention::OnRelease);
        let double_click = |device: &Device| {
            device.state().control(pointer::DOUBLE_CLICK).value(Timeline::Fixed)
        };

        device.process_event(&InputEvent::click(DeviceId(3), 0.0, pointer::PRIMARY, true, 2));
        assert_eq!(double_click(&device), Value::Scalar(0.0));
        device.process_event(&InputEvent::click(DeviceId(3), 0.1, pointer::PRIMARY, false, 2));
        assert_eq!(double_click(&device), Value::Scalar(1.0));
        assert_eq!(device.last_click_count(), 2);

        device.begin_update(Timeline::Fixed);
        assert_eq!(double_click(&device), Value::Scalar(0.0));
    }

    #[test]
    fn test_tracking_event_for_wrong_node_is_dropped() {
        let mut device =
            Device::new(DeviceId(4), ProviderId(4), DeviceType::TrackedController, "Left Hand")
                .with_tags(["Left"])
                .with_tracking_node(1);
        let rotation = Quat::from_rotation_y(0.3);
        let wrong = crate::engine::input::event::TrackingEvent::pose(2, Vec3::ONE, rotation);
        let right = crate::engine::input::event::TrackingEvent::pose(1, Vec3::ONE, rotation);

        assert!(!device.process_event(&InputEvent::tracking(DeviceId(4), 0.0, wrong)));
        assert!(device.process_event(&InputEvent::tracking(DeviceId(4), 0.0, right)));
        let value = device.state().control(tracked::ROTATION).value(Timeline::Fixed);
        assert_eq!(value, Value::Quaternion(rotation));
        assert!(device.has_tag("left"));
    }

    #[test]
    fn test_profile_supported_controls_disable_the_rest() {
        let mut device = Device::new(DeviceId(5), ProviderId(5), DeviceType::Gamepad, "Pad");
        let all = device.state().sorted_hashes().len();
        let profile = generic_hid_gamepad()
            .with_supported_controls(vec![gamepad::LEFT_STICK_X, gamepad::ACTION_SOUTH]);
        device.set_profile(Some(Arc::new(profile)));

        assert_eq!(device.state().sorted_hashes().len(), 2);
        assert!(!device.state().control(gamepad::START).is_enabled());
        // Positions never move
        assert_eq!(device.state().control(gamepad::START).index(), gamepad::START);

        device.set_profile(None);
        assert_eq!(device.state().sorted_hashes().len(), all);
    }

    #[test]
    fn test_remap_only_for_own_events() {
        let mut device = Device::new(DeviceId(5), ProviderId(5), DeviceType::Gamepad, "Pad");
        device.set_profile(Some(Arc::new(generic_hid_gamepad())));
        let mut other = InputEvent::control(DeviceId(6), 0.0, 6, 1.0);
        let mut own = InputEvent::control(DeviceId(5), 0.0, 6, 1.0);
        assert!(!device.remap(&mut other, &mut Vec::new()));
        assert!(device.remap(&mut own, &mut Vec::new()));
    }
}
