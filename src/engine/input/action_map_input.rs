// Action map inputs: one action map's live state for one player

use super::action::{ActionMap, ActionSource};
use super::binding::{Binding, BindingContext, CombinedBinding, SlotKey};
use super::cell::Timeline;
use super::control::AnyControl;
use super::device::{Device, StateWriter};
use super::event::{DeviceId, InputEvent};
use super::matcher::{find_best_match, DeviceCandidate, SchemeMatch};
use super::provider::{ControlProvider, ProviderId};
use super::scheme::ControlScheme;
use super::state::StateTable;
use super::value::Value;
use super::InputError;
use glam::{Vec2, Vec3};

/// The scheme in use and the device mirrored into each of its slots
#[derive(Debug)]
struct ActiveScheme {
    index: usize,
    keys: Vec<SlotKey>,
    devices: Vec<DeviceId>,
    writers: Vec<StateWriter>,
    /// Slot tables, parallel to `keys`
    tables: Vec<StateTable>,
    /// (action index, binding root) for every bound action
    roots: Vec<(usize, CombinedBinding)>,
}

/// A control provider exposing one control per action
///
/// Events from assigned devices are mirrored into per-slot tables; at the
/// end of each update every bound action's binding root reads those tables
/// and writes the action control.
#[derive(Debug)]
pub struct ActionMapInput {
    provider: ProviderId,
    map: ActionMap,
    state: StateTable,
    /// (action index, component action indices) for composite actions
    composites: Vec<(usize, Vec<usize>)>,
    scheme: Option<ActiveScheme>,
    active: bool,
    auto_reinitialize: bool,
    /// Newest event time seen from an assigned device
    last_assigned_event_time: f64,
}

impl ActionMapInput {
    /// Create an input for `map` with no scheme assigned yet
    pub fn new(provider: ProviderId, map: ActionMap) -> Result<Self, InputError> {
        map.validate()?;
        let composites = map
            .actions()
            .iter()
            .enumerate()
            .filter(|(_, action)| action.is_composite())
            .map(|(index, action)| {
                let components = action
                    .components()
                    .into_iter()
                    .filter_map(|name| map.action_index(name))
                    .collect();
                (index, components)
            })
            .collect();

        Ok(Self {
            provider,
            state: StateTable::new(provider, &map.controls()),
            map,
            composites,
            scheme: None,
            active: true,
            auto_reinitialize: true,
            last_assigned_event_time: f64::NEG_INFINITY,
        })
    }

    /// Whether input from an unassigned device may switch schemes
    pub fn with_auto_reinitialize(mut self, enabled: bool) -> Self {
        self.auto_reinitialize = enabled;
        self
    }

    pub fn name(&self) -> &str {
        self.map.name()
    }

    pub fn map(&self) -> &ActionMap {
        &self.map
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Turn processing on or off
    ///
    /// Deactivating puts every action and slot table back to defaults, so
    /// nothing reads as "just pressed" after reactivation.
    pub fn set_active(&mut self, active: bool) {
        if self.active == active {
            return;
        }
        self.active = active;
        if !active {
            self.reset();
        }
        log::info!(
            "Action map '{}' {}",
            self.map.name(),
            if active { "activated" } else { "deactivated" }
        );
    }

    pub fn auto_reinitialize(&self) -> bool {
        self.auto_reinitialize
    }

    pub fn active_scheme_index(&self) -> Option<usize> {
        self.scheme.as_ref().map(|scheme| scheme.index)
    }

    pub fn active_scheme(&self) -> Option<&ControlScheme> {
        self.active_scheme_index()
            .and_then(|index| self.map.schemes().get(index))
    }

    /// Devices of the active assignment, in slot order
    pub fn assigned_devices(&self) -> &[DeviceId] {
        self.scheme
            .as_ref()
            .map(|scheme| scheme.devices.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_device(&self, device: DeviceId) -> bool {
        self.assigned_devices().contains(&device)
    }

    /// Mirror table of the slot with `key`
    pub fn slot_table(&self, key: SlotKey) -> Option<&StateTable> {
        let scheme = self.scheme.as_ref()?;
        let position = scheme.keys.iter().position(|k| *k == key)?;
        scheme.tables.get(position)
    }

    /// Run the matcher over `devices` and switch to the best scheme
    ///
    /// On failure the current assignment, if any, is kept.
    pub fn initialize(&mut self, devices: &[&Device], required: &[DeviceId]) -> bool {
        let candidates: Vec<DeviceCandidate> = devices
            .iter()
            .map(|device| DeviceCandidate::from_device(device))
            .collect();

        match find_best_match(&candidates, self.map.schemes(), required) {
            Some(found) => {
                self.activate(found, devices);
                true
            }
            None => {
                log::debug!(
                    "No scheme of '{}' fits the available devices (required: {:?})",
                    self.map.name(),
                    required
                );
                false
            }
        }
    }

    fn activate(&mut self, found: SchemeMatch, devices: &[&Device]) {
        let scheme = &self.map.schemes()[found.scheme_index];
        let mut writers = Vec::with_capacity(found.devices.len());
        let mut tables = Vec::with_capacity(found.devices.len());
        let mut recency = f64::NEG_INFINITY;

        for id in &found.devices {
            if let Some(device) = devices.iter().find(|device| device.id() == *id) {
                writers.push(device.writer());
                tables.push(device.state().clone_layout(self.provider));
                recency = recency.max(device.last_event_time());
            }
        }

        log::info!(
            "Action map '{}' uses scheme '{}' with devices {:?}",
            self.map.name(),
            scheme.name,
            found.devices
        );

        self.scheme = Some(ActiveScheme {
            index: found.scheme_index,
            keys: scheme.slot_keys(),
            devices: found.devices,
            writers,
            tables,
            roots: Vec::new(),
        });
        self.last_assigned_event_time = recency;
        self.state.reset();
        self.rebuild_roots();
    }

    /// Drop the active assignment; every action reads its default
    pub fn clear_scheme(&mut self) {
        if let Some(scheme) = self.scheme.take() {
            log::info!(
                "Action map '{}' released devices {:?}",
                self.map.name(),
                scheme.devices
            );
        }
        self.state.reset();
        self.last_assigned_event_time = f64::NEG_INFINITY;
    }

    /// Clone the active scheme's binding roots and resolve them
    fn rebuild_roots(&mut self) {
        let Some(active) = self.scheme.as_mut() else {
            return;
        };
        let scheme = &self.map.schemes()[active.index];
        active.roots = scheme
            .bindings()
            .filter_map(|(action, root)| {
                let index = self.map.action_index(action)?;
                let mut root = root.clone();
                root.initialize(&active.keys, &active.tables);
                Some((index, root))
            })
            .collect();
    }

    /// Put every table and binding back to its initial state
    pub fn reset(&mut self) {
        self.state.reset();
        if let Some(scheme) = self.scheme.as_mut() {
            for table in &mut scheme.tables {
                table.reset();
            }
        }
        self.rebuild_roots();
    }

    /// Whether an event from an unassigned device should re-run matching
    pub fn wants_reinitialize(&self, event: &InputEvent, min_delay: f64) -> bool {
        if !self.active || !self.auto_reinitialize || self.has_device(event.device) {
            return false;
        }
        self.scheme.is_none() || event.time - self.last_assigned_event_time > min_delay
    }

    /// Mirror an event from an assigned device; false for other devices
    pub fn process_event(&mut self, event: &InputEvent) -> bool {
        if !self.active {
            return false;
        }
        let Some(scheme) = self.scheme.as_mut() else {
            return false;
        };
        let mut consumed = false;
        for ((device, writer), table) in scheme
            .devices
            .iter()
            .zip(&scheme.writers)
            .zip(&mut scheme.tables)
        {
            if *device == event.device {
                writer.write(table, event);
                consumed = true;
            }
        }
        if consumed {
            self.last_assigned_event_time = self.last_assigned_event_time.max(event.time);
        }
        consumed
    }

    pub fn begin_update(&mut self, timeline: Timeline) {
        self.state.begin_update(timeline);
        if let Some(scheme) = self.scheme.as_mut() {
            for table in &mut scheme.tables {
                table.begin_update(timeline);
            }
        }
    }

    /// Evaluate bound actions, then composites
    pub fn end_update(&mut self, timeline: Timeline, delta_time: f32) {
        if !self.active {
            return;
        }
        if let Some(scheme) = self.scheme.as_mut() {
            let ctx = BindingContext {
                tables: &scheme.tables,
                timeline,
                delta_time,
            };
            for (index, root) in &mut scheme.roots {
                let value = root.end_update(&ctx);
                self.state.control_mut(*index).set_value(timeline, value);
            }
        }

        for (index, components) in &self.composites {
            let read = |position: usize| -> f32 {
                components
                    .get(position)
                    .and_then(|component| self.state.get(*component))
                    .and_then(|control| control.value(timeline).try_scalar())
                    .unwrap_or(0.0)
            };
            let value = match self.map.actions()[*index].source {
                ActionSource::Vector3 { .. } => {
                    Value::Vector3(Vec3::new(read(0), read(1), read(2)))
                }
                _ => Value::Vector2(Vec2::new(read(0), read(1))),
            };
            self.state.control_mut(*index).set_value(timeline, value);
        }
    }

    /// Replace one source of `action` in the scheme named `scheme`
    ///
    /// The active scheme's roots are rebuilt so the change applies from
    /// the next update.
    pub fn rebind(
        &mut self,
        scheme: &str,
        action: &str,
        source: usize,
        binding: Binding,
    ) -> Result<(), InputError> {
        if self.map.action(action).is_none() {
            return Err(InputError::UnknownAction(action.to_string()));
        }
        let index = self
            .map
            .scheme_index(scheme)
            .ok_or_else(|| InputError::UnknownScheme(scheme.to_string()))?;
        if let Some(target) = self.map.scheme_mut(index) {
            target.rebind(action, source, binding)?;
        }
        if self.active_scheme_index() == Some(index) {
            self.rebuild_roots();
        }
        Ok(())
    }

    /// Load every binding of the scheme named `scheme` from JSON
    pub fn load_bindings(&mut self, scheme: &str, json: &str) -> Result<(), InputError> {
        let index = self
            .map
            .scheme_index(scheme)
            .ok_or_else(|| InputError::UnknownScheme(scheme.to_string()))?;
        let previous = self.map.schemes()[index].clone();
        if let Some(target) = self.map.scheme_mut(index) {
            target.bindings_from_json(json)?;
        }
        if let Err(err) = self.map.validate() {
            if let Some(target) = self.map.scheme_mut(index) {
                *target = previous;
            }
            return Err(err);
        }
        if self.active_scheme_index() == Some(index) {
            self.rebuild_roots();
        }
        Ok(())
    }

    fn action_control(&self, action: &str) -> Result<&AnyControl, InputError> {
        self.map
            .action_index(action)
            .and_then(|index| self.state.get(index))
            .ok_or_else(|| InputError::UnknownAction(action.to_string()))
    }

    pub fn action_value(&self, action: &str, timeline: Timeline) -> Result<Value, InputError> {
        Ok(self.action_control(action)?.value(timeline))
    }

    /// Value of `action` as of the last advance of `timeline`
    pub fn previous_action_value(
        &self,
        action: &str,
        timeline: Timeline,
    ) -> Result<Value, InputError> {
        Ok(self.action_control(action)?.previous_value(timeline))
    }

    /// Button-style query on a scalar action
    ///
    /// # Panics
    /// Panics when `action` is a vector or rotation action.
    pub fn was_just_pressed(&self, action: &str, timeline: Timeline) -> Result<bool, InputError> {
        Ok(self.action_control(action)?.scalar().was_just_pressed(timeline))
    }

    pub fn was_just_released(&self, action: &str, timeline: Timeline) -> Result<bool, InputError> {
        Ok(self.action_control(action)?.scalar().was_just_released(timeline))
    }

    pub fn is_held(&self, action: &str, timeline: Timeline) -> Result<bool, InputError> {
        Ok(self.action_control(action)?.scalar().is_held(timeline))
    }

    pub fn is_pressed(&self, action: &str, timeline: Timeline) -> Result<bool, InputError> {
        Ok(self.action_control(action)?.scalar().is_pressed(timeline))
    }
}

impl ControlProvider for ActionMapInput {
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
    use crate::engine::input::action::default_gameplay_map;
    use crate::engine::input::layout::{gamepad, DeviceType};
    use winit::keyboard::KeyCode;

    const KEYBOARD: DeviceId = DeviceId(1);
    const MOUSE: DeviceId = DeviceId(2);
    const PAD: DeviceId = DeviceId(3);

    struct Rig {
        devices: Vec<Device>,
        input: ActionMapInput,
    }

    impl Rig {
        fn new() -> Self {
            let devices = vec![
                Device::new(KEYBOARD, ProviderId(1), DeviceType::Keyboard, "Keyboard"),
                Device::new(MOUSE, ProviderId(2), DeviceType::Pointer, "Mouse"),
                Device::new(PAD, ProviderId(3), DeviceType::Gamepad, "Pad"),
            ];
            let map = default_gameplay_map().unwrap();
            let input = ActionMapInput::new(ProviderId(10), map).unwrap();
            Self { devices, input }
        }

        fn initialize(&mut self, required: &[DeviceId]) -> bool {
            let devices: Vec<&Device> = self.devices.iter().collect();
            self.input.initialize(&devices, required)
        }

        /// One fixed update delivering `events`
        fn frame(&mut self, events: &[InputEvent]) {
            for device in &mut self.devices {
                device.begin_update(Timeline::Fixed);
            }
            self.input.begin_update(Timeline::Fixed);
            for event in events {
                for device in &mut self.devices {
                    device.process_event(event);
                }
                self.input.process_event(event);
            }
            self.input.end_update(Timeline::Fixed, 1.0 / 60.0);
        }

        fn value(&self, action: &str) -> Value {
            self.input.action_value(action, Timeline::Fixed).unwrap()
        }
    }

    fn key(time: f64, code: KeyCode, is_down: bool) -> InputEvent {
        InputEvent::key(KEYBOARD, time, code, is_down)
    }

    #[test]
    fn test_without_scheme_actions_read_default() {
        let mut rig = Rig::new();
        rig.frame(&[key(0.0, KeyCode::Space, true)]);
        assert_eq!(rig.value("Jump"), Value::Scalar(0.0));
        assert_eq!(rig.value("Move"), Value::Vector2(Vec2::ZERO));
        assert!(matches!(
            rig.input.action_value("Dance", Timeline::Fixed),
            Err(InputError::UnknownAction(_))
        ));
    }

    #[test]
    fn test_recent_keyboard_selects_keyboard_scheme() {
        let mut rig = Rig::new();
        rig.frame(&[key(1.0, KeyCode::KeyD, false)]);
        assert!(rig.initialize(&[]));
        assert_eq!(rig.input.active_scheme().unwrap().name, "KeyboardMouse");
        assert_eq!(rig.input.assigned_devices(), &[KEYBOARD, MOUSE]);
    }

    #[test]
    fn test_keys_drive_axes_and_composite() {
        let mut rig = Rig::new();
        assert!(rig.initialize(&[KEYBOARD]));

        rig.frame(&[key(0.1, KeyCode::KeyD, true), key(0.1, KeyCode::KeyW, true)]);
        assert_eq!(rig.value("MoveX"), Value::Scalar(1.0));
        assert_eq!(rig.value("MoveY"), Value::Scalar(1.0));
        assert_eq!(rig.value("Move"), Value::Vector2(Vec2::new(1.0, 1.0)));

        rig.frame(&[key(0.2, KeyCode::KeyA, true), key(0.2, KeyCode::KeyW, false)]);
        assert_eq!(rig.value("MoveX"), Value::Scalar(0.0));
        assert_eq!(rig.value("Move"), Value::Vector2(Vec2::ZERO));
    }

    #[test]
    fn test_jump_edges() {
        let mut rig = Rig::new();
        assert!(rig.initialize(&[KEYBOARD]));

        rig.frame(&[key(0.1, KeyCode::Space, true)]);
        assert!(rig.input.was_just_pressed("Jump", Timeline::Fixed).unwrap());

        rig.frame(&[]);
        assert!(!rig.input.was_just_pressed("Jump", Timeline::Fixed).unwrap());
        assert!(rig.input.is_held("Jump", Timeline::Fixed).unwrap());

        rig.frame(&[key(0.3, KeyCode::Space, false)]);
        assert!(rig.input.was_just_released("Jump", Timeline::Fixed).unwrap());
    }

    #[test]
    fn test_unassigned_device_is_not_consumed() {
        let mut rig = Rig::new();
        assert!(rig.initialize(&[KEYBOARD]));
        let event = InputEvent::control(PAD, 0.1, gamepad::ACTION_SOUTH, 1.0);
        assert!(!rig.input.process_event(&event));
        assert!(rig.input.process_event(&key(0.1, KeyCode::KeyQ, true)));
    }

    #[test]
    fn test_deactivation_resets_state() {
        let mut rig = Rig::new();
        assert!(rig.initialize(&[KEYBOARD]));
        rig.frame(&[key(0.1, KeyCode::Space, true)]);
        rig.frame(&[]);
        assert!(rig.input.is_held("Jump", Timeline::Fixed).unwrap());

        rig.input.set_active(false);
        assert_eq!(rig.value("Jump"), Value::Scalar(0.0));
        rig.frame(&[]);
        assert_eq!(rig.value("Jump"), Value::Scalar(0.0));

        // Reactivated while the key is still physically down: no stale edge
        rig.input.set_active(true);
        rig.frame(&[]);
        assert!(!rig.input.was_just_pressed("Jump", Timeline::Fixed).unwrap());
        assert!(!rig.input.was_just_released("Jump", Timeline::Fixed).unwrap());
    }

    #[test]
    fn test_reinitialize_is_debounced() {
        let mut rig = Rig::new();
        assert!(rig.initialize(&[KEYBOARD]));
        rig.frame(&[key(1.0, KeyCode::Space, true)]);

        let early = InputEvent::control(PAD, 1.2, gamepad::ACTION_SOUTH, 1.0);
        assert!(!rig.input.wants_reinitialize(&early, 0.5));

        let late = InputEvent::control(PAD, 2.0, gamepad::ACTION_SOUTH, 1.0);
        assert!(rig.input.wants_reinitialize(&late, 0.5));
        rig.frame(&[late.clone()]);
        assert!(rig.initialize(&[PAD]));
        assert_eq!(rig.input.active_scheme().unwrap().name, "Gamepad");

        // The keyboard is now the outsider
        assert!(!rig.input.wants_reinitialize(&late, 0.5));
        assert!(rig.input.wants_reinitialize(&key(2.6, KeyCode::Space, false), 0.5));
    }

    #[test]
    fn test_auto_reinitialize_can_be_disabled() {
        let map = default_gameplay_map().unwrap();
        let input = ActionMapInput::new(ProviderId(10), map)
            .unwrap()
            .with_auto_reinitialize(false);
        let event = InputEvent::control(PAD, 5.0, gamepad::ACTION_SOUTH, 1.0);
        assert!(!input.wants_reinitialize(&event, 0.0));
    }

    #[test]
    fn test_rebind_active_scheme_takes_effect() {
        let mut rig = Rig::new();
        assert!(rig.initialize(&[KEYBOARD]));
        let e_key = Binding::control(
            SlotKey(0),
            &crate::engine::input::layout::keyboard::key_name(KeyCode::KeyE),
            crate::engine::input::value::ControlKind::Button,
        );
        rig.input.rebind("KeyboardMouse", "Jump", 0, e_key).unwrap();

        rig.frame(&[key(0.1, KeyCode::Space, true)]);
        assert_eq!(rig.value("Jump"), Value::Scalar(0.0));
        rig.frame(&[key(0.2, KeyCode::KeyE, true)]);
        assert_eq!(rig.value("Jump"), Value::Scalar(1.0));

        let result = rig.input.rebind("Touch", "Jump", 0, Binding::control(
            SlotKey(0),
            "KeyE",
            crate::engine::input::value::ControlKind::Button,
        ));
        assert!(matches!(result, Err(InputError::UnknownScheme(_))));
    }

    #[test]
    fn test_load_bindings_rejects_inconsistent_blob() {
        let mut rig = Rig::new();
        assert!(rig.initialize(&[KEYBOARD]));
        let before = rig.input.active_scheme().unwrap().clone();

        // A button axis whose negative half claims to be a stick
        let nested = r#"{
            "MoveX": {
                "kind": "Axis",
                "sources": [{
                    "type": "ButtonAxis",
                    "negative": {"type": "Control", "slot": 0, "hash": 7, "kind": "Vector2"},
                    "positive": {"type": "Control", "slot": 0, "hash": 8, "kind": "Button"}
                }]
            }
        }"#;
        let result = rig.input.load_bindings("KeyboardMouse", nested);
        assert!(matches!(result, Err(InputError::BindingKind { .. })));

        // A well-formed root that does not fit the declared action
        let misplaced = r#"{
            "Jump": {
                "kind": "Vector2",
                "sources": [{"type": "Control", "slot": 0, "hash": 7, "kind": "Vector2"}]
            }
        }"#;
        let result = rig.input.load_bindings("KeyboardMouse", misplaced);
        assert!(matches!(result, Err(InputError::BindingKind { .. })));
        assert_eq!(rig.input.active_scheme(), Some(&before));

        // Updates keep running on the old bindings
        rig.frame(&[key(0.1, KeyCode::KeyD, true)]);
        assert_eq!(rig.value("MoveX"), Value::Scalar(1.0));
    }

    #[test]
    fn test_clear_scheme_releases_devices() {
        let mut rig = Rig::new();
        assert!(rig.initialize(&[KEYBOARD]));
        rig.frame(&[key(0.1, KeyCode::Space, true)]);
        rig.input.clear_scheme();
        assert!(rig.input.assigned_devices().is_empty());
        assert_eq!(rig.value("Jump"), Value::Scalar(0.0));
    }
}
