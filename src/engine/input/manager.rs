// Input system - owns devices, players and the event queue

use super::action::ActionMap;
use super::action_map_input::ActionMapInput;
use super::binding::{Binding, ControlReference};
use super::buffer::EventBuffer;
use super::capture::BindingCapture;
use super::cell::Timeline;
use super::config::InputSettings;
use super::control::ControlHash;
use super::device::Device;
use super::event::{DeviceId, InputEvent};
use super::layout::DeviceType;
use super::pipeline::{Dispatch, Stages};
use super::player::{Player, PlayerId};
use super::profile::DeviceProfile;
use super::provider::{ControlProvider, ProviderId};
use super::registry::ProfileRegistry;
use super::InputError;
use crate::engine::update_loop::UpdateClock;
use std::collections::HashMap;

/// Main input context that coordinates every device and player
///
/// Events are queued with [`InputSystem::queue_event`] and delivered by
/// [`InputSystem::update`], which drains everything due up to the target
/// time of that update.
#[derive(Debug)]
pub struct InputSystem {
    settings: InputSettings,

    /// Device profiles, resolved when a device is added
    profiles: ProfileRegistry,

    /// Devices in registration order
    devices: Vec<Device>,

    /// Players; assigned and global ones share this list
    players: Vec<Player>,

    /// Pending events, ordered by timestamp
    buffer: EventBuffer,

    /// Armed rebinding listener, if any
    capture: Option<BindingCapture>,

    /// Control names seen on any device, by hash
    control_names: HashMap<ControlHash, String>,

    next_device: u32,
    next_provider: u32,
    next_player: u32,

    /// Target time of the previous update per timeline
    last_target: [Option<f64>; 2],
}

impl InputSystem {
    /// Create an input system with no devices or players
    pub fn new(settings: InputSettings) -> Self {
        Self {
            settings,
            profiles: ProfileRegistry::new(),
            devices: Vec::new(),
            players: Vec::new(),
            buffer: EventBuffer::new(),
            capture: None,
            control_names: HashMap::new(),
            next_device: 1,
            next_provider: 1,
            next_player: 0,
            last_target: [None; 2],
        }
    }

    pub fn settings(&self) -> &InputSettings {
        &self.settings
    }

    /// Register a device profile; see [`ProfileRegistry::register`]
    pub fn register_profile(
        &mut self,
        profile: DeviceProfile,
        match_patterns: &[&str],
        last_resort: Option<&str>,
        never_match: Option<&str>,
    ) -> Result<(), InputError> {
        self.profiles
            .register(profile, match_patterns, last_resort, never_match)
    }

    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    fn allocate_provider(&mut self) -> ProviderId {
        let id = ProviderId(self.next_provider);
        self.next_provider += 1;
        id
    }

    /// Register a device with its type's standard layout
    pub fn add_device(&mut self, device_type: DeviceType, descriptor: &str) -> DeviceId {
        self.add_device_with(|id, provider| Device::new(id, provider, device_type, descriptor))
    }

    /// Register a device built by `build` from fresh ids
    ///
    /// The device's profile is resolved from its descriptor here.
    pub fn add_device_with<F>(&mut self, build: F) -> DeviceId
    where
        F: FnOnce(DeviceId, ProviderId) -> Device,
    {
        let id = DeviceId(self.next_device);
        self.next_device += 1;
        let provider = self.allocate_provider();

        let mut device = build(id, provider);
        device.set_profile(self.profiles.resolve(device.descriptor()));
        device.set_double_click_convention(self.settings.double_click_convention);

        for control in device.state().iter() {
            self.control_names
                .entry(control.hash())
                .or_insert_with(|| control.name().to_string());
        }

        log::info!(
            "Added {:?} device {:?} '{}' (profile: {})",
            device.device_type(),
            id,
            device.descriptor(),
            device.profile().map_or("none", |profile| profile.name())
        );
        self.devices.push(device);
        id
    }

    /// Unregister a device, dropping every assignment that used it
    pub fn remove_device(&mut self, id: DeviceId) -> Result<Device, InputError> {
        let position = self
            .devices
            .iter()
            .position(|device| device.id() == id)
            .ok_or(InputError::UnknownDevice(id))?;
        for player in &mut self.players {
            player.release_device(id);
        }
        let device = self.devices.remove(position);
        log::info!("Removed device {:?} '{}'", id, device.descriptor());
        Ok(device)
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.iter().find(|device| device.id() == id)
    }

    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut Device> {
        self.devices.iter_mut().find(|device| device.id() == id)
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Name of a control hash seen on any registered device
    pub fn control_name(&self, hash: ControlHash) -> Option<&str> {
        self.control_names.get(&hash).map(String::as_str)
    }

    /// Add an assigned player
    pub fn add_player(&mut self) -> PlayerId {
        self.insert_player(false)
    }

    /// Add a global player
    pub fn add_global_player(&mut self) -> PlayerId {
        self.insert_player(true)
    }

    fn insert_player(&mut self, global: bool) -> PlayerId {
        let id = PlayerId(self.next_player);
        self.next_player += 1;
        let player = if global {
            Player::global(id)
        } else {
            Player::new(id)
        };
        log::info!("Added {} player {:?}", if global { "global" } else { "assigned" }, id);
        self.players.push(player);
        id
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player, InputError> {
        self.players
            .iter()
            .find(|player| player.id() == id)
            .ok_or(InputError::UnknownPlayer(id))
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player, InputError> {
        self.players
            .iter_mut()
            .find(|player| player.id() == id)
            .ok_or(InputError::UnknownPlayer(id))
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Give `player` an action map and try to assign devices right away
    ///
    /// Only devices no other player holds are considered. A map that finds
    /// no fitting scheme waits for input from a device it can use.
    pub fn add_action_map(&mut self, player: PlayerId, map: ActionMap) -> Result<(), InputError> {
        let position = self
            .players
            .iter()
            .position(|candidate| candidate.id() == player)
            .ok_or(InputError::UnknownPlayer(player))?;
        let provider = self.allocate_provider();
        let mut input = ActionMapInput::new(provider, map)?;

        let claimed: Vec<DeviceId> = self
            .players
            .iter()
            .filter(|other| other.id() != player)
            .flat_map(Player::assigned_devices)
            .collect();
        let available: Vec<&Device> = self
            .devices
            .iter()
            .filter(|device| !claimed.contains(&device.id()))
            .collect();
        input.initialize(&available, &[]);

        self.players[position].add_map(input);
        Ok(())
    }

    /// Queue an event for the update whose target time covers it
    pub fn queue_event(&mut self, event: InputEvent) {
        self.buffer.push(event);
    }

    pub fn pending_events(&self) -> usize {
        self.buffer.len()
    }

    /// Route one event immediately
    pub fn dispatch(&mut self, event: InputEvent) -> Dispatch {
        Stages {
            devices: &mut self.devices,
            players: &mut self.players,
            capture: self.capture.as_mut(),
            buffer: &mut self.buffer,
            min_reinitialize_delay: self.settings.min_reinitialize_delay,
        }
        .dispatch(event)
    }

    /// Run one transition of `timeline` up to `target_time`
    ///
    /// Advances every control, delivers queued events due at or before
    /// `target_time` in timestamp order, then evaluates every binding.
    pub fn update(&mut self, timeline: Timeline, target_time: f64) {
        let slot = timeline.slot();
        let delta_time = self.last_target[slot]
            .map_or(0.0, |last| (target_time - last).max(0.0)) as f32;
        self.last_target[slot] = Some(target_time);

        for device in &mut self.devices {
            device.begin_update(timeline);
        }
        for player in &mut self.players {
            player.begin_update(timeline);
        }

        let mut delivered = 0usize;
        while let Some(event) = self.buffer.pop_due(target_time) {
            self.dispatch(event);
            delivered += 1;
        }
        if delivered > 0 {
            log::debug!(
                "{:?} update to {:.4}: {} events, {} still queued",
                timeline,
                target_time,
                delivered,
                self.buffer.len()
            );
        }

        for player in &mut self.players {
            player.end_update(timeline, delta_time);
        }
    }

    /// Drive one frame: every due fixed step, then one variable update
    pub fn run_frame(&mut self, clock: &mut UpdateClock, frame_time: f64) {
        let steps = clock.advance(frame_time);
        for target in steps.fixed_targets {
            self.update(Timeline::Fixed, target);
        }
        self.update(Timeline::Variable, steps.variable_target);
    }

    /// Arm a binding capture that accepts input from `started_at` on
    pub fn start_capture(&mut self, started_at: f64) {
        log::info!("Listening for a control to bind (from t={:.3})", started_at);
        self.capture = Some(BindingCapture::new(started_at, self.settings.capture_threshold));
    }

    pub fn cancel_capture(&mut self) -> Option<BindingCapture> {
        self.capture.take()
    }

    pub fn capture(&self) -> Option<&BindingCapture> {
        self.capture.as_ref()
    }

    /// Bind the captured control to `source` of `action`
    ///
    /// The control goes into the first scheme with a slot for the captured
    /// device, trying the active scheme before the others. The capture is
    /// disarmed on success.
    pub fn apply_capture(
        &mut self,
        player: PlayerId,
        map: &str,
        action: &str,
        source: usize,
    ) -> Result<ControlReference, InputError> {
        let captured = self
            .capture
            .as_ref()
            .and_then(BindingCapture::captured)
            .cloned()
            .ok_or(InputError::NoCapture)?;

        let input = self
            .player_mut(player)?
            .map_mut(map)
            .ok_or_else(|| InputError::UnknownActionMap(map.to_string()))?;
        let active = input.active_scheme_index();
        let schemes = input.map().schemes();
        let (scheme_name, slot) = active
            .into_iter()
            .chain((0..schemes.len()).filter(|index| Some(*index) != active))
            .find_map(|index| {
                let scheme = &schemes[index];
                scheme
                    .slot_for_device(captured.device_type, &captured.tags)
                    .map(|slot| (scheme.name.clone(), slot.key))
            })
            .ok_or(InputError::NoCompatibleSlot(captured.device))?;

        let reference = captured.reference(slot);
        input.rebind(&scheme_name, action, source, Binding::Control(reference.clone()))?;
        self.capture = None;
        log::info!(
            "Bound '{}' to {} for {:?}",
            action,
            self.control_name(reference.hash).unwrap_or("<unnamed>"),
            player
        );
        Ok(reference)
    }
}

impl Default for InputSystem {
    fn default() -> Self {
        Self::new(InputSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::input::action::default_gameplay_map;
    use crate::engine::input::layout::{gamepad, keyboard};
    use crate::engine::input::profile::generic_hid_gamepad;
    use crate::engine::input::value::{ControlKind, Value};
    use approx::assert_relative_eq;
    use winit::keyboard::KeyCode;

    struct Setup {
        input: InputSystem,
        keyboard: DeviceId,
        pad: DeviceId,
        player: PlayerId,
    }

    fn setup() -> Setup {
        let mut input = InputSystem::default();
        let keyboard = input.add_device(DeviceType::Keyboard, "Keyboard");
        input.add_device(DeviceType::Pointer, "Mouse");
        let pad = input.add_device(DeviceType::Gamepad, "Pad");
        let player = input.add_player();
        input
            .add_action_map(player, default_gameplay_map().unwrap())
            .unwrap();
        Setup {
            input,
            keyboard,
            pad,
            player,
        }
    }

    fn gameplay(setup: &Setup) -> &ActionMapInput {
        setup
            .input
            .player(setup.player)
            .unwrap()
            .map("Gameplay")
            .unwrap()
    }

    #[test]
    fn test_input_system_creation() {
        let input = InputSystem::default();
        assert!(input.devices().is_empty());
        assert!(input.players().is_empty());
        assert_eq!(input.pending_events(), 0);
        assert!(input.player(PlayerId(0)).is_err());
    }

    #[test]
    fn test_deferred_events_stay_queued() {
        let mut s = setup();
        s.input
            .queue_event(InputEvent::key(s.keyboard, 0.10, KeyCode::Space, true));
        s.input
            .queue_event(InputEvent::key(s.keyboard, 0.30, KeyCode::Space, false));

        s.input.update(Timeline::Fixed, 0.2);
        assert_eq!(s.input.pending_events(), 1);
        assert!(gameplay(&s).is_pressed("Jump", Timeline::Fixed).unwrap());

        s.input.update(Timeline::Fixed, 0.3);
        assert_eq!(s.input.pending_events(), 0);
        assert!(gameplay(&s).was_just_released("Jump", Timeline::Fixed).unwrap());
    }

    #[test]
    fn test_timelines_advance_independently() {
        let mut s = setup();
        s.input
            .queue_event(InputEvent::key(s.keyboard, 0.0, KeyCode::Space, true));

        s.input.update(Timeline::Fixed, 0.1);
        s.input.update(Timeline::Variable, 0.1);
        s.input.update(Timeline::Fixed, 0.2);

        let map = gameplay(&s);
        assert!(!map.was_just_pressed("Jump", Timeline::Fixed).unwrap());
        assert!(map.was_just_pressed("Jump", Timeline::Variable).unwrap());
    }

    #[test]
    fn test_scheme_follows_most_recent_device() {
        let mut s = setup();
        s.input
            .queue_event(InputEvent::key(s.keyboard, 0.1, KeyCode::KeyD, true));
        s.input.update(Timeline::Fixed, 0.1);
        assert_eq!(gameplay(&s).active_scheme().unwrap().name, "KeyboardMouse");

        s.input.queue_event(InputEvent::control(
            s.pad,
            1.0,
            gamepad::LEFT_STICK_X,
            -1.0,
        ));
        s.input.update(Timeline::Fixed, 1.0);
        let map = gameplay(&s);
        assert_eq!(map.active_scheme().unwrap().name, "Gamepad");
        assert_relative_eq!(map.action_value("MoveX", Timeline::Fixed).unwrap().scalar(), -1.0);
    }

    #[test]
    fn test_remove_device_releases_assignment() {
        let mut s = setup();
        s.input
            .queue_event(InputEvent::key(s.keyboard, 0.1, KeyCode::KeyD, true));
        s.input.update(Timeline::Fixed, 0.1);
        assert!(s.input.player(s.player).unwrap().has_device(s.keyboard));

        let removed = s.input.remove_device(s.keyboard).unwrap();
        assert_eq!(removed.id(), s.keyboard);
        assert!(gameplay(&s).assigned_devices().is_empty());
        assert!(matches!(
            s.input.remove_device(s.keyboard),
            Err(InputError::UnknownDevice(_))
        ));
    }

    #[test]
    fn test_profile_resolved_on_add() {
        let mut input = InputSystem::default();
        input
            .register_profile(generic_hid_gamepad(), &["(?i)usb.*joystick"], None, None)
            .unwrap();
        let hid = input.add_device(DeviceType::Gamepad, "USB Joystick 0079:0006");
        let other = input.add_device(DeviceType::Gamepad, "Xbox Wireless Controller");
        assert!(input.device(hid).unwrap().profile().is_some());
        assert!(input.device(other).unwrap().profile().is_none());
    }

    #[test]
    fn test_capture_rebinds_scheme_with_matching_slot() {
        let mut s = setup();
        s.input
            .queue_event(InputEvent::key(s.keyboard, 0.1, KeyCode::KeyD, true));
        s.input.update(Timeline::Fixed, 0.1);

        assert!(matches!(
            s.input.apply_capture(s.player, "Gameplay", "Jump", 0),
            Err(InputError::NoCapture)
        ));

        // Any device may answer the capture, not only the assigned ones
        s.input.start_capture(0.2);
        s.input
            .queue_event(InputEvent::control(s.pad, 0.25, gamepad::ACTION_EAST, 1.0));
        s.input.update(Timeline::Fixed, 0.3);
        let captured = s.input.capture().unwrap().captured().unwrap().clone();
        assert_eq!(captured.device, s.pad);

        // Only the gamepad scheme has a slot for it
        s.input.apply_capture(s.player, "Gameplay", "Jump", 0).unwrap();
        let schemes = gameplay(&s).map().schemes();
        let east = ControlHash::new(gamepad::NAMES[gamepad::ACTION_EAST], ControlKind::Button);
        let jump_hashes = |scheme: usize| {
            let mut hashes = Vec::new();
            for source in &schemes[scheme].binding("Jump").unwrap().sources {
                source.for_each_reference(&mut |reference| hashes.push(reference.hash));
            }
            hashes
        };
        assert_eq!(jump_hashes(1), vec![east]);
        assert!(!jump_hashes(0).contains(&east));
    }

    #[test]
    fn test_capture_without_compatible_slot() {
        let mut s = setup();
        let stick = s.input.add_device(DeviceType::Joystick, "Flight stick");
        s.input.start_capture(0.0);
        s.input.queue_event(InputEvent::control(stick, 0.1, 0, 1.0));
        s.input.update(Timeline::Fixed, 0.1);
        assert!(s.input.capture().unwrap().is_complete());

        assert!(matches!(
            s.input.apply_capture(s.player, "Gameplay", "Jump", 0),
            Err(InputError::NoCompatibleSlot(_))
        ));
        assert!(s.input.capture().is_some());
        assert!(matches!(
            s.input.apply_capture(s.player, "Menu", "Jump", 0),
            Err(InputError::UnknownActionMap(_))
        ));
    }

    #[test]
    fn test_capture_binds_key_to_action() {
        let mut input = InputSystem::default();
        let keys = input.add_device(DeviceType::Keyboard, "Keyboard");
        input.add_device(DeviceType::Pointer, "Mouse");
        let player = input.add_player();
        input
            .add_action_map(player, default_gameplay_map().unwrap())
            .unwrap();
        input.queue_event(InputEvent::key(keys, 0.1, KeyCode::KeyD, true));
        input.update(Timeline::Fixed, 0.1);

        input.start_capture(0.2);
        // The keyboard the player is using answers the capture
        input.queue_event(InputEvent::key(keys, 0.3, KeyCode::KeyE, true));
        input.update(Timeline::Fixed, 0.3);
        assert!(input.capture().is_some_and(|capture| capture.is_complete()));
        let map = input.player(player).unwrap().map("Gameplay").unwrap();
        assert_eq!(map.assigned_devices().len(), 2);

        input.queue_event(InputEvent::key(keys, 0.35, KeyCode::KeyE, false));
        input.update(Timeline::Fixed, 0.35);

        let reference = input.apply_capture(player, "Gameplay", "Jump", 0).unwrap();
        assert_eq!(input.control_name(reference.hash), Some("KeyE"));
        assert!(input.capture().is_none());

        input.queue_event(InputEvent::key(keys, 0.4, KeyCode::KeyE, true));
        input.update(Timeline::Fixed, 0.4);
        let map = input.player(player).unwrap().map("Gameplay").unwrap();
        assert_eq!(map.action_value("Jump", Timeline::Fixed).unwrap(), Value::Scalar(1.0));
        assert_eq!(keyboard::key_name(KeyCode::KeyE), "KeyE");
    }

    #[test]
    fn test_run_frame_drives_both_timelines() {
        let mut s = setup();
        let mut clock = UpdateClock::from_settings(s.input.settings());
        s.input
            .queue_event(InputEvent::key(s.keyboard, 0.01, KeyCode::Space, true));

        s.input.run_frame(&mut clock, 0.02);
        let map = gameplay(&s);
        assert!(map.was_just_pressed("Jump", Timeline::Fixed).unwrap());
        assert!(map.was_just_pressed("Jump", Timeline::Variable).unwrap());
        assert_eq!(clock.update_count(), 1);
    }
}
