// Players: owners of action map inputs and of the devices those maps claim

use super::action_map_input::ActionMapInput;
use super::cell::Timeline;
use super::device::Device;
use super::event::{DeviceId, InputEvent};

/// Identifies a player inside an input system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u32);

/// One player and the action maps it drives
///
/// Assigned players only see events from devices their maps claimed (or
/// devices they can claim by re-running the matcher). Global players are
/// offered whatever no assigned player consumed.
#[derive(Debug)]
pub struct Player {
    id: PlayerId,
    global: bool,
    maps: Vec<ActionMapInput>,
}

impl Player {
    /// Create an assigned player
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            global: false,
            maps: Vec::new(),
        }
    }

    /// Create a global player
    pub fn global(id: PlayerId) -> Self {
        Self {
            global: true,
            ..Self::new(id)
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn is_global(&self) -> bool {
        self.global
    }

    pub fn add_map(&mut self, map: ActionMapInput) {
        self.maps.push(map);
    }

    pub fn maps(&self) -> &[ActionMapInput] {
        &self.maps
    }

    /// Get an action map input by its map name
    pub fn map(&self, name: &str) -> Option<&ActionMapInput> {
        self.maps.iter().find(|map| map.name() == name)
    }

    pub fn map_mut(&mut self, name: &str) -> Option<&mut ActionMapInput> {
        self.maps.iter_mut().find(|map| map.name() == name)
    }

    /// Every device claimed by an active map, without duplicates
    pub fn assigned_devices(&self) -> Vec<DeviceId> {
        let mut devices: Vec<DeviceId> = self
            .maps
            .iter()
            .filter(|map| map.is_active())
            .flat_map(|map| map.assigned_devices().iter().copied())
            .collect();
        devices.sort_unstable();
        devices.dedup();
        devices
    }

    pub fn has_device(&self, device: DeviceId) -> bool {
        self.maps
            .iter()
            .any(|map| map.is_active() && map.has_device(device))
    }

    /// Offer `event` to this player
    ///
    /// Maps that already hold the source device consume it. Otherwise
    /// maps that want to re-run matching try again with the source device
    /// required, picking from `available`.
    pub fn process_event(
        &mut self,
        event: &InputEvent,
        available: &[&Device],
        min_reinitialize_delay: f64,
    ) -> bool {
        let mut consumed = false;
        for map in &mut self.maps {
            consumed |= map.process_event(event);
        }
        if consumed {
            return true;
        }

        if !available.iter().any(|device| device.id() == event.device) {
            return false;
        }
        for map in &mut self.maps {
            if map.wants_reinitialize(event, min_reinitialize_delay)
                && map.initialize(available, &[event.device])
            {
                consumed |= map.process_event(event);
            }
        }
        consumed
    }

    /// Drop every assignment that uses `device`
    pub fn release_device(&mut self, device: DeviceId) {
        for map in &mut self.maps {
            if map.has_device(device) {
                map.clear_scheme();
            }
        }
    }

    pub fn begin_update(&mut self, timeline: Timeline) {
        for map in &mut self.maps {
            map.begin_update(timeline);
        }
    }

    pub fn end_update(&mut self, timeline: Timeline, delta_time: f32) {
        for map in &mut self.maps {
            map.end_update(timeline, delta_time);
        }
    }

    /// Reset every map to its initial state
    pub fn reset(&mut self) {
        for map in &mut self.maps {
            map.reset();
        }
    }
}
