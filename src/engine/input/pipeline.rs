// Event dispatch: remap, device and consumer stages for one event

use super::buffer::EventBuffer;
use super::capture::BindingCapture;
use super::device::Device;
use super::event::{DeviceId, InputEvent};
use super::player::{Player, PlayerId};

/// Who consumed a dispatched event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumer {
    Player(PlayerId),
    Capture,
}

/// Outcome of routing one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A device profile swallowed the event
    Remapped,
    /// No registered device has the event's id
    UnknownDevice,
    /// Applied to the device; nobody consumed it
    Unconsumed,
    Consumed(Consumer),
}

impl Dispatch {
    pub fn is_consumed(&self) -> bool {
        matches!(self, Dispatch::Consumed(_))
    }
}

/// The mutable parts of an input system one dispatch touches
pub struct Stages<'a> {
    pub devices: &'a mut [Device],
    pub players: &'a mut [Player],
    pub capture: Option<&'a mut BindingCapture>,
    pub buffer: &'a mut EventBuffer,
    pub min_reinitialize_delay: f64,
}

impl Stages<'_> {
    /// Route one event through every stage
    ///
    /// Events a profile synthesizes are pushed back into the buffer at
    /// their own timestamp, so the current drain picks them up.
    pub fn dispatch(&mut self, mut event: InputEvent) -> Dispatch {
        if self.remap(&mut event) {
            return Dispatch::Remapped;
        }

        let Some(device) = self.devices.iter_mut().find(|device| device.id() == event.device)
        else {
            log::debug!(
                "Dropped {} event from unknown device {:?}",
                event.kind_name(),
                event.device
            );
            return Dispatch::UnknownDevice;
        };
        device.process_event(&event);

        match self.consume(&event) {
            Some(consumer) => Dispatch::Consumed(consumer),
            None => Dispatch::Unconsumed,
        }
    }

    /// Rewriters stage; true when the event was swallowed
    fn remap(&mut self, event: &mut InputEvent) -> bool {
        let mut synthesized = Vec::new();
        let handled = self
            .devices
            .iter()
            .any(|device| device.remap(event, &mut synthesized));
        for extra in synthesized {
            self.buffer.push(extra);
        }
        if handled {
            log::debug!("Remapped {} event from device {:?}", event.kind_name(), event.device);
        }
        handled
    }

    /// Consumers stage: an armed capture, then assigned players, then
    /// global players; the first consumer wins
    fn consume(&mut self, event: &InputEvent) -> Option<Consumer> {
        let devices: &[Device] = &*self.devices;
        if let Some(capture) = self.capture.as_deref_mut() {
            let source = devices.iter().find(|device| device.id() == event.device);
            if source.is_some_and(|device| capture.try_capture(event, device)) {
                return Some(Consumer::Capture);
            }
        }

        // Global players' claims never block an assigned player
        let claims: Vec<(bool, Vec<DeviceId>)> = self
            .players
            .iter()
            .map(|player| (player.is_global(), player.assigned_devices()))
            .collect();

        for global in [false, true] {
            for (position, player) in self.players.iter_mut().enumerate() {
                if player.is_global() != global {
                    continue;
                }
                let claimed_elsewhere = |id: DeviceId| {
                    claims.iter().enumerate().any(|(other, (other_global, claimed))| {
                        other != position && (global || !other_global) && claimed.contains(&id)
                    })
                };
                let available: Vec<&Device> = devices
                    .iter()
                    .filter(|device| !claimed_elsewhere(device.id()))
                    .collect();
                if player.process_event(event, &available, self.min_reinitialize_delay) {
                    return Some(Consumer::Player(player.id()));
                }
            }
        }
        None
    }
}
