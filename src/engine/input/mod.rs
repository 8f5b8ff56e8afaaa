// Input handling system
//
// Device-agnostic input: devices write raw events into typed controls,
// players read actions computed from those controls through rebindable
// binding trees.
//
// ## Architecture
//
// - `cell`, `value`, `control`, `state`, `provider`: typed controls with a
//   fixed and a variable timeline, stored in per-provider state tables
// - `event`, `buffer`, `pipeline`: events and how one event is routed
// - `layout`, `device`, `profile`, `registry`: physical devices and the
//   profiles that remap their raw controls
// - `binding`, `processor`, `scheme`, `matcher`: binding trees, control
//   schemes and the matcher that assigns devices to scheme slots
// - `action`, `action_map_input`, `player`, `capture`: actions, their live
//   state per player and runtime rebinding
// - `config`, `manager`: settings and the `InputSystem` tying it together
//
// ## Usage Example
//
// ```rust
// use rusted_input::engine::input::{default_gameplay_map, DeviceType, InputSystem, Timeline};
//
// let mut input = InputSystem::default();
// let keyboard = input.add_device(DeviceType::Keyboard, "Keyboard");
// input.add_device(DeviceType::Pointer, "Mouse");
// let player = input.add_player();
// input.add_action_map(player, default_gameplay_map()?)?;
//
// // Platform events are queued as they arrive...
// input.queue_event(InputEvent::key(keyboard, 0.01, KeyCode::Space, true));
//
// // ...and delivered by the update whose target time covers them
// input.update(Timeline::Fixed, 1.0 / 60.0);
//
// let gameplay = input.player(player)?.map("Gameplay").unwrap();
// if gameplay.was_just_pressed("Jump", Timeline::Fixed)? {
//     // Jump!
// }
// ```

pub mod action;
pub mod action_map_input;
pub mod binding;
pub mod buffer;
pub mod capture;
pub mod cell;
pub mod config;
pub mod control;
pub mod device;
pub mod event;
pub mod layout;
pub mod manager;
pub mod matcher;
pub mod pipeline;
pub mod player;
pub mod processor;
pub mod profile;
pub mod provider;
pub mod registry;
pub mod scheme;
pub mod state;
pub mod value;

// Re-export commonly used types
pub use action::{default_gameplay_map, ActionMap, InputAction};
pub use action_map_input::ActionMapInput;
pub use binding::{Binding, CombinedBinding, ControlReference, SlotKey};
pub use capture::{BindingCapture, CapturedControl};
pub use cell::Timeline;
pub use config::InputSettings;
pub use control::{ControlDescriptor, ControlHash};
pub use device::Device;
pub use event::{DeviceId, InputEvent};
pub use layout::DeviceType;
pub use manager::InputSystem;
pub use pipeline::{Consumer, Dispatch};
pub use player::{Player, PlayerId};
pub use processor::Processor;
pub use profile::DeviceProfile;
pub use provider::{ControlProvider, ProviderId};
pub use scheme::{ControlScheme, DeviceSlot};
pub use value::{ControlKind, Value};

/// Input system errors
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Unknown device: {0:?}")]
    UnknownDevice(DeviceId),

    #[error("Unknown player: {0:?}")]
    UnknownPlayer(PlayerId),

    #[error("Unknown action map: {0}")]
    UnknownActionMap(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Unknown control scheme: {0}")]
    UnknownScheme(String),

    #[error("Binding for '{action}' has the wrong kind: expected {expected:?}, got {actual:?}")]
    BindingKind {
        action: String,
        expected: ControlKind,
        actual: ControlKind,
    },

    #[error("Binding source {index} of '{action}' is out of range")]
    SourceOutOfRange { action: String, index: usize },

    #[error("No control has been captured")]
    NoCapture,

    #[error("No control scheme has a slot for device {0:?}")]
    NoCompatibleSlot(DeviceId),

    #[error("Invalid input settings: {0}")]
    InvalidSettings(String),

    #[error("Invalid descriptor pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid binding data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid settings file: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_display() {
        let err = InputError::UnknownAction("Dance".to_string());
        assert_eq!(err.to_string(), "Unknown action: Dance");

        let err = InputError::BindingKind {
            action: "Jump".to_string(),
            expected: ControlKind::Button,
            actual: ControlKind::Vector2,
        };
        assert_eq!(
            err.to_string(),
            "Binding for 'Jump' has the wrong kind: expected Button, got Vector2"
        );
    }
}
