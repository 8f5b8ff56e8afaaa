// Logical actions, action maps, and the default gameplay map

use super::binding::{Binding, CombinedBinding, SlotKey};
use super::control::ControlDescriptor;
use super::layout::{gamepad, keyboard, pointer, DeviceType};
use super::processor::Processor;
use super::scheme::{ControlScheme, DeviceSlot};
use super::value::ControlKind;
use super::InputError;
use winit::keyboard::KeyCode;

/// Where an action's value comes from
#[derive(Debug, Clone, PartialEq)]
pub enum ActionSource {
    /// Computed from the active scheme's binding root
    Bound,
    /// Built from two scalar actions of the same map
    Vector2 { x: String, y: String },
    /// Built from three scalar actions of the same map
    Vector3 { x: String, y: String, z: String },
}

/// A single logical action such as "Jump"
#[derive(Debug, Clone, PartialEq)]
pub struct InputAction {
    pub name: String,
    pub kind: ControlKind,
    pub source: ActionSource,
}

impl InputAction {
    pub fn new(name: impl Into<String>, kind: ControlKind) -> Self {
        Self {
            name: name.into(),
            kind,
            source: ActionSource::Bound,
        }
    }

    pub fn button(name: impl Into<String>) -> Self {
        Self::new(name, ControlKind::Button)
    }

    pub fn axis(name: impl Into<String>) -> Self {
        Self::new(name, ControlKind::Axis)
    }

    /// Vector action assembled from two scalar actions
    pub fn composite_vector2(name: impl Into<String>, x: &str, y: &str) -> Self {
        Self {
            name: name.into(),
            kind: ControlKind::Vector2,
            source: ActionSource::Vector2 {
                x: x.to_string(),
                y: y.to_string(),
            },
        }
    }

    /// Vector action assembled from three scalar actions
    pub fn composite_vector3(name: impl Into<String>, x: &str, y: &str, z: &str) -> Self {
        Self {
            name: name.into(),
            kind: ControlKind::Vector3,
            source: ActionSource::Vector3 {
                x: x.to_string(),
                y: y.to_string(),
                z: z.to_string(),
            },
        }
    }

    pub fn is_composite(&self) -> bool {
        self.source != ActionSource::Bound
    }

    /// The control this action exposes
    pub fn descriptor(&self) -> ControlDescriptor {
        ControlDescriptor::new(self.name.clone(), self.kind)
    }

    /// Names of the actions a composite reads from
    pub fn components(&self) -> Vec<&str> {
        match &self.source {
            ActionSource::Bound => Vec::new(),
            ActionSource::Vector2 { x, y } => vec![x.as_str(), y.as_str()],
            ActionSource::Vector3 { x, y, z } => vec![x.as_str(), y.as_str(), z.as_str()],
        }
    }
}

/// Named group of actions and the schemes that can drive them
#[derive(Debug, Clone, PartialEq)]
pub struct ActionMap {
    name: String,
    actions: Vec<InputAction>,
    schemes: Vec<ControlScheme>,
}

impl ActionMap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
            schemes: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: InputAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_scheme(mut self, scheme: ControlScheme) -> Self {
        self.schemes.push(scheme);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actions(&self) -> &[InputAction] {
        &self.actions
    }

    pub fn action(&self, name: &str) -> Option<&InputAction> {
        self.actions.iter().find(|action| action.name == name)
    }

    /// Position of the action's control in the map's state table
    pub fn action_index(&self, name: &str) -> Option<usize> {
        self.actions.iter().position(|action| action.name == name)
    }

    pub fn schemes(&self) -> &[ControlScheme] {
        &self.schemes
    }

    pub fn scheme_index(&self, name: &str) -> Option<usize> {
        self.schemes.iter().position(|scheme| scheme.name == name)
    }

    pub fn scheme_mut(&mut self, index: usize) -> Option<&mut ControlScheme> {
        self.schemes.get_mut(index)
    }

    /// One control per action, in action order
    pub fn controls(&self) -> Vec<ControlDescriptor> {
        self.actions.iter().map(InputAction::descriptor).collect()
    }

    /// Check composites and scheme bindings against the declared actions
    pub fn validate(&self) -> Result<(), InputError> {
        for action in &self.actions {
            for component in action.components() {
                let source = self
                    .action(component)
                    .ok_or_else(|| InputError::UnknownAction(component.to_string()))?;
                if !source.kind.is_scalar() || source.is_composite() {
                    return Err(InputError::BindingKind {
                        action: action.name.clone(),
                        expected: ControlKind::Axis,
                        actual: source.kind,
                    });
                }
            }
        }

        for scheme in &self.schemes {
            for (name, binding) in scheme.bindings() {
                let action = self
                    .action(name)
                    .ok_or_else(|| InputError::UnknownAction(name.to_string()))?;
                let fits = action.kind == binding.kind
                    || (action.kind.is_scalar() && binding.kind.is_scalar());
                if !fits || action.is_composite() {
                    return Err(InputError::BindingKind {
                        action: action.name.clone(),
                        expected: action.kind,
                        actual: binding.kind,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Slot keys used by [`default_gameplay_map`]
pub const KEYBOARD_SLOT: SlotKey = SlotKey(0);
pub const POINTER_SLOT: SlotKey = SlotKey(1);
pub const GAMEPAD_SLOT: SlotKey = SlotKey(0);

fn key(code: KeyCode) -> Binding {
    Binding::control(KEYBOARD_SLOT, &keyboard::key_name(code), ControlKind::Button)
}

fn pad_button(index: usize) -> Binding {
    Binding::control(GAMEPAD_SLOT, gamepad::NAMES[index], ControlKind::Button)
}

fn pad_axis(index: usize) -> Binding {
    Binding::control(GAMEPAD_SLOT, gamepad::NAMES[index], ControlKind::Axis)
}

fn root(kind: ControlKind, sources: Vec<Binding>) -> CombinedBinding {
    sources
        .into_iter()
        .fold(CombinedBinding::new(kind), CombinedBinding::with_source)
}

/// Keyboard+mouse and gamepad gameplay controls
///
/// WASD or the left stick moves, space or the south button jumps, the left
/// mouse button or right trigger fires, Ctrl+S quick-saves.
pub fn default_gameplay_map() -> Result<ActionMap, InputError> {
    let keyboard_mouse = ControlScheme::new("KeyboardMouse")
        .with_slot(DeviceSlot::new(KEYBOARD_SLOT, DeviceType::Keyboard))
        .with_slot(DeviceSlot::new(POINTER_SLOT, DeviceType::Pointer))
        .with_binding(
            "MoveX",
            root(
                ControlKind::Axis,
                vec![
                    Binding::button_axis(key(KeyCode::KeyA), key(KeyCode::KeyD)),
                    Binding::button_axis(key(KeyCode::ArrowLeft), key(KeyCode::ArrowRight)),
                ],
            ),
        )?
        .with_binding(
            "MoveY",
            root(
                ControlKind::Axis,
                vec![
                    Binding::button_axis(key(KeyCode::KeyS), key(KeyCode::KeyW)),
                    Binding::button_axis(key(KeyCode::ArrowDown), key(KeyCode::ArrowUp)),
                ],
            ),
        )?
        .with_binding("Jump", root(ControlKind::Button, vec![key(KeyCode::Space)]))?
        .with_binding(
            "Fire",
            root(
                ControlKind::Button,
                vec![Binding::control(
                    POINTER_SLOT,
                    &pointer::controls()[pointer::PRIMARY].name,
                    ControlKind::Button,
                )],
            ),
        )?
        .with_binding(
            "QuickSave",
            root(
                ControlKind::Button,
                vec![Binding::modifier_combo(
                    key(KeyCode::KeyS),
                    vec![key(KeyCode::ControlLeft)],
                )],
            ),
        )?
        .with_binding("Pause", root(ControlKind::Button, vec![key(KeyCode::Escape)]))?;

    let pad = ControlScheme::new("Gamepad")
        .with_slot(DeviceSlot::new(GAMEPAD_SLOT, DeviceType::Gamepad))
        .with_binding(
            "MoveX",
            root(ControlKind::Axis, vec![pad_axis(gamepad::LEFT_STICK_X)])
                .with_processor(Processor::DeadZone {
                    inner: 0.15,
                    outer: 1.0,
                }),
        )?
        .with_binding(
            "MoveY",
            root(ControlKind::Axis, vec![pad_axis(gamepad::LEFT_STICK_Y)])
                .with_processor(Processor::DeadZone {
                    inner: 0.15,
                    outer: 1.0,
                }),
        )?
        .with_binding(
            "Jump",
            root(ControlKind::Button, vec![pad_button(gamepad::ACTION_SOUTH)]),
        )?
        .with_binding(
            "Fire",
            root(ControlKind::Button, vec![pad_axis(gamepad::RIGHT_TRIGGER)]),
        )?
        .with_binding(
            "QuickSave",
            root(
                ControlKind::Button,
                vec![Binding::modifier_combo(
                    pad_button(gamepad::START),
                    vec![pad_button(gamepad::SELECT)],
                )],
            ),
        )?
        .with_binding("Pause", root(ControlKind::Button, vec![pad_button(gamepad::START)]))?;

    let map = ActionMap::new("Gameplay")
        .with_action(InputAction::axis("MoveX"))
        .with_action(InputAction::axis("MoveY"))
        .with_action(InputAction::composite_vector2("Move", "MoveX", "MoveY"))
        .with_action(InputAction::button("Jump"))
        .with_action(InputAction::button("Fire"))
        .with_action(InputAction::button("QuickSave"))
        .with_action(InputAction::button("Pause"))
        .with_scheme(keyboard_mouse)
        .with_scheme(pad);
    map.validate()?;
    Ok(map)
}
