// Binding trees: how an action's value is computed from device controls

use super::cell::Timeline;
use super::control::ControlHash;
use super::processor::{process_chain, Processor};
use super::state::StateTable;
use super::value::{ControlKind, Value, PRESS_THRESHOLD};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Key of a device slot inside a control scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey(pub u32);

/// What a binding tree reads from during one update
#[derive(Debug, Clone, Copy)]
pub struct BindingContext<'a> {
    /// One table per device slot, in slot order
    pub tables: &'a [StateTable],
    pub timeline: Timeline,
    /// Seconds covered by this update
    pub delta_time: f32,
}

/// Weak reference to one control of one device slot
///
/// Only the slot key and control hash are stored; `initialize` resolves
/// them against concrete slot tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlReference {
    pub slot: SlotKey,
    pub hash: ControlHash,
    /// Kind of the referenced control, used for the unresolved default
    pub kind: ControlKind,
    /// (slot position, control index) once initialized
    #[serde(skip)]
    resolved: Option<(usize, usize)>,
}

impl ControlReference {
    pub fn new(slot: SlotKey, name: &str, kind: ControlKind) -> Self {
        Self::from_hash(slot, ControlHash::new(name, kind), kind)
    }

    pub fn from_hash(slot: SlotKey, hash: ControlHash, kind: ControlKind) -> Self {
        Self {
            slot,
            hash,
            kind,
            resolved: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    fn initialize(&mut self, keys: &[SlotKey], tables: &[StateTable]) {
        self.resolved = keys
            .iter()
            .position(|key| *key == self.slot)
            .and_then(|slot| {
                let table = tables.get(slot)?;
                let index = table.index_of_hash(self.hash)?;
                Some((slot, index))
            });
    }

    fn value(&self, ctx: &BindingContext) -> Value {
        self.resolved
            .and_then(|(slot, index)| ctx.tables.get(slot)?.get(index))
            .map(|control| control.value(ctx.timeline))
            .filter(|value| value.fits(self.kind))
            .unwrap_or_else(|| self.kind.default_value())
    }
}

/// A node of a binding tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Binding {
    /// Read one control directly
    Control(ControlReference),
    /// `positive - negative`
    ButtonAxis {
        negative: Box<Binding>,
        positive: Box<Binding>,
    },
    /// Two or three scalar children as a vector
    AxisVector {
        x: Box<Binding>,
        y: Box<Binding>,
        #[serde(default)]
        z: Option<Box<Binding>>,
    },
    /// Alternative sources folded with the value kind's combination law
    Combined(CombinedBinding),
    /// Main control gated by held modifiers
    ModifierCombo(ModifierCombo),
}

impl Binding {
    pub fn control(slot: SlotKey, name: &str, kind: ControlKind) -> Self {
        Self::Control(ControlReference::new(slot, name, kind))
    }

    pub fn button_axis(negative: Binding, positive: Binding) -> Self {
        Self::ButtonAxis {
            negative: Box::new(negative),
            positive: Box::new(positive),
        }
    }

    pub fn vector2(x: Binding, y: Binding) -> Self {
        Self::AxisVector {
            x: Box::new(x),
            y: Box::new(y),
            z: None,
        }
    }

    pub fn vector3(x: Binding, y: Binding, z: Binding) -> Self {
        Self::AxisVector {
            x: Box::new(x),
            y: Box::new(y),
            z: Some(Box::new(z)),
        }
    }

    pub fn modifier_combo(main: Binding, modifiers: Vec<Binding>) -> Self {
        Self::ModifierCombo(ModifierCombo::new(main, modifiers))
    }

    /// Kind of value this node produces
    pub fn kind(&self) -> ControlKind {
        match self {
            Self::Control(reference) => reference.kind,
            Self::ButtonAxis { .. } => ControlKind::Axis,
            Self::AxisVector { z: None, .. } => ControlKind::Vector2,
            Self::AxisVector { z: Some(_), .. } => ControlKind::Vector3,
            Self::Combined(combined) => combined.kind,
            Self::ModifierCombo(_) => ControlKind::Button,
        }
    }

    /// First node, this one included, whose output cannot feed `expected`
    ///
    /// Button axes, vectors and combos need scalar children; nested roots
    /// need sources of their own kind.
    pub fn mismatch(&self, expected: ControlKind) -> Option<(ControlKind, ControlKind)> {
        let kind = self.kind();
        if !feeds(kind, expected) {
            return Some((expected, kind));
        }
        match self {
            Self::Control(_) => None,
            Self::ButtonAxis { negative, positive } => negative
                .mismatch(ControlKind::Button)
                .or_else(|| positive.mismatch(ControlKind::Button)),
            Self::AxisVector { x, y, z } => [Some(x), Some(y), z.as_ref()]
                .into_iter()
                .flatten()
                .find_map(|axis| axis.mismatch(ControlKind::Axis)),
            Self::Combined(combined) => combined.mismatch(),
            Self::ModifierCombo(combo) => std::iter::once(combo.main.as_ref())
                .chain(combo.modifiers.iter())
                .find_map(|button| button.mismatch(ControlKind::Button)),
        }
    }

    /// Resolve every leaf against `tables` (one per key in `keys`) and
    /// clear any per-timeline state
    pub fn initialize(&mut self, keys: &[SlotKey], tables: &[StateTable]) {
        match self {
            Self::Control(reference) => reference.initialize(keys, tables),
            Self::ButtonAxis { negative, positive } => {
                negative.initialize(keys, tables);
                positive.initialize(keys, tables);
            }
            Self::AxisVector { x, y, z } => {
                x.initialize(keys, tables);
                y.initialize(keys, tables);
                if let Some(z) = z {
                    z.initialize(keys, tables);
                }
            }
            Self::Combined(combined) => combined.initialize(keys, tables),
            Self::ModifierCombo(combo) => combo.initialize(keys, tables),
        }
    }

    /// Compute this node's value for the live timeline
    pub fn end_update(&mut self, ctx: &BindingContext) -> Value {
        match self {
            Self::Control(reference) => reference.value(ctx),
            Self::ButtonAxis { negative, positive } => {
                let negative = negative.end_update(ctx).scalar();
                let positive = positive.end_update(ctx).scalar();
                Value::Scalar(positive - negative)
            }
            Self::AxisVector { x, y, z } => {
                let x = x.end_update(ctx).scalar();
                let y = y.end_update(ctx).scalar();
                match z {
                    Some(z) => Value::Vector3(Vec3::new(x, y, z.end_update(ctx).scalar())),
                    None => Value::Vector2(Vec2::new(x, y)),
                }
            }
            Self::Combined(combined) => combined.end_update(ctx),
            Self::ModifierCombo(combo) => combo.end_update(ctx),
        }
    }

    /// Visit every control reference in the tree
    pub fn for_each_reference(&self, f: &mut impl FnMut(&ControlReference)) {
        match self {
            Self::Control(reference) => f(reference),
            Self::ButtonAxis { negative, positive } => {
                negative.for_each_reference(f);
                positive.for_each_reference(f);
            }
            Self::AxisVector { x, y, z } => {
                x.for_each_reference(f);
                y.for_each_reference(f);
                if let Some(z) = z {
                    z.for_each_reference(f);
                }
            }
            Self::Combined(combined) => {
                for source in &combined.sources {
                    source.for_each_reference(f);
                }
            }
            Self::ModifierCombo(combo) => {
                combo.main.for_each_reference(f);
                for modifier in &combo.modifiers {
                    modifier.for_each_reference(f);
                }
            }
        }
    }
}

/// Whether a value of `kind` can stand where `expected` is read
fn feeds(kind: ControlKind, expected: ControlKind) -> bool {
    kind == expected || (kind.is_scalar() && expected.is_scalar())
}

/// Root of an action's binding: alternative sources plus post-processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedBinding {
    pub kind: ControlKind,
    pub sources: Vec<Binding>,
    #[serde(default)]
    pub processors: Vec<Processor>,
    /// Last output per timeline, the "previous value" processors see
    #[serde(skip)]
    last_output: [Option<Value>; 2],
}

impl CombinedBinding {
    pub fn new(kind: ControlKind) -> Self {
        Self {
            kind,
            sources: Vec::new(),
            processors: Vec::new(),
            last_output: [None; 2],
        }
    }

    pub fn with_source(mut self, source: Binding) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_processor(mut self, processor: Processor) -> Self {
        self.processors.push(processor);
        self
    }

    /// First `(expected, actual)` kind conflict anywhere below this root
    pub fn mismatch(&self) -> Option<(ControlKind, ControlKind)> {
        self.sources.iter().find_map(|source| source.mismatch(self.kind))
    }

    pub fn initialize(&mut self, keys: &[SlotKey], tables: &[StateTable]) {
        self.last_output = [None; 2];
        for source in &mut self.sources {
            source.initialize(keys, tables);
        }
    }

    pub fn end_update(&mut self, ctx: &BindingContext) -> Value {
        let default = self.kind.default_value();
        // Every source updates, even when an earlier one already dominates
        let values: Vec<Value> = self
            .sources
            .iter_mut()
            .map(|source| source.end_update(ctx))
            .collect();
        let combined = Value::combine_all(values).unwrap_or(default);

        let slot = ctx.timeline.slot();
        let previous = self.last_output[slot].unwrap_or(default);
        let output = process_chain(&self.processors, combined, previous, ctx.delta_time);
        self.last_output[slot] = Some(output);
        output
    }
}

/// Button combo such as Ctrl+S
///
/// Activates on the rising edge of `main` while every modifier is already
/// held, and stays active until `main` is released.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierCombo {
    pub main: Box<Binding>,
    pub modifiers: Vec<Binding>,
    #[serde(skip)]
    active: [bool; 2],
    #[serde(skip)]
    main_previous: [f32; 2],
}

impl ModifierCombo {
    pub fn new(main: Binding, modifiers: Vec<Binding>) -> Self {
        Self {
            main: Box::new(main),
            modifiers,
            active: [false; 2],
            main_previous: [0.0; 2],
        }
    }

    pub fn is_active(&self, timeline: Timeline) -> bool {
        self.active[timeline.slot()]
    }

    fn initialize(&mut self, keys: &[SlotKey], tables: &[StateTable]) {
        self.active = [false; 2];
        self.main_previous = [0.0; 2];
        self.main.initialize(keys, tables);
        for modifier in &mut self.modifiers {
            modifier.initialize(keys, tables);
        }
    }

    fn end_update(&mut self, ctx: &BindingContext) -> Value {
        // No short circuit: every modifier must see every update
        let modifiers_held = self.modifiers.iter_mut().fold(true, |held, modifier| {
            let pressed = modifier.end_update(ctx).scalar() > PRESS_THRESHOLD;
            held && pressed
        });
        let main = self.main.end_update(ctx).scalar();

        let slot = ctx.timeline.slot();
        let rising = main > PRESS_THRESHOLD && self.main_previous[slot] <= PRESS_THRESHOLD;
        if self.active[slot] {
            self.active[slot] = main > PRESS_THRESHOLD;
        } else {
            self.active[slot] = rising && modifiers_held;
        }
        self.main_previous[slot] = main;

        Value::Scalar(if self.active[slot] { main } else { 0.0 })
    }
}
