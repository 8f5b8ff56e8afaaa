// Controls: named, indexed, enable-gated value cells

use super::cell::{Timeline, ValueCell};
use super::provider::ProviderId;
use super::value::{ControlKind, ControlValue, Value, PRESS_THRESHOLD};
use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Content-stable identity of a control: hash of its declared name and kind
///
/// Bindings store this instead of a table position so they survive layout
/// changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ControlHash(pub u32);

impl ControlHash {
    /// FNV-1a over the name bytes followed by the kind tag
    pub fn new(name: &str, kind: ControlKind) -> Self {
        let mut hash = FNV_OFFSET;
        for byte in name.bytes().chain(std::iter::once(kind.tag())) {
            hash ^= byte as u32;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        Self(hash)
    }
}

/// Declaration of one control in a layout
#[derive(Debug, Clone, PartialEq)]
pub struct ControlDescriptor {
    pub name: String,
    pub kind: ControlKind,
    /// Reset to default at the start of every update (relative controls)
    pub resets_each_frame: bool,
}

impl ControlDescriptor {
    pub fn new(name: impl Into<String>, kind: ControlKind) -> Self {
        Self {
            name: name.into(),
            kind,
            resets_each_frame: false,
        }
    }

    pub fn button(name: impl Into<String>) -> Self {
        Self::new(name, ControlKind::Button)
    }

    pub fn axis(name: impl Into<String>) -> Self {
        Self::new(name, ControlKind::Axis)
    }

    pub fn vector2(name: impl Into<String>) -> Self {
        Self::new(name, ControlKind::Vector2)
    }

    pub fn vector3(name: impl Into<String>) -> Self {
        Self::new(name, ControlKind::Vector3)
    }

    pub fn quaternion(name: impl Into<String>) -> Self {
        Self::new(name, ControlKind::Quaternion)
    }

    /// Mark as a relative control that accumulates within one update
    pub fn resetting(mut self) -> Self {
        self.resets_each_frame = true;
        self
    }

    pub fn hash(&self) -> ControlHash {
        ControlHash::new(&self.name, self.kind)
    }
}

/// A single typed input endpoint
#[derive(Debug, Clone)]
pub struct Control<T> {
    index: usize,
    name: String,
    hash: ControlHash,
    provider: ProviderId,
    enabled: bool,
    resets_each_frame: bool,
    cell: ValueCell<T>,
}

impl<T: ControlValue> Control<T> {
    /// Create a control at `index` of the table owned by `provider`
    pub fn new(index: usize, descriptor: &ControlDescriptor, provider: ProviderId) -> Self {
        Self {
            index,
            name: descriptor.name.clone(),
            hash: descriptor.hash(),
            provider,
            enabled: true,
            resets_each_frame: descriptor.resets_each_frame,
            cell: ValueCell::new(T::default()),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename for display; the hash keeps the declared name
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn hash(&self) -> ControlHash {
        self.hash
    }

    /// Key of the owning provider, for lookups only
    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn default_value(&self) -> T {
        self.cell.default_value()
    }

    /// Current value; disabled controls report their default
    pub fn value(&self, timeline: Timeline) -> T {
        if self.enabled {
            self.cell.current(timeline)
        } else {
            self.cell.default_value()
        }
    }

    pub fn previous_value(&self, timeline: Timeline) -> T {
        if self.enabled {
            self.cell.previous(timeline)
        } else {
            self.cell.default_value()
        }
    }

    pub fn raw_value(&self, timeline: Timeline) -> T {
        if self.enabled {
            self.cell.raw(timeline)
        } else {
            self.cell.default_value()
        }
    }

    /// Write an event value into both timelines
    ///
    /// Returns false when the control is disabled and refuses the write.
    pub fn set_from_event(&mut self, raw: T, value: T) -> bool {
        if !self.enabled {
            return false;
        }
        self.cell.set_from_event(raw, value);
        true
    }

    /// Fold a relative event value into both timelines
    pub fn accumulate_from_event(&mut self, delta: T) -> bool {
        if !self.enabled {
            return false;
        }
        for timeline in Timeline::ALL {
            let next = self.cell.current(timeline).accumulate(delta);
            self.cell.set(timeline, next);
        }
        true
    }

    /// Write the live timeline only, used by end-of-update combination
    pub fn set_value(&mut self, timeline: Timeline, value: T) {
        self.cell.set(timeline, value);
    }

    /// Capture the live timeline's previous value, then clear relative controls
    pub fn advance(&mut self, timeline: Timeline) {
        self.cell.advance(timeline);
        if self.resets_each_frame {
            self.cell.set(timeline, self.cell.default_value());
        }
    }

    pub fn changed(&self, timeline: Timeline) -> bool {
        self.value(timeline) != self.previous_value(timeline)
    }

    pub fn reset(&mut self) {
        self.cell.reset();
    }

    /// Hand the control to another table: new owner, default state
    pub fn rehome(&mut self, provider: ProviderId) {
        self.provider = provider;
        self.cell.reset();
    }
}

impl Control<f32> {
    pub fn is_pressed(&self, timeline: Timeline) -> bool {
        self.value(timeline) > PRESS_THRESHOLD
    }

    /// Crossed the press threshold since the last advance
    pub fn was_just_pressed(&self, timeline: Timeline) -> bool {
        self.value(timeline) > PRESS_THRESHOLD && self.previous_value(timeline) <= PRESS_THRESHOLD
    }

    pub fn was_just_released(&self, timeline: Timeline) -> bool {
        self.value(timeline) <= PRESS_THRESHOLD && self.previous_value(timeline) > PRESS_THRESHOLD
    }

    /// Pressed now and at the last advance
    pub fn is_held(&self, timeline: Timeline) -> bool {
        self.value(timeline) > PRESS_THRESHOLD && self.previous_value(timeline) > PRESS_THRESHOLD
    }
}

/// A control of any kind, as stored in a state table
#[derive(Debug, Clone)]
pub enum AnyControl {
    Button(Control<f32>),
    Axis(Control<f32>),
    Vector2(Control<Vec2>),
    Vector3(Control<Vec3>),
    Quaternion(Control<Quat>),
}

/// Apply the same expression to whichever typed control is inside
macro_rules! with_control {
    ($any:expr, $control:ident => $body:expr) => {
        match $any {
            AnyControl::Button($control) | AnyControl::Axis($control) => $body,
            AnyControl::Vector2($control) => $body,
            AnyControl::Vector3($control) => $body,
            AnyControl::Quaternion($control) => $body,
        }
    };
}

impl AnyControl {
    /// Allocate a control for `descriptor`
    pub fn new(index: usize, descriptor: &ControlDescriptor, provider: ProviderId) -> Self {
        match descriptor.kind {
            ControlKind::Button => Self::Button(Control::new(index, descriptor, provider)),
            ControlKind::Axis => Self::Axis(Control::new(index, descriptor, provider)),
            ControlKind::Vector2 => Self::Vector2(Control::new(index, descriptor, provider)),
            ControlKind::Vector3 => Self::Vector3(Control::new(index, descriptor, provider)),
            ControlKind::Quaternion => Self::Quaternion(Control::new(index, descriptor, provider)),
        }
    }

    pub fn kind(&self) -> ControlKind {
        match self {
            Self::Button(_) => ControlKind::Button,
            Self::Axis(_) => ControlKind::Axis,
            Self::Vector2(_) => ControlKind::Vector2,
            Self::Vector3(_) => ControlKind::Vector3,
            Self::Quaternion(_) => ControlKind::Quaternion,
        }
    }

    pub fn index(&self) -> usize {
        with_control!(self, c => c.index())
    }

    pub fn name(&self) -> &str {
        with_control!(self, c => c.name())
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        with_control!(self, c => c.set_name(name))
    }

    pub fn hash(&self) -> ControlHash {
        with_control!(self, c => c.hash())
    }

    pub fn provider(&self) -> ProviderId {
        with_control!(self, c => c.provider())
    }

    pub fn is_enabled(&self) -> bool {
        with_control!(self, c => c.is_enabled())
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        with_control!(self, c => c.set_enabled(enabled))
    }

    pub fn value(&self, timeline: Timeline) -> Value {
        with_control!(self, c => c.value(timeline).into_value())
    }

    pub fn previous_value(&self, timeline: Timeline) -> Value {
        with_control!(self, c => c.previous_value(timeline).into_value())
    }

    pub fn raw_value(&self, timeline: Timeline) -> Value {
        with_control!(self, c => c.raw_value(timeline).into_value())
    }

    pub fn default_value(&self) -> Value {
        with_control!(self, c => c.default_value().into_value())
    }

    /// Event write; a disabled control or a value of another kind is refused
    pub fn set_from_event(&mut self, raw: Value, value: Value) -> bool {
        with_control!(self, c => {
            match (ControlValue::from_value(raw), ControlValue::from_value(value)) {
                (Some(raw), Some(value)) => c.set_from_event(raw, value),
                _ => false,
            }
        })
    }

    /// Relative event write; refused like [`AnyControl::set_from_event`]
    pub fn accumulate_from_event(&mut self, delta: Value) -> bool {
        with_control!(self, c => match ControlValue::from_value(delta) {
            Some(delta) => c.accumulate_from_event(delta),
            None => false,
        })
    }

    /// Live-timeline write
    ///
    /// # Panics
    /// Panics when `value` is not of this control's kind.
    pub fn set_value(&mut self, timeline: Timeline, value: Value) {
        let kind = self.kind();
        with_control!(self, c => match ControlValue::from_value(value) {
            Some(value) => c.set_value(timeline, value),
            None => panic!("cannot write {:?} into a {:?} control", value, kind),
        })
    }

    pub fn advance(&mut self, timeline: Timeline) {
        with_control!(self, c => c.advance(timeline))
    }

    pub fn changed(&self, timeline: Timeline) -> bool {
        with_control!(self, c => c.changed(timeline))
    }

    pub fn reset(&mut self) {
        with_control!(self, c => c.reset())
    }

    pub fn rehome(&mut self, provider: ProviderId) {
        with_control!(self, c => c.rehome(provider))
    }

    /// The scalar control inside a button or axis
    ///
    /// # Panics
    /// Panics for vector and quaternion controls.
    pub fn scalar(&self) -> &Control<f32> {
        match self {
            Self::Button(c) | Self::Axis(c) => c,
            other => panic!("control '{}' is {:?}, not scalar", other.name(), other.kind()),
        }
    }

    pub fn scalar_mut(&mut self) -> &mut Control<f32> {
        match self {
            Self::Button(c) | Self::Axis(c) => c,
            other => panic!("control '{}' is {:?}, not scalar", other.name(), other.kind()),
        }
    }
}
