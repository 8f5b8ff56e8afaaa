// Control value kinds and their combination laws

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Value above which a scalar control counts as pressed
pub const PRESS_THRESHOLD: f32 = 0.5;

/// Tolerance used when testing a quaternion against identity
const IDENTITY_EPSILON: f32 = 1.0e-6;

/// The closed set of control kinds a state table can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlKind {
    Button,
    Axis,
    Vector2,
    Vector3,
    Quaternion,
}

impl ControlKind {
    /// Stable tag mixed into control hashes
    pub fn tag(&self) -> u8 {
        match self {
            Self::Button => 0,
            Self::Axis => 1,
            Self::Vector2 => 2,
            Self::Vector3 => 3,
            Self::Quaternion => 4,
        }
    }

    /// Neutral value for this kind
    pub fn default_value(&self) -> Value {
        match self {
            Self::Button | Self::Axis => Value::Scalar(0.0),
            Self::Vector2 => Value::Vector2(Vec2::ZERO),
            Self::Vector3 => Value::Vector3(Vec3::ZERO),
            Self::Quaternion => Value::Quaternion(Quat::IDENTITY),
        }
    }

    /// Buttons and axes share the scalar representation
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Button | Self::Axis)
    }
}

/// Capabilities every control value type provides
///
/// The combination law lives here, on the value type, so device state and
/// binding roots combine multiple sources the same way.
pub trait ControlValue: Copy + PartialEq + Debug + Default + 'static {
    /// Combine two sources bound to the same endpoint, `self` came first
    fn combine(self, other: Self) -> Self;

    /// Magnitude used for dead zones and response curves
    fn magnitude(self) -> f32;

    /// Scale the magnitude, keeping direction
    fn scaled(self, factor: f32) -> Self;

    /// Point the other way
    fn inverted(self) -> Self;

    /// Move toward `target` by at most `max_delta`
    fn approach(self, target: Self, max_delta: f32) -> Self;

    /// Fold a relative change into the current value
    fn accumulate(self, delta: Self) -> Self;

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Option<Self>;
}

impl ControlValue for f32 {
    fn combine(self, other: Self) -> Self {
        if other.abs() > self.abs() {
            other
        } else {
            self
        }
    }

    fn magnitude(self) -> f32 {
        self.abs()
    }

    fn scaled(self, factor: f32) -> Self {
        self * factor
    }

    fn inverted(self) -> Self {
        -self
    }

    fn approach(self, target: Self, max_delta: f32) -> Self {
        let diff = target - self;
        if diff.abs() <= max_delta {
            target
        } else {
            self + diff.signum() * max_delta
        }
    }

    fn accumulate(self, delta: Self) -> Self {
        self + delta
    }

    fn into_value(self) -> Value {
        Value::Scalar(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Scalar(v) => Some(v),
            _ => None,
        }
    }
}

impl ControlValue for Vec2 {
    fn combine(self, other: Self) -> Self {
        if other.length_squared() > self.length_squared() {
            other
        } else {
            self
        }
    }

    fn magnitude(self) -> f32 {
        self.length()
    }

    fn scaled(self, factor: f32) -> Self {
        self * factor
    }

    fn inverted(self) -> Self {
        -self
    }

    fn approach(self, target: Self, max_delta: f32) -> Self {
        self + (target - self).clamp_length_max(max_delta)
    }

    fn accumulate(self, delta: Self) -> Self {
        self + delta
    }

    fn into_value(self) -> Value {
        Value::Vector2(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Vector2(v) => Some(v),
            _ => None,
        }
    }
}

impl ControlValue for Vec3 {
    fn combine(self, other: Self) -> Self {
        if other.length_squared() > self.length_squared() {
            other
        } else {
            self
        }
    }

    fn magnitude(self) -> f32 {
        self.length()
    }

    fn scaled(self, factor: f32) -> Self {
        self * factor
    }

    fn inverted(self) -> Self {
        -self
    }

    fn approach(self, target: Self, max_delta: f32) -> Self {
        self + (target - self).clamp_length_max(max_delta)
    }

    fn accumulate(self, delta: Self) -> Self {
        self + delta
    }

    fn into_value(self) -> Value {
        Value::Vector3(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Vector3(v) => Some(v),
            _ => None,
        }
    }
}

impl ControlValue for Quat {
    /// First non-identity rotation wins
    fn combine(self, other: Self) -> Self {
        if self.abs_diff_eq(Quat::IDENTITY, IDENTITY_EPSILON) {
            other
        } else {
            self
        }
    }

    /// Rotation angle away from identity, in radians
    fn magnitude(self) -> f32 {
        Quat::IDENTITY.angle_between(self)
    }

    fn scaled(self, factor: f32) -> Self {
        Quat::IDENTITY.slerp(self, factor)
    }

    fn inverted(self) -> Self {
        self.inverse()
    }

    fn approach(self, target: Self, max_delta: f32) -> Self {
        let angle = self.angle_between(target);
        if angle <= max_delta || angle <= f32::EPSILON {
            target
        } else {
            self.slerp(target, max_delta / angle)
        }
    }

    fn accumulate(self, delta: Self) -> Self {
        (delta * self).normalize()
    }

    fn into_value(self) -> Value {
        Value::Quaternion(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Quaternion(v) => Some(v),
            _ => None,
        }
    }
}

/// A control value of any kind, as produced by binding trees and events
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Scalar(f32),
    Vector2(Vec2),
    Vector3(Vec3),
    Quaternion(Quat),
}

impl Value {
    /// Read as a scalar
    ///
    /// # Panics
    /// Panics on any other kind; a mismatch means the binding graph is corrupt.
    pub fn scalar(&self) -> f32 {
        self.try_scalar()
            .unwrap_or_else(|| panic!("expected a scalar control value, got {:?}", self))
    }

    pub fn try_scalar(&self) -> Option<f32> {
        f32::from_value(*self)
    }

    /// Read as a 2D vector
    ///
    /// # Panics
    /// Panics on any other kind.
    pub fn vector2(&self) -> Vec2 {
        Vec2::from_value(*self)
            .unwrap_or_else(|| panic!("expected a Vector2 control value, got {:?}", self))
    }

    /// Read as a 3D vector
    ///
    /// # Panics
    /// Panics on any other kind.
    pub fn vector3(&self) -> Vec3 {
        Vec3::from_value(*self)
            .unwrap_or_else(|| panic!("expected a Vector3 control value, got {:?}", self))
    }

    /// Read as a rotation
    ///
    /// # Panics
    /// Panics on any other kind.
    pub fn quaternion(&self) -> Quat {
        Quat::from_value(*self)
            .unwrap_or_else(|| panic!("expected a Quaternion control value, got {:?}", self))
    }

    /// Whether this value can be stored in a control of `kind`
    pub fn fits(&self, kind: ControlKind) -> bool {
        matches!(
            (self, kind),
            (Self::Scalar(_), ControlKind::Button | ControlKind::Axis)
                | (Self::Vector2(_), ControlKind::Vector2)
                | (Self::Vector3(_), ControlKind::Vector3)
                | (Self::Quaternion(_), ControlKind::Quaternion)
        )
    }

    /// Combine two values of the same kind with that kind's law
    ///
    /// # Panics
    /// Panics when the kinds differ.
    pub fn combine(self, other: Value) -> Value {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => Self::Scalar(a.combine(b)),
            (Self::Vector2(a), Self::Vector2(b)) => Self::Vector2(a.combine(b)),
            (Self::Vector3(a), Self::Vector3(b)) => Self::Vector3(a.combine(b)),
            (Self::Quaternion(a), Self::Quaternion(b)) => Self::Quaternion(a.combine(b)),
            (a, b) => panic!("cannot combine {:?} with {:?}", a, b),
        }
    }

    /// Fold a list of sources with the combination law
    pub fn combine_all<I: IntoIterator<Item = Value>>(values: I) -> Option<Value> {
        values.into_iter().reduce(Value::combine)
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Scalar(0.0)
    }
}
