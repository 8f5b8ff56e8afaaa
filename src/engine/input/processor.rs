// Post-processing stages applied after a binding root combines its sources

use super::value::{ControlValue, Value};
use crate::core::math;
use serde::{Deserialize, Serialize};

/// Below this a value has no meaningful direction
const MIN_MAGNITUDE: f32 = 1.0e-6;

/// One value transform in a processing chain
///
/// Every stage is a pure function of the incoming value, the control's
/// previous value and the update's delta time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Processor {
    Invert,
    Scale {
        factor: f32,
    },
    /// Magnitudes below `inner` become neutral, `inner..outer` rescales to 0..1
    DeadZone {
        inner: f32,
        outer: f32,
    },
    Clamp {
        max_magnitude: f32,
    },
    /// Piecewise-linear mapping of magnitude through `(input, output)` points
    ResponseCurve {
        points: Vec<(f32, f32)>,
    },
    /// Smooth toward the incoming value at `rate` units per second
    Approach {
        rate: f32,
    },
    /// Turn a per-update delta into a per-second rate
    DeltaToRate,
}

/// Scale the magnitude of `value` through `f`, keeping its direction
fn map_magnitude<T: ControlValue>(value: T, f: impl Fn(f32) -> f32) -> T {
    let magnitude = value.magnitude();
    if magnitude <= MIN_MAGNITUDE {
        return value;
    }
    value.scaled(f(magnitude) / magnitude)
}

fn evaluate_curve(points: &[(f32, f32)], x: f32) -> f32 {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return x;
    };
    if x <= first.0 {
        return first.1;
    }
    if x >= last.0 {
        return last.1;
    }
    points
        .windows(2)
        .find(|pair| x <= pair[1].0)
        .map(|pair| {
            let t = math::inverse_lerp(pair[0].0, pair[1].0, x);
            math::lerp(pair[0].1, pair[1].1, t)
        })
        .unwrap_or(last.1)
}

impl Processor {
    /// Apply this stage to a typed value
    pub fn apply<T: ControlValue>(&self, value: T, previous: T, delta_time: f32) -> T {
        match self {
            Self::Invert => value.inverted(),
            Self::Scale { factor } => value.scaled(*factor),
            Self::DeadZone { inner, outer } => {
                if value.magnitude() < *inner {
                    T::default()
                } else {
                    let span = (outer - inner).max(MIN_MAGNITUDE);
                    map_magnitude(value, |m| math::clamp((m - inner) / span, 0.0, 1.0))
                }
            }
            Self::Clamp { max_magnitude } => map_magnitude(value, |m| m.min(*max_magnitude)),
            Self::ResponseCurve { points } => map_magnitude(value, |m| evaluate_curve(points, m)),
            Self::Approach { rate } => previous.approach(value, rate * delta_time),
            Self::DeltaToRate => {
                if delta_time > 0.0 {
                    value.scaled(1.0 / delta_time)
                } else {
                    value
                }
            }
        }
    }

    /// Apply this stage to an untyped value
    ///
    /// # Panics
    /// Panics when `value` and `previous` are of different kinds.
    pub fn apply_value(&self, value: Value, previous: Value, delta_time: f32) -> Value {
        match (value, previous) {
            (Value::Scalar(v), Value::Scalar(p)) => Value::Scalar(self.apply(v, p, delta_time)),
            (Value::Vector2(v), Value::Vector2(p)) => Value::Vector2(self.apply(v, p, delta_time)),
            (Value::Vector3(v), Value::Vector3(p)) => Value::Vector3(self.apply(v, p, delta_time)),
            (Value::Quaternion(v), Value::Quaternion(p)) => {
                Value::Quaternion(self.apply(v, p, delta_time))
            }
            (v, p) => panic!("processor input {:?} does not match previous {:?}", v, p),
        }
    }
}

/// Run `processors` in list order
pub fn process_chain(
    processors: &[Processor],
    value: Value,
    previous: Value,
    delta_time: f32,
) -> Value {
    processors
        .iter()
        .fold(value, |value, processor| processor.apply_value(value, previous, delta_time))
}
