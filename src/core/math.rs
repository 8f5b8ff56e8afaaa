// Math utilities and helper functions

/// Clamp a value between min and max
pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Linear interpolation
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Inverse of [`lerp`]: where `value` sits between `a` and `b`
///
/// Returns 0.0 for a degenerate range instead of dividing by zero.
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if approx_equal(a, b, f32::EPSILON) {
        0.0
    } else {
        (value - a) / (b - a)
    }
}

/// Linearly map `value` from the `from` range onto the `to` range
///
/// No clamping is applied, values outside `from` extrapolate.
pub fn remap(value: f32, from: (f32, f32), to: (f32, f32)) -> f32 {
    lerp(to.0, to.1, inverse_lerp(from.0, from.1, value))
}

/// Check if two f32 values are approximately equal
pub fn approx_equal(a: f32, b: f32, epsilon: f32) -> bool {
    (a - b).abs() < epsilon
}
