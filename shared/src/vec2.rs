/// 2D vector utilities for the pitch simulation.
/// Coordinates are in canvas pixels with Y pointing down; angles are radians.

#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Shorthand constructor
pub fn vec2(x: f64, y: f64) -> Vec2 {
    Vec2::new(x, y)
}

/// Dot product
pub fn dot(a: Vec2, b: Vec2) -> f64 {
    a.x * b.x + a.y * b.y
}

/// Vector length
pub fn length(v: Vec2) -> f64 {
    v.x.hypot(v.y)
}

/// Distance between two points
pub fn distance(a: Vec2, b: Vec2) -> f64 {
    length(sub(b, a))
}

/// Normalize vector to unit length. Degenerate vectors map to +X.
pub fn normalize(v: Vec2) -> Vec2 {
    let len = length(v);
    if len < 1e-10 {
        return Vec2::new(1.0, 0.0);
    }
    Vec2::new(v.x / len, v.y / len)
}

/// Scale vector by scalar
pub fn scale(v: Vec2, s: f64) -> Vec2 {
    Vec2::new(v.x * s, v.y * s)
}

/// Add two vectors
pub fn add(a: Vec2, b: Vec2) -> Vec2 {
    Vec2::new(a.x + b.x, a.y + b.y)
}

/// Subtract vectors (a - b)
pub fn sub(a: Vec2, b: Vec2) -> Vec2 {
    Vec2::new(a.x - b.x, a.y - b.y)
}

/// Unit vector pointing along `heading`.
pub fn from_angle(heading: f64) -> Vec2 {
    Vec2::new(heading.cos(), heading.sin())
}

/// Split a world-frame velocity into (forward, lateral) components relative to `heading`.
/// Equivalent to rotating the vector by `-heading`.
pub fn to_local(v: Vec2, heading: f64) -> (f64, f64) {
    let (sin, cos) = heading.sin_cos();
    (v.x * cos + v.y * sin, -v.x * sin + v.y * cos)
}

/// Inverse of [`to_local`].
pub fn from_local(forward: f64, lateral: f64, heading: f64) -> Vec2 {
    let (sin, cos) = heading.sin_cos();
    Vec2::new(cos * forward - sin * lateral, sin * forward + cos * lateral)
}

/// Scale `v` down so its length does not exceed `max`, keeping direction.
pub fn clamp_length(v: Vec2, max: f64) -> Vec2 {
    let len = length(v);
    if len > max && len > 0.0 {
        scale(v, max / len)
    } else {
        v
    }
}

/// Apply a per-tick friction coefficient in [0, 1].
#[inline]
pub fn damp(value: f64, friction: f64) -> f64 {
    value * (1.0 - friction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    const EPS: f64 = 1e-9;

    #[test]
    fn local_frame_roundtrips_for_any_heading() {
        let v = vec2(3.0, -1.5);
        for i in 0..16 {
            let heading = i as f64 * PI / 8.0 - 7.0;
            let (f, l) = to_local(v, heading);
            let back = from_local(f, l, heading);
            assert!((back.x - v.x).abs() < EPS);
            assert!((back.y - v.y).abs() < EPS);
        }
    }

    #[test]
    fn forward_component_follows_heading() {
        // Heading pi/2 points down the screen (+Y)
        let (f, l) = to_local(vec2(0.0, 2.0), FRAC_PI_2);
        assert!((f - 2.0).abs() < EPS);
        assert!(l.abs() < EPS);
    }

    #[test]
    fn clamp_length_preserves_direction() {
        let v = clamp_length(vec2(6.0, 8.0), 5.0);
        assert!((length(v) - 5.0).abs() < EPS);
        assert!((v.x / v.y - 0.75).abs() < EPS);
    }

    #[test]
    fn clamp_length_leaves_short_vectors() {
        let v = vec2(1.0, 1.0);
        assert_eq!(clamp_length(v, 4.0), v);
        assert_eq!(clamp_length(Vec2::ZERO, 4.0), Vec2::ZERO);
    }

    #[test]
    fn normalize_degenerate_is_unit_x() {
        assert_eq!(normalize(Vec2::ZERO), vec2(1.0, 0.0));
        assert!((length(normalize(vec2(-3.0, 4.0))) - 1.0).abs() < EPS);
    }

    #[test]
    fn damp_scales_by_complement() {
        assert!((damp(10.0, 0.3) - 7.0).abs() < EPS);
    }
}
