//! Scalar math helpers shared across the engine.

use std::f32::consts::PI;

/// Degrees to radians.
#[inline]
pub fn deg_to_rad(degrees: f32) -> f32 {
    degrees * (PI / 180.0)
}

/// Radians to degrees.
#[inline]
pub fn rad_to_deg(radians: f32) -> f32 {
    radians * (180.0 / PI)
}

/// Square of a value.
#[inline]
pub fn squared(value: f32) -> f32 {
    value * value
}

/// Wrap an angle in radians into `[-pi, pi)`.
#[inline]
pub fn wrap_to_pi(angle_rad: f32) -> f32 {
    let mut wrapped = (angle_rad + PI) % (2.0 * PI);
    if wrapped < 0.0 {
        wrapped += 2.0 * PI;
    }
    wrapped - PI
}

/// Wrap an angle in degrees into `[-180, 180)`.
#[inline]
pub fn wrap_deg_to_180(angle_deg: f32) -> f32 {
    let mut wrapped = (angle_deg + 180.0) % 360.0;
    if wrapped < 0.0 {
        wrapped += 360.0;
    }
    wrapped - 180.0
}

/// Seconds to whole microseconds, saturating at zero for negative input.
#[inline]
pub fn seconds_to_micros(seconds: f32) -> u64 {
    if seconds <= 0.0 {
        0
    } else {
        (seconds * 1e6) as u64
    }
}

/// Microseconds to seconds.
#[inline]
pub fn micros_to_seconds(micros: u64) -> f32 {
    micros as f32 * 1e-6
}

/// Gauss error function.
///
/// Abramowitz & Stegun 7.1.26 rational approximation, maximum absolute
/// error 1.5e-7, which is below f32 resolution over the useful domain.
pub fn erf(x: f32) -> f32 {
    const A1: f32 = 0.254_829_592;
    const A2: f32 = -0.284_496_736;
    const A3: f32 = 1.421_413_741;
    const A4: f32 = -1.453_152_027;
    const A5: f32 = 1.061_405_429;
    const P: f32 = 0.327_591_1;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    sign * (1.0 - poly * (-x * x).exp())
}
