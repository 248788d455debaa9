//! Stationary / moveable classification of enhanced detections.
//!
//! Each detection's Doppler measurement, yaw-compensated, is compared with
//! the Doppler a stationary world point would produce under the current ego
//! motion. The normalized residual gates the stationary decision.

use std::f32::consts::SQRT_2;

use crate::config::RadarCalibration;
use crate::core::math::erf;
use crate::core::{EnhancedDetections, VehicleMotionState};

/// Detection bearing in the ISO frame.
#[inline]
pub(crate) fn detection_angle_iso(azimuth_raw_rad: f32, calibration: &RadarCalibration) -> f32 {
    -azimuth_raw_rad * calibration.polarity + calibration.iso.orientation_rad
}

/// Doppler residual standard deviation for a sensor, floored so a zeroed
/// calibration cannot collapse the gate.
#[inline]
pub(crate) fn range_rate_sigma(calibration: &RadarCalibration) -> f32 {
    let sigma = (calibration.range_rate_accuracy_mps / 3.0).max(0.01);
    (sigma * sigma).max(1e-4).sqrt()
}

#[inline]
fn yaw_compensation(
    motion: &VehicleMotionState,
    calibration: &RadarCalibration,
    detection_angle: f32,
) -> f32 {
    motion.yaw_rate_rps
        * (calibration.iso.longitudinal_m * detection_angle.sin()
            - calibration.iso.lateral_m * detection_angle.cos())
}

/// Classify every detection in the frame and reset its association fields.
pub(crate) fn classify_detections(
    detections: &mut EnhancedDetections,
    calibration: &RadarCalibration,
    motion: &VehicleMotionState,
    n_sigma: f32,
) {
    let sigma = range_rate_sigma(calibration);

    for det in &mut detections.detections {
        det.fused_track_index = -1;
        det.is_moveable = false;

        let angle = detection_angle_iso(det.azimuth_raw_rad, calibration);
        let compensated = det.range_rate_ms + yaw_compensation(motion, calibration, angle);
        let predicted = -(motion.v_lon_mps * angle.cos() + motion.v_lat_mps * angle.sin());

        let m_dist = (compensated - predicted).abs() / sigma;
        det.is_stationary = m_dist <= n_sigma;
        det.stationary_probability = (1.0 - erf(m_dist / SQRT_2)).clamp(0.0, 1.0);
        det.is_static = det.is_stationary;
    }
}
