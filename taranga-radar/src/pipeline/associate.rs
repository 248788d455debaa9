//! Detection-to-track association.
//!
//! Each usable detection is tested for containment against every track's
//! predicted oriented bounding box; among the containing tracks the one
//! with the smallest range-rate Mahalanobis distance wins, subject to the
//! gate. Association also accumulates per-track moving votes that decide
//! whether a track (and its detections) count as moveable.

use crate::config::RadarCalibration;
use crate::core::math::micros_to_seconds;
use crate::core::{EnhancedDetections, Point2D, VehicleMotionState};

use super::classify::{detection_angle_iso, range_rate_sigma};
use super::AssociationSettings;

/// Snapshot of one fused track used for association.
///
/// VCS axis order here: `x` longitudinal, `y` lateral.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct TrackState {
    pub position: Point2D,
    pub velocity: Point2D,
    pub acceleration: Point2D,
    pub length: f32,
    pub width: f32,
    pub height: f32,
    pub heading: f32,
    pub heading_rate: f32,
    pub is_stationary: bool,
    pub is_moveable: bool,
    pub moving_votes: f32,
}

/// Axis-aligned box rotated by a heading.
#[derive(Clone, Copy, Debug)]
struct OrientedBox {
    center: Point2D,
    half_length: f32,
    half_width: f32,
    heading: f32,
}

impl OrientedBox {
    fn contains(&self, point: Point2D) -> bool {
        let delta = point - self.center;
        let cos_h = (-self.heading).cos();
        let sin_h = (-self.heading).sin();
        let local_x = delta.x * cos_h - delta.y * sin_h;
        let local_y = delta.x * sin_h + delta.y * cos_h;
        local_x.abs() <= self.half_length && local_y.abs() <= self.half_width
    }
}

/// Detection position in the VCS (x longitudinal, y lateral).
///
/// Offsets win when present; otherwise the position is reconstructed from
/// range and refined azimuth, then from range and the raw azimuth mapped
/// through the sensor's VCS orientation, before translating by the mount.
fn detection_position_vcs(
    longitudinal_offset_m: f32,
    lateral_offset_m: f32,
    range_m: f32,
    azimuth_rad: f32,
    azimuth_raw_rad: f32,
    calibration: &RadarCalibration,
) -> Point2D {
    let mut lon = longitudinal_offset_m;
    let mut lat = lateral_offset_m;

    if lon == 0.0 && lat == 0.0 && range_m > 0.0 {
        lon = range_m * azimuth_rad.cos();
        lat = range_m * azimuth_rad.sin();
    }

    if lon == 0.0 && lat == 0.0 && range_m > 0.0 {
        let vcs_angle = -azimuth_raw_rad * calibration.polarity + calibration.vcs.orientation_rad;
        lon = range_m * vcs_angle.cos();
        lat = range_m * vcs_angle.sin();
    }

    Point2D::new(
        lon + calibration.vcs.longitudinal_m,
        lat + calibration.vcs.lateral_m,
    )
}

/// Associate one enhanced frame against the current track snapshot.
pub(crate) fn associate_detections(
    detections: &mut EnhancedDetections,
    tracks: &mut [TrackState],
    tracks_timestamp_us: u64,
    observation_time_us: u64,
    calibration: &RadarCalibration,
    motion: &VehicleMotionState,
    settings: &AssociationSettings,
) {
    if tracks.is_empty() {
        return;
    }

    let sigma = range_rate_sigma(calibration);
    let dt = micros_to_seconds(observation_time_us.saturating_sub(tracks_timestamp_us));

    let boxes: Vec<OrientedBox> = tracks
        .iter()
        .map(|track| {
            let position =
                track.position + track.velocity * dt + track.acceleration * (0.5 * dt * dt);
            OrientedBox {
                center: position,
                half_length: track.length.max(0.1) * 0.5 * settings.bounding_box_scale,
                half_width: track.width.max(0.1) * 0.5 * settings.bounding_box_scale,
                heading: track.heading + track.heading_rate * dt,
            }
        })
        .collect();

    for det in &mut detections.detections {
        if !det.is_usable() {
            continue;
        }

        let position = detection_position_vcs(
            det.longitudinal_offset_m,
            det.lateral_offset_m,
            det.range_m,
            det.azimuth_rad,
            det.azimuth_raw_rad,
            calibration,
        );
        let angle = detection_angle_iso(det.azimuth_raw_rad, calibration);
        let model = Point2D::new(-angle.cos(), -angle.sin());

        let mut best_distance = f32::MAX;
        let mut best_index = boxes.len();

        for (i, oriented_box) in boxes.iter().enumerate() {
            if !oriented_box.contains(position) {
                continue;
            }

            let relative_velocity =
                Point2D::new(motion.v_lon_mps, motion.v_lat_mps) - tracks[i].velocity;
            let predicted = relative_velocity.dot(model);
            let m_dist = (det.range_rate_ms - predicted).abs() / sigma;

            if m_dist <= settings.range_rate_sigma && m_dist < best_distance {
                best_distance = m_dist;
                best_index = i;
            }
        }

        if best_index < boxes.len() {
            let track = &mut tracks[best_index];
            let mut moveable = track.is_moveable;
            if !track.is_moveable {
                let vote = if det.is_stationary {
                    -det.stationary_probability
                } else {
                    1.0 - det.stationary_probability
                };
                track.moving_votes = (track.moving_votes + vote).clamp(-100.0, 100.0);
                moveable = track.moving_votes > 0.0;
            }

            det.is_moveable = moveable;
            det.is_static = det.is_stationary && !det.is_moveable;
            det.fused_track_index = best_index as i8;
        }
    }
}
