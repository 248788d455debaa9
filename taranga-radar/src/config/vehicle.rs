//! Vehicle calibration bundle loaded from the vehicle INI file.

use std::path::Path;

use crate::core::math::deg_to_rad;
use crate::core::{Point2D, SensorIndex};
use crate::error::{RadarError, Result};

use super::ini::IniFile;

/// Most contour points the file format can carry (`contourPt0..contourPt63`).
const MAX_CONTOUR_POINTS: usize = 64;

/// Mounting pose of one radar unit in a single frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RadarPose {
    pub longitudinal_m: f32,
    pub lateral_m: f32,
    pub height_m: f32,
    pub orientation_rad: f32,
}

/// Full calibration of one radar unit: the configured VCS pose, the derived
/// ISO pose, and the measurement accuracies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadarCalibration {
    pub vcs: RadarPose,
    pub iso: RadarPose,
    pub polarity: f32,
    pub range_rate_accuracy_mps: f32,
    pub azimuth_accuracy_rad: f32,
    pub horizontal_fov_rad: f32,
}

impl Default for RadarCalibration {
    fn default() -> Self {
        Self {
            vcs: RadarPose::default(),
            iso: RadarPose::default(),
            polarity: 1.0,
            range_rate_accuracy_mps: 0.0,
            azimuth_accuracy_rad: 0.0,
            horizontal_fov_rad: 0.0,
        }
    }
}

impl RadarCalibration {
    /// Recompute the ISO pose from the VCS pose. The ISO frame sits at the
    /// front bumper with the lateral axis reversed.
    fn update_iso_pose(&mut self, dist_rear_axle_to_front_bumper_m: f32) {
        self.iso.lateral_m = -self.vcs.lateral_m;
        self.iso.longitudinal_m = self.vcs.longitudinal_m + dist_rear_axle_to_front_bumper_m;
        self.iso.height_m = self.vcs.height_m;
        self.iso.orientation_rad = -self.vcs.orientation_rad;
    }
}

/// Immutable calibration bundle for the whole vehicle.
#[derive(Clone, Debug, Default)]
pub struct VehicleParameters {
    pub dist_rear_axle_to_front_bumper_m: f32,
    pub corner_hw_delay_s: f32,
    pub front_center_hw_delay_s: f32,
    calibrations: [RadarCalibration; SensorIndex::COUNT],
    /// Vehicle contour polyline in ISO order, as loaded.
    pub contour_iso: Vec<Point2D>,
}

impl VehicleParameters {
    /// Load the bundle from a vehicle INI file.
    pub fn load(path: &Path) -> Result<VehicleParameters> {
        let ini = IniFile::load(path).map_err(|e| {
            RadarError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Ok(Self::from_ini(&ini))
    }

    /// Build the bundle from a parsed INI document. Missing keys keep their
    /// defaults, matching how sparse vehicle files are shipped.
    pub fn from_ini(ini: &IniFile) -> VehicleParameters {
        let mut params = VehicleParameters::default();

        // Geometry wins when it carries a positive value, else Vehicle.
        let mut dist = ini.scalar("Geometry", "distRearAxle").unwrap_or(0.0);
        if dist <= 0.0 {
            dist = ini.scalar("Vehicle", "distRearAxle").unwrap_or(dist);
        }
        params.dist_rear_axle_to_front_bumper_m = dist;

        if let Some(delay) = ini.scalar("Radar Common", "cornerHardwareTimeDelay") {
            params.corner_hw_delay_s = delay;
        }
        if let Some(delay) = ini.scalar("Radar Common", "frontCenterHardwareTimeDelay") {
            params.front_center_hw_delay_s = delay;
        }

        params.contour_iso = read_contour(ini);

        for (section, sensor) in [
            ("SRR FWD LEFT", SensorIndex::FrontLeft),
            ("SRR FWD RIGHT", SensorIndex::FrontRight),
            ("SRR REAR LEFT", SensorIndex::RearLeft),
            ("SRR REAR RIGHT", SensorIndex::RearRight),
        ] {
            read_radar_section(ini, section, dist, &mut params.calibrations[sensor.index()]);
        }

        // One MRR FRONT section fills both front slots.
        let mut mrr = params.calibrations[SensorIndex::FrontShort.index()];
        read_radar_section(ini, "MRR FRONT", dist, &mut mrr);
        params.calibrations[SensorIndex::FrontShort.index()] = mrr;
        params.calibrations[SensorIndex::FrontLong.index()] = mrr;

        params
    }

    /// Calibration of one sensor slot.
    #[inline]
    pub fn calibration(&self, sensor: SensorIndex) -> &RadarCalibration {
        &self.calibrations[sensor.index()]
    }

    /// Vehicle contour converted to the ground frame (x lateral,
    /// y longitudinal) used by the mappers.
    pub fn contour_vcs(&self) -> Vec<Point2D> {
        let dist = self.dist_rear_axle_to_front_bumper_m;
        self.contour_iso
            .iter()
            .map(|p| contour_iso_to_vcs(*p, dist))
            .collect()
    }
}

/// ISO contour point to ground-frame point.
#[inline]
pub fn contour_iso_to_vcs(point: Point2D, dist_rear_axle_m: f32) -> Point2D {
    Point2D::new(-point.x, point.y - dist_rear_axle_m)
}

/// Ground-frame contour point back to ISO.
#[inline]
pub fn contour_vcs_to_iso(point: Point2D, dist_rear_axle_m: f32) -> Point2D {
    Point2D::new(-point.x, point.y + dist_rear_axle_m)
}

fn read_contour(ini: &IniFile) -> Vec<Point2D> {
    let mut contour = Vec::new();
    for i in 0..MAX_CONTOUR_POINTS {
        let key = format!("contourPt{i}");
        if let Some((first, second)) = ini.pair("Contour", &key) {
            if first.is_finite() && second.is_finite() {
                // Stored with the pair order swapped into ISO order.
                contour.push(Point2D::new(second, first));
            }
        }
    }
    contour
}

fn read_radar_section(
    ini: &IniFile,
    section: &str,
    dist_rear_axle_m: f32,
    calibration: &mut RadarCalibration,
) {
    if let Some(value) = ini.scalar(section, "polarityVCS") {
        calibration.polarity = value;
    }
    if let Some(value) = ini.scalar(section, "rangeRateAccuracy") {
        calibration.range_rate_accuracy_mps = value;
    }
    if let Some(value) = ini.scalar(section, "azimuthAccuracy") {
        calibration.azimuth_accuracy_rad = deg_to_rad(value);
    }
    if let Some(value) = ini.scalar(section, "orientationVCS") {
        calibration.vcs.orientation_rad = deg_to_rad(value);
    }
    if let Some(value) = ini.scalar(section, "lonPosVCS") {
        calibration.vcs.longitudinal_m = value;
    }
    if let Some(value) = ini.scalar(section, "latPosVCS") {
        calibration.vcs.lateral_m = value;
    }
    if let Some(value) = ini.scalar(section, "heightAboveGround") {
        calibration.vcs.height_m = value;
    }
    if let Some(value) = ini.scalar(section, "horizontalFieldOfView") {
        calibration.horizontal_fov_rad = deg_to_rad(value);
    }
    calibration.update_iso_pose(dist_rear_axle_m);
}
