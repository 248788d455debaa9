//! Radar-Doppler ego-motion estimation.
//!
//! Stationary world points observed with Doppler obey
//! `rr = -(vLon * cos(a) + vLat * sin(a))` for detection angle `a` in the
//! ISO frame. A seeded RANSAC over two-sample exact solutions rejects
//! moving targets, then the inlier set is refit with a column-pivoted QR
//! least squares.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::RadarCalibration;
use crate::core::{EnhancedDetections, OdometryEstimate};

/// RANSAC and refit tuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OdometrySettings {
    /// RANSAC iterations; coerced to at least 1.
    pub max_iterations: u32,
    /// Inlier residual threshold in m/s; coerced to at least 0.05.
    pub inlier_threshold_mps: f32,
    /// Inliers required for a valid estimate.
    pub min_inliers: u32,
    /// RNG seed; fixed for reproducibility, overridable in tests.
    pub seed: u64,
}

impl Default for OdometrySettings {
    fn default() -> Self {
        Self {
            max_iterations: 120,
            inlier_threshold_mps: 0.35,
            min_inliers: 6,
            seed: 42,
        }
    }
}

/// One usable Doppler observation.
#[derive(Clone, Copy, Debug)]
struct DopplerSample {
    cos_angle: f32,
    sin_angle: f32,
    range_rate: f32,
}

impl DopplerSample {
    #[inline]
    fn predicted_range_rate(&self, v_lon: f32, v_lat: f32) -> f32 {
        -(v_lon * self.cos_angle + v_lat * self.sin_angle)
    }

    #[inline]
    fn residual(&self, v_lon: f32, v_lat: f32) -> f32 {
        (self.predicted_range_rate(v_lon, v_lat) - self.range_rate).abs()
    }
}

/// Exact velocity from two samples; `None` when the pair is degenerate.
fn solve_pair(a: &DopplerSample, b: &DopplerSample) -> Option<(f32, f32)> {
    let a11 = -a.cos_angle;
    let a12 = -a.sin_angle;
    let a21 = -b.cos_angle;
    let a22 = -b.sin_angle;
    let det = a11 * a22 - a12 * a21;
    if det.abs() < 1e-4 {
        return None;
    }
    let v_lon = (a.range_rate * a22 - a12 * b.range_rate) / det;
    let v_lat = (a11 * b.range_rate - a.range_rate * a21) / det;
    Some((v_lon, v_lat))
}

/// Planar velocity estimator over one detection frame.
#[derive(Clone, Debug)]
pub struct OdometryEstimator {
    settings: OdometrySettings,
    last_estimate: OdometryEstimate,
}

impl OdometryEstimator {
    pub fn new(settings: OdometrySettings) -> OdometryEstimator {
        OdometryEstimator {
            settings,
            last_estimate: OdometryEstimate::default(),
        }
    }

    /// Drop the last estimate.
    pub fn reset(&mut self) {
        self.last_estimate = OdometryEstimate::default();
    }

    pub fn update_settings(&mut self, settings: OdometrySettings) {
        self.settings = settings;
    }

    /// Most recent estimate; `valid` is false until a fit has succeeded.
    #[inline]
    pub fn latest_estimate(&self) -> &OdometryEstimate {
        &self.last_estimate
    }

    /// Fit the ego velocity from one enhanced detection frame.
    ///
    /// Returns true when the stored estimate is valid. On underdetermined
    /// input (< 2 samples) the previous estimate is kept unchanged.
    pub fn process_detections(
        &mut self,
        calibration: &RadarCalibration,
        detections: &EnhancedDetections,
    ) -> bool {
        let mut samples = Vec::with_capacity(detections.detections.len());
        for det in &detections.detections {
            if !det.is_usable() || !det.range_rate_ms.is_finite() {
                continue;
            }
            let angle =
                -det.azimuth_raw_rad * calibration.polarity + calibration.iso.orientation_rad;
            samples.push(DopplerSample {
                cos_angle: angle.cos(),
                sin_angle: angle.sin(),
                range_rate: det.range_rate_ms,
            });
        }

        if samples.len() < 2 {
            return false;
        }

        let threshold = self.settings.inlier_threshold_mps.max(0.05);
        let iterations = self.settings.max_iterations.max(1);
        let mut rng = StdRng::seed_from_u64(self.settings.seed);

        let mut best_v_lon = 0.0;
        let mut best_v_lat = 0.0;
        let mut best_inliers = 0u32;

        for _ in 0..iterations {
            let i = rng.random_range(0..samples.len());
            let mut j = rng.random_range(0..samples.len());
            while j == i {
                j = rng.random_range(0..samples.len());
            }

            let Some((v_lon, v_lat)) = solve_pair(&samples[i], &samples[j]) else {
                continue;
            };

            let inliers = samples
                .iter()
                .filter(|s| s.residual(v_lon, v_lat) <= threshold)
                .count() as u32;

            if inliers > best_inliers {
                best_inliers = inliers;
                best_v_lon = v_lon;
                best_v_lat = v_lat;
            }
        }

        let mut v_lon = best_v_lon;
        let mut v_lat = best_v_lat;
        let mut inlier_count = best_inliers;
        let mut valid = false;

        if best_inliers >= self.settings.min_inliers {
            let inliers: Vec<&DopplerSample> = samples
                .iter()
                .filter(|s| s.residual(best_v_lon, best_v_lat) <= threshold)
                .collect();

            if let Some((refit_lon, refit_lat)) = solve_least_squares(&inliers) {
                v_lon = refit_lon;
                v_lat = refit_lat;
                inlier_count = inliers.len() as u32;
                valid = true;
            }
        }

        self.last_estimate = OdometryEstimate {
            timestamp_us: detections.header.timestamp_us,
            v_lon_mps: v_lon,
            v_lat_mps: v_lat,
            yaw_rate_rps: 0.0,
            covariance: diagonal_covariance(valid, inlier_count),
            inlier_count,
            valid,
        };

        valid
    }
}

/// Overdetermined `A [vLon, vLat]^T = rr` solve via column-pivoted QR.
fn solve_least_squares(samples: &[&DopplerSample]) -> Option<(f32, f32)> {
    if samples.len() < 2 {
        return None;
    }

    let a = DMatrix::from_fn(samples.len(), 2, |row, col| {
        if col == 0 {
            -samples[row].cos_angle
        } else {
            -samples[row].sin_angle
        }
    });
    let b = DVector::from_fn(samples.len(), |row, _| samples[row].range_rate);

    // A P = Q R, so x = P (R^-1 (Q^T b)).
    let qr = a.col_piv_qr();
    let mut solution = qr.q().transpose() * b;
    if !qr.r().solve_upper_triangular_mut(&mut solution) {
        return None;
    }
    qr.p().inv_permute_rows(&mut solution);
    Some((solution[0], solution[1]))
}

fn diagonal_covariance(valid: bool, inlier_count: u32) -> [f32; 9] {
    let mut covariance = [0.0; 9];
    let velocity_variance = if valid && inlier_count > 0 {
        1.0 / inlier_count as f32
    } else {
        1.0
    };
    covariance[0] = velocity_variance;
    covariance[4] = velocity_variance;
    covariance[8] = 1.0;
    covariance
}
