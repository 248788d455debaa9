//! Fused occupancy-grid mapper.
//!
//! A square log-odds grid centered on the vehicle. Detections add occupied
//! evidence through a Gaussian or hit model, and carve free space through a
//! triangular cone between the sensor and the return, both scaled by the
//! plausibility gates.

use crate::core::{CellCoord, DetectionPoint, Point2D};
use crate::core::math::deg_to_rad;

use super::plausibility::PlausibilityModel;
use super::settings::{GridSettings, RadarModel};

const MIN_PROBABILITY: f32 = 1e-3;
const MAX_PROBABILITY: f32 = 1.0 - MIN_PROBABILITY;

/// Log-odds occupancy grid fed by enhanced radar returns.
///
/// Ground-frame convention throughout: `x` lateral, `y` longitudinal, with
/// the grid center at the origin.
#[derive(Clone, Debug)]
pub struct FusedGridMap {
    settings: GridSettings,
    plausibility: PlausibilityModel,
    /// Cells per side.
    size: i32,
    /// Index of the world origin, `(size - 1) / 2`.
    center: f32,
    log_odds: Vec<f32>,
    observed: Vec<bool>,
}

impl FusedGridMap {
    pub fn new(settings: GridSettings) -> FusedGridMap {
        let plausibility = PlausibilityModel::new(&settings);
        let size = grid_size(&settings);
        let center = (size as f32 - 1.0) * 0.5;
        FusedGridMap {
            settings,
            plausibility,
            size,
            center,
            log_odds: vec![0.0; (size * size) as usize],
            observed: vec![false; (size * size) as usize],
        }
    }

    /// Cells per side.
    #[inline]
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Current settings.
    #[inline]
    pub fn settings(&self) -> &GridSettings {
        &self.settings
    }

    /// Replace the settings and reinitialize the grid storage.
    pub fn apply_settings(&mut self, settings: GridSettings) {
        *self = FusedGridMap::new(settings);
    }

    /// Zero all cells.
    pub fn reset(&mut self) {
        self.log_odds.fill(0.0);
        self.observed.fill(false);
    }

    /// Integrate one batch of positioned returns.
    pub fn update(&mut self, points: &[DetectionPoint]) {
        for point in points {
            if !point.is_usable() {
                continue;
            }

            let detection = Point2D::new(point.x, point.y);
            let sensor = Point2D::new(point.sensor_lateral_m, point.sensor_longitudinal_m);
            let relative = detection - sensor;
            let relative_norm = relative.length();

            let range = if point.range_m > 0.0 {
                point.range_m
            } else {
                relative_norm
            };
            if range <= self.settings.min_range_m {
                continue;
            }

            let azimuth = if relative_norm > 1e-3 {
                relative.x.atan2(relative.y)
            } else {
                let polarity = if point.azimuth_polarity == 0.0 {
                    1.0
                } else {
                    point.azimuth_polarity
                };
                -point.azimuth_raw_rad * polarity + point.boresight_angle_rad
            };

            let (range_accuracy, angle_accuracy) = self.sensor_accuracies(point);
            let plausibility = self.plausibility.evaluate(range, azimuth, point.amplitude_dbsm);

            let stationary = point.is_stationary || point.is_static || point.motion_status == 0;
            if self.settings.enable_occupied
                && plausibility >= self.settings.min_plausibility
                && (stationary || self.settings.always_map_dynamic_detections)
            {
                match self.settings.radar_model {
                    RadarModel::Gaussian => self.add_gaussian(
                        detection,
                        relative,
                        range,
                        azimuth,
                        range_accuracy,
                        angle_accuracy,
                        plausibility,
                    ),
                    RadarModel::Hits => self.add_hit(detection, plausibility),
                }
            }

            if self.settings.enable_freespace {
                self.add_freespace_cone(sensor, azimuth, range, range_accuracy, point.amplitude_dbsm);
            }
        }
    }

    /// Cell centers of all observed cells at or above the occupied
    /// threshold, scanned in row-major order.
    pub fn occupied_cells(&self) -> Vec<Point2D> {
        let mut cells = Vec::with_capacity(self.log_odds.len() / 16);
        for iy in 0..self.size {
            for ix in 0..self.size {
                let index = (iy * self.size + ix) as usize;
                if self.observed[index] && self.log_odds[index] >= self.settings.occupied_threshold
                {
                    cells.push(self.cell_center(CellCoord::new(ix, iy)));
                }
            }
        }
        cells
    }

    /// Cell index containing a world position, or `None` outside the grid.
    #[inline]
    pub fn world_to_cell(&self, position: Point2D) -> Option<CellCoord> {
        let ix = (position.x / self.settings.cell_size_m + self.center).floor() as i32;
        let iy = (position.y / self.settings.cell_size_m + self.center).floor() as i32;
        if ix >= 0 && ix < self.size && iy >= 0 && iy < self.size {
            Some(CellCoord::new(ix, iy))
        } else {
            None
        }
    }

    /// World position of a cell center.
    #[inline]
    pub fn cell_center(&self, cell: CellCoord) -> Point2D {
        let cell_size = self.settings.cell_size_m;
        Point2D::new(
            (cell.x as f32 - self.center) * cell_size + cell_size * 0.5,
            (cell.y as f32 - self.center) * cell_size + cell_size * 0.5,
        )
    }

    /// Log-odds value of a cell, or `None` outside the grid.
    #[inline]
    pub fn log_odds_at(&self, cell: CellCoord) -> Option<f32> {
        if cell.x >= 0 && cell.x < self.size && cell.y >= 0 && cell.y < self.size {
            Some(self.log_odds[(cell.y * self.size + cell.x) as usize])
        } else {
            None
        }
    }

    fn sensor_accuracies(&self, point: &DetectionPoint) -> (f32, f32) {
        if point.sensor.is_mid_range() {
            (
                self.settings.mrr_range_accuracy_m,
                deg_to_rad(self.settings.mrr_angle_accuracy_deg),
            )
        } else {
            (
                self.settings.srr_range_accuracy_m,
                deg_to_rad(self.settings.srr_angle_accuracy_deg),
            )
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn add_gaussian(
        &mut self,
        detection: Point2D,
        relative: Point2D,
        range: f32,
        azimuth: f32,
        range_accuracy: f32,
        angle_accuracy: f32,
        plausibility: f32,
    ) {
        if self.settings.max_additive_probability <= 0.0 {
            return;
        }

        let half_cell = self.settings.cell_size_m * 0.5;
        let sigma_lat = (range * angle_accuracy.tan()).max(half_cell);
        let sigma_lon = range_accuracy.max(half_cell);
        let radius = self
            .settings
            .cell_size_m
            .max(3.0 * sigma_lat.max(sigma_lon));

        let inv_sigma_lon2 = 1.0 / (sigma_lon * sigma_lon);
        let inv_sigma_lat2 = 1.0 / (sigma_lat * sigma_lat);
        let scale = self.settings.max_additive_probability * plausibility;

        let forward = if relative.length() > 1e-3 {
            relative.normalized()
        } else {
            Point2D::new(azimuth.sin(), azimuth.cos())
        };
        let right = Point2D::new(forward.y, -forward.x);

        let (ix_min, ix_max, iy_min, iy_max) = self.cell_span(
            detection.x - radius,
            detection.x + radius,
            detection.y - radius,
            detection.y + radius,
        );

        for iy in iy_min..=iy_max {
            for ix in ix_min..=ix_max {
                let delta = self.cell_center(CellCoord::new(ix, iy)) - detection;
                let longitudinal = delta.dot(forward);
                let lateral = delta.dot(right);
                let exponent = -0.5
                    * (longitudinal * longitudinal * inv_sigma_lon2
                        + lateral * lateral * inv_sigma_lat2);
                let probability =
                    (0.5 + scale * exponent.exp()).clamp(MIN_PROBABILITY, MAX_PROBABILITY);
                let log_odds = (probability / (1.0 - probability)).ln();
                self.update_cell(ix, iy, log_odds);
            }
        }
    }

    fn add_hit(&mut self, detection: Point2D, plausibility: f32) {
        if let Some(cell) = self.world_to_cell(detection) {
            self.update_cell(cell.x, cell.y, self.settings.hit_increment * plausibility);
        }
    }

    fn add_freespace_cone(
        &mut self,
        sensor: Point2D,
        azimuth: f32,
        range: f32,
        range_accuracy: f32,
        amplitude_dbsm: f32,
    ) {
        if range > self.settings.max_freespace_range_m {
            return;
        }

        let freespace_range =
            range - self.settings.freespace_range_sigma_factor * range_accuracy.max(0.0);
        if freespace_range <= 0.0 {
            return;
        }

        let freespace_plausibility =
            self.plausibility
                .evaluate(freespace_range.min(15.0), azimuth, amplitude_dbsm);
        if freespace_plausibility < self.settings.min_plausibility {
            return;
        }

        let spread = self.settings.freespace_angle_accuracy_rad;
        let angle_left = azimuth - spread;
        let angle_right = azimuth + spread;
        let left = sensor + Point2D::new(angle_left.sin(), angle_left.cos()) * freespace_range;
        let right = sensor + Point2D::new(angle_right.sin(), angle_right.cos()) * freespace_range;

        let delta = -self.settings.miss_decrement.abs() * freespace_plausibility;

        let (ix_min, ix_max, iy_min, iy_max) = self.cell_span(
            sensor.x.min(left.x).min(right.x),
            sensor.x.max(left.x).max(right.x),
            sensor.y.min(left.y).min(right.y),
            sensor.y.max(left.y).max(right.y),
        );

        for iy in iy_min..=iy_max {
            for ix in ix_min..=ix_max {
                let center = self.cell_center(CellCoord::new(ix, iy));
                if point_in_triangle(center, sensor, left, right) {
                    self.update_cell(ix, iy, delta);
                }
            }
        }
    }

    /// Clamp a world-coordinate AABB to cell index bounds.
    fn cell_span(&self, min_x: f32, max_x: f32, min_y: f32, max_y: f32) -> (i32, i32, i32, i32) {
        let to_index = |value: f32| value / self.settings.cell_size_m + self.center;
        let clamp = |value: i32| value.clamp(0, self.size - 1);
        (
            clamp(to_index(min_x).floor() as i32),
            clamp(to_index(max_x).ceil() as i32),
            clamp(to_index(min_y).floor() as i32),
            clamp(to_index(max_y).ceil() as i32),
        )
    }

    #[inline]
    fn update_cell(&mut self, ix: i32, iy: i32, delta: f32) {
        let index = (iy * self.size + ix) as usize;
        let next = (self.log_odds[index] + delta)
            .clamp(self.settings.min_log_odds, self.settings.max_log_odds);
        self.log_odds[index] = next;
        self.observed[index] = true;
    }
}

fn grid_size(settings: &GridSettings) -> i32 {
    let cells = (settings.map_radius_m * 2.0 / settings.cell_size_m).ceil() as i32;
    cells.max(3)
}

/// Barycentric sign test: true when `p` lies inside or on triangle `abc`.
fn point_in_triangle(p: Point2D, a: Point2D, b: Point2D, c: Point2D) -> bool {
    let sign = |p1: Point2D, p2: Point2D, p3: Point2D| {
        (p1.x - p3.x) * (p2.y - p3.y) - (p2.x - p3.x) * (p1.y - p3.y)
    };
    let d1 = sign(p, a, b);
    let d2 = sign(p, b, c);
    let d3 = sign(p, c, a);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}
