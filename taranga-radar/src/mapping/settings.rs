//! Tunables for the fused occupancy-grid mapper.

use serde::{Deserialize, Serialize};

use crate::core::math::deg_to_rad;

/// Forward model used for occupied-space updates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RadarModel {
    /// Spread each detection over an oriented Gaussian ellipse.
    #[default]
    Gaussian,
    /// Add a fixed increment to the single containing cell.
    Hits,
}

/// How the three per-axis plausibility gates are combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlausibilityCombination {
    Average,
    Product,
    Minimum,
    /// Range-dependent mix: beyond the range threshold take
    /// `min(range, azimuth) * amplitude`, else `range * amplitude`.
    #[default]
    Custom,
}

/// Sigmoid gate parameters for one plausibility axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlausibilityAxis {
    pub midpoint: f32,
    pub bandwidth: f32,
}

/// Occupancy-grid mapper settings.
///
/// Defaults reproduce the shipped tuning; all fields may be overridden from
/// the engine YAML.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub cell_size_m: f32,
    pub map_radius_m: f32,
    pub hit_increment: f32,
    pub miss_decrement: f32,
    pub max_log_odds: f32,
    pub min_log_odds: f32,
    pub occupied_threshold: f32,
    pub radar_model: RadarModel,
    pub enable_occupied: bool,
    pub enable_freespace: bool,
    pub always_map_dynamic_detections: bool,
    pub enable_plausibility_scaling: bool,
    pub max_additive_probability: f32,
    pub max_freespace_range_m: f32,
    pub min_range_m: f32,
    pub min_plausibility: f32,
    pub freespace_angle_accuracy_rad: f32,
    pub freespace_range_sigma_factor: f32,
    pub srr_range_accuracy_m: f32,
    pub srr_angle_accuracy_deg: f32,
    pub mrr_range_accuracy_m: f32,
    pub mrr_angle_accuracy_deg: f32,
    pub combination: PlausibilityCombination,
    pub custom_combination_range_threshold_m: f32,
    /// Range gate, meters; decreasing in range.
    pub range_plausibility: PlausibilityAxis,
    /// Azimuth gate, degrees off boresight; decreasing in angle.
    pub azimuth_plausibility: PlausibilityAxis,
    /// Amplitude gate, dBsm; increasing in amplitude.
    pub amplitude_plausibility: PlausibilityAxis,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            cell_size_m: 0.5,
            map_radius_m: 60.0,
            hit_increment: 0.5,
            miss_decrement: 0.1,
            max_log_odds: 5.0,
            min_log_odds: -5.0,
            occupied_threshold: 0.2,
            radar_model: RadarModel::default(),
            enable_occupied: true,
            enable_freespace: true,
            always_map_dynamic_detections: false,
            enable_plausibility_scaling: true,
            max_additive_probability: 0.275,
            max_freespace_range_m: 100.0,
            min_range_m: 1e-6,
            min_plausibility: 0.01,
            freespace_angle_accuracy_rad: deg_to_rad(1.0),
            freespace_range_sigma_factor: 4.0,
            srr_range_accuracy_m: 0.01,
            srr_angle_accuracy_deg: 0.1,
            mrr_range_accuracy_m: 0.25,
            mrr_angle_accuracy_deg: 0.5,
            combination: PlausibilityCombination::default(),
            custom_combination_range_threshold_m: 10.0,
            range_plausibility: PlausibilityAxis {
                midpoint: 7.0,
                bandwidth: 10.5,
            },
            azimuth_plausibility: PlausibilityAxis {
                midpoint: 65.0,
                bandwidth: 14.65,
            },
            amplitude_plausibility: PlausibilityAxis {
                midpoint: -22.0,
                bandwidth: 8.79,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let settings = GridSettings::default();
        assert_relative_eq!(settings.cell_size_m, 0.5);
        assert_relative_eq!(settings.map_radius_m, 60.0);
        assert_eq!(settings.radar_model, RadarModel::Gaussian);
        assert_eq!(settings.combination, PlausibilityCombination::Custom);
        assert!(settings.enable_occupied);
        assert!(settings.enable_freespace);
        assert!(!settings.always_map_dynamic_detections);
    }
}
