//! Engine tuning loaded from a single optional YAML file.
//!
//! Every section falls back to its built-in defaults, so an empty or
//! missing file yields the shipped tuning.
//!
//! ```yaml
//! pipeline:
//!   stationary:
//!     n_sigma: 2.5
//!   odometry:
//!     min_inliers: 4
//! grid:
//!   cell_size_m: 0.25
//!   radar_model: Hits
//! ring:
//!   segment_count: 144
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RadarError, Result};
use crate::mapping::GridSettings;
use crate::pipeline::PipelineSettings;

/// Virtual-ring settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingSettings {
    /// Angular segments around the vehicle; clamped to at least 3.
    pub segment_count: usize,
    /// Segment length when a bin sees no obstacle, meters.
    pub fallback_range_m: f32,
}

impl Default for RingSettings {
    fn default() -> Self {
        Self {
            segment_count: 72,
            fallback_range_m: 120.0,
        }
    }
}

/// Full engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pipeline: PipelineSettings,
    pub grid: GridSettings,
    pub ring: RingSettings,
}

impl EngineConfig {
    /// Load from a YAML file.
    pub fn load(path: &Path) -> Result<EngineConfig> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RadarError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_yaml(&contents)
    }

    /// Parse from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<EngineConfig> {
        serde_yaml::from_str(yaml)
            .map_err(|e| RadarError::Config(format!("engine config parse error: {e}")))
    }

    /// Load from an optional path, falling back to defaults when none is
    /// given.
    pub fn load_or_default(path: Option<&Path>) -> Result<EngineConfig> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(EngineConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::RadarModel;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_yaml_gives_defaults() {
        let config = EngineConfig::from_yaml("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.ring.segment_count, 72);
        assert_relative_eq!(config.ring.fallback_range_m, 120.0);
    }

    #[test]
    fn test_partial_override() {
        let yaml = "\
pipeline:
  stationary:
    n_sigma: 2.5
  odometry:
    min_inliers: 4
grid:
  cell_size_m: 0.25
  radar_model: Hits
ring:
  segment_count: 144
";
        let config = EngineConfig::from_yaml(yaml).unwrap();
        assert_relative_eq!(config.pipeline.stationary.n_sigma, 2.5);
        assert_eq!(config.pipeline.odometry.min_inliers, 4);
        // Untouched fields keep their defaults.
        assert_relative_eq!(config.pipeline.association.bounding_box_scale, 1.1);
        assert_relative_eq!(config.grid.cell_size_m, 0.25);
        assert_eq!(config.grid.radar_model, RadarModel::Hits);
        assert_relative_eq!(config.grid.map_radius_m, 60.0);
        assert_eq!(config.ring.segment_count, 144);
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let err = EngineConfig::from_yaml("grid: [not, a, map]").unwrap_err();
        assert!(matches!(err, RadarError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = EngineConfig::load(Path::new("/nonexistent/engine.yaml")).unwrap_err();
        assert!(matches!(err, RadarError::Config(_)));
    }

    #[test]
    fn test_load_or_default() {
        let config = EngineConfig::load_or_default(None).unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
