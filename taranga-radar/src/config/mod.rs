//! Configuration loading: the vehicle INI bundle and the engine YAML.

mod engine;
mod ini;
mod vehicle;

pub use engine::{EngineConfig, RingSettings};
pub use ini::IniFile;
pub use vehicle::{
    contour_iso_to_vcs, contour_vcs_to_iso, RadarCalibration, RadarPose, VehicleParameters,
};
