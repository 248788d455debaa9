//! # Taranga Radar: Multi-Sensor Radar Processing & Mapping
//!
//! Processing core for an automotive radar setup of four short-range corner
//! units and one front mid-range unit reported as a short/long pair, plus
//! upstream-fused object tracks. Raw per-frame detections are turned into:
//!
//! - ego-motion-corrected, stationarity-classified, track-associated
//!   **enhanced detections**,
//! - a probabilistic 2-D **occupancy grid** in log-odds, and
//! - a per-angular-segment **virtual range ring** approximating the
//!   drivable boundary around the vehicle contour.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use taranga_radar::{
//!     EngineConfig, FusedGridMap, RadarPipeline, RawCornerDetections, SensorIndex,
//!     VehicleParameters, VirtualRing,
//! };
//!
//! let params = VehicleParameters::load(std::path::Path::new("data/Vehicle.ini"))?;
//! let config = EngineConfig::default();
//!
//! let mut pipeline = RadarPipeline::new(config.pipeline);
//! pipeline.initialize(params.clone());
//!
//! let mut grid = FusedGridMap::new(config.grid.clone());
//! let mut ring = VirtualRing::new();
//! ring.set_vehicle_contour(&params.contour_vcs());
//!
//! let frame = RawCornerDetections::default();
//! let output = pipeline.process_corner_detections(SensorIndex::FrontLeft, 0, &frame)?;
//! println!("{} enhanced detections", output.detections.detections.len());
//! # Ok::<(), taranga_radar::RadarError>(())
//! ```
//!
//! ## Coordinate Frames
//!
//! - **VCS**: origin at the rear-axle center, longitudinal forward,
//!   lateral to the driver's side.
//! - **ISO**: VCS translated to the front bumper with the lateral axis
//!   reversed; detection bearings and the vehicle contour are ISO-based.
//! - **Ground frame** (mapping): `x` lateral, `y` longitudinal.
//!
//! ## Architecture
//!
//! - [`core`]: frame records, enums, points, scalar math
//! - [`config`]: vehicle INI bundle and engine YAML
//! - [`pipeline`]: raw→enhanced mapping, classification, association,
//!   sensor liveness, odometry feedback
//! - [`odometry`]: RANSAC + least-squares Doppler velocity fit
//! - [`mapping`]: occupancy grid and virtual ring
//!
//! The engine is single-threaded and cooperative: one [`RadarPipeline`]
//! instance owns all mutable state, no method suspends or spawns work, and
//! outputs for a frame are complete before the next frame is accepted.

pub mod config;
pub mod core;
pub mod error;
pub mod mapping;
pub mod odometry;
pub mod pipeline;

pub use crate::config::{
    contour_iso_to_vcs, contour_vcs_to_iso, EngineConfig, IniFile, RadarCalibration, RadarPose,
    RingSettings, VehicleParameters,
};
pub use crate::core::{
    CellCoord, DetectionFlag, DetectionPoint, EnhancedDetection, EnhancedDetections,
    EnhancedTrack, EnhancedTracks, OdometryEstimate, Point2D, RawCornerDetections,
    RawDetectionsHeader, RawFrontDetections, RawTrackFusion, SensorIndex, TrackObjectClass,
    TrackStatus, VehicleMotionState, CORNER_RETURN_COUNT, FRONT_RETURN_COUNT, TRACK_COUNT,
};
pub use crate::error::{RadarError, Result};
pub use crate::mapping::{
    FusedGridMap, GridSettings, PlausibilityCombination, RadarModel, RingSegment, VirtualRing,
};
pub use crate::odometry::{OdometryEstimator, OdometrySettings};
pub use crate::pipeline::{
    AssociationSettings, CornerOutput, FrontOutput, PipelineSettings, RadarPipeline, SensorStatus,
    StationarySettings,
};
