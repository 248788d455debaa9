//! Fundamental types shared across the engine.

pub mod math;
pub mod point;
pub mod tracks;
pub mod types;

pub use point::{CellCoord, Point2D};
pub use tracks::{
    EnhancedTrack, EnhancedTracks, RawTrackFusion, TrackObjectClass, TrackStatus,
    MIN_TRACK_EXTENT_M, TRACK_COUNT,
};
pub use types::{
    pack_detection_flags, DetectionFlag, DetectionPoint, EnhancedDetection, EnhancedDetections,
    OdometryEstimate, RawCornerDetections, RawDetectionsHeader, RawFrontDetections, SensorIndex,
    VehicleMotionState, CORNER_RETURN_COUNT, FRONT_RETURN_COUNT, USABLE_FLAGS,
};
