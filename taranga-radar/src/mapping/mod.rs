//! Mapping outputs built from enhanced detections: the fused occupancy
//! grid and the virtual angular-segment ring.

mod grid;
mod plausibility;
mod ring;
mod settings;

pub use grid::FusedGridMap;
pub use plausibility::PlausibilityModel;
pub use ring::{RingSegment, VirtualRing, DEFAULT_SEGMENT_COUNT};
pub use settings::{GridSettings, PlausibilityAxis, PlausibilityCombination, RadarModel};
