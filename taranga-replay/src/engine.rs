//! Consumer engine: drives the processing pipeline and the mappers from
//! parsed frames and assembles the per-frame outputs.

use log::debug;

use taranga_radar::{
    DetectionPoint, EngineConfig, EnhancedDetections, EnhancedTrack, FusedGridMap, Point2D,
    RadarCalibration, RadarPipeline, SensorIndex, VehicleParameters, VirtualRing,
    CORNER_RETURN_COUNT,
};

use crate::error::Result;
use crate::stream::RawFrame;

/// Outputs of one processed frame.
#[derive(Clone, Debug, Default)]
pub struct FrameOutput {
    pub timestamp_us: u64,
    /// Which streams contributed, e.g. `corner:front_left`.
    pub sources: Vec<String>,
    /// Positioned detections of this frame (null slots removed).
    pub points: Vec<DetectionPoint>,
    /// Number of live tracks, when this frame carried a track snapshot.
    pub track_count: Option<usize>,
    pub odometry_valid: bool,
}

/// Replay-side consumer owning the pipeline, grid and ring.
pub struct ReplayEngine {
    pipeline: RadarPipeline,
    grid: FusedGridMap,
    ring: VirtualRing,
    parameters: VehicleParameters,
    latest_tracks: Vec<EnhancedTrack>,
    fallback_range_m: f32,
    frames_processed: u64,
}

impl ReplayEngine {
    pub fn new(parameters: VehicleParameters, config: &EngineConfig) -> ReplayEngine {
        let mut pipeline = RadarPipeline::new(config.pipeline);
        pipeline.initialize(parameters.clone());

        let mut ring = VirtualRing::new();
        ring.set_segment_count(config.ring.segment_count);
        let contour = parameters.contour_vcs();
        if contour.len() >= 3 {
            ring.set_vehicle_contour(&contour);
        }

        ReplayEngine {
            pipeline,
            grid: FusedGridMap::new(config.grid.clone()),
            ring,
            parameters,
            latest_tracks: Vec::new(),
            fallback_range_m: config.ring.fallback_range_m,
            frames_processed: 0,
        }
    }

    /// Process one frame through the pipeline and fold it into the maps.
    pub fn process(&mut self, frame: RawFrame) -> Result<FrameOutput> {
        let mut output = FrameOutput {
            timestamp_us: frame.timestamp_us(),
            ..Default::default()
        };

        match frame {
            RawFrame::Corner {
                sensor,
                timestamp_us,
                data,
                elevation_rad,
            } => {
                let result = self
                    .pipeline
                    .process_corner_detections(sensor, timestamp_us, &data)?;
                output.odometry_valid = result.odometry_valid;

                let calibration = *self.parameters.calibration(sensor);
                let before = output.points.len();
                append_detection_points(
                    &result.detections,
                    &calibration,
                    sensor,
                    &elevation_rad,
                    &mut output.points,
                );
                if output.points.len() > before {
                    output.sources.push(format!("corner:{}", sensor.label()));
                }
            }
            RawFrame::Front {
                timestamp_us,
                data,
                elevation_rad,
            } => {
                let result = self.pipeline.process_front_detections(timestamp_us, &data)?;
                output.odometry_valid = result.odometry_valid;

                let split = elevation_rad.len().min(CORNER_RETURN_COUNT);
                let (short_elevation, long_elevation) = elevation_rad.split_at(split);

                for (half, sensor, elevation) in [
                    (&result.short, SensorIndex::FrontShort, short_elevation),
                    (&result.long, SensorIndex::FrontLong, long_elevation),
                ] {
                    let calibration = *self.parameters.calibration(sensor);
                    let before = output.points.len();
                    append_detection_points(
                        half,
                        &calibration,
                        sensor,
                        elevation,
                        &mut output.points,
                    );
                    if output.points.len() > before {
                        output.sources.push(format!("front:{}", sensor.label()));
                    }
                }
            }
            RawFrame::Tracks { timestamp_us, data } => {
                let tracks = self.pipeline.process_track_fusion(timestamp_us, &data);
                output.track_count = Some(tracks.tracks.len());
                output.sources.push("tracks".to_string());
                self.latest_tracks = tracks.tracks;
            }
        }

        self.grid.update(&output.points);

        let map_points: Vec<Point2D> = output
            .points
            .iter()
            .map(|p| Point2D::new(p.x, p.y))
            .collect();
        let footprints: Vec<[Point2D; 4]> = self
            .latest_tracks
            .iter()
            .map(EnhancedTrack::footprint)
            .collect();
        self.ring.update(&map_points, &footprints);

        self.frames_processed += 1;
        debug!(
            "frame {} at {}us: {} points, {} ring segments",
            self.frames_processed,
            output.timestamp_us,
            output.points.len(),
            self.ring.segment_count()
        );

        Ok(output)
    }

    /// Occupancy cells above the configured threshold.
    pub fn occupied_cells(&self) -> Vec<Point2D> {
        self.grid.occupied_cells()
    }

    /// Virtual ring under the configured fallback range.
    pub fn ring_points(&self) -> Vec<Point2D> {
        self.ring.ring(self.fallback_range_m)
    }

    /// Latest odometry estimate from the pipeline.
    pub fn latest_odometry(&self) -> taranga_radar::OdometryEstimate {
        self.pipeline.latest_odometry()
    }

    #[inline]
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}

/// Turn one enhanced frame into positioned points, skipping null slots.
///
/// Position fallbacks follow the recorded data: refined azimuth when set,
/// else the raw azimuth mapped through polarity and boresight; offsets when
/// present, else range projected along the bearing. The optional elevation
/// tail lifts points to their measured height above ground.
fn append_detection_points(
    detections: &EnhancedDetections,
    calibration: &RadarCalibration,
    sensor: SensorIndex,
    elevation_rad: &[f32],
    out: &mut Vec<DetectionPoint>,
) {
    let header = &detections.header;

    for (i, det) in detections.detections.iter().enumerate() {
        if det.is_null_slot() {
            continue;
        }

        let mut angle = det.azimuth_rad;
        if angle == 0.0 && det.azimuth_raw_rad != 0.0 {
            let polarity = if header.azimuth_polarity == 0.0 {
                1.0
            } else {
                header.azimuth_polarity
            };
            angle = header.boresight_angle_rad + polarity * det.azimuth_raw_rad;
        }

        let mut lateral = det.lateral_offset_m;
        let mut longitudinal = det.longitudinal_offset_m;
        if lateral == 0.0 && longitudinal == 0.0 && det.range_m > 0.0 {
            lateral = det.range_m * angle.sin();
            longitudinal = det.range_m * angle.cos();
        }

        if !lateral.is_finite() || !longitudinal.is_finite() {
            continue;
        }

        let elevation = elevation_rad.get(i).copied().unwrap_or(0.0);
        let z = if elevation != 0.0 {
            calibration.vcs.height_m + det.range_m * elevation.sin()
        } else {
            0.0
        };

        out.push(DetectionPoint {
            x: lateral,
            y: longitudinal,
            z,
            range_m: det.range_m,
            range_rate_ms: det.range_rate_ms,
            range_rate_raw_ms: det.range_rate_raw_ms,
            azimuth_raw_rad: det.azimuth_raw_rad,
            azimuth_rad: det.azimuth_rad,
            amplitude_dbsm: det.amplitude_dbsm,
            longitudinal_offset_m: det.longitudinal_offset_m,
            lateral_offset_m: det.lateral_offset_m,
            motion_status: det.motion_status,
            flags: det.flags,
            fused_track_index: det.fused_track_index,
            is_stationary: det.is_stationary,
            is_moveable: det.is_moveable,
            is_static: det.is_static,
            stationary_probability: det.stationary_probability,
            sensor,
            horizontal_fov_rad: header.horizontal_fov_rad,
            maximum_range_m: header.maximum_range_m,
            azimuth_polarity: header.azimuth_polarity,
            boresight_angle_rad: header.boresight_angle_rad,
            sensor_longitudinal_m: header.sensor_longitudinal_m,
            sensor_lateral_m: header.sensor_lateral_m,
            elevation_rad: elevation,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{parse_line, StreamKind};
    use crate::stream::test_lines::{synthetic_corner_line, synthetic_track_line};

    fn engine() -> ReplayEngine {
        ReplayEngine::new(VehicleParameters::default(), &EngineConfig::default())
    }

    #[test]
    fn test_corner_frame_produces_points() {
        let mut engine = engine();
        let frame =
            parse_line(StreamKind::Corner, &synthetic_corner_line(0, 1_000)).expect("parse");

        let output = engine.process(frame).expect("process");
        assert_eq!(output.timestamp_us, 1_000);
        // One live return in the synthetic line; 63 null slots dropped.
        assert_eq!(output.points.len(), 1);
        assert_eq!(output.sources, vec!["corner:front_left".to_string()]);

        let point = &output.points[0];
        // Offsets win: (lon 4, lat 1) in the ground frame is (x 1, y 4).
        assert_eq!(point.x, 1.0);
        assert_eq!(point.y, 4.0);
        assert_eq!(point.sensor, SensorIndex::FrontLeft);
    }

    #[test]
    fn test_track_frame_updates_snapshot() {
        let mut engine = engine();
        let frame =
            parse_line(StreamKind::Tracks, &synthetic_track_line(2_000, 0)).expect("parse");

        let output = engine.process(frame).expect("process");
        assert_eq!(output.track_count, Some(1));
        assert!(output.points.is_empty());
        assert_eq!(output.sources, vec!["tracks".to_string()]);
        assert_eq!(engine.latest_tracks.len(), 1);
    }

    #[test]
    fn test_ring_reacts_to_track_footprint() {
        let mut config = EngineConfig::default();
        config.ring.segment_count = 16;
        let mut params = VehicleParameters::default();
        params.contour_iso = vec![
            Point2D::new(-1.0, -1.0),
            Point2D::new(1.0, -1.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(-1.0, 1.0),
        ];
        let mut engine = ReplayEngine::new(params, &config);

        let frame =
            parse_line(StreamKind::Tracks, &synthetic_track_line(2_000, 0)).expect("parse");
        engine.process(frame).expect("process");

        let ring = engine.ring_points();
        assert_eq!(ring.len(), 16);
        // The synthetic track sits 10 m ahead; the forward-facing segments
        // must pull in from the fallback range.
        let min_length = ring
            .iter()
            .map(|p| p.length())
            .fold(f32::INFINITY, f32::min);
        assert!(min_length < 15.0);
    }

    #[test]
    fn test_null_slots_not_emitted() {
        let mut engine = engine();
        let frame =
            parse_line(StreamKind::Corner, &synthetic_corner_line(3, 1_000)).expect("parse");
        let output = engine.process(frame).expect("process");
        assert_eq!(output.points.len(), 1);
    }
}
