//! Radar processing pipeline.
//!
//! Maps raw detection frames into enhanced detections, classifies each
//! return as stationary or moveable against the ego motion, associates
//! returns with the cached track snapshot, and feeds stationary Doppler
//! back into the odometry estimator when no external motion state is
//! supplied. One pipeline instance owns all of this state; frame N is fully
//! processed before frame N+1 is accepted.

mod associate;
mod classify;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::VehicleParameters;
use crate::core::math::seconds_to_micros;
use crate::core::{
    pack_detection_flags, EnhancedDetection, EnhancedDetections, EnhancedTrack, EnhancedTracks,
    OdometryEstimate, Point2D, RawCornerDetections, RawFrontDetections, RawTrackFusion,
    SensorIndex, VehicleMotionState, CORNER_RETURN_COUNT, FRONT_RETURN_COUNT, TRACK_COUNT,
};
use crate::error::{RadarError, Result};
use crate::odometry::{OdometryEstimator, OdometrySettings};

use associate::{associate_detections, TrackState};
use classify::classify_detections;

/// Stationarity classification tuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationarySettings {
    /// Mahalanobis gate on the Doppler residual.
    pub n_sigma: f32,
}

impl Default for StationarySettings {
    fn default() -> Self {
        Self { n_sigma: 3.0 }
    }
}

/// Track association tuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationSettings {
    /// Growth factor applied to track extents before containment tests.
    pub bounding_box_scale: f32,
    /// Mahalanobis gate on the detection/track range-rate residual.
    pub range_rate_sigma: f32,
}

impl Default for AssociationSettings {
    fn default() -> Self {
        Self {
            bounding_box_scale: 1.1,
            range_rate_sigma: 3.0,
        }
    }
}

/// Pipeline tuning bundle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub stationary: StationarySettings,
    pub association: AssociationSettings,
    pub odometry: OdometrySettings,
}

/// Read-only view of one sensor's liveness state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SensorStatus {
    pub initialized: bool,
    pub last_timestamp_us: u64,
    pub consecutive_invalid: u32,
}

/// Output of a corner detection frame.
#[derive(Clone, Debug)]
pub struct CornerOutput {
    pub detections: EnhancedDetections,
    /// True when the frame was live and the latest odometry fit is valid.
    pub odometry_valid: bool,
}

/// Output of a front detection frame: the short and long halves.
#[derive(Clone, Debug)]
pub struct FrontOutput {
    pub short: EnhancedDetections,
    pub long: EnhancedDetections,
    /// True when both front slots were live and the latest odometry fit is
    /// valid.
    pub odometry_valid: bool,
}

/// The per-vehicle radar processing pipeline.
pub struct RadarPipeline {
    settings: PipelineSettings,
    parameters: Option<VehicleParameters>,
    sensor_states: [SensorStatus; SensorIndex::COUNT],
    tracks: Vec<TrackState>,
    tracks_timestamp_us: u64,
    motion: VehicleMotionState,
    has_external_motion: bool,
    odometry: OdometryEstimator,
    last_odometry: OdometryEstimate,
}

impl Default for RadarPipeline {
    fn default() -> Self {
        Self::new(PipelineSettings::default())
    }
}

impl RadarPipeline {
    pub fn new(settings: PipelineSettings) -> RadarPipeline {
        RadarPipeline {
            settings,
            parameters: None,
            sensor_states: [SensorStatus::default(); SensorIndex::COUNT],
            tracks: Vec::new(),
            tracks_timestamp_us: 0,
            motion: VehicleMotionState::default(),
            has_external_motion: false,
            odometry: OdometryEstimator::new(settings.odometry),
            last_odometry: OdometryEstimate::default(),
        }
    }

    /// Supply the calibration bundle. Detection frames are rejected until
    /// this has been called.
    pub fn initialize(&mut self, parameters: VehicleParameters) {
        self.parameters = Some(parameters);
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.parameters.is_some()
    }

    /// Supply an external ego-motion state; disables odometry feedback.
    pub fn update_vehicle_state(&mut self, state: VehicleMotionState) {
        self.motion = state;
        self.has_external_motion = true;
    }

    /// Ego-motion state currently used for classification.
    #[inline]
    pub fn motion_state(&self) -> VehicleMotionState {
        self.motion
    }

    /// Liveness state of one sensor slot.
    #[inline]
    pub fn sensor_status(&self, sensor: SensorIndex) -> SensorStatus {
        self.sensor_states[sensor.index()]
    }

    /// Most recent odometry estimate (valid flag included).
    #[inline]
    pub fn latest_odometry(&self) -> OdometryEstimate {
        self.last_odometry
    }

    /// Process one corner radar frame.
    pub fn process_corner_detections(
        &mut self,
        sensor: SensorIndex,
        timestamp_us: u64,
        input: &RawCornerDetections,
    ) -> Result<CornerOutput> {
        let (calibration, delay_us) = {
            let params = self.parameters.as_ref().ok_or(RadarError::NotInitialized)?;
            (
                *params.calibration(sensor),
                seconds_to_micros(params.corner_hw_delay_s),
            )
        };

        let live = self.update_sensor_status(sensor, input.header.timestamp_us);
        let mut detections = map_corner_detections(input);

        let observation_time_us = timestamp_us.saturating_sub(delay_us);
        classify_detections(
            &mut detections,
            &calibration,
            &self.motion,
            self.settings.stationary.n_sigma,
        );
        associate_detections(
            &mut detections,
            &mut self.tracks,
            self.tracks_timestamp_us,
            observation_time_us,
            &calibration,
            &self.motion,
            &self.settings.association,
        );

        self.feed_odometry(&calibration, &detections);

        Ok(CornerOutput {
            detections,
            odometry_valid: live && self.last_odometry.valid,
        })
    }

    /// Process one front mid-range frame, split into short and long halves.
    pub fn process_front_detections(
        &mut self,
        timestamp_us: u64,
        input: &RawFrontDetections,
    ) -> Result<FrontOutput> {
        let (calibration_short, calibration_long, delay_us) = {
            let params = self.parameters.as_ref().ok_or(RadarError::NotInitialized)?;
            (
                *params.calibration(SensorIndex::FrontShort),
                *params.calibration(SensorIndex::FrontLong),
                seconds_to_micros(params.front_center_hw_delay_s),
            )
        };

        let live_short =
            self.update_sensor_status(SensorIndex::FrontShort, input.header.timestamp_us);
        let live_long =
            self.update_sensor_status(SensorIndex::FrontLong, input.header.timestamp_us);

        let (mut short, mut long) = map_front_detections(input);

        let observation_time_us = timestamp_us.saturating_sub(delay_us);
        for (half, calibration) in [
            (&mut short, &calibration_short),
            (&mut long, &calibration_long),
        ] {
            classify_detections(
                half,
                calibration,
                &self.motion,
                self.settings.stationary.n_sigma,
            );
            associate_detections(
                half,
                &mut self.tracks,
                self.tracks_timestamp_us,
                observation_time_us,
                calibration,
                &self.motion,
                &self.settings.association,
            );
        }

        self.feed_odometry(&calibration_short, &short);

        Ok(FrontOutput {
            short,
            long,
            odometry_valid: live_short && live_long && self.last_odometry.valid,
        })
    }

    /// Replace the track snapshot and emit the surviving tracks.
    pub fn process_track_fusion(
        &mut self,
        timestamp_us: u64,
        input: &RawTrackFusion,
    ) -> EnhancedTracks {
        let mut output = EnhancedTracks {
            timestamp_us,
            tracks: Vec::new(),
        };
        self.tracks.clear();

        for i in 0..TRACK_COUNT {
            let Some(track) = EnhancedTrack::from_raw(input, i) else {
                continue;
            };
            output.tracks.push(track);

            self.tracks.push(TrackState {
                position: Point2D::new(
                    input.vcs_longitudinal_position[i],
                    input.vcs_lateral_position[i],
                ),
                velocity: Point2D::new(
                    input.vcs_longitudinal_velocity[i],
                    input.vcs_lateral_velocity[i],
                ),
                acceleration: Point2D::new(
                    input.vcs_longitudinal_acceleration[i],
                    input.vcs_lateral_acceleration[i],
                ),
                length: input.length[i],
                width: input.width[i],
                height: input.height[i],
                heading: input.vcs_heading[i],
                heading_rate: input.vcs_heading_rate[i],
                is_stationary: input.stationary_flag[i] != 0,
                is_moveable: input.moveable_flag[i] != 0,
                moving_votes: 0.0,
            });
        }

        self.tracks_timestamp_us = timestamp_us;
        output
    }

    /// Advance the liveness state of one sensor. Frames whose header
    /// timestamp does not strictly increase are non-live.
    fn update_sensor_status(&mut self, sensor: SensorIndex, timestamp_us: u64) -> bool {
        let state = &mut self.sensor_states[sensor.index()];
        if !state.initialized {
            state.initialized = true;
            state.last_timestamp_us = timestamp_us;
            state.consecutive_invalid = 0;
            return true;
        }

        if timestamp_us > state.last_timestamp_us {
            state.last_timestamp_us = timestamp_us;
            state.consecutive_invalid = 0;
            return true;
        }

        state.consecutive_invalid += 1;
        warn!(
            "stale {} frame: {}us does not advance {}us ({} consecutive)",
            sensor.label(),
            timestamp_us,
            state.last_timestamp_us,
            state.consecutive_invalid
        );
        false
    }

    /// Run the odometry estimator and feed a successful fit back into the
    /// motion state, unless an external state was supplied.
    fn feed_odometry(
        &mut self,
        calibration: &crate::config::RadarCalibration,
        detections: &EnhancedDetections,
    ) {
        if self.has_external_motion {
            return;
        }

        if self.odometry.process_detections(calibration, detections) {
            self.last_odometry = *self.odometry.latest_estimate();
            self.motion.v_lon_mps = self.last_odometry.v_lon_mps;
            self.motion.v_lat_mps = self.last_odometry.v_lat_mps;
            self.motion.yaw_rate_rps = self.last_odometry.yaw_rate_rps;
        }
    }
}

fn map_corner_detections(input: &RawCornerDetections) -> EnhancedDetections {
    let mut output = EnhancedDetections {
        header: input.header,
        detections: Vec::with_capacity(CORNER_RETURN_COUNT),
    };

    for i in 0..CORNER_RETURN_COUNT {
        output.detections.push(EnhancedDetection {
            range_m: input.range_m[i],
            range_rate_ms: input.range_rate_ms[i],
            range_rate_raw_ms: input.range_rate_raw_ms[i],
            azimuth_raw_rad: input.azimuth_raw_rad[i],
            azimuth_rad: input.azimuth_rad[i],
            amplitude_dbsm: input.amplitude_dbsm[i],
            longitudinal_offset_m: input.longitudinal_offset_m[i],
            lateral_offset_m: input.lateral_offset_m[i],
            motion_status: input.motion_status[i],
            flags: pack_detection_flags(
                input.radar_valid[i],
                input.super_resolution[i],
                input.near_target[i],
                input.host_clutter[i],
                input.multi_bounce[i],
            ),
            ..Default::default()
        });
    }

    output
}

fn map_front_detections(input: &RawFrontDetections) -> (EnhancedDetections, EnhancedDetections) {
    let mut short = EnhancedDetections {
        header: input.header,
        detections: Vec::with_capacity(CORNER_RETURN_COUNT),
    };
    let mut long = EnhancedDetections {
        header: input.header,
        detections: Vec::with_capacity(CORNER_RETURN_COUNT),
    };

    for i in 0..FRONT_RETURN_COUNT {
        let det = EnhancedDetection {
            range_m: input.range_m[i],
            range_rate_ms: input.range_rate_ms[i],
            range_rate_raw_ms: input.range_rate_raw_ms[i],
            azimuth_raw_rad: input.azimuth_raw_rad[i],
            azimuth_rad: input.azimuth_rad[i],
            amplitude_dbsm: input.amplitude_dbsm[i],
            longitudinal_offset_m: input.longitudinal_offset_m[i],
            lateral_offset_m: input.lateral_offset_m[i],
            motion_status: input.motion_status[i],
            flags: pack_detection_flags(
                input.radar_valid[i],
                input.super_resolution[i],
                input.near_target[i],
                input.host_clutter[i],
                input.multi_bounce[i],
            ),
            ..Default::default()
        };

        if i < CORNER_RETURN_COUNT {
            short.detections.push(det);
        } else {
            long.detections.push(det);
        }
    }

    (short, long)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TrackStatus;

    fn initialized_pipeline() -> RadarPipeline {
        let mut pipeline = RadarPipeline::default();
        pipeline.initialize(VehicleParameters::default());
        pipeline
    }

    fn corner_frame(timestamp_us: u64) -> RawCornerDetections {
        let mut input = RawCornerDetections::default();
        input.header.timestamp_us = timestamp_us;
        input
    }

    #[test]
    fn test_uninitialized_pipeline_rejects_frames() {
        let mut pipeline = RadarPipeline::default();
        let err = pipeline
            .process_corner_detections(SensorIndex::FrontLeft, 1_000, &corner_frame(1_000))
            .unwrap_err();
        assert!(matches!(err, RadarError::NotInitialized));

        let err = pipeline
            .process_front_detections(1_000, &RawFrontDetections::default())
            .unwrap_err();
        assert!(matches!(err, RadarError::NotInitialized));
    }

    #[test]
    fn test_corner_output_has_one_slot_per_return() {
        let mut pipeline = initialized_pipeline();
        let output = pipeline
            .process_corner_detections(SensorIndex::FrontLeft, 1_000, &corner_frame(1_000))
            .unwrap();
        assert_eq!(output.detections.detections.len(), CORNER_RETURN_COUNT);
    }

    #[test]
    fn test_front_split_into_halves() {
        let mut pipeline = initialized_pipeline();
        let mut input = RawFrontDetections::default();
        input.header.timestamp_us = 1_000;
        input.range_m[0] = 1.0;
        input.range_m[CORNER_RETURN_COUNT] = 2.0;

        let output = pipeline.process_front_detections(1_000, &input).unwrap();
        assert_eq!(output.short.detections.len(), CORNER_RETURN_COUNT);
        assert_eq!(output.long.detections.len(), CORNER_RETURN_COUNT);
        assert_eq!(output.short.detections[0].range_m, 1.0);
        assert_eq!(output.long.detections[0].range_m, 2.0);
        // Both halves carry the shared front header.
        assert_eq!(output.short.header.timestamp_us, 1_000);
        assert_eq!(output.long.header.timestamp_us, 1_000);
    }

    #[test]
    fn test_flag_packing_in_mapping() {
        let mut pipeline = initialized_pipeline();
        let mut input = corner_frame(1_000);
        input.radar_valid[0] = 1;
        input.multi_bounce[0] = 1;
        input.super_resolution[1] = 1;

        let output = pipeline
            .process_corner_detections(SensorIndex::FrontLeft, 1_000, &input)
            .unwrap();
        assert_eq!(output.detections.detections[0].flags, 0b0001_0001);
        assert_eq!(output.detections.detections[1].flags, 0b0000_0010);
    }

    #[test]
    fn test_is_static_invariant() {
        let mut pipeline = initialized_pipeline();
        let mut input = corner_frame(1_000);
        for i in 0..CORNER_RETURN_COUNT {
            input.radar_valid[i] = 1;
            input.range_rate_ms[i] = if i % 2 == 0 { 0.0 } else { -7.0 };
        }

        let output = pipeline
            .process_corner_detections(SensorIndex::FrontLeft, 1_000, &input)
            .unwrap();
        for det in &output.detections.detections {
            assert_eq!(det.is_static, det.is_stationary && !det.is_moveable);
        }
    }

    #[test]
    fn test_timestamp_discipline() {
        let mut pipeline = initialized_pipeline();
        pipeline
            .process_corner_detections(SensorIndex::FrontLeft, 1_000, &corner_frame(1_000))
            .unwrap();

        let status = pipeline.sensor_status(SensorIndex::FrontLeft);
        assert!(status.initialized);
        assert_eq!(status.last_timestamp_us, 1_000);
        assert_eq!(status.consecutive_invalid, 0);

        // A frame going back in time is non-live and does not advance.
        pipeline
            .process_corner_detections(SensorIndex::FrontLeft, 900, &corner_frame(900))
            .unwrap();
        let status = pipeline.sensor_status(SensorIndex::FrontLeft);
        assert_eq!(status.last_timestamp_us, 1_000);
        assert_eq!(status.consecutive_invalid, 1);

        // Equal timestamps are non-live too.
        pipeline
            .process_corner_detections(SensorIndex::FrontLeft, 1_000, &corner_frame(1_000))
            .unwrap();
        assert_eq!(
            pipeline.sensor_status(SensorIndex::FrontLeft).consecutive_invalid,
            2
        );

        // Progress restores liveness and clears the counter.
        pipeline
            .process_corner_detections(SensorIndex::FrontLeft, 2_000, &corner_frame(2_000))
            .unwrap();
        let status = pipeline.sensor_status(SensorIndex::FrontLeft);
        assert_eq!(status.last_timestamp_us, 2_000);
        assert_eq!(status.consecutive_invalid, 0);
    }

    #[test]
    fn test_liveness_is_per_sensor() {
        let mut pipeline = initialized_pipeline();
        pipeline
            .process_corner_detections(SensorIndex::FrontLeft, 1_000, &corner_frame(1_000))
            .unwrap();
        assert!(!pipeline.sensor_status(SensorIndex::FrontRight).initialized);
    }

    #[test]
    fn test_track_snapshot_replaced_wholesale() {
        let mut pipeline = initialized_pipeline();

        let mut input = RawTrackFusion::default();
        input.status[0] = TrackStatus::Updated as u8;
        input.status[5] = TrackStatus::Coasted as u8;
        input.length[0] = 4.0;
        input.width[0] = 2.0;

        let output = pipeline.process_track_fusion(5_000, &input);
        assert_eq!(output.tracks.len(), 2);
        assert_eq!(output.timestamp_us, 5_000);
        assert_eq!(pipeline.tracks.len(), 2);
        assert_eq!(pipeline.tracks_timestamp_us, 5_000);

        // The next snapshot fully replaces the previous one.
        let empty = RawTrackFusion::default();
        let output = pipeline.process_track_fusion(6_000, &empty);
        assert!(output.tracks.is_empty());
        assert!(pipeline.tracks.is_empty());
    }

    #[test]
    fn test_association_against_snapshot() {
        let mut pipeline = initialized_pipeline();

        let mut tracks = RawTrackFusion::default();
        tracks.status[0] = TrackStatus::Updated as u8;
        tracks.vcs_longitudinal_position[0] = 1.0;
        tracks.vcs_lateral_position[0] = 1.0;
        tracks.length[0] = 4.0;
        tracks.width[0] = 2.0;
        pipeline.process_track_fusion(1_000, &tracks);

        let mut input = corner_frame(2_000);
        input.radar_valid[0] = 1;
        input.longitudinal_offset_m[0] = 1.0;
        input.lateral_offset_m[0] = 1.0;

        let output = pipeline
            .process_corner_detections(SensorIndex::FrontLeft, 2_000, &input)
            .unwrap();
        let det = &output.detections.detections[0];
        assert_eq!(det.fused_track_index, 0);
        assert!(det.is_stationary);
    }

    #[test]
    fn test_external_motion_state_disables_feedback() {
        let mut pipeline = initialized_pipeline();
        let state = VehicleMotionState {
            v_lon_mps: 8.0,
            ..Default::default()
        };
        pipeline.update_vehicle_state(state);

        // Plenty of consistent Doppler that would otherwise update motion.
        let mut input = corner_frame(1_000);
        for i in 0..8 {
            input.radar_valid[i] = 1;
            let angle = i as f32 * 0.2 - 0.8;
            input.azimuth_raw_rad[i] = -angle;
            input.range_rate_ms[i] = -(3.0 * angle.cos());
        }

        let output = pipeline
            .process_corner_detections(SensorIndex::FrontLeft, 1_000, &input)
            .unwrap();
        assert!(!output.odometry_valid);
        assert_eq!(pipeline.motion_state().v_lon_mps, 8.0);
    }

    #[test]
    fn test_odometry_feedback_updates_motion() {
        let mut pipeline = initialized_pipeline();

        let mut input = corner_frame(1_000);
        for i in 0..8 {
            input.radar_valid[i] = 1;
            let angle = i as f32 * 0.2 - 0.8;
            input.azimuth_raw_rad[i] = -angle;
            input.range_rate_ms[i] = -(3.0 * angle.cos());
        }

        let output = pipeline
            .process_corner_detections(SensorIndex::FrontLeft, 1_000, &input)
            .unwrap();
        assert!(output.odometry_valid);
        let estimate = pipeline.latest_odometry();
        assert!(estimate.valid);
        assert!((pipeline.motion_state().v_lon_mps - 3.0).abs() < 0.05);
        assert_eq!(pipeline.motion_state().yaw_rate_rps, 0.0);
    }
}
