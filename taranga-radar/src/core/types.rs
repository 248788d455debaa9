//! Radar frame records and the enums that tag them.
//!
//! The integer discriminants of [`SensorIndex`] and [`DetectionFlag`] appear
//! verbatim in the recorded text streams and are therefore closed sets: do
//! not renumber or extend them.

/// Returns per corner-radar frame.
pub const CORNER_RETURN_COUNT: usize = 64;

/// Returns per front-radar frame (split into a short and a long half).
pub const FRONT_RETURN_COUNT: usize = 128;

/// Physical radar unit, in stream order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SensorIndex {
    FrontLeft = 0,
    FrontRight = 1,
    RearLeft = 2,
    RearRight = 3,
    FrontShort = 4,
    FrontLong = 5,
}

impl SensorIndex {
    /// Number of sensor slots.
    pub const COUNT: usize = 6;

    /// All sensors in index order.
    pub const ALL: [SensorIndex; Self::COUNT] = [
        SensorIndex::FrontLeft,
        SensorIndex::FrontRight,
        SensorIndex::RearLeft,
        SensorIndex::RearRight,
        SensorIndex::FrontShort,
        SensorIndex::FrontLong,
    ];

    /// Bounds-checked conversion from a raw stream index.
    #[inline]
    pub fn from_index(index: usize) -> Option<SensorIndex> {
        Self::ALL.get(index).copied()
    }

    /// Slot position for array indexing.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// True for the mid-range front unit (sensors 4 and 5); the four
    /// corner units are short-range.
    #[inline]
    pub fn is_mid_range(self) -> bool {
        matches!(self, SensorIndex::FrontShort | SensorIndex::FrontLong)
    }

    /// Stable lowercase label used in logs and frame source lists.
    pub fn label(self) -> &'static str {
        match self {
            SensorIndex::FrontLeft => "front_left",
            SensorIndex::FrontRight => "front_right",
            SensorIndex::RearLeft => "rear_left",
            SensorIndex::RearRight => "rear_right",
            SensorIndex::FrontShort => "front_short",
            SensorIndex::FrontLong => "front_long",
        }
    }
}

/// Per-return qualifier bits, packed into one byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DetectionFlag {
    Valid = 1 << 0,
    SuperResolution = 1 << 1,
    NearTarget = 1 << 2,
    HostVehicleClutter = 1 << 3,
    MultiBounce = 1 << 4,
}

/// A detection participates in classification, association, odometry and
/// mapping only when at least one of these bits is set.
pub const USABLE_FLAGS: u8 = DetectionFlag::Valid as u8 | DetectionFlag::SuperResolution as u8;

/// Pack the five raw flag columns into the flag byte.
#[inline]
pub fn pack_detection_flags(
    valid: u8,
    super_resolution: u8,
    near_target: u8,
    host_clutter: u8,
    multi_bounce: u8,
) -> u8 {
    (valid != 0) as u8
        | (((super_resolution != 0) as u8) << 1)
        | (((near_target != 0) as u8) << 2)
        | (((host_clutter != 0) as u8) << 3)
        | (((multi_bounce != 0) as u8) << 4)
}

/// Frame header shared by corner and front detection frames.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawDetectionsHeader {
    pub timestamp_us: u64,
    pub horizontal_fov_rad: f32,
    pub maximum_range_m: f32,
    pub azimuth_polarity: f32,
    pub boresight_angle_rad: f32,
    pub sensor_longitudinal_m: f32,
    pub sensor_lateral_m: f32,
}

/// Raw per-frame detection arrays from one corner radar.
#[derive(Clone, Debug)]
pub struct RawCornerDetections {
    pub sensor: SensorIndex,
    pub header: RawDetectionsHeader,
    pub range_m: [f32; CORNER_RETURN_COUNT],
    pub range_rate_ms: [f32; CORNER_RETURN_COUNT],
    pub range_rate_raw_ms: [f32; CORNER_RETURN_COUNT],
    pub azimuth_raw_rad: [f32; CORNER_RETURN_COUNT],
    pub azimuth_rad: [f32; CORNER_RETURN_COUNT],
    pub amplitude_dbsm: [f32; CORNER_RETURN_COUNT],
    pub longitudinal_offset_m: [f32; CORNER_RETURN_COUNT],
    pub lateral_offset_m: [f32; CORNER_RETURN_COUNT],
    pub motion_status: [i8; CORNER_RETURN_COUNT],
    pub radar_valid: [u8; CORNER_RETURN_COUNT],
    pub super_resolution: [u8; CORNER_RETURN_COUNT],
    pub near_target: [u8; CORNER_RETURN_COUNT],
    pub host_clutter: [u8; CORNER_RETURN_COUNT],
    pub multi_bounce: [u8; CORNER_RETURN_COUNT],
}

impl Default for RawCornerDetections {
    fn default() -> Self {
        Self {
            sensor: SensorIndex::FrontLeft,
            header: RawDetectionsHeader::default(),
            range_m: [0.0; CORNER_RETURN_COUNT],
            range_rate_ms: [0.0; CORNER_RETURN_COUNT],
            range_rate_raw_ms: [0.0; CORNER_RETURN_COUNT],
            azimuth_raw_rad: [0.0; CORNER_RETURN_COUNT],
            azimuth_rad: [0.0; CORNER_RETURN_COUNT],
            amplitude_dbsm: [0.0; CORNER_RETURN_COUNT],
            longitudinal_offset_m: [0.0; CORNER_RETURN_COUNT],
            lateral_offset_m: [0.0; CORNER_RETURN_COUNT],
            motion_status: [-1; CORNER_RETURN_COUNT],
            radar_valid: [0; CORNER_RETURN_COUNT],
            super_resolution: [0; CORNER_RETURN_COUNT],
            near_target: [0; CORNER_RETURN_COUNT],
            host_clutter: [0; CORNER_RETURN_COUNT],
            multi_bounce: [0; CORNER_RETURN_COUNT],
        }
    }
}

/// Raw per-frame detection arrays from the shared front mid-range frame.
///
/// The first 64 returns belong to the short look, the last 64 to the long
/// look; both halves share this header.
#[derive(Clone, Debug)]
pub struct RawFrontDetections {
    pub header: RawDetectionsHeader,
    pub range_m: [f32; FRONT_RETURN_COUNT],
    pub range_rate_ms: [f32; FRONT_RETURN_COUNT],
    pub range_rate_raw_ms: [f32; FRONT_RETURN_COUNT],
    pub azimuth_raw_rad: [f32; FRONT_RETURN_COUNT],
    pub azimuth_rad: [f32; FRONT_RETURN_COUNT],
    pub amplitude_dbsm: [f32; FRONT_RETURN_COUNT],
    pub longitudinal_offset_m: [f32; FRONT_RETURN_COUNT],
    pub lateral_offset_m: [f32; FRONT_RETURN_COUNT],
    pub motion_status: [i8; FRONT_RETURN_COUNT],
    pub radar_valid: [u8; FRONT_RETURN_COUNT],
    pub super_resolution: [u8; FRONT_RETURN_COUNT],
    pub near_target: [u8; FRONT_RETURN_COUNT],
    pub host_clutter: [u8; FRONT_RETURN_COUNT],
    pub multi_bounce: [u8; FRONT_RETURN_COUNT],
}

impl Default for RawFrontDetections {
    fn default() -> Self {
        Self {
            header: RawDetectionsHeader::default(),
            range_m: [0.0; FRONT_RETURN_COUNT],
            range_rate_ms: [0.0; FRONT_RETURN_COUNT],
            range_rate_raw_ms: [0.0; FRONT_RETURN_COUNT],
            azimuth_raw_rad: [0.0; FRONT_RETURN_COUNT],
            azimuth_rad: [0.0; FRONT_RETURN_COUNT],
            amplitude_dbsm: [0.0; FRONT_RETURN_COUNT],
            longitudinal_offset_m: [0.0; FRONT_RETURN_COUNT],
            lateral_offset_m: [0.0; FRONT_RETURN_COUNT],
            motion_status: [-1; FRONT_RETURN_COUNT],
            radar_valid: [0; FRONT_RETURN_COUNT],
            super_resolution: [0; FRONT_RETURN_COUNT],
            near_target: [0; FRONT_RETURN_COUNT],
            host_clutter: [0; FRONT_RETURN_COUNT],
            multi_bounce: [0; FRONT_RETURN_COUNT],
        }
    }
}

/// One return after mapping, classification and association.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnhancedDetection {
    pub range_m: f32,
    pub range_rate_ms: f32,
    pub range_rate_raw_ms: f32,
    pub azimuth_raw_rad: f32,
    pub azimuth_rad: f32,
    pub amplitude_dbsm: f32,
    pub longitudinal_offset_m: f32,
    pub lateral_offset_m: f32,
    pub motion_status: i8,
    pub flags: u8,
    /// Index into the current track snapshot, -1 when unassociated.
    pub fused_track_index: i8,
    pub is_stationary: bool,
    pub is_moveable: bool,
    pub is_static: bool,
    pub stationary_probability: f32,
}

impl Default for EnhancedDetection {
    fn default() -> Self {
        Self {
            range_m: 0.0,
            range_rate_ms: 0.0,
            range_rate_raw_ms: 0.0,
            azimuth_raw_rad: 0.0,
            azimuth_rad: 0.0,
            amplitude_dbsm: 0.0,
            longitudinal_offset_m: 0.0,
            lateral_offset_m: 0.0,
            motion_status: -1,
            flags: 0,
            fused_track_index: -1,
            is_stationary: false,
            is_moveable: false,
            is_static: false,
            stationary_probability: 0.0,
        }
    }
}

impl EnhancedDetection {
    /// True when at least one of the Valid / SuperResolution bits is set.
    #[inline]
    pub fn is_usable(&self) -> bool {
        self.flags & USABLE_FLAGS != 0
    }

    /// An all-zero slot carries no measurement and is dropped before the
    /// detections leave the engine.
    #[inline]
    pub fn is_null_slot(&self) -> bool {
        self.flags == 0
            && self.range_m <= 0.0
            && self.longitudinal_offset_m == 0.0
            && self.lateral_offset_m == 0.0
    }
}

/// An enhanced detection frame: the raw header plus one record per return.
#[derive(Clone, Debug, Default)]
pub struct EnhancedDetections {
    pub header: RawDetectionsHeader,
    pub detections: Vec<EnhancedDetection>,
}

/// Planar ego motion carried between frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VehicleMotionState {
    pub v_lon_mps: f32,
    pub v_lat_mps: f32,
    pub yaw_rate_rps: f32,
    pub v_lon_variance: f32,
    pub v_lat_variance: f32,
    pub yaw_rate_variance: f32,
}

impl Default for VehicleMotionState {
    fn default() -> Self {
        Self {
            v_lon_mps: 0.0,
            v_lat_mps: 0.0,
            yaw_rate_rps: 0.0,
            v_lon_variance: 0.1,
            v_lat_variance: 0.1,
            yaw_rate_variance: 0.1,
        }
    }
}

/// Output of the Doppler odometry estimator.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OdometryEstimate {
    pub timestamp_us: u64,
    pub v_lon_mps: f32,
    pub v_lat_mps: f32,
    /// Always zero: yaw rate is unobservable from a single-frame fit.
    pub yaw_rate_rps: f32,
    /// Row-major 3x3 covariance over (vLon, vLat, yawRate); only the
    /// diagonal is populated.
    pub covariance: [f32; 9],
    pub inlier_count: u32,
    pub valid: bool,
}

/// A positioned per-return record, ready for mapping and export.
///
/// Ground-frame convention: `x` is lateral, `y` is longitudinal.
#[derive(Clone, Copy, Debug)]
pub struct DetectionPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub range_m: f32,
    pub range_rate_ms: f32,
    pub range_rate_raw_ms: f32,
    pub azimuth_raw_rad: f32,
    pub azimuth_rad: f32,
    pub amplitude_dbsm: f32,
    pub longitudinal_offset_m: f32,
    pub lateral_offset_m: f32,
    pub motion_status: i8,
    pub flags: u8,
    pub fused_track_index: i8,
    pub is_stationary: bool,
    pub is_moveable: bool,
    pub is_static: bool,
    pub stationary_probability: f32,
    pub sensor: SensorIndex,
    pub horizontal_fov_rad: f32,
    pub maximum_range_m: f32,
    pub azimuth_polarity: f32,
    pub boresight_angle_rad: f32,
    pub sensor_longitudinal_m: f32,
    pub sensor_lateral_m: f32,
    pub elevation_rad: f32,
}

impl Default for DetectionPoint {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            range_m: 0.0,
            range_rate_ms: 0.0,
            range_rate_raw_ms: 0.0,
            azimuth_raw_rad: 0.0,
            azimuth_rad: 0.0,
            amplitude_dbsm: 0.0,
            longitudinal_offset_m: 0.0,
            lateral_offset_m: 0.0,
            motion_status: -1,
            flags: 0,
            fused_track_index: -1,
            is_stationary: false,
            is_moveable: false,
            is_static: false,
            stationary_probability: 0.0,
            sensor: SensorIndex::FrontLeft,
            horizontal_fov_rad: 0.0,
            maximum_range_m: 0.0,
            azimuth_polarity: 0.0,
            boresight_angle_rad: 0.0,
            sensor_longitudinal_m: 0.0,
            sensor_lateral_m: 0.0,
            elevation_rad: 0.0,
        }
    }
}

impl DetectionPoint {
    /// True when at least one of the Valid / SuperResolution bits is set.
    #[inline]
    pub fn is_usable(&self) -> bool {
        self.flags & USABLE_FLAGS != 0
    }
}
