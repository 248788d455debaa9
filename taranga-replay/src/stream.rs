//! Line parsers for the recorded radar text streams.
//!
//! Each stream carries one frame per line as whitespace-separated numeric
//! tokens. Detection lines: a 9-field header, then the per-return columns
//! interleaved per return, then a 3-field look/scan tail and an optional
//! per-return elevation tail. Track lines: a 5-field header, then 35
//! columns per track slot, placeholder columns included.

use std::str::SplitAsciiWhitespace;

use taranga_radar::{
    RawCornerDetections, RawFrontDetections, RawTrackFusion, SensorIndex, CORNER_RETURN_COUNT,
    FRONT_RETURN_COUNT, TRACK_COUNT,
};

/// One parsed frame from any of the three stream kinds.
#[derive(Clone, Debug)]
pub enum RawFrame {
    Corner {
        sensor: SensorIndex,
        timestamp_us: u64,
        data: Box<RawCornerDetections>,
        elevation_rad: Vec<f32>,
    },
    Front {
        timestamp_us: u64,
        data: Box<RawFrontDetections>,
        elevation_rad: Vec<f32>,
    },
    Tracks {
        timestamp_us: u64,
        data: Box<RawTrackFusion>,
    },
}

impl RawFrame {
    /// Stream timestamp used for multiplexing.
    pub fn timestamp_us(&self) -> u64 {
        match self {
            RawFrame::Corner { timestamp_us, .. }
            | RawFrame::Front { timestamp_us, .. }
            | RawFrame::Tracks { timestamp_us, .. } => *timestamp_us,
        }
    }
}

/// Which of the three text formats a file carries, decided by its name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamKind {
    Corner,
    Front,
    Tracks,
}

impl StreamKind {
    pub fn from_file_name(name: &str) -> StreamKind {
        let lower = name.to_ascii_lowercase();
        if lower.contains("track") {
            StreamKind::Tracks
        } else if lower.contains("front") {
            StreamKind::Front
        } else {
            StreamKind::Corner
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StreamKind::Corner => "corner",
            StreamKind::Front => "front",
            StreamKind::Tracks => "tracks",
        }
    }
}

/// Parse one line according to the stream kind. `None` drops the line.
pub fn parse_line(kind: StreamKind, line: &str) -> Option<RawFrame> {
    match kind {
        StreamKind::Corner => parse_corner_line(line),
        StreamKind::Front => parse_front_line(line),
        StreamKind::Tracks => parse_track_line(line),
    }
}

struct Tokens<'a> {
    iter: SplitAsciiWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(line: &'a str) -> Tokens<'a> {
        Tokens {
            iter: line.split_ascii_whitespace(),
        }
    }

    fn next(&mut self) -> Option<f64> {
        self.iter.next()?.parse::<f64>().ok()
    }
}

fn parse_corner_line(line: &str) -> Option<RawFrame> {
    let mut tokens = Tokens::new(line);

    let sensor = SensorIndex::from_index(tokens.next()? as usize)?;
    let timestamp_us = tokens.next()? as u64;

    let mut data = Box::new(RawCornerDetections::default());
    data.sensor = sensor;
    parse_detection_header(&mut tokens, &mut data.header)?;

    for i in 0..CORNER_RETURN_COUNT {
        data.range_m[i] = tokens.next()? as f32;
        data.range_rate_ms[i] = tokens.next()? as f32;
        data.range_rate_raw_ms[i] = tokens.next()? as f32;
        data.azimuth_raw_rad[i] = tokens.next()? as f32;
        data.azimuth_rad[i] = tokens.next()? as f32;
        data.amplitude_dbsm[i] = tokens.next()? as f32;
        data.longitudinal_offset_m[i] = tokens.next()? as f32;
        data.lateral_offset_m[i] = tokens.next()? as f32;
        data.motion_status[i] = tokens.next()? as i8;
        data.radar_valid[i] = tokens.next()? as u8;
        data.super_resolution[i] = tokens.next()? as u8;
        data.near_target[i] = tokens.next()? as u8;
        data.host_clutter[i] = tokens.next()? as u8;
        data.multi_bounce[i] = tokens.next()? as u8;
    }

    let elevation_rad = parse_tail(&mut tokens, CORNER_RETURN_COUNT);

    Some(RawFrame::Corner {
        sensor,
        timestamp_us,
        data,
        elevation_rad,
    })
}

fn parse_front_line(line: &str) -> Option<RawFrame> {
    let mut tokens = Tokens::new(line);

    // The leading sensor index is fixed for front frames and discarded.
    let _sensor_index = tokens.next()?;
    let timestamp_us = tokens.next()? as u64;

    let mut data = Box::new(RawFrontDetections::default());
    parse_detection_header(&mut tokens, &mut data.header)?;

    for i in 0..FRONT_RETURN_COUNT {
        data.range_m[i] = tokens.next()? as f32;
        data.range_rate_ms[i] = tokens.next()? as f32;
        data.range_rate_raw_ms[i] = tokens.next()? as f32;
        data.azimuth_raw_rad[i] = tokens.next()? as f32;
        data.azimuth_rad[i] = tokens.next()? as f32;
        data.amplitude_dbsm[i] = tokens.next()? as f32;
        data.longitudinal_offset_m[i] = tokens.next()? as f32;
        data.lateral_offset_m[i] = tokens.next()? as f32;
        data.motion_status[i] = tokens.next()? as i8;
        data.radar_valid[i] = tokens.next()? as u8;
        data.super_resolution[i] = tokens.next()? as u8;
        data.near_target[i] = tokens.next()? as u8;
        data.host_clutter[i] = tokens.next()? as u8;
        data.multi_bounce[i] = tokens.next()? as u8;
    }

    let elevation_rad = parse_tail(&mut tokens, FRONT_RETURN_COUNT);

    Some(RawFrame::Front {
        timestamp_us,
        data,
        elevation_rad,
    })
}

fn parse_detection_header(
    tokens: &mut Tokens<'_>,
    header: &mut taranga_radar::RawDetectionsHeader,
) -> Option<()> {
    header.timestamp_us = tokens.next()? as u64;
    header.horizontal_fov_rad = tokens.next()? as f32;
    header.maximum_range_m = tokens.next()? as f32;
    header.azimuth_polarity = tokens.next()? as f32;
    header.boresight_angle_rad = tokens.next()? as f32;
    header.sensor_longitudinal_m = tokens.next()? as f32;
    header.sensor_lateral_m = tokens.next()? as f32;
    Some(())
}

/// Consume the look/scan tail and the optional per-return elevations.
/// Missing trailing fields are tolerated: the recorded streams were
/// captured both with and without the elevation extension.
fn parse_tail(tokens: &mut Tokens<'_>, returns: usize) -> Vec<f32> {
    // lookType, scanType, lookIndex.
    for _ in 0..3 {
        if tokens.next().is_none() {
            return vec![0.0; returns];
        }
    }

    let mut elevation = vec![0.0; returns];
    for slot in elevation.iter_mut() {
        match tokens.next() {
            Some(value) => *slot = value as f32,
            None => break,
        }
    }
    elevation
}

fn parse_track_line(line: &str) -> Option<RawFrame> {
    let mut tokens = Tokens::new(line);

    let mut data = Box::new(RawTrackFusion::default());
    let timestamp_us = tokens.next()? as u64;
    data.timestamp_us = timestamp_us;
    data.vision_timestamp = tokens.next()? as u64;
    data.fusion_timestamp = tokens.next()? as u64;
    data.fusion_index = tokens.next()? as u32;
    data.image_frame_index = tokens.next()? as u32;

    for i in 0..TRACK_COUNT {
        data.vcs_longitudinal_position[i] = tokens.next()? as f32;
        data.vcs_lateral_position[i] = tokens.next()? as f32;
        for _ in 0..2 {
            tokens.next()?;
        }
        data.length[i] = tokens.next()? as f32;
        data.width[i] = tokens.next()? as f32;
        data.height[i] = tokens.next()? as f32;
        data.probability_of_detection[i] = tokens.next()? as f32;
        data.id[i] = tokens.next()? as i32;
        for _ in 0..8 {
            tokens.next()?;
        }
        data.moving_flag[i] = tokens.next()? as u8;
        data.stationary_flag[i] = tokens.next()? as u8;
        data.moveable_flag[i] = tokens.next()? as u8;
        for _ in 0..5 {
            tokens.next()?;
        }
        data.vehicle_flag[i] = tokens.next()? as u8;
        data.status[i] = tokens.next()? as u8;
        data.object_classification[i] = tokens.next()? as u16;
        data.object_classification_confidence[i] = tokens.next()? as u8;
        data.vcs_lateral_velocity[i] = tokens.next()? as f32;
        data.vcs_longitudinal_velocity[i] = tokens.next()? as f32;
        data.vcs_lateral_acceleration[i] = tokens.next()? as f32;
        data.vcs_longitudinal_acceleration[i] = tokens.next()? as f32;
        data.vcs_heading[i] = tokens.next()? as f32;
        data.vcs_heading_rate[i] = tokens.next()? as f32;
    }

    Some(RawFrame::Tracks { timestamp_us, data })
}

/// Test-only builders for synthetic stream lines, shared with the source
/// multiplexer tests.
#[cfg(test)]
pub(crate) mod test_lines {
    use super::*;

    /// Build a parseable corner line: header tokens, 64 returns with one
    /// live return in slot 0, and the look/scan tail.
    pub(crate) fn synthetic_corner_line(sensor: usize, timestamp: u64) -> String {
        let mut tokens: Vec<String> = vec![
            sensor.to_string(),
            timestamp.to_string(),
            timestamp.to_string(),
            "2.0".into(),
            "80.0".into(),
            "1".into(),
            "0".into(),
            "3.6".into(),
            "0.8".into(),
        ];
        for i in 0..CORNER_RETURN_COUNT {
            let live = i == 0;
            // range rr rr_raw az_raw az amp lonOff latOff motion valid sr nt hc mb
            tokens.push(if live { "5.0".into() } else { "0".into() });
            tokens.push(if live { "-2.0".into() } else { "0".into() });
            tokens.push("0".into());
            tokens.push("0.1".into());
            tokens.push("0.1".into());
            tokens.push(if live { "20.0".into() } else { "0".into() });
            tokens.push(if live { "4.0".into() } else { "0".into() });
            tokens.push(if live { "1.0".into() } else { "0".into() });
            tokens.push("-1".into());
            tokens.push(if live { "1".into() } else { "0".into() });
            tokens.push("0".into());
            tokens.push("0".into());
            tokens.push("0".into());
            tokens.push("0".into());
        }
        tokens.extend(["0".to_string(), "0".to_string(), "0".to_string()]);
        tokens.join(" ")
    }

    pub(crate) fn synthetic_track_line(timestamp: u64, live_slot: usize) -> String {
        let mut tokens: Vec<String> = vec![
            timestamp.to_string(),
            "0".into(),
            "0".into(),
            "1".into(),
            "1".into(),
        ];
        for i in 0..TRACK_COUNT {
            let live = i == live_slot;
            tokens.push(if live { "10.0".into() } else { "0".into() }); // lon
            tokens.push(if live { "1.0".into() } else { "0".into() }); // lat
            tokens.extend(["0".to_string(), "0".to_string()]);
            tokens.push(if live { "4.0".into() } else { "0".into() }); // length
            tokens.push(if live { "2.0".into() } else { "0".into() }); // width
            tokens.push("0".into()); // height
            tokens.push("0.9".into()); // probOfDet
            tokens.push(i.to_string()); // id
            tokens.extend(std::iter::repeat("0".to_string()).take(8));
            tokens.push("0".into()); // moving
            tokens.push("1".into()); // stationary
            tokens.push("0".into()); // moveable
            tokens.extend(std::iter::repeat("0".to_string()).take(5));
            tokens.push("1".into()); // vehicle
            tokens.push(if live { "5".into() } else { "0".into() }); // status
            tokens.push("1".into()); // objectClass
            tokens.push("80".into()); // classConf
            tokens.extend(std::iter::repeat("0".to_string()).take(6)); // vLat vLon aLat aLon heading headingRate
        }
        tokens.join(" ")
    }
}
