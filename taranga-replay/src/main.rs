//! Taranga replay - recorded radar stream playback.
//!
//! Reads the recorded corner / front / track text streams, multiplexes
//! them chronologically on an I/O thread, and drives the radar processing
//! engine on the main thread: enhanced detections, occupancy grid and
//! virtual ring per frame. The visualizer-facing outputs are summarized on
//! the log.

mod engine;
mod error;
mod source;
mod stream;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use clap::Parser;
use log::{error, info, warn};

use taranga_radar::{EngineConfig, VehicleParameters};

use engine::ReplayEngine;
use error::{ReplayError, Result};
use source::FrameSource;

/// Default stream file names looked up under the data root.
const DEFAULT_FILES: [&str; 3] = [
    "fourCornersfusedRadarDetections.txt",
    "fusedFrontRadarsDetections.txt",
    "fusedRadarTracks.txt",
];

/// Bounded hand-off between the reader thread and the engine.
const FRAME_QUEUE_DEPTH: usize = 16;

/// Recorded radar stream playback
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input data files (corner / front / track streams)
    files: Vec<String>,

    /// Directory searched for relative data files and Vehicle.ini
    #[arg(long)]
    data_root: Option<PathBuf>,

    /// Vehicle parameter INI file
    #[arg(long)]
    vehicle_config: Option<PathBuf>,

    /// Engine tuning YAML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Virtual ring segment count override
    #[arg(long)]
    segments: Option<usize>,

    /// Virtual ring fallback range override (meters)
    #[arg(long)]
    max_range: Option<f32>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    info!("taranga-replay v{}", env!("CARGO_PKG_VERSION"));

    let data_root = args
        .data_root
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default().join("data"));
    info!("data root: {}", data_root.display());

    let files: Vec<String> = if args.files.is_empty() {
        DEFAULT_FILES.iter().map(|s| s.to_string()).collect()
    } else {
        args.files.clone()
    };
    let paths: Vec<PathBuf> = files
        .iter()
        .map(|file| {
            let path = PathBuf::from(file);
            if path.is_absolute() {
                path
            } else {
                data_root.join(file)
            }
        })
        .collect();

    let vehicle_config = resolve_vehicle_config(&args, &data_root);
    info!("vehicle config: {}", vehicle_config.display());
    let parameters = VehicleParameters::load(&vehicle_config)?;

    let mut config = EngineConfig::load_or_default(args.config.as_deref())?;
    if let Some(segments) = args.segments {
        config.ring.segment_count = segments;
    }
    if let Some(max_range) = args.max_range {
        config.ring.fallback_range_m = max_range;
    }

    let source = FrameSource::open(&paths)?;
    let mut engine = ReplayEngine::new(parameters, &config);

    // Stop flag checked between frames on both sides of the queue.
    let running = Arc::new(AtomicBool::new(true));
    let reader_running = Arc::clone(&running);
    ctrlc::set_handler({
        let running = Arc::clone(&running);
        move || {
            info!("received shutdown signal");
            running.store(false, Ordering::Relaxed);
        }
    })
    .map_err(|e| {
        ReplayError::Io(std::io::Error::other(format!(
            "failed to set Ctrl-C handler: {e}"
        )))
    })?;

    // Reader thread: multiplex the streams in timestamp order and hand
    // parsed frames over a bounded SPSC queue.
    let (sender, receiver) = crossbeam_channel::bounded(FRAME_QUEUE_DEPTH);
    let reader = thread::Builder::new()
        .name("frame-reader".to_string())
        .spawn(move || {
            let mut source = source;
            while reader_running.load(Ordering::Relaxed) {
                match source.next_frame() {
                    Some(frame) => {
                        if sender.send(frame).is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        })?;

    let mut total_points: u64 = 0;
    let mut dropped_frames: u64 = 0;
    for frame in receiver.iter() {
        if !running.load(Ordering::Relaxed) {
            break;
        }

        match engine.process(frame) {
            Ok(output) => {
                total_points += output.points.len() as u64;
                if let Some(track_count) = output.track_count {
                    info!(
                        "{}us: track snapshot with {} live tracks",
                        output.timestamp_us, track_count
                    );
                }
            }
            Err(e) => {
                dropped_frames += 1;
                warn!("frame dropped: {e}");
            }
        }
    }
    drop(receiver);

    if reader.join().is_err() {
        warn!("frame reader thread panicked");
    }

    let occupied = engine.occupied_cells();
    let ring = engine.ring_points();
    let odometry = engine.latest_odometry();
    info!(
        "processed {} frames ({} dropped), {} points",
        engine.frames_processed(),
        dropped_frames,
        total_points
    );
    info!(
        "final map: {} occupied cells, {} ring points",
        occupied.len(),
        ring.len()
    );
    if odometry.valid {
        info!(
            "last odometry: vLon {:.2} m/s, vLat {:.2} m/s ({} inliers)",
            odometry.v_lon_mps, odometry.v_lat_mps, odometry.inlier_count
        );
    } else {
        info!("no valid odometry estimate at end of playback");
    }

    Ok(())
}

fn resolve_vehicle_config(args: &Args, data_root: &std::path::Path) -> PathBuf {
    if let Some(path) = &args.vehicle_config {
        return path.clone();
    }
    let default = data_root.join("Vehicle.ini");
    if default.exists() {
        return default;
    }
    let fallback = std::env::current_dir().unwrap_or_default().join("Vehicle.ini");
    if fallback.exists() {
        return fallback;
    }
    default
}
