//! Multiplexing reader over the recorded text streams.
//!
//! Each stream holds at most one pending parsed frame; `next_frame` refills
//! the pending slots and hands out the frame with the earliest timestamp,
//! so multiplexed streams replay in chronological order. Unparseable lines
//! are dropped with a warning and the stream continues.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::{ReplayError, Result};
use crate::stream::{parse_line, RawFrame, StreamKind};

struct StreamState {
    kind: StreamKind,
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    pending: Option<RawFrame>,
    exhausted: bool,
    last_timestamp_us: Option<u64>,
}

impl StreamState {
    /// Pull lines until one parses or the file ends.
    fn refill(&mut self) {
        if self.pending.is_some() || self.exhausted {
            return;
        }

        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    warn!("read error in {}: {e}", self.path.display());
                    continue;
                }
                None => {
                    self.exhausted = true;
                    info!("completed reading {}", self.path.display());
                    return;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match parse_line(self.kind, &line) {
                Some(frame) => {
                    let timestamp = frame.timestamp_us();
                    if let Some(last) = self.last_timestamp_us {
                        if timestamp < last {
                            warn!(
                                "non-monotonic timestamp in {}: {timestamp}us after {last}us",
                                self.path.display()
                            );
                        }
                    }
                    self.last_timestamp_us = Some(timestamp);
                    self.pending = Some(frame);
                    return;
                }
                None => {
                    warn!("dropping unparseable {} line in {}", self.kind.label(), self.path.display());
                }
            }
        }
    }
}

/// Chronological frame source over one or more recorded streams.
pub struct FrameSource {
    streams: Vec<StreamState>,
}

impl FrameSource {
    /// Open the given stream files. Files that cannot be opened are skipped
    /// with a warning; at least one stream must remain.
    pub fn open(paths: &[PathBuf]) -> Result<FrameSource> {
        let mut streams = Vec::new();

        for path in paths {
            let kind = stream_kind_of(path);
            match File::open(path) {
                Ok(file) => {
                    info!("loaded {} stream: {}", kind.label(), path.display());
                    streams.push(StreamState {
                        kind,
                        path: path.clone(),
                        lines: BufReader::new(file).lines(),
                        pending: None,
                        exhausted: false,
                        last_timestamp_us: None,
                    });
                }
                Err(e) => {
                    warn!("failed to open {}: {e}", path.display());
                }
            }
        }

        if streams.is_empty() {
            return Err(ReplayError::NoInputs);
        }
        Ok(FrameSource { streams })
    }

    /// Next frame across all streams in timestamp order, or `None` when
    /// every stream is exhausted.
    pub fn next_frame(&mut self) -> Option<RawFrame> {
        for stream in &mut self.streams {
            stream.refill();
        }

        let mut best: Option<usize> = None;
        let mut best_timestamp = u64::MAX;
        for (i, stream) in self.streams.iter().enumerate() {
            if let Some(frame) = &stream.pending {
                if frame.timestamp_us() < best_timestamp {
                    best_timestamp = frame.timestamp_us();
                    best = Some(i);
                }
            }
        }

        self.streams[best?].pending.take()
    }
}

fn stream_kind_of(path: &Path) -> StreamKind {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    StreamKind::from_file_name(&name)
}
