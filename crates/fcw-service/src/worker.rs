//! Frame worker
//!
//! Consumes queued frames, keeps the tracks the tracker has confirmed, runs
//! the FCW engine and publishes one JSON line per frame.

use anyhow::{Context, Result};
use fcw_core::{FcwEngine, FrameMeta, RiskLevel, TrackId, TrackedObject, WarningResult};
use metrics::{counter, histogram};
use std::collections::BTreeMap;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::latency::{Clock, LatencyStats};
use crate::message::{Detection, FrameOutput, ReceivedFrame};

pub struct FrameWorker {
    engine: FcwEngine,
    min_hits: u32,
    fps: f64,
    clock: Clock,
    frame_id: u64,
    latency: LatencyStats,
}

impl FrameWorker {
    /// Create new frame worker
    pub fn new(engine: FcwEngine, min_hits: u32, fps: f64, clock: Clock) -> Self {
        info!("Creating frame worker: min_hits={}, fps={}", min_hits, fps);
        Self {
            engine,
            min_hits,
            fps,
            clock,
            frame_id: 0,
            latency: LatencyStats::new(),
        }
    }

    pub fn latency(&self) -> &LatencyStats {
        &self.latency
    }

    /// Run the engine on one frame and build the result (send timestamp still unset)
    pub fn process(&mut self, frame: ReceivedFrame) -> Result<FrameOutput> {
        let timestamp_before_process = self.clock.now_ns();
        self.frame_id += 1;
        let frame_index = frame.message.frame_index.unwrap_or(self.frame_id);

        let confirmed: Vec<TrackedObject> = frame
            .message
            .tracks
            .into_iter()
            .filter(|t| t.is_confirmed(self.min_hits))
            .collect();

        let meta = FrameMeta::new(frame_index, frame.message.timestamp, self.fps);
        let result = self
            .engine
            .process_frame(&meta, &confirmed)
            .with_context(|| format!("Frame {frame_index} failed"))?;
        let timestamp_after_process = self.clock.now_ns();

        record_metrics(&result, timestamp_after_process - timestamp_before_process);

        Ok(FrameOutput {
            frame_index,
            timestamp: frame.message.timestamp,
            recv_timestamp: frame.recv_timestamp,
            timestamp_before_process,
            timestamp_after_process,
            send_timestamp: 0,
            warning: result.warning,
            most_urgent: result.most_urgent,
            detections: detections(&confirmed, &result),
            skipped: result.skipped,
        })
    }

    /// Drain the queue until every sender is gone
    pub async fn run<W>(mut self, mut queue: mpsc::Receiver<ReceivedFrame>, mut out: W) -> Result<LatencyStats>
    where
        W: AsyncWrite + Unpin,
    {
        info!("Frame worker is running");

        while let Some(frame) = queue.recv().await {
            let mut output = match self.process(frame) {
                Ok(output) => output,
                Err(e) => {
                    error!("Exception with frame processing: {:#}", e);
                    continue;
                }
            };

            output.send_timestamp = self.clock.now_ns();
            self.latency
                .record(output.send_timestamp.saturating_sub(output.recv_timestamp));

            let mut line = serde_json::to_vec(&output)?;
            line.push(b'\n');
            out.write_all(&line).await.context("Failed to publish result")?;
            out.flush().await?;
        }

        info!("Frame worker is stopping");
        Ok(self.latency)
    }
}

/// Every confirmed track, with the alert distance of those in danger
fn detections(confirmed: &[TrackedObject], result: &WarningResult) -> BTreeMap<TrackId, Detection> {
    confirmed
        .iter()
        .map(|track| {
            let assessment = result.track(track.id);
            let detection = Detection {
                bbox: track.bbox,
                class: track.class.clone(),
                dangerous_distance: assessment.map_or(0.0, |a| a.dangerous_distance),
                time_to_intersection: assessment.and_then(|a| a.time_to_intersection),
                risk: assessment.map_or(RiskLevel::Safe, |a| a.risk),
            };
            (track.id, detection)
        })
        .collect()
}

fn record_metrics(result: &WarningResult, process_ns: u64) {
    counter!("fcw_frames_processed_total").increment(1);
    counter!("fcw_tracks_evaluated_total").increment(result.tracks.len() as u64);
    counter!("fcw_tracks_skipped_total").increment(result.skipped.len() as u64);
    counter!("fcw_tracks_culled_total").increment(result.culled as u64);
    if result.warning {
        counter!("fcw_warnings_total").increment(1);
    }
    histogram!("fcw_frame_processing_seconds").record(process_ns as f64 * 1.0e-9);
}
