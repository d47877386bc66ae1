//! Frame reader
//!
//! Parses JSON-lines frames, rejects frames older than the last accepted
//! one and feeds the bounded worker queue.

use anyhow::{Context, Result};
use metrics::counter;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use crate::latency::Clock;
use crate::message::{FrameMessage, ReceivedFrame};

pub struct FrameReader {
    clock: Clock,
    realtime: bool,
    last_timestamp: u64,
}

impl FrameReader {
    pub fn new(clock: Clock, realtime: bool) -> Self {
        Self {
            clock,
            realtime,
            last_timestamp: 0,
        }
    }

    /// Parse and timestamp one input line
    pub fn accept(&mut self, line: &str) -> Option<ReceivedFrame> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let message: FrameMessage = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => {
                warn!("Discarding malformed frame: {}", e);
                counter!("fcw_frames_rejected_total", "reason" => "malformed").increment(1);
                return None;
            }
        };

        if message.timestamp < self.last_timestamp {
            error!(
                "Received frame with older timestamp: {}, last_timestamp: {}, diff: {}",
                message.timestamp,
                self.last_timestamp,
                message.timestamp as i128 - self.last_timestamp as i128
            );
            counter!("fcw_frames_rejected_total", "reason" => "older_timestamp").increment(1);
            return None;
        }
        self.last_timestamp = message.timestamp;

        Some(ReceivedFrame {
            message,
            recv_timestamp: self.clock.now_ns(),
        })
    }

    /// Read until end of input or until the worker goes away
    pub async fn run<R>(mut self, input: R, queue: mpsc::Sender<ReceivedFrame>) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await.context("Failed to read input")? {
            let Some(frame) = self.accept(&line) else {
                continue;
            };

            if self.realtime {
                match queue.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        debug!("Frame queue full, dropping frame");
                        counter!("fcw_frames_dropped_total").increment(1);
                    }
                    Err(TrySendError::Closed(_)) => break,
                }
            } else if queue.send(frame).await.is_err() {
                break;
            }
        }

        info!("Input exhausted");
        Ok(())
    }
}

/// Open `-` as stdin, anything else as a file
pub async fn open_input(input: &str) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if input == "-" {
        Ok(Box::new(BufReader::new(tokio::io::stdin())))
    } else {
        let file = tokio::fs::File::open(input)
            .await
            .with_context(|| format!("Failed to open input {input}"))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_older_timestamp_rejected() {
        let mut reader = FrameReader::new(Clock::new(), false);
        assert!(reader.accept(r#"{"timestamp": 100, "tracks": []}"#).is_some());
        assert!(reader.accept(r#"{"timestamp": 90, "tracks": []}"#).is_none());
        assert!(reader.accept(r#"{"timestamp": 100, "tracks": []}"#).is_some());
        assert!(reader.accept(r#"{"timestamp": 140}"#).is_some());
    }

    #[test]
    fn test_malformed_and_blank_lines_skipped() {
        let mut reader = FrameReader::new(Clock::new(), false);
        assert!(reader.accept("").is_none());
        assert!(reader.accept("{not json").is_none());
        assert!(reader.accept(r#"{"timestamp": 5}"#).is_some());
    }

    #[tokio::test]
    async fn test_run_feeds_queue() {
        let input = b"{\"timestamp\": 1}\n{\"timestamp\": 0}\n{\"timestamp\": 2}\n" as &[u8];
        let (tx, mut rx) = mpsc::channel(8);
        FrameReader::new(Clock::new(), false)
            .run(BufReader::new(input), tx)
            .await
            .unwrap();

        let mut timestamps = Vec::new();
        while let Some(frame) = rx.recv().await {
            timestamps.push(frame.message.timestamp);
        }
        assert_eq!(timestamps, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_realtime_drops_when_full() {
        let input = b"{\"timestamp\": 1}\n{\"timestamp\": 2}\n{\"timestamp\": 3}\n" as &[u8];
        let (tx, mut rx) = mpsc::channel(1);
        FrameReader::new(Clock::new(), true)
            .run(BufReader::new(input), tx)
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().message.timestamp, 1);
        assert!(rx.recv().await.is_none());
    }
}
