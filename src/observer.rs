//! Detection result notifications.
//!
//! The pipeline publishes one [`DetectionEvent`] per completed cycle to
//! every subscribed [`DetectionObserver`]. Nothing is published for a cycle
//! that did not reach its reset.

use crate::capture::ProducerStatus;
use crate::detection::CycleReport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

/// Result of one detection cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionEvent {
    pub cycle: u64,
    pub detected: bool,
    /// True when `detected` differs from the previous cycle's result.
    pub changed: bool,
    pub motion_count: u32,
    pub required: u32,
    pub total_chunks: u32,
    /// Sequence numbers of frame A and frame B.
    pub frame_sequences: (u64, u64),
    pub timestamp: DateTime<Utc>,
}

impl DetectionEvent {
    pub fn from_report(
        report: &CycleReport,
        previous: Option<bool>,
        frame_sequences: (u64, u64),
    ) -> Self {
        Self {
            cycle: report.cycle,
            detected: report.detected,
            changed: previous.map_or(true, |p| p != report.detected),
            motion_count: report.motion_count,
            required: report.required,
            total_chunks: report.total_chunks,
            frame_sequences,
            timestamp: Utc::now(),
        }
    }
}

/// Receives detection results.
pub trait DetectionObserver {
    fn on_detection(&mut self, event: &DetectionEvent);

    /// Called when the pipeline sees the producer change state.
    fn on_producer_status(&mut self, _status: ProducerStatus) {}
}

impl<O: DetectionObserver + ?Sized> DetectionObserver for Box<O> {
    fn on_detection(&mut self, event: &DetectionEvent) {
        (**self).on_detection(event)
    }

    fn on_producer_status(&mut self, status: ProducerStatus) {
        (**self).on_producer_status(status)
    }
}

/// Logs results through `tracing`: changes at info, repeats at debug.
#[derive(Debug, Default)]
pub struct LogObserver;

impl DetectionObserver for LogObserver {
    fn on_detection(&mut self, event: &DetectionEvent) {
        if event.changed {
            tracing::info!(
                cycle = event.cycle,
                motion_count = event.motion_count,
                required = event.required,
                "{}",
                if event.detected { "Motion detected" } else { "No motion" }
            );
        } else {
            tracing::debug!(
                cycle = event.cycle,
                detected = event.detected,
                motion_count = event.motion_count,
                "Detection result unchanged"
            );
        }
    }

    fn on_producer_status(&mut self, status: ProducerStatus) {
        tracing::debug!(?status, "Producer status changed");
    }
}

/// Writes every event as one JSON line.
#[derive(Debug)]
pub struct JsonLinesObserver<W> {
    writer: W,
}

impl<W: Write> JsonLinesObserver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DetectionObserver for JsonLinesObserver<W> {
    fn on_detection(&mut self, event: &DetectionEvent) {
        let written = serde_json::to_writer(&mut self.writer, event)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(self.writer))
            .and_then(|()| self.writer.flush());
        if let Err(e) = written {
            tracing::warn!(error = %e, cycle = event.cycle, "Failed to write detection event");
        }
    }
}

/// Adapts a closure into an observer.
pub struct FnObserver<F>(pub F);

impl<F: FnMut(&DetectionEvent)> DetectionObserver for FnObserver<F> {
    fn on_detection(&mut self, event: &DetectionEvent) {
        (self.0)(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(cycle: u64, detected: bool) -> CycleReport {
        CycleReport {
            cycle,
            detected,
            motion_count: if detected { 4 } else { 0 },
            required: 1,
            total_chunks: 4,
            fetches: 32,
            samples_ingested: 32,
            evaluations: 4,
            transitions: 100,
        }
    }

    #[test]
    fn test_changed_flag() {
        assert!(DetectionEvent::from_report(&report(0, false), None, (1, 2)).changed);
        assert!(!DetectionEvent::from_report(&report(1, false), Some(false), (3, 4)).changed);
        assert!(DetectionEvent::from_report(&report(2, true), Some(false), (5, 6)).changed);
    }

    #[test]
    fn test_json_lines() {
        let mut observer = JsonLinesObserver::new(Vec::new());
        observer.on_detection(&DetectionEvent::from_report(&report(0, true), None, (1, 2)));
        observer.on_detection(&DetectionEvent::from_report(&report(1, true), Some(true), (3, 4)));

        let output = String::from_utf8(observer.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["detected"], true);
        assert_eq!(first["changed"], true);
        assert_eq!(first["motion_count"], 4);
        assert_eq!(first["frame_sequences"][1], 2);
    }

    #[test]
    fn test_fn_observer() {
        let mut seen = Vec::new();
        {
            let mut observer = FnObserver(|event: &DetectionEvent| seen.push(event.cycle));
            observer.on_detection(&DetectionEvent::from_report(&report(7, true), None, (1, 2)));
        }
        assert_eq!(seen, vec![7]);
    }
}
