//! Consumer loop: frame pairs in, detection events out.
//!
//! The pipeline runs on the caller's thread. It dequeues two frames,
//! runs one detection cycle over them and publishes the result to every
//! subscribed observer. An empty buffer is waited on in short slices so a
//! stop request is noticed promptly; it is never an error.

use crate::capture::{Frame, FrameReceiver, PauseReason, ProducerHandle, ProducerStatus};
use crate::config::PipelineConfig;
use crate::detection::{DetectorError, MotionDetector};
use crate::observer::{DetectionEvent, DetectionObserver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

/// Why [`Pipeline::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The stop flag was set.
    Stopped,
    /// The frame buffer was closed by the producer.
    SourceClosed,
    /// The configured number of cycles completed.
    CycleLimit,
}

/// Running totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub cycles: u64,
    pub detections: u64,
    /// Pairs rejected by the detector.
    pub skipped_pairs: u64,
    /// Waits on an empty buffer behind a paused producer, one per pause.
    pub stalls: u64,
}

enum Next {
    Frame(Frame),
    Stopped,
    Closed,
}

/// Drives a [`MotionDetector`] from the frame buffer.
pub struct Pipeline {
    detector: MotionDetector,
    config: PipelineConfig,
    observers: Vec<Box<dyn DetectionObserver>>,
    last_result: Option<bool>,
    last_status: Option<ProducerStatus>,
    stall_reported: bool,
    stats: PipelineStats,
}

impl Pipeline {
    pub fn new(detector: MotionDetector, config: PipelineConfig) -> Self {
        Self {
            detector,
            config,
            observers: Vec::new(),
            last_result: None,
            last_status: None,
            stall_reported: false,
            stats: PipelineStats::default(),
        }
    }

    /// Adds an observer; it receives every event published from now on.
    pub fn subscribe(&mut self, observer: impl DetectionObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn detector(&self) -> &MotionDetector {
        &self.detector
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Result of the most recent cycle.
    pub fn last_result(&self) -> Option<bool> {
        self.last_result
    }

    /// Runs one cycle over a pair and publishes its event.
    ///
    /// A rejected pair is counted as skipped and nothing is published.
    pub fn process_pair(&mut self, a: &Frame, b: &Frame) -> Result<DetectionEvent, DetectorError> {
        let report = match self.detector.run_cycle(a, b) {
            Ok(report) => report,
            Err(e) => {
                self.stats.skipped_pairs += 1;
                return Err(e);
            }
        };

        let event =
            DetectionEvent::from_report(&report, self.last_result, (a.sequence(), b.sequence()));
        self.last_result = Some(report.detected);
        self.stats.cycles += 1;
        if report.detected {
            self.stats.detections += 1;
        }

        for observer in &mut self.observers {
            observer.on_detection(&event);
        }
        Ok(event)
    }

    /// Consumes frame pairs until stopped, closed or the cycle limit.
    pub fn run(
        &mut self,
        receiver: &FrameReceiver,
        producer: Option<&ProducerHandle>,
        stop: &AtomicBool,
    ) -> RunOutcome {
        tracing::info!(
            total_chunks = self.detector.decision().total_chunks(),
            required = self.detector.decision().required(),
            "Detection pipeline started"
        );

        let outcome = loop {
            if self.limit_reached() {
                break RunOutcome::CycleLimit;
            }

            let a = match self.next_frame(receiver, producer, stop) {
                Next::Frame(frame) => frame,
                Next::Stopped => break RunOutcome::Stopped,
                Next::Closed => break RunOutcome::SourceClosed,
            };
            // Frame A alone is never published.
            let b = match self.next_frame(receiver, producer, stop) {
                Next::Frame(frame) => frame,
                Next::Stopped => break RunOutcome::Stopped,
                Next::Closed => break RunOutcome::SourceClosed,
            };

            if let Err(e) = self.process_pair(&a, &b) {
                tracing::warn!(error = %e, "Skipping frame pair");
            }

            if let Some(producer) = producer {
                self.observe_producer(producer);
                if self.config.auto_resume
                    && producer.status() == ProducerStatus::Paused(PauseReason::BufferFull)
                {
                    producer.resume();
                }
            }
        };

        self.detector.abandon();
        tracing::info!(
            ?outcome,
            cycles = self.stats.cycles,
            detections = self.stats.detections,
            skipped_pairs = self.stats.skipped_pairs,
            stalls = self.stats.stalls,
            "Detection pipeline finished"
        );
        outcome
    }

    fn limit_reached(&self) -> bool {
        self.config
            .max_cycles
            .is_some_and(|limit| self.stats.cycles >= limit)
    }

    fn next_frame(
        &mut self,
        receiver: &FrameReceiver,
        producer: Option<&ProducerHandle>,
        stop: &AtomicBool,
    ) -> Next {
        let slice = Duration::from_millis(self.config.poll_interval_ms.max(1));
        loop {
            if stop.load(Ordering::SeqCst) {
                return Next::Stopped;
            }
            match receiver.recv_timeout(slice) {
                Ok(frame) => return Next::Frame(frame),
                Err(RecvTimeoutError::Timeout) => {
                    if let Some(producer) = producer {
                        self.observe_producer(producer);
                        self.report_stall();
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return Next::Closed,
            }
        }
    }

    fn observe_producer(&mut self, producer: &ProducerHandle) {
        let status = producer.status();
        if self.last_status == Some(status) {
            return;
        }
        self.last_status = Some(status);
        self.stall_reported = false;
        for observer in &mut self.observers {
            observer.on_producer_status(status);
        }
    }

    /// Warns once per pause while the buffer is empty.
    fn report_stall(&mut self) {
        let Some(ProducerStatus::Paused(reason)) = self.last_status else {
            return;
        };
        if self.stall_reported {
            return;
        }
        self.stall_reported = true;
        self.stats.stalls += 1;
        match reason {
            PauseReason::CaptureFailed => tracing::warn!(
                ?reason,
                "Frame acquisition stalled: producer paused after a capture failure"
            ),
            PauseReason::BufferFull => tracing::warn!(
                ?reason,
                "Frame acquisition stalled: producer paused on a full buffer and waits for an \
                 explicit resume (or auto_resume)"
            ),
        }
    }
}
