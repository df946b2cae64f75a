//! Metrics collection and registry.

use crate::capture::ProducerStatus;
use crate::observer::{DetectionEvent, DetectionObserver};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus metrics registry for the detection pipeline.
///
/// Clones share the same underlying metrics, so one clone can be
/// subscribed to the pipeline while another is served over HTTP.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,

    // Detection metrics
    cycles_total: IntCounter,
    detections_total: IntCounter,
    state: IntGauge,
    last_motion_count: IntGauge,
    required_count: IntGauge,

    // Producer metrics
    producer_paused: IntGauge,
}

impl MetricsRegistry {
    /// Creates a new registry with every detection metric registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let cycles_total = IntCounter::new(
            "fsm_motion_cycles_total",
            "Total number of completed detection cycles",
        )?;
        let detections_total = IntCounter::new(
            "fsm_motion_detections_total",
            "Total number of cycles that reported motion",
        )?;
        let state = IntGauge::new(
            "fsm_motion_state",
            "Result of the last cycle (1=motion, 0=no motion)",
        )?;
        let last_motion_count = IntGauge::new(
            "fsm_motion_last_motion_count",
            "Chunks above threshold in the last cycle",
        )?;
        let required_count = IntGauge::new(
            "fsm_motion_required_count",
            "Chunks above threshold needed to report motion",
        )?;
        let producer_paused = IntGauge::new(
            "fsm_motion_producer_paused",
            "Whether frame acquisition is paused (1=paused, 0=running or stopped)",
        )?;

        registry.register(Box::new(cycles_total.clone()))?;
        registry.register(Box::new(detections_total.clone()))?;
        registry.register(Box::new(state.clone()))?;
        registry.register(Box::new(last_motion_count.clone()))?;
        registry.register(Box::new(required_count.clone()))?;
        registry.register(Box::new(producer_paused.clone()))?;

        Ok(Self {
            registry,
            cycles_total,
            detections_total,
            state,
            last_motion_count,
            required_count,
            producer_paused,
        })
    }

    /// Records one completed cycle.
    pub fn record(&self, event: &DetectionEvent) {
        self.cycles_total.inc();
        if event.detected {
            self.detections_total.inc();
        }
        self.state.set(i64::from(event.detected));
        self.last_motion_count.set(i64::from(event.motion_count));
        self.required_count.set(i64::from(event.required));
    }

    pub fn set_producer_status(&self, status: ProducerStatus) {
        let paused = matches!(status, ProducerStatus::Paused(_));
        self.producer_paused.set(i64::from(paused));
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl DetectionObserver for MetricsRegistry {
    fn on_detection(&mut self, event: &DetectionEvent) {
        self.record(event);
    }

    fn on_producer_status(&mut self, status: ProducerStatus) {
        self.set_producer_status(status);
    }
}
