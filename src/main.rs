//! FSM Motion Detection CLI
//!
//! Acquires frames from a mock scene, a raw video file or a camera and
//! reports motion for every consecutive frame pair.

use clap::Parser;
use fsm_motion::{
    capture::{build_source, frame_buffer, FrameProducer, ProducerResumer},
    config::{ConfigError, FileConfig},
    detection::MotionDetector,
    metrics::MetricsRegistry,
    observer::{JsonLinesObserver, LogObserver},
    pipeline::Pipeline,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Fixed-point chunk motion detector.
#[derive(Debug, Parser)]
#[command(name = "fsm-motion", version, about)]
struct Args {
    /// TOML configuration file; command-line values take precedence.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frame source: "mock", a camera index, or a raw rgb24 video file.
    #[arg(long)]
    source: Option<String>,

    /// Frame rate configured at the source.
    #[arg(long)]
    source_fps: Option<u32>,

    /// Percentage of source frames sampled from live sources.
    #[arg(long)]
    fps_percent: Option<u32>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Chunk rows per frame.
    #[arg(long)]
    chunk_lines: Option<u32>,

    /// Chunk columns per frame.
    #[arg(long)]
    chunk_columns: Option<u32>,

    /// Per-chunk magnitude threshold (strictly greater moves).
    #[arg(long)]
    threshold: Option<u16>,

    /// Percentage of chunks that must move to report motion.
    #[arg(long)]
    motion_percent: Option<u32>,

    /// Frame buffer capacity in frames.
    #[arg(long)]
    buffer_capacity: Option<usize>,

    /// Resume a producer paused on a full buffer after each pair.
    #[arg(long)]
    auto_resume: bool,

    /// Stop after this many cycles.
    #[arg(long)]
    cycles: Option<u64>,

    /// Serve Prometheus metrics on this port (requires the `metrics` feature).
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Print every detection event as a JSON line.
    #[arg(long)]
    json: bool,
}

impl Args {
    fn load_config(&self) -> Result<FileConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };

        let capture = &mut config.capture;
        if let Some(source) = &self.source {
            capture.source = source.clone();
        }
        if let Some(fps) = self.source_fps {
            capture.fps = fps;
        }
        if let Some(percent) = self.fps_percent {
            capture.fps_percent = percent;
        }
        if let Some(width) = self.width {
            capture.width = width;
        }
        if let Some(height) = self.height {
            capture.height = height;
        }

        let detection = &mut config.detection;
        if let Some(lines) = self.chunk_lines {
            detection.chunk_lines = lines;
        }
        if let Some(columns) = self.chunk_columns {
            detection.chunk_columns = columns;
        }
        if let Some(threshold) = self.threshold {
            detection.threshold = threshold;
        }
        if let Some(percent) = self.motion_percent {
            detection.motion_percent = percent;
        }

        let pipeline = &mut config.pipeline;
        if let Some(capacity) = self.buffer_capacity {
            pipeline.buffer_capacity = capacity;
        }
        if self.auto_resume {
            pipeline.auto_resume = true;
        }
        if self.cycles.is_some() {
            pipeline.max_cycles = self.cycles;
        }

        if let Some(port) = self.metrics_port {
            config.output.metrics_port = port;
        }
        if self.json {
            config.output.json = true;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!("FSM Motion Detector v{}", fsm_motion::VERSION);

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    let detector = match MotionDetector::new(
        config.capture.width,
        config.capture.height,
        &config.detection,
    ) {
        Ok(detector) => detector,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    info!(
        source = %config.capture.source,
        fps = config.capture.fps,
        sampled_fps = config.capture.sampled_fps(),
        "Capture configured"
    );

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    if let Err(e) = ctrlc::set_handler(move || {
        handler_stop.store(true, Ordering::SeqCst);
    }) {
        warn!("Failed to install Ctrl+C handler: {}", e);
    }

    let mut pipeline = Pipeline::new(detector, config.pipeline.clone());
    pipeline.subscribe(LogObserver);
    if config.output.json {
        pipeline.subscribe(JsonLinesObserver::new(std::io::stdout()));
    }

    if config.output.metrics_port != 0 {
        match MetricsRegistry::new() {
            Ok(registry) => {
                serve_metrics(config.output.metrics_port, registry.clone());
                pipeline.subscribe(registry);
            }
            Err(e) => warn!("Metrics disabled: {}", e),
        }
    }

    let (sender, receiver) = frame_buffer(config.pipeline.buffer_capacity);
    let mut producer = match FrameProducer::spawn(config.capture.clone(), sender, |c| {
        build_source(c)
    }) {
        Ok(producer) => producer,
        Err(e) => {
            error!("Failed to open frame source: {}", e);
            std::process::exit(1);
        }
    };

    spawn_resume_trigger(producer.resumer());
    if !config.pipeline.auto_resume {
        info!("Press Enter to resume a paused producer");
    }

    let outcome = pipeline.run(&receiver, Some(&producer), &stop);

    producer.join();
    info!(?outcome, "Done");
}

/// Resumes a paused producer on every line read from stdin.
fn spawn_resume_trigger(resumer: ProducerResumer) {
    let spawned = std::thread::Builder::new()
        .name("resume-trigger".to_string())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                if line.is_err() {
                    break;
                }
                if !resumer.resume() {
                    debug!("Resume requested but the producer is not paused");
                }
            }
        });
    if let Err(e) = spawned {
        warn!("Failed to spawn resume trigger: {}", e);
    }
}

#[cfg(feature = "metrics")]
fn serve_metrics(port: u16, registry: MetricsRegistry) {
    use fsm_motion::metrics::{MetricsServer, MetricsServerConfig};

    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
    let spawned = std::thread::Builder::new()
        .name("metrics-server".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!("Failed to start metrics runtime: {}", e);
                    return;
                }
            };
            if let Err(e) = runtime.block_on(server.run()) {
                warn!("Metrics server stopped: {}", e);
            }
        });
    if let Err(e) = spawned {
        warn!("Failed to spawn metrics server: {}", e);
    }
}

#[cfg(not(feature = "metrics"))]
fn serve_metrics(port: u16, _registry: MetricsRegistry) {
    warn!(
        port,
        "Metrics server requires the `metrics` feature; collecting without serving"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_defaults() {
        let args = Args::parse_from([
            "fsm-motion",
            "--width",
            "320",
            "--height",
            "240",
            "--chunk-lines",
            "15",
            "--chunk-columns",
            "20",
            "--cycles",
            "5",
            "--auto-resume",
        ]);
        let config = args.load_config().unwrap();
        assert_eq!(config.capture.width, 320);
        assert_eq!(config.detection.chunk_lines, 15);
        assert_eq!(config.pipeline.max_cycles, Some(5));
        assert!(config.pipeline.auto_resume);
        assert_eq!(config.detection.threshold, 15);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = Args::parse_from(["fsm-motion", "--motion-percent", "0"]);
        assert_eq!(
            args.load_config().unwrap_err(),
            ConfigError::InvalidMotionPercent(0)
        );
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("motion.toml");
        std::fs::write(
            &path,
            "[detection]\nthreshold = 40\nmotion_percent = 50\n[capture]\nsource = \"clip.rgb\"\n",
        )
        .unwrap();

        let args = Args::parse_from([
            "fsm-motion",
            "--config",
            path.to_str().unwrap(),
            "--threshold",
            "20",
        ]);
        let config = args.load_config().unwrap();
        assert_eq!(config.detection.threshold, 20);
        assert_eq!(config.detection.motion_percent, 50);
        assert_eq!(config.capture.source, "clip.rgb");
    }
}
