//! Frame acquisition thread feeding the bounded frame buffer.
//!
//! The producer pauses itself on a capture failure or a full buffer and
//! stays paused until [`ProducerHandle::resume`] is called. Freed buffer
//! space does not wake it.

use super::{Camera, CameraError, CaptureConfig, Frame};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

/// Sending half of the frame buffer.
pub type FrameSender = SyncSender<Frame>;

/// Receiving half of the frame buffer.
pub type FrameReceiver = Receiver<Frame>;

/// Creates the bounded frame buffer shared by producer and consumer.
pub fn frame_buffer(capacity: usize) -> (FrameSender, FrameReceiver) {
    mpsc::sync_channel(capacity)
}

/// Why the producer stopped acquiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// The source failed to deliver a frame.
    CaptureFailed,
    /// The buffer had no room; the frame was dropped.
    BufferFull,
}

/// Observable producer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerStatus {
    Running,
    Paused(PauseReason),
    Stopped,
}

/// Pause gate shared between the producer thread and its handle.
#[derive(Debug)]
struct Gate {
    status: Mutex<ProducerStatus>,
    wake: Condvar,
}

impl Gate {
    fn new() -> Self {
        Self {
            status: Mutex::new(ProducerStatus::Running),
            wake: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProducerStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks while paused. Returns false once stopped.
    fn wait_running(&self) -> bool {
        let mut status = self.lock();
        loop {
            match *status {
                ProducerStatus::Running => return true,
                ProducerStatus::Stopped => return false,
                ProducerStatus::Paused(_) => {
                    status = self
                        .wake
                        .wait(status)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    fn pause(&self, reason: PauseReason) {
        let mut status = self.lock();
        if *status == ProducerStatus::Running {
            *status = ProducerStatus::Paused(reason);
        }
    }

    fn resume(&self) -> bool {
        let mut status = self.lock();
        if let ProducerStatus::Paused(_) = *status {
            *status = ProducerStatus::Running;
            self.wake.notify_all();
            true
        } else {
            false
        }
    }

    fn stop(&self) {
        *self.lock() = ProducerStatus::Stopped;
        self.wake.notify_all();
    }
}

/// Spawns the acquisition thread.
pub struct FrameProducer;

impl FrameProducer {
    /// Builds and opens a source on a new thread, then starts acquiring.
    ///
    /// The source is constructed inside the thread so device handles never
    /// cross threads. Returns once the source is open; a failure to build
    /// or open it is returned here and no thread is left running.
    pub fn spawn<C, F>(
        config: CaptureConfig,
        sender: FrameSender,
        make_source: F,
    ) -> Result<ProducerHandle, CameraError>
    where
        C: Camera + 'static,
        F: FnOnce(&CaptureConfig) -> Result<C, CameraError> + Send + 'static,
    {
        let gate = Arc::new(Gate::new());
        let (ready_tx, ready_rx) = mpsc::channel();
        let thread_gate = Arc::clone(&gate);

        let thread = std::thread::Builder::new()
            .name("frame-producer".to_string())
            .spawn(move || {
                let opened = make_source(&config).and_then(|mut camera| {
                    camera.open(&config)?;
                    Ok(camera)
                });
                match opened {
                    Ok(camera) => {
                        // The spawner is waiting on this reply.
                        let _ = ready_tx.send(Ok(()));
                        run(camera, sender, &thread_gate);
                    }
                    Err(e) => {
                        thread_gate.stop();
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })
            .map_err(|e| CameraError::OpenFailed(format!("failed to spawn producer: {e}")))?;

        let mut handle = ProducerHandle {
            gate,
            thread: Some(thread),
        };
        match ready_rx.recv() {
            Ok(Ok(())) => Ok(handle),
            Ok(Err(e)) => {
                handle.join();
                Err(e)
            }
            Err(_) => {
                handle.join();
                Err(CameraError::OpenFailed("producer thread exited".to_string()))
            }
        }
    }
}

fn run<C: Camera>(mut camera: C, sender: FrameSender, gate: &Gate) {
    tracing::info!("Frame producer started");

    while gate.wait_running() {
        match camera.capture() {
            Ok(frame) => match sender.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(frame)) => {
                    tracing::warn!(
                        sequence = frame.sequence(),
                        "Frame buffer full, dropping frame and pausing producer"
                    );
                    gate.pause(PauseReason::BufferFull);
                }
                Err(TrySendError::Disconnected(_)) => {
                    tracing::debug!("Frame buffer closed by consumer");
                    break;
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Frame capture failed, pausing producer");
                gate.pause(PauseReason::CaptureFailed);
            }
        }
    }

    camera.close();
    gate.stop();
    tracing::info!("Frame producer stopped");
}

/// Control handle for a running producer.
#[derive(Debug)]
pub struct ProducerHandle {
    gate: Arc<Gate>,
    thread: Option<JoinHandle<()>>,
}

impl ProducerHandle {
    pub fn status(&self) -> ProducerStatus {
        *self.gate.lock()
    }

    /// Lifts a pause. Returns false if the producer was not paused.
    pub fn resume(&self) -> bool {
        self.resumer().resume()
    }

    /// A handle that can lift pauses from another thread.
    pub fn resumer(&self) -> ProducerResumer {
        ProducerResumer {
            gate: Arc::clone(&self.gate),
        }
    }

    /// Asks the producer to stop; it releases its source on the way out.
    pub fn stop(&self) {
        self.gate.stop();
    }

    /// Stops the producer and waits for the thread to exit.
    pub fn join(&mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Frame producer thread panicked");
            }
        }
    }
}

/// Resume-only access to a producer, for external resume triggers.
#[derive(Debug, Clone)]
pub struct ProducerResumer {
    gate: Arc<Gate>,
}

impl ProducerResumer {
    /// Lifts a pause. Returns false if the producer was not paused.
    pub fn resume(&self) -> bool {
        let resumed = self.gate.resume();
        if resumed {
            tracing::info!("Frame producer resumed");
        }
        resumed
    }
}

impl Drop for ProducerHandle {
    fn drop(&mut self) {
        self.join();
    }
}
