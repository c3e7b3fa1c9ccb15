//! # Stream worker module
//!
//! The stream worker runs the frame streaming loop for one session: a
//! cancellable periodic task pulling frames from a producer at the stream
//! cadence and emitting them as telemetry.
//!
//! Pause and resume are flag flips read by the loop before each capture, not
//! loop teardown. Tearing down and rebuilding the capture pipeline is
//! expensive and must not happen on every idle toggle, so a paused worker
//! keeps ticking (without capturing) and resumes instantly.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, trace, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// Internal
use comms_if::msg::TelemetryMsg;
use crate::frame_producer::FrameProducer;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of consecutive produce failures after which an error is raised.
/// The loop itself is never torn down by failures.
const MAX_CONSEC_PRODUCE_FAILURES: u32 = 5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Handle on a running stream worker.
///
/// Owns the worker thread. The shared `running`/`paused` flags are the only
/// state touched from both sides, everything else lives inside the loop.
pub struct StreamWorker {
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<Box<dyn FrameProducer + Send>>>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl StreamWorker {

    /// Start the streaming loop with the given producer and telemetry sink.
    ///
    /// The worker emits one frame per `period` while running and not paused.
    pub fn start(
        producer: Box<dyn FrameProducer + Send>,
        sink: Sender<TelemetryMsg>,
        period: Duration
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let paused = Arc::new(AtomicBool::new(false));

        let loop_running = running.clone();
        let loop_paused = paused.clone();

        let join_handle = thread::spawn(move || {
            stream_loop(loop_running, loop_paused, producer, sink, period)
        });

        debug!("Stream worker started, period {:?}", period);

        Self {
            running,
            paused,
            join_handle: Some(join_handle)
        }
    }

    /// Pause frame production.
    ///
    /// The loop keeps its cadence so a resume takes effect on the next tick,
    /// no pipeline is torn down.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Relaxed);
        debug!("Stream paused");
    }

    /// Resume frame production.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Relaxed);
        debug!("Stream resumed");
    }

    /// True if the worker is currently paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    /// Stop the worker and get the producer back.
    ///
    /// Blocks until the in-flight tick completes (at most one period), after
    /// which no further frame is emitted. Returns the producer so its camera
    /// claim can be handed back to the hardware registry, or `None` if the
    /// worker thread did not exit cleanly.
    pub fn stop(&mut self) -> Option<Box<dyn FrameProducer + Send>> {
        self.running.store(false, Ordering::Relaxed);

        match self.join_handle.take() {
            Some(handle) => match handle.join() {
                Ok(producer) => {
                    debug!("Stream worker stopped");
                    Some(producer)
                },
                Err(_) => {
                    error!("Stream worker thread panicked");
                    None
                }
            },
            None => None
        }
    }
}

impl Drop for StreamWorker {
    fn drop(&mut self) {
        // Idempotent, stop() takes the join handle
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Body of the streaming loop.
///
/// Returns the producer on shutdown so the camera claim survives the
/// worker's lifetime.
fn stream_loop(
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    mut producer: Box<dyn FrameProducer + Send>,
    sink: Sender<TelemetryMsg>,
    period: Duration
) -> Box<dyn FrameProducer + Send> {

    let mut num_consec_failures = 0u32;

    while running.load(Ordering::Relaxed) {
        let tick_start = Instant::now();

        if !paused.load(Ordering::Relaxed) {
            match producer.produce() {
                Ok(Some(frame)) => {
                    num_consec_failures = 0;

                    // A closed sink means the session is going away, exit
                    // quietly
                    if sink.send(frame.to_telemetry()).is_err() {
                        debug!("Telemetry sink closed, stream loop exiting");
                        break
                    }
                },
                Ok(None) => trace!("No frame this tick"),
                Err(e) => {
                    num_consec_failures += 1;
                    warn!("Frame skipped: {}", e);

                    if num_consec_failures == MAX_CONSEC_PRODUCE_FAILURES {
                        error!(
                            "{} consecutive frame failures, is the camera \
                            still attached?",
                            num_consec_failures
                        );
                    }
                }
            }
        }

        // Sleep the remainder of the period. Cadence is kept even while
        // paused or frameless so a resume never waits on a pipeline rebuild.
        match period.checked_sub(tick_start.elapsed()) {
            Some(remainder) => thread::sleep(remainder),
            None => warn!(
                "Stream tick overran by {:.06} s",
                tick_start.elapsed().as_secs_f64() - period.as_secs_f64()
            )
        }
    }

    producer
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::frame_producer::{FrameProducerError, TestPatternProducer};
    use std::sync::mpsc::channel;
    use std::sync::atomic::AtomicUsize;

    /// Producer failing every produce call, for failure handling tests.
    struct FailingProducer;

    impl FrameProducer for FailingProducer {
        fn produce(&mut self)
            -> Result<Option<comms_if::frame::EncodedFrame>, FrameProducerError>
        {
            Err(FrameProducerError::CaptureFailed("no device".into()))
        }
    }

    fn short_period() -> Duration {
        Duration::from_millis(5)
    }

    #[test]
    fn test_emits_frames_at_cadence() {
        let (tx, rx) = channel();
        let producer = Box::new(TestPatternProducer::new(16, 12, 50));

        let mut worker = StreamWorker::start(producer, tx, short_period());

        thread::sleep(Duration::from_millis(100));
        worker.stop();

        let frames: Vec<_> = rx.try_iter().collect();
        assert!(!frames.is_empty());
        assert!(frames.iter().all(|f| matches!(
            f,
            TelemetryMsg::VideoFrame { .. }
        )));
    }

    #[test]
    fn test_stop_halts_emission_and_returns_producer() {
        let (tx, rx) = channel();
        let producer = Box::new(TestPatternProducer::new(16, 12, 50));

        let mut worker = StreamWorker::start(producer, tx, short_period());

        thread::sleep(Duration::from_millis(50));
        let producer = worker.stop();

        // The producer (camera claim) comes back on a clean stop
        assert!(producer.is_some());

        // No frame is emitted after stop returns
        while rx.try_recv().is_ok() {}
        thread::sleep(Duration::from_millis(50));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_pause_resume_does_not_rebuild_pipeline() {
        let (tx, rx) = channel();

        let setups = Arc::new(AtomicUsize::new(0));
        let producer = Box::new(TestPatternProducer::with_setup_counter(
            16, 12, 50, setups.clone()
        ));

        let mut worker = StreamWorker::start(producer, tx, short_period());
        thread::sleep(Duration::from_millis(30));

        worker.pause();
        assert!(worker.is_paused());

        // Drain anything emitted before the pause took effect, then check
        // the stream stays silent
        thread::sleep(Duration::from_millis(30));
        while rx.try_recv().is_ok() {}
        thread::sleep(Duration::from_millis(50));
        assert!(rx.try_recv().is_err());

        worker.resume();
        assert!(!worker.is_paused());

        // Frames flow again after the resume
        thread::sleep(Duration::from_millis(50));
        assert!(rx.try_recv().is_ok());

        worker.stop();

        // The capture pipeline was set up exactly once across the whole
        // pause/resume cycle
        assert_eq!(setups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_produce_failures_never_kill_the_loop() {
        let (tx, rx) = channel();

        let mut worker = StreamWorker::start(
            Box::new(FailingProducer),
            tx,
            short_period()
        );

        thread::sleep(Duration::from_millis(60));

        // No frames, but the worker is still alive and stoppable
        assert!(rx.try_recv().is_err());
        assert!(worker.stop().is_some());
    }
}
