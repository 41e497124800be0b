use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use crate::audio::{CaptureSink, CaptureSource, FrameQueue, StreamFormat};
use crate::config::PipelineConfig;
use crate::engine::{DenoiseEngine, EngineFactory};
use crate::error::SessionError;

use super::dispatch::{CallbackDispatcher, FrameCallback};
use super::latch::ErrorLatch;
use super::params::{DenoiseParams, ParameterStore};
use super::state::SessionState;
use super::stats::SessionStats;

/// A single denoising session: the lifecycle state machine, the frame queue,
/// the engine instance, and the processing loop that ties them together.
///
/// Sessions are created and owned by the [`SessionRegistry`](super::SessionRegistry);
/// consumers interact through their handle. No state is shared across
/// sessions.
pub struct DenoiseSession {
    config: PipelineConfig,

    /// Serializes lifecycle transitions (initialize/start/stop/release).
    lifecycle: Mutex<()>,

    /// Current lifecycle state; short holds only, safe to query from
    /// anywhere.
    state: StdMutex<SessionState>,

    /// Stream format fixed by the engine at initialize time.
    format: StdMutex<Option<StreamFormat>>,

    /// Engine slot shared with the processing loop.
    engine: Arc<Mutex<Option<Box<dyn DenoiseEngine>>>>,

    engine_factory: Arc<dyn EngineFactory>,

    /// Bounded handoff buffer from the capture producer.
    queue: Arc<FrameQueue>,

    /// Hot-swappable processing parameters.
    params: Arc<ParameterStore>,

    /// Most recent error message.
    errors: Arc<ErrorLatch>,

    /// Optional registry-driven capture source (pull-style sessions).
    capture: Mutex<Option<Box<dyn CaptureSource>>>,

    /// Gates the capture sink: pushes land only while processing.
    capture_active: Arc<AtomicBool>,

    /// Cooperative cancellation flag for the processing loop.
    stop_flag: Arc<AtomicBool>,

    /// Handle for the processing loop task.
    loop_handle: Mutex<Option<JoinHandle<()>>>,

    /// Frames delivered to the consumer callback.
    delivered: Arc<AtomicU64>,

    /// When processing first started.
    started_at: StdMutex<Option<DateTime<Utc>>>,
}

impl DenoiseSession {
    pub(crate) fn new(
        config: PipelineConfig,
        engine_factory: Arc<dyn EngineFactory>,
        capture: Option<Box<dyn CaptureSource>>,
    ) -> Self {
        let queue = Arc::new(FrameQueue::new(config.queue_capacity));

        Self {
            config,
            lifecycle: Mutex::new(()),
            state: StdMutex::new(SessionState::Uninitialized),
            format: StdMutex::new(None),
            engine: Arc::new(Mutex::new(None)),
            engine_factory,
            queue,
            params: Arc::new(ParameterStore::default()),
            errors: Arc::new(ErrorLatch::new()),
            capture: Mutex::new(capture),
            capture_active: Arc::new(AtomicBool::new(false)),
            stop_flag: Arc::new(AtomicBool::new(false)),
            loop_handle: Mutex::new(None),
            delivered: Arc::new(AtomicU64::new(0)),
            started_at: StdMutex::new(None),
        }
    }

    /// Build an engine instance from the model blob and fix the stream
    /// format. Re-initializing an idle session destroys the previous engine
    /// first; re-initializing while processing is rejected.
    pub async fn initialize(
        &self,
        model: &[u8],
        params: DenoiseParams,
    ) -> Result<(), SessionError> {
        let _guard = self.lifecycle.lock().await;

        match self.state() {
            SessionState::Processing => return Err(SessionError::AlreadyProcessing),
            SessionState::Released => return Err(SessionError::InvalidHandle),
            _ => {}
        }

        if model.is_empty() {
            return Err(SessionError::InvalidArgument("model blob is empty".into()));
        }
        params.validate()?;

        {
            let mut slot = self.engine.lock().await;
            if slot.take().is_some() {
                // Previous engine is gone; a failed rebuild leaves the
                // session uninitialized, not half-initialized.
                self.set_state(SessionState::Uninitialized);
                *self.format.lock().unwrap_or_else(PoisonError::into_inner) = None;
            }
        }

        let engine = self
            .engine_factory
            .build(model, params)
            .map_err(|e| SessionError::Allocation(format!("engine construction failed: {e:#}")))?;
        let format = engine.stream_format();

        *self.engine.lock().await = Some(engine);
        *self.format.lock().unwrap_or_else(PoisonError::into_inner) = Some(format);
        self.params.set(params)?;
        self.queue.clear();
        self.set_state(SessionState::Initialized);

        info!(
            "session initialized: {} Hz, {} ch, {} samples/frame",
            format.sample_rate, format.channels, format.frame_size
        );

        Ok(())
    }

    /// Spawn the processing loop and start the capture source, transitioning
    /// to `Processing`. Rejected while already processing.
    pub async fn start(&self, callback: FrameCallback) -> Result<(), SessionError> {
        let _guard = self.lifecycle.lock().await;

        let state = self.state();
        if state == SessionState::Processing {
            return Err(SessionError::AlreadyProcessing);
        }
        if state == SessionState::Released {
            return Err(SessionError::InvalidHandle);
        }
        if !state.can_start() {
            return Err(SessionError::NotInitialized);
        }

        let format = self
            .stream_format()
            .ok_or(SessionError::NotInitialized)?;

        self.stop_flag.store(false, Ordering::SeqCst);
        self.queue.clear();

        let dispatcher = CallbackDispatcher::new(
            callback,
            Arc::clone(&self.errors),
            Arc::clone(&self.delivered),
        );
        let ctx = LoopContext {
            queue: Arc::clone(&self.queue),
            engine: Arc::clone(&self.engine),
            params: Arc::clone(&self.params),
            errors: Arc::clone(&self.errors),
            dispatcher,
            stop: Arc::clone(&self.stop_flag),
            idle_poll: self.config.idle_poll(),
            frame_size: format.frame_size,
        };

        *self.loop_handle.lock().await = Some(tokio::spawn(run_processing_loop(ctx)));
        self.capture_active.store(true, Ordering::SeqCst);

        // Capture comes up last so the loop is already draining.
        if let Some(source) = self.capture.lock().await.as_mut() {
            if let Err(e) = source.start(self.sink(format.frame_size)).await {
                self.capture_active.store(false, Ordering::SeqCst);
                if let Err(halt) = self.halt_loop().await {
                    self.errors.record(halt);
                }
                self.queue.clear();
                return Err(SessionError::Capture(format!("capture start failed: {e:#}")));
            }
            info!("capture source started: {}", source.name());
        }

        {
            let mut started_at = self
                .started_at
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            started_at.get_or_insert_with(Utc::now);
        }
        self.set_state(SessionState::Processing);
        info!("session processing started");

        Ok(())
    }

    /// Cooperatively halt the processing loop and transition to `Stopped`.
    /// A no-op success when the session is not processing. Guarantees no
    /// callback fires after this returns.
    pub async fn stop(&self) -> Result<(), SessionError> {
        let _guard = self.lifecycle.lock().await;

        if self.state() != SessionState::Processing {
            return Ok(());
        }

        self.capture_active.store(false, Ordering::SeqCst);

        if let Some(source) = self.capture.lock().await.as_mut() {
            if let Err(e) = source.stop().await {
                self.errors
                    .record(SessionError::Capture(format!("capture stop failed: {e:#}")));
            }
        }

        let halted = self.halt_loop().await;

        self.queue.clear();
        self.set_state(SessionState::Stopped);
        info!("session processing stopped");

        halted
    }

    /// Tear the session down. Stops first if processing; idempotent.
    pub async fn release(&self) {
        if let Err(e) = self.stop().await {
            self.errors.record(e);
        }

        let _guard = self.lifecycle.lock().await;

        if self.state() == SessionState::Released {
            return;
        }

        self.engine.lock().await.take();
        *self.format.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.queue.clear();
        self.set_state(SessionState::Released);
        info!("session released");
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_processing(&self) -> bool {
        self.state() == SessionState::Processing
    }

    pub fn is_initialized(&self) -> bool {
        self.state().is_operable()
    }

    pub fn stream_format(&self) -> Option<StreamFormat> {
        *self.format.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn queue_size(&self) -> usize {
        self.queue.len()
    }

    pub fn last_error(&self) -> String {
        self.errors.last()
    }

    /// Current parameters as last successfully set.
    pub fn params(&self) -> DenoiseParams {
        self.params.snapshot()
    }

    pub fn set_post_filter_beta(&self, beta: f32) -> Result<(), SessionError> {
        if !self.state().is_operable() {
            return Err(SessionError::NotInitialized);
        }
        self.params.set_post_filter_beta(beta)
    }

    pub fn set_atten_lim_db(&self, atten_lim_db: f32) -> Result<(), SessionError> {
        if !self.state().is_operable() {
            return Err(SessionError::NotInitialized);
        }
        self.params.set_atten_lim_db(atten_lim_db)
    }

    /// Push boundary for external capture drivers. Only available once the
    /// stream format is known; pushes land only while processing.
    pub fn capture_sink(&self) -> Option<CaptureSink> {
        self.stream_format()
            .map(|format| self.sink(format.frame_size))
    }

    pub fn stats(&self) -> SessionStats {
        let state = self.state();
        SessionStats {
            state,
            is_processing: state == SessionState::Processing,
            started_at: *self
                .started_at
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
            frames_processed: self.delivered.load(Ordering::SeqCst),
            frames_dropped: self.queue.dropped(),
            queue_depth: self.queue.len(),
        }
    }

    pub(crate) fn record_error(&self, err: SessionError) {
        self.errors.record(err);
    }

    fn sink(&self, frame_size: usize) -> CaptureSink {
        CaptureSink::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.errors),
            Arc::clone(&self.capture_active),
            frame_size,
        )
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Signal the loop and wait for it to exit, bounded by the configured
    /// stop timeout. On timeout the task is aborted and the error surfaced;
    /// the caller still completes the transition.
    async fn halt_loop(&self) -> Result<(), SessionError> {
        let handle = self.loop_handle.lock().await.take();
        let Some(handle) = handle else {
            return Ok(());
        };

        self.stop_flag.store(true, Ordering::SeqCst);
        self.queue.wake();

        let timeout = self.config.stop_timeout();
        let abort = handle.abort_handle();

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.errors
                    .record(format!("processing task panicked: {e}"));
                Ok(())
            }
            Err(_) => {
                abort.abort();
                Err(SessionError::ShutdownTimeout(timeout))
            }
        }
    }
}

impl Drop for DenoiseSession {
    fn drop(&mut self) {
        // The loop task owns its own Arcs; make sure it exits even when the
        // session is dropped without an explicit release.
        self.stop_flag.store(true, Ordering::SeqCst);
        self.queue.wake();
    }
}

struct LoopContext {
    queue: Arc<FrameQueue>,
    engine: Arc<Mutex<Option<Box<dyn DenoiseEngine>>>>,
    params: Arc<ParameterStore>,
    errors: Arc<ErrorLatch>,
    dispatcher: CallbackDispatcher,
    stop: Arc<AtomicBool>,
    idle_poll: std::time::Duration,
    frame_size: usize,
}

/// Per-session processing loop: poll the queue, snapshot parameters, run the
/// engine, hand the result to the dispatcher. One frame at a time, in order.
async fn run_processing_loop(ctx: LoopContext) {
    info!("processing loop started");

    let mut output = vec![0.0f32; ctx.frame_size];

    loop {
        if ctx.stop.load(Ordering::SeqCst) {
            break;
        }

        let Some(frame) = ctx.queue.try_pop() else {
            // Idle until a push lands; the timeout bounds the wait so the
            // stop flag is always observed promptly.
            let _ = tokio::time::timeout(ctx.idle_poll, ctx.queue.notified()).await;
            continue;
        };

        // Parameters current at dequeue time win over whatever was set when
        // the frame was captured.
        let params = ctx.params.snapshot();

        let lsnr = {
            let mut slot = ctx.engine.lock().await;
            let Some(engine) = slot.as_mut() else {
                break;
            };
            match engine.process(&frame.samples, &mut output, params) {
                Ok(lsnr) => lsnr,
                Err(e) => {
                    ctx.errors
                        .record(SessionError::Processing(format!("{e:#}")));
                    continue;
                }
            }
        };

        ctx.dispatcher.dispatch(&output, lsnr);
    }

    info!("processing loop stopped");
}
