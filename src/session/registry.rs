use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::audio::{CaptureSink, CaptureSource};
use crate::config::PipelineConfig;
use crate::engine::EngineFactory;
use crate::error::SessionError;

use super::dispatch::FrameCallback;
use super::latch::ErrorLatch;
use super::params::DenoiseParams;
use super::session::DenoiseSession;
use super::stats::SessionStats;

/// Opaque session identifier handed to consumers.
///
/// Internally an index into the registry's table, never a memory address.
/// Handles are allocated from a monotonic counter and never reused, so an
/// operation on a released handle fails validation instead of dangling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle(u64);

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Process-owned table of denoise sessions and the boolean consumer surface.
///
/// Every operation resolves the handle first; operations on unknown or
/// released handles fail without touching any session. Boolean operations
/// never panic and never propagate errors: failures land in the session's
/// error latch (or the registry latch when no session resolves) and surface
/// as a `false`/zero return, matching a boundary-safe contract.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionHandle, Arc<DenoiseSession>>>,
    next_handle: AtomicU64,
    config: PipelineConfig,
    engine_factory: Arc<dyn EngineFactory>,
    /// Failures that cannot be attributed to a session (bad handles,
    /// exhausted slots).
    errors: ErrorLatch,
}

impl SessionRegistry {
    pub fn new(config: PipelineConfig, engine_factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
            config,
            engine_factory,
            errors: ErrorLatch::new(),
        }
    }

    /// Allocate a session for push-style capture: an external driver obtains
    /// the [`CaptureSink`] after `start` and pushes frames itself.
    pub async fn create(&self) -> Option<SessionHandle> {
        self.insert(None).await
    }

    /// Allocate a session driven by a registry-managed capture source.
    pub async fn create_with_source(
        &self,
        source: Box<dyn CaptureSource>,
    ) -> Option<SessionHandle> {
        self.insert(Some(source)).await
    }

    async fn insert(&self, source: Option<Box<dyn CaptureSource>>) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;

        if sessions.len() >= self.config.max_sessions {
            self.errors.record(SessionError::Allocation(format!(
                "session limit reached ({})",
                self.config.max_sessions
            )));
            return None;
        }

        let handle = SessionHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        let session = Arc::new(DenoiseSession::new(
            self.config.clone(),
            Arc::clone(&self.engine_factory),
            source,
        ));
        sessions.insert(handle, session);

        info!("session {} created", handle.id());
        Some(handle)
    }

    async fn resolve(&self, handle: SessionHandle) -> Result<Arc<DenoiseSession>, SessionError> {
        self.sessions
            .read()
            .await
            .get(&handle)
            .cloned()
            .ok_or(SessionError::InvalidHandle)
    }

    /// Construct the engine for `handle` from the model blob and the initial
    /// parameters. `false` on failure with the reason retrievable via
    /// [`last_error`](Self::last_error).
    pub async fn initialize(
        &self,
        handle: SessionHandle,
        model: &[u8],
        post_filter_beta: f32,
        atten_lim_db: f32,
    ) -> bool {
        let session = match self.resolve(handle).await {
            Ok(session) => session,
            Err(e) => {
                self.errors.record(e);
                return false;
            }
        };

        let params = match DenoiseParams::new(post_filter_beta, atten_lim_db) {
            Ok(params) => params,
            Err(e) => {
                session.record_error(e);
                return false;
            }
        };

        match session.initialize(model, params).await {
            Ok(()) => true,
            Err(e) => {
                session.record_error(e);
                false
            }
        }
    }

    /// Begin processing, delivering denoised frames to `callback`.
    pub async fn start(&self, handle: SessionHandle, callback: FrameCallback) -> bool {
        let session = match self.resolve(handle).await {
            Ok(session) => session,
            Err(e) => {
                self.errors.record(e);
                return false;
            }
        };

        match session.start(callback).await {
            Ok(()) => true,
            Err(e) => {
                session.record_error(e);
                false
            }
        }
    }

    /// Halt processing. Already-stopped sessions report success.
    pub async fn stop(&self, handle: SessionHandle) -> bool {
        let session = match self.resolve(handle).await {
            Ok(session) => session,
            Err(e) => {
                self.errors.record(e);
                return false;
            }
        };

        match session.stop().await {
            Ok(()) => true,
            Err(e) => {
                session.record_error(e);
                false
            }
        }
    }

    /// Tear down the session and invalidate its handle. Idempotent: a second
    /// release of the same handle is a no-op.
    pub async fn release(&self, handle: SessionHandle) {
        let session = self.sessions.write().await.remove(&handle);

        if let Some(session) = session {
            session.release().await;
            info!("session {} released", handle.id());
        }
    }

    pub async fn is_processing(&self, handle: SessionHandle) -> bool {
        match self.resolve(handle).await {
            Ok(session) => session.is_processing(),
            Err(_) => false,
        }
    }

    pub async fn is_initialized(&self, handle: SessionHandle) -> bool {
        match self.resolve(handle).await {
            Ok(session) => session.is_initialized(),
            Err(_) => false,
        }
    }

    pub async fn sample_rate(&self, handle: SessionHandle) -> u32 {
        match self.resolve(handle).await {
            Ok(session) => session
                .stream_format()
                .map(|f| f.sample_rate)
                .unwrap_or(0),
            Err(_) => 0,
        }
    }

    pub async fn channel_count(&self, handle: SessionHandle) -> u16 {
        match self.resolve(handle).await {
            Ok(session) => session.stream_format().map(|f| f.channels).unwrap_or(0),
            Err(_) => 0,
        }
    }

    pub async fn frame_size(&self, handle: SessionHandle) -> usize {
        match self.resolve(handle).await {
            Ok(session) => session
                .stream_format()
                .map(|f| f.frame_size)
                .unwrap_or(0),
            Err(_) => 0,
        }
    }

    pub async fn queue_size(&self, handle: SessionHandle) -> usize {
        match self.resolve(handle).await {
            Ok(session) => session.queue_size(),
            Err(_) => 0,
        }
    }

    /// Latest error message: the session's latch when the handle resolves,
    /// the registry's own latch otherwise.
    pub async fn last_error(&self, handle: SessionHandle) -> String {
        match self.resolve(handle).await {
            Ok(session) => session.last_error(),
            Err(_) => self.errors.last(),
        }
    }

    /// Current parameters, if the handle resolves.
    pub async fn params(&self, handle: SessionHandle) -> Option<DenoiseParams> {
        self.resolve(handle).await.ok().map(|s| s.params())
    }

    pub async fn set_post_filter_beta(&self, handle: SessionHandle, beta: f32) -> bool {
        let session = match self.resolve(handle).await {
            Ok(session) => session,
            Err(e) => {
                self.errors.record(e);
                return false;
            }
        };

        match session.set_post_filter_beta(beta) {
            Ok(()) => true,
            Err(e) => {
                session.record_error(e);
                false
            }
        }
    }

    pub async fn set_atten_lim_db(&self, handle: SessionHandle, atten_lim_db: f32) -> bool {
        let session = match self.resolve(handle).await {
            Ok(session) => session,
            Err(e) => {
                self.errors.record(e);
                return false;
            }
        };

        match session.set_atten_lim_db(atten_lim_db) {
            Ok(()) => true,
            Err(e) => {
                session.record_error(e);
                false
            }
        }
    }

    /// Push boundary for push-style capture drivers. `None` until the
    /// session is initialized.
    pub async fn capture_sink(&self, handle: SessionHandle) -> Option<CaptureSink> {
        self.resolve(handle).await.ok().and_then(|s| s.capture_sink())
    }

    pub async fn stats(&self, handle: SessionHandle) -> Option<SessionStats> {
        self.resolve(handle).await.ok().map(|s| s.stats())
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
