use anyhow::{ensure, Context, Result};
use hound::WavReader;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::capture::{CaptureSink, CaptureSource};
use super::frame::{CHANNEL_COUNT, SAMPLE_RATE};

/// Feed pacing for a [`WavFileSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPacing {
    /// One frame per frame period, like a live device.
    Realtime,
    /// As fast as the queue accepts. Overflows the queue on purpose; useful
    /// for backpressure tests.
    Burst,
}

/// File-backed capture source: reads a mono 48 kHz WAV up front and feeds it
/// to the sink in frame-size chunks from a background task. The final partial
/// frame, if any, is zero-padded.
///
/// Restarting the source replays the file from the beginning.
#[derive(Debug)]
pub struct WavFileSource {
    samples: Arc<Vec<f32>>,
    pacing: FeedPacing,
    running: Arc<AtomicBool>,
    feeder: Option<JoinHandle<()>>,
}

impl WavFileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_pacing(path, FeedPacing::Realtime)
    }

    pub fn with_pacing(path: impl AsRef<Path>, pacing: FeedPacing) -> Result<Self> {
        let path = path.as_ref();
        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;
        let spec = reader.spec();

        ensure!(
            spec.channels == CHANNEL_COUNT,
            "expected mono input, got {} channels",
            spec.channels
        );
        ensure!(
            spec.sample_rate == SAMPLE_RATE,
            "expected {} Hz input, got {} Hz",
            SAMPLE_RATE,
            spec.sample_rate
        );

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<_, _>>()
                .context("Failed to read audio samples")?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|s| s as f32 / scale))
                    .collect::<Result<_, _>>()
                    .context("Failed to read audio samples")?
            }
        };

        info!(
            "WAV source loaded: {} samples ({:.1}s)",
            samples.len(),
            samples.len() as f64 / SAMPLE_RATE as f64
        );

        Ok(Self {
            samples: Arc::new(samples),
            pacing,
            running: Arc::new(AtomicBool::new(false)),
            feeder: None,
        })
    }

    /// Play time of the file at the session sample rate.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / SAMPLE_RATE as f64)
    }

    /// Frames the file will produce for a given frame size (final partial
    /// frame included).
    pub fn frame_count(&self, frame_size: usize) -> usize {
        self.samples.len().div_ceil(frame_size.max(1))
    }
}

#[async_trait::async_trait]
impl CaptureSource for WavFileSource {
    async fn start(&mut self, sink: CaptureSink) -> Result<()> {
        ensure!(self.feeder.is_none(), "file source already started");

        self.running.store(true, Ordering::SeqCst);

        let samples = Arc::clone(&self.samples);
        let running = Arc::clone(&self.running);
        let pacing = self.pacing;

        let feeder = tokio::spawn(async move {
            let frame_size = sink.frame_size();
            let period =
                Duration::from_micros(frame_size as u64 * 1_000_000 / SAMPLE_RATE as u64);
            let mut interval = tokio::time::interval(period);
            let mut frame = vec![0.0f32; frame_size];

            for chunk in samples.chunks(frame_size) {
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                if pacing == FeedPacing::Realtime {
                    interval.tick().await;
                }

                frame[..chunk.len()].copy_from_slice(chunk);
                frame[chunk.len()..].fill(0.0);
                sink.push_frame(&frame);
            }

            running.store(false, Ordering::SeqCst);
            info!("WAV source drained");
        });

        self.feeder = Some(feeder);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);

        if let Some(feeder) = self.feeder.take() {
            if let Err(e) = feeder.await {
                warn!("WAV feeder task panicked: {}", e);
            }
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}
