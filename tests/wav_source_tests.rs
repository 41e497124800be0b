// Integration tests for the WAV-file capture source
//
// These tests verify input validation and a full offline run: file → queue →
// passthrough engine → callback.

use anyhow::Result;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use denoise_rt::{
    FeedPacing, FrameCallback, PassthroughFactory, PipelineConfig, SessionRegistry,
    WavFileSource, SAMPLE_RATE,
};

const MODEL: &[u8] = b"model-bytes";
const FRAME_SIZE: usize = 480;

fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: usize) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for i in 0..samples * channels as usize {
        writer.write_sample((i % 128) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

#[test]
fn test_open_rejects_non_mono_input() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("stereo.wav");
    write_wav(&path, SAMPLE_RATE, 2, 1000)?;

    let result = WavFileSource::open(&path);
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("expected mono input"));
    Ok(())
}

#[test]
fn test_open_rejects_wrong_sample_rate() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("16k.wav");
    write_wav(&path, 16_000, 1, 1000)?;

    let result = WavFileSource::open(&path);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("48000 Hz"));
    Ok(())
}

#[test]
fn test_frame_count_and_duration() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("short.wav");
    // 2.5 frames worth of samples: the partial tail still counts.
    write_wav(&path, SAMPLE_RATE, 1, FRAME_SIZE * 2 + FRAME_SIZE / 2)?;

    let source = WavFileSource::open(&path)?;
    assert_eq!(source.frame_count(FRAME_SIZE), 3);

    let expected_secs = (FRAME_SIZE * 2 + FRAME_SIZE / 2) as f64 / SAMPLE_RATE as f64;
    assert!((source.duration().as_secs_f64() - expected_secs).abs() < 1e-6);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_offline_file_run_delivers_every_frame() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("input.wav");
    let frames = 40;
    write_wav(&path, SAMPLE_RATE, 1, FRAME_SIZE * frames)?;

    let source = WavFileSource::open(&path)?;
    let run_time = source.duration() + Duration::from_millis(300);

    let registry = SessionRegistry::new(PipelineConfig::default(), Arc::new(PassthroughFactory));
    let handle = registry
        .create_with_source(Box::new(source))
        .await
        .expect("session slot available");

    assert!(registry.initialize(handle, MODEL, 0.5, 30.0).await);

    let delivered = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&delivered);
    let callback: FrameCallback = Arc::new(move |frame: &[f32], _lsnr: f32| {
        assert_eq!(frame.len(), FRAME_SIZE);
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    assert!(registry.start(handle, callback).await);
    tokio::time::sleep(run_time).await;
    assert!(registry.stop(handle).await);

    // Real-time pacing keeps the queue shallow: nothing should drop.
    let stats = registry.stats(handle).await.expect("live handle");
    assert_eq!(stats.frames_dropped, 0);
    assert_eq!(delivered.load(Ordering::SeqCst), frames as u64);

    registry.release(handle).await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_burst_file_run_overflows_but_stays_bounded() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("input.wav");
    write_wav(&path, SAMPLE_RATE, 1, FRAME_SIZE * 500)?;

    let source = WavFileSource::with_pacing(&path, FeedPacing::Burst)?;

    let config = PipelineConfig {
        queue_capacity: 8,
        ..PipelineConfig::default()
    };
    let registry = SessionRegistry::new(config, Arc::new(PassthroughFactory));
    let handle = registry
        .create_with_source(Box::new(source))
        .await
        .expect("session slot available");

    assert!(registry.initialize(handle, MODEL, 0.5, 30.0).await);

    let delivered = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&delivered);
    let callback: FrameCallback = Arc::new(move |_frame: &[f32], _lsnr: f32| {
        counter.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(1));
        Ok(())
    });

    assert!(registry.start(handle, callback).await);

    // The burst feeder finishes almost immediately; give the loop a moment.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(registry.queue_size(handle).await <= 8);
    assert!(registry.stop(handle).await);

    let stats = registry.stats(handle).await.expect("live handle");
    assert!(stats.frames_dropped > 0, "burst never overflowed the queue");
    assert!(delivered.load(Ordering::SeqCst) > 0);

    registry.release(handle).await;
    Ok(())
}
