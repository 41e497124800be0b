use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::info;

use denoise_rt::{
    Config, FrameCallback, PassthroughFactory, SessionRegistry, WavFileSource, CHANNEL_COUNT,
    SAMPLE_RATE,
};

/// Offline denoising run: feed a WAV file through a session at real-time
/// pace and write the denoised frames back out.
#[derive(Parser, Debug)]
#[command(name = "denoise-rt", about = "Real-time denoising session pipeline")]
struct Args {
    /// Input WAV file (mono, 48 kHz)
    #[arg(long)]
    input: String,

    /// Output WAV file for the denoised frames
    #[arg(long)]
    output: String,

    /// Model archive for the inference engine
    #[arg(long)]
    model: Option<String>,

    /// Post-filter beta
    #[arg(long, default_value_t = 0.02)]
    beta: f32,

    /// Attenuation limit in dB
    #[arg(long, default_value_t = 100.0)]
    atten_lim: f32,

    /// Config file path
    #[arg(long, default_value = "config/denoise-rt")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    let model = match &args.model {
        Some(path) => {
            fs::read(path).with_context(|| format!("Failed to read model: {path}"))?
        }
        // The passthrough engine accepts any non-empty blob.
        None => vec![0u8],
    };

    let registry = SessionRegistry::new(cfg.pipeline, Arc::new(PassthroughFactory));

    let source = WavFileSource::open(&args.input)?;
    let run_time = source.duration() + Duration::from_millis(500);

    let handle = registry
        .create_with_source(Box::new(source))
        .await
        .context("no session slots available")?;

    if !registry
        .initialize(handle, &model, args.beta, args.atten_lim)
        .await
    {
        anyhow::bail!("initialize failed: {}", registry.last_error(handle).await);
    }

    info!(
        "session format: {} Hz, {} ch, {} samples/frame",
        registry.sample_rate(handle).await,
        registry.channel_count(handle).await,
        registry.frame_size(handle).await
    );

    let spec = hound::WavSpec {
        channels: CHANNEL_COUNT,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let writer = Arc::new(Mutex::new(
        hound::WavWriter::create(&args.output, spec)
            .with_context(|| format!("Failed to create output WAV: {}", args.output))?,
    ));

    let frame_writer = Arc::clone(&writer);
    let callback: FrameCallback = Arc::new(move |frame: &[f32], _lsnr: f32| {
        let mut writer = frame_writer.lock().unwrap_or_else(PoisonError::into_inner);
        for &sample in frame {
            writer.write_sample(sample)?;
        }
        Ok(())
    });

    if !registry.start(handle, callback).await {
        anyhow::bail!("start failed: {}", registry.last_error(handle).await);
    }

    tokio::time::sleep(run_time).await;

    // Let the queue drain before stopping, bounded so a stall can't hang us.
    for _ in 0..200 {
        if registry.queue_size(handle).await == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    registry.stop(handle).await;
    let stats = registry
        .stats(handle)
        .await
        .context("session disappeared before stats could be read")?;
    registry.release(handle).await;

    let writer = Arc::try_unwrap(writer)
        .map_err(|_| anyhow::anyhow!("output writer still in use"))?
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    writer.finalize().context("Failed to finalize output WAV")?;

    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}
