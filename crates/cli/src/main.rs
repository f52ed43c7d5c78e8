#![deny(warnings)]

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use clap::{ArgGroup, Parser};
use emotrack_core::audio::AudioSource;
use emotrack_core::config::{resolve_engine_config, ConfigOverrides, Env, StdEnv};
use emotrack_core::detect::{
    FaceDetector, RecordedFrame, ReplayAudioSource, ReplayFaceDetector, SyntheticAudioSource,
    SyntheticFaceDetector, VideoFrame,
};
use emotrack_core::pipeline::Pipeline;
use emotrack_core::session::Session;
use std::path::PathBuf;
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

const FRAME_CHANNEL_CAPACITY: usize = 64;

#[derive(Parser, Debug)]
#[command(name = "emotrack")]
#[command(about = "Per-frame stress and anxiety scoring from facial and vocal signals")]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .multiple(false)
        .args(["input", "synthetic"])
))]
struct Args {
    /// Recorded session log, one JSON frame per line.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Run a seeded synthetic session of this many frames.
    #[arg(long)]
    synthetic: Option<u64>,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Chance that a synthetic frame contains a face.
    #[arg(long, default_value_t = 0.9)]
    presence: f64,

    #[arg(long, default_value_t = 128)]
    spectrum_bins: usize,

    #[arg(long, default_value_t = 33)]
    frame_interval_ms: i64,

    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    smoothing_alpha: Option<f64>,

    #[arg(long)]
    confidence_threshold: Option<f64>,

    #[arg(long)]
    peak_set_size: Option<usize>,

    /// Attach the combined facial/vocal label to every frame.
    #[arg(long)]
    combined: bool,

    /// Print only the end-of-session report.
    #[arg(long)]
    summary_only: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let session = build_session(&args, &StdEnv)?;
    let output = Output {
        summary_only: args.summary_only,
        frame_interval: frame_interval(args.frame_interval_ms)?,
    };

    match (&args.input, args.synthetic) {
        (Some(path), None) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading frame log {}", path.display()))?;
            let frames = RecordedFrame::parse_log(&raw)
                .with_context(|| format!("parsing frame log {}", path.display()))?;
            let detector = ReplayFaceDetector::from_frames(&frames)
                .with_context(|| format!("validating frame log {}", path.display()))?;
            let audio = ReplayAudioSource::from_frames(&frames);
            tracing::info!(frames = frames.len(), path = %path.display(), "replaying frame log");
            run_session(detector, audio, session, frames.len() as u64, output).await
        }
        (None, Some(count)) => {
            let detector = SyntheticFaceDetector::new(args.seed, args.presence);
            let audio = SyntheticAudioSource::new(args.seed, args.spectrum_bins);
            tracing::info!(frames = count, seed = args.seed, "running synthetic session");
            run_session(detector, audio, session, count, output).await
        }
        _ => anyhow::bail!("exactly one of --input or --synthetic must be provided"),
    }
}

struct Output {
    summary_only: bool,
    frame_interval: Duration,
}

async fn run_session<D, A>(
    detector: D,
    audio: A,
    session: Session,
    frame_count: u64,
    output: Output,
) -> anyhow::Result<()>
where
    D: FaceDetector,
    A: AudioSource,
{
    let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
    let (state_tx, mut state_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
    let (stop_tx, stop_rx) = watch::channel(false);

    let start = Utc::now();
    let interval = output.frame_interval;
    if frame_count > 0 && frame_time(start, interval, frame_count - 1).is_none() {
        anyhow::bail!("{frame_count} frames at {interval} per frame overflow the session clock");
    }
    let producer = tokio::spawn(async move {
        for sequence in 0..frame_count {
            let Some(captured_at) = frame_time(start, interval, sequence) else {
                break;
            };
            if frame_tx
                .send(VideoFrame::new(sequence, captured_at))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    let summary_only = output.summary_only;
    let consumer = tokio::spawn(async move {
        while let Some(state) = state_rx.recv().await {
            if summary_only {
                continue;
            }
            match serde_json::to_string(&state) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "failed to encode frame record"),
            }
        }
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping session");
            let _ = stop_tx.send(true);
        }
    });

    let session = Pipeline::new(detector, audio, session)
        .run(frame_rx, stop_rx, Some(state_tx))
        .await?;
    producer.abort();
    consumer.await.context("frame printer task failed")?;

    let report = serde_json::json!({
        "summary": session.summary(),
        "trend": session.trend(),
        "aggregates": session.aggregates(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn frame_interval(ms: i64) -> anyhow::Result<Duration> {
    if ms <= 0 {
        anyhow::bail!("--frame-interval-ms must be positive, got {ms}");
    }
    Duration::try_milliseconds(ms)
        .with_context(|| format!("--frame-interval-ms out of range: {ms}"))
}

/// Capture time of frame `sequence`, or `None` if it does not fit the clock.
fn frame_time(
    start: DateTime<Utc>,
    interval: Duration,
    sequence: u64,
) -> Option<DateTime<Utc>> {
    let n = i32::try_from(sequence).ok()?;
    start.checked_add_signed(interval.checked_mul(n)?)
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn build_session(args: &Args, env: &impl Env) -> anyhow::Result<Session> {
    let overrides = ConfigOverrides {
        config_path: args.config.clone(),
        smoothing_alpha: args.smoothing_alpha,
        confidence_threshold: args.confidence_threshold,
        peak_set_size: args.peak_set_size,
    };
    let mut cfg = resolve_engine_config(overrides, env).context("resolving configuration")?;
    if args.combined {
        cfg.combined_analysis = true;
    }

    tracing::info!(
        smoothing_alpha = cfg.audio.smoothing_alpha,
        confidence_threshold = cfg.scoring.confidence_threshold,
        peak_set_size = cfg.aggregation.peak_set_size,
        strategy = ?cfg.scoring.strategy,
        "config loaded"
    );
    Session::new(cfg).context("invalid engine configuration")
}
