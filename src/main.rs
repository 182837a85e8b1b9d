// EMOSCOPE Main Entry Point
// Copyright (c) 2026 Emoscope

use emoscope_core::heatmap::aggregate::{aggregate_with, AggregateOptions, HeatmapMatrix, Weighting};
use emoscope_core::heatmap::{export, render};
use emoscope_core::pipeline::emotion::{EmotionClassifier, DEFAULT_EMOTION_MODEL};
use emoscope_core::pipeline::transcribe::TranscriptionEngine;
use emoscope_core::pipeline::{audio, segment, source};

use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "emoscope")]
#[command(about = "Emotion heatmaps from YouTube interviews", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct AnalysisOpts {
    /// Time bucket duration in seconds
    #[arg(long, default_value_t = 30.0)]
    bucket_secs: f64,

    /// Emotion classification model (HuggingFace id)
    #[arg(long, default_value = DEFAULT_EMOTION_MODEL)]
    model: String,

    /// Whisper model name (tiny.en, base.en, small.en, ...)
    #[arg(long, default_value = "base.en")]
    whisper_model: String,

    /// Moving-average smoothing window over buckets (1 = off)
    #[arg(long, default_value_t = 1)]
    smooth: usize,

    /// Average by simple bucket membership instead of overlap duration
    #[arg(long)]
    membership: bool,

    /// Directory for all generated artifacts
    #[arg(short, long, default_value = "emoscope_out")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a YouTube interview and generate its emotion heatmap
    Analyze {
        /// YouTube URL
        #[arg(short, long)]
        url: String,

        #[command(flatten)]
        opts: AnalysisOpts,

        /// Browser to borrow cookies from for authentication
        #[arg(long)]
        login: Option<String>,

        /// Keep the downloaded/intermediate audio files
        #[arg(long)]
        keep_audio: bool,
    },

    /// Analyze a local audio/video file
    Local {
        /// Input media path
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        opts: AnalysisOpts,
    },

    /// Aggregate a precomputed segments JSON file (no network, no models)
    Aggregate {
        /// Segments JSON file (as written by `analyze`)
        #[arg(short, long)]
        segments: PathBuf,

        /// Time bucket duration in seconds
        #[arg(long, default_value_t = 30.0)]
        bucket_secs: f64,

        /// Moving-average smoothing window over buckets (1 = off)
        #[arg(long, default_value_t = 1)]
        smooth: usize,

        /// Average by simple bucket membership instead of overlap duration
        #[arg(long)]
        membership: bool,

        /// Directory for all generated artifacts
        #[arg(short, long, default_value = "emoscope_out")]
        output_dir: PathBuf,
    },

    /// Check external tool availability
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info,hf_hub=warn,tokenizers=warn");
    }

    tracing_subscriber::fmt::init();

    let args = Cli::parse();

    match args.command {
        Commands::Analyze {
            url,
            opts,
            login,
            keep_audio,
        } => {
            if !source::validate_youtube_url(&url) {
                return Err(format!("Not a recognizable YouTube URL: {}", url).into());
            }
            if !source::check_ytdlp().await {
                return Err("yt-dlp is not available. Run `emoscope doctor`.".into());
            }

            tokio::fs::create_dir_all(&opts.output_dir).await?;
            let info = source::download_audio(&url, &opts.output_dir, login.as_deref()).await?;
            info!(
                "[MAIN] Interview: \"{}\" by {} ({:.0}s)",
                info.title, info.uploader, info.duration
            );

            let speech_wav = opts.output_dir.join("speech_16k.wav");
            audio::extract_speech_track(&info.local_path, &speech_wav).await?;

            run_analysis(&speech_wav, &info.title, &url, &opts).await?;

            if !keep_audio {
                let _ = tokio::fs::remove_file(&info.local_path).await;
                let _ = tokio::fs::remove_file(&speech_wav).await;
            }
        }
        Commands::Local { input, opts } => {
            if !input.exists() {
                return Err(format!("Input file not found: {:?}", input).into());
            }
            let duration = source::get_media_duration(&input).await.unwrap_or(0.0);
            let title = input
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "local media".to_string());
            info!("[MAIN] Local media: \"{}\" ({:.0}s)", title, duration);

            tokio::fs::create_dir_all(&opts.output_dir).await?;
            let speech_wav = opts.output_dir.join("speech_16k.wav");
            audio::extract_speech_track(&input, &speech_wav).await?;

            let input_display = input.to_string_lossy().to_string();
            run_analysis(&speech_wav, &title, &input_display, &opts).await?;

            let _ = tokio::fs::remove_file(&speech_wav).await;
        }
        Commands::Aggregate {
            segments,
            bucket_secs,
            smooth,
            membership,
            output_dir,
        } => {
            let parsed = segment::read_segments_json(&segments)?;
            info!("[MAIN] Loaded {} segments from {:?}", parsed.len(), segments);

            let options = aggregate_options(membership, smooth);
            let matrix = aggregate_with(&parsed, bucket_secs, &options)?;

            tokio::fs::create_dir_all(&output_dir).await?;
            let title = segments
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "segments".to_string());
            let source_display = segments.to_string_lossy().to_string();
            write_artifacts(&matrix, &title, &source_display, parsed.len(), &output_dir)?;
        }
        Commands::Doctor => {
            let ffmpeg = audio::check_ffmpeg().await;
            let ffprobe = audio::check_ffprobe().await;
            let ytdlp = source::check_ytdlp().await;

            println!("emoscope doctor");
            println!("  ffmpeg:  {}", if ffmpeg { "ok" } else { "MISSING" });
            println!("  ffprobe: {}", if ffprobe { "ok" } else { "MISSING" });
            println!("  yt-dlp:  {}", if ytdlp { "ok" } else { "MISSING" });
            if let Some(cache) = dirs::cache_dir() {
                println!("  model cache: {:?}", cache.join("emoscope").join("models"));
            }
            if !ffmpeg || !ytdlp {
                warn!("[MAIN] Missing tools; `analyze` will not work until installed.");
            }
        }
    }

    Ok(())
}

fn aggregate_options(membership: bool, smooth: usize) -> AggregateOptions {
    AggregateOptions {
        weighting: if membership {
            Weighting::Membership
        } else {
            Weighting::Overlap
        },
        smooth_window: smooth.max(1),
    }
}

/// Transcribe, classify, aggregate and export. Shared by `analyze`/`local`.
async fn run_analysis(
    speech_wav: &Path,
    title: &str,
    source_display: &str,
    opts: &AnalysisOpts,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let engine = TranscriptionEngine::new(Some(opts.whisper_model.clone())).await?;
    let transcript = engine.transcribe(speech_wav).await?;
    if transcript.is_empty() {
        return Err("Transcription produced no segments; nothing to analyze".into());
    }

    let model_id = opts.model.clone();
    let classifier =
        tokio::task::spawn_blocking(move || EmotionClassifier::load(&model_id)).await??;

    let segments =
        tokio::task::spawn_blocking(move || classifier.classify_segments(&transcript)).await?;

    let segments_path = opts.output_dir.join("segments.json");
    segment::write_segments_json(&segments, &segments_path)?;
    info!("[MAIN] Segments written to {:?}", segments_path);

    let options = aggregate_options(opts.membership, opts.smooth);
    let matrix = aggregate_with(&segments, opts.bucket_secs, &options)?;

    write_artifacts(&matrix, title, source_display, segments.len(), &opts.output_dir)?;
    Ok(())
}

fn write_artifacts(
    matrix: &HeatmapMatrix,
    title: &str,
    source_display: &str,
    segment_count: usize,
    output_dir: &Path,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let csv_path = output_dir.join("emotion_heatmap.csv");
    export::write_csv(matrix, &csv_path)?;

    let report = export::AnalysisReport::new(title, source_display, segment_count, matrix);
    let report_path = output_dir.join("emotion_report.json");
    report.write(&report_path)?;

    let heatmap_path = output_dir.join("emotion_heatmap.png");
    render::render_heatmap(matrix, &heatmap_path)?;

    let timeline_path = output_dir.join("emotion_timeline.png");
    render::render_timeline(matrix, &timeline_path)?;

    let summary = matrix.summary();
    println!("Analysis complete: \"{}\"", title);
    println!(
        "  Buckets: {} ({} with data, {} gaps)",
        summary.total_buckets, summary.data_buckets, summary.no_data_buckets
    );
    if let Some(dominant) = summary.dominant_emotion {
        println!("  Dominant emotion: {}", dominant);
    }
    println!("  CSV:      {:?}", csv_path);
    println!("  Report:   {:?}", report_path);
    println!("  Heatmap:  {:?}", heatmap_path);
    println!("  Timeline: {:?}", timeline_path);

    Ok(())
}
