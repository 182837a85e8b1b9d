// EMOSCOPE Transcription Engine
// Copyright (c) 2026 Emoscope
//
// Native Rust implementation of Whisper for local, private transcription.

use anyhow::{Context, Result};
use hf_hub::api::sync::Api;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

pub struct TranscriptionEngine {
    model_path: PathBuf,
}

impl TranscriptionEngine {
    pub async fn new(model_name: Option<String>) -> Result<Self> {
        let model_name = model_name.unwrap_or_else(|| "base.en".to_string());

        // Locate or download the model in a blocking task
        let model_path =
            tokio::task::spawn_blocking(move || Self::ensure_model(&model_name)).await??;

        Ok(Self { model_path })
    }

    /// Ensure the GGML model is present in the local cache.
    fn ensure_model(model_name: &str) -> Result<PathBuf> {
        let base_dir = if let Ok(cache_env) = std::env::var("EMOSCOPE_CACHE_DIR") {
            PathBuf::from(cache_env).join("models")
        } else {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("emoscope")
                .join("models")
        };

        fs::create_dir_all(&base_dir)?;

        let filename = format!("ggml-{}.bin", model_name);
        let model_path = base_dir.join(&filename);

        if model_path.exists() {
            info!("[EARS] Found cached Whisper model: {:?}", model_path);
            return Ok(model_path);
        }

        info!("[EARS] Downloading Whisper model: {}...", filename);

        let api = Api::new()?;
        let repo = api.model("ggerganov/whisper.cpp".to_string());
        let downloaded_path = repo.get(&filename)?;

        // Copy to our cache location for persistence/control
        fs::copy(&downloaded_path, &model_path)?;

        info!("[EARS] Model cached: {:?}", model_path);
        Ok(model_path)
    }

    pub async fn transcribe(&self, audio_path: &Path) -> Result<Vec<TranscriptSegment>> {
        info!("[EARS] Transcribing: {:?}", audio_path);

        // Whisper inference is CPU-heavy; keep it off the runtime threads.
        let audio_path_buf = audio_path.to_path_buf();
        let model_path = self.model_path.clone();

        let segments = tokio::task::spawn_blocking(move || {
            Self::transcribe_blocking(&model_path, &audio_path_buf)
        })
        .await??;

        info!("[EARS] Transcription complete: {} segments.", segments.len());
        Ok(segments)
    }

    fn transcribe_blocking(model_path: &Path, audio_path: &Path) -> Result<Vec<TranscriptSegment>> {
        let mut reader = hound::WavReader::open(audio_path).context("Open WAV")?;
        let spec = reader.spec();

        let mut pcm_data: Vec<f32>;

        let is_16k_mono = spec.sample_rate == 16000 && spec.channels == 1;

        if is_16k_mono {
            pcm_data = Vec::with_capacity(reader.duration() as usize);
            for sample in reader.samples::<i16>() {
                if let Ok(s) = sample {
                    pcm_data.push((s as f32) / 32768.0);
                }
            }
        } else {
            // The extraction step normally hands us 16k mono; this path covers
            // WAVs fed in directly. Downmix and naive-resample in memory.
            info!(
                "[EARS] Downmixing/resampling in memory (Channels: {}, Rate: {}).",
                spec.channels, spec.sample_rate
            );

            let channels = spec.channels as usize;
            let mut f32_samples = Vec::with_capacity((reader.duration() as usize) / channels.max(1));
            let mut sample_iter = reader.samples::<i16>();

            while let Some(Ok(first_sample)) = sample_iter.next() {
                let mut sum = first_sample as f32;
                for _ in 1..channels {
                    if let Some(Ok(s)) = sample_iter.next() {
                        sum += s as f32;
                    }
                }
                f32_samples.push((sum / channels as f32) / 32768.0);
            }

            if spec.sample_rate != 16000 {
                let ratio = 16000.0 / spec.sample_rate as f32;
                let new_len = (f32_samples.len() as f32 * ratio) as usize;
                pcm_data = Vec::with_capacity(new_len);
                for i in 0..new_len {
                    let src_idx = (i as f32 / ratio) as usize;
                    if src_idx < f32_samples.len() {
                        pcm_data.push(f32_samples[src_idx]);
                    }
                }
            } else {
                pcm_data = f32_samples;
            }
        }

        let ctx = WhisperContext::new_with_params(
            model_path.to_str().context("Model path is not valid UTF-8")?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| anyhow::anyhow!("Failed to load model: {:?}", e))?;

        let mut state = ctx.create_state().context("Create state")?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_n_threads(num_cpus::get() as i32);

        state.full(params, &pcm_data).context("Running inference")?;

        let num_segments = state.full_n_segments().context("Get segments count")?;
        let mut segments = Vec::new();

        for i in 0..num_segments {
            // Whisper reports centiseconds
            let start = state.full_get_segment_t0(i).unwrap_or(0) as f64 / 100.0;
            let end = state.full_get_segment_t1(i).unwrap_or(0) as f64 / 100.0;
            let text = state.full_get_segment_text(i).unwrap_or_default();

            segments.push(TranscriptSegment {
                start,
                end,
                text: text.trim().to_string(),
            });
        }

        Ok(segments)
    }
}
