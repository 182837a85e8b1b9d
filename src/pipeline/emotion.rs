// EMOSCOPE Emotion Engine - Native Transformer Inference
// Copyright (c) 2026 Emoscope
//
// Runs a pretrained 7-class English emotion classifier over transcript text
// using candle. Weights, tokenizer and config come through hf-hub; the
// encoder is RoBERTa-shaped, so the checkpoint loads under the "roberta"
// prefix with a dense -> tanh -> out_proj classification head on top.

use crate::pipeline::segment::Segment;
use crate::pipeline::transcribe::TranscriptSegment;
use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::ops::softmax;
use candle_nn::{linear, Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::api::sync::Api;
use rayon::prelude::*;
use std::collections::HashMap;
use tokenizers::Tokenizer;
use tracing::{info, warn};

pub const DEFAULT_EMOTION_MODEL: &str = "j-hartmann/emotion-english-distilroberta-base";

const MAX_TOKENS: usize = 512;

struct ClassificationHead {
    dense: Linear,
    out_proj: Linear,
}

impl ClassificationHead {
    fn load(vb: VarBuilder, hidden_size: usize, num_labels: usize) -> Result<Self> {
        Ok(Self {
            dense: linear(hidden_size, hidden_size, vb.pp("dense"))?,
            out_proj: linear(hidden_size, num_labels, vb.pp("out_proj"))?,
        })
    }

    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let xs = self.dense.forward(xs)?.tanh()?;
        self.out_proj.forward(&xs)
    }
}

pub struct EmotionClassifier {
    model: BertModel,
    head: ClassificationHead,
    tokenizer: Tokenizer,
    device: Device,
    labels: Vec<String>,
}

impl EmotionClassifier {
    /// Fetch and load the model. Blocking; call from `spawn_blocking`.
    pub fn load(model_id: &str) -> Result<Self> {
        info!("[EMOTION] Loading emotion model: {}", model_id);

        let api = Api::new()?;
        let repo = api.model(model_id.to_string());

        let config_path = repo.get("config.json").context("Fetch config.json")?;
        let tokenizer_path = repo.get("tokenizer.json").context("Fetch tokenizer.json")?;
        let weights_path = repo
            .get("model.safetensors")
            .context("Fetch model.safetensors")?;

        let config_text = std::fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&config_text).context("Parse model config")?;
        let labels = parse_id2label(&config_text)?;
        info!("[EMOTION] Model labels: {:?}", labels);

        let mut tokenizer =
            Tokenizer::from_file(&tokenizer_path).map_err(|e| anyhow!("Load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Configure truncation: {e}"))?;

        let device = Device::Cpu;
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)?
        };

        let hidden_size = config.hidden_size;
        let model = BertModel::load(vb.pp("roberta"), &config)?;
        let head = ClassificationHead::load(vb.pp("classifier"), hidden_size, labels.len())?;

        Ok(Self {
            model,
            head,
            tokenizer,
            device,
            labels,
        })
    }

    /// Classify one piece of text into a label -> probability map.
    pub fn classify(&self, text: &str) -> Result<HashMap<String, f64>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(anyhow!("cannot classify empty text"));
        }

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("Tokenize: {e}"))?;
        let ids = encoding.get_ids().to_vec();

        let input_ids = Tensor::new(ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self.model.forward(&input_ids, &token_type_ids, None)?;
        // Sentence representation is the <s> token state
        let pooled = hidden.narrow(1, 0, 1)?.squeeze(1)?;
        let logits = self.head.forward(&pooled)?;
        let probs = softmax(&logits, D::Minus1)?.squeeze(0)?.to_vec1::<f32>()?;

        Ok(self
            .labels
            .iter()
            .zip(probs.iter())
            .map(|(label, p)| (label.clone(), *p as f64))
            .collect())
    }

    /// Classify a whole transcript, in parallel. Slices that fail stay in
    /// the output with empty scores so downstream buckets show a gap.
    pub fn classify_segments(&self, transcript: &[TranscriptSegment]) -> Vec<Segment> {
        info!("[EMOTION] Classifying {} transcript segments...", transcript.len());

        transcript
            .par_iter()
            .map(|piece| {
                let emotion_scores = match self.classify(&piece.text) {
                    Ok(scores) => scores,
                    Err(e) => {
                        warn!(
                            "[EMOTION] Segment at {:.1}s left unscored: {}",
                            piece.start, e
                        );
                        HashMap::new()
                    }
                };
                Segment {
                    start_time: piece.start,
                    end_time: piece.end,
                    text: piece.text.clone(),
                    emotion_scores,
                }
            })
            .collect()
    }
}

/// Pull the id -> label table out of the model's config.json, ordered by id.
pub fn parse_id2label(config_text: &str) -> Result<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(config_text)?;
    let map = value
        .get("id2label")
        .and_then(|v| v.as_object())
        .ok_or_else(|| anyhow!("Model config has no id2label table"))?;

    let mut pairs: Vec<(usize, String)> = Vec::with_capacity(map.len());
    for (key, label) in map {
        let id: usize = key.parse().map_err(|_| anyhow!("Bad id2label key {key}"))?;
        let label = label
            .as_str()
            .ok_or_else(|| anyhow!("Bad id2label value for key {key}"))?;
        pairs.push((id, label.to_lowercase()));
    }
    pairs.sort_by_key(|(id, _)| *id);

    Ok(pairs.into_iter().map(|(_, label)| label).collect())
}
