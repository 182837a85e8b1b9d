// EMOSCOPE Segment Model
// Copyright (c) 2026 Emoscope
//
// A Segment is one transcribed, timestamped slice of interview audio with
// its emotion-probability vector attached. Segments with missing or broken
// scores stay in the sequence so downstream buckets can surface them as gaps.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Fixed emotion label set, in canonical column order.
pub const EMOTION_LABELS: [&str; 7] = [
    "joy",
    "sadness",
    "anger",
    "fear",
    "surprise",
    "disgust",
    "neutral",
];

pub const EMOTION_COUNT: usize = EMOTION_LABELS.len();

/// Per-emotion probabilities in canonical label order.
pub type EmotionVector = [f64; EMOTION_COUNT];

/// Tolerance when checking that a segment's raw scores sum to 1.
const SCORE_SUM_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
    /// Emotion label -> probability. Empty when transcription or
    /// classification failed for this slice.
    #[serde(default)]
    pub emotion_scores: HashMap<String, f64>,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }

    pub fn has_scores(&self) -> bool {
        !self.emotion_scores.is_empty()
    }

    /// Convert the score map into the canonical vector.
    ///
    /// Returns None when the scores are missing or invalid (non-finite,
    /// outside [0,1], or not summing to 1). The aggregator treats a None
    /// here as a gap, never as fatal.
    pub fn score_vector(&self) -> Option<EmotionVector> {
        if self.emotion_scores.is_empty() {
            return None;
        }

        let mut vector = [0.0f64; EMOTION_COUNT];
        for (i, label) in EMOTION_LABELS.iter().enumerate() {
            let value = *self.emotion_scores.get(*label).unwrap_or(&0.0);
            if !value.is_finite() || value < -SCORE_SUM_TOLERANCE || value > 1.0 + SCORE_SUM_TOLERANCE {
                return None;
            }
            vector[i] = value.clamp(0.0, 1.0);
        }

        let sum: f64 = vector.iter().sum();
        if (sum - 1.0).abs() > SCORE_SUM_TOLERANCE {
            return None;
        }

        Some(vector)
    }
}

pub fn label_index(label: &str) -> Option<usize> {
    EMOTION_LABELS.iter().position(|l| *l == label)
}

pub fn vector_to_map(vector: &EmotionVector) -> HashMap<String, f64> {
    EMOTION_LABELS
        .iter()
        .zip(vector.iter())
        .map(|(label, score)| (label.to_string(), *score))
        .collect()
}

/// Load a segment sequence from a JSON file (the format `analyze` writes
/// next to its other artifacts).
pub fn read_segments_json(path: &Path) -> Result<Vec<Segment>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read segments file {:?}", path))?;
    let segments: Vec<Segment> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse segments file {:?}", path))?;
    Ok(segments)
}

pub fn write_segments_json(segments: &[Segment], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(segments)?;
    fs::write(path, json).with_context(|| format!("Failed to write segments file {:?}", path))?;
    Ok(())
}
