// EMOSCOPE Heatmap Aggregator
// Copyright (c) 2026 Emoscope
//
// Turns an ordered sequence of timestamped emotion vectors into a dense
// time-by-emotion matrix: fixed-width buckets over the full span, one
// normalized score vector per bucket, explicit no-data rows for gaps.

use crate::pipeline::segment::{EmotionVector, Segment, EMOTION_COUNT, EMOTION_LABELS};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Maximum drift allowed on a normalized row's sum.
pub const ROW_SUM_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapRow {
    pub bucket_start: f64,
    pub bucket_end: f64,
    /// Normalized scores in canonical label order. None marks a no-data
    /// bucket: no segment with valid scores overlapped this interval.
    pub scores: Option<EmotionVector>,
}

impl HeatmapRow {
    pub fn is_no_data(&self) -> bool {
        self.scores.is_none()
    }

    /// Label with the highest score; ties resolve to the earlier label.
    pub fn dominant(&self) -> Option<&'static str> {
        self.scores.map(|scores| dominant_label(&scores))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapMatrix {
    pub bucket_duration: f64,
    pub rows: Vec<HeatmapRow>,
}

impl HeatmapMatrix {
    pub fn span(&self) -> (f64, f64) {
        match (self.rows.first(), self.rows.last()) {
            (Some(first), Some(last)) => (first.bucket_start, last.bucket_end),
            _ => (0.0, 0.0),
        }
    }

    pub fn data_row_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_no_data()).count()
    }

    pub fn no_data_count(&self) -> usize {
        self.rows.len() - self.data_row_count()
    }

    /// Mean of the data rows, renormalized. None when every row is a gap.
    pub fn overall_distribution(&self) -> Option<EmotionVector> {
        let mut sum = [0.0f64; EMOTION_COUNT];
        let mut count = 0usize;
        for row in &self.rows {
            if let Some(scores) = row.scores {
                for (acc, value) in sum.iter_mut().zip(scores.iter()) {
                    *acc += value;
                }
                count += 1;
            }
        }
        if count == 0 {
            return None;
        }
        for value in sum.iter_mut() {
            *value /= count as f64;
        }
        Some(normalize(&sum).unwrap_or(sum))
    }

    pub fn dominant_overall(&self) -> Option<&'static str> {
        self.overall_distribution()
            .map(|scores| dominant_label(&scores))
    }

    pub fn summary(&self) -> MatrixSummary {
        MatrixSummary {
            total_buckets: self.rows.len(),
            data_buckets: self.data_row_count(),
            no_data_buckets: self.no_data_count(),
            dominant_emotion: self.dominant_overall().map(|l| l.to_string()),
            overall_distribution: self
                .overall_distribution()
                .map(|v| crate::pipeline::segment::vector_to_map(&v)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixSummary {
    pub total_buckets: usize,
    pub data_buckets: usize,
    pub no_data_buckets: usize,
    pub dominant_emotion: Option<String>,
    pub overall_distribution: Option<std::collections::HashMap<String, f64>>,
}

/// How segment scores are combined within a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weighting {
    /// Weight each segment by the duration of its overlap with the bucket.
    Overlap,
    /// Every overlapping segment counts equally.
    Membership,
}

#[derive(Debug, Clone)]
pub struct AggregateOptions {
    pub weighting: Weighting,
    /// Centered moving-average window over data rows. 1 disables smoothing;
    /// even values are widened to the next odd value.
    pub smooth_window: usize,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            weighting: Weighting::Overlap,
            smooth_window: 1,
        }
    }
}

/// Aggregate segments into a heatmap matrix with default options
/// (overlap-weighted averaging, no smoothing).
pub fn aggregate(segments: &[Segment], bucket_duration: f64) -> Result<HeatmapMatrix> {
    aggregate_with(segments, bucket_duration, &AggregateOptions::default())
}

/// Full aggregation contract.
///
/// The span [min(start_time), max(end_time)] covers ALL segments, including
/// ones whose scores failed validation: those still claim time on the axis,
/// they just cannot contribute scores. Rows are contiguous, equally spaced
/// and time-ordered; each carries a normalized vector or a no-data marker.
pub fn aggregate_with(
    segments: &[Segment],
    bucket_duration: f64,
    options: &AggregateOptions,
) -> Result<HeatmapMatrix> {
    if segments.is_empty() {
        bail!("cannot aggregate an empty segment sequence");
    }
    if !bucket_duration.is_finite() || bucket_duration <= 0.0 {
        bail!("bucket duration must be a positive number of seconds (got {bucket_duration})");
    }

    // Callers are supposed to hand us time-ordered segments, but sorting here
    // keeps the contract honest for out-of-order producers.
    let mut ordered: Vec<&Segment> = segments.iter().collect();
    ordered.sort_by(|a, b| {
        a.start_time
            .partial_cmp(&b.start_time)
            .unwrap_or(Ordering::Equal)
    });

    let span_start = ordered
        .iter()
        .map(|s| s.start_time)
        .fold(f64::INFINITY, f64::min);
    let span_end = ordered
        .iter()
        .map(|s| s.end_time.max(s.start_time))
        .fold(f64::NEG_INFINITY, f64::max);
    if !span_start.is_finite() || !span_end.is_finite() {
        bail!("segment timestamps must be finite");
    }

    let span = (span_end - span_start).max(0.0);
    let row_count = ((span / bucket_duration).ceil() as usize).max(1);

    let mut rows = Vec::with_capacity(row_count);
    for i in 0..row_count {
        let bucket_start = span_start + i as f64 * bucket_duration;
        let bucket_end = bucket_start + bucket_duration;
        let is_last = i + 1 == row_count;
        let scores = bucket_scores(&ordered, bucket_start, bucket_end, is_last, options.weighting);
        rows.push(HeatmapRow {
            bucket_start,
            bucket_end,
            scores,
        });
    }

    if options.smooth_window > 1 {
        smooth_rows(&mut rows, options.smooth_window);
    }

    Ok(HeatmapMatrix {
        bucket_duration,
        rows,
    })
}

/// Average the valid segment vectors overlapping one bucket.
fn bucket_scores(
    ordered: &[&Segment],
    bucket_start: f64,
    bucket_end: f64,
    is_last: bool,
    weighting: Weighting,
) -> Option<EmotionVector> {
    let mut weighted = [0.0f64; EMOTION_COUNT];
    let mut total_weight = 0.0f64;
    // Zero-width overlaps (instantaneous segments sitting on the bucket) fall
    // back to a plain membership mean so they are not silently dropped.
    let mut fallback = [0.0f64; EMOTION_COUNT];
    let mut fallback_count = 0usize;

    for segment in ordered {
        let vector = match segment.score_vector() {
            Some(v) => v,
            None => continue,
        };
        if !overlaps_bucket(segment, bucket_start, bucket_end, is_last) {
            continue;
        }

        let overlap =
            (segment.end_time.min(bucket_end) - segment.start_time.max(bucket_start)).max(0.0);
        let weight = match weighting {
            Weighting::Overlap => overlap,
            Weighting::Membership => 1.0,
        };

        if weight > 0.0 {
            for (acc, value) in weighted.iter_mut().zip(vector.iter()) {
                *acc += weight * value;
            }
            total_weight += weight;
        } else {
            for (acc, value) in fallback.iter_mut().zip(vector.iter()) {
                *acc += value;
            }
            fallback_count += 1;
        }
    }

    if total_weight > 0.0 {
        for value in weighted.iter_mut() {
            *value /= total_weight;
        }
        normalize(&weighted)
    } else if fallback_count > 0 {
        for value in fallback.iter_mut() {
            *value /= fallback_count as f64;
        }
        normalize(&fallback)
    } else {
        None
    }
}

fn overlaps_bucket(segment: &Segment, bucket_start: f64, bucket_end: f64, is_last: bool) -> bool {
    if segment.duration() > 0.0 {
        segment.start_time < bucket_end && segment.end_time > bucket_start
    } else {
        // Instantaneous segment: member of the bucket containing its
        // timestamp. The last bucket is end-inclusive so a segment sitting
        // exactly on the span end is not dropped.
        segment.start_time >= bucket_start
            && (segment.start_time < bucket_end || (is_last && segment.start_time <= bucket_end))
    }
}

/// Renormalize a vector so it sums to 1. None when the mass is zero.
fn normalize(vector: &EmotionVector) -> Option<EmotionVector> {
    let sum: f64 = vector.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return None;
    }
    let mut out = *vector;
    for value in out.iter_mut() {
        *value /= sum;
    }
    Some(out)
}

fn dominant_label(scores: &EmotionVector) -> &'static str {
    let mut best = 0usize;
    for i in 1..EMOTION_COUNT {
        if scores[i] > scores[best] {
            best = i;
        }
    }
    EMOTION_LABELS[best]
}

/// Centered moving average over data rows. No-data rows are neither consumed
/// nor produced: a gap stays a gap, and its neighbors skip it.
fn smooth_rows(rows: &mut [HeatmapRow], window: usize) {
    let window = window | 1; // force odd
    let half = window / 2;
    let snapshot: Vec<Option<EmotionVector>> = rows.iter().map(|r| r.scores).collect();

    for (i, row) in rows.iter_mut().enumerate() {
        if snapshot[i].is_none() {
            continue;
        }
        let lo = i.saturating_sub(half);
        let hi = (i + half).min(snapshot.len() - 1);

        let mut sum = [0.0f64; EMOTION_COUNT];
        let mut count = 0usize;
        for neighbor in snapshot[lo..=hi].iter().flatten() {
            for (acc, value) in sum.iter_mut().zip(neighbor.iter()) {
                *acc += value;
            }
            count += 1;
        }
        if count == 0 {
            continue;
        }
        for value in sum.iter_mut() {
            *value /= count as f64;
        }
        row.scores = normalize(&sum);
    }
}
