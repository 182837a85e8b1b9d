// EMOSCOPE Export - Tabular & Report Output
// Copyright (c) 2026 Emoscope

use crate::heatmap::aggregate::{HeatmapMatrix, MatrixSummary};
use crate::pipeline::segment::{vector_to_map, EMOTION_LABELS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One exported bucket, scores keyed by emotion label for readability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    pub bucket_start: f64,
    pub bucket_end: f64,
    pub label: String,
    pub scores: Option<HashMap<String, f64>>,
    pub dominant: Option<String>,
}

/// Full analysis report written next to the CSV and the rendered images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub title: String,
    pub source: String,
    pub segment_count: usize,
    pub bucket_duration: f64,
    pub rows: Vec<ReportRow>,
    pub summary: MatrixSummary,
}

impl AnalysisReport {
    pub fn new(title: &str, source: &str, segment_count: usize, matrix: &HeatmapMatrix) -> Self {
        let rows = matrix
            .rows
            .iter()
            .map(|row| ReportRow {
                bucket_start: row.bucket_start,
                bucket_end: row.bucket_end,
                label: format_timestamp(row.bucket_start),
                scores: row.scores.as_ref().map(vector_to_map),
                dominant: row.dominant().map(|l| l.to_string()),
            })
            .collect();

        Self {
            title: title.to_string(),
            source: source.to_string(),
            segment_count,
            bucket_duration: matrix.bucket_duration,
            rows,
            summary: matrix.summary(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write report {:?}", path))?;
        Ok(())
    }
}

/// Flat tabular form: bucket bounds, one column per emotion, dominant label.
/// No-data buckets keep their bounds but leave the score cells empty.
pub fn matrix_to_csv(matrix: &HeatmapMatrix) -> String {
    let mut out = String::new();
    out.push_str("bucket_start,bucket_end");
    for label in EMOTION_LABELS {
        out.push(',');
        out.push_str(label);
    }
    out.push_str(",dominant\n");

    for row in &matrix.rows {
        out.push_str(&format!("{:.3},{:.3}", row.bucket_start, row.bucket_end));
        match row.scores {
            Some(scores) => {
                for value in scores {
                    out.push_str(&format!(",{:.6}", value));
                }
                out.push(',');
                out.push_str(row.dominant().unwrap_or("no-data"));
            }
            None => {
                for _ in EMOTION_LABELS {
                    out.push(',');
                }
                out.push_str(",no-data");
            }
        }
        out.push('\n');
    }
    out
}

pub fn write_csv(matrix: &HeatmapMatrix, path: &Path) -> Result<()> {
    fs::write(path, matrix_to_csv(matrix))
        .with_context(|| format!("Failed to write CSV {:?}", path))?;
    Ok(())
}

/// HH:MM:SS label for a bucket start.
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heatmap::aggregate::aggregate;
    use crate::pipeline::segment::Segment;

    fn sample_matrix() -> HeatmapMatrix {
        let segments = vec![
            Segment {
                start_time: 0.0,
                end_time: 10.0,
                text: "great to be here".to_string(),
                emotion_scores: [("joy".to_string(), 1.0)].into_iter().collect(),
            },
            Segment {
                start_time: 10.0,
                end_time: 20.0,
                text: String::new(),
                emotion_scores: HashMap::new(),
            },
        ];
        aggregate(&segments, 10.0).unwrap()
    }

    #[test]
    fn test_csv_header_and_rows() {
        let csv = matrix_to_csv(&sample_matrix());
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "bucket_start,bucket_end,joy,sadness,anger,fear,surprise,disgust,neutral,dominant"
        );
        let first = lines.next().unwrap();
        assert!(first.starts_with("0.000,10.000,1.000000"));
        assert!(first.ends_with(",joy"));
        let second = lines.next().unwrap();
        assert!(second.ends_with(",no-data"));
        // no-data rows export empty score cells
        assert!(second.contains(",,"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_report_round_trip() {
        let matrix = sample_matrix();
        let report = AnalysisReport::new("Interview", "local:test.wav", 2, &matrix);
        let json = serde_json::to_string(&report).unwrap();
        let back: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rows.len(), 2);
        assert_eq!(back.rows[0].dominant.as_deref(), Some("joy"));
        assert!(back.rows[1].scores.is_none());
        assert_eq!(back.summary.no_data_buckets, 1);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00:00");
        assert_eq!(format_timestamp(75.4), "00:01:15");
        assert_eq!(format_timestamp(3671.0), "01:01:11");
        assert_eq!(format_timestamp(-3.0), "00:00:00");
    }
}
