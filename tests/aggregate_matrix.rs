use emoscope_core::heatmap::aggregate::{
    aggregate, aggregate_with, AggregateOptions, Weighting, ROW_SUM_EPSILON,
};
use emoscope_core::pipeline::segment::{Segment, EMOTION_LABELS};
use std::collections::HashMap;

fn scored_segment(start: f64, end: f64, pairs: &[(&str, f64)]) -> Segment {
    Segment {
        start_time: start,
        end_time: end,
        text: format!("segment {}..{}", start, end),
        emotion_scores: pairs.iter().map(|(l, v)| (l.to_string(), *v)).collect(),
    }
}

fn failed_segment(start: f64, end: f64) -> Segment {
    Segment {
        start_time: start,
        end_time: end,
        text: String::new(),
        emotion_scores: HashMap::new(),
    }
}

#[test]
fn test_clean_interview_two_buckets() {
    // Two clean 10s segments, 10s buckets -> two rows with the expected
    // dominant emotions.
    let segments = vec![
        scored_segment(0.0, 10.0, &[("joy", 0.8), ("neutral", 0.2)]),
        scored_segment(10.0, 20.0, &[("sadness", 0.9), ("neutral", 0.1)]),
    ];

    let matrix = aggregate(&segments, 10.0).unwrap();
    assert_eq!(matrix.rows.len(), 2);
    assert_eq!(matrix.rows[0].dominant(), Some("joy"));
    assert_eq!(matrix.rows[1].dominant(), Some("sadness"));
}

#[test]
fn test_trailing_failed_segment_is_a_gap() {
    // A failed segment at 20-30s still claims its bucket, as a gap.
    let segments = vec![
        scored_segment(0.0, 10.0, &[("joy", 1.0)]),
        scored_segment(10.0, 20.0, &[("anger", 1.0)]),
        failed_segment(20.0, 30.0),
    ];

    let matrix = aggregate(&segments, 10.0).unwrap();
    assert_eq!(matrix.rows.len(), 3);
    assert!(matrix.rows[2].is_no_data());
    assert_eq!(matrix.rows[2].dominant(), None);
}

#[test]
fn test_single_bucket_covers_whole_interview() {
    let segments = vec![
        scored_segment(0.0, 10.0, &[("joy", 1.0)]),
        scored_segment(10.0, 20.0, &[("fear", 1.0)]),
    ];

    let matrix = aggregate(&segments, 120.0).unwrap();
    assert_eq!(matrix.rows.len(), 1);
    let scores = matrix.rows[0].scores.unwrap();
    // Equal overlap, so joy and fear split the row.
    let joy = scores[0];
    let fear = scores[3];
    assert!((joy - 0.5).abs() < 1e-9);
    assert!((fear - 0.5).abs() < 1e-9);
}

#[test]
fn test_every_row_normalized_or_no_data() {
    let segments = vec![
        scored_segment(0.0, 13.0, &[("joy", 0.5), ("surprise", 0.5)]),
        scored_segment(9.0, 22.0, &[("anger", 0.7), ("disgust", 0.3)]),
        failed_segment(22.0, 35.0),
        scored_segment(35.0, 47.5, &[("neutral", 1.0)]),
    ];

    let matrix = aggregate(&segments, 7.0).unwrap();
    for row in &matrix.rows {
        match row.scores {
            Some(scores) => {
                let sum: f64 = scores.iter().sum();
                assert!(
                    (sum - 1.0).abs() < ROW_SUM_EPSILON,
                    "row at {} sums to {}",
                    row.bucket_start,
                    sum
                );
            }
            None => assert_eq!(row.dominant(), None),
        }
    }
}

#[test]
fn test_row_count_matches_ceil_formula() {
    for (span_end, bucket, expected) in [(95.0, 30.0, 4usize), (90.0, 30.0, 3), (1.0, 30.0, 1)] {
        let segments = vec![scored_segment(0.0, span_end, &[("neutral", 1.0)])];
        let matrix = aggregate(&segments, bucket).unwrap();
        assert_eq!(matrix.rows.len(), expected, "span {span_end} bucket {bucket}");
    }
}

#[test]
fn test_rows_cover_span_contiguously() {
    let segments = vec![
        scored_segment(12.0, 40.0, &[("joy", 1.0)]),
        scored_segment(40.0, 71.0, &[("sadness", 1.0)]),
    ];
    let matrix = aggregate(&segments, 15.0).unwrap();

    let (start, end) = matrix.span();
    assert!((start - 12.0).abs() < 1e-9);
    assert!(end >= 71.0);
    for pair in matrix.rows.windows(2) {
        assert!((pair[0].bucket_end - pair[1].bucket_start).abs() < 1e-9);
        assert!(
            (pair[1].bucket_end - pair[1].bucket_start - 15.0).abs() < 1e-9,
            "rows must stay equally spaced"
        );
    }
}

#[test]
fn test_aggregation_is_idempotent() {
    let segments = vec![
        scored_segment(0.0, 18.0, &[("fear", 0.6), ("surprise", 0.4)]),
        failed_segment(18.0, 30.0),
        scored_segment(30.0, 44.0, &[("joy", 1.0)]),
    ];

    let first = aggregate(&segments, 12.0).unwrap();
    let second = aggregate(&segments, 12.0).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_invalid_inputs_are_errors() {
    let segments = vec![scored_segment(0.0, 10.0, &[("joy", 1.0)])];

    let empty: Vec<Segment> = vec![];
    assert!(aggregate(&empty, 10.0).is_err());
    assert!(aggregate(&segments, 0.0).is_err());
    assert!(aggregate(&segments, -1.0).is_err());
    assert!(aggregate(&segments, f64::INFINITY).is_err());
}

#[test]
fn test_invalid_scores_become_gaps_not_errors() {
    // Negative mass and non-normalized vectors are PartialData, not fatal.
    let segments = vec![
        scored_segment(0.0, 10.0, &[("joy", -0.2), ("neutral", 1.2)]),
        scored_segment(10.0, 20.0, &[("joy", 0.1), ("neutral", 0.1)]),
    ];
    let matrix = aggregate(&segments, 10.0).unwrap();
    assert!(matrix.rows.iter().all(|r| r.is_no_data()));
}

#[test]
fn test_overlap_weighting_favors_longer_overlap() {
    let segments = vec![
        scored_segment(0.0, 8.0, &[("joy", 1.0)]),
        scored_segment(8.0, 10.0, &[("sadness", 1.0)]),
    ];
    let matrix = aggregate(&segments, 10.0).unwrap();
    let scores = matrix.rows[0].scores.unwrap();
    assert!(scores[0] > scores[1], "80% overlap should beat 20%");
    assert!((scores[0] - 0.8).abs() < 1e-9);
}

#[test]
fn test_membership_mode_splits_evenly() {
    let segments = vec![
        scored_segment(0.0, 8.0, &[("joy", 1.0)]),
        scored_segment(8.0, 10.0, &[("sadness", 1.0)]),
    ];
    let options = AggregateOptions {
        weighting: Weighting::Membership,
        smooth_window: 1,
    };
    let matrix = aggregate_with(&segments, 10.0, &options).unwrap();
    let scores = matrix.rows[0].scores.unwrap();
    assert!((scores[0] - scores[1]).abs() < 1e-9);
}

#[test]
fn test_smoothing_keeps_invariants() {
    let segments = vec![
        scored_segment(0.0, 10.0, &[("joy", 1.0)]),
        scored_segment(10.0, 20.0, &[("sadness", 1.0)]),
        failed_segment(20.0, 30.0),
        scored_segment(30.0, 40.0, &[("anger", 1.0)]),
    ];
    let options = AggregateOptions {
        weighting: Weighting::Overlap,
        smooth_window: 3,
    };
    let matrix = aggregate_with(&segments, 10.0, &options).unwrap();

    assert_eq!(matrix.rows.len(), 4);
    assert!(matrix.rows[2].is_no_data(), "gaps survive smoothing");
    for row in &matrix.rows {
        if let Some(scores) = row.scores {
            assert!((scores.iter().sum::<f64>() - 1.0).abs() < ROW_SUM_EPSILON);
        }
    }
    // The first row now carries some of its neighbor's sadness.
    let first = matrix.rows[0].scores.unwrap();
    assert!(first[1] > 0.0);
}

#[test]
fn test_label_order_is_stable() {
    // Exports and rendering both rely on this order; a reorder would silently
    // shuffle every column.
    assert_eq!(
        EMOTION_LABELS,
        ["joy", "sadness", "anger", "fear", "surprise", "disgust", "neutral"]
    );
}
