use emoscope_core::heatmap::aggregate::aggregate;
use emoscope_core::heatmap::export::{matrix_to_csv, AnalysisReport};
use emoscope_core::heatmap::render;
use emoscope_core::pipeline::segment::{
    read_segments_json, write_segments_json, Segment, EMOTION_LABELS,
};
use std::collections::HashMap;

fn sample_segments() -> Vec<Segment> {
    vec![
        Segment {
            start_time: 0.0,
            end_time: 30.0,
            text: "I'm thrilled to be here".to_string(),
            emotion_scores: [("joy".to_string(), 0.9), ("surprise".to_string(), 0.1)]
                .into_iter()
                .collect(),
        },
        Segment {
            start_time: 30.0,
            end_time: 60.0,
            text: String::new(),
            emotion_scores: HashMap::new(),
        },
        Segment {
            start_time: 60.0,
            end_time: 90.0,
            text: "that part was hard for me".to_string(),
            emotion_scores: [("sadness".to_string(), 0.7), ("neutral".to_string(), 0.3)]
                .into_iter()
                .collect(),
        },
    ]
}

#[test]
fn test_csv_shape() {
    let matrix = aggregate(&sample_segments(), 30.0).unwrap();
    let csv = matrix_to_csv(&matrix);
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 4); // header + 3 buckets
    let header: Vec<&str> = lines[0].split(',').collect();
    assert_eq!(header.len(), 2 + EMOTION_LABELS.len() + 1);
    assert_eq!(header[0], "bucket_start");
    assert_eq!(header[2], "joy");

    // Every data row has the same column count as the header.
    for line in &lines[1..] {
        assert_eq!(line.split(',').count(), header.len(), "line: {line}");
    }

    assert!(lines[1].ends_with(",joy"));
    assert!(lines[2].ends_with(",no-data"));
    assert!(lines[3].ends_with(",sadness"));
}

#[test]
fn test_report_contents_and_round_trip() {
    let segments = sample_segments();
    let matrix = aggregate(&segments, 30.0).unwrap();
    let report = AnalysisReport::new(
        "Interview With A Founder",
        "https://youtu.be/abc123",
        segments.len(),
        &matrix,
    );

    assert_eq!(report.segment_count, 3);
    assert_eq!(report.rows.len(), 3);
    assert_eq!(report.rows[0].label, "00:00:00");
    assert_eq!(report.rows[2].label, "00:01:00");
    assert_eq!(report.summary.no_data_buckets, 1);

    let json = serde_json::to_string_pretty(&report).unwrap();
    let back: AnalysisReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back.title, report.title);
    assert_eq!(back.rows[1].scores, None);
}

#[test]
fn test_segments_json_round_trip() {
    let dir = std::env::temp_dir().join("emoscope_test_segments");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("segments.json");

    let segments = sample_segments();
    write_segments_json(&segments, &path).unwrap();
    let back = read_segments_json(&path).unwrap();

    assert_eq!(back.len(), segments.len());
    assert_eq!(back[0].text, segments[0].text);
    assert!(back[1].emotion_scores.is_empty());
    assert_eq!(back[2].emotion_scores.len(), 2);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_render_artifacts_smoke() {
    let matrix = aggregate(&sample_segments(), 30.0).unwrap();
    let dir = std::env::temp_dir().join("emoscope_test_render");
    std::fs::create_dir_all(&dir).unwrap();

    let heatmap_path = dir.join("heatmap.png");
    render::render_heatmap(&matrix, &heatmap_path).unwrap();
    assert!(heatmap_path.exists());
    let (w, h) = render::heatmap_dimensions(matrix.rows.len());
    let dims = image::image_dimensions(&heatmap_path).unwrap();
    assert_eq!(dims, (w, h));

    let timeline_path = dir.join("timeline.png");
    render::render_timeline(&matrix, &timeline_path).unwrap();
    assert!(timeline_path.exists());

    let _ = std::fs::remove_file(&heatmap_path);
    let _ = std::fs::remove_file(&timeline_path);
}
