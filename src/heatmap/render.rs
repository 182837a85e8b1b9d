// EMOSCOPE Render Engine - Heatmap & Timeline Artifacts
// Copyright (c) 2026 Emoscope
//
// Renders the aggregated matrix to PNG. The heatmap grid goes through the
// `image` crate; the timeline chart is stroked with tiny-skia. Rendering
// only reads the matrix, it never recomputes scores.

use crate::heatmap::aggregate::HeatmapMatrix;
use crate::pipeline::segment::{label_index, EMOTION_COUNT, EMOTION_LABELS};
use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};
use std::path::Path;
use tiny_skia::{Color, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};
use tracing::info;

const CELL_WIDTH: u32 = 14;
const CELL_HEIGHT: u32 = 42;
const MARGIN: u32 = 12;
const NO_DATA_GRAY: [u8; 3] = [58, 58, 58];

/// Per-emotion line/strip colors (joy, sadness, anger, fear, surprise,
/// disgust, neutral).
const EMOTION_COLORS: [[u8; 3]; EMOTION_COUNT] = [
    [250, 200, 60],  // joy
    [70, 110, 220],  // sadness
    [215, 60, 50],   // anger
    [130, 70, 180],  // fear
    [60, 200, 200],  // surprise
    [110, 160, 60],  // disgust
    [150, 150, 150], // neutral
];

pub fn heatmap_dimensions(bucket_count: usize) -> (u32, u32) {
    let width = MARGIN * 2 + bucket_count as u32 * CELL_WIDTH;
    let height = MARGIN * 2 + EMOTION_COUNT as u32 * CELL_HEIGHT;
    (width, height)
}

/// Render the time-by-emotion grid: columns = buckets, rows = emotions,
/// cell brightness = score. No-data buckets render as a flat gray column.
pub fn render_heatmap(matrix: &HeatmapMatrix, path: &Path) -> Result<()> {
    let cols = matrix.rows.len();
    let (width, height) = heatmap_dimensions(cols);
    info!("[RENDER] Heatmap grid: {} buckets -> {}x{}px", cols, width, height);

    let mut img = RgbImage::from_pixel(width, height, Rgb([20, 20, 24]));

    for (col, row) in matrix.rows.iter().enumerate() {
        for emotion in 0..EMOTION_COUNT {
            let color = match row.scores {
                Some(scores) => heat_color(scores[emotion]),
                None => Rgb(NO_DATA_GRAY),
            };
            let x0 = MARGIN + col as u32 * CELL_WIDTH;
            let y0 = MARGIN + emotion as u32 * CELL_HEIGHT;
            // 1px gutter between cells
            for x in x0..x0 + CELL_WIDTH - 1 {
                for y in y0..y0 + CELL_HEIGHT - 1 {
                    img.put_pixel(x, y, color);
                }
            }
        }
    }

    img.save(path)
        .map_err(|e| anyhow!("Failed to save heatmap {:?}: {}", path, e))?;
    Ok(())
}

/// Sequential ramp from near-black through violet to warm yellow.
pub fn heat_color(value: f64) -> Rgb<u8> {
    let v = value.clamp(0.0, 1.0);
    let low = [15.0, 10.0, 60.0];
    let mid = [188.0, 55.0, 84.0];
    let high = [252.0, 224.0, 122.0];

    let channel = |i: usize| -> u8 {
        let c = if v < 0.5 {
            low[i] + (mid[i] - low[i]) * (v / 0.5)
        } else {
            mid[i] + (high[i] - mid[i]) * ((v - 0.5) / 0.5)
        };
        c.round().clamp(0.0, 255.0) as u8
    };

    Rgb([channel(0), channel(1), channel(2)])
}

const TIMELINE_PLOT_HEIGHT: f32 = 220.0;
const TIMELINE_STRIP_HEIGHT: f32 = 18.0;
const TIMELINE_STEP: f32 = 10.0;
const TIMELINE_MARGIN: f32 = 16.0;

pub fn timeline_dimensions(bucket_count: usize) -> (u32, u32) {
    let width = (TIMELINE_MARGIN * 2.0 + bucket_count as f32 * TIMELINE_STEP).ceil() as u32;
    let height =
        (TIMELINE_MARGIN * 2.0 + TIMELINE_PLOT_HEIGHT + 8.0 + TIMELINE_STRIP_HEIGHT).ceil() as u32;
    (width.max(1), height)
}

/// Render one polyline per emotion over bucket midpoints, plus a
/// dominant-emotion strip underneath. Lines break at no-data buckets
/// instead of interpolating across them.
pub fn render_timeline(matrix: &HeatmapMatrix, path: &Path) -> Result<()> {
    let cols = matrix.rows.len();
    let (width, height) = timeline_dimensions(cols);
    info!("[RENDER] Timeline chart: {} buckets -> {}x{}px", cols, width, height);

    let mut pixmap =
        Pixmap::new(width, height).ok_or_else(|| anyhow!("Invalid timeline dimensions"))?;
    pixmap.fill(Color::from_rgba8(20, 20, 24, 255));

    let x_of = |col: usize| TIMELINE_MARGIN + (col as f32 + 0.5) * TIMELINE_STEP;
    let y_of = |score: f64| TIMELINE_MARGIN + (1.0 - score as f32) * TIMELINE_PLOT_HEIGHT;

    let mut paint = Paint::default();
    paint.anti_alias = true;
    let stroke = Stroke {
        width: 2.0,
        ..Stroke::default()
    };

    for label in EMOTION_LABELS {
        let emotion = label_index(label).unwrap_or(0);
        let [r, g, b] = EMOTION_COLORS[emotion];
        paint.set_color_rgba8(r, g, b, 255);

        let mut builder = PathBuilder::new();
        let mut pen_down = false;
        for (col, row) in matrix.rows.iter().enumerate() {
            match row.scores {
                Some(scores) => {
                    let (x, y) = (x_of(col), y_of(scores[emotion]));
                    if pen_down {
                        builder.line_to(x, y);
                    } else {
                        builder.move_to(x, y);
                        pen_down = true;
                    }
                }
                None => pen_down = false,
            }
        }
        if let Some(line) = builder.finish() {
            pixmap
                .as_mut()
                .stroke_path(&line, &paint, &stroke, Transform::identity(), None);
        }
    }

    // Dominant-emotion strip along the bottom; gray for gaps.
    let strip_y = TIMELINE_MARGIN + TIMELINE_PLOT_HEIGHT + 8.0;
    for (col, row) in matrix.rows.iter().enumerate() {
        let [r, g, b] = match row.dominant().and_then(label_index) {
            Some(emotion) => EMOTION_COLORS[emotion],
            None => NO_DATA_GRAY,
        };
        paint.set_color_rgba8(r, g, b, 255);
        if let Some(rect) = Rect::from_xywh(
            TIMELINE_MARGIN + col as f32 * TIMELINE_STEP,
            strip_y,
            TIMELINE_STEP,
            TIMELINE_STRIP_HEIGHT,
        ) {
            pixmap
                .as_mut()
                .fill_rect(rect, &paint, Transform::identity(), None);
        }
    }

    pixmap
        .save_png(path)
        .map_err(|e| anyhow!("Failed to save timeline {:?}: {}", path, e))?;
    Ok(())
}
