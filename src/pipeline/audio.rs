// EMOSCOPE Audio Tools - Speech Track Extraction
// Copyright (c) 2026 Emoscope

use std::path::Path;
use tokio::process::Command;
use tracing::info;

/// Convert any input media to the 16kHz mono WAV whisper expects.
pub async fn extract_speech_track(
    input: &Path,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("[EARS] Extracting 16kHz mono speech track from {:?}", input);

    let result = Command::new("ffmpeg")
        .args([
            "-y",
            "-i",
            input.to_str().ok_or("Input path is not valid UTF-8")?,
            "-vn",
            "-ac",
            "1",
            "-ar",
            "16000",
            output.to_str().ok_or("Output path is not valid UTF-8")?,
        ])
        .output()
        .await?;

    if !result.status.success() {
        return Err(format!(
            "FFmpeg speech extraction failed: {}",
            String::from_utf8_lossy(&result.stderr)
        )
        .into());
    }

    Ok(())
}

/// Check if ffmpeg is installed and accessible
pub async fn check_ffmpeg() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check if ffprobe is installed and accessible
pub async fn check_ffprobe() -> bool {
    Command::new("ffprobe")
        .arg("-version")
        .output()
        .await
        .map(|o| o.status.success())
        .unwrap_or(false)
}
