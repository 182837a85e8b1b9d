// EMOSCOPE Source Tools - Interview Acquisition
// Copyright (c) 2026 Emoscope
//
// This module currently handles:
// 1. YouTube URL validation
// 2. Metadata probing and audio download via yt-dlp (with optional browser auth)
// 3. Local file duration extraction via ffprobe

use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub title: String,
    pub duration: f64,
    pub uploader: String,
    pub local_path: PathBuf,
    pub original_url: Option<String>,
}

/// Accepts the YouTube URL shapes users actually paste: watch pages,
/// youtu.be short links, shorts and live URLs.
pub fn validate_youtube_url(raw: &str) -> bool {
    let parsed = match Url::parse(raw) {
        Ok(u) => u,
        Err(_) => return false,
    };
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return false;
    }

    match parsed.host_str() {
        Some("youtu.be") => parsed.path().len() > 1,
        Some("youtube.com") | Some("www.youtube.com") | Some("m.youtube.com")
        | Some("music.youtube.com") => {
            if parsed.path() == "/watch" {
                parsed
                    .query_pairs()
                    .any(|(key, value)| key == "v" && !value.is_empty())
            } else {
                parsed.path().starts_with("/shorts/") || parsed.path().starts_with("/live/")
            }
        }
        _ => false,
    }
}

/// Prevent a leading dash in a path from being read as a flag by child
/// processes.
pub fn safe_arg_path(path: &Path) -> PathBuf {
    if path.to_string_lossy().starts_with('-') {
        Path::new(".").join(path)
    } else {
        path.to_path_buf()
    }
}

/// Find the available command to run yt-dlp (standalone binary preferred,
/// python module fallback).
pub async fn get_ytdlp_command() -> String {
    for bin in ["yt-dlp", "/usr/bin/yt-dlp", "/usr/local/bin/yt-dlp"] {
        if let Ok(output) = Command::new(bin).arg("--version").output().await {
            if output.status.success() {
                return bin.to_string();
            }
        }
    }

    for python in ["python3", "python", "py"] {
        if let Ok(output) = Command::new(python)
            .args(["-m", "yt_dlp", "--version"])
            .output()
            .await
        {
            if output.status.success() {
                info!("[SOURCE] Using '{} -m yt_dlp' for downloads", python);
                return python.to_string();
            }
        }
    }

    warn!("[SOURCE] No working yt-dlp found. Downloads will fail.");
    "yt-dlp".to_string()
}

/// Check if yt-dlp is installed and accessible
pub async fn check_ytdlp() -> bool {
    let cmd = get_ytdlp_command().await;
    if cmd.ends_with("yt-dlp") {
        return Command::new(&cmd)
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false);
    }
    Command::new(&cmd)
        .args(["-m", "yt_dlp", "--version"])
        .output()
        .await
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn build_ytdlp_probe_args(
    command: &str,
    url: &str,
    auth_browser: Option<&str>,
) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>> {
    let mut args = Vec::new();
    if !command.ends_with("yt-dlp") {
        args.push("-m".to_string());
        args.push("yt_dlp".to_string());
    }

    args.extend_from_slice(&[
        "--print".to_string(),
        "%(title)s".to_string(),
        "--print".to_string(),
        "%(duration)s".to_string(),
        "--print".to_string(),
        "%(uploader)s".to_string(),
        "--no-download".to_string(),
    ]);

    if let Some(browser) = auth_browser {
        if browser.starts_with('-') {
            return Err("Browser name cannot start with '-'".into());
        }
        args.push("--cookies-from-browser".to_string());
        args.push(browser.to_string());
    }

    args.push("--".to_string());
    args.push(url.to_string());

    Ok(args)
}

fn build_ytdlp_audio_args(
    command: &str,
    url: &str,
    output_template: &Path,
    auth_browser: Option<&str>,
) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>> {
    let mut args = Vec::new();
    if !command.ends_with("yt-dlp") {
        args.push("-m".to_string());
        args.push("yt_dlp".to_string());
    }

    args.extend_from_slice(&[
        "-f".to_string(),
        "bestaudio/best".to_string(),
        "-x".to_string(),
        "--audio-format".to_string(),
        "wav".to_string(),
        "-o".to_string(),
        safe_arg_path(output_template).to_string_lossy().to_string(),
    ]);

    if let Some(browser) = auth_browser {
        if browser.starts_with('-') {
            return Err("Browser name cannot start with '-'".into());
        }
        args.push("--cookies-from-browser".to_string());
        args.push(browser.to_string());
    }

    args.push("--".to_string());
    args.push(url.to_string());

    Ok(args)
}

/// Probe title/duration/uploader without downloading, then pull the best
/// audio track as WAV into `output_dir`.
pub async fn download_audio(
    url: &str,
    output_dir: &Path,
    auth_browser: Option<&str>,
) -> Result<SourceInfo, Box<dyn std::error::Error + Send + Sync>> {
    info!("[SOURCE] Fetching interview audio: {} (Auth: {:?})", url, auth_browser);

    tokio::fs::create_dir_all(output_dir).await?;

    let command = get_ytdlp_command().await;
    let probe_args = build_ytdlp_probe_args(&command, url, auth_browser)?;

    let probe_output = Command::new(&command).args(&probe_args).output().await?;
    if !probe_output.status.success() {
        return Err(format!(
            "yt-dlp probe failed with command '{}': {}",
            command,
            String::from_utf8_lossy(&probe_output.stderr)
        )
        .into());
    }

    let stdout = String::from_utf8_lossy(&probe_output.stdout);
    let mut lines = stdout.lines();
    let title = lines.next().unwrap_or("Unknown").to_string();
    let duration: f64 = lines.next().unwrap_or("0").parse().unwrap_or(0.0);
    let uploader = lines.next().unwrap_or("Unknown").to_string();

    let safe_title: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() || c == ' ' { c } else { '_' })
        .collect();
    // yt-dlp substitutes %(ext)s after extraction; the final file is .wav
    let template = output_dir.join(format!("{}.%(ext)s", safe_title.trim()));
    let audio_path = output_dir.join(format!("{}.wav", safe_title.trim()));

    let download_args = build_ytdlp_audio_args(&command, url, &template, auth_browser)?;

    info!("[SOURCE] Downloading audio to {:?}", audio_path);
    let status = Command::new(&command).args(&download_args).status().await?;
    if !status.success() {
        return Err("Audio download failed".into());
    }
    if !audio_path.exists() {
        return Err(format!("yt-dlp finished but {:?} was not produced", audio_path).into());
    }

    Ok(SourceInfo {
        title,
        duration,
        uploader,
        local_path: audio_path,
        original_url: Some(url.to_string()),
    })
}

/// Get media duration using ffprobe with a timeout
pub async fn get_media_duration(
    path: &Path,
) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
    let safe_path = safe_arg_path(path);

    // Duration comes from the header; if this hangs, something is wrong
    // with the file, not with us.
    let output = tokio::time::timeout(
        tokio::time::Duration::from_secs(10),
        Command::new("ffprobe")
            .kill_on_drop(true)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(&safe_path)
            .output(),
    )
    .await
    .map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::TimedOut, "ffprobe duration check timed out")
    })??;

    let duration: f64 = String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse()
        .map_err(|_| "Failed to parse duration from ffprobe output".to_string())?;
    Ok(duration)
}
