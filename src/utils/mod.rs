use std::path::{Path, PathBuf};
use url::Url;

use crate::config::Config;

/// Longest file stem we produce, in characters
const MAX_FILENAME_CHARS: usize = 200;

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Format duration as `h:mm:ss` or `m:ss`
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Format a count with thousands separators
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}

/// Turn `YYYYMMDD` into `YYYY-MM-DD`, leaving anything else untouched
pub fn format_upload_date(raw: &str) -> String {
    chrono::NaiveDate::parse_from_str(raw, "%Y%m%d")
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Sanitize a title for safe filesystem usage
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .filter(|c| !c.is_control())
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == ' ');
    let truncated: String = trimmed.chars().take(MAX_FILENAME_CHARS).collect();
    let truncated = truncated.trim_end_matches(|c| c == '.' || c == ' ');

    if truncated.is_empty() {
        "audio".to_string()
    } else {
        truncated.to_string()
    }
}

/// First free path of the form `dir/stem.ext`, `dir/stem (1).ext`, ...
pub fn unique_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let candidate = dir.join(format!("{}.{}", stem, extension));
    if !candidate.exists() {
        return candidate;
    }

    (1..)
        .map(|n| dir.join(format!("{} ({}).{}", stem, n, extension)))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Extract domain from URL for display purposes
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(|host| {
        // Remove 'www.' prefix if present
        host.strip_prefix("www.").unwrap_or(host).to_string()
    })
}

/// Whether the URL points at YouTube; a missing scheme is read as https
pub fn is_youtube_url(url: &str) -> bool {
    let domain = extract_domain(url).or_else(|| extract_domain(&format!("https://{}", url.trim())));
    match domain {
        Some(domain) => {
            domain == "youtu.be"
                || domain == "youtube.com"
                || domain.ends_with(".youtube.com")
                || domain == "youtube-nocookie.com"
        }
        None => false,
    }
}

/// Check if the current environment has required tools
pub async fn check_dependencies(config: &Config) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(&config.tools.yt_dlp, "--version").await {
        missing.push(format!(
            "{} - install with: pip install yt-dlp",
            config.tools.yt_dlp.display()
        ));
    }

    if !check_command_available(&config.tools.ffmpeg, "-version").await {
        missing.push(format!(
            "{} - download from https://ffmpeg.org/download.html",
            config.tools.ffmpeg.display()
        ));
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &Path, version_flag: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg(version_flag)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}
