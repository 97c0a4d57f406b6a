use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{AudioExtractor, DownloadRequest, DownloadedAudio, MediaMetadata, ThumbnailRef};
use crate::config::Config;
use crate::{Result, YtgrabError};

/// Base name of every file yt-dlp writes into the staging directory
const STAGED_STEM: &str = "audio";

/// Phrases in yt-dlp's final error line that point at the ffmpeg post-processor
const TRANSCODE_MARKERS: [&str; 3] = [
    "postprocessing",
    "audio conversion failed",
    "ffmpeg not found",
];

/// Image extensions yt-dlp may leave behind when thumbnail conversion is skipped
const THUMBNAIL_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Subset of yt-dlp's `--dump-json` output
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    id: Option<String>,
    title: Option<String>,
    artist: Option<String>,
    channel: Option<String>,
    uploader: Option<String>,
    duration: Option<f64>,
    duration_string: Option<String>,
    upload_date: Option<String>,
    view_count: Option<u64>,
    description: Option<String>,
    thumbnail: Option<String>,
    webpage_url: Option<String>,
}

impl From<YtDlpInfo> for MediaMetadata {
    fn from(info: YtDlpInfo) -> Self {
        let non_empty = |value: Option<String>| value.filter(|s| !s.trim().is_empty());

        let channel = non_empty(info.channel);
        let uploader = non_empty(info.uploader);
        let artist = non_empty(info.artist)
            .or_else(|| uploader.clone())
            .or_else(|| channel.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        MediaMetadata {
            id: info.id,
            title: non_empty(info.title).unwrap_or_else(|| "Unknown".to_string()),
            artist,
            channel,
            uploader,
            duration_secs: info.duration,
            duration_string: info.duration_string,
            upload_date: info.upload_date,
            view_count: info.view_count,
            description: info.description,
            thumbnail: non_empty(info.thumbnail).map(ThumbnailRef::Url),
            webpage_url: info.webpage_url,
        }
    }
}

/// Which invocation failed, for error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Metadata,
    Download,
}

/// Audio extractor backed by the yt-dlp executable
pub struct YtDlpExtractor {
    yt_dlp_path: PathBuf,
    ffmpeg_location: Option<PathBuf>,
    socket_timeout_secs: Option<u64>,
    retries: Option<u32>,
}

impl YtDlpExtractor {
    pub fn new(config: &Config) -> Self {
        Self {
            yt_dlp_path: config.tools.yt_dlp.clone(),
            ffmpeg_location: config.custom_ffmpeg().map(Path::to_path_buf),
            socket_timeout_secs: config.network.socket_timeout_secs,
            retries: config.network.extractor_retries,
        }
    }

    /// Options shared by every invocation
    fn common_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--no-playlist".into()];

        if let Some(timeout) = self.socket_timeout_secs {
            args.push("--socket-timeout".into());
            args.push(timeout.to_string().into());
        }

        if let Some(retries) = self.retries {
            args.push("--retries".into());
            args.push(retries.to_string().into());
        }

        if let Some(ffmpeg) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.clone().into_os_string());
        }

        args
    }

    fn metadata_args(&self, url: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--dump-json".into(), "--no-download".into()];
        args.extend(self.common_args());
        args.push("--".into());
        args.push(url.into());
        args
    }

    fn download_args(&self, request: &DownloadRequest) -> Vec<OsString> {
        let template = request.staging_dir.join(format!("{}.%(ext)s", STAGED_STEM));

        let mut args: Vec<OsString> = vec![
            // Best audio stream, converted by ffmpeg
            "--format".into(),
            "bestaudio/best".into(),
            "--extract-audio".into(),
            "--audio-format".into(),
            "mp3".into(),
            "--audio-quality".into(),
            request.quality.as_audio_quality_arg().into(),
            // Cover art source for the tagger
            "--write-thumbnail".into(),
            "--convert-thumbnails".into(),
            "jpg".into(),
            "--output".into(),
            template.into_os_string(),
        ];

        if request.verbose {
            args.push("--newline".into());
        } else {
            for flag in ["--quiet", "--no-warnings", "--no-progress"] {
                args.push(flag.into());
            }
        }

        args.extend(self.common_args());
        args.push("--".into());
        args.push(request.url.as_str().into());
        args
    }

    /// Find the produced files in the staging directory
    fn collect_outputs(staging_dir: &Path) -> Result<DownloadedAudio> {
        let expected = staging_dir.join(format!("{}.mp3", STAGED_STEM));
        let mp3_path = if expected.is_file() {
            expected
        } else {
            Self::find_by_extension(staging_dir, &["mp3"])?.ok_or_else(|| {
                YtgrabError::Transcode("yt-dlp finished but no MP3 file was produced".to_string())
            })?
        };

        let thumbnail_path = Self::find_by_extension(staging_dir, &THUMBNAIL_EXTENSIONS)?;

        Ok(DownloadedAudio {
            mp3_path,
            thumbnail_path,
        })
    }

    fn find_by_extension(dir: &Path, extensions: &[&str]) -> Result<Option<PathBuf>> {
        let mut matches = Vec::new();
        for entry in fs_err::read_dir(dir)? {
            let path = entry?.path();
            let matches_ext = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
                .unwrap_or(false);
            if matches_ext && path.is_file() {
                matches.push(path);
            }
        }

        // Prefer the order given in `extensions`
        matches.sort_by_key(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .and_then(|ext| extensions.iter().position(|e| ext.eq_ignore_ascii_case(e)))
        });

        Ok(matches.into_iter().next())
    }

    /// Report the download once: a spinner when quiet, a plain line when yt-dlp prints its own progress
    fn announce_download(request: &DownloadRequest) -> Option<ProgressBar> {
        let message = format!("Downloading and converting to MP3 ({})...", request.quality);

        if request.verbose {
            crate::output::status(&message);
            None
        } else {
            Some(Self::spinner(&message))
        }
    }

    fn spinner(message: &str) -> ProgressBar {
        let progress = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
            progress.set_style(style);
        }
        progress.set_message(message.to_string());
        progress.enable_steady_tick(Duration::from_millis(120));
        progress
    }
}

#[async_trait]
impl AudioExtractor for YtDlpExtractor {
    async fn fetch_metadata(&self, url: &str) -> Result<MediaMetadata> {
        tracing::debug!("Extracting video info for: {}", url);

        let output = Command::new(&self.yt_dlp_path)
            .args(self.metadata_args(url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| spawn_error(&self.yt_dlp_path, e, Stage::Metadata))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!("yt-dlp stderr: {}", stderr);
            return Err(classify_failure(Stage::Metadata, &stderr, output.status.code()));
        }

        parse_metadata(&output.stdout)
    }

    async fn download_mp3(&self, request: &DownloadRequest) -> Result<DownloadedAudio> {
        tracing::debug!(
            "Downloading {} at {} into {}",
            request.url,
            request.quality,
            request.staging_dir.display()
        );

        let mut command = Command::new(&self.yt_dlp_path);
        command
            .args(self.download_args(request))
            .stdin(Stdio::null())
            .stderr(Stdio::piped());

        command.stdout(if request.verbose { Stdio::inherit() } else { Stdio::null() });
        let progress = Self::announce_download(request);

        let result = command.output().await;

        if let Some(progress) = &progress {
            progress.finish_and_clear();
        }

        let output = result.map_err(|e| spawn_error(&self.yt_dlp_path, e, Stage::Download))?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        if request.verbose && !stderr.trim().is_empty() {
            eprint!("{}", stderr);
        }

        if !output.status.success() {
            tracing::debug!("yt-dlp stderr: {}", stderr);
            return Err(classify_failure(Stage::Download, &stderr, output.status.code()));
        }

        Self::collect_outputs(&request.staging_dir)
    }

    fn tool_name(&self) -> &'static str {
        "yt-dlp"
    }
}

fn spawn_error(program: &Path, error: std::io::Error, stage: Stage) -> YtgrabError {
    let message = if error.kind() == std::io::ErrorKind::NotFound {
        format!(
            "{} is not available. Please install it: https://github.com/yt-dlp/yt-dlp",
            program.display()
        )
    } else {
        format!("failed to run {}: {}", program.display(), error)
    };

    match stage {
        Stage::Metadata => YtgrabError::Fetch(message),
        Stage::Download => YtgrabError::Download(message),
    }
}

/// Parse the first JSON document printed by `--dump-json`
fn parse_metadata(stdout: &[u8]) -> Result<MediaMetadata> {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| YtgrabError::Fetch("yt-dlp returned no metadata".to_string()))?;

    let info: YtDlpInfo = serde_json::from_str(line)
        .map_err(|e| YtgrabError::Fetch(format!("failed to parse video metadata: {}", e)))?;

    Ok(info.into())
}

/// The most informative line of yt-dlp's stderr
fn error_summary(stderr: &str, code: Option<i32>) -> String {
    let lines: Vec<&str> = stderr.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    lines
        .iter()
        .rev()
        .find(|line| line.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .map(|line| line.trim_start_matches("ERROR:").trim().to_string())
        .unwrap_or_else(|| match code {
            Some(code) => format!("yt-dlp exited with status {}", code),
            None => "yt-dlp was terminated by a signal".to_string(),
        })
}

/// Map a failed invocation onto the error taxonomy
fn classify_failure(stage: Stage, stderr: &str, code: Option<i32>) -> YtgrabError {
    let summary = error_summary(stderr, code);
    let lower = stderr.to_lowercase();

    match stage {
        Stage::Metadata => {
            let reason = if lower.contains("is not a valid url") || lower.contains("unsupported url") {
                "the URL is invalid or not supported"
            } else if lower.contains("private video") || lower.contains("sign in to confirm") {
                "the video is private or requires sign-in"
            } else if lower.contains("not available in your country") || lower.contains("geo restrict") {
                "the video is geo-restricted"
            } else if lower.contains("video unavailable") || lower.contains("has been removed") {
                "the video is unavailable"
            } else {
                return YtgrabError::Fetch(summary);
            };
            YtgrabError::Fetch(format!("{} ({})", reason, summary))
        }
        Stage::Download => {
            // Warnings may mention ffmpeg on a plain network failure; only the error counts
            let error_line = summary.to_lowercase();
            let transcode = TRANSCODE_MARKERS
                .iter()
                .any(|marker| error_line.contains(marker));

            if transcode {
                YtgrabError::Transcode(summary)
            } else {
                YtgrabError::Download(summary)
            }
        }
    }
}
