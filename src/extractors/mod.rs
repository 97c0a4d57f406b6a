use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod ytdlp;

pub use ytdlp::YtDlpExtractor;

use crate::Result;

/// Metadata of a single remote video, fetched once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Platform id of the video
    pub id: Option<String>,

    /// Video title, used for the file name and the ID3 title
    pub title: String,

    /// Performing artist (uploader when the platform gives no artist)
    pub artist: String,

    /// Channel name, written as the ID3 album
    pub channel: Option<String>,

    /// Account that uploaded the video
    pub uploader: Option<String>,

    /// Duration in seconds
    pub duration_secs: Option<f64>,

    /// Human-readable duration as reported by the extractor
    pub duration_string: Option<String>,

    /// Upload date as `YYYYMMDD`
    pub upload_date: Option<String>,

    pub view_count: Option<u64>,

    pub description: Option<String>,

    /// Where the cover image comes from
    pub thumbnail: Option<ThumbnailRef>,

    /// Canonical page URL
    pub webpage_url: Option<String>,
}

impl MediaMetadata {
    /// Album tag: the channel, or the artist when no channel is known
    pub fn album(&self) -> &str {
        self.channel
            .as_deref()
            .or(self.uploader.as_deref())
            .unwrap_or(&self.artist)
    }
}

/// Location of a thumbnail image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThumbnailRef {
    Url(String),
    File(PathBuf),
}

/// Supported MP3 bitrates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Quality {
    Kbps128,
    #[default]
    Kbps192,
    Kbps256,
    Kbps320,
}

impl Quality {
    pub const ALL: [Quality; 4] = [
        Quality::Kbps128,
        Quality::Kbps192,
        Quality::Kbps256,
        Quality::Kbps320,
    ];

    pub fn kbps(&self) -> u32 {
        match self {
            Quality::Kbps128 => 128,
            Quality::Kbps192 => 192,
            Quality::Kbps256 => 256,
            Quality::Kbps320 => 320,
        }
    }

    pub fn from_kbps(kbps: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|quality| quality.kbps() == kbps)
    }

    /// Parse user input such as `320`, `320k` or ` 192K `
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_suffix('k')
            .or_else(|| trimmed.strip_suffix('K'))
            .unwrap_or(trimmed);

        digits.parse::<u32>().ok().and_then(Self::from_kbps)
    }

    /// Value for yt-dlp's `--audio-quality`
    pub fn as_audio_quality_arg(&self) -> String {
        format!("{}K", self.kbps())
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}kbps", self.kbps())
    }
}

/// Parameters of one download+transcode invocation
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub quality: Quality,

    /// Private directory the extractor writes into
    pub staging_dir: PathBuf,

    /// Forward extractor output to the terminal
    pub verbose: bool,
}

/// Files produced by a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedAudio {
    pub mp3_path: PathBuf,

    /// Thumbnail written next to the audio, already converted to JPEG
    pub thumbnail_path: Option<PathBuf>,
}

/// Trait for the external tool that fetches metadata and produces MP3 files
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Fetch metadata without downloading any media
    async fn fetch_metadata(&self, url: &str) -> Result<MediaMetadata>;

    /// Download the best audio stream and transcode it to MP3
    async fn download_mp3(&self, request: &DownloadRequest) -> Result<DownloadedAudio>;

    /// Get the name of the underlying tool
    fn tool_name(&self) -> &'static str;
}
