use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::extractors::Quality;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External tool locations
    pub tools: ToolsConfig,

    /// Output defaults
    pub output: OutputConfig,

    /// Network behaviour of the extractor and thumbnail fetch
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// yt-dlp executable
    pub yt_dlp: PathBuf,

    /// ffmpeg executable, handed to yt-dlp for MP3 conversion
    pub ffmpeg: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for finished MP3 files
    pub directory: PathBuf,

    /// Bitrate in kbps used when `--quality` is not given
    pub quality: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Timeout for fetching thumbnails over HTTP
    pub thumbnail_timeout_secs: u64,

    /// Passed to yt-dlp as `--socket-timeout`
    pub socket_timeout_secs: Option<u64>,

    /// Passed to yt-dlp as `--retries`
    pub extractor_retries: Option<u32>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp: PathBuf::from("yt-dlp"),
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./downloads"),
            quality: Quality::default().kbps(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            thumbnail_timeout_secs: 30,
            socket_timeout_secs: None,
            extractor_retries: None,
        }
    }
}

impl Config {
    /// Load configuration from file, or defaults when no file exists
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific YAML file
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        let config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Get configuration file path
    pub fn config_path() -> Option<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("ytgrab.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir().map(|dir| dir.join("ytgrab").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.tools.yt_dlp.as_os_str().is_empty() {
            anyhow::bail!("tools.yt_dlp must not be empty");
        }

        if self.tools.ffmpeg.as_os_str().is_empty() {
            anyhow::bail!("tools.ffmpeg must not be empty");
        }

        if Quality::from_kbps(self.output.quality).is_none() {
            anyhow::bail!(
                "output.quality must be one of 128, 192, 256 or 320 (got {})",
                self.output.quality
            );
        }

        Ok(())
    }

    /// Whether a non-default ffmpeg location has to be passed to yt-dlp
    pub fn custom_ffmpeg(&self) -> Option<&std::path::Path> {
        let default = ToolsConfig::default();
        (self.tools.ffmpeg != default.ffmpeg).then_some(self.tools.ffmpeg.as_path())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        match Self::config_path() {
            Some(path) if path.exists() => println!("  Loaded From: {}", path.display()),
            Some(path) => println!("  Config File: {} (not present, using defaults)", path.display()),
            None => println!("  Config File: (no config directory, using defaults)"),
        }
        println!("  yt-dlp: {}", self.tools.yt_dlp.display());
        println!("  ffmpeg: {}", self.tools.ffmpeg.display());
        println!("  Output Directory: {}", self.output.directory.display());
        println!("  Default Quality: {} kbps", self.output.quality);
        println!("  Thumbnail Timeout: {}s", self.network.thumbnail_timeout_secs);
        if let Some(timeout) = self.network.socket_timeout_secs {
            println!("  Socket Timeout: {}s", timeout);
        }
        if let Some(retries) = self.network.extractor_retries {
            println!("  Extractor Retries: {}", retries);
        }
    }
}
