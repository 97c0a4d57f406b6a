use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;
use crate::extractors::Quality;
use crate::pipeline::ArchiveRequest;

#[derive(Parser, Debug)]
#[command(
    name = "ytgrab",
    about = "ytgrab - A metadata-preserving YouTube to MP3 archival tool",
    version,
    long_about = "Downloads the best available audio of a video, converts it to MP3 at the requested bitrate and embeds title, artist, channel and the thumbnail as album art. Requires yt-dlp and ffmpeg on PATH.",
    after_help = "Example: ytgrab https://youtube.com/watch?v=VIDEO_ID -o ./music"
)]
pub struct Cli {
    /// Video URL to download
    #[arg(value_name = "URL", required_unless_present = "show_config")]
    pub url: Option<String>,

    /// Output directory (default: ./downloads)
    #[arg(short, long, value_name = "DIR", env = "YTGRAB_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Audio quality/bitrate in kbps: 128, 192, 256 or 320 (default: 192)
    #[arg(short, long, value_name = "KBPS", env = "YTGRAB_QUALITY")]
    pub quality: Option<String>,

    /// Keep the thumbnail as a separate image file next to the MP3
    #[arg(long)]
    pub keep_thumbnail: bool,

    /// Only show video info, don't download
    #[arg(long)]
    pub info_only: bool,

    /// Show detailed yt-dlp output and debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub show_config: bool,
}

impl Cli {
    /// Resolve the bitrate, falling back to the configured default for unknown values
    pub fn resolve_quality(&self, config: &Config) -> Quality {
        let fallback = Quality::from_kbps(config.output.quality).unwrap_or_default();

        match self.quality.as_deref() {
            None => fallback,
            Some(raw) => match Quality::parse(raw) {
                Some(quality) => quality,
                None => {
                    tracing::warn!(
                        "Unsupported quality {:?}, falling back to {} kbps",
                        raw,
                        fallback.kbps()
                    );
                    eprintln!(
                        "[WARNING] Quality {:?} is not one of 128/192/256/320. Using {} kbps.",
                        raw,
                        fallback.kbps()
                    );
                    fallback
                }
            },
        }
    }

    /// Build the pipeline request for this invocation
    pub fn to_request(&self, config: &Config) -> ArchiveRequest {
        ArchiveRequest {
            url: self.url.clone().unwrap_or_default(),
            output_dir: self
                .output
                .clone()
                .unwrap_or_else(|| config.output.directory.clone()),
            quality: self.resolve_quality(config),
            keep_thumbnail: self.keep_thumbnail,
            info_only: self.info_only,
            verbose: self.verbose,
        }
    }
}
