//! ytgrab - archive the audio of online videos as tagged MP3 files
//!
//! This library wraps `yt-dlp` (with `ffmpeg` as its audio post-processor) to fetch
//! metadata, download and transcode the best audio stream, and embed ID3 tags plus the
//! video thumbnail as cover art.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod launcher;
pub mod output;
pub mod pipeline;
pub mod tagging;
pub mod utils;

pub use cli::Cli;
pub use config::Config;
pub use extractors::{AudioExtractor, DownloadedAudio, MediaMetadata, Quality, ThumbnailRef};
pub use pipeline::{ArchiveOutcome, ArchivePipeline, ArchiveRequest};
pub use tagging::TagEmbedder;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, YtgrabError>;

/// Error types specific to ytgrab
#[derive(thiserror::Error, Debug)]
pub enum YtgrabError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to fetch video info: {0}")]
    Fetch(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Conversion to MP3 failed: {0}")]
    Transcode(String),

    #[error("Could not embed tags: {0}")]
    Tag(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl YtgrabError {
    /// Process exit code reported for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            YtgrabError::InvalidInput(_) => 2,
            YtgrabError::Fetch(_) => 3,
            YtgrabError::Download(_) => 4,
            YtgrabError::Transcode(_) => 5,
            YtgrabError::Tag(_) | YtgrabError::Io(_) => 1,
        }
    }
}
