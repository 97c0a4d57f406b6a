use std::path::PathBuf;

use crate::config::Config;
use crate::extractors::{AudioExtractor, DownloadRequest, MediaMetadata, Quality, YtDlpExtractor};
use crate::output;
use crate::tagging::TagEmbedder;
use crate::utils::sanitize_filename;
use crate::{Result, YtgrabError};

pub mod staging;

use staging::StagingArea;

/// Everything one invocation needs to know
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRequest {
    /// Source reference
    pub url: String,

    /// Directory receiving the MP3 (created when missing)
    pub output_dir: PathBuf,

    pub quality: Quality,

    /// Keep the thumbnail next to the MP3
    pub keep_thumbnail: bool,

    /// Stop after fetching metadata
    pub info_only: bool,

    pub verbose: bool,
}

/// A finished MP3 and what happened while producing it
#[derive(Debug)]
pub struct ArchivedAudio {
    pub metadata: MediaMetadata,
    pub mp3_path: PathBuf,
    pub thumbnail_path: Option<PathBuf>,
    pub quality: Quality,

    /// Set when tagging failed; the MP3 exists regardless
    pub tag_warning: Option<YtgrabError>,
}

/// Result of a successful run
#[derive(Debug)]
pub enum ArchiveOutcome {
    InfoOnly(MediaMetadata),
    Archived(ArchivedAudio),
}

/// Fetch metadata, download+transcode, tag, then move the result into place
pub struct ArchivePipeline {
    extractor: Box<dyn AudioExtractor>,
    tagger: TagEmbedder,
}

impl ArchivePipeline {
    /// Create a pipeline backed by yt-dlp
    pub fn new(config: &Config) -> Self {
        Self::with_extractor(Box::new(YtDlpExtractor::new(config)), config)
    }

    pub fn with_extractor(extractor: Box<dyn AudioExtractor>, config: &Config) -> Self {
        Self {
            extractor,
            tagger: TagEmbedder::new(config),
        }
    }

    pub async fn run(&self, request: &ArchiveRequest) -> Result<ArchiveOutcome> {
        let url = validate_url(&request.url)?;

        output::status("Fetching video metadata...");
        tracing::debug!("Fetching metadata with {}", self.extractor.tool_name());
        let metadata = self.extractor.fetch_metadata(url).await?;

        if request.info_only {
            return Ok(ArchiveOutcome::InfoOnly(metadata));
        }

        fs_err::create_dir_all(&request.output_dir)?;
        let staging = StagingArea::create(&request.output_dir)?;

        let downloaded = self
            .extractor
            .download_mp3(&DownloadRequest {
                url: url.to_string(),
                quality: request.quality,
                staging_dir: staging.path().to_path_buf(),
                verbose: request.verbose,
            })
            .await?;

        output::status("Embedding metadata and cover art...");
        let tag_warning = self
            .tagger
            .embed(&downloaded.mp3_path, &metadata, downloaded.thumbnail_path.as_deref())
            .await
            .err();

        if let Some(warning) = &tag_warning {
            tracing::warn!("Tagging failed for {}: {}", downloaded.mp3_path.display(), warning);
        }

        let stem = sanitize_filename(&metadata.title);
        let mp3_path = staging.persist(&downloaded.mp3_path, &request.output_dir, &stem)?;

        let thumbnail_path = if request.keep_thumbnail {
            match &downloaded.thumbnail_path {
                Some(thumbnail) => {
                    let final_stem = mp3_path
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or(stem.as_str())
                        .to_string();
                    Some(staging.persist(thumbnail, &request.output_dir, &final_stem)?)
                }
                None => {
                    output::warning("No thumbnail was downloaded, nothing to keep");
                    None
                }
            }
        } else {
            None
        };

        Ok(ArchiveOutcome::Archived(ArchivedAudio {
            metadata,
            mp3_path,
            thumbnail_path,
            quality: request.quality,
            tag_warning,
        }))
    }
}

/// Reject empty source references; everything else is left to the extractor
pub fn validate_url(url: &str) -> Result<&str> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(YtgrabError::InvalidInput("URL must not be empty".to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::{DownloadedAudio, MockAudioExtractor};
    use crate::tagging::tests::{fake_jpeg, fake_mp3, sample_metadata};
    use crate::tagging::read_tags;
    use std::path::Path;

    fn request(output_dir: &Path) -> ArchiveRequest {
        ArchiveRequest {
            url: "https://www.youtube.com/watch?v=abc123".to_string(),
            output_dir: output_dir.to_path_buf(),
            quality: Quality::Kbps192,
            keep_thumbnail: false,
            info_only: false,
            verbose: false,
        }
    }

    fn mock() -> MockAudioExtractor {
        let mut mock = MockAudioExtractor::new();
        mock.expect_tool_name().return_const("mock");
        mock
    }

    /// Mock whose download writes `audio` (and a JPEG thumbnail) into the staging dir
    fn mock_with_download(audio: Vec<u8>) -> MockAudioExtractor {
        let mut mock = mock();
        mock.expect_fetch_metadata()
            .times(1)
            .returning(|_| Ok(sample_metadata()));
        mock.expect_download_mp3()
            .times(1)
            .withf(|req| req.quality == Quality::Kbps192 && req.url.contains("abc123"))
            .returning(move |req| {
                let mp3_path = req.staging_dir.join("audio.mp3");
                let thumbnail_path = req.staging_dir.join("audio.jpg");
                fs_err::write(&mp3_path, &audio)?;
                fs_err::write(&thumbnail_path, fake_jpeg())?;
                Ok(DownloadedAudio {
                    mp3_path,
                    thumbnail_path: Some(thumbnail_path),
                })
            });
        mock
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs_err::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_blank_url_rejected_without_subprocess() {
        for url in ["", "   ", "\t\n"] {
            let out = tempfile::tempdir().unwrap();
            let target = out.path().join("downloads");

            let mut mock = MockAudioExtractor::new();
            mock.expect_fetch_metadata().times(0);
            mock.expect_download_mp3().times(0);
            mock.expect_tool_name().times(0);

            let pipeline = ArchivePipeline::with_extractor(Box::new(mock), &Config::default());
            let mut req = request(&target);
            req.url = url.to_string();

            let err = pipeline.run(&req).await.unwrap_err();
            assert!(matches!(err, YtgrabError::InvalidInput(_)));
            assert!(!target.exists());
        }
    }

    #[tokio::test]
    async fn test_info_only_creates_no_mp3() {
        let out = tempfile::tempdir().unwrap();
        let target = out.path().join("downloads");

        let mut mock = mock();
        mock.expect_fetch_metadata()
            .times(1)
            .returning(|_| Ok(sample_metadata()));
        mock.expect_download_mp3().times(0);

        let pipeline = ArchivePipeline::with_extractor(Box::new(mock), &Config::default());
        let mut req = request(&target);
        req.info_only = true;

        match pipeline.run(&req).await.unwrap() {
            ArchiveOutcome::InfoOnly(meta) => assert_eq!(meta.title, "Never Gonna Give You Up"),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_successful_run_tags_match_metadata() {
        let out = tempfile::tempdir().unwrap();
        let pipeline =
            ArchivePipeline::with_extractor(Box::new(mock_with_download(fake_mp3())), &Config::default());

        let outcome = pipeline.run(&request(out.path())).await.unwrap();
        let archived = match outcome {
            ArchiveOutcome::Archived(archived) => archived,
            other => panic!("unexpected outcome: {:?}", other),
        };

        assert_eq!(archived.mp3_path, out.path().join("Never Gonna Give You Up.mp3"));
        assert!(archived.tag_warning.is_none());
        assert!(archived.thumbnail_path.is_none());

        let tags = read_tags(&archived.mp3_path).unwrap();
        assert_eq!(tags.title.as_deref(), Some(archived.metadata.title.as_str()));
        assert_eq!(tags.artist.as_deref(), Some(archived.metadata.artist.as_str()));
        assert_eq!(tags.album.as_deref(), Some("RickAstleyVEVO"));
        assert_eq!(tags.cover_mime.as_deref(), Some("image/jpeg"));

        // Staging directory and unkept thumbnail are gone
        assert_eq!(entries(out.path()), vec!["Never Gonna Give You Up.mp3"]);
    }

    #[tokio::test]
    async fn test_keep_thumbnail_writes_image_next_to_mp3() {
        let out = tempfile::tempdir().unwrap();
        let pipeline =
            ArchivePipeline::with_extractor(Box::new(mock_with_download(fake_mp3())), &Config::default());

        let mut req = request(out.path());
        req.keep_thumbnail = true;

        let archived = match pipeline.run(&req).await.unwrap() {
            ArchiveOutcome::Archived(archived) => archived,
            other => panic!("unexpected outcome: {:?}", other),
        };

        let thumbnail = archived.thumbnail_path.expect("thumbnail kept");
        assert_eq!(thumbnail, out.path().join("Never Gonna Give You Up.jpg"));
        assert_eq!(fs_err::read(&thumbnail).unwrap(), fake_jpeg());
        assert_eq!(
            entries(out.path()),
            vec!["Never Gonna Give You Up.jpg", "Never Gonna Give You Up.mp3"]
        );
    }

    #[tokio::test]
    async fn test_transcode_failure_leaves_no_mp3() {
        let out = tempfile::tempdir().unwrap();

        let mut mock = mock();
        mock.expect_fetch_metadata()
            .times(1)
            .returning(|_| Ok(sample_metadata()));
        mock.expect_download_mp3().times(1).returning(|req| {
            fs_err::write(req.staging_dir.join("audio.mp3"), b"\xFF\xFBtruncated")?;
            Err(YtgrabError::Transcode("audio conversion failed".to_string()))
        });

        let pipeline = ArchivePipeline::with_extractor(Box::new(mock), &Config::default());
        let err = pipeline.run(&request(out.path())).await.unwrap_err();

        assert!(matches!(err, YtgrabError::Transcode(_)));
        assert_ne!(err.exit_code(), 0);
        assert!(!out.path().join("Never Gonna Give You Up.mp3").exists());
        assert!(entries(out.path()).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_before_download() {
        let out = tempfile::tempdir().unwrap();
        let target = out.path().join("downloads");

        let mut mock = mock();
        mock.expect_fetch_metadata()
            .times(1)
            .returning(|_| Err(YtgrabError::Fetch("the video is unavailable".to_string())));
        mock.expect_download_mp3().times(0);

        let pipeline = ArchivePipeline::with_extractor(Box::new(mock), &Config::default());
        let err = pipeline.run(&request(&target)).await.unwrap_err();

        assert!(matches!(err, YtgrabError::Fetch(_)));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_tag_failure_is_not_fatal() {
        let out = tempfile::tempdir().unwrap();
        let pipeline = ArchivePipeline::with_extractor(
            Box::new(mock_with_download(b"not an mp3 at all".to_vec())),
            &Config::default(),
        );

        let archived = match pipeline.run(&request(out.path())).await.unwrap() {
            ArchiveOutcome::Archived(archived) => archived,
            other => panic!("unexpected outcome: {:?}", other),
        };

        assert!(matches!(archived.tag_warning, Some(YtgrabError::Tag(_))));
        assert_eq!(fs_err::read(&archived.mp3_path).unwrap(), b"not an mp3 at all");
    }

    #[test]
    fn test_validate_url_trims() {
        assert_eq!(validate_url("  https://youtu.be/x \n").unwrap(), "https://youtu.be/x");
        assert!(matches!(validate_url(" "), Err(YtgrabError::InvalidInput(_))));
    }
}
