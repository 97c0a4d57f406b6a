use futures_util::StreamExt;
use id3::frame::{Picture, PictureType};
use id3::{Tag, TagLike, Timestamp, Version};
use reqwest::Client;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use crate::config::Config;
use crate::extractors::{MediaMetadata, ThumbnailRef};
use crate::{Result, YtgrabError};

/// Largest thumbnail we are willing to embed
const MAX_COVER_BYTES: usize = 10 * 1024 * 1024;

/// Image data ready to be embedded as an APIC frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArt {
    pub data: Vec<u8>,
    pub mime_type: &'static str,
}

impl CoverArt {
    /// Sniff the image type from its magic bytes
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let mime_type = if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            "image/jpeg"
        } else if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            "image/png"
        } else if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Err(YtgrabError::Tag(
                "thumbnail is WebP, which MP3 players cannot display as cover art".to_string(),
            ));
        } else {
            return Err(YtgrabError::Tag("thumbnail is not a JPEG or PNG image".to_string()));
        };

        Ok(Self { data, mime_type })
    }
}

/// Tags read back from a finished file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<i32>,
    pub cover_mime: Option<String>,
}

/// Writes ID3 tags and cover art into MP3 files
pub struct TagEmbedder {
    client: Client,
}

impl TagEmbedder {
    pub fn new(config: &Config) -> Self {
        let timeout = Duration::from_secs(config.network.thumbnail_timeout_secs);
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            Client::new()
        });

        Self::with_client(client)
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Tag `mp3_path` in place.
    ///
    /// Text frames are written even when the cover cannot be loaded; the cover
    /// failure is still returned so the caller can warn about it.
    pub async fn embed(
        &self,
        mp3_path: &Path,
        metadata: &MediaMetadata,
        local_cover: Option<&Path>,
    ) -> Result<()> {
        ensure_mp3(mp3_path)?;

        let cover = self.load_cover(metadata, local_cover).await;
        let (cover, cover_error) = match cover {
            Ok(cover) => (cover, None),
            Err(e) => (None, Some(e)),
        };

        write_tags(mp3_path, metadata, cover)?;
        tracing::debug!("Embedded tags into {}", mp3_path.display());

        match cover_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Local thumbnail first, then the thumbnail reference from the metadata
    async fn load_cover(
        &self,
        metadata: &MediaMetadata,
        local_cover: Option<&Path>,
    ) -> Result<Option<CoverArt>> {
        let candidates = local_cover
            .map(|path| ThumbnailRef::File(path.to_path_buf()))
            .into_iter()
            .chain(metadata.thumbnail.clone());

        let mut last_error = None;

        for candidate in candidates {
            let cover = match &candidate {
                ThumbnailRef::File(path) => read_cover_file(path),
                ThumbnailRef::Url(url) => self.fetch_thumbnail(url).await.and_then(CoverArt::from_bytes),
            };

            match cover {
                Ok(cover) => return Ok(Some(cover)),
                Err(e) => {
                    tracing::debug!("Thumbnail {:?} unusable: {}", candidate, e);
                    last_error = Some(e);
                }
            }
        }

        last_error.map_or(Ok(None), Err)
    }

    async fn fetch_thumbnail(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!("Fetching thumbnail: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| YtgrabError::Tag(format!("failed to fetch thumbnail: {}", e)))?;

        if !response.status().is_success() {
            return Err(YtgrabError::Tag(format!(
                "failed to fetch thumbnail: HTTP {}",
                response.status()
            )));
        }

        if response
            .content_length()
            .is_some_and(|length| length > MAX_COVER_BYTES as u64)
        {
            return Err(YtgrabError::Tag("thumbnail is too large to embed".to_string()));
        }

        let mut data = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| YtgrabError::Tag(format!("failed to fetch thumbnail: {}", e)))?;
            if data.len() + chunk.len() > MAX_COVER_BYTES {
                return Err(YtgrabError::Tag("thumbnail is too large to embed".to_string()));
            }
            data.extend_from_slice(&chunk);
        }

        Ok(data)
    }
}

fn read_cover_file(path: &Path) -> Result<CoverArt> {
    let data = fs_err::read(path)
        .map_err(|e| YtgrabError::Tag(format!("failed to read thumbnail: {}", e)))?;
    CoverArt::from_bytes(data)
}

/// Reject files that carry neither an ID3v2 header nor an MPEG frame sync
pub fn ensure_mp3(path: &Path) -> Result<()> {
    let mut header = [0u8; 3];
    let read = fs_err::File::open(path)
        .and_then(|mut file| file.read(&mut header))
        .map_err(|e| YtgrabError::Tag(format!("cannot open {}: {}", path.display(), e)))?;

    let is_id3 = read == 3 && &header == b"ID3";
    let is_frame_sync = read >= 2 && header[0] == 0xFF && (header[1] & 0xE0) == 0xE0;

    if is_id3 || is_frame_sync {
        Ok(())
    } else {
        Err(YtgrabError::Tag(format!("{} is not a valid MP3 file", path.display())))
    }
}

/// Write title, artist, album, recording date and cover art as ID3v2.4
pub fn write_tags(path: &Path, metadata: &MediaMetadata, cover: Option<CoverArt>) -> Result<()> {
    let mut tag = match Tag::read_from_path(path) {
        Ok(tag) => tag,
        Err(e) if matches!(e.kind, id3::ErrorKind::NoTag) => Tag::new(),
        Err(e) => return Err(YtgrabError::Tag(format!("failed to read existing tags: {}", e))),
    };

    tag.set_title(metadata.title.as_str());
    tag.set_artist(metadata.artist.as_str());
    tag.set_album(metadata.album());

    if let Some(date) = metadata.upload_date.as_deref().and_then(parse_upload_date) {
        tag.set_date_recorded(date);
    }

    if let Some(cover) = cover {
        tag.remove_picture_by_type(PictureType::CoverFront);
        tag.add_frame(Picture {
            mime_type: cover.mime_type.to_string(),
            picture_type: PictureType::CoverFront,
            description: "Cover".to_string(),
            data: cover.data,
        });
    }

    tag.write_to_path(path, Version::Id3v24)
        .map_err(|e| YtgrabError::Tag(format!("failed to write tags: {}", e)))
}

/// Read the tags back for display
pub fn read_tags(path: &Path) -> Result<EmbeddedTags> {
    let tag = Tag::read_from_path(path)
        .map_err(|e| YtgrabError::Tag(format!("failed to read tags: {}", e)))?;

    let tags = EmbeddedTags {
        title: tag.title().map(str::to_string),
        artist: tag.artist().map(str::to_string),
        album: tag.album().map(str::to_string),
        year: tag.date_recorded().map(|date| date.year),
        cover_mime: tag
            .pictures()
            .find(|picture| picture.picture_type == PictureType::CoverFront)
            .map(|picture| picture.mime_type.clone()),
    };
    Ok(tags)
}

fn parse_upload_date(raw: &str) -> Option<Timestamp> {
    use chrono::Datelike;

    let date = chrono::NaiveDate::parse_from_str(raw, "%Y%m%d").ok()?;
    Some(Timestamp {
        year: date.year(),
        month: Some(date.month() as u8),
        day: Some(date.day() as u8),
        hour: None,
        minute: None,
        second: None,
    })
}
