use console::style;
use std::path::Path;

use crate::extractors::MediaMetadata;
use crate::pipeline::ArchivedAudio;
use crate::tagging::{read_tags, EmbeddedTags};
use crate::utils::{format_count, format_duration, format_file_size, format_upload_date};

/// Characters of the description shown in the info preview
const DESCRIPTION_PREVIEW_CHARS: usize = 200;

pub fn status(message: &str) {
    println!("{} {}", style("[INFO]").cyan(), message);
}

pub fn success(message: &str) {
    println!("{} {}", style("[SUCCESS]").green(), message);
}

pub fn warning(message: &str) {
    eprintln!("{} {}", style("[WARNING]").yellow(), message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", style("[ERROR]").red().bold(), message);
}

pub fn print_banner() {
    let rule = "=".repeat(50);
    println!("\n{}", rule);
    println!("  {}", style("ytgrab - YouTube to MP3 Archival Tool").bold());
    println!("{}\n", rule);
}

/// Print the metadata preview used by `--info-only`
pub fn print_info(metadata: &MediaMetadata) {
    println!("\n{}", style("[VIDEO INFO]").bold());
    for (label, value) in info_lines(metadata) {
        println!("  {}: {}", label, value);
    }
}

fn info_lines(metadata: &MediaMetadata) -> Vec<(&'static str, String)> {
    let unknown = || "Unknown".to_string();

    let duration = metadata
        .duration_string
        .clone()
        .or_else(|| metadata.duration_secs.map(format_duration))
        .unwrap_or_else(unknown);

    let description = match metadata.description.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => {
            let preview: String = text.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
            if text.chars().count() > DESCRIPTION_PREVIEW_CHARS {
                format!("{}...", preview)
            } else {
                preview
            }
        }
        _ => "None".to_string(),
    };

    let link = metadata
        .webpage_url
        .clone()
        .or_else(|| metadata.id.clone())
        .unwrap_or_else(unknown);

    vec![
        ("Title", metadata.title.clone()),
        ("Artist", metadata.artist.clone()),
        ("Channel", metadata.channel.clone().unwrap_or_else(unknown)),
        ("Uploader", metadata.uploader.clone().unwrap_or_else(unknown)),
        ("Duration", duration),
        (
            "Upload Date",
            metadata
                .upload_date
                .as_deref()
                .map(format_upload_date)
                .unwrap_or_else(unknown),
        ),
        (
            "View Count",
            metadata.view_count.map(format_count).unwrap_or_else(unknown),
        ),
        ("URL", link),
        ("Description", description),
    ]
}

/// Print where the MP3 went and the tags it now carries
pub fn print_summary(archived: &ArchivedAudio) {
    let name = archived
        .mp3_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    println!();
    success(&format!("Downloaded: {}", name));
    success(&format!("Location: {}", absolute(&archived.mp3_path).display()));

    if let Ok(meta) = fs_err::metadata(&archived.mp3_path) {
        status(&format!("Size: {} at {}", format_file_size(meta.len()), archived.quality));
    }

    if let Some(thumbnail) = &archived.thumbnail_path {
        success(&format!("Thumbnail: {}", absolute(thumbnail).display()));
    }

    if let Some(warning_err) = &archived.tag_warning {
        warning(&format!("{} (the MP3 was saved without complete tags)", warning_err));
    }

    print_embedded_tags(&archived.mp3_path);
    println!("\n{} Download complete!", style("[DONE]").green().bold());
}

fn print_embedded_tags(path: &Path) {
    println!("\n{}", style("[INFO] Embedded Metadata:").cyan());
    println!("{}", "-".repeat(40));

    match read_tags(path) {
        Ok(tags) => {
            let lines = tag_lines(&tags);
            if lines.is_empty() {
                println!("  No metadata tags found");
            }
            for (label, value) in lines {
                println!("  {}: {}", label, value);
            }
        }
        Err(e) => {
            tracing::debug!("Could not read tags back: {}", e);
            println!("  (Could not read metadata)");
        }
    }

    println!("{}", "-".repeat(40));
}

fn tag_lines(tags: &EmbeddedTags) -> Vec<(&'static str, String)> {
    let mut lines = Vec::new();
    if let Some(title) = &tags.title {
        lines.push(("Title", title.clone()));
    }
    if let Some(artist) = &tags.artist {
        lines.push(("Artist", artist.clone()));
    }
    if let Some(album) = &tags.album {
        lines.push(("Album", album.clone()));
    }
    if let Some(year) = tags.year {
        lines.push(("Year", year.to_string()));
    }
    if let Some(mime) = &tags.cover_mime {
        lines.push(("Cover Art", mime.clone()));
    }
    lines
}

fn absolute(path: &Path) -> std::path::PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
