//! Interactive menu around the `ytgrab` binary.
//!
//! Presentation only: it collects a URL and a quality digit, then runs `ytgrab`
//! as a child process.

use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tokio::process::Command;

use crate::extractors::Quality;

/// Menu entries, in the order of their digits
pub const QUALITY_LABELS: [&str; 4] = [
    "1. 128 kbps",
    "2. 192 kbps (default)",
    "3. 256 kbps",
    "4. 320 kbps",
];

/// Menu position of 192 kbps
const DEFAULT_QUALITY_INDEX: usize = 1;

/// One download requested through the menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuJob {
    pub url: String,
    pub quality: Quality,
}

/// Map a menu digit to a bitrate; anything unexpected means the default
pub fn quality_for_choice(choice: &str) -> Quality {
    match choice.trim() {
        "1" => Quality::Kbps128,
        "3" => Quality::Kbps256,
        "4" => Quality::Kbps320,
        _ => Quality::Kbps192,
    }
}

/// Map a zero-based position in [`QUALITY_LABELS`] to a bitrate
pub fn quality_for_index(index: usize) -> Quality {
    quality_for_choice(&(index + 1).to_string())
}

/// Input that ends the menu loop
pub fn is_quit(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("q")
}

/// Re-prompt on blank URLs
pub fn validate_url_input(input: &str) -> Result<(), &'static str> {
    if input.trim().is_empty() {
        Err("Please enter a URL.")
    } else {
        Ok(())
    }
}

pub fn print_banner<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", "=".repeat(50))?;
    writeln!(out, "  {}", style("ytgrab - YouTube to MP3 Archival Tool").bold())?;
    writeln!(out, "{}", "=".repeat(50))?;
    writeln!(out, "Enter q (or close the window) to quit.")
}

/// End of input or Ctrl-C ends the loop instead of failing it
fn closed(err: dialoguer::Error) -> io::Result<Option<MenuJob>> {
    let dialoguer::Error::IO(err) = err;
    match err.kind() {
        io::ErrorKind::UnexpectedEof | io::ErrorKind::Interrupted => Ok(None),
        _ => Err(err),
    }
}

/// Ask for a URL and a quality. `None` once input ends or the user quits.
pub fn prompt_job(theme: &ColorfulTheme) -> io::Result<Option<MenuJob>> {
    let url = match Input::<String>::with_theme(theme)
        .with_prompt("Paste video URL")
        .validate_with(|input: &String| validate_url_input(input))
        .interact_text()
    {
        Ok(url) => url,
        Err(err) => return closed(err),
    };

    if is_quit(&url) {
        return Ok(None);
    }

    let selection = match Select::with_theme(theme)
        .with_prompt("Select audio quality")
        .items(&QUALITY_LABELS)
        .default(DEFAULT_QUALITY_INDEX)
        .interact_opt()
    {
        Ok(Some(index)) => index,
        Ok(None) => return Ok(None),
        Err(err) => return closed(err),
    };

    Ok(Some(MenuJob {
        url: url.trim().to_string(),
        quality: quality_for_index(selection),
    }))
}

/// The `ytgrab` executable installed next to the running binary, or from PATH
pub fn ytgrab_binary() -> PathBuf {
    let name = format!("ytgrab{}", std::env::consts::EXE_SUFFIX);

    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&name)))
        .filter(|path| path.is_file())
        .unwrap_or_else(|| PathBuf::from(name))
}

/// Arguments passed to `ytgrab` for a job
pub fn job_args(job: &MenuJob) -> Vec<String> {
    vec![
        "--quality".to_string(),
        job.quality.kbps().to_string(),
        "--".to_string(),
        job.url.clone(),
    ]
}

/// Run `ytgrab` for one job, sharing this terminal
pub async fn run_job(binary: &Path, job: &MenuJob) -> io::Result<ExitStatus> {
    tracing::debug!("Running {} {:?}", binary.display(), job_args(job));
    Command::new(binary).args(job_args(job)).status().await
}
