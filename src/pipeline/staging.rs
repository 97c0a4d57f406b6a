use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::utils::unique_path;
use crate::Result;

/// Private scratch directory inside the output directory.
///
/// The extractor writes into it; finished files are renamed out, so a final name
/// never refers to a half-written file. Whatever is left is removed on drop.
pub struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    pub fn create(output_dir: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(".ytgrab-")
            .tempdir_in(output_dir)?;

        tracing::debug!("Created staging directory {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Move `staged` to the first free `output_dir/stem.ext`
    pub fn persist(&self, staged: &Path, output_dir: &Path, stem: &str) -> Result<PathBuf> {
        let extension = staged
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("bin")
            .to_ascii_lowercase();

        let target = unique_path(output_dir, stem, &extension);
        fs_err::rename(staged, &target)?;

        tracing::debug!("Moved {} to {}", staged.display(), target.display());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_is_removed_on_drop() {
        let out = tempfile::tempdir().unwrap();
        let staging_path = {
            let staging = StagingArea::create(out.path()).unwrap();
            fs_err::write(staging.path().join("audio.mp3"), b"partial").unwrap();
            staging.path().to_path_buf()
        };

        assert!(!staging_path.exists());
        assert_eq!(fs_err::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_persist_avoids_existing_files() {
        let out = tempfile::tempdir().unwrap();
        fs_err::write(out.path().join("Song.mp3"), b"older").unwrap();

        let staging = StagingArea::create(out.path()).unwrap();
        let staged = staging.path().join("audio.MP3");
        fs_err::write(&staged, b"newer").unwrap();

        let target = staging.persist(&staged, out.path(), "Song").unwrap();
        assert_eq!(target, out.path().join("Song (1).mp3"));
        assert_eq!(fs_err::read(out.path().join("Song.mp3")).unwrap(), b"older");
        assert_eq!(fs_err::read(&target).unwrap(), b"newer");
        assert!(!staged.exists());
    }
}
