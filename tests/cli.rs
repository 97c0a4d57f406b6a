use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn ytgrab(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ytgrab").unwrap();
    cmd.current_dir(workdir)
        .env("XDG_CONFIG_HOME", workdir)
        .env_remove("YTGRAB_OUTPUT")
        .env_remove("YTGRAB_QUALITY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_options() {
    let dir = tempfile::tempdir().unwrap();
    ytgrab(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--keep-thumbnail"))
        .stdout(predicate::str::contains("--info-only"))
        .stdout(predicate::str::contains("--quality"));
}

#[test]
fn test_blank_url_is_invalid_input() {
    let dir = tempfile::tempdir().unwrap();
    ytgrab(dir.path())
        .arg("   ")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid input"));

    assert!(!dir.path().join("downloads").exists());
}

#[test]
fn test_show_config() {
    let dir = tempfile::tempdir().unwrap();
    ytgrab(dir.path())
        .arg("--show-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Default Quality: 192 kbps"));
}

#[cfg(unix)]
mod fake_tool {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    const METADATA_JSON: &str =
        r#"{"id":"abc","title":"Fake Song","uploader":"Fake Artist","channel":"Fake Channel"}"#;

    /// Install a stand-in yt-dlp whose download step runs `download_body`
    fn install(dir: &Path, download_body: &str) {
        let script = format!(
            r#"#!/bin/sh
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "--output" ]; then out="$arg"; fi
  prev="$arg"
done
case " $* " in
  *" --version "*) echo "2024.01.01"; exit 0;;
  *" --dump-json "*) echo '{json}'; exit 0;;
esac
{body}
"#,
            json = METADATA_JSON,
            body = download_body
        );

        let tool = dir.join("fake-yt-dlp");
        fs_err::write(&tool, script).unwrap();
        fs_err::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        fs_err::write(
            dir.join("ytgrab.yaml"),
            format!("tools:\n  yt_dlp: {}\n", tool.display()),
        )
        .unwrap();
    }

    const WRITE_MP3: &str = r#"mp3=$(echo "$out" | sed 's/%(ext)s/mp3/')
printf '\377\373\220\144' > "$mp3"
head -c 413 /dev/zero >> "$mp3"
exit 0"#;

    #[test]
    fn test_info_only_prints_metadata_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        install(dir.path(), "exit 99");

        ytgrab(dir.path())
            .args(["https://www.youtube.com/watch?v=abc", "--info-only"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Title: Fake Song"))
            .stdout(predicate::str::contains("Channel: Fake Channel"));

        assert!(!dir.path().join("downloads").exists());
    }

    #[test]
    fn test_download_produces_tagged_mp3() {
        let dir = tempfile::tempdir().unwrap();
        install(dir.path(), WRITE_MP3);

        ytgrab(dir.path())
            .args(["https://www.youtube.com/watch?v=abc", "-q", "999"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Downloaded: Fake Song.mp3"))
            .stderr(predicate::str::contains("Using 192 kbps"));

        let mp3 = dir.path().join("downloads").join("Fake Song.mp3");
        let tag = id3::Tag::read_from_path(&mp3).unwrap();
        use id3::TagLike;
        assert_eq!(tag.title(), Some("Fake Song"));
        assert_eq!(tag.artist(), Some("Fake Artist"));
        assert_eq!(tag.album(), Some("Fake Channel"));
    }

    #[test]
    fn test_transcode_failure_exits_nonzero_without_mp3() {
        let dir = tempfile::tempdir().unwrap();
        install(
            dir.path(),
            r#"echo "ERROR: Postprocessing: audio conversion failed: broken pipe" >&2
exit 1"#,
        );

        ytgrab(dir.path())
            .arg("https://www.youtube.com/watch?v=abc")
            .assert()
            .code(5)
            .stderr(predicate::str::contains("Conversion to MP3 failed"));

        let downloads = dir.path().join("downloads");
        assert!(!downloads.join("Fake Song.mp3").exists());
        assert_eq!(fs_err::read_dir(&downloads).unwrap().count(), 0);
    }

    #[test]
    fn test_unavailable_video_is_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("fake-yt-dlp");
        fs_err::write(
            &tool,
            "#!/bin/sh\ncase \" $* \" in *\" --version \"*) exit 0;; esac\necho 'ERROR: [youtube] abc: Video unavailable' >&2\nexit 1\n",
        )
        .unwrap();
        fs_err::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        fs_err::write(
            dir.path().join("ytgrab.yaml"),
            format!("tools:\n  yt_dlp: {}\n", tool.display()),
        )
        .unwrap();

        ytgrab(dir.path())
            .arg("https://www.youtube.com/watch?v=abc")
            .assert()
            .code(3)
            .stderr(predicate::str::contains("unavailable"));
    }
}
