use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::{Client, StatusCode};

/// Formats that decode to more than one frame; they cannot be compared against
/// a still reference and are never persisted to disk.
const ANIMATED_EXTENSIONS: [&str; 3] = ["gif", "webm", "mp4"];

/// Result of a download attempt. Every skip is equivalent to the caller (no
/// file to match); the reason only feeds diagnostics.
#[derive(Debug)]
pub enum DownloadOutcome {
    Saved(PathBuf),
    Skipped(SkipReason),
}

impl DownloadOutcome {
    pub fn saved_path(&self) -> Option<&Path> {
        match self {
            DownloadOutcome::Saved(path) => Some(path),
            DownloadOutcome::Skipped(_) => None,
        }
    }
}

#[derive(Debug)]
pub enum SkipReason {
    /// Animated format, out of scope for matching.
    Animated,
    /// Destination file already on disk from this run or a prior one.
    AlreadyExists,
    /// Remote reported the file gone.
    NotFound,
    /// Remote refused the request with some other status.
    Http(StatusCode),
    /// Transport-level failure (DNS, timeout, reset).
    Connection(String),
    /// Fetched but could not be written out.
    Io(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Animated => write!(f, "animated image"),
            SkipReason::AlreadyExists => write!(f, "already downloaded"),
            SkipReason::NotFound => write!(f, "not found"),
            SkipReason::Http(status) => write!(f, "http status {status}"),
            SkipReason::Connection(e) => write!(f, "connection failed: {e}"),
            SkipReason::Io(e) => write!(f, "write failed: {e}"),
        }
    }
}

/// Filename portion of a URL, e.g. `http://host/dir/file.png` -> `file.png`.
pub fn url_filename(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

fn url_extension(url: &str) -> Option<String> {
    let name = url_filename(url);
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Fetch a direct-file URL into the output directory.
///
/// Animated formats are rejected before any network traffic, and a file that
/// is already on disk is left untouched, so repeating a run never re-downloads
/// or overwrites anything.
pub async fn download(client: &Client, url: &str, output_dir: &Path) -> DownloadOutcome {
    if let Some(ext) = url_extension(url)
        && ANIMATED_EXTENSIONS.contains(&ext.as_str())
    {
        tracing::info!("aborting download, animated image: {url}");
        return DownloadOutcome::Skipped(SkipReason::Animated);
    }

    let destination = output_dir.join(url_filename(url));
    if destination.exists() {
        tracing::debug!("already on disk: {}", destination.display());
        return DownloadOutcome::Skipped(SkipReason::AlreadyExists);
    }

    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return DownloadOutcome::Skipped(SkipReason::Connection(e.to_string())),
    };

    match response.status() {
        StatusCode::NOT_FOUND => return DownloadOutcome::Skipped(SkipReason::NotFound),
        status if !status.is_success() => {
            return DownloadOutcome::Skipped(SkipReason::Http(status));
        }
        _ => {}
    }

    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return DownloadOutcome::Skipped(SkipReason::Connection(e.to_string())),
    };

    match tokio::fs::write(&destination, &bytes).await {
        Ok(()) => DownloadOutcome::Saved(destination),
        Err(e) => DownloadOutcome::Skipped(SkipReason::Io(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_filename_last_segment() {
        assert_eq!(url_filename("http://i.imgur.com/abc123.png"), "abc123.png");
        assert_eq!(url_filename("abc123.png"), "abc123.png");
    }

    #[test]
    fn test_url_extension_lowercased() {
        assert_eq!(url_extension("http://host/a.PNG").as_deref(), Some("png"));
        assert_eq!(url_extension("http://host/clip.webm").as_deref(), Some("webm"));
        assert!(url_extension("http://host/page").is_none());
    }

    #[tokio::test]
    async fn test_animated_formats_rejected_without_io() {
        let client = Client::new();
        let dir = tempfile::tempdir().unwrap();

        for url in [
            "http://i.imgur.com/a.gif",
            "http://i.imgur.com/a.webm",
            "http://host/clip.mp4",
        ] {
            let outcome = download(&client, url, dir.path()).await;
            assert!(
                matches!(outcome, DownloadOutcome::Skipped(SkipReason::Animated)),
                "{url}: {outcome:?}"
            );
        }

        // No file was created for any of them.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_existing_file_is_not_overwritten() {
        let client = Client::new();
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("abc123.png");
        std::fs::write(&existing, b"original contents").unwrap();

        let outcome = download(&client, "http://i.imgur.com/abc123.png", dir.path()).await;
        assert!(matches!(
            outcome,
            DownloadOutcome::Skipped(SkipReason::AlreadyExists)
        ));
        assert!(outcome.saved_path().is_none());
        assert_eq!(std::fs::read(&existing).unwrap(), b"original contents");
    }
}
