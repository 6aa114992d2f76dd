//! Input resolution: turn a user-supplied path or URL into document bytes.
//!
//! Every operation in this crate works on an in-memory byte slice, so a URL
//! is downloaded straight into memory and a local file is read whole. The
//! `%PDF` magic is checked before returning so callers get a meaningful error
//! instead of a parser failure deep inside a merge task.

use crate::error::SplitMergeError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How far into the file the `%PDF` header may start. Readers tolerate a
/// little leading junk, so this does too.
const MAGIC_WINDOW: usize = 1024;

/// A resolved input document.
#[derive(Debug, Clone)]
pub struct InputDocument {
    pub bytes: Vec<u8>,
    /// File name as found on disk or in the URL path, e.g. `report.v2.pdf`.
    pub file_name: String,
}

impl InputDocument {
    /// Base name used for every artifact derived from this input.
    pub fn base_name(&self) -> String {
        base_name(&self.file_name)
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// True when `%PDF` appears within the first kilobyte.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(MAGIC_WINDOW)];
    window.windows(4).any(|w| w == b"%PDF")
}

/// The part of a file name before its first dot: `report.v2.pdf` → `report`.
///
/// Falls back to `document` when nothing usable remains.
pub fn base_name(file_name: &str) -> String {
    let name = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name);
    match name.split('.').next() {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => "document".to_string(),
    }
}

/// Resolve the input string to document bytes.
///
/// URLs are downloaded; anything else is treated as a local path.
pub async fn resolve_input(
    input: &str,
    timeout_secs: u64,
) -> Result<InputDocument, SplitMergeError> {
    if input.trim().is_empty() {
        return Err(SplitMergeError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<InputDocument, SplitMergeError> {
    let path = PathBuf::from(path_str);

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => {
            SplitMergeError::PermissionDenied { path: path.clone() }
        }
        _ => SplitMergeError::FileNotFound { path: path.clone() },
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string());

    check_magic(&file_name, &bytes)?;
    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(InputDocument { bytes, file_name })
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<InputDocument, SplitMergeError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SplitMergeError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            SplitMergeError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            SplitMergeError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(SplitMergeError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let file_name = filename_from_url(url);
    let bytes = response
        .bytes()
        .await
        .map_err(|e| SplitMergeError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    check_magic(&file_name, &bytes)?;
    info!("Downloaded {} bytes as '{}'", bytes.len(), file_name);
    Ok(InputDocument { bytes, file_name })
}

fn check_magic(name: &str, bytes: &[u8]) -> Result<(), SplitMergeError> {
    if looks_like_pdf(bytes) {
        return Ok(());
    }
    Err(SplitMergeError::NotAPdf {
        name: name.to_string(),
        magic: bytes.iter().take(4).copied().collect(),
    })
}

/// Last path segment of the URL when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}
