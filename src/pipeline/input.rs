//! Input resolution: normalise a user-supplied path or URL to raw PDF
//! bytes.
//!
//! The pipeline proper operates on in-memory bytes (uploads arrive that
//! way); this module is the convenience layer for CLI-style callers who
//! have a path or a URL instead. We validate the `%PDF` magic prefix and
//! the size cap *before* returning, so a mis-typed path or an HTML error
//! page fails here with a precise error rather than deep inside the
//! extraction stage.

use crate::error::PipelineError;
use std::path::PathBuf;
use tracing::{debug, info};

const PDF_MAGIC: &[u8] = b"%PDF";

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to validated PDF bytes.
///
/// If the input is a URL, download it with the given timeout; otherwise
/// read the local file. Either way the payload is validated against the
/// PDF magic prefix and `max_bytes`.
pub async fn load_input(
    input: &str,
    max_bytes: usize,
    download_timeout_secs: u64,
) -> Result<Vec<u8>, PipelineError> {
    let bytes = if is_url(input) {
        download_url(input, download_timeout_secs).await?
    } else {
        read_local(input).await?
    };
    validate_payload(input, &bytes, max_bytes)?;
    Ok(bytes)
}

/// Validate an already-loaded payload (used for direct byte uploads too).
pub fn validate_payload(name: &str, bytes: &[u8], max_bytes: usize) -> Result<(), PipelineError> {
    if bytes.len() < PDF_MAGIC.len() || &bytes[..PDF_MAGIC.len()] != PDF_MAGIC {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(PipelineError::NotAPdf {
            name: name.to_string(),
            magic,
        });
    }
    if bytes.len() > max_bytes {
        return Err(PipelineError::FileTooLarge {
            size: bytes.len(),
            limit: max_bytes,
        });
    }
    Ok(())
}

/// Read a local file, mapping the common I/O failures precisely.
async fn read_local(path_str: &str) -> Result<Vec<u8>, PipelineError> {
    let path = PathBuf::from(path_str);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            debug!("read local PDF: {} ({} bytes)", path.display(), bytes.len());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(PipelineError::PermissionDenied { path })
        }
        Err(_) => Err(PipelineError::FileNotFound { path }),
    }
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, PipelineError> {
    info!("downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| PipelineError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            PipelineError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            PipelineError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(PipelineError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| PipelineError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}
