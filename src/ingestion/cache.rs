use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use reqwest::{StatusCode, blocking::Client};

use crate::{
    ingestion::IngestionError,
    structures::{FeedRegistry, RetryPolicy},
};

#[derive(Debug, PartialEq)]
pub enum SourceLocation {
    Local(String),
    Remote(String),
}

impl SourceLocation {
    pub fn parse(label: &str, url: &str) -> Result<Self, String> {
        if let Some(path) = url.strip_prefix("path:") {
            Ok(SourceLocation::Local(path.to_string()))
        } else if url.starts_with("http://") || url.starts_with("https://") {
            Ok(SourceLocation::Remote(url.to_string()))
        } else {
            Err(format!("Unknown URL scheme for '{label}': {url}"))
        }
    }
}

pub fn resolve_feed(registry: &FeedRegistry, name: &str) -> Result<SourceLocation, IngestionError> {
    let url = registry
        .get(name)
        .ok_or_else(|| IngestionError::FeedResolutionError(name.to_string()))?;
    SourceLocation::parse(name, url).map_err(IngestionError::UnknownSchemeError)
}

/// Local path for a source, downloading remote sources to `dest` first.
pub fn resolve_path(
    location: SourceLocation,
    dest: &Path,
    retry: &RetryPolicy,
) -> Result<PathBuf, IngestionError> {
    match location {
        SourceLocation::Local(path) => Ok(PathBuf::from(path)),
        SourceLocation::Remote(url) => {
            download(&url, dest, retry)?;
            Ok(dest.to_path_buf())
        }
    }
}

enum FetchFailure {
    Transient(String),
    Permanent(String),
}

/// Retries transient failures (connection problems, timeouts, 408/429/5xx)
/// with exponential backoff; any other HTTP error aborts at once.
pub fn download(url: &str, dest: &Path, retry: &RetryPolicy) -> Result<(), IngestionError> {
    download_with(&Client::new(), url, dest, retry)
}

fn download_with(
    client: &Client,
    url: &str,
    dest: &Path,
    retry: &RetryPolicy,
) -> Result<(), IngestionError> {
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match fetch_once(client, url) {
            Ok(bytes) => {
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(dest, &bytes)?;
                tracing::info!("downloaded {url} ({} bytes) to {}", bytes.len(), dest.display());
                return Ok(());
            }
            Err(FetchFailure::Transient(message)) if attempt < max_attempts => {
                let wait = backoff(retry, attempt);
                tracing::warn!(
                    "attempt {attempt}/{max_attempts} for {url} failed: {message}, retrying in {}ms",
                    wait.as_millis()
                );
                thread::sleep(wait);
            }
            Err(FetchFailure::Transient(message)) | Err(FetchFailure::Permanent(message)) => {
                return Err(IngestionError::DownloadError {
                    url: url.to_string(),
                    attempts: attempt,
                    message,
                });
            }
        }
    }
}

fn fetch_once(client: &Client, url: &str) -> Result<Vec<u8>, FetchFailure> {
    let response = client.get(url).send().map_err(|e| {
        if e.is_builder() {
            FetchFailure::Permanent(e.to_string())
        } else {
            FetchFailure::Transient(e.to_string())
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let message = format!("HTTP {status}");
        return Err(if is_transient_status(status) {
            FetchFailure::Transient(message)
        } else {
            FetchFailure::Permanent(message)
        });
    }

    response
        .bytes()
        .map(|b| b.to_vec())
        .map_err(|e| FetchFailure::Transient(e.to_string()))
}

pub fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

fn backoff(retry: &RetryPolicy, attempt: u32) -> Duration {
    let factor = 1u64 << (attempt - 1).min(16);
    Duration::from_millis(retry.initial_backoff_ms.saturating_mul(factor))
}
