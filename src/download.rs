//! Attachment sink: streams a live response body to disk.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use crate::error::Error;

/// Resolves a caller destination against the current working directory.
///
/// Absolute paths are returned unchanged.
///
/// # Errors
///
/// Returns [`Error::Io`] if the working directory cannot be read.
pub fn resolve_destination(path: &Path) -> Result<PathBuf, Error> {
    let cwd = std::env::current_dir().map_err(|e| Error::io(path, e))?;
    Ok(cwd.join(path))
}

/// Writes `response` to `destination`, returning the number of bytes written.
///
/// A partially written file is removed when the transfer fails.
///
/// # Errors
///
/// Returns [`Error::Io`] for file failures and [`Error::Transport`] when the
/// body stream breaks.
pub async fn write_response(
    response: reqwest::Response,
    destination: &Path,
) -> Result<u64, Error> {
    let url = response.url().to_string();
    let mut file = File::create(destination)
        .await
        .map_err(|e| Error::io(destination, e))?;

    let result = stream_to_file(&mut file, response, &url, destination).await;
    if result.is_err() {
        debug!(path = %destination.display(), "cleaning up partial file after error");
        drop(file);
        if let Err(e) = tokio::fs::remove_file(destination).await {
            warn!(path = %destination.display(), error = %e, "failed to remove partial file");
        }
    }
    result
}

async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, Error> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| Error::transport(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| Error::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer.flush().await.map_err(|e| Error::io(file_path, e))?;

    Ok(bytes_written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_destination_resolves_against_cwd() {
        let resolved = resolve_destination(Path::new("attachments/spec.pdf")).unwrap();
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(resolved, cwd.join("attachments/spec.pdf"));
    }

    #[test]
    fn test_absolute_destination_unchanged() {
        let absolute = std::env::temp_dir().join("spec.pdf");
        assert_eq!(resolve_destination(&absolute).unwrap(), absolute);
    }
}
