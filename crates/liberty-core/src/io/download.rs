//! Streaming HTTP download with optional SHA-256 sidecar verification.

use std::path::Path;

use reqwest::{Client, Response, StatusCode};
use sha2::{Digest, Sha256};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::error::FetchError;
use crate::reporter::Reporter;

/// Download `url` to `dest`, verifying it against `<url>.sha256` when the
/// repository publishes one.
///
/// The body is streamed into `<dest>.part` and renamed into place only after
/// verification, so `dest` never holds a partial or mismatched file. The part
/// file is removed on every failure after it is created.
///
/// # Errors
///
/// [`FetchError::NotFound`] on a 404, [`FetchError::Status`] on any other
/// non-success status, [`FetchError::ChecksumMismatch`] if the sidecar does
/// not match, and transport or IO errors as they occur.
pub async fn download_verified(
    client: &Client,
    url: &str,
    dest: &Path,
    reporter: &dyn Reporter,
) -> Result<String, FetchError> {
    let resp = client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?;

    if resp.status() == StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound(url.to_string()));
    }
    if !resp.status().is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: resp.status().as_u16(),
        });
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }
    let part = dest.with_extension("part");
    let result = match stream_and_verify(client, url, resp, &part, reporter).await {
        Ok(actual) => fs::rename(&part, dest).await.map(|()| actual).map_err(FetchError::from),
        Err(e) => Err(e),
    };
    if result.is_err() {
        let _ = fs::remove_file(&part).await;
    }
    result
}

async fn stream_and_verify(
    client: &Client,
    url: &str,
    mut resp: Response,
    part: &Path,
    reporter: &dyn Reporter,
) -> Result<String, FetchError> {
    let mut file = File::create(part).await?;
    let mut hasher = Sha256::new();

    while let Some(chunk) = resp.chunk().await? {
        hasher.update(&chunk);
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);

    let actual = hex::encode(hasher.finalize());

    match fetch_sidecar(client, &format!("{url}.sha256")).await? {
        Some(expected) if !expected.eq_ignore_ascii_case(&actual) => Err(FetchError::ChecksumMismatch {
            url: url.to_string(),
            expected,
            actual,
        }),
        Some(_) => Ok(actual),
        None => {
            reporter.debug(&format!("No checksum published for {url}"));
            Ok(actual)
        }
    }
}

/// Fetch a checksum sidecar; the digest is its first whitespace-separated token.
async fn fetch_sidecar(client: &Client, url: &str) -> Result<Option<String>, FetchError> {
    let resp = client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?;

    if !resp.status().is_success() {
        return Ok(None);
    }

    let text = resp.text().await?;
    Ok(text.split_whitespace().next().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::{MemoryReporter, NullReporter};

    const BODY: &[u8] = b"feature archive bytes";

    fn digest(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    #[tokio::test]
    async fn test_download_with_matching_sidecar() {
        let mut server = mockito::Server::new_async().await;
        let _body = server.mock("GET", "/a.esa").with_body(BODY).create_async().await;
        let _sum = server
            .mock("GET", "/a.esa.sha256")
            .with_body(format!("{}  a.esa\n", digest(BODY)))
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested/a.esa");
        let hash = download_verified(&Client::new(), &format!("{}/a.esa", server.url()), &dest, &NullReporter)
            .await
            .unwrap();

        assert_eq!(hash, digest(BODY));
        assert_eq!(std::fs::read(&dest).unwrap(), BODY);
    }

    #[tokio::test]
    async fn test_download_without_sidecar() {
        let mut server = mockito::Server::new_async().await;
        let _body = server.mock("GET", "/a.esa").with_body(BODY).create_async().await;
        let _sum = server
            .mock("GET", "/a.esa.sha256")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.esa");
        let reporter = MemoryReporter::default();
        download_verified(&Client::new(), &format!("{}/a.esa", server.url()), &dest, &reporter)
            .await
            .unwrap();
        assert!(dest.exists());
        assert!(reporter.contains("debug", "No checksum published"));
    }

    #[tokio::test]
    async fn test_checksum_mismatch_leaves_no_file() {
        let mut server = mockito::Server::new_async().await;
        let _body = server.mock("GET", "/a.esa").with_body(BODY).create_async().await;
        let _sum = server
            .mock("GET", "/a.esa.sha256")
            .with_body("0".repeat(64))
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.esa");
        let err = download_verified(&Client::new(), &format!("{}/a.esa", server.url()), &dest, &NullReporter)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::ChecksumMismatch { .. }));
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }

    #[tokio::test]
    async fn test_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _m = server.mock("GET", "/missing.esa").with_status(404).create_async().await;

        let dir = tempfile::tempdir().unwrap();
        let err = download_verified(
            &Client::new(),
            &format!("{}/missing.esa", server.url()),
            &dir.path().join("missing.esa"),
            &NullReporter,
        )
        .await
        .unwrap_err();
        assert!(err.is_missing());
    }

    #[tokio::test]
    async fn test_failed_rename_removes_part_file() {
        let mut server = mockito::Server::new_async().await;
        let _body = server.mock("GET", "/a.esa").with_body(BODY).create_async().await;
        let _sum = server
            .mock("GET", "/a.esa.sha256")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.esa");
        std::fs::create_dir_all(dest.join("occupied")).unwrap();

        download_verified(&Client::new(), &format!("{}/a.esa", server.url()), &dest, &NullReporter)
            .await
            .unwrap_err();
        assert!(dest.is_dir());
        assert!(!dest.with_extension("part").exists());
    }
}
