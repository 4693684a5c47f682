//! Artifact repositories.
//!
//! Layout: `<root>/<group as path>/<artifact>/<version>/<artifact>-<version>.<type>`
//! (the Maven layout), both on disk and below every remote base URL.

use async_trait::async_trait;
use liberty_schema::Coordinate;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::FetchError;
use crate::io::download::download_verified;
use crate::reporter::Reporter;

/// Anything that can turn a coordinate into a file on the local disk.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Fetch the artifact and return its local path.
    async fn fetch(&self, coordinate: &Coordinate) -> Result<PathBuf, FetchError>;
}

#[async_trait]
impl<T: ArtifactFetcher + ?Sized> ArtifactFetcher for Arc<T> {
    async fn fetch(&self, coordinate: &Coordinate) -> Result<PathBuf, FetchError> {
        (**self).fetch(coordinate).await
    }
}

/// Anything that can store a generated artifact under a coordinate.
pub trait ArtifactPublisher: Send + Sync {
    /// Copy `file` into the repository and return the stored path.
    fn publish(&self, coordinate: &Coordinate, file: &Path) -> Result<PathBuf, FetchError>;
}

/// A Maven-layout directory on the local disk.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `coordinate` lives (or would live) in this repository.
    pub fn path_of(&self, coordinate: &Coordinate) -> PathBuf {
        self.root.join(coordinate.local_path())
    }
}

#[async_trait]
impl ArtifactFetcher for LocalRepository {
    async fn fetch(&self, coordinate: &Coordinate) -> Result<PathBuf, FetchError> {
        let path = self.path_of(coordinate);
        if tokio::fs::try_exists(&path).await? {
            Ok(path)
        } else {
            Err(FetchError::NotFound(coordinate.to_string()))
        }
    }
}

impl ArtifactPublisher for LocalRepository {
    fn publish(&self, coordinate: &Coordinate, file: &Path) -> Result<PathBuf, FetchError> {
        let dest = self.path_of(coordinate);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(file, &dest)?;
        Ok(dest)
    }
}

/// A Maven-layout repository served over HTTP(S).
#[derive(Clone)]
pub struct RemoteRepository {
    client: Client,
    base_url: String,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for RemoteRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteRepository")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RemoteRepository {
    pub fn new(client: Client, base_url: &str, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            reporter,
        }
    }

    pub fn url_of(&self, coordinate: &Coordinate) -> String {
        format!("{}/{}", self.base_url, coordinate.repository_path())
    }

    /// Download `coordinate` into `dest`.
    pub async fn download(&self, coordinate: &Coordinate, dest: &Path) -> Result<(), FetchError> {
        let url = self.url_of(coordinate);
        self.reporter.debug(&format!("Downloading {url}"));
        match download_verified(&self.client, &url, dest, self.reporter.as_ref()).await {
            Ok(_) => Ok(()),
            Err(FetchError::NotFound(_)) => Err(FetchError::NotFound(coordinate.to_string())),
            Err(e) => Err(e),
        }
    }
}

/// The local repository backed by zero or more remotes.
///
/// Hits in the local repository are returned directly; misses are
/// downloaded from the first remote that has the artifact and cached locally.
#[derive(Debug, Clone)]
pub struct Repository {
    local: LocalRepository,
    remotes: Vec<RemoteRepository>,
    offline: bool,
}

impl Repository {
    pub fn new(local: LocalRepository, remotes: Vec<RemoteRepository>, offline: bool) -> Self {
        Self {
            local,
            remotes,
            offline,
        }
    }

    /// Build from a local root and remote base URLs, sharing one HTTP client.
    pub fn from_urls(
        local_root: impl Into<PathBuf>,
        remotes: &[String],
        offline: bool,
        reporter: &Arc<dyn Reporter>,
    ) -> Self {
        let client = Client::new();
        let remotes = remotes
            .iter()
            .map(|url| RemoteRepository::new(client.clone(), url, Arc::clone(reporter)))
            .collect();
        Self::new(LocalRepository::new(local_root), remotes, offline)
    }

    pub fn local(&self) -> &LocalRepository {
        &self.local
    }
}

#[async_trait]
impl ArtifactFetcher for Repository {
    async fn fetch(&self, coordinate: &Coordinate) -> Result<PathBuf, FetchError> {
        match self.local.fetch(coordinate).await {
            Ok(path) => return Ok(path),
            Err(FetchError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        if self.offline {
            return Err(FetchError::Offline(coordinate.to_string()));
        }

        let dest = self.local.path_of(coordinate);
        for remote in &self.remotes {
            match remote.download(coordinate, &dest).await {
                Ok(()) => return Ok(dest),
                Err(FetchError::NotFound(_)) => {
                    remote
                        .reporter
                        .debug(&format!("{coordinate} not found at {}", remote.base_url));
                }
                Err(e) => return Err(e),
            }
        }

        Err(FetchError::NotFound(coordinate.to_string()))
    }
}

impl ArtifactPublisher for Repository {
    fn publish(&self, coordinate: &Coordinate, file: &Path) -> Result<PathBuf, FetchError> {
        self.local.publish(coordinate, file)
    }
}

/// Tries each fetcher in turn; a miss falls through to the next one.
#[derive(Clone)]
pub struct FetcherChain {
    fetchers: Vec<Arc<dyn ArtifactFetcher>>,
}

impl std::fmt::Debug for FetcherChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetcherChain")
            .field("len", &self.fetchers.len())
            .finish()
    }
}

impl FetcherChain {
    pub fn new(fetchers: Vec<Arc<dyn ArtifactFetcher>>) -> Self {
        Self { fetchers }
    }
}

#[async_trait]
impl ArtifactFetcher for FetcherChain {
    async fn fetch(&self, coordinate: &Coordinate) -> Result<PathBuf, FetchError> {
        for fetcher in &self.fetchers {
            match fetcher.fetch(coordinate).await {
                Err(e) if e.is_missing() => {}
                other => return other,
            }
        }
        Err(FetchError::NotFound(coordinate.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::{MemoryReporter, NullReporter};

    fn quiet() -> Arc<dyn Reporter> {
        Arc::new(NullReporter)
    }

    fn coordinate() -> Coordinate {
        Coordinate::new("com.example", "x", "esa", "1.0")
    }

    #[tokio::test]
    async fn test_local_hit_and_miss() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalRepository::new(dir.path());
        assert!(matches!(
            local.fetch(&coordinate()).await,
            Err(FetchError::NotFound(_))
        ));

        let src = dir.path().join("x.esa");
        std::fs::write(&src, b"esa").unwrap();
        let stored = local.publish(&coordinate(), &src).unwrap();
        assert!(stored.ends_with("com/example/x/1.0/x-1.0.esa"));
        assert_eq!(local.fetch(&coordinate()).await.unwrap(), stored);
    }

    #[tokio::test]
    async fn test_remote_download_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let artifact = server
            .mock("GET", "/com/example/x/1.0/x-1.0.esa")
            .with_body("esa-bytes")
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::from_urls(dir.path(), &[server.url()], false, &quiet());

        let first = repo.fetch(&coordinate()).await.unwrap();
        let second = repo.fetch(&coordinate()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read_to_string(first).unwrap(), "esa-bytes");
        artifact.assert_async().await;
    }

    #[tokio::test]
    async fn test_remote_miss_falls_through() {
        let mut empty = mockito::Server::new_async().await;
        let _miss = empty
            .mock("GET", "/com/example/x/1.0/x-1.0.esa")
            .with_status(404)
            .create_async()
            .await;
        let mut full = mockito::Server::new_async().await;
        let _hit = full
            .mock("GET", "/com/example/x/1.0/x-1.0.esa")
            .with_body("esa-bytes")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let reporter = Arc::new(MemoryReporter::default());
        let repo = Repository::from_urls(
            dir.path(),
            &[empty.url(), full.url()],
            false,
            &(reporter.clone() as Arc<dyn Reporter>),
        );
        assert!(repo.fetch(&coordinate()).await.is_ok());
        assert!(reporter.contains("debug", &format!("not found at {}", empty.url())));
    }

    #[tokio::test]
    async fn test_offline_never_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::from_urls(dir.path(), &["http://127.0.0.1:9".to_string()], true, &quiet());
        assert!(matches!(
            repo.fetch(&coordinate()).await,
            Err(FetchError::Offline(_))
        ));
    }

    #[tokio::test]
    async fn test_chain_prefers_first_hit() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let src = second.path().join("x.esa");
        std::fs::write(&src, b"esa").unwrap();
        let stored = LocalRepository::new(second.path())
            .publish(&coordinate(), &src)
            .unwrap();

        let chain = FetcherChain::new(vec![
            Arc::new(LocalRepository::new(first.path())) as Arc<dyn ArtifactFetcher>,
            Arc::new(LocalRepository::new(second.path())),
        ]);
        assert_eq!(chain.fetch(&coordinate()).await.unwrap(), stored);

        let missing = Coordinate::new("com.example", "y", "esa", "1.0");
        assert!(chain.fetch(&missing).await.unwrap_err().is_missing());
    }
}
