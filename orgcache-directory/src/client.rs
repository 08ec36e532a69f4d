//! Directory client seam.
//!
//! The cache treats the directory as an opaque query collaborator. Real
//! deployments implement [`SyncDirectoryClient`] over their protocol library
//! and wrap it in [`BlockingDirectory`]; tests use the in-memory directory.

use crate::filter::SearchFilter;
use crate::raw::{attrs, RawEntry};
use async_trait::async_trait;
use orgcache_core::{DirectoryError, OrgCacheResult};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Asynchronous directory query interface.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Run a search and return the matching entries, restricted to the
    /// requested attributes (all attributes when `attributes` is empty).
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Unavailable` or `DirectoryError::Timeout`
    /// when the directory cannot answer.
    async fn search(
        &self,
        filter: &SearchFilter,
        attributes: &[&str],
    ) -> OrgCacheResult<Vec<RawEntry>>;

    /// Cheap liveness probe.
    async fn ping(&self) -> OrgCacheResult<()> {
        let probe = SearchFilter::equals(attrs::DISTINGUISHED_NAME, "orgcache-health-probe");
        self.search(&probe, &[attrs::DISTINGUISHED_NAME]).await.map(|_| ())
    }
}

#[async_trait]
impl<D: DirectoryClient + ?Sized> DirectoryClient for Arc<D> {
    async fn search(
        &self,
        filter: &SearchFilter,
        attributes: &[&str],
    ) -> OrgCacheResult<Vec<RawEntry>> {
        (**self).search(filter, attributes).await
    }

    async fn ping(&self) -> OrgCacheResult<()> {
        (**self).ping().await
    }
}

/// Synchronous directory client, as most protocol libraries expose.
pub trait SyncDirectoryClient: Send + Sync + 'static {
    fn search(&self, filter: &SearchFilter, attributes: &[String]) -> OrgCacheResult<Vec<RawEntry>>;
}

/// Runs a synchronous client on the blocking pool with a per-query deadline.
///
/// A query that exceeds the deadline is reported as
/// `DirectoryError::Timeout`; the blocking call itself keeps running to
/// completion in the background and its result is discarded.
pub struct BlockingDirectory<C: SyncDirectoryClient> {
    inner: Arc<C>,
    query_timeout: Duration,
}

impl<C: SyncDirectoryClient> BlockingDirectory<C> {
    pub fn new(inner: C, query_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            query_timeout,
        }
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }
}

#[async_trait]
impl<C: SyncDirectoryClient> DirectoryClient for BlockingDirectory<C> {
    async fn search(
        &self,
        filter: &SearchFilter,
        attributes: &[&str],
    ) -> OrgCacheResult<Vec<RawEntry>> {
        let inner = Arc::clone(&self.inner);
        let filter = filter.clone();
        let attributes: Vec<String> = attributes.iter().map(|a| a.to_string()).collect();
        let started = Instant::now();

        let task = tokio::task::spawn_blocking(move || inner.search(&filter, &attributes));

        match tokio::time::timeout(self.query_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(DirectoryError::Unavailable {
                reason: format!("directory query task failed: {}", join_error),
            }
            .into()),
            Err(_) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                tracing::warn!(elapsed_ms, "directory query timed out");
                Err(DirectoryError::Timeout { elapsed_ms }.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgcache_core::OrgCacheError;

    struct SlowClient {
        delay: Duration,
        entries: Vec<RawEntry>,
    }

    impl SyncDirectoryClient for SlowClient {
        fn search(
            &self,
            filter: &SearchFilter,
            attributes: &[String],
        ) -> OrgCacheResult<Vec<RawEntry>> {
            std::thread::sleep(self.delay);
            let requested: Vec<&str> = attributes.iter().map(String::as_str).collect();
            Ok(self
                .entries
                .iter()
                .filter(|e| filter.matches(e))
                .map(|e| e.project(&requested))
                .collect())
        }
    }

    struct BrokenClient;

    impl SyncDirectoryClient for BrokenClient {
        fn search(&self, _: &SearchFilter, _: &[String]) -> OrgCacheResult<Vec<RawEntry>> {
            Err(DirectoryError::Unavailable {
                reason: "connection refused".to_string(),
            }
            .into())
        }
    }

    fn entry(dn: &str, mail: &str) -> RawEntry {
        RawEntry::new()
            .with(attrs::DISTINGUISHED_NAME, dn)
            .with(attrs::MAIL, mail)
            .with(attrs::TITLE, "Analyst")
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_blocking_directory_returns_projected_results() {
        let client = BlockingDirectory::new(
            SlowClient {
                delay: Duration::from_millis(1),
                entries: vec![entry("CN=a", "a@acme.test"), entry("CN=b", "b@acme.test")],
            },
            Duration::from_secs(5),
        );

        let filter = SearchFilter::equals(attrs::MAIL, "b@acme.test");
        let results = client
            .search(&filter, &[attrs::DISTINGUISHED_NAME])
            .await
            .expect("search should succeed");
        assert_eq!(results.len(), 1);
        assert!(results[0].contains(attrs::DISTINGUISHED_NAME));
        assert!(!results[0].contains(attrs::TITLE));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_blocking_directory_times_out() {
        let client = BlockingDirectory::new(
            SlowClient {
                delay: Duration::from_millis(300),
                entries: vec![],
            },
            Duration::from_millis(20),
        );

        let err = client
            .search(&SearchFilter::people(None), &[])
            .await
            .expect_err("should time out");
        assert!(matches!(
            err,
            OrgCacheError::Directory(DirectoryError::Timeout { .. })
        ));
        assert!(err.is_retryable());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_default_ping_propagates_failure() {
        let client = BlockingDirectory::new(BrokenClient, Duration::from_secs(1));
        assert!(client.ping().await.is_err());
    }
}
