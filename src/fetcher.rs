//! Fetch orchestration: catalog listing, worker fan-out, result collection
//!
//! [`ItemFetcher::run`] drives one complete fetch run. The catalog is listed
//! once; every entry is handed to the per-item worker pipeline, with
//! in-flight downloads bounded by a semaphore sized to `max_workers`.
//! Results are drained greedily as workers finish and
//! appended to the [`ResultLog`] through this single path: workers produce
//! records, the orchestrator persists them.
//!
//! `run` never propagates a failure to the caller: per-item faults are
//! folded into their records, and run-fatal conditions (output directory
//! cannot be created, catalog fetch failed) are logged and reflected in the
//! returned [`RunSummary`], preserving whatever was already persisted.

use crate::config::FetchConfig;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::results::ResultLog;
use crate::types::{CatalogItem, ItemResult, ItemStatus};
use crate::worker::{WorkerContext, process_item};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

/// Outcome of one fetch run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of entries the catalog returned
    pub total_items: usize,
    /// Items downloaded and written
    pub succeeded: usize,
    /// Items with a failed record (network, write error, internal fault)
    pub failed: usize,
    /// Items skipped because their file already existed
    pub skipped: usize,
    /// Items excluded by the cash filter (no record written)
    pub filtered: usize,
    /// Where the result log lives
    pub results_path: PathBuf,
    /// Set when the run ended before any item was dispatched
    pub aborted: Option<String>,
}

impl RunSummary {
    fn new(results_path: PathBuf) -> Self {
        Self {
            total_items: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            filtered: 0,
            results_path,
            aborted: None,
        }
    }
}

/// Orchestrator for one catalog fetch run
///
/// Holds the validated configuration, the shared HTTP client, and the
/// result log. Construct once per run; [`run`](ItemFetcher::run) may be
/// called again to re-fetch with the same configuration (the log is
/// truncated at each run start).
pub struct ItemFetcher {
    config: Arc<FetchConfig>,
    client: HttpClient,
    log: Arc<ResultLog>,
}

impl ItemFetcher {
    /// Create an orchestrator from a validated configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the configuration is invalid and
    /// [`Error::Network`] when the HTTP client cannot be constructed.
    pub fn new(config: FetchConfig) -> Result<Self> {
        config.validate()?;
        let client = HttpClient::new(config.request.clone())?;
        let log = Arc::new(ResultLog::new(config.results_path.clone()));
        Ok(Self {
            config: Arc::new(config),
            client,
            log,
        })
    }

    /// The result log this run writes to
    pub fn log(&self) -> &ResultLog {
        &self.log
    }

    /// Execute one complete fetch run
    ///
    /// Never returns an error and never panics; consult the summary (and
    /// the result log it points at) for what happened.
    pub async fn run(&self) -> RunSummary {
        let mut summary = RunSummary::new(self.config.results_path.clone());

        if let Err(e) = self.prepare_directories().await {
            tracing::error!(error = %e, "Cannot create output directories, aborting run");
            summary.aborted = Some(format!("setup failed: {e}"));
            return summary;
        }

        if let Err(e) = self.log.init().await {
            tracing::error!(error = %e, "Cannot initialize result log, aborting run");
            summary.aborted = Some(format!("result log init failed: {e}"));
            return summary;
        }
        tracing::info!(path = %self.log.path().display(), "Results will be saved");

        let items = match self.fetch_catalog().await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch item catalog");
                summary.aborted = Some(format!("catalog fetch failed: {e}"));
                return summary;
            }
        };

        summary.total_items = items.len();
        tracing::info!(total = items.len(), "Found items to process");
        if let Some(cash) = self.config.cash_filter {
            tracing::info!(is_cash = cash, "Filtering items by cash flag");
        }

        self.dispatch(items, &mut summary).await;

        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            filtered = summary.filtered,
            results = %self.log.path().display(),
            "All tasks completed"
        );
        summary
    }

    /// Fan items out to workers and drain results as they complete
    async fn dispatch(&self, items: Vec<CatalogItem>, summary: &mut RunSummary) {
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers));
        let ctx = WorkerContext {
            config: Arc::clone(&self.config),
            client: self.client.clone(),
            resolve_lock: Arc::new(Mutex::new(())),
        };

        let total = items.len();
        let mut join_set: JoinSet<Option<ItemResult>> = JoinSet::new();

        for (i, item) in items.into_iter().enumerate() {
            let ctx = ctx.clone();
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                // The semaphore is never closed during a run; if it somehow
                // is, the worker proceeds rather than dropping the item.
                let _permit = semaphore.acquire_owned().await.ok();

                match AssertUnwindSafe(process_item(&ctx, &item, i + 1, total))
                    .catch_unwind()
                    .await
                {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::error!(
                            id = item.id,
                            name = %item.name,
                            "Unexpected panic while processing item"
                        );
                        Some(ItemResult::failed(&item, "Unexpected error while processing item"))
                    }
                }
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Some(result)) => {
                    match result.status {
                        ItemStatus::Success => summary.succeeded += 1,
                        ItemStatus::Failed => summary.failed += 1,
                        ItemStatus::Skipped => summary.skipped += 1,
                    }
                    if let Err(e) = self.log.append(&result).await {
                        tracing::error!(
                            error = %e,
                            id = result.id,
                            "Failed to persist result record"
                        );
                    }
                }
                Ok(None) => summary.filtered += 1,
                Err(e) => {
                    // Panics are converted inside the task; a JoinError here
                    // means the task was aborted externally.
                    tracing::error!(error = %e, "Worker task failed to complete");
                }
            }
        }
    }

    /// Fetch and deserialize the item catalog
    async fn fetch_catalog(&self) -> Result<Vec<CatalogItem>> {
        tracing::info!(url = %self.config.base_url, "Fetching items");
        let response = self
            .client
            .get_with_query(&self.config.base_url, &self.config.query_params)
            .await?;
        if !response.is_success() {
            return Err(Error::UpstreamStatus {
                url: self.config.base_url.clone(),
                status: response.status().as_u16(),
            });
        }
        response.json()
    }

    /// Create the images directory and the result log's parent directory
    async fn prepare_directories(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.config.images_dir).await?;
        if let Some(parent) = self.config.results_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackoffConfig, FileCollisionAction, RequestConfig};
    use std::time::{Duration, Instant};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_request_config() -> RequestConfig {
        RequestConfig {
            max_retries: 2,
            retry_delay: Duration::from_millis(5),
            timeout: Duration::from_secs(5),
            backoff: BackoffConfig {
                max_attempts: 2,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(10),
                multiplier: 2.0,
                jitter: false,
            },
        }
    }

    fn config_for(server_uri: &str, temp_dir: &TempDir) -> FetchConfig {
        FetchConfig {
            base_url: format!("{server_uri}/api/item/"),
            images_dir: temp_dir.path().join("images"),
            results_path: temp_dir.path().join("results.json"),
            request: fast_request_config(),
            ..FetchConfig::default()
        }
    }

    async fn mount_catalog(server: &MockServer, body: &str) {
        Mock::given(method("GET"))
            .and(path("/api/item/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
            .mount(server)
            .await;
    }

    async fn mount_icon(server: &MockServer, id: i64, bytes: &[u8]) {
        Mock::given(method("GET"))
            .and(path(format!("/api/item/{id}/icon")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes.to_vec()))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn full_run_downloads_all_items() {
        let server = MockServer::start().await;
        mount_catalog(
            &server,
            r#"[{"id":1,"name":"RedHat","isCash":false},{"id":2,"name":"BlueHat","isCash":true}]"#,
        )
        .await;
        mount_icon(&server, 1, b"red").await;
        mount_icon(&server, 2, b"blue").await;

        let temp_dir = TempDir::new().unwrap();
        let fetcher = ItemFetcher::new(config_for(&server.uri(), &temp_dir)).unwrap();
        let summary = fetcher.run().await;

        assert_eq!(summary.total_items, 2);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);
        assert!(summary.aborted.is_none());

        let records = fetcher.log().read_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.status == ItemStatus::Success));
        assert_eq!(
            std::fs::read(temp_dir.path().join("images").join("RedHat.png")).unwrap(),
            b"red"
        );
        assert_eq!(
            std::fs::read(temp_dir.path().join("images").join("BlueHat.png")).unwrap(),
            b"blue"
        );
    }

    #[tokio::test]
    async fn catalog_query_params_are_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/item/"))
            .and(query_param("subCategoryFilter", "Hat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let mut config = config_for(&server.uri(), &temp_dir);
        config
            .query_params
            .insert("subCategoryFilter".to_string(), "Hat".to_string());

        let summary = ItemFetcher::new(config).unwrap().run().await;
        assert_eq!(summary.total_items, 0);
        assert!(summary.aborted.is_none());
    }

    #[tokio::test]
    async fn catalog_transport_failure_leaves_empty_log() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_for("http://127.0.0.1:9", &temp_dir);
        config.request.max_retries = 2;
        config.request.retry_delay = Duration::from_millis(1);

        let fetcher = ItemFetcher::new(config).unwrap();
        let summary = fetcher.run().await;

        assert!(summary.aborted.as_deref().unwrap().contains("catalog fetch failed"));
        assert_eq!(summary.total_items, 0);
        // The log was initialized and then never touched
        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join("results.json")).unwrap(),
            "[]"
        );
    }

    #[tokio::test]
    async fn catalog_error_status_aborts_run() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/item/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let fetcher = ItemFetcher::new(config_for(&server.uri(), &temp_dir)).unwrap();
        let summary = fetcher.run().await;

        assert!(summary.aborted.as_deref().unwrap().contains("404"));
        assert!(fetcher.log().read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_names_get_distinct_filenames_under_rename() {
        let server = MockServer::start().await;
        mount_catalog(
            &server,
            r#"[{"id":1,"name":"RedHat","isCash":true},{"id":2,"name":"RedHat","isCash":false}]"#,
        )
        .await;
        mount_icon(&server, 1, b"cash-red").await;
        mount_icon(&server, 2, b"plain-red").await;

        let temp_dir = TempDir::new().unwrap();
        let config = config_for(&server.uri(), &temp_dir);
        assert_eq!(config.file_collision, FileCollisionAction::Rename);
        let fetcher = ItemFetcher::new(config).unwrap();
        let summary = fetcher.run().await;

        assert_eq!(summary.succeeded, 2);

        let records = fetcher.log().read_all().await.unwrap();
        let mut filenames: Vec<String> = records
            .iter()
            .map(|r| r.filename.clone().unwrap())
            .collect();
        filenames.sort();
        // Which item wins the base name depends on completion order, but
        // both names must appear and be distinct
        assert_eq!(filenames, vec!["RedHat.png", "RedHat_1.png"]);
        assert!(temp_dir.path().join("images").join("RedHat.png").exists());
        assert!(temp_dir.path().join("images").join("RedHat_1.png").exists());
    }

    #[tokio::test]
    async fn one_failing_item_does_not_stop_the_others() {
        let server = MockServer::start().await;
        // "Nested/Hat" resolves to a path inside a directory that does not
        // exist, so its write fails while the other item succeeds
        mount_catalog(
            &server,
            r#"[{"id":1,"name":"GoodHat","isCash":false},{"id":2,"name":"Nested/Hat","isCash":false}]"#,
        )
        .await;
        mount_icon(&server, 1, b"good").await;
        mount_icon(&server, 2, b"bad").await;

        let temp_dir = TempDir::new().unwrap();
        let fetcher = ItemFetcher::new(config_for(&server.uri(), &temp_dir)).unwrap();
        let summary = fetcher.run().await;

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);

        let records = fetcher.log().read_all().await.unwrap();
        assert_eq!(records.len(), 2);
        let failed = records.iter().find(|r| r.status == ItemStatus::Failed).unwrap();
        assert_eq!(failed.id, 2);
        assert!(failed.reason.as_deref().unwrap().contains("Image save error"));
    }

    #[tokio::test]
    async fn cash_filter_excludes_items_without_records() {
        let server = MockServer::start().await;
        mount_catalog(
            &server,
            r#"[{"id":1,"name":"CashHat","isCash":true},{"id":2,"name":"PlainHat","isCash":false}]"#,
        )
        .await;
        mount_icon(&server, 1, b"cash").await;
        mount_icon(&server, 2, b"plain").await;

        let temp_dir = TempDir::new().unwrap();
        let mut config = config_for(&server.uri(), &temp_dir);
        config.cash_filter = Some(true);

        let fetcher = ItemFetcher::new(config).unwrap();
        let summary = fetcher.run().await;

        assert_eq!(summary.total_items, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.filtered, 1);

        // The filtered item left no trace: no record, no file
        let records = fetcher.log().read_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "CashHat");
        assert!(!temp_dir.path().join("images").join("PlainHat.png").exists());
    }

    #[tokio::test]
    async fn worker_pool_bounds_concurrent_downloads() {
        let server = MockServer::start().await;
        mount_catalog(
            &server,
            r#"[{"id":1,"name":"A","isCash":false},{"id":2,"name":"B","isCash":false},
               {"id":3,"name":"C","isCash":false},{"id":4,"name":"D","isCash":false}]"#,
        )
        .await;
        for id in 1..=4 {
            Mock::given(method("GET"))
                .and(path(format!("/api/item/{id}/icon")))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_bytes(b"x".to_vec())
                        .set_delay(Duration::from_millis(150)),
                )
                .mount(&server)
                .await;
        }

        let temp_dir = TempDir::new().unwrap();
        let mut config = config_for(&server.uri(), &temp_dir);
        config.max_workers = 2;

        let fetcher = ItemFetcher::new(config).unwrap();
        let start = Instant::now();
        let summary = fetcher.run().await;
        let elapsed = start.elapsed();

        assert_eq!(summary.succeeded, 4);
        // 4 downloads of >=150ms each through 2 workers take at least 2 rounds
        assert!(
            elapsed >= Duration::from_millis(290),
            "4 items at 150ms through 2 workers finished in {elapsed:?}"
        );
    }
}
