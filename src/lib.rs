//! # asset-dl
//!
//! Concurrent download library for game-content catalogs.
//!
//! asset-dl fetches a filtered item catalog from an upstream API, downloads
//! one icon image per item through a bounded worker pool, and records every
//! outcome (success, failure, skip) in an append-only JSON result log.
//!
//! ## Design Philosophy
//!
//! - **Configurable** - retries, timeouts, concurrency, and collision
//!   handling are all knobs on [`FetchConfig`]
//! - **Sensible defaults** - a base URL is the only required setting
//! - **Library-first** - no CLI or UI, purely a Rust crate for embedding
//! - **Fault-contained** - one bad item never disturbs the rest of a run
//!
//! ## Quick Start
//!
//! ```no_run
//! use asset_dl::{FetchConfig, ItemFetcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FetchConfig {
//!         base_url: "https://maplestory.io/api/CMS/202/item/".to_string(),
//!         cash_filter: Some(true),
//!         ..Default::default()
//!     };
//!
//!     let fetcher = ItemFetcher::new(config)?;
//!     let summary = fetcher.run().await;
//!     println!(
//!         "{} downloaded, {} failed, results in {}",
//!         summary.succeeded,
//!         summary.failed,
//!         summary.results_path.display()
//!     );
//!
//!     Ok(())
//! }
//! ```
//!
//! A configuration can also be derived from a pasted browser URL:
//!
//! ```no_run
//! use asset_dl::{FetchConfig, url_config::parse_catalog_url};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let delta = parse_catalog_url(
//!     "https://maplestory.wiki/CMS/202/item?overallCategory=Equip&category=Armor&subCategory=Hat&cash=true",
//! )?;
//! let config = FetchConfig {
//!     base_url: "https://maplestory.io/api/CMS/202/item/".to_string(),
//!     ..Default::default()
//! }
//! .with_delta(delta);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Fetch orchestration (catalog listing, worker fan-out, result collection)
pub mod fetcher;
/// Retrying HTTP client
pub mod http;
/// Filename collision resolution
pub mod resolve;
/// Append-only JSON result log
pub mod results;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types (catalog entries and result records)
pub mod types;
/// URL-to-configuration parsing
pub mod url_config;
/// Per-item download pipeline
mod worker;

// Re-export commonly used types
pub use config::{BackoffConfig, FetchConfig, FileCollisionAction, RequestConfig};
pub use error::{Error, Result};
pub use fetcher::{ItemFetcher, RunSummary};
pub use http::{HttpClient, HttpResponse};
pub use resolve::{Resolution, resolve_collision};
pub use results::{ResultLog, timestamped_results_path};
pub use types::{CatalogItem, ItemResult, ItemStatus};
pub use url_config::{CatalogKind, ConfigDelta, detect_catalog_kind, parse_catalog_url};
