//! Per-item download pipeline
//!
//! One invocation of [`process_item`] takes a catalog entry through
//! filter check → icon fetch → filename resolution → byte write, and
//! produces at most one [`ItemResult`]. An item filtered out by the cash
//! filter contributes nothing at all, unlike a duplicate-filename skip,
//! which does produce a record.

use crate::config::FetchConfig;
use crate::http::HttpClient;
use crate::resolve::{Resolution, resolve_collision};
use crate::types::{CatalogItem, ItemResult};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Extension written for every icon; the upstream endpoint serves PNG
const ICON_EXT: &str = ".png";

/// Shared state handed to every worker invocation
#[derive(Clone)]
pub(crate) struct WorkerContext {
    /// Immutable run configuration
    pub(crate) config: Arc<FetchConfig>,
    /// Shared HTTP client (connection pool reused across workers)
    pub(crate) client: HttpClient,
    /// Serializes filename resolution + file creation across workers, so two
    /// items with the same base name cannot observe the same free index
    pub(crate) resolve_lock: Arc<Mutex<()>>,
}

/// Whether the cash filter lets this item through
fn should_process(item: &CatalogItem, cash_filter: Option<bool>) -> bool {
    match cash_filter {
        None => true,
        Some(wanted) => item.is_cash == wanted,
    }
}

/// Process one catalog item, returning its result record
///
/// Returns `None` only when the item is filtered out; every other terminal
/// state (success, fetch failure, write failure, duplicate skip) yields a
/// record. Nothing here returns an error or panics on the item's behalf;
/// failures are folded into the record so one bad item never disturbs the
/// rest of the run.
pub(crate) async fn process_item(
    ctx: &WorkerContext,
    item: &CatalogItem,
    index: usize,
    total: usize,
) -> Option<ItemResult> {
    if !should_process(item, ctx.config.cash_filter) {
        tracing::info!(
            id = item.id,
            name = %item.name,
            is_cash = item.is_cash,
            "Skipping {index}/{total}: filtered out"
        );
        return None;
    }

    tracing::info!(
        id = item.id,
        name = %item.name,
        is_cash = item.is_cash,
        "Processing {index}/{total}"
    );

    let icon_url = format!("{}{}/icon?resize=4", ctx.config.base_url, item.id);
    let response = match ctx.client.get(&icon_url).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(id = item.id, name = %item.name, error = %e, "Failed to fetch icon");
            return Some(ItemResult::failed(item, "Network error during fetch"));
        }
    };

    // Resolution and file creation form one critical section: the probe
    // result is only valid while no other worker can claim the same name.
    let _guard = ctx.resolve_lock.lock().await;

    let resolution = resolve_collision(
        &ctx.config.images_dir,
        &item.name,
        ICON_EXT,
        ctx.config.file_collision,
        &ctx.config.rename_pattern,
    );

    let path = match resolution {
        Resolution::Skip => {
            tracing::info!(id = item.id, name = %item.name, "Skipping existing file");
            return Some(ItemResult::skipped(item, "File already exists"));
        }
        Resolution::Conflict => {
            tracing::error!(id = item.id, name = %item.name, "No free filename for item");
            return Some(ItemResult::failed(item, "Could not find a free filename"));
        }
        Resolution::Resolved(path) => path,
    };

    match tokio::fs::write(&path, response.body()).await {
        Ok(()) => {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("{}{ICON_EXT}", item.name));
            if filename != format!("{}{ICON_EXT}", item.name) {
                tracing::info!(id = item.id, filename = %filename, "Renamed and saved icon");
            } else {
                tracing::info!(id = item.id, filename = %filename, "Saved icon");
            }
            Some(ItemResult::success(item, filename, icon_url))
        }
        Err(e) => {
            tracing::error!(id = item.id, name = %item.name, error = %e, "Error saving image");
            Some(ItemResult::failed(item, format!("Image save error: {e}")))
        }
    }
}
