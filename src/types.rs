//! Core types for asset-dl

use serde::{Deserialize, Serialize};

/// One entry from the upstream item catalog
///
/// The catalog listing endpoint returns a JSON array of these. Only the
/// fields the pipeline needs are deserialized; unknown fields are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Upstream item identifier, used to build the icon URL
    pub id: i64,
    /// Display name; also the base filename for the icon
    pub name: String,
    /// Whether this is a premium-shop ("cash") item. Some catalog entries
    /// omit the field; it defaults to `false` like the upstream API does.
    #[serde(default, rename = "isCash")]
    pub is_cash: bool,
}

/// Terminal outcome of processing one catalog item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Icon downloaded and written to disk
    Success,
    /// Fetch or write failed; `reason` explains which
    Failed,
    /// Existing file kept under the skip collision strategy
    Skipped,
}

/// One record in the result log
///
/// Created exactly once per item that passes the cash filter, appended to
/// the [`crate::results::ResultLog`], and never mutated afterwards. Use the
/// constructors so every status carries the fields that belong to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    /// Upstream item identifier
    pub id: i64,
    /// Item display name
    pub name: String,
    /// Premium-shop flag copied from the catalog entry
    #[serde(rename = "isCash")]
    pub is_cash: bool,
    /// Terminal status for this item
    pub status: ItemStatus,
    /// Resolved output filename (success only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Icon URL the bytes were fetched from (success only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Human-readable explanation (failed and skipped records)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ItemResult {
    /// Record for a successfully downloaded and written icon
    pub fn success(item: &CatalogItem, filename: String, image_url: String) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            is_cash: item.is_cash,
            status: ItemStatus::Success,
            filename: Some(filename),
            image_url: Some(image_url),
            reason: None,
        }
    }

    /// Record for an item whose processing failed
    pub fn failed(item: &CatalogItem, reason: impl Into<String>) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            is_cash: item.is_cash,
            status: ItemStatus::Failed,
            filename: None,
            image_url: None,
            reason: Some(reason.into()),
        }
    }

    /// Record for an item skipped because its file already exists
    pub fn skipped(item: &CatalogItem, reason: impl Into<String>) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            is_cash: item.is_cash,
            status: ItemStatus::Skipped,
            filename: None,
            image_url: None,
            reason: Some(reason.into()),
        }
    }
}
