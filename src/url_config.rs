//! Deriving query configuration from a pasted browser URL
//!
//! The catalog website encodes the same filters in its URLs that the API
//! accepts, under different parameter names. [`parse_catalog_url`] turns
//! such a URL into a [`ConfigDelta`], a pure value that
//! [`FetchConfig::with_delta`] folds into a fresh configuration. Nothing in
//! here mutates shared state.

use crate::config::FetchConfig;
use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use url::Url;

/// Website query parameter names and the API filter names they map to
const PARAM_MAPPINGS: &[(&str, &str)] = &[
    ("overallCategory", "overallCategoryFilter"),
    ("category", "categoryFilter"),
    ("subCategory", "subCategoryFilter"),
];

/// URL path patterns identifying each catalog kind
const KIND_PATTERNS: &[(&str, CatalogKind)] = &[
    (r"maplestory\.wiki/CMS/\d+/item", CatalogKind::Item),
    (r"maplestory\.wiki/CMS/\d+/npc", CatalogKind::Npc),
    (r"maplestory\.wiki/CMS/\d+/map", CatalogKind::Map),
];

/// Which catalog a pasted URL refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatalogKind {
    /// Equipment / item catalog
    Item,
    /// NPC catalog
    Npc,
    /// Map catalog
    Map,
}

/// Configuration fragment parsed out of a browser URL
///
/// Applied to an existing [`FetchConfig`] via [`FetchConfig::with_delta`];
/// an absent `cash_filter` leaves the existing filter untouched, matching
/// the tri-state semantics of the `cash` URL parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigDelta {
    /// API filter parameters derived from the URL query
    pub query_params: HashMap<String, String>,
    /// `Some` only when the URL carried an explicit `cash` parameter
    pub cash_filter: Option<bool>,
}

/// Identify the catalog kind a URL points at
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] when no known pattern matches.
pub fn detect_catalog_kind(url: &str) -> Result<CatalogKind> {
    for (pattern, kind) in KIND_PATTERNS {
        // Patterns are fixed literals; a failed compile simply never matches
        if Regex::new(pattern).is_ok_and(|re| re.is_match(url)) {
            return Ok(*kind);
        }
    }
    Err(Error::InvalidUrl {
        url: url.to_string(),
        reason: "URL does not match any known catalog".to_string(),
    })
}

/// Parse a pasted catalog URL into a [`ConfigDelta`]
///
/// All three filter parameters (`overallCategory`, `category`,
/// `subCategory`) must be present. The optional `cash` parameter parses as
/// true for `1` or `true` (case-insensitive), false for any other value,
/// and stays unset when absent.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] when the URL cannot be parsed or required
/// parameters are missing (the message names them).
///
/// # Examples
///
/// ```
/// use asset_dl::url_config::parse_catalog_url;
///
/// let delta = parse_catalog_url(
///     "https://maplestory.wiki/CMS/202/item?overallCategory=Equip&category=Armor&subCategory=Hat&cash=true",
/// ).unwrap();
/// assert_eq!(delta.query_params["subCategoryFilter"], "Hat");
/// assert_eq!(delta.cash_filter, Some(true));
/// ```
pub fn parse_catalog_url(url: &str) -> Result<ConfigDelta> {
    let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let mut web_params: HashMap<String, String> = HashMap::new();
    for (key, value) in parsed.query_pairs() {
        web_params.insert(key.into_owned(), value.into_owned());
    }

    let cash_filter = web_params.remove("cash").map(|value| {
        let value = value.to_lowercase();
        value == "1" || value == "true"
    });

    let mut query_params = HashMap::new();
    for (web_param, api_param) in PARAM_MAPPINGS {
        if let Some(value) = web_params.remove(*web_param) {
            query_params.insert((*api_param).to_string(), value);
        }
    }

    let missing: Vec<&str> = PARAM_MAPPINGS
        .iter()
        .filter(|(_, api_param)| !query_params.contains_key(*api_param))
        .map(|(_, api_param)| *api_param)
        .collect();
    if !missing.is_empty() {
        return Err(Error::InvalidUrl {
            url: url.to_string(),
            reason: format!("missing required parameters: {}", missing.join(", ")),
        });
    }

    Ok(ConfigDelta {
        query_params,
        cash_filter,
    })
}

impl FetchConfig {
    /// Produce a new configuration with the delta's filters applied
    ///
    /// Query parameters are replaced wholesale; the cash filter is only
    /// overwritten when the URL carried one.
    #[must_use]
    pub fn with_delta(mut self, delta: ConfigDelta) -> FetchConfig {
        self.query_params = delta.query_params;
        if delta.cash_filter.is_some() {
            self.cash_filter = delta.cash_filter;
        }
        self
    }
}
