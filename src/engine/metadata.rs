//! Best-effort part descriptions.
//!
//! A description is a convenience for humans reading the manifest; a part is
//! tracked whether or not one could be fetched. Lookups therefore return a
//! [`Lookup`] rather than a `Result`, and callers decide what `Unavailable`
//! means for them.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::config::ApiConfig;

/// Longest description kept, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 100;

/// Outcome of a description lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// A description was found.
    Found(String),
    /// No description could be obtained, for any reason.
    Unavailable,
}

impl Lookup {
    /// Converts to an optional description.
    #[must_use]
    pub fn into_option(self) -> Option<String> {
        match self {
            Self::Found(description) => Some(description),
            Self::Unavailable => None,
        }
    }
}

/// Source of human-readable part descriptions.
pub trait DescriptionSource {
    /// Looks up a description for `identifier`. Never fails.
    fn describe(&self, identifier: &str) -> Lookup;
}

impl<D: DescriptionSource + ?Sized> DescriptionSource for &D {
    fn describe(&self, identifier: &str) -> Lookup {
        (**self).describe(identifier)
    }
}

impl<D: DescriptionSource + ?Sized> DescriptionSource for Box<D> {
    fn describe(&self, identifier: &str) -> Lookup {
        (**self).describe(identifier)
    }
}

/// Description source that never answers, for offline use.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl DescriptionSource for Offline {
    fn describe(&self, _identifier: &str) -> Lookup {
        Lookup::Unavailable
    }
}

/// Client for the LCSC product detail API.
#[derive(Debug, Clone)]
pub struct LcscClient {
    agent: ureq::Agent,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    #[serde(default)]
    result: Option<ProductDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductDetail {
    #[serde(default)]
    product_intro_en: Option<String>,
}

impl LcscClient {
    /// Creates a client for `base_url` with a request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("kicad-jlc-manager/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            base_url: base_url.into(),
        }
    }

    /// Creates a client from configuration.
    #[must_use]
    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn fetch(&self, identifier: &str) -> Result<DetailResponse, Box<ureq::Error>> {
        let response = self
            .agent
            .get(&self.base_url)
            .query("productCode", identifier)
            .set("Accept", "application/json")
            .call()
            .map_err(Box::new)?;
        response
            .into_json()
            .map_err(|e| Box::new(ureq::Error::from(e)))
    }
}

impl DescriptionSource for LcscClient {
    fn describe(&self, identifier: &str) -> Lookup {
        match self.fetch(identifier) {
            Ok(response) => {
                let raw = response
                    .result
                    .and_then(|r| r.product_intro_en)
                    .unwrap_or_default();
                clean_description(&raw).map_or(Lookup::Unavailable, Lookup::Found)
            }
            Err(e) => {
                debug!(%identifier, error = %e, "Description lookup failed");
                Lookup::Unavailable
            }
        }
    }
}

/// Normalises an API description for the manifest.
///
/// Trims whitespace, drops RoHS markers and limits the length to
/// [`MAX_DESCRIPTION_LEN`] characters. Returns `None` if nothing is left.
#[must_use]
pub fn clean_description(raw: &str) -> Option<String> {
    let cleaned = raw.replace(" RoHS", "").replace(" ROHS", "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }

    if cleaned.chars().count() > MAX_DESCRIPTION_LEN {
        let mut cut: String = cleaned.chars().take(MAX_DESCRIPTION_LEN - 3).collect();
        cut.push_str("...");
        return Some(cut);
    }
    Some(cleaned.to_string())
}
