use log::LevelFilter;
use serde::Deserialize;

use crate::error::AgentError;

pub const CACHE_NAME: &str = "eroerodub-v1";
pub const OFFLINE_PAGE_URL: &str = "/index.html";
pub const OFFLINE_IMAGE_URL: &str = "/img/offline.png";
pub const SYNC_FAVORITES_TAG: &str = "sync-favorites";
pub const NETWORK_ERROR_BODY: &str = "Network error happened";

const PRECACHE_URLS: [&str; 9] = [
    "/",
    "/index.html",
    "/css/styles.css",
    "/js/app.js",
    "/img/logo.png",
    "/img/avatar.png",
    "/img/offline.png",
    "https://fonts.googleapis.com/css2?family=Poppins:wght@300;400;500;600&display=swap",
    "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.0.0-beta3/css/all.min.css",
];

// Requests whose URL contains one of these are never written to the cache.
const EXTENSION_URL_MARKERS: [&str; 2] = ["chrome-extension://", "moz-extension://"];

/// Ordered list of URLs stored into the cache at install time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AssetManifest(Vec<String>);

impl AssetManifest {
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(urls.into_iter().map(Into::into).collect())
    }

    pub fn urls(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.0.iter().any(|entry| entry == url)
    }
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self::new(PRECACHE_URLS)
    }
}

/// Everything the agent needs to know up front. Built once and handed to
/// [`crate::OfflineCacheAgent::new`]; the agent never mutates it.
///
/// Deserializes from a plain JS object with camelCase keys. Missing keys
/// fall back to the defaults above.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentConfig {
    /// Version tag of the live cache. Changing it invalidates every older
    /// cache on the next activation.
    pub cache_name: String,
    pub assets: AssetManifest,
    pub offline_page: String,
    pub offline_image: String,
    pub sync_tag: String,
    pub uncacheable_url_markers: Vec<String>,
    pub log_level: LevelFilter,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            cache_name: CACHE_NAME.to_string(),
            assets: AssetManifest::default(),
            offline_page: OFFLINE_PAGE_URL.to_string(),
            offline_image: OFFLINE_IMAGE_URL.to_string(),
            sync_tag: SYNC_FAVORITES_TAG.to_string(),
            uncacheable_url_markers: EXTENSION_URL_MARKERS.iter().map(|m| m.to_string()).collect(),
            log_level: LevelFilter::Info,
        }
    }
}

impl AgentConfig {
    pub fn with_cache_name(mut self, cache_name: impl Into<String>) -> Self {
        self.cache_name = cache_name.into();
        self
    }

    pub fn with_assets(mut self, assets: AssetManifest) -> Self {
        self.assets = assets;
        self
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        if self.cache_name.trim().is_empty() {
            return Err(AgentError::Config("cacheName must not be empty".to_string()));
        }
        if self.assets.is_empty() {
            return Err(AgentError::Config("assets must list at least one url".to_string()));
        }
        if let Some(index) = self.assets.urls().iter().position(|url| url.trim().is_empty()) {
            return Err(AgentError::Config(format!("assets[{}] is blank", index)));
        }
        Ok(())
    }

    /// Offline fallback targets that install will not put into the cache.
    /// Those fallbacks only work if something else caches them.
    pub fn missing_fallbacks(&self) -> Vec<&str> {
        [self.offline_page.as_str(), self.offline_image.as_str()]
            .into_iter()
            .filter(|url| !self.assets.contains(url))
            .collect()
    }

    pub fn is_uncacheable_url(&self, url: &str) -> bool {
        self.uncacheable_url_markers
            .iter()
            .any(|marker| url.contains(marker.as_str()))
    }
}
