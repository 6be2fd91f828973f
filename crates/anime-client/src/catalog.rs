//! Backend-agnostic catalog operations.
//!
//! Pages compose these calls; each backend implements them from the shared
//! [`CachedClient`] plus its own URL templates and normalization.

use crate::aniwatch::AniwatchCatalog;
use crate::api::{CachedClient, FetchError};
use crate::jikan::JikanCatalog;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use shared::{
    AnimeDetail, AnimeSummary, Backend, Character, Config, Episode, EpisodeServer, HomeFeed, Page,
    SearchQuery, StreamCategory, StreamSources,
};
use std::sync::Arc;
use url::Url;

/// Number of entries listing pages show
pub const PAGE_SIZE: usize = 25;

/// Errors from catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The upstream answered 2xx but flagged the request as failed.
    #[error("upstream reported failure for {url}")]
    Upstream { url: String },

    #[error("{operation} is not supported by the {backend} backend")]
    Unsupported {
        backend: Backend,
        operation: &'static str,
    },

    #[error("no {what} available")]
    Empty { what: &'static str },
}

impl CatalogError {
    /// HTTP status behind the failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            CatalogError::Fetch(e) => e.status(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Catalog of anime served by one upstream
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Which upstream this catalog talks to
    fn backend(&self) -> Backend;

    /// Landing page sections
    async fn home(&self) -> Result<HomeFeed>;

    /// Top ranked anime, optionally restricted to a type
    async fn top_anime(&self, kind: Option<&str>, page: u32) -> Result<Page<AnimeSummary>>;

    /// Currently airing anime
    async fn top_airing(&self, page: u32) -> Result<Page<AnimeSummary>>;

    async fn popular(&self, page: u32) -> Result<Page<AnimeSummary>>;

    async fn movies(&self, page: u32) -> Result<Page<AnimeSummary>>;

    async fn series(&self, page: u32) -> Result<Page<AnimeSummary>>;

    async fn search(&self, query: &SearchQuery) -> Result<Page<AnimeSummary>>;

    async fn anime(&self, id: &str) -> Result<AnimeDetail>;

    async fn characters(&self, id: &str) -> Result<Vec<Character>>;

    async fn recommendations(&self, id: &str) -> Result<Vec<AnimeSummary>>;

    /// One anime picked at random, for the hero banner
    async fn random(&self) -> Result<AnimeSummary>;

    async fn episodes(&self, id: &str) -> Result<Vec<Episode>>;

    async fn episode_servers(&self, _episode_id: &str) -> Result<Vec<EpisodeServer>> {
        Err(CatalogError::Unsupported {
            backend: self.backend(),
            operation: "episode servers",
        })
    }

    async fn episode_sources(
        &self,
        _episode_id: &str,
        _server: &str,
        _category: StreamCategory,
    ) -> Result<StreamSources> {
        Err(CatalogError::Unsupported {
            backend: self.backend(),
            operation: "episode sources",
        })
    }
}

/// Build the catalog for the configured backend over a shared client
pub fn from_config(config: &Config, client: Arc<CachedClient>) -> Result<Box<dyn CatalogSource>> {
    let base_url = config.base_url();
    Ok(match config.upstream.backend {
        Backend::Jikan => Box::new(JikanCatalog::new(client, base_url)?),
        Backend::Aniwatch => Box::new(AniwatchCatalog::new(client, base_url)?),
    })
}

/// Append path segments and query parameters to a base URL
///
/// The base may carry a path prefix (`.../v4`); segments are percent-encoded
/// so identifiers cannot escape their position in the path.
pub(crate) fn build_url(base: &Url, segments: &[&str], params: &[(&str, String)]) -> Result<String> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(segments);
    if !params.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(key, value)| (*key, value.as_str())));
    }
    Ok(url.to_string())
}

/// Parse and validate a backend base URL
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url> {
    Ok(Url::parse(base_url)?)
}

/// Take the first [`PAGE_SIZE`] entries of a pre-fetched list as a page
pub(crate) fn first_page(items: &[AnimeSummary], page: u32) -> Page<AnimeSummary> {
    Page::single(items.iter().take(PAGE_SIZE).cloned().collect(), page)
}

/// Pick one entry uniformly at random
pub(crate) fn pick_random(items: &[AnimeSummary], what: &'static str) -> Result<AnimeSummary> {
    items
        .choose(&mut rand::thread_rng())
        .cloned()
        .ok_or(CatalogError::Empty { what })
}

/// Minutes in a runtime such as "24 min per ep", "1 hr 47 min" or "24m"
pub(crate) fn duration_minutes(text: &str) -> Option<u32> {
    let mut total: u32 = 0;
    let mut found = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        let Some(mut value) = c.to_digit(10) else {
            continue;
        };
        while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
            value = value.saturating_mul(10).saturating_add(digit);
            chars.next();
        }
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.peek() {
            Some('h' | 'H') => {
                total = total.saturating_add(value.saturating_mul(60));
                found = true;
            }
            Some('m' | 'M') => {
                total = total.saturating_add(value);
                found = true;
            }
            _ => {}
        }
    }

    found.then_some(total)
}
