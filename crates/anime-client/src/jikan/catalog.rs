//! Jikan-backed catalog.

use super::types::*;
use crate::api::CachedClient;
use crate::catalog::{build_url, parse_base_url, CatalogSource, Result};
use async_trait::async_trait;
use shared::{
    AnimeDetail, AnimeSummary, Backend, Character, Episode, HomeFeed, Page, SearchQuery,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Upper bound on episode pages walked for one anime (100 episodes each)
const MAX_EPISODE_PAGES: u32 = 30;

/// Entries taken from the top list for the spotlight banner
const SPOTLIGHT_SIZE: usize = 10;

/// Catalog over the Jikan API v4
pub struct JikanCatalog {
    client: Arc<CachedClient>,
    base_url: Url,
}

impl JikanCatalog {
    /// Create a new Jikan catalog
    pub fn new(client: Arc<CachedClient>, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
        })
    }

    fn url(&self, segments: &[&str], params: &[(&str, String)]) -> Result<String> {
        build_url(&self.base_url, segments, params)
    }

    async fn listing(&self, segments: &[&str], params: &[(&str, String)], page: u32) -> Result<Page<AnimeSummary>> {
        let url = self.url(segments, params)?;
        let response: PaginatedResponse<JikanAnime> = self.client.get(&url).await?;
        Ok(response.into_page(page, |anime| anime.to_summary()))
    }
}

fn page_param(page: u32) -> (&'static str, String) {
    ("page", page.to_string())
}

#[async_trait]
impl CatalogSource for JikanCatalog {
    fn backend(&self) -> Backend {
        Backend::Jikan
    }

    async fn home(&self) -> Result<HomeFeed> {
        info!("Fetching home feed");
        let (top, airing) = tokio::try_join!(self.top_anime(None, 1), self.top_airing(1))?;

        Ok(HomeFeed {
            spotlight: top.items.iter().take(SPOTLIGHT_SIZE).cloned().collect(),
            trending: top.items.clone(),
            most_popular: top.items,
            top_airing: airing.items,
            ..Default::default()
        })
    }

    async fn top_anime(&self, kind: Option<&str>, page: u32) -> Result<Page<AnimeSummary>> {
        debug!(kind = ?kind, page = page, "Fetching top anime");
        let mut params = vec![page_param(page)];
        if let Some(kind) = kind {
            params.push(("type", kind.to_string()));
        }
        self.listing(&["top", "anime"], &params, page).await
    }

    async fn top_airing(&self, page: u32) -> Result<Page<AnimeSummary>> {
        debug!(page = page, "Fetching seasonal anime");
        self.listing(&["seasons", "now"], &[page_param(page)], page).await
    }

    async fn popular(&self, page: u32) -> Result<Page<AnimeSummary>> {
        debug!(page = page, "Fetching popular anime");
        self.listing(
            &["top", "anime"],
            &[("filter", "bypopularity".to_string()), page_param(page)],
            page,
        )
        .await
    }

    async fn movies(&self, page: u32) -> Result<Page<AnimeSummary>> {
        self.top_anime(Some("movie"), page).await
    }

    async fn series(&self, page: u32) -> Result<Page<AnimeSummary>> {
        self.top_anime(Some("tv"), page).await
    }

    async fn search(&self, query: &SearchQuery) -> Result<Page<AnimeSummary>> {
        info!(query = %query.query, page = query.page, "Searching anime");
        let mut params = vec![("q", query.query.clone()), page_param(query.page)];
        if let Some(kind) = &query.kind {
            params.push(("type", kind.clone()));
        }
        self.listing(&["anime"], &params, query.page).await
    }

    async fn anime(&self, id: &str) -> Result<AnimeDetail> {
        debug!(id = %id, "Fetching anime details");
        let url = self.url(&["anime", id, "full"], &[])?;
        let response: DataResponse<JikanAnime> = self.client.get(&url).await?;
        Ok(response.data.into_detail())
    }

    async fn characters(&self, id: &str) -> Result<Vec<Character>> {
        let url = self.url(&["anime", id, "characters"], &[])?;
        let response: DataResponse<Vec<CharacterEntry>> = self.client.get(&url).await?;
        Ok(response.data.into_iter().map(Character::from).collect())
    }

    async fn recommendations(&self, id: &str) -> Result<Vec<AnimeSummary>> {
        let url = self.url(&["anime", id, "recommendations"], &[])?;
        let response: DataResponse<Vec<RecommendationEntry>> = self.client.get(&url).await?;
        Ok(response.data.into_iter().map(AnimeSummary::from).collect())
    }

    async fn random(&self) -> Result<AnimeSummary> {
        let url = self.url(&["random", "anime"], &[])?;
        let response: DataResponse<JikanAnime> = self.client.get(&url).await?;
        Ok(response.data.to_summary())
    }

    async fn episodes(&self, id: &str) -> Result<Vec<Episode>> {
        let mut episodes = Vec::new();
        let mut page = 1;

        loop {
            let url = self.url(&["anime", id, "episodes"], &[page_param(page)])?;
            let response: PaginatedResponse<JikanEpisode> = self.client.get(&url).await?;
            let has_next_page = response
                .pagination
                .as_ref()
                .is_some_and(|p| p.has_next_page);

            episodes.extend(response.data.into_iter().map(|e| e.into_episode(id)));

            if !has_next_page {
                break;
            }
            page += 1;

            if page > MAX_EPISODE_PAGES {
                warn!(id = %id, episodes = episodes.len(), "Reached page limit for episodes");
                break;
            }
        }

        debug!(id = %id, episodes = episodes.len(), "Fetched episode list");
        Ok(episodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::tests::{unthrottled, FakeTransport};
    use crate::catalog::CatalogError;
    use shared::StreamCategory;

    const BASE: &str = "https://api.jikan.moe/v4";

    fn catalog(transport: Arc<FakeTransport>) -> JikanCatalog {
        let client = Arc::new(CachedClient::new(transport, unthrottled()));
        JikanCatalog::new(client, BASE).unwrap()
    }

    fn listing_body(ids: &[u32]) -> String {
        let data: Vec<_> = ids
            .iter()
            .map(|id| serde_json::json!({ "mal_id": id, "title": format!("Anime {}", id) }))
            .collect();
        serde_json::json!({
            "data": data,
            "pagination": { "last_visible_page": 5, "has_next_page": true, "current_page": 1 }
        })
        .to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn test_top_anime_url_and_mapping() {
        let transport = FakeTransport::new();
        let url = format!("{}/top/anime?page=1&type=tv", BASE);
        transport.respond(&url, 200, listing_body(&[1, 2]));
        let catalog = catalog(transport.clone());

        let page = catalog.series(1).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[1].id, "2");
        assert_eq!(page.last_page, 5);
        assert!(page.has_next_page);
        assert_eq!(transport.calls(&url), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_home_composes_top_and_seasonal() {
        let transport = FakeTransport::new();
        transport.respond(&format!("{}/top/anime?page=1", BASE), 200, listing_body(&(1..=12).collect::<Vec<_>>()));
        transport.respond(&format!("{}/seasons/now?page=1", BASE), 200, listing_body(&[100, 101]));
        let catalog = catalog(transport.clone());

        let home = catalog.home().await.unwrap();
        assert_eq!(home.spotlight.len(), SPOTLIGHT_SIZE);
        assert_eq!(home.most_popular.len(), 12);
        assert_eq!(home.top_airing[0].id, "100");
        assert_eq!(transport.total_calls(), 2);

        // Listings built from the same URLs are served from cache
        catalog.top_airing(1).await.unwrap();
        assert_eq!(transport.total_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_encodes_query() {
        let transport = FakeTransport::new();
        let url = format!("{}/anime?q=one+piece&page=2&type=movie", BASE);
        transport.respond(&url, 200, listing_body(&[21]));
        let catalog = catalog(transport.clone());

        let page = catalog
            .search(&SearchQuery::new("one piece").page(2).kind("movie"))
            .await
            .unwrap();
        assert_eq!(page.items[0].id, "21");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_id_surfaces_404() {
        let transport = FakeTransport::new();
        let url = format!("{}/anime/0/full", BASE);
        transport.respond(&url, 404, r#"{"status":404,"type":"BadResponseException","message":"Resource does not exist"}"#);
        let catalog = catalog(transport.clone());

        let err = catalog.anime("0").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(catalog.client.cache().fetched_at(&url).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_episodes_walk_all_pages() {
        let transport = FakeTransport::new();
        transport.respond(
            &format!("{}/anime/5114/episodes?page=1", BASE),
            200,
            r#"{"data":[{"mal_id":1,"title":"Fullmetal Alchemist"},{"mal_id":2,"title":"The First Day"}],
                "pagination":{"last_visible_page":2,"has_next_page":true}}"#,
        );
        transport.respond(
            &format!("{}/anime/5114/episodes?page=2", BASE),
            200,
            r#"{"data":[{"mal_id":3,"title":"City of Heresy","filler":false}],
                "pagination":{"last_visible_page":2,"has_next_page":false}}"#,
        );
        let catalog = catalog(transport.clone());

        let episodes = catalog.episodes("5114").await.unwrap();
        assert_eq!(episodes.len(), 3);
        assert_eq!(episodes[2].number, 3);
        assert_eq!(episodes[2].id, "5114-ep-3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_random_is_cached_like_any_other_url() {
        let transport = FakeTransport::new();
        let url = format!("{}/random/anime", BASE);
        transport.respond(&url, 200, r#"{"data":{"mal_id":30,"title":"Neon Genesis Evangelion"}}"#);
        let catalog = catalog(transport.clone());

        assert_eq!(catalog.random().await.unwrap().id, "30");
        assert_eq!(catalog.random().await.unwrap().id, "30");
        assert_eq!(transport.calls(&url), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_streaming_is_unsupported() {
        let catalog = catalog(FakeTransport::new());

        let err = catalog.episode_servers("5114-ep-1").await.unwrap_err();
        assert!(matches!(err, CatalogError::Unsupported { backend: Backend::Jikan, .. }));

        let err = catalog
            .episode_sources("5114-ep-1", "hd-1", StreamCategory::Sub)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Unsupported { .. }));
    }
}
