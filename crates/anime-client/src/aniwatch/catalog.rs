//! Aniwatch-backed catalog.

use super::types::*;
use crate::api::CachedClient;
use crate::catalog::{
    build_url, first_page, parse_base_url, pick_random, CatalogError, CatalogSource, Result,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use shared::{
    AnimeDetail, AnimeSummary, Backend, Character, Episode, EpisodeServer, HomeFeed, Page,
    SearchQuery, StreamCategory, StreamSources,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Catalog over an Aniwatch (hianime) aggregator deployment
pub struct AniwatchCatalog {
    client: Arc<CachedClient>,
    base_url: Url,
}

impl AniwatchCatalog {
    /// Create a new Aniwatch catalog
    ///
    /// `base_url` includes the API prefix, e.g. `https://host/api/v2/hianime`.
    pub fn new(client: Arc<CachedClient>, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
        })
    }

    /// Fetch an endpoint and unwrap the `{ success, data }` envelope
    async fn fetch<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = build_url(&self.base_url, segments, params)?;
        let response: AniwatchResponse<T> = self.client.get(&url).await?;
        response.into_data().ok_or_else(|| {
            warn!(url = %url, "Upstream reported failure");
            CatalogError::Upstream { url }
        })
    }

    async fn home_data(&self) -> Result<HomeData> {
        self.fetch(&["home"], &[]).await
    }
}

#[async_trait]
impl CatalogSource for AniwatchCatalog {
    fn backend(&self) -> Backend {
        Backend::Aniwatch
    }

    async fn home(&self) -> Result<HomeFeed> {
        info!("Fetching home feed");
        Ok(self.home_data().await?.into_feed())
    }

    // Ranking lists only exist as home feed sections, so every page is the
    // same first slice of the section.
    async fn top_anime(&self, kind: Option<&str>, page: u32) -> Result<Page<AnimeSummary>> {
        debug!(kind = ?kind, page = page, "Fetching top anime from home feed");
        let feed = self.home().await?;
        Ok(first_page(&feed.most_popular, page))
    }

    async fn top_airing(&self, page: u32) -> Result<Page<AnimeSummary>> {
        let feed = self.home().await?;
        Ok(first_page(&feed.top_airing, page))
    }

    async fn popular(&self, page: u32) -> Result<Page<AnimeSummary>> {
        let feed = self.home().await?;
        Ok(first_page(&feed.most_popular, page))
    }

    async fn movies(&self, page: u32) -> Result<Page<AnimeSummary>> {
        self.search(&SearchQuery::new("").page(page).kind("movie")).await
    }

    async fn series(&self, page: u32) -> Result<Page<AnimeSummary>> {
        self.search(&SearchQuery::new("").page(page).kind("tv")).await
    }

    async fn search(&self, query: &SearchQuery) -> Result<Page<AnimeSummary>> {
        info!(query = %query.query, page = query.page, "Searching anime");
        let mut params = vec![
            ("q", query.query.clone()),
            ("page", query.page.to_string()),
        ];
        if let Some(kind) = &query.kind {
            params.push(("type", kind.clone()));
        }
        let data: SearchData = self.fetch(&["search"], &params).await?;
        Ok(data.into_page(query.page))
    }

    async fn anime(&self, id: &str) -> Result<AnimeDetail> {
        debug!(id = %id, "Fetching anime details");
        let data: AnimeAboutData = self.fetch(&["anime", id], &[]).await?;
        Ok(data.into_detail())
    }

    async fn characters(&self, id: &str) -> Result<Vec<Character>> {
        debug!(id = %id, "Aniwatch has no character listing");
        Ok(Vec::new())
    }

    async fn recommendations(&self, id: &str) -> Result<Vec<AnimeSummary>> {
        match self.anime(id).await {
            Ok(detail) => Ok(detail.recommended),
            Err(e) => {
                warn!(id = %id, error = %e, "Failed to fetch recommendations");
                Ok(Vec::new())
            }
        }
    }

    async fn random(&self) -> Result<AnimeSummary> {
        let feed = self.home().await?;
        pick_random(&feed.spotlight, "spotlight anime")
    }

    async fn episodes(&self, id: &str) -> Result<Vec<Episode>> {
        let data: EpisodesData = self.fetch(&["anime", id, "episodes"], &[]).await?;
        debug!(id = %id, total = data.total_episodes, "Fetched episode list");
        Ok(data.episodes.into_iter().map(Episode::from).collect())
    }

    async fn episode_servers(&self, episode_id: &str) -> Result<Vec<EpisodeServer>> {
        let data: ServersData = self
            .fetch(
                &["episode", "servers"],
                &[("animeEpisodeId", episode_id.to_string())],
            )
            .await?;
        Ok(data.into_servers())
    }

    async fn episode_sources(
        &self,
        episode_id: &str,
        server: &str,
        category: StreamCategory,
    ) -> Result<StreamSources> {
        debug!(episode = %episode_id, server = %server, category = %category, "Fetching episode sources");
        let data: SourcesData = self
            .fetch(
                &["episode", "sources"],
                &[
                    ("animeEpisodeId", episode_id.to_string()),
                    ("server", server.to_string()),
                    ("category", category.as_str().to_string()),
                ],
            )
            .await?;
        Ok(data.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::tests::{unthrottled, FakeTransport};
    use serde_json::json;

    const BASE: &str = "https://aniwatch.example/api/v2/hianime";

    fn catalog(transport: Arc<FakeTransport>) -> AniwatchCatalog {
        let client = Arc::new(CachedClient::new(transport, unthrottled()));
        AniwatchCatalog::new(client, BASE).unwrap()
    }

    fn cards(prefix: &str, count: usize) -> Vec<serde_json::Value> {
        (1..=count)
            .map(|n| json!({ "id": format!("{}-{}", prefix, n), "name": format!("{} {}", prefix, n) }))
            .collect()
    }

    fn home_body() -> String {
        json!({
            "success": true,
            "data": {
                "genres": ["Action", "Romance"],
                "spotlightAnimes": cards("spotlight", 3),
                "trendingAnimes": cards("trending", 10),
                "topAiringAnimes": cards("airing", 30),
                "mostPopularAnimes": cards("popular", 40),
                "topUpcomingAnimes": [],
                "latestEpisodeAnimes": cards("latest", 5)
            }
        })
        .to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn test_home_feed() {
        let transport = FakeTransport::new();
        transport.respond(&format!("{}/home", BASE), 200, home_body());
        let catalog = catalog(transport.clone());

        let feed = catalog.home().await.unwrap();
        assert_eq!(feed.spotlight.len(), 3);
        assert_eq!(feed.trending[0].id, "trending-1");
        assert_eq!(feed.latest_episodes.len(), 5);
        assert!(feed.most_favorite.is_empty());
        assert_eq!(feed.genres, vec!["Action", "Romance"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listings_share_one_home_fetch() {
        let transport = FakeTransport::new();
        let url = format!("{}/home", BASE);
        transport.respond(&url, 200, home_body());
        let catalog = catalog(transport.clone());

        let popular = catalog.popular(1).await.unwrap();
        assert_eq!(popular.items.len(), crate::catalog::PAGE_SIZE);
        assert!(!popular.has_next_page);

        let airing = catalog.top_airing(2).await.unwrap();
        assert_eq!(airing.items[0].id, "airing-1");
        assert_eq!(airing.current_page, 2);

        let top = catalog.top_anime(Some("movie"), 1).await.unwrap();
        assert_eq!(top.items[0].id, "popular-1");

        let random = catalog.random().await.unwrap();
        assert!(random.id.starts_with("spotlight-"));

        assert_eq!(transport.calls(&url), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_movies_search_with_type_filter() {
        let transport = FakeTransport::new();
        transport.respond(
            &format!("{}/search?q=&page=2&type=movie", BASE),
            200,
            json!({
                "success": true,
                "data": {
                    "animes": cards("movie", 2),
                    "currentPage": 2,
                    "totalPages": 7,
                    "hasNextPage": true
                }
            })
            .to_string(),
        );
        let catalog = catalog(transport.clone());

        let page = catalog.movies(2).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.last_page, 7);
        assert!(page.has_next_page);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_false_is_upstream_error() {
        let transport = FakeTransport::new();
        let url = format!("{}/anime/missing-1", BASE);
        transport.respond(&url, 200, r#"{"success":false}"#);
        let catalog = catalog(transport.clone());

        let err = catalog.anime("missing-1").await.unwrap_err();
        assert!(matches!(err, CatalogError::Upstream { url: ref u } if *u == url));
        assert_eq!(err.status(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recommendations_degrade_to_empty() {
        let transport = FakeTransport::new();
        transport.respond(&format!("{}/anime/broken-2", BASE), 500, "oops");
        let catalog = catalog(transport.clone());

        let recommendations = catalog.recommendations("broken-2").await.unwrap();
        assert!(recommendations.is_empty());
        assert!(catalog.characters("broken-2").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_random_with_empty_spotlight() {
        let transport = FakeTransport::new();
        transport.respond(&format!("{}/home", BASE), 200, r#"{"success":true,"data":{}}"#);
        let catalog = catalog(transport.clone());

        let err = catalog.random().await.unwrap_err();
        assert!(matches!(err, CatalogError::Empty { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_episodes_and_streaming() {
        let transport = FakeTransport::new();
        transport.respond(
            &format!("{}/anime/steinsgate-3/episodes", BASE),
            200,
            json!({
                "success": true,
                "data": {
                    "totalEpisodes": 2,
                    "episodes": [
                        { "number": 1, "title": "Turning Point", "episodeId": "steinsgate-3?ep=230", "isFiller": false },
                        { "number": 2, "title": null, "episodeId": "steinsgate-3?ep=231", "isFiller": false }
                    ]
                }
            })
            .to_string(),
        );
        transport.respond(
            &format!("{}/episode/servers?animeEpisodeId=steinsgate-3%3Fep%3D230", BASE),
            200,
            json!({
                "success": true,
                "data": {
                    "episodeId": "steinsgate-3?ep=230",
                    "episodeNo": 1,
                    "sub": [{ "serverId": 4, "serverName": "hd-1" }],
                    "dub": [],
                    "raw": []
                }
            })
            .to_string(),
        );
        transport.respond(
            &format!(
                "{}/episode/sources?animeEpisodeId=steinsgate-3%3Fep%3D230&server=hd-1&category=dub",
                BASE
            ),
            200,
            json!({
                "success": true,
                "data": {
                    "headers": { "Referer": "https://megacloud.example/" },
                    "sources": [{ "url": "https://cdn.example/master.m3u8", "isM3U8": true }],
                    "subtitles": []
                }
            })
            .to_string(),
        );
        let catalog = catalog(transport.clone());

        let episodes = catalog.episodes("steinsgate-3").await.unwrap();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].id, "steinsgate-3?ep=230");
        assert_eq!(episodes[1].title, "Episode 2");

        let servers = catalog.episode_servers(&episodes[0].id).await.unwrap();
        assert_eq!(servers[0].name, "hd-1");
        assert_eq!(servers[0].category, StreamCategory::Sub);

        let sources = catalog
            .episode_sources(&episodes[0].id, "hd-1", StreamCategory::Dub)
            .await
            .unwrap();
        assert!(sources.sources[0].is_m3u8);
    }
}
