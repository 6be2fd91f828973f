//! Jikan API v4 response types and their normalization.
//!
//! Most fields are optional upstream, so everything that may be missing is
//! defaulted rather than failing the whole response.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use shared::{AnimeDetail, AnimeSummary, Character, Episode, EpisodeCount, Page};

/// Generic pagination wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl<T> PaginatedResponse<T> {
    /// Convert into a canonical page, mapping each entry
    pub fn into_page<U>(self, requested_page: u32, f: impl FnMut(T) -> U) -> Page<U> {
        let items: Vec<U> = self.data.into_iter().map(f).collect();
        match self.pagination {
            Some(pagination) => Page {
                items,
                current_page: pagination.current_page.unwrap_or(requested_page),
                last_page: pagination.last_visible_page,
                has_next_page: pagination.has_next_page,
            },
            None => Page::single(items, requested_page),
        }
    }
}

/// Simple data wrapper (without pagination)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub last_visible_page: u32,
    pub has_next_page: bool,
    /// Absent on some endpoints (episodes)
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub items: Option<PaginationItems>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationItems {
    pub count: u32,
    pub total: u32,
    pub per_page: u32,
}

/// Anime entry as returned by listings, search and the full detail endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JikanAnime {
    pub mal_id: u32,
    pub url: Option<String>,
    pub images: Option<AnimeImages>,

    // Titles
    pub title: String,
    pub title_english: Option<String>,
    pub title_japanese: Option<String>,

    // Type and status
    #[serde(rename = "type")]
    pub anime_type: Option<String>,
    pub source: Option<String>,
    pub episodes: Option<u32>,
    pub status: Option<String>,
    pub airing: bool,

    // Dates
    pub aired: Option<Aired>,
    pub duration: Option<String>,
    pub rating: Option<String>,

    // Scores and rankings
    pub score: Option<f64>,
    pub scored_by: Option<u32>,
    pub rank: Option<u32>,
    pub popularity: Option<u32>,

    pub synopsis: Option<String>,

    // Season
    pub season: Option<String>,
    pub year: Option<i32>,

    // Producers, studios, classifications
    pub producers: Vec<MalEntity>,
    pub studios: Vec<MalEntity>,
    pub genres: Vec<MalEntity>,
    pub themes: Vec<MalEntity>,
    pub demographics: Vec<MalEntity>,

    /// Only present on `/anime/{id}/full`
    pub relations: Vec<Relation>,
}

/// Anime images
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnimeImages {
    #[serde(default)]
    pub jpg: ImageSet,
    #[serde(default)]
    pub webp: Option<ImageSet>,
}

impl AnimeImages {
    /// Large JPEG when available, otherwise the regular one
    pub fn poster_url(&self) -> Option<String> {
        self.jpg
            .large_image_url
            .clone()
            .or_else(|| self.jpg.image_url.clone())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSet {
    pub image_url: Option<String>,
    pub small_image_url: Option<String>,
    pub large_image_url: Option<String>,
}

/// Aired dates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Aired {
    pub from: Option<String>,
    pub to: Option<String>,
    pub string: Option<String>,
}

/// MAL entity (genre, studio, producer, etc.)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MalEntity {
    pub mal_id: u32,
    #[serde(rename = "type", default)]
    pub entity_type: Option<String>,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Related entries grouped by relation (Sequel, Prequel, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub relation: String,
    #[serde(default)]
    pub entry: Vec<MalEntity>,
}

/// Character listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterEntry {
    pub character: CharacterRef,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterRef {
    pub mal_id: u32,
    pub name: String,
    #[serde(default)]
    pub images: Option<AnimeImages>,
}

/// Recommendation listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationEntry {
    pub entry: RecommendedAnime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedAnime {
    pub mal_id: u32,
    pub title: String,
    #[serde(default)]
    pub images: Option<AnimeImages>,
}

/// Episode listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JikanEpisode {
    /// Episode number within the anime
    pub mal_id: u32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub filler: bool,
    #[serde(default)]
    pub recap: bool,
}

fn names(entities: &[MalEntity]) -> Vec<String> {
    entities.iter().map(|e| e.name.clone()).collect()
}

/// Jikan timestamps look like `2009-04-05T00:00:00+00:00`
fn parse_aired_date(value: Option<&str>) -> Option<NaiveDate> {
    let value = value?;
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(value.get(..10)?, "%Y-%m-%d").ok())
}

impl JikanAnime {
    /// Project onto the canonical card shape
    pub fn to_summary(&self) -> AnimeSummary {
        AnimeSummary {
            id: self.mal_id.to_string(),
            title: self.title.clone(),
            title_english: self.title_english.clone(),
            title_japanese: self.title_japanese.clone(),
            poster_url: self.images.as_ref().and_then(AnimeImages::poster_url),
            score: self.score,
            kind: self.anime_type.clone(),
            episodes: EpisodeCount {
                sub: self.episodes,
                dub: None,
            },
            status: self.status.clone(),
            year: self.year,
            genres: names(&self.genres),
            rating: self.rating.clone(),
            duration: self.duration.clone(),
        }
    }

    /// Project onto the canonical detail shape
    pub fn into_detail(self) -> AnimeDetail {
        let summary = self.to_summary();
        let aired = self.aired.unwrap_or_default();

        let related = self
            .relations
            .iter()
            .flat_map(|relation| relation.entry.iter())
            .filter(|entry| entry.entity_type.as_deref() == Some("anime"))
            .map(|entry| AnimeSummary {
                id: entry.mal_id.to_string(),
                title: entry.name.clone(),
                ..Default::default()
            })
            .collect();

        AnimeDetail {
            summary,
            synopsis: self.synopsis,
            studios: names(&self.studios),
            producers: names(&self.producers),
            themes: names(&self.themes),
            demographics: names(&self.demographics),
            aired_from: parse_aired_date(aired.from.as_deref()),
            aired_to: parse_aired_date(aired.to.as_deref()),
            aired_text: aired.string,
            quality: None,
            duration_minutes: self.duration.as_deref().and_then(crate::catalog::duration_minutes),
            recommended: Vec::new(),
            related,
            seasons: Vec::new(),
        }
    }
}

impl From<CharacterEntry> for Character {
    fn from(entry: CharacterEntry) -> Self {
        Character {
            id: entry.character.mal_id.to_string(),
            name: entry.character.name,
            image_url: entry
                .character
                .images
                .and_then(|images| images.jpg.image_url),
            role: entry.role,
        }
    }
}

impl From<RecommendationEntry> for AnimeSummary {
    fn from(recommendation: RecommendationEntry) -> Self {
        let entry = recommendation.entry;
        AnimeSummary {
            id: entry.mal_id.to_string(),
            title: entry.title,
            poster_url: entry.images.as_ref().and_then(AnimeImages::poster_url),
            ..Default::default()
        }
    }
}

impl JikanEpisode {
    pub fn into_episode(self, anime_id: &str) -> Episode {
        Episode {
            id: format!("{}-ep-{}", anime_id, self.mal_id),
            number: self.mal_id,
            title: self
                .title
                .unwrap_or_else(|| format!("Episode {}", self.mal_id)),
            is_filler: self.filler,
        }
    }
}
