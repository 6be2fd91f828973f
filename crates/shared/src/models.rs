//! Canonical catalog models.
//!
//! Every upstream backend is normalized into these types at the boundary, so
//! downstream code depends on one stable shape regardless of which API served
//! the data.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status string the upstreams use for shows that are still broadcasting
const AIRING_STATUSES: [&str; 2] = ["Currently Airing", "Airing"];

/// Sub/dub episode counts
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeCount {
    pub sub: Option<u32>,
    pub dub: Option<u32>,
}

impl EpisodeCount {
    /// Best known total (the larger of sub and dub)
    pub fn total(&self) -> Option<u32> {
        match (self.sub, self.dub) {
            (Some(sub), Some(dub)) => Some(sub.max(dub)),
            (sub, dub) => sub.or(dub),
        }
    }
}

/// Anime as shown on cards and listings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnimeSummary {
    /// Upstream identifier (numeric MAL id as text, or an aggregator slug)
    pub id: String,

    // Titles
    pub title: String,
    pub title_english: Option<String>,
    pub title_japanese: Option<String>,

    pub poster_url: Option<String>,
    pub score: Option<f64>,

    /// TV, Movie, OVA, ...
    pub kind: Option<String>,
    pub episodes: EpisodeCount,
    pub status: Option<String>,
    pub year: Option<i32>,
    pub genres: Vec<String>,
    pub rating: Option<String>,
    pub duration: Option<String>,
}

impl AnimeSummary {
    /// English title when the upstream has one, otherwise the main title
    pub fn display_title(&self) -> &str {
        self.title_english
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.title)
    }

    pub fn is_airing(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| AIRING_STATUSES.contains(&s))
    }
}

/// Full anime page
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnimeDetail {
    #[serde(flatten)]
    pub summary: AnimeSummary,

    pub synopsis: Option<String>,

    // Credits and classifications
    pub studios: Vec<String>,
    pub producers: Vec<String>,
    pub themes: Vec<String>,
    pub demographics: Vec<String>,

    // Dates
    pub aired_from: Option<NaiveDate>,
    pub aired_to: Option<NaiveDate>,
    /// Human readable airing period as the upstream reports it
    pub aired_text: Option<String>,

    pub quality: Option<String>,
    pub duration_minutes: Option<u32>,

    // Related listings (only filled by backends that embed them)
    pub recommended: Vec<AnimeSummary>,
    pub related: Vec<AnimeSummary>,
    pub seasons: Vec<Season>,
}

/// Another season of the same franchise
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Season {
    pub id: String,
    pub title: String,
    pub poster_url: Option<String>,
    pub is_current: bool,
}

/// One page of a listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub last_page: u32,
    pub has_next_page: bool,
}

impl<T> Page<T> {
    /// A page that is known to be the only one
    pub fn single(items: Vec<T>, current_page: u32) -> Self {
        Self {
            items,
            current_page,
            last_page: 1,
            has_next_page: false,
        }
    }
}

/// Everything the landing page shows
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HomeFeed {
    pub spotlight: Vec<AnimeSummary>,
    pub trending: Vec<AnimeSummary>,
    pub top_airing: Vec<AnimeSummary>,
    pub most_popular: Vec<AnimeSummary>,
    pub upcoming: Vec<AnimeSummary>,
    pub latest_episodes: Vec<AnimeSummary>,
    pub latest_completed: Vec<AnimeSummary>,
    pub most_favorite: Vec<AnimeSummary>,
    pub genres: Vec<String>,
}

/// Search parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub page: u32,
    /// Restrict to a type such as `tv` or `movie`
    pub kind: Option<String>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page: 1,
            kind: None,
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// Character appearing in an anime
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    /// Main or Supporting
    pub role: Option<String>,
}

/// Episode listing entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Episode {
    /// Identifier used to request servers and sources
    pub id: String,
    pub number: u32,
    pub title: String,
    pub is_filler: bool,
}

/// Audio/subtitle flavour of a stream
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StreamCategory {
    #[default]
    Sub,
    Dub,
    Raw,
}

impl StreamCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamCategory::Sub => "sub",
            StreamCategory::Dub => "dub",
            StreamCategory::Raw => "raw",
        }
    }
}

impl std::fmt::Display for StreamCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StreamCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sub" => Ok(StreamCategory::Sub),
            "dub" => Ok(StreamCategory::Dub),
            "raw" => Ok(StreamCategory::Raw),
            _ => Err(anyhow::anyhow!("Invalid stream category: {}", s)),
        }
    }
}

/// Server able to stream an episode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeServer {
    pub id: u32,
    pub name: String,
    pub category: StreamCategory,
}

/// Playable sources for one episode on one server
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StreamSources {
    /// Headers the player must send (e.g. Referer)
    pub headers: BTreeMap<String, String>,
    pub sources: Vec<StreamSource>,
    pub subtitles: Vec<Subtitle>,
    pub anilist_id: Option<u32>,
    pub mal_id: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamSource {
    pub url: String,
    pub is_m3u8: bool,
    pub quality: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subtitle {
    pub lang: String,
    pub url: String,
}
