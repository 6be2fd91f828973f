//! Aniwatch API response types and their normalization.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use shared::{
    AnimeDetail, AnimeSummary, Episode, EpisodeCount, EpisodeServer, HomeFeed, Page, Season,
    StreamCategory, StreamSource, StreamSources, Subtitle,
};
use std::collections::BTreeMap;

/// `{ success, data }` envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AniwatchResponse<T> {
    #[serde(default)]
    pub success: Option<bool>,
    pub data: Option<T>,
}

impl<T> AniwatchResponse<T> {
    /// Payload of a successful response
    pub fn into_data(self) -> Option<T> {
        match self.success {
            Some(false) => None,
            _ => self.data,
        }
    }
}

/// Sub/dub counts as the aggregator reports them
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Episodes {
    pub sub: Option<u32>,
    pub dub: Option<u32>,
}

impl From<Episodes> for EpisodeCount {
    fn from(episodes: Episodes) -> Self {
        EpisodeCount {
            sub: episodes.sub,
            dub: episodes.dub,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub rating: Option<String>,
    pub quality: Option<String>,
    pub episodes: Option<Episodes>,
    #[serde(rename = "type")]
    pub anime_type: Option<String>,
    pub duration: Option<String>,
}

/// Anime card as it appears in every listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AniwatchAnime {
    pub id: String,
    pub name: String,
    pub jname: Option<String>,
    pub poster: Option<String>,
    pub description: Option<String>,
    pub stats: Option<Stats>,
    pub episodes: Option<Episodes>,
    #[serde(rename = "type")]
    pub anime_type: Option<String>,
    pub rating: Option<String>,
    pub duration: Option<String>,
}

/// Either a single (comma separated) string or a list of strings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(value) => value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            OneOrMany::Many(values) => values,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MoreInfo {
    pub aired: Option<String>,
    pub genres: Option<OneOrMany>,
    pub status: Option<String>,
    pub studios: Option<OneOrMany>,
    pub producers: Option<OneOrMany>,
    pub duration: Option<String>,
    pub japanese: Option<String>,
    pub malscore: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnimeEntry {
    pub info: AniwatchAnime,
    pub more_info: MoreInfo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SeasonEntry {
    pub id: String,
    pub name: String,
    pub title: Option<String>,
    pub poster: Option<String>,
    pub is_current: bool,
}

/// Payload of `/anime/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnimeAboutData {
    pub anime: AnimeEntry,
    pub recommended_animes: Vec<AniwatchAnime>,
    pub related_animes: Vec<AniwatchAnime>,
    pub seasons: Vec<SeasonEntry>,
}

/// Payload of `/home`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HomeData {
    pub genres: Vec<String>,
    pub latest_episode_animes: Vec<AniwatchAnime>,
    pub spotlight_animes: Vec<AniwatchAnime>,
    pub top_airing_animes: Vec<AniwatchAnime>,
    pub top_upcoming_animes: Vec<AniwatchAnime>,
    pub trending_animes: Vec<AniwatchAnime>,
    pub most_popular_animes: Vec<AniwatchAnime>,
    pub most_favorite_animes: Vec<AniwatchAnime>,
    pub latest_completed_animes: Vec<AniwatchAnime>,
}

/// Payload of `/search`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchData {
    pub animes: Vec<AniwatchAnime>,
    pub current_page: Option<u32>,
    pub total_pages: Option<u32>,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EpisodeEntry {
    pub number: u32,
    pub title: Option<String>,
    pub episode_id: String,
    pub is_filler: bool,
}

/// Payload of `/anime/{id}/episodes`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EpisodesData {
    pub total_episodes: u32,
    pub episodes: Vec<EpisodeEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEntry {
    pub server_id: u32,
    pub server_name: String,
}

/// Payload of `/episode/servers`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServersData {
    pub sub: Vec<ServerEntry>,
    pub dub: Vec<ServerEntry>,
    pub raw: Vec<ServerEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceEntry {
    pub url: String,
    #[serde(default, rename = "isM3U8")]
    pub is_m3u8: bool,
    #[serde(default)]
    pub quality: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleEntry {
    pub lang: String,
    pub url: String,
}

/// Payload of `/episode/sources`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesData {
    pub headers: BTreeMap<String, String>,
    pub sources: Vec<SourceEntry>,
    pub subtitles: Vec<SubtitleEntry>,
    #[serde(rename = "anilistID")]
    pub anilist_id: Option<u32>,
    #[serde(rename = "malID")]
    pub mal_id: Option<u32>,
}

/// Parse an airing period such as "Oct 20, 1999 to ?" or "Apr 5, 2009"
pub fn parse_aired_range(aired: &str) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let parse = |part: &str| NaiveDate::parse_from_str(part.trim(), "%b %d, %Y").ok();
    match aired.split_once(" to ") {
        Some((from, to)) => (parse(from), parse(to)),
        None => (parse(aired), None),
    }
}

fn summaries(animes: &[AniwatchAnime]) -> Vec<AnimeSummary> {
    animes.iter().map(AniwatchAnime::to_summary).collect()
}

impl AniwatchAnime {
    /// Project onto the canonical card shape, preferring `stats` over the
    /// flat fields listing endpoints use
    pub fn to_summary(&self) -> AnimeSummary {
        let stats = self.stats.clone().unwrap_or_default();
        let episodes = stats.episodes.or(self.episodes).unwrap_or_default();

        AnimeSummary {
            id: self.id.clone(),
            title: self.name.clone(),
            title_english: None,
            title_japanese: self.jname.clone(),
            poster_url: self.poster.clone(),
            score: None,
            kind: stats.anime_type.or_else(|| self.anime_type.clone()),
            episodes: episodes.into(),
            status: None,
            year: None,
            genres: Vec::new(),
            rating: stats.rating.or_else(|| self.rating.clone()),
            duration: stats.duration.or_else(|| self.duration.clone()),
        }
    }
}

impl HomeData {
    pub fn into_feed(self) -> HomeFeed {
        HomeFeed {
            spotlight: summaries(&self.spotlight_animes),
            trending: summaries(&self.trending_animes),
            top_airing: summaries(&self.top_airing_animes),
            most_popular: summaries(&self.most_popular_animes),
            upcoming: summaries(&self.top_upcoming_animes),
            latest_episodes: summaries(&self.latest_episode_animes),
            latest_completed: summaries(&self.latest_completed_animes),
            most_favorite: summaries(&self.most_favorite_animes),
            genres: self.genres,
        }
    }
}

impl SearchData {
    pub fn into_page(self, requested_page: u32) -> Page<AnimeSummary> {
        let current_page = self.current_page.unwrap_or(requested_page);
        Page {
            items: summaries(&self.animes),
            current_page,
            last_page: self.total_pages.unwrap_or(current_page),
            has_next_page: self.has_next_page,
        }
    }
}

impl AnimeAboutData {
    pub fn into_detail(self) -> AnimeDetail {
        let info = self.anime.info;
        let more = self.anime.more_info;

        let mut summary = info.to_summary();
        let (aired_from, aired_to) = more
            .aired
            .as_deref()
            .map(parse_aired_range)
            .unwrap_or_default();

        summary.status = more.status;
        summary.genres = more.genres.map(OneOrMany::into_vec).unwrap_or_default();
        summary.score = more.malscore.as_deref().and_then(|s| s.trim().parse().ok());
        summary.year = aired_from.map(|date| date.year());
        if summary.title_japanese.is_none() {
            summary.title_japanese = more.japanese;
        }

        let duration = summary.duration.clone().or(more.duration);
        let quality = info.stats.and_then(|stats| stats.quality);

        AnimeDetail {
            summary,
            synopsis: info.description,
            studios: more.studios.map(OneOrMany::into_vec).unwrap_or_default(),
            producers: more.producers.map(OneOrMany::into_vec).unwrap_or_default(),
            themes: Vec::new(),
            demographics: Vec::new(),
            aired_from,
            aired_to,
            aired_text: more.aired,
            quality,
            duration_minutes: duration.as_deref().and_then(crate::catalog::duration_minutes),
            recommended: summaries(&self.recommended_animes),
            related: summaries(&self.related_animes),
            seasons: self
                .seasons
                .into_iter()
                .map(|season| Season {
                    id: season.id,
                    title: season.title.unwrap_or(season.name),
                    poster_url: season.poster,
                    is_current: season.is_current,
                })
                .collect(),
        }
    }
}

impl From<EpisodeEntry> for Episode {
    fn from(entry: EpisodeEntry) -> Self {
        Episode {
            id: entry.episode_id,
            number: entry.number,
            title: entry
                .title
                .unwrap_or_else(|| format!("Episode {}", entry.number)),
            is_filler: entry.is_filler,
        }
    }
}

impl ServersData {
    pub fn into_servers(self) -> Vec<EpisodeServer> {
        let tag = |entries: Vec<ServerEntry>, category: StreamCategory| {
            entries.into_iter().map(move |entry| EpisodeServer {
                id: entry.server_id,
                name: entry.server_name,
                category,
            })
        };

        tag(self.sub, StreamCategory::Sub)
            .chain(tag(self.dub, StreamCategory::Dub))
            .chain(tag(self.raw, StreamCategory::Raw))
            .collect()
    }
}

impl From<SourcesData> for StreamSources {
    fn from(data: SourcesData) -> Self {
        StreamSources {
            headers: data.headers,
            sources: data
                .sources
                .into_iter()
                .map(|s| StreamSource {
                    url: s.url,
                    is_m3u8: s.is_m3u8,
                    quality: s.quality,
                })
                .collect(),
            subtitles: data
                .subtitles
                .into_iter()
                .map(|s| Subtitle {
                    lang: s.lang,
                    url: s.url,
                })
                .collect(),
            anilist_id: data.anilist_id,
            mal_id: data.mal_id,
        }
    }
}
