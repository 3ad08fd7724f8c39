use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::time::Duration;
use tracing::{debug, warn};

use crate::kind::{FindBucket, MediaKind};
use crate::sort::{AspectRatio, Votable};

pub const TMDB_BASE: &str = "https://api.themoviedb.org/3";

/// Upstream limit on `append_to_response` entries per call.
pub const SEASONS_PER_BATCH: u32 = 20;

#[async_trait]
pub trait TmdbApi: Send + Sync {
    /// Maps an IMDb id to a TMDB id via `/find`. `Ok(None)` when nothing matches.
    async fn find_by_imdb(&self, api_key: &str, imdb_id: &str, kind: MediaKind)
        -> Result<Option<u64>>;
    async fn fetch_movie(&self, api_key: &str, id: &str, language: &str) -> Result<TmdbTitle>;
    async fn fetch_series(&self, api_key: &str, id: &str, language: &str) -> Result<TmdbTitle>;
    async fn search(&self, api_key: &str, query: &str, kind: MediaKind) -> Result<Vec<SearchHit>>;
    /// Episode listings for every season in `seasons`, in one request.
    async fn fetch_season_batch(
        &self,
        api_key: &str,
        series_id: u64,
        seasons: RangeInclusive<u32>,
    ) -> Result<BTreeMap<u32, Vec<TmdbEpisode>>>;
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
}

impl TmdbClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let user_agent = format!("tmdblink/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_title(
        &self,
        api_key: &str,
        kind: MediaKind,
        id: &str,
        language: &str,
    ) -> Result<TmdbTitle> {
        let profile = kind.profile();
        let path = format!("/{}/{}", profile.tmdb_path, urlencoding::encode(id));
        let url = format!(
            "{}{path}?api_key={}&append_to_response={}&language={}&include_image_language={}",
            self.base_url,
            urlencoding::encode(api_key),
            profile.append_to_response,
            urlencoding::encode(language),
            urlencoding::encode(language_code(language)),
        );
        self.get_json(&url, &path)
            .await
            .with_context(|| format!("Failed to fetch {kind} {id}"))
    }

    /// `label` stands in for the URL in errors so the credential never ends up in logs.
    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str, label: &str) -> Result<T> {
        debug!(path = %label, "TMDB request");
        let res = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {label} failed"))?;
        let status = res.status();
        let text = res.text().await.context("reading body failed")?;
        if !status.is_success() {
            return Err(anyhow!(
                "TMDB request {} failed. Status: {}",
                label,
                status.as_u16()
            ));
        }
        let parsed: T = serde_json::from_str(&text)
            .with_context(|| format!("JSON parse failed for {label}"))?;
        Ok(parsed)
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn find_by_imdb(
        &self,
        api_key: &str,
        imdb_id: &str,
        kind: MediaKind,
    ) -> Result<Option<u64>> {
        #[derive(Deserialize)]
        struct FindResponse {
            movie_results: Option<Vec<FindResult>>,
            tv_results: Option<Vec<FindResult>>,
        }
        #[derive(Deserialize)]
        struct FindResult {
            id: u64,
        }

        let path = format!("/find/{}", urlencoding::encode(imdb_id));
        let url = format!(
            "{}{path}?external_source=imdb_id&api_key={}",
            self.base_url,
            urlencoding::encode(api_key)
        );
        let data: FindResponse = self.get_json(&url, &path).await?;
        let bucket = match kind.profile().find_bucket {
            FindBucket::MovieResults => data.movie_results,
            FindBucket::TvResults => data.tv_results,
        };
        Ok(bucket.and_then(|v| v.into_iter().next()).map(|r| r.id))
    }

    async fn fetch_movie(&self, api_key: &str, id: &str, language: &str) -> Result<TmdbTitle> {
        self.fetch_title(api_key, MediaKind::Movie, id, language).await
    }

    async fn fetch_series(&self, api_key: &str, id: &str, language: &str) -> Result<TmdbTitle> {
        self.fetch_title(api_key, MediaKind::Series, id, language).await
    }

    async fn search(&self, api_key: &str, query: &str, kind: MediaKind) -> Result<Vec<SearchHit>> {
        #[derive(Deserialize)]
        struct SearchResponse {
            #[serde(default)]
            results: Vec<SearchHit>,
        }

        let path = format!("/search/{}", kind.profile().tmdb_path);
        let url = format!(
            "{}{path}?api_key={}&query={}&include_adult=false&language=en-US&page=1",
            self.base_url,
            urlencoding::encode(api_key),
            urlencoding::encode(query)
        );
        let data: SearchResponse = self
            .get_json(&url, &path)
            .await
            .with_context(|| format!("Failed to search {kind} for '{query}'"))?;
        Ok(data.results)
    }

    async fn fetch_season_batch(
        &self,
        api_key: &str,
        series_id: u64,
        seasons: RangeInclusive<u32>,
    ) -> Result<BTreeMap<u32, Vec<TmdbEpisode>>> {
        let appended = seasons
            .clone()
            .map(|n| format!("season/{n}"))
            .collect::<Vec<_>>()
            .join(",");
        let path = format!("/tv/{series_id}");
        let url = format!(
            "{}{path}?api_key={}&append_to_response={appended}",
            self.base_url,
            urlencoding::encode(api_key)
        );
        let data: Map<String, Value> = self.get_json(&url, &path).await?;

        let mut listings = BTreeMap::new();
        for season in seasons {
            let Some(raw) = data.get(&format!("season/{season}")) else {
                warn!("Series {} response is missing season {}", series_id, season);
                continue;
            };
            match serde_json::from_value::<SeasonListing>(raw.clone()) {
                Ok(listing) => {
                    listings.insert(season, listing.episodes);
                }
                Err(e) => warn!(
                    "Could not parse season {} of series {}: {}",
                    season, series_id, e
                ),
            }
        }
        Ok(listings)
    }
}

/// `en-US` -> `en`
pub fn language_code(locale: &str) -> &str {
    locale.split('-').next().unwrap_or(locale)
}

/// Raw movie or series record as returned with `append_to_response`.
/// Fields of both shapes live here; the kind decides which are read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbTitle {
    pub id: u64,
    pub title: Option<String>,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub imdb_id: Option<String>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    pub vote_average: Option<f64>,
    pub runtime: Option<u32>,
    pub episode_run_time: Option<Vec<u32>>,
    pub last_episode_to_air: Option<EpisodeRuntime>,
    pub next_episode_to_air: Option<EpisodeRuntime>,
    pub number_of_seasons: Option<u32>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub production_countries: Vec<ProductionCountry>,
    #[serde(default)]
    pub created_by: Vec<Creator>,
    #[serde(default)]
    pub images: Images,
    pub videos: Option<Videos>,
    #[serde(default)]
    pub credits: Credits,
    pub external_ids: Option<ExternalIds>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Genre {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductionCountry {
    pub iso_3166_1: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Creator {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EpisodeRuntime {
    pub runtime: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Images {
    pub logos: Option<Vec<Image>>,
    pub posters: Option<Vec<Image>>,
    pub backdrops: Option<Vec<Image>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Image {
    pub file_path: String,
    #[serde(default)]
    pub aspect_ratio: f64,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u64,
}

impl Votable for Image {
    fn vote_average(&self) -> f64 {
        self.vote_average
    }
    fn vote_count(&self) -> u64 {
        self.vote_count
    }
}

impl AspectRatio for Image {
    fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Videos {
    #[serde(default)]
    pub results: Vec<Video>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Video {
    pub key: String,
    #[serde(rename = "type")]
    pub video_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<Credit>,
    #[serde(default)]
    pub crew: Vec<Credit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credit {
    pub name: String,
    pub character: Option<String>,
    pub known_for_department: Option<String>,
    pub job: Option<String>,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalIds {
    pub imdb_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeasonListing {
    #[serde(default)]
    pub episodes: Vec<TmdbEpisode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbEpisode {
    pub episode_number: u32,
    pub name: Option<String>,
    pub air_date: Option<String>,
    pub overview: Option<String>,
    pub still_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchHit {
    pub id: u64,
    pub title: Option<String>,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
}
