use serde::Serialize;

use crate::kind::MediaKind;

/// Canonical metadata record served to addon clients.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalMetadata {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub name: String,
    pub description: String,
    pub poster: String,
    pub background: String,
    pub logo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub released: Option<String>,
    pub imdb_rating: f64,
    pub runtime: String,
    pub genres: Vec<String>,
    pub trailers: Vec<Trailer>,
    pub behavior_hints: BehaviorHints,
    pub country: String,
    pub director: String,
    pub writer: String,
    pub year: String,
    pub release_info: String,
    #[serde(rename = "app_extras")]
    pub app_extras: AppExtras,
    pub videos: Vec<EpisodeRecord>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Trailer {
    pub source: String,
    #[serde(rename = "type")]
    pub trailer_type: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorHints {
    pub default_video_id: String,
    pub has_scheduled_videos: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct AppExtras {
    pub cast: Vec<CastMember>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CastMember {
    pub name: String,
    pub character: String,
    pub photo: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRecord {
    /// `<seriesId>:<season>:<episode>`
    pub id: String,
    pub name: String,
    pub season: u32,
    pub number: u32,
    pub episode: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub released: Option<String>,
    pub overview: String,
    pub description: String,
    pub thumbnail: String,
    /// Filled by stream addons downstream.
    pub streams: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_aired: Option<String>,
}

/// Catalog entry built from a search hit.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetaPreview {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    pub description: String,
    pub release_info: String,
}
