use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
}

/// Kind-specific extraction rules, carried as data so the fetch and normalize
/// paths never branch on the kind themselves.
#[derive(Debug)]
pub struct KindProfile {
    /// Path segment used by TMDB (`/movie/...`, `/tv/...`).
    pub tmdb_path: &'static str,
    pub append_to_response: &'static str,
    pub title_field: TitleField,
    pub date_field: DateField,
    pub find_bucket: FindBucket,
    pub embeds_episodes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleField {
    Title,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    ReleaseDate,
    FirstAirDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindBucket {
    MovieResults,
    TvResults,
}

const MOVIE: KindProfile = KindProfile {
    tmdb_path: "movie",
    append_to_response: "videos,credits,images",
    title_field: TitleField::Title,
    date_field: DateField::ReleaseDate,
    find_bucket: FindBucket::MovieResults,
    embeds_episodes: false,
};

const SERIES: KindProfile = KindProfile {
    tmdb_path: "tv",
    append_to_response: "videos,credits,images,external_ids",
    title_field: TitleField::Name,
    date_field: DateField::FirstAirDate,
    find_bucket: FindBucket::TvResults,
    embeds_episodes: true,
};

impl MediaKind {
    pub fn profile(&self) -> &'static KindProfile {
        match self {
            MediaKind::Movie => &MOVIE,
            MediaKind::Series => &SERIES,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "series",
        }
    }
}

impl FromStr for MediaKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaKind::Movie),
            "series" => Ok(MediaKind::Series),
            other => Err(anyhow!("unsupported media kind '{}'", other)),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
