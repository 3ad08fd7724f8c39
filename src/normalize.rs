use chrono::{NaiveDate, SecondsFormat};
use tracing::debug;

use crate::episodes::fetch_episodes;
use crate::kind::{DateField, MediaKind, TitleField};
use crate::meta::{AppExtras, BehaviorHints, CanonicalMetadata, CastMember, Trailer};
use crate::resolve::TMDB_PREFIX;
use crate::sort::{self, WIDESCREEN};
use crate::tmdb::{Credit, TmdbApi, TmdbTitle};

pub const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";
pub const STILL_BASE: &str = POSTER_BASE;
pub const ORIGINAL_BASE: &str = "https://image.tmdb.org/t/p/original";
pub const PROFILE_BASE: &str = "https://image.tmdb.org/t/p/w276_and_h350_face";

/// Converts a raw TMDB record into the canonical record. Series also get their
/// episode list, fetched in season batches.
pub async fn normalize(
    tmdb: &dyn TmdbApi,
    api_key: &str,
    raw: TmdbTitle,
    kind: MediaKind,
) -> CanonicalMetadata {
    let mut meta = build_metadata(&raw, kind);
    if kind.profile().embeds_episodes {
        debug!(episode_run_time = ?raw.episode_run_time, "Series episode runtimes");
        let series_ref = raw
            .external_ids
            .as_ref()
            .and_then(|e| e.imdb_id.clone())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("{TMDB_PREFIX}{}", raw.id));
        meta.videos = fetch_episodes(
            tmdb,
            api_key,
            raw.id,
            &series_ref,
            raw.number_of_seasons.unwrap_or(0),
        )
        .await;
    }
    meta
}

/// Everything except the episode list.
pub fn build_metadata(raw: &TmdbTitle, kind: MediaKind) -> CanonicalMetadata {
    let profile = kind.profile();
    let name = match profile.title_field {
        TitleField::Title => raw.title.clone(),
        TitleField::Name => raw.name.clone(),
    }
    .unwrap_or_default();

    // A missing logo falls back to the title as a placeholder path.
    let logo_path = sort::by_rating(raw.images.logos.clone())
        .into_iter()
        .next()
        .map(|l| l.file_path)
        .unwrap_or_else(|| name.clone());
    let poster_path = raw
        .images
        .posters
        .as_ref()
        .and_then(|p| p.first())
        .map(|p| p.file_path.clone());
    let backdrop_path = sort::by_aspect_ratio(raw.images.backdrops.clone(), WIDESCREEN)
        .into_iter()
        .next()
        .map(|b| b.file_path);

    let trailers = raw
        .videos
        .as_ref()
        .map(|v| {
            v.results
                .iter()
                .filter(|video| video.video_type == "Trailer")
                .map(|video| Trailer {
                    source: video.key.clone(),
                    trailer_type: video.video_type.clone(),
                })
                .collect()
        })
        .unwrap_or_default();

    let cast = raw
        .credits
        .cast
        .iter()
        .filter(|c| c.known_for_department.as_deref() == Some("Acting"))
        .filter_map(|c| {
            let profile_path = c.profile_path.as_deref().filter(|p| !p.is_empty())?;
            Some(CastMember {
                name: c.name.clone(),
                character: c.character.clone().unwrap_or_default(),
                photo: format!("{PROFILE_BASE}{profile_path}"),
            })
        })
        .collect();

    let director = first_crew(&raw.credits.crew, "Director").unwrap_or_default();
    let writer = first_crew(&raw.credits.crew, "Writer").unwrap_or_else(|| {
        raw.created_by
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    });

    let date = release_date(raw, profile.date_field);
    let year = date.map(year_of).unwrap_or_default();
    let namespaced_id = format!("{TMDB_PREFIX}{}", raw.id);
    let default_video_id = raw
        .imdb_id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| namespaced_id.clone());

    CanonicalMetadata {
        id: namespaced_id,
        kind,
        name,
        description: raw.overview.clone().unwrap_or_default(),
        poster: image_url(POSTER_BASE, poster_path.as_deref()),
        background: image_url(ORIGINAL_BASE, backdrop_path.as_deref()),
        logo: image_url(ORIGINAL_BASE, Some(logo_path.as_str())),
        released: date.and_then(iso_timestamp),
        imdb_rating: raw.vote_average.unwrap_or_default(),
        runtime: format_runtime(runtime_minutes(raw)),
        genres: raw.genres.iter().map(|g| g.name.clone()).collect(),
        trailers,
        behavior_hints: BehaviorHints {
            default_video_id,
            has_scheduled_videos: false,
        },
        country: raw
            .production_countries
            .iter()
            .map(|c| c.iso_3166_1.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        director,
        writer,
        release_info: year.clone(),
        year,
        app_extras: AppExtras { cast },
        videos: Vec::new(),
    }
}

fn first_crew(crew: &[Credit], job: &str) -> Option<String> {
    crew.iter()
        .find(|c| c.job.as_deref() == Some(job))
        .map(|c| c.name.clone())
}

/// The kind's own date field wins; the other shape's field is the fallback.
fn release_date(raw: &TmdbTitle, field: DateField) -> Option<&str> {
    let (primary, secondary) = match field {
        DateField::ReleaseDate => (&raw.release_date, &raw.first_air_date),
        DateField::FirstAirDate => (&raw.first_air_date, &raw.release_date),
    };
    primary
        .as_deref()
        .filter(|d| !d.is_empty())
        .or_else(|| secondary.as_deref().filter(|d| !d.is_empty()))
}

/// First non-zero value of: runtime, first episode runtime, last aired
/// episode runtime, next episode runtime.
pub fn runtime_minutes(raw: &TmdbTitle) -> Option<u32> {
    [
        raw.runtime,
        raw.episode_run_time
            .as_ref()
            .and_then(|r| r.first().copied()),
        raw.last_episode_to_air.as_ref().and_then(|e| e.runtime),
        raw.next_episode_to_air.as_ref().and_then(|e| e.runtime),
    ]
    .into_iter()
    .flatten()
    .find(|&m| m > 0)
}

/// `90` -> `1h30min`, `45` -> `45min`, nothing -> empty.
pub fn format_runtime(minutes: Option<u32>) -> String {
    match minutes {
        None | Some(0) => String::new(),
        Some(m) if m >= 60 => format!("{}h{}min", m / 60, m % 60),
        Some(m) => format!("{m}min"),
    }
}

pub fn year_of(date: &str) -> String {
    date.chars().take(4).collect()
}

/// `2010-09-24` -> `2010-09-24T00:00:00.000Z`
pub fn iso_timestamp(date: &str) -> Option<String> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let midnight = day.and_hms_opt(0, 0, 0)?.and_utc();
    Some(midnight.to_rfc3339_opts(SecondsFormat::Millis, true))
}

pub fn image_url(base: &str, path: Option<&str>) -> String {
    format!("{base}{}", path.unwrap_or_default())
}
