use std::collections::HashSet;
use std::ops::RangeInclusive;
use tracing::{info, warn};

use crate::meta::EpisodeRecord;
use crate::normalize::{image_url, iso_timestamp, STILL_BASE};
use crate::tmdb::{TmdbApi, TmdbEpisode, SEASONS_PER_BATCH};

/// Splits seasons `1..=number_of_seasons` into consecutive ranges of at most `size`.
pub fn season_batches(number_of_seasons: u32, size: u32) -> Vec<RangeInclusive<u32>> {
    let size = size.max(1);
    let mut batches = Vec::new();
    let mut start = 1;
    while start <= number_of_seasons {
        let end = number_of_seasons.min(start.saturating_add(size - 1));
        batches.push(start..=end);
        start = end + 1;
    }
    batches
}

/// Fetches every season's episodes batch by batch. A failed batch is logged and
/// skipped; the remaining batches still contribute.
pub async fn fetch_episodes(
    tmdb: &dyn TmdbApi,
    api_key: &str,
    series_id: u64,
    series_ref: &str,
    number_of_seasons: u32,
) -> Vec<EpisodeRecord> {
    let mut records = Vec::new();
    let mut seen = HashSet::new();

    for batch in season_batches(number_of_seasons, SEASONS_PER_BATCH) {
        let (first, last) = (*batch.start(), *batch.end());
        let seasons = match tmdb.fetch_season_batch(api_key, series_id, batch).await {
            Ok(s) => s,
            Err(e) => {
                warn!(
                    "Failed to fetch seasons {} to {} of series {}: {:#}",
                    first, last, series_id, e
                );
                continue;
            }
        };

        for (season, mut episodes) in seasons {
            if !(first..=last).contains(&season) {
                continue;
            }
            episodes.sort_by_key(|e| e.episode_number);
            for episode in episodes {
                if seen.insert((season, episode.episode_number)) {
                    records.push(episode_record(series_ref, season, episode));
                }
            }
        }
    }

    info!(
        "Collected {} episodes across {} seasons for series {}",
        records.len(),
        number_of_seasons,
        series_id
    );
    records
}

fn episode_record(series_ref: &str, season: u32, episode: TmdbEpisode) -> EpisodeRecord {
    let number = episode.episode_number;
    let overview = episode.overview.unwrap_or_default();
    let air_date = episode.air_date.filter(|d| !d.is_empty());
    EpisodeRecord {
        id: format!("{series_ref}:{season}:{number}"),
        name: episode.name.unwrap_or_default(),
        season,
        number,
        episode: number,
        first_aired: air_date.as_deref().and_then(iso_timestamp),
        released: air_date,
        description: overview.clone(),
        overview,
        thumbnail: image_url(STILL_BASE, episode.still_path.as_deref()),
        streams: Vec::new(),
    }
}
