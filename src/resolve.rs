use tracing::{info, warn};

use crate::kind::MediaKind;
use crate::tmdb::TmdbApi;

pub const TMDB_PREFIX: &str = "tmdb:";
pub const IMDB_PREFIX: &str = "tt";

pub fn is_imdb_id(id: &str) -> bool {
    id.starts_with(IMDB_PREFIX)
}

/// Drops the `tmdb:` namespace tag clients send back to us.
pub fn strip_tmdb_prefix(id: &str) -> &str {
    id.strip_prefix(TMDB_PREFIX).unwrap_or(id)
}

/// Returns the TMDB id for `external_id`, calling `/find` only for IMDb ids.
/// Lookup failures are logged and reported as `None`.
pub async fn resolve_tmdb_id(
    tmdb: &dyn TmdbApi,
    api_key: &str,
    external_id: &str,
    kind: MediaKind,
) -> Option<String> {
    if !is_imdb_id(external_id) {
        return Some(strip_tmdb_prefix(external_id).to_string());
    }
    match tmdb.find_by_imdb(api_key, external_id, kind).await {
        Ok(Some(id)) => {
            info!("Converted {} '{}' to TMDB id {}", kind, external_id, id);
            Some(id.to_string())
        }
        Ok(None) => {
            warn!("TMDB id not found for {} '{}'", kind, external_id);
            None
        }
        Err(e) => {
            warn!("TMDB id lookup failed for '{}': {:#}", external_id, e);
            None
        }
    }
}
