use anyhow::Result;
use tracing::{info, warn};

use crate::config::{Settings, UserConfig};
use crate::kind::MediaKind;
use crate::meta::{CanonicalMetadata, MetaPreview};
use crate::normalize::{image_url, normalize, year_of, POSTER_BASE};
use crate::resolve::{is_imdb_id, resolve_tmdb_id, strip_tmdb_prefix, TMDB_PREFIX};
use crate::tmdb::{SearchHit, TmdbApi};

pub const SEARCH_CATALOG_ID: &str = "tmdb.search";

#[derive(Debug, Clone, Default)]
pub struct MetaRequest {
    pub kind: String,
    pub id: String,
    pub config: UserConfig,
}

#[derive(Debug, Clone, Default)]
pub struct CatalogRequest {
    pub kind: String,
    pub id: String,
    pub search: Option<String>,
    pub config: UserConfig,
}

/// `Ok(None)` covers bad input and unknown ids; `Err` is an upstream failure.
pub async fn handle_meta(
    tmdb: &dyn TmdbApi,
    settings: &Settings,
    request: &MetaRequest,
) -> Result<Option<CanonicalMetadata>> {
    info!("Meta request received: type={}, id={}", request.kind, request.id);

    let kind: MediaKind = match request.kind.parse() {
        Ok(k) => k,
        Err(e) => {
            warn!("{}", e);
            return Ok(None);
        }
    };
    let id = request.id.trim();
    if id.is_empty() {
        warn!("No id provided for metadata request");
        return Ok(None);
    }
    let Some(api_key) = request.config.api_key(settings) else {
        warn!("API key is required for TMDB requests");
        return Ok(None);
    };
    let language = request.config.language();

    let raw = match kind {
        MediaKind::Movie => {
            tmdb.fetch_movie(&api_key, strip_tmdb_prefix(id), language)
                .await?
        }
        MediaKind::Series => {
            let series_id = if is_imdb_id(id) {
                match resolve_tmdb_id(tmdb, &api_key, id, kind).await {
                    Some(resolved) => resolved,
                    None => return Ok(None),
                }
            } else {
                strip_tmdb_prefix(id).to_string()
            };
            tmdb.fetch_series(&api_key, &series_id, language).await?
        }
    };

    Ok(Some(normalize(tmdb, &api_key, raw, kind).await))
}

/// Search catalogs pass TMDB's result order straight through.
pub async fn handle_catalog(
    tmdb: &dyn TmdbApi,
    settings: &Settings,
    request: &CatalogRequest,
) -> Result<Vec<MetaPreview>> {
    info!(
        "Catalog request received: type={}, id={}, search={:?}",
        request.kind, request.id, request.search
    );

    let Ok(kind) = request.kind.parse::<MediaKind>() else {
        warn!("Unknown catalog type: {}", request.kind);
        return Ok(Vec::new());
    };
    if request.id != SEARCH_CATALOG_ID {
        warn!("Unknown catalog id: {}", request.id);
        return Ok(Vec::new());
    }
    let Some(query) = request
        .search
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
    else {
        return Ok(Vec::new());
    };
    let Some(api_key) = request.config.api_key(settings) else {
        warn!("API key is required for TMDB requests");
        return Ok(Vec::new());
    };

    let hits = tmdb.search(&api_key, query, kind).await?;
    Ok(hits.into_iter().map(|hit| preview(hit, kind)).collect())
}

fn preview(hit: SearchHit, kind: MediaKind) -> MetaPreview {
    let date = hit
        .release_date
        .or(hit.first_air_date)
        .filter(|d| !d.is_empty());
    MetaPreview {
        id: format!("{TMDB_PREFIX}{}", hit.id),
        kind,
        name: hit.title.or(hit.name).unwrap_or_default(),
        poster: hit
            .poster_path
            .as_deref()
            .map(|p| image_url(POSTER_BASE, Some(p))),
        description: hit.overview.unwrap_or_default(),
        release_info: date.as_deref().map(year_of).unwrap_or_default(),
    }
}
