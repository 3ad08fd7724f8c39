use crate::config::{Settings, UserConfig};
use crate::handler::{self, CatalogRequest, MetaRequest};
use crate::manifest;
use crate::tmdb::{TmdbApi, TmdbClient};
use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::{collections::HashMap, net::SocketAddr, sync::Arc};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub tmdb: Arc<dyn TmdbApi>,
    pub settings: Arc<Settings>,
}

pub async fn run_server(settings: Settings) -> Result<()> {
    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::new(settings.tmdb_base_url.clone())?);
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let state = AppState {
        tmdb,
        settings: Arc::new(settings),
    };

    let app = build_router(state);

    info!("Listening on {}", addr);
    info!("Manifest available at http://{}/manifest.json", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/manifest.json", get(manifest_default))
        .route("/:config/manifest.json", get(manifest_configured))
        .route("/meta/:kind/:id", get(meta_default))
        .route("/:config/meta/:kind/:id", get(meta_configured))
        .route("/catalog/:kind/:id", get(catalog_default))
        .route("/catalog/:kind/:id/:extra", get(catalog_default_extra))
        .route("/:config/catalog/:kind/:id", get(catalog_configured))
        .route("/:config/catalog/:kind/:id/:extra", get(catalog_configured_extra))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn manifest_default(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(manifest::manifest(&state.settings))
}

async fn manifest_configured(
    State(state): State<AppState>,
    Path(_config): Path<String>,
) -> Json<serde_json::Value> {
    Json(manifest::manifest(&state.settings))
}

async fn meta_default(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Response {
    serve_meta(&state, UserConfig::default(), kind, id).await
}

async fn meta_configured(
    State(state): State<AppState>,
    Path((_config, kind, id)): Path<(String, String, String)>,
    uri: Uri,
) -> Response {
    serve_meta(&state, config_from_uri(&uri), kind, id).await
}

async fn catalog_default(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Response {
    serve_catalog(&state, UserConfig::default(), kind, id, None).await
}

async fn catalog_default_extra(
    State(state): State<AppState>,
    Path((kind, id, _extra)): Path<(String, String, String)>,
    uri: Uri,
) -> Response {
    let extra = last_raw_segment(&uri);
    serve_catalog(&state, UserConfig::default(), kind, id, extra).await
}

async fn catalog_configured(
    State(state): State<AppState>,
    Path((_config, kind, id)): Path<(String, String, String)>,
    uri: Uri,
) -> Response {
    serve_catalog(&state, config_from_uri(&uri), kind, id, None).await
}

async fn catalog_configured_extra(
    State(state): State<AppState>,
    Path((_config, kind, id, _extra)): Path<(String, String, String, String)>,
    uri: Uri,
) -> Response {
    let extra = last_raw_segment(&uri);
    serve_catalog(&state, config_from_uri(&uri), kind, id, extra).await
}

async fn serve_meta(state: &AppState, config: UserConfig, kind: String, id: String) -> Response {
    let request = MetaRequest {
        kind,
        id: strip_json(&id).to_string(),
        config,
    };
    match handler::handle_meta(state.tmdb.as_ref(), &state.settings, &request).await {
        Ok(meta) => Json(json!({ "meta": meta })).into_response(),
        Err(e) => {
            error!("Meta request for {} failed: {:#}", request.id, e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "meta": null, "error": format!("{:#}", e) })),
            )
                .into_response()
        }
    }
}

async fn serve_catalog(
    state: &AppState,
    config: UserConfig,
    kind: String,
    id: String,
    extra: Option<String>,
) -> Response {
    let (id, search) = match extra {
        Some(extra) => (id, search_term(strip_json(&extra))),
        None => (strip_json(&id).to_string(), None),
    };
    let request = CatalogRequest {
        kind,
        id,
        search,
        config,
    };
    match handler::handle_catalog(state.tmdb.as_ref(), &state.settings, &request).await {
        Ok(metas) => Json(json!({ "metas": metas })).into_response(),
        Err(e) => {
            error!("Catalog request {} failed: {:#}", request.id, e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "metas": [], "error": format!("{:#}", e) })),
            )
                .into_response()
        }
    }
}

fn strip_json(segment: &str) -> &str {
    segment.strip_suffix(".json").unwrap_or(segment)
}

/// `Path` hands back decoded segments; config and extras must be decoded exactly
/// once from the raw request path instead.
fn raw_segments(uri: &Uri) -> impl Iterator<Item = &str> {
    uri.path().trim_start_matches('/').split('/')
}

fn config_from_uri(uri: &Uri) -> UserConfig {
    raw_segments(uri)
        .next()
        .map(UserConfig::from_path_segment)
        .unwrap_or_default()
}

fn last_raw_segment(uri: &Uri) -> Option<String> {
    raw_segments(uri).last().map(str::to_string)
}

/// Pulls `search` out of a raw extra segment such as `search=the%20wire&skip=0`.
fn search_term(extra: &str) -> Option<String> {
    match serde_urlencoded::from_str::<HashMap<String, String>>(extra) {
        Ok(mut pairs) => pairs.remove("search"),
        Err(e) => {
            warn!("Ignoring unreadable catalog extra '{}': {}", extra, e);
            None
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
