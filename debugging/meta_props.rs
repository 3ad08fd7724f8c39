//! Fetch one title from TMDB and print the normalized addon meta record.
//! Usage:
//!   cargo run --bin meta_props -- movie <tmdb_id|imdb_id> [language]
//!   cargo run --bin meta_props -- series <tmdb_id|imdb_id> [language]
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use tmdblink::config::{Settings, UserConfig};
use tmdblink::handler::{handle_meta, MetaRequest};
use tmdblink::tmdb::TmdbClient;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let mut args = env::args().skip(1);
    let kind = args.next().context("missing media kind (movie|series)")?;
    let id = args.next().context("missing id")?;
    let language = args.next();

    let settings = Settings::from_env()?;
    if settings.default_api_key.is_none() {
        bail!("TMDB_API_KEY must be set");
    }
    let tmdb = TmdbClient::new(settings.tmdb_base_url.clone())?;
    let request = MetaRequest {
        kind,
        id,
        config: UserConfig {
            api_key_tmdb: None,
            preferred_language: language,
        },
    };

    match handle_meta(&tmdb, &settings, &request).await? {
        Some(meta) => println!("{}", serde_json::to_string_pretty(&meta)?),
        None => println!("null"),
    }
    Ok(())
}
