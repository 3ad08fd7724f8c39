use serde_json::{json, Value};

use crate::config::Settings;
use crate::handler::SEARCH_CATALOG_ID;
use crate::resolve::{IMDB_PREFIX, TMDB_PREFIX};

pub const LANGUAGES: [&str; 3] = ["en-US", "es-ES", "fr-FR"];

pub fn manifest(settings: &Settings) -> Value {
    let catalog = |kind: &str| {
        json!({
            "id": SEARCH_CATALOG_ID,
            "type": kind,
            "name": "TMDB | Search",
            "extra": [{ "name": "search", "isRequired": true, "options": [] }]
        })
    };

    json!({
        "id": settings.addon_id,
        "version": env!("CARGO_PKG_VERSION"),
        "name": settings.addon_name,
        "description": settings.addon_description,
        "resources": ["meta", "catalog"],
        "types": ["movie", "series"],
        "idPrefixes": [TMDB_PREFIX, IMDB_PREFIX],
        "config": [
            {
                "key": "apiKeyTMDB",
                "type": "text",
                "title": "TMDB API Key",
                "required": true
            },
            {
                "key": "preferredLanguage",
                "type": "select",
                "title": "Preferred Language",
                "required": true,
                "options": LANGUAGES
            }
        ],
        "behaviorHints": {
            "configurable": true,
            "configurationRequired": false
        },
        "catalogs": [catalog("movie"), catalog("series")]
    })
}
