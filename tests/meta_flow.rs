use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex};
use tmdblink::app::{build_router, AppState};
use tmdblink::config::{Settings, UserConfig};
use tmdblink::handler::{handle_meta, MetaRequest};
use tmdblink::kind::MediaKind;
use tmdblink::tmdb::{ExternalIds, SearchHit, TmdbApi, TmdbEpisode, TmdbTitle};
use tower::util::ServiceExt;

const DEFAULT_KEY: &str = "env-key";

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Find(String, String),
    Movie(String, String, String),
    Series(String, String),
    Search(String, String),
    Batch(u64, RangeInclusive<u32>),
}

#[derive(Default)]
struct FakeTmdb {
    calls: Mutex<Vec<Call>>,
    find_result: Option<u64>,
    fail_movie: bool,
    failing_batch_start: Option<u32>,
    number_of_seasons: u32,
}

impl FakeTmdb {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl TmdbApi for FakeTmdb {
    async fn find_by_imdb(
        &self,
        api_key: &str,
        imdb_id: &str,
        _kind: MediaKind,
    ) -> anyhow::Result<Option<u64>> {
        self.record(Call::Find(api_key.to_string(), imdb_id.to_string()));
        Ok(self.find_result)
    }

    async fn fetch_movie(
        &self,
        api_key: &str,
        id: &str,
        language: &str,
    ) -> anyhow::Result<TmdbTitle> {
        self.record(Call::Movie(
            api_key.to_string(),
            id.to_string(),
            language.to_string(),
        ));
        if self.fail_movie {
            anyhow::bail!("TMDB request /movie/{} failed. Status: 404", id);
        }
        Ok(serde_json::from_value(json!({
            "id": 27205,
            "title": "Inception",
            "overview": "Dreams within dreams.",
            "imdb_id": "tt1375666",
            "release_date": "2010-07-15",
            "vote_average": 8.4,
            "runtime": 148,
            "genres": [{ "name": "Action" }],
            "production_countries": [{ "iso_3166_1": "US" }],
            "images": { "logos": [], "posters": [{ "file_path": "/p.jpg" }], "backdrops": [] },
            "videos": { "results": [{ "key": "abc", "type": "Trailer" }] },
            "credits": { "cast": [], "crew": [{ "name": "Christopher Nolan", "job": "Director" }] }
        }))?)
    }

    async fn fetch_series(
        &self,
        api_key: &str,
        id: &str,
        _language: &str,
    ) -> anyhow::Result<TmdbTitle> {
        self.record(Call::Series(api_key.to_string(), id.to_string()));
        Ok(TmdbTitle {
            id: id.parse()?,
            name: Some("Long Runner".to_string()),
            first_air_date: Some("1989-12-17".to_string()),
            episode_run_time: Some(vec![22]),
            number_of_seasons: Some(self.number_of_seasons),
            external_ids: Some(ExternalIds {
                imdb_id: Some("tt0096697".to_string()),
            }),
            ..Default::default()
        })
    }

    async fn search(
        &self,
        api_key: &str,
        query: &str,
        _kind: MediaKind,
    ) -> anyhow::Result<Vec<SearchHit>> {
        self.record(Call::Search(api_key.to_string(), query.to_string()));
        Ok(vec![
            SearchHit {
                id: 2,
                title: Some("Second Best".to_string()),
                ..Default::default()
            },
            SearchHit {
                id: 1,
                title: Some("Best".to_string()),
                ..Default::default()
            },
        ])
    }

    async fn fetch_season_batch(
        &self,
        _api_key: &str,
        series_id: u64,
        seasons: RangeInclusive<u32>,
    ) -> anyhow::Result<BTreeMap<u32, Vec<TmdbEpisode>>> {
        self.record(Call::Batch(series_id, seasons.clone()));
        if Some(*seasons.start()) == self.failing_batch_start {
            anyhow::bail!("TMDB request /tv/{} failed. Status: 500", series_id);
        }
        // Episodes arrive out of order with a repeated entry.
        Ok(seasons
            .map(|season| {
                let episode = |n: u32| TmdbEpisode {
                    episode_number: n,
                    name: Some(format!("S{season}E{n}")),
                    air_date: Some("2000-01-01".to_string()),
                    ..Default::default()
                };
                (season, vec![episode(2), episode(1), episode(2)])
            })
            .collect())
    }
}

fn settings(default_key: Option<&str>) -> Settings {
    Settings {
        default_api_key: default_key.map(str::to_string),
        ..Settings::default()
    }
}

fn app(tmdb: Arc<FakeTmdb>, default_key: Option<&str>) -> Router {
    build_router(AppState {
        tmdb,
        settings: Arc::new(settings(default_key)),
    })
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let res = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn config_segment(config: Value) -> String {
    urlencoding::encode(&config.to_string()).into_owned()
}

#[tokio::test]
async fn movie_request_returns_namespaced_record() {
    let tmdb = Arc::new(FakeTmdb::default());
    let (status, body) = get_json(app(tmdb.clone(), Some(DEFAULT_KEY)), "/meta/movie/27205.json").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["id"], "tmdb:27205");
    assert_eq!(body["meta"]["type"], "movie");
    assert_eq!(body["meta"]["name"], "Inception");
    assert_eq!(body["meta"]["runtime"], "2h28min");
    assert_eq!(body["meta"]["year"], "2010");
    assert_eq!(body["meta"]["director"], "Christopher Nolan");
    assert_eq!(body["meta"]["poster"], "https://image.tmdb.org/t/p/w500/p.jpg");
    assert_eq!(body["meta"]["logo"], "https://image.tmdb.org/t/p/originalInception");
    assert_eq!(
        tmdb.calls(),
        vec![Call::Movie(
            DEFAULT_KEY.to_string(),
            "27205".to_string(),
            "en-US".to_string()
        )]
    );
}

#[tokio::test]
async fn configured_key_and_language_are_used() {
    let tmdb = Arc::new(FakeTmdb::default());
    let segment = config_segment(json!({ "apiKeyTMDB": "user-key", "preferredLanguage": "fr-FR" }));
    let uri = format!("/{segment}/meta/movie/tmdb:27205.json");
    let (status, body) = get_json(app(tmdb.clone(), Some(DEFAULT_KEY)), &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["id"], "tmdb:27205");
    assert_eq!(
        tmdb.calls(),
        vec![Call::Movie(
            "user-key".to_string(),
            "27205".to_string(),
            "fr-FR".to_string()
        )]
    );
}

#[tokio::test]
async fn missing_credential_short_circuits() {
    let tmdb = Arc::new(FakeTmdb::default());
    let (status, body) = get_json(app(tmdb.clone(), None), "/meta/movie/27205.json").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["meta"].is_null());
    assert!(tmdb.calls().is_empty());
}

#[tokio::test]
async fn empty_id_and_unknown_kind_short_circuit() {
    let tmdb = FakeTmdb::default();
    let settings = settings(Some(DEFAULT_KEY));

    let empty_id = MetaRequest {
        kind: "movie".to_string(),
        id: "  ".to_string(),
        config: UserConfig::default(),
    };
    assert!(handle_meta(&tmdb, &settings, &empty_id).await.unwrap().is_none());

    let unknown_kind = MetaRequest {
        kind: "channel".to_string(),
        id: "27205".to_string(),
        config: UserConfig::default(),
    };
    assert!(handle_meta(&tmdb, &settings, &unknown_kind).await.unwrap().is_none());
    assert!(tmdb.calls().is_empty());
}

#[tokio::test]
async fn unresolvable_imdb_series_returns_null_without_fetching() {
    let tmdb = Arc::new(FakeTmdb::default());
    let (status, body) = get_json(app(tmdb.clone(), Some(DEFAULT_KEY)), "/meta/series/tt0000001.json").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["meta"].is_null());
    assert_eq!(
        tmdb.calls(),
        vec![Call::Find(DEFAULT_KEY.to_string(), "tt0000001".to_string())]
    );
}

#[tokio::test]
async fn series_episodes_are_batched_and_ordered() {
    let tmdb = Arc::new(FakeTmdb {
        find_result: Some(456),
        number_of_seasons: 45,
        ..Default::default()
    });
    let (status, body) = get_json(app(tmdb.clone(), Some(DEFAULT_KEY)), "/meta/series/tt0096697.json").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["id"], "tmdb:456");
    assert_eq!(body["meta"]["type"], "series");
    assert_eq!(body["meta"]["name"], "Long Runner");
    assert_eq!(body["meta"]["runtime"], "22min");
    assert_eq!(body["meta"]["releaseInfo"], "1989");

    let calls = tmdb.calls();
    assert_eq!(
        calls,
        vec![
            Call::Find(DEFAULT_KEY.to_string(), "tt0096697".to_string()),
            Call::Series(DEFAULT_KEY.to_string(), "456".to_string()),
            Call::Batch(456, 1..=20),
            Call::Batch(456, 21..=40),
            Call::Batch(456, 41..=45),
        ]
    );

    let videos = body["meta"]["videos"].as_array().unwrap();
    assert_eq!(videos.len(), 45 * 2);
    assert_eq!(videos[0]["id"], "tt0096697:1:1");
    assert_eq!(videos[1]["id"], "tt0096697:1:2");
    assert_eq!(videos[89]["id"], "tt0096697:45:2");
    assert_eq!(videos[0]["firstAired"], "2000-01-01T00:00:00.000Z");

    let keys: Vec<(u64, u64)> = videos
        .iter()
        .map(|v| (v["season"].as_u64().unwrap(), v["episode"].as_u64().unwrap()))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(keys.iter().collect::<HashSet<_>>().len(), keys.len());
}

#[tokio::test]
async fn failed_batch_is_skipped() {
    let tmdb = Arc::new(FakeTmdb {
        number_of_seasons: 45,
        failing_batch_start: Some(21),
        ..Default::default()
    });
    let (status, body) = get_json(app(tmdb.clone(), Some(DEFAULT_KEY)), "/meta/series/1399.json").await;

    assert_eq!(status, StatusCode::OK);
    let seasons: HashSet<u64> = body["meta"]["videos"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["season"].as_u64().unwrap())
        .collect();
    assert_eq!(seasons.len(), 25);
    assert!(seasons.contains(&20));
    assert!(!seasons.contains(&21));
    assert!(!seasons.contains(&40));
    assert!(seasons.contains(&41));
}

#[tokio::test]
async fn upstream_failure_is_reported_as_error() {
    let tmdb = Arc::new(FakeTmdb {
        fail_movie: true,
        ..Default::default()
    });
    let (status, body) = get_json(app(tmdb, Some(DEFAULT_KEY)), "/meta/movie/1.json").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["meta"].is_null());
    assert!(body["error"].as_str().unwrap().contains("404"));
}

#[tokio::test]
async fn search_catalog_passes_results_through() {
    let tmdb = Arc::new(FakeTmdb::default());
    let (status, body) = get_json(
        app(tmdb.clone(), Some(DEFAULT_KEY)),
        "/catalog/movie/tmdb.search/search=best%20movie.json",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let metas = body["metas"].as_array().unwrap();
    assert_eq!(metas.len(), 2);
    assert_eq!(metas[0]["id"], "tmdb:2");
    assert_eq!(metas[1]["name"], "Best");
    assert_eq!(
        tmdb.calls(),
        vec![Call::Search(DEFAULT_KEY.to_string(), "best movie".to_string())]
    );
}

#[tokio::test]
async fn catalog_without_search_is_empty() {
    let tmdb = Arc::new(FakeTmdb::default());
    let (status, body) = get_json(app(tmdb.clone(), Some(DEFAULT_KEY)), "/catalog/series/tmdb.search.json").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metas"], json!([]));
    assert!(tmdb.calls().is_empty());
}

#[tokio::test]
async fn serves_manifest() {
    let tmdb = Arc::new(FakeTmdb::default());
    let (status, body) = get_json(app(tmdb, None), "/manifest.json").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resources"], json!(["meta", "catalog"]));
    assert_eq!(body["types"], json!(["movie", "series"]));
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn search_keeps_ampersands() {
    let tmdb = Arc::new(FakeTmdb::default());
    let (status, _) = get_json(
        app(tmdb.clone(), Some(DEFAULT_KEY)),
        "/catalog/series/tmdb.search/search=Law%20%26%20Order.json",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        tmdb.calls(),
        vec![Call::Search(DEFAULT_KEY.to_string(), "Law & Order".to_string())]
    );
}

#[tokio::test]
async fn search_decodes_literal_percent_once() {
    let tmdb = Arc::new(FakeTmdb::default());
    let (status, _) = get_json(
        app(tmdb.clone(), Some(DEFAULT_KEY)),
        "/catalog/movie/tmdb.search/search=100%2525%20Wolf.json",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        tmdb.calls(),
        vec![Call::Search(DEFAULT_KEY.to_string(), "100%25 Wolf".to_string())]
    );
}

#[tokio::test]
async fn configured_search_uses_raw_segments() {
    let tmdb = Arc::new(FakeTmdb::default());
    let segment = config_segment(json!({ "apiKeyTMDB": "key%41" }));
    let uri = format!("/{segment}/catalog/series/tmdb.search/search=Tom%20%26%20Jerry.json");
    let (status, body) = get_json(app(tmdb.clone(), None), &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metas"].as_array().map(Vec::len), Some(2));
    assert_eq!(
        tmdb.calls(),
        vec![Call::Search("key%41".to_string(), "Tom & Jerry".to_string())]
    );
}
