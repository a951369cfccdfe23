use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use server::{build_app, ServerConfig};
use std::path::Path;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;
use vsearch_core::persist::{publish, IndexPaths};
use vsearch_core::{build, Collection, Normalizer};

const DOCS: &str = r#"{
  "1": {"Title": ["Cats"], "Text": "Cats are animals. Cats sleep.", "Director": ["Ann Lee"], "Starring": ["Tom", "Kit"], "Country": ["France"], "Location": ["Paris"]},
  "2": {"Title": ["Dogs"], "Text": "Dogs are animals. Dogs bark."},
  "3": {"Title": ["Pets"], "Text": "Cats and dogs sleep. One. Two. Three. Four. Five."}
}"#;

fn build_index(dir: &Path, docs_json: &str) -> String {
    let docs_path = dir.join("docs.json");
    std::fs::write(&docs_path, docs_json).unwrap();
    let collection = Collection::load(&docs_path).unwrap();
    let built = build(&Normalizer::english(), &collection).unwrap();
    publish(&IndexPaths::new(dir.join("index")), &built, 2).unwrap()
}

fn config(dir: &Path) -> ServerConfig {
    ServerConfig {
        index_dir: dir.join("index"),
        docs_path: dir.join("docs.json"),
        stopwords: None,
        admin_token: Some("secret".into()),
    }
}

fn app_with_index() -> (TempDir, Router) {
    let dir = tempdir().unwrap();
    build_index(dir.path(), DOCS);
    let app = build_app(config(dir.path())).unwrap();
    (dir, app)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

fn doc_ids(json: &Value) -> Vec<u64> {
    json["results"].as_array().unwrap().iter().map(|r| r["doc_id"].as_u64().unwrap()).collect()
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let (_dir, app) = app_with_index();
    let (status, json) = get(&app, "/search?q=cats%20sleep").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 2);
    assert_eq!(doc_ids(&json), vec![1, 3]);
    let first = &json["results"][0];
    assert_eq!(first["title"], "Cats");
    assert_eq!(first["matched_terms"], serde_json::json!(["cats", "sleep"]));
    assert!(first["snippet"].as_str().unwrap().contains("<em>Cats</em>"));
    assert!(first["score"].as_f64().unwrap() <= 1.0 + 1e-9);
}

#[tokio::test]
async fn search_reports_stopwords_and_unknown_terms() {
    let (_dir, app) = app_with_index();
    let (status, json) = get(&app, "/search?q=the%20parrots%20bark").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stopwords"], serde_json::json!(["the"]));
    assert_eq!(json["unknown_terms"], serde_json::json!(["parrots"]));
    assert_eq!(doc_ids(&json), vec![2]);
}

#[tokio::test]
async fn stopword_only_query_has_no_hits() {
    let (_dir, app) = app_with_index();
    let (status, json) = get(&app, "/search?q=the%20a%20an").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 0);
    assert!(json["results"].as_array().unwrap().is_empty());
    assert_eq!(json["stopwords"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn pages_past_the_end_are_empty_and_page_zero_is_rejected() {
    let (_dir, app) = app_with_index();
    let (status, json) = get(&app, "/search?q=cats&page=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 2);
    assert!(json["results"].as_array().unwrap().is_empty());

    let (status, json) = get(&app, "/search?q=cats&page=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn malformed_parameters_get_a_json_bad_request() {
    let (_dir, app) = app_with_index();
    for uri in ["/search?q=cats&page=abc", "/search?q=cats&page=-1", "/doc/abc", "/more_like_this/x"] {
        let (status, json) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["code"], "BAD_REQUEST", "{uri}");
        assert!(json["error"].is_string(), "{uri}");
    }
}

#[tokio::test]
async fn snippet_is_first_five_sentences() {
    let (_dir, app) = app_with_index();
    let (_, json) = get(&app, "/search?q=dogs").await;
    let pets = json["results"].as_array().unwrap().iter().find(|r| r["doc_id"] == 3).unwrap();
    let snippet = pets["snippet"].as_str().unwrap();
    assert!(snippet.ends_with("Four."), "{snippet}");
}

#[tokio::test]
async fn document_page_and_more_like_this() {
    let (_dir, app) = app_with_index();
    let (status, json) = get(&app, "/doc/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Cats");
    assert_eq!(json["starring"], "Tom, Kit");
    assert_eq!(json["location"], "Paris");

    let (status, _) = get(&app, "/doc/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = get(&app, "/more_like_this/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc_ids(&json)[0], 1);
}

#[tokio::test]
async fn missing_index_is_service_unavailable() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("docs.json"), DOCS).unwrap();
    let app = build_app(config(dir.path())).unwrap();
    let (status, json) = get(&app, "/search?q=cats").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "INDEX_UNAVAILABLE");

    // publishing and reloading brings the server up without a restart
    build_index(dir.path(), DOCS);
    let reload = Request::post("/index/reload").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, json) = send(&app, reload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["reloaded"], true);
    let (status, _) = get(&app, "/search?q=cats").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn reload_requires_the_admin_token_and_swaps_snapshots() {
    let (dir, app) = app_with_index();
    let bad = Request::post("/index/reload").header("X-ADMIN-TOKEN", "nope").body(Body::empty()).unwrap();
    let (status, _) = send(&app, bad).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let same = Request::post("/index/reload").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (_, json) = send(&app, same).await;
    assert_eq!(json["reloaded"], false);

    let name = build_index(dir.path(), r#"{"1": {"Title": ["Parrots"], "Text": "Parrots talk."}, "2": {"Title": ["Owls"], "Text": "Owls hoot."}}"#);
    let fresh = Request::post("/index/reload").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (_, json) = send(&app, fresh).await;
    assert_eq!(json["reloaded"], true);
    assert_eq!(json["snapshot"], name);

    let (_, json) = get(&app, "/search?q=parrots").await;
    assert_eq!(doc_ids(&json), vec![1]);
    assert_eq!(json["results"][0]["title"], "Parrots");
}
