pub mod engine;
pub mod error;

use anyhow::Result;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use vsearch_core::persist::{current_snapshot, IndexPaths};
use vsearch_core::{DocId, DocumentView, Normalizer, SearchError};

pub use engine::{Engine, SearchHit, SearchResponse, RESULTS_PER_PAGE};
pub use error::ApiError;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub index_dir: PathBuf,
    pub docs_path: PathBuf,
    pub stopwords: Option<PathBuf>,
    pub admin_token: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_page")]
    pub page: usize,
}

#[derive(Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: usize,
}

fn default_page() -> usize { 1 }

#[derive(Clone)]
pub struct AppState {
    config: Arc<ServerConfig>,
    normalizer: Arc<Normalizer>,
    engine: Arc<RwLock<Option<Arc<Engine>>>>,
    reload: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self> {
        let normalizer = match &config.stopwords {
            Some(path) => Normalizer::from_stopword_file(path)?,
            None => Normalizer::english(),
        };
        let state = Self {
            config: Arc::new(config),
            normalizer: Arc::new(normalizer),
            engine: Arc::new(RwLock::new(None)),
            reload: Arc::new(Mutex::new(())),
        };
        match state.open_engine() {
            Ok(engine) => *state.engine.write() = Some(Arc::new(engine)),
            // serve anyway; queries answer 503 until an index is published and reloaded
            Err(SearchError::IndexUnavailable(reason)) => tracing::warn!(%reason, "starting without an index"),
            Err(e) => return Err(e.into()),
        }
        Ok(state)
    }

    fn open_engine(&self) -> vsearch_core::Result<Engine> {
        Engine::open(&self.config.index_dir, &self.config.docs_path, self.normalizer.clone())
    }

    /// Open the snapshot `CURRENT` names unless it is already live.
    fn reload_current(&self) -> vsearch_core::Result<(String, bool)> {
        let _guard = self.reload.lock();
        let live = current_snapshot(&IndexPaths::new(&self.config.index_dir))?;
        if let Some(engine) = self.engine.read().as_ref() {
            // sled holds an exclusive lock per database, so an open snapshot is never reopened
            if engine.snapshot_name() == live {
                return Ok((live, false));
            }
        }
        let engine = Arc::new(self.open_engine()?);
        *self.engine.write() = Some(engine);
        tracing::info!(snapshot = %live, "reloaded index snapshot");
        Ok((live, true))
    }

    /// The live engine. Queries hold their own `Arc`, so a reload never
    /// changes the snapshot under a running query.
    pub fn engine(&self) -> Result<Arc<Engine>, ApiError> {
        self.engine
            .read()
            .clone()
            .ok_or_else(|| ApiError::IndexUnavailable("no index has been built yet".into()))
    }
}

pub fn build_app(config: ServerConfig) -> Result<Router> {
    let app_state = AppState::new(config)?;

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/more_like_this/:doc_id", get(more_like_this_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Query(params) = params?;
    let engine = state.engine()?;
    Ok(Json(engine.search(&params.q, params.page)?))
}

pub async fn more_like_this_handler(
    State(state): State<AppState>,
    doc_id: Result<Path<DocId>, PathRejection>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let (Path(doc_id), Query(params)) = (doc_id?, params?);
    let engine = state.engine()?;
    Ok(Json(engine.more_like_this(doc_id, params.page)?))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    doc_id: Result<Path<DocId>, PathRejection>,
) -> Result<Json<DocumentView>, ApiError> {
    let Path(doc_id) = doc_id?;
    let engine = state.engine()?;
    engine
        .docs()
        .get(doc_id)
        .map(|doc| Json(doc.view(doc_id)))
        .ok_or_else(|| ApiError::NotFound(format!("document {doc_id} not found")))
}

/// Swap in the snapshot `CURRENT` points at, together with a fresh copy of the collection.
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    // opening sled and parsing the collection block
    let (live, reloaded) = tokio::task::spawn_blocking(move || state.reload_current())
        .await
        .map_err(|e| ApiError::Internal { code: "RELOAD_FAILED", message: e.to_string() })??;
    Ok(Json(serde_json::json!({ "snapshot": live, "reloaded": reloaded })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.config.admin_token {
        Some(t) => t,
        None => return Err(ApiError::Unauthorized("ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid admin token".into()))
    }
}
