use crate::error::ApiError;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use vsearch_core::persist::{IndexPaths, Snapshot};
use vsearch_core::{page_of, score, vectorize, Collection, DocId, Normalizer, Ranked};

pub const RESULTS_PER_PAGE: usize = 10;

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub page: usize,
    pub took_s: f64,
    pub total_hits: usize,
    pub stopwords: Vec<String>,
    pub unknown_terms: Vec<String>,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    pub matched_terms: Vec<String>,
    pub title: String,
    pub snippet: Option<String>,
}

/// One live snapshot plus the display store for its collection. Read-only.
pub struct Engine {
    snapshot: Snapshot,
    docs: Collection,
    normalizer: Arc<Normalizer>,
}

impl Engine {
    pub fn open(index_dir: &Path, docs_path: &Path, normalizer: Arc<Normalizer>) -> vsearch_core::Result<Self> {
        let snapshot = Snapshot::open(&IndexPaths::new(index_dir))?;
        let docs = Collection::load(docs_path)?;
        if docs.len() != snapshot.meta().num_docs as usize {
            tracing::warn!(
                collection = docs.len(),
                indexed = snapshot.meta().num_docs,
                "collection size differs from the indexed snapshot"
            );
        }
        Ok(Self { snapshot, docs, normalizer })
    }

    pub fn snapshot_name(&self) -> &str {
        self.snapshot.name()
    }

    pub fn docs(&self) -> &Collection {
        &self.docs
    }

    pub fn search(&self, query: &str, page: usize) -> Result<SearchResponse, ApiError> {
        if page == 0 {
            return Err(ApiError::BadRequest("page numbers start at 1".into()));
        }
        let start = Instant::now();
        let vq = vectorize(&self.normalizer, query, &self.snapshot)?;
        let scores = score(&vq.vector, &self.snapshot)?;
        let total_hits = scores.len();
        let results = page_of(scores, page, RESULTS_PER_PAGE)
            .into_iter()
            .map(|r| self.decorate(r))
            .collect();
        let elapsed = start.elapsed();
        tracing::debug!(query, page, total_hits, took_s = elapsed.as_secs_f64(), "search");
        Ok(SearchResponse {
            query: query.to_string(),
            page,
            took_s: elapsed.as_secs_f64(),
            total_hits,
            stopwords: vq.stopwords,
            unknown_terms: vq.unknown,
            results,
        })
    }

    /// Query with a document's own title and text.
    pub fn more_like_this(&self, doc_id: DocId, page: usize) -> Result<SearchResponse, ApiError> {
        let doc = self
            .docs
            .get(doc_id)
            .ok_or_else(|| ApiError::NotFound(format!("document {doc_id} not found")))?;
        self.search(&doc.query_text(), page)
    }

    fn decorate(&self, r: Ranked) -> SearchHit {
        let (title, snippet) = match self.docs.get(r.doc_id) {
            Some(doc) => (doc.canonical_title().to_string(), Some(highlight_terms(&doc.snippet(), &r.matched))),
            None => {
                tracing::warn!(doc_id = r.doc_id, "ranked document missing from collection");
                (String::new(), None)
            }
        };
        SearchHit { doc_id: r.doc_id, score: r.score, matched_terms: r.matched, title, snippet }
    }
}

/// Wrap whole-word, case-insensitive occurrences of each term in `<em>`.
pub fn highlight_terms(snippet: &str, terms: &[String]) -> String {
    let mut s = snippet.to_string();
    for t in terms {
        if t.trim().is_empty() {
            continue;
        }
        let Ok(pat) = regex::RegexBuilder::new(&format!(r"\b{}\b", regex::escape(t)))
            .case_insensitive(true)
            .build()
        else {
            continue;
        };
        s = pat.replace_all(&s, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).to_string();
    }
    s
}
