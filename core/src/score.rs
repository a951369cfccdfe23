use crate::error::{Result, SearchError};
use crate::query::QueryVector;
use crate::source::IndexSource;
use crate::DocId;
use std::collections::BTreeMap;

/// Accumulated similarity for one document and the query terms that hit it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hit {
    pub score: f64,
    pub matched: Vec<String>,
}

pub type ScoreMap = BTreeMap<DocId, Hit>;

/// Cosine accumulation over the posting lists of the query terms.
///
/// Only documents that share at least one term with the query appear in
/// the result. The query norm is omitted; it is constant across documents.
pub fn score<S: IndexSource + ?Sized>(query: &QueryVector, source: &S) -> Result<ScoreMap> {
    let mut acc = ScoreMap::new();
    for qt in query.terms() {
        let Some(plist) = source.postings(&qt.term)? else {
            continue;
        };
        for p in plist {
            let norm = source
                .norm(p.doc_id)?
                .ok_or_else(|| SearchError::unavailable(format!("no norm stored for document {}", p.doc_id)))?;
            if norm <= 0.0 {
                tracing::debug!(doc_id = p.doc_id, "skipping zero-norm document");
                continue;
            }
            let hit = acc.entry(p.doc_id).or_default();
            hit.score += p.weight * qt.weight / norm;
            hit.matched.push(qt.surface.clone());
        }
    }
    Ok(acc)
}
