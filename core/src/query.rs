//! Query vectorization.
//!
//! Query tokens are counted by stem, so `Cats cats` is a single term with
//! frequency 2. The first surface form seen names the term in results.

use crate::error::{Result, SearchError};
use crate::index::{idf, tf};
use crate::source::IndexSource;
use crate::tokenizer::{is_punctuation, tokenize, Normalizer};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryTerm {
    /// Surface form as typed, used for display.
    pub surface: String,
    /// Normalized stem used for index lookups.
    pub term: String,
    pub frequency: u32,
    pub weight: f64,
}

/// Matched query terms ordered by surface form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryVector {
    terms: Vec<QueryTerm>,
}

impl QueryVector {
    pub fn new(mut terms: Vec<QueryTerm>) -> Self {
        terms.sort_by(|a, b| a.surface.cmp(&b.surface).then_with(|| a.term.cmp(&b.term)));
        Self { terms }
    }

    pub fn terms(&self) -> &[QueryTerm] {
        &self.terms
    }

    pub fn weight(&self, surface: &str) -> Option<f64> {
        self.terms.iter().find(|t| t.surface == surface).map(|t| t.weight)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// A vectorized query plus the terms that were filtered out of it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorizedQuery {
    pub vector: QueryVector,
    pub stopwords: Vec<String>,
    pub unknown: Vec<String>,
}

impl VectorizedQuery {
    pub fn matched_terms(&self) -> impl Iterator<Item = &str> {
        self.vector.terms().iter().map(|t| t.surface.as_str())
    }
}

pub fn vectorize<S: IndexSource + ?Sized>(normalizer: &Normalizer, raw_query: &str, source: &S) -> Result<VectorizedQuery> {
    let num_docs = source.num_docs();
    if num_docs == 0 {
        return Err(SearchError::unavailable("index holds no documents"));
    }

    let mut out = VectorizedQuery::default();
    // stem -> (first surface, count), in first-seen order
    let mut counted: Vec<(String, String, u32)> = Vec::new();
    let mut slot: HashMap<String, usize> = HashMap::new();

    for surface in tokenize(raw_query) {
        if is_punctuation(&surface) {
            continue;
        }
        let lowered = surface.to_lowercase();
        // same test documents get: the unstemmed lowercase form
        if normalizer.is_stopword(&lowered) {
            if !out.stopwords.contains(&surface) {
                out.stopwords.push(surface);
            }
            continue;
        }
        let stem = normalizer.stem(&lowered);
        if stem.is_empty() {
            if !out.stopwords.contains(&surface) {
                out.stopwords.push(surface);
            }
            continue;
        }
        match slot.get(&stem) {
            Some(&i) => counted[i].2 += 1,
            None => {
                slot.insert(stem.clone(), counted.len());
                counted.push((stem, surface, 1));
            }
        }
    }

    let mut terms = Vec::with_capacity(counted.len());
    for (term, surface, frequency) in counted {
        let df = source.df(&term)?;
        if df == 0 {
            out.unknown.push(surface);
            continue;
        }
        let weight = tf(frequency) * idf(num_docs, df);
        terms.push(QueryTerm { surface, term, frequency, weight });
    }
    out.vector = QueryVector::new(terms);

    tracing::debug!(
        matched = out.vector.len(),
        stopwords = out.stopwords.len(),
        unknown = out.unknown.len(),
        "vectorized query"
    );
    Ok(out)
}
