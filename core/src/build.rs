//! Offline build: collection → normalized counts → inverted index →
//! tf-idf weights → document norms.

use crate::document::Collection;
use crate::error::{Result, SearchError};
use crate::index::{term_counts, InvertedIndex, TermCounts};
use crate::norms::{document_norms, DocNorms};
use crate::source::IndexSource;
use crate::tokenizer::Normalizer;
use crate::{DocId, Posting};

/// A fully weighted index together with its norm table.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltIndex {
    pub index: InvertedIndex,
    pub norms: DocNorms,
}

pub fn build(normalizer: &Normalizer, collection: &Collection) -> Result<BuiltIndex> {
    if collection.is_empty() {
        return Err(SearchError::EmptyCollection);
    }
    let mut counts: Vec<TermCounts> = Vec::with_capacity(collection.len());
    for (doc_id, doc) in collection.iter() {
        if doc.title.is_empty() {
            return Err(SearchError::malformed(doc_id, "Title list is empty"));
        }
        counts.push(term_counts(normalizer, doc));
    }

    let mut index = InvertedIndex::from_term_counts(&counts);
    tracing::info!(num_docs = index.num_docs, num_terms = index.num_terms(), "ingested documents");

    // idf needs every posting list complete, so weighting and norms run last
    index.apply_tfidf();
    let norms = document_norms(&counts, &index);

    let empty = norms.values().filter(|&&n| n == 0.0).count();
    if empty > 0 {
        tracing::warn!(documents = empty, "documents with a zero-length vector can never match");
    }
    Ok(BuiltIndex { index, norms })
}

impl IndexSource for BuiltIndex {
    fn num_docs(&self) -> u32 {
        self.index.num_docs
    }

    fn postings(&self, term: &str) -> Result<Option<Vec<Posting>>> {
        Ok(self.index.get(term).map(<[Posting]>::to_vec))
    }

    fn norm(&self, doc_id: DocId) -> Result<Option<f64>> {
        Ok(self.norms.get(&doc_id).copied())
    }

    fn df(&self, term: &str) -> Result<usize> {
        Ok(self.index.df(term))
    }
}
