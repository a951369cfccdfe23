//! Euclidean length of every document's tf-idf vector.

use crate::index::{idf, tf, DocId, InvertedIndex, TermCounts};
use std::collections::BTreeMap;

/// Doc id → norm.
pub type DocNorms = BTreeMap<DocId, f64>;

/// Compute norms from the per-document counts and the complete index.
///
/// Each weight is re-derived from the raw count and the final document
/// frequency, so the index may already hold tf-idf weights. A document
/// with no indexable terms gets norm 0.
pub fn document_norms(counts: &[TermCounts], index: &InvertedIndex) -> DocNorms {
    let n = index.num_docs;
    counts
        .iter()
        .enumerate()
        .map(|(i, doc_counts)| {
            let sum: f64 = doc_counts
                .iter()
                .filter_map(|(term, &freq)| {
                    let df = index.df(term);
                    (df > 0).then(|| (tf(freq) * idf(n, df)).powi(2))
                })
                .sum();
            (i as DocId + 1, sum.sqrt())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, u32)]) -> TermCounts {
        pairs.iter().map(|&(t, f)| (t.to_string(), f)).collect()
    }

    #[test]
    fn norm_is_vector_length() {
        let c = vec![counts(&[("cat", 2), ("sleep", 1), ("anim", 1)]), counts(&[("dog", 1), ("anim", 1)])];
        let mut idx = InvertedIndex::from_term_counts(&c);
        idx.apply_tfidf();
        let norms = document_norms(&c, &idx);
        let expected = (3f64.log2().powi(2) + 1.0).sqrt();
        assert!((norms[&1] - expected).abs() < 1e-12);
        assert!((norms[&2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn document_without_terms_has_zero_norm() {
        let c = vec![counts(&[("cat", 1)]), TermCounts::new()];
        let idx = InvertedIndex::from_term_counts(&c);
        let norms = document_norms(&c, &idx);
        assert_eq!(norms[&2], 0.0);
        assert_eq!(norms.len(), 2);
    }
}
