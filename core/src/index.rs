use crate::document::Document;
use crate::tokenizer::{tokenize, Normalizer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type DocId = u32;

/// Term → raw occurrence count within one document.
pub type TermCounts = BTreeMap<String, u32>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub weight: f64, // raw frequency until apply_tfidf, tf-idf after
}

/// Log-dampened term frequency, `log2(f + 1)`.
pub fn tf(freq: u32) -> f64 {
    (freq as f64 + 1.0).log2()
}

/// `log2(N / df)`; zero when the term is in every document.
pub fn idf(num_docs: u32, df: usize) -> f64 {
    (num_docs as f64 / df as f64).log2()
}

/// Normalize title and body and count each term. Title and body are
/// tokenized separately so the last title word never fuses with the body.
pub fn term_counts(normalizer: &Normalizer, doc: &Document) -> TermCounts {
    let mut tokens = tokenize(doc.canonical_title());
    tokens.extend(tokenize(&doc.text));
    let mut counts = TermCounts::new();
    for term in normalizer.normalize(&tokens) {
        *counts.entry(term).or_insert(0) += 1;
    }
    counts
}

/// Term → posting list. Lists are in ascending doc id order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvertedIndex {
    pub postings: BTreeMap<String, Vec<Posting>>,
    pub num_docs: u32,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invert per-document counts; the document at position `i` gets id `i + 1`.
    pub fn from_term_counts(counts: &[TermCounts]) -> Self {
        let mut postings: BTreeMap<String, Vec<Posting>> = BTreeMap::new();
        for (i, doc_counts) in counts.iter().enumerate() {
            let doc_id = i as DocId + 1;
            for (term, &freq) in doc_counts {
                if term.is_empty() {
                    continue;
                }
                postings
                    .entry(term.clone())
                    .or_default()
                    .push(Posting { doc_id, weight: freq as f64 });
            }
        }
        Self { postings, num_docs: counts.len() as u32 }
    }

    /// Replace raw frequencies with `tf * idf`. Needs the complete index.
    pub fn apply_tfidf(&mut self) {
        let n = self.num_docs;
        for plist in self.postings.values_mut() {
            let idf = idf(n, plist.len());
            for p in plist.iter_mut() {
                p.weight = tf(p.weight as u32) * idf;
            }
        }
    }

    pub fn df(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, Vec::len)
    }

    pub fn get(&self, term: &str) -> Option<&[Posting]> {
        self.postings.get(term).map(Vec::as_slice)
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, u32)]) -> TermCounts {
        pairs.iter().map(|&(t, f)| (t.to_string(), f)).collect()
    }

    #[test]
    fn invert_assigns_one_based_ids_in_order() {
        let idx = InvertedIndex::from_term_counts(&[counts(&[("cat", 2), ("anim", 1)]), counts(&[("anim", 1)])]);
        assert_eq!(idx.num_docs, 2);
        assert_eq!(idx.df("anim"), 2);
        assert_eq!(idx.df("cat"), 1);
        let ids: Vec<DocId> = idx.get("anim").unwrap().iter().map(|p| p.doc_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(idx.get("cat").unwrap()[0].weight, 2.0);
    }

    #[test]
    fn empty_terms_are_not_indexed() {
        let idx = InvertedIndex::from_term_counts(&[counts(&[("", 3), ("dog", 1)])]);
        assert_eq!(idx.num_terms(), 1);
        assert!(idx.get("").is_none());
    }

    #[test]
    fn tfidf_uses_log2() {
        let mut idx = InvertedIndex::from_term_counts(&[counts(&[("cat", 2), ("anim", 1)]), counts(&[("anim", 1)])]);
        idx.apply_tfidf();
        let cat = idx.get("cat").unwrap()[0].weight;
        assert!((cat - 3f64.log2()).abs() < 1e-12);
        // present everywhere: no discrimination
        assert!(idx.get("anim").unwrap().iter().all(|p| p.weight == 0.0));
    }

    #[test]
    fn term_counts_include_title() {
        let n = Normalizer::english();
        let doc = Document::new("Cats", "Cats are animals. Cats sleep.");
        let c = term_counts(&n, &doc);
        assert_eq!(c.get("cat"), Some(&3));
        assert!(c.get("are").is_none());
        assert!(c.get(".").is_none());
    }
}
