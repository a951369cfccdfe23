//! Partial top-k selection over accumulated scores.
//!
//! Order is descending score; equal scores rank the lower doc id first.

use crate::score::ScoreMap;
use crate::DocId;
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    pub doc_id: DocId,
    pub score: f64,
    pub matched: Vec<String>,
}

// Greater key ranks higher.
type RankKey = (OrderedFloat<f64>, Reverse<DocId>);

/// The `k` best results, best first. O(n log k) via a bounded min-heap.
pub fn top_k(mut results: ScoreMap, k: usize) -> Vec<Ranked> {
    if k == 0 {
        return Vec::new();
    }
    let mut heap: BinaryHeap<Reverse<RankKey>> = BinaryHeap::with_capacity(k.min(results.len()) + 1);
    for (&doc_id, hit) in &results {
        heap.push(Reverse((OrderedFloat(hit.score), Reverse(doc_id))));
        if heap.len() > k {
            heap.pop();
        }
    }
    let mut keys: Vec<RankKey> = heap.into_iter().map(|Reverse(key)| key).collect();
    keys.sort_unstable_by(|a, b| b.cmp(a));
    keys.into_iter()
        .filter_map(|(score, Reverse(doc_id))| {
            results.remove(&doc_id).map(|hit| Ranked { doc_id, score: score.0, matched: hit.matched })
        })
        .collect()
}

/// Results `(page - 1) * per_page .. page * per_page` of the ranking; `page` is 1-based.
pub fn page_of(results: ScoreMap, page: usize, per_page: usize) -> Vec<Ranked> {
    let page = page.max(1);
    let end = page.saturating_mul(per_page);
    top_k(results, end).into_iter().skip(end - per_page).collect()
}
