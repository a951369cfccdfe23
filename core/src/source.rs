use crate::error::Result;
use crate::{DocId, Posting};

/// Read access to a weighted index and its norm table. Implemented by the
/// in-memory build output and by persisted snapshots.
pub trait IndexSource {
    fn num_docs(&self) -> u32;

    fn postings(&self, term: &str) -> Result<Option<Vec<Posting>>>;

    fn norm(&self, doc_id: DocId) -> Result<Option<f64>>;

    fn df(&self, term: &str) -> Result<usize> {
        Ok(self.postings(term)?.map_or(0, |p| p.len()))
    }
}
