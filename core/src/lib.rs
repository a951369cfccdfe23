//! Term-based vector-space retrieval: build a tf-idf inverted index over a
//! fixed collection once, then answer free-text queries by ranked cosine
//! similarity against a read-only snapshot.

pub mod build;
pub mod document;
pub mod error;
pub mod index;
pub mod norms;
pub mod persist;
pub mod query;
pub mod score;
pub mod source;
pub mod tokenizer;
pub mod topk;

pub use build::{build, BuiltIndex};
pub use document::{Collection, Document, DocumentView};
pub use error::{Result, SearchError};
pub use index::{DocId, InvertedIndex, Posting, TermCounts};
pub use norms::DocNorms;
pub use persist::{IndexPaths, Snapshot};
pub use query::{vectorize, QueryTerm, QueryVector, VectorizedQuery};
pub use score::{score, Hit, ScoreMap};
pub use source::IndexSource;
pub use tokenizer::Normalizer;
pub use topk::{page_of, top_k, Ranked};
