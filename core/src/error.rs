use crate::DocId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("document {doc_id} is malformed: {reason}")]
    MalformedDocument { doc_id: DocId, reason: String },

    #[error("cannot build an index from an empty collection")]
    EmptyCollection,

    #[error("index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("invalid collection: {0}")]
    InvalidCollection(String),

    #[error(transparent)]
    Storage(#[from] sled::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SearchError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedDocument { .. } => "MALFORMED_DOCUMENT",
            Self::EmptyCollection => "EMPTY_COLLECTION",
            Self::IndexUnavailable(_) => "INDEX_UNAVAILABLE",
            Self::InvalidCollection(_) => "INVALID_COLLECTION",
            Self::Storage(_) | Self::Io(_) => "STORAGE_FAILURE",
        }
    }

    /// True for errors raised by the underlying store or filesystem.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io(_))
    }

    pub(crate) fn malformed(doc_id: DocId, reason: impl Into<String>) -> Self {
        Self::MalformedDocument { doc_id, reason: reason.into() }
    }

    pub(crate) fn unavailable(reason: impl Into<String>) -> Self {
        Self::IndexUnavailable(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_kinds_share_a_code() {
        let io = SearchError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(io.is_storage_failure());
        assert_eq!(io.code(), "STORAGE_FAILURE");
        assert!(!SearchError::EmptyCollection.is_storage_failure());
        assert_eq!(SearchError::malformed(3, "no title").code(), "MALFORMED_DOCUMENT");
    }
}
