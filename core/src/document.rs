//! Raw document collection: loading, validation and the read-only lookup
//! used for titles, snippets and document pages.
//!
//! Collections are JSON objects keyed by 1-based id strings (`"1"`..`"N"`),
//! JSON arrays, or JSONL files with one record per line. Records carry a
//! `Title` list, a `Text` body and optional descriptive lists.

use crate::error::{Result, SearchError};
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Number of leading sentences shown as a result snippet.
pub const SNIPPET_SENTENCES: usize = 5;

#[derive(Debug, Default, Deserialize)]
struct RawRecord {
    #[serde(rename = "Title", default)]
    title: Option<Vec<String>>,
    #[serde(rename = "Text", default)]
    text: Option<String>,
    #[serde(rename = "Director", default)]
    director: Option<Vec<String>>,
    #[serde(rename = "Starring", default)]
    starring: Option<Vec<String>>,
    #[serde(rename = "Country", default)]
    country: Option<Vec<String>>,
    #[serde(rename = "Location", default)]
    location: Option<Vec<String>>,
}

/// A validated record. `title` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: Vec<String>,
    pub text: String,
    #[serde(default)]
    pub director: Vec<String>,
    #[serde(default)]
    pub starring: Vec<String>,
    #[serde(default)]
    pub country: Vec<String>,
    #[serde(default)]
    pub location: Vec<String>,
}

impl Document {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: vec![title.into()],
            text: text.into(),
            director: Vec::new(),
            starring: Vec::new(),
            country: Vec::new(),
            location: Vec::new(),
        }
    }

    fn from_record(doc_id: DocId, record: RawRecord) -> Result<Self> {
        let title = match record.title {
            Some(t) if !t.is_empty() => t,
            Some(_) => return Err(SearchError::malformed(doc_id, "Title list is empty")),
            None => return Err(SearchError::malformed(doc_id, "missing Title")),
        };
        let text = record.text.ok_or_else(|| SearchError::malformed(doc_id, "missing Text"))?;
        Ok(Self {
            title,
            text,
            director: record.director.unwrap_or_default(),
            starring: record.starring.unwrap_or_default(),
            country: record.country.unwrap_or_default(),
            location: record.location.unwrap_or_default(),
        })
    }

    /// First title entry, the one shown in result lists.
    pub fn canonical_title(&self) -> &str {
        self.title.first().map(String::as_str).unwrap_or_default()
    }

    /// Title followed by body, used as the query for "more like this".
    pub fn query_text(&self) -> String {
        format!("{} {}", self.canonical_title(), self.text)
    }

    /// The first few sentences of the body, or all of it when short.
    pub fn snippet(&self) -> String {
        let sents = sentences(&self.text);
        if sents.len() <= SNIPPET_SENTENCES {
            self.text.clone()
        } else {
            sents[..SNIPPET_SENTENCES].join(" ")
        }
    }

    pub fn view(&self, doc_id: DocId) -> DocumentView {
        DocumentView {
            doc_id,
            title: self.canonical_title().to_string(),
            director: self.director.join(", "),
            starring: self.starring.join(", "),
            country: self.country.join(", "),
            location: self.location.join(", "),
            text: self.text.clone(),
        }
    }
}

/// Display form of a document with list fields joined.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentView {
    pub doc_id: DocId,
    pub title: String,
    pub director: String,
    pub starring: String,
    pub country: String,
    pub location: String,
    pub text: String,
}

/// Split on `.`, `!` or `?` when followed by whitespace or end of text.
pub fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let at_break = chars.peek().map_or(true, |&(_, next)| next.is_whitespace());
        if at_break {
            let end = i + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                out.push(sentence);
            }
            start = end;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

/// Immutable, id-addressable document collection. Ids are 1-based and dense.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    docs: Vec<Document>,
}

impl Collection {
    pub fn from_documents(docs: Vec<Document>) -> Self {
        Self { docs }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let records = if path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(path)?
        } else {
            read_json(path)?
        };
        let docs = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| {
                let doc_id = i as DocId + 1;
                let record: RawRecord = serde_json::from_value(record)
                    .map_err(|e| SearchError::malformed(doc_id, e.to_string()))?;
                Document::from_record(doc_id, record)
            })
            .collect::<Result<Vec<_>>>()?;
        tracing::info!(path = %path.display(), num_docs = docs.len(), "loaded document collection");
        Ok(Self { docs })
    }

    pub fn get(&self, doc_id: DocId) -> Option<&Document> {
        let idx = (doc_id as usize).checked_sub(1)?;
        self.docs.get(idx)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocId, &Document)> {
        self.docs.iter().enumerate().map(|(i, d)| (i as DocId + 1, d))
    }
}

fn read_jsonl(path: &Path) -> Result<Vec<serde_json::Value>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value = serde_json::from_str(&line)
            .map_err(|e| SearchError::InvalidCollection(format!("line {}: {e}", lineno + 1)))?;
        records.push(value);
    }
    Ok(records)
}

fn read_json(path: &Path) -> Result<Vec<serde_json::Value>> {
    let reader = BufReader::new(File::open(path)?);
    let json: serde_json::Value =
        serde_json::from_reader(reader).map_err(|e| SearchError::InvalidCollection(e.to_string()))?;
    match json {
        serde_json::Value::Array(arr) => Ok(arr),
        serde_json::Value::Object(mut map) => {
            let n = map.len();
            let mut records = Vec::with_capacity(n);
            for doc_id in 1..=n {
                let record = map
                    .remove(&doc_id.to_string())
                    .ok_or_else(|| SearchError::malformed(doc_id as DocId, "id missing from collection"))?;
                records.push(record);
            }
            Ok(records)
        }
        _ => Err(SearchError::InvalidCollection("expected a JSON object or array".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentences_ignore_inner_dots() {
        let s = sentences("Mr. Smith waited... Then he left! Did he? Yes");
        assert_eq!(s, vec!["Mr.", "Smith waited...", "Then he left!", "Did he?", "Yes"]);
    }

    #[test]
    fn snippet_keeps_short_text_whole() {
        let doc = Document::new("T", "One. Two.");
        assert_eq!(doc.snippet(), "One. Two.");
    }

    #[test]
    fn snippet_truncates_to_five_sentences() {
        let doc = Document::new("T", "A. B. C. D. E. F. G.");
        assert_eq!(doc.snippet(), "A. B. C. D. E.");
    }

    #[test]
    fn view_joins_list_fields() {
        let mut doc = Document::new("Heat", "A heist.");
        doc.starring = vec!["Al Pacino".into(), "Robert De Niro".into()];
        let view = doc.view(7);
        assert_eq!(view.doc_id, 7);
        assert_eq!(view.title, "Heat");
        assert_eq!(view.starring, "Al Pacino, Robert De Niro");
        assert_eq!(view.director, "");
    }

    #[test]
    fn load_keyed_object_in_id_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.json");
        std::fs::write(
            &path,
            r#"{"2": {"Title": ["Dogs"], "Text": "Dogs bark."}, "1": {"Title": ["Cats"], "Text": "Cats sleep.", "Director": ["X"]}}"#,
        )
        .unwrap();
        let c = Collection::load(&path).unwrap();
        assert_eq!(c.len(), 2);
        assert_eq!(c.get(1).unwrap().canonical_title(), "Cats");
        assert_eq!(c.get(2).unwrap().canonical_title(), "Dogs");
        assert_eq!(c.get(1).unwrap().director, vec!["X"]);
        assert!(c.get(0).is_none());
        assert!(c.get(3).is_none());
    }

    #[test]
    fn load_rejects_gap_in_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.json");
        std::fs::write(&path, r#"{"1": {"Title": ["A"], "Text": "a"}, "3": {"Title": ["C"], "Text": "c"}}"#).unwrap();
        match Collection::load(&path) {
            Err(SearchError::MalformedDocument { doc_id, .. }) => assert_eq!(doc_id, 2),
            other => panic!("expected malformed document, got {other:?}"),
        }
    }

    #[test]
    fn load_jsonl_reports_record_without_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.jsonl");
        std::fs::write(&path, "{\"Title\": [\"A\"], \"Text\": \"a\"}\n\n{\"Title\": [\"B\"]}\n").unwrap();
        match Collection::load(&path) {
            Err(SearchError::MalformedDocument { doc_id, reason }) => {
                assert_eq!(doc_id, 2);
                assert!(reason.contains("Text"));
            }
            other => panic!("expected malformed document, got {other:?}"),
        }
    }
}
