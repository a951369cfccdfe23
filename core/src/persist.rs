//! Snapshot persistence on sled.
//!
//! Layout under the index root:
//!
//! ```text
//! CURRENT                     name of the live snapshot
//! snapshots/<name>/db/        sled database: trees "postings" and "norms"
//! snapshots/<name>/meta.json  MetaFile
//! ```
//!
//! A build writes a complete new snapshot, then replaces `CURRENT` with a
//! temp-file + rename, so readers only ever resolve a finished snapshot.

use crate::build::BuiltIndex;
use crate::error::{Result, SearchError};
use crate::index::InvertedIndex;
use crate::norms::DocNorms;
use crate::source::IndexSource;
use crate::{DocId, Posting};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;
pub const POSTINGS_TREE: &str = "postings";
pub const NORMS_TREE: &str = "norms";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u64,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn current(&self) -> PathBuf { self.root.join("CURRENT") }
    fn current_tmp(&self) -> PathBuf { self.root.join("CURRENT.tmp") }
    fn snapshots_dir(&self) -> PathBuf { self.root.join("snapshots") }
    pub fn snapshot(&self, name: &str) -> PathBuf { self.snapshots_dir().join(name) }
    fn db(&self, name: &str) -> PathBuf { self.snapshot(name).join("db") }
    fn meta(&self, name: &str) -> PathBuf { self.snapshot(name).join("meta.json") }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Create,
    Read,
}

/// Byte encoding for store keys.
pub trait StoreKey: Sized {
    fn to_key(&self) -> Vec<u8>;
    fn from_key(bytes: &[u8]) -> Option<Self>;
}

impl StoreKey for String {
    fn to_key(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
    fn from_key(bytes: &[u8]) -> Option<Self> {
        String::from_utf8(bytes.to_vec()).ok()
    }
}

impl StoreKey for DocId {
    // big-endian so sled's byte order matches numeric order
    fn to_key(&self) -> Vec<u8> {
        self.to_be_bytes().to_vec()
    }
    fn from_key(bytes: &[u8]) -> Option<Self> {
        Some(DocId::from_be_bytes(bytes.try_into().ok()?))
    }
}

/// Typed key-value view of one sled tree; values are bincode encoded.
pub struct KvStore<K, V> {
    name: String,
    tree: sled::Tree,
    mode: OpenMode,
    _types: PhantomData<fn() -> (K, V)>,
}

impl<K: StoreKey, V: Serialize + DeserializeOwned> KvStore<K, V> {
    pub fn open(db: &sled::Db, name: &str, mode: OpenMode) -> Result<Self> {
        if mode == OpenMode::Read && !db.tree_names().iter().any(|n| &**n == name.as_bytes()) {
            return Err(SearchError::unavailable(format!("store '{name}' does not exist")));
        }
        let tree = db.open_tree(name)?;
        Ok(Self { name: name.to_string(), tree, mode, _types: PhantomData })
    }

    pub fn get(&self, key: &K) -> Result<Option<V>> {
        match self.tree.get(key.to_key())? {
            Some(bytes) => {
                let value = bincode::deserialize(&bytes).map_err(|e| {
                    SearchError::unavailable(format!("corrupt value in store '{}': {e}", self.name))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub fn put(&self, key: &K, value: &V) -> Result<()> {
        if self.mode == OpenMode::Read {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, format!("store '{}' is read-only", self.name)).into());
        }
        let bytes = bincode::serialize(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        self.tree.insert(key.to_key(), bytes)?;
        Ok(())
    }

    /// All keys in byte order.
    pub fn keys(&self) -> Result<Vec<K>> {
        let mut keys = Vec::with_capacity(self.tree.len());
        for key in self.tree.iter().keys() {
            let key = key?;
            let decoded = K::from_key(&key)
                .ok_or_else(|| SearchError::unavailable(format!("corrupt key in store '{}'", self.name)))?;
            keys.push(decoded);
        }
        Ok(keys)
    }

    pub(crate) fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn close(self) -> Result<()> {
        if self.mode == OpenMode::Create {
            self.tree.flush()?;
        }
        Ok(())
    }
}

pub fn save_meta(paths: &IndexPaths, name: &str, meta: &MetaFile) -> Result<()> {
    let mut f = File::create(paths.meta(name))?;
    let json = serde_json::to_string_pretty(meta).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    f.write_all(json.as_bytes())?;
    f.sync_all()?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths, name: &str) -> Result<MetaFile> {
    let mut f = File::open(paths.meta(name))
        .map_err(|e| SearchError::unavailable(format!("snapshot '{name}' has no meta.json: {e}")))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    serde_json::from_str(&buf).map_err(|e| SearchError::unavailable(format!("snapshot '{name}' meta.json is corrupt: {e}")))
}

/// Name of the live snapshot, if one was ever published.
pub fn current_snapshot(paths: &IndexPaths) -> Result<String> {
    match fs::read_to_string(paths.current()) {
        Ok(name) if !name.trim().is_empty() => Ok(name.trim().to_string()),
        Ok(_) => Err(SearchError::unavailable("CURRENT is empty")),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(SearchError::unavailable(format!("no index published under {}", paths.root.display())))
        }
        Err(e) => Err(e.into()),
    }
}

/// Write `built` as a new snapshot and make it live. Returns the snapshot name.
///
/// Keeps the newest `keep` snapshots (at least the live one) and removes older ones.
pub fn publish(paths: &IndexPaths, built: &BuiltIndex, keep: usize) -> Result<String> {
    fs::create_dir_all(paths.snapshots_dir())?;
    let name = fresh_snapshot_name(paths);
    fs::create_dir_all(paths.snapshot(&name))?;

    {
        let db = sled::open(paths.db(&name))?;
        let postings: KvStore<String, Vec<Posting>> = KvStore::open(&db, POSTINGS_TREE, OpenMode::Create)?;
        for (term, plist) in &built.index.postings {
            postings.put(term, plist)?;
        }
        let norms: KvStore<DocId, f64> = KvStore::open(&db, NORMS_TREE, OpenMode::Create)?;
        for (doc_id, norm) in &built.norms {
            norms.put(doc_id, norm)?;
        }
        postings.close()?;
        norms.close()?;
        db.flush()?;
    }

    let meta = MetaFile {
        num_docs: built.index.num_docs,
        num_terms: built.index.num_terms() as u64,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: FORMAT_VERSION,
    };
    save_meta(paths, &name, &meta)?;

    {
        let mut f = File::create(paths.current_tmp())?;
        f.write_all(name.as_bytes())?;
        f.sync_all()?;
    }
    fs::rename(paths.current_tmp(), paths.current())?;
    tracing::info!(snapshot = %name, num_docs = meta.num_docs, num_terms = meta.num_terms, "published index snapshot");

    prune_snapshots(paths, &name, keep.max(1));
    Ok(name)
}

fn fresh_snapshot_name(paths: &IndexPaths) -> String {
    let mut stamp = time::OffsetDateTime::now_utc().unix_timestamp_nanos().max(0);
    loop {
        let name = format!("{stamp:024}");
        if !paths.snapshot(&name).exists() {
            return name;
        }
        stamp += 1;
    }
}

/// Remove all but the newest `keep` snapshots. The live one always stays.
fn prune_snapshots(paths: &IndexPaths, live: &str, keep: usize) {
    let mut names: Vec<String> = match fs::read_dir(paths.snapshots_dir()) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "cannot list snapshots for pruning");
            return;
        }
    };
    names.sort_unstable_by(|a, b| b.cmp(a));
    for name in names.iter().skip(keep).filter(|n| n.as_str() != live) {
        match fs::remove_dir_all(paths.snapshot(name)) {
            Ok(()) => tracing::debug!(snapshot = %name, "pruned snapshot"),
            Err(e) => tracing::warn!(snapshot = %name, error = %e, "failed to prune snapshot"),
        }
    }
}

/// Read-only handle on the live snapshot. Cheap to share across threads.
pub struct Snapshot {
    name: String,
    meta: MetaFile,
    postings: KvStore<String, Vec<Posting>>,
    norms: KvStore<DocId, f64>,
    _db: sled::Db,
}

impl Snapshot {
    pub fn open(paths: &IndexPaths) -> Result<Self> {
        let name = current_snapshot(paths)?;
        let meta = load_meta(paths, &name)?;
        if meta.version != FORMAT_VERSION {
            return Err(SearchError::unavailable(format!(
                "snapshot '{name}' has format version {}, expected {FORMAT_VERSION}",
                meta.version
            )));
        }
        let db_path = paths.db(&name);
        if !db_path.is_dir() {
            return Err(SearchError::unavailable(format!("snapshot '{name}' has no database")));
        }
        let db = sled::open(db_path)?;
        let postings: KvStore<String, Vec<Posting>> = KvStore::open(&db, POSTINGS_TREE, OpenMode::Read)?;
        let norms: KvStore<DocId, f64> = KvStore::open(&db, NORMS_TREE, OpenMode::Read)?;
        if postings.len() as u64 != meta.num_terms || norms.len() != meta.num_docs as usize {
            return Err(SearchError::unavailable(format!(
                "snapshot '{name}' holds {} terms and {} norms, meta.json records {} and {}",
                postings.len(),
                norms.len(),
                meta.num_terms,
                meta.num_docs
            )));
        }
        tracing::info!(snapshot = %name, num_docs = meta.num_docs, num_terms = meta.num_terms, "opened index snapshot");
        Ok(Self { name, meta, postings, norms, _db: db })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meta(&self) -> &MetaFile {
        &self.meta
    }

    pub fn contains_term(&self, term: &str) -> Result<bool> {
        Ok(self.postings.tree.contains_key(term.as_bytes())?)
    }

    /// Materialize the whole snapshot in memory.
    pub fn load_all(&self) -> Result<BuiltIndex> {
        let mut index = InvertedIndex { num_docs: self.meta.num_docs, ..InvertedIndex::default() };
        for term in self.postings.keys()? {
            let plist = self.postings.get(&term)?.unwrap_or_default();
            index.postings.insert(term, plist);
        }
        let mut norms = DocNorms::new();
        for doc_id in self.norms.keys()? {
            if let Some(norm) = self.norms.get(&doc_id)? {
                norms.insert(doc_id, norm);
            }
        }
        Ok(BuiltIndex { index, norms })
    }
}

impl IndexSource for Snapshot {
    fn num_docs(&self) -> u32 {
        self.meta.num_docs
    }

    fn postings(&self, term: &str) -> Result<Option<Vec<Posting>>> {
        self.postings.get(&term.to_string())
    }

    fn norm(&self, doc_id: DocId) -> Result<Option<f64>> {
        self.norms.get(&doc_id)
    }
}
