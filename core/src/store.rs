//! Document-collection capability shared by the `todos` and `tags` collections.
//!
//! # Design
//! Handlers never hold collection handles of their own. A [`Store`] is
//! constructed once and passed to every handler, so tests can hand in a
//! fresh in-memory store per case. Documents are plain JSON objects whose
//! internal identifier lives in [`ID_FIELD`] as a hex string.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::id::ObjectId;
use crate::memory::MemoryCollection;

/// Internal identifier field of a stored document.
pub const ID_FIELD: &str = "_id";

pub type Document = Map<String, Value>;

/// Selects the documents an operation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    Id(ObjectId),
    /// Matches documents whose id is any of the given ids.
    Ids(Vec<ObjectId>),
}

impl Filter {
    pub fn matches(&self, id: &ObjectId) -> bool {
        match self {
            Filter::All => true,
            Filter::Id(wanted) => wanted == id,
            Filter::Ids(wanted) => wanted.contains(id),
        }
    }
}

/// Mutation applied to every matched document.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Replace the given top-level fields, leaving the rest untouched.
    Set(Document),
    /// Append `value` to the array `field` unless already present.
    AddToSet { field: String, value: ObjectId },
    /// Remove every occurrence of `value` from the array `field`.
    Pull { field: String, value: ObjectId },
}

impl Update {
    pub fn set(field: &str, value: Value) -> Self {
        let mut fields = Document::new();
        fields.insert(field.to_string(), value);
        Update::Set(fields)
    }

    pub fn add_to_set(field: &str, value: ObjectId) -> Self {
        Update::AddToSet {
            field: field.to_string(),
            value,
        }
    }

    pub fn pull(field: &str, value: ObjectId) -> Self {
        Update::Pull {
            field: field.to_string(),
            value,
        }
    }
}

#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    /// Matching documents in id order, which is creation order except for
    /// ids minted in the same second by different processes.
    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, StoreError> {
        Ok(self.find(filter).await?.into_iter().next())
    }

    /// Stores `doc` under a freshly assigned id; any `_id` it carries is replaced.
    async fn insert_one(&self, doc: Document) -> Result<ObjectId, StoreError>;

    /// Applies `update` to the first match. Returns the number of matched documents.
    async fn update_one(&self, filter: &Filter, update: &Update) -> Result<u64, StoreError>;

    async fn update_many(&self, filter: &Filter, update: &Update) -> Result<u64, StoreError>;

    async fn delete_many(&self, filter: &Filter) -> Result<u64, StoreError>;

    async fn find_one_and_delete(&self, filter: &Filter) -> Result<Option<Document>, StoreError>;
}

/// The two collections the service works against.
#[derive(Clone)]
pub struct Store {
    pub todos: Arc<dyn Collection>,
    pub tags: Arc<dyn Collection>,
}

impl Store {
    pub fn new(todos: Arc<dyn Collection>, tags: Arc<dyn Collection>) -> Self {
        Self { todos, tags }
    }

    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryCollection::new("todos")),
            Arc::new(MemoryCollection::new("tags")),
        )
    }

    /// A store persisted as `todos.json` and `tags.json` under `dir`.
    pub async fn open_dir(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| StoreError::SnapshotWrite {
                path: dir.to_path_buf(),
                source,
            })?;
        let todos = MemoryCollection::open("todos", dir.join("todos.json")).await?;
        let tags = MemoryCollection::open("tags", dir.join("tags.json")).await?;
        Ok(Self::new(Arc::new(todos), Arc::new(tags)))
    }
}

/// Reads the internal id of a stored document.
pub fn document_id(doc: &Document) -> Option<ObjectId> {
    doc.get(ID_FIELD)?.as_str()?.parse().ok()
}

/// Reads an array of id strings, skipping entries that are not valid ids.
pub fn id_list(doc: &Document, field: &str) -> Vec<ObjectId> {
    doc.get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str()?.parse().ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Fetches the documents for `ids` in the order given, skipping ids with no
/// document.
pub async fn find_ordered(
    collection: &dyn Collection,
    ids: Vec<ObjectId>,
) -> Result<Vec<Document>, StoreError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut found: HashMap<ObjectId, Document> = collection
        .find(&Filter::Ids(ids.clone()))
        .await?
        .into_iter()
        .filter_map(|doc| Some((document_id(&doc)?, doc)))
        .collect();
    Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
}

pub fn id_array(ids: &[ObjectId]) -> Value {
    Value::Array(ids.iter().map(|id| Value::String(id.to_hex())).collect())
}
