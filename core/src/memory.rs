//! In-process [`Collection`] with optional JSON snapshot persistence.
//!
//! # Design
//! Documents live in a `BTreeMap` keyed by id, so iteration follows creation
//! order. Every mutation is staged on a copy of the map and only replaces the
//! live map once it has fully applied and, when a snapshot path is
//! configured, once the copy has been written to disk. The write lock is held
//! throughout, so a failed mutation leaves neither memory nor file changed and
//! readers never observe a state newer than the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::id::ObjectId;
use crate::store::{document_id, Collection, Document, Filter, Update, ID_FIELD};

pub struct MemoryCollection {
    name: String,
    docs: RwLock<BTreeMap<ObjectId, Document>>,
    snapshot: Option<PathBuf>,
}

impl MemoryCollection {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            docs: RwLock::new(BTreeMap::new()),
            snapshot: None,
        }
    }

    /// Opens a collection persisted at `path`. A missing file starts empty;
    /// an unreadable or malformed one is an error.
    pub async fn open(name: &str, path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let docs = match tokio::fs::read(&path).await {
            Ok(bytes) => decode_snapshot(&path, &bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::SnapshotRead { path, source }),
        };
        tracing::debug!(collection = name, documents = docs.len(), path = %path.display(), "opened snapshot");
        Ok(Self {
            name: name.to_string(),
            docs: RwLock::new(docs),
            snapshot: Some(path),
        })
    }

    async fn persist(&self, docs: &BTreeMap<ObjectId, Document>) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let all: Vec<&Document> = docs.values().collect();
        let bytes = serde_json::to_vec_pretty(&all).map_err(|source| StoreError::SnapshotEncode {
            path: path.clone(),
            source,
        })?;
        // Written beside the target, then renamed over it.
        let tmp = path.with_extension("json.tmp");
        let write_err = |source| StoreError::SnapshotWrite {
            path: path.clone(),
            source,
        };
        tokio::fs::write(&tmp, bytes).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(write_err)
    }

    /// Persists `staged` and, on success, installs it as the live map.
    async fn commit(
        &self,
        live: &mut BTreeMap<ObjectId, Document>,
        staged: BTreeMap<ObjectId, Document>,
    ) -> Result<(), StoreError> {
        self.persist(&staged).await?;
        *live = staged;
        Ok(())
    }

    fn apply(&self, id: &ObjectId, doc: &mut Document, update: &Update) -> Result<(), StoreError> {
        match update {
            Update::Set(fields) => {
                for (key, value) in fields {
                    if key != ID_FIELD {
                        doc.insert(key.clone(), value.clone());
                    }
                }
            }
            Update::AddToSet { field, value } => {
                let items = self.array_mut(id, doc, field)?;
                let hex = value.to_hex();
                if !items.iter().any(|v| v.as_str() == Some(hex.as_str())) {
                    items.push(Value::String(hex));
                }
            }
            Update::Pull { field, value } => {
                if doc.get(field).is_some_and(|v| !v.is_null()) {
                    let items = self.array_mut(id, doc, field)?;
                    let hex = value.to_hex();
                    items.retain(|v| v.as_str() != Some(hex.as_str()));
                }
            }
        }
        Ok(())
    }

    fn array_mut<'a>(
        &self,
        id: &ObjectId,
        doc: &'a mut Document,
        field: &str,
    ) -> Result<&'a mut Vec<Value>, StoreError> {
        let slot = doc
            .entry(field.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if slot.is_null() {
            *slot = Value::Array(Vec::new());
        }
        slot.as_array_mut().ok_or_else(|| StoreError::NotAnArray {
            collection: self.name.clone(),
            id: id.to_hex(),
            field: field.to_string(),
        })
    }

    async fn update(&self, filter: &Filter, update: &Update, many: bool) -> Result<u64, StoreError> {
        let mut docs = self.docs.write().await;
        let mut staged = docs.clone();
        let mut matched = 0;
        for (id, doc) in staged.iter_mut().filter(|(id, _)| filter.matches(id)) {
            self.apply(id, doc, update)?;
            matched += 1;
            if !many {
                break;
            }
        }
        if staged != *docs {
            self.commit(&mut docs, staged).await?;
        }
        Ok(matched)
    }
}

fn decode_snapshot(path: &Path, bytes: &[u8]) -> Result<BTreeMap<ObjectId, Document>, StoreError> {
    let all: Vec<Document> =
        serde_json::from_slice(bytes).map_err(|source| StoreError::SnapshotDecode {
            path: path.to_path_buf(),
            source,
        })?;
    all.into_iter()
        .map(|doc| {
            let id = document_id(&doc).ok_or_else(|| StoreError::SnapshotMissingId {
                path: path.to_path_buf(),
            })?;
            Ok((id, doc))
        })
        .collect()
}

#[async_trait]
impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .filter(|(id, _)| filter.matches(id))
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    async fn insert_one(&self, mut doc: Document) -> Result<ObjectId, StoreError> {
        let id = ObjectId::new();
        doc.insert(ID_FIELD.to_string(), Value::String(id.to_hex()));
        let mut docs = self.docs.write().await;
        let mut staged = docs.clone();
        staged.insert(id, doc);
        self.commit(&mut docs, staged).await?;
        Ok(id)
    }

    async fn update_one(&self, filter: &Filter, update: &Update) -> Result<u64, StoreError> {
        self.update(filter, update, false).await
    }

    async fn update_many(&self, filter: &Filter, update: &Update) -> Result<u64, StoreError> {
        self.update(filter, update, true).await
    }

    async fn delete_many(&self, filter: &Filter) -> Result<u64, StoreError> {
        let mut docs = self.docs.write().await;
        let mut staged = docs.clone();
        staged.retain(|id, _| !filter.matches(id));
        let removed = (docs.len() - staged.len()) as u64;
        if removed > 0 {
            self.commit(&mut docs, staged).await?;
        }
        Ok(removed)
    }

    async fn find_one_and_delete(&self, filter: &Filter) -> Result<Option<Document>, StoreError> {
        let mut docs = self.docs.write().await;
        let Some(id) = docs.keys().find(|id| filter.matches(id)).copied() else {
            return Ok(None);
        };
        let mut staged = docs.clone();
        let removed = staged.remove(&id);
        self.commit(&mut docs, staged).await?;
        Ok(removed)
    }
}
