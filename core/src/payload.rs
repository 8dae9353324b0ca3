//! Validation of identifiers and reference arrays arriving from clients.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::id::ObjectId;
use crate::store::{document_id, Collection, Document, Filter, ID_FIELD};

/// A malformed path identifier can never match a document, so it reads as
/// not found rather than as a bad request.
pub(crate) fn path_id(resource: &'static str, raw: &str) -> Result<ObjectId> {
    raw.parse().map_err(|_| Error::not_found(resource, raw))
}

/// Drops client-supplied identity fields; ids are assigned by the store.
pub(crate) fn strip_identity(payload: &mut Document) {
    payload.remove(ID_FIELD);
    payload.remove("id");
}

/// Parses an array of identifier strings, dropping duplicates. `null` reads
/// as empty.
pub(crate) fn id_array(value: &Value, field: &str) -> Result<Vec<ObjectId>> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        _ => {
            return Err(Error::BadRequest(format!(
                "`{field}` must be an array of identifiers"
            )))
        }
    };
    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        let raw = item.as_str().ok_or_else(|| {
            Error::BadRequest(format!("`{field}` must contain identifier strings"))
        })?;
        let id: ObjectId = raw
            .parse()
            .map_err(|err| Error::BadRequest(format!("invalid identifier in `{field}`: {err}")))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Keeps the ids that name an existing document in `collection`, in their
/// requested order.
pub(crate) async fn existing(collection: &dyn Collection, ids: Vec<ObjectId>) -> Result<Vec<ObjectId>> {
    if ids.is_empty() {
        return Ok(ids);
    }
    let found: Vec<ObjectId> = collection
        .find(&Filter::Ids(ids.clone()))
        .await?
        .iter()
        .filter_map(document_id)
        .collect();
    let (kept, dropped): (Vec<ObjectId>, Vec<ObjectId>) =
        ids.into_iter().partition(|id| found.contains(id));
    if !dropped.is_empty() {
        tracing::warn!(
            collection = collection.name(),
            dropped = dropped.len(),
            "ignoring references to missing documents"
        );
    }
    Ok(kept)
}
