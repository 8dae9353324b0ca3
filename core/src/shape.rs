//! Stored-document to wire-document transforms.
//!
//! Every wire document carries its identifier as `id`; the internal `_id`
//! field never leaves this module. Related tags are looked up by id, listed
//! in the order the todo references them, and silently skipped when they no
//! longer exist.

use serde_json::{json, Value};

use crate::error::StoreError;
use crate::store::{document_id, find_ordered, id_list, Collection, Document, ID_FIELD};

/// Builds absolute resource links, e.g. `http://localhost:8080/todos/<id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Links {
    base: String,
}

impl Links {
    /// `host` is the authority clients used to reach the service.
    pub fn for_host(host: &str) -> Self {
        Self {
            base: format!("http://{}", host.trim_end_matches('/')),
        }
    }

    pub fn resource(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}", self.base)
    }
}

/// How a todo's `tags` array is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagExpansion {
    /// Leave the identifiers as they are.
    Ids,
    /// `{id, title}` per referenced tag.
    Summary,
    /// The full shaped tag document per referenced tag.
    Full,
}

/// Renames `_id` to `id` and, when `link` names a collection, adds `url`.
pub fn shape(mut doc: Document, link: Option<(&Links, &str)>) -> Value {
    let id = doc.remove(ID_FIELD).unwrap_or(Value::Null);
    if let (Some((links, collection)), Some(hex)) = (link, id.as_str()) {
        doc.insert(
            "url".to_string(),
            Value::String(links.resource(collection, hex)),
        );
    }
    doc.insert("id".to_string(), id);
    Value::Object(doc)
}

pub fn shape_all(docs: Vec<Document>, link: Option<(&Links, &str)>) -> Vec<Value> {
    docs.into_iter().map(|doc| shape(doc, link)).collect()
}

/// Shapes a todo, replacing its tag identifiers according to `expansion`.
pub async fn shape_todo(
    mut todo: Document,
    tags: &dyn Collection,
    expansion: TagExpansion,
    links: Option<&Links>,
) -> Result<Value, StoreError> {
    if expansion != TagExpansion::Ids {
        let expanded = expand_tags(&todo, tags, expansion).await?;
        todo.insert("tags".to_string(), Value::Array(expanded));
    }
    Ok(shape(todo, links.map(|l| (l, "todos"))))
}

async fn expand_tags(
    todo: &Document,
    tags: &dyn Collection,
    expansion: TagExpansion,
) -> Result<Vec<Value>, StoreError> {
    let found = find_ordered(tags, id_list(todo, "tags")).await?;
    Ok(found
        .into_iter()
        .map(|tag| match expansion {
            TagExpansion::Full => shape(tag, None),
            _ => summary(&tag),
        })
        .collect())
}

fn summary(tag: &Document) -> Value {
    json!({
        "id": document_id(tag).map(|id| id.to_hex()),
        "title": tag.get("title").cloned().unwrap_or(Value::Null),
    })
}
