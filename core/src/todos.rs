//! Todo resource operations.
//!
//! # Design
//! `Todos` owns nothing but an injected [`Store`]. Each operation issues its
//! store calls sequentially and re-reads the todo before shaping the
//! response, so the caller always sees the stored state. Any path that
//! changes a todo's `tags` goes through [`Associations`], keeping the
//! reverse references on tags in step.

use serde_json::Value;

use crate::associations::Associations;
use crate::error::{Error, Result};
use crate::id::ObjectId;
use crate::payload::{existing, id_array, path_id, strip_identity};
use crate::shape::{shape, shape_all, shape_todo, Links, TagExpansion};
use crate::store::{self, id_list, Document, Filter, Store};

const TODO: &str = "todo";
const TAG: &str = "tag";

#[derive(Clone)]
pub struct Todos {
    store: Store,
    associations: Associations,
}

impl Todos {
    pub fn new(store: Store) -> Self {
        Self {
            associations: Associations::new(store.clone()),
            store,
        }
    }

    /// All todos with `id` and `url`; tags stay as identifiers.
    pub async fn list(&self, links: &Links) -> Result<Vec<Value>> {
        let todos = self.store.todos.find(&Filter::All).await?;
        Ok(shape_all(todos, Some((links, "todos"))))
    }

    /// Deletes every todo and empties every tag's `todos`.
    pub async fn reset(&self) -> Result<()> {
        let removed = self.store.todos.delete_many(&Filter::All).await?;
        self.associations.clear_all_todo_refs().await?;
        tracing::info!(removed, "reset todos");
        Ok(())
    }

    pub async fn create(&self, mut payload: Document, links: &Links) -> Result<Value> {
        strip_identity(&mut payload);
        if payload.get("completed").map_or(true, Value::is_null) {
            payload.insert("completed".to_string(), Value::Bool(false));
        }
        let requested = id_array(payload.get("tags").unwrap_or(&Value::Null), "tags")?;
        let tags = existing(self.store.tags.as_ref(), requested).await?;
        payload.insert("tags".to_string(), store::id_array(&[]));

        let id = self.store.todos.insert_one(payload).await?;
        if !tags.is_empty() {
            self.associations.attach_many(id, &tags).await?;
        }
        tracing::info!(todo = %id, tags = tags.len(), "created todo");

        let todo = self.fetch(id).await?;
        Ok(shape_todo(todo, self.store.tags.as_ref(), TagExpansion::Summary, Some(links)).await?)
    }

    /// One todo with tags expanded to `{id, title}` summaries.
    pub async fn get(&self, id: &str) -> Result<Value> {
        let id = path_id(TODO, id)?;
        let todo = self.fetch(id).await?;
        Ok(shape_todo(todo, self.store.tags.as_ref(), TagExpansion::Summary, None).await?)
    }

    /// Partial field replacement. A `tags` field is applied through the
    /// association maintainer; the response expands tags to full documents.
    pub async fn modify(&self, id: &str, mut payload: Document, links: &Links) -> Result<Value> {
        let id = path_id(TODO, id)?;
        let current = self.fetch(id).await?;
        strip_identity(&mut payload);

        if let Some(tags) = payload.remove("tags") {
            let requested = id_array(&tags, "tags")?;
            let new = existing(self.store.tags.as_ref(), requested).await?;
            let old = id_list(&current, "tags");
            self.associations.replace_todo_tags(id, &old, &new).await?;
        }
        if !payload.is_empty() {
            self.store
                .todos
                .update_one(&Filter::Id(id), &store::Update::Set(payload))
                .await?;
        }

        let todo = self.fetch(id).await?;
        Ok(shape_todo(todo, self.store.tags.as_ref(), TagExpansion::Full, Some(links)).await?)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = path_id(TODO, id)?;
        self.store
            .todos
            .find_one_and_delete(&Filter::Id(id))
            .await?
            .ok_or_else(|| Error::not_found(TODO, id.to_hex()))?;
        self.associations.cascade_delete_todo(id).await?;
        tracing::info!(todo = %id, "deleted todo");
        Ok(())
    }

    /// Attaches the tag named by the body's `id`; returns the tag.
    pub async fn assign_tag(&self, id: &str, body: &Document) -> Result<Value> {
        let todo = path_id(TODO, id)?;
        let raw = body
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::BadRequest("body must carry the tag `id`".to_string()))?;
        let tag: ObjectId = raw
            .parse()
            .map_err(|err| Error::BadRequest(format!("invalid tag id: {err}")))?;

        self.fetch(todo).await?;
        if self.store.tags.find_one(&Filter::Id(tag)).await?.is_none() {
            return Err(Error::not_found(TAG, raw));
        }
        self.associations.attach(todo, tag).await?;

        let tag_doc = self
            .store
            .tags
            .find_one(&Filter::Id(tag))
            .await?
            .ok_or_else(|| Error::not_found(TAG, raw))?;
        Ok(shape(tag_doc, None))
    }

    /// The tag documents a todo references.
    pub async fn tags(&self, id: &str) -> Result<Vec<Value>> {
        let id = path_id(TODO, id)?;
        let todo = self.fetch(id).await?;
        let tags =
            store::find_ordered(self.store.tags.as_ref(), id_list(&todo, "tags")).await?;
        Ok(shape_all(tags, None))
    }

    pub async fn clear_tags(&self, id: &str) -> Result<()> {
        let id = path_id(TODO, id)?;
        let todo = self.fetch(id).await?;
        self.associations
            .clear_todo(id, &id_list(&todo, "tags"))
            .await?;
        Ok(())
    }

    /// Removes one pairing. Succeeds when the pairing does not exist.
    pub async fn detach_tag(&self, id: &str, tag_id: &str) -> Result<()> {
        let todo = path_id(TODO, id)?;
        let tag = path_id(TAG, tag_id)?;
        self.associations.detach(todo, tag).await?;
        Ok(())
    }

    async fn fetch(&self, id: ObjectId) -> Result<Document> {
        self.store
            .todos
            .find_one(&Filter::Id(id))
            .await?
            .ok_or_else(|| Error::not_found(TODO, id.to_hex()))
    }
}
