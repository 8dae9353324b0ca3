//! Tag resource operations, mirroring [`Todos`](crate::todos::Todos) on the
//! `tags` collection.

use serde_json::Value;

use crate::associations::Associations;
use crate::error::{Error, Result};
use crate::id::ObjectId;
use crate::payload::{existing, id_array, path_id, strip_identity};
use crate::shape::{shape, shape_all, Links};
use crate::store::{self, id_list, Document, Filter, Store};

const TAG: &str = "tag";

#[derive(Clone)]
pub struct Tags {
    store: Store,
    associations: Associations,
}

impl Tags {
    pub fn new(store: Store) -> Self {
        Self {
            associations: Associations::new(store.clone()),
            store,
        }
    }

    pub async fn list(&self, links: &Links) -> Result<Vec<Value>> {
        let tags = self.store.tags.find(&Filter::All).await?;
        Ok(shape_all(tags, Some((links, "tags"))))
    }

    /// Deletes every tag and empties every todo's `tags`.
    pub async fn reset(&self) -> Result<()> {
        let removed = self.store.tags.delete_many(&Filter::All).await?;
        self.associations.clear_all_tag_refs().await?;
        tracing::info!(removed, "reset tags");
        Ok(())
    }

    /// New tags always start without todos.
    pub async fn create(&self, mut payload: Document, links: &Links) -> Result<Value> {
        strip_identity(&mut payload);
        payload.insert("todos".to_string(), store::id_array(&[]));
        let id = self.store.tags.insert_one(payload).await?;
        tracing::info!(tag = %id, "created tag");

        let tag = self.fetch(id).await?;
        Ok(shape(tag, Some((links, "tags"))))
    }

    pub async fn get(&self, id: &str) -> Result<Value> {
        let id = path_id(TAG, id)?;
        Ok(shape(self.fetch(id).await?, None))
    }

    /// Partial field replacement; a `todos` field is applied through the
    /// association maintainer.
    pub async fn modify(&self, id: &str, mut payload: Document, links: &Links) -> Result<Value> {
        let id = path_id(TAG, id)?;
        let current = self.fetch(id).await?;
        strip_identity(&mut payload);

        if let Some(todos) = payload.remove("todos") {
            let requested = id_array(&todos, "todos")?;
            let new = existing(self.store.todos.as_ref(), requested).await?;
            let old = id_list(&current, "todos");
            self.associations.replace_tag_todos(id, &old, &new).await?;
        }
        if !payload.is_empty() {
            self.store
                .tags
                .update_one(&Filter::Id(id), &store::Update::Set(payload))
                .await?;
        }

        Ok(shape(self.fetch(id).await?, Some((links, "tags"))))
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = path_id(TAG, id)?;
        self.store
            .tags
            .find_one_and_delete(&Filter::Id(id))
            .await?
            .ok_or_else(|| Error::not_found(TAG, id.to_hex()))?;
        self.associations.cascade_delete_tag(id).await?;
        tracing::info!(tag = %id, "deleted tag");
        Ok(())
    }

    /// The todos carrying a tag, each with `id` and `url`.
    pub async fn todos(&self, id: &str, links: &Links) -> Result<Vec<Value>> {
        let id = path_id(TAG, id)?;
        let tag = self.fetch(id).await?;
        let todos =
            store::find_ordered(self.store.todos.as_ref(), id_list(&tag, "todos")).await?;
        Ok(shape_all(todos, Some((links, "todos"))))
    }

    async fn fetch(&self, id: ObjectId) -> Result<Document> {
        self.store
            .tags
            .find_one(&Filter::Id(id))
            .await?
            .ok_or_else(|| Error::not_found(TAG, id.to_hex()))
    }
}
