//! Keeps `todo.tags` and `tag.todos` mirrors of each other.
//!
//! # Design
//! Every operation mutates the todo side first and the tag side second. The
//! two writes are not atomic: a failure between them leaves one dangling
//! reference, which [`Associations::reconcile`] repairs by treating the todo
//! side as authoritative.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::StoreError;
use crate::id::ObjectId;
use crate::store::{document_id, id_array, id_list, Filter, Store, Update};

const TODO_TAGS: &str = "tags";
const TAG_TODOS: &str = "todos";

/// Documents rewritten by a [`Associations::reconcile`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub todos_repaired: usize,
    pub tags_repaired: usize,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.todos_repaired == 0 && self.tags_repaired == 0
    }
}

#[derive(Clone)]
pub struct Associations {
    store: Store,
}

impl Associations {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn attach(&self, todo: ObjectId, tag: ObjectId) -> Result<(), StoreError> {
        tracing::debug!(%todo, %tag, "attach");
        self.store
            .todos
            .update_one(&Filter::Id(todo), &Update::add_to_set(TODO_TAGS, tag))
            .await?;
        self.store
            .tags
            .update_one(&Filter::Id(tag), &Update::add_to_set(TAG_TODOS, todo))
            .await?;
        Ok(())
    }

    /// Attaches `todo` to each of `tags`, keeping their order on the todo side.
    pub async fn attach_many(&self, todo: ObjectId, tags: &[ObjectId]) -> Result<(), StoreError> {
        for tag in tags {
            self.store
                .todos
                .update_one(&Filter::Id(todo), &Update::add_to_set(TODO_TAGS, *tag))
                .await?;
        }
        self.store
            .tags
            .update_many(&Filter::Ids(tags.to_vec()), &Update::add_to_set(TAG_TODOS, todo))
            .await?;
        Ok(())
    }

    pub async fn detach(&self, todo: ObjectId, tag: ObjectId) -> Result<(), StoreError> {
        tracing::debug!(%todo, %tag, "detach");
        self.store
            .todos
            .update_one(&Filter::Id(todo), &Update::pull(TODO_TAGS, tag))
            .await?;
        self.store
            .tags
            .update_one(&Filter::Id(tag), &Update::pull(TAG_TODOS, todo))
            .await?;
        Ok(())
    }

    /// Detaches `todo` from every tag it currently references.
    pub async fn clear_todo(&self, todo: ObjectId, current: &[ObjectId]) -> Result<(), StoreError> {
        tracing::debug!(%todo, tags = current.len(), "clear todo tags");
        self.store
            .todos
            .update_one(&Filter::Id(todo), &Update::set(TODO_TAGS, id_array(&[])))
            .await?;
        if !current.is_empty() {
            self.store
                .tags
                .update_many(&Filter::Ids(current.to_vec()), &Update::pull(TAG_TODOS, todo))
                .await?;
        }
        Ok(())
    }

    /// Removes a deleted todo from every tag, not only the ones it referenced.
    pub async fn cascade_delete_todo(&self, todo: ObjectId) -> Result<(), StoreError> {
        let touched = self
            .store
            .tags
            .update_many(&Filter::All, &Update::pull(TAG_TODOS, todo))
            .await?;
        tracing::debug!(%todo, tags = touched, "cascaded todo delete");
        Ok(())
    }

    /// Removes a deleted tag from every todo.
    pub async fn cascade_delete_tag(&self, tag: ObjectId) -> Result<(), StoreError> {
        let touched = self
            .store
            .todos
            .update_many(&Filter::All, &Update::pull(TODO_TAGS, tag))
            .await?;
        tracing::debug!(%tag, todos = touched, "cascaded tag delete");
        Ok(())
    }

    /// Empties every tag's `todos`; used after all todos were deleted.
    pub async fn clear_all_todo_refs(&self) -> Result<(), StoreError> {
        self.store
            .tags
            .update_many(&Filter::All, &Update::set(TAG_TODOS, id_array(&[])))
            .await?;
        Ok(())
    }

    /// Empties every todo's `tags`; used after all tags were deleted.
    pub async fn clear_all_tag_refs(&self) -> Result<(), StoreError> {
        self.store
            .todos
            .update_many(&Filter::All, &Update::set(TODO_TAGS, id_array(&[])))
            .await?;
        Ok(())
    }

    /// Moves `todo` from the `old` tag set to the `new` one, keeping the
    /// order of `new` on the todo side.
    pub async fn replace_todo_tags(
        &self,
        todo: ObjectId,
        old: &[ObjectId],
        new: &[ObjectId],
    ) -> Result<(), StoreError> {
        self.store
            .todos
            .update_one(&Filter::Id(todo), &Update::set(TODO_TAGS, id_array(new)))
            .await?;

        let removed: Vec<ObjectId> = old.iter().filter(|id| !new.contains(id)).copied().collect();
        let added: Vec<ObjectId> = new.iter().filter(|id| !old.contains(id)).copied().collect();
        tracing::debug!(%todo, added = added.len(), removed = removed.len(), "replace todo tags");
        if !removed.is_empty() {
            self.store
                .tags
                .update_many(&Filter::Ids(removed), &Update::pull(TAG_TODOS, todo))
                .await?;
        }
        if !added.is_empty() {
            self.store
                .tags
                .update_many(&Filter::Ids(added), &Update::add_to_set(TAG_TODOS, todo))
                .await?;
        }
        Ok(())
    }

    /// Moves `tag` from the `old` todo set to the `new` one.
    pub async fn replace_tag_todos(
        &self,
        tag: ObjectId,
        old: &[ObjectId],
        new: &[ObjectId],
    ) -> Result<(), StoreError> {
        let removed: Vec<ObjectId> = old.iter().filter(|id| !new.contains(id)).copied().collect();
        let added: Vec<ObjectId> = new.iter().filter(|id| !old.contains(id)).copied().collect();
        tracing::debug!(%tag, added = added.len(), removed = removed.len(), "replace tag todos");
        if !removed.is_empty() {
            self.store
                .todos
                .update_many(&Filter::Ids(removed), &Update::pull(TODO_TAGS, tag))
                .await?;
        }
        if !added.is_empty() {
            self.store
                .todos
                .update_many(&Filter::Ids(added), &Update::add_to_set(TODO_TAGS, tag))
                .await?;
        }
        self.store
            .tags
            .update_one(&Filter::Id(tag), &Update::set(TAG_TODOS, id_array(new)))
            .await?;
        Ok(())
    }

    /// Restores bidirectional consistency after an interrupted operation.
    pub async fn reconcile(&self) -> Result<ReconcileReport, StoreError> {
        let todos = self.store.todos.find(&Filter::All).await?;
        let tags = self.store.tags.find(&Filter::All).await?;
        let known_tags: BTreeSet<ObjectId> = tags.iter().filter_map(document_id).collect();

        let mut report = ReconcileReport::default();
        let mut members: BTreeMap<ObjectId, Vec<ObjectId>> = BTreeMap::new();

        for todo in &todos {
            let Some(todo_id) = document_id(todo) else {
                continue;
            };
            let mut kept = Vec::new();
            for tag in id_list(todo, TODO_TAGS) {
                if known_tags.contains(&tag) && !kept.contains(&tag) {
                    kept.push(tag);
                    members.entry(tag).or_default().push(todo_id);
                }
            }
            if todo.get(TODO_TAGS) != Some(&id_array(&kept)) {
                tracing::warn!(todo = %todo_id, "dropping dangling tag references");
                self.store
                    .todos
                    .update_one(&Filter::Id(todo_id), &Update::set(TODO_TAGS, id_array(&kept)))
                    .await?;
                report.todos_repaired += 1;
            }
        }

        for tag in &tags {
            let Some(tag_id) = document_id(tag) else {
                continue;
            };
            let expected = members.remove(&tag_id).unwrap_or_default();
            let mut rebuilt: Vec<ObjectId> = Vec::with_capacity(expected.len());
            for id in id_list(tag, TAG_TODOS).into_iter().chain(expected.iter().copied()) {
                if expected.contains(&id) && !rebuilt.contains(&id) {
                    rebuilt.push(id);
                }
            }
            if tag.get(TAG_TODOS) != Some(&id_array(&rebuilt)) {
                tracing::warn!(tag = %tag_id, "rebuilding todo references");
                self.store
                    .tags
                    .update_one(&Filter::Id(tag_id), &Update::set(TAG_TODOS, id_array(&rebuilt)))
                    .await?;
                report.tags_repaired += 1;
            }
        }

        if report.is_clean() {
            tracing::debug!("associations consistent");
        } else {
            tracing::info!(
                todos = report.todos_repaired,
                tags = report.tags_repaired,
                "reconciled associations"
            );
        }
        Ok(report)
    }
}
