//! Todo and tag resources over a document store.
//!
//! # Overview
//! Todos and tags reference each other through denormalized id arrays:
//! `todo.tags` and `tag.todos`. The handlers in [`todos`] and [`tags`] keep
//! both arrays in step through [`associations`], and render stored documents
//! for clients through [`shape`].
//!
//! # Design
//! - The store is a capability ([`store::Collection`]) injected at
//!   construction; there are no process-wide handles.
//! - Store writes are sequential, not transactional. A crash between the two
//!   sides of an association update is repaired by
//!   [`Associations::reconcile`].
//! - Handlers take raw path ids: a malformed id is reported as not found.

pub mod associations;
pub mod error;
pub mod id;
pub mod memory;
mod payload;
pub mod shape;
pub mod store;
pub mod tags;
pub mod todos;

pub use associations::{Associations, ReconcileReport};
pub use error::{Error, Result, StoreError};
pub use id::{IdParseError, ObjectId};
pub use memory::MemoryCollection;
pub use shape::Links;
pub use store::{Collection, Document, Filter, Store, Update};
pub use tags::Tags;
pub use todos::Todos;

/// Both resource handlers and the association maintainer over one store.
#[derive(Clone)]
pub struct Service {
    pub todos: Todos,
    pub tags: Tags,
    pub associations: Associations,
}

impl Service {
    pub fn new(store: Store) -> Self {
        Self {
            todos: Todos::new(store.clone()),
            tags: Tags::new(store.clone()),
            associations: Associations::new(store),
        }
    }
}
