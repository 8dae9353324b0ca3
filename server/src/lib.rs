//! HTTP surface for the todo and tag resources.
//!
//! # Design
//! Route handlers only extract and respond; all store access and
//! association maintenance live in `todos_core`. The store is injected
//! through [`router`], so tests build an isolated in-memory service per case.

pub mod config;
pub mod error;
mod extract;
mod tags;
mod todos;

use std::future::Future;

use axum::routing::{delete, get};
use axum::Router;
use tokio::net::TcpListener;
use todos_core::{Service, Store};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, StartupError};

/// Router over a fresh in-memory store.
pub fn app() -> Router {
    router(Store::in_memory())
}

pub fn router(store: Store) -> Router {
    Router::new()
        .route(
            "/todos/",
            get(todos::list).delete(todos::reset).post(todos::create),
        )
        .route(
            "/todos/{id}",
            get(todos::get).patch(todos::modify).delete(todos::delete),
        )
        .route(
            "/todos/{id}/tags/",
            get(todos::tags)
                .post(todos::assign_tag)
                .delete(todos::clear_tags),
        )
        .route("/todos/{id}/tags/{tag_id}", delete(todos::detach_tag))
        .route(
            "/tags/",
            get(tags::list).delete(tags::reset).post(tags::create),
        )
        .route(
            "/tags/{id}",
            get(tags::get).patch(tags::modify).delete(tags::delete),
        )
        .route("/tags/{id}/todos/", get(tags::todos))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Service::new(store))
}

/// Serves `store` on `listener` until `shutdown` resolves.
pub async fn run<F>(listener: TcpListener, store: Store, shutdown: F) -> Result<(), StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(StartupError::Serve)
}
