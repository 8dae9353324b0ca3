use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value;
use todos_core::{Document, Service};

use crate::error::ApiError;
use crate::extract::{JsonBody, RequestLinks};

pub async fn list(
    State(service): State<Service>,
    RequestLinks(links): RequestLinks,
) -> Result<Json<Vec<Value>>, ApiError> {
    Ok(Json(service.todos.list(&links).await?))
}

pub async fn reset(State(service): State<Service>) -> Result<StatusCode, ApiError> {
    service.todos.reset().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create(
    State(service): State<Service>,
    RequestLinks(links): RequestLinks,
    JsonBody(payload): JsonBody<Document>,
) -> Result<impl IntoResponse, ApiError> {
    let todo = service.todos.create(payload, &links).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

pub async fn get(
    State(service): State<Service>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(service.todos.get(&id).await?))
}

pub async fn modify(
    State(service): State<Service>,
    Path(id): Path<String>,
    RequestLinks(links): RequestLinks,
    JsonBody(payload): JsonBody<Document>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(service.todos.modify(&id, payload, &links).await?))
}

pub async fn delete(
    State(service): State<Service>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    service.todos.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_tag(
    State(service): State<Service>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Document>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = service.todos.assign_tag(&id, &body).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn tags(
    State(service): State<Service>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    Ok(Json(service.todos.tags(&id).await?))
}

pub async fn clear_tags(
    State(service): State<Service>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    service.todos.clear_tags(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn detach_tag(
    State(service): State<Service>,
    Path((id, tag_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    service.todos.detach_tag(&id, &tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
