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
    Ok(Json(service.tags.list(&links).await?))
}

pub async fn reset(State(service): State<Service>) -> Result<StatusCode, ApiError> {
    service.tags.reset().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create(
    State(service): State<Service>,
    RequestLinks(links): RequestLinks,
    JsonBody(payload): JsonBody<Document>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = service.tags.create(payload, &links).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn get(
    State(service): State<Service>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(service.tags.get(&id).await?))
}

pub async fn modify(
    State(service): State<Service>,
    Path(id): Path<String>,
    RequestLinks(links): RequestLinks,
    JsonBody(payload): JsonBody<Document>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(service.tags.modify(&id, payload, &links).await?))
}

pub async fn delete(
    State(service): State<Service>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    service.tags.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn todos(
    State(service): State<Service>,
    Path(id): Path<String>,
    RequestLinks(links): RequestLinks,
) -> Result<Json<Vec<Value>>, ApiError> {
    Ok(Json(service.tags.todos(&id, &links).await?))
}
