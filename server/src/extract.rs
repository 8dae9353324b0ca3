//! Request extractors shared by the route handlers.

use std::convert::Infallible;

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::header;
use axum::http::request::Parts;
use todos_core::Links;

use crate::error::ApiError;

/// JSON body whose rejections render through [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Resource links built from the `Host` the client addressed.
pub struct RequestLinks(pub Links);

impl<S> FromRequestParts<S> for RequestLinks
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .or_else(|| parts.uri.authority().map(|authority| authority.as_str()))
            .unwrap_or("localhost");
        Ok(Self(Links::for_host(host)))
    }
}
