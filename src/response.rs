//! Response envelope helpers.

use axum::{
    body::Body,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

pub const API_MESSAGE: &str = "ORM Studio API";

#[derive(Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: String,
}

#[derive(Serialize)]
pub struct ApiInfo {
    pub ok: bool,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct HealthBody {
    pub ok: bool,
    pub status: &'static str,
}

pub fn json<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

pub fn error_json(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(ErrorEnvelope {
            ok: false,
            error: message,
        }),
    )
        .into_response()
}

pub fn no_content() -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

pub fn html(status: StatusCode, body: String) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/html; charset=utf-8"),
    );
    (status, headers, body).into_response()
}

/// Merge `extra` into the response headers, replacing existing values.
pub fn with_headers(mut response: Response, extra: &HeaderMap) -> Response {
    for (name, value) in extra {
        response.headers_mut().insert(name.clone(), value.clone());
    }
    response
}
