use axum::Json;
use axum::body::{Body, to_bytes};
use axum::extract::Request;
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Uniform response envelope. Every endpoint, success or error, answers with
/// this shape; `path` is stamped by [`stamp_path`] rather than by each
/// handler.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status: &'static str,
    pub status_code: u16,
    pub message: String,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    pub timestamp: DateTime<Utc>,
    pub path: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success",
            status_code: status.as_u16(),
            message: message.into(),
            data: Some(data),
            meta: None,
            timestamp: Utc::now(),
            path: None,
        }
    }

    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::success(StatusCode::OK, message, data)
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::success(StatusCode::CREATED, message, data)
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl ApiResponse<()> {
    /// Success with no payload, e.g. logout.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            status_code: StatusCode::OK.as_u16(),
            message: message.into(),
            data: None,
            meta: None,
            timestamp: Utc::now(),
            path: None,
        }
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: "error",
            status_code: status.as_u16(),
            message: message.into(),
            data: None,
            meta: None,
            timestamp: Utc::now(),
            path: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Largest body `stamp_path` will buffer. Envelopes are small; anything
/// bigger (the docs UI bundle, streamed bodies) is not an envelope.
const MAX_STAMPED_BODY_BYTES: usize = 256 * 1024;

/// Central response-finalizing middleware: buffers envelope bodies and stamps
/// the request path into them. Non-envelope responses (docs UI, extractor
/// rejections, anything over [`MAX_STAMPED_BODY_BYTES`]) pass through
/// untouched.
pub async fn stamp_path(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    let response = next.run(req).await;

    // Streamed bodies have no exact size hint; skip those along with
    // anything over the cap instead of buffering them.
    let hinted = http_body::Body::size_hint(response.body()).exact();
    if hinted.is_none_or(|len| len > MAX_STAMPED_BODY_BYTES as u64) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_STAMPED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return Response::from_parts(parts, Body::empty()),
    };

    if let Ok(mut value) = serde_json::from_slice::<Value>(&bytes) {
        let is_envelope = value.get("status").is_some() && value.get("statusCode").is_some();
        if is_envelope {
            if let Some(object) = value.as_object_mut() {
                object.insert("path".to_owned(), Value::String(path));
            }
            let stamped = serde_json::to_vec(&value).unwrap_or_else(|_| bytes.to_vec());
            parts.headers.remove(header::CONTENT_LENGTH);
            return Response::from_parts(parts, Body::from(stamped));
        }
    }

    Response::from_parts(parts, Body::from(bytes))
}
