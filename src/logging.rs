//! Middleware for logging requests and responses.

use axum::{extract::Request, http::header::CONTENT_TYPE, middleware::Next, response::Response};

/// The form fields whose values must never appear in the logs.
const REDACTED_FIELDS: [&str; 2] = ["password", "confirm_password"];

/// The max number of body characters to log at the `info` level.
const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level. If a body is
/// longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is truncated and the full
/// body is logged at the `debug` level. Password fields in form submissions
/// are redacted before logging.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body_text) = read_request_body(request).await;

    if is_form_submission(&parts) {
        log_request(&parts, &redact_form_fields(&body_text));
    } else {
        log_request(&parts, &body_text);
    }

    let request = Request::from_parts(parts, body_text.into());
    let response = next.run(request).await;

    let (parts, body_text) = read_response_body(response).await;
    log_response(&parts, &body_text);

    Response::from_parts(parts, body_text.into())
}

fn is_form_submission(parts: &axum::http::request::Parts) -> bool {
    // The content type may carry a charset suffix, so compare the prefix only.
    parts
        .headers
        .get(CONTENT_TYPE)
        .is_some_and(|content_type| {
            content_type
                .as_bytes()
                .starts_with(b"application/x-www-form-urlencoded")
        })
}

fn redact_form_fields(form_text: &str) -> String {
    form_text
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) if REDACTED_FIELDS.contains(&name) => format!("{name}=********"),
            _ => pair.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

async fn read_request_body(request: Request) -> (axum::http::request::Parts, String) {
    let (parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();

    (parts, String::from_utf8_lossy(&body_bytes).to_string())
}

async fn read_response_body(response: Response) -> (axum::http::response::Parts, String) {
    let (parts, body) = response.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();

    (parts, String::from_utf8_lossy(&body_bytes).to_string())
}

fn log_request(parts: &axum::http::request::Parts, body: &str) {
    match truncated(body) {
        Some(preview) => {
            tracing::info!("Received request: {parts:#?}\nbody: {preview}...");
            tracing::debug!("Full request body: {body:?}");
        }
        None => tracing::info!("Received request: {parts:#?}\nbody: {body:?}"),
    }
}

fn log_response(parts: &axum::http::response::Parts, body: &str) {
    match truncated(body) {
        Some(preview) => {
            tracing::info!("Sending response: {parts:#?}\nbody: {preview}...");
            tracing::debug!("Full response body: {body:?}");
        }
        None => tracing::info!("Sending response: {parts:#?}\nbody: {body:?}"),
    }
}

/// Returns the first [LOG_BODY_LENGTH_LIMIT] characters of `body`, or [None]
/// if the body is short enough to log whole.
///
/// Truncation counts characters rather than slicing bytes so a multi-byte
/// character on the boundary cannot cause a panic.
fn truncated(body: &str) -> Option<String> {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        Some(body.chars().take(LOG_BODY_LENGTH_LIMIT).collect())
    } else {
        None
    }
}
