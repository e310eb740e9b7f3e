//! Responses produced by the dispatcher itself.
//!
//! # Responsibilities
//! - Build 301/302 redirects with a `Location` header
//! - Manufacture error responses (404 for unmatched hosts, 4xx for malformed ones)
//!
//! # Design Decisions
//! - Error responses come from an injected [`ErrorResponder`] so embedders can
//!   render their own pages; the default is a plain-text reason phrase

use std::sync::Arc;

use axum::http::header::{InvalidHeaderValue, LOCATION};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::routing::RedirectCode;

/// Builds the response for a status the dispatcher could not satisfy.
pub type ErrorResponder = Arc<dyn Fn(StatusCode) -> Response + Send + Sync>;

/// Plain-text body carrying the canonical reason phrase.
pub fn plain_text_errors() -> ErrorResponder {
    Arc::new(|status: StatusCode| {
        let reason = status.canonical_reason().unwrap_or("Error");
        (status, reason).into_response()
    })
}

/// Redirect to `location`. Fails only if the location is not a valid header value.
pub fn redirect(code: RedirectCode, location: &str) -> Result<Response, InvalidHeaderValue> {
    let location = HeaderValue::from_str(location)?;
    Ok((code.status(), [(LOCATION, location)]).into_response())
}
