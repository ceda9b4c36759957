//! Request-scoped log context.

use crate::level::REQUEST_SPAN_TARGET;
use crate::request_id;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::sync::{PoisonError, RwLock};
use tracing::Span;

/// Identifiers attached to every log line of one unit of work.
///
/// The request id is fixed at construction. The URL is written by the code
/// that owns the request and read by anything that logs on its behalf, so it
/// sits behind a lock; `&RequestContext` can be shared freely across threads.
#[derive(Debug)]
pub struct RequestContext {
    request_id: String,
    request_url: RwLock<String>,
}

impl RequestContext {
    /// Create a context with a freshly generated id and an empty URL.
    #[must_use]
    pub fn new(process_name: &str) -> Self {
        Self::with_id(request_id::generate(process_name, request_id::local_host()))
    }

    /// Create a context around an id received from upstream.
    #[must_use]
    pub fn with_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            request_url: RwLock::new(String::new()),
        }
    }

    /// The request id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.request_id
    }

    /// The request URL, empty until set.
    #[must_use]
    pub fn url(&self) -> String {
        self.request_url
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record the URL being served. The id is left untouched.
    pub fn set_url(&self, url: impl Into<String>) {
        *self
            .request_url
            .write()
            .unwrap_or_else(PoisonError::into_inner) = url.into();
    }

    /// Span carrying the request id and the URL as of this call.
    ///
    /// Events emitted while the span is entered are written with both fields.
    #[must_use]
    pub fn span(&self) -> Span {
        tracing::info_span!(
            target: REQUEST_SPAN_TARGET,
            "request",
            request_id = %self.request_id,
            request_url = %self.url()
        )
    }
}

impl Clone for RequestContext {
    fn clone(&self) -> Self {
        Self {
            request_id: self.request_id.clone(),
            request_url: RwLock::new(self.url()),
        }
    }
}

impl Serialize for RequestContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RequestContext", 2)?;
        state.serialize_field("requestId", &self.request_id)?;
        state.serialize_field("requestUrl", &self.url())?;
        state.end()
    }
}
