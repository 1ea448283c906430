use bytes::Bytes;

use crate::http::headers::Headers;
use crate::http::response::{Response, StatusCode};

/// The three states a [`super::ResponseWriter`] moves through over the
/// course of one dispatch. Transitions only move forward; there is no path
/// back to an earlier state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterState {
    /// `status`, `headers`, `content-type` and `body-length` are mutable.
    NotCommitted,
    /// `body-part` appends are valid; header/status mutation is no longer
    /// permitted.
    Committed,
    /// The response is finalized; no further mutation of any kind.
    Completed,
}

/// The writer's internal, mutex-guarded state.
#[derive(Debug)]
pub(crate) struct Inner {
    pub state: WriterState,
    pub status: StatusCode,
    pub headers: Headers,
    pub content_type: Option<String>,
    pub body_length: Option<usize>,
    pub body_parts: Vec<Bytes>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            state: WriterState::NotCommitted,
            status: StatusCode::Ok,
            headers: Headers::new(),
            content_type: None,
            body_length: None,
            body_parts: Vec::new(),
        }
    }
}

impl Inner {
    /// Renders the writer's current fields into a materialized [`Response`],
    /// regardless of what state it's in — used by test harnesses inspecting
    /// a writer post-completion as well as by the transport loop once
    /// `Completed` is reached.
    pub fn render(&self) -> Response {
        let mut headers = self.headers.clone();
        if let Some(content_type) = &self.content_type {
            headers.insert("content-type", content_type.clone());
        }
        let body: Vec<u8> = self.body_parts.iter().flat_map(|part| part.to_vec()).collect();
        if headers.get("content-length").is_none() {
            let declared = self.body_length.unwrap_or(body.len());
            headers.insert("content-length", declared.to_string());
        }
        Response {
            status: self.status,
            headers,
            body,
        }
    }
}
