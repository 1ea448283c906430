use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::error::WriterError;
use crate::http::headers::Headers;
use crate::http::response::{Response, StatusCode};
use crate::writer::state::{Inner, WriterState};

/// Shared, mutable response-construction state machine.
///
/// Cloning a `ResponseWriter` clones the handle, never the state — every
/// clone projects onto the same underlying `Inner`, matching the "writer
/// sharing" design note: multiple typed-writer views may hold a clone of
/// the same handle and observe each other's mutations.
#[derive(Debug, Clone)]
pub struct ResponseWriter(Arc<Mutex<Inner>>);

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter {
    /// Creates a fresh writer in the `NotCommitted` state.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(Inner::default())))
    }

    /// Sets the status code. Only valid in `NotCommitted`.
    ///
    /// # Errors
    ///
    /// Returns `WriterError::InvalidStateForCommit` if the writer has
    /// already committed.
    pub fn set_status(&self, status: StatusCode) -> Result<(), WriterError> {
        let mut inner = self.lock();
        Self::require_not_committed(&inner)?;
        inner.status = status;
        Ok(())
    }

    /// Sets the `Content-Type`. Only valid in `NotCommitted`.
    ///
    /// # Errors
    ///
    /// Returns `WriterError::InvalidStateForCommit` if the writer has
    /// already committed.
    pub fn set_content_type(&self, content_type: impl Into<String>) -> Result<(), WriterError> {
        let mut inner = self.lock();
        Self::require_not_committed(&inner)?;
        inner.content_type = Some(content_type.into());
        Ok(())
    }

    /// Declares the body length. Only valid in `NotCommitted`.
    ///
    /// # Errors
    ///
    /// Returns `WriterError::InvalidStateForCommit` if the writer has
    /// already committed.
    pub fn set_body_length(&self, length: usize) -> Result<(), WriterError> {
        let mut inner = self.lock();
        Self::require_not_committed(&inner)?;
        inner.body_length = Some(length);
        Ok(())
    }

    /// Mutates the response headers via `mutator`. Only valid in
    /// `NotCommitted`.
    ///
    /// # Errors
    ///
    /// Returns `WriterError::InvalidStateForCommit` if the writer has
    /// already committed.
    pub fn update_headers(
        &self,
        mutator: impl FnOnce(&mut Headers),
    ) -> Result<(), WriterError> {
        let mut inner = self.lock();
        Self::require_not_committed(&inner)?;
        mutator(&mut inner.headers);
        Ok(())
    }

    /// Appends one part of the response body. Only valid in `Committed`.
    ///
    /// # Errors
    ///
    /// Returns `WriterError::InvalidStateForCommit` if the writer has not
    /// yet committed, or is already `Completed`.
    pub fn append_body_part(&self, bytes: Bytes) -> Result<(), WriterError> {
        let mut inner = self.lock();
        if inner.state != WriterState::Committed {
            return Err(WriterError::InvalidStateForCommit);
        }
        inner.body_parts.push(bytes);
        Ok(())
    }

    /// Transitions `NotCommitted -> Committed`.
    ///
    /// # Errors
    ///
    /// Returns `WriterError::InvalidStateForCommit` if the writer is not
    /// currently `NotCommitted`.
    pub fn commit(&self) -> Result<(), WriterError> {
        let mut inner = self.lock();
        Self::require_not_committed(&inner)?;
        inner.state = WriterState::Committed;
        Ok(())
    }

    /// Transitions `Committed -> Completed`.
    ///
    /// # Errors
    ///
    /// Returns `WriterError::InvalidStateForComplete` if the writer is not
    /// currently `Committed`.
    pub fn complete(&self) -> Result<(), WriterError> {
        let mut inner = self.lock();
        if inner.state != WriterState::Committed {
            return Err(WriterError::InvalidStateForComplete);
        }
        inner.state = WriterState::Completed;
        Ok(())
    }

    /// Returns the writer's current state.
    #[must_use]
    pub fn state(&self) -> WriterState {
        self.lock().state
    }

    /// Returns the currently-set status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.lock().status
    }

    /// Returns a snapshot of the currently-set headers.
    #[must_use]
    pub fn headers(&self) -> Headers {
        self.lock().headers.clone()
    }

    /// Returns the currently-set `Content-Type`, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        self.lock().content_type.clone()
    }

    /// Returns the declared body length, if any was set via
    /// [`Self::set_body_length`].
    #[must_use]
    pub fn body_length(&self) -> Option<usize> {
        self.lock().body_length
    }

    /// Renders the writer's fields into a materialized response, regardless
    /// of its current state. Used by the transport loop once `Completed` is
    /// reached, and by test harnesses inspecting the outcome.
    #[must_use]
    pub fn render(&self) -> Response {
        self.lock().render()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn require_not_committed(inner: &Inner) -> Result<(), WriterError> {
        if inner.state != WriterState::NotCommitted {
            return Err(WriterError::InvalidStateForCommit);
        }
        Ok(())
    }
}
