use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;

use crate::codec::{BodyCodec, JsonCodec, TypedOutput};
use crate::error::{DispatchError, WriterError};
use crate::http::response::StatusCode;
use crate::writer::handle::ResponseWriter;

/// A typed writer that accepts no value: commits and completes the
/// underlying writer with no body parts.
///
/// Strictly one-shot: a second `write` fails with `AlreadyCompleted`.
#[derive(Debug, Clone)]
pub struct VoidWriter {
    writer: ResponseWriter,
    status_on_success: StatusCode,
    used: Arc<AtomicBool>,
}

impl VoidWriter {
    /// Wraps `writer`, configuring the status written on a successful void
    /// response (default `200`, per §6's `statusOnSuccess`).
    #[must_use]
    pub fn new(writer: ResponseWriter, status_on_success: StatusCode) -> Self {
        Self {
            writer,
            status_on_success,
            used: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Commits and completes the writer with no body.
    ///
    /// # Errors
    ///
    /// Returns `WriterError::AlreadyCompleted` if called twice, or whatever
    /// state-machine error the underlying writer produced.
    pub fn write(&self) -> Result<(), WriterError> {
        if self.used.swap(true, Ordering::SeqCst) {
            return Err(WriterError::AlreadyCompleted);
        }
        self.writer.set_status(self.status_on_success)?;
        self.writer.commit()?;
        self.writer.complete()
    }
}

/// A typed writer that accepts a value of type `T`, serializes it via `C`
/// (default: [`JsonCodec`]), and writes it as a single response body part.
///
/// Strictly one-shot: a second `write` fails with `AlreadyCompleted`.
#[derive(Debug, Clone)]
pub struct TypedBodyWriter<T, C = JsonCodec> {
    writer: ResponseWriter,
    status_on_success: StatusCode,
    used: Arc<AtomicBool>,
    _marker: PhantomData<fn(T, C)>,
}

impl<T, C> TypedBodyWriter<T, C>
where
    T: TypedOutput,
    C: BodyCodec<T>,
{
    /// Wraps `writer`, configuring the status written on a successful
    /// response.
    #[must_use]
    pub fn new(writer: ResponseWriter, status_on_success: StatusCode) -> Self {
        Self {
            writer,
            status_on_success,
            used: Arc::new(AtomicBool::new(false)),
            _marker: PhantomData,
        }
    }

    /// Serializes `value`, applies its additional headers, and commits and
    /// completes the writer.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::WriterLifecycleError(AlreadyCompleted)` if
    /// called twice, `DispatchError::InternalError` if serialization fails,
    /// or whatever state-machine error the underlying writer produced.
    pub fn write(&self, value: T) -> Result<(), DispatchError> {
        if self.used.swap(true, Ordering::SeqCst) {
            return Err(WriterError::AlreadyCompleted.into());
        }

        let additional_headers = value.additional_headers();
        let (body, content_type) = C::encode(&value)?;

        self.writer.update_headers(|headers| {
            for (name, value) in additional_headers {
                headers.insert(name, value);
            }
        })?;
        self.writer.set_content_type(content_type)?;
        self.writer.set_body_length(body.len())?;
        self.writer.set_status(self.status_on_success)?;
        self.writer.commit()?;
        self.writer.append_body_part(Bytes::from(body))?;
        self.writer.complete()?;
        Ok(())
    }
}
