use crate::http::response::StatusCode;

struct AllowedError<E> {
    predicate: Box<dyn Fn(&E) -> bool + Send + Sync>,
    status: StatusCode,
    tag: &'static str,
}

/// An ordered set of `(error-predicate, HTTP-status)` pairs, consulted in
/// declaration order when a handler throws. The first predicate match wins.
pub struct AllowedErrors<E> {
    entries: Vec<AllowedError<E>>,
}

impl<E> Default for AllowedErrors<E> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<E> AllowedErrors<E> {
    /// Creates an empty allow-list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a predicate: any error for which `predicate` returns `true`
    /// maps to `status`, reported on the wire with `__type: tag`.
    #[must_use]
    pub fn allow(
        mut self,
        tag: &'static str,
        status: StatusCode,
        predicate: impl Fn(&E) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.entries.push(AllowedError {
            predicate: Box::new(predicate),
            status,
            tag,
        });
        self
    }

    /// Returns the first matching `(tag, status)` pair, if any.
    #[must_use]
    pub fn resolve(&self, error: &E) -> Option<(&'static str, StatusCode)> {
        self.entries
            .iter()
            .find(|entry| (entry.predicate)(error))
            .map(|entry| (entry.tag, entry.status))
    }
}
