use std::fmt;
use std::sync::Arc;

use crate::{drain, Outcome, Promise};

/// The settlement side of a [`Promise`]: the `resolve` and `reject` functions
/// handed to an executor.
///
/// A resolver may be cloned and sent to other threads. Only the first
/// settlement through any clone takes effect; later calls are no-ops. When
/// the last clone is dropped while the promise is still pending, the promise
/// is abandoned: its observers are released and anyone awaiting it gets
/// [`Error::Abandoned`](crate::Error::Abandoned).
pub struct Resolver<T, E> {
    promise: Promise<T, E>,
    guard: Arc<Guard>,
}

/// Shared by every clone of a resolver. Abandons the promise once the last
/// clone goes away.
struct Guard {
    abandon: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Drop for Guard {
    fn drop(&mut self) {
        if let Some(abandon) = self.abandon.take() {
            drain::run(abandon);
        }
    }
}

impl<T, E> Resolver<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub(crate) fn new(promise: Promise<T, E>) -> Self {
        let pending = promise.clone();
        Self {
            promise,
            guard: Arc::new(Guard {
                abandon: Some(Box::new(move || pending.abandon())),
            }),
        }
    }

    /// Fulfills the promise with `value`. Returns `false` if it had already
    /// settled, in which case nothing happens.
    pub fn resolve(&self, value: T) -> bool {
        self.promise.settle(Ok(value))
    }

    /// Rejects the promise with `reason`. Returns `false` if it had already
    /// settled, in which case nothing happens.
    pub fn reject(&self, reason: E) -> bool {
        self.promise.settle(Err(reason))
    }

    /// Settles the promise from a handler result: a plain value fulfills it,
    /// a thenable is followed and its fulfillment or rejection is passed on.
    ///
    /// A promise can never follow itself. Adopting it is ignored, so the
    /// promise stays pending until the resolver is dropped and then counts
    /// as abandoned.
    pub fn adopt(&self, outcome: Outcome<T, E>) {
        match outcome {
            Outcome::Value(value) => {
                self.resolve(value);
            }
            Outcome::Thenable(thenable) => {
                if thenable.promise_id() == Some(self.promise.id()) {
                    tracing::debug!("refusing to adopt a promise into itself");
                    return;
                }
                tracing::trace!("adopting thenable");
                let resolve = self.clone();
                let reject = self.clone();
                thenable.on_settle(
                    Box::new(move |value| {
                        resolve.resolve(value);
                    }),
                    Box::new(move |reason| {
                        reject.reject(reason);
                    }),
                );
            }
        }
    }

    pub fn is_settled(&self) -> bool {
        !self.promise.is_pending()
    }

    /// The promise this resolver settles.
    pub fn promise(&self) -> Promise<T, E> {
        self.promise.clone()
    }
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
            guard: self.guard.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("promise", &self.promise)
            .finish()
    }
}
