//! Promise/A+ style deferred values.
//!
//! A [`Promise`] is the eventual result of some asynchronous operation: it is
//! pending until it is settled exactly once, either fulfilled with a value or
//! rejected with a reason. Observers registered with [`Promise::then`],
//! [`Promise::catch`] and [`Promise::finally`] run synchronously at the point
//! of settlement, in registration order, or immediately if the promise has
//! already settled. Any asynchrony comes from whoever holds the [`Resolver`].
//!
//! Settlement cascades through derived promises breadth first: when a settle
//! call returns, every promise downstream of it that could settle has done so
//! and its observers have run. The cascade runs in a loop on the settling
//! thread, so chains of any length are safe.
//!
//! # Examples
//!
//! ```
//! use promise_polyfill::Promise;
//! use std::thread;
//!
//! let promise = Promise::<u32, String>::new(|resolver| {
//!     thread::spawn(move || resolver.resolve(21));
//! });
//! let doubled = promise.map(|value| value * 2);
//!
//! assert_eq!(futures::executor::block_on(doubled), Ok(42));
//! ```
mod combinators;
mod drain;
mod outcome;
mod promise;
mod resolver;

pub mod polyfill;

pub use outcome::Outcome;
pub use polyfill::{polyfill, Constructor, Namespace};
pub use promise::{Promise, State};
pub use resolver::Resolver;

/// Callback handed to a [`Thenable`] for its fulfillment path.
pub type OnFulfilled<T> = Box<dyn FnOnce(T) + Send>;

/// Callback handed to a [`Thenable`] for its rejection path.
pub type OnRejected<E> = Box<dyn FnOnce(E) + Send>;

/// Anything that can report an eventual value or reason through a pair of
/// callbacks.
///
/// This is the "has a callable `then`" capability: a handler returning a
/// thenable has its result adopted instead of being used as a plain value,
/// and [`Promise::all`] / [`Promise::race`] accept any thenable, not just
/// this crate's [`Promise`].
///
/// An implementation should call at most one of the two callbacks, at most
/// once. Extra calls are harmless because settlement is idempotent.
pub trait Thenable<T, E>: Send {
    fn on_settle(self: Box<Self>, on_fulfilled: OnFulfilled<T>, on_rejected: OnRejected<E>);

    /// Address of the promise state behind this thenable. A resolver uses it
    /// to refuse adopting its own promise, which could never settle. Foreign
    /// thenables keep the default.
    fn promise_id(&self) -> Option<*const ()> {
        None
    }
}

/// Why awaiting a [`Promise`] did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error<E> {
    #[error("promise rejected: {0:?}")]
    Rejected(E),
    /// Every resolver was dropped while the promise was still pending, so it
    /// can never settle.
    #[error("promise abandoned before it settled")]
    Abandoned,
}

impl<E> Error<E> {
    /// The rejection reason, if this is a rejection.
    pub fn into_reason(self) -> Option<E> {
        match self {
            Error::Rejected(reason) => Some(reason),
            Error::Abandoned => None,
        }
    }
}
