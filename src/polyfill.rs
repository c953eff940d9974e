//! Opt-in registration of [`Promise`] as a host's default deferred-value
//! type.
//!
//! Nothing here runs on its own. A host owns some namespace of named slots
//! and calls [`polyfill`] on it explicitly.
//!
//! ```
//! use promise_polyfill::{polyfill, Constructor};
//! use std::collections::HashMap;
//!
//! let mut globals: HashMap<String, Constructor<i32, String>> = HashMap::new();
//! polyfill(&mut globals);
//!
//! let promise = globals["Promise"].construct(|resolver| {
//!     resolver.resolve(1);
//! });
//! assert_eq!(globals["Promise"].length(), 1);
//! assert!(promise.is_fulfilled());
//! ```
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::marker::PhantomData;

use crate::{Promise, Resolver, Thenable};

/// Slot name [`polyfill`] installs under.
pub const DEFAULT_SLOT: &str = "Promise";

/// The promise constructor as a value that can be stored in a namespace.
pub struct Constructor<T, E> {
    _marker: PhantomData<fn() -> (T, E)>,
}

impl<T, E> Constructor<T, E> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// Number of required parameters, always 1 (the executor).
    pub fn length(&self) -> usize {
        Promise::<T, E>::LENGTH
    }
}

impl<T, E> Constructor<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn construct<F>(&self, executor: F) -> Promise<T, E>
    where
        F: FnOnce(Resolver<T, E>),
    {
        Promise::new(executor)
    }

    pub fn resolve(&self, value: T) -> Promise<T, E> {
        Promise::resolve(value)
    }

    pub fn reject(&self, reason: E) -> Promise<T, E> {
        Promise::reject(reason)
    }

    pub fn all<I>(&self, thenables: I) -> Promise<Vec<T>, E>
    where
        I: IntoIterator,
        I::Item: Thenable<T, E> + 'static,
    {
        Promise::all(thenables)
    }

    pub fn race<I>(&self, thenables: I) -> Promise<T, E>
    where
        I: IntoIterator,
        I::Item: Thenable<T, E> + 'static,
    {
        Promise::race(thenables)
    }
}

impl<T, E> Clone for Constructor<T, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, E> Copy for Constructor<T, E> {}

impl<T, E> Default for Constructor<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for Constructor<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("length", &self.length())
            .finish()
    }
}

/// A host-owned set of named slots a constructor can be assigned to.
pub trait Namespace<T, E> {
    fn define(&mut self, name: &str, constructor: Constructor<T, E>);
}

impl<T, E> Namespace<T, E> for HashMap<String, Constructor<T, E>> {
    fn define(&mut self, name: &str, constructor: Constructor<T, E>) {
        self.insert(name.to_owned(), constructor);
    }
}

impl<T, E> Namespace<T, E> for BTreeMap<String, Constructor<T, E>> {
    fn define(&mut self, name: &str, constructor: Constructor<T, E>) {
        self.insert(name.to_owned(), constructor);
    }
}

/// Installs the promise constructor into `namespace` under `"Promise"`,
/// replacing whatever was there.
pub fn polyfill<T, E, N>(namespace: &mut N)
where
    N: Namespace<T, E> + ?Sized,
{
    polyfill_as(namespace, DEFAULT_SLOT);
}

pub fn polyfill_as<T, E, N>(namespace: &mut N, name: &str)
where
    N: Namespace<T, E> + ?Sized,
{
    tracing::debug!(slot = name, "installing promise constructor");
    namespace.define(name, Constructor::new());
}
