use std::fmt;

use crate::{Promise, Thenable};

/// What a `then`/`catch` handler hands back to the derived promise.
///
/// A plain [`Outcome::Value`] fulfills the derived promise directly. A
/// [`Outcome::Thenable`] is adopted: the derived promise settles the same way
/// the thenable does, whenever it does.
pub enum Outcome<T, E> {
    Value(T),
    Thenable(Box<dyn Thenable<T, E>>),
}

impl<T, E> Outcome<T, E> {
    pub fn thenable<P>(thenable: P) -> Self
    where
        P: Thenable<T, E> + 'static,
    {
        Outcome::Thenable(Box::new(thenable))
    }

    /// Whether this outcome is future-like and will be adopted rather than
    /// used as the value itself.
    pub fn is_thenable(&self) -> bool {
        matches!(self, Outcome::Thenable(_))
    }
}

impl<T, E> From<Promise<T, E>> for Outcome<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn from(promise: Promise<T, E>) -> Self {
        Outcome::thenable(promise)
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Outcome<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Outcome::Thenable(_) => f.write_str("Thenable(..)"),
        }
    }
}
