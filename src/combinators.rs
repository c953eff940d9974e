//! `Promise::all` and `Promise::race`.
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{Promise, Thenable};

struct Gather<T> {
    values: Vec<Option<T>>,
    remaining: usize,
}

impl<T> Gather<T> {
    /// Records the value for `index`. Returns every value, in input order,
    /// once the last one is in.
    fn fill(&mut self, index: usize, value: T) -> Option<Vec<T>> {
        let slot = &mut self.values[index];
        if slot.is_some() {
            return None;
        }
        *slot = Some(value);
        self.remaining -= 1;
        if self.remaining > 0 {
            return None;
        }
        Some(self.values.drain(..).flatten().collect())
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Fulfills with every input's value, in input order, once all of them
    /// have fulfilled. Rejects with the first rejection; later outcomes are
    /// ignored. An empty input fulfills immediately with an empty `Vec`.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_polyfill::Promise;
    ///
    /// let (first, resolve_first) = Promise::<i32, String>::pending();
    /// let all = Promise::all(vec![first, Promise::resolve(2)]);
    /// assert!(all.is_pending());
    ///
    /// resolve_first.resolve(1);
    /// assert_eq!(all.peek(), Some(Ok(vec![1, 2])));
    /// ```
    pub fn all<I>(thenables: I) -> Promise<Vec<T>, E>
    where
        I: IntoIterator,
        I::Item: Thenable<T, E> + 'static,
    {
        Promise::new(|resolver| {
            let thenables: Vec<_> = thenables.into_iter().collect();
            let total = thenables.len();
            tracing::trace!(total, "gathering promises");
            if total == 0 {
                resolver.resolve(Vec::new());
                return;
            }

            let gather = Arc::new(Mutex::new(Gather {
                values: (0..total).map(|_| None).collect(),
                remaining: total,
            }));
            for (index, thenable) in thenables.into_iter().enumerate() {
                let gather = gather.clone();
                let resolve = resolver.clone();
                let reject = resolver.clone();
                Box::new(thenable).on_settle(
                    Box::new(move |value| {
                        let done = gather.lock().fill(index, value);
                        if let Some(values) = done {
                            resolve.resolve(values);
                        }
                    }),
                    Box::new(move |reason| {
                        reject.reject(reason);
                    }),
                );
            }
        })
    }

    /// Settles the same way as whichever input settles first. An empty input
    /// never settles.
    pub fn race<I>(thenables: I) -> Promise<T, E>
    where
        I: IntoIterator,
        I::Item: Thenable<T, E> + 'static,
    {
        Promise::new(|resolver| {
            for thenable in thenables {
                let resolve = resolver.clone();
                let reject = resolver.clone();
                Box::new(thenable).on_settle(
                    Box::new(move |value| {
                        resolve.resolve(value);
                    }),
                    Box::new(move |reason| {
                        reject.reject(reason);
                    }),
                );
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Gather;
    use crate::Promise;

    #[test]
    fn test_gather_keeps_input_order() {
        let mut gather = Gather {
            values: vec![None, None, None],
            remaining: 3,
        };
        assert_eq!(gather.fill(2, "c"), None);
        assert_eq!(gather.fill(0, "a"), None);
        assert_eq!(gather.fill(1, "b"), Some(vec!["a", "b", "c"]));
    }

    #[test]
    fn test_gather_ignores_repeated_index() {
        let mut gather = Gather {
            values: vec![None, None],
            remaining: 2,
        };
        assert_eq!(gather.fill(0, 1), None);
        assert_eq!(gather.fill(0, 9), None);
        assert_eq!(gather.remaining, 1);
        assert_eq!(gather.fill(1, 2), Some(vec![1, 2]));
    }

    #[test]
    fn test_all_counts_already_settled_inputs() {
        let all = Promise::<i32, ()>::all(vec![Promise::resolve(1), Promise::resolve(2)]);
        assert_eq!(all.peek(), Some(Ok(vec![1, 2])));
    }

    #[test]
    fn test_race_with_settled_input_settles_immediately() {
        let (pending, _resolver) = Promise::<i32, &str>::pending();
        let race = Promise::race(vec![pending, Promise::reject("first")]);
        assert_eq!(race.peek(), Some(Err("first")));
    }
}
