use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

use crate::{drain, Error, OnFulfilled, OnRejected, Outcome, Resolver, Thenable};

type OnFinally<T, E> = Box<dyn FnOnce(&Result<T, E>) + Send>;

/// The observable lifecycle of a [`Promise`]. Once it leaves `Pending` it
/// never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Pending,
    Fulfilled,
    Rejected,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Pending => f.write_str("pending"),
            State::Fulfilled => f.write_str("fulfilled"),
            State::Rejected => f.write_str("rejected"),
        }
    }
}

/// A deferred value: pending, then fulfilled with a `T` or rejected with an
/// `E`, exactly once.
///
/// `Promise` is a cheap handle; clones observe the same settlement. Values and
/// reasons are cloned out to every observer.
///
/// # Examples
///
/// ```
/// use promise_polyfill::{Outcome, Promise, State};
///
/// let (promise, resolver) = Promise::<&str, &str>::pending();
/// let shouted = promise.and_then(|value| Outcome::Value(value.to_uppercase()));
///
/// resolver.resolve("foo");
/// resolver.reject("ignored, already settled");
///
/// assert_eq!(promise.state(), State::Fulfilled);
/// assert_eq!(shouted.peek(), Some(Ok("FOO".to_string())));
/// ```
pub struct Promise<T, E> {
    inner: Arc<Mutex<Inner<T, E>>>,
}

struct Inner<T, E> {
    settled: Option<Result<T, E>>,
    on_fulfilled: Vec<OnFulfilled<T>>,
    on_rejected: Vec<OnRejected<E>>,
    on_finally: Vec<OnFinally<T, E>>,
    waker: Vec<Waker>,
    abandoned: bool,
}

/// Everything a settlement drained from the queues, run once the lock is
/// released so observers may call back into the promise.
struct Dispatch<T, E> {
    outcome: Result<T, E>,
    on_fulfilled: Vec<OnFulfilled<T>>,
    on_rejected: Vec<OnRejected<E>>,
    on_finally: Vec<OnFinally<T, E>>,
    waker: Vec<Waker>,
}

/// Observers released by abandonment. Dropped outside the lock since they may
/// own resolvers of derived promises.
struct Released<T, E> {
    on_fulfilled: Vec<OnFulfilled<T>>,
    on_rejected: Vec<OnRejected<E>>,
    on_finally: Vec<OnFinally<T, E>>,
    waker: Vec<Waker>,
}

impl<T, E> Inner<T, E> {
    fn new() -> Self {
        Self {
            settled: None,
            on_fulfilled: vec![],
            on_rejected: vec![],
            on_finally: vec![],
            waker: vec![],
            abandoned: false,
        }
    }

    fn state(&self) -> State {
        match self.settled {
            None => State::Pending,
            Some(Ok(_)) => State::Fulfilled,
            Some(Err(_)) => State::Rejected,
        }
    }

    fn settle(&mut self, outcome: Result<T, E>) -> Option<Dispatch<T, E>>
    where
        T: Clone,
        E: Clone,
    {
        if self.settled.is_some() {
            return None;
        }
        self.settled = Some(outcome.clone());
        Some(Dispatch {
            outcome,
            on_fulfilled: mem::take(&mut self.on_fulfilled),
            on_rejected: mem::take(&mut self.on_rejected),
            on_finally: mem::take(&mut self.on_finally),
            waker: mem::take(&mut self.waker),
        })
    }

    fn abandon(&mut self) -> Option<Released<T, E>> {
        if self.settled.is_some() || self.abandoned {
            return None;
        }
        self.abandoned = true;
        Some(Released {
            on_fulfilled: mem::take(&mut self.on_fulfilled),
            on_rejected: mem::take(&mut self.on_rejected),
            on_finally: mem::take(&mut self.on_finally),
            waker: mem::take(&mut self.waker),
        })
    }
}

impl<T: Clone, E: Clone> Dispatch<T, E> {
    fn run(self) {
        let Dispatch {
            outcome,
            on_fulfilled,
            on_rejected,
            on_finally,
            waker,
        } = self;
        match &outcome {
            Ok(value) => {
                tracing::trace!(observers = on_fulfilled.len(), "promise fulfilled");
                drop(on_rejected);
                for observer in on_fulfilled {
                    observer(value.clone());
                }
            }
            Err(reason) => {
                tracing::trace!(observers = on_rejected.len(), "promise rejected");
                drop(on_fulfilled);
                for observer in on_rejected {
                    observer(reason.clone());
                }
            }
        }
        for observer in on_finally {
            observer(&outcome);
        }
        for waker in waker {
            waker.wake();
        }
    }
}

impl<T, E> Released<T, E> {
    fn release(self) {
        tracing::debug!(
            observers = self.on_fulfilled.len() + self.on_finally.len(),
            awaiting = self.waker.len(),
            "promise abandoned while pending"
        );
        drop(self.on_fulfilled);
        drop(self.on_rejected);
        drop(self.on_finally);
        for waker in self.waker {
            waker.wake();
        }
    }
}

impl<T, E> Promise<T, E> {
    /// The constructor's arity: the executor is its only parameter.
    pub const LENGTH: usize = 1;

    pub fn state(&self) -> State {
        self.inner.lock().state()
    }

    pub fn is_pending(&self) -> bool {
        self.state() == State::Pending
    }

    pub fn is_fulfilled(&self) -> bool {
        self.state() == State::Fulfilled
    }

    pub fn is_rejected(&self) -> bool {
        self.state() == State::Rejected
    }

    /// Whether every resolver was dropped before settlement. An abandoned
    /// promise stays pending forever.
    pub fn is_abandoned(&self) -> bool {
        self.inner.lock().abandoned
    }

    /// Whether both handles observe the same settlement.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }

    pub(crate) fn id(&self) -> *const () {
        Arc::as_ptr(&self.inner).cast()
    }

    pub(crate) fn abandon(&self) {
        let released = self.inner.lock().abandon();
        if let Some(released) = released {
            released.release();
        }
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Creates a promise and runs `executor` on it right away, handing it the
    /// promise's [`Resolver`].
    ///
    /// A panic inside the executor is not caught; it unwinds to the caller.
    /// Use [`Promise::try_new`] to turn executor failures into a rejection.
    ///
    /// If the executor drops the resolver without settling, the promise is
    /// abandoned.
    pub fn new<F>(executor: F) -> Self
    where
        F: FnOnce(Resolver<T, E>),
    {
        let (promise, resolver) = Self::pending();
        tracing::trace!("running promise executor");
        executor(resolver);
        promise
    }

    /// Like [`Promise::new`], but an `Err` returned by the executor rejects the
    /// promise, unless it has already settled.
    pub fn try_new<F>(executor: F) -> Self
    where
        F: FnOnce(Resolver<T, E>) -> Result<(), E>,
    {
        Self::new(|resolver| {
            let trap = resolver.clone();
            if let Err(reason) = executor(resolver) {
                tracing::debug!("promise executor failed, rejecting");
                trap.reject(reason);
            }
        })
    }

    /// A pending promise and the resolver that settles it.
    pub fn pending() -> (Self, Resolver<T, E>) {
        let promise = Promise {
            inner: Arc::new(Mutex::new(Inner::new())),
        };
        let resolver = Resolver::new(promise.clone());
        (promise, resolver)
    }

    /// A promise already fulfilled with `value`. A thenable `value` is stored
    /// as is, not adopted.
    pub fn resolve(value: T) -> Self {
        Self::new(|resolver| {
            resolver.resolve(value);
        })
    }

    /// A promise already rejected with `reason`.
    pub fn reject(reason: E) -> Self {
        Self::new(|resolver| {
            resolver.reject(reason);
        })
    }

    /// A snapshot of the settled value or reason, `None` while pending.
    pub fn peek(&self) -> Option<Result<T, E>> {
        self.inner.lock().settled.clone()
    }

    /// Returns a new promise driven by `on_fulfilled` or `on_rejected`,
    /// whichever matches how this promise settles. The handler's
    /// [`Outcome`] fulfills the new promise, or is adopted if it is a
    /// thenable.
    ///
    /// Handlers run synchronously: now, if this promise has already settled,
    /// otherwise at settlement. When settling this promise is itself part of
    /// a cascade, the handler runs after the observers of promises settled
    /// earlier in that cascade.
    pub fn then<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Outcome<U, E> + Send + 'static,
        R: FnOnce(E) -> Outcome<U, E> + Send + 'static,
    {
        Promise::new(|resolver| {
            let fulfil = resolver.clone();
            self.subscribe(
                move |value| fulfil.adopt(on_fulfilled(value)),
                move |reason| resolver.adopt(on_rejected(reason)),
            );
        })
    }

    /// `then` with only a fulfillment handler; a rejection passes through
    /// to the returned promise unchanged.
    pub fn and_then<U, F>(&self, on_fulfilled: F) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Outcome<U, E> + Send + 'static,
    {
        Promise::new(|resolver| {
            let reject = resolver.clone();
            self.subscribe(
                move |value| resolver.adopt(on_fulfilled(value)),
                move |reason| {
                    reject.reject(reason);
                },
            );
        })
    }

    pub fn map<U, F>(&self, op: F) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.and_then(move |value| Outcome::Value(op(value)))
    }

    /// `then` with only a rejection handler; a fulfillment passes through
    /// to the returned promise unchanged.
    pub fn catch<R>(&self, on_rejected: R) -> Promise<T, E>
    where
        R: FnOnce(E) -> Outcome<T, E> + Send + 'static,
    {
        Promise::new(|resolver| {
            let resolve = resolver.clone();
            self.subscribe(
                move |value| {
                    resolve.resolve(value);
                },
                move |reason| resolver.adopt(on_rejected(reason)),
            );
        })
    }

    /// Runs `on_finally` once this promise settles either way, then settles
    /// the returned promise with the same value or reason.
    ///
    /// Finally callbacks run after every `then`/`catch` observer of the same
    /// settlement.
    pub fn finally<F>(&self, on_finally: F) -> Promise<T, E>
    where
        F: FnOnce() + Send + 'static,
    {
        Promise::new(|resolver| {
            self.subscribe_finally(move |outcome| {
                on_finally();
                match outcome {
                    Ok(value) => resolver.resolve(value.clone()),
                    Err(reason) => resolver.reject(reason.clone()),
                };
            });
        })
    }

    /// Settles the promise unless it already has. Returns whether this call
    /// did the settling.
    pub(crate) fn settle(&self, outcome: Result<T, E>) -> bool {
        let dispatch = self.inner.lock().settle(outcome);
        match dispatch {
            Some(dispatch) => {
                drain::run(move || dispatch.run());
                true
            }
            None => {
                tracing::debug!("ignoring settlement of an already settled promise");
                false
            }
        }
    }

    /// Registers raw observers. Runs the matching one immediately when
    /// already settled, drops both when abandoned.
    pub(crate) fn subscribe<F, R>(&self, on_fulfilled: F, on_rejected: R)
    where
        F: FnOnce(T) + Send + 'static,
        R: FnOnce(E) + Send + 'static,
    {
        let mut inner = self.inner.lock();
        match inner.settled.clone() {
            None if inner.abandoned => {}
            None => {
                inner.on_fulfilled.push(Box::new(on_fulfilled));
                inner.on_rejected.push(Box::new(on_rejected));
            }
            Some(Ok(value)) => {
                drop(inner);
                on_fulfilled(value);
            }
            Some(Err(reason)) => {
                drop(inner);
                on_rejected(reason);
            }
        }
    }

    fn subscribe_finally<F>(&self, observer: F)
    where
        F: FnOnce(&Result<T, E>) + Send + 'static,
    {
        let mut inner = self.inner.lock();
        match inner.settled.clone() {
            None if inner.abandoned => {}
            None => inner.on_finally.push(Box::new(observer)),
            Some(outcome) => {
                drop(inner);
                observer(&outcome);
            }
        }
    }
}

impl<T, E> Thenable<T, E> for Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn on_settle(self: Box<Self>, on_fulfilled: OnFulfilled<T>, on_rejected: OnRejected<E>) {
        self.subscribe(on_fulfilled, on_rejected);
    }

    fn promise_id(&self) -> Option<*const ()> {
        Some(self.id())
    }
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Promise")
            .field("state", &inner.state())
            .field("abandoned", &inner.abandoned)
            .finish()
    }
}

/// Awaiting a promise yields a clone of its value, or why there is none.
impl<T: Clone, E: Clone> Future for Promise<T, E> {
    type Output = Result<T, Error<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.inner.lock();
        match inner.settled.clone() {
            Some(Ok(value)) => Poll::Ready(Ok(value)),
            Some(Err(reason)) => Poll::Ready(Err(Error::Rejected(reason))),
            None if inner.abandoned => Poll::Ready(Err(Error::Abandoned)),
            None => {
                if !inner.waker.iter().any(|waker| waker.will_wake(cx.waker())) {
                    inner.waker.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}
