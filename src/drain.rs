//! Per-thread FIFO of settlement and abandonment work.
//!
//! Settling one promise settles the promises derived from it, and so on down
//! the chain. Work queued while the queue is already draining on this thread
//! runs after the current job instead of nested inside it, so stack depth
//! stays flat however long the chain is. The outermost call returns only once
//! the queue is empty.
use std::cell::RefCell;
use std::collections::VecDeque;

type Job = Box<dyn FnOnce()>;

thread_local! {
    static QUEUE: RefCell<Option<VecDeque<Job>>> = RefCell::new(None);
}

pub(crate) fn run<F>(job: F)
where
    F: FnOnce() + 'static,
{
    let mut job = Some(job);
    let nested = QUEUE
        .try_with(|queue| {
            let mut queue = queue.borrow_mut();
            match queue.as_mut() {
                Some(pending) => {
                    pending.extend(job.take().map(|job| Box::new(job) as Job));
                    true
                }
                None => {
                    *queue = Some(VecDeque::new());
                    false
                }
            }
        })
        .unwrap_or(false);
    if nested {
        return;
    }
    let Some(job) = job else { return };

    let _draining = Draining;
    job();
    while let Some(next) = pop() {
        next();
    }
}

fn pop() -> Option<Job> {
    QUEUE
        .try_with(|queue| queue.borrow_mut().as_mut().and_then(VecDeque::pop_front))
        .ok()
        .flatten()
}

/// Clears the queue when the outermost `run` returns or unwinds. Jobs left
/// behind by a panic are dropped, not run.
struct Draining;

impl Drop for Draining {
    fn drop(&mut self) {
        let leftover = QUEUE.try_with(|queue| queue.borrow_mut().take());
        drop(leftover);
    }
}
