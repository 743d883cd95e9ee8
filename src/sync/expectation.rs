//! One-shot expectations for asynchronous assertions.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};
use crate::report::{self, RecordingReporter};

/// A signal a test waits on until something fulfills it.
///
/// Pass an expectation to an assertion through
/// [`AssertOptions::expectation`](crate::assertions::AssertOptions::expectation)
/// and it is fulfilled when the publisher completes. Clones share state.
///
/// Waiting also surfaces the failures of every assertion that reports through
/// the default recorder: [`wait`](Self::wait) and
/// [`wait_timeout`](Self::wait_timeout) panic with them on the waiting thread.
#[derive(Clone)]
pub struct Expectation {
    inner: Arc<ExpectationInner>,
}

struct ExpectationInner {
    description: String,
    state: Mutex<ExpectationState>,
    fulfilled: Condvar,
}

#[derive(Default)]
struct ExpectationState {
    fulfillments: usize,
    wakers: Vec<Waker>,
    watched: Vec<RecordingReporter>,
}

impl Expectation {
    /// Create an unfulfilled expectation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ExpectationInner {
                description: description.into(),
                state: Mutex::new(ExpectationState::default()),
                fulfilled: Condvar::new(),
            }),
        }
    }

    /// The description given at creation.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.inner.description
    }

    /// Mark the expectation fulfilled and wake every waiter.
    pub fn fulfill(&self) {
        let wakers = {
            let mut state = self.inner.state.lock();
            state.fulfillments += 1;
            if state.fulfillments > 1 {
                tracing::debug!(
                    description = %self.inner.description,
                    count = state.fulfillments,
                    "expectation fulfilled more than once"
                );
            }
            std::mem::take(&mut state.wakers)
        };
        self.inner.fulfilled.notify_all();
        for waker in wakers {
            waker.wake();
        }
    }

    /// Returns `true` once [`fulfill`](Self::fulfill) has been called.
    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        self.fulfillment_count() > 0
    }

    /// How many times [`fulfill`](Self::fulfill) has been called.
    #[must_use]
    pub fn fulfillment_count(&self) -> usize {
        self.inner.state.lock().fulfillments
    }

    /// Block the current thread until fulfilled or `timeout` elapses.
    ///
    /// A timeout too large to represent as a deadline waits without one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the expectation is still unfulfilled
    /// when the timeout elapses.
    ///
    /// # Panics
    ///
    /// Panics with the failures recorded by watched assertions.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.inner.state.lock();
        let mut timed_out = false;
        while state.fulfillments == 0 {
            match deadline {
                Some(deadline) => {
                    if self.inner.fulfilled.wait_until(&mut state, deadline).timed_out() {
                        timed_out = state.fulfillments == 0;
                        break;
                    }
                }
                None => self.inner.fulfilled.wait(&mut state),
            }
        }
        drop(state);

        self.inner.raise_recorded();
        if timed_out {
            return Err(Error::Timeout(timeout));
        }
        Ok(())
    }

    /// Surface the failures recorded through `reporter` when this
    /// expectation is waited on.
    pub(crate) fn watch(&self, reporter: RecordingReporter) {
        self.inner.state.lock().watched.push(reporter);
    }

    /// A future that resolves once the expectation is fulfilled.
    ///
    /// Combine with a runtime timeout (for example `tokio::time::timeout`)
    /// when the publisher might never complete.
    pub fn wait(&self) -> Fulfillment {
        Fulfillment {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expectation")
            .field("description", &self.inner.description)
            .field("fulfillments", &self.fulfillment_count())
            .finish()
    }
}

impl ExpectationInner {
    fn raise_recorded(&self) {
        let watched = self.state.lock().watched.clone();
        let failures: Vec<_> = watched.iter().flat_map(RecordingReporter::take).collect();
        report::raise(&failures);
    }
}

/// Future returned by [`Expectation::wait`].
///
/// Panics when it resolves if a watched assertion recorded failures.
#[must_use = "futures do nothing unless polled"]
pub struct Fulfillment {
    inner: Arc<ExpectationInner>,
}

impl Future for Fulfillment {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.inner.state.lock();
        if state.fulfillments > 0 {
            drop(state);
            self.inner.raise_recorded();
            return Poll::Ready(());
        }
        if !state.wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
            state.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{FailureKind, Mismatch, Reporter, SourceLocation};
    use std::thread;

    fn watched_failure(expectation: &Expectation, message: &str) -> RecordingReporter {
        let reporter = RecordingReporter::new();
        expectation.watch(reporter.clone());
        reporter.report(Mismatch::value(message).at(SourceLocation::new("t.rs", 9, 5)));
        reporter
    }

    #[test]
    fn test_new_expectation_is_unfulfilled() {
        let expectation = Expectation::new("done");
        assert!(!expectation.is_fulfilled());
        assert_eq!(expectation.fulfillment_count(), 0);
        assert_eq!(expectation.description(), "done");
    }

    #[test]
    fn test_fulfill_is_counted() {
        let expectation = Expectation::new("done");
        expectation.fulfill();
        expectation.clone().fulfill();

        assert!(expectation.is_fulfilled());
        assert_eq!(expectation.fulfillment_count(), 2);
    }

    #[test]
    fn test_wait_timeout_returns_when_already_fulfilled() {
        let expectation = Expectation::new("done");
        expectation.fulfill();
        assert_eq!(expectation.wait_timeout(Duration::ZERO), Ok(()));
    }

    #[test]
    fn test_wait_timeout_times_out() {
        let expectation = Expectation::new("never");
        let result = expectation.wait_timeout(Duration::from_millis(20));
        assert_eq!(result, Err(Error::Timeout(Duration::from_millis(20))));
    }

    #[test]
    fn test_wait_timeout_wakes_on_fulfill_from_other_thread() {
        let expectation = Expectation::new("threaded");
        let signal = expectation.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            signal.fulfill();
        });

        assert!(expectation.wait_timeout(Duration::from_secs(5)).is_ok());
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_future_pending_until_fulfilled() {
        let expectation = Expectation::new("async");
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut future = expectation.wait();

        assert!(Pin::new(&mut future).poll(&mut cx).is_pending());
        assert!(Pin::new(&mut future).poll(&mut cx).is_pending());
        assert_eq!(expectation.inner.state.lock().wakers.len(), 1);

        expectation.fulfill();
        assert!(Pin::new(&mut future).poll(&mut cx).is_ready());
    }

    #[tokio::test]
    async fn test_wait_future_resolves_across_tasks() {
        let expectation = Expectation::new("spawned");
        let signal = expectation.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            signal.fulfill();
        });

        tokio::time::timeout(Duration::from_secs(5), expectation.wait())
            .await
            .expect("expectation was not fulfilled");
    }

    #[test]
    fn test_wait_timeout_accepts_unrepresentable_deadline() {
        let expectation = Expectation::new("unbounded");
        let signal = expectation.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            signal.fulfill();
        });

        assert_eq!(expectation.wait_timeout(Duration::MAX), Ok(()));
        handle.join().unwrap();
    }

    #[test]
    #[should_panic(expected = "assertion failed: value mismatch: 1 is not greater than 1 (at t.rs:9:5)")]
    fn test_wait_timeout_raises_watched_failures() {
        let expectation = Expectation::new("checked");
        watched_failure(&expectation, "1 is not greater than 1");
        expectation.fulfill();

        let _ = expectation.wait_timeout(Duration::from_secs(1));
    }

    #[test]
    #[should_panic(expected = "value mismatch: never completed cleanly")]
    fn test_wait_timeout_raises_failures_before_timing_out() {
        let expectation = Expectation::new("stalled");
        watched_failure(&expectation, "never completed cleanly");

        let _ = expectation.wait_timeout(Duration::from_millis(10));
    }

    #[test]
    fn test_raised_failures_are_drained() {
        let expectation = Expectation::new("checked");
        let reporter = watched_failure(&expectation, "boom");
        expectation.fulfill();

        let first = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            expectation.wait_timeout(Duration::ZERO)
        }));
        assert!(first.is_err());
        assert!(reporter.is_empty());
        assert_eq!(expectation.wait_timeout(Duration::ZERO), Ok(()));
    }

    #[tokio::test]
    #[should_panic(expected = "type mismatch")]
    async fn test_wait_future_raises_watched_failures() {
        let expectation = Expectation::new("spawned");
        let reporter = RecordingReporter::new();
        expectation.watch(reporter.clone());
        let signal = expectation.clone();
        tokio::spawn(async move {
            reporter.report(Mismatch::new(FailureKind::TypeMismatch, "wrong error").at(
                SourceLocation::new("t.rs", 1, 1),
            ));
            signal.fulfill();
        })
        .await
        .unwrap();

        expectation.wait().await;
    }
}
