//! The push-based stream protocol assertions plug into.
//!
//! A [`Publisher`] emits zero or more values to each attached [`Subscriber`],
//! followed by at most one terminal [`Completion`]. Before any value arrives the
//! publisher hands the subscriber a [`Subscription`], through which the
//! subscriber signals [`Demand`] and can cancel.
//!
//! Two producers ship with the crate so tests have something to subscribe to:
//!
//! - [`PassthroughSubject`] - driven by hand with `send`/`send_completion`
//! - [`StreamPublisher`] - adapts a [`Stream`](futures_core::Stream) of `Result`s
//!
//! # Example
//!
//! ```rust
//! use std::convert::Infallible;
//! use testkit_reactive::publisher::PassthroughSubject;
//!
//! let subject = PassthroughSubject::<i32, Infallible>::new();
//! assert_eq!(subject.subscriber_count(), 0);
//! subject.send(1); // no subscribers, value is dropped
//! ```

mod stream;
mod subject;

use std::fmt;
use std::ops::{Add, AddAssign};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::report::{self, Failure, RecordingReporter};

pub use stream::{from_stream, Drive, StreamPublisher};
pub use subject::PassthroughSubject;

/// How many more values a subscriber is willing to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Demand {
    /// No limit.
    Unlimited,
    /// At most this many more values.
    Max(usize),
}

impl Demand {
    /// A demand for no further values.
    #[must_use]
    pub const fn none() -> Self {
        Self::Max(0)
    }

    /// Returns `true` if no further values are wanted.
    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, Self::Max(0))
    }

    /// Consume one unit of demand for a delivered value.
    #[must_use]
    pub const fn consume_one(self) -> Self {
        match self {
            Self::Unlimited => Self::Unlimited,
            Self::Max(n) => Self::Max(n.saturating_sub(1)),
        }
    }
}

impl Add for Demand {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        match (self, rhs) {
            (Self::Max(a), Self::Max(b)) => Self::Max(a.saturating_add(b)),
            _ => Self::Unlimited,
        }
    }
}

impl AddAssign for Demand {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// The terminal signal of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<E> {
    /// The stream ended normally.
    Finished,
    /// The stream ended with an error.
    Failed(E),
}

impl<E> Completion<E> {
    /// Returns `true` for [`Completion::Failed`].
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Anything that can be cancelled.
pub trait Cancellable: Send + Sync {
    /// Stop the activity. Calling this more than once has no further effect.
    fn cancel(&self);
}

/// The link between one publisher and one subscriber.
pub trait Subscription: Cancellable {
    /// Ask the publisher for more values.
    fn request(&self, demand: Demand);
}

/// The consumer side of the protocol.
///
/// Publishers call these methods serially; a subscriber never sees two
/// callbacks overlap, and nothing arrives after the completion.
pub trait Subscriber<Input, Failure>: Send + Sync {
    /// Called once, before any value, with the subscription handle.
    fn receive_subscription(&self, subscription: Box<dyn Subscription>);

    /// Called for each value. Returns additional demand.
    fn receive(&self, input: Input) -> Demand;

    /// Called at most once with the terminal outcome.
    fn receive_completion(&self, completion: Completion<Failure>);
}

/// The producer side of the protocol.
pub trait Publisher {
    /// The type of values emitted.
    type Output: Send + 'static;
    /// The type of the terminal failure.
    type Failure: fmt::Debug + Send + 'static;

    /// Attach a subscriber.
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<Self::Output, Self::Failure>>);
}

impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    type Output = P::Output;
    type Failure = P::Failure;

    fn subscribe(&self, subscriber: Arc<dyn Subscriber<Self::Output, Self::Failure>>) {
        (**self).subscribe(subscriber);
    }
}

/// A type-erased cancellation handle.
///
/// Dropping the handle does **not** cancel; call [`cancel`](Self::cancel) or
/// hand it to a [`DisposeBag`](crate::sync::DisposeBag).
///
/// Handles returned by the default assertion entry points also carry the
/// failures their assertion recorded. Dropping such a handle panics with
/// those failures, so a failed check fails the test that owns the handle no
/// matter which thread delivered the value.
#[must_use = "the subscription stays active until cancelled; keep the handle or store it in a DisposeBag"]
pub struct AnyCancellable {
    inner: Mutex<Option<Arc<dyn Cancellable>>>,
    pending: Option<RecordingReporter>,
}

impl AnyCancellable {
    /// Wrap a cancellable.
    pub fn new(inner: Arc<dyn Cancellable>) -> Self {
        Self {
            inner: Mutex::new(Some(inner)),
            pending: None,
        }
    }

    /// Wrap a cancellable whose failures land in `pending` and are raised
    /// when the handle is dropped.
    pub(crate) fn deferred(inner: Arc<dyn Cancellable>, pending: RecordingReporter) -> Self {
        Self {
            inner: Mutex::new(Some(inner)),
            pending: Some(pending),
        }
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().is_none()
    }

    /// Failures recorded so far that have not been raised yet.
    #[must_use]
    pub fn pending_failures(&self) -> Vec<Failure> {
        self.pending
            .as_ref()
            .map(RecordingReporter::failures)
            .unwrap_or_default()
    }

    /// Hand the handle to a bag that cancels it on disposal.
    pub fn store_in(self, bag: &crate::sync::DisposeBag) {
        bag.insert(self);
    }

    pub(crate) fn take_failures(&self) -> Vec<Failure> {
        self.pending
            .as_ref()
            .map(RecordingReporter::take)
            .unwrap_or_default()
    }
}

impl Cancellable for AnyCancellable {
    fn cancel(&self) {
        let inner = self.inner.lock().take();
        if let Some(inner) = inner {
            inner.cancel();
        }
    }
}

impl Drop for AnyCancellable {
    fn drop(&mut self) {
        report::raise(&self.take_failures());
    }
}

impl fmt::Debug for AnyCancellable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyCancellable")
            .field("cancelled", &self.is_cancelled())
            .field("pending_failures", &self.pending_failures().len())
            .finish()
    }
}
