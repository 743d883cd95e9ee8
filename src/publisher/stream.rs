//! Adapting a [`Stream`] of `Result`s into a [`Publisher`].
//!
//! # Example
//!
//! ```rust
//! use futures::stream;
//! use testkit_reactive::prelude::*;
//!
//! let publisher = from_stream(stream::iter(vec![Ok::<_, String>(1), Ok(2)]));
//! let reporter = RecordingReporter::new();
//!
//! let _handle = publisher
//!     .asserting(AssertOptions::new().reporter(reporter.clone()))
//!     .greater_than(0);
//!
//! futures::executor::block_on(publisher.drive());
//! assert!(reporter.is_empty());
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use parking_lot::Mutex;
use pin_project_lite::pin_project;

use super::{Completion, PassthroughSubject, Publisher, Subscriber};

/// Wrap a stream of `Result`s as a publisher.
///
/// Each `Ok` item is emitted as a value. The first `Err` item terminates the
/// publisher with [`Completion::Failed`]; the end of the stream terminates it
/// with [`Completion::Finished`].
pub fn from_stream<S, T, E>(stream: S) -> StreamPublisher<S, T, E>
where
    S: Stream<Item = Result<T, E>>,
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    StreamPublisher {
        stream: Mutex::new(Some(stream)),
        subject: PassthroughSubject::new(),
    }
}

/// A publisher fed by a [`Stream`].
///
/// Nothing is pulled from the stream until [`drive`](Self::drive) is awaited,
/// so subscribers attached beforehand observe every item. Items are fanned out
/// to all subscribers with outstanding demand.
pub struct StreamPublisher<S, T, E> {
    stream: Mutex<Option<S>>,
    subject: PassthroughSubject<T, E>,
}

impl<S, T, E> StreamPublisher<S, T, E>
where
    S: Stream<Item = Result<T, E>>,
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Take the stream and return a future that pushes it to subscribers.
    ///
    /// The stream can only be driven once; later calls return a future that
    /// completes immediately.
    pub fn drive(&self) -> Drive<S, T, E> {
        Drive {
            stream: self.stream.lock().take(),
            subject: self.subject.clone(),
        }
    }

    /// Returns `true` while the stream has not been handed to a [`Drive`].
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.stream.lock().is_some()
    }
}

impl<S, T, E> Publisher for StreamPublisher<S, T, E>
where
    S: Stream<Item = Result<T, E>>,
    T: Clone + Send + 'static,
    E: Clone + fmt::Debug + Send + 'static,
{
    type Output = T;
    type Failure = E;

    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T, E>>) {
        self.subject.subscribe(subscriber);
    }
}

impl<S, T, E> fmt::Debug for StreamPublisher<S, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamPublisher")
            .field("pending", &self.stream.lock().is_some())
            .finish_non_exhaustive()
    }
}

pin_project! {
    /// Future returned by [`StreamPublisher::drive`].
    #[must_use = "futures do nothing unless polled"]
    pub struct Drive<S, T, E> {
        #[pin]
        stream: Option<S>,
        subject: PassthroughSubject<T, E>,
    }
}

impl<S, T, E> Future for Drive<S, T, E>
where
    S: Stream<Item = Result<T, E>>,
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();

        loop {
            let Some(stream) = this.stream.as_mut().as_pin_mut() else {
                return Poll::Ready(());
            };

            match stream.poll_next(cx) {
                Poll::Ready(Some(Ok(value))) => this.subject.send(value),
                Poll::Ready(Some(Err(error))) => {
                    this.stream.set(None);
                    this.subject.send_completion(Completion::Failed(error));
                    return Poll::Ready(());
                }
                Poll::Ready(None) => {
                    this.stream.set(None);
                    this.subject.send_completion(Completion::Finished);
                    return Poll::Ready(());
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
