//! Per-assertion configuration.

use std::fmt;
use std::sync::Arc;

use super::subscriber::{Assert, AssertionSubscriber};
use crate::report::{RecordingReporter, Reporter, SourceLocation};
use crate::sync::Expectation;

type Callback = Box<dyn FnOnce() + Send>;

/// How an assertion reports and signals completion.
///
/// By default failures are recorded while values arrive, so a mismatch never
/// unwinds through the publisher and every later value is still checked. The
/// recorded failures are raised on the test's thread, by panicking, when the
/// returned handle is dropped or disposed, or when an attached
/// [`Expectation`] is waited on. Asynchronous tests attach an expectation and
/// wait on it after subscribing.
///
/// # Example
///
/// ```rust
/// use testkit_reactive::prelude::*;
///
/// let done = Expectation::new("values checked");
/// let options = AssertOptions::new()
///     .reporter(RecordingReporter::new())
///     .expectation(&done)
///     .message("every reading is positive");
/// # drop(options);
/// ```
#[derive(Default)]
pub struct AssertOptions {
    reporter: Option<Arc<dyn Reporter>>,
    expectation: Option<Expectation>,
    on_complete: Option<Callback>,
    message: Option<String>,
}

impl AssertOptions {
    /// Default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report failures to `reporter` instead of raising them from the handle.
    #[must_use]
    pub fn reporter<R: Reporter + 'static>(self, reporter: R) -> Self {
        self.shared_reporter(Arc::new(reporter))
    }

    /// Report failures to an already shared reporter.
    #[must_use]
    pub fn shared_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Fulfill `expectation` when the publisher completes.
    #[must_use]
    pub fn expectation(mut self, expectation: &Expectation) -> Self {
        self.expectation = Some(expectation.clone());
        self
    }

    /// Run `callback` when the publisher completes.
    ///
    /// Runs after the completion has been checked and before any expectation
    /// is fulfilled. Neither runs if a custom reporter panics on that check.
    #[must_use]
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Use `message` for failed checks instead of the generated description.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Build the subscriber. Without a custom reporter, also returns the
    /// recorder its failures land in.
    pub(crate) fn into_subscriber<I, F>(
        self,
        assertion: Assert<I, F>,
        location: SourceLocation,
    ) -> (AssertionSubscriber<I, F>, Option<RecordingReporter>) {
        let mut pending = None;
        let reporter: Arc<dyn Reporter> = if let Some(reporter) = self.reporter {
            reporter
        } else {
            let recorder = RecordingReporter::new();
            if let Some(expectation) = &self.expectation {
                expectation.watch(recorder.clone());
            }
            pending = Some(recorder.clone());
            Arc::new(recorder)
        };
        let mut subscriber = AssertionSubscriber::new(assertion, location).with_reporter(reporter);
        if let Some(message) = self.message {
            subscriber = subscriber.with_message(message);
        }
        let (callback, expectation) = (self.on_complete, self.expectation);
        if callback.is_some() || expectation.is_some() {
            subscriber = subscriber.on_complete(move || {
                if let Some(callback) = callback {
                    callback();
                }
                if let Some(expectation) = expectation {
                    expectation.fulfill();
                }
            });
        }
        (subscriber, pending)
    }
}

impl fmt::Debug for AssertOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertOptions")
            .field("custom_reporter", &self.reporter.is_some())
            .field("expectation", &self.expectation)
            .field("on_complete", &self.on_complete.is_some())
            .field("message", &self.message)
            .finish()
    }
}
