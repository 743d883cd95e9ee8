//! The subscriber that turns stream events into assertion results.

use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::Mutex;

use super::matcher::Matcher;
use crate::publisher::{Cancellable, Completion, Demand, Subscriber, Subscription};
use crate::report::{FailureKind, Mismatch, PanicReporter, Reporter, SourceLocation};

/// The result of checking one value or failure.
pub type Verdict = Result<(), Mismatch>;

/// A boxed check run against one value or failure.
pub type Check<T> = Box<dyn Fn(T) -> Verdict + Send + Sync>;
type OnComplete = Box<dyn FnOnce() + Send>;

/// What an [`AssertionSubscriber`] checks.
///
/// An `Input` assertion checks every value and treats a failure as a test
/// failure. A `Failure` assertion ignores values and checks the terminal
/// error, treating a clean finish as a test failure.
pub enum Assert<Input, Failure> {
    /// Check each value.
    Input(Check<Input>),
    /// Check the terminal error.
    Failure(Check<Failure>),
}

impl<Input: 'static, Failure: 'static> Assert<Input, Failure> {
    /// Check each value with `check`.
    ///
    /// ```rust
    /// use testkit_reactive::assertions::Assert;
    /// use testkit_reactive::report::Mismatch;
    ///
    /// let assertion = Assert::<i32, String>::input(|value| {
    ///     if value % 2 == 0 {
    ///         Ok(())
    ///     } else {
    ///         Err(Mismatch::value(format!("{value} is odd")))
    ///     }
    /// });
    /// assert!(assertion.is_input());
    /// ```
    pub fn input<F>(check: F) -> Self
    where
        F: Fn(Input) -> Verdict + Send + Sync + 'static,
    {
        Self::Input(Box::new(check))
    }

    /// Check the terminal error with `check`.
    pub fn failure<F>(check: F) -> Self
    where
        F: Fn(Failure) -> Verdict + Send + Sync + 'static,
    {
        Self::Failure(Box::new(check))
    }

    /// Check each value against a matcher.
    pub fn matching<M>(matcher: M) -> Self
    where
        M: Matcher<Input> + Send + Sync + 'static,
    {
        Self::input(move |value: Input| {
            if matcher.matches(&value) {
                Ok(())
            } else {
                Err(Mismatch::value(matcher.describe_mismatch(&value)))
            }
        })
    }
}

impl<Input, Failure> Assert<Input, Failure> {
    /// Returns `true` for [`Assert::Input`].
    #[must_use]
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Input(_))
    }

    /// Returns `true` for [`Assert::Failure`].
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

impl<Input, Failure> Debug for Assert<Input, Failure> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Input(_) => "Assert::Input(..)",
            Self::Failure(_) => "Assert::Failure(..)",
        })
    }
}

/// A subscriber that checks what a publisher emits.
///
/// It requests unlimited demand as soon as it is subscribed, runs its
/// [`Assert`] against values or the terminal error, and reports every mismatch
/// to its [`Reporter`] tagged with the location the assertion was written at.
/// A failed check does not stop the subscription unless the reporter panics.
///
/// Built with [`new`](Self::new) it reports to a [`PanicReporter`]; the entry
/// points on
/// [`PublisherAssertExt`](crate::assertions::PublisherAssertExt) record
/// failures instead and raise them from the returned handle.
pub struct AssertionSubscriber<Input, Failure> {
    assertion: Assert<Input, Failure>,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
    on_complete: Mutex<Option<OnComplete>>,
    reporter: Arc<dyn Reporter>,
    message: Option<String>,
    location: SourceLocation,
}

impl<Input, Failure> AssertionSubscriber<Input, Failure> {
    /// Create a subscriber that panics on the first mismatch.
    pub fn new(assertion: Assert<Input, Failure>, location: SourceLocation) -> Self {
        Self {
            assertion,
            subscription: Mutex::new(None),
            on_complete: Mutex::new(None),
            reporter: Arc::new(PanicReporter),
            message: None,
            location,
        }
    }

    /// Report to `reporter` instead of panicking.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Run `callback` once the publisher completes, whichever way.
    ///
    /// The callback runs after the completion has been checked. If the
    /// reporter panics on that check, the callback does not run.
    #[must_use]
    pub fn on_complete<F>(self, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        *self.on_complete.lock() = Some(Box::new(callback));
        self
    }

    /// Replace the message of failed checks with `message`.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Where the assertion was written.
    #[must_use]
    pub fn location(&self) -> SourceLocation {
        self.location
    }

    /// Returns `true` while holding an upstream subscription.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscription.lock().is_some()
    }

    fn report(&self, mismatch: Mismatch) {
        self.reporter.report(mismatch.at(self.location));
    }

    fn report_check(&self, verdict: Verdict) {
        if let Err(mismatch) = verdict {
            let mismatch = match &self.message {
                Some(message) => Mismatch::new(mismatch.kind, message.clone()),
                None => mismatch,
            };
            self.report(mismatch);
        }
    }
}

impl<Input, Failure> Subscriber<Input, Failure> for AssertionSubscriber<Input, Failure>
where
    Failure: Debug,
{
    fn receive_subscription(&self, subscription: Box<dyn Subscription>) {
        let subscription: Arc<dyn Subscription> = Arc::from(subscription);
        {
            let mut slot = self.subscription.lock();
            if slot.is_some() {
                drop(slot);
                tracing::debug!(location = %self.location, "already subscribed; cancelling extra subscription");
                subscription.cancel();
                return;
            }
            *slot = Some(Arc::clone(&subscription));
        }
        tracing::debug!(location = %self.location, "assertion subscribed");
        subscription.request(Demand::Unlimited);
    }

    fn receive(&self, input: Input) -> Demand {
        if let Assert::Input(check) = &self.assertion {
            tracing::trace!(location = %self.location, "checking value");
            self.report_check(check(input));
        }
        Demand::Unlimited
    }

    fn receive_completion(&self, completion: Completion<Failure>) {
        let callback = self.on_complete.lock().take();
        self.subscription.lock().take();
        tracing::debug!(
            location = %self.location,
            failed = completion.is_failed(),
            "asserted publisher completed"
        );

        match (&self.assertion, completion) {
            (Assert::Input(_), Completion::Failed(error)) => self.report(Mismatch::new(
                FailureKind::UnexpectedFailure,
                format!("failed with an error when only values were expected: {error:?}"),
            )),
            (Assert::Failure(check), Completion::Failed(error)) => self.report_check(check(error)),
            (Assert::Failure(_), Completion::Finished) => self.report(Mismatch::new(
                FailureKind::MissingFailure,
                "completed without producing the expected error",
            )),
            (Assert::Input(_), Completion::Finished) => {}
        }

        if let Some(callback) = callback {
            callback();
        }
    }
}

impl<Input, Failure> Cancellable for AssertionSubscriber<Input, Failure> {
    fn cancel(&self) {
        let subscription = self.subscription.lock().take();
        if let Some(subscription) = subscription {
            tracing::debug!(location = %self.location, "assertion cancelled");
            subscription.cancel();
        }
    }
}

impl<Input, Failure> Debug for AssertionSubscriber<Input, Failure> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertionSubscriber")
            .field("assertion", &self.assertion)
            .field("subscribed", &self.is_subscribed())
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertions::matcher::gt;
    use crate::report::RecordingReporter;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeSubscription {
        requested: Mutex<Vec<Demand>>,
        cancels: AtomicUsize,
    }

    impl Cancellable for FakeSubscription {
        fn cancel(&self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Subscription for FakeSubscription {
        fn request(&self, demand: Demand) {
            self.requested.lock().push(demand);
        }
    }

    /// Forwards to a shared fake so the test can inspect it after handing
    /// ownership to the subscriber.
    struct Shared(Arc<FakeSubscription>);

    impl Cancellable for Shared {
        fn cancel(&self) {
            self.0.cancel();
        }
    }

    impl Subscription for Shared {
        fn request(&self, demand: Demand) {
            self.0.request(demand);
        }
    }

    fn here() -> SourceLocation {
        SourceLocation::new("tests/streams.rs", 7, 3)
    }

    fn recording<I: 'static, F: 'static>(
        assertion: Assert<I, F>,
    ) -> (AssertionSubscriber<I, F>, RecordingReporter) {
        let reporter = RecordingReporter::new();
        let subscriber =
            AssertionSubscriber::new(assertion, here()).with_reporter(Arc::new(reporter.clone()));
        (subscriber, reporter)
    }

    fn equals_one() -> Assert<i32, String> {
        Assert::input(|value| {
            if value == 1 {
                Ok(())
            } else {
                Err(Mismatch::value(format!("{value} does not equal 1")))
            }
        })
    }

    #[test]
    fn test_requests_unlimited_demand_on_subscription() {
        let fake = Arc::new(FakeSubscription::default());
        let (subscriber, _) = recording(equals_one());

        assert!(!subscriber.is_subscribed());
        subscriber.receive_subscription(Box::new(Shared(fake.clone())));

        assert!(subscriber.is_subscribed());
        assert_eq!(*fake.requested.lock(), vec![Demand::Unlimited]);
    }

    #[test]
    fn test_second_subscription_is_cancelled() {
        let first = Arc::new(FakeSubscription::default());
        let second = Arc::new(FakeSubscription::default());
        let (subscriber, _) = recording(equals_one());

        subscriber.receive_subscription(Box::new(Shared(first.clone())));
        subscriber.receive_subscription(Box::new(Shared(second.clone())));

        assert_eq!(second.cancels.load(Ordering::SeqCst), 1);
        assert!(second.requested.lock().is_empty());
        assert_eq!(first.cancels.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_input_mode_checks_every_value() {
        let (subscriber, reporter) = recording(equals_one());

        assert_eq!(subscriber.receive(1), Demand::Unlimited);
        assert_eq!(subscriber.receive(2), Demand::Unlimited);
        assert_eq!(subscriber.receive(1), Demand::Unlimited);
        assert_eq!(subscriber.receive(3), Demand::Unlimited);

        let failures = reporter.failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].message, "2 does not equal 1");
        assert_eq!(failures[1].message, "3 does not equal 1");
        assert_eq!(failures[0].location, here());
    }

    #[test]
    fn test_input_mode_reports_unexpected_failure() {
        let (subscriber, reporter) = recording(equals_one());
        subscriber.receive_completion(Completion::Failed("offline".to_string()));

        let failures = reporter.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::UnexpectedFailure);
        assert!(failures[0].message.contains("\"offline\""));
    }

    #[test]
    fn test_input_mode_finished_is_silent() {
        let (subscriber, reporter) = recording(equals_one());
        subscriber.receive_completion(Completion::Finished);
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_failure_mode_ignores_values() {
        let (subscriber, reporter) = recording(Assert::<i32, String>::failure(|_| Ok(())));

        assert_eq!(subscriber.receive(1), Demand::Unlimited);
        assert_eq!(subscriber.receive(2), Demand::Unlimited);

        assert!(reporter.is_empty());
    }

    #[test]
    fn test_failure_mode_reports_missing_failure() {
        let (subscriber, reporter) = recording(Assert::<i32, String>::failure(|_| Ok(())));
        subscriber.receive_completion(Completion::Finished);

        assert_eq!(reporter.count_of(FailureKind::MissingFailure), 1);
        assert_eq!(reporter.count(), 1);
    }

    #[test]
    fn test_failure_mode_checks_error() {
        let (subscriber, reporter) = recording(Assert::<i32, String>::failure(|error| {
            if error == "timeout" {
                Ok(())
            } else {
                Err(Mismatch::new(FailureKind::EqualityMismatch, error))
            }
        }));
        subscriber.receive_completion(Completion::Failed("refused".to_string()));

        let failures = reporter.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::EqualityMismatch);
        assert_eq!(failures[0].message, "refused");
    }

    #[test]
    fn test_message_override_applies_to_checks_only() {
        let (subscriber, reporter) = recording(equals_one());
        let subscriber = subscriber.with_message("login emits the user id");

        subscriber.receive(5);
        subscriber.receive_completion(Completion::Failed("offline".to_string()));

        let failures = reporter.failures();
        assert_eq!(failures[0].message, "login emits the user id");
        assert_eq!(failures[0].kind, FailureKind::ValueMismatch);
        assert_ne!(failures[1].message, "login emits the user id");
    }

    #[test]
    fn test_completion_callback_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (subscriber, _) = recording(equals_one());
        let subscriber = subscriber.on_complete(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        subscriber.receive_completion(Completion::Finished);
        subscriber.receive_completion(Completion::Finished);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_completion_callback_skipped_when_reporter_panics() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let subscriber = AssertionSubscriber::new(Assert::<i32, String>::failure(|_| Ok(())), here())
            .on_complete(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            subscriber.receive_completion(Completion::Finished);
        }));

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_forwards_once() {
        let fake = Arc::new(FakeSubscription::default());
        let (subscriber, reporter) = recording(equals_one());
        subscriber.receive_subscription(Box::new(Shared(fake.clone())));

        subscriber.cancel();
        subscriber.cancel();

        assert_eq!(fake.cancels.load(Ordering::SeqCst), 1);
        assert!(!subscriber.is_subscribed());
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_cancel_without_subscription_is_noop() {
        let (subscriber, reporter) = recording(equals_one());
        subscriber.cancel();
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_completion_releases_subscription() {
        let fake = Arc::new(FakeSubscription::default());
        let (subscriber, _) = recording(equals_one());
        subscriber.receive_subscription(Box::new(Shared(fake.clone())));

        subscriber.receive_completion(Completion::Finished);
        subscriber.cancel();

        assert!(!subscriber.is_subscribed());
        assert_eq!(fake.cancels.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_matching_uses_mismatch_description() {
        let (subscriber, reporter) =
            recording(Assert::<i32, String>::matching(gt(1)));

        subscriber.receive(1);
        subscriber.receive(2);

        let failures = reporter.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].message, "1 is not greater than 1");
    }

    #[test]
    #[should_panic(expected = "value mismatch: 2 does not equal 1 (at tests/streams.rs:7:3)")]
    fn test_default_reporter_panics() {
        let subscriber = AssertionSubscriber::new(equals_one(), here());
        subscriber.receive(2);
    }
}
