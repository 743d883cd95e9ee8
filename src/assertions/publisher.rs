//! Fluent assertions attached to any [`Publisher`].
//!
//! Each entry point subscribes an [`AssertionSubscriber`] and hands back the
//! [`AnyCancellable`] that keeps it attached.
//!
//! # Example
//!
//! ```rust
//! use std::convert::Infallible;
//! use testkit_reactive::prelude::*;
//!
//! let subject = PassthroughSubject::<i32, Infallible>::new();
//! let bag = DisposeBag::new();
//!
//! subject.assert_greater_than(0).store_in(&bag);
//! subject.assert_true(|value| value % 2 == 0).store_in(&bag);
//!
//! subject.send(2);
//! subject.send(4);
//! subject.send_completion(Completion::Finished);
//! ```

use std::any::{type_name, Any};
use std::error::Error;
use std::fmt::Debug;
use std::sync::Arc;

use super::matcher::{compare, eq, is_none, is_some, satisfies, Comparison, Matcher};
use super::options::AssertOptions;
use super::subscriber::{Assert, AssertionSubscriber};
use crate::publisher::{AnyCancellable, Publisher};
use crate::report::{FailureKind, Mismatch, SourceLocation};

/// Assertion entry points for every [`Publisher`].
///
/// Every method records mismatches while values arrive and keeps checking.
/// The returned handle panics with the recorded failures when it is dropped
/// or its [`DisposeBag`](crate::sync::DisposeBag) is disposed, so the test
/// fails on its own thread even when a spawned task or thread drives the
/// publisher. To use another reporter, fulfill an
/// [`Expectation`](crate::sync::Expectation) or change the message, start
/// from [`asserting`](Self::asserting).
pub trait PublisherAssertExt: Publisher {
    /// Configure an assertion before choosing its check.
    fn asserting(&self, options: AssertOptions) -> Asserting<'_, Self> {
        Asserting {
            publisher: self,
            options,
        }
    }

    /// Attach a hand-written [`Assert`].
    #[track_caller]
    fn assert_with(&self, assertion: Assert<Self::Output, Self::Failure>) -> AnyCancellable {
        self.asserting(AssertOptions::default()).with(assertion)
    }

    /// Every value must satisfy `matcher`.
    #[track_caller]
    fn assert_matches<M>(&self, matcher: M) -> AnyCancellable
    where
        M: Matcher<Self::Output> + Send + Sync + 'static,
    {
        self.asserting(AssertOptions::default()).matches(matcher)
    }

    /// Every value must equal `expected`.
    #[track_caller]
    fn assert_equal(&self, expected: Self::Output) -> AnyCancellable
    where
        Self::Output: PartialEq + Debug + Sync,
    {
        self.asserting(AssertOptions::default()).equal(expected)
    }

    /// Every value must stand in `comparison` to `threshold`.
    #[track_caller]
    fn assert_compare(&self, comparison: Comparison, threshold: Self::Output) -> AnyCancellable
    where
        Self::Output: PartialOrd + Debug + Sync,
    {
        self.asserting(AssertOptions::default())
            .compare(comparison, threshold)
    }

    /// Every value must be greater than `threshold`.
    #[track_caller]
    fn assert_greater_than(&self, threshold: Self::Output) -> AnyCancellable
    where
        Self::Output: PartialOrd + Debug + Sync,
    {
        self.assert_compare(Comparison::GreaterThan, threshold)
    }

    /// Every value must be greater than or equal to `threshold`.
    #[track_caller]
    fn assert_greater_than_or_equal(&self, threshold: Self::Output) -> AnyCancellable
    where
        Self::Output: PartialOrd + Debug + Sync,
    {
        self.assert_compare(Comparison::GreaterThanOrEqual, threshold)
    }

    /// Every value must be less than `threshold`.
    #[track_caller]
    fn assert_less_than(&self, threshold: Self::Output) -> AnyCancellable
    where
        Self::Output: PartialOrd + Debug + Sync,
    {
        self.assert_compare(Comparison::LessThan, threshold)
    }

    /// Every value must be less than or equal to `threshold`.
    #[track_caller]
    fn assert_less_than_or_equal(&self, threshold: Self::Output) -> AnyCancellable
    where
        Self::Output: PartialOrd + Debug + Sync,
    {
        self.assert_compare(Comparison::LessThanOrEqual, threshold)
    }

    /// Every value must be `None`.
    #[track_caller]
    fn assert_none<T>(&self) -> AnyCancellable
    where
        Self: Publisher<Output = Option<T>>,
        T: Debug + 'static,
    {
        self.asserting(AssertOptions::default()).none::<T>()
    }

    /// Every value must be `Some(_)`.
    #[track_caller]
    fn assert_some<T>(&self) -> AnyCancellable
    where
        Self: Publisher<Output = Option<T>>,
        T: Debug + 'static,
    {
        self.asserting(AssertOptions::default()).some::<T>()
    }

    /// `predicate` must hold for every value.
    #[track_caller]
    fn assert_predicate<F>(&self, predicate: F) -> AnyCancellable
    where
        F: Fn(&Self::Output) -> bool + Send + Sync + 'static,
        Self::Output: Debug,
    {
        self.asserting(AssertOptions::default()).predicate(predicate)
    }

    /// `predicate` must return `true` for every value.
    #[track_caller]
    fn assert_true<F>(&self, predicate: F) -> AnyCancellable
    where
        F: Fn(&Self::Output) -> bool + Send + Sync + 'static,
        Self::Output: Debug,
    {
        self.asserting(AssertOptions::default()).is_true(predicate)
    }

    /// `predicate` must return `false` for every value.
    #[track_caller]
    fn assert_false<F>(&self, predicate: F) -> AnyCancellable
    where
        F: Fn(&Self::Output) -> bool + Send + Sync + 'static,
        Self::Output: Debug,
    {
        self.asserting(AssertOptions::default()).is_false(predicate)
    }

    /// The publisher must fail; any error is accepted.
    #[track_caller]
    fn assert_fails(&self) -> AnyCancellable {
        self.asserting(AssertOptions::default()).fails()
    }

    /// The publisher must fail with an error of type `T`.
    #[track_caller]
    fn assert_fails_with_type<T>(&self) -> AnyCancellable
    where
        T: Error + 'static,
    {
        self.asserting(AssertOptions::default()).fails_with_type::<T>()
    }

    /// The publisher must fail with an error equal to `expected`.
    #[track_caller]
    fn assert_fails_with_equal<E>(&self, expected: E) -> AnyCancellable
    where
        E: Error + PartialEq + Send + Sync + 'static,
    {
        self.asserting(AssertOptions::default())
            .fails_with_equal(expected)
    }
}

impl<P: Publisher + ?Sized> PublisherAssertExt for P {}

/// A configured assertion waiting for its check.
///
/// Created by [`PublisherAssertExt::asserting`]. Each method subscribes and
/// returns the handle.
#[must_use = "choose a check to attach the assertion"]
pub struct Asserting<'a, P: ?Sized> {
    publisher: &'a P,
    options: AssertOptions,
}

impl<P: Publisher + ?Sized> Asserting<'_, P> {
    /// Attach a hand-written [`Assert`].
    #[track_caller]
    pub fn with(self, assertion: Assert<P::Output, P::Failure>) -> AnyCancellable {
        let location = SourceLocation::caller();
        let (subscriber, pending) = self.options.into_subscriber(assertion, location);
        let subscriber: Arc<AssertionSubscriber<P::Output, P::Failure>> = Arc::new(subscriber);
        tracing::debug!(%location, "attaching assertion");
        self.publisher.subscribe(subscriber.clone());
        match pending {
            Some(pending) => AnyCancellable::deferred(subscriber, pending),
            None => AnyCancellable::new(subscriber),
        }
    }

    /// Every value must satisfy `matcher`.
    #[track_caller]
    pub fn matches<M>(self, matcher: M) -> AnyCancellable
    where
        M: Matcher<P::Output> + Send + Sync + 'static,
    {
        self.with(Assert::matching(matcher))
    }

    /// Every value must equal `expected`.
    #[track_caller]
    pub fn equal(self, expected: P::Output) -> AnyCancellable
    where
        P::Output: PartialEq + Debug + Sync,
    {
        self.matches(eq(expected))
    }

    /// Every value must stand in `comparison` to `threshold`.
    #[track_caller]
    pub fn compare(self, comparison: Comparison, threshold: P::Output) -> AnyCancellable
    where
        P::Output: PartialOrd + Debug + Sync,
    {
        self.matches(compare(comparison, threshold))
    }

    /// Every value must be greater than `threshold`.
    #[track_caller]
    pub fn greater_than(self, threshold: P::Output) -> AnyCancellable
    where
        P::Output: PartialOrd + Debug + Sync,
    {
        self.compare(Comparison::GreaterThan, threshold)
    }

    /// Every value must be greater than or equal to `threshold`.
    #[track_caller]
    pub fn greater_than_or_equal(self, threshold: P::Output) -> AnyCancellable
    where
        P::Output: PartialOrd + Debug + Sync,
    {
        self.compare(Comparison::GreaterThanOrEqual, threshold)
    }

    /// Every value must be less than `threshold`.
    #[track_caller]
    pub fn less_than(self, threshold: P::Output) -> AnyCancellable
    where
        P::Output: PartialOrd + Debug + Sync,
    {
        self.compare(Comparison::LessThan, threshold)
    }

    /// Every value must be less than or equal to `threshold`.
    #[track_caller]
    pub fn less_than_or_equal(self, threshold: P::Output) -> AnyCancellable
    where
        P::Output: PartialOrd + Debug + Sync,
    {
        self.compare(Comparison::LessThanOrEqual, threshold)
    }

    /// Every value must be `None`.
    #[track_caller]
    pub fn none<T>(self) -> AnyCancellable
    where
        P: Publisher<Output = Option<T>>,
        T: Debug + 'static,
    {
        self.matches(is_none::<T>())
    }

    /// Every value must be `Some(_)`.
    #[track_caller]
    pub fn some<T>(self) -> AnyCancellable
    where
        P: Publisher<Output = Option<T>>,
        T: Debug + 'static,
    {
        self.matches(is_some::<T>())
    }

    /// `predicate` must hold for every value.
    #[track_caller]
    pub fn predicate<F>(self, predicate: F) -> AnyCancellable
    where
        F: Fn(&P::Output) -> bool + Send + Sync + 'static,
        P::Output: Debug,
    {
        self.matches(satisfies(predicate, "the predicate"))
    }

    /// `predicate` must return `true` for every value.
    #[track_caller]
    pub fn is_true<F>(self, predicate: F) -> AnyCancellable
    where
        F: Fn(&P::Output) -> bool + Send + Sync + 'static,
        P::Output: Debug,
    {
        self.matches(satisfies(predicate, "predicate is true"))
    }

    /// `predicate` must return `false` for every value.
    #[track_caller]
    pub fn is_false<F>(self, predicate: F) -> AnyCancellable
    where
        F: Fn(&P::Output) -> bool + Send + Sync + 'static,
        P::Output: Debug,
    {
        self.matches(satisfies(
            move |value: &P::Output| !predicate(value),
            "predicate is false",
        ))
    }

    /// The publisher must fail; any error is accepted.
    #[track_caller]
    pub fn fails(self) -> AnyCancellable {
        self.with(Assert::failure(|_| Ok(())))
    }

    /// The publisher must fail with an error of type `T`.
    ///
    /// The failure matches if it is a `T`, or a boxed or shared
    /// `dyn Error + Send + Sync` holding a `T`.
    #[track_caller]
    pub fn fails_with_type<T>(self) -> AnyCancellable
    where
        T: Error + 'static,
    {
        self.with(Assert::failure(|failure: P::Failure| {
            match downcast_failure::<P::Failure, T>(&failure) {
                Some(_) => Ok(()),
                None => Err(type_mismatch::<P::Failure, T>(&failure)),
            }
        }))
    }

    /// The publisher must fail with an error equal to `expected`.
    ///
    /// The failure is first cast to `E` like
    /// [`fails_with_type`](Self::fails_with_type), then compared.
    #[track_caller]
    pub fn fails_with_equal<E>(self, expected: E) -> AnyCancellable
    where
        E: Error + PartialEq + Send + Sync + 'static,
    {
        self.with(Assert::failure(move |failure: P::Failure| {
            let Some(actual) = downcast_failure::<P::Failure, E>(&failure) else {
                return Err(type_mismatch::<P::Failure, E>(&failure));
            };
            if *actual == expected {
                Ok(())
            } else {
                Err(Mismatch::new(
                    FailureKind::EqualityMismatch,
                    format!("actual error {actual:?} is not equal to expected error {expected:?}"),
                ))
            }
        }))
    }
}

/// Look for a `T` in a failure of static type `F`.
fn downcast_failure<F: 'static, T: Error + 'static>(failure: &F) -> Option<&T> {
    let any: &dyn Any = failure;
    if let Some(found) = any.downcast_ref::<T>() {
        return Some(found);
    }
    if let Some(boxed) = any.downcast_ref::<Box<dyn Error + Send + Sync>>() {
        return boxed.downcast_ref::<T>();
    }
    if let Some(shared) = any.downcast_ref::<Arc<dyn Error + Send + Sync>>() {
        return shared.downcast_ref::<T>();
    }
    None
}

fn type_mismatch<F: Debug, T>(failure: &F) -> Mismatch {
    Mismatch::new(
        FailureKind::TypeMismatch,
        format!(
            "{failure:?} of type `{}` is unable to be cast as `{}`",
            type_name::<F>(),
            type_name::<T>()
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::{Cancellable, Completion, PassthroughSubject};
    use crate::report::RecordingReporter;
    use std::fmt;
    use tracing_test::traced_test;

    #[derive(Debug, Clone, PartialEq)]
    struct Timeout(u32);

    impl fmt::Display for Timeout {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "timed out after {}s", self.0)
        }
    }

    impl Error for Timeout {}

    #[derive(Debug, Clone, PartialEq)]
    struct Refused;

    impl fmt::Display for Refused {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("connection refused")
        }
    }

    impl Error for Refused {}

    fn recorded() -> (AssertOptions, RecordingReporter) {
        let reporter = RecordingReporter::new();
        (AssertOptions::new().reporter(reporter.clone()), reporter)
    }

    #[test]
    fn test_downcast_concrete_failure() {
        assert_eq!(downcast_failure::<Timeout, Timeout>(&Timeout(3)), Some(&Timeout(3)));
        assert!(downcast_failure::<Timeout, Refused>(&Timeout(3)).is_none());
    }

    #[test]
    fn test_downcast_boxed_failure() {
        let boxed: Box<dyn Error + Send + Sync> = Box::new(Refused);
        assert_eq!(downcast_failure::<_, Refused>(&boxed), Some(&Refused));
        assert!(downcast_failure::<_, Timeout>(&boxed).is_none());

        let shared: Arc<dyn Error + Send + Sync> = Arc::new(Timeout(1));
        assert_eq!(downcast_failure::<_, Timeout>(&shared), Some(&Timeout(1)));
    }

    #[test]
    fn test_type_mismatch_names_both_types() {
        let mismatch = type_mismatch::<Timeout, Refused>(&Timeout(2));
        assert_eq!(mismatch.kind, FailureKind::TypeMismatch);
        assert!(mismatch.message.contains("Timeout(2)"));
        assert!(mismatch.message.contains(type_name::<Timeout>()));
        assert!(mismatch.message.contains(type_name::<Refused>()));
    }

    #[test]
    fn test_location_points_at_caller() {
        let subject = PassthroughSubject::<i32, Timeout>::new();
        let (options, reporter) = recorded();
        let line = line!() + 1;
        let handle = subject.asserting(options).equal(1);

        subject.send(2);

        let failures = reporter.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].location.line(), line);
        assert!(failures[0].location.file().ends_with("publisher.rs"));
        handle.cancel();
    }

    #[test]
    fn test_is_false_reports_values_where_predicate_holds() {
        let subject = PassthroughSubject::<i32, Timeout>::new();
        let (options, reporter) = recorded();
        let _handle = subject.asserting(options).is_false(|value| *value < 0);

        subject.send(1);
        subject.send(-1);

        let failures = reporter.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].message, "-1 does not satisfy: predicate is false");
    }

    #[test]
    fn test_fails_with_equal_reports_both_errors() {
        let subject = PassthroughSubject::<(), Timeout>::new();
        let (options, reporter) = recorded();
        let _handle = subject.asserting(options).fails_with_equal(Timeout(5));

        subject.send_completion(Completion::Failed(Timeout(30)));

        let failures = reporter.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::EqualityMismatch);
        assert_eq!(
            failures[0].message,
            "actual error Timeout(30) is not equal to expected error Timeout(5)"
        );
    }

    #[test]
    fn test_fails_with_equal_on_wrong_type_is_type_mismatch() {
        let subject = PassthroughSubject::<(), Timeout>::new();
        let (options, reporter) = recorded();
        let _handle = subject.asserting(options).fails_with_equal(Refused);

        subject.send_completion(Completion::Failed(Timeout(30)));

        assert_eq!(reporter.count_of(FailureKind::TypeMismatch), 1);
        assert_eq!(reporter.count(), 1);
    }

    #[test]
    fn test_cancelled_assertion_checks_nothing() {
        let subject = PassthroughSubject::<i32, Timeout>::new();
        let (options, reporter) = recorded();
        let handle = subject.asserting(options).equal(1);

        handle.cancel();
        subject.send(2);
        subject.send_completion(Completion::Failed(Timeout(1)));

        assert!(reporter.is_empty());
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    #[traced_test]
    fn test_attach_and_cancel_are_logged() {
        let subject = PassthroughSubject::<i32, Timeout>::new();
        let (options, _reporter) = recorded();
        let handle = subject.asserting(options).fails();

        handle.cancel();

        assert!(logs_contain("attaching assertion"));
        assert!(logs_contain("assertion cancelled"));
    }
}
