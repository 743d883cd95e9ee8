// Allow must_use_candidate for matcher factory functions since returning the matcher
// without using it is the common pattern for test setup
#![allow(clippy::must_use_candidate)]

//! Matchers that describe what a published value should look like.
//!
//! Every value assertion on a publisher is a [`Matcher`] underneath, and the
//! matcher's descriptions become the failure message. Pass your own to
//! [`PublisherAssertExt::assert_matches`](crate::assertions::PublisherAssertExt::assert_matches).
//!
//! # Example
//!
//! ```rust
//! use testkit_reactive::assertions::matcher::{eq, gt, not, Matcher};
//!
//! assert!(eq(42).matches(&42));
//! assert!(gt(0).matches(&50));
//! assert!(not(eq(0)).matches(&1));
//! assert_eq!(gt(1).describe_mismatch(&1), "1 is not greater than 1");
//! ```

use std::fmt::{self, Debug};
use std::marker::PhantomData;

/// A matcher for testing values.
///
/// # Implementing Custom Matchers
///
/// ```rust
/// use testkit_reactive::assertions::matcher::Matcher;
///
/// struct IsEven;
///
/// impl Matcher<i32> for IsEven {
///     fn matches(&self, value: &i32) -> bool {
///         value % 2 == 0
///     }
///
///     fn describe(&self) -> String {
///         "is even".to_string()
///     }
///
///     fn describe_mismatch(&self, value: &i32) -> String {
///         format!("{} is not even", value)
///     }
/// }
///
/// assert!(IsEven.matches(&4));
/// assert!(!IsEven.matches(&3));
/// ```
pub trait Matcher<T: ?Sized> {
    /// Check if the value matches.
    fn matches(&self, value: &T) -> bool;

    /// Describe what this matcher expects.
    fn describe(&self) -> String;

    /// Describe why a value didn't match.
    fn describe_mismatch(&self, value: &T) -> String;
}

impl<T: ?Sized> Matcher<T> for Box<dyn Matcher<T> + Send + Sync> {
    fn matches(&self, value: &T) -> bool {
        (**self).matches(value)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn describe_mismatch(&self, value: &T) -> String {
        (**self).describe_mismatch(value)
    }
}

/// Create an equality matcher.
pub fn eq<T: PartialEq + Debug>(expected: T) -> EqMatcher<T> {
    EqMatcher { expected }
}

/// Matcher for equality.
#[derive(Debug, Clone)]
pub struct EqMatcher<T> {
    expected: T,
}

impl<T: PartialEq + Debug> Matcher<T> for EqMatcher<T> {
    fn matches(&self, value: &T) -> bool {
        value == &self.expected
    }

    fn describe(&self) -> String {
        format!("equals {:?}", self.expected)
    }

    fn describe_mismatch(&self, value: &T) -> String {
        format!("{:?} does not equal {:?}", value, self.expected)
    }
}

/// An ordering relation between a value and a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    /// `value > threshold`
    GreaterThan,
    /// `value >= threshold`
    GreaterThanOrEqual,
    /// `value < threshold`
    LessThan,
    /// `value <= threshold`
    LessThanOrEqual,
}

impl Comparison {
    /// Whether `value` stands in this relation to `threshold`.
    ///
    /// Incomparable values (such as `NaN`) never satisfy any relation.
    pub fn holds<T: PartialOrd + ?Sized>(self, value: &T, threshold: &T) -> bool {
        match self {
            Self::GreaterThan => value > threshold,
            Self::GreaterThanOrEqual => value >= threshold,
            Self::LessThan => value < threshold,
            Self::LessThanOrEqual => value <= threshold,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::GreaterThan => "greater than",
            Self::GreaterThanOrEqual => "greater than or equal to",
            Self::LessThan => "less than",
            Self::LessThanOrEqual => "less than or equal to",
        })
    }
}

/// Create a matcher for an ordering relation.
pub fn compare<T: PartialOrd + Debug>(comparison: Comparison, threshold: T) -> ComparisonMatcher<T> {
    ComparisonMatcher {
        comparison,
        threshold,
    }
}

/// Create a greater-than matcher.
pub fn gt<T: PartialOrd + Debug>(threshold: T) -> ComparisonMatcher<T> {
    compare(Comparison::GreaterThan, threshold)
}

/// Create a greater-than-or-equal matcher.
pub fn gte<T: PartialOrd + Debug>(threshold: T) -> ComparisonMatcher<T> {
    compare(Comparison::GreaterThanOrEqual, threshold)
}

/// Create a less-than matcher.
pub fn lt<T: PartialOrd + Debug>(threshold: T) -> ComparisonMatcher<T> {
    compare(Comparison::LessThan, threshold)
}

/// Create a less-than-or-equal matcher.
pub fn lte<T: PartialOrd + Debug>(threshold: T) -> ComparisonMatcher<T> {
    compare(Comparison::LessThanOrEqual, threshold)
}

/// Matcher for an ordering relation against a threshold.
#[derive(Debug, Clone)]
pub struct ComparisonMatcher<T> {
    comparison: Comparison,
    threshold: T,
}

impl<T: PartialOrd + Debug> Matcher<T> for ComparisonMatcher<T> {
    fn matches(&self, value: &T) -> bool {
        self.comparison.holds(value, &self.threshold)
    }

    fn describe(&self) -> String {
        format!("is {} {:?}", self.comparison, self.threshold)
    }

    fn describe_mismatch(&self, value: &T) -> String {
        format!("{:?} is not {} {:?}", value, self.comparison, self.threshold)
    }
}

/// Create a matcher for `None`.
pub fn is_none<T: Debug>() -> IsNoneMatcher<T> {
    IsNoneMatcher {
        _phantom: PhantomData,
    }
}

/// Matcher that expects `None`.
pub struct IsNoneMatcher<T> {
    _phantom: PhantomData<fn(&T)>,
}

impl<T: Debug> Matcher<Option<T>> for IsNoneMatcher<T> {
    fn matches(&self, value: &Option<T>) -> bool {
        value.is_none()
    }

    fn describe(&self) -> String {
        "is None".to_string()
    }

    fn describe_mismatch(&self, value: &Option<T>) -> String {
        format!("{value:?} is not None")
    }
}

/// Create a matcher for `Some(_)`.
pub fn is_some<T: Debug>() -> IsSomeMatcher<T> {
    IsSomeMatcher {
        _phantom: PhantomData,
    }
}

/// Matcher that expects `Some(_)`.
pub struct IsSomeMatcher<T> {
    _phantom: PhantomData<fn(&T)>,
}

impl<T: Debug> Matcher<Option<T>> for IsSomeMatcher<T> {
    fn matches(&self, value: &Option<T>) -> bool {
        value.is_some()
    }

    fn describe(&self) -> String {
        "is Some".to_string()
    }

    fn describe_mismatch(&self, _value: &Option<T>) -> String {
        "value is None".to_string()
    }
}

/// Create a predicate-based matcher.
///
/// ```rust
/// use testkit_reactive::assertions::matcher::{Matcher, satisfies};
///
/// let m = satisfies(|x: &i32| *x % 2 == 0, "is even");
/// assert!(m.matches(&4));
/// assert_eq!(m.describe_mismatch(&3), "3 does not satisfy: is even");
/// ```
pub fn satisfies<T, F>(predicate: F, description: &str) -> PredicateMatcher<T, F>
where
    F: Fn(&T) -> bool,
{
    PredicateMatcher {
        predicate,
        description: description.to_string(),
        _phantom: PhantomData,
    }
}

/// Matcher based on a predicate function.
pub struct PredicateMatcher<T, F> {
    predicate: F,
    description: String,
    _phantom: PhantomData<fn(&T)>,
}

impl<T: Debug, F: Fn(&T) -> bool> Matcher<T> for PredicateMatcher<T, F> {
    fn matches(&self, value: &T) -> bool {
        (self.predicate)(value)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }

    fn describe_mismatch(&self, value: &T) -> String {
        format!("{:?} does not satisfy: {}", value, self.description)
    }
}

/// Create a negating matcher.
pub fn not<M>(matcher: M) -> NotMatcher<M> {
    NotMatcher { inner: matcher }
}

/// Matcher that negates another matcher.
#[derive(Debug, Clone)]
pub struct NotMatcher<M> {
    inner: M,
}

impl<T: Debug + ?Sized, M: Matcher<T>> Matcher<T> for NotMatcher<M> {
    fn matches(&self, value: &T) -> bool {
        !self.inner.matches(value)
    }

    fn describe(&self) -> String {
        format!("not {}", self.inner.describe())
    }

    fn describe_mismatch(&self, value: &T) -> String {
        format!("{:?} unexpectedly matched: {}", value, self.inner.describe())
    }
}
