//! Fluent assertions for publishers.
//!
//! This module attaches checks to anything implementing
//! [`Publisher`](crate::publisher::Publisher):
//!
//! - [`PublisherAssertExt`] - one-call entry points (`assert_equal`, `assert_fails`, ...)
//! - [`AssertOptions`] - custom reporter, completion callback, expectation, message
//! - [`Assert`] - the check an [`AssertionSubscriber`] runs
//! - [`matcher`] - the matcher system behind value checks
//!
//! # Value Assertions
//!
//! ```rust
//! use std::convert::Infallible;
//! use testkit_reactive::prelude::*;
//!
//! let subject = PassthroughSubject::<i32, Infallible>::new();
//! let handle = subject.assert_less_than_or_equal(10);
//!
//! subject.send(3);
//! subject.send(10);
//! subject.send_completion(Completion::Finished);
//! handle.cancel();
//! ```
//!
//! # Failure Assertions
//!
//! ```rust
//! use testkit_reactive::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq, thiserror::Error)]
//! #[error("connection refused")]
//! struct Refused;
//!
//! let subject = PassthroughSubject::<i32, Refused>::new();
//! let reporter = RecordingReporter::new();
//! let _handle = subject
//!     .asserting(AssertOptions::new().reporter(reporter.clone()))
//!     .fails_with_equal(Refused);
//!
//! subject.send_completion(Completion::Failed(Refused));
//! assert!(reporter.is_empty());
//! ```

pub mod matcher;
mod options;
mod publisher;
mod subscriber;

pub use matcher::Comparison;
pub use options::AssertOptions;
pub use publisher::{Asserting, PublisherAssertExt};
pub use subscriber::{Assert, AssertionSubscriber, Check, Verdict};
