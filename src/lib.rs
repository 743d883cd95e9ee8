//! # testkit-reactive
//!
//! > Fluent assertions for push-based streams
//!
//! **testkit-reactive** attaches checks to a [`Publisher`](publisher::Publisher)
//! and reports every mismatch at the line of the test that made the assertion.
//!
//! ## Quick Start
//!
//! ```rust
//! use testkit_reactive::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq, thiserror::Error)]
//! #[error("network unreachable")]
//! struct NetworkError;
//!
//! let readings = PassthroughSubject::<i32, NetworkError>::new();
//! let requests = PassthroughSubject::<String, NetworkError>::new();
//! let bag = DisposeBag::new();
//!
//! readings.assert_greater_than(0).store_in(&bag);
//! requests.assert_fails_with_type::<NetworkError>().store_in(&bag);
//!
//! readings.send(1);
//! readings.send(2);
//! readings.send_completion(Completion::Finished);
//!
//! requests.send_completion(Completion::Failed(NetworkError));
//! ```
//!
//! ## Features
//!
//! - **Value assertions** - equality, ordering, `Option` state and predicates
//! - **Failure assertions** - any failure, a failure of a given type, or an equal failure
//! - **Source locations** - failures point at the asserting call
//! - **Deferred failures** - mismatches are recorded and raised on the test's thread
//! - **Pluggable reporting** - record and inspect, or panic where the value arrives
//! - **Async support** - fulfill an [`Expectation`](sync::Expectation) on completion and await it

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assertions;
pub mod error;
pub mod publisher;
pub mod report;
pub mod sync;

/// Prelude for convenient imports
///
/// ```rust
/// use testkit_reactive::prelude::*;
/// ```
pub mod prelude {
    pub use crate::assertions::{
        AssertOptions, Assert, Asserting, AssertionSubscriber, Comparison, PublisherAssertExt,
    };
    pub use crate::error::{Error, Result};
    pub use crate::publisher::{
        from_stream, AnyCancellable, Cancellable, Completion, Demand, PassthroughSubject,
        Publisher, StreamPublisher, Subscriber, Subscription,
    };
    pub use crate::report::{
        Failure, FailureKind, Mismatch, PanicReporter, RecordingReporter, Reporter, SourceLocation,
    };
    pub use crate::sync::{DisposeBag, Expectation};
}

// Re-exports
pub use error::{Error, Result};
