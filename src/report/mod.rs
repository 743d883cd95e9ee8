//! Where assertion failures go.
//!
//! Every failed check becomes a [`Failure`] handed to a [`Reporter`]:
//!
//! - [`PanicReporter`] - fails the running test immediately (the default)
//! - [`RecordingReporter`] - collects failures so the test can inspect them
//!
//! # Example
//!
//! ```rust
//! use testkit_reactive::report::{Failure, FailureKind, RecordingReporter, Reporter, SourceLocation};
//!
//! let reporter = RecordingReporter::new();
//! reporter.report(Failure::new(
//!     FailureKind::ValueMismatch,
//!     "2 does not equal 1",
//!     SourceLocation::caller(),
//! ));
//!
//! assert_eq!(reporter.count(), 1);
//! assert!(reporter.verify().is_err());
//! ```

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// A position in source code, used to point failures at the calling test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    file: &'static str,
    line: u32,
    column: u32,
}

impl SourceLocation {
    /// Create a location from its parts.
    #[must_use]
    pub const fn new(file: &'static str, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    /// The location of the caller.
    ///
    /// Inside a `#[track_caller]` chain this is the outermost untracked call.
    #[track_caller]
    #[must_use]
    pub fn caller() -> Self {
        Location::caller().into()
    }

    /// Source file path.
    #[must_use]
    pub const fn file(&self) -> &'static str {
        self.file
    }

    /// Line number.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// Column number.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }
}

impl From<&'static Location<'static>> for SourceLocation {
    fn from(location: &'static Location<'static>) -> Self {
        Self::new(location.file(), location.line(), location.column())
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Category of an assertion failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// A value did not satisfy its check.
    ValueMismatch,
    /// The stream failed while only values were expected.
    UnexpectedFailure,
    /// The stream finished while a failure was expected.
    MissingFailure,
    /// The failure was not of the expected type.
    TypeMismatch,
    /// The failure had the expected type but a different value.
    EqualityMismatch,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ValueMismatch => "value mismatch",
            Self::UnexpectedFailure => "unexpected failure",
            Self::MissingFailure => "missing failure",
            Self::TypeMismatch => "type mismatch",
            Self::EqualityMismatch => "equality mismatch",
        })
    }
}

/// The outcome of a single failed check, before it is tied to a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// What went wrong.
    pub kind: FailureKind,
    /// Expected-versus-actual description.
    pub message: String,
}

impl Mismatch {
    /// Create a mismatch.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// A value that failed its check.
    #[must_use]
    pub fn value(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ValueMismatch, message)
    }

    /// Attach the location the assertion was written at.
    #[must_use]
    pub fn at(self, location: SourceLocation) -> Failure {
        Failure {
            kind: self.kind,
            message: self.message,
            location,
        }
    }
}

/// A reported assertion failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// What went wrong.
    pub kind: FailureKind,
    /// Human readable detail.
    pub message: String,
    /// Where the assertion was written.
    pub location: SourceLocation,
}

impl Failure {
    /// Create a failure.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>, location: SourceLocation) -> Self {
        Mismatch::new(kind, message).at(location)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} (at {})", self.kind, self.message, self.location)
    }
}

/// Receives assertion failures.
pub trait Reporter: Send + Sync {
    /// Record or raise a failure.
    fn report(&self, failure: Failure);
}

impl<R: Reporter + ?Sized> Reporter for Arc<R> {
    fn report(&self, failure: Failure) {
        (**self).report(failure);
    }
}

/// Fails the current test by panicking.
///
/// The panic message carries the location of the assertion, not of this
/// reporter. The panic happens on whichever thread delivers the value, so
/// only use this reporter when the publisher is driven from the test itself.
/// The default entry points record failures instead and raise them on the
/// test's thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanicReporter;

impl Reporter for PanicReporter {
    fn report(&self, failure: Failure) {
        panic!("assertion failed: {failure}");
    }
}

/// Panic with every failure in `failures`, if there are any.
///
/// Does nothing while the thread is already unwinding.
pub(crate) fn raise(failures: &[Failure]) {
    if failures.is_empty() || std::thread::panicking() {
        return;
    }
    tracing::debug!(count = failures.len(), "raising recorded assertion failures");
    if let [failure] = failures {
        panic!("assertion failed: {failure}");
    }
    let listed = failures
        .iter()
        .map(|failure| format!("  {failure}"))
        .collect::<Vec<_>>()
        .join("\n");
    panic!("{} assertions failed:\n{listed}", failures.len());
}

/// Collects failures instead of panicking.
///
/// Clones share the same record, so a clone can be handed to an assertion
/// while the test keeps another for inspection.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    failures: Arc<Mutex<Vec<Failure>>>,
}

impl RecordingReporter {
    /// Create an empty reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All failures recorded so far, oldest first.
    #[must_use]
    pub fn failures(&self) -> Vec<Failure> {
        self.failures.lock().clone()
    }

    /// Number of recorded failures.
    #[must_use]
    pub fn count(&self) -> usize {
        self.failures.lock().len()
    }

    /// Number of recorded failures of one kind.
    #[must_use]
    pub fn count_of(&self, kind: FailureKind) -> usize {
        self.failures
            .lock()
            .iter()
            .filter(|failure| failure.kind == kind)
            .count()
    }

    /// Returns `true` if nothing has failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.lock().is_empty()
    }

    /// Forget all recorded failures.
    pub fn clear(&self) {
        self.failures.lock().clear();
    }

    /// Remove and return every recorded failure.
    #[must_use]
    pub fn take(&self) -> Vec<Failure> {
        std::mem::take(&mut *self.failures.lock())
    }

    /// Turn the record into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssertionFailed`] listing every failure, one per line.
    pub fn verify(&self) -> Result<()> {
        let failures = self.failures.lock();
        if failures.is_empty() {
            return Ok(());
        }
        let message = failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        Err(Error::assertion_failed(message))
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, failure: Failure) {
        tracing::debug!(kind = %failure.kind, location = %failure.location, "assertion failure recorded");
        self.failures.lock().push(failure);
    }
}

impl fmt::Debug for RecordingReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingReporter")
            .field("failures", &*self.failures.lock())
            .finish()
    }
}
