//! Bulk disposal of subscription handles.

use std::fmt;

use parking_lot::Mutex;

use crate::publisher::{AnyCancellable, Cancellable};
use crate::report;

/// Owns [`AnyCancellable`] handles and cancels them all at once.
///
/// Everything still held is cancelled when the bag is dropped, so a bag
/// living in a test fixture tears down every assertion with it. Failures the
/// handles recorded are raised together once everything is cancelled.
///
/// # Example
///
/// ```rust
/// use std::convert::Infallible;
/// use testkit_reactive::prelude::*;
///
/// let bag = DisposeBag::new();
/// let subject = PassthroughSubject::<i32, Infallible>::new();
///
/// subject.assert_equal(1).store_in(&bag);
/// assert_eq!(subject.subscriber_count(), 1);
///
/// drop(bag);
/// assert_eq!(subject.subscriber_count(), 0);
/// ```
#[derive(Default)]
pub struct DisposeBag {
    handles: Mutex<Vec<AnyCancellable>>,
}

impl DisposeBag {
    /// Create an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a handle.
    pub fn insert(&self, handle: AnyCancellable) {
        self.handles.lock().push(handle);
    }

    /// Number of handles held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    /// Returns `true` if the bag holds no handles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.lock().is_empty()
    }

    /// Cancel and release every handle. The bag stays usable.
    ///
    /// # Panics
    ///
    /// Panics with every failure the released handles recorded, after all of
    /// them have been cancelled.
    pub fn dispose(&self) {
        let handles = std::mem::take(&mut *self.handles.lock());
        if !handles.is_empty() {
            tracing::debug!(count = handles.len(), "disposing subscriptions");
        }
        let mut failures = Vec::new();
        for handle in &handles {
            handle.cancel();
            failures.extend(handle.take_failures());
        }
        drop(handles);
        report::raise(&failures);
    }
}

impl Drop for DisposeBag {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Extend<AnyCancellable> for DisposeBag {
    fn extend<I: IntoIterator<Item = AnyCancellable>>(&mut self, iter: I) {
        self.handles.get_mut().extend(iter);
    }
}

impl fmt::Debug for DisposeBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposeBag").field("len", &self.len()).finish()
    }
}
