//! A manually driven, multicast publisher.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::{Cancellable, Completion, Demand, Publisher, Subscriber, Subscription};

/// A publisher the test drives by hand.
///
/// Values sent through the subject are broadcast to every attached subscriber
/// that has outstanding demand; subscribers without demand miss the value.
/// Once a completion is sent, later sends are ignored and late subscribers
/// receive the stored completion immediately.
///
/// Clones share the same subscriber list.
///
/// # Example
///
/// ```rust
/// use testkit_reactive::prelude::*;
///
/// let subject = PassthroughSubject::<i32, std::io::ErrorKind>::new();
/// let reporter = RecordingReporter::new();
///
/// let handle = subject
///     .asserting(AssertOptions::new().reporter(reporter.clone()))
///     .equal(1);
///
/// subject.send(1);
/// subject.send_completion(Completion::Finished);
///
/// assert!(reporter.is_empty());
/// handle.cancel();
/// ```
pub struct PassthroughSubject<T, E> {
    inner: Arc<SubjectInner<T, E>>,
}

struct SubjectInner<T, E> {
    state: Mutex<SubjectState<T, E>>,
}

struct SubjectState<T, E> {
    entries: Vec<Entry<T, E>>,
    next_id: u64,
    completion: Option<Completion<E>>,
}

struct Entry<T, E> {
    id: u64,
    subscriber: Arc<dyn Subscriber<T, E>>,
    demand: Demand,
}

impl<T, E> PassthroughSubject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Create a subject with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SubjectInner {
                state: Mutex::new(SubjectState {
                    entries: Vec::new(),
                    next_id: 0,
                    completion: None,
                }),
            }),
        }
    }

    /// Broadcast a value to every subscriber with outstanding demand.
    pub fn send(&self, value: T) {
        let targets: Vec<(u64, Arc<dyn Subscriber<T, E>>)> = {
            let mut state = self.inner.state.lock();
            if state.completion.is_some() {
                tracing::trace!("value sent after completion; ignoring");
                return;
            }
            state
                .entries
                .iter_mut()
                .filter(|entry| !entry.demand.is_none())
                .map(|entry| {
                    entry.demand = entry.demand.consume_one();
                    (entry.id, Arc::clone(&entry.subscriber))
                })
                .collect()
        };

        tracing::trace!(subscribers = targets.len(), "delivering value");
        for (id, subscriber) in targets {
            let additional = subscriber.receive(value.clone());
            if !additional.is_none() {
                self.inner.add_demand(id, additional);
            }
        }
    }

    /// Terminate the subject, delivering `completion` to every subscriber.
    ///
    /// Only the first completion has any effect.
    pub fn send_completion(&self, completion: Completion<E>) {
        let entries = {
            let mut state = self.inner.state.lock();
            if state.completion.is_some() {
                return;
            }
            state.completion = Some(completion.clone());
            std::mem::take(&mut state.entries)
        };

        tracing::debug!(
            subscribers = entries.len(),
            failed = completion.is_failed(),
            "subject completed"
        );
        for entry in entries {
            entry.subscriber.receive_completion(completion.clone());
        }
    }

    /// Number of currently attached subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    /// Returns `true` once a completion has been sent.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.inner.state.lock().completion.is_some()
    }
}

impl<T, E> SubjectInner<T, E> {
    fn add_demand(&self, id: u64, demand: Demand) {
        let mut state = self.state.lock();
        if let Some(entry) = state.entries.iter_mut().find(|entry| entry.id == id) {
            entry.demand += demand;
        }
    }

    fn remove(&self, id: u64) -> bool {
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|entry| entry.id != id);
        state.entries.len() != before
    }
}

impl<T, E> Publisher for PassthroughSubject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + fmt::Debug + Send + 'static,
{
    type Output = T;
    type Failure = E;

    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T, E>>) {
        let attached = {
            let mut state = self.inner.state.lock();
            match &state.completion {
                Some(completion) => Err(completion.clone()),
                None => {
                    let id = state.next_id;
                    state.next_id += 1;
                    state.entries.push(Entry {
                        id,
                        subscriber: Arc::clone(&subscriber),
                        demand: Demand::none(),
                    });
                    Ok(id)
                }
            }
        };

        match attached {
            Ok(id) => {
                tracing::debug!(id, "subscriber attached");
                subscriber.receive_subscription(Box::new(SubjectSubscription {
                    id,
                    inner: Arc::downgrade(&self.inner),
                }));
            }
            Err(completion) => {
                subscriber.receive_subscription(Box::new(Detached));
                subscriber.receive_completion(completion);
            }
        }
    }
}

impl<T, E> Default for PassthroughSubject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for PassthroughSubject<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for PassthroughSubject<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("PassthroughSubject")
            .field("subscribers", &state.entries.len())
            .field("completed", &state.completion.is_some())
            .finish()
    }
}

struct SubjectSubscription<T, E> {
    id: u64,
    inner: Weak<SubjectInner<T, E>>,
}

impl<T: Send, E: Send> Cancellable for SubjectSubscription<T, E> {
    fn cancel(&self) {
        if let Some(inner) = self.inner.upgrade() {
            if inner.remove(self.id) {
                tracing::debug!(id = self.id, "subscriber detached");
            }
        }
    }
}

impl<T: Send, E: Send> Subscription for SubjectSubscription<T, E> {
    fn request(&self, demand: Demand) {
        if let Some(inner) = self.inner.upgrade() {
            inner.add_demand(self.id, demand);
        }
    }
}

/// Handed to subscribers that attach after completion.
struct Detached;

impl Cancellable for Detached {
    fn cancel(&self) {}
}

impl Subscription for Detached {
    fn request(&self, _demand: Demand) {}
}
