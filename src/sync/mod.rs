//! Coordination helpers for tests that assert on publishers.
//!
//! - [`Expectation`] - a one-shot signal a test waits on, fulfilled when an
//!   asserted publisher completes
//! - [`DisposeBag`] - owns cancellation handles and cancels them together
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use testkit_reactive::sync::Expectation;
//!
//! let expectation = Expectation::new("publisher completes");
//! let signal = expectation.clone();
//! std::thread::spawn(move || signal.fulfill());
//!
//! expectation.wait_timeout(Duration::from_secs(5)).unwrap();
//! ```

mod dispose;
mod expectation;

pub use dispose::DisposeBag;
pub use expectation::{Expectation, Fulfillment};
