//! In-flight request deduplication
//!
//! A [`SingleFlight`] caches one shared future per key. Every caller that
//! joins a key while its future exists awaits that same future and receives
//! a clone of its output. Settled outcomes stay cached until [`forget`] is
//! called, so a failed attempt is observed again rather than retried.
//!
//! The cache is single-threaded: futures are `!Send` and the map lives in a
//! `RefCell`, matching the browser event loop the console runs on.
//!
//! [`forget`]: SingleFlight::forget

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;

use futures::future::{FutureExt, LocalBoxFuture, Shared};

/// Handle to a deduplicated operation
pub type Flight<T> = Shared<LocalBoxFuture<'static, T>>;

pub struct SingleFlight<K, T> {
    flights: RefCell<HashMap<K, Flight<T>>>,
}

impl<K, T> Default for SingleFlight<K, T> {
    fn default() -> Self {
        Self {
            flights: RefCell::new(HashMap::new()),
        }
    }
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash,
    T: Clone + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the flight for `key`, calling `start` to create it if none is cached.
    ///
    /// `start` only builds the future; nothing runs until the returned
    /// flight is polled.
    pub fn join<F, Fut>(&self, key: K, start: F) -> Flight<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + 'static,
    {
        if let Some(flight) = self.flights.borrow().get(&key) {
            return flight.clone();
        }
        let flight = start().boxed_local().shared();
        self.flights
            .borrow_mut()
            .entry(key)
            .or_insert(flight)
            .clone()
    }

    /// Settled output for `key`, if its flight has finished
    pub fn peek(&self, key: &K) -> Option<T> {
        self.flights
            .borrow()
            .get(key)
            .and_then(|flight| flight.peek().cloned())
    }

    /// Whether a flight for `key` exists and has not settled
    pub fn is_pending(&self, key: &K) -> bool {
        self.flights
            .borrow()
            .get(key)
            .map_or(false, |flight| flight.peek().is_none())
    }

    /// Drop the cached flight so the next `join` starts a new one.
    /// Existing waiters keep their handle.
    pub fn forget(&self, key: &K) -> bool {
        self.flights.borrow_mut().remove(key).is_some()
    }
}
