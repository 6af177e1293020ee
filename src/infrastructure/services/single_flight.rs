//! In-flight table de-duplicating concurrent computations per cache key

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::cache::CacheKey;

/// Per-key async locks; at most one holder per key at a time
#[derive(Debug, Default)]
pub struct SingleFlight {
    in_flight: Mutex<HashMap<CacheKey, Flight>>,
}

#[derive(Debug, Default)]
struct Flight {
    lock: Arc<AsyncMutex<()>>,
    /// Holder plus waiters, cancelled waiters included until dropped
    users: usize,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other caller holds `key`, then holds it until the
    /// returned guard is dropped
    pub async fn acquire(&self, key: &CacheKey) -> FlightGuard<'_> {
        let ticket = self.join(key);
        let guard = ticket.lock.clone().lock_owned().await;

        FlightGuard {
            _guard: guard,
            _ticket: ticket,
        }
    }

    /// Number of keys currently tracked
    pub fn in_flight(&self) -> usize {
        self.table().len()
    }

    fn join(&self, key: &CacheKey) -> Ticket<'_> {
        let mut in_flight = self.table();
        let flight = in_flight.entry(key.clone()).or_default();
        flight.users += 1;

        Ticket {
            flights: self,
            key: key.clone(),
            lock: flight.lock.clone(),
        }
    }

    fn leave(&self, key: &CacheKey) {
        let mut in_flight = self.table();

        if let Some(flight) = in_flight.get_mut(key) {
            flight.users -= 1;
            if flight.users == 0 {
                in_flight.remove(key);
            }
        }
    }

    fn table(&self) -> MutexGuard<'_, HashMap<CacheKey, Flight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registration of one caller in the table, released on drop whether the
/// caller got the lock or gave up waiting
#[derive(Debug)]
struct Ticket<'a> {
    flights: &'a SingleFlight,
    key: CacheKey,
    lock: Arc<AsyncMutex<()>>,
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        self.flights.leave(&self.key);
    }
}

/// Holds a key in the in-flight table
#[derive(Debug)]
pub struct FlightGuard<'a> {
    // Fields drop in order: the lock is released before the ticket leaves.
    _guard: OwnedMutexGuard<()>,
    _ticket: Ticket<'a>,
}
