//! Bounded pool of interchangeable resources with timed acquire.
//!
//! Waiting is done on a [`Semaphore`] holding one permit per idle resource;
//! the resources themselves live in a mutex-guarded deque. A permit is
//! consumed (forgotten) on acquire and re-issued on release, so the number of
//! permits always equals the number of idle resources.

use super::errors::PoolError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Debug)]
struct Slots<R> {
    idle: VecDeque<R>,
    held: usize,
}

#[derive(Debug)]
pub struct ResourcePool<R> {
    name: String,
    capacity: usize,
    slots: Mutex<Slots<R>>,
    permits: Semaphore,
}

impl<R> ResourcePool<R> {
    /// Create a pool that owns `resources`. Its capacity is their count.
    pub fn new(name: impl Into<String>, resources: Vec<R>) -> Self {
        let capacity = resources.len();
        Self {
            name: name.into(),
            capacity,
            slots: Mutex::new(Slots {
                idle: resources.into(),
                held: 0,
            }),
            permits: Semaphore::new(capacity),
        }
    }

    /// Human readable pool name, used in errors and logs
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total number of resources the pool owns, idle or held
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of resources currently held by callers
    pub fn held(&self) -> usize {
        self.slots.lock().held
    }

    /// `(available, held)` read under a single lock
    pub fn counts(&self) -> (usize, usize) {
        let slots = self.slots.lock();
        (slots.idle.len(), slots.held)
    }

    /// Wait until a resource is available and take it.
    ///
    /// Cancel safe: dropping the future before it resolves takes nothing.
    ///
    /// # Returns
    /// The resource, or [`PoolError::Closed`] if the pool can no longer hand
    /// one out
    pub async fn acquire(&self) -> Result<R, PoolError> {
        let permit = self.permits.acquire().await.map_err(|_| PoolError::Closed {
            pool: self.name.clone(),
        })?;
        permit.forget();

        let mut slots = self.slots.lock();
        match slots.idle.pop_front() {
            Some(resource) => {
                slots.held += 1;
                Ok(resource)
            }
            // a permit without an idle resource means the accounting is broken
            None => Err(PoolError::Closed {
                pool: self.name.clone(),
            }),
        }
    }

    /// Take a resource, waiting at most `timeout`.
    ///
    /// When a resource becomes available at the same instant the deadline
    /// passes, the resource wins.
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<R, PoolError> {
        match tokio::time::timeout(timeout, self.acquire()).await {
            Ok(result) => result,
            Err(_) => Err(PoolError::Timeout {
                pool: self.name.clone(),
                waited: timeout,
            }),
        }
    }

    /// Return a previously acquired resource.
    ///
    /// Releasing while nothing is held is rejected and the resource dropped,
    /// so the pool never grows past its capacity.
    pub fn release(&self, resource: R) -> Result<(), PoolError> {
        {
            let mut slots = self.slots.lock();
            if slots.held == 0 || slots.idle.len() >= self.capacity {
                return Err(PoolError::Overflow {
                    pool: self.name.clone(),
                    capacity: self.capacity,
                });
            }
            slots.held -= 1;
            slots.idle.push_back(resource);
        }
        self.permits.add_permits(1);
        Ok(())
    }
}
