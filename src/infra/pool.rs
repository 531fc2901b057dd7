//! Bounded access to a backend connection.
//!
//! The HTTP and Redis clients multiplex over shared connections; the gate caps
//! how many requests may be in flight against each backend at once.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("no permit available within {0:?}")]
    Exhausted(Duration),
    #[error("connection gate closed")]
    Closed,
}

#[derive(Debug, Clone)]
pub struct ConnectionGate {
    permits: Arc<Semaphore>,
    capacity: usize,
    acquire_timeout: Duration,
}

impl ConnectionGate {
    pub fn new(capacity: usize, acquire_timeout: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            acquire_timeout,
        }
    }

    /// Wait up to the acquire timeout for a slot. The slot is released on drop.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, GateError> {
        match tokio::time::timeout(
            self.acquire_timeout,
            Arc::clone(&self.permits).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(GateError::Closed),
            Err(_) => Err(GateError::Exhausted(self.acquire_timeout)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }
}
