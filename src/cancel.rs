//! Cooperative cancellation shared between a controller and a scan worker

use std::sync::{Arc, Mutex, PoisonError};

/// Single-use stop flag, polled by the scanner once per record
///
/// Clones share the same flag. There is no reset; create a fresh token for
/// every search.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    /// Flag guarded by a mutex so `set` and `is_set` never interleave
    flag: Arc<Mutex<bool>>,
}

impl CancellationToken {
    /// Create a new, unset token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; idempotent
    pub fn set(&self) {
        // A poisoned flag still holds a valid bool
        *self.flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
    }

    /// Whether cancellation has been requested
    #[must_use]
    pub fn is_set(&self) -> bool {
        *self.flag.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
