//! Cooperative cancellation for long pyramid runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tile_common::{TilerError, TilerResult};

/// Shared cancel flag. Clones observe the same flag.
///
/// Workers poll it before each zoom level and between tile columns; a
/// cancelled run stops with [`TilerError::Cancelled`]. Tiles already written
/// stay on disk.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once [`cancel`](Self::cancel) has been called.
    pub fn check(&self) -> TilerResult<()> {
        if self.is_cancelled() {
            Err(TilerError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let token = CancellationToken::new();
        let worker = token.clone();
        assert!(worker.check().is_ok());

        token.cancel();
        assert!(worker.is_cancelled());
        assert!(matches!(worker.check(), Err(TilerError::Cancelled)));
    }
}
