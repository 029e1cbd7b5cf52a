use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{ProviderError, ProviderResult};

/// Cooperative cancellation shared between an operation and whoever
/// may abort it. Checked before every remote call and at every poll.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that trips once `timeout` has elapsed.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            flag: Arc::default(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fail with [`ProviderError::Cancelled`] if the token has tripped.
    pub fn check(&self, during: &str) -> ProviderResult<()> {
        if self.is_cancelled() {
            return Err(ProviderError::Cancelled(during.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_passes() {
        assert!(Cancellation::new().check("list services").is_ok());
    }

    #[test]
    fn clones_share_the_flag() {
        let token = Cancellation::new();
        let other = token.clone();
        other.cancel();

        let err = token.check("delete app").unwrap_err();
        assert_eq!(err.to_string(), "operation cancelled: delete app");
    }

    #[test]
    fn elapsed_deadline_cancels() {
        let token = Cancellation::with_timeout(Duration::ZERO);
        assert!(token.is_cancelled());
    }
}
