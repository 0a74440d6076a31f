//! Call Context
//!
//! Every call carries a [`CallContext`]: a cancellation token (a child of the
//! server's shutdown token, also cancelled when the client goes away) and an
//! optional deadline taken from the `grpc-timeout` request header.
//!
//! Cancellation is cooperative. Handlers call [`CallContext::check`] at
//! checkpoints and race suspension points against
//! [`CallContext::interrupted`]; nothing interrupts a store operation that is
//! already running.

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a call stopped before finishing its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    /// The client cancelled or the server is shutting down.
    #[error("request is canceled")]
    Canceled,
    /// The call's deadline passed.
    #[error("deadline is exceeded")]
    DeadlineExceeded,
}

/// Cancellation and deadline signal scoped to one call.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// Context driven by `token`, without a deadline.
    #[must_use]
    pub const fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Set an absolute deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set a deadline `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// The call's cancellation token.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The call's deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel the call.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Checkpoint: fail if the call has been cancelled or its deadline passed.
    ///
    /// # Errors
    ///
    /// Returns the reason the call must stop.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.token.is_cancelled() {
            return Err(Interrupted::Canceled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(Interrupted::DeadlineExceeded);
        }
        Ok(())
    }

    /// Resolve once the call is cancelled or its deadline passes.
    pub async fn interrupted(&self) -> Interrupted {
        match self.deadline {
            Some(deadline) => tokio::select! {
                () = self.token.cancelled() => Interrupted::Canceled,
                () = tokio::time::sleep_until(deadline) => Interrupted::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                Interrupted::Canceled
            }
        }
    }
}

/// Largest number of digits `grpc-timeout` may carry.
const MAX_TIMEOUT_DIGITS: usize = 8;

/// Parse a `grpc-timeout` header value such as `250m` or `30S`.
///
/// Returns `None` for anything that is not one to eight ASCII digits followed
/// by a unit (`H`, `M`, `S`, `m`, `u`, `n`).
#[must_use]
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    let unit = value.chars().last()?;
    let digits = &value[..value.len() - unit.len_utf8()];
    if digits.is_empty()
        || digits.len() > MAX_TIMEOUT_DIGITS
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    match unit {
        'H' => Some(Duration::from_secs(amount * 3600)),
        'M' => Some(Duration::from_secs(amount * 60)),
        'S' => Some(Duration::from_secs(amount)),
        'm' => Some(Duration::from_millis(amount)),
        'u' => Some(Duration::from_micros(amount)),
        'n' => Some(Duration::from_nanos(amount)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn test_fresh_context_passes_check() {
        let ctx = CallContext::new(CancellationToken::new());
        assert_eq!(ctx.check(), Ok(()));
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn test_cancel_fails_check() {
        let ctx = CallContext::new(CancellationToken::new());
        ctx.cancel();
        assert_eq!(ctx.check(), Err(Interrupted::Canceled));
    }

    #[test]
    fn test_parent_cancel_reaches_child() {
        let shutdown = CancellationToken::new();
        let ctx = CallContext::new(shutdown.child_token());
        shutdown.cancel();
        assert_eq!(ctx.check(), Err(Interrupted::Canceled));
    }

    #[tokio::test]
    async fn test_passed_deadline_fails_check() {
        let ctx = CallContext::new(CancellationToken::new()).with_deadline(Instant::now());
        assert_eq!(ctx.check(), Err(Interrupted::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_cancel_wins_over_deadline() {
        let ctx = CallContext::new(CancellationToken::new()).with_deadline(Instant::now());
        ctx.cancel();
        assert_eq!(ctx.check(), Err(Interrupted::Canceled));
    }

    #[tokio::test]
    async fn test_interrupted_resolves_on_deadline() {
        let ctx =
            CallContext::new(CancellationToken::new()).with_timeout(Duration::from_millis(20));
        let reason = tokio::time::timeout(Duration::from_secs(2), ctx.interrupted())
            .await
            .unwrap();
        assert_eq!(reason, Interrupted::DeadlineExceeded);
    }

    #[tokio::test]
    async fn test_interrupted_resolves_on_cancel() {
        let ctx = CallContext::new(CancellationToken::new());
        let waiter = ctx.clone();
        let handle = tokio::spawn(async move { waiter.interrupted().await });
        ctx.cancel();
        assert_eq!(handle.await.unwrap(), Interrupted::Canceled);
    }

    #[test]
    fn test_interrupted_messages() {
        assert_eq!(Interrupted::Canceled.to_string(), "request is canceled");
        assert_eq!(
            Interrupted::DeadlineExceeded.to_string(),
            "deadline is exceeded"
        );
    }

    #[test_case("1H", Some(Duration::from_secs(3600)) ; "hours")]
    #[test_case("2M", Some(Duration::from_secs(120)) ; "minutes")]
    #[test_case("30S", Some(Duration::from_secs(30)) ; "seconds")]
    #[test_case("250m", Some(Duration::from_millis(250)) ; "millis")]
    #[test_case("5u", Some(Duration::from_micros(5)) ; "micros")]
    #[test_case("99999999n", Some(Duration::from_nanos(99_999_999)) ; "eight digits")]
    #[test_case("123456789n", None ; "nine digits")]
    #[test_case("10", None ; "missing unit")]
    #[test_case("m", None ; "missing digits")]
    #[test_case("10x", None ; "unknown unit")]
    #[test_case("-1S", None ; "negative")]
    #[test_case("", None ; "empty")]
    fn test_parse_grpc_timeout(value: &str, expected: Option<Duration>) {
        assert_eq!(parse_grpc_timeout(value), expected);
    }
}
