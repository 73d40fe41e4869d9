//! # Retry Budget
//!
//! Bounds how long an operation may keep polling for convergence.
//!
//! The budget travels inside the [`ContinuationToken`] the caller persists
//! between invocations, so it survives process restarts. Every poll costs
//! exactly one retry; a poll that would take the counter below zero is the
//! unrecoverable "stuck forever" condition.
//!
//! ## Usage
//!
//! ```rust
//! use globalaccelerator_reconciler::controller::budget::RetryBudget;
//! use std::time::Duration;
//!
//! let budget = RetryBudget::new(Duration::from_secs(1), Duration::from_secs(3));
//! let token = budget.fresh(false);
//! assert_eq!(token.retries_remaining, 3);
//!
//! let token = budget.consume(token).unwrap();
//! assert_eq!(token.retries_remaining, 2);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Opaque progress state the caller persists and returns unchanged
///
/// Absence of a token means "first invocation of this operation".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationToken {
    /// Polls left before the operation times out; never below -1
    pub retries_remaining: i64,
    /// A mutation has been issued and the operation is waiting for convergence
    #[serde(default)]
    pub pending_mutation: bool,
}

impl ContinuationToken {
    /// Create a token with an explicit budget
    #[must_use]
    pub fn new(retries_remaining: i64, pending_mutation: bool) -> Self {
        Self {
            retries_remaining,
            pending_mutation,
        }
    }
}

/// The retry budget ran out before the remote resource converged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("retry budget exhausted")]
pub struct BudgetExhausted;

/// Retry budget tracker
///
/// Stateless: the running count lives in the [`ContinuationToken`]; this type
/// only knows the maximum and the delay between polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    poll_interval: Duration,
    max_retries: i64,
}

impl RetryBudget {
    /// Create a budget allowing `max_wait / poll_interval` polls
    ///
    /// A sub-second poll interval is treated as one second.
    ///
    /// # Example
    ///
    /// ```
    /// use globalaccelerator_reconciler::controller::budget::RetryBudget;
    /// use std::time::Duration;
    ///
    /// let budget = RetryBudget::new(Duration::from_secs(1), Duration::from_secs(4 * 60 * 60));
    /// assert_eq!(budget.max_retries(), 14_400);
    /// ```
    #[must_use]
    pub fn new(poll_interval: Duration, max_wait: Duration) -> Self {
        let interval_secs = poll_interval.as_secs().max(1);
        let max_retries = i64::try_from(max_wait.as_secs() / interval_secs).unwrap_or(i64::MAX);
        Self {
            poll_interval: Duration::from_secs(interval_secs),
            max_retries,
        }
    }

    /// Maximum number of polls for one operation
    #[must_use]
    pub fn max_retries(&self) -> i64 {
        self.max_retries
    }

    /// Delay the caller should wait before the next poll (seconds)
    #[must_use]
    pub fn poll_delay_secs(&self) -> u64 {
        self.poll_interval.as_secs()
    }

    /// A token carrying the full budget
    #[must_use]
    pub fn fresh(&self, pending_mutation: bool) -> ContinuationToken {
        ContinuationToken::new(self.max_retries, pending_mutation)
    }

    /// Spend one poll from `token`
    ///
    /// Returns the decremented token, or [`BudgetExhausted`] when the
    /// counter would drop below zero.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetExhausted`] when `token.retries_remaining` is zero or less.
    pub fn consume(&self, token: ContinuationToken) -> Result<ContinuationToken, BudgetExhausted> {
        let remaining = token.retries_remaining.saturating_sub(1);
        if remaining < 0 {
            return Err(BudgetExhausted);
        }
        Ok(ContinuationToken::new(remaining, token.pending_mutation))
    }
}
