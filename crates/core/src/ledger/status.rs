//! Transaction status transitions.
//!
//! The only edges are `pending -> completed` and `pending -> failed`.

use chrono::{DateTime, Utc};

use super::error::LedgerError;
use super::types::{TransactionRecord, TransactionStatus};

/// Returns true if `from -> to` is a legal edge.
#[must_use]
pub const fn is_allowed(from: TransactionStatus, to: TransactionStatus) -> bool {
    matches!(
        (from, to),
        (
            TransactionStatus::Pending,
            TransactionStatus::Completed | TransactionStatus::Failed
        )
    )
}

/// Checks an edge without touching any record.
///
/// # Errors
///
/// Returns `LedgerError::InvalidTransition` for any edge other than
/// `pending -> completed` or `pending -> failed`.
pub fn ensure_transition(from: TransactionStatus, to: TransactionStatus) -> Result<(), LedgerError> {
    if is_allowed(from, to) {
        Ok(())
    } else {
        Err(LedgerError::InvalidTransition { from, to })
    }
}

/// Moves `record` to `to`, stamping `completed_at` on completion.
///
/// # Errors
///
/// Returns `LedgerError::InvalidTransition` and leaves the record untouched
/// if the edge is illegal.
pub fn transition(
    record: &mut TransactionRecord,
    to: TransactionStatus,
    now: DateTime<Utc>,
) -> Result<(), LedgerError> {
    ensure_transition(record.status, to)?;
    record.status = to;
    record.updated_at = now;
    if to == TransactionStatus::Completed {
        record.completed_at = Some(now);
    }
    Ok(())
}
