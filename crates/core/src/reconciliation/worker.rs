//! Sweeps open settlement exceptions against provider transfer records.
//!
//! Each sweep first looks for settlement legs still `pending` past the
//! abandonment threshold. Their settlement never reached phase 4 or its
//! failure path, so the legs are failed and an `interrupted` exception is
//! opened for the transfers they may have issued. The exception sweep then
//! classifies those together with every other open exception.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::ledger::store::{ExceptionStore, LedgerStore, TransactionStore, UnitOfWork};
use crate::ledger::{LedgerError, TransactionStatus, status};
use crate::provider::{self, PaymentProvider, TransferState};
use crate::settlement::{ExceptionStage, ExceptionStatus, SettlementException};

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(300);

/// What the provider says happened to one exception's transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// No transfer moved money; the failed legs are correct.
    NoFundsMoved,
    /// At least one transfer completed; the ledger is behind the provider.
    FundsMoved,
    /// A transfer is still processing or the provider did not answer.
    Undetermined,
}

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Abandoned settlements turned into exceptions.
    pub interrupted: usize,
    /// Exceptions examined.
    pub examined: usize,
    /// Closed automatically.
    pub resolved: usize,
    /// Handed to an operator.
    pub escalated: usize,
    /// Left open for the next sweep.
    pub deferred: usize,
}

/// Periodic reconciliation of settlements whose provider outcome is unknown.
pub struct ReconciliationWorker<S: LedgerStore, P: PaymentProvider> {
    store: Arc<S>,
    provider: Arc<P>,
    call_timeout: Duration,
    stale_after: Duration,
}

impl<S: LedgerStore, P: PaymentProvider> ReconciliationWorker<S, P> {
    /// Creates a worker with a 15s provider deadline and a 5 minute
    /// abandonment threshold.
    #[must_use]
    pub fn new(store: Arc<S>, provider: Arc<P>) -> Self {
        Self {
            store,
            provider,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            stale_after: DEFAULT_STALE_AFTER,
        }
    }

    /// Bounds each transfer status lookup.
    #[must_use]
    pub const fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Sets how long a leg may stay `pending` before its settlement counts
    /// as abandoned.
    #[must_use]
    pub const fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Asks the provider about every transfer of `exception`.
    pub async fn classify(&self, exception: &SettlementException) -> Classification {
        let mut undetermined = false;
        for reference in &exception.transfer_references {
            let lookup = self.provider.transfer_status(reference);
            match provider::with_timeout(self.call_timeout, lookup).await {
                Ok(TransferState::Successful) => return Classification::FundsMoved,
                Ok(TransferState::Pending) => undetermined = true,
                Ok(TransferState::Failed | TransferState::NotFound) => {}
                Err(err) => {
                    warn!(%reference, error = %err, "transfer status lookup failed");
                    undetermined = true;
                }
            }
        }
        if undetermined {
            Classification::Undetermined
        } else {
            Classification::NoFundsMoved
        }
    }

    /// Fails abandoned settlements, then examines up to `batch_size` open
    /// exceptions, oldest first.
    ///
    /// # Errors
    ///
    /// `Persistence` if legs or exceptions cannot be loaded or saved.
    /// Provider failures only defer the affected exception.
    pub async fn run_once(&self, batch_size: u64) -> Result<SweepReport, LedgerError> {
        let mut report = SweepReport {
            interrupted: self.interrupt_stale(batch_size).await?,
            ..SweepReport::default()
        };

        let open = {
            let uow = self.store.begin().await?;
            let open = uow.list_open_exceptions(batch_size).await;
            uow.rollback().await?;
            open?
        };

        for mut exception in open {
            report.examined += 1;
            let now = Utc::now();
            match self.classify(&exception).await {
                Classification::NoFundsMoved => {
                    exception.status = ExceptionStatus::Resolved;
                    exception.resolution =
                        Some("provider confirms no transfer completed".to_string());
                    report.resolved += 1;
                    info!(reference = %exception.reference, "settlement exception resolved");
                }
                Classification::FundsMoved => {
                    exception.status = ExceptionStatus::Escalated;
                    exception.resolution = Some(
                        "provider completed a transfer for failed legs; manual review required"
                            .to_string(),
                    );
                    report.escalated += 1;
                    error!(
                        reference = %exception.reference,
                        stage = exception.stage.as_str(),
                        transfers = ?exception.transfer_references,
                        "provider moved funds the ledger does not reflect"
                    );
                }
                Classification::Undetermined => {
                    report.deferred += 1;
                    continue;
                }
            }
            exception.updated_at = now;

            let uow = self.store.begin().await?;
            uow.save_exception(&exception).await?;
            uow.commit().await?;
        }

        if report.examined > 0 || report.interrupted > 0 {
            info!(?report, "reconciliation sweep finished");
        }
        Ok(report)
    }

    /// Fails the legs of settlements left `pending` past the threshold and
    /// opens an `interrupted` exception for each. Returns how many.
    async fn interrupt_stale(&self, batch_size: u64) -> Result<usize, LedgerError> {
        let cutoff = Utc::now()
            - TimeDelta::from_std(self.stale_after)
                .map_err(|_| LedgerError::validation("stale threshold out of range"))?;
        let stale = {
            let uow = self.store.begin().await?;
            let stale = uow.list_stale_pending(cutoff, batch_size).await;
            uow.rollback().await?;
            stale?
        };

        let references: BTreeSet<String> = stale.into_iter().map(|leg| leg.reference).collect();

        let mut interrupted = 0;
        for reference in references {
            if self.interrupt(&reference).await? {
                interrupted += 1;
            }
        }
        Ok(interrupted)
    }

    /// Fails every pending leg under `reference` in one unit of work.
    ///
    /// Skips single legs, which no settlement writes, and settlements whose
    /// legs changed status since they were listed.
    async fn interrupt(&self, reference: &str) -> Result<bool, LedgerError> {
        let uow = self.store.begin().await?;
        let legs = uow.find_by_reference(reference).await?;
        if legs.len() < 2 {
            debug!(%reference, "lone pending leg is not a settlement; skipped");
            uow.rollback().await?;
            return Ok(false);
        }

        let now = Utc::now();
        for leg in legs.iter().filter(|l| l.status == TransactionStatus::Pending) {
            let mut record = leg.clone();
            status::transition(&mut record, TransactionStatus::Failed, now)?;
            if !uow.update_status(&record, TransactionStatus::Pending).await? {
                uow.rollback().await?;
                return Ok(false);
            }
        }

        // A settlement with n legs issues at most n - 1 transfers.
        let transfers = (1..legs.len()).map(|i| format!("{reference}-{i}")).collect();
        let exception = SettlementException::open(
            reference,
            ExceptionStage::Interrupted,
            "settlement interrupted before completion",
            transfers,
            now,
        );
        uow.insert_exception(&exception).await?;
        uow.commit().await?;
        warn!(%reference, legs = legs.len(), "abandoned settlement failed; exception opened");
        Ok(true)
    }
}
