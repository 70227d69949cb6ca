//! Webhook Reconciler: provider deposit notices become ledger credits, once.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::payload::DepositNotice;
use crate::ledger::store::{AccountStore, LedgerStore, TransactionStore, UnitOfWork};
use crate::ledger::{
    AccountMutator, LedgerError, TransactionRecord, TransactionStatus, TransactionType,
};
use crate::provider::PaymentProvider;

/// What a webhook delivery did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    /// A new credit was booked.
    Credited,
    /// The reference was already booked; nothing changed.
    AlreadyProcessed,
}

/// Outcome of [`WebhookReconciler::reconcile_webhook`].
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationResult {
    /// Whether this delivery booked the credit.
    pub status: ReconciliationStatus,
    /// The credit record, new or pre-existing.
    pub transaction: Option<TransactionRecord>,
    /// Human-readable outcome.
    pub message: String,
}

impl ReconciliationResult {
    fn credited(record: TransactionRecord) -> Self {
        Self {
            status: ReconciliationStatus::Credited,
            transaction: Some(record),
            message: "Payment processed successfully".to_string(),
        }
    }

    fn already_processed(record: Option<TransactionRecord>) -> Self {
        Self {
            status: ReconciliationStatus::AlreadyProcessed,
            transaction: record,
            message: "Transaction already processed".to_string(),
        }
    }
}

/// Verifies, deduplicates, and books provider deposit notices.
pub struct WebhookReconciler<S: LedgerStore, P: PaymentProvider> {
    store: Arc<S>,
    provider: Arc<P>,
}

impl<S: LedgerStore, P: PaymentProvider> WebhookReconciler<S, P> {
    /// Creates a reconciler.
    #[must_use]
    pub fn new(store: Arc<S>, provider: Arc<P>) -> Self {
        Self { store, provider }
    }

    /// Books the deposit described by `raw_body` if its reference is new.
    ///
    /// Redelivery of a processed reference succeeds without mutation.
    ///
    /// # Errors
    ///
    /// `InvalidSignature` before anything is parsed, `MalformedWebhook` for a
    /// bad payload, `AccountNotFound` for an unknown account number (accounts
    /// are never created here), `InvalidState` if the account cannot be
    /// credited, `Persistence` on storage failure.
    #[instrument(skip_all, fields(reference = tracing::field::Empty))]
    pub async fn reconcile_webhook(
        &self,
        signature: &str,
        raw_body: &[u8],
    ) -> Result<ReconciliationResult, LedgerError> {
        if !self.provider.verify_signature(signature, raw_body) {
            warn!("webhook rejected: invalid signature");
            return Err(LedgerError::InvalidSignature);
        }
        let notice = DepositNotice::parse(raw_body)?;
        tracing::Span::current().record("reference", notice.reference.as_str());

        match self.book(&notice).await {
            Err(LedgerError::DuplicateReference(_)) => {
                info!(reference = %notice.reference, "webhook raced a concurrent delivery");
                let existing = self.first_leg(&notice.reference).await?;
                Ok(ReconciliationResult::already_processed(existing))
            }
            other => other,
        }
    }

    async fn book(&self, notice: &DepositNotice) -> Result<ReconciliationResult, LedgerError> {
        let uow = self.store.begin().await?;
        let link = uow
            .find_virtual_account_by_number(&notice.account_number)
            .await?
            .ok_or_else(|| {
                LedgerError::AccountNotFound(format!(
                    "no account for virtual account {}",
                    notice.account_number
                ))
            })?;

        // Checked again under the row lock; the first read is a fast path.
        if let Some(existing) = uow.find_by_reference(&notice.reference).await?.into_iter().next() {
            uow.rollback().await?;
            info!(reference = %notice.reference, "webhook already processed");
            return Ok(ReconciliationResult::already_processed(Some(existing)));
        }

        let now = Utc::now();
        uow.lock_account(link.account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(link.account_id.to_string()))?;
        if let Some(existing) = uow.find_by_reference(&notice.reference).await?.into_iter().next() {
            uow.rollback().await?;
            return Ok(ReconciliationResult::already_processed(Some(existing)));
        }

        let mut record = TransactionRecord::pending(
            link.account_id,
            TransactionType::Credit,
            notice.amount,
            notice.reference.clone(),
            now,
        )
        .with_description("Virtual Account Credit")
        .via_virtual_account(link.id);
        record.status = TransactionStatus::Completed;
        record.completed_at = Some(now);

        let applied = async {
            AccountMutator::credit_locked(&uow, link.account_id, notice.amount, now).await?;
            uow.insert_transaction(&record).await
        }
        .await;
        match applied {
            Ok(()) => uow.commit().await?,
            Err(err) => {
                if let Err(rollback) = uow.rollback().await {
                    warn!(error = %rollback, "rollback failed");
                }
                return Err(err);
            }
        }

        info!(
            reference = %notice.reference,
            account_id = %link.account_id,
            amount = %notice.amount,
            "webhook credit booked"
        );
        Ok(ReconciliationResult::credited(record))
    }

    async fn first_leg(&self, reference: &str) -> Result<Option<TransactionRecord>, LedgerError> {
        let uow = self.store.begin().await?;
        let found = uow.find_by_reference(reference).await;
        uow.rollback().await?;
        Ok(found?.into_iter().next())
    }
}
