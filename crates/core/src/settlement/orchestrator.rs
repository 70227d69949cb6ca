//! Settlement Orchestrator implementation.
//!
//! A settlement runs in four phases:
//!
//! 1. Resolve accounts, check gates and the provider balance. No writes.
//! 2. Insert every leg as `pending` under one fresh reference and commit.
//! 3. Issue the provider transfers, each bounded by a timeout.
//! 4. In one unit of work: lock the accounts in ascending id order, re-check
//!    the gates, move the balances, complete every leg, commit.
//!
//! A failure in phase 3 or 4 marks the pending legs `failed`. If a transfer
//! may have moved money, a [`SettlementException`] is written in the same
//! unit of work so the reconciliation worker can inspect it.
//!
//! Phases 2-4 run on their own task. Dropping the caller's future does not
//! stop them, so written legs always reach a terminal status.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{Instrument, error, info, instrument, warn};
use vaultline_shared::types::{AccountId, Currency};

use super::types::{
    ExceptionStage, ProductPayment, SettlementException, SettlementResult, SubscriptionPayment,
};
use crate::ledger::store::{AccountStore, ExceptionStore, LedgerStore, TransactionStore, UnitOfWork};
use crate::ledger::{
    Account, AccountMutator, FeePolicy, LedgerError, ReferenceGenerator, TransactionRecord,
    TransactionStatus, TransactionType, VirtualAccount, status,
};
use crate::provider::{self, PaymentProvider, ProviderError, TransferRequest, TransferState};

/// A ledger account together with its provider-side account.
#[derive(Debug, Clone)]
struct Party {
    account: Account,
    virtual_account: VirtualAccount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Debit,
    Credit,
}

/// A leg and the balance movement it stands for.
#[derive(Debug, Clone)]
struct PlannedLeg {
    record: TransactionRecord,
    direction: Direction,
}

/// Provider transfer to issue; the reference is assigned in phase 2.
#[derive(Debug, Clone)]
struct PlannedTransfer {
    from: String,
    to: String,
    amount: Decimal,
}

/// Everything needed to run phases 2-4.
#[derive(Debug)]
struct Plan {
    legs: Vec<PlannedLeg>,
    transfers: Vec<PlannedTransfer>,
    narration: String,
    fee: Decimal,
    net_amount: Decimal,
}

/// Why phase 3 stopped.
struct TransferFailure {
    error: ProviderError,
    /// Transfers that may have moved money.
    suspect: Vec<String>,
}

/// Composes multi-leg settlements against the ledger and the provider.
pub struct SettlementOrchestrator<S: LedgerStore, P: PaymentProvider> {
    store: Arc<S>,
    provider: Arc<P>,
    fees: FeePolicy,
    currency: Currency,
    call_timeout: Duration,
    references: ReferenceGenerator,
}

impl<S: LedgerStore, P: PaymentProvider> SettlementOrchestrator<S, P> {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        provider: Arc<P>,
        fees: FeePolicy,
        currency: Currency,
        call_timeout: Duration,
    ) -> Self {
        Self {
            store,
            provider,
            fees,
            currency,
            call_timeout,
            references: ReferenceGenerator::default(),
        }
    }

    /// Replaces the reference generator.
    #[must_use]
    pub fn with_references(mut self, references: ReferenceGenerator) -> Self {
        self.references = references;
        self
    }

    /// Settlement currency.
    #[must_use]
    pub const fn currency(&self) -> Currency {
        self.currency
    }
}

impl<S: LedgerStore + 'static, P: PaymentProvider + 'static> SettlementOrchestrator<S, P> {
    /// Buyer pays a store; the platform keeps a fee.
    ///
    /// Produces a debit on the buyer for `amount`, a credit on the store for
    /// `amount - fee` carrying `fee_amount = fee`, and a fee leg on the
    /// platform. The fee leg and its transfer are omitted when the fee
    /// rounds to zero.
    ///
    /// # Errors
    ///
    /// Input, state, and linkage errors before any write; provider and
    /// persistence errors after the legs exist, in which case every leg is
    /// `failed`.
    #[instrument(skip(self, payment), fields(buyer = %payment.buyer_account_id, store = %payment.store_account_id, amount = %payment.amount))]
    pub async fn settle_product_payment(
        &self,
        payment: ProductPayment,
    ) -> Result<SettlementResult, LedgerError> {
        self.validate_amount(payment.amount)?;
        if payment.product_ref.trim().is_empty() {
            return Err(LedgerError::validation("product reference is required"));
        }
        if payment.buyer_account_id == payment.store_account_id {
            return Err(LedgerError::validation("buyer and store accounts must differ"));
        }

        let (buyer, store, platform) = self
            .resolve(payment.buyer_account_id, Some(payment.store_account_id))
            .await?;
        let store = store.ok_or_else(|| LedgerError::AccountNotFound(payment.store_account_id.to_string()))?;
        if platform.account.id == buyer.account.id || platform.account.id == store.account.id {
            return Err(LedgerError::validation(
                "the platform account cannot take part in a product payment",
            ));
        }
        let split = self.fees.split(payment.amount, self.currency);

        AccountMutator::check_debit(&buyer.account, payment.amount)?;
        AccountMutator::check_credit(&store.account)?;
        if split.fee > Decimal::ZERO {
            AccountMutator::check_credit(&platform.account)?;
        }
        self.check_provider_balance(&buyer, payment.amount).await?;

        let now = Utc::now();
        let narration = format!("Payment for product {}", payment.product_ref);
        let mut legs = vec![
            PlannedLeg {
                record: TransactionRecord::pending(
                    buyer.account.id,
                    TransactionType::ProductPayment,
                    payment.amount,
                    "",
                    now,
                )
                .with_description(narration.clone()),
                direction: Direction::Debit,
            },
            PlannedLeg {
                record: TransactionRecord::pending(
                    store.account.id,
                    TransactionType::Credit,
                    split.net,
                    "",
                    now,
                )
                .with_fee(split.fee)
                .with_description(format!("Sale of product {}", payment.product_ref)),
                direction: Direction::Credit,
            },
        ];
        let mut transfers = vec![PlannedTransfer {
            from: buyer.virtual_account.account_number.clone(),
            to: store.virtual_account.account_number.clone(),
            amount: split.net,
        }];

        if split.fee > Decimal::ZERO {
            legs.push(PlannedLeg {
                record: TransactionRecord::pending(
                    platform.account.id,
                    TransactionType::Fee,
                    split.fee,
                    "",
                    now,
                )
                .with_description(format!("Platform fee for product {}", payment.product_ref)),
                direction: Direction::Credit,
            });
            transfers.push(PlannedTransfer {
                from: buyer.virtual_account.account_number.clone(),
                to: platform.virtual_account.account_number.clone(),
                amount: split.fee,
            });
        }

        self.execute(Plan {
            legs,
            transfers,
            narration,
            fee: split.fee,
            net_amount: split.net,
        })
        .await
    }

    /// User pays the platform for a store subscription.
    ///
    /// Produces a debit leg on the user and a credit leg on the platform,
    /// both of type `subscription`, and one provider transfer.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::settle_product_payment`].
    #[instrument(skip(self, payment), fields(user = %payment.user_account_id, store_ref = %payment.store_ref, amount = %payment.amount))]
    pub async fn settle_subscription_payment(
        &self,
        payment: SubscriptionPayment,
    ) -> Result<SettlementResult, LedgerError> {
        self.validate_amount(payment.amount)?;
        if payment.store_ref.trim().is_empty() {
            return Err(LedgerError::validation("store reference is required"));
        }

        let (user, _, platform) = self.resolve(payment.user_account_id, None).await?;
        if user.account.id == platform.account.id {
            return Err(LedgerError::validation(
                "the platform account cannot pay itself",
            ));
        }

        AccountMutator::check_debit(&user.account, payment.amount)?;
        AccountMutator::check_credit(&platform.account)?;
        self.check_provider_balance(&user, payment.amount).await?;

        let now = Utc::now();
        let narration = format!("Subscription payment for store {}", payment.store_ref);
        let legs = vec![
            PlannedLeg {
                record: TransactionRecord::pending(
                    user.account.id,
                    TransactionType::Subscription,
                    payment.amount,
                    "",
                    now,
                )
                .with_description(narration.clone()),
                direction: Direction::Debit,
            },
            PlannedLeg {
                record: TransactionRecord::pending(
                    platform.account.id,
                    TransactionType::Subscription,
                    payment.amount,
                    "",
                    now,
                )
                .with_description(narration.clone()),
                direction: Direction::Credit,
            },
        ];
        let transfers = vec![PlannedTransfer {
            from: user.virtual_account.account_number.clone(),
            to: platform.virtual_account.account_number.clone(),
            amount: payment.amount,
        }];

        self.execute(Plan {
            legs,
            transfers,
            narration,
            fee: Decimal::ZERO,
            net_amount: payment.amount,
        })
        .await
    }

    fn validate_amount(&self, amount: Decimal) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::validation("amount must be greater than zero"));
        }
        if !self.currency.fits_minor_unit(amount) {
            return Err(LedgerError::validation(format!(
                "amount {amount} has more decimals than {} allows",
                self.currency
            )));
        }
        Ok(())
    }

    /// Phase 1: payer, optional counterparty, and the platform account.
    async fn resolve(
        &self,
        payer_id: AccountId,
        counterparty_id: Option<AccountId>,
    ) -> Result<(Party, Option<Party>, Party), LedgerError> {
        let uow = self.store.begin().await?;
        let resolved = async {
            let payer = self.party(&uow, payer_id).await?;
            let counterparty = match counterparty_id {
                Some(id) => Some(self.party(&uow, id).await?),
                None => None,
            };
            let platform_account = uow
                .find_platform_account(self.currency)
                .await?
                .ok_or_else(|| {
                    LedgerError::AccountNotConfigured(format!(
                        "no platform account for {}",
                        self.currency
                    ))
                })?;
            let platform = self.link(&uow, platform_account).await?;
            Ok::<_, LedgerError>((payer, counterparty, platform))
        }
        .await;
        uow.rollback().await?;
        resolved
    }

    async fn party(&self, uow: &S::Uow, id: AccountId) -> Result<Party, LedgerError> {
        let account = uow
            .find_account(id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))?;
        if account.currency != self.currency {
            return Err(LedgerError::validation(format!(
                "account {id} holds {}, settlements run in {}",
                account.currency, self.currency
            )));
        }
        self.link(uow, account).await
    }

    async fn link(&self, uow: &S::Uow, account: Account) -> Result<Party, LedgerError> {
        let virtual_account = uow
            .find_virtual_account(account.id)
            .await?
            .filter(|va| va.is_active)
            .ok_or_else(|| {
                LedgerError::AccountNotConfigured(format!(
                    "account {} has no active virtual account",
                    account.id
                ))
            })?;
        Ok(Party {
            account,
            virtual_account,
        })
    }

    /// Advisory check; the row-locked gate in phase 4 is authoritative.
    async fn check_provider_balance(&self, payer: &Party, amount: Decimal) -> Result<(), LedgerError> {
        let available = provider::with_timeout(
            self.call_timeout,
            self.provider.get_balance(&payer.virtual_account.account_number),
        )
        .await?;
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                available,
                required: amount,
            });
        }
        Ok(())
    }

    async fn execute(&self, plan: Plan) -> Result<SettlementResult, LedgerError> {
        let settler = Settler {
            store: Arc::clone(&self.store),
            provider: Arc::clone(&self.provider),
            currency: self.currency,
            call_timeout: self.call_timeout,
            references: self.references.clone(),
        };
        tokio::spawn(settler.run(plan).in_current_span())
            .await
            .map_err(|err| {
                error!(error = %err, "settlement task did not finish");
                LedgerError::persistence(format!("settlement task did not finish: {err}"))
            })?
    }
}

/// Phases 2-4 of one settlement, owning everything they touch.
struct Settler<S, P> {
    store: Arc<S>,
    provider: Arc<P>,
    currency: Currency,
    call_timeout: Duration,
    references: ReferenceGenerator,
}

impl<S: LedgerStore, P: PaymentProvider> Settler<S, P> {
    async fn run(self, mut plan: Plan) -> Result<SettlementResult, LedgerError> {
        let reference = self.open_legs(&mut plan).await?;
        info!(%reference, legs = plan.legs.len(), "settlement legs recorded");

        let transfers: Vec<TransferRequest> = plan
            .transfers
            .iter()
            .enumerate()
            .map(|(i, t)| TransferRequest {
                from_account: t.from.clone(),
                to_account: t.to.clone(),
                amount: t.amount,
                currency: self.currency,
                narration: plan.narration.clone(),
                reference: format!("{reference}-{}", i + 1),
            })
            .collect();

        if let Err(failure) = self.run_transfers(&transfers).await {
            warn!(%reference, error = %failure.error, "provider transfer failed");
            let exception = (!failure.suspect.is_empty()).then(|| {
                SettlementException::open(
                    reference.clone(),
                    ExceptionStage::Transfer,
                    failure.error.to_string(),
                    failure.suspect.clone(),
                    Utc::now(),
                )
            });
            self.fail_legs(&reference, &plan, exception).await;
            return Err(failure.error.into());
        }

        match self.complete_legs(&plan).await {
            Ok(legs) => {
                info!(%reference, fee = %plan.fee, net = %plan.net_amount, "settlement completed");
                Ok(SettlementResult {
                    reference,
                    legs,
                    fee: plan.fee,
                    net_amount: plan.net_amount,
                    message: "Payment successful".to_string(),
                })
            }
            Err(err) => {
                error!(
                    %reference,
                    error = %err,
                    "transfers succeeded but ledger commit failed; flagged for reconciliation"
                );
                let exception = SettlementException::open(
                    reference.clone(),
                    ExceptionStage::Commit,
                    err.to_string(),
                    transfers.iter().map(|t| t.reference.clone()).collect(),
                    Utc::now(),
                );
                self.fail_legs(&reference, &plan, Some(exception)).await;
                Err(err)
            }
        }
    }

    /// Phase 2: assigns a fresh reference and persists the pending legs.
    async fn open_legs(&self, plan: &mut Plan) -> Result<String, LedgerError> {
        let uow = self.store.begin().await?;
        let reference = self
            .references
            .transaction_reference(&uow, Utc::now())
            .await?;
        for leg in &mut plan.legs {
            leg.record.reference.clone_from(&reference);
            uow.insert_transaction(&leg.record).await?;
        }
        uow.commit().await?;
        Ok(reference)
    }

    /// Runs a provider call under the configured deadline.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        provider::with_timeout(self.call_timeout, call).await
    }

    /// Phase 3: every transfer must succeed, in order.
    async fn run_transfers(&self, transfers: &[TransferRequest]) -> Result<(), TransferFailure> {
        let mut confirmed: Vec<String> = Vec::new();
        for transfer in transfers {
            let outcome = match self.bounded(self.provider.transfer(transfer)).await {
                Ok(receipt) => match receipt.state {
                    TransferState::Successful => Ok(()),
                    TransferState::Pending => Err((
                        ProviderError::Api {
                            status: 202,
                            message: format!("transfer {} not confirmed", transfer.reference),
                        },
                        true,
                    )),
                    TransferState::Failed | TransferState::NotFound => Err((
                        ProviderError::Api {
                            status: 200,
                            message: format!("transfer {} rejected", transfer.reference),
                        },
                        false,
                    )),
                },
                Err(err) => {
                    let unknown = err.outcome_unknown();
                    Err((err, unknown))
                }
            };

            match outcome {
                Ok(()) => confirmed.push(transfer.reference.clone()),
                Err((error, unknown)) => {
                    let mut suspect = confirmed;
                    if unknown {
                        suspect.push(transfer.reference.clone());
                    }
                    return Err(TransferFailure { error, suspect });
                }
            }
        }
        Ok(())
    }

    /// Phase 4: balances and statuses in one commit.
    async fn complete_legs(&self, plan: &Plan) -> Result<Vec<TransactionRecord>, LedgerError> {
        let uow = self.store.begin().await?;
        match Self::apply(&uow, plan).await {
            Ok(completed) => {
                uow.commit().await?;
                Ok(completed)
            }
            Err(err) => {
                if let Err(rollback) = uow.rollback().await {
                    warn!(error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn apply(uow: &S::Uow, plan: &Plan) -> Result<Vec<TransactionRecord>, LedgerError> {
        let mut ids: Vec<AccountId> = plan.legs.iter().map(|l| l.record.account_id).collect();
        ids.sort();
        ids.dedup();
        for id in &ids {
            uow.lock_account(*id)
                .await?
                .ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))?;
        }

        let now = Utc::now();
        for leg in &plan.legs {
            match leg.direction {
                Direction::Debit => {
                    AccountMutator::debit_locked(uow, leg.record.account_id, leg.record.amount, now)
                        .await?;
                }
                Direction::Credit => {
                    AccountMutator::credit_locked(uow, leg.record.account_id, leg.record.amount, now)
                        .await?;
                }
            }
        }

        let mut completed = Vec::with_capacity(plan.legs.len());
        for leg in &plan.legs {
            let mut record = leg.record.clone();
            status::transition(&mut record, TransactionStatus::Completed, now)?;
            if !uow.update_status(&record, TransactionStatus::Pending).await? {
                let current = uow
                    .find_transaction(record.id)
                    .await?
                    .map_or(TransactionStatus::Failed, |r| r.status);
                return Err(LedgerError::InvalidTransition {
                    from: current,
                    to: TransactionStatus::Completed,
                });
            }
            completed.push(record);
        }
        Ok(completed)
    }

    /// Marks every still-pending leg `failed` and records `exception`.
    ///
    /// Errors here are logged, never returned: the caller already has the
    /// failure that matters.
    async fn fail_legs(&self, reference: &str, plan: &Plan, exception: Option<SettlementException>) {
        let result = async {
            let uow = self.store.begin().await?;
            let now = Utc::now();
            for leg in &plan.legs {
                let mut record = leg.record.clone();
                status::transition(&mut record, TransactionStatus::Failed, now)?;
                uow.update_status(&record, TransactionStatus::Pending).await?;
            }
            if let Some(exception) = &exception {
                uow.insert_exception(exception).await?;
            }
            uow.commit().await
        }
        .await;

        match result {
            Ok(()) if exception.is_some() => {
                warn!(%reference, "legs failed; settlement exception recorded");
            }
            Ok(()) => info!(%reference, "legs failed"),
            Err(err) => error!(
                %reference,
                error = %err,
                "could not mark settlement legs failed; manual reconciliation required"
            ),
        }
    }
}
