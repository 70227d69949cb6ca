//! Ledger schema: accounts, virtual accounts, transaction legs, and
//! settlement exceptions.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(LEDGER_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            r"
            DROP TABLE IF EXISTS settlement_exceptions CASCADE;
            DROP TABLE IF EXISTS transactions CASCADE;
            DROP TABLE IF EXISTS virtual_accounts CASCADE;
            DROP TABLE IF EXISTS accounts CASCADE;
            ",
        )
        .await?;
        Ok(())
    }
}

const LEDGER_SQL: &str = r"
-- ============================================================
-- ACCOUNTS
-- ============================================================
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    owner_id UUID NOT NULL,
    account_type VARCHAR(16) NOT NULL
        CHECK (account_type IN ('user', 'store', 'platform')),
    account_key VARCHAR(64) NOT NULL,
    currency VARCHAR(3) NOT NULL,
    balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT true,
    is_fundable BOOLEAN NOT NULL DEFAULT true,
    is_withdrawable BOOLEAN NOT NULL DEFAULT true,
    is_suspended BOOLEAN NOT NULL DEFAULT false,
    locked BOOLEAN NOT NULL DEFAULT false,
    lock_reason TEXT,
    locked_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_accounts_key UNIQUE (account_key),
    CONSTRAINT uq_accounts_owner_type_currency UNIQUE (owner_id, account_type, currency),
    CONSTRAINT chk_accounts_balance_non_negative CHECK (balance >= 0),
    CONSTRAINT chk_accounts_lock_reason CHECK (NOT locked OR lock_reason IS NOT NULL)
);

CREATE INDEX idx_accounts_owner ON accounts(owner_id);
CREATE INDEX idx_accounts_platform ON accounts(currency, created_at)
    WHERE account_type = 'platform';

-- ============================================================
-- VIRTUAL ACCOUNTS
-- ============================================================
CREATE TABLE virtual_accounts (
    id UUID PRIMARY KEY,
    account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE RESTRICT,
    account_number VARCHAR(32) NOT NULL,
    account_name VARCHAR(255) NOT NULL,
    bank_name VARCHAR(255) NOT NULL,
    bank_code VARCHAR(16) NOT NULL,
    email VARCHAR(255) NOT NULL,
    phone VARCHAR(32),
    provider_reference VARCHAR(128) NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_virtual_accounts_number UNIQUE (account_number)
);

CREATE INDEX idx_virtual_accounts_account ON virtual_accounts(account_id);

-- ============================================================
-- TRANSACTIONS
-- ============================================================
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE RESTRICT,
    virtual_account_id UUID REFERENCES virtual_accounts(id) ON DELETE SET NULL,
    transaction_type VARCHAR(32) NOT NULL
        CHECK (transaction_type IN (
            'credit', 'debit', 'withdrawal', 'product_payment', 'subscription', 'fee'
        )),
    amount NUMERIC(19, 4) NOT NULL,
    fee_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    status VARCHAR(16) NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'completed', 'failed')),
    reference VARCHAR(128) NOT NULL,
    description TEXT,
    completed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_transactions_reference_account UNIQUE (reference, account_id),
    CONSTRAINT chk_transactions_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_transactions_fee_non_negative CHECK (fee_amount >= 0),
    CONSTRAINT chk_transactions_completed_at CHECK (
        (status = 'completed') = (completed_at IS NOT NULL)
    )
);

CREATE INDEX idx_transactions_reference ON transactions(reference);
CREATE INDEX idx_transactions_account_created ON transactions(account_id, created_at DESC);
CREATE INDEX idx_transactions_pending ON transactions(created_at)
    WHERE status = 'pending';

-- ============================================================
-- SETTLEMENT EXCEPTIONS
-- ============================================================
CREATE TABLE settlement_exceptions (
    id UUID PRIMARY KEY,
    reference VARCHAR(128) NOT NULL,
    stage VARCHAR(16) NOT NULL CHECK (stage IN ('transfer', 'commit', 'interrupted')),
    reason TEXT NOT NULL,
    transfer_references JSONB NOT NULL DEFAULT '[]'::jsonb,
    status VARCHAR(16) NOT NULL DEFAULT 'open'
        CHECK (status IN ('open', 'resolved', 'escalated')),
    resolution TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_settlement_exceptions_open ON settlement_exceptions(created_at)
    WHERE status = 'open';
CREATE INDEX idx_settlement_exceptions_reference ON settlement_exceptions(reference);
";
