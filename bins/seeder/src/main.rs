//! Database seeder for Vaultline development and testing.
//!
//! Seeds the platform ledger account plus a demo store and buyer, each with a
//! linked virtual account, and prints bearer tokens for the demo owners.
//! Re-running is safe: accounts whose virtual account number already exists
//! are skipped.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;
use vaultline_core::ledger::{Account, AccountStore, AccountType, LedgerStore, UnitOfWork, VirtualAccount};
use vaultline_db::SeaLedgerStore;
use vaultline_shared::types::{Currency, OwnerId, VirtualAccountId};
use vaultline_shared::{AppConfig, JwtService};

/// Platform owner ID (consistent for all seeds)
const PLATFORM_OWNER_ID: &str = "00000000-0000-0000-0000-000000000001";
/// Demo store owner ID
const STORE_OWNER_ID: &str = "00000000-0000-0000-0000-000000000002";
/// Demo buyer ID
const BUYER_OWNER_ID: &str = "00000000-0000-0000-0000-000000000003";

struct Seed {
    owner: &'static str,
    account_type: AccountType,
    number: &'static str,
    name: &'static str,
    balance: Decimal,
}

const SEEDS: [Seed; 3] = [
    Seed {
        owner: PLATFORM_OWNER_ID,
        account_type: AccountType::Platform,
        number: "9900000001",
        name: "Vaultline Platform",
        balance: Decimal::ZERO,
    },
    Seed {
        owner: STORE_OWNER_ID,
        account_type: AccountType::Store,
        number: "9900000002",
        name: "Demo Store",
        balance: Decimal::ZERO,
    },
    Seed {
        owner: BUYER_OWNER_ID,
        account_type: AccountType::User,
        number: "9900000003",
        name: "Demo Buyer",
        balance: Decimal::from_parts(10_000, 0, 0, false, 0),
    },
];

fn owner(raw: &str) -> anyhow::Result<OwnerId> {
    Ok(OwnerId::from_uuid(Uuid::parse_str(raw)?))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;

    println!("Connecting to database...");
    let db = vaultline_db::connect(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await
    .context("failed to connect to database")?;
    let store = SeaLedgerStore::new(db);

    for seed in &SEEDS {
        println!("Seeding {} account {}...", seed.account_type, seed.number);
        seed_account(&store, seed, config.settlement.currency).await?;
    }

    let jwt = JwtService::new(&config.jwt.secret);
    for (label, raw) in [("store", STORE_OWNER_ID), ("buyer", BUYER_OWNER_ID)] {
        let token = jwt.issue(owner(raw)?, "user", Duration::hours(24))?;
        println!("Dev token for {label} ({raw}):\n  {token}");
    }

    println!("Seeding complete!");
    Ok(())
}

/// Inserts one account and its virtual account in a single unit of work.
async fn seed_account(store: &SeaLedgerStore, seed: &Seed, currency: Currency) -> anyhow::Result<()> {
    let uow = store.begin().await?;
    if uow.find_virtual_account_by_number(seed.number).await?.is_some() {
        uow.rollback().await?;
        println!("  Virtual account {} already exists, skipping...", seed.number);
        return Ok(());
    }

    let now = Utc::now();
    let mut account = Account::open(
        owner(seed.owner)?,
        seed.account_type,
        currency,
        format!("ACC-SEED-{}", seed.number),
        now,
    );
    account.balance = seed.balance;
    let link = VirtualAccount {
        id: VirtualAccountId::new(),
        account_id: account.id,
        account_number: seed.number.to_string(),
        account_name: seed.name.to_string(),
        bank_name: "Wema Bank".to_string(),
        bank_code: "035".to_string(),
        email: format!("{}@vaultline.dev", seed.account_type),
        phone: None,
        provider_reference: format!("SEED-{}", seed.number),
        is_active: true,
        created_at: now,
    };

    uow.insert_account(&account).await?;
    uow.insert_virtual_account(&link).await?;
    uow.commit().await?;
    println!("  Created {} ({})", account.account_key, account.id);
    Ok(())
}
