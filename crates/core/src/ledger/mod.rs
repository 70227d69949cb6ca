//! Ledger core: accounts, transaction legs, and the rules that move money.
//!
//! - `mutator` - the only code that changes a balance
//! - `status` - the transaction status law
//! - `fee` - platform fee split
//! - `reference` - collision-checked reference and account-key generation
//! - `store` - persistence seams and the unit of work
//! - `service` - account administration, direct postings, history

pub mod error;
pub mod fee;
pub mod mutator;
pub mod reference;
pub mod service;
pub mod status;
pub mod store;
pub mod types;

#[cfg(test)]
mod fee_props;
#[cfg(test)]
mod mutator_props;

pub use error::LedgerError;
pub use fee::{FeePolicy, FeeSplit};
pub use mutator::AccountMutator;
pub use reference::{ReferenceGenerator, ReferenceSource, TimestampedSource};
pub use service::{LedgerService, OpenedAccount};
pub use store::{AccountStore, ExceptionStore, LedgerStore, TransactionStore, UnitOfWork};
pub use types::{
    Account, AccountType, NewTransaction, TransactionFilter, TransactionRecord, TransactionStatus,
    TransactionSummary, TransactionType, VirtualAccount,
};
