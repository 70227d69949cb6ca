//! `SeaORM` entity definitions.

pub mod accounts;
pub mod sea_orm_active_enums;
pub mod settlement_exceptions;
pub mod transactions;
pub mod virtual_accounts;
