//! `SeaORM` Entity for accounts table.

use super::sea_orm_active_enums::AccountType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub account_type: AccountType,
    #[sea_orm(unique)]
    pub account_key: String,
    pub currency: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub balance: Decimal,
    pub is_active: bool,
    pub is_fundable: bool,
    pub is_withdrawable: bool,
    pub is_suspended: bool,
    pub locked: bool,
    pub lock_reason: Option<String>,
    pub locked_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
    #[sea_orm(has_many = "super::virtual_accounts::Entity")]
    VirtualAccounts,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::virtual_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VirtualAccounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
