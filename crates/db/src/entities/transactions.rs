//! `SeaORM` Entity for transactions table.

use super::sea_orm_active_enums::{TransactionStatus, TransactionType};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: Uuid,
    pub virtual_account_id: Option<Uuid>,
    pub transaction_type: TransactionType,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub fee_amount: Decimal,
    pub status: TransactionStatus,
    pub reference: String,
    pub description: Option<String>,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
    #[sea_orm(
        belongs_to = "super::virtual_accounts::Entity",
        from = "Column::VirtualAccountId",
        to = "super::virtual_accounts::Column::Id"
    )]
    VirtualAccounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::virtual_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VirtualAccounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
