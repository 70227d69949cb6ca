//! `SeaORM` Entity for settlement_exceptions table.

use super::sea_orm_active_enums::{ExceptionStage, ExceptionStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "settlement_exceptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub reference: String,
    pub stage: ExceptionStage,
    pub reason: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub transfer_references: Json,
    pub status: ExceptionStatus,
    pub resolution: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
