use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::offers::{Deliverable, Deliverables};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "withdrawn")]
    Withdrawn,
}

/// SeaORM entity for the `requests` table: a provider's direct engagement
/// ask against a contract already assigned to them.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub contract_id: Uuid,
    pub provider_id: Uuid,
    pub service_name: String,
    #[sea_orm(column_type = "Double")]
    pub budget: f64,
    pub persons: i32,
    pub start_date: Date,
    pub end_date: Date,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub deliverables: Deliverables,
    pub status: RequestStatus,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contracts::Entity",
        from = "Column::ContractId",
        to = "super::contracts::Column::Id"
    )]
    Contract,
}

impl Related<super::contracts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contract.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// ── DTOs ──

/// Body of `POST /api/contracts/{id}/requests`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRequest {
    pub service_name: String,
    pub budget: f64,
    pub persons: i32,
    pub start_date: Date,
    pub end_date: Date,
    pub description: String,
    #[serde(default)]
    pub deliverables: Vec<Deliverable>,
}
