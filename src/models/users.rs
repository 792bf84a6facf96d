use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The `Roles` enum maps to a Postgres TEXT column stored as snake_case strings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum Roles {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "client")]
    Client,
    #[sea_orm(string_value = "service_provider")]
    ServiceProvider,
    #[sea_orm(string_value = "procurement_manager")]
    ProcurementManager,
    #[sea_orm(string_value = "legal_counsel")]
    LegalCounsel,
    #[sea_orm(string_value = "contract_coordinator")]
    ContractCoordinator,
}

impl Roles {
    pub fn as_str(&self) -> &'static str {
        match self {
            Roles::Admin => "admin",
            Roles::Client => "client",
            Roles::ServiceProvider => "service_provider",
            Roles::ProcurementManager => "procurement_manager",
            Roles::LegalCounsel => "legal_counsel",
            Roles::ContractCoordinator => "contract_coordinator",
        }
    }
}

/// SeaORM entity for the `users` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub display_name: Option<String>,
    pub role: Roles,
    /// First time a bearer token resolved to this account. `None` for an
    /// account provisioned by an administrator that has not signed in yet.
    pub first_seen_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::contracts::Entity")]
    Contracts,
    #[sea_orm(has_many = "super::offers::Entity")]
    Offers,
}

impl Related<super::contracts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contracts.def()
    }
}

impl Related<super::offers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Offers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// The already-authenticated caller the workflow engine acts on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Roles,
}

impl From<&Model> for Principal {
    fn from(m: &Model) -> Self {
        Self {
            user_id: m.id,
            role: m.role,
        }
    }
}

// ── DTOs (not stored in DB, used for request bodies) ──

/// Used internally by the auth extractor to create a user on first sight.
#[derive(Debug, Clone)]
pub struct CreateUserFromAuth {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Roles,
}

/// Body of `POST /api/users`. `id` is the identity issuer's subject for the
/// account; without it the account is bound by email on first sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub id: Option<Uuid>,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Roles,
}

/// Body of `PUT /api/users/{id}/role`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRole {
    pub role: Roles,
}

/// A safe user representation for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Roles,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

impl From<Model> for UserResponse {
    fn from(m: Model) -> Self {
        Self {
            id: m.id,
            email: m.email,
            display_name: m.display_name,
            role: m.role,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
