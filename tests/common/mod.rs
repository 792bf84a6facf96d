//! Shared fixtures: an in-memory SQLite database with the schema applied,
//! one user per role and valid request bodies.
#![allow(dead_code)]

use chrono::NaiveDate;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use uuid::Uuid;

use contract_workflow::db::users::insert_user;
use contract_workflow::models::contracts::{ContractType, CreateContract};
use contract_workflow::models::offers::{CreateOffer, Deliverable};
use contract_workflow::models::requests::CreateRequest;
use contract_workflow::models::users::{Principal, Roles};

pub const PREFIX: &str = "CTR";

/// A fresh database. One pooled connection keeps the in-memory schema alive
/// and makes concurrent transactions queue up behind each other.
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to apply migrations");
    db
}

pub async fn user(db: &DatabaseConnection, role: Roles) -> Principal {
    let email = format!("{}-{}@example.com", role.as_str(), Uuid::new_v4());
    let model = insert_user(db, None, &email, None, role)
        .await
        .expect("Failed to insert user");
    Principal::from(&model)
}

/// One principal per role, plus a second provider and procurement manager.
pub struct Cast {
    pub client: Principal,
    pub other_client: Principal,
    pub procurement: Principal,
    pub other_procurement: Principal,
    pub legal: Principal,
    pub coordinator: Principal,
    pub admin: Principal,
    pub provider: Principal,
    pub other_provider: Principal,
}

impl Cast {
    pub async fn new(db: &DatabaseConnection) -> Self {
        Self {
            client: user(db, Roles::Client).await,
            other_client: user(db, Roles::Client).await,
            procurement: user(db, Roles::ProcurementManager).await,
            other_procurement: user(db, Roles::ProcurementManager).await,
            legal: user(db, Roles::LegalCounsel).await,
            coordinator: user(db, Roles::ContractCoordinator).await,
            admin: user(db, Roles::Admin).await,
            provider: user(db, Roles::ServiceProvider).await,
            other_provider: user(db, Roles::ServiceProvider).await,
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn contract_input(title: &str) -> CreateContract {
    CreateContract {
        title: title.to_string(),
        contract_type: ContractType::ItServices,
        description: "Operate and maintain the internal ticketing platform".to_string(),
        target_conditions: Some("24/7 on-call rotation".to_string()),
        target_persons: 3,
        budget_min: 1000.0,
        budget_max: 5000.0,
        currency: "EUR".to_string(),
        start_date: date(2026, 1, 1),
        end_date: date(2026, 12, 31),
        client_id: None,
    }
}

pub fn offer_input(amount: f64) -> CreateOffer {
    CreateOffer {
        amount,
        currency: None,
        start_date: date(2026, 2, 1),
        end_date: date(2026, 11, 30),
        description: "Dedicated team with monthly reporting".to_string(),
        deliverables: vec![Deliverable {
            title: "Monthly service report".to_string(),
        }],
    }
}

pub fn request_input() -> CreateRequest {
    CreateRequest {
        service_name: "Onboarding workshop".to_string(),
        budget: 800.0,
        persons: 2,
        start_date: date(2026, 3, 1),
        end_date: date(2026, 3, 2),
        description: "Two-day onboarding for the client's operators".to_string(),
        deliverables: Vec::new(),
    }
}
