use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::config::AppConfig;
use crate::error::WorkflowError;
use crate::models::contracts::{
    self, ContractListQuery, ContractResponse, CreateContract, DecisionInput, UpdateContract,
};
use crate::models::users::Principal;
use crate::workflow::{self, Action, audit};

type Handled = Result<HttpResponse, WorkflowError>;

/// Contract view plus the actions the caller may take next.
#[derive(Debug, Serialize)]
pub struct ContractDetail {
    #[serde(flatten)]
    pub contract: ContractResponse,
    pub allowed_actions: Vec<Action>,
}

impl ContractDetail {
    fn for_principal(principal: Principal, contract: contracts::Model) -> Self {
        Self {
            allowed_actions: workflow::allowed_actions(principal, &contract),
            contract: ContractResponse::from(contract),
        }
    }
}

fn detail(principal: Principal, contract: contracts::Model) -> HttpResponse {
    HttpResponse::Ok().json(ContractDetail::for_principal(principal, contract))
}

/// Approve/reject bodies are optional; an empty POST carries no reason.
fn decision(body: Option<web::Json<DecisionInput>>) -> DecisionInput {
    body.map(web::Json::into_inner).unwrap_or_default()
}

/// GET /api/contracts: filtered, paginated listing scoped to the caller.
pub async fn get_contracts(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    query: web::Query<ContractListQuery>,
) -> Handled {
    let page = workflow::list_contracts(db.get_ref(), user.principal(), &query).await?;
    Ok(HttpResponse::Ok().json(page.map(ContractResponse::from)))
}

/// POST /api/contracts: clients open a draft, procurement managers file
/// straight into procurement review.
pub async fn create_contract(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    body: web::Json<CreateContract>,
) -> Handled {
    let principal = user.principal();
    let contract = workflow::create_contract(
        db.get_ref(),
        principal,
        body.into_inner(),
        &config.reference_prefix,
    )
    .await?;

    Ok(HttpResponse::Created().json(ContractDetail::for_principal(principal, contract)))
}

/// GET /api/contracts/{id}
pub async fn get_contract(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Handled {
    let principal = user.principal();
    let contract = workflow::get_contract(db.get_ref(), principal, path.into_inner()).await?;
    Ok(detail(principal, contract))
}

/// PUT /api/contracts/{id}: partial edit while the current stage allows it.
pub async fn update_contract(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateContract>,
) -> Handled {
    let principal = user.principal();
    let contract =
        workflow::edit_contract(db.get_ref(), principal, path.into_inner(), body.into_inner())
            .await?;
    Ok(detail(principal, contract))
}

/// DELETE /api/contracts/{id}: soft delete.
pub async fn delete_contract(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Handled {
    workflow::delete_contract(db.get_ref(), user.principal(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/contracts/{id}/submit
pub async fn submit(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Handled {
    let principal = user.principal();
    let contract = workflow::submit_contract(db.get_ref(), principal, path.into_inner()).await?;
    Ok(detail(principal, contract))
}

/// POST /api/contracts/{id}/procurement/approve
pub async fn procurement_approve(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: Option<web::Json<DecisionInput>>,
) -> Handled {
    let principal = user.principal();
    let contract =
        workflow::approve_procurement(db.get_ref(), principal, path.into_inner(), decision(body))
            .await?;
    Ok(detail(principal, contract))
}

/// POST /api/contracts/{id}/procurement/reject
pub async fn procurement_reject(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: Option<web::Json<DecisionInput>>,
) -> Handled {
    let principal = user.principal();
    let contract =
        workflow::reject_procurement(db.get_ref(), principal, path.into_inner(), decision(body))
            .await?;
    Ok(detail(principal, contract))
}

/// POST /api/contracts/{id}/legal/approve
pub async fn legal_approve(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: Option<web::Json<DecisionInput>>,
) -> Handled {
    let principal = user.principal();
    let contract =
        workflow::approve_legal(db.get_ref(), principal, path.into_inner(), decision(body))
            .await?;
    Ok(detail(principal, contract))
}

/// POST /api/contracts/{id}/legal/reject
pub async fn legal_reject(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: Option<web::Json<DecisionInput>>,
) -> Handled {
    let principal = user.principal();
    let contract =
        workflow::reject_legal(db.get_ref(), principal, path.into_inner(), decision(body)).await?;
    Ok(detail(principal, contract))
}

/// POST /api/contracts/{id}/final/approve
pub async fn final_approve(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: Option<web::Json<DecisionInput>>,
) -> Handled {
    let principal = user.principal();
    let contract =
        workflow::final_approve(db.get_ref(), principal, path.into_inner(), decision(body))
            .await?;
    Ok(detail(principal, contract))
}

/// POST /api/contracts/{id}/final/reject
pub async fn final_reject(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: Option<web::Json<DecisionInput>>,
) -> Handled {
    let principal = user.principal();
    let contract =
        workflow::final_reject(db.get_ref(), principal, path.into_inner(), decision(body)).await?;
    Ok(detail(principal, contract))
}

/// POST /api/contracts/{id}/cancel
pub async fn cancel(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: Option<web::Json<DecisionInput>>,
) -> Handled {
    let principal = user.principal();
    let contract =
        workflow::cancel_contract(db.get_ref(), principal, path.into_inner(), decision(body))
            .await?;
    Ok(detail(principal, contract))
}

/// GET /api/contracts/{id}/events: audit trail, oldest first.
pub async fn get_events(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Handled {
    let events = audit::trail(db.get_ref(), user.principal(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(events))
}
