//! Direct engagement requests from the provider a contract was assigned to.

use sea_orm::{DatabaseConnection, TransactionTrait};
use uuid::Uuid;

use super::guard::Action;
use super::{audit, authorize, load_contract, next_status, owns, validation};
use crate::db::offers as offer_db;
use crate::db::requests as request_db;
use crate::error::{WorkflowError, WorkflowResult};
use crate::models::contracts;
use crate::models::requests::{self, CreateRequest, RequestStatus};
use crate::models::users::{Principal, Roles};

fn require_assignment_phase(action: Action, contract: &contracts::Model) -> WorkflowResult<()> {
    match contract.status.pipeline().and_then(|s| next_status(action, s)) {
        Some(_) => Ok(()),
        None => Err(WorkflowError::invalid_state(format!(
            "Requests are only possible once a provider has been selected (status: {})",
            contract.status
        ))),
    }
}

/// Create a request against a contract whose selected offer is the caller's.
pub async fn create_request(
    db: &DatabaseConnection,
    principal: Principal,
    contract_id: Uuid,
    input: CreateRequest,
) -> WorkflowResult<requests::Model> {
    let txn = db.begin().await?;
    let contract = load_contract(&txn, contract_id).await?;
    authorize(principal, Action::CreateRequest, Some(contract.status), false)?;
    require_assignment_phase(Action::CreateRequest, &contract)?;

    let selected = contract
        .workflow
        .selected_offer()
        .ok_or_else(|| WorkflowError::invalid_state("No offer has been selected yet"))?;
    let assigned = offer_db::get_offer_by_id(&txn, selected)
        .await?
        .map(|offer| offer.provider_id);
    if assigned != Some(principal.user_id) {
        return Err(WorkflowError::forbidden(
            "Only the assigned provider can send requests for this contract",
        ));
    }

    validation::validate_request(&input)?;
    let request = request_db::insert_request(&txn, contract.id, principal.user_id, input).await?;

    audit::record(
        &txn,
        contract.id,
        principal,
        Action::CreateRequest,
        Some(contract.status),
        contract.status,
        None,
    )
    .await?;
    txn.commit().await?;

    Ok(request)
}

/// Move a pending request to `to` on behalf of the caller.
async fn decide(
    db: &DatabaseConnection,
    principal: Principal,
    request_id: Uuid,
    action: Action,
    to: RequestStatus,
) -> WorkflowResult<requests::Model> {
    let txn = db.begin().await?;
    let request = request_db::get_request_by_id(&txn, request_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found(format!("Request {request_id}")))?;
    let contract = load_contract(&txn, request.contract_id).await?;

    let is_owner = match action {
        Action::WithdrawRequest => request.provider_id == principal.user_id,
        _ => owns(&contract, principal),
    };
    authorize(principal, action, Some(contract.status), is_owner)?;
    require_assignment_phase(action, &contract)?;

    let updated = request_db::set_request_status_if(&txn, request.id, RequestStatus::Pending, to)
        .await?
        .ok_or_else(|| WorkflowError::invalid_state("Only pending requests can be changed"))?;

    audit::record(
        &txn,
        contract.id,
        principal,
        action,
        Some(contract.status),
        contract.status,
        None,
    )
    .await?;
    txn.commit().await?;

    Ok(updated)
}

pub async fn accept_request(
    db: &DatabaseConnection,
    principal: Principal,
    request_id: Uuid,
) -> WorkflowResult<requests::Model> {
    decide(
        db,
        principal,
        request_id,
        Action::AcceptRequest,
        RequestStatus::Accepted,
    )
    .await
}

pub async fn reject_request(
    db: &DatabaseConnection,
    principal: Principal,
    request_id: Uuid,
) -> WorkflowResult<requests::Model> {
    decide(
        db,
        principal,
        request_id,
        Action::RejectRequest,
        RequestStatus::Rejected,
    )
    .await
}

pub async fn withdraw_request(
    db: &DatabaseConnection,
    principal: Principal,
    request_id: Uuid,
) -> WorkflowResult<requests::Model> {
    decide(
        db,
        principal,
        request_id,
        Action::WithdrawRequest,
        RequestStatus::Withdrawn,
    )
    .await
}

/// Requests on a contract the caller may see. Providers only see their own.
pub async fn list_requests(
    db: &DatabaseConnection,
    principal: Principal,
    contract_id: Uuid,
) -> WorkflowResult<Vec<requests::Model>> {
    let contract = super::get_contract(db, principal, contract_id).await?;
    let provider = match principal.role {
        Roles::ServiceProvider => Some(principal.user_id),
        _ => None,
    };
    Ok(request_db::get_requests_by_contract(db, contract.id, provider).await?)
}
