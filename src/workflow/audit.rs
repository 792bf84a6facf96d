//! Audit trail of who moved a contract, when and why.

use sea_orm::{ConnectionTrait, DatabaseConnection};
use uuid::Uuid;

use super::guard::Action;
use crate::db::events as event_db;
use crate::error::WorkflowResult;
use crate::models::contracts::Status;
use crate::models::events;
use crate::models::users::Principal;

/// Record a completed action. Called inside the action's transaction so the
/// entry commits or rolls back with it.
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    contract_id: Uuid,
    actor: Principal,
    action: Action,
    from: Option<Status>,
    to: Status,
    reason: Option<String>,
) -> WorkflowResult<events::Model> {
    let event = event_db::insert_event(
        conn,
        contract_id,
        actor,
        action.as_str(),
        from,
        to,
        reason,
    )
    .await?;

    tracing::info!(
        contract_id = %contract_id,
        action = action.as_str(),
        from = ?from,
        to = ?to,
        actor_id = %actor.user_id,
        actor_role = actor.role.as_str(),
        "workflow action recorded"
    );

    Ok(event)
}

/// The audit trail of a contract the caller may see.
pub async fn trail(
    db: &DatabaseConnection,
    principal: Principal,
    contract_id: Uuid,
) -> WorkflowResult<Vec<events::Model>> {
    let contract = super::get_contract(db, principal, contract_id).await?;
    Ok(event_db::get_events_by_contract(db, contract.id).await?)
}
