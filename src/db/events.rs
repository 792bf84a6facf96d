use sea_orm::*;
use uuid::Uuid;

use crate::models::contracts::Status;
use crate::models::events;
use crate::models::users::Principal;

/// Append one entry to a contract's audit trail.
pub async fn insert_event<C: ConnectionTrait>(
    conn: &C,
    contract_id: Uuid,
    actor: Principal,
    action: &str,
    from_status: Option<Status>,
    to_status: Status,
    reason: Option<String>,
) -> Result<events::Model, DbErr> {
    let event = events::ActiveModel {
        id: Set(Uuid::new_v4()),
        contract_id: Set(contract_id),
        actor_id: Set(actor.user_id),
        actor_role: Set(actor.role),
        action: Set(action.to_string()),
        from_status: Set(from_status),
        to_status: Set(to_status),
        reason: Set(reason),
        created_at: Set(chrono::Utc::now()),
    };

    event.insert(conn).await
}

/// A contract's audit trail in the order it was written.
pub async fn get_events_by_contract<C: ConnectionTrait>(
    conn: &C,
    contract_id: Uuid,
) -> Result<Vec<events::Model>, DbErr> {
    events::Entity::find()
        .filter(events::Column::ContractId.eq(contract_id))
        .order_by_asc(events::Column::CreatedAt)
        .all(conn)
        .await
}
