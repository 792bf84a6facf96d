use sea_orm::*;
use uuid::Uuid;

use crate::models::offers::Deliverables;
use crate::models::requests::{self, CreateRequest, RequestStatus};

/// Insert a new pending engagement request.
pub async fn insert_request<C: ConnectionTrait>(
    conn: &C,
    contract_id: Uuid,
    provider_id: Uuid,
    input: CreateRequest,
) -> Result<requests::Model, DbErr> {
    let new_request = requests::ActiveModel {
        id: Set(Uuid::new_v4()),
        contract_id: Set(contract_id),
        provider_id: Set(provider_id),
        service_name: Set(input.service_name.trim().to_string()),
        budget: Set(input.budget),
        persons: Set(input.persons),
        start_date: Set(input.start_date),
        end_date: Set(input.end_date),
        description: Set(input.description),
        deliverables: Set(Deliverables(input.deliverables)),
        status: Set(RequestStatus::Pending),
        created_at: Set(chrono::Utc::now()),
        updated_at: Set(None),
    };

    new_request.insert(conn).await
}

/// Fetch a single request by ID.
pub async fn get_request_by_id<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<Option<requests::Model>, DbErr> {
    requests::Entity::find_by_id(id).one(conn).await
}

/// Requests on a contract, newest first, optionally narrowed to one provider.
pub async fn get_requests_by_contract<C: ConnectionTrait>(
    conn: &C,
    contract_id: Uuid,
    provider_id: Option<Uuid>,
) -> Result<Vec<requests::Model>, DbErr> {
    let mut query = requests::Entity::find().filter(requests::Column::ContractId.eq(contract_id));
    if let Some(provider_id) = provider_id {
        query = query.filter(requests::Column::ProviderId.eq(provider_id));
    }

    query
        .order_by_desc(requests::Column::CreatedAt)
        .all(conn)
        .await
}

/// Move a request from `expected` to `to`; `None` if it was no longer in
/// `expected`.
pub async fn set_request_status_if<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    expected: RequestStatus,
    to: RequestStatus,
) -> Result<Option<requests::Model>, DbErr> {
    let changes = requests::ActiveModel {
        status: Set(to),
        updated_at: Set(Some(chrono::Utc::now())),
        ..Default::default()
    };

    let result = requests::Entity::update_many()
        .set(changes)
        .filter(requests::Column::Id.eq(id))
        .filter(requests::Column::Status.eq(expected))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Ok(None);
    }
    get_request_by_id(conn, id).await
}
