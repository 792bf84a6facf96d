use sea_orm::*;
use uuid::Uuid;

use crate::models::offers::{self, CreateOffer, Deliverables, OfferStatus};

/// Insert a new pending offer.
pub async fn insert_offer<C: ConnectionTrait>(
    conn: &C,
    contract_id: Uuid,
    provider_id: Uuid,
    currency: String,
    input: CreateOffer,
) -> Result<offers::Model, DbErr> {
    let new_offer = offers::ActiveModel {
        id: Set(Uuid::new_v4()),
        contract_id: Set(contract_id),
        provider_id: Set(provider_id),
        amount: Set(input.amount),
        currency: Set(currency),
        start_date: Set(input.start_date),
        end_date: Set(input.end_date),
        description: Set(input.description),
        deliverables: Set(Deliverables(input.deliverables)),
        status: Set(OfferStatus::Pending),
        created_at: Set(chrono::Utc::now()),
        updated_at: Set(None),
    };

    new_offer.insert(conn).await
}

/// Fetch a single offer by ID.
pub async fn get_offer_by_id<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<Option<offers::Model>, DbErr> {
    offers::Entity::find_by_id(id).one(conn).await
}

/// All offers on a contract, oldest first.
pub async fn get_offers_by_contract<C: ConnectionTrait>(
    conn: &C,
    contract_id: Uuid,
) -> Result<Vec<offers::Model>, DbErr> {
    offers::Entity::find()
        .filter(offers::Column::ContractId.eq(contract_id))
        .order_by_asc(offers::Column::CreatedAt)
        .order_by_asc(offers::Column::Id)
        .all(conn)
        .await
}

/// A provider's offers on a contract, oldest first.
pub async fn get_offers_by_contract_and_provider<C: ConnectionTrait>(
    conn: &C,
    contract_id: Uuid,
    provider_id: Uuid,
) -> Result<Vec<offers::Model>, DbErr> {
    offers::Entity::find()
        .filter(offers::Column::ContractId.eq(contract_id))
        .filter(offers::Column::ProviderId.eq(provider_id))
        .order_by_asc(offers::Column::CreatedAt)
        .all(conn)
        .await
}

/// Whether the provider already has a pending offer on the contract.
pub async fn pending_offer_exists<C: ConnectionTrait>(
    conn: &C,
    contract_id: Uuid,
    provider_id: Uuid,
) -> Result<bool, DbErr> {
    let count = offers::Entity::find()
        .filter(offers::Column::ContractId.eq(contract_id))
        .filter(offers::Column::ProviderId.eq(provider_id))
        .filter(offers::Column::Status.eq(OfferStatus::Pending))
        .count(conn)
        .await?;

    Ok(count > 0)
}

/// Move an offer from `expected` to `to`. Returns `false` if the offer was no
/// longer in `expected`.
pub async fn set_offer_status_if<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    expected: OfferStatus,
    to: OfferStatus,
) -> Result<bool, DbErr> {
    let changes = offers::ActiveModel {
        status: Set(to),
        updated_at: Set(Some(chrono::Utc::now())),
        ..Default::default()
    };

    let result = offers::Entity::update_many()
        .set(changes)
        .filter(offers::Column::Id.eq(id))
        .filter(offers::Column::Status.eq(expected))
        .exec(conn)
        .await?;

    Ok(result.rows_affected > 0)
}

/// Reject every still-pending offer on a contract, except `keep` if given.
pub async fn reject_pending_offers<C: ConnectionTrait>(
    conn: &C,
    contract_id: Uuid,
    keep: Option<Uuid>,
) -> Result<u64, DbErr> {
    let changes = offers::ActiveModel {
        status: Set(OfferStatus::Rejected),
        updated_at: Set(Some(chrono::Utc::now())),
        ..Default::default()
    };

    let mut update = offers::Entity::update_many()
        .set(changes)
        .filter(offers::Column::ContractId.eq(contract_id))
        .filter(offers::Column::Status.eq(OfferStatus::Pending));
    if let Some(keep) = keep {
        update = update.filter(offers::Column::Id.ne(keep));
    }

    Ok(update.exec(conn).await?.rows_affected)
}
