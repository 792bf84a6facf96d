//! Offers on a contract that is open for bidding: admission, withdrawal and
//! the coordinator's selection.

use sea_orm::{DatabaseConnection, TransactionTrait};
use uuid::Uuid;

use super::guard::Action;
use super::{Step, audit, authorize, load_contract, owns, validation};
use crate::db::contracts as contract_db;
use crate::db::offers as offer_db;
use crate::error::{WorkflowError, WorkflowResult};
use crate::models::contracts::{self, Decision, Stage, StageRecord, Status};
use crate::models::offers::{self, CreateOffer, OfferStatus};
use crate::models::users::{Principal, Roles};

fn not_open(contract: &contracts::Model) -> WorkflowError {
    WorkflowError::invalid_state(format!(
        "Contract {} is not open for offers (status: {})",
        contract.reference_number, contract.status
    ))
}

/// Admit a provider's offer. One pending offer per provider and contract.
pub async fn submit_offer(
    db: &DatabaseConnection,
    principal: Principal,
    contract_id: Uuid,
    input: CreateOffer,
) -> WorkflowResult<offers::Model> {
    let txn = db.begin().await?;
    let contract = load_contract(&txn, contract_id).await?;
    authorize(principal, Action::SubmitOffer, Some(contract.status), false)?;

    if contract.status != Status::OpenForOffers {
        return Err(not_open(&contract));
    }
    validation::validate_offer(&input)?;

    // Holds the contract row until commit, so a concurrent selection or
    // cancellation cannot slip in between the checks and the insert.
    if !contract_db::lock_if_status(&txn, contract.id, Status::OpenForOffers).await? {
        return Err(not_open(&contract));
    }
    if offer_db::pending_offer_exists(&txn, contract.id, principal.user_id).await? {
        return Err(WorkflowError::DuplicateOffer);
    }

    let currency = input
        .currency
        .clone()
        .unwrap_or_else(|| contract.currency.clone());
    let offer = offer_db::insert_offer(&txn, contract.id, principal.user_id, currency, input).await?;

    audit::record(
        &txn,
        contract.id,
        principal,
        Action::SubmitOffer,
        Some(contract.status),
        contract.status,
        None,
    )
    .await?;
    txn.commit().await?;

    Ok(offer)
}

/// Withdraw one of the caller's own pending offers.
pub async fn withdraw_offer(
    db: &DatabaseConnection,
    principal: Principal,
    offer_id: Uuid,
) -> WorkflowResult<offers::Model> {
    let offer = offer_db::get_offer_by_id(db, offer_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found(format!("Offer {offer_id}")))?;
    authorize(
        principal,
        Action::WithdrawOffer,
        None,
        offer.provider_id == principal.user_id,
    )?;

    if !offer_db::set_offer_status_if(db, offer.id, OfferStatus::Pending, OfferStatus::Withdrawn)
        .await?
    {
        return Err(WorkflowError::invalid_state(
            "Only pending offers can be withdrawn",
        ));
    }
    tracing::info!(offer_id = %offer.id, contract_id = %offer.contract_id, "offer withdrawn");

    offer_db::get_offer_by_id(db, offer.id)
        .await?
        .ok_or_else(|| WorkflowError::not_found(format!("Offer {offer_id}")))
}

/// Select one pending offer. In one transaction: the contract moves to
/// `pending_final_approval` with the coordinator's log entry, the chosen
/// offer becomes `selected` and every other pending offer `rejected`. Any
/// failure leaves all of them untouched.
pub async fn select_offer(
    db: &DatabaseConnection,
    principal: Principal,
    contract_id: Uuid,
    offer_id: Uuid,
    notes: Option<String>,
) -> WorkflowResult<(contracts::Model, Vec<offers::Model>)> {
    let txn = db.begin().await?;
    let contract = load_contract(&txn, contract_id).await?;
    authorize(
        principal,
        Action::SelectOffer,
        Some(contract.status),
        owns(&contract, principal),
    )?;

    let offer = offer_db::get_offer_by_id(&txn, offer_id)
        .await?
        .filter(|o| o.contract_id == contract.id)
        .ok_or_else(|| WorkflowError::not_found(format!("Offer {offer_id}")))?;

    if contract.status != Status::OpenForOffers {
        return Err(not_open(&contract));
    }
    if offer.status != OfferStatus::Pending {
        return Err(WorkflowError::invalid_state("Only pending offers can be selected"));
    }

    let (from, to) = super::advance(Action::SelectOffer, &contract)?;
    let step = Step {
        txn,
        contract,
        from,
        to,
    };

    let record = StageRecord {
        actor_id: principal.user_id,
        decision: Decision::Selected,
        decided_at: chrono::Utc::now(),
        reason: None,
        notes,
        selected_offer: Some(offer.id),
    };
    let workflow = step.log_with(Action::SelectOffer, Stage::Coordinator, record)?;

    // Contract first: its row lock orders us against offer admission.
    let updated = step
        .apply(principal, Action::SelectOffer, workflow, None)
        .await?;

    if !offer_db::set_offer_status_if(&step.txn, offer.id, OfferStatus::Pending, OfferStatus::Selected)
        .await?
    {
        return Err(WorkflowError::invalid_state("Only pending offers can be selected"));
    }
    let rejected = offer_db::reject_pending_offers(&step.txn, updated.id, Some(offer.id)).await?;
    let offers = offer_db::get_offers_by_contract(&step.txn, updated.id).await?;
    step.commit().await?;

    tracing::info!(
        contract_id = %updated.id,
        offer_id = %offer.id,
        rejected_offers = rejected,
        "offer selected"
    );
    Ok((updated, offers))
}

/// Offers on a contract the caller may see. Providers only see their own.
pub async fn list_offers(
    db: &DatabaseConnection,
    principal: Principal,
    contract_id: Uuid,
) -> WorkflowResult<Vec<offers::Model>> {
    let contract = super::get_contract(db, principal, contract_id).await?;
    let offers = match principal.role {
        Roles::ServiceProvider => {
            offer_db::get_offers_by_contract_and_provider(db, contract.id, principal.user_id)
                .await?
        }
        _ => offer_db::get_offers_by_contract(db, contract.id).await?,
    };
    Ok(offers)
}
