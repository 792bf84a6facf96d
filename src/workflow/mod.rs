//! The contract approval state machine.
//!
//! Every operation runs as one transaction: read the contract, check the
//! caller against the guard, look the move up in the transition table, then
//! write the new status, the workflow log entry, any side effects and the
//! audit event together. The contract write is guarded on the status and
//! version that were read, so of two racing callers exactly one wins and the
//! other gets `InvalidTransition`.

pub mod arbitration;
pub mod audit;
pub mod engagement;
pub mod guard;
pub mod validation;

use chrono::Datelike;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    TransactionTrait,
};
use uuid::Uuid;

pub use guard::{Action, is_allowed};

use crate::db::contracts::{self as contract_db, ContractMeta};
use crate::db::offers as offer_db;
use crate::db::reference;
use crate::db::users as user_db;
use crate::error::{FieldError, WorkflowError, WorkflowResult};
use crate::models::Page;
use crate::models::contracts::{
    self, ContractFields, ContractListQuery, CreateContract, Decision, DecisionInput,
    PipelineStatus, Stage, StageRecord, Status, UpdateContract, Workflow,
};
use crate::models::users::{Principal, Roles};

/// Where a new contract starts, depending on who creates it.
pub fn initial_status(role: Roles) -> Option<PipelineStatus> {
    match role {
        Roles::Client => Some(PipelineStatus::Draft),
        Roles::ProcurementManager => Some(PipelineStatus::PendingProcurement),
        _ => None,
    }
}

/// The transition table. `None` means the action is not valid from `from`.
/// Only pipeline statuses go in or come out; legacy statuses never transition.
pub fn next_status(action: Action, from: PipelineStatus) -> Option<PipelineStatus> {
    use crate::models::contracts::PipelineStatus::*;

    match (action, from) {
        (Action::Submit, Draft) => Some(PendingProcurement),
        (Action::ProcurementApprove, PendingProcurement) => Some(PendingLegal),
        (Action::ProcurementReject, PendingProcurement) => Some(Rejected),
        (Action::LegalApprove, PendingLegal) => Some(OpenForOffers),
        (Action::LegalReject, PendingLegal) => Some(Rejected),
        (Action::SubmitOffer | Action::WithdrawOffer, OpenForOffers) => Some(OpenForOffers),
        // offer_selected is passed through within the same unit of work
        (Action::SelectOffer, OpenForOffers) => Some(PendingFinalApproval),
        (Action::FinalApprove, PendingFinalApproval) => Some(FinalApproved),
        (Action::FinalReject, PendingFinalApproval) => Some(Rejected),
        (Action::Edit, s @ (Draft | PendingProcurement | PendingLegal)) => Some(s),
        (Action::Delete, s @ (Draft | PendingProcurement)) => Some(s),
        (
            Action::Cancel,
            Draft | PendingProcurement | PendingLegal | OpenForOffers | OfferSelected
            | PendingFinalApproval,
        ) => Some(Cancelled),
        (
            Action::CreateRequest
            | Action::AcceptRequest
            | Action::RejectRequest
            | Action::WithdrawRequest,
            s @ (PendingFinalApproval | FinalApproved),
        ) => Some(s),
        _ => None,
    }
}

/// Whether the caller owns the contract: its client, or whoever created it.
pub(crate) fn owns(contract: &contracts::Model, principal: Principal) -> bool {
    contract.is_owned_by(principal.user_id) || contract.created_by == principal.user_id
}

/// Actions the caller could perform on the contract right now. Dashboards
/// render their buttons from this instead of branching on role.
pub fn allowed_actions(principal: Principal, contract: &contracts::Model) -> Vec<Action> {
    let Some(from) = contract.status.pipeline() else {
        return Vec::new();
    };
    let is_owner = owns(contract, principal);

    Action::ALL
        .into_iter()
        .filter(|&action| {
            is_allowed(principal.role, action, Some(contract.status), is_owner)
                && next_status(action, from).is_some()
        })
        .collect()
}

pub(crate) async fn load_contract<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> WorkflowResult<contracts::Model> {
    contract_db::get_contract_by_id(conn, id)
        .await?
        .ok_or_else(|| WorkflowError::not_found(format!("Contract {id}")))
}

pub(crate) fn authorize(
    principal: Principal,
    action: Action,
    status: Option<Status>,
    is_owner: bool,
) -> WorkflowResult<()> {
    if is_allowed(principal.role, action, status, is_owner) {
        return Ok(());
    }
    tracing::debug!(
        user_id = %principal.user_id,
        role = principal.role.as_str(),
        action = action.as_str(),
        "action denied"
    );
    Err(WorkflowError::forbidden(format!(
        "A {} may not perform {} on this contract",
        principal.role.as_str(),
        action.as_str()
    )))
}

/// Look `action` up in the transition table for the contract's status.
pub(crate) fn advance(
    action: Action,
    contract: &contracts::Model,
) -> WorkflowResult<(PipelineStatus, PipelineStatus)> {
    let from = contract
        .status
        .pipeline()
        .ok_or_else(|| WorkflowError::invalid_transition(action.as_str(), contract.status))?;
    let to = next_status(action, from)
        .ok_or_else(|| WorkflowError::invalid_transition(action.as_str(), from))?;
    Ok((from, to))
}

/// A transition that has been read, authorized and looked up but not yet
/// written. Dropping it rolls everything back.
pub(crate) struct Step {
    pub txn: DatabaseTransaction,
    pub contract: contracts::Model,
    pub from: PipelineStatus,
    pub to: PipelineStatus,
}

impl Step {
    pub async fn begin(
        db: &DatabaseConnection,
        principal: Principal,
        contract_id: Uuid,
        action: Action,
    ) -> WorkflowResult<Self> {
        let txn = db.begin().await?;
        let contract = load_contract(&txn, contract_id).await?;
        authorize(
            principal,
            action,
            Some(contract.status),
            owns(&contract, principal),
        )?;
        let (from, to) = advance(action, &contract)?;
        Ok(Self {
            txn,
            contract,
            from,
            to,
        })
    }

    /// Write the new status and workflow log, guarded on what was read, and
    /// append the audit event.
    pub async fn apply(
        &self,
        principal: Principal,
        action: Action,
        workflow: Workflow,
        reason: Option<String>,
    ) -> WorkflowResult<contracts::Model> {
        let updated =
            contract_db::apply_transition(&self.txn, &self.contract, self.to.into(), workflow)
                .await?;
        let Some(updated) = updated else {
            return Err(self.lost_race(action).await);
        };

        audit::record(
            &self.txn,
            updated.id,
            principal,
            action,
            Some(self.contract.status),
            updated.status,
            reason,
        )
        .await?;
        Ok(updated)
    }

    /// Error for a guarded write that matched nothing because another
    /// writer changed the contract first.
    pub async fn lost_race(&self, action: Action) -> WorkflowError {
        tracing::warn!(
            contract_id = %self.contract.id,
            action = action.as_str(),
            "contract changed concurrently"
        );
        match load_contract(&self.txn, self.contract.id).await {
            Ok(now) => WorkflowError::invalid_transition(action.as_str(), now.status),
            Err(e) => e,
        }
    }

    pub async fn commit(self) -> WorkflowResult<()> {
        self.txn.commit().await?;
        Ok(())
    }

    fn stage_record(
        &self,
        principal: Principal,
        decision: Decision,
        reason: Option<String>,
        notes: Option<String>,
    ) -> StageRecord {
        StageRecord {
            actor_id: principal.user_id,
            decision,
            decided_at: chrono::Utc::now(),
            reason,
            notes,
            selected_offer: None,
        }
    }

    /// The current log with one more stage entry; an already-decided stage
    /// makes the action invalid.
    fn log_with(
        &self,
        action: Action,
        stage: Stage,
        record: StageRecord,
    ) -> WorkflowResult<Workflow> {
        let mut workflow = self.contract.workflow.clone();
        workflow
            .record(stage, record)
            .map_err(|_| WorkflowError::invalid_transition(action.as_str(), self.from))?;
        Ok(workflow)
    }
}

// ── Creation ──

/// Create a contract. Clients start in `draft` and always own what they
/// create; procurement managers start in `pending_procurement` and may name
/// the client the contract is for.
pub async fn create_contract(
    db: &DatabaseConnection,
    principal: Principal,
    input: CreateContract,
    reference_prefix: &str,
) -> WorkflowResult<contracts::Model> {
    authorize(principal, Action::Create, None, false)?;
    let status = initial_status(principal.role).ok_or_else(|| {
        WorkflowError::forbidden("Only clients and procurement managers create contracts")
    })?;

    let owner_id = match (principal.role, input.client_id) {
        (Roles::Client, Some(client_id)) if client_id != principal.user_id => {
            return Err(WorkflowError::forbidden(
                "Clients can only create contracts for themselves",
            ));
        }
        (Roles::Client, _) => Some(principal.user_id),
        (_, client_id) => client_id,
    };

    let fields = ContractFields::from(input);
    validation::validate_contract(&fields)?;

    let txn = db.begin().await?;

    if let (Roles::ProcurementManager, Some(client_id)) = (principal.role, owner_id) {
        match user_db::get_user_by_id(&txn, client_id).await? {
            Some(user) if user.role == Roles::Client => {}
            _ => {
                return Err(WorkflowError::Validation(vec![FieldError::new(
                    "client_id",
                    "must reference an existing client",
                )]));
            }
        }
    }

    let year = chrono::Utc::now().year();
    let reference_number = reference::next_reference(&txn, reference_prefix, year).await?;
    let contract = contract_db::insert_contract(
        &txn,
        fields,
        ContractMeta {
            reference_number,
            owner_id,
            created_by: principal.user_id,
            status: status.into(),
        },
    )
    .await?;

    audit::record(
        &txn,
        contract.id,
        principal,
        Action::Create,
        None,
        contract.status,
        None,
    )
    .await?;
    txn.commit().await?;

    Ok(contract)
}

// ── Pipeline transitions ──

/// `draft → pending_procurement`, by the owning client.
pub async fn submit_contract(
    db: &DatabaseConnection,
    principal: Principal,
    contract_id: Uuid,
) -> WorkflowResult<contracts::Model> {
    let step = Step::begin(db, principal, contract_id, Action::Submit).await?;
    let workflow = step.contract.workflow.clone();
    let updated = step.apply(principal, Action::Submit, workflow, None).await?;
    step.commit().await?;
    Ok(updated)
}

/// A reviewing stage's approve or reject decision.
async fn review(
    db: &DatabaseConnection,
    principal: Principal,
    contract_id: Uuid,
    action: Action,
    stage: Stage,
    decision: Decision,
    input: DecisionInput,
) -> WorkflowResult<contracts::Model> {
    let step = Step::begin(db, principal, contract_id, action).await?;

    let reason = match decision {
        Decision::Rejected => Some(validation::require_reason(&input)?),
        _ => input.reason.filter(|r| !r.trim().is_empty()),
    };
    let record = step.stage_record(principal, decision, reason.clone(), input.notes);
    let workflow = step.log_with(action, stage, record)?;

    let updated = step.apply(principal, action, workflow, reason).await?;
    step.commit().await?;
    Ok(updated)
}

pub async fn approve_procurement(
    db: &DatabaseConnection,
    principal: Principal,
    contract_id: Uuid,
    input: DecisionInput,
) -> WorkflowResult<contracts::Model> {
    review(
        db,
        principal,
        contract_id,
        Action::ProcurementApprove,
        Stage::Procurement,
        Decision::Approved,
        input,
    )
    .await
}

pub async fn reject_procurement(
    db: &DatabaseConnection,
    principal: Principal,
    contract_id: Uuid,
    input: DecisionInput,
) -> WorkflowResult<contracts::Model> {
    review(
        db,
        principal,
        contract_id,
        Action::ProcurementReject,
        Stage::Procurement,
        Decision::Rejected,
        input,
    )
    .await
}

pub async fn approve_legal(
    db: &DatabaseConnection,
    principal: Principal,
    contract_id: Uuid,
    input: DecisionInput,
) -> WorkflowResult<contracts::Model> {
    review(
        db,
        principal,
        contract_id,
        Action::LegalApprove,
        Stage::Legal,
        Decision::Approved,
        input,
    )
    .await
}

pub async fn reject_legal(
    db: &DatabaseConnection,
    principal: Principal,
    contract_id: Uuid,
    input: DecisionInput,
) -> WorkflowResult<contracts::Model> {
    review(
        db,
        principal,
        contract_id,
        Action::LegalReject,
        Stage::Legal,
        Decision::Rejected,
        input,
    )
    .await
}

/// `pending_final_approval → final_approved`. The contract's fields are
/// frozen from here on.
pub async fn final_approve(
    db: &DatabaseConnection,
    principal: Principal,
    contract_id: Uuid,
    input: DecisionInput,
) -> WorkflowResult<contracts::Model> {
    review(
        db,
        principal,
        contract_id,
        Action::FinalApprove,
        Stage::FinalReview,
        Decision::Approved,
        input,
    )
    .await
}

pub async fn final_reject(
    db: &DatabaseConnection,
    principal: Principal,
    contract_id: Uuid,
    input: DecisionInput,
) -> WorkflowResult<contracts::Model> {
    review(
        db,
        principal,
        contract_id,
        Action::FinalReject,
        Stage::FinalReview,
        Decision::Rejected,
        input,
    )
    .await
}

/// Cancel a contract that has not been finally approved. Pending offers are
/// rejected in the same unit of work.
pub async fn cancel_contract(
    db: &DatabaseConnection,
    principal: Principal,
    contract_id: Uuid,
    input: DecisionInput,
) -> WorkflowResult<contracts::Model> {
    let step = Step::begin(db, principal, contract_id, Action::Cancel).await?;
    let reason = input.reason.filter(|r| !r.trim().is_empty());
    let workflow = step.contract.workflow.clone();

    let updated = step.apply(principal, Action::Cancel, workflow, reason).await?;
    let rejected = offer_db::reject_pending_offers(&step.txn, contract_id, None).await?;
    step.commit().await?;

    tracing::info!(contract_id = %contract_id, rejected_offers = rejected, "contract cancelled");
    Ok(updated)
}

// ── Field edits and removal ──

/// Edit the descriptive and commercial fields while the contract is in the
/// caller's stage. The merged result is validated as a whole.
pub async fn edit_contract(
    db: &DatabaseConnection,
    principal: Principal,
    contract_id: Uuid,
    changes: UpdateContract,
) -> WorkflowResult<contracts::Model> {
    let step = Step::begin(db, principal, contract_id, Action::Edit).await?;

    let fields = step.contract.with_changes(changes);
    validation::validate_contract(&fields)?;

    let Some(updated) = contract_db::update_contract_fields(&step.txn, &step.contract, fields).await?
    else {
        return Err(step.lost_race(Action::Edit).await);
    };
    audit::record(
        &step.txn,
        updated.id,
        principal,
        Action::Edit,
        Some(step.contract.status),
        updated.status,
        None,
    )
    .await?;
    step.commit().await?;
    Ok(updated)
}

/// Soft-delete a contract that has not gone past procurement review.
pub async fn delete_contract(
    db: &DatabaseConnection,
    principal: Principal,
    contract_id: Uuid,
) -> WorkflowResult<()> {
    let step = Step::begin(db, principal, contract_id, Action::Delete).await?;

    if !contract_db::soft_delete_contract(&step.txn, &step.contract).await? {
        return Err(step.lost_race(Action::Delete).await);
    }
    audit::record(
        &step.txn,
        contract_id,
        principal,
        Action::Delete,
        Some(step.contract.status),
        step.contract.status,
        None,
    )
    .await?;
    step.commit().await
}

// ── Reads ──

/// Whether the caller may see the contract at all.
async fn can_view(
    db: &DatabaseConnection,
    principal: Principal,
    contract: &contracts::Model,
) -> WorkflowResult<bool> {
    Ok(match principal.role {
        Roles::Client => contract.is_owned_by(principal.user_id),
        Roles::ServiceProvider => {
            contract.status == Status::OpenForOffers
                || !offer_db::get_offers_by_contract_and_provider(
                    db,
                    contract.id,
                    principal.user_id,
                )
                .await?
                .is_empty()
        }
        _ => true,
    })
}

/// Fetch one contract the caller may see.
pub async fn get_contract(
    db: &DatabaseConnection,
    principal: Principal,
    contract_id: Uuid,
) -> WorkflowResult<contracts::Model> {
    let contract = load_contract(db, contract_id).await?;
    if !can_view(db, principal, &contract).await? {
        return Err(WorkflowError::forbidden(
            "You can only view contracts you are involved in",
        ));
    }
    Ok(contract)
}

/// The slice of all contracts a role's dashboard lists.
fn visible_to(principal: Principal) -> Condition {
    match principal.role {
        Roles::Client => Condition::all().add(contracts::Column::OwnerId.eq(principal.user_id)),
        Roles::ServiceProvider => {
            Condition::all().add(contracts::Column::Status.eq(Status::OpenForOffers))
        }
        _ => Condition::all(),
    }
}

/// Filtered, paginated, role-scoped listing.
pub async fn list_contracts(
    db: &DatabaseConnection,
    principal: Principal,
    query: &ContractListQuery,
) -> WorkflowResult<Page<contracts::Model>> {
    let pagination = query.pagination();
    validation::validate_pagination(&pagination)?;
    let (rows, total) = contract_db::list_contracts(db, query, visible_to(principal)).await?;
    Ok(Page::new(rows, pagination.page(), pagination.limit(), total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::contracts::PipelineStatus::*;

    const PIPELINE: [PipelineStatus; 9] = [
        Draft,
        PendingProcurement,
        PendingLegal,
        OpenForOffers,
        OfferSelected,
        PendingFinalApproval,
        FinalApproved,
        Rejected,
        Cancelled,
    ];

    #[test]
    fn happy_path_through_the_pipeline() {
        let mut status = Draft;
        for action in [
            Action::Submit,
            Action::ProcurementApprove,
            Action::LegalApprove,
            Action::SelectOffer,
            Action::FinalApprove,
        ] {
            status = next_status(action, status).expect("valid step");
        }
        assert_eq!(status, FinalApproved);
    }

    #[test]
    fn terminal_statuses_absorb_every_action() {
        for from in [Rejected, Cancelled] {
            for action in Action::ALL {
                assert_eq!(next_status(action, from), None, "{action:?} from {from:?}");
            }
        }
    }

    #[test]
    fn final_approval_freezes_fields() {
        assert_eq!(next_status(Action::Edit, FinalApproved), None);
        assert_eq!(next_status(Action::Cancel, FinalApproved), None);
        assert_eq!(next_status(Action::Delete, FinalApproved), None);
    }

    #[test]
    fn legal_approve_from_draft_is_invalid() {
        assert_eq!(next_status(Action::LegalApprove, Draft), None);
    }

    #[test]
    fn rejection_reachable_only_from_review_stages() {
        let sources: Vec<_> = PIPELINE
            .into_iter()
            .filter(|&from| {
                Action::ALL
                    .into_iter()
                    .any(|a| next_status(a, from) == Some(Rejected))
            })
            .collect();
        assert_eq!(sources, vec![PendingProcurement, PendingLegal, PendingFinalApproval]);
    }

    #[test]
    fn cancel_reachable_from_every_live_status() {
        for from in PIPELINE {
            let expected = !from.is_terminal() && from != FinalApproved;
            assert_eq!(next_status(Action::Cancel, from).is_some(), expected, "{from:?}");
        }
    }

    #[test]
    fn legacy_statuses_have_no_pipeline_status() {
        for status in [
            Status::PendingApproval,
            Status::Published,
            Status::SearchingProvider,
            Status::ProviderAssigned,
            Status::InProgress,
            Status::Completed,
        ] {
            assert!(status.pipeline().is_none());
            assert!(status.is_legacy());
        }
    }

    #[test]
    fn initial_status_depends_on_creator() {
        assert_eq!(initial_status(Roles::Client), Some(Draft));
        assert_eq!(initial_status(Roles::ProcurementManager), Some(PendingProcurement));
        assert_eq!(initial_status(Roles::Admin), None);
    }
}
