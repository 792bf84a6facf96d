//! Role → capability table consulted before every workflow operation.
//!
//! The guard answers "may this role do this here?" and nothing else. Whether
//! the contract's status admits the action at all is the transition table's
//! call (see [`super::next_status`]); a guard denial is `Forbidden`, a
//! transition-table miss is `InvalidTransition`.

use serde::Serialize;

use crate::models::contracts::{PipelineStatus, Status};
use crate::models::users::Roles;

/// Everything a caller can ask the workflow engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Submit,
    ProcurementApprove,
    ProcurementReject,
    LegalApprove,
    LegalReject,
    SubmitOffer,
    WithdrawOffer,
    SelectOffer,
    FinalApprove,
    FinalReject,
    Edit,
    Delete,
    Cancel,
    CreateRequest,
    AcceptRequest,
    RejectRequest,
    WithdrawRequest,
}

impl Action {
    pub const ALL: [Action; 18] = [
        Action::Create,
        Action::Submit,
        Action::ProcurementApprove,
        Action::ProcurementReject,
        Action::LegalApprove,
        Action::LegalReject,
        Action::SubmitOffer,
        Action::WithdrawOffer,
        Action::SelectOffer,
        Action::FinalApprove,
        Action::FinalReject,
        Action::Edit,
        Action::Delete,
        Action::Cancel,
        Action::CreateRequest,
        Action::AcceptRequest,
        Action::RejectRequest,
        Action::WithdrawRequest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Submit => "submit",
            Action::ProcurementApprove => "procurement.approve",
            Action::ProcurementReject => "procurement.reject",
            Action::LegalApprove => "legal.approve",
            Action::LegalReject => "legal.reject",
            Action::SubmitOffer => "provider.submit_offer",
            Action::WithdrawOffer => "provider.withdraw_offer",
            Action::SelectOffer => "coordinator.select_offer",
            Action::FinalApprove => "admin.final_approve",
            Action::FinalReject => "admin.final_reject",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Cancel => "cancel",
            Action::CreateRequest => "provider.create_request",
            Action::AcceptRequest => "client.accept_request",
            Action::RejectRequest => "client.reject_request",
            Action::WithdrawRequest => "provider.withdraw_request",
        }
    }
}

/// One entry of a role's capability list.
#[derive(Debug, Clone, Copy)]
struct Capability {
    action: Action,
    /// Caller must own the subject (contract, offer or request).
    owner_only: bool,
    /// Statuses the role may act in; `None` leaves it to the transition table.
    stages: Option<&'static [PipelineStatus]>,
}

const fn any(action: Action) -> Capability {
    Capability {
        action,
        owner_only: false,
        stages: None,
    }
}

const fn owned(action: Action) -> Capability {
    Capability {
        action,
        owner_only: true,
        stages: None,
    }
}

const fn during(action: Action, stages: &'static [PipelineStatus], owner_only: bool) -> Capability {
    Capability {
        action,
        owner_only,
        stages: Some(stages),
    }
}

const ADMIN: &[Capability] = &[
    any(Action::FinalApprove),
    any(Action::FinalReject),
    any(Action::Edit),
    any(Action::Delete),
    any(Action::Cancel),
];

const CLIENT: &[Capability] = &[
    any(Action::Create),
    owned(Action::Submit),
    during(Action::Edit, &[PipelineStatus::Draft], true),
    owned(Action::Delete),
    owned(Action::Cancel),
    owned(Action::AcceptRequest),
    owned(Action::RejectRequest),
];

const SERVICE_PROVIDER: &[Capability] = &[
    any(Action::SubmitOffer),
    owned(Action::WithdrawOffer),
    any(Action::CreateRequest),
    owned(Action::WithdrawRequest),
];

const PROCUREMENT_MANAGER: &[Capability] = &[
    any(Action::Create),
    any(Action::ProcurementApprove),
    any(Action::ProcurementReject),
    during(Action::Edit, &[PipelineStatus::PendingProcurement], false),
    owned(Action::Cancel),
];

const LEGAL_COUNSEL: &[Capability] = &[
    any(Action::LegalApprove),
    any(Action::LegalReject),
    during(Action::Edit, &[PipelineStatus::PendingLegal], false),
];

const CONTRACT_COORDINATOR: &[Capability] = &[any(Action::SelectOffer)];

fn capabilities(role: Roles) -> &'static [Capability] {
    match role {
        Roles::Admin => ADMIN,
        Roles::Client => CLIENT,
        Roles::ServiceProvider => SERVICE_PROVIDER,
        Roles::ProcurementManager => PROCUREMENT_MANAGER,
        Roles::LegalCounsel => LEGAL_COUNSEL,
        Roles::ContractCoordinator => CONTRACT_COORDINATOR,
    }
}

/// Whether `role` may perform `action` on a subject currently in `status`
/// (`None` for creation). `is_owner` is whether the caller owns the subject.
pub fn is_allowed(role: Roles, action: Action, status: Option<Status>, is_owner: bool) -> bool {
    capabilities(role)
        .iter()
        .filter(|c| c.action == action)
        .any(|c| {
            if c.owner_only && !is_owner {
                return false;
            }
            match c.stages {
                None => true,
                Some(stages) => status
                    .and_then(Status::pipeline)
                    .is_some_and(|s| stages.contains(&s)),
            }
        })
}
