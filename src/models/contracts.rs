use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Contract status stored as a snake_case string in the database.
///
/// The column holds both the live pipeline vocabulary and a handful of
/// legacy values written by older clients. Use [`Status::lane`] to tell
/// them apart; only [`PipelineStatus`] values take part in transitions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "pending_procurement")]
    PendingProcurement,
    #[sea_orm(string_value = "pending_legal")]
    PendingLegal,
    #[sea_orm(string_value = "open_for_offers")]
    OpenForOffers,
    #[sea_orm(string_value = "offer_selected")]
    OfferSelected,
    #[sea_orm(string_value = "pending_final_approval")]
    PendingFinalApproval,
    #[sea_orm(string_value = "final_approved")]
    FinalApproved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    // Legacy, read-only.
    #[sea_orm(string_value = "pending_approval")]
    PendingApproval,
    #[sea_orm(string_value = "published")]
    Published,
    #[sea_orm(string_value = "searching_provider")]
    SearchingProvider,
    #[sea_orm(string_value = "provider_assigned")]
    ProviderAssigned,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
}

/// Statuses of the live approval pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Draft,
    PendingProcurement,
    PendingLegal,
    OpenForOffers,
    OfferSelected,
    PendingFinalApproval,
    FinalApproved,
    Rejected,
    Cancelled,
}

/// Statuses kept only so that older rows still deserialize and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyStatus {
    PendingApproval,
    Published,
    SearchingProvider,
    ProviderAssigned,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLane {
    Pipeline(PipelineStatus),
    Legacy(LegacyStatus),
}

impl Status {
    pub fn lane(self) -> StatusLane {
        match self {
            Status::Draft => StatusLane::Pipeline(PipelineStatus::Draft),
            Status::PendingProcurement => StatusLane::Pipeline(PipelineStatus::PendingProcurement),
            Status::PendingLegal => StatusLane::Pipeline(PipelineStatus::PendingLegal),
            Status::OpenForOffers => StatusLane::Pipeline(PipelineStatus::OpenForOffers),
            Status::OfferSelected => StatusLane::Pipeline(PipelineStatus::OfferSelected),
            Status::PendingFinalApproval => {
                StatusLane::Pipeline(PipelineStatus::PendingFinalApproval)
            }
            Status::FinalApproved => StatusLane::Pipeline(PipelineStatus::FinalApproved),
            Status::Rejected => StatusLane::Pipeline(PipelineStatus::Rejected),
            Status::Cancelled => StatusLane::Pipeline(PipelineStatus::Cancelled),
            Status::PendingApproval => StatusLane::Legacy(LegacyStatus::PendingApproval),
            Status::Published => StatusLane::Legacy(LegacyStatus::Published),
            Status::SearchingProvider => StatusLane::Legacy(LegacyStatus::SearchingProvider),
            Status::ProviderAssigned => StatusLane::Legacy(LegacyStatus::ProviderAssigned),
            Status::InProgress => StatusLane::Legacy(LegacyStatus::InProgress),
            Status::Completed => StatusLane::Legacy(LegacyStatus::Completed),
        }
    }

    /// The pipeline status, or `None` for legacy values.
    pub fn pipeline(self) -> Option<PipelineStatus> {
        match self.lane() {
            StatusLane::Pipeline(status) => Some(status),
            StatusLane::Legacy(_) => None,
        }
    }

    pub fn is_legacy(self) -> bool {
        matches!(self.lane(), StatusLane::Legacy(_))
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_value())
    }
}

impl From<PipelineStatus> for Status {
    fn from(status: PipelineStatus) -> Self {
        match status {
            PipelineStatus::Draft => Status::Draft,
            PipelineStatus::PendingProcurement => Status::PendingProcurement,
            PipelineStatus::PendingLegal => Status::PendingLegal,
            PipelineStatus::OpenForOffers => Status::OpenForOffers,
            PipelineStatus::OfferSelected => Status::OfferSelected,
            PipelineStatus::PendingFinalApproval => Status::PendingFinalApproval,
            PipelineStatus::FinalApproved => Status::FinalApproved,
            PipelineStatus::Rejected => Status::Rejected,
            PipelineStatus::Cancelled => Status::Cancelled,
        }
    }
}

impl PipelineStatus {
    /// `rejected` and `cancelled` absorb every further action.
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStatus::Rejected | PipelineStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStatus::Draft => "draft",
            PipelineStatus::PendingProcurement => "pending_procurement",
            PipelineStatus::PendingLegal => "pending_legal",
            PipelineStatus::OpenForOffers => "open_for_offers",
            PipelineStatus::OfferSelected => "offer_selected",
            PipelineStatus::PendingFinalApproval => "pending_final_approval",
            PipelineStatus::FinalApproved => "final_approved",
            PipelineStatus::Rejected => "rejected",
            PipelineStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed catalog of contract types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    #[sea_orm(string_value = "consulting")]
    Consulting,
    #[sea_orm(string_value = "it_services")]
    ItServices,
    #[sea_orm(string_value = "software_development")]
    SoftwareDevelopment,
    #[sea_orm(string_value = "facility_management")]
    FacilityManagement,
    #[sea_orm(string_value = "training")]
    Training,
    #[sea_orm(string_value = "marketing")]
    Marketing,
    #[sea_orm(string_value = "logistics")]
    Logistics,
    #[sea_orm(string_value = "other")]
    Other,
}

/// Review stages recorded in a contract's workflow log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Procurement,
    Legal,
    Coordinator,
    FinalReview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
    Selected,
}

/// One immutable stage decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub actor_id: Uuid,
    pub decision: Decision,
    pub decided_at: DateTimeUtc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_offer: Option<Uuid>,
}

#[derive(Debug, thiserror::Error)]
#[error("workflow stage {0:?} is already recorded")]
pub struct StageAlreadyRecorded(pub Stage);

/// Append-only log of stage decisions, stored as JSONB next to the contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Workflow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procurement: Option<StageRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal: Option<StageRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinator: Option<StageRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_review: Option<StageRecord>,
}

impl Workflow {
    pub fn entry(&self, stage: Stage) -> Option<&StageRecord> {
        match stage {
            Stage::Procurement => self.procurement.as_ref(),
            Stage::Legal => self.legal.as_ref(),
            Stage::Coordinator => self.coordinator.as_ref(),
            Stage::FinalReview => self.final_review.as_ref(),
        }
    }

    /// Write a stage decision. A stage that already holds a record is never
    /// overwritten.
    pub fn record(&mut self, stage: Stage, record: StageRecord) -> Result<(), StageAlreadyRecorded> {
        let slot = match stage {
            Stage::Procurement => &mut self.procurement,
            Stage::Legal => &mut self.legal,
            Stage::Coordinator => &mut self.coordinator,
            Stage::FinalReview => &mut self.final_review,
        };
        if slot.is_some() {
            return Err(StageAlreadyRecorded(stage));
        }
        *slot = Some(record);
        Ok(())
    }

    /// The offer chosen by the coordinator. This is the single source of
    /// truth for the selection.
    pub fn selected_offer(&self) -> Option<Uuid> {
        self.coordinator.as_ref().and_then(|c| c.selected_offer)
    }
}

/// SeaORM entity for the `contracts` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contracts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub reference_number: String,
    pub title: String,
    pub contract_type: ContractType,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub target_conditions: Option<String>,
    pub target_persons: i32,
    #[sea_orm(column_type = "Double")]
    pub budget_min: f64,
    #[sea_orm(column_type = "Double")]
    pub budget_max: f64,
    pub currency: String,
    pub start_date: Date,
    pub end_date: Date,
    pub status: Status,
    #[sea_orm(column_type = "JsonBinary")]
    pub workflow: Workflow,
    pub owner_id: Option<Uuid>,
    pub created_by: Uuid,
    pub version: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OwnerId",
        to = "super::users::Column::Id"
    )]
    Owner,
    #[sea_orm(has_many = "super::offers::Entity")]
    Offers,
    #[sea_orm(has_many = "super::requests::Entity")]
    Requests,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::offers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Offers.def()
    }
}

impl Related<super::requests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == Some(user_id)
    }
}

// ── DTOs ──

fn default_currency() -> String {
    "EUR".to_string()
}

/// Body of `POST /api/contracts`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateContract {
    pub title: String,
    pub contract_type: ContractType,
    pub description: String,
    pub target_conditions: Option<String>,
    pub target_persons: i32,
    pub budget_min: f64,
    pub budget_max: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub start_date: Date,
    pub end_date: Date,
    /// Client the contract is created for. Only procurement managers may set
    /// it; a client always owns what they create.
    pub client_id: Option<Uuid>,
}

/// Body of `PUT /api/contracts/{id}`. Absent fields stay unchanged; an
/// explicit `"target_conditions": null` clears the conditions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateContract {
    pub title: Option<String>,
    pub contract_type: Option<ContractType>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub target_conditions: Option<Option<String>>,
    pub target_persons: Option<i32>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub currency: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

/// The editable descriptive and commercial fields of a contract, validated
/// as a whole on create and on every edit.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractFields {
    pub title: String,
    pub contract_type: ContractType,
    pub description: String,
    pub target_conditions: Option<String>,
    pub target_persons: i32,
    pub budget_min: f64,
    pub budget_max: f64,
    pub currency: String,
    pub start_date: Date,
    pub end_date: Date,
}

impl From<CreateContract> for ContractFields {
    fn from(input: CreateContract) -> Self {
        Self {
            title: input.title.trim().to_string(),
            contract_type: input.contract_type,
            description: input.description,
            target_conditions: input.target_conditions,
            target_persons: input.target_persons,
            budget_min: input.budget_min,
            budget_max: input.budget_max,
            currency: input.currency,
            start_date: input.start_date,
            end_date: input.end_date,
        }
    }
}

/// Tells a field sent as `null` apart from one left out: only fields that
/// are present reach this, so `null` becomes `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl Model {
    /// Current fields with the given changes applied on top.
    pub fn with_changes(&self, changes: UpdateContract) -> ContractFields {
        ContractFields {
            title: changes
                .title
                .map(|t| t.trim().to_string())
                .unwrap_or_else(|| self.title.clone()),
            contract_type: changes.contract_type.unwrap_or(self.contract_type),
            description: changes
                .description
                .unwrap_or_else(|| self.description.clone()),
            target_conditions: match changes.target_conditions {
                Some(conditions) => conditions,
                None => self.target_conditions.clone(),
            },
            target_persons: changes.target_persons.unwrap_or(self.target_persons),
            budget_min: changes.budget_min.unwrap_or(self.budget_min),
            budget_max: changes.budget_max.unwrap_or(self.budget_max),
            currency: changes.currency.unwrap_or_else(|| self.currency.clone()),
            start_date: changes.start_date.unwrap_or(self.start_date),
            end_date: changes.end_date.unwrap_or(self.end_date),
        }
    }
}

/// Optional reason and notes attached to a review decision.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DecisionInput {
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    StartDate,
    BudgetMax,
    Title,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Query string of `GET /api/contracts`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractListQuery {
    pub status: Option<Status>,
    pub contract_type: Option<ContractType>,
    pub search: Option<String>,
    pub start_from: Option<Date>,
    pub start_to: Option<Date>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort: Option<SortField>,
    pub order: Option<SortOrder>,
}

impl ContractListQuery {
    pub fn pagination(&self) -> super::PaginationQuery {
        super::PaginationQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

/// API view of a contract. `selected_offer` is a read-only mirror of
/// `workflow.coordinator.selected_offer` for older dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractResponse {
    pub id: Uuid,
    pub reference_number: String,
    pub title: String,
    pub contract_type: ContractType,
    pub description: String,
    pub target_conditions: Option<String>,
    pub target_persons: i32,
    pub budget_min: f64,
    pub budget_max: f64,
    pub currency: String,
    pub start_date: Date,
    pub end_date: Date,
    pub status: Status,
    pub legacy_status: bool,
    pub workflow: Workflow,
    pub selected_offer: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub created_by: Uuid,
    pub version: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

impl From<Model> for ContractResponse {
    fn from(m: Model) -> Self {
        Self {
            selected_offer: m.workflow.selected_offer(),
            legacy_status: m.status.is_legacy(),
            id: m.id,
            reference_number: m.reference_number,
            title: m.title,
            contract_type: m.contract_type,
            description: m.description,
            target_conditions: m.target_conditions,
            target_persons: m.target_persons,
            budget_min: m.budget_min,
            budget_max: m.budget_max,
            currency: m.currency,
            start_date: m.start_date,
            end_date: m.end_date,
            status: m.status,
            workflow: m.workflow,
            owner_id: m.owner_id,
            created_by: m.created_by,
            version: m.version,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decided(decision: Decision) -> StageRecord {
        StageRecord {
            actor_id: Uuid::new_v4(),
            decision,
            decided_at: chrono::Utc::now(),
            reason: None,
            notes: None,
            selected_offer: None,
        }
    }

    #[test]
    fn stage_is_written_once() {
        let mut log = Workflow::default();
        let first = decided(Decision::Approved);
        log.record(Stage::Procurement, first.clone()).unwrap();

        let err = log
            .record(Stage::Procurement, decided(Decision::Rejected))
            .unwrap_err();
        assert_eq!(err.0, Stage::Procurement);
        assert_eq!(log.entry(Stage::Procurement), Some(&first));
        assert!(log.entry(Stage::Legal).is_none());
    }

    #[test]
    fn selected_offer_comes_from_the_coordinator_entry() {
        let mut log = Workflow::default();
        assert_eq!(log.selected_offer(), None);

        let offer = Uuid::new_v4();
        let mut selection = decided(Decision::Selected);
        selection.selected_offer = Some(offer);
        log.record(Stage::Coordinator, selection).unwrap();
        assert_eq!(log.selected_offer(), Some(offer));
    }

    #[test]
    fn empty_stages_are_left_out_of_the_stored_json() {
        let mut log = Workflow::default();
        log.record(Stage::Legal, decided(Decision::Approved)).unwrap();

        let json = serde_json::to_value(&log).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["legal"]);
    }

    #[test]
    fn legacy_values_stay_out_of_the_pipeline() {
        assert_eq!(Status::Published.pipeline(), None);
        assert!(Status::Completed.is_legacy());
        assert_eq!(
            Status::OpenForOffers.pipeline(),
            Some(PipelineStatus::OpenForOffers)
        );
        for status in [
            PipelineStatus::Draft,
            PipelineStatus::PendingFinalApproval,
            PipelineStatus::Cancelled,
        ] {
            assert_eq!(Status::from(status).pipeline(), Some(status));
            assert_eq!(Status::from(status).to_string(), status.as_str());
        }
    }

    fn training_contract() -> Model {
        Model {
            id: Uuid::new_v4(),
            reference_number: "CTR-2026-00001".to_string(),
            title: "Old".to_string(),
            contract_type: ContractType::Training,
            description: "Train the team".to_string(),
            target_conditions: Some("On site only".to_string()),
            target_persons: 4,
            budget_min: 100.0,
            budget_max: 200.0,
            currency: "EUR".to_string(),
            start_date: chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: chrono::NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            status: Status::Draft,
            workflow: Workflow::default(),
            owner_id: None,
            created_by: Uuid::new_v4(),
            version: 0,
            created_at: chrono::Utc::now(),
            updated_at: None,
            deleted_at: None,
        }
    }

    #[test]
    fn edits_merge_over_current_fields() {
        let current = training_contract();
        let changes = UpdateContract {
            title: Some("  New title ".to_string()),
            budget_max: Some(9000.0),
            ..Default::default()
        };

        let merged = current.with_changes(changes);
        assert_eq!(merged.title, "New title");
        assert_eq!(merged.budget_max, 9000.0);
        assert_eq!(merged.budget_min, current.budget_min);
        assert_eq!(merged.description, current.description);
        assert_eq!(merged.target_conditions, current.target_conditions);
    }

    #[test]
    fn null_target_conditions_clear_them() {
        let current = training_contract();

        let omitted: UpdateContract = serde_json::from_str(r#"{"title": "Renamed"}"#).unwrap();
        assert_eq!(omitted.target_conditions, None);
        assert_eq!(
            current.with_changes(omitted).target_conditions.as_deref(),
            Some("On site only")
        );

        let cleared: UpdateContract =
            serde_json::from_str(r#"{"target_conditions": null}"#).unwrap();
        assert_eq!(cleared.target_conditions, Some(None));
        assert_eq!(current.with_changes(cleared).target_conditions, None);

        let replaced: UpdateContract =
            serde_json::from_str(r#"{"target_conditions": "Remote"}"#).unwrap();
        assert_eq!(
            current.with_changes(replaced).target_conditions.as_deref(),
            Some("Remote")
        );
    }
}
