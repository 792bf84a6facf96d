use sea_orm::prelude::Expr;
use sea_orm::sea_query::{ExprTrait, Func};
use sea_orm::*;
use uuid::Uuid;

use crate::models::contracts::{
    self, ContractFields, ContractListQuery, SortField, SortOrder, Status, Workflow,
};

/// Identity and placement of a contract being inserted.
#[derive(Debug, Clone)]
pub struct ContractMeta {
    pub reference_number: String,
    pub owner_id: Option<Uuid>,
    pub created_by: Uuid,
    pub status: Status,
}

/// Insert a new contract with an empty workflow log.
pub async fn insert_contract<C: ConnectionTrait>(
    conn: &C,
    fields: ContractFields,
    meta: ContractMeta,
) -> Result<contracts::Model, DbErr> {
    let new_contract = contracts::ActiveModel {
        id: Set(Uuid::new_v4()),
        reference_number: Set(meta.reference_number),
        title: Set(fields.title),
        contract_type: Set(fields.contract_type),
        description: Set(fields.description),
        target_conditions: Set(fields.target_conditions),
        target_persons: Set(fields.target_persons),
        budget_min: Set(fields.budget_min),
        budget_max: Set(fields.budget_max),
        currency: Set(fields.currency),
        start_date: Set(fields.start_date),
        end_date: Set(fields.end_date),
        status: Set(meta.status),
        workflow: Set(Workflow::default()),
        owner_id: Set(meta.owner_id),
        created_by: Set(meta.created_by),
        version: Set(0),
        created_at: Set(chrono::Utc::now()),
        updated_at: Set(None),
        deleted_at: Set(None),
    };

    new_contract.insert(conn).await
}

/// Fetch a single live (not soft-deleted) contract by ID.
pub async fn get_contract_by_id<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<Option<contracts::Model>, DbErr> {
    contracts::Entity::find_by_id(id)
        .filter(contracts::Column::DeletedAt.is_null())
        .one(conn)
        .await
}

/// Filtered, paginated listing. `scope` narrows the result to what the caller
/// may see. Returns the page of rows and the total row count.
pub async fn list_contracts<C: ConnectionTrait>(
    conn: &C,
    query: &ContractListQuery,
    scope: Condition,
) -> Result<(Vec<contracts::Model>, u64), DbErr> {
    let mut condition = Condition::all()
        .add(contracts::Column::DeletedAt.is_null())
        .add(scope);

    if let Some(status) = query.status {
        condition = condition.add(contracts::Column::Status.eq(status));
    }
    if let Some(contract_type) = query.contract_type {
        condition = condition.add(contracts::Column::ContractType.eq(contract_type));
    }
    if let Some(from) = query.start_from {
        condition = condition.add(contracts::Column::StartDate.gte(from));
    }
    if let Some(to) = query.start_to {
        condition = condition.add(contracts::Column::StartDate.lte(to));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search.to_lowercase());
        let matches = |column: contracts::Column| {
            Expr::expr(Func::lower(Expr::col(column))).like(pattern.clone())
        };
        condition = condition.add(
            Condition::any()
                .add(matches(contracts::Column::Title))
                .add(matches(contracts::Column::ReferenceNumber))
                .add(matches(contracts::Column::Description)),
        );
    }

    let column = match query.sort.unwrap_or_default() {
        SortField::CreatedAt => contracts::Column::CreatedAt,
        SortField::StartDate => contracts::Column::StartDate,
        SortField::BudgetMax => contracts::Column::BudgetMax,
        SortField::Title => contracts::Column::Title,
    };
    let order = match query.order.unwrap_or_default() {
        SortOrder::Asc => Order::Asc,
        SortOrder::Desc => Order::Desc,
    };

    let pagination = query.pagination();
    let paginator = contracts::Entity::find()
        .filter(condition)
        .order_by(column, order)
        .order_by_asc(contracts::Column::Id)
        .paginate(conn, pagination.limit());

    let total = paginator.num_items().await?;
    let rows = paginator.fetch_page(pagination.page() - 1).await?;
    Ok((rows, total))
}

/// Rows still matching what the caller read: same id, status and version.
fn unchanged_since_read(current: &contracts::Model) -> Condition {
    Condition::all()
        .add(contracts::Column::Id.eq(current.id))
        .add(contracts::Column::Status.eq(current.status))
        .add(contracts::Column::Version.eq(current.version))
        .add(contracts::Column::DeletedAt.is_null())
}

/// Move a contract to `to` and store its new workflow log, but only if the
/// row is still exactly as `current` was read. Returns `None` when another
/// writer got there first.
pub async fn apply_transition<C: ConnectionTrait>(
    conn: &C,
    current: &contracts::Model,
    to: Status,
    workflow: Workflow,
) -> Result<Option<contracts::Model>, DbErr> {
    let changes = contracts::ActiveModel {
        status: Set(to),
        workflow: Set(workflow),
        version: Set(current.version + 1),
        updated_at: Set(Some(chrono::Utc::now())),
        ..Default::default()
    };

    let result = contracts::Entity::update_many()
        .set(changes)
        .filter(unchanged_since_read(current))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Ok(None);
    }
    get_contract_by_id(conn, current.id).await
}

/// Overwrite the editable fields, guarded like [`apply_transition`].
pub async fn update_contract_fields<C: ConnectionTrait>(
    conn: &C,
    current: &contracts::Model,
    fields: ContractFields,
) -> Result<Option<contracts::Model>, DbErr> {
    let changes = contracts::ActiveModel {
        title: Set(fields.title),
        contract_type: Set(fields.contract_type),
        description: Set(fields.description),
        target_conditions: Set(fields.target_conditions),
        target_persons: Set(fields.target_persons),
        budget_min: Set(fields.budget_min),
        budget_max: Set(fields.budget_max),
        currency: Set(fields.currency),
        start_date: Set(fields.start_date),
        end_date: Set(fields.end_date),
        version: Set(current.version + 1),
        updated_at: Set(Some(chrono::Utc::now())),
        ..Default::default()
    };

    let result = contracts::Entity::update_many()
        .set(changes)
        .filter(unchanged_since_read(current))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Ok(None);
    }
    get_contract_by_id(conn, current.id).await
}

/// Soft-delete a contract, guarded like [`apply_transition`].
pub async fn soft_delete_contract<C: ConnectionTrait>(
    conn: &C,
    current: &contracts::Model,
) -> Result<bool, DbErr> {
    let now = chrono::Utc::now();
    let changes = contracts::ActiveModel {
        deleted_at: Set(Some(now)),
        updated_at: Set(Some(now)),
        version: Set(current.version + 1),
        ..Default::default()
    };

    let result = contracts::Entity::update_many()
        .set(changes)
        .filter(unchanged_since_read(current))
        .exec(conn)
        .await?;

    Ok(result.rows_affected > 0)
}

/// Lock a contract that is still in `status` with `SELECT ... FOR UPDATE`.
/// Inside a transaction this serializes the caller against every other
/// writer of the contract without changing the row.
pub async fn lock_if_status<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    status: Status,
) -> Result<bool, DbErr> {
    let locked = contracts::Entity::find_by_id(id)
        .filter(contracts::Column::Status.eq(status))
        .filter(contracts::Column::DeletedAt.is_null())
        .lock_exclusive()
        .one(conn)
        .await?;

    Ok(locked.is_some())
}
