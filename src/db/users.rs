use sea_orm::*;
use uuid::Uuid;

use crate::models::MAX_PAGE;
use crate::models::users::{self, CreateUserFromAuth, Roles};

/// Fetch a user by ID, removed or not.
pub async fn find_user_by_id<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find_by_id(id).one(conn).await
}

/// Create the account for a token subject seen for the first time.
pub async fn insert_from_auth<C: ConnectionTrait>(
    conn: &C,
    input: CreateUserFromAuth,
) -> Result<users::Model, DbErr> {
    let now = chrono::Utc::now();
    let new_user = users::ActiveModel {
        id: Set(input.id),
        email: Set(input.email),
        display_name: Set(input.display_name),
        role: Set(input.role),
        first_seen_at: Set(Some(now)),
        created_at: Set(now),
        updated_at: Set(None),
        deleted_at: Set(None),
    };

    new_user.insert(conn).await
}

/// Record the first sign-in of an account, moving it to the token subject's
/// id when it was provisioned under another one. Contracts, offers and
/// requests follow the id through `ON UPDATE CASCADE`. Returns `false` if the
/// account was already claimed or removed in the meantime.
pub async fn claim_user<C: ConnectionTrait>(
    conn: &C,
    current: &users::Model,
    subject: Uuid,
) -> Result<bool, DbErr> {
    let now = chrono::Utc::now();
    let changes = users::ActiveModel {
        id: Set(subject),
        first_seen_at: Set(Some(now)),
        updated_at: Set(Some(now)),
        ..Default::default()
    };

    let result = users::Entity::update_many()
        .set(changes)
        .filter(users::Column::Id.eq(current.id))
        .filter(users::Column::FirstSeenAt.is_null())
        .filter(users::Column::DeletedAt.is_null())
        .exec(conn)
        .await?;

    Ok(result.rows_affected > 0)
}

/// Insert a user with an explicit role (administrative provisioning). `id`
/// is the identity issuer's subject when the administrator knows it.
pub async fn insert_user<C: ConnectionTrait>(
    conn: &C,
    id: Option<Uuid>,
    email: &str,
    display_name: Option<String>,
    role: Roles,
) -> Result<users::Model, DbErr> {
    let new_user = users::ActiveModel {
        id: Set(id.unwrap_or_else(Uuid::new_v4)),
        email: Set(email.to_string()),
        display_name: Set(display_name),
        role: Set(role),
        first_seen_at: Set(None),
        created_at: Set(chrono::Utc::now()),
        updated_at: Set(None),
        deleted_at: Set(None),
    };

    new_user.insert(conn).await
}

/// Fetch a single live user by ID.
pub async fn get_user_by_id<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find_by_id(id)
        .filter(users::Column::DeletedAt.is_null())
        .one(conn)
        .await
}

/// Look up a user (live or removed) by email.
pub async fn get_user_by_email<C: ConnectionTrait>(
    conn: &C,
    email: &str,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .one(conn)
        .await
}

/// Fetch live users with pagination. Returns the page and the total count.
pub async fn get_users_paginated<C: ConnectionTrait>(
    conn: &C,
    page: u64,
    limit: u64,
) -> Result<(Vec<users::Model>, u64), DbErr> {
    let paginator = users::Entity::find()
        .filter(users::Column::DeletedAt.is_null())
        .order_by_asc(users::Column::CreatedAt)
        .paginate(conn, limit);

    let total = paginator.num_items().await?;
    let users = paginator.fetch_page(page.clamp(1, MAX_PAGE) - 1).await?;
    Ok((users, total))
}

/// Change a user's role.
pub async fn update_role<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    role: Roles,
) -> Result<users::Model, DbErr> {
    let user = get_user_by_id(conn, id)
        .await?
        .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

    let mut active: users::ActiveModel = user.into();
    active.role = Set(role);
    active.updated_at = Set(Some(chrono::Utc::now()));

    active.update(conn).await
}

/// Soft-delete a user. Returns `false` if no live user had that id.
pub async fn soft_delete_user<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<bool, DbErr> {
    let now = chrono::Utc::now();
    let changes = users::ActiveModel {
        deleted_at: Set(Some(now)),
        updated_at: Set(Some(now)),
        ..Default::default()
    };

    let result = users::Entity::update_many()
        .set(changes)
        .filter(users::Column::Id.eq(id))
        .filter(users::Column::DeletedAt.is_null())
        .exec(conn)
        .await?;

    Ok(result.rows_affected > 0)
}
