use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use super::require_admin;
use crate::auth::AuthState;
use crate::auth::middleware::AuthenticatedUser;
use crate::db::users as user_db;
use crate::error::{FieldError, WorkflowError};
use crate::models::users::{CreateUser, UpdateRole, UserResponse};
use crate::models::{Page, PaginationQuery};
use crate::workflow::validation::validate_pagination;

/// GET /api/users: admin: list live users with pagination.
/// Query params: ?page=1&limit=20
pub async fn get_users(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, WorkflowError> {
    require_admin(&user)?;
    validate_pagination(&query)?;
    let page = query.page();
    let limit = query.limit();

    let (users, total) = user_db::get_users_paginated(db.get_ref(), page, limit).await?;
    let page = Page::new(users, page, limit, total).map(UserResponse::from);
    Ok(HttpResponse::Ok().json(page))
}

/// POST /api/users: admin: provision an account with an explicit role.
/// Body: {"email", "role", "display_name"?, "id"?}
pub async fn create_user(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    body: web::Json<CreateUser>,
) -> Result<HttpResponse, WorkflowError> {
    require_admin(&user)?;
    let input = body.into_inner();
    let email = input.email.trim().to_lowercase();

    if email.is_empty() || !email.contains('@') {
        return Err(WorkflowError::Validation(vec![FieldError::new(
            "email",
            "must be a valid email address",
        )]));
    }
    if user_db::get_user_by_email(db.get_ref(), &email).await?.is_some() {
        return Err(WorkflowError::Validation(vec![FieldError::new(
            "email",
            "is already registered",
        )]));
    }

    if let Some(id) = input.id {
        if user_db::find_user_by_id(db.get_ref(), id).await?.is_some() {
            return Err(WorkflowError::Validation(vec![FieldError::new(
                "id",
                "is already registered",
            )]));
        }
    }

    let created =
        user_db::insert_user(db.get_ref(), input.id, &email, input.display_name, input.role)
            .await?;
    tracing::info!(user_id = %created.id, role = created.role.as_str(), "user provisioned");
    Ok(HttpResponse::Created().json(UserResponse::from(created)))
}

/// GET /api/users/{id}: fetch a single live user.
pub async fn get_user(
    _user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, WorkflowError> {
    let id = path.into_inner();
    let found = user_db::get_user_by_id(db.get_ref(), id)
        .await?
        .ok_or_else(|| WorkflowError::not_found(format!("User {id}")))?;
    Ok(HttpResponse::Ok().json(UserResponse::from(found)))
}

/// PUT /api/users/{id}/role: admin: change a user's role.
pub async fn update_role(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    auth: web::Data<AuthState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateRole>,
) -> Result<HttpResponse, WorkflowError> {
    require_admin(&user)?;
    let id = path.into_inner();

    if user_db::get_user_by_id(db.get_ref(), id).await?.is_none() {
        return Err(WorkflowError::not_found(format!("User {id}")));
    }
    let updated = user_db::update_role(db.get_ref(), id, body.role).await?;
    auth.forget(id).await;

    tracing::info!(user_id = %id, role = updated.role.as_str(), "role changed");
    Ok(HttpResponse::Ok().json(UserResponse::from(updated)))
}

/// DELETE /api/users/{id}: admin: soft-delete a user.
pub async fn delete_user(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    auth: web::Data<AuthState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, WorkflowError> {
    require_admin(&user)?;
    let id = path.into_inner();

    if id == user.0.id {
        return Err(WorkflowError::invalid_state("Administrators cannot remove themselves"));
    }
    if !user_db::soft_delete_user(db.get_ref(), id).await? {
        return Err(WorkflowError::not_found(format!("User {id}")));
    }
    auth.forget(id).await;

    Ok(HttpResponse::NoContent().finish())
}
