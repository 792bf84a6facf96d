pub mod jwt;
pub mod middleware;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use moka::future::Cache;
use sea_orm::{ConnectionTrait, DbErr, SqlErr};
use std::time::Duration;
use uuid::Uuid;

use crate::db::users as user_db;
use crate::models::users::{self, CreateUserFromAuth, Roles};

/// Token verification settings plus a short-lived cache of resolved users.
#[derive(Clone)]
pub struct AuthState {
    pub jwt_secret: String,
    pub principals: Cache<Uuid, users::Model>,
}

impl AuthState {
    pub fn new(jwt_secret: impl Into<String>, ttl: Duration) -> Self {
        let principals = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(10_000)
            .build();

        Self {
            jwt_secret: jwt_secret.into(),
            principals,
        }
    }

    /// Drop a cached user after its role or status changed.
    pub async fn forget(&self, user_id: Uuid) {
        self.principals.invalidate(&user_id).await;
    }
}

/// Why a verified token could not be turned into a stored user.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No email in token claims")]
    MissingEmail,

    #[error("Account has been removed")]
    Removed,

    #[error("This email is already registered to another account")]
    EmailTaken,

    #[error(transparent)]
    Database(#[from] DbErr),
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingEmail | AuthError::Removed => StatusCode::UNAUTHORIZED,
            AuthError::EmailTaken => StatusCode::CONFLICT,
            AuthError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "failed to resolve user");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": message }))
    }
}

/// Identity claims of a verified token.
#[derive(Debug, Clone)]
pub struct Identity {
    pub subject: Uuid,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Resolve a token subject to its stored user.
///
/// The stored user is looked up by id first, so tokens without an email
/// claim work for known accounts. An unknown subject whose email matches an
/// account provisioned by an administrator claims that account and keeps its
/// role. Anything else becomes a new client.
pub async fn resolve_user<C: ConnectionTrait>(
    conn: &C,
    identity: Identity,
) -> Result<users::Model, AuthError> {
    if let Some(user) = user_db::find_user_by_id(conn, identity.subject).await? {
        return claim(conn, user, identity.subject).await;
    }

    let email = identity
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or(AuthError::MissingEmail)?;

    if let Some(user) = user_db::get_user_by_email(conn, &email).await? {
        if user.deleted_at.is_some() {
            return Err(AuthError::Removed);
        }
        if user.first_seen_at.is_some() {
            return Err(AuthError::EmailTaken);
        }
        tracing::info!(user_id = %identity.subject, provisioned_as = %user.id, "provisioned account claimed");
        return claim(conn, user, identity.subject).await;
    }

    let created = user_db::insert_from_auth(
        conn,
        CreateUserFromAuth {
            id: identity.subject,
            email,
            display_name: identity.name,
            role: Roles::Client,
        },
    )
    .await;

    match created {
        Ok(user) => Ok(user),
        // Another request signed the same subject in first, or the email
        // was registered in the meantime.
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            live(user_db::find_user_by_id(conn, identity.subject).await?)
        }
        Err(e) => Err(e.into()),
    }
}

/// Mark an account as signed in under `subject`, if it has not been yet.
async fn claim<C: ConnectionTrait>(
    conn: &C,
    user: users::Model,
    subject: Uuid,
) -> Result<users::Model, AuthError> {
    if user.deleted_at.is_some() {
        return Err(AuthError::Removed);
    }
    if user.first_seen_at.is_some() {
        return Ok(user);
    }

    user_db::claim_user(conn, &user, subject).await?;
    live(user_db::find_user_by_id(conn, subject).await?)
}

fn live(user: Option<users::Model>) -> Result<users::Model, AuthError> {
    match user {
        Some(user) if user.deleted_at.is_none() => Ok(user),
        Some(_) => Err(AuthError::Removed),
        None => Err(AuthError::EmailTaken),
    }
}
