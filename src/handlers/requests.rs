use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::WorkflowError;
use crate::models::requests::CreateRequest;
use crate::workflow::engagement;

/// GET /api/contracts/{id}/requests
pub async fn get_requests(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, WorkflowError> {
    let requests =
        engagement::list_requests(db.get_ref(), user.principal(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(requests))
}

/// POST /api/contracts/{id}/requests: the assigned provider asks to engage.
pub async fn create_request(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: web::Json<CreateRequest>,
) -> Result<HttpResponse, WorkflowError> {
    let request = engagement::create_request(
        db.get_ref(),
        user.principal(),
        path.into_inner(),
        body.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Created().json(request))
}

/// POST /api/requests/{id}/accept
pub async fn accept_request(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, WorkflowError> {
    let request =
        engagement::accept_request(db.get_ref(), user.principal(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(request))
}

/// POST /api/requests/{id}/reject
pub async fn reject_request(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, WorkflowError> {
    let request =
        engagement::reject_request(db.get_ref(), user.principal(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(request))
}

/// POST /api/requests/{id}/withdraw
pub async fn withdraw_request(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, WorkflowError> {
    let request =
        engagement::withdraw_request(db.get_ref(), user.principal(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(request))
}
