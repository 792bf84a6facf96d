use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::WorkflowError;
use crate::models::contracts::ContractResponse;
use crate::models::offers::{self, CreateOffer, SelectOffer};
use crate::workflow::arbitration;

/// Result of a coordinator selection: the advanced contract and every offer
/// on it after the sibling rejections.
#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    pub contract: ContractResponse,
    pub offers: Vec<offers::Model>,
}

/// GET /api/contracts/{id}/offers
pub async fn get_offers(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, WorkflowError> {
    let offers = arbitration::list_offers(db.get_ref(), user.principal(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(offers))
}

/// POST /api/contracts/{id}/offers
pub async fn submit_offer(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: web::Json<CreateOffer>,
) -> Result<HttpResponse, WorkflowError> {
    let offer = arbitration::submit_offer(
        db.get_ref(),
        user.principal(),
        path.into_inner(),
        body.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Created().json(offer))
}

/// POST /api/contracts/{id}/offers/{offer_id}/select
pub async fn select_offer(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(Uuid, Uuid)>,
    body: Option<web::Json<SelectOffer>>,
) -> Result<HttpResponse, WorkflowError> {
    let (contract_id, offer_id) = path.into_inner();
    let notes = body.and_then(|b| b.into_inner().notes);

    let (contract, offers) =
        arbitration::select_offer(db.get_ref(), user.principal(), contract_id, offer_id, notes)
            .await?;
    Ok(HttpResponse::Ok().json(SelectionResponse {
        contract: ContractResponse::from(contract),
        offers,
    }))
}

/// POST /api/offers/{id}/withdraw
pub async fn withdraw_offer(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, WorkflowError> {
    let offer =
        arbitration::withdraw_offer(db.get_ref(), user.principal(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(offer))
}
