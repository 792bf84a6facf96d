pub mod auth;
pub mod contracts;
pub mod offers;
pub mod requests;
pub mod users;

use actix_web::web;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::WorkflowError;
use crate::models::users::Roles;

/// Administrative endpoints sit outside the contract capability table.
pub(crate) fn require_admin(user: &AuthenticatedUser) -> Result<(), WorkflowError> {
    if user.0.role == Roles::Admin {
        Ok(())
    } else {
        Err(WorkflowError::forbidden("Only administrators may manage users"))
    }
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // ── Auth ──
    cfg.service(web::scope("/auth").route("/me", web::get().to(auth::me)));

    // ── Users ──
    cfg.service(
        web::resource("/users")
            .route(web::get().to(users::get_users))
            .route(web::post().to(users::create_user)),
    );
    cfg.service(
        web::resource("/users/{id}")
            .route(web::get().to(users::get_user))
            .route(web::delete().to(users::delete_user)),
    );
    cfg.service(web::resource("/users/{id}/role").route(web::put().to(users::update_role)));

    // ── Contracts and their workflow ──
    cfg.service(
        web::scope("/contracts")
            .route("", web::get().to(contracts::get_contracts))
            .route("", web::post().to(contracts::create_contract))
            .route("/{id}", web::get().to(contracts::get_contract))
            .route("/{id}", web::put().to(contracts::update_contract))
            .route("/{id}", web::delete().to(contracts::delete_contract))
            .route("/{id}/submit", web::post().to(contracts::submit))
            .route(
                "/{id}/procurement/approve",
                web::post().to(contracts::procurement_approve),
            )
            .route(
                "/{id}/procurement/reject",
                web::post().to(contracts::procurement_reject),
            )
            .route("/{id}/legal/approve", web::post().to(contracts::legal_approve))
            .route("/{id}/legal/reject", web::post().to(contracts::legal_reject))
            .route("/{id}/final/approve", web::post().to(contracts::final_approve))
            .route("/{id}/final/reject", web::post().to(contracts::final_reject))
            .route("/{id}/cancel", web::post().to(contracts::cancel))
            .route("/{id}/events", web::get().to(contracts::get_events))
            .route("/{id}/offers", web::get().to(offers::get_offers))
            .route("/{id}/offers", web::post().to(offers::submit_offer))
            .route(
                "/{id}/offers/{offer_id}/select",
                web::post().to(offers::select_offer),
            )
            .route("/{id}/requests", web::get().to(requests::get_requests))
            .route("/{id}/requests", web::post().to(requests::create_request)),
    );

    // ── Offers and requests addressed directly ──
    cfg.service(web::resource("/offers/{id}/withdraw").route(web::post().to(offers::withdraw_offer)));
    cfg.service(
        web::scope("/requests")
            .route("/{id}/accept", web::post().to(requests::accept_request))
            .route("/{id}/reject", web::post().to(requests::reject_request))
            .route("/{id}/withdraw", web::post().to(requests::withdraw_request)),
    );
}
