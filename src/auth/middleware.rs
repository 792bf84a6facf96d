use actix_web::{Error, FromRequest, HttpRequest, dev::Payload, web};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use futures_util::future::LocalBoxFuture;
use sea_orm::DatabaseConnection;

use crate::auth::{AuthState, Identity, jwt, resolve_user};
use crate::models::users::{self, Principal};

/// The caller behind a valid bearer token.
pub struct AuthenticatedUser(pub users::Model);

impl AuthenticatedUser {
    pub fn principal(&self) -> Principal {
        Principal::from(&self.0)
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        let bearer = BearerAuth::from_request(&req, payload);

        Box::pin(async move {
            // 1. Bearer token from the Authorization header.
            let bearer = bearer.await?;

            let auth = req.app_data::<web::Data<AuthState>>().ok_or_else(|| {
                actix_web::error::ErrorInternalServerError("Auth state not configured")
            })?;

            // 2. Verify the token.
            let claims = jwt::validate_token(bearer.token(), &auth.jwt_secret)
                .map_err(|e| actix_web::error::ErrorUnauthorized(format!("Invalid token: {e}")))?;
            let user_id = claims
                .user_id()
                .map_err(actix_web::error::ErrorUnauthorized)?;

            // 3. Resolve the stored user, cached.
            if let Some(user) = auth.principals.get(&user_id).await {
                return Ok(AuthenticatedUser(user));
            }

            let db = req
                .app_data::<web::Data<DatabaseConnection>>()
                .ok_or_else(|| {
                    actix_web::error::ErrorInternalServerError("Database not configured")
                })?;

            let user = resolve_user(
                db.get_ref(),
                Identity {
                    subject: user_id,
                    email: claims.email,
                    name: claims.name,
                },
            )
            .await?;

            auth.principals.insert(user_id, user.clone()).await;
            Ok(AuthenticatedUser(user))
        })
    }
}
