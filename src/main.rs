use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use contract_workflow::auth::AuthState;
use contract_workflow::config::AppConfig;
use contract_workflow::create_pool;
use contract_workflow::handlers;
use dotenv::dotenv;
use migration::{Migrator, MigratorTrait};
use std::io;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!(error = %e, "invalid configuration");
        io::Error::other(e)
    })?;

    let db = create_pool(&config.database_url).await.map_err(|e| {
        tracing::error!(error = %e, "failed to connect to the database");
        io::Error::other(e)
    })?;
    Migrator::up(&db, None).await.map_err(|e| {
        tracing::error!(error = %e, "failed to apply migrations");
        io::Error::other(e)
    })?;
    tracing::info!("Database ready");

    let db_data = web::Data::new(db);
    let auth_data = web::Data::new(AuthState::new(
        config.jwt_secret.clone(),
        config.principal_cache_ttl,
    ));

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let config_data = web::Data::new(config);
    tracing::info!("Server running at http://{bind_addr}");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .max_age(3600);

        App::new()
            .wrap(cors)
            .app_data(db_data.clone())
            .app_data(auth_data.clone())
            .app_data(config_data.clone())
            .service(web::scope("/api").configure(handlers::init_routes))
    })
    .bind(&bind_addr)?
    .run()
    .await
}
