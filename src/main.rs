// src/main.rs

use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{error, info};

use hopes_alive::app_state::AppState;
use hopes_alive::auth::Authentication;
use hopes_alive::config::{Config, StoreBackend};
use hopes_alive::db::MongoDB;
use hopes_alive::store::{EntityStore, MemoryStore, MongoStore};

async fn open_store(config: &Config) -> io::Result<Arc<dyn EntityStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            info!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Mongo => {
            let uri = config.mongo_uri.as_deref().unwrap_or_default();
            let mongodb = MongoDB::init(uri, &config.database_name)
                .await
                .map_err(io::Error::other)?;
            let store = MongoStore::new(mongodb.db);
            store.ensure_indexes().await.map_err(io::Error::other)?;
            Ok(Arc::new(store))
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;
    let store = open_store(&config).await?;
    let state = web::Data::new(AppState::new(store, config.clone()));

    info!("Server running at http://{}", config.bind_addr);
    info!("Allowed CORS Origin: {}", config.frontend_origin);
    info!("Status transitions: {}", state.transitions.name());

    let frontend_origin = config.frontend_origin.clone();
    let jwt_secret = config.jwt_secret.clone();
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Authentication::new(jwt_secret.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(hopes_alive::configure)
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}
