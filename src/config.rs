use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::transitions::TransitionPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub mongo_uri: Option<String>,
    pub database_name: String,
    pub jwt_secret: String,
    pub frontend_origin: String,
    pub bind_addr: String,
    pub upload_dir: PathBuf,
    pub transitions: TransitionPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "mongo".to_string())
            .to_lowercase()
            .as_str()
        {
            "mongo" | "mongodb" => StoreBackend::Mongo,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    reason: format!("expected 'mongo' or 'memory', got '{}'", other),
                })
            }
        };

        let mongo_uri = env::var("MONGO_URI").ok();
        if store_backend == StoreBackend::Mongo && mongo_uri.is_none() {
            return Err(ConfigError::Missing("MONGO_URI"));
        }

        let transitions = env::var("STATUS_TRANSITIONS")
            .unwrap_or_else(|_| "permissive".to_string())
            .parse::<TransitionPolicy>()
            .map_err(|reason| ConfigError::Invalid {
                name: "STATUS_TRANSITIONS",
                reason,
            })?;

        Ok(Self {
            store_backend,
            mongo_uri,
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "hopes_alive".to_string()),
            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
            frontend_origin: env::var("FRONTEND_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            upload_dir: PathBuf::from(env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string())),
            transitions,
        })
    }

    /// Settings for an in-memory instance; used by tests and local demos.
    pub fn in_memory(jwt_secret: &str, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            store_backend: StoreBackend::Memory,
            mongo_uri: None,
            database_name: "hopes_alive".to_string(),
            jwt_secret: jwt_secret.to_string(),
            frontend_origin: "http://localhost:5173".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            upload_dir: upload_dir.into(),
            transitions: TransitionPolicy::permissive(),
        }
    }
}
