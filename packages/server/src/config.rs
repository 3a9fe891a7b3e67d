use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Where recipe images live and how large they may be.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub media_dir: PathBuf,
    pub max_image_size: u64,
}

/// Public-facing site settings used to build links in responses and in the
/// shopping-list document.
#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub site: SiteConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("storage.media_dir", "./media")?
            .set_default("storage.max_image_size", 10 * 1024 * 1024i64)?
            .set_default("site.base_url", "http://localhost:3000")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., PANTRY__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("PANTRY").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
