//! Configuration for Products API

use core_config::{app_info, server::ServerConfig, AppInfo, FromEnv};
use database::mongodb::MongoConfig;
use std::path::Path;

pub use core_config::Environment;

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub mongodb: MongoConfig,
    pub server: ServerConfig,
    pub environment: Environment,
}

impl Config {
    /// Apply `env_file` (or `.env` from the working directory when `None`), then read
    /// the environment. A missing file is fine and variables already set are kept.
    pub fn load(env_file: Option<&Path>) -> eyre::Result<Self> {
        match env_file {
            Some(path) => dotenvy::from_path(path).ok(),
            None => dotenvy::dotenv().ok().map(|_| ()),
        };
        Self::from_env()
    }

    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let mongodb = MongoConfig::from_env()?;
        let server = ServerConfig::from_env()?;

        Ok(Self {
            app: app_info!(),
            mongodb,
            server,
            environment,
        })
    }
}
