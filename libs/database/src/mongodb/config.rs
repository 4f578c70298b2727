#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_or_default, env_parse_or};

/// Database used when none is configured
pub const DEFAULT_DATABASE: &str = "vista-mart-db";

/// Collection holding catalog documents when none is configured
pub const DEFAULT_COLLECTION: &str = "products";

/// MongoDB connection settings
///
/// Construct manually or load from environment variables (with the `config` feature).
///
/// # Example
///
/// ```ignore
/// use database::mongodb::MongoConfig;
///
/// let config = MongoConfig::new("mongodb://localhost:27017");
/// let config = MongoConfig::with_database("mongodb://localhost:27017", "catalog");
/// let config = MongoConfig::from_env()?;
/// ```
#[derive(Clone, Debug)]
pub struct MongoConfig {
    /// Connection string: mongodb://[username:password@]host[:port][/database][?options]
    pub url: String,

    /// Database name
    pub database: String,

    /// Collection name for product documents
    pub collection: String,

    /// Application name reported in server logs
    pub app_name: Option<String>,

    pub max_pool_size: u32,

    pub min_pool_size: u32,

    pub connect_timeout_secs: u64,

    pub server_selection_timeout_secs: u64,

    /// Pin the connection to Stable API v1 in strict mode with deprecation errors
    pub stable_api: bool,
}

impl MongoConfig {
    /// Config for `url` with the default database and collection
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Config for `url` using a specific database
    pub fn with_database(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// Override the product collection name
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Enable or disable the Stable API v1 declaration
    pub fn with_stable_api(mut self, enabled: bool) -> Self {
        self.stable_api = enabled;
        self
    }

    /// Set the application name for server logs
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Connection string with any password replaced, safe for logs
    pub fn redacted_url(&self) -> String {
        let Some((scheme, rest)) = self.url.split_once("://") else {
            return self.url.clone();
        };
        match rest.split_once('@') {
            Some((credentials, host)) => {
                let user = credentials.split(':').next().unwrap_or_default();
                format!("{}://{}:****@{}", scheme, user, host)
            }
            None => self.url.clone(),
        }
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            url: "mongodb://localhost:27017".to_string(),
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            app_name: None,
            max_pool_size: 100,
            min_pool_size: 5,
            connect_timeout_secs: 10,
            server_selection_timeout_secs: 30,
            stable_api: true,
        }
    }
}

/// Load MongoConfig from environment variables
///
/// - `DB_URI`, then `MONGODB_URL`, then `MONGO_URL` (required) - connection string
/// - `MONGODB_DATABASE` (default: `vista-mart-db`)
/// - `MONGODB_COLLECTION` (default: `products`)
/// - `MONGODB_APP_NAME` (optional)
/// - `MONGODB_MAX_POOL_SIZE` (default: 100)
/// - `MONGODB_MIN_POOL_SIZE` (default: 5)
/// - `MONGODB_CONNECT_TIMEOUT_SECS` (default: 10)
/// - `MONGODB_SERVER_SELECTION_TIMEOUT_SECS` (default: 30)
/// - `MONGODB_STABLE_API` (default: true)
#[cfg(feature = "config")]
impl FromEnv for MongoConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var("DB_URI")
            .or_else(|_| std::env::var("MONGODB_URL"))
            .or_else(|_| std::env::var("MONGO_URL"))
            .map_err(|_| {
                ConfigError::MissingEnvVar("DB_URI, MONGODB_URL or MONGO_URL".to_string())
            })?;

        Ok(Self {
            url,
            database: env_or_default("MONGODB_DATABASE", DEFAULT_DATABASE),
            collection: env_or_default("MONGODB_COLLECTION", DEFAULT_COLLECTION),
            app_name: std::env::var("MONGODB_APP_NAME").ok(),
            max_pool_size: env_parse_or("MONGODB_MAX_POOL_SIZE", 100)?,
            min_pool_size: env_parse_or("MONGODB_MIN_POOL_SIZE", 5)?,
            connect_timeout_secs: env_parse_or("MONGODB_CONNECT_TIMEOUT_SECS", 10)?,
            server_selection_timeout_secs: env_parse_or(
                "MONGODB_SERVER_SELECTION_TIMEOUT_SECS",
                30,
            )?,
            stable_api: env_parse_or("MONGODB_STABLE_API", true)?,
        })
    }
}
