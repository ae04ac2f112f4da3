//! Configuration management
//!
//! Every setting has a documented default and can be overridden from the
//! environment (a `.env` file is honoured through `dotenvy`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 5000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Database Configuration Constants
// ============================================================================

pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_DB_NAME: &str = "movielens";
pub const DEFAULT_DB_USER: &str = "postgres";
pub const DEFAULT_DB_PASSWORD: &str = "postgres";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 1;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

// ============================================================================
// Queue / Worker Configuration Constants
// ============================================================================

/// Default delay between polls of an empty queue.
pub const DEFAULT_QUEUE_POLL_INTERVAL_MS: u64 = 1000;

/// A running entry whose lock is older than this is handed out again.
pub const DEFAULT_QUEUE_LOCK_TIMEOUT_SECS: u64 = 300;

/// Interval at which a busy worker refreshes its lock.
pub const DEFAULT_QUEUE_HEARTBEAT_SECS: u64 = 30;

/// Deliveries allowed per job before it is failed outright.
pub const DEFAULT_QUEUE_MAX_ATTEMPTS: i32 = 3;

/// Default number of worker loops per process.
pub const DEFAULT_WORKER_CONCURRENCY: usize = 2;

// ============================================================================
// Storage / CORS Constants
// ============================================================================

/// Directory holding uploaded CSV chunks, addressed by bare file name.
pub const DEFAULT_CHUNK_STORAGE_ROOT: &str = "../file/chunks";

/// CORS is open by default, matching the browser upload client.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "*";

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    pub storage: StorageConfig,
    pub cors: CorsConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Database configuration
///
/// `url` wins when set; otherwise the connection string is assembled from
/// the individual parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Connection string for the pool
    pub fn connection_url(&self) -> String {
        match self.url {
            Some(ref url) => url.clone(),
            None => format!(
                "postgresql://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.name
            ),
        }
    }
}

/// Durable queue and worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue endpoint. `None` means the queue lives in the main database.
    pub url: Option<String>,
    pub poll_interval_ms: u64,
    pub lock_timeout_secs: u64,
    pub heartbeat_secs: u64,
    pub max_attempts: i32,
    pub concurrency: usize,
    /// Run worker loops inside the HTTP process
    pub workers_enabled: bool,
}

/// Source file storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub chunk_root: PathBuf,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_env();
        config.validate()?;

        Ok(config)
    }

    /// Read the environment without touching `.env` or validating
    pub fn from_env() -> Self {
        Config {
            server: ServerConfig {
                host: env_string("REEL_HOST", DEFAULT_SERVER_HOST),
                port: env_or("REEL_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_or("REEL_SHUTDOWN_TIMEOUT", DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
                host: env_string("DB_HOST", DEFAULT_DB_HOST),
                port: env_or("DB_PORT", DEFAULT_DB_PORT),
                name: env_string("DB_NAME", DEFAULT_DB_NAME),
                user: env_string("DB_USER", DEFAULT_DB_USER),
                password: env_string("DB_PASSWORD", DEFAULT_DB_PASSWORD),
                max_connections: env_or("DB_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS),
                min_connections: env_or("DB_MIN_CONNECTIONS", DEFAULT_DATABASE_MIN_CONNECTIONS),
                connect_timeout_secs: env_or(
                    "DB_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
                idle_timeout_secs: env_or("DB_IDLE_TIMEOUT", DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
            },
            queue: QueueConfig {
                url: std::env::var("QUEUE_DATABASE_URL").ok().filter(|s| !s.is_empty()),
                poll_interval_ms: env_or("QUEUE_POLL_INTERVAL_MS", DEFAULT_QUEUE_POLL_INTERVAL_MS),
                lock_timeout_secs: env_or("QUEUE_LOCK_TIMEOUT_SECS", DEFAULT_QUEUE_LOCK_TIMEOUT_SECS),
                heartbeat_secs: env_or("QUEUE_HEARTBEAT_SECS", DEFAULT_QUEUE_HEARTBEAT_SECS),
                max_attempts: env_or("QUEUE_MAX_ATTEMPTS", DEFAULT_QUEUE_MAX_ATTEMPTS),
                concurrency: env_or("WORKER_CONCURRENCY", DEFAULT_WORKER_CONCURRENCY),
                workers_enabled: env_or("WORKERS_ENABLED", true),
            },
            storage: StorageConfig {
                chunk_root: PathBuf::from(env_string("CHUNK_STORAGE_ROOT", DEFAULT_CHUNK_STORAGE_ROOT)),
            },
            cors: CorsConfig {
                allowed_origins: env_string("CORS_ALLOWED_ORIGINS", DEFAULT_CORS_ALLOWED_ORIGIN)
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_or("CORS_ALLOW_CREDENTIALS", false),
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_none() && self.database.name.is_empty() {
            anyhow::bail!("Either DATABASE_URL or DB_NAME must be set");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.queue.concurrency == 0 {
            anyhow::bail!("WORKER_CONCURRENCY must be greater than 0");
        }

        if self.queue.max_attempts < 1 {
            anyhow::bail!("QUEUE_MAX_ATTEMPTS must be at least 1");
        }

        if self.queue.heartbeat_secs == 0 || self.queue.heartbeat_secs >= self.queue.lock_timeout_secs {
            anyhow::bail!(
                "QUEUE_HEARTBEAT_SECS ({}) must be positive and shorter than QUEUE_LOCK_TIMEOUT_SECS ({})",
                self.queue.heartbeat_secs,
                self.queue.lock_timeout_secs
            );
        }

        if self.cors.allow_credentials
            && (self.cors.allowed_origins.is_empty() || self.cors.allowed_origins.iter().any(|o| o == "*"))
        {
            anyhow::bail!("CORS_ALLOW_CREDENTIALS cannot be combined with a wildcard origin");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: None,
                host: DEFAULT_DB_HOST.to_string(),
                port: DEFAULT_DB_PORT,
                name: DEFAULT_DB_NAME.to_string(),
                user: DEFAULT_DB_USER.to_string(),
                password: DEFAULT_DB_PASSWORD.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            queue: QueueConfig {
                url: None,
                poll_interval_ms: DEFAULT_QUEUE_POLL_INTERVAL_MS,
                lock_timeout_secs: DEFAULT_QUEUE_LOCK_TIMEOUT_SECS,
                heartbeat_secs: DEFAULT_QUEUE_HEARTBEAT_SECS,
                max_attempts: DEFAULT_QUEUE_MAX_ATTEMPTS,
                concurrency: DEFAULT_WORKER_CONCURRENCY,
                workers_enabled: true,
            },
            storage: StorageConfig {
                chunk_root: PathBuf::from(DEFAULT_CHUNK_STORAGE_ROOT),
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: false,
            },
        }
    }
}
