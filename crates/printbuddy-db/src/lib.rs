#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub use postgres::PostgresDatabase;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use printbuddy_core::feedback::{CreateFeedback, Feedback};
use printbuddy_core::order::{CreateOrder, Order};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Internal(String),
}

/// Durable, append-only storage for accepted submissions.
#[async_trait]
pub trait Database: Send + Sync {
    // -- Feedback --
    async fn insert_feedback(&self, input: &CreateFeedback) -> Result<Feedback, DbError>;
    async fn get_feedback(&self, id: &str) -> Result<Feedback, DbError>;
    /// Newest first.
    async fn list_feedback(&self, limit: i64) -> Result<Vec<Feedback>, DbError>;
    async fn count_feedback(&self) -> Result<i64, DbError>;

    // -- Orders --
    async fn insert_order(&self, input: &CreateOrder) -> Result<Order, DbError>;
    async fn get_order(&self, id: &str) -> Result<Order, DbError>;
    /// Newest first.
    async fn list_orders(&self, limit: i64) -> Result<Vec<Order>, DbError>;
    async fn count_orders(&self) -> Result<i64, DbError>;
}

/// Selects and locates the storage backend.
#[derive(Debug, Clone, Default)]
pub struct DbConfig {
    /// SQLite file. Defaults to `printbuddy.db` inside [`data_dir`].
    pub sqlite_path: Option<String>,
    /// Postgres connection URL. Takes precedence over SQLite when set.
    pub postgres_url: Option<String>,
}

impl DbConfig {
    /// `DATABASE_URL` with a `postgres://` or `postgresql://` scheme selects
    /// Postgres; anything else falls back to SQLite at
    /// `PRINTBUDDY_SQLITE_PATH`.
    pub fn from_env() -> Self {
        let postgres_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| is_postgres_url(url));
        Self {
            sqlite_path: std::env::var("PRINTBUDDY_SQLITE_PATH").ok(),
            postgres_url,
        }
    }

    pub fn is_postgres(&self) -> bool {
        self.postgres_url.is_some()
    }
}

fn is_postgres_url(url: &str) -> bool {
    url.starts_with("postgres://") || url.starts_with("postgresql://")
}

/// Default directory for the SQLite file: `PRINTBUDDY_DATA_DIR`, else
/// `$XDG_DATA_HOME/printbuddy`, else `~/.local/share/printbuddy`.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PRINTBUDDY_DATA_DIR") {
        PathBuf::from(dir)
    } else if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg).join("printbuddy")
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".local/share/printbuddy")
    } else {
        PathBuf::from("./printbuddy")
    }
}

/// Open the configured backend and run its migrations.
pub async fn open_database(config: &DbConfig) -> Result<Arc<dyn Database>, DbError> {
    if let Some(url) = config.postgres_url.as_deref() {
        #[cfg(feature = "postgres")]
        {
            tracing::info!("using postgres backend");
            return Ok(Arc::new(PostgresDatabase::connect(url).await?));
        }
        #[cfg(not(feature = "postgres"))]
        {
            let _ = url;
            return Err(DbError::Internal(
                "DATABASE_URL points at postgres but the 'postgres' feature is not enabled".into(),
            ));
        }
    }

    #[cfg(feature = "sqlite")]
    {
        let config = config.clone();
        let db = tokio::task::spawn_blocking(move || SqliteDatabase::open(&config))
            .await
            .map_err(|e| DbError::Internal(e.to_string()))??;
        tracing::info!(path = %db.path().display(), "using sqlite backend");
        Ok(Arc::new(db))
    }
    #[cfg(not(feature = "sqlite"))]
    {
        Err(DbError::Internal(
            "no database backend enabled; build with 'sqlite' or 'postgres'".into(),
        ))
    }
}
