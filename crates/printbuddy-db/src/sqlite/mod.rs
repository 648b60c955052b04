pub(crate) mod migrations;
pub mod queries;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;

use printbuddy_core::feedback::{CreateFeedback, Feedback};
use printbuddy_core::order::{CreateOrder, Order};

use crate::{Database, DbConfig, DbError};

/// Extension trait that converts `rusqlite::Result<T>` into `Result<T, DbError>`.
pub(crate) trait SqliteResultExt<T> {
    fn to_db(self) -> Result<T, DbError>;
}

impl<T> SqliteResultExt<T> for rusqlite::Result<T> {
    fn to_db(self) -> Result<T, DbError> {
        self.map_err(map_sqlite_err)
    }
}

#[derive(Clone)]
pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl SqliteDatabase {
    pub fn open(config: &DbConfig) -> Result<Self, DbError> {
        let path = config
            .sqlite_path
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| crate::data_dir().join("printbuddy.db"));
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::open_path(&path)
    }

    pub fn open_path(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path).to_db()?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA busy_timeout=5000;",
        )
        .to_db()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_path_buf(),
        };
        db.run_migrations()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory().to_db()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: PathBuf::from(":memory:"),
        };
        db.run_migrations()?;
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn with_conn<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Connection) -> Result<T, DbError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| DbError::Internal("lock poisoned".into()))?;
        f(&conn)
    }

    fn run_migrations(&self) -> Result<(), DbError> {
        self.with_conn(migrations::run)
    }

    async fn blocking<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&SqliteDatabase) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| DbError::Internal(e.to_string()))?
    }
}

/// Map a `rusqlite::Error` into a `DbError::Internal`.
pub(crate) fn map_sqlite_err(e: rusqlite::Error) -> DbError {
    DbError::Internal(e.to_string())
}

/// Like [`map_sqlite_err`], but an empty result becomes `NotFound(entity)`.
pub(crate) fn not_found_or(entity: String) -> impl FnOnce(rusqlite::Error) -> DbError {
    move |e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(entity),
        other => map_sqlite_err(other),
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    // -- Feedback --
    async fn insert_feedback(&self, input: &CreateFeedback) -> Result<Feedback, DbError> {
        let input = input.clone();
        self.blocking(move |db| db.insert_feedback_sync(&input)).await
    }
    async fn get_feedback(&self, id: &str) -> Result<Feedback, DbError> {
        let id = id.to_string();
        self.blocking(move |db| db.get_feedback_sync(&id)).await
    }
    async fn list_feedback(&self, limit: i64) -> Result<Vec<Feedback>, DbError> {
        self.blocking(move |db| db.list_feedback_sync(limit)).await
    }
    async fn count_feedback(&self) -> Result<i64, DbError> {
        self.blocking(|db| db.count_feedback_sync()).await
    }

    // -- Orders --
    async fn insert_order(&self, input: &CreateOrder) -> Result<Order, DbError> {
        let input = input.clone();
        self.blocking(move |db| db.insert_order_sync(&input)).await
    }
    async fn get_order(&self, id: &str) -> Result<Order, DbError> {
        let id = id.to_string();
        self.blocking(move |db| db.get_order_sync(&id)).await
    }
    async fn list_orders(&self, limit: i64) -> Result<Vec<Order>, DbError> {
        self.blocking(move |db| db.list_orders_sync(limit)).await
    }
    async fn count_orders(&self) -> Result<i64, DbError> {
        self.blocking(|db| db.count_orders_sync()).await
    }
}
