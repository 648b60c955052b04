pub(crate) mod migrations;
pub use migrations::MIGRATION_LOCK_KEY;
pub mod queries;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use printbuddy_core::feedback::{CreateFeedback, Feedback};
use printbuddy_core::order::{CreateOrder, Order};

use crate::{Database, DbError};

/// Map a sqlx::Error into a DbError::Internal.
pub(crate) fn pg_err(e: sqlx::Error) -> DbError {
    DbError::Internal(e.to_string())
}

/// Create a DbError::NotFound with the given entity description.
pub(crate) fn pg_not_found(entity: &str) -> DbError {
    DbError::NotFound(entity.to_string())
}

#[derive(Clone)]
pub struct PostgresDatabase {
    pub(crate) pool: PgPool,
}

impl PostgresDatabase {
    /// Connect to a Postgres database and run migrations.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .map_err(pg_err)?;

        let db = Self { pool };
        migrations::run(&db.pool).await?;
        Ok(db)
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    // -- Feedback --
    async fn insert_feedback(&self, input: &CreateFeedback) -> Result<Feedback, DbError> {
        self.pg_insert_feedback(input).await
    }
    async fn get_feedback(&self, id: &str) -> Result<Feedback, DbError> {
        self.pg_get_feedback(id).await
    }
    async fn list_feedback(&self, limit: i64) -> Result<Vec<Feedback>, DbError> {
        self.pg_list_feedback(limit).await
    }
    async fn count_feedback(&self) -> Result<i64, DbError> {
        self.pg_count_feedback().await
    }

    // -- Orders --
    async fn insert_order(&self, input: &CreateOrder) -> Result<Order, DbError> {
        self.pg_insert_order(input).await
    }
    async fn get_order(&self, id: &str) -> Result<Order, DbError> {
        self.pg_get_order(id).await
    }
    async fn list_orders(&self, limit: i64) -> Result<Vec<Order>, DbError> {
        self.pg_list_orders(limit).await
    }
    async fn count_orders(&self) -> Result<i64, DbError> {
        self.pg_count_orders().await
    }
}
