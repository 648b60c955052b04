use chrono::{DateTime, Utc};

use printbuddy_core::order::{CreateOrder, Order, OrderOption};

use super::super::{pg_err, pg_not_found, PostgresDatabase};
use crate::DbError;

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: String,
    name: String,
    email: String,
    service: String,
    file_locator: String,
    details: String,
    is_female: bool,
    customer_phone: Option<String>,
    amount: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DbError;

    fn try_from(r: OrderRow) -> Result<Self, DbError> {
        let service = OrderOption::parse_str(&r.service)
            .ok_or_else(|| DbError::Internal(format!("unknown service {:?}", r.service)))?;
        Ok(Order {
            id: r.id,
            name: r.name,
            email: r.email,
            service,
            file_locator: r.file_locator,
            details: r.details,
            is_female: r.is_female,
            customer_phone: r.customer_phone,
            amount: r.amount,
            created_at: r.created_at,
        })
    }
}

impl PostgresDatabase {
    pub(crate) async fn pg_insert_order(&self, input: &CreateOrder) -> Result<Order, DbError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        let row = sqlx::query_as::<_, OrderRow>(
            "INSERT INTO orders (id, name, email, service, file_locator, details,
                                 is_female, customer_phone, amount, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING *",
        )
        .bind(&id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(input.service.as_str())
        .bind(input.file_locator.as_str())
        .bind(&input.details)
        .bind(input.is_female)
        .bind(&input.customer_phone)
        .bind(input.amount)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(pg_err)?;

        row.try_into()
    }

    pub(crate) async fn pg_get_order(&self, id: &str) -> Result<Order, DbError> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?
            .ok_or_else(|| pg_not_found(&format!("order {id}")))?
            .try_into()
    }

    pub(crate) async fn pg_list_orders(&self, limit: i64) -> Result<Vec<Order>, DbError> {
        sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM orders ORDER BY created_at DESC, seq DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(pg_err)?
        .into_iter()
        .map(Order::try_from)
        .collect()
    }

    pub(crate) async fn pg_count_orders(&self) -> Result<i64, DbError> {
        sqlx::query_scalar("SELECT count(*) FROM orders")
            .fetch_one(&self.pool)
            .await
            .map_err(pg_err)
    }
}
