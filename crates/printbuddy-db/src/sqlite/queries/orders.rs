use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Row};

use printbuddy_core::order::{CreateOrder, Order, OrderOption};

use super::super::{not_found_or, SqliteDatabase, SqliteResultExt};
use crate::DbError;

fn row_to_order(row: &Row) -> rusqlite::Result<Order> {
    let service_str: String = row.get("service")?;
    let service = OrderOption::parse_str(&service_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            Type::Text,
            format!("unknown service {service_str:?}").into(),
        )
    })?;
    Ok(Order {
        id: row.get("id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        service,
        file_locator: row.get("file_locator")?,
        details: row.get("details")?,
        is_female: row.get("is_female")?,
        customer_phone: row.get("customer_phone")?,
        amount: row.get("amount")?,
        created_at: row.get("created_at")?,
    })
}

impl SqliteDatabase {
    pub fn insert_order_sync(&self, input: &CreateOrder) -> Result<Order, DbError> {
        self.with_conn(|conn| {
            let id = uuid::Uuid::new_v4().to_string();
            let now = Utc::now();
            conn.execute(
                "INSERT INTO orders (id, name, email, service, file_locator, details,
                                     is_female, customer_phone, amount, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    id,
                    input.name,
                    input.email,
                    input.service.as_str(),
                    input.file_locator.as_str(),
                    input.details,
                    input.is_female,
                    input.customer_phone,
                    input.amount,
                    now
                ],
            )
            .to_db()?;
            conn.query_row(
                "SELECT * FROM orders WHERE id = ?1",
                params![id],
                row_to_order,
            )
            .to_db()
        })
    }

    pub fn get_order_sync(&self, id: &str) -> Result<Order, DbError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT * FROM orders WHERE id = ?1", params![id], row_to_order)
                .map_err(not_found_or(format!("order {id}")))
        })
    }

    pub fn list_orders_sync(&self, limit: i64) -> Result<Vec<Order>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT * FROM orders ORDER BY created_at DESC, rowid DESC LIMIT ?1")
                .to_db()?;
            let rows = stmt
                .query_map(params![limit], row_to_order)
                .to_db()?
                .collect::<Result<Vec<_>, _>>()
                .to_db()?;
            Ok(rows)
        })
    }

    pub fn count_orders_sync(&self) -> Result<i64, DbError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT count(*) FROM orders", [], |r| r.get(0))
                .to_db()
        })
    }
}
