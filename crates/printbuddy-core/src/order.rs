use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::validate::{RuleSet, Submission, FILE_REQUIRED};

pub const DOCUMENT_PRICE: i64 = 4;
pub const POSTER_PRICE: i64 = 14;
pub const SURCHARGE: i64 = 25;

/// Something a customer can order. Which values are offered depends on the
/// deployment's [`Catalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderOption {
    Document,
    Poster,
    Bw,
    Color,
}

impl OrderOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderOption::Document => "document",
            OrderOption::Poster => "poster",
            OrderOption::Bw => "bw",
            OrderOption::Color => "color",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "document" => Some(OrderOption::Document),
            "poster" => Some(OrderOption::Poster),
            "bw" => Some(OrderOption::Bw),
            "color" => Some(OrderOption::Color),
            _ => None,
        }
    }

    pub fn base_price(&self) -> i64 {
        match self {
            OrderOption::Document | OrderOption::Bw => DOCUMENT_PRICE,
            OrderOption::Poster | OrderOption::Color => POSTER_PRICE,
        }
    }
}

impl fmt::Display for OrderOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single enumeration of orderable options a deployment accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Catalog {
    /// Field `service`, values `document` and `poster`.
    #[default]
    Service,
    /// Field `orderType`, values `bw` and `color`.
    OrderType,
}

impl Catalog {
    pub fn as_str(&self) -> &'static str {
        match self {
            Catalog::Service => "service",
            Catalog::OrderType => "order-type",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "service" => Some(Catalog::Service),
            "order-type" | "order_type" | "orderType" => Some(Catalog::OrderType),
            _ => None,
        }
    }

    /// Name of the form field carrying the choice.
    pub fn field_name(&self) -> &'static str {
        match self {
            Catalog::Service => "service",
            Catalog::OrderType => "orderType",
        }
    }

    pub fn values(&self) -> &'static [&'static str] {
        match self {
            Catalog::Service => &["document", "poster"],
            Catalog::OrderType => &["bw", "color"],
        }
    }

    /// Parse an option, accepting only values belonging to this catalog.
    pub fn parse_option(&self, s: &str) -> Option<OrderOption> {
        if self.values().contains(&s) {
            OrderOption::parse_str(s)
        } else {
            None
        }
    }
}

/// Price of an order in whole currency units.
pub fn price(option: OrderOption, is_female: bool) -> i64 {
    if is_female {
        option.base_price() + SURCHARGE
    } else {
        option.base_price()
    }
}

/// Opaque, non-empty reference to a staged file: a relative path for the
/// local store, a URL for object storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locator(String);

impl Locator {
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Locator {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Locator::new(value).ok_or_else(|| "file locator must not be empty".to_string())
    }
}

impl From<Locator> for String {
    fn from(locator: Locator) -> Self {
        locator.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub name: String,
    pub email: String,
    pub service: OrderOption,
    pub file_locator: String,
    pub details: String,
    pub is_female: bool,
    pub customer_phone: Option<String>,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn summary(&self) -> OrderSummary {
        OrderSummary {
            order_id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            service: self.service,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub name: String,
    pub email: String,
    pub service: OrderOption,
    pub file_locator: Locator,
    pub details: String,
    pub is_female: bool,
    pub customer_phone: Option<String>,
    pub amount: i64,
}

/// An order whose text fields passed validation but whose file has not
/// been staged yet.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub name: String,
    pub email: String,
    pub service: OrderOption,
    pub details: String,
    pub is_female: bool,
    pub customer_phone: Option<String>,
}

impl OrderDraft {
    /// Run the order rules for `catalog`, then require an attached file.
    pub fn from_submission(
        submission: &Submission,
        catalog: Catalog,
        has_file: bool,
    ) -> Result<Self, ValidationError> {
        RuleSet::order(catalog).validate(submission)?;
        if !has_file {
            return Err(ValidationError::new(FILE_REQUIRED));
        }
        let service = submission
            .text(catalog.field_name())
            .and_then(|s| catalog.parse_option(s))
            .ok_or_else(|| ValidationError::new("Invalid service type"))?;
        let required = |field: &str| submission.text(field).unwrap_or_default().to_string();
        Ok(Self {
            name: required("name"),
            email: required("email"),
            service,
            details: required("details"),
            is_female: submission.flag("isFemale"),
            customer_phone: submission.text("customerPhone").map(str::to_string),
        })
    }

    pub fn amount(&self) -> i64 {
        price(self.service, self.is_female)
    }

    pub fn into_create(self, file_locator: Locator) -> CreateOrder {
        let amount = self.amount();
        CreateOrder {
            name: self.name,
            email: self.email,
            service: self.service,
            file_locator,
            details: self.details,
            is_female: self.is_female,
            customer_phone: self.customer_phone,
            amount,
        }
    }
}

/// What the operator is told about a new order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: String,
    pub name: String,
    pub email: String,
    pub service: OrderOption,
}

impl OrderSummary {
    pub fn message(&self) -> String {
        format!(
            "New order from {} ({}) for service: {}",
            self.name, self.email, self.service
        )
    }
}
