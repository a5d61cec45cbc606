//! Data models for products, orders and log extraction tasks

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Product entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier
    pub id: i64,
    /// Product name, used as the order cache key
    pub name: String,
    /// Unit price
    pub price: f64,
}

/// Order snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier
    pub id: i64,
    /// Customer name
    pub customer_name: String,
    /// Sum of the product prices
    pub total_amount: f64,
    /// When the order was placed
    pub order_date: NaiveDateTime,
    /// Products contained in the order
    pub products: Vec<Product>,
}

impl Order {
    /// Create an order and compute its total
    #[must_use]
    pub fn new(id: i64, customer_name: impl Into<String>, products: Vec<Product>) -> Self {
        let mut order = Self {
            id,
            customer_name: customer_name.into(),
            total_amount: 0.0,
            order_date: Utc::now().naive_utc(),
            products,
        };
        order.recalculate_total_amount();
        order
    }

    /// Recompute `total_amount` from the product prices
    pub fn recalculate_total_amount(&mut self) {
        self.total_amount = self.products.iter().map(|p| p.price).sum();
    }

    /// Names of the products in this order
    #[must_use]
    pub fn product_names(&self) -> Vec<String> {
        self.products.iter().map(|p| p.name.clone()).collect()
    }

    /// Whether the order contains a product with the given name
    #[must_use]
    pub fn contains_product_named(&self, name: &str) -> bool {
        self.products.iter().any(|p| p.name == name)
    }
}

/// Log extraction task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "DONE")]
    Done,
    #[serde(rename = "ERROR")]
    Error,
}

impl TaskStatus {
    /// Whether no further transition can happen from this status
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Error)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "PENDING"),
            TaskStatus::Done => write!(f, "DONE"),
            TaskStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Inclusive time range of a log extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

impl TimeRange {
    /// Create a range. Ordering of the bounds is the caller's concern.
    #[must_use]
    pub fn new(from: NaiveDateTime, to: NaiveDateTime) -> Self {
        Self { from, to }
    }

    /// Whether `ts` falls within `[from, to]`
    #[must_use]
    pub fn contains(&self, ts: &NaiveDateTime) -> bool {
        *ts >= self.from && *ts <= self.to
    }

    /// Whether `from <= to`
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.from <= self.to
    }
}

/// Log extraction task record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogTask {
    /// Opaque unique identifier
    pub id: String,
    /// Requested range, absent for tasks recovered from disk
    pub range: Option<TimeRange>,
    /// Current status
    pub status: TaskStatus,
    /// Result file, set only when `status` is `Done`
    pub file_path: Option<PathBuf>,
    /// Failure cause, set only when `status` is `Error`
    pub error: Option<String>,
    /// When this record was created in the current process
    pub created_at: DateTime<Utc>,
}

impl LogTask {
    /// A freshly created task awaiting execution
    #[must_use]
    pub fn pending(id: impl Into<String>, range: TimeRange) -> Self {
        Self {
            id: id.into(),
            range: Some(range),
            status: TaskStatus::Pending,
            file_path: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// A completed task rebuilt from a result file on disk
    #[must_use]
    pub fn recovered(id: impl Into<String>, file_path: PathBuf) -> Self {
        Self {
            id: id.into(),
            range: None,
            status: TaskStatus::Done,
            file_path: Some(file_path),
            error: None,
            created_at: Utc::now(),
        }
    }
}
