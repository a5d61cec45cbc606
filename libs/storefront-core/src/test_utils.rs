//! Test utilities and mock data for the storefront

use crate::models::{Order, Product};
use std::path::{Path, PathBuf};

/// Create mock products for testing
#[must_use]
pub fn create_mock_products() -> Vec<Product> {
    vec![
        Product {
            id: 1,
            name: "Laptop".to_string(),
            price: 1200.0,
        },
        Product {
            id: 2,
            name: "Mouse".to_string(),
            price: 25.0,
        },
        Product {
            id: 3,
            name: "Keyboard".to_string(),
            price: 75.5,
        },
    ]
}

/// Create mock orders for testing, all containing "Laptop"
#[must_use]
pub fn create_mock_orders() -> Vec<Order> {
    let products = create_mock_products();
    vec![
        Order::new(1, "Alice", vec![products[0].clone(), products[1].clone()]),
        Order::new(2, "Bob", vec![products[0].clone()]),
        Order::new(3, "Carol", products),
    ]
}

/// Application log lines one second apart from `2024-01-01 00:00:00` to
/// `00:00:05`, with one malformed line in between
#[must_use]
pub fn sample_log_lines() -> Vec<String> {
    [
        "2024-01-01 00:00:00 INFO  Application started",
        "2024-01-01 00:00:01 DEBUG Loading configuration",
        "stack trace continuation without timestamp",
        "2024-01-01 00:00:02 INFO  Order 1 created",
        "2024-01-01 00:00:03 WARN  Slow query for product 'Laptop'",
        "2024-01-01 00:00:04 INFO  Order 2 created",
        "2024-01-01 00:00:05 ERROR Payment gateway timeout",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

/// Write `lines` to `dir/app.log` and return its path
///
/// # Panics
/// Panics if the file cannot be written
pub fn write_log_file(dir: &Path, lines: &[String]) -> PathBuf {
    let path = dir.join("app.log");
    let mut content = lines.join("\n");
    content.push('\n');
    std::fs::write(&path, content).expect("failed to write sample log");
    path
}
