//! Synthetic retail orders
//!
//! Shaped like an e-commerce apparel sales export: one row per order line,
//! Indian states and cities, a mix of shipped and cancelled orders.

use crate::error::{InsightsError, Result};
use chrono::{Datelike, Duration, NaiveDate};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::path::Path;

pub const DEFAULT_ROWS: usize = 500;
pub const DEFAULT_SEED: u64 = 42;

const STATUSES: [&str; 5] = [
    "Shipped - Delivered to Buyer",
    "Shipped",
    "Pending",
    "Cancelled",
    "Shipped - Returned to Seller",
];
/// Relative weights for `STATUSES`.
const STATUS_WEIGHTS: [u32; 5] = [55, 20, 5, 15, 5];

const FULFILMENT: [&str; 2] = ["Amazon", "Merchant"];
const SIZES: [&str; 7] = ["XS", "S", "M", "L", "XL", "XXL", "Free"];

const CATEGORIES: [(&str, f64, f64); 8] = [
    ("Set", 600.0, 1800.0),
    ("Kurta", 300.0, 900.0),
    ("Western Dress", 450.0, 1400.0),
    ("Top", 250.0, 800.0),
    ("Ethnic Dress", 500.0, 1500.0),
    ("Bottom", 250.0, 700.0),
    ("Saree", 700.0, 2500.0),
    ("Blouse", 200.0, 600.0),
];

const LOCATIONS: [(&str, &str); 10] = [
    ("MAHARASHTRA", "MUMBAI"),
    ("MAHARASHTRA", "PUNE"),
    ("KARNATAKA", "BENGALURU"),
    ("TELANGANA", "HYDERABAD"),
    ("TAMIL NADU", "CHENNAI"),
    ("DELHI", "NEW DELHI"),
    ("UTTAR PRADESH", "LUCKNOW"),
    ("WEST BENGAL", "KOLKATA"),
    ("GUJARAT", "AHMEDABAD"),
    ("KERALA", "KOCHI"),
];

/// Generate `rows` orders between April and June 2022. The same seed
/// always yields the same frame.
pub fn generate(rows: usize, seed: u64) -> Result<DataFrame> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = NaiveDate::from_ymd_opt(2022, 4, 1)
        .ok_or_else(|| InsightsError::Data("Invalid start date".to_string()))?;
    let total_weight: u32 = STATUS_WEIGHTS.iter().sum();

    let mut order_id = Vec::with_capacity(rows);
    let mut date = Vec::with_capacity(rows);
    let mut status = Vec::with_capacity(rows);
    let mut fulfilment = Vec::with_capacity(rows);
    let mut category = Vec::with_capacity(rows);
    let mut size = Vec::with_capacity(rows);
    let mut qty = Vec::with_capacity(rows);
    let mut amount = Vec::with_capacity(rows);
    let mut revenue = Vec::with_capacity(rows);
    let mut state = Vec::with_capacity(rows);
    let mut city = Vec::with_capacity(rows);
    let mut is_b2b = Vec::with_capacity(rows);
    let mut is_cancelled = Vec::with_capacity(rows);
    let mut year = Vec::with_capacity(rows);
    let mut month = Vec::with_capacity(rows);

    for _ in 0..rows {
        let day = start + Duration::days(rng.gen_range(0..91));

        let mut pick = rng.gen_range(0..total_weight);
        let mut status_idx = 0;
        while pick >= STATUS_WEIGHTS[status_idx] {
            pick -= STATUS_WEIGHTS[status_idx];
            status_idx += 1;
        }
        let cancelled = STATUSES[status_idx] == "Cancelled";

        let (cat, low, high) = CATEGORIES[rng.gen_range(0..CATEGORIES.len())];
        let (st, ct) = LOCATIONS[rng.gen_range(0..LOCATIONS.len())];
        let units: i64 = if cancelled { 0 } else { rng.gen_range(1..=3) };
        let price = (rng.gen_range(low..high) * 100.0_f64).round() / 100.0;
        let order_amount = price * units.max(1) as f64;

        order_id.push(format!(
            "{}-{:07}-{:07}",
            rng.gen_range(171..=408),
            rng.gen_range(0..10_000_000),
            rng.gen_range(0..10_000_000)
        ));
        date.push(day.format("%Y-%m-%d").to_string());
        status.push(STATUSES[status_idx]);
        fulfilment.push(*FULFILMENT.choose(&mut rng).unwrap_or(&"Amazon"));
        category.push(cat);
        size.push(*SIZES.choose(&mut rng).unwrap_or(&"M"));
        qty.push(units);
        amount.push(order_amount);
        revenue.push(if cancelled { 0.0 } else { order_amount });
        state.push(st);
        city.push(ct);
        is_b2b.push(rng.gen_bool(0.08));
        is_cancelled.push(cancelled);
        year.push(day.year());
        month.push(day.month() as i32);
    }

    let df = df! [
        "order_id" => order_id,
        "date" => date,
        "status" => status,
        "fulfilment" => fulfilment,
        "category" => category,
        "size" => size,
        "qty" => qty,
        "amount" => amount,
        "revenue" => revenue,
        "state" => state,
        "city" => city,
        "is_b2b" => is_b2b,
        "is_cancelled" => is_cancelled,
        "year" => year,
        "month" => month,
    ]?;

    Ok(df)
}

/// Write a frame as CSV with a header row, creating parent directories.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_reproducible() {
        let a = generate(50, 7).unwrap();
        let b = generate(50, 7).unwrap();
        assert_eq!(a.shape(), (50, 15));
        assert!(a.equals(&b));
    }

    #[test]
    fn test_cancelled_orders_have_no_revenue() {
        let df = generate(300, DEFAULT_SEED).unwrap();
        let cancelled = df.column("is_cancelled").unwrap().bool().unwrap();
        let revenue = df.column("revenue").unwrap().f64().unwrap();
        let qty = df.column("qty").unwrap().i64().unwrap();

        let mut seen_cancelled = false;
        for ((c, r), q) in cancelled.into_iter().zip(revenue.into_iter()).zip(qty.into_iter()) {
            if c == Some(true) {
                seen_cancelled = true;
                assert_eq!(r, Some(0.0));
                assert_eq!(q, Some(0));
            } else {
                assert!(r.unwrap() > 0.0);
            }
        }
        assert!(seen_cancelled);
    }

    #[test]
    fn test_write_csv_roundtrips_through_data_layer() {
        let dir = std::env::temp_dir().join(format!("retail_sample_{}", uuid::Uuid::new_v4()));
        let path = dir.join("sales.csv");
        let mut df = generate(20, 1).unwrap();
        write_csv(&mut df, &path).unwrap();

        let layer = crate::data_layer::DataLayer::load_csv(&path, "sales").unwrap();
        assert_eq!(layer.row_count(), 20);
        assert!(layer.columns().contains(&"is_cancelled".to_string()));

        let _ = std::fs::remove_dir_all(dir);
    }
}
