#![allow(dead_code)]

use sales_forecast::config::{ForestConfig, PipelineConfig};
use sales_forecast::data::{ProductRecord, RawTables, ShopRecord, TransactionRecord};
use std::fs;
use std::path::{Path, PathBuf};

/// Product, shop and monthly quantity base for the synthetic dataset
pub const SERIES: [(&str, &str, f64); 4] = [
    ("P1", "S1", 40.0),
    ("P1", "S2", 25.0),
    ("P2", "S1", 60.0),
    ("P3", "S2", 10.0),
];

/// Quantity sold by a series in a month of 2023
pub fn monthly_quantity(base: f64, month: u32) -> f64 {
    let seasonal = if month >= 11 { 15.0 } else { 0.0 };
    base + 2.0 * month as f64 + seasonal
}

/// Twelve months of two transactions per series and month
pub fn sample_tables() -> RawTables {
    let mut transactions = Vec::new();
    for (product, shop, base) in SERIES {
        for month in 1..=12 {
            let quantity = monthly_quantity(base, month);
            let price = 10.0 + (month % 3) as f64;
            transactions.push(TransactionRecord::new(
                product,
                shop,
                &format!("2023-{:02}-05 10:00:00", month),
                quantity / 2.0,
                price,
            ));
            transactions.push(TransactionRecord::new(
                product,
                shop,
                &format!("2023-{:02}-20", month),
                quantity / 2.0,
                price + 1.0,
            ));
        }
    }

    RawTables {
        transactions,
        products: vec![
            ProductRecord::new("P1", "Tea", "Beverages"),
            ProductRecord::new("P2", "Biscuits", "Snacks"),
            ProductRecord::new("P3", "Coffee", "Beverages"),
        ],
        shops: vec![ShopRecord::new("S1", "Colombo"), ShopRecord::new("S2", "Kandy")],
    }
}

/// Small, fixed-seed configuration that keeps tests fast
pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        forest: ForestConfig {
            n_trees: 20,
            seed: 7,
            ..ForestConfig::default()
        },
        ..PipelineConfig::default()
    }
}

/// Write the sample tables as CSV files into `dir`
pub fn write_sample_csvs(dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
    let tables = sample_tables();

    let mut transactions = String::from("transaction_id,product_id,shop_id,transaction_time,quantity,unit_price\n");
    for (i, tx) in tables.transactions.iter().enumerate() {
        transactions.push_str(&format!(
            "T{},{},{},{},{},{}\n",
            i, tx.product_id, tx.shop_id, tx.timestamp, tx.quantity, tx.unit_price
        ));
    }

    let mut products = String::from("product_id,product_name,category\n");
    for p in &tables.products {
        products.push_str(&format!(
            "{},{},{}\n",
            p.product_id,
            p.product_name.as_deref().unwrap_or(""),
            p.category.as_deref().unwrap_or("")
        ));
    }

    let shops = "shop_id,city,latitude,longitude\nS1,Colombo,6.93,79.85\nS2,Kandy,7.29,80.63\n";

    let paths = (
        dir.join("transactions.csv"),
        dir.join("products.csv"),
        dir.join("shops.csv"),
    );
    fs::write(&paths.0, transactions).unwrap();
    fs::write(&paths.1, products).unwrap();
    fs::write(&paths.2, shops).unwrap();
    paths
}
