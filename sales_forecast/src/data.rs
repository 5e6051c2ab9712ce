//! Raw table loading and joining
//!
//! The loader reads the transactions, products and shops tables, normalizes the
//! join keys on both sides and left-joins them into one transaction-level table.
//! A transaction row is never dropped: a missed join only leaves the enrichment
//! fields empty and is counted in the [`JoinReport`].

use crate::error::{ForecastError, Result};
use crate::utils::normalize_key;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

pub const TRANSACTIONS_TABLE: &str = "transactions";
pub const PRODUCTS_TABLE: &str = "products";
pub const SHOPS_TABLE: &str = "shops";

/// Column names used by the input tables
pub mod columns {
    pub const PRODUCT_ID: &str = "product_id";
    pub const SHOP_ID: &str = "shop_id";
    pub const TRANSACTION_TIME: &str = "transaction_time";
    pub const YEAR_MONTH: &str = "year_month";
    pub const QUANTITY: &str = "quantity";
    pub const UNIT_PRICE: &str = "unit_price";
    pub const TOTAL_AMOUNT: &str = "total_amount";
    pub const PRODUCT_NAME: &str = "product_name";
    pub const CATEGORY: &str = "category";
    pub const CITY: &str = "city";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
}

/// One raw sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub product_id: String,
    pub shop_id: String,
    /// Timestamp text as found in the source; parsed by the aggregator
    pub timestamp: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_amount: Option<f64>,
}

impl TransactionRecord {
    pub fn new(
        product_id: &str,
        shop_id: &str,
        timestamp: &str,
        quantity: f64,
        unit_price: f64,
    ) -> Self {
        Self {
            product_id: product_id.to_string(),
            shop_id: shop_id.to_string(),
            timestamp: timestamp.to_string(),
            quantity,
            unit_price,
            total_amount: None,
        }
    }
}

/// Product catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_id: String,
    pub product_name: Option<String>,
    pub category: Option<String>,
}

impl ProductRecord {
    pub fn new(product_id: &str, product_name: &str, category: &str) -> Self {
        Self {
            product_id: product_id.to_string(),
            product_name: Some(product_name.to_string()),
            category: Some(category.to_string()),
        }
    }
}

/// Shop directory entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopRecord {
    pub shop_id: String,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl ShopRecord {
    pub fn new(shop_id: &str, city: &str) -> Self {
        Self {
            shop_id: shop_id.to_string(),
            city: Some(city.to_string()),
            latitude: None,
            longitude: None,
        }
    }
}

/// The three input tables in typed form
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub transactions: Vec<TransactionRecord>,
    pub products: Vec<ProductRecord>,
    pub shops: Vec<ShopRecord>,
}

/// A transaction enriched with its product and shop attributes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedTransaction {
    pub product_id: String,
    pub shop_id: String,
    pub timestamp: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_amount: Option<f64>,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Counts of transaction rows whose keys found no catalog entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JoinReport {
    pub unmatched_products: usize,
    pub unmatched_shops: usize,
}

impl JoinReport {
    pub fn is_clean(&self) -> bool {
        self.unmatched_products == 0 && self.unmatched_shops == 0
    }
}

/// Denormalized transaction-level table
#[derive(Debug, Clone)]
pub struct MergedTable {
    rows: Vec<MergedTransaction>,
    products: Vec<ProductRecord>,
    shops: Vec<ShopRecord>,
    join_report: JoinReport,
}

impl MergedTable {
    pub fn rows(&self) -> &[MergedTransaction] {
        &self.rows
    }

    /// Normalized product catalog the table was joined against
    pub fn products(&self) -> &[ProductRecord] {
        &self.products
    }

    /// Normalized shop directory the table was joined against
    pub fn shops(&self) -> &[ShopRecord] {
        &self.shops
    }

    pub fn join_report(&self) -> JoinReport {
        self.join_report
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Data loader for the three retail tables
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load and merge the three tables from CSV files
    pub fn from_csv<P: AsRef<Path>>(transactions: P, products: P, shops: P) -> Result<MergedTable> {
        let tables = Self::read_csv_tables(transactions, products, shops)?;
        Self::merge(tables)
    }

    /// Load and merge the three tables from existing DataFrames
    pub fn from_dataframes(
        transactions: &DataFrame,
        products: &DataFrame,
        shops: &DataFrame,
    ) -> Result<MergedTable> {
        let tables = RawTables {
            transactions: Self::transactions_from_frame(transactions)?,
            products: Self::products_from_frame(products)?,
            shops: Self::shops_from_frame(shops)?,
        };
        Self::merge(tables)
    }

    /// Read the three CSV files into typed tables without joining them
    pub fn read_csv_tables<P: AsRef<Path>>(
        transactions: P,
        products: P,
        shops: P,
    ) -> Result<RawTables> {
        let transactions = Self::read_csv(transactions)?;
        let products = Self::read_csv(products)?;
        let shops = Self::read_csv(shops)?;

        Ok(RawTables {
            transactions: Self::transactions_from_frame(&transactions)?,
            products: Self::products_from_frame(&products)?,
            shops: Self::shops_from_frame(&shops)?,
        })
    }

    /// Read a CSV file with every column kept as text
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let file = File::open(path)?;
        // Zero inference rows keeps every column as Utf8 so identifiers such as
        // "007" survive untouched; numbers are parsed per column below.
        let df = CsvReader::new(file)
            .infer_schema(Some(0))
            .has_header(true)
            .finish()?;

        Ok(df)
    }

    /// Left-join transactions to products and shops on normalized keys
    pub fn merge(tables: RawTables) -> Result<MergedTable> {
        let products: Vec<ProductRecord> = tables
            .products
            .into_iter()
            .filter_map(|mut p| {
                p.product_id = normalize_key(Some(p.product_id.as_str()))?;
                Some(p)
            })
            .collect();
        let shops: Vec<ShopRecord> = tables
            .shops
            .into_iter()
            .filter_map(|mut s| {
                s.shop_id = normalize_key(Some(s.shop_id.as_str()))?;
                Some(s)
            })
            .collect();

        // First occurrence wins for duplicated catalog keys
        let mut product_index: HashMap<&str, &ProductRecord> = HashMap::new();
        for product in &products {
            product_index.entry(product.product_id.as_str()).or_insert(product);
        }
        let mut shop_index: HashMap<&str, &ShopRecord> = HashMap::new();
        for shop in &shops {
            shop_index.entry(shop.shop_id.as_str()).or_insert(shop);
        }

        let mut report = JoinReport::default();
        let mut rows = Vec::with_capacity(tables.transactions.len());

        for tx in tables.transactions {
            let product_id = tx.product_id.trim().to_string();
            let shop_id = tx.shop_id.trim().to_string();

            let product = product_index.get(product_id.as_str());
            let shop = shop_index.get(shop_id.as_str());
            if product.is_none() {
                report.unmatched_products += 1;
            }
            if shop.is_none() {
                report.unmatched_shops += 1;
            }

            rows.push(MergedTransaction {
                product_name: product.and_then(|p| p.product_name.clone()),
                category: product.and_then(|p| p.category.clone()),
                city: shop.and_then(|s| s.city.clone()),
                latitude: shop.and_then(|s| s.latitude),
                longitude: shop.and_then(|s| s.longitude),
                product_id,
                shop_id,
                timestamp: tx.timestamp,
                quantity: tx.quantity,
                unit_price: tx.unit_price,
                total_amount: tx.total_amount,
            });
        }

        if !report.is_clean() {
            warn!(
                unmatched_products = report.unmatched_products,
                unmatched_shops = report.unmatched_shops,
                "some transactions have no catalog or shop match"
            );
        }
        info!(
            transactions = rows.len(),
            products = products.len(),
            shops = shops.len(),
            "merged input tables"
        );

        Ok(MergedTable {
            rows,
            products,
            shops,
            join_report: report,
        })
    }

    fn transactions_from_frame(df: &DataFrame) -> Result<Vec<TransactionRecord>> {
        let table = TRANSACTIONS_TABLE;

        let product_ids = text_column(df, table, columns::PRODUCT_ID)?;
        let shop_ids = text_column(df, table, columns::SHOP_ID)?;
        let quantities = text_column(df, table, columns::QUANTITY)?;
        let unit_prices = text_column(df, table, columns::UNIT_PRICE)?;
        let timestamps = if has_column(df, columns::TRANSACTION_TIME) {
            text_column(df, table, columns::TRANSACTION_TIME)?
        } else if has_column(df, columns::YEAR_MONTH) {
            text_column(df, table, columns::YEAR_MONTH)?
        } else {
            return Err(ForecastError::missing_column(table, columns::TRANSACTION_TIME));
        };
        let totals = optional_text_column(df, table, columns::TOTAL_AMOUNT)?;

        let mut records = Vec::with_capacity(df.height());
        for row in 0..df.height() {
            let total_amount = match &totals {
                Some(values) => parse_optional_number(table, columns::TOTAL_AMOUNT, row, &values[row])?,
                None => None,
            };

            records.push(TransactionRecord {
                product_id: product_ids[row].clone().unwrap_or_default(),
                shop_id: shop_ids[row].clone().unwrap_or_default(),
                timestamp: timestamps[row].clone().unwrap_or_default(),
                quantity: parse_number(table, columns::QUANTITY, row, &quantities[row])?,
                unit_price: parse_number(table, columns::UNIT_PRICE, row, &unit_prices[row])?,
                total_amount,
            });
        }

        Ok(records)
    }

    fn products_from_frame(df: &DataFrame) -> Result<Vec<ProductRecord>> {
        let table = PRODUCTS_TABLE;

        let ids = text_column(df, table, columns::PRODUCT_ID)?;
        let names = optional_text_column(df, table, columns::PRODUCT_NAME)?;
        let categories = optional_text_column(df, table, columns::CATEGORY)?;

        let records = ids
            .into_iter()
            .enumerate()
            .filter_map(|(row, id)| {
                Some(ProductRecord {
                    product_id: id?,
                    product_name: cell(&names, row),
                    category: cell(&categories, row),
                })
            })
            .collect();

        Ok(records)
    }

    fn shops_from_frame(df: &DataFrame) -> Result<Vec<ShopRecord>> {
        let table = SHOPS_TABLE;

        let ids = text_column(df, table, columns::SHOP_ID)?;
        let cities = optional_text_column(df, table, columns::CITY)?;
        let latitudes = optional_text_column(df, table, columns::LATITUDE)?;
        let longitudes = optional_text_column(df, table, columns::LONGITUDE)?;

        let mut records = Vec::with_capacity(ids.len());
        for (row, id) in ids.into_iter().enumerate() {
            let Some(shop_id) = id else { continue };
            let latitude = match &latitudes {
                Some(values) => parse_optional_number(table, columns::LATITUDE, row, &values[row])?,
                None => None,
            };
            let longitude = match &longitudes {
                Some(values) => parse_optional_number(table, columns::LONGITUDE, row, &values[row])?,
                None => None,
            };

            records.push(ShopRecord {
                shop_id,
                city: cell(&cities, row),
                latitude,
                longitude,
            });
        }

        Ok(records)
    }
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| *c == name)
}

/// Read a column as trimmed text, blank cells becoming `None`
fn text_column(df: &DataFrame, table: &str, name: &str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(name)
        .map_err(|_| ForecastError::missing_column(table, name))?;
    let text = series.cast(&DataType::Utf8)?;
    let values = text
        .utf8()?
        .into_iter()
        .map(normalize_key)
        .collect();

    Ok(values)
}

fn optional_text_column(
    df: &DataFrame,
    table: &str,
    name: &str,
) -> Result<Option<Vec<Option<String>>>> {
    if has_column(df, name) {
        text_column(df, table, name).map(Some)
    } else {
        Ok(None)
    }
}

fn cell(column: &Option<Vec<Option<String>>>, row: usize) -> Option<String> {
    column.as_ref().and_then(|values| values[row].clone())
}

fn parse_number(table: &str, column: &str, row: usize, raw: &Option<String>) -> Result<f64> {
    parse_optional_number(table, column, row, raw)?.ok_or_else(|| ForecastError::InvalidValue {
        table: table.to_string(),
        column: column.to_string(),
        row,
        value: String::new(),
    })
}

fn parse_optional_number(
    table: &str,
    column: &str,
    row: usize,
    raw: &Option<String>,
) -> Result<Option<f64>> {
    let Some(text) = raw else {
        return Ok(None);
    };

    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(ForecastError::InvalidValue {
            table: table.to_string(),
            column: column.to_string(),
            row,
            value: text.clone(),
        }),
    }
}
