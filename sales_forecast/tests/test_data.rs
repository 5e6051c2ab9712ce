mod common;

use pretty_assertions::assert_eq;
use rstest::rstest;
use sales_forecast::data::{DataLoader, ProductRecord, RawTables, ShopRecord, TransactionRecord};
use sales_forecast::error::ForecastError;
use std::fs;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

#[test]
fn test_data_loader_from_csv() {
    let dir = tempdir().unwrap();
    let (transactions, products, shops) = common::write_sample_csvs(dir.path());

    let merged = DataLoader::from_csv(&transactions, &products, &shops).unwrap();

    assert_eq!(merged.len(), 96);
    assert!(merged.join_report().is_clean());

    let first = &merged.rows()[0];
    assert_eq!(first.product_id, "P1");
    assert_eq!(first.category.as_deref(), Some("Beverages"));
    assert_eq!(first.city.as_deref(), Some("Colombo"));
    assert_eq!(first.latitude, Some(6.93));
    assert_eq!(merged.products().len(), 3);
    assert_eq!(merged.shops().len(), 2);
}

#[test]
fn test_left_join_keeps_unmatched_rows() {
    let tables = RawTables {
        transactions: vec![
            TransactionRecord::new("P1", "S1", "2023-01-01", 1.0, 5.0),
            TransactionRecord::new("P9", "S1", "2023-01-02", 2.0, 5.0),
            TransactionRecord::new("P1", "S9", "2023-01-03", 3.0, 5.0),
        ],
        products: vec![ProductRecord::new("P1", "Tea", "Beverages")],
        shops: vec![ShopRecord::new("S1", "Colombo")],
    };

    let merged = DataLoader::merge(tables).unwrap();

    assert_eq!(merged.len(), 3);
    let report = merged.join_report();
    assert_eq!(report.unmatched_products, 1);
    assert_eq!(report.unmatched_shops, 1);
    assert!(!report.is_clean());

    assert_eq!(merged.rows()[1].category, None);
    assert_eq!(merged.rows()[1].city.as_deref(), Some("Colombo"));
    assert_eq!(merged.rows()[2].city, None);
}

#[test]
fn test_join_keys_are_trimmed() {
    let tables = RawTables {
        transactions: vec![TransactionRecord::new(" P1 ", "S1  ", "2023-01-01", 1.0, 5.0)],
        products: vec![ProductRecord::new("P1", "Tea", "Beverages")],
        shops: vec![ShopRecord::new(" S1", "Colombo")],
    };

    let merged = DataLoader::merge(tables).unwrap();

    assert!(merged.join_report().is_clean());
    assert_eq!(merged.rows()[0].product_id, "P1");
    assert_eq!(merged.rows()[0].shop_id, "S1");
}

#[test]
fn test_duplicate_catalog_keys_first_wins() {
    let tables = RawTables {
        transactions: vec![TransactionRecord::new("P1", "S1", "2023-01-01", 1.0, 5.0)],
        products: vec![
            ProductRecord::new("P1", "Tea", "Beverages"),
            ProductRecord::new("P1", "Tea (old)", "Groceries"),
        ],
        shops: vec![ShopRecord::new("S1", "Colombo")],
    };

    let merged = DataLoader::merge(tables).unwrap();
    assert_eq!(merged.rows()[0].category.as_deref(), Some("Beverages"));
}

#[test]
fn test_missing_column_is_reported() {
    let dir = tempdir().unwrap();
    let (transactions, products, shops) = common::write_sample_csvs(dir.path());
    fs::write(&transactions, "product_id,shop_id,transaction_time,unit_price\nP1,S1,2023-01-01,5\n")
        .unwrap();

    let err = DataLoader::from_csv(&transactions, &products, &shops).unwrap_err();
    match err {
        ForecastError::MissingColumn { table, column } => {
            assert_eq!(table, "transactions");
            assert_eq!(column, "quantity");
        }
        other => panic!("Expected MissingColumn, got {other:?}"),
    }
}

#[rstest]
#[case::products("products", "product_name,category\nTea,Beverages\n", "product_id")]
#[case::shops("shops", "city,latitude,longitude\nColombo,6.93,79.85\n", "shop_id")]
fn test_missing_catalog_key_is_reported(
    #[case] missing_table: &str,
    #[case] contents: &str,
    #[case] missing_column: &str,
) {
    let dir = tempdir().unwrap();
    let (transactions, products, shops) = common::write_sample_csvs(dir.path());
    let target = if missing_table == "products" { &products } else { &shops };
    fs::write(target, contents).unwrap();

    let err = DataLoader::from_csv(&transactions, &products, &shops).unwrap_err();
    match err {
        ForecastError::MissingColumn { table, column } => {
            assert_eq!(table, missing_table);
            assert_eq!(column, missing_column);
        }
        other => panic!("Expected MissingColumn, got {other:?}"),
    }
}

#[test]
fn test_year_month_column_replaces_timestamp() {
    let dir = tempdir().unwrap();
    let (transactions, products, shops) = common::write_sample_csvs(dir.path());
    fs::write(&transactions, "product_id,shop_id,year_month,quantity,unit_price\nP1,S1,2023-04,3,5\n")
        .unwrap();

    let merged = DataLoader::from_csv(&transactions, &products, &shops).unwrap();
    assert_eq!(merged.rows()[0].timestamp, "2023-04");
}

#[test]
fn test_non_numeric_quantity_is_fatal() {
    let dir = tempdir().unwrap();
    let (transactions, products, shops) = common::write_sample_csvs(dir.path());
    fs::write(
        &transactions,
        "product_id,shop_id,transaction_time,quantity,unit_price\nP1,S1,2023-01-01,3,5\nP1,S1,2023-01-02,many,5\n",
    )
    .unwrap();

    let err = DataLoader::from_csv(&transactions, &products, &shops).unwrap_err();
    match err {
        ForecastError::InvalidValue { column, row, value, .. } => {
            assert_eq!(column, "quantity");
            assert_eq!(row, 1);
            assert_eq!(value, "many");
        }
        other => panic!("Expected InvalidValue, got {other:?}"),
    }
}

#[test]
fn test_data_loader_error_handling() {
    let result = DataLoader::read_csv("nonexistent_file.csv");
    assert!(matches!(result, Err(ForecastError::IoError(_))));

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "sku,store").unwrap();
    writeln!(file, "A,B").unwrap();
    let df = DataLoader::read_csv(file.path()).unwrap();
    assert_eq!(df.height(), 1);
}
