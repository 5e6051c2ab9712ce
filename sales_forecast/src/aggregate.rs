//! Monthly aggregation of transaction rows
//!
//! Collapses the merged transaction table into one row per
//! (product, shop, calendar month). Output rows are sorted by
//! `(product_id, shop_id, year_month)`, which the feature builder relies on.

use crate::calendar::{parse_year_month, YearMonth};
use crate::data::{MergedTable, MergedTransaction};
use crate::error::{ForecastError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// One (product, shop, month) observation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPanelRow {
    pub product_id: String,
    pub shop_id: String,
    pub year_month: YearMonth,
    /// Sum of quantity sold in the month
    pub monthly_quantity: f64,
    /// Mean unit price over the month's transactions
    pub avg_price: f64,
    pub category: Option<String>,
    pub city: Option<String>,
    /// Number of transactions folded into this row
    pub transactions: usize,
}

/// Row counts from an aggregation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregationReport {
    pub input_rows: usize,
    /// Transactions excluded because their timestamp could not be parsed
    pub skipped_timestamps: usize,
    pub panel_rows: usize,
}

/// Sorted monthly panel
#[derive(Debug, Clone)]
pub struct MonthlyPanel {
    rows: Vec<MonthlyPanelRow>,
    report: AggregationReport,
}

impl MonthlyPanelRow {
    /// The (product, shop, month) key
    pub fn key(&self) -> (&str, &str, YearMonth) {
        (&self.product_id, &self.shop_id, self.year_month)
    }
}

impl MonthlyPanel {
    /// Build a panel from rows produced elsewhere
    ///
    /// Rows are sorted into panel order; a repeated key is rejected.
    pub fn from_rows(mut rows: Vec<MonthlyPanelRow>) -> Result<Self> {
        rows.sort_by(|a, b| a.key().cmp(&b.key()));
        if let Some(pair) = rows.windows(2).find(|pair| pair[0].key() == pair[1].key()) {
            let (product, shop, month) = pair[0].key();
            return Err(ForecastError::InvalidParameter(format!(
                "Duplicate panel key ({}, {}, {})",
                product, shop, month
            )));
        }

        let report = AggregationReport {
            input_rows: rows.len(),
            skipped_timestamps: 0,
            panel_rows: rows.len(),
        };
        Ok(Self { rows, report })
    }

    pub fn rows(&self) -> &[MonthlyPanelRow] {
        &self.rows
    }

    pub fn report(&self) -> AggregationReport {
        self.report
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Default)]
struct MonthAccumulator {
    quantity: f64,
    price_sum: f64,
    count: usize,
    category: Option<String>,
    city: Option<String>,
}

/// Groups transactions into the monthly panel
#[derive(Debug)]
pub struct MonthlyAggregator;

impl MonthlyAggregator {
    /// Aggregate a merged table
    pub fn aggregate(table: &MergedTable) -> MonthlyPanel {
        Self::aggregate_rows(table.rows())
    }

    /// Aggregate a slice of merged transactions
    pub fn aggregate_rows(rows: &[MergedTransaction]) -> MonthlyPanel {
        let mut groups: BTreeMap<(String, String, YearMonth), MonthAccumulator> = BTreeMap::new();
        let mut skipped = 0;

        for row in rows {
            let Some(year_month) = parse_year_month(&row.timestamp) else {
                skipped += 1;
                continue;
            };

            let acc = groups
                .entry((row.product_id.clone(), row.shop_id.clone(), year_month))
                .or_default();
            acc.quantity += row.quantity;
            acc.price_sum += row.unit_price;
            acc.count += 1;
            // Static attributes come from the first row that carries them
            if acc.category.is_none() {
                acc.category = row.category.clone();
            }
            if acc.city.is_none() {
                acc.city = row.city.clone();
            }
        }

        let panel_rows: Vec<MonthlyPanelRow> = groups
            .into_iter()
            .map(|((product_id, shop_id, year_month), acc)| MonthlyPanelRow {
                product_id,
                shop_id,
                year_month,
                monthly_quantity: acc.quantity,
                avg_price: acc.price_sum / acc.count as f64,
                category: acc.category,
                city: acc.city,
                transactions: acc.count,
            })
            .collect();

        let report = AggregationReport {
            input_rows: rows.len(),
            skipped_timestamps: skipped,
            panel_rows: panel_rows.len(),
        };

        if skipped > 0 {
            warn!(skipped, "excluded transactions with unparseable timestamps");
        }
        info!(
            input_rows = report.input_rows,
            panel_rows = report.panel_rows,
            "aggregated monthly panel"
        );

        MonthlyPanel {
            rows: panel_rows,
            report,
        }
    }
}
