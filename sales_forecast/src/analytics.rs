//! Read-only market analytics
//!
//! Summaries and rankings computed from the merged table and the monthly
//! panel. None of these touch the model.

use crate::aggregate::{MonthlyPanel, MonthlyPanelRow};
use crate::data::{MergedTable, MergedTransaction, ShopRecord};
use crate::features::{FeatureColumn, FeaturePanel};
use crate::utils::mean_of;
use panel_math::stats::{pearson_correlation, sample_std_dev};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Headline counts for a loaded dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub total_revenue: f64,
    pub transactions: usize,
    pub unique_products: usize,
    pub unique_categories: usize,
    pub unique_shops: usize,
    pub unique_cities: usize,
}

/// An id ranked by mean monthly quantity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub id: String,
    pub mean_quantity: f64,
}

/// Mean monthly quantity for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyProfile {
    pub month: u32,
    pub mean_quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: String,
    pub mean_quantity: f64,
    pub total_quantity: f64,
    pub mean_price: f64,
}

/// Total quantity of one shop with its location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShopSales {
    pub shop_id: String,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub total_quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductProfile {
    pub product_id: String,
    pub mean_quantity: f64,
    /// Sample standard deviation; `None` with a single month
    pub std_quantity: Option<f64>,
    pub mean_price: f64,
}

/// Pairwise Pearson correlations
///
/// Entries are `None` where a series is constant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == a)?;
        let j = self.labels.iter().position(|l| l == b)?;
        self.values[i][j]
    }
}

/// Sales estimate for a product that is not on the market yet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchEstimate {
    pub category: String,
    pub city: String,
    pub expected_price: f64,
    pub predicted_quantity: f64,
    /// False when no history exists in the city and the whole category was used
    pub matched_city: bool,
}

pub fn dataset_summary(merged: &MergedTable) -> DatasetSummary {
    let total_revenue = merged
        .rows()
        .iter()
        .map(|r| r.total_amount.unwrap_or(r.quantity * r.unit_price))
        .sum();

    let categories: BTreeSet<&str> = merged
        .products()
        .iter()
        .filter_map(|p| p.category.as_deref())
        .collect();
    let shops: BTreeSet<&str> = merged.shops().iter().map(|s| s.shop_id.as_str()).collect();
    let products: BTreeSet<&str> = merged
        .products()
        .iter()
        .map(|p| p.product_id.as_str())
        .collect();
    let cities: BTreeSet<&str> = merged
        .shops()
        .iter()
        .filter_map(|s| s.city.as_deref())
        .collect();

    DatasetSummary {
        total_revenue,
        transactions: merged.len(),
        unique_products: products.len(),
        unique_categories: categories.len(),
        unique_shops: shops.len(),
        unique_cities: cities.len(),
    }
}

/// Best-selling products of a category within one shop
pub fn top_products_in_category(
    panel: &MonthlyPanel,
    shop_id: &str,
    category: &str,
    top_n: usize,
) -> Vec<RankedEntry> {
    let rows = panel
        .rows()
        .iter()
        .filter(|r| r.shop_id == shop_id && r.category.as_deref() == Some(category));
    rank_by_mean(rows.map(|r| (r.product_id.as_str(), r.monthly_quantity)), top_n)
}

/// Shops selling the most of one product
pub fn top_shops_for_product(panel: &MonthlyPanel, product_id: &str, top_n: usize) -> Vec<RankedEntry> {
    let rows = panel.rows().iter().filter(|r| r.product_id == product_id);
    rank_by_mean(rows.map(|r| (r.shop_id.as_str(), r.monthly_quantity)), top_n)
}

/// Mean monthly quantity per calendar month, optionally for one category
pub fn seasonality(panel: &MonthlyPanel, category: Option<&str>) -> Vec<MonthlyProfile> {
    let mut by_month: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for row in panel.rows() {
        if category.is_some_and(|c| row.category.as_deref() != Some(c)) {
            continue;
        }
        by_month
            .entry(row.year_month.month())
            .or_default()
            .push(row.monthly_quantity);
    }

    by_month
        .into_iter()
        .filter_map(|(month, quantities)| {
            Some(MonthlyProfile {
                month,
                mean_quantity: mean_of(&quantities)?,
            })
        })
        .collect()
}

/// Per-category quantities and price, largest total first
///
/// Rows without a category are left out.
pub fn category_summary(panel: &MonthlyPanel) -> Vec<CategorySummary> {
    let mut groups: BTreeMap<&str, Vec<&MonthlyPanelRow>> = BTreeMap::new();
    for row in panel.rows() {
        if let Some(category) = row.category.as_deref() {
            groups.entry(category).or_default().push(row);
        }
    }

    let mut summaries: Vec<CategorySummary> = groups
        .into_iter()
        .filter_map(|(category, rows)| {
            let quantities: Vec<f64> = rows.iter().map(|r| r.monthly_quantity).collect();
            let prices: Vec<f64> = rows.iter().map(|r| r.avg_price).collect();
            Some(CategorySummary {
                category: category.to_string(),
                mean_quantity: mean_of(&quantities)?,
                total_quantity: quantities.iter().sum(),
                mean_price: mean_of(&prices)?,
            })
        })
        .collect();

    summaries.sort_by(|a, b| b.total_quantity.total_cmp(&a.total_quantity));
    summaries
}

/// Total quantity per shop joined with the shop table, largest first
pub fn sales_by_shop(panel: &MonthlyPanel, shops: &[ShopRecord]) -> Vec<ShopSales> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for row in panel.rows() {
        *totals.entry(row.shop_id.as_str()).or_insert(0.0) += row.monthly_quantity;
    }

    let mut sales: Vec<ShopSales> = totals
        .into_iter()
        .map(|(shop_id, total_quantity)| {
            let shop = shops.iter().find(|s| s.shop_id == shop_id);
            ShopSales {
                shop_id: shop_id.to_string(),
                city: shop.and_then(|s| s.city.clone()),
                latitude: shop.and_then(|s| s.latitude),
                longitude: shop.and_then(|s| s.longitude),
                total_quantity,
            }
        })
        .collect();

    sales.sort_by(|a, b| b.total_quantity.total_cmp(&a.total_quantity));
    sales
}

/// Quantity and price profile of every product, by id
pub fn product_profiles(panel: &MonthlyPanel) -> Vec<ProductProfile> {
    let mut groups: BTreeMap<&str, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for row in panel.rows() {
        let (quantities, prices) = groups.entry(row.product_id.as_str()).or_default();
        quantities.push(row.monthly_quantity);
        prices.push(row.avg_price);
    }

    groups
        .into_iter()
        .filter_map(|(product_id, (quantities, prices))| {
            Some(ProductProfile {
                product_id: product_id.to_string(),
                mean_quantity: mean_of(&quantities)?,
                std_quantity: sample_std_dev(&quantities).ok(),
                mean_price: mean_of(&prices)?,
            })
        })
        .collect()
}

/// Correlations among `columns` and `monthly_quantity` over the training view
pub fn feature_correlations(panel: &FeaturePanel, columns: &[FeatureColumn]) -> CorrelationMatrix {
    let training = panel.training_rows();

    let mut labels: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();
    let mut series: Vec<Vec<f64>> = columns
        .iter()
        .map(|&c| {
            training
                .iter()
                .map(|r| r.value(c).unwrap_or(crate::features::UNDEFINED_FEATURE_DEFAULT))
                .collect()
        })
        .collect();
    labels.push("monthly_quantity".to_string());
    series.push(training.iter().map(|r| r.base.monthly_quantity).collect());

    let values = series
        .iter()
        .map(|a| {
            series
                .iter()
                .map(|b| pearson_correlation(a, b).ok())
                .collect()
        })
        .collect();

    CorrelationMatrix { labels, values }
}

/// Expected mean quantity per transaction of a product at a new price
///
/// The product is matched on its trimmed `product_id`, not on its display
/// name, so products sharing a name are never pooled.
/// `None` when the product has no transactions or its mean price is zero.
pub fn price_sensitivity(
    merged: &MergedTable,
    product_id: &str,
    new_price: f64,
    elasticity: f64,
) -> Option<f64> {
    let rows: Vec<&MergedTransaction> = merged
        .rows()
        .iter()
        .filter(|r| r.product_id == product_id)
        .collect();
    elastic_estimate(&rows, new_price, elasticity)
}

/// Estimate sales of a new product from its category in a city
///
/// Falls back to the whole category when the city has no history for it.
pub fn new_launch_estimate(
    merged: &MergedTable,
    category: &str,
    city: &str,
    price: f64,
    elasticity: f64,
) -> Option<LaunchEstimate> {
    let in_category: Vec<&MergedTransaction> = merged
        .rows()
        .iter()
        .filter(|r| r.category.as_deref() == Some(category))
        .collect();
    let in_city: Vec<&MergedTransaction> = in_category
        .iter()
        .copied()
        .filter(|r| r.city.as_deref() == Some(city))
        .collect();

    let (subset, matched_city) = if in_city.is_empty() {
        (in_category, false)
    } else {
        (in_city, true)
    };

    Some(LaunchEstimate {
        category: category.to_string(),
        city: city.to_string(),
        expected_price: price,
        predicted_quantity: elastic_estimate(&subset, price, elasticity)?,
        matched_city,
    })
}

fn elastic_estimate(rows: &[&MergedTransaction], price: f64, elasticity: f64) -> Option<f64> {
    let quantities: Vec<f64> = rows.iter().map(|r| r.quantity).collect();
    let prices: Vec<f64> = rows.iter().map(|r| r.unit_price).collect();
    let avg_quantity = mean_of(&quantities)?;
    let avg_price = mean_of(&prices)?;
    if avg_price == 0.0 {
        return None;
    }

    let pct_change = (price - avg_price) / avg_price;
    Some((avg_quantity * (1.0 + elasticity * pct_change)).max(0.0))
}

fn rank_by_mean<'a>(values: impl Iterator<Item = (&'a str, f64)>, top_n: usize) -> Vec<RankedEntry> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for (id, value) in values {
        groups.entry(id).or_default().push(value);
    }

    let mut ranked: Vec<RankedEntry> = groups
        .into_iter()
        .filter_map(|(id, values)| {
            Some(RankedEntry {
                id: id.to_string(),
                mean_quantity: mean_of(&values)?,
            })
        })
        .collect();

    // Stable sort keeps ids ascending among ties
    ranked.sort_by(|a, b| b.mean_quantity.total_cmp(&a.mean_quantity));
    ranked.truncate(top_n);
    ranked
}
