//! Feature engineering over the monthly panel
//!
//! [`FeatureBuilder::build`] walks each (product, shop) series in month order
//! and derives lag, trend, price and calendar features. The monthly panel it
//! reads is left untouched; the result is a new [`FeaturePanel`].
//!
//! Lag features are undefined for the first rows of every series. Those rows
//! stay in the panel for lookups and analytics but are excluded from the
//! training view.

use crate::aggregate::{MonthlyPanel, MonthlyPanelRow};
use crate::calendar::{SeasonCalendar, YearMonth};
use crate::encoding::CategoricalEncoder;
use crate::error::{ForecastError, Result};
use panel_math::windows::{ExpandingMean, LagWindow};
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Number of monthly lags carried by each row
pub const LAG_DEPTH: usize = 3;

/// Value substituted for undefined features outside the training view
pub const UNDEFINED_FEATURE_DEFAULT: f64 = 0.0;

/// Named model input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureColumn {
    LastMonthQty,
    Last2MonthsQty,
    Last3MonthsQty,
    AvgLast3Months,
    Trend,
    PriceDifference,
    IsHolidayMonth,
    IsSummer,
    CategoryCode,
    CityCode,
}

/// Feature ordering used when the caller does not choose one
pub const DEFAULT_FEATURES: [FeatureColumn; 10] = [
    FeatureColumn::LastMonthQty,
    FeatureColumn::Last2MonthsQty,
    FeatureColumn::Last3MonthsQty,
    FeatureColumn::AvgLast3Months,
    FeatureColumn::Trend,
    FeatureColumn::PriceDifference,
    FeatureColumn::IsHolidayMonth,
    FeatureColumn::IsSummer,
    FeatureColumn::CategoryCode,
    FeatureColumn::CityCode,
];

impl FeatureColumn {
    pub fn name(&self) -> &'static str {
        match self {
            FeatureColumn::LastMonthQty => "last_month_qty",
            FeatureColumn::Last2MonthsQty => "last_2_months_qty",
            FeatureColumn::Last3MonthsQty => "last_3_months_qty",
            FeatureColumn::AvgLast3Months => "avg_last_3_months",
            FeatureColumn::Trend => "trend",
            FeatureColumn::PriceDifference => "price_difference",
            FeatureColumn::IsHolidayMonth => "is_holiday_month",
            FeatureColumn::IsSummer => "is_summer",
            FeatureColumn::CategoryCode => "category_code",
            FeatureColumn::CityCode => "city_code",
        }
    }
}

impl fmt::Display for FeatureColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for FeatureColumn {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl FromStr for FeatureColumn {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        DEFAULT_FEATURES
            .iter()
            .copied()
            .find(|c| c.name() == s.trim())
            .ok_or_else(|| ForecastError::InvalidParameter(format!("Unknown feature {:?}", s)))
    }
}

/// Render a column list as `[a, b, c]`
pub(crate) fn column_list(columns: &[FeatureColumn]) -> String {
    let names: Vec<&str> = columns.iter().map(FeatureColumn::name).collect();
    format!("[{}]", names.join(", "))
}

/// A monthly panel row with its derived features
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    #[serde(flatten)]
    pub base: MonthlyPanelRow,
    pub last_month_qty: Option<f64>,
    pub last_2_months_qty: Option<f64>,
    pub last_3_months_qty: Option<f64>,
    /// Mean of the lags that are defined
    pub avg_last_3_months: Option<f64>,
    /// `last_month_qty - last_3_months_qty`
    pub trend: Option<f64>,
    /// Current price minus the series' expanding mean price
    pub price_difference: f64,
    pub is_holiday_month: bool,
    pub is_summer: bool,
    pub category_code: i64,
    pub city_code: i64,
}

impl FeatureRow {
    pub fn product_id(&self) -> &str {
        &self.base.product_id
    }

    pub fn shop_id(&self) -> &str {
        &self.base.shop_id
    }

    pub fn year_month(&self) -> YearMonth {
        self.base.year_month
    }

    /// Value of one feature, `None` when undefined for this row
    pub fn value(&self, column: FeatureColumn) -> Option<f64> {
        match column {
            FeatureColumn::LastMonthQty => self.last_month_qty,
            FeatureColumn::Last2MonthsQty => self.last_2_months_qty,
            FeatureColumn::Last3MonthsQty => self.last_3_months_qty,
            FeatureColumn::AvgLast3Months => self.avg_last_3_months,
            FeatureColumn::Trend => self.trend,
            FeatureColumn::PriceDifference => Some(self.price_difference),
            FeatureColumn::IsHolidayMonth => Some(flag(self.is_holiday_month)),
            FeatureColumn::IsSummer => Some(flag(self.is_summer)),
            FeatureColumn::CategoryCode => Some(self.category_code as f64),
            FeatureColumn::CityCode => Some(self.city_code as f64),
        }
    }

    /// True when every lag is defined, i.e. the row may be used for training
    pub fn has_all_lags(&self) -> bool {
        self.last_month_qty.is_some()
            && self.last_2_months_qty.is_some()
            && self.last_3_months_qty.is_some()
    }

    /// Strict feature vector; fails if any requested feature is undefined
    pub fn vector(&self, columns: &[FeatureColumn]) -> Result<FeatureVector> {
        let values = columns
            .iter()
            .map(|&column| {
                self.value(column).ok_or_else(|| {
                    ForecastError::FeatureMismatch(format!(
                        "{} is undefined for ({}, {}, {})",
                        column,
                        self.product_id(),
                        self.shop_id(),
                        self.year_month()
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        Ok(FeatureVector {
            columns: columns.to_vec(),
            values,
        })
    }

    /// Feature vector with undefined features replaced by the default
    pub fn vector_with_defaults(&self, columns: &[FeatureColumn]) -> FeatureVector {
        let values = columns
            .iter()
            .map(|&column| self.value(column).unwrap_or(UNDEFINED_FEATURE_DEFAULT))
            .collect();

        FeatureVector {
            columns: columns.to_vec(),
            values,
        }
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Ordered, named numeric model input
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    columns: Vec<FeatureColumn>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn new(columns: Vec<FeatureColumn>, values: Vec<f64>) -> Result<Self> {
        if columns.len() != values.len() {
            return Err(ForecastError::FeatureMismatch(format!(
                "{} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, column: FeatureColumn) -> Option<f64> {
        self.position(column).map(|i| self.values[i])
    }

    /// Overwrite one feature; returns false when the vector lacks the column
    pub fn set(&mut self, column: FeatureColumn, value: f64) -> bool {
        match self.position(column) {
            Some(i) => {
                self.values[i] = value;
                true
            }
            None => false,
        }
    }

    fn position(&self, column: FeatureColumn) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }
}

/// Row-major block of feature vectors sharing one column ordering
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<FeatureColumn>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn new(columns: Vec<FeatureColumn>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some(bad) = rows.iter().position(|r| r.len() != columns.len()) {
            return Err(ForecastError::FeatureMismatch(format!(
                "Row {} has {} values, expected {}",
                bad,
                rows[bad].len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Copy one row out as a standalone vector
    pub fn row_vector(&self, index: usize) -> Option<FeatureVector> {
        self.rows.get(index).map(|values| FeatureVector {
            columns: self.columns.clone(),
            values: values.clone(),
        })
    }
}

/// The monthly panel enriched with features
#[derive(Debug, Clone)]
pub struct FeaturePanel {
    rows: Vec<FeatureRow>,
    category_encoder: CategoricalEncoder,
    city_encoder: CategoricalEncoder,
}

impl FeaturePanel {
    /// All rows, including those with undefined lags
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Rows eligible for training: every lag defined
    pub fn training_rows(&self) -> Vec<&FeatureRow> {
        self.rows.iter().filter(|r| r.has_all_lags()).collect()
    }

    pub fn category_encoder(&self) -> &CategoricalEncoder {
        &self.category_encoder
    }

    pub fn city_encoder(&self) -> &CategoricalEncoder {
        &self.city_encoder
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows of one (product, shop) series in month order
    pub fn series(&self, product_id: &str, shop_id: &str) -> Vec<&FeatureRow> {
        self.rows
            .iter()
            .filter(|r| r.product_id() == product_id && r.shop_id() == shop_id)
            .collect()
    }

    /// Most recent row of a (product, shop) series
    pub fn latest_row(&self, product_id: &str, shop_id: &str) -> Option<&FeatureRow> {
        self.rows
            .iter()
            .filter(|r| r.product_id() == product_id && r.shop_id() == shop_id)
            .max_by_key(|r| r.year_month())
    }

    /// Matrix over every row, undefined features defaulted
    pub fn matrix(&self, columns: &[FeatureColumn]) -> FeatureMatrix {
        FeatureMatrix {
            columns: columns.to_vec(),
            rows: self
                .rows
                .iter()
                .map(|r| r.vector_with_defaults(columns).values)
                .collect(),
        }
    }

    /// Matrix and targets over the training view
    pub fn training_matrix(&self, columns: &[FeatureColumn]) -> Result<(FeatureMatrix, Vec<f64>)> {
        let training = self.training_rows();
        let mut rows = Vec::with_capacity(training.len());
        let mut targets = Vec::with_capacity(training.len());
        for row in training {
            rows.push(row.vector(columns)?.values);
            targets.push(row.base.monthly_quantity);
        }

        Ok((
            FeatureMatrix {
                columns: columns.to_vec(),
                rows,
            },
            targets,
        ))
    }

    /// Distinct months present in the panel, ascending
    pub fn months(&self) -> Vec<YearMonth> {
        self.rows
            .iter()
            .map(|r| r.year_month())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Split off the most recent `holdout_months` distinct months
    ///
    /// Both halves keep the encoders of the full panel so codes line up.
    pub fn split_holdout(&self, holdout_months: usize) -> Result<(FeaturePanel, FeaturePanel)> {
        let months = self.months();
        if holdout_months == 0 || holdout_months >= months.len() {
            return Err(ForecastError::InsufficientData(format!(
                "Cannot hold out {} of {} months",
                holdout_months,
                months.len()
            )));
        }
        let cutoff = months[months.len() - holdout_months];

        let (test, train): (Vec<FeatureRow>, Vec<FeatureRow>) = self
            .rows
            .iter()
            .cloned()
            .partition(|r| r.year_month() >= cutoff);

        Ok((self.with_rows(train), self.with_rows(test)))
    }

    fn with_rows(&self, rows: Vec<FeatureRow>) -> FeaturePanel {
        FeaturePanel {
            rows,
            category_encoder: self.category_encoder.clone(),
            city_encoder: self.city_encoder.clone(),
        }
    }
}

/// Derives model features from a sorted monthly panel
#[derive(Debug, Clone, Default)]
pub struct FeatureBuilder {
    calendar: SeasonCalendar,
}

impl FeatureBuilder {
    pub fn new(calendar: SeasonCalendar) -> Self {
        Self { calendar }
    }

    /// Build the feature panel
    pub fn build(&self, panel: &MonthlyPanel) -> Result<FeaturePanel> {
        let category_encoder =
            CategoricalEncoder::fit(panel.rows().iter().map(|r| r.category.as_deref()));
        let city_encoder = CategoricalEncoder::fit(panel.rows().iter().map(|r| r.city.as_deref()));

        let mut lags = LagWindow::new(LAG_DEPTH)?;
        let mut price_mean = ExpandingMean::new();
        let mut current: Option<(&str, &str)> = None;
        let mut rows = Vec::with_capacity(panel.len());

        for row in panel.rows() {
            let key = (row.product_id.as_str(), row.shop_id.as_str());
            if current != Some(key) {
                lags.reset();
                price_mean.reset();
                current = Some(key);
            }

            let last_month_qty = lags.lag(1);
            let last_3_months_qty = lags.lag(3);
            let trend = match (last_month_qty, last_3_months_qty) {
                (Some(l1), Some(l3)) => Some(l1 - l3),
                _ => None,
            };

            price_mean.update(row.avg_price);
            let price_difference = row.avg_price - price_mean.value()?;

            rows.push(FeatureRow {
                base: row.clone(),
                last_month_qty,
                last_2_months_qty: lags.lag(2),
                last_3_months_qty,
                avg_last_3_months: lags.mean_available(),
                trend,
                price_difference,
                is_holiday_month: self.calendar.is_holiday(row.year_month),
                is_summer: self.calendar.is_summer(row.year_month),
                category_code: category_encoder.apply(row.category.as_deref()),
                city_code: city_encoder.apply(row.city.as_deref()),
            });

            lags.push(row.monthly_quantity);
        }

        let feature_panel = FeaturePanel {
            rows,
            category_encoder,
            city_encoder,
        };
        info!(
            rows = feature_panel.len(),
            training_rows = feature_panel.training_rows().len(),
            "built feature panel"
        );

        Ok(feature_panel)
    }
}
