//! Bulk prediction table and its delimited-text form

use crate::calendar::YearMonth;
use crate::error::{ForecastError, Result};
use crate::features::FeaturePanel;
use crate::models::{FittedRegressor, ForecastModel};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

/// Actual and predicted quantity for one panel row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub product_id: String,
    pub shop_id: String,
    pub year_month: YearMonth,
    pub monthly_quantity: f64,
    pub predicted_quantity: f64,
}

/// Predictions over the training view of a panel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionTable {
    records: Vec<PredictionRecord>,
}

impl PredictionTable {
    /// Predict every training row of `panel`
    pub fn from_model<F: FittedRegressor>(
        model: &ForecastModel<F>,
        panel: &FeaturePanel,
    ) -> Result<Self> {
        let (matrix, actuals) = panel.training_matrix(model.feature_columns())?;
        let predictions = model.predict_batch(&matrix)?;

        let records = panel
            .training_rows()
            .into_iter()
            .zip(actuals.into_iter().zip(predictions))
            .map(|(row, (actual, predicted))| PredictionRecord {
                product_id: row.product_id().to_string(),
                shop_id: row.shop_id().to_string(),
                year_month: row.year_month(),
                monthly_quantity: actual,
                predicted_quantity: predicted,
            })
            .collect();

        Ok(Self { records })
    }

    pub fn from_records(records: Vec<PredictionRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[PredictionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn actuals(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.monthly_quantity).collect()
    }

    pub fn predictions(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.predicted_quantity).collect()
    }

    /// Write the table with a header row
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| ForecastError::CsvError(format!("Exported text is not UTF-8: {}", e)))
    }

    pub fn write_csv_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        self.write_csv(file)?;
        info!(
            path = %path.as_ref().display(),
            rows = self.records.len(),
            "exported predictions"
        );
        Ok(())
    }

    /// Parse a table previously written by [`PredictionTable::write_csv`]
    pub fn read_csv<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let records = reader
            .deserialize()
            .collect::<std::result::Result<Vec<PredictionRecord>, csv::Error>>()?;
        Ok(Self { records })
    }

    pub fn read_csv_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read_csv(File::open(path)?)
    }

    /// Columnar view for downstream analysis
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let products: Vec<&str> = self.records.iter().map(|r| r.product_id.as_str()).collect();
        let shops: Vec<&str> = self.records.iter().map(|r| r.shop_id.as_str()).collect();
        let months: Vec<String> = self.records.iter().map(|r| r.year_month.to_string()).collect();

        let df = DataFrame::new(vec![
            Series::new("product_id", products),
            Series::new("shop_id", shops),
            Series::new("year_month", months),
            Series::new("monthly_quantity", self.actuals()),
            Series::new("predicted_quantity", self.predictions()),
        ])?;
        Ok(df)
    }
}
