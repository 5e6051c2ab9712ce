//! # Sales Forecast
//!
//! A Rust library for forecasting monthly product sales per shop from retail
//! transaction data.
//!
//! ## Features
//!
//! - Loading and left-joining transactions, products and shops (CSV or DataFrames)
//! - Monthly aggregation into a (product, shop, month) panel
//! - Lag, trend, price and calendar features with explicit categorical encoding
//! - Random forest regression with next-month predictions and feature importances
//! - What-if scenarios over price, marketing and season
//! - Regression metrics, holdout evaluation and prediction export
//! - Read-only market analytics (rankings, seasonality, price sensitivity)
//!
//! ## Pipeline
//!
//! Every stage returns a new value and leaves its input untouched:
//!
//! ```text
//! MergedTable -> MonthlyPanel -> FeaturePanel -> ForecastModel
//! ```
//!
//! [`ForecastSession`] runs the stages once and keeps the results together.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sales_forecast::config::PipelineConfig;
//! use sales_forecast::scenario::{ScenarioInput, Season};
//! use sales_forecast::ForecastSession;
//!
//! let session = ForecastSession::from_csv(
//!     "transactions.csv",
//!     "products.csv",
//!     "shops.csv",
//!     PipelineConfig::default(),
//! )?;
//!
//! // Next month for one product in one shop
//! let prediction = session.predict_next("P1", "S1")?;
//! println!("{:?}", prediction.predicted_quantity);
//!
//! // Cut the price by 10% during the holidays
//! let input = ScenarioInput::new(-10.0, 0.0, Season::Holiday);
//! if let Some(outcome) = session.simulate("P1", "S1", &input)? {
//!     println!("delta: {:.2}", outcome.delta());
//! }
//!
//! println!("{}", session.in_sample_metrics()?);
//! # Ok::<(), sales_forecast::ForecastError>(())
//! ```

pub mod aggregate;
pub mod analytics;
pub mod calendar;
pub mod config;
pub mod data;
pub mod encoding;
pub mod error;
pub mod export;
pub mod features;
pub mod metrics;
pub mod models;
pub mod scenario;
pub mod session;
pub mod utils;

// Re-export commonly used types
pub use crate::aggregate::{MonthlyAggregator, MonthlyPanel};
pub use crate::data::{DataLoader, MergedTable};
pub use crate::error::ForecastError;
pub use crate::features::{FeatureBuilder, FeatureColumn, FeaturePanel};
pub use crate::models::{ForecastModel, PredictionResult, PredictionStatus};
pub use crate::session::ForecastSession;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
