//! # Retail Forecast
//!
//! Workspace facade re-exporting the forecasting crates.
//!
//! - [`sales_forecast`]: loading, aggregation, features, model, scenarios, metrics
//! - [`panel_math`]: lag windows and descriptive statistics used by the panel
//!
//! ## Example
//!
//! ```
//! use retail_forecast_workspace::panel_math::windows::LagWindow;
//!
//! let mut window = LagWindow::new(3).unwrap();
//! window.push(10.0);
//! window.push(12.0);
//! assert_eq!(window.lag(1), Some(12.0));
//! assert_eq!(window.lag(2), Some(10.0));
//! assert_eq!(window.lag(3), None);
//! ```

pub use panel_math;
pub use sales_forecast;
