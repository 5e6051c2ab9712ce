//! Sales forecast binary
//!
//! Builds a forecasting session from three CSV files and runs one command
//! against it.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sales_forecast::config::PipelineConfig;
use sales_forecast::scenario::{ScenarioInput, Season};
use sales_forecast::{ForecastError, ForecastSession};
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sales_forecast")]
#[command(about = "Monthly product sales forecasting per shop", version)]
struct Args {
    /// Transactions CSV (product_id, shop_id, transaction_time, quantity, unit_price)
    #[arg(long, global = true, default_value = "transactions.csv")]
    transactions: PathBuf,

    /// Products CSV (product_id, product_name, category)
    #[arg(long, global = true, default_value = "products.csv")]
    products: PathBuf,

    /// Shops CSV (shop_id, city, latitude, longitude)
    #[arg(long, global = true, default_value = "shops.csv")]
    shops: PathBuf,

    /// TOML configuration file; defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Dataset summary, model metrics and feature importances
    Report,
    /// Predict next month's quantity for a product in a shop
    Predict {
        #[arg(long)]
        product: String,
        #[arg(long)]
        shop: String,
    },
    /// Compare the baseline prediction with a what-if scenario
    Simulate {
        #[arg(long)]
        product: String,
        #[arg(long)]
        shop: String,
        /// Price change in percent
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        price_change: f64,
        /// Marketing boost, 0 for none
        #[arg(long, default_value_t = 0.0)]
        marketing_boost: f64,
        /// normal, holiday, summer or winter; the month's own season when omitted
        #[arg(long)]
        season: Option<Season>,
    },
    /// Write actual and predicted quantities to a CSV file
    Export {
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("sales_forecast=info".parse()?))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    info!(transactions = %args.transactions.display(), "building forecast session");
    let session = ForecastSession::from_csv(&args.transactions, &args.products, &args.shops, config)
        .context("failed to build forecast session")?;

    match &args.command {
        Command::Report => report(&session, args.json),
        Command::Predict { product, shop } => {
            let prediction = session.predict_next(product, shop)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&prediction)?);
            } else if let (Some(quantity), Some(month), Some((low, high))) = (
                prediction.predicted_quantity,
                prediction.target_month,
                prediction.band,
            ) {
                println!("Prediction for {} in {} ({}):", product, shop, month);
                println!("  Quantity: {:.2}", quantity);
                println!("  Band:     {:.2} - {:.2}", low, high);
            } else {
                println!("No data for product {} in shop {}", product, shop);
            }
            Ok(())
        }
        Command::Simulate {
            product,
            shop,
            price_change,
            marketing_boost,
            season,
        } => {
            let Some(latest) = session.panel().latest_row(product, shop) else {
                bail!("no history for product {} in shop {}", product, shop);
            };
            let season = season.unwrap_or(ScenarioInput::neutral_for(latest).season);
            let input = ScenarioInput::new(*price_change, *marketing_boost, season);

            let Some(outcome) = session.simulate(product, shop, &input)? else {
                bail!("no history for product {} in shop {}", product, shop);
            };
            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "input": input,
                        "outcome": outcome,
                        "delta": outcome.delta(),
                    }))?
                );
            } else {
                println!("Scenario for {} in {} ({}):", product, shop, season);
                println!("  Baseline: {:.2}", outcome.baseline_prediction);
                println!("  Scenario: {:.2}", outcome.scenario_prediction);
                println!("  Change:   {:+.2}", outcome.delta());
            }
            Ok(())
        }
        Command::Export { output } => {
            let table = session.bulk_predictions()?;
            table
                .write_csv_file(output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("Wrote {} predictions to {}", table.len(), output.display());
            Ok(())
        }
    }
}

fn report(session: &ForecastSession, as_json: bool) -> Result<()> {
    let summary = session.summary();
    let in_sample = session.in_sample_metrics()?;
    let holdout = match session.holdout_metrics() {
        Ok(metrics) => Some(metrics),
        Err(ForecastError::InsufficientData(reason)) => {
            warn!(%reason, "skipping holdout evaluation");
            None
        }
        Err(e) => return Err(e.into()),
    };
    let importances = session.feature_importances();

    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "summary": summary,
                "in_sample": in_sample.as_map(),
                "holdout": holdout.map(|m| m.as_map()),
                "feature_importances": importances,
            }))?
        );
        return Ok(());
    }

    let dataset = &summary.dataset;
    println!("Dataset:");
    println!("  Revenue:      {:.2}", dataset.total_revenue);
    println!("  Transactions: {}", dataset.transactions);
    println!(
        "  Products:     {} in {} categories",
        dataset.unique_products, dataset.unique_categories
    );
    println!(
        "  Shops:        {} in {} cities",
        dataset.unique_shops, dataset.unique_cities
    );
    println!(
        "  Panel rows:   {} ({} used for training)",
        summary.panel_rows, summary.training_rows
    );
    println!("Model: {}", summary.model);
    println!();
    println!("In-sample {}", in_sample);
    if let Some(holdout) = holdout {
        println!("Holdout {}", holdout);
    }
    println!("Feature Importances:");
    for entry in importances {
        println!("  {:<20} {:.4}", entry.feature.name(), entry.importance);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "sales_forecast",
            "predict",
            "--product",
            "P1",
            "--shop",
            "S1",
            "--json",
            "--shops",
            "data/shops.csv",
        ])
        .unwrap();

        assert!(args.json);
        assert_eq!(args.shops, PathBuf::from("data/shops.csv"));
        assert_eq!(args.products, PathBuf::from("products.csv"));
        assert!(matches!(args.command, Command::Predict { .. }));
    }
}
