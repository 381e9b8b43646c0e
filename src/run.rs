//! Run orchestration: input -> prices -> plan -> report.

use std::path::Path;

use log::info;

use crate::config::Config;
use crate::engine;
use crate::error::Result;
use crate::fmp::FmpClient;
use crate::input::RebalanceInput;
use crate::normalize::{self, NormalizedInput};
use crate::prices::{PriceSource, PriceTable};
use crate::report::RebalanceReport;

/// Options for a rebalance run.
pub struct RunOptions {
    pub dry_run: bool,
}

/// Execute a full rebalance run against the live quote endpoint.
pub fn run(config: &Config, opts: &RunOptions) -> Result<RebalanceReport> {
    let client = FmpClient::from_config(&config.pricing)?;
    run_with_source(config, opts, &client)
}

/// Run the file-to-file pipeline against any price source.
pub fn run_with_source(
    config: &Config,
    opts: &RunOptions,
    source: &dyn PriceSource,
) -> Result<RebalanceReport> {
    let input = RebalanceInput::load(&config.files.input)?;
    let normalized = normalize::normalize(&input)?;
    info!(
        "Loaded {} with {} assets, deposit {:.2}",
        config.files.input.display(),
        normalized.allocation_bps.len(),
        normalized.deposit_amount
    );

    let report = execute(&normalized, source)?;
    print!("{report}");

    if opts.dry_run {
        println!("\n[DRY RUN] No report written.");
    } else {
        report.write(&config.files.output)?;
        info!("Report written to {}", config.files.output.display());
    }

    Ok(report)
}

/// Compute a rebalance report from normalized input and a price source.
pub fn execute(input: &NormalizedInput, source: &dyn PriceSource) -> Result<RebalanceReport> {
    let symbols = input.priced_symbols();
    info!("Fetching quotes for {} symbols", symbols.len());
    let quotes = source.get_prices(&symbols)?;
    let prices = PriceTable::from_quotes(quotes)?;

    let current = engine::current_market_values(input, &prices)?;
    let current_total: f64 = current.values().sum();
    let new_total = current_total + input.deposit_amount;

    let gaps = engine::market_value_gaps(&input.allocation_bps, &current, input.deposit_amount);
    let plan = engine::build_purchase_plan(&gaps, input.deposit_amount, &prices)?;

    let current_allocation = engine::allocation_percentages(&current, current_total)?;
    let projected = engine::projected_market_values(&current, &plan, &prices)?;
    let new_allocation = engine::allocation_percentages(&projected, new_total)?;

    Ok(RebalanceReport {
        current_allocation,
        new_allocation,
        amount_to_purchase: plan,
    })
}

/// Parse, validate, and normalize an input document without fetching quotes.
pub fn validate_input(path: &Path) -> Result<NormalizedInput> {
    let input = RebalanceInput::load(path)?;
    normalize::normalize(&input)
}
