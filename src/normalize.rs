//! Symbol canonicalization and asset universe alignment.
//!
//! Target allocation and holdings may name different asset sets and mix
//! letter case. Normalization lowercases every symbol, converts percentages
//! to basis points, and gives both maps the identical key set (their union
//! plus the cash line) so the engine never has to handle missing keys.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::input::{self, RebalanceInput};

/// Reserved key for the cash line of a portfolio.
pub const CASH: &str = "_cash";

/// Current holdings in one of the two accepted input forms.
#[derive(Debug, Clone, PartialEq)]
pub enum Holdings {
    /// Asset -> market value in account currency.
    MarketValues(BTreeMap<String, f64>),
    /// Asset -> unit count.
    Units(BTreeMap<String, f64>),
}

impl Holdings {
    pub fn as_map(&self) -> &BTreeMap<String, f64> {
        match self {
            Holdings::MarketValues(m) | Holdings::Units(m) => m,
        }
    }

    fn as_map_mut(&mut self) -> &mut BTreeMap<String, f64> {
        match self {
            Holdings::MarketValues(m) | Holdings::Units(m) => m,
        }
    }
}

/// A validated input with canonical symbols and an aligned asset universe.
#[derive(Debug, Clone)]
pub struct NormalizedInput {
    /// Asset -> target weight in basis points. Sums to exactly 10_000.
    pub allocation_bps: BTreeMap<String, i64>,
    pub holdings: Holdings,
    pub deposit_amount: f64,
}

impl NormalizedInput {
    /// Symbols that need a live quote: every asset in the universe except cash.
    pub fn priced_symbols(&self) -> Vec<String> {
        self.allocation_bps
            .keys()
            .filter(|k| k.as_str() != CASH)
            .cloned()
            .collect()
    }
}

/// Canonicalize a validated input document.
pub fn normalize(input: &RebalanceInput) -> Result<NormalizedInput> {
    let mut allocation_bps = BTreeMap::new();
    for (asset, pct) in canonicalize(&input.target_allocation, "target_allocation")? {
        allocation_bps.insert(asset, input::percent_to_bps(pct)?);
    }

    let mut holdings = match (&input.current_market_value, &input.current_holdings) {
        (Some(values), None) => Holdings::MarketValues(canonicalize(values, "holdings")?),
        (None, Some(units)) => Holdings::Units(canonicalize(units, "holdings")?),
        _ => {
            return Err(Error::Validation(
                "one of current_market_value or current_holdings is required".into(),
            ));
        }
    };

    align_universe(&mut allocation_bps, &mut holdings);

    Ok(NormalizedInput {
        allocation_bps,
        holdings,
        deposit_amount: input.deposit_amount,
    })
}

/// Give both maps the identical key set: the union of their keys plus cash.
///
/// Missing entries are zero-filled. Percentages are never renormalized, so
/// a 100%-summing allocation stays 100%-summing. Idempotent.
pub fn align_universe(allocation_bps: &mut BTreeMap<String, i64>, holdings: &mut Holdings) {
    let values = holdings.as_map_mut();

    let mut universe: Vec<String> = allocation_bps.keys().cloned().collect();
    universe.extend(values.keys().cloned());
    universe.push(CASH.to_string());

    for asset in universe {
        allocation_bps.entry(asset.clone()).or_insert(0);
        values.entry(asset).or_insert(0.0);
    }
}

/// Lowercase every key, rejecting collisions.
fn canonicalize(map: &BTreeMap<String, f64>, context: &str) -> Result<BTreeMap<String, f64>> {
    let mut out = BTreeMap::new();
    for (asset, value) in map {
        let key = asset.to_lowercase();
        if out.insert(key.clone(), *value).is_some() {
            return Err(Error::Validation(format!(
                "duplicate asset {key} in {context} after lowercasing"
            )));
        }
    }
    Ok(out)
}
