//! Rebalance input document (input.json) loading and validation.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Basis points a target allocation must sum to (100%).
pub const TARGET_SUM_BPS: i64 = 10_000;

/// Slack allowed when checking that a percentage lands on a whole basis
/// point. Inputs carry at most two decimal places; anything finer is
/// rejected rather than silently rounded.
pub const PERCENT_SCALE_TOLERANCE: f64 = 1e-6;

/// A rebalance request: target allocation, deposit, and current holdings.
///
/// Exactly one of `current_market_value` (asset -> dollar value) or
/// `current_holdings` (asset -> unit count) must be present.
#[derive(Debug, Clone, Deserialize)]
pub struct RebalanceInput {
    pub target_allocation: BTreeMap<String, f64>,
    pub deposit_amount: f64,
    #[serde(default)]
    pub current_market_value: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub current_holdings: Option<BTreeMap<String, f64>>,
}

impl RebalanceInput {
    /// Load and validate an input.json file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::InputRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let input: RebalanceInput = serde_json::from_str(&contents)?;
        input.validate()?;
        Ok(input)
    }

    /// Parse from a JSON string (useful for testing).
    pub fn from_json(json: &str) -> Result<Self> {
        let input: RebalanceInput = serde_json::from_str(json)?;
        input.validate()?;
        Ok(input)
    }

    /// Validate the input document.
    fn validate(&self) -> Result<()> {
        match (&self.current_market_value, &self.current_holdings) {
            (Some(_), Some(_)) => {
                return Err(Error::Validation(
                    "provide exactly one of current_market_value or current_holdings, not both"
                        .into(),
                ));
            }
            (None, None) => {
                return Err(Error::Validation(
                    "one of current_market_value or current_holdings is required".into(),
                ));
            }
            _ => {}
        }

        if self.target_allocation.is_empty() {
            return Err(Error::Validation("target_allocation is empty".into()));
        }

        if !self.deposit_amount.is_finite() || self.deposit_amount < 0.0 {
            return Err(Error::Validation(format!(
                "deposit_amount ({}) must be a finite amount >= 0",
                self.deposit_amount
            )));
        }

        let mut sum_bps = 0_i64;
        for (asset, pct) in &self.target_allocation {
            if asset.is_empty() {
                return Err(Error::Validation(
                    "empty asset key in target_allocation".into(),
                ));
            }
            match percent_to_bps(*pct) {
                Ok(bps) => sum_bps += bps,
                Err(_) => {
                    return Err(Error::Validation(format!(
                        "target percentage for {asset} ({pct}) must be between 0 and 100, \
                         with at most two decimal places"
                    )));
                }
            }
        }

        if sum_bps != TARGET_SUM_BPS {
            return Err(Error::Validation(format!(
                "target_allocation sums to {} (must sum to exactly 100)",
                sum_bps as f64 / 100.0
            )));
        }

        let holdings = self
            .current_market_value
            .as_ref()
            .or(self.current_holdings.as_ref());
        if let Some(holdings) = holdings {
            for (asset, amount) in holdings {
                if asset.is_empty() {
                    return Err(Error::Validation("empty asset key in holdings".into()));
                }
                if !amount.is_finite() || *amount < 0.0 {
                    return Err(Error::Validation(format!(
                        "holding for {asset} ({amount}) must be a finite amount >= 0"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Convert a percentage to integer basis points.
pub(crate) fn percent_to_bps(pct: f64) -> Result<i64> {
    // A percentage above 100 can never be part of a 100-summing
    // allocation, and the bound keeps the scaled cast in i64 range.
    if !pct.is_finite() || pct < 0.0 || pct > 100.0 {
        return Err(Error::Validation(format!(
            "percentage ({pct}) must be between 0 and 100"
        )));
    }
    let scaled = pct * 100.0;
    let rounded = scaled.round();
    if (scaled - rounded).abs() > PERCENT_SCALE_TOLERANCE {
        return Err(Error::Validation(format!(
            "percentage ({pct}) has more than two decimal places"
        )));
    }
    Ok(rounded as i64)
}
