//! Rebalance report assembly and emission.
//!
//! The report is written as pretty JSON only after the whole computation
//! succeeded; a failed run leaves no output file behind.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::engine::PurchasePlan;
use crate::error::{Error, Result};
use crate::normalize::CASH;

/// Final output of a rebalance run.
#[derive(Debug, Clone, Serialize)]
pub struct RebalanceReport {
    pub current_allocation: BTreeMap<String, f64>,
    pub new_allocation: BTreeMap<String, f64>,
    pub amount_to_purchase: PurchasePlan,
}

// amount_to_purchase is one flat object: the signed cash line plus
// whole-unit counts per asset.
impl Serialize for PurchasePlan {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.units.len() + 1))?;
        map.serialize_entry(CASH, &self.cash_remainder)?;
        for (asset, units) in &self.units {
            map.serialize_entry(asset, units)?;
        }
        map.end()
    }
}

impl RebalanceReport {
    /// Serialize to pretty JSON and write to `path` in one shot.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| Error::ReportWrite {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        std::fs::write(path, json + "\n").map_err(|e| Error::ReportWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }
}

impl fmt::Display for RebalanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "REBALANCE PLAN:")?;
        writeln!(
            f,
            "  {:10} {:>10} {:>10} {:>8}",
            "Asset", "Current %", "New %", "Buy"
        )?;

        for (asset, current) in &self.current_allocation {
            let new = self.new_allocation.get(asset).copied().unwrap_or(0.0);
            let buy = if asset == CASH {
                format!("{:+.2}", self.amount_to_purchase.cash_remainder)
            } else {
                self.amount_to_purchase
                    .units
                    .get(asset)
                    .copied()
                    .unwrap_or(0)
                    .to_string()
            };
            writeln!(f, "  {asset:10} {current:>10.2} {new:>10.2} {buy:>8}")?;
        }
        Ok(())
    }
}
