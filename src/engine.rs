//! Allocation engine: gaps, purchase sizing, and allocation snapshots.
//!
//! All money here is f64 market value; weights are integer basis points.
//! The engine only ever buys. Overweight positions keep their excess and
//! the target is approached from below with whole-unit purchases funded by
//! the deposit (plus any overweight cash).

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::input::TARGET_SUM_BPS;
use crate::normalize::{CASH, Holdings, NormalizedInput};
use crate::prices::PriceTable;

/// Whole-unit buy counts per non-cash asset plus the signed cash line.
///
/// `cash_remainder` is what the run leaves in (or takes from) cash:
/// deposit minus total purchase cost. Negative when overweight cash was
/// spent down to fund purchases.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchasePlan {
    pub units: BTreeMap<String, u64>,
    pub cash_remainder: f64,
}

impl PurchasePlan {
    /// Total dollar cost of the planned purchases.
    pub fn total_cost(&self, prices: &PriceTable) -> Result<f64> {
        let mut cost = 0.0;
        for (asset, units) in &self.units {
            if *units > 0 {
                cost += *units as f64 * prices.price(asset)?;
            }
        }
        Ok(cost)
    }
}

/// Resolve holdings into market values using the price table.
///
/// The market-value input form passes through unchanged; the unit-count
/// form is multiplied out. Cash units are priced at exactly 1.0.
pub fn current_market_values(
    input: &NormalizedInput,
    prices: &PriceTable,
) -> Result<BTreeMap<String, f64>> {
    match &input.holdings {
        Holdings::MarketValues(values) => Ok(values.clone()),
        Holdings::Units(units) => {
            let mut values = BTreeMap::new();
            for (asset, count) in units {
                values.insert(asset.clone(), count * prices.price(asset)?);
            }
            Ok(values)
        }
    }
}

/// Signed distance from target per asset.
///
/// The target is each asset's share of the deposit-inclusive total, so the
/// gaps across a 100%-summing allocation always sum to the deposit.
/// Positive = underweight (buy candidate), negative = overweight (held).
pub fn market_value_gaps(
    allocation_bps: &BTreeMap<String, i64>,
    current: &BTreeMap<String, f64>,
    deposit: f64,
) -> BTreeMap<String, f64> {
    let new_total: f64 = current.values().sum::<f64>() + deposit;

    allocation_bps
        .iter()
        .map(|(asset, bps)| {
            let target = new_total * *bps as f64 / TARGET_SUM_BPS as f64;
            let held = current.get(asset).copied().unwrap_or(0.0);
            (asset.clone(), target - held)
        })
        .collect()
}

/// Size whole-unit purchases under the deposit budget, most underweight
/// asset first.
///
/// Each buy candidate gets `min(available, gap)` to spend, floored to whole
/// units at its price; the exact cost is deducted so truncation remainders
/// roll forward to later assets and finally into the cash line. Overweight
/// assets are never sold. Overweight cash raises the budget and starts the
/// cash line negative.
pub fn build_purchase_plan(
    gaps: &BTreeMap<String, f64>,
    deposit: f64,
    prices: &PriceTable,
) -> Result<PurchasePlan> {
    let mut available = deposit;
    let mut cash_remainder = 0.0;

    let cash_gap = gaps.get(CASH).copied().unwrap_or(0.0);
    if cash_gap < 0.0 {
        cash_remainder = cash_gap;
        available -= cash_gap;
    }

    let mut order: Vec<(&String, f64)> = gaps
        .iter()
        .filter(|(asset, _)| asset.as_str() != CASH)
        .map(|(asset, gap)| (asset, *gap))
        .collect();
    order.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mut units = BTreeMap::new();
    for (asset, gap) in order {
        let mut bought = 0_u64;
        if gap > 0.0 && available > 0.0 {
            let price = prices.price(asset)?;
            let budget = available.min(gap);
            bought = (budget / price).floor() as u64;
            available -= bought as f64 * price;
        }
        units.insert(asset.clone(), bought);
    }

    cash_remainder += available;

    Ok(PurchasePlan {
        units,
        cash_remainder,
    })
}

/// Market values after executing the plan.
pub fn projected_market_values(
    current: &BTreeMap<String, f64>,
    plan: &PurchasePlan,
    prices: &PriceTable,
) -> Result<BTreeMap<String, f64>> {
    let mut projected = current.clone();
    for (asset, units) in &plan.units {
        if *units > 0 {
            let price = prices.price(asset)?;
            *projected.entry(asset.clone()).or_insert(0.0) += *units as f64 * price;
        }
    }
    *projected.entry(CASH.to_string()).or_insert(0.0) += plan.cash_remainder;
    Ok(projected)
}

/// Percentage-of-total snapshot, rounded to two decimal places.
///
/// Each asset rounds independently, so the snapshot may sum to 99.99 or
/// 100.01. A non-positive total is an error, never a silent zero.
pub fn allocation_percentages(
    values: &BTreeMap<String, f64>,
    total: f64,
) -> Result<BTreeMap<String, f64>> {
    if total <= 0.0 {
        return Err(Error::Validation("zero total market value".into()));
    }
    Ok(values
        .iter()
        .map(|(asset, value)| (asset.clone(), round2(100.0 * value / total)))
        .collect())
}

/// Round to two decimal places, half away from zero.
fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    fn table(pairs: &[(&str, f64)]) -> PriceTable {
        let quotes: FxHashMap<String, f64> = pairs
            .iter()
            .map(|(sym, price)| (sym.to_string(), *price))
            .collect();
        PriceTable::from_quotes(quotes).unwrap()
    }

    fn values(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs
            .iter()
            .map(|(asset, v)| (asset.to_string(), *v))
            .collect()
    }

    fn bps(pairs: &[(&str, i64)]) -> BTreeMap<String, i64> {
        pairs
            .iter()
            .map(|(asset, b)| (asset.to_string(), *b))
            .collect()
    }

    #[test]
    fn gaps_sum_to_deposit() {
        let allocation = bps(&[("a", 6000), ("b", 4000), ("_cash", 0)]);
        let current = values(&[("a", 300.0), ("b", 500.0), ("_cash", 0.0)]);
        let gaps = market_value_gaps(&allocation, &current, 200.0);

        let sum: f64 = gaps.values().sum();
        assert!((sum - 200.0).abs() < 1e-9);
    }

    #[test]
    fn exact_fit_spends_the_whole_deposit() {
        let allocation = bps(&[("a", 6000), ("b", 4000), ("_cash", 0)]);
        let current = values(&[("a", 0.0), ("b", 0.0), ("_cash", 0.0)]);
        let prices = table(&[("a", 100.0), ("b", 50.0)]);

        let gaps = market_value_gaps(&allocation, &current, 1000.0);
        assert_eq!(gaps["a"], 600.0);
        assert_eq!(gaps["b"], 400.0);
        assert_eq!(gaps["_cash"], 0.0);

        let plan = build_purchase_plan(&gaps, 1000.0, &prices).unwrap();
        assert_eq!(plan.units["a"], 6);
        assert_eq!(plan.units["b"], 8);
        assert_eq!(plan.cash_remainder, 0.0);
    }

    #[test]
    fn overweight_asset_is_never_sold() {
        let allocation = bps(&[("a", 5000), ("_cash", 5000)]);
        let current = values(&[("a", 100.0), ("_cash", 0.0)]);
        let prices = table(&[("a", 10.0)]);

        let gaps = market_value_gaps(&allocation, &current, 0.0);
        assert_eq!(gaps["a"], -50.0);
        assert_eq!(gaps["_cash"], 50.0);

        let plan = build_purchase_plan(&gaps, 0.0, &prices).unwrap();
        assert_eq!(plan.units["a"], 0);
        assert_eq!(plan.cash_remainder, 0.0);
    }

    #[test]
    fn overweight_cash_funds_purchases() {
        let allocation = bps(&[("a", 10000), ("_cash", 0)]);
        let current = values(&[("a", 0.0), ("_cash", 500.0)]);
        let prices = table(&[("a", 100.0)]);

        let gaps = market_value_gaps(&allocation, &current, 0.0);
        assert_eq!(gaps["a"], 500.0);
        assert_eq!(gaps["_cash"], -500.0);

        let plan = build_purchase_plan(&gaps, 0.0, &prices).unwrap();
        assert_eq!(plan.units["a"], 5);
        assert_eq!(plan.cash_remainder, -500.0);

        let projected = projected_market_values(&current, &plan, &prices).unwrap();
        assert_eq!(projected["a"], 500.0);
        assert_eq!(projected["_cash"], 0.0);
    }

    #[test]
    fn truncation_remainder_lands_in_cash() {
        let allocation = bps(&[("a", 10000), ("_cash", 0)]);
        let current = values(&[("a", 0.0), ("_cash", 0.0)]);
        let prices = table(&[("a", 300.0)]);

        let gaps = market_value_gaps(&allocation, &current, 1000.0);
        let plan = build_purchase_plan(&gaps, 1000.0, &prices).unwrap();

        assert_eq!(plan.units["a"], 3);
        assert_eq!(plan.cash_remainder, 100.0);
    }

    #[test]
    fn largest_gap_is_filled_first() {
        let allocation = bps(&[("a", 6000), ("b", 4000), ("_cash", 0)]);
        let current = values(&[("a", 0.0), ("b", 200.0), ("_cash", 0.0)]);
        let prices = table(&[("a", 100.0), ("b", 100.0)]);

        // new_total 700: gap a = 420, gap b = 80
        let gaps = market_value_gaps(&allocation, &current, 500.0);
        let plan = build_purchase_plan(&gaps, 500.0, &prices).unwrap();

        // a takes 4 units (400), leaving 100 capped by b's gap of 80: 0 units
        assert_eq!(plan.units["a"], 4);
        assert_eq!(plan.units["b"], 0);
        assert_eq!(plan.cash_remainder, 100.0);
    }

    #[test]
    fn equal_gaps_fill_in_symbol_order() {
        let allocation = bps(&[("m", 3000), ("x", 3000), ("y", 0), ("_cash", 4000)]);
        let current = values(&[("m", 0.0), ("x", 0.0), ("y", 1000.0), ("_cash", 0.0)]);
        let prices = table(&[("m", 60.0), ("x", 60.0), ("y", 10.0)]);

        // new_total 1100: gaps m = 330, x = 330, y = -1000, cash = 440
        let gaps = market_value_gaps(&allocation, &current, 100.0);
        let plan = build_purchase_plan(&gaps, 100.0, &prices).unwrap();

        // 100 available: m goes first on the symbol tie-break and buys one
        // unit of 60, leaving 40 which is under x's price
        assert_eq!(plan.units["m"], 1);
        assert_eq!(plan.units["x"], 0);
        assert_eq!(plan.units["y"], 0);
        assert_eq!(plan.cash_remainder, 40.0);
    }

    #[test]
    fn zero_deposit_and_no_overweight_cash_buys_nothing() {
        let allocation = bps(&[("a", 5000), ("b", 5000), ("_cash", 0)]);
        let current = values(&[("a", 100.0), ("b", 100.0), ("_cash", 0.0)]);
        let prices = table(&[("a", 10.0), ("b", 10.0)]);

        let gaps = market_value_gaps(&allocation, &current, 0.0);
        let plan = build_purchase_plan(&gaps, 0.0, &prices).unwrap();

        assert_eq!(plan.units["a"], 0);
        assert_eq!(plan.units["b"], 0);
        assert_eq!(plan.cash_remainder, 0.0);
    }

    #[test]
    fn plan_never_spends_more_than_the_budget() {
        let allocation = bps(&[("a", 4000), ("b", 4000), ("_cash", 2000)]);
        let current = values(&[("a", 123.0), ("b", 45.0), ("_cash", 67.0)]);
        let prices = table(&[("a", 71.26), ("b", 131.09)]);

        let deposit = 250.0;
        let gaps = market_value_gaps(&allocation, &current, deposit);
        let plan = build_purchase_plan(&gaps, deposit, &prices).unwrap();

        let cash_gap = gaps["_cash"];
        let budget = deposit + (-cash_gap).max(0.0);
        let cost = plan.total_cost(&prices).unwrap();
        assert!(cost <= budget + 1e-9);
        // The cash line is exactly what was not spent
        assert!((plan.cash_remainder - (deposit - cost)).abs() < 1e-9);
    }

    #[test]
    fn units_holdings_resolve_through_prices() {
        let input = NormalizedInput {
            allocation_bps: bps(&[("a", 10000), ("_cash", 0)]),
            holdings: Holdings::Units(values(&[("a", 2.0), ("_cash", 30.0)])),
            deposit_amount: 0.0,
        };
        let prices = table(&[("a", 50.0)]);

        let current = current_market_values(&input, &prices).unwrap();
        assert_eq!(current["a"], 100.0);
        assert_eq!(current["_cash"], 30.0);
    }

    #[test]
    fn market_value_holdings_pass_through() {
        let input = NormalizedInput {
            allocation_bps: bps(&[("a", 10000), ("_cash", 0)]),
            holdings: Holdings::MarketValues(values(&[("a", 123.45), ("_cash", 0.0)])),
            deposit_amount: 0.0,
        };
        let prices = table(&[("a", 50.0)]);

        let current = current_market_values(&input, &prices).unwrap();
        assert_eq!(current["a"], 123.45);
    }

    #[test]
    fn snapshot_rounds_to_two_decimals() {
        let current = values(&[("a", 1.0), ("b", 1.0), ("c", 1.0)]);
        let pct = allocation_percentages(&current, 3.0).unwrap();
        assert_eq!(pct["a"], 33.33);
        assert_eq!(pct["b"], 33.33);
        assert_eq!(pct["c"], 33.33);
    }

    #[test]
    fn snapshot_of_clean_split_sums_to_100() {
        let current = values(&[("a", 33.0), ("b", 67.0)]);
        let pct = allocation_percentages(&current, 100.0).unwrap();
        assert_eq!(pct["a"], 33.0);
        assert_eq!(pct["b"], 67.0);
    }

    #[test]
    fn snapshot_rejects_zero_total() {
        let current = values(&[("a", 0.0), ("b", 0.0)]);
        let err = allocation_percentages(&current, 0.0).unwrap_err();
        assert!(err.to_string().contains("zero total market value"));
    }

    #[test]
    fn projected_values_close_to_the_new_total() {
        let allocation = bps(&[("a", 6000), ("b", 4000), ("_cash", 0)]);
        let current = values(&[("a", 0.0), ("b", 0.0), ("_cash", 0.0)]);
        let prices = table(&[("a", 100.0), ("b", 50.0)]);

        let gaps = market_value_gaps(&allocation, &current, 1000.0);
        let plan = build_purchase_plan(&gaps, 1000.0, &prices).unwrap();
        let projected = projected_market_values(&current, &plan, &prices).unwrap();

        assert_eq!(projected["a"], 600.0);
        assert_eq!(projected["b"], 400.0);
        assert_eq!(projected["_cash"], 0.0);
        let total: f64 = projected.values().sum();
        assert!((total - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn recomputation_is_bit_identical() {
        let allocation = bps(&[("a", 4000), ("b", 4000), ("_cash", 2000)]);
        let current = values(&[("a", 123.0), ("b", 45.0), ("_cash", 67.0)]);
        let prices = table(&[("a", 71.26), ("b", 131.09)]);

        let gaps_a = market_value_gaps(&allocation, &current, 250.0);
        let gaps_b = market_value_gaps(&allocation, &current, 250.0);
        assert_eq!(gaps_a, gaps_b);

        let plan_a = build_purchase_plan(&gaps_a, 250.0, &prices).unwrap();
        let plan_b = build_purchase_plan(&gaps_b, 250.0, &prices).unwrap();
        assert_eq!(plan_a, plan_b);
    }
}
