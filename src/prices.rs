//! Price table and price source abstraction.

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::normalize::CASH;

/// Anything that can supply current unit prices for a set of symbols.
///
/// Implementations must return a quote for every requested symbol or fail
/// the run; the engine never computes on partial prices.
pub trait PriceSource {
    fn get_prices(&self, symbols: &[String]) -> Result<FxHashMap<String, f64>>;
}

/// Validated lookup table of unit prices. Cash is always present at 1.0.
#[derive(Debug, Clone)]
pub struct PriceTable {
    prices: FxHashMap<String, f64>,
}

impl PriceTable {
    /// Build a table from fetched quotes, validating every price.
    pub fn from_quotes(quotes: FxHashMap<String, f64>) -> Result<Self> {
        let mut prices = FxHashMap::default();
        for (symbol, price) in quotes {
            if !price.is_finite() || price <= 0.0 {
                return Err(Error::Validation(format!(
                    "quote for {symbol} ({price}) must be a finite price > 0"
                )));
            }
            prices.insert(symbol, price);
        }
        prices.insert(CASH.to_string(), 1.0);
        Ok(Self { prices })
    }

    /// Unit price for an asset.
    pub fn price(&self, asset: &str) -> Result<f64> {
        self.prices
            .get(asset)
            .copied()
            .ok_or_else(|| Error::PriceUnavailable {
                symbol: asset.to_string(),
            })
    }
}

/// Fixed price source for testing without the live quote endpoint.
#[derive(Debug, Clone, Default)]
pub struct StaticPrices {
    prices: FxHashMap<String, f64>,
}

impl StaticPrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: &str, price: f64) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }
}

impl PriceSource for StaticPrices {
    fn get_prices(&self, symbols: &[String]) -> Result<FxHashMap<String, f64>> {
        let mut out = FxHashMap::default();
        for symbol in symbols {
            let price =
                self.prices
                    .get(symbol)
                    .copied()
                    .ok_or_else(|| Error::PriceUnavailable {
                        symbol: symbol.clone(),
                    })?;
            out.insert(symbol.clone(), price);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_holds_validated_quotes() {
        let quotes = FxHashMap::from_iter([("schd".to_string(), 71.26)]);
        let table = PriceTable::from_quotes(quotes).unwrap();
        assert_eq!(table.price("schd").unwrap(), 71.26);
    }

    #[test]
    fn cash_is_always_one() {
        let table = PriceTable::from_quotes(FxHashMap::default()).unwrap();
        assert_eq!(table.price(CASH).unwrap(), 1.0);
    }

    #[test]
    fn cash_stays_pinned_even_if_quoted() {
        let quotes = FxHashMap::from_iter([(CASH.to_string(), 2.5)]);
        let table = PriceTable::from_quotes(quotes).unwrap();
        assert_eq!(table.price(CASH).unwrap(), 1.0);
    }

    #[test]
    fn reject_zero_price() {
        let quotes = FxHashMap::from_iter([("schd".to_string(), 0.0)]);
        assert!(PriceTable::from_quotes(quotes).is_err());
    }

    #[test]
    fn reject_negative_price() {
        let quotes = FxHashMap::from_iter([("schd".to_string(), -1.0)]);
        assert!(PriceTable::from_quotes(quotes).is_err());
    }

    #[test]
    fn reject_non_finite_price() {
        let quotes = FxHashMap::from_iter([("schd".to_string(), f64::NAN)]);
        assert!(PriceTable::from_quotes(quotes).is_err());
    }

    #[test]
    fn missing_symbol_is_price_unavailable() {
        let table = PriceTable::from_quotes(FxHashMap::default()).unwrap();
        match table.price("vtv") {
            Err(Error::PriceUnavailable { symbol }) => assert_eq!(symbol, "vtv"),
            other => panic!("expected PriceUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn static_source_returns_known_prices() {
        let source = StaticPrices::new()
            .with_price("schd", 71.26)
            .with_price("vtv", 131.09);
        let prices = source
            .get_prices(&["schd".to_string(), "vtv".to_string()])
            .unwrap();
        assert_eq!(prices["schd"], 71.26);
        assert_eq!(prices["vtv"], 131.09);
    }

    #[test]
    fn static_source_errors_on_unknown_symbol() {
        let source = StaticPrices::new().with_price("schd", 71.26);
        let err = source
            .get_prices(&["schd".to_string(), "upro".to_string()])
            .unwrap_err();
        match err {
            Error::PriceUnavailable { symbol } => assert_eq!(symbol, "upro"),
            other => panic!("expected PriceUnavailable, got {other:?}"),
        }
    }
}
