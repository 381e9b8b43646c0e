//! Financial Modeling Prep quote client.

use std::thread;
use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::config::PricingConfig;
use crate::error::{Error, Result};
use crate::prices::PriceSource;

/// Blocking FMP REST client.
pub struct FmpClient {
    client: Client,
    base_url: String,
    api_key: String,
    rate_limit: Duration,
}

/// One row of the quote response array. Remaining fields are ignored.
#[derive(Debug, Deserialize)]
struct QuoteRow {
    price: f64,
}

impl FmpClient {
    /// Create a client against a custom endpoint.
    pub fn new(
        base_url: &str,
        api_key: &str,
        rate_limit: Duration,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            rate_limit,
        })
    }

    /// Build a client from config, reading the API key from the environment.
    pub fn from_config(config: &PricingConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            Error::Config(format!(
                "environment variable {} is not set (quote API key)",
                config.api_key_env
            ))
        })?;
        Self::new(
            &config.base_url,
            &api_key,
            Duration::from_millis(config.rate_limit_ms),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Fetch the latest quote for one symbol (GET /quote/{SYMBOL}).
    pub fn quote(&self, symbol: &str) -> Result<f64> {
        let url = format!("{}/quote/{}", self.base_url, symbol.to_uppercase());
        debug!("Fetching quote for {symbol}");

        let resp = self
            .client
            .get(&url)
            .query(&[("apikey", self.api_key.as_str())])
            .send()?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            return Err(Error::Transport(format!("quote returned {status}: {body}")));
        }

        let rows: Vec<QuoteRow> = resp
            .json()
            .map_err(|e| Error::Transport(format!("failed to parse quote response: {e}")))?;

        match rows.first() {
            Some(row) => Ok(row.price),
            None => Err(Error::PriceUnavailable {
                symbol: symbol.to_string(),
            }),
        }
    }
}

impl PriceSource for FmpClient {
    fn get_prices(&self, symbols: &[String]) -> Result<FxHashMap<String, f64>> {
        let mut prices = FxHashMap::default();
        for (i, symbol) in symbols.iter().enumerate() {
            let price = self.quote(symbol)?;
            prices.insert(symbol.clone(), price);

            // Stay under the quote API rate limit
            if i + 1 < symbols.len() {
                rate_limit_delay(self.rate_limit);
            }
        }
        Ok(prices)
    }
}

/// Pause between consecutive quote requests.
fn rate_limit_delay(interval: Duration) {
    if !interval.is_zero() {
        thread::sleep(interval);
    }
}
