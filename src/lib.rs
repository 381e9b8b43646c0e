//! cashflow-rebalancer: deposit-driven portfolio rebalancing.
//!
//! Reads a target allocation, current holdings, and a cash deposit from a
//! JSON document, fetches live quotes, and computes how many whole units of
//! each asset to buy so the portfolio tracks the target without overspending
//! the deposit. One pass, no state between runs: the result is written as a
//! JSON report next to a console summary.

pub mod config;
pub mod engine;
pub mod error;
pub mod fmp;
pub mod input;
pub mod normalize;
pub mod prices;
pub mod report;
pub mod run;
