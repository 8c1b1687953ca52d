// src/market.rs
//! Market-data collaborator boundary.
//!
//! The pricing core reads historical closes through [`Asset`] and [`Market`]
//! and never mutates them; Greeks bump spots by parameter, not by editing
//! histories. How the data got here (CSV, vendor API, fixtures) is the
//! caller's business.

use crate::error::{PricingError, PricingResult};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::ops::Index;

/// A ticker plus its ordered history of observed closes.
///
/// One price per date; inserting the same date twice keeps the last value.
/// Iteration is always ascending by date.
#[derive(Debug, Clone)]
pub struct Asset {
    ticker: String,
    history: BTreeMap<NaiveDate, f64>,
}

impl Asset {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            history: BTreeMap::new(),
        }
    }

    pub fn with_history(
        ticker: impl Into<String>,
        observations: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            history: observations.into_iter().collect(),
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn insert(&mut self, date: NaiveDate, close: f64) {
        self.history.insert(date, close);
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// All observations, ascending by date.
    pub fn series(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.history.iter().map(|(d, p)| (*d, *p))
    }

    /// Most recent observation, if any.
    pub fn last_observation(&self) -> Option<(NaiveDate, f64)> {
        self.history.iter().next_back().map(|(d, p)| (*d, *p))
    }

    /// Most recent observation at or before `date`.
    pub fn last_observation_on_or_before(&self, date: NaiveDate) -> Option<(NaiveDate, f64)> {
        self.history.range(..=date).next_back().map(|(d, p)| (*d, *p))
    }

    /// Closes at or before `cutoff`, ascending by date.
    pub fn closes_up_to(&self, cutoff: NaiveDate) -> Vec<f64> {
        self.history.range(..=cutoff).map(|(_, p)| *p).collect()
    }
}

/// In-memory collection of assets keyed by ticker.
#[derive(Debug, Clone, Default)]
pub struct Market {
    assets: HashMap<String, Asset>,
}

impl Market {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, asset: Asset) {
        self.assets.insert(asset.ticker().to_string(), asset);
    }

    /// The ordered historical series for `ticker`.
    pub fn get_historical_series(&self, ticker: &str) -> PricingResult<&Asset> {
        self.assets
            .get(ticker)
            .ok_or_else(|| PricingError::NoDataForTicker {
                ticker: ticker.to_string(),
            })
    }

    pub fn tickers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.assets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// `market["AAPL"]` convenience; panics on unknown tickers like map indexing.
impl Index<&str> for Market {
    type Output = Asset;

    fn index(&self, ticker: &str) -> &Asset {
        self.assets
            .get(ticker)
            .unwrap_or_else(|| panic!("no data for ticker '{}'", ticker))
    }
}
