//! # Fare Tracker
//!
//! Tracks flight prices for a route over a number of future weeks.
//! Each week is sampled against the Amadeus flight-offer API; when the live
//! call fails the sample degrades to a deterministic price model, so a track
//! always produces a complete trend.

pub mod cache;
pub mod client;
pub mod config;
pub mod estimate;
pub mod history;
pub mod models;
pub mod normalizer;
pub mod sampler;
pub mod token;
pub mod tracker;

use std::sync::Arc;
use thiserror::Error;

// Re-export main types for convenience
pub use cache::RouteCache;
pub use client::{AmadeusClient, OfferSource, RawOfferResponse};
pub use config::{ReferenceTables, TrackerConfig};
pub use estimate::EstimationModel;
pub use history::ApiHistory;
pub use models::*;
pub use normalizer::{NormalizedPrice, OfferNormalizer};
pub use sampler::{PriceSample, PriceSampler};
pub use token::{AccessToken, TokenCache};
pub use tracker::PriceTracker;

/// Error types for the fare tracker
#[derive(Error, Debug)]
pub enum FareError {
    #[error("Token exchange failed with status {status}: {body}")]
    Token { status: u16, body: String },

    #[error("Offer search failed with status {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No usable offers in provider response")]
    NoOffers,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build a tracker wired to the live provider from environment configuration.
pub fn tracker_from_config(config: &TrackerConfig) -> Result<PriceTracker<AmadeusClient>, FareError> {
    let tables = Arc::new(config.load_tables()?);
    let client = AmadeusClient::new(config)?;
    let history = config.history_path.as_ref().map(|path| Arc::new(ApiHistory::new(path)));

    let sampler = PriceSampler::new(client, tables, config.currency.clone()).with_history(history);
    Ok(PriceTracker::new(sampler, config.concurrency))
}

/// Main public API function: track one route over `weeks` future weeks.
///
/// Each call builds its own client, so each call exchanges credentials once.
/// Callers tracking many routes should keep one [`PriceTracker`] from
/// [`tracker_from_config`] and share its token cache.
pub async fn track_flight_prices(
    origin: &str,
    destination: &str,
    weeks: i64,
) -> Result<PriceAnalysis, FareError> {
    let request = PriceTrackRequest::new(origin, destination, weeks)?;
    let config = TrackerConfig::from_env();
    let tracker = tracker_from_config(&config)?;
    let analysis = tracker.track_prices(&request).await;
    tracker.sampler().flush_history().await;
    Ok(analysis)
}

/// Track a route and reshape the analysis into parallel arrays for charting.
///
/// Builds a fresh client per call, like [`track_flight_prices`].
pub async fn generate_price_trend(
    origin: &str,
    destination: &str,
    weeks: i64,
) -> Result<PriceTrend, FareError> {
    let request = PriceTrackRequest::new(origin, destination, weeks)?;
    let config = TrackerConfig::from_env();
    let tracker = tracker_from_config(&config)?;
    let trend = tracker.generate_price_trend(&request).await;
    tracker.sampler().flush_history().await;
    Ok(trend)
}
