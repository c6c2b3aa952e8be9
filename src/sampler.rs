//! One representative price per (route, departure date).
//!
//! A live query is attempted first; any failure along the way degrades to the
//! estimation model, so sampling itself never fails.

use crate::client::OfferSource;
use crate::config::ReferenceTables;
use crate::estimate::EstimationModel;
use crate::history::ApiHistory;
use crate::models::{FlightOffersResponse, PriceSource};
use crate::normalizer::OfferNormalizer;
use crate::FareError;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A sampled price tagged with where it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSample {
    pub price: f64,
    pub source: PriceSource,
}

pub struct PriceSampler<S> {
    source: S,
    normalizer: OfferNormalizer,
    model: EstimationModel,
    history: Option<Arc<ApiHistory>>,
    pending_writes: Mutex<Vec<JoinHandle<()>>>,
    currency: String,
}

impl<S: OfferSource> PriceSampler<S> {
    pub fn new(source: S, tables: Arc<ReferenceTables>, currency: String) -> Self {
        Self {
            source,
            normalizer: OfferNormalizer::new(tables.clone()),
            model: EstimationModel::new(tables),
            history: None,
            pending_writes: Mutex::new(Vec::new()),
            currency,
        }
    }

    /// Attach an audit sink for raw provider responses
    pub fn with_history(mut self, history: Option<Arc<ApiHistory>>) -> Self {
        self.history = history;
        self
    }

    /// Reporting currency of every sampled price
    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn model(&self) -> &EstimationModel {
        &self.model
    }

    /// Wait for audit writes started by earlier samples to land
    pub async fn flush_history(&self) {
        let pending = std::mem::take(&mut *self.pending_writes.lock());
        debug!(pending = pending.len(), "Waiting for history writes");
        for write in pending {
            if let Err(e) = write.await {
                warn!(error = %e, "History write task failed");
            }
        }
    }

    /// Sample the market price for departing on `date`.
    pub async fn sample_price(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
        week: u32,
        total_weeks: u32,
    ) -> PriceSample {
        match self.live_price(origin, destination, date).await {
            Ok(price) => {
                info!(origin, destination, date = %date, week, price, "Live price sampled");
                PriceSample {
                    price,
                    source: PriceSource::Live,
                }
            }
            Err(e) => {
                let price = self.model.estimate(origin, destination, date, week, total_weeks);
                warn!(
                    origin,
                    destination,
                    date = %date,
                    week,
                    error = %e,
                    price,
                    "Live query failed, falling back to estimate"
                );
                PriceSample {
                    price,
                    source: PriceSource::Estimated,
                }
            }
        }
    }

    async fn live_price(&self, origin: &str, destination: &str, date: NaiveDate) -> Result<f64, FareError> {
        let raw = self.source.search_offers(origin, destination, date).await?;

        if let Some(history) = &self.history {
            self.record_detached(history.clone(), origin, destination, date, raw.body.clone());
        }

        let response: FlightOffersResponse = serde_json::from_str(&raw.body)?;
        let normalized = self.normalizer.normalize(&response.data)?;
        Ok(normalized.representative)
    }

    // The audit write runs on its own task so sampling never waits on the file
    fn record_detached(
        &self,
        history: Arc<ApiHistory>,
        origin: &str,
        destination: &str,
        date: NaiveDate,
        body: String,
    ) {
        let origin = origin.to_string();
        let destination = destination.to_string();
        let write = tokio::spawn(async move {
            history.record(&origin, &destination, date, &body).await;
        });

        let mut pending = self.pending_writes.lock();
        pending.retain(|write| !write.is_finished());
        pending.push(write);
    }
}
