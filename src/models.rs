//! Track requests, analysis results and the provider's flight-offer wire format

use crate::FareError;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

/// Upper bound applied to the number of tracked weeks
pub const MAX_TRACK_WEEKS: u32 = 52;

/// Week count used by surfaces that do not specify one
pub const DEFAULT_TRACK_WEEKS: u32 = 18;

fn location_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z0-9]{3}$").expect("static pattern compiles"))
}

/// A validated price-tracking request for one route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTrackRequest {
    pub origin: String,      // Airport or city code
    pub destination: String, // Airport or city code
    pub weeks: u32,          // 1..=52
}

impl PriceTrackRequest {
    /// Validate and normalize a request.
    ///
    /// Codes are trimmed and upper-cased. `weeks <= 0` is rejected,
    /// anything above [`MAX_TRACK_WEEKS`] is clamped.
    pub fn new(origin: &str, destination: &str, weeks: i64) -> Result<Self, FareError> {
        let origin = Self::parse_code("origin", origin)?;
        let destination = Self::parse_code("destination", destination)?;

        if weeks <= 0 {
            return Err(FareError::InvalidInput(format!(
                "weeks must be positive, got {}",
                weeks
            )));
        }

        let weeks = if weeks > MAX_TRACK_WEEKS as i64 {
            debug!(requested = weeks, "Clamping week count to {}", MAX_TRACK_WEEKS);
            MAX_TRACK_WEEKS
        } else {
            weeks as u32
        };

        Ok(Self {
            origin,
            destination,
            weeks,
        })
    }

    fn parse_code(field: &str, value: &str) -> Result<String, FareError> {
        let code = value.trim().to_uppercase();
        if code.is_empty() {
            return Err(FareError::InvalidInput(format!("missing {}", field)));
        }
        if !location_code_pattern().is_match(&code) {
            return Err(FareError::InvalidInput(format!(
                "{} must be a 3-character location code, got {}",
                field, value
            )));
        }
        Ok(code)
    }

    /// Route key in `ORIGIN-DEST` form
    pub fn route(&self) -> String {
        format!("{}-{}", self.origin, self.destination)
    }
}

/// Where a sampled price came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceSource {
    #[default]
    Live,
    Estimated,
}

/// One weekly sample of the route's market price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub week: u32,
    pub date: NaiveDate,
    pub price: f64,
    pub currency: String,
    #[serde(skip)]
    pub source: PriceSource,
}

/// Category of the purchase recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationLevel {
    Strong,
    Moderate,
    #[default]
    Stable,
}

/// Result of tracking one route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAnalysis {
    pub route: String,
    pub track_weeks: u32,
    pub data_points: Vec<PricePoint>,
    pub min_price: f64,
    pub max_price: f64,
    pub avg_price: f64,
    pub best_date: Option<NaiveDate>,
    pub recommendation: String,
    pub recommendation_level: RecommendationLevel,
    pub created_at: DateTime<Utc>,
}

impl PriceAnalysis {
    /// Number of data points that fell back to the estimation model
    pub fn estimated_count(&self) -> usize {
        self.data_points
            .iter()
            .filter(|p| p.source == PriceSource::Estimated)
            .count()
    }
}

/// Chart-ready view of a [`PriceAnalysis`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTrend {
    pub route: String,
    pub weeks: u32,
    pub labels: Vec<String>, // MM/DD per data point
    pub prices: Vec<f64>,
    pub week_nums: Vec<u32>,
    pub summary: PriceAnalysis,
}

/// Flight-offer search response body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlightOffersResponse {
    #[serde(default)]
    pub data: Vec<FlightOffer>,
}

/// A single priced offer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlightOffer {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub price: OfferPrice,
    #[serde(default)]
    pub itineraries: Vec<Itinerary>,
}

/// Offer price; `total` is a decimal string on the wire
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfferPrice {
    #[serde(default)]
    pub total: String,
    #[serde(default)]
    pub currency: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Itinerary {
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    #[serde(default)]
    pub carrier_code: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub departure: SegmentEndpoint,
    #[serde(default)]
    pub arrival: SegmentEndpoint,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentEndpoint {
    #[serde(default)]
    pub iata_code: String,
    #[serde(default)]
    pub terminal: String,
    #[serde(default)]
    pub at: String,
}
