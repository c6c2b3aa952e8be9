//! Price track engine: sample a route across weekly buckets and aggregate.
//!
//! Week `n` (1-based) is searched `(n-1)*7` days from today for a departure
//! 30 days after that. Weeks are sampled concurrently up to a bounded width
//! and collected back into week order before the single aggregation pass.

use crate::client::OfferSource;
use crate::models::{PriceAnalysis, PricePoint, PriceTrackRequest, PriceTrend, RecommendationLevel};
use crate::sampler::PriceSampler;
use chrono::{Duration, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument};

/// Days between the search date and the sampled departure
pub const DEPARTURE_OFFSET_DAYS: i64 = 30;

pub struct PriceTracker<S> {
    sampler: PriceSampler<S>,
    concurrency: usize,
}

impl<S: OfferSource> PriceTracker<S> {
    pub fn new(sampler: PriceSampler<S>, concurrency: usize) -> Self {
        Self {
            sampler,
            concurrency: concurrency.max(1),
        }
    }

    /// The sampler behind every week, for flushing its audit writes
    pub fn sampler(&self) -> &PriceSampler<S> {
        &self.sampler
    }

    /// Track the route starting from today
    pub async fn track_prices(&self, request: &PriceTrackRequest) -> PriceAnalysis {
        self.track_prices_from(request, Utc::now().date_naive()).await
    }

    /// Track the route with week 1 searched on `today`
    #[instrument(level = "info", skip(self, request), fields(route = %request.route(), weeks = request.weeks))]
    pub async fn track_prices_from(&self, request: &PriceTrackRequest, today: NaiveDate) -> PriceAnalysis {
        info!("Starting price tracking");
        let start_time = std::time::Instant::now();
        let created_at = Utc::now();

        let mut data_points: Vec<PricePoint> = stream::iter(1..=request.weeks)
            .map(|week| self.sample_week(request, today, week))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        data_points.sort_by_key(|point| point.week);

        let mut analysis = PriceAnalysis {
            route: request.route(),
            track_weeks: request.weeks,
            data_points,
            min_price: 0.0,
            max_price: 0.0,
            avg_price: 0.0,
            best_date: None,
            recommendation: String::new(),
            recommendation_level: RecommendationLevel::default(),
            created_at,
        };
        calculate_statistics(&mut analysis);

        info!(
            duration_ms = start_time.elapsed().as_millis(),
            min_price = analysis.min_price,
            max_price = analysis.max_price,
            avg_price = analysis.avg_price,
            estimated_weeks = analysis.estimated_count(),
            "Price tracking completed"
        );
        analysis
    }

    /// Track the route and reshape the result for charting
    pub async fn generate_price_trend(&self, request: &PriceTrackRequest) -> PriceTrend {
        let analysis = self.track_prices(request).await;
        build_trend(analysis)
    }

    async fn sample_week(&self, request: &PriceTrackRequest, today: NaiveDate, week: u32) -> PricePoint {
        let search_date = today + Duration::days(((week - 1) * 7) as i64);
        let travel_date = search_date + Duration::days(DEPARTURE_OFFSET_DAYS);
        debug!(week, search_date = %search_date, travel_date = %travel_date, "Sampling week");

        let sample = self
            .sampler
            .sample_price(&request.origin, &request.destination, travel_date, week, request.weeks)
            .await;

        PricePoint {
            week,
            date: travel_date,
            price: sample.price,
            currency: self.sampler.currency().to_string(),
            source: sample.source,
        }
    }
}

/// Fill min/max/avg, best date and the recommendation from the data points.
///
/// Ties on the minimum keep the earliest week.
pub fn calculate_statistics(analysis: &mut PriceAnalysis) {
    let Some(first) = analysis.data_points.first() else {
        return;
    };

    let mut min_price = first.price;
    let mut max_price = first.price;
    let mut best_date = first.date;
    let mut sum = 0.0;

    for point in &analysis.data_points {
        if point.price < min_price {
            min_price = point.price;
            best_date = point.date;
        }
        if point.price > max_price {
            max_price = point.price;
        }
        sum += point.price;
    }

    analysis.min_price = min_price;
    analysis.max_price = max_price;
    analysis.avg_price = sum / analysis.data_points.len() as f64;
    analysis.best_date = Some(best_date);

    let (level, text) = recommend(analysis.min_price, analysis.avg_price, best_date);
    analysis.recommendation_level = level;
    analysis.recommendation = text;
}

/// Recommendation from how far the cheapest week sits below the average
pub fn recommend(min_price: f64, avg_price: f64, best_date: NaiveDate) -> (RecommendationLevel, String) {
    let savings = avg_price - min_price;
    let savings_ratio = if avg_price > 0.0 { savings / avg_price * 100.0 } else { 0.0 };
    let date = best_date.format("%Y-%m-%d");

    if savings_ratio > 20.0 {
        (
            RecommendationLevel::Strong,
            format!(
                "Strongly recommended: depart on {}. At {:.0} it is the lowest fare, saving {:.0} ({:.0}%) against the average",
                date, min_price, savings, savings_ratio
            ),
        )
    } else if savings_ratio > 10.0 {
        (
            RecommendationLevel::Moderate,
            format!(
                "Consider departing on {}: {:.0} is a good fare, saving {:.0} ({:.0}%) against the average",
                date, min_price, savings, savings_ratio
            ),
        )
    } else {
        (
            RecommendationLevel::Stable,
            "Prices are stable; pick a departure date that suits your schedule".to_string(),
        )
    }
}

/// Parallel arrays of label, price and week number per data point
pub fn build_trend(analysis: PriceAnalysis) -> PriceTrend {
    let labels = analysis
        .data_points
        .iter()
        .map(|p| p.date.format("%m/%d").to_string())
        .collect();
    let prices = analysis.data_points.iter().map(|p| p.price).collect();
    let week_nums = analysis.data_points.iter().map(|p| p.week).collect();

    PriceTrend {
        route: analysis.route.clone(),
        weeks: analysis.track_weeks,
        labels,
        prices,
        week_nums,
        summary: analysis,
    }
}
