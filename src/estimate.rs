//! Deterministic synthetic fare model used when live sampling fails

use crate::config::ReferenceTables;
use chrono::{Datelike, NaiveDate};
use std::sync::Arc;
use tracing::debug;

/// `base route price x seasonal multiplier x advance-purchase discount`
pub struct EstimationModel {
    tables: Arc<ReferenceTables>,
}

impl EstimationModel {
    pub fn new(tables: Arc<ReferenceTables>) -> Self {
        Self { tables }
    }

    /// Estimated fare for departing on `date`, sampled in `week` of `total_weeks`.
    /// Pure: identical arguments always yield the same price.
    pub fn estimate(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
        week: u32,
        total_weeks: u32,
    ) -> f64 {
        let base_price = self.tables.base_price(origin, destination);
        let seasonal = seasonal_factor(date);
        let discount = advance_discount(week, total_weeks);
        let price = (base_price * seasonal * discount).round();

        debug!(
            origin,
            destination,
            date = %date,
            base_price,
            seasonal,
            discount,
            price,
            "Estimated price"
        );
        price
    }
}

/// Peak travel months carry a multiplier, everything else is 1.0
pub fn seasonal_factor(date: NaiveDate) -> f64 {
    match date.month() {
        1 | 2 => 1.4,  // winter holidays, lunar new year
        3 | 4 => 1.3,  // cherry blossom season
        7 | 8 => 1.5,  // summer holidays
        12 => 1.4,     // christmas, new year
        _ => 1.0,
    }
}

/// Step discount over the booking window: earlier weeks are cheaper
pub fn advance_discount(week: u32, total_weeks: u32) -> f64 {
    let ratio = week as f64 / total_weeks.max(1) as f64;

    if ratio < 0.2 {
        0.7
    } else if ratio < 0.5 {
        0.8
    } else if ratio < 0.8 {
        0.9
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> EstimationModel {
        EstimationModel::new(Arc::new(ReferenceTables::default()))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_estimate_off_peak_early_week() {
        let price = model().estimate("TPE", "HKG", date(2025, 5, 15), 1, 10);
        assert_eq!(price, 2800.0);
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let model = model();
        let d = date(2025, 7, 20);
        let first = model.estimate("TPE", "NRT", d, 3, 12);
        let second = model.estimate("TPE", "NRT", d, 3, 12);
        assert_eq!(first, second);
    }

    #[test]
    fn test_estimate_unknown_route_uses_default_base() {
        // 5000 * 1.5 (August) * 1.0 (last week)
        let price = model().estimate("KIX", "LAX", date(2025, 8, 1), 10, 10);
        assert_eq!(price, 7500.0);
    }

    #[test]
    fn test_seasonal_factor() {
        assert_eq!(seasonal_factor(date(2025, 1, 10)), 1.4);
        assert_eq!(seasonal_factor(date(2025, 2, 10)), 1.4);
        assert_eq!(seasonal_factor(date(2025, 4, 10)), 1.3);
        assert_eq!(seasonal_factor(date(2025, 5, 10)), 1.0);
        assert_eq!(seasonal_factor(date(2025, 7, 10)), 1.5);
        assert_eq!(seasonal_factor(date(2025, 11, 10)), 1.0);
        assert_eq!(seasonal_factor(date(2025, 12, 10)), 1.4);
    }

    #[test]
    fn test_advance_discount_steps() {
        assert_eq!(advance_discount(1, 10), 0.7);
        assert_eq!(advance_discount(2, 10), 0.8);
        assert_eq!(advance_discount(4, 10), 0.8);
        assert_eq!(advance_discount(5, 10), 0.9);
        assert_eq!(advance_discount(7, 10), 0.9);
        assert_eq!(advance_discount(8, 10), 1.0);
        assert_eq!(advance_discount(10, 10), 1.0);
        assert_eq!(advance_discount(1, 1), 1.0);
    }
}
