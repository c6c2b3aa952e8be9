//! Reduce a provider response to one representative market price.
//!
//! Providers list many offers per carrier at slightly different fares.
//! Only the cheapest offer of each carrier is kept and the representative
//! price is the mean over carriers, so an airline with dense inventory does
//! not dominate the figure.

use crate::config::ReferenceTables;
use crate::models::FlightOffer;
use crate::FareError;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Per-carrier minimums of one response and the statistics derived from them
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPrice {
    /// Mean of the per-carrier minimum prices
    pub representative: f64,
    /// Carrier display name -> lowest total price seen for that carrier
    pub carrier_prices: BTreeMap<String, f64>,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub std_dev: f64,
}

pub struct OfferNormalizer {
    tables: Arc<ReferenceTables>,
}

impl OfferNormalizer {
    pub fn new(tables: Arc<ReferenceTables>) -> Self {
        Self { tables }
    }

    /// Deduplicate offers per carrier and derive the representative price.
    ///
    /// Offers without an itinerary or segment, and offers whose total does
    /// not parse to a positive number, are skipped individually. Fails with [`FareError::NoOffers`]
    /// when nothing usable remains.
    pub fn normalize(&self, offers: &[FlightOffer]) -> Result<NormalizedPrice, FareError> {
        debug!(raw_offers = offers.len(), "Normalizing provider offers");

        let mut carrier_prices: BTreeMap<String, f64> = BTreeMap::new();

        for offer in offers {
            let Some(segment) = offer
                .itineraries
                .first()
                .and_then(|itinerary| itinerary.segments.first())
            else {
                debug!(offer_id = %offer.id, "Skipping offer without segments");
                continue;
            };

            let price = match offer.price.total.trim().parse::<f64>() {
                Ok(price) if price.is_finite() && price > 0.0 => price,
                _ => {
                    debug!(offer_id = %offer.id, total = %offer.price.total, "Skipping offer without a usable price");
                    continue;
                }
            };

            let carrier = self.tables.carrier_name(&segment.carrier_code);
            carrier_prices
                .entry(carrier.to_string())
                .and_modify(|existing| *existing = existing.min(price))
                .or_insert(price);
        }

        if carrier_prices.is_empty() {
            return Err(FareError::NoOffers);
        }

        let count = carrier_prices.len() as f64;
        let representative = carrier_prices.values().sum::<f64>() / count;
        let min = carrier_prices.values().copied().fold(f64::INFINITY, f64::min);
        let max = carrier_prices.values().copied().fold(f64::NEG_INFINITY, f64::max);
        let std_dev = (carrier_prices
            .values()
            .map(|p| (p - representative).powi(2))
            .sum::<f64>()
            / count)
            .sqrt();

        let mut ranked: Vec<(&String, &f64)> = carrier_prices.iter().collect();
        ranked.sort_by(|a, b| a.1.total_cmp(b.1));
        for (rank, (carrier, price)) in ranked.iter().enumerate() {
            debug!(rank = rank + 1, carrier = %carrier, price = **price, "Carrier minimum");
        }

        info!(
            raw_offers = offers.len(),
            carriers = carrier_prices.len(),
            representative = representative,
            min = min,
            max = max,
            range = max - min,
            std_dev = std_dev,
            "Offers normalized"
        );

        Ok(NormalizedPrice {
            representative,
            carrier_prices,
            min,
            max,
            range: max - min,
            std_dev,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Itinerary, OfferPrice, Segment};

    fn offer(carrier: &str, total: &str) -> FlightOffer {
        FlightOffer {
            id: format!("{}-{}", carrier, total),
            price: OfferPrice {
                total: total.to_string(),
                currency: "TWD".to_string(),
            },
            itineraries: vec![Itinerary {
                duration: "PT3H".to_string(),
                segments: vec![Segment {
                    carrier_code: carrier.to_string(),
                    ..Segment::default()
                }],
            }],
        }
    }

    fn normalizer() -> OfferNormalizer {
        OfferNormalizer::new(Arc::new(ReferenceTables::default()))
    }

    #[test]
    fn test_mean_of_carrier_minimums() {
        let offers = vec![
            offer("CI", "8000.00"),
            offer("CI", "7500.00"),
            offer("CI", "9000.00"),
            offer("BR", "6000.00"),
        ];

        let normalized = normalizer().normalize(&offers).unwrap();
        assert_eq!(normalized.representative, 6750.0);
        assert_eq!(normalized.carrier_prices.len(), 2);
        assert_eq!(normalized.carrier_prices["China Airlines"], 7500.0);
        assert_eq!(normalized.carrier_prices["EVA Air"], 6000.0);
        assert_eq!(normalized.min, 6000.0);
        assert_eq!(normalized.max, 7500.0);
        assert_eq!(normalized.range, 1500.0);
        assert_eq!(normalized.std_dev, 750.0);
    }

    #[test]
    fn test_unknown_carrier_passes_through() {
        let normalized = normalizer().normalize(&[offer("ZZ", "4200")]).unwrap();
        assert_eq!(normalized.carrier_prices["ZZ"], 4200.0);
        assert_eq!(normalized.representative, 4200.0);
    }

    #[test]
    fn test_malformed_offers_are_skipped() {
        let mut no_segments = offer("CI", "100");
        no_segments.itineraries[0].segments.clear();
        let mut no_itineraries = offer("CI", "100");
        no_itineraries.itineraries.clear();

        let offers = vec![
            no_segments,
            no_itineraries,
            offer("BR", "not-a-number"),
            offer("JL", "9100.50"),
        ];

        let normalized = normalizer().normalize(&offers).unwrap();
        assert_eq!(normalized.carrier_prices.len(), 1);
        assert_eq!(normalized.representative, 9100.5);
    }

    #[test]
    fn test_non_positive_totals_are_skipped() {
        let offers = vec![offer("CI", "-500"), offer("BR", "0"), offer("JL", "0.00"), offer("NH", "7200")];

        let normalized = normalizer().normalize(&offers).unwrap();
        assert_eq!(normalized.carrier_prices.len(), 1);
        assert_eq!(normalized.representative, 7200.0);

        let result = normalizer().normalize(&[offer("CI", "-500")]);
        assert!(matches!(result, Err(FareError::NoOffers)));
    }

    #[test]
    fn test_all_malformed_is_no_offers() {
        let mut bad = offer("CI", "100");
        bad.itineraries.clear();
        let result = normalizer().normalize(&[bad.clone(), bad]);
        assert!(matches!(result, Err(FareError::NoOffers)));

        assert!(matches!(normalizer().normalize(&[]), Err(FareError::NoOffers)));
    }
}
