//! HTTP client for the Amadeus flight-offer search API

use crate::config::TrackerConfig;
use crate::token::TokenCache;
use crate::FareError;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use tracing::{debug, error, info, instrument};

/// Raw body of a successful offer search, kept verbatim for auditing
#[derive(Debug, Clone, PartialEq)]
pub struct RawOfferResponse {
    pub body: String,
}

/// A source of flight offers for one route and departure date
#[async_trait]
pub trait OfferSource: Send + Sync {
    async fn search_offers(
        &self,
        origin: &str,
        destination: &str,
        departure_date: NaiveDate,
    ) -> Result<RawOfferResponse, FareError>;
}

/// Live provider client; every search first obtains a token from the shared cache
pub struct AmadeusClient {
    http_client: Client,
    tokens: TokenCache,
    base_url: String,
    currency: String,
    max_results: u32,
}

impl AmadeusClient {
    /// Create a new provider client
    pub fn new(config: &TrackerConfig) -> Result<Self, FareError> {
        debug!("Creating new Amadeus client");
        let http_client = Client::builder()
            .user_agent(concat!("fare-tracker/", env!("CARGO_PKG_VERSION")))
            .timeout(config.http_timeout)
            .build()?;

        let tokens = TokenCache::new(
            http_client.clone(),
            &config.auth_url,
            &config.api_key,
            &config.api_secret,
        );

        debug!("Amadeus client created successfully");
        Ok(Self {
            http_client,
            tokens,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            currency: config.currency.clone(),
            max_results: config.max_results,
        })
    }
}

#[async_trait]
impl OfferSource for AmadeusClient {
    #[instrument(level = "info", skip(self))]
    async fn search_offers(
        &self,
        origin: &str,
        destination: &str,
        departure_date: NaiveDate,
    ) -> Result<RawOfferResponse, FareError> {
        let token = self.tokens.get_token().await?;

        let url = format!("{}/shopping/flight-offers", self.base_url);
        let date = departure_date.format("%Y-%m-%d").to_string();
        let max = self.max_results.to_string();
        let params = [
            ("originLocationCode", origin),
            ("destinationLocationCode", destination),
            ("departureDate", date.as_str()),
            ("adults", "1"),
            ("currencyCode", self.currency.as_str()),
            ("max", max.as_str()),
        ];

        info!(url = %url, "Making offer search request");

        let start_time = std::time::Instant::now();
        let response = self
            .http_client
            .get(&url)
            .query(&params)
            .bearer_auth(&token)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        info!(
            status = %status,
            duration_ms = start_time.elapsed().as_millis(),
            body_length = body.len(),
            "Offer search completed"
        );

        if status != reqwest::StatusCode::OK {
            error!(status = %status, body = %body, "Offer search failed");
            return Err(FareError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        Ok(RawOfferResponse { body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/v1/security/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok",
                "expires_in": 1799
            })))
            .mount(server)
            .await;
    }

    fn config_for(server: &MockServer) -> TrackerConfig {
        TrackerConfig {
            api_key: "id".to_string(),
            api_secret: "secret".to_string(),
            base_url: format!("{}/v2/", server.uri()),
            auth_url: format!("{}/v1/security/oauth2/token", server.uri()),
            ..TrackerConfig::default()
        }
    }

    #[test]
    fn test_client_creation() {
        let client = AmadeusClient::new(&TrackerConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_search_sends_query_and_bearer_token() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/v2/shopping/flight-offers"))
            .and(header("authorization", "Bearer tok"))
            .and(query_param("originLocationCode", "TPE"))
            .and(query_param("destinationLocationCode", "NRT"))
            .and(query_param("departureDate", "2025-05-01"))
            .and(query_param("adults", "1"))
            .and(query_param("currencyCode", "TWD"))
            .and(query_param("max", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":[]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let client = AmadeusClient::new(&config_for(&server)).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let raw = client.search_offers("TPE", "NRT", date).await.unwrap();
        assert_eq!(raw.body, r#"{"data":[]}"#);
    }

    #[tokio::test]
    async fn test_search_non_200_is_provider_error() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/v2/shopping/flight-offers"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = AmadeusClient::new(&config_for(&server)).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        match client.search_offers("TPE", "NRT", date).await {
            Err(FareError::Provider { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_fails_when_token_exchange_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/security/oauth2/token"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = AmadeusClient::new(&config_for(&server)).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let result = client.search_offers("TPE", "NRT", date).await;
        assert!(matches!(result, Err(FareError::Token { status: 500, .. })));
    }
}
