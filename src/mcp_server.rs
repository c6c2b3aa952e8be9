// src/mcp_server.rs

use rmcp::{
    ServerHandler, ServiceExt,
    model::{ServerCapabilities, ServerInfo},
    schemars, tool,
    transport::stdio,
};
use fare_tracker::{
    tracker::build_trend, AmadeusClient, PriceAnalysis, PriceTrackRequest, PriceTracker,
    RouteCache, TrackerConfig, tracker_from_config, DEFAULT_TRACK_WEEKS,
};
use serde::Deserialize;
use anyhow::Result;
use tracing::{info, warn, error, debug};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Analyses are reused for this long per route
const CACHE_TTL: Duration = Duration::from_secs(30 * 60);
const CACHE_CAPACITY: usize = 64;

/// Price tracking MCP server
#[derive(Clone)]
pub struct FareServer {
    tracker: Arc<PriceTracker<AmadeusClient>>,
    cache: Arc<RouteCache>,
}

impl FareServer {
    pub fn new(tracker: PriceTracker<AmadeusClient>) -> Self {
        Self {
            tracker: Arc::new(tracker),
            cache: Arc::new(RouteCache::new(CACHE_CAPACITY, CACHE_TTL)),
        }
    }

    /// Initialize logging to file
    fn init_logging() -> Result<()> {
        let log_dir = PathBuf::from("logs");
        std::fs::create_dir_all(&log_dir)?;

        // stdout is the MCP transport, so logs go to a daily rolling file
        let file_appender = tracing_appender::rolling::daily(&log_dir, "fare-tracker-mcp.log");
        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        tracing_subscriber::registry()
            .with(
                EnvFilter::new(&level)
                    .add_directive(format!("fare_tracker={}", level).parse()?)
                    .add_directive("reqwest=info".parse()?)
                    .add_directive("hyper=info".parse()?)
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .json()
            )
            .init();

        info!("Logging initialized - logs will be written to logs/fare-tracker-mcp.log.*");
        Ok(())
    }

    /// Cached analysis for the request, or a fresh track stored in the cache
    async fn analysis_for(&self, request: &PriceTrackRequest) -> Arc<PriceAnalysis> {
        let route = request.route();
        if let Some(analysis) = self.cache.get(&route, request.weeks) {
            debug!(route = %route, "Serving cached analysis");
            return analysis;
        }

        let analysis = self.tracker.track_prices(request).await;
        self.cache.insert(analysis)
    }
}

/// Route parameters shared by both tools
#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct TrackParams {
    #[schemars(description = "Origin airport or city code (e.g., TPE)")]
    pub origin: String,
    #[schemars(description = "Destination airport or city code (e.g., TYO)")]
    pub destination: String,
    #[schemars(description = "Number of weeks to track, 1-52 (default: 18)")]
    pub weeks: Option<i64>,
}

impl TrackParams {
    fn to_request(&self) -> Result<PriceTrackRequest, String> {
        let weeks = self.weeks.unwrap_or(DEFAULT_TRACK_WEEKS as i64);
        PriceTrackRequest::new(&self.origin, &self.destination, weeks).map_err(|e| e.to_string())
    }
}

#[tool(tool_box)]
impl FareServer {
    /// Track prices for a route over the coming weeks
    #[tool(description = "Track flight prices for a route over the coming weeks. Returns weekly data points, min/max/average price, the best departure date and a recommendation.")]
    async fn track_flight_prices(
        &self,
        #[tool(aggr)] params: TrackParams,
    ) -> String {
        info!(
            origin = %params.origin,
            destination = %params.destination,
            weeks = params.weeks.unwrap_or(DEFAULT_TRACK_WEEKS as i64),
            "Price tracking request received"
        );

        let request = match params.to_request() {
            Ok(request) => request,
            Err(e) => {
                warn!("Rejected tracking request: {}", e);
                return serde_json::json!({ "error": e }).to_string();
            }
        };

        let analysis = self.analysis_for(&request).await;
        serde_json::to_string_pretty(analysis.as_ref()).unwrap_or_else(|e| {
            error!("Failed to serialize analysis: {}", e);
            serde_json::json!({ "error": format!("Failed to serialize analysis: {}", e) }).to_string()
        })
    }

    /// Chart-ready price trend for a route
    #[tool(description = "Get a chart-ready price trend for a route: parallel arrays of date labels (MM/DD), prices and week numbers, plus the full analysis summary.")]
    async fn get_price_trend(
        &self,
        #[tool(aggr)] params: TrackParams,
    ) -> String {
        info!(
            origin = %params.origin,
            destination = %params.destination,
            "Price trend request received"
        );

        let request = match params.to_request() {
            Ok(request) => request,
            Err(e) => {
                warn!("Rejected trend request: {}", e);
                return serde_json::json!({ "error": e }).to_string();
            }
        };

        let analysis = self.analysis_for(&request).await;
        let trend = build_trend(analysis.as_ref().clone());
        serde_json::to_string_pretty(&trend).unwrap_or_else(|e| {
            error!("Failed to serialize trend: {}", e);
            serde_json::json!({ "error": format!("Failed to serialize trend: {}", e) }).to_string()
        })
    }
}

#[tool(tool_box)]
impl ServerHandler for FareServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("A flight price tracking server. Samples live fares week by week for a route, falling back to a seasonal price model when the provider is unavailable, and returns statistics with a booking recommendation.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging before anything else
    if let Err(e) = FareServer::init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!("Starting MCP fare tracking server");

    let config = TrackerConfig::from_env();
    if let Err(e) = config.validate() {
        warn!("{}; every week will use the estimation model", e);
    }

    let server = FareServer::new(tracker_from_config(&config)?);
    let transport = stdio();

    // SDK handles initialization, tool discovery, and message routing
    let service = server.serve(transport).await?;

    info!("MCP service started, waiting for requests");
    service.waiting().await?;

    info!("MCP service shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_default_weeks() {
        let params = TrackParams {
            origin: "tpe".to_string(),
            destination: "tyo".to_string(),
            weeks: None,
        };
        let request = params.to_request().unwrap();
        assert_eq!(request.route(), "TPE-TYO");
        assert_eq!(request.weeks, 18);
    }

    #[test]
    fn test_params_invalid_weeks() {
        let params = TrackParams {
            origin: "TPE".to_string(),
            destination: "TYO".to_string(),
            weeks: Some(0),
        };
        assert!(params.to_request().is_err());
    }
}
