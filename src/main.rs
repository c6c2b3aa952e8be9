//! CLI interface for fare-tracker

use clap::{Parser, Subcommand};
use fare_tracker::{tracker_from_config, PriceTrackRequest, TrackerConfig, DEFAULT_TRACK_WEEKS};
use std::fs;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fare-tracker")]
#[command(about = "Track flight prices for a route over the coming weeks")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Track prices and print the full analysis
    Track {
        /// Origin airport or city code
        #[arg(short, long)]
        from: String,
        /// Destination airport or city code
        #[arg(short, long)]
        to: String,
        /// Number of weeks to track (1-52)
        #[arg(short, long, default_value_t = DEFAULT_TRACK_WEEKS as i64)]
        weeks: i64,
        /// Output file for JSON results
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Track prices and print chart-ready trend arrays
    Trend {
        /// Origin airport or city code
        #[arg(short, long)]
        from: String,
        /// Destination airport or city code
        #[arg(short, long)]
        to: String,
        /// Number of weeks to track (1-52)
        #[arg(short, long, default_value_t = DEFAULT_TRACK_WEEKS as i64)]
        weeks: i64,
        /// Output file for JSON results
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string())))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn write_output(json: &str, output: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(output_file) = output {
        fs::write(&output_file, json)?;
        println!("Results saved to {}", output_file);
    } else {
        println!("{}", json);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();

    let config = TrackerConfig::from_env();
    if let Err(e) = config.validate() {
        warn!("{}; every week will use the estimation model", e);
    }
    let tracker = tracker_from_config(&config)?;

    match cli.command {
        Commands::Track { from, to, weeks, output } => {
            let request = match PriceTrackRequest::new(&from, &to, weeks) {
                Ok(request) => request,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(2);
                }
            };

            println!("Tracking {} over {} weeks...", request.route(), request.weeks);
            let analysis = tracker.track_prices(&request).await;
            tracker.sampler().flush_history().await;
            write_output(&serde_json::to_string_pretty(&analysis)?, output)?;

            // Print summary
            println!("\nSummary:");
            println!("Lowest: {:.0} {}", analysis.min_price, config.currency);
            println!("Highest: {:.0} {}", analysis.max_price, config.currency);
            println!("Average: {:.0} {}", analysis.avg_price, config.currency);
            if let Some(best_date) = analysis.best_date {
                println!("Best departure: {}", best_date);
            }
            println!("{}", analysis.recommendation);
        }
        Commands::Trend { from, to, weeks, output } => {
            let request = match PriceTrackRequest::new(&from, &to, weeks) {
                Ok(request) => request,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(2);
                }
            };

            let trend = tracker.generate_price_trend(&request).await;
            tracker.sampler().flush_history().await;
            write_output(&serde_json::to_string_pretty(&trend)?, output)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(&[
            "fare-tracker",
            "track",
            "--from", "TPE",
            "--to", "TYO",
            "--weeks", "6",
        ]);

        assert!(cli.is_ok());

        if let Ok(Cli { command: Commands::Track { from, to, weeks, output } }) = cli {
            assert_eq!(from, "TPE");
            assert_eq!(to, "TYO");
            assert_eq!(weeks, 6);
            assert!(output.is_none());
        } else {
            panic!("expected track command");
        }
    }

    #[test]
    fn test_cli_default_weeks() {
        let cli = Cli::try_parse_from(&["fare-tracker", "trend", "-f", "TPE", "-t", "OSA"]).unwrap();
        match cli.command {
            Commands::Trend { weeks, .. } => assert_eq!(weeks, 18),
            _ => panic!("expected trend command"),
        }
    }
}
