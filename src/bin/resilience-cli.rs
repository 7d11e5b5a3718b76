use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "resilience-cli")]
#[command(about = "Management CLI for the circuit breaker and health check services", long_about = None)]
struct Cli {
    /// Circuit breaker service base URL
    #[arg(long, default_value = "http://localhost:3005")]
    breaker_url: String,

    /// Health check service base URL
    #[arg(long, default_value = "http://localhost:3006")]
    health_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show circuit breaker stats (all, or one service)
    Status { service: Option<String> },
    /// Reset a circuit breaker to CLOSED
    Reset { service: String },
    /// Probe service health (all, or one service through the cache)
    Health { service: Option<String> },
    /// Detailed health report with average latency
    Report,
    /// Health metrics summary
    Metrics,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let request_id = Uuid::new_v4().to_string();
    let mut headers = HeaderMap::new();
    headers.insert("x-request-id", HeaderValue::from_str(&request_id)?);

    let request = match &cli.command {
        Commands::Status { service: None } => client.get(format!("{}/status", cli.breaker_url)),
        Commands::Status { service: Some(s) } => client.get(format!("{}/status/{}", cli.breaker_url, s)),
        Commands::Reset { service } => client.post(format!("{}/reset/{}", cli.breaker_url, service)),
        Commands::Health { service: None } => client.get(format!("{}/check/all", cli.health_url)),
        Commands::Health { service: Some(s) } => client.get(format!("{}/check/{}", cli.health_url, s)),
        Commands::Report => client.get(format!("{}/report", cli.health_url)),
        Commands::Metrics => client.get(format!("{}/metrics", cli.health_url)),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    // Error bodies are JSON too; print them either way.
    match serde_json::from_str::<Value>(&text) {
        Ok(json) if status.is_success() => println!("{}", serde_json::to_string_pretty(&json)?),
        Ok(json) => {
            eprintln!("Error: API returned status {}", status);
            eprintln!("{}", serde_json::to_string_pretty(&json)?);
            std::process::exit(1);
        }
        Err(_) if status.is_success() => println!("{}", text),
        Err(_) => {
            eprintln!("Error: API returned status {}", status);
            eprintln!("Response: {}", text);
            std::process::exit(1);
        }
    }
    Ok(())
}
