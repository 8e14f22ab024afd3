use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "cache-cli")]
#[command(about = "Management CLI for the cart-cache admin API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "ADMIN_API_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service status
    Status,
    /// Show the circuit breaker snapshot
    Cache,
    /// List cache keys matching a glob pattern
    Keys {
        #[arg(default_value = "*")]
        pattern: String,
    },
    /// Show store diagnostics (INFO)
    Info,
    /// Remove every key from the store
    Flush,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let request = match &cli.command {
        Commands::Status => client.get(format!("{base}/admin/status")),
        Commands::Cache => client.get(format!("{base}/admin/cache")),
        Commands::Keys { pattern } => client
            .get(format!("{base}/admin/cache/keys"))
            .query(&[("pattern", pattern.as_str())]),
        Commands::Info => client.get(format!("{base}/admin/cache/info")),
        Commands::Flush => client.post(format!("{base}/admin/cache/flush")),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    if let Some(info) = json.get("info").and_then(Value::as_str) {
        println!("{}", info.replace("\r\n", "\n"));
    } else {
        println!("{}", serde_json::to_string_pretty(&json)?);
    }
    Ok(())
}
