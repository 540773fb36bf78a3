use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "tracker-cli")]
#[command(about = "Debug CLI for the tracker server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Bearer key for the debug routes, if the server requires one.
    #[arg(short, long, env = "TRACKER_DEBUG_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List in-memory sessions
    Sessions,
    /// Drop every in-memory session
    ClearSessions,
    /// Empty the response cache
    ClearCache,
    /// Check that the server is up
    Echo,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {key}"))?,
        );
    }

    let request = match cli.command {
        Commands::Sessions => client.get(format!("{}/api/get_sessions", cli.url)),
        Commands::ClearSessions => client.post(format!("{}/api/clear_sessions", cli.url)),
        Commands::ClearCache => client.post(format!("{}/api/clear_cache", cli.url)),
        Commands::Echo => client.get(format!("{}/api/echo", cli.url)),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {status}");
        if let Ok(text) = res.text().await {
            eprintln!("Response: {text}");
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
