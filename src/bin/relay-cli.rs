use clap::{Parser, Subcommand};
use reqwest::header::ORIGIN;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Talk to a running chat relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Origin header to send, for exercising the allow-list.
    #[arg(short, long)]
    origin: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check relay liveness
    Health,
    /// Send a single user message and print the reply
    Chat {
        /// Message text
        text: String,
        /// Model to request instead of the relay's default
        #[arg(short, long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let request = match cli.command {
        Commands::Health => client.get(format!("{base}/health")),
        Commands::Chat { text, model } => {
            let mut body = json!({ "messages": [{ "role": "user", "content": text }] });
            if let Some(model) = model {
                body["model"] = Value::String(model);
            }
            client.post(format!("{base}/api/chat")).json(&body)
        }
    };
    let request = match cli.origin {
        Some(origin) => request.header(ORIGIN, origin),
        None => request,
    };

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let request_id = res
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: relay returned status {} (request {})", status, request_id);
        eprintln!("Response: {}", text);
        return Ok(());
    }

    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
