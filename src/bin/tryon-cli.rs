use clap::Parser;
use serde_json::Value;

use tryon_relay::http::TRYON_PATH;
use tryon_relay::relay::{Garment, TryOnRequest, MAX_GARMENTS};

#[derive(Parser)]
#[command(name = "tryon-cli")]
#[command(about = "Submit a try-on request to a running relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// URL of the model photo.
    #[arg(short, long)]
    model: String,

    /// Garment as TYPE=URL, e.g. upper=https://example.com/shirt.jpg (repeatable).
    #[arg(short, long = "garment", value_parser = parse_garment, required = true)]
    garments: Vec<Garment>,
}

fn parse_garment(raw: &str) -> Result<Garment, String> {
    let (cloth_type, cloth_url) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected TYPE=URL, got '{}'", raw))?;
    if cloth_url.is_empty() {
        return Err("garment URL must not be empty".to_string());
    }
    Ok(Garment {
        cloth_url: cloth_url.to_string(),
        cloth_type: cloth_type.to_string(),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.garments.len() > MAX_GARMENTS {
        eprintln!("Warning: the relay accepts at most {} garments", MAX_GARMENTS);
    }

    let request = TryOnRequest {
        model_url: cli.model,
        garments: cli.garments,
    };

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}{}", cli.url.trim_end_matches('/'), TRYON_PATH))
        .json(&request)
        .send()
        .await?;

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let pretty = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|json| serde_json::to_string_pretty(&json).ok())
        .unwrap_or(text);

    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
        eprintln!("Response: {}", pretty);
        std::process::exit(1);
    }

    println!("{}", pretty);
    Ok(())
}
