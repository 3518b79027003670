use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Command-line client for the resilient gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show gateway health
    Health,
    /// Send a body through /run
    Run {
        /// JSON body to forward
        #[arg(default_value = "{}")]
        body: String,
        /// Request id to propagate
        #[arg(long)]
        request_id: Option<String>,
    },
    /// Ask the upstream for a completion
    Complete {
        prompt: String,
        #[arg(long)]
        max_tokens: Option<u32>,
        #[arg(long)]
        temperature: Option<f32>,
    },
    /// Call the agent demo endpoint
    Agent { message: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Run { body, request_id } => {
            let body: Value = serde_json::from_str(&body)?;
            let mut headers = HeaderMap::new();
            if let Some(id) = request_id {
                headers.insert("x-request-id", HeaderValue::from_str(&id)?);
            }
            let res = client
                .post(format!("{}/run", cli.url))
                .headers(headers)
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Complete { prompt, max_tokens, temperature } => {
            let res = client
                .post(format!("{}/completions", cli.url))
                .json(&json!({
                    "prompt": prompt,
                    "max_tokens": max_tokens,
                    "temperature": temperature,
                }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Agent { message } => {
            let res = client
                .post(format!("{}/agent/demo", cli.url))
                .json(&json!({ "message": message }))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
    }

    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
