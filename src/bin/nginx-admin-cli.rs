use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "nginx-admin-cli")]
#[command(about = "Management CLI for the nginx admin API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:49856")]
    url: String,

    /// API key, sent as a bearer token when set.
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether nginx is running
    Status,
    /// Test the live configuration
    Test,
    /// Reload nginx
    Reload,
    /// Start nginx
    Start,
    /// Stop nginx
    Stop,
    /// Stop then start nginx
    Restart,
    /// List server files
    Servers,
    /// List backups, optionally for one artifact
    Backups {
        #[arg(short, long)]
        artifact: Option<String>,
    },
    /// Snapshot the primary configuration
    Backup,
    /// Restore a backup by name
    Restore { name: String },
}

impl Commands {
    fn request(&self) -> (Method, String) {
        match self {
            Commands::Status => (Method::GET, "/api/nginx/status".into()),
            Commands::Test => (Method::POST, "/api/config/test".into()),
            Commands::Reload => (Method::POST, "/api/config/reload".into()),
            Commands::Start => (Method::POST, "/api/nginx/start".into()),
            Commands::Stop => (Method::POST, "/api/nginx/stop".into()),
            Commands::Restart => (Method::POST, "/api/nginx/restart".into()),
            Commands::Servers => (Method::GET, "/api/servers".into()),
            Commands::Backups { artifact: None } => (Method::GET, "/api/backups".into()),
            Commands::Backups {
                artifact: Some(artifact),
            } => (Method::GET, format!("/api/backups?artifact={artifact}")),
            Commands::Backup => (Method::POST, "/api/backups".into()),
            Commands::Restore { name } => {
                (Method::POST, format!("/api/backups/{name}/restore"))
            }
        }
    }
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

    let (method, path) = cli.command.request();
    let res = client
        .request(method, format!("{}{}", cli.url.trim_end_matches('/'), path))
        .headers(headers)
        .send()
        .await?;
    let success = print_response(res).await?;

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<bool, Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let body = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{body}");
    } else {
        eprintln!("Error: admin API returned status {status}");
        eprintln!("{body}");
    }
    Ok(status.is_success())
}
