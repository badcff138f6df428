//! gemini-relay: streaming HTTP front-end for Gemini text generation
//!
//! Forwards article excerpts and chat histories to the Gemini API and
//! streams the generated text back to HTTP clients as it is produced.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use gemini_relay::config::AppConfig;
use gemini_relay::run_server;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Parser)]
#[command(name = "gemini-relay")]
#[command(version = "0.1.0")]
#[command(about = "Streaming HTTP relay for Gemini text generation")]
#[command(long_about = "
gemini-relay fronts the Gemini API with two streaming endpoints:
  POST /api/summary  - stream a short summary of an article excerpt
  POST /api/chat     - stream the next reply for a conversation

The GEMINI_API_KEY environment variable must be set.

Example usage:
  gemini-relay run
  gemini-relay run --config config.yaml --port 8080
  gemini-relay test-upstream
")]
struct Cli {
    /// Path to config file (optional; defaults apply without one)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Set logging level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Run {
        /// Override listen port
        #[arg(short, long)]
        port: Option<u16>,
        /// Override model identifier (e.g. "gemini-2.5-flash")
        #[arg(long)]
        model: Option<String>,
    },

    /// Validate configuration file and environment
    CheckConfig,

    /// Test connection to the Gemini API
    TestUpstream,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level_filter = if let Some(level) = cli.log_level {
        level.to_string()
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
            .to_string()
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&level_filter))
        .init();

    match cli.command {
        Commands::Run { port, model } => {
            run_relay(cli.config, port, model).await?;
        }
        Commands::CheckConfig => {
            check_config(cli.config);
        }
        Commands::TestUpstream => {
            test_upstream(cli.config).await?;
        }
    }

    Ok(())
}

/// Run the relay server
async fn run_relay(
    config_path: Option<PathBuf>,
    port_override: Option<u16>,
    model_override: Option<String>,
) -> anyhow::Result<()> {
    let mut config = load_config_or_exit(config_path.as_deref());

    if let Some(port) = port_override {
        config.server.port = port;
    }
    if let Some(model) = model_override {
        config.upstream.model = model;
    }

    let api_key = resolve_api_key_or_exit();

    run_server(config, api_key).await
}

/// Validate configuration and environment
fn check_config(config_path: Option<PathBuf>) {
    let config = load_config_or_exit(config_path.as_deref());

    println!("✓ Configuration is valid\n");
    println!("Server:");
    println!("  Listen: {}:{}", config.server.host, config.server.port);
    println!("\nUpstream:");
    println!("  URL: {}", config.upstream.base_url());
    println!("  Model: {}", config.upstream.model);
    println!("  Timeout: {}s", config.upstream.timeout_seconds);
    println!("\nSafety thresholds:");
    println!("  Harassment: {:?}", config.upstream.safety.harassment);
    println!("  Hate speech: {:?}", config.upstream.safety.hate_speech);
    println!(
        "  Sexually explicit: {:?}",
        config.upstream.safety.sexually_explicit
    );
    println!(
        "  Dangerous content: {:?}",
        config.upstream.safety.dangerous_content
    );

    match AppConfig::resolve_api_key() {
        Ok(_) => println!("\n✓ GEMINI_API_KEY is set"),
        Err(e) => println!("\n✗ {}", e),
    }
}

/// Test connection to the Gemini API
async fn test_upstream(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config_or_exit(config_path.as_deref());
    let api_key = resolve_api_key_or_exit();

    let model_url = format!(
        "{}/v1beta/models/{}",
        config.upstream.base_url(),
        config.upstream.model
    );

    println!("Testing connection to upstream: {}", model_url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()?;

    match client
        .get(&model_url)
        .header("x-goog-api-key", &api_key)
        .send()
        .await
    {
        Ok(resp) => {
            if resp.status().is_success() {
                println!("✓ Upstream is reachable");
                println!("  Status: {}", resp.status());
                if let Ok(body) = resp.text().await {
                    if let Ok(json) = serde_json::from_str::<serde_json::Value>(&body) {
                        if let Some(name) = json.get("displayName").and_then(|n| n.as_str()) {
                            println!("  Model: {}", name);
                        }
                    }
                }
            } else {
                println!("✗ Upstream returned error status: {}", resp.status());
                if let Ok(body) = resp.text().await {
                    println!("  Response: {}", body.trim());
                }
            }
        }
        Err(e) => {
            println!("✗ Failed to connect to upstream: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Load configuration or exit with error
fn load_config_or_exit(config_path: Option<&std::path::Path>) -> AppConfig {
    match AppConfig::load_or_default(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    }
}

/// Read the API key from the environment or exit
fn resolve_api_key_or_exit() -> String {
    match AppConfig::resolve_api_key() {
        Ok(key) => key,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("\nSet the key in your environment or .env tooling:");
            eprintln!("  export GEMINI_API_KEY=your-key");
            std::process::exit(1);
        }
    }
}
