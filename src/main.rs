use anyhow::Result;
use clap::Parser;
use feedback_loop::app::ConfiguredServices;
use feedback_loop::models::Config;
use feedback_loop::web::{self, AppState};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "feedback-loop")]
#[command(about = "Serve the text-image feedback loop UI")]
struct CliArgs {
    /// Address to bind the web UI to (overrides BIND_ADDR).
    #[arg(long, value_name = "ADDR", value_parser = parse_bind_arg)]
    bind: Option<String>,
}

fn parse_bind_arg(input: &str) -> std::result::Result<String, String> {
    input
        .parse::<std::net::SocketAddr>()
        .map(|addr| addr.to_string())
        .map_err(|_| format!("Invalid address '{}'. Expected HOST:PORT, e.g. 127.0.0.1:8501", input))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feedback_loop=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting feedback-loop");

    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let bind_addr = args.bind.unwrap_or_else(|| config.bind_addr.clone());
    let state = AppState::new(
        Arc::new(ConfiguredServices::new(config.clone())),
        config.max_iterations,
    );

    if let Err(e) = web::serve(&bind_addr, state).await {
        error!("Server failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_bind_arg;

    #[test]
    fn test_parse_bind_arg_valid() {
        assert_eq!(parse_bind_arg("0.0.0.0:8080").unwrap(), "0.0.0.0:8080");
    }

    #[test]
    fn test_parse_bind_arg_invalid() {
        let err = parse_bind_arg("localhost").unwrap_err();
        assert!(err.contains("HOST:PORT"));
    }
}
