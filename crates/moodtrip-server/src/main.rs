//! MoodTrip: emotion-driven travel recommendation server.

use std::path::PathBuf;
use std::sync::Arc;

use moodtrip_core::{ModelConfig, MoodTripConfig};
use moodtrip_runtime::{Orchestrator, Services};
use moodtrip_server::{build_router, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn resolve_data_dir() -> PathBuf {
    std::env::var("MOODTRIP_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_data = dir.join("../data");
                if parent_data.exists() {
                    return parent_data;
                }
            }
            PathBuf::from("data")
        })
}

fn print_help() {
    println!("MoodTrip: emotion-driven travel recommendations");
    println!();
    println!("Usage: moodtrip [command]");
    println!();
    println!("Commands:");
    println!("  (none)      Start the server");
    println!("  help        Show this help message");
    println!();
    println!("Environment:");
    println!("  PORT                       HTTP port (default 3010)");
    println!("  MOODTRIP_DATA_DIR          Data directory");
    println!("  MOODTRIP_API_KEY           Chat-completions API key");
    println!("  MOODTRIP_SESSION_BACKEND   memory | sqlite");
    println!("  MOODTRIP_TOP_K             Places enriched per request (default 5)");
    println!("  MOODTRIP_MAX_QUESTIONS     Dialogue question cap (default 3)");
    println!("  MOODTRIP_WEIGHT_RATING     Score per rating point (default 10)");
    println!("  MOODTRIP_WEIGHT_KEYWORD    Score per matched keyword (default 20)");
    println!("  MOODTRIP_DISTANCE_CEILING  Distance bonus at 0 m (default 50)");
    println!("  MOODTRIP_DISTANCE_DIVISOR  Meters per lost bonus point (default 100)");
    println!("  OPENWEATHER_API_KEY        Enables weather enrichment");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'moodtrip help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = MoodTripConfig::from_env(&data_dir)?;
    let model_config = ModelConfig::load(&config.data_paths.model_config_file);
    let port = config.port;

    let services = Services::from_config(&config, &model_config)
        .map_err(|e| anyhow::anyhow!("Failed to build services: {}", e))?;
    let state = Arc::new(AppState::new(config, model_config, Orchestrator::new(services)));

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("MoodTrip server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
