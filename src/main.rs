pub mod config;
pub mod data;
pub mod document;
pub mod generate;
pub mod join;
pub mod path;
pub mod render;
pub mod scale;
pub mod server;
pub mod tooltip;
pub mod topology;
pub mod types;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the choropleth page to disk
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Render the page and serve it with the hover API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate { config } => {
            info!("Generating map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let (page, result) = generate::build_page(&app_config).await;
            // the header-only page is still written when loading fails
            generate::write_outputs(&app_config, &page)?;
            result?;

            info!("Generation complete!");
        }
        Commands::Serve { config } => {
            info!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let (page, result) = generate::build_page(&app_config).await;
            let map = result?;
            let state = server::AppState::new(page.to_html(), map);

            server::start_server(&app_config, state).await?;
        }
    }

    Ok(())
}
