use clap::{Parser, Subcommand};
use edumap::config::AppConfig;
use edumap::{document, export, render, server};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the choropleth map to an HTML document
    Render,
    /// Export the joined counties as GeoJSON
    Export,
    /// Render the map and serve it with a lookup API
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    info!("Using config: {:?}", cli.config);
    let app_config = AppConfig::load_from_file(&cli.config)?;

    let choropleth = edumap::prepare(&app_config).await?;

    match cli.command {
        Commands::Render => {
            let scene = render::build_scene(&app_config, &choropleth);
            document::write_document(&scene, &app_config.output.path)?;
        }
        Commands::Export => {
            export::write_geojson(&choropleth, &app_config.output.geojson)?;
        }
        Commands::Serve => {
            let scene = render::build_scene(&app_config, &choropleth);
            document::write_document(&scene, &app_config.output.path)?;
            server::start_server(&app_config, choropleth).await?;
        }
    }

    Ok(())
}
