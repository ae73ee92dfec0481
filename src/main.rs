use clap::{Parser, Subcommand};
use sleepmap::config::AppConfig;
use sleepmap::types::VariableKey;
use sleepmap::{build_controller, generate, server};
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
    /// Render the map SVGs and a static page into the output directory
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Only render this variable
        #[arg(short, long, value_parser = parse_variable)]
        variable: Option<VariableKey>,
    },
    /// Serve the interactive map
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

fn parse_variable(s: &str) -> Result<VariableKey, String> {
    s.parse().map_err(|e: anyhow::Error| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate { config, variable } => {
            info!("Generating map with config: {:?}", config);
            let app_config = AppConfig::load_from_file(config)?;
            let mut controller = build_controller(&app_config).await?;

            let variables = match variable {
                Some(v) => vec![*v],
                None => VariableKey::ALL.to_vec(),
            };
            let written = generate::write_maps(&mut controller, &app_config.output.dir, &variables)?;

            info!("Generation complete, {} files written", written.len());
        }
        Commands::Serve { config } => {
            info!("Serving map with config: {:?}", config);
            let app_config = AppConfig::load_from_file(config)?;
            let controller = build_controller(&app_config).await?;

            server::start_server(&app_config, controller).await?;
        }
    }

    Ok(())
}
