pub mod config;
pub mod controller;
pub mod data;
pub mod generate;
pub mod hittest;
pub mod legend;
pub mod page;
pub mod projection;
pub mod render;
pub mod scale;
pub mod server;
pub mod svg;
pub mod tooltip;
pub mod types;

use anyhow::Result;
use config::AppConfig;
use controller::SelectionController;
use render::RenderContext;

/// Loads both inputs and draws the configured initial variable.
pub async fn build_controller(config: &AppConfig) -> Result<SelectionController> {
    let (records, features) = data::load_inputs(&config.input).await?;
    let context = RenderContext::new(records, features, config.canvas, config.render.clone());
    Ok(SelectionController::new(context, config.render.initial_variable))
}
