use crate::render::RenderContext;
use crate::types::VariableKey;
use anyhow::Result;
use tracing::{info, warn};

/// Applies variable selections coming from the selector control.
pub struct SelectionController {
    context: RenderContext,
}

impl SelectionController {
    /// Takes ownership of `context` and draws the initial variable.
    pub fn new(mut context: RenderContext, initial: VariableKey) -> Self {
        context.render(initial);
        Self { context }
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Handles a change event carrying the selector's raw value. Unknown
    /// values are rejected and the current map stays as it is.
    pub fn on_change(&mut self, value: &str) -> Result<VariableKey> {
        let variable: VariableKey = value.parse().map_err(|e| {
            warn!(value, "Ignoring unknown variable selection");
            e
        })?;
        self.select(variable);
        Ok(variable)
    }

    pub fn select(&mut self, variable: VariableKey) {
        info!(variable = %variable, "Variable selected");
        self.context.render(variable);
    }
}
