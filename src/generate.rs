use crate::controller::SelectionController;
use crate::page::{file_name, render_page, MapSource};
use crate::types::VariableKey;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes `map_<key>.svg` for each requested variable plus `index.html` into
/// `out_dir`. The page starts on the first variable written.
pub fn write_maps(
    controller: &mut SelectionController,
    out_dir: &Path,
    variables: &[VariableKey],
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", out_dir))?;

    let mut written = Vec::with_capacity(variables.len() + 1);
    let mut first_svg = None;

    for &variable in variables {
        controller.select(variable);
        let svg = controller.context().svg();
        let path = out_dir.join(file_name(variable));
        fs::write(&path, &svg).with_context(|| format!("Failed to write map: {:?}", path))?;
        info!("Wrote {:?}", path);
        written.push(path);
        first_svg.get_or_insert((variable, svg));
    }

    if let Some((variable, svg)) = first_svg {
        let index = out_dir.join("index.html");
        fs::write(&index, render_page(&svg, variable, MapSource::Files))
            .with_context(|| format!("Failed to write page: {:?}", index))?;
        info!("Wrote {:?}", index);
        written.push(index);
    }

    Ok(written)
}
