use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use bqmirror_engine::discover_catalogue;

use super::Overrides;

/// Execute the `discover` command: list source tables and views as a
/// catalogue snippet ready to paste into a config file.
pub async fn execute(config_path: &Path) -> Result<ExitCode> {
    let config = super::load_config(config_path, &Overrides::default())?;
    let warehouse = super::build_warehouse(&config).await?;

    let source = config.target().source;
    let catalogue = discover_catalogue(&config, warehouse.as_ref())
        .await
        .with_context(|| format!("Failed to list objects in {source}"))?;

    println!(
        "Discovered {} table(s) and {} view(s) in {source}:\n",
        catalogue.tables().len(),
        catalogue.views().len()
    );
    print!("{}", catalogue.to_yaml_snippet());

    Ok(ExitCode::SUCCESS)
}
