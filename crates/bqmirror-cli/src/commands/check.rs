use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use bqmirror_engine::check_target;
use bqmirror_types::WarehouseError;

use super::Overrides;

/// Execute the `check` command: validate config and resolve dataset regions.
pub async fn execute(config_path: &Path) -> Result<ExitCode> {
    // 1. Parse and validate config
    let config = super::load_config(config_path, &Overrides::default())?;
    let warehouse = super::build_warehouse(&config).await?;
    let result = check_target(&config, warehouse.as_ref()).await?;
    println!("Config structure:     OK");

    // 2. Report dataset regions
    let target = config.target();
    print_location(&format!("Source {}", target.source), &result.source_location);
    print_location(
        &format!("Destination {}", target.destination),
        &result.destination_location,
    );
    if let Some(location) = &config.location {
        println!("Job location:         {location}");
    }
    if let Some(warning) = &result.location_warning {
        println!("WARNING: {warning}");
    }

    if result.is_ok() {
        println!("\nAll checks passed.");
        Ok(ExitCode::SUCCESS)
    } else {
        anyhow::bail!("One or more checks failed")
    }
}

fn print_location(label: &str, location: &Result<String, WarehouseError>) {
    match location {
        Ok(location) => println!("{label}: {location}"),
        Err(err) => println!("{label}: FAILED\n  {err}"),
    }
}
