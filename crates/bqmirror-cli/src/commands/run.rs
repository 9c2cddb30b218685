use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use bqmirror_engine::config::validator;
use bqmirror_engine::report::{render_summary, report_json};
use bqmirror_engine::{plan, run_replication, ConsoleReporter, NoopProgress, ProgressSink};
use bqmirror_types::RunStatus;

use super::Overrides;

/// Exit code for a completed run with at least one failed item.
const EXIT_PARTIAL_FAILURE: u8 = 2;

#[derive(Debug, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub json: bool,
    pub overrides: Overrides,
}

/// Execute the `run` command: parse, validate, and replicate the catalogue.
pub async fn execute(config_path: &Path, options: &RunOptions) -> Result<ExitCode> {
    // 1. Parse config and apply CLI overrides
    let config = super::load_config(config_path, &options.overrides)?;

    if options.dry_run {
        // 2. Validate; a real run validates inside `run_replication`
        validator::validate_config(&config)?;
        let ops = plan(&config);
        println!("Dry run: {} operation(s) planned", ops.len());
        for op in &ops {
            println!("  {op}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    // 3. Run
    let warehouse = super::build_warehouse(&config).await?;
    let progress: Arc<dyn ProgressSink> = if options.json {
        Arc::new(NoopProgress)
    } else {
        Arc::new(ConsoleReporter)
    };
    let report = run_replication(&config, warehouse, progress).await?;

    // 4. Report
    if options.json {
        println!("{}", report_json(&report)?);
    } else {
        print!("{}", render_summary(&report));
    }

    Ok(ExitCode::from(exit_code(report.status)))
}

fn exit_code(status: RunStatus) -> u8 {
    match status {
        RunStatus::AllSucceeded => 0,
        RunStatus::PartialFailure => EXIT_PARTIAL_FAILURE,
    }
}
