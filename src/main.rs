use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use usecase_field_patcher::dispatch::{DEFAULT_PACE, DispatchOptions};
use usecase_field_patcher::io::config_read;
use usecase_field_patcher::logging::{LogContext, LogSink};
use usecase_field_patcher::{Result, patch};

fn main() {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let logging = match LogContext::new(vec![
        LogSink::Console,
        LogSink::DailyFile {
            dir: cli.log_dir.clone(),
        },
    ]) {
        Ok(logging) => logging,
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    };

    let outcome = logging.in_scope(|| {
        let result = run(&cli);
        if let Err(error) = &result {
            error!("{error}");
        }
        result
    });
    if outcome.is_err() {
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = config_read::load_config(&cli.config)?;
    info!(config = ?config, dry_run = cli.dry_run, "loaded configuration");

    let options = DispatchOptions {
        dry_run: cli.dry_run,
        pace: DEFAULT_PACE,
    };
    let summary = patch::patch_use_cases(&config, options)?;

    if cli.dry_run {
        info!(simulated = summary.simulated, skipped = summary.skipped, "dry run complete");
    } else {
        info!(
            attempted = summary.attempted(),
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            "patch run complete"
        );
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Patch custom fields for use cases from a CSV file."
)]
struct Cli {
    /// Path to the YAML config file.
    #[arg(default_value = "config.yaml")]
    config: PathBuf,

    /// Only log the intended API calls without sending them.
    #[arg(long)]
    dry_run: bool,

    /// Directory receiving the daily log file.
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}
