//! Preflight command: check that the repository is ready for a bump.

use clap::Args;
use tracing::{debug, instrument};

use bumpgate_core::config::Config;

/// Arguments for the `preflight` subcommand.
#[derive(Args, Debug, Default)]
pub struct PreflightArgs {
    /// Treat warnings as blocking
    #[arg(long)]
    pub strict: bool,
}

/// Run the validation engine and display results.
///
/// Exits with an error when any step reports a blocking issue (or, with
/// `--strict`, any warning).
#[instrument(name = "cmd_preflight", skip_all, fields(json_output))]
pub async fn cmd_preflight(
    args: PreflightArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, strict = args.strict, "executing preflight command");

    let summary = super::run_validation(config, cwd, global_json).await?;

    if global_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        super::print_summary(&summary);
    }

    if !summary.can_proceed {
        anyhow::bail!("repository is not ready for a version bump");
    }
    if args.strict && summary.has_warnings {
        anyhow::bail!("validation reported warnings (--strict)");
    }
    Ok(())
}
