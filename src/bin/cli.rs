use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use log::{info, warn};
use tigge_retrieve::{
    ClientOptions, DEFAULT_REGION, DEFAULT_ROOT, RunOptions, TargetLayout, Variable, WebApiClient,
    enumerate_requests_with, retrieve_all,
};

#[derive(Parser, Debug)]
#[command(
    name = "tigge-retrieve",
    version,
    about = "Retrieve ECMWF TIGGE data (control and perturbed forecasts)."
)]
struct Cli {
    /// Time periods in YYYY or YYYY-MM format, followed by variables (t2m, tp, gh).
    #[arg(required = true, num_args = 2.., value_name = "PERIOD|VARIABLE")]
    items: Vec<String>,

    /// Day of the month to start retrieval. Periods where the day does not exist are skipped.
    #[arg(long = "start_day", visible_alias = "start-day", default_value_t = 1)]
    start_day: u32,

    /// Root directory of the output tree.
    #[arg(long, default_value = DEFAULT_ROOT)]
    root: PathBuf,

    /// Region code used in file names.
    #[arg(long, default_value = DEFAULT_REGION)]
    region: String,

    /// Print the planned targets without contacting the archive.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Skip requests whose target file already exists.
    #[arg(long, default_value_t = false)]
    skip_existing: bool,

    /// API rc file (JSON with url, key, email). Defaults to ~/.ecmwfapirc.
    #[arg(long)]
    rc: Option<PathBuf>,
}

/// Leading items are periods; everything from the first variable name on must be a variable.
fn split_items(items: &[String]) -> Result<(Vec<String>, Vec<Variable>)> {
    let Some(split) = items.iter().position(|s| Variable::from_name(s).is_some()) else {
        bail!("no variables given (expected one or more of t2m, tp, gh)");
    };
    if split == 0 {
        bail!("no time periods given (expected YYYY or YYYY-MM before the variables)");
    }

    let periods = items[..split].to_vec();
    let variables = items[split..]
        .iter()
        .map(|s| s.parse::<Variable>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok((periods, variables))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let (periods, variables) = split_items(&cli.items)?;

    let layout = TargetLayout::new(cli.root, cli.region);
    let plan = enumerate_requests_with(&layout, &periods, &variables, cli.start_day);
    info!(
        "{} requests planned, {} periods skipped",
        plan.requests.len(),
        plan.skipped.len()
    );

    if cli.dry_run {
        for request in &plan.requests {
            println!("{request}\t{}", request.target_path().display());
        }
        return Ok(());
    }

    let opts = ClientOptions::load(cli.rc.as_deref())?;
    if opts.key.is_none() {
        warn!("no API key configured; the archive will likely reject requests");
    }
    let client = WebApiClient::new(opts)?;

    let summary = retrieve_all(
        &client,
        &plan.requests,
        &RunOptions {
            skip_existing: cli.skip_existing,
        },
    );
    info!(
        "done: {} retrieved, {} failed, {} already present",
        summary.succeeded, summary.failed, summary.skipped_existing
    );
    Ok(())
}
