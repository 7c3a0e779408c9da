//! Command-line driver for the scaling experiment.
//!
//! ```text
//! spark-scaling-bench --collect-data --data-dir results --config scaling.yaml
//! spark-scaling-bench --create-plots --data-dir results
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use spark_scaling_bench::cluster::{CancelToken, CommandCluster};
use spark_scaling_bench::config::ExperimentConfig;
use spark_scaling_bench::operator::{AutoConfirm, ConsoleOperator, Operator};
use spark_scaling_bench::report::ScalingReport;
use spark_scaling_bench::store::{StateStore, YamlFileStore, SCALING_DIR};
use spark_scaling_bench::tracker::Tracker;
use spark_scaling_bench::Error;

/// Spark/HDFS scaling benchmark
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Collect samples, resuming from `<data-dir>/scaling/scaling.yaml`
    #[arg(long = "collect-data")]
    collect: bool,

    /// Print the summary of collected samples
    #[arg(long = "create-plots", visible_alias = "report")]
    plot: bool,

    /// Directory holding the `scaling/` results
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Experiment configuration (YAML); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Don't ask for confirmation before each cluster size
    #[arg(short, long)]
    yes: bool,

    /// More logging (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// First ^C cancels cooperatively, a second one exits on the spot.
fn install_interrupt_handler(cancel: CancelToken) -> Result<()> {
    let hits = AtomicUsize::new(0);
    ctrlc::set_handler(move || {
        if hits.fetch_add(1, Ordering::SeqCst) == 0 {
            eprintln!("==> interrupt received, stopping (press ^C again to abort)");
            cancel.cancel();
        } else {
            std::process::exit(-1);
        }
    })
    .context("failed to set ^C handler")
}

fn collect(config: ExperimentConfig, args: &Args, cancel: CancelToken) -> Result<()> {
    let scaling_dir = args.data_dir.join(SCALING_DIR);
    std::fs::create_dir_all(&scaling_dir)
        .with_context(|| format!("cannot create {}", scaling_dir.display()))?;

    let cluster = CommandCluster::from_commands(&config.cluster, cancel.clone())?;
    let store = YamlFileStore::in_data_dir(&args.data_dir);
    info!(path = %store.path().display(), "collecting samples");

    let mut console = ConsoleOperator::new(cancel.clone());
    let mut auto = AutoConfirm::new();
    let operator: &mut dyn Operator = if args.yes { &mut auto } else { &mut console };

    let mut tracker = Tracker::new(config, cluster, store, operator)?.with_cancel_token(cancel);
    let state = tracker.run_from_store()?;
    info!(configurations = state.len(), "scaling experiment finished");
    Ok(())
}

fn report(config: &ExperimentConfig, args: &Args) -> Result<()> {
    let store = YamlFileStore::in_data_dir(&args.data_dir);
    let state = store
        .load()
        .with_context(|| format!("cannot read {}", store.path().display()))?;
    let report = ScalingReport::build(&state, &config.queries)?;
    println!("{report}");

    let summary = args.data_dir.join(SCALING_DIR).join("summary.json");
    std::fs::write(&summary, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("cannot write {}", summary.display()))?;
    info!(path = %summary.display(), "summary written");
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => ExperimentConfig::from_yaml_file(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => ExperimentConfig::default(),
    };

    if !args.collect && !args.plot {
        warn!("nothing to do, pass --collect-data and/or --create-plots");
    }
    if args.collect {
        let cancel = CancelToken::new();
        install_interrupt_handler(cancel.clone())?;
        collect(config.clone(), args, cancel)?;
    }
    if args.plot {
        report(&config, args)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        if matches!(e.downcast_ref::<Error>(), Some(Error::Cancelled)) {
            warn!("cancelled by user");
            std::process::exit(-1);
        }
        return Err(e);
    }
    Ok(())
}
