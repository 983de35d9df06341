//! geocluster command
//!
//! Run with: cargo run -p geocluster-cli -- trips.csv --eps 0.0003 --min-pts 5

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use console::style;
use geocluster_cli::config::{
    parse_region, AppConfig, HourWindow, InvalidRecordPolicy, ReportFormat,
};
use geocluster_cli::progress::ProgressObserver;
use geocluster_cli::sink::write_report;
use geocluster_cli::source::load_trip_records;
use geocluster_core::{
    cluster_batch, BoundingBox, CancelToken, ClusterJob, ClusterOutcome, IndexStrategy,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => ReportFormat::Csv,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

/// Cluster taxi pickup locations with DBSCAN and report cluster centroids
#[derive(Debug, Parser)]
#[command(name = "geocluster", version, about)]
struct Cli {
    /// Trip record CSV files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Neighbourhood radius (degrees)
    #[arg(long)]
    eps: Option<f64>,

    /// Minimum neighbourhood size for a core point
    #[arg(long)]
    min_pts: Option<usize>,

    /// Neighbour search backend: linear, grid or auto
    #[arg(long)]
    index: Option<IndexStrategy>,

    /// Report path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Skip malformed records instead of failing
    #[arg(long, action = ArgAction::SetTrue)]
    skip_invalid: bool,

    /// Keep pickups from this hour (inclusive)
    #[arg(long, requires = "to_hour")]
    from_hour: Option<u32>,

    /// Keep pickups before this hour (exclusive)
    #[arg(long, requires = "from_hour")]
    to_hour: Option<u32>,

    /// Only keep pickups inside MIN_LON,MIN_LAT,MAX_LON,MAX_LAT
    #[arg(long, value_parser = parse_region, allow_hyphen_values = true)]
    region: Option<BoundingBox>,

    /// Cancel clustering after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Only log warnings and errors, no progress bar
    #[arg(short, long, action = ArgAction::SetTrue)]
    quiet: bool,
}

impl Cli {
    /// Layer command-line flags over the config file and defaults
    fn resolve_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => AppConfig::default(),
        };

        if let Some(eps) = self.eps {
            config.clustering.eps = eps;
        }
        if let Some(min_pts) = self.min_pts {
            config.clustering.min_pts = min_pts;
        }
        if let Some(index) = self.index {
            config.clustering.index = index;
        }
        if let Some(output) = &self.output {
            config.output.path = output.clone();
        }
        if let Some(format) = self.format {
            config.output.format = format.into();
        }
        if self.skip_invalid {
            config.input.on_invalid = InvalidRecordPolicy::Skip;
        }
        if let (Some(from_hour), Some(to_hour)) = (self.from_hour, self.to_hour) {
            config.input.hour_window = Some(HourWindow { from_hour, to_hour });
        }
        if self.region.is_some() {
            config.input.region = self.region;
        }
        if self.timeout_secs.is_some() {
            config.run.timeout_secs = self.timeout_secs;
        }
        if self.quiet {
            config.run.progress = false;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn init_tracing(quiet: bool) {
    let default_filter = if quiet {
        "geocluster=warn,geocluster_cli=warn,geocluster_core=warn"
    } else {
        "geocluster=info,geocluster_cli=info,geocluster_core=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Cancel `token` once `timeout_secs` have passed
fn arm_timeout(token: &CancelToken, timeout_secs: Option<u64>) {
    if let Some(secs) = timeout_secs {
        let token = token.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs(secs));
            tracing::warn!("Timeout of {}s reached, cancelling", secs);
            token.cancel();
        });
    }
}

fn print_outcome(outcome: &ClusterOutcome, report: &std::path::Path) {
    let stats = &outcome.stats;
    println!(
        "{} {}: {} clusters, {} of {} points clustered ({:.1}%), {} noise",
        style("✓").green(),
        style(&outcome.name).bold(),
        stats.num_clusters,
        stats.clustered_points,
        stats.total_points,
        stats.clustering_ratio * 100.0,
        stats.noise_points,
    );
    if let Some(top) = outcome.summaries.first() {
        println!(
            "  largest: {} points around ({:.6}, {:.6})",
            top.size, top.centroid.x, top.centroid.y
        );
    }
    println!("  report: {}", style(report.display()).cyan());
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    let config = cli.resolve_config()?;
    tracing::info!(
        eps = config.clustering.eps,
        min_pts = config.clustering.min_pts,
        index = %config.clustering.index,
        inputs = cli.inputs.len(),
        "Configuration loaded"
    );

    let report_paths = config
        .output
        .report_paths(&cli.inputs)
        .context("Cannot place reports")?;

    let mut jobs = Vec::with_capacity(cli.inputs.len());
    for input in &cli.inputs {
        let report = load_trip_records(input, &config.input)
            .with_context(|| format!("Failed to load {}", input.display()))?;
        if let Some(bounds) = report.bounds {
            tracing::info!(
                "  {}: SW ({:.6}, {:.6}) NE ({:.6}, {:.6})",
                input.display(),
                bounds.min.x,
                bounds.min.y,
                bounds.max.x,
                bounds.max.y
            );
        }
        jobs.push(ClusterJob::new(
            input.display().to_string(),
            report.points(),
            config.clustering.clone(),
        ));
    }

    let cancel = CancelToken::new();
    arm_timeout(&cancel, config.run.timeout_secs);

    let results = if let [job] = jobs.as_slice() {
        let mut observer = if config.run.progress {
            ProgressObserver::new(job.points.len(), &job.name)
        } else {
            ProgressObserver::hidden()
        };
        let result = job.run_with(&cancel, &mut observer);
        observer.finish();
        vec![result]
    } else {
        cluster_batch(&jobs, &cancel)
    };

    let mut failures = 0usize;
    for ((input, path), result) in cli.inputs.iter().zip(&report_paths).zip(results) {
        match result {
            Ok(outcome) => {
                write_report(path, config.output.format, &outcome, &config.clustering)
                    .with_context(|| format!("Failed to write report {}", path.display()))?;
                print_outcome(&outcome, path);
            }
            Err(err) if err.is_cancelled() => {
                failures += 1;
                eprintln!(
                    "{} {}: timed out after {}s ({})",
                    style("✗").red(),
                    input.display(),
                    config.run.timeout_secs.unwrap_or_default(),
                    err
                );
            }
            Err(err) => {
                failures += 1;
                eprintln!("{} {}: {}", style("✗").red(), input.display(), err);
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} inputs failed", failures, cli.inputs.len());
    }
    Ok(())
}
