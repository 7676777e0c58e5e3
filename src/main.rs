use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use ising_core::{
    run_replicas, Algorithm, InitPattern, IsingError, Lattice, Observables, Replica, RunResult,
    SimConfig,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Monte Carlo simulation of the Ising model on a periodic hypercubic lattice.
#[derive(Parser, Debug)]
#[command(name = "ising-sim", version, about)]
struct Cli {
    /// Lattice extents, e.g. 32,32
    #[arg(long, value_delimiter = ',', default_value = "32,32")]
    shape: Vec<usize>,

    /// Nearest-neighbor coupling J (negative for antiferromagnetic)
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    coupling: f64,

    /// External field h
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    field: f64,

    /// Temperatures, one replica per entry
    #[arg(long, value_delimiter = ',', default_value = "2.269")]
    temps: Vec<f64>,

    /// metropolis, checkerboard, wolff or single
    #[arg(long, default_value = "metropolis")]
    algorithm: String,

    /// up, down or random
    #[arg(long, default_value = "random")]
    init: String,

    /// Steps per replica (sweeps for Metropolis, cluster steps for Wolff,
    /// single-site attempts for single)
    #[arg(long, default_value_t = 10_000)]
    steps: usize,

    /// Steps discarded before measuring [default: a quarter of --steps]
    #[arg(long)]
    warmup: Option<usize>,

    /// Independent copies of the temperature ladder
    #[arg(long, default_value_t = 1)]
    replicas: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Record energy, magnetization and order-parameter traces
    #[arg(long)]
    record: bool,

    /// Trace sampling interval
    #[arg(long, default_value_t = 1)]
    lag: usize,

    /// Window for the energy autocorrelation time
    #[arg(long)]
    autocorrelation: Option<usize>,

    /// Write every run result as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Print the final configuration of the first copy at each temperature
    #[arg(long)]
    show: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let algorithm = Algorithm::try_from(cli.algorithm.as_str()).map_err(|e| anyhow!(e))?;
    let init = InitPattern::try_from(cli.init.as_str()).map_err(|e| anyhow!(e))?;
    if cli.temps.is_empty() {
        bail!("at least one temperature is required");
    }
    if cli.replicas == 0 {
        bail!("--replicas must be >= 1");
    }

    let warmup_steps = cli
        .warmup
        .unwrap_or_else(|| (cli.steps as f64 * 0.25).round() as usize);
    let config = SimConfig {
        warmup_steps,
        record: cli.record,
        lag: cli.lag,
        autocorrelation_max_lag: cli.autocorrelation,
        ..SimConfig::new(algorithm, cli.steps)
    };

    let lattice = Arc::new(
        Lattice::new(cli.shape.clone())
            .with_context(|| format!("building lattice {:?}", cli.shape))?,
    );
    let mut replicas = Replica::ladder(
        lattice.clone(),
        cli.coupling,
        cli.field,
        &cli.temps,
        cli.replicas,
        init,
        cli.seed,
    )
    .context("initializing replicas")?;

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = interrupted.clone();
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .context("installing Ctrl-C handler")?;
    }

    info!(
        shape = ?lattice.shape,
        n_sites = lattice.n_sites,
        %algorithm,
        coupling = cli.coupling,
        field = cli.field,
        n_temps = cli.temps.len(),
        n_replicas = cli.replicas,
        steps = cli.steps,
        warmup_steps,
        "starting simulation"
    );

    let pb = ProgressBar::new((cli.steps * replicas.len()) as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{msg} [{bar:40}] {pos}/{len} [{elapsed_precise} < {eta_precise}, {per_sec}]",
        )?
        .progress_chars("=> "),
    );
    pb.set_message(algorithm.as_str());

    let results = match run_replicas(&mut replicas, &config, &interrupted, &|| pb.inc(1)) {
        Ok(results) => results,
        Err(IsingError::Interrupted) => {
            pb.abandon_with_message("interrupted");
            warn!("simulation interrupted, no results written");
            bail!(IsingError::Interrupted);
        }
        Err(e) => return Err(e.into()),
    };
    pb.finish_with_message("done");

    print_table(&cli.temps, &results);

    if let Some(path) = &cli.json {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &results)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "results written");
    }

    if cli.show {
        for (rep, temp) in replicas.iter().zip(&cli.temps) {
            println!("\nT = {temp}");
            println!("{}", rep.state);
        }
    }

    Ok(())
}

/// One row per temperature, averaged over the copies of the ladder.
fn print_table(temps: &[f64], results: &[RunResult]) {
    let n_temps = temps.len();
    println!(
        "{:>8} {:>10} {:>8} {:>10} {:>10} {:>8} {:>10} {:>8}",
        "T", "e", "|m|", "C", "chi", "U", "acc/size", "tau_e"
    );
    for (t, &temp) in temps.iter().enumerate() {
        let runs: Vec<&RunResult> = results.iter().skip(t).step_by(n_temps).collect();
        let Some(first) = runs.first() else {
            continue;
        };
        let obs = Observables::aggregate(&runs.iter().map(|r| r.observables).collect::<Vec<_>>());
        let n = runs.len() as f64;
        let rate = runs
            .iter()
            .map(|r| r.mean_cluster_size.or(r.acceptance_rate).unwrap_or(0.0))
            .sum::<f64>()
            / n;
        let tau = if runs.iter().all(|r| r.energy_tau.is_some()) {
            let tau = runs.iter().filter_map(|r| r.energy_tau).sum::<f64>() / n;
            format!("{tau:8.2}")
        } else {
            format!("{:>8}", "-")
        };
        println!(
            "{:8.4} {:10.5} {:8.5} {:10.4} {:10.4} {:8.4} {:10.4} {}",
            temp,
            obs.energy,
            obs.abs_mag,
            obs.specific_heat(temp, first.n_sites),
            obs.susceptibility(temp, first.n_sites),
            obs.binder_cumulant(),
            rate,
            tau
        );
    }
}
