pub mod replica;

pub use replica::Replica;

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{debug, info};
use validator::Validate;

use crate::clusters::{wolff_step_with, WolffScratch};
use crate::config::{Algorithm, SimConfig};
use crate::error::{IsingError, Result};
use crate::mcmc;
use crate::rng::RandomSource;
use crate::spins::SpinState;
use crate::statistics::{sokal_tau, AutocorrAccum, Observables, RunResult, Statistics};

/// Run `config.n_steps` steps of `config.algorithm` on one spin state.
///
/// Each step is one full Metropolis sweep, one Wolff cluster step or one
/// random-site Metropolis attempt, followed by
/// 1. trace recording (per-site energy, signed magnetization, order parameter),
///    when `record` is set and `step % lag == 0`
/// 2. measurement of per-site energy and order parameter, after `warmup_steps`
///
/// `interrupted` is polled before every step; once set the loop stops with
/// [`IsingError::Interrupted`], leaving the state at the last completed step.
/// `on_step` is called once per step (useful for progress bars).
pub fn run_steps(
    state: &mut SpinState,
    rng: &mut RandomSource,
    config: &SimConfig,
    interrupted: &AtomicBool,
    on_step: &(dyn Fn() + Sync),
) -> Result<RunResult> {
    config
        .validate()
        .map_err(|e| IsingError::InvalidConfig(format!("{e}")))?;
    if config.algorithm == Algorithm::Wolff && !(state.coupling() > 0.0) {
        return Err(IsingError::UnsupportedCoupling(state.coupling()));
    }

    let n_steps = config.n_steps;
    let warmup_steps = config.warmup_steps;
    let n_sites = state.n_sites();

    debug!(
        algorithm = %config.algorithm,
        n_sites,
        temperature = state.temperature(),
        n_steps,
        warmup_steps,
        "starting run"
    );

    let trace_len = if config.record {
        n_steps.div_ceil(config.lag)
    } else {
        0
    };
    let mut energies = Vec::with_capacity(trace_len);
    let mut magnetizations = Vec::with_capacity(trace_len);
    let mut order_parameters = Vec::with_capacity(trace_len);

    let mut energy_stat = Statistics::new(1);
    let mut energy2_stat = Statistics::new(2);
    let mut abs_mag_stat = Statistics::new(1);
    let mut mag2_stat = Statistics::new(2);
    let mut mag4_stat = Statistics::new(4);

    let n_measurement_steps = n_steps - warmup_steps;
    let mut energy_ac = config
        .autocorrelation_max_lag
        .map(|k| AutocorrAccum::new(k.min(n_measurement_steps / 4).max(1)));

    let mut scratch = match config.algorithm {
        Algorithm::Wolff => WolffScratch::new(n_sites),
        _ => WolffScratch::default(),
    };
    let mut cluster_total = 0usize;
    let mut attempted = 0usize;
    let mut accepted = 0usize;

    for step in 0..n_steps {
        if interrupted.load(Ordering::Relaxed) {
            debug!(step, "run interrupted");
            return Err(IsingError::Interrupted);
        }
        on_step();

        match config.algorithm {
            Algorithm::Metropolis | Algorithm::Checkerboard => {
                let stats = if config.algorithm == Algorithm::Metropolis {
                    mcmc::metropolis_sweep(state, rng)?
                } else {
                    mcmc::checkerboard_sweep(state, rng)?
                };
                attempted += stats.attempted;
                accepted += stats.accepted;
            }
            Algorithm::Wolff => {
                cluster_total += wolff_step_with(state, rng, &mut scratch)?.size;
            }
            Algorithm::SingleSpin => {
                attempted += 1;
                accepted += mcmc::random_site_step(state, rng)? as usize;
            }
        }

        if config.record && step % config.lag == 0 {
            energies.push(state.mean_energy());
            magnetizations.push(state.mean_magnetization());
            order_parameters.push(state.order_parameter());
        }

        if step >= warmup_steps {
            let e = state.mean_energy();
            let m = state.order_parameter();
            energy_stat.update(e);
            energy2_stat.update(e);
            abs_mag_stat.update(m);
            mag2_stat.update(m);
            mag4_stat.update(m);
            if let Some(ref mut acc) = energy_ac {
                acc.push(e);
            }
        }
    }

    let observables = Observables {
        energy: energy_stat.average(),
        energy2: energy2_stat.average(),
        abs_mag: abs_mag_stat.average(),
        mag2: mag2_stat.average(),
        mag4: mag4_stat.average(),
    };

    let (mean_cluster_size, acceptance_rate) = match config.algorithm {
        Algorithm::Wolff => (Some(cluster_total as f64 / n_steps as f64), None),
        _ => (None, Some(accepted as f64 / attempted.max(1) as f64)),
    };

    let energy_tau = energy_ac
        .filter(|acc| !acc.is_empty())
        .map(|acc| sokal_tau(&acc.finish()));

    info!(
        algorithm = %config.algorithm,
        temperature = state.temperature(),
        energy = observables.energy,
        order = observables.abs_mag,
        "run finished"
    );

    Ok(RunResult {
        algorithm: config.algorithm,
        temperature: state.temperature(),
        n_sites,
        n_steps,
        measured_steps: energy_stat.count,
        observables,
        energies,
        magnetizations,
        order_parameters,
        mean_cluster_size,
        acceptance_rate,
        energy_tau,
    })
}

/// Run [`run_steps`] on every replica, in parallel over replicas.
///
/// Replicas share no mutable state, so the results are identical to running
/// them one after another. For a single replica the call is made directly,
/// skipping rayon thread-pool overhead.
pub fn run_replicas(
    replicas: &mut [Replica],
    config: &SimConfig,
    interrupted: &AtomicBool,
    on_step: &(dyn Fn() + Sync),
) -> Result<Vec<RunResult>> {
    config
        .validate()
        .map_err(|e| IsingError::InvalidConfig(format!("{e}")))?;

    if replicas.len() == 1 {
        let rep = &mut replicas[0];
        return Ok(vec![run_steps(
            &mut rep.state,
            &mut rep.rng,
            config,
            interrupted,
            on_step,
        )?]);
    }

    replicas
        .par_iter_mut()
        .map(|rep| run_steps(&mut rep.state, &mut rep.rng, config, interrupted, on_step))
        .collect()
}
