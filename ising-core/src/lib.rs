//! Monte Carlo core for the Ising model on periodic hypercubic lattices.
//!
//! A [`Lattice`] owns the topology, a [`SpinState`] owns the spins and the
//! incrementally tracked energy and magnetization, a [`RandomSource`] drives
//! every stochastic decision. The flip engine is split into [`mcmc`]
//! (Metropolis sweeps, sequential or checkerboard-parallel) and [`clusters`]
//! (Wolff single-cluster steps). [`run_steps`] and [`run_replicas`] drive
//! whole runs and collect observables.

pub mod clusters;
pub mod config;
pub mod error;
pub mod geometry;
pub mod mcmc;
pub mod rng;
pub mod simulation;
pub mod spins;
pub mod statistics;

pub use clusters::{wolff_step, ClusterStats, WolffScratch};
pub use config::{Algorithm, SimConfig};
pub use error::{IsingError, Result};
pub use geometry::Lattice;
pub use mcmc::{checkerboard_sweep, metropolis_sweep, random_site_step, SweepStats};
pub use rng::RandomSource;
pub use simulation::{run_replicas, run_steps, Replica};
pub use spins::{FlipDelta, InitPattern, ModelParams, SpinState};
pub use statistics::{Observables, RunResult};
