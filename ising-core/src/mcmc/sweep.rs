use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::rng::RandomSource;
use crate::spins::state::check_temperature;
use crate::spins::{FlipDelta, SpinState};

/// Sites handled by one parallel work item in a checkerboard pass.
///
/// Fixed so that the per-chunk random streams, and therefore the result, do
/// not depend on the number of rayon threads.
pub const CHECKERBOARD_CHUNK: usize = 1024;

/// Outcome of one Metropolis sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SweepStats {
    pub attempted: usize,
    pub accepted: usize,
    pub delta_energy: f64,
    pub delta_magnetization: i64,
}

impl SweepStats {
    fn record(&mut self, delta: FlipDelta) {
        self.accepted += 1;
        self.delta_energy += delta.energy;
        self.delta_magnetization += delta.magnetization;
    }

    pub fn acceptance_rate(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.accepted as f64 / self.attempted as f64
        }
    }
}

/// Metropolis acceptance: downhill or level moves always, uphill moves with
/// probability `exp(-cost / temp)`. Draws a variate only for uphill moves.
#[inline]
fn accept(cost: f64, temp: f64, rng: &mut RandomSource) -> bool {
    cost <= 0.0 || rng.uniform01() < (-cost / temp).exp()
}

/// Metropolis single-spin-flip sweep in row-major scan order.
#[cfg_attr(feature = "profile", inline(never))]
pub fn metropolis_sweep(state: &mut SpinState, rng: &mut RandomSource) -> Result<SweepStats> {
    let temp = state.temperature();
    check_temperature(temp)?;

    let n_sites = state.n_sites();
    let mut stats = SweepStats {
        attempted: n_sites,
        ..Default::default()
    };
    for i in 0..n_sites {
        let cost = state.flip_cost_unchecked(i);
        if accept(cost, temp, rng) {
            stats.record(state.flip_unchecked(i));
        }
    }
    Ok(stats)
}

#[derive(Default)]
struct PassChunk {
    flips: Vec<u32>,
    delta: FlipDelta,
}

/// Metropolis sweep as two checkerboard passes, each parallel over its colour.
///
/// Sites of one colour have no neighbors of that colour, so every decision in
/// a pass reads only spins that stay fixed during the pass. Decisions are
/// taken in parallel against the current configuration, then the accepted
/// flips and the merged per-chunk deltas are committed before the next pass.
///
/// Each pass draws one child stream per [`CHECKERBOARD_CHUNK`] sites from
/// `rng`, so the trajectory is reproducible for a given seed. Lattices with an
/// odd extent > 1 have no proper two-colouring; they fall back to
/// [`metropolis_sweep`].
#[cfg_attr(feature = "profile", inline(never))]
pub fn checkerboard_sweep(state: &mut SpinState, rng: &mut RandomSource) -> Result<SweepStats> {
    let temp = state.temperature();
    check_temperature(temp)?;

    let lattice = state.lattice().clone();
    if !lattice.is_bipartite() {
        debug!(shape = ?lattice.shape, "odd extent, checkerboard sweep falls back to scan order");
        return metropolis_sweep(state, rng);
    }

    let mut stats = SweepStats {
        attempted: state.n_sites(),
        ..Default::default()
    };

    for parity in 0..2 {
        let sites = lattice.sublattice(parity);
        let mut chunk_rngs = rng.split(sites.len().div_ceil(CHECKERBOARD_CHUNK));
        let view: &SpinState = state;

        let chunks: Vec<PassChunk> = sites
            .par_chunks(CHECKERBOARD_CHUNK)
            .zip(chunk_rngs.par_iter_mut())
            .map(|(chunk, chunk_rng)| {
                let mut out = PassChunk::default();
                for &site in chunk {
                    let i = site as usize;
                    let cost = view.flip_cost_unchecked(i);
                    if accept(cost, temp, chunk_rng) {
                        out.flips.push(site);
                        out.delta += FlipDelta {
                            energy: cost,
                            magnetization: -2 * view.spin(i) as i64,
                        };
                    }
                }
                out
            })
            .collect();

        for chunk in chunks {
            stats.accepted += chunk.flips.len();
            stats.delta_energy += chunk.delta.energy;
            stats.delta_magnetization += chunk.delta.magnetization;
            state.commit_flips(&chunk.flips, chunk.delta);
        }
    }

    Ok(stats)
}

/// One Metropolis attempt at a uniformly random site. Returns whether the flip
/// was accepted.
pub fn random_site_step(state: &mut SpinState, rng: &mut RandomSource) -> Result<bool> {
    let temp = state.temperature();
    check_temperature(temp)?;

    let i = rng.uniform_site(state.lattice());
    let cost = state.flip_cost_unchecked(i);
    let accepted = accept(cost, temp, rng);
    if accepted {
        state.flip_unchecked(i);
    }
    Ok(accepted)
}
