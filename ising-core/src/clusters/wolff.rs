use super::utils::bfs_cluster;
use crate::error::{IsingError, Result};
use crate::rng::RandomSource;
use crate::spins::state::check_temperature;
use crate::spins::{FlipDelta, SpinState};

/// Outcome of one Wolff cluster step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClusterStats {
    /// Number of sites in the grown cluster.
    pub size: usize,
    /// Whether the cluster was flipped. Always true at zero field.
    pub flipped: bool,
    pub delta_energy: f64,
    pub delta_magnetization: i64,
}

/// Reusable buffers for [`wolff_step_with`].
#[derive(Debug, Default, Clone)]
pub struct WolffScratch {
    in_cluster: Vec<bool>,
    stack: Vec<usize>,
    members: Vec<usize>,
}

impl WolffScratch {
    pub fn new(n_sites: usize) -> Self {
        Self {
            in_cluster: vec![false; n_sites],
            stack: Vec::with_capacity(n_sites),
            members: Vec::with_capacity(n_sites),
        }
    }

    fn prepare(&mut self, n_sites: usize) {
        if self.in_cluster.len() != n_sites {
            self.in_cluster = vec![false; n_sites];
        }
        self.stack.clear();
        self.members.clear();
    }

    fn release(&mut self) {
        for &i in &self.members {
            self.in_cluster[i] = false;
        }
    }
}

/// Bond activation probability `1 - exp(-2J / T)`.
#[inline]
pub fn add_probability(coupling: f64, temperature: f64) -> f64 {
    1.0 - (-2.0 * coupling / temperature).exp()
}

/// Wolff single-cluster update with freshly allocated buffers.
pub fn wolff_step(state: &mut SpinState, rng: &mut RandomSource) -> Result<ClusterStats> {
    let mut scratch = WolffScratch::new(state.n_sites());
    wolff_step_with(state, rng, &mut scratch)
}

/// Wolff single-cluster update.
///
/// Picks a uniformly random seed, grows the cluster of aligned spins with
/// bond probability [`add_probability`] and flips it. With a non-zero field
/// the flip is accepted with probability `min(1, exp(-2 h s0 |C| / T))`.
///
/// Only ferromagnetic couplings are supported: `J <= 0` fails with
/// [`IsingError::UnsupportedCoupling`] before any draw or mutation.
#[cfg_attr(feature = "profile", inline(never))]
pub fn wolff_step_with(
    state: &mut SpinState,
    rng: &mut RandomSource,
    scratch: &mut WolffScratch,
) -> Result<ClusterStats> {
    let coupling = state.coupling();
    if !(coupling > 0.0) {
        return Err(IsingError::UnsupportedCoupling(coupling));
    }
    let temp = state.temperature();
    check_temperature(temp)?;

    let n_sites = state.n_sites();
    scratch.prepare(n_sites);

    let lattice = state.lattice().clone();
    let seed = rng.uniform_site(&lattice);
    let s0 = state.spin(seed);
    let p_add = add_probability(coupling, temp);

    {
        let view: &SpinState = state;
        bfs_cluster(
            &lattice,
            seed,
            &mut scratch.in_cluster,
            &mut scratch.stack,
            &mut scratch.members,
            |_site, nb| view.spin(nb) == s0 && rng.uniform01() < p_add,
        );
    }

    let size = scratch.members.len();
    let field_cost = 2.0 * state.field() * s0 as f64 * size as f64;
    let flipped = field_cost <= 0.0 || rng.uniform01() < (-field_cost / temp).exp();

    let mut delta = FlipDelta::default();
    if flipped {
        for &i in &scratch.members {
            delta += state.flip_unchecked(i);
        }
    }
    scratch.release();

    Ok(ClusterStats {
        size,
        flipped,
        delta_energy: delta.energy,
        delta_magnetization: delta.magnetization,
    })
}
