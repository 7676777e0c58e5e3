use std::sync::Arc;
use std::time::Instant;

use ising_core::{
    checkerboard_sweep, metropolis_sweep, InitPattern, Lattice, ModelParams, RandomSource,
    SpinState, WolffScratch,
};

const L: usize = 512;
const N_SWEEPS: usize = 50;
const N_CLUSTER_STEPS: usize = 500;
const T_C: f64 = 2.269_185_314;

fn fresh_state(lattice: &Arc<Lattice>, rng: &mut RandomSource) -> SpinState {
    SpinState::new(
        lattice.clone(),
        ModelParams::new(1.0, 0.0, T_C),
        InitPattern::Random,
        rng,
    )
    .unwrap()
}

fn main() {
    let lattice = Arc::new(Lattice::new(vec![L, L]).unwrap());
    let n_sites = lattice.n_sites;

    println!(
        "Lattice: {}x{}  |  T = {:.4}  |  Sweeps: {}  |  Wolff steps: {}  |  Threads: {}",
        L,
        L,
        T_C,
        N_SWEEPS,
        N_CLUSTER_STEPS,
        rayon::current_num_threads()
    );
    println!("{}", "-".repeat(70));

    let mut rng = RandomSource::new(42);
    let mut state = fresh_state(&lattice, &mut rng);
    let t0 = Instant::now();
    for _ in 0..N_SWEEPS {
        metropolis_sweep(&mut state, &mut rng).unwrap();
    }
    let seq = t0.elapsed().as_secs_f64();
    println!(
        "metropolis    {:8.3} ms/sweep  {:6.2} ns/site",
        seq / N_SWEEPS as f64 * 1e3,
        seq / (N_SWEEPS * n_sites) as f64 * 1e9
    );

    let mut rng = RandomSource::new(42);
    let mut state = fresh_state(&lattice, &mut rng);
    let t0 = Instant::now();
    for _ in 0..N_SWEEPS {
        checkerboard_sweep(&mut state, &mut rng).unwrap();
    }
    let par = t0.elapsed().as_secs_f64();
    println!(
        "checkerboard  {:8.3} ms/sweep  {:6.2} ns/site  ({:.2}x)",
        par / N_SWEEPS as f64 * 1e3,
        par / (N_SWEEPS * n_sites) as f64 * 1e9,
        seq / par
    );

    let mut rng = RandomSource::new(42);
    let mut state = fresh_state(&lattice, &mut rng);
    let mut scratch = WolffScratch::new(n_sites);
    let mut visited = 0usize;
    let t0 = Instant::now();
    for _ in 0..N_CLUSTER_STEPS {
        visited += ising_core::clusters::wolff_step_with(&mut state, &mut rng, &mut scratch)
            .unwrap()
            .size;
    }
    let wolff = t0.elapsed().as_secs_f64();
    println!(
        "wolff         {:8.3} ms/step   {:6.2} ns/site  (mean cluster {:.0})",
        wolff / N_CLUSTER_STEPS as f64 * 1e3,
        wolff / visited.max(1) as f64 * 1e9,
        visited as f64 / N_CLUSTER_STEPS as f64
    );

    assert!(state.verify(1e-9));
}
