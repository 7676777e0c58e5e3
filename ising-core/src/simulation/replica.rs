use std::sync::Arc;

use crate::error::Result;
use crate::geometry::Lattice;
use crate::rng::RandomSource;
use crate::spins::{InitPattern, ModelParams, SpinState};

/// One independent Markov chain: a spin state and the stream that drives it.
///
/// Replicas share only the immutable [`Lattice`]; they can be advanced on
/// different threads without coordination.
#[derive(Debug, Clone)]
pub struct Replica {
    pub state: SpinState,
    pub rng: RandomSource,
}

impl Replica {
    /// Seed the stream with `seed`, then initialize the state from it.
    pub fn new(
        lattice: Arc<Lattice>,
        params: ModelParams,
        init: InitPattern,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = RandomSource::new(seed);
        let state = SpinState::new(lattice, params, init, &mut rng)?;
        Ok(Self { state, rng })
    }

    /// One replica per temperature, `n_replicas` copies of the whole ladder.
    ///
    /// Replica `k` (in temperature-major order within each copy) is seeded
    /// with `base_seed + k`.
    pub fn ladder(
        lattice: Arc<Lattice>,
        coupling: f64,
        field: f64,
        temps: &[f64],
        n_replicas: usize,
        init: InitPattern,
        base_seed: u64,
    ) -> Result<Vec<Self>> {
        let mut out = Vec::with_capacity(temps.len() * n_replicas);
        for r in 0..n_replicas {
            for (t, &temp) in temps.iter().enumerate() {
                let k = (r * temps.len() + t) as u64;
                out.push(Self::new(
                    lattice.clone(),
                    ModelParams::new(coupling, field, temp),
                    init,
                    base_seed.wrapping_add(k),
                )?);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IsingError;

    #[test]
    fn test_ladder_layout() {
        let lat = Arc::new(Lattice::new(vec![4, 4]).unwrap());
        let reps = Replica::ladder(lat, 1.0, 0.0, &[1.0, 2.0, 3.0], 2, InitPattern::Random, 10).unwrap();
        assert_eq!(reps.len(), 6);
        let temps: Vec<f64> = reps.iter().map(|r| r.state.temperature()).collect();
        assert_eq!(temps, vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
        let seeds: Vec<u64> = reps.iter().map(|r| r.rng.seed_value()).collect();
        assert_eq!(seeds, vec![10, 11, 12, 13, 14, 15]);
    }

    #[test]
    fn test_ladder_rejects_bad_temperature() {
        let lat = Arc::new(Lattice::new(vec![4, 4]).unwrap());
        let err = Replica::ladder(lat, 1.0, 0.0, &[1.0, 0.0], 1, InitPattern::Up, 0).unwrap_err();
        assert_eq!(err, IsingError::InvalidTemperature(0.0));
    }
}
