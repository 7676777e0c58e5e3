use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::energy::{compute_energy, compute_magnetization, compute_staggered_magnetization};
use crate::error::{IsingError, Result};
use crate::geometry::Lattice;
use crate::rng::RandomSource;

/// Hamiltonian parameters of one spin state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelParams {
    /// Coupling constant J; J > 0 is ferromagnetic.
    pub coupling: f64,
    /// Uniform external field h.
    pub field: f64,
    /// Temperature T (units with k_B = 1), must be > 0.
    pub temperature: f64,
}

impl ModelParams {
    pub fn new(coupling: f64, field: f64, temperature: f64) -> Self {
        Self {
            coupling,
            field,
            temperature,
        }
    }
}

/// Initial spin assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitPattern {
    /// Every spin +1 ("cold" start).
    Up,
    /// Every spin -1.
    Down,
    /// Each spin independently ±1 with probability 1/2 ("hot" start).
    Random,
}

impl TryFrom<&str> for InitPattern {
    type Error = String;
    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s {
            "up" | "cold" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "random" | "hot" => Ok(Self::Random),
            _ => Err(format!(
                "unknown init pattern '{s}', expected 'up', 'down' or 'random'"
            )),
        }
    }
}

/// Change of the cached aggregates caused by one or more flips.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlipDelta {
    pub energy: f64,
    pub magnetization: i64,
}

impl std::ops::AddAssign for FlipDelta {
    fn add_assign(&mut self, rhs: Self) {
        self.energy += rhs.energy;
        self.magnetization += rhs.magnetization;
    }
}

pub(crate) fn check_temperature(t: f64) -> Result<()> {
    if t.is_finite() && t > 0.0 {
        Ok(())
    } else {
        Err(IsingError::InvalidTemperature(t))
    }
}

/// Spin configuration on a [`Lattice`] with incrementally tracked totals.
///
/// `energy` and `magnetization` always describe the current `spins`. Every
/// mutation goes through a flip that updates spin and totals together;
/// [`SpinState::verify`] checks the cache against a from-scratch recomputation.
#[derive(Debug, Clone)]
pub struct SpinState {
    lattice: Arc<Lattice>,
    spins: Vec<i8>,
    coupling: f64,
    field: f64,
    temperature: f64,
    energy: f64,
    magnetization: i64,
}

impl SpinState {
    /// Bind a new spin state to `lattice` and initialize it with `init`.
    ///
    /// `rng` is only drawn from for [`InitPattern::Random`].
    pub fn new(
        lattice: Arc<Lattice>,
        params: ModelParams,
        init: InitPattern,
        rng: &mut RandomSource,
    ) -> Result<Self> {
        check_temperature(params.temperature)?;
        let n_sites = lattice.n_sites;
        let mut state = Self {
            lattice,
            spins: vec![1; n_sites],
            coupling: params.coupling,
            field: params.field,
            temperature: params.temperature,
            energy: 0.0,
            magnetization: 0,
        };
        state.initialize(init, rng);
        Ok(state)
    }

    /// Bind a spin state to an explicit configuration.
    pub fn from_spins(lattice: Arc<Lattice>, params: ModelParams, spins: Vec<i8>) -> Result<Self> {
        check_temperature(params.temperature)?;
        if spins.len() != lattice.n_sites {
            return Err(IsingError::DimensionMismatch(format!(
                "{} spins given for lattice of {} sites",
                spins.len(),
                lattice.n_sites
            )));
        }
        if let Some((site, &value)) = spins.iter().enumerate().find(|&(_, &s)| s != 1 && s != -1) {
            return Err(IsingError::InvalidSpin { site, value });
        }
        let mut state = Self {
            lattice,
            spins,
            coupling: params.coupling,
            field: params.field,
            temperature: params.temperature,
            energy: 0.0,
            magnetization: 0,
        };
        state.recompute();
        Ok(state)
    }

    /// Reset every spin according to `init` and recompute totals from scratch.
    pub fn initialize(&mut self, init: InitPattern, rng: &mut RandomSource) {
        match init {
            InitPattern::Up => self.spins.fill(1),
            InitPattern::Down => self.spins.fill(-1),
            InitPattern::Random => {
                for s in self.spins.iter_mut() {
                    *s = if rng.uniform01() < 0.5 { -1 } else { 1 };
                }
            }
        }
        self.recompute();
    }

    /// Recompute the cached totals from the spin array.
    pub fn recompute(&mut self) {
        let (energy, magnetization) = self.exact_totals();
        self.energy = energy;
        self.magnetization = magnetization;
    }

    /// `(energy, magnetization)` recomputed from scratch, without touching the cache.
    pub fn exact_totals(&self) -> (f64, i64) {
        (
            compute_energy(&self.lattice, &self.spins, self.coupling, self.field),
            compute_magnetization(&self.spins),
        )
    }

    /// Check the cached totals against a from-scratch recomputation.
    ///
    /// Energy must agree within `rel_tol` relative to `max(1, |E|)`;
    /// magnetization must agree exactly.
    pub fn verify(&self, rel_tol: f64) -> bool {
        let (energy, magnetization) = self.exact_totals();
        (self.energy - energy).abs() <= rel_tol * energy.abs().max(1.0)
            && self.magnetization == magnetization
    }

    /// Sum of neighbor spins of `site`. Self-neighbors along extent-1 axes are skipped.
    #[inline]
    pub(crate) fn neighbor_sum(&self, site: usize) -> i32 {
        self.lattice
            .neighbors(site)
            .filter(|&nb| nb != site)
            .map(|nb| self.spins[nb] as i32)
            .sum()
    }

    /// Local energy of one site: `-J * s * sum(s_nb) - h * s`.
    pub fn local_energy(&self, site: usize) -> Result<f64> {
        self.lattice.check_site(site)?;
        Ok(self.local_energy_unchecked(site))
    }

    #[inline]
    fn local_energy_unchecked(&self, site: usize) -> f64 {
        let s = self.spins[site] as f64;
        -s * (self.coupling * self.neighbor_sum(site) as f64 + self.field)
    }

    /// Energy change if `site` were flipped: `-2 * local_energy(site)`.
    pub fn flip_cost(&self, site: usize) -> Result<f64> {
        self.lattice.check_site(site)?;
        Ok(self.flip_cost_unchecked(site))
    }

    #[inline]
    pub(crate) fn flip_cost_unchecked(&self, site: usize) -> f64 {
        -2.0 * self.local_energy_unchecked(site)
    }

    /// Flip `site` and update the cached totals. Returns the applied deltas.
    pub fn apply_flip(&mut self, site: usize) -> Result<FlipDelta> {
        self.lattice.check_site(site)?;
        Ok(self.flip_unchecked(site))
    }

    #[inline]
    pub(crate) fn flip_unchecked(&mut self, site: usize) -> FlipDelta {
        let s = self.spins[site];
        let delta = FlipDelta {
            energy: self.flip_cost_unchecked(site),
            magnetization: -2 * s as i64,
        };
        self.spins[site] = -s;
        self.energy += delta.energy;
        self.magnetization += delta.magnetization;
        delta
    }

    /// Flip a batch of mutually non-adjacent sites whose combined deltas were
    /// evaluated beforehand against the current configuration.
    pub(crate) fn commit_flips(&mut self, sites: &[u32], delta: FlipDelta) {
        for &site in sites {
            let s = &mut self.spins[site as usize];
            *s = -*s;
        }
        self.energy += delta.energy;
        self.magnetization += delta.magnetization;
    }

    #[inline]
    pub fn lattice(&self) -> &Arc<Lattice> {
        &self.lattice
    }

    #[inline]
    pub fn n_sites(&self) -> usize {
        self.spins.len()
    }

    pub fn spin_at(&self, site: usize) -> Result<i8> {
        self.lattice.check_site(site)?;
        Ok(self.spins[site])
    }

    #[inline]
    pub(crate) fn spin(&self, site: usize) -> i8 {
        self.spins[site]
    }

    /// Snapshot of the configuration in row-major order.
    pub fn spins(&self) -> &[i8] {
        &self.spins
    }

    #[inline]
    pub fn total_energy(&self) -> f64 {
        self.energy
    }

    #[inline]
    pub fn total_magnetization(&self) -> f64 {
        self.magnetization as f64
    }

    /// Energy per site.
    pub fn mean_energy(&self) -> f64 {
        self.energy / self.n_sites() as f64
    }

    /// Magnetization per site (signed).
    pub fn mean_magnetization(&self) -> f64 {
        self.magnetization as f64 / self.n_sites() as f64
    }

    /// Staggered magnetization, recomputed from the spin array.
    pub fn staggered_magnetization(&self) -> f64 {
        compute_staggered_magnetization(&self.lattice, &self.spins) as f64
    }

    /// `|M| / N` for J >= 0, `|M_staggered| / N` for J < 0.
    pub fn order_parameter(&self) -> f64 {
        let m = if self.coupling < 0.0 {
            self.staggered_magnetization()
        } else {
            self.total_magnetization()
        };
        m.abs() / self.n_sites() as f64
    }

    #[inline]
    pub fn coupling(&self) -> f64 {
        self.coupling
    }

    #[inline]
    pub fn field(&self) -> f64 {
        self.field
    }

    #[inline]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn params(&self) -> ModelParams {
        ModelParams::new(self.coupling, self.field, self.temperature)
    }

    pub fn set_temperature(&mut self, temperature: f64) -> Result<()> {
        check_temperature(temperature)?;
        self.temperature = temperature;
        Ok(())
    }

    /// Change the external field. The cached energy is recomputed from scratch.
    pub fn set_field(&mut self, field: f64) {
        self.field = field;
        self.recompute();
    }
}

impl fmt::Display for SpinState {
    /// Mean energy and signed mean magnetization, then the configuration with
    /// one row per line along the last axis, spins as `+` / `-`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "mean energy: {}", self.mean_energy())?;
        writeln!(f, "mean magnetization: {}", self.mean_magnetization())?;
        let row = self.lattice.shape.last().copied().unwrap_or(1);
        for (r, chunk) in self.spins.chunks(row).enumerate() {
            if r > 0 {
                writeln!(f)?;
            }
            for (c, &s) in chunk.iter().enumerate() {
                if c > 0 {
                    f.write_str(" ")?;
                }
                f.write_str(if s > 0 { "+" } else { "-" })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn state(shape: Vec<usize>, j: f64, h: f64, t: f64, init: InitPattern) -> SpinState {
        let lat = Arc::new(Lattice::new(shape).unwrap());
        let mut rng = RandomSource::new(1);
        SpinState::new(lat, ModelParams::new(j, h, t), init, &mut rng).unwrap()
    }

    #[test]
    fn test_2x2_flip_cost_is_eight() {
        let s = state(vec![2, 2], 1.0, 0.0, 1.0, InitPattern::Up);
        for site in 0..4 {
            assert_relative_eq!(s.flip_cost(site).unwrap(), 8.0);
            assert_relative_eq!(s.local_energy(site).unwrap(), -4.0);
        }
    }

    #[test]
    fn test_init_patterns() {
        let up = state(vec![4, 4], 1.0, 0.0, 1.0, InitPattern::Up);
        assert_relative_eq!(up.total_energy(), -32.0);
        assert_relative_eq!(up.total_magnetization(), 16.0);

        let down = state(vec![4, 4], 1.0, 0.5, 1.0, InitPattern::Down);
        assert_relative_eq!(down.total_energy(), -32.0 + 8.0);
        assert_relative_eq!(down.total_magnetization(), -16.0);

        let hot = state(vec![16, 16], 1.0, 0.0, 1.0, InitPattern::Random);
        assert!(hot.spins().iter().any(|&s| s == 1));
        assert!(hot.spins().iter().any(|&s| s == -1));
        assert!(hot.verify(1e-12));
    }

    #[test]
    fn test_apply_flip_updates_cache() {
        let mut s = state(vec![4, 4], 1.0, 0.3, 2.0, InitPattern::Up);
        let d = s.apply_flip(5).unwrap();
        assert_relative_eq!(d.energy, 8.0 + 0.6);
        assert_eq!(d.magnetization, -2);
        assert_eq!(s.spin_at(5).unwrap(), -1);
        assert!(s.verify(1e-12));

        let back = s.apply_flip(5).unwrap();
        assert_relative_eq!(back.energy, -d.energy);
        assert_relative_eq!(s.total_energy(), -32.0 - 0.3 * 16.0);
    }

    #[test]
    fn test_out_of_range_site() {
        let mut s = state(vec![3, 3], 1.0, 0.0, 1.0, InitPattern::Up);
        let before = s.spins().to_vec();
        assert!(matches!(s.apply_flip(9), Err(IsingError::DimensionMismatch(_))));
        assert!(matches!(s.spin_at(100), Err(IsingError::DimensionMismatch(_))));
        assert!(matches!(s.flip_cost(9), Err(IsingError::DimensionMismatch(_))));
        assert_eq!(s.spins(), &before[..]);
    }

    #[test]
    fn test_invalid_temperature() {
        let lat = Arc::new(Lattice::new(vec![2, 2]).unwrap());
        let mut rng = RandomSource::new(0);
        for t in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let r = SpinState::new(lat.clone(), ModelParams::new(1.0, 0.0, t), InitPattern::Up, &mut rng);
            assert!(matches!(r, Err(IsingError::InvalidTemperature(_))));
        }
        let mut s = state(vec![2, 2], 1.0, 0.0, 1.0, InitPattern::Up);
        assert!(matches!(s.set_temperature(0.0), Err(IsingError::InvalidTemperature(_))));
        assert_relative_eq!(s.temperature(), 1.0);
        s.set_temperature(2.5).unwrap();
        assert_relative_eq!(s.temperature(), 2.5);
    }

    #[test]
    fn test_from_spins_validation() {
        let lat = Arc::new(Lattice::new(vec![2, 2]).unwrap());
        let p = ModelParams::new(1.0, 0.0, 1.0);
        assert!(matches!(
            SpinState::from_spins(lat.clone(), p, vec![1, 1, 1]),
            Err(IsingError::DimensionMismatch(_))
        ));
        assert_eq!(
            SpinState::from_spins(lat.clone(), p, vec![1, 0, 1, 1]).unwrap_err(),
            IsingError::InvalidSpin { site: 1, value: 0 }
        );
        let s = SpinState::from_spins(lat, p, vec![-1, 1, 1, 1]).unwrap();
        assert_relative_eq!(s.total_energy(), 0.0);
        assert_relative_eq!(s.total_magnetization(), 2.0);
    }

    #[test]
    fn test_set_field_recomputes() {
        let mut s = state(vec![4, 4], 1.0, 0.0, 1.0, InitPattern::Up);
        s.set_field(1.0);
        assert_relative_eq!(s.total_energy(), -48.0);
        assert!(s.verify(1e-12));
    }

    #[test]
    fn test_order_parameter() {
        let lat = Arc::new(Lattice::new(vec![4, 4]).unwrap());
        let neel: Vec<i8> = (0..16).map(|i| if lat.parity(i) == 0 { 1 } else { -1 }).collect();
        let afm = SpinState::from_spins(lat.clone(), ModelParams::new(-1.0, 0.0, 1.0), neel.clone()).unwrap();
        assert_relative_eq!(afm.order_parameter(), 1.0);
        assert_relative_eq!(afm.total_energy(), -32.0);

        let fm = SpinState::from_spins(lat, ModelParams::new(1.0, 0.0, 1.0), neel).unwrap();
        assert_relative_eq!(fm.order_parameter(), 0.0);
        assert_relative_eq!(fm.mean_energy(), 2.0);
    }

    #[test]
    fn test_display() {
        let lat = Arc::new(Lattice::new(vec![2, 3]).unwrap());
        let s = SpinState::from_spins(lat, ModelParams::new(1.0, 0.0, 1.0), vec![1, 1, 1, 1, -1, 1]).unwrap();
        // Bond sum 2 (axis 0, two bonds per column) + 3 - 1 (rows) = 4, so E = -4.
        assert_eq!(
            s.to_string(),
            "mean energy: -0.6666666666666666\nmean magnetization: 0.6666666666666666\n+ + +\n+ - +"
        );
    }

    #[test]
    fn test_init_pattern_parse() {
        assert_eq!(InitPattern::try_from("hot").unwrap(), InitPattern::Random);
        assert_eq!(InitPattern::try_from("cold").unwrap(), InitPattern::Up);
        assert!(InitPattern::try_from("sideways").is_err());
    }

    proptest! {
        #[test]
        fn cache_tracks_any_flip_sequence(
            shape in prop::collection::vec(1usize..5, 1..4),
            j in -2.0f64..2.0,
            h in -1.0f64..1.0,
            seed in any::<u64>(),
            flips in prop::collection::vec(any::<prop::sample::Index>(), 0..200),
        ) {
            let lat = Arc::new(Lattice::new(shape).unwrap());
            let n = lat.n_sites;
            let mut rng = RandomSource::new(seed);
            let mut s = SpinState::new(lat, ModelParams::new(j, h, 1.0), InitPattern::Random, &mut rng).unwrap();
            for f in flips {
                s.apply_flip(f.index(n)).unwrap();
                prop_assert!(s.total_magnetization().abs() <= n as f64);
            }
            prop_assert!(s.verify(1e-9));
        }
    }
}
