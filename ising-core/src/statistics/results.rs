use serde::Serialize;

use crate::config::Algorithm;

/// Equilibrium averages of per-site observables over the measurement steps.
///
/// `energy` is `⟨E/N⟩`, `abs_mag` is `⟨|m|⟩` of the order parameter (uniform
/// magnetization for J >= 0, staggered for J < 0).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Observables {
    pub energy: f64,
    pub energy2: f64,
    pub abs_mag: f64,
    pub mag2: f64,
    pub mag4: f64,
}

impl Observables {
    /// `C = N (⟨e²⟩ - ⟨e⟩²) / T²`, per site.
    pub fn specific_heat(&self, temperature: f64, n_sites: usize) -> f64 {
        n_sites as f64 * (self.energy2 - self.energy * self.energy) / (temperature * temperature)
    }

    /// `χ = N (⟨m²⟩ - ⟨|m|⟩²) / T`, per site.
    pub fn susceptibility(&self, temperature: f64, n_sites: usize) -> f64 {
        n_sites as f64 * (self.mag2 - self.abs_mag * self.abs_mag) / temperature
    }

    /// `U = 1 - ⟨m⁴⟩ / (3 ⟨m²⟩²)`.
    pub fn binder_cumulant(&self) -> f64 {
        if self.mag2 == 0.0 {
            return 0.0;
        }
        1.0 - self.mag4 / (3.0 * self.mag2 * self.mag2)
    }

    /// Average [`Observables`] across independent runs.
    pub fn aggregate(results: &[Self]) -> Self {
        let mut agg = Self::default();
        if results.is_empty() {
            return agg;
        }
        for r in results {
            agg.energy += r.energy;
            agg.energy2 += r.energy2;
            agg.abs_mag += r.abs_mag;
            agg.mag2 += r.mag2;
            agg.mag4 += r.mag4;
        }
        let n = results.len() as f64;
        for v in [
            &mut agg.energy,
            &mut agg.energy2,
            &mut agg.abs_mag,
            &mut agg.mag2,
            &mut agg.mag4,
        ] {
            *v /= n;
        }
        agg
    }
}

/// Result of one [`run_steps`](crate::run_steps) call.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub algorithm: Algorithm,
    pub temperature: f64,
    pub n_sites: usize,
    pub n_steps: usize,
    /// Steps that contributed to `observables` (after warmup).
    pub measured_steps: usize,
    pub observables: Observables,
    /// Energy per site after every `lag`-th step. Empty unless recording.
    pub energies: Vec<f64>,
    /// Signed magnetization per site after every `lag`-th step. Empty unless
    /// recording.
    pub magnetizations: Vec<f64>,
    /// Order parameter (`|m|`, or `|m_staggered|` for J < 0) at the same steps.
    pub order_parameters: Vec<f64>,
    /// Mean Wolff cluster size over all steps; `None` for Metropolis.
    pub mean_cluster_size: Option<f64>,
    /// Fraction of accepted single-spin flips; `None` for Wolff.
    pub acceptance_rate: Option<f64>,
    /// Integrated autocorrelation time of the energy, in steps.
    pub energy_tau: Option<f64>,
}

impl RunResult {
    pub fn specific_heat(&self) -> f64 {
        self.observables.specific_heat(self.temperature, self.n_sites)
    }

    pub fn susceptibility(&self) -> f64 {
        self.observables.susceptibility(self.temperature, self.n_sites)
    }
}
