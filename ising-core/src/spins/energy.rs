use crate::geometry::Lattice;

/// Total energy of `spins` computed from scratch.
///
/// `E = -J * sum over forward bonds (i, fwd(i, d)) of s_i * s_j - h * sum_i s_i`.
/// Each forward bond is counted once; on an axis of extent 2 the pair
/// `(i, j)` is joined by two distinct bonds. Self-bonds along axes of
/// extent 1 carry no interaction.
pub fn compute_energy(lattice: &Lattice, spins: &[i8], coupling: f64, field: f64) -> f64 {
    let n_dims = lattice.n_dims;
    let mut bonds = 0i64;
    let mut mag = 0i64;

    for i in 0..lattice.n_sites {
        let si = spins[i] as i64;
        mag += si;
        for d in 0..n_dims {
            let j = lattice.neighbor(i, d, true);
            if j != i {
                bonds += si * spins[j] as i64;
            }
        }
    }

    -coupling * bonds as f64 - field * mag as f64
}

/// Sum of all spins.
pub fn compute_magnetization(spins: &[i8]) -> i64 {
    spins.iter().map(|&s| s as i64).sum()
}

/// Staggered magnetization `sum_i (-1)^parity(i) * s_i`.
///
/// This is the antiferromagnetic order parameter; it is only meaningful on a
/// bipartite lattice.
pub fn compute_staggered_magnetization(lattice: &Lattice, spins: &[i8]) -> i64 {
    let even: i64 = lattice
        .sublattice(0)
        .iter()
        .map(|&i| spins[i as usize] as i64)
        .sum();
    let odd: i64 = lattice
        .sublattice(1)
        .iter()
        .map(|&i| spins[i as usize] as i64)
        .sum();
    even - odd
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_uniform_energies() {
        // 4x4 periodic: 32 bonds.
        let lat = Lattice::new(vec![4, 4]).unwrap();
        let up = vec![1i8; 16];
        assert_relative_eq!(compute_energy(&lat, &up, 1.0, 0.0), -32.0);
        assert_relative_eq!(compute_energy(&lat, &up, 1.0, 0.5), -40.0);
        assert_relative_eq!(compute_energy(&lat, &up, -1.0, 0.0), 32.0);
        assert_eq!(compute_magnetization(&up), 16);
    }

    #[test]
    fn test_neel_state() {
        let lat = Lattice::new(vec![4, 4]).unwrap();
        let spins: Vec<i8> = (0..16)
            .map(|i| if lat.parity(i) == 0 { 1 } else { -1 })
            .collect();
        assert_relative_eq!(compute_energy(&lat, &spins, 1.0, 0.0), 32.0);
        assert_eq!(compute_magnetization(&spins), 0);
        assert_eq!(compute_staggered_magnetization(&lat, &spins), 16);
    }

    #[test]
    fn test_2x2_double_bonds() {
        // Every pair of horizontal/vertical neighbours is joined twice.
        let lat = Lattice::new(vec![2, 2]).unwrap();
        assert_relative_eq!(compute_energy(&lat, &[1, 1, 1, 1], 1.0, 0.0), -8.0);
        assert_relative_eq!(compute_energy(&lat, &[-1, 1, 1, 1], 1.0, 0.0), 0.0);
    }

    #[test]
    fn test_self_bonds_ignored() {
        let lat = Lattice::new(vec![1]).unwrap();
        assert_relative_eq!(compute_energy(&lat, &[1], 1.0, 0.25), -0.25);
    }
}
