use crate::error::{IsingError, Result};

/// Periodic hypercubic lattice with precomputed neighbor table.
///
/// Sites are indexed in row-major (C) order. Each site has `2 * n_dims`
/// neighbors, one forward and one backward along every axis. Neighbors are
/// stored with multiplicity: on an axis of extent 2 the forward and backward
/// neighbor are the same site and it appears twice; on an axis of extent 1 the
/// site is its own neighbor.
#[derive(Debug, Clone)]
pub struct Lattice {
    /// Extent along each dimension (e.g. `[8, 8, 8]`).
    pub shape: Vec<usize>,
    /// Row-major strides: `strides[d] = product of shape[d+1..]`.
    pub strides: Vec<usize>,
    /// Total number of sites (`shape.iter().product()`).
    pub n_sites: usize,
    /// Number of spatial dimensions (`shape.len()`).
    pub n_dims: usize,
    /// Precomputed neighbor table, length `n_sites * n_dims * 2`.
    /// Layout: `neighbors[(i * n_dims + d) * 2 + dir]` where `dir = 0`
    /// is forward and `dir = 1` is backward.
    neighbors: Vec<u32>,
    /// Checkerboard colours: `sublattices[p]` holds every site whose
    /// coordinate sum has parity `p`, in increasing order.
    sublattices: [Vec<u32>; 2],
    bipartite: bool,
}

impl Lattice {
    /// Create a periodic hypercubic lattice with the given shape (e.g. `vec![16, 16]`).
    ///
    /// Fails with [`IsingError::InvalidDimension`] when the shape is empty, an
    /// extent is zero, or the site count does not fit the `u32` neighbor table.
    pub fn new(shape: Vec<usize>) -> Result<Self> {
        let n_dims = shape.len();
        let n_sites = shape
            .iter()
            .try_fold(1usize, |acc, &l| acc.checked_mul(l))
            .filter(|&n| n <= u32::MAX as usize);
        let n_sites = match n_sites {
            Some(n) if n_dims > 0 && shape.iter().all(|&l| l > 0) => n,
            _ => return Err(IsingError::InvalidDimension { shape }),
        };

        let mut strides = vec![1usize; n_dims];
        for d in (0..n_dims.saturating_sub(1)).rev() {
            strides[d] = strides[d + 1] * shape[d + 1];
        }

        let mut neighbors = vec![0u32; n_sites * n_dims * 2];
        let mut sublattices = [Vec::new(), Vec::new()];

        for i in 0..n_sites {
            let coords: Vec<usize> = (0..n_dims).map(|d| (i / strides[d]) % shape[d]).collect();

            for d in 0..n_dims {
                let l = shape[d];
                let fwd = (coords[d] + 1) % l;
                let bwd = (coords[d] + l - 1) % l;
                let base = i - coords[d] * strides[d];
                neighbors[(i * n_dims + d) * 2] = (base + fwd * strides[d]) as u32;
                neighbors[(i * n_dims + d) * 2 + 1] = (base + bwd * strides[d]) as u32;
            }

            let parity = coords.iter().sum::<usize>() % 2;
            sublattices[parity].push(i as u32);
        }

        // An odd extent > 1 wraps an even site onto an even site.
        let bipartite = shape.iter().all(|&l| l == 1 || l % 2 == 0);

        Ok(Self {
            shape,
            strides,
            n_sites,
            n_dims,
            neighbors,
            sublattices,
            bipartite,
        })
    }

    /// Number of neighbors of every site (`2 * n_dims`).
    #[inline]
    pub fn n_neighbors(&self) -> usize {
        2 * self.n_dims
    }

    /// Return the neighbor of site `flat_idx` along axis `dim`.
    /// `forward = true` means +1, `forward = false` means -1 (both wrapped).
    #[inline]
    pub fn neighbor(&self, flat_idx: usize, dim: usize, forward: bool) -> usize {
        self.neighbors[(flat_idx * self.n_dims + dim) * 2 + (!forward as usize)] as usize
    }

    /// All `2 * n_dims` neighbors of `site`, ordered `(axis 0 fwd, axis 0 bwd, axis 1 fwd, ...)`.
    ///
    /// Panics if `site >= n_sites`; use [`Lattice::check_site`] first for
    /// untrusted indices.
    #[inline]
    pub fn neighbors(&self, site: usize) -> impl ExactSizeIterator<Item = usize> + '_ {
        let k = self.n_neighbors();
        self.neighbors[site * k..(site + 1) * k]
            .iter()
            .map(|&j| j as usize)
    }

    pub fn check_site(&self, site: usize) -> Result<()> {
        if site < self.n_sites {
            Ok(())
        } else {
            Err(IsingError::DimensionMismatch(format!(
                "site {site} out of range for lattice of {} sites",
                self.n_sites
            )))
        }
    }

    /// Row-major linear index of `coord`.
    pub fn index(&self, coord: &[usize]) -> Result<usize> {
        if coord.len() != self.n_dims {
            return Err(IsingError::DimensionMismatch(format!(
                "coordinate {coord:?} has rank {}, lattice has rank {}",
                coord.len(),
                self.n_dims
            )));
        }
        let mut flat = 0usize;
        for (d, (&c, &l)) in coord.iter().zip(self.shape.iter()).enumerate() {
            if c >= l {
                return Err(IsingError::DimensionMismatch(format!(
                    "coordinate {c} on axis {d} out of range for extent {l}"
                )));
            }
            flat += c * self.strides[d];
        }
        Ok(flat)
    }

    /// Coordinate tuple of linear index `site`.
    pub fn coord(&self, site: usize) -> Result<Vec<usize>> {
        self.check_site(site)?;
        Ok((0..self.n_dims)
            .map(|d| (site / self.strides[d]) % self.shape[d])
            .collect())
    }

    /// Checkerboard colour (coordinate-sum parity) of `site`.
    #[inline]
    pub fn parity(&self, site: usize) -> usize {
        (0..self.n_dims)
            .map(|d| (site / self.strides[d]) % self.shape[d])
            .sum::<usize>()
            % 2
    }

    /// Sites of checkerboard colour `parity` (0 or 1).
    #[inline]
    pub fn sublattice(&self, parity: usize) -> &[u32] {
        &self.sublattices[parity & 1]
    }

    /// True when no two sites of the same colour are neighbors, i.e. every
    /// extent is even (or 1, where the only neighbor is the site itself).
    #[inline]
    pub fn is_bipartite(&self) -> bool {
        self.bipartite
    }
}
