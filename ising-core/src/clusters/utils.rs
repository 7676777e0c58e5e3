use crate::geometry::Lattice;

/// Grow a cluster from `seed` with a stack frontier. `should_add(site, neighbor)`
/// decides whether to add each not-yet-visited neighbor; it is asked once per
/// (member, neighbor) bond, so a site rejected from one member can still be
/// added through another.
///
/// Caller owns buffers: `in_cluster` must be all-false, `stack` and `members`
/// must be empty. On return `members` lists the cluster and `in_cluster` is
/// true exactly on those sites.
#[inline]
pub(super) fn bfs_cluster(
    lattice: &Lattice,
    seed: usize,
    in_cluster: &mut [bool],
    stack: &mut Vec<usize>,
    members: &mut Vec<usize>,
    mut should_add: impl FnMut(usize, usize) -> bool,
) {
    in_cluster[seed] = true;
    stack.push(seed);
    members.push(seed);

    while let Some(site) = stack.pop() {
        for nb in lattice.neighbors(site) {
            if !in_cluster[nb] && should_add(site, nb) {
                in_cluster[nb] = true;
                stack.push(nb);
                members.push(nb);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    // 4×4 periodic lattice:
    //
    //    0  1  2  3
    //    4  5  6  7
    //    8  9 10 11
    //   12 13 14 15
    //
    // Neighbors (periodic):
    //   axis 0 (↓): ((row±1)%4)*4 + col
    //   axis 1 (→): row*4 + (col±1)%4, so 3↔0, 7↔4, 11↔8, 15↔12

    fn lattice_4x4() -> Lattice {
        Lattice::new(vec![4, 4]).unwrap()
    }

    fn grow(lat: &Lattice, seed: usize, allowed: &HashSet<usize>) -> HashSet<usize> {
        let mut in_cluster = vec![false; lat.n_sites];
        let mut stack = Vec::new();
        let mut members = Vec::new();
        bfs_cluster(lat, seed, &mut in_cluster, &mut stack, &mut members, |_, nb| {
            allowed.contains(&nb)
        });
        assert!(stack.is_empty());
        for (i, &c) in in_cluster.iter().enumerate() {
            assert_eq!(c, members.contains(&i));
        }
        members.into_iter().collect()
    }

    #[test]
    fn test_connected_region_across_wrap() {
        let lat = lattice_4x4();
        // Column 0 plus site 3 (joined to 0 through the right edge wrap).
        let allowed: HashSet<usize> = [0, 4, 8, 12, 3].into_iter().collect();
        assert_eq!(grow(&lat, 8, &allowed), allowed);
    }

    #[test]
    fn test_disconnected_sites_stay_out() {
        let lat = lattice_4x4();
        // 10 is not adjacent to {0, 1}.
        let allowed: HashSet<usize> = [0, 1, 10].into_iter().collect();
        let expected: HashSet<usize> = [0, 1].into_iter().collect();
        assert_eq!(grow(&lat, 0, &allowed), expected);
    }

    #[test]
    fn test_seed_alone() {
        let lat = lattice_4x4();
        let got = grow(&lat, 5, &HashSet::new());
        assert_eq!(got, [5].into_iter().collect());
    }

    #[test]
    fn test_bond_retried_from_each_member() {
        let lat = lattice_4x4();
        let mut in_cluster = vec![false; 16];
        let mut stack = Vec::new();
        let mut members = Vec::new();
        let mut asked = Vec::new();
        // Refuse 5 from 1, accept it from 4.
        bfs_cluster(&lat, 0, &mut in_cluster, &mut stack, &mut members, |site, nb| {
            asked.push((site, nb));
            matches!((site, nb), (0, 1) | (0, 4) | (4, 5))
        });
        assert!(asked.contains(&(1, 5)));
        assert!(members.contains(&5));
    }
}
