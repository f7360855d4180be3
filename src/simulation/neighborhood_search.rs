use crate::{concurrency::par_iter_mut1, floating_type_mod::FT, particle::Particle};

/// Per-particle neighbor index lists, stored as one arena of `u32` indices per
/// particle so the solver can walk neighbors while mutating particle state.
///
/// The inner vectors are allocated once and reused (clear-and-refill) every
/// step; neighbor topology is only valid until the next rebuild.
pub struct NeighborhoodCache {
    neighs: Vec<Vec<u32>>,
}

impl NeighborhoodCache {
    pub fn new(num_particles: usize) -> Self {
        NeighborhoodCache {
            neighs: (0..num_particles).map(|_| Vec::new()).collect(),
        }
    }

    pub fn iter<'a>(&'a self, i: usize) -> impl Iterator<Item = usize> + 'a {
        self.neighs[i].iter().map(|&x| x as usize)
    }

    pub fn neighbor_count(&self, i: usize) -> usize {
        self.neighs[i].len()
    }

    pub fn len(&self) -> usize {
        self.neighs.len()
    }

    /// Rebuild every neighbor list from the particles' tentative positions.
    ///
    /// O(n²) all-pairs scan, no spatial index. Each particle only writes its
    /// own list and reads other particles' `end_position`, so the outer loop
    /// runs in parallel. Strict inequality: pairs exactly at the interaction
    /// radius are not neighbors.
    pub fn build_brute_force(&mut self, particles: &[Particle], radius_of_interest: FT) {
        assert!(self.neighs.len() == particles.len());

        let max_dist_sq = radius_of_interest * radius_of_interest;

        par_iter_mut1(&mut self.neighs, |i, p_neighs| {
            p_neighs.clear();

            let xi = particles[i].end_position;

            for (j, neigh) in particles.iter().enumerate() {
                if j == i {
                    continue;
                }
                if (xi - neigh.end_position).norm_squared() < max_dist_sq {
                    p_neighs.push(j as u32);
                }
            }
        });
    }
}

#[cfg(test)]
fn particles_at(positions: &[(FT, FT)]) -> Vec<Particle> {
    use crate::vec2f;

    positions.iter().map(|&(x, y)| Particle::at_rest(vec2f(x, y))).collect()
}

#[test]
fn neighbors_iff_strictly_within_radius() {
    let particles = particles_at(&[(0., 0.), (10., 0.), (39., 0.), (0., 40.), (100., 100.)]);
    let mut cache = NeighborhoodCache::new(particles.len());
    cache.build_brute_force(&particles, 40.);

    // every pair strictly closer than 40 shows up, in both directions
    assert_eq!(cache.iter(0).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(cache.iter(1).collect::<Vec<_>>(), vec![0, 2]);
    assert_eq!(cache.iter(2).collect::<Vec<_>>(), vec![0, 1]);

    // particle 3 sits exactly at the radius from particle 0: excluded
    assert_eq!(cache.iter(3).count(), 0);
    assert_eq!(cache.iter(4).count(), 0);
}

#[test]
fn neighbor_lists_never_contain_self() {
    let particles = particles_at(&[(5., 5.), (5., 5.), (6., 5.)]);
    let mut cache = NeighborhoodCache::new(particles.len());
    cache.build_brute_force(&particles, 40.);

    for i in 0..particles.len() {
        assert!(cache.iter(i).all(|j| j != i));
        assert_eq!(cache.neighbor_count(i), 2);
    }
}

#[test]
fn rebuild_replaces_prior_content() {
    let mut particles = particles_at(&[(0., 0.), (10., 0.)]);
    let mut cache = NeighborhoodCache::new(particles.len());

    cache.build_brute_force(&particles, 40.);
    assert_eq!(cache.neighbor_count(0), 1);

    // move the pair apart and rebuild: the stale entries must vanish
    particles[1].end_position = crate::vec2f(500., 0.);
    cache.build_brute_force(&particles, 40.);
    assert_eq!(cache.neighbor_count(0), 0);
    assert_eq!(cache.neighbor_count(1), 0);
}

#[test]
fn empty_store_builds_empty_cache() {
    let particles = particles_at(&[]);
    let mut cache = NeighborhoodCache::new(0);
    cache.build_brute_force(&particles, 40.);
    assert_eq!(cache.len(), 0);
}
