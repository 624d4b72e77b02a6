//! Seeded generators of random finite lattice elements for fuzz checks.

use absint_interpreter::SetLattice;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A random subset of `0..universe`.
pub fn random_subset(rng: &mut impl Rng, universe: u32) -> SetLattice<u32> {
    (0..universe).filter(|_| rng.gen_bool(0.5)).collect()
}

/// `count` random subsets of `0..universe`, reproducible from `seed`.
pub fn random_subsets(seed: u64, universe: u32, count: usize) -> Vec<SetLattice<u32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| random_subset(&mut rng, universe))
        .collect()
}
