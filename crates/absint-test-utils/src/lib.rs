pub mod lattice;
pub mod random;

pub use random::{random_subset, random_subsets};
