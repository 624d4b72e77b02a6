/// Join-semilattice with a partial order.
///
/// `join` must be commutative, associative and idempotent, and
/// `a.is_subseteq(&b)` must hold exactly when `a.join(&b) == b`.
pub trait Lattice {
    fn join(&self, other: &Self) -> Self;
    fn is_subseteq(&self, other: &Self) -> bool;
}

pub trait HasBottom: Lattice {
    fn bottom() -> Self;
}

pub trait HasTop: Lattice {
    fn top() -> Self;
}
