use std::fmt::Debug;

use absint_ir::HasBottom;

use crate::AnalysisError;

/// Abstract value approximating program state at one program point.
///
/// There is no blanket implementation: every domain opts in explicitly.
///
/// ## Algebraic contracts
///
/// **Join**: idempotent, commutative, associative and monotone, i.e.
/// `a ⊑ a ⊔ b` and `b ⊑ a ⊔ b`. `Clone` must produce an independent value.
///
/// **Widening**: `x ⊑ widen(x, y)` and `y ⊑ widen(x, y)`. The ascending
/// chain `x₀, widen(x₀, x₁), widen(widen(x₀, x₁), x₂), ...` must stabilize
/// in finite steps. The default is plain `join`, which only terminates for
/// finite-height domains.
pub trait AbstractDomain: HasBottom + Clone + PartialEq + Debug {
    /// Widen `self` with `next`.
    fn widen(&self, next: &Self) -> Self {
        self.join(next)
    }
}

/// Best-effort check that `joined` is an idempotent upper bound of `lhs`
/// and `rhs`.
pub fn check_join<D: AbstractDomain>(lhs: &D, rhs: &D, joined: &D) -> Result<(), AnalysisError> {
    if !lhs.is_subseteq(joined) || !rhs.is_subseteq(joined) {
        return Err(AnalysisError::DomainViolation {
            detail: format!("{joined:?} is not an upper bound of {lhs:?} and {rhs:?}"),
        });
    }
    if joined.join(joined) != *joined {
        return Err(AnalysisError::DomainViolation {
            detail: format!("join is not idempotent on {joined:?}"),
        });
    }
    Ok(())
}
