use crate::AbstractDomain;

/// Strategy for when to apply widening during fixpoint iteration.
///
/// Applied at loop headers by the block driver and to tentative summaries
/// of recursive methods by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WideningStrategy {
    /// Widen at every revisit.
    AllJoins,
    /// Only join, never widen. Suitable for finite-height lattices that
    /// guarantee termination without widening.
    #[default]
    Never,
    /// Join for the first `n` revisits, then widen.
    Delayed(usize),
}

impl WideningStrategy {
    /// Merge `current` with `incoming` according to this strategy.
    ///
    /// `visit_count` is the number of times the target has been revisited
    /// (excluding the first visit).
    pub fn merge<D: AbstractDomain>(&self, current: &D, incoming: &D, visit_count: usize) -> D {
        match self {
            Self::AllJoins => current.widen(incoming),
            Self::Never => current.join(incoming),
            Self::Delayed(n) => {
                if visit_count <= *n {
                    current.join(incoming)
                } else {
                    current.widen(incoming)
                }
            }
        }
    }
}
