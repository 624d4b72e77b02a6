use absint_ir::Node;

/// Error type for analysis failures.
///
/// Engine errors cover the failure modes of the fixpoint and call
/// protocol. Client errors raised from node semantics go in the
/// [`Custom`](Self::Custom) variant via [`AnalysisError::custom`].
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// A client lattice broke monotonicity or idempotence of `join`.
    #[error("domain violation: {detail}")]
    DomainViolation { detail: String },
    /// A call site names a method the program does not define.
    #[error("call at {site} targets unresolved method '{callee}'")]
    UnresolvedCallee { site: Node, callee: String },
    /// The method is declared but its IR is unavailable.
    #[error("method '{method}' has no IR body")]
    MissingBody { method: String },
    /// A fixpoint or summary refinement exceeded its iteration bound.
    #[error("no fixpoint after {iterations} iterations along {}", .chain.join(" -> "))]
    NonTermination { chain: Vec<String>, iterations: usize },
    /// Predecessor/successor inconsistency found while walking the CFG.
    #[error("malformed CFG in '{method}': {detail}")]
    MalformedCfg { method: String, detail: String },
    /// No semantics registered for the node's category.
    #[error("no semantics registered for {node} ({category})")]
    UnhandledNode { node: Node, category: String },
    /// A call handler answered with a summary that does not cover the
    /// call's entry state.
    #[error("summary of '{callee}' at {site} does not cover the call's entry state")]
    SummaryMismatch { site: Node, callee: String },
    /// Call semantics were requested for a node without a call site.
    #[error("{node} is not a call node")]
    NotACall { node: Node },
    /// User-defined error.
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl AnalysisError {
    /// Wrap an arbitrary error as [`AnalysisError::Custom`].
    pub fn custom(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        AnalysisError::Custom(Box::new(error))
    }

    pub(crate) fn malformed(method: &str, detail: impl Into<String>) -> Self {
        AnalysisError::MalformedCfg {
            method: method.to_owned(),
            detail: detail.into(),
        }
    }
}

/// Result of an analysis step: a value or a typed [`AnalysisError`].
pub type AnalysisOutcome<T> = Result<T, AnalysisError>;
