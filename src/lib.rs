pub use absint_ir as ir;

#[cfg(feature = "interpreter")]
pub use absint_interpreter as interpreter;

pub mod prelude {
    pub use absint_ir::*;

    #[cfg(feature = "interpreter")]
    pub use absint_interpreter::{
        AbstractDomain, AnalysisConfig, AnalysisContext, AnalysisError, AnalysisOutcome,
        CallHandler, DispatchTable, NodeKind, SetLattice, StateStore, SummaryCache,
        TransferFunction, WideningStrategy, analyze_program, call_site, run_interprocedural,
        run_intraprocedural,
    };
}
