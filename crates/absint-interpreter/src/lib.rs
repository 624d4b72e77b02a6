pub mod analyzer;
pub mod call;
pub mod context;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod fixpoint;
pub mod log;
pub mod result;
pub mod set;
pub mod state;
pub mod summary;
pub mod transfer;
pub mod widening;

pub use analyzer::{Analyzer, MethodStatus, analyze_program, run_interprocedural};
pub use call::{CallHandler, OpaqueCalls, call_site, call_summary};
pub use context::{AnalysisConfig, AnalysisContext};
pub use dispatch::{DispatchTable, NodeKind, NodeSemantics};
pub use domain::{AbstractDomain, check_join};
pub use error::{AnalysisError, AnalysisOutcome};
pub use fixpoint::run_intraprocedural;
pub use self::log::{Level, LogFacade, LogSink, MemorySink, Silent};
pub use result::{MethodResult, ProgramResult};
pub use set::SetLattice;
pub use state::{AbstractState, StateStore};
pub use summary::{CacheStats, MethodSummaries, Summary, SummaryCache};
pub use transfer::{
    EdgeContext, NodeContext, TransferFunction, merge_predecessors, propagate_edge,
};
pub use widening::WideningStrategy;

pub use absint_ir::{HasBottom, HasTop, Lattice};
