//! Resource-leak checker built on the abstract interpretation engine.
//!
//! Every `Acquire` node opens a resource named by the node itself and a
//! `Release` closes the resource of its operand. Whatever may still be open
//! when the root method returns is reported as a possible leak.

pub mod demo;
mod report;
mod tracker;

use absint_interpreter::{
    AnalysisContext, AnalysisOutcome, MethodResult, SummaryCache, run_interprocedural,
};
use absint_ir::{Method, Program};

pub use report::{Leak, LeakReport};
pub use tracker::{ResourceCategory, ResourceId, ResourceOp, Resources, TrackerError, tracker};

/// Analyze `root` starting with nothing open.
pub fn analyze(
    program: &Program<ResourceOp>,
    root: Method,
    cache: &SummaryCache<Resources>,
    cx: &AnalysisContext,
) -> AnalysisOutcome<MethodResult<Resources>> {
    run_interprocedural(program, root, Resources::new(), &tracker(), cache, cx)
}

/// Report the resources possibly open when `root` returns.
pub fn check(
    program: &Program<ResourceOp>,
    root: Method,
    cache: &SummaryCache<Resources>,
    cx: &AnalysisContext,
) -> AnalysisOutcome<LeakReport> {
    let result = analyze(program, root, cache, cx)?;
    Ok(LeakReport::new(program, root, &result.exit))
}
