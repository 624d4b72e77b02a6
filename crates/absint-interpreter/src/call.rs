use absint_ir::{Node, Program};

use crate::{AbstractDomain, AnalysisError, AnalysisOutcome, NodeContext, StateStore, Summary};

/// Resolves call sites to callee summaries.
///
/// Node semantics never analyze callees themselves; they ask the handler
/// they were given. `entry` is the state the callee is entered with.
pub trait CallHandler<D> {
    fn call(&mut self, site: Node, callee: &str, entry: &D) -> AnalysisOutcome<Summary<D>>;
}

impl<D, F> CallHandler<D> for F
where
    F: FnMut(Node, &str, &D) -> AnalysisOutcome<Summary<D>>,
{
    fn call(&mut self, site: Node, callee: &str, entry: &D) -> AnalysisOutcome<Summary<D>> {
        self(site, callee, entry)
    }
}

/// Intraprocedural-only configuration: every resolvable call returns the
/// identity summary `entry -> entry`.
#[derive(Debug, Clone, Copy)]
pub struct OpaqueCalls<'p, K> {
    program: &'p Program<K>,
}

impl<'p, K> OpaqueCalls<'p, K> {
    pub fn new(program: &'p Program<K>) -> Self {
        Self { program }
    }
}

impl<K, D: AbstractDomain> CallHandler<D> for OpaqueCalls<'_, K> {
    fn call(&mut self, site: Node, callee: &str, entry: &D) -> AnalysisOutcome<Summary<D>> {
        let method = self
            .program
            .resolve(callee)
            .ok_or_else(|| AnalysisError::UnresolvedCallee {
                site,
                callee: callee.to_owned(),
            })?;
        Ok(Summary::identity(method, entry.clone()))
    }
}

/// Ask `calls` for the summary of the call at `node`, entering the callee
/// with `entry`. Fails if the handler answers with a summary whose entry
/// state does not cover `entry`.
pub fn call_summary<K, D: AbstractDomain>(
    node: &NodeContext<'_, K>,
    calls: &mut dyn CallHandler<D>,
    entry: &D,
) -> AnalysisOutcome<Summary<D>> {
    let site = node
        .info
        .call
        .as_ref()
        .ok_or(AnalysisError::NotACall { node: node.node })?;
    let summary = calls.call(node.node, &site.callee, entry)?;
    if !summary.subsumes(entry) {
        return Err(AnalysisError::SummaryMismatch {
            site: node.node,
            callee: site.callee.clone(),
        });
    }
    Ok(summary)
}

/// Enter the callee with `pre(node)` and return the composed post value.
pub fn call_site<K, D: AbstractDomain>(
    node: &NodeContext<'_, K>,
    store: &StateStore<D>,
    calls: &mut dyn CallHandler<D>,
) -> AnalysisOutcome<D> {
    let pre = store.pre(node.node)?;
    let summary = call_summary(node, calls, pre)?;
    Ok(summary.apply(pre))
}
