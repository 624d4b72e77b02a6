use absint_ir::{Block, Node, NodeInfo, Program};

use crate::{AbstractDomain, AnalysisContext, AnalysisOutcome, CallHandler, StateStore};

/// View of one node handed to node semantics.
pub struct NodeContext<'a, K> {
    pub program: &'a Program<K>,
    pub node: Node,
    pub info: &'a NodeInfo<K>,
    pub cx: &'a AnalysisContext,
}

impl<K> NodeContext<'_, K> {
    /// The `index`-th operand of this node.
    pub fn operand(&self, index: usize) -> Option<Node> {
        self.info.operands.get(index).copied()
    }
}

/// View of one control-flow edge `source -> target` at node level.
pub struct EdgeContext<'a, K> {
    pub program: &'a Program<K>,
    pub source: Node,
    pub target: Node,
    pub cx: &'a AnalysisContext,
}

impl<'a, K> EdgeContext<'a, K> {
    pub fn source_info(&self) -> Option<&'a NodeInfo<K>> {
        self.program.node(self.source)
    }

    pub fn target_info(&self) -> Option<&'a NodeInfo<K>> {
        self.program.node(self.target)
    }
}

/// Client semantics for nodes and edges over the domain `D`.
///
/// `exec_node` turns `pre(node)` into `post(node)`. Calls go through the
/// [`CallHandler`] it is given; the same transfer function therefore runs
/// unchanged under [`crate::OpaqueCalls`] and under the interprocedural
/// analyzer.
///
/// Nodes restricted from execution never reach `exec_node`: the driver
/// resets their `post` to bottom and forwards the restriction instead.
pub trait TransferFunction<K, D: AbstractDomain> {
    /// Merge `post(source)` into `pre(target)`. Returns whether the target
    /// changed. Must be idempotent for an unchanged `post(source)`.
    fn exec_edge(&self, edge: &EdgeContext<'_, K>, store: &mut StateStore<D>) -> AnalysisOutcome<bool> {
        propagate_edge(self, edge, store)
    }

    /// Whether control can flow along `edge` under the current state.
    /// Infeasible edges contribute a restriction instead of a value.
    fn is_feasible(&self, _edge: &EdgeContext<'_, K>, _store: &StateStore<D>) -> bool {
        true
    }

    fn exec_node(
        &self,
        node: &NodeContext<'_, K>,
        store: &mut StateStore<D>,
        calls: &mut dyn CallHandler<D>,
    ) -> AnalysisOutcome<()>;

    /// Whether the driver merges predecessor states into the first node of
    /// `block`. When `false`, `exec_node` of that node is responsible for
    /// pulling them in, usually through [`merge_predecessors`].
    fn collect_at_block_entry(&self, _block: Block) -> bool {
        true
    }
}

/// The default edge semantics: a restricted source or an infeasible edge
/// restricts the target, anything else joins `post(source)` into
/// `pre(target)`.
pub fn propagate_edge<K, D, T>(
    transfer: &T,
    edge: &EdgeContext<'_, K>,
    store: &mut StateStore<D>,
) -> AnalysisOutcome<bool>
where
    D: AbstractDomain,
    T: TransferFunction<K, D> + ?Sized,
{
    let restricted = store.is_restricted(edge.source)?;
    if restricted || !transfer.is_feasible(edge, store) {
        return store.restrict(edge.target);
    }
    let incoming = store.post(edge.source)?.clone();
    let current = store.pre(edge.target)?;
    let joined = current.join(&incoming);
    edge.cx.check_join(current, &incoming, &joined)?;
    store.assign_pre(edge.target, joined)
}

/// Pull the state of every computed predecessor of `node` through
/// `exec_edge`. Returns whether the node is reachable afterwards.
///
/// For transfer functions that merge per node rather than at block entry.
pub fn merge_predecessors<K, D, T>(
    transfer: &T,
    node: &NodeContext<'_, K>,
    store: &mut StateStore<D>,
) -> AnalysisOutcome<bool>
where
    D: AbstractDomain,
    T: TransferFunction<K, D> + ?Sized,
{
    for source in node.program.node_predecessors(node.node) {
        let settled = store.get(source).is_some_and(|state| state.is_settled());
        if !settled {
            continue;
        }
        let edge = EdgeContext {
            program: node.program,
            source,
            target: node.node,
            cx: node.cx,
        };
        transfer.exec_edge(&edge, store)?;
    }
    Ok(store.state(node.node)?.is_reached())
}
