use std::fmt;

use absint_interpreter::{
    AnalysisError, AnalysisOutcome, DispatchTable, Lattice, NodeContext, NodeKind, SetLattice,
    StateStore, call_summary,
};
use absint_ir::Node;

/// Node kinds of the resource language.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceOp {
    /// Opens a resource of the given kind. The node itself names it.
    Acquire(&'static str),
    /// Closes the resource acquired by the first operand.
    Release,
    /// Calls the method named by the node's call site.
    Invoke,
    Branch,
    Return,
    Nop,
    /// Never returns.
    Abort,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceCategory {
    Acquire,
    Release,
    Invoke,
    Inert,
}

impl NodeKind for ResourceOp {
    type Category = ResourceCategory;

    fn category(&self) -> ResourceCategory {
        match self {
            ResourceOp::Acquire(_) => ResourceCategory::Acquire,
            ResourceOp::Release => ResourceCategory::Release,
            ResourceOp::Invoke => ResourceCategory::Invoke,
            ResourceOp::Branch | ResourceOp::Return | ResourceOp::Nop | ResourceOp::Abort => {
                ResourceCategory::Inert
            }
        }
    }
}

/// A resource, named by the node that acquired it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(pub Node);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r@{}", self.0)
    }
}

/// Resources possibly open at a program point.
pub type Resources = SetLattice<ResourceId>;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("release at {0} names no resource")]
    MissingReceiver(Node),
}

fn update(
    node: &NodeContext<'_, ResourceOp>,
    store: &mut StateStore<Resources>,
    f: impl FnOnce(&mut Resources),
) -> AnalysisOutcome<()> {
    let mut post = store.pre(node.node)?.clone();
    f(&mut post);
    store.set_post(node.node, post)?;
    Ok(())
}

/// Transfer function of the leak checker.
///
/// Callees are summarized from an empty open set, so a summary records the
/// resources a call leaves open and is shared by every call site.
pub fn tracker() -> DispatchTable<ResourceOp, Resources> {
    DispatchTable::<ResourceOp, Resources>::new()
        .with(ResourceCategory::Acquire, |node, store, _calls| {
            update(node, store, |open| {
                open.insert(ResourceId(node.node));
            })
        })
        .with(ResourceCategory::Release, |node, store, _calls| {
            let receiver = node
                .info
                .operands
                .first()
                .copied()
                .ok_or_else(|| AnalysisError::custom(TrackerError::MissingReceiver(node.node)))?;
            update(node, store, |open| {
                open.remove(&ResourceId(receiver));
            })
        })
        .with(ResourceCategory::Invoke, |node, store, calls| {
            let summary = call_summary(node, calls, &Resources::new())?;
            let post = summary.apply_with(store.pre(node.node)?, |pre, exit| pre.join(exit));
            store.set_post(node.node, post)?;
            Ok(())
        })
        .with(ResourceCategory::Inert, |node, store, _calls| {
            update(node, store, |_| {})
        })
        .with_feasibility(|edge, _store| {
            !matches!(
                edge.source_info().map(|info| info.kind),
                Some(ResourceOp::Abort)
            )
        })
}
