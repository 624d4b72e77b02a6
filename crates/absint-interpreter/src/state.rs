use absint_ir::{Method, Node, Program};

use crate::{AbstractDomain, AnalysisError, AnalysisOutcome};

/// Pre/post-condition pair attached to one IR node.
///
/// `post` is only meaningful once the node has executed; `pre` once every
/// incoming edge has been merged. A node whose every incoming edge was
/// infeasible or restricted is *restricted from execution*: its semantics
/// never run and its `post` stays bottom.
#[derive(Clone, Debug, PartialEq)]
pub struct AbstractState<D> {
    pub pre: D,
    pub post: D,
    restricted: bool,
    reached: bool,
    executed: bool,
}

impl<D: AbstractDomain> AbstractState<D> {
    fn bottom() -> Self {
        Self {
            pre: D::bottom(),
            post: D::bottom(),
            restricted: false,
            reached: false,
            executed: false,
        }
    }
}

impl<D> AbstractState<D> {
    /// Unreachable under the current abstract state.
    pub fn is_restricted(&self) -> bool {
        self.restricted
    }

    /// Some feasible edge, or the method entry, delivered state here.
    pub fn is_reached(&self) -> bool {
        self.reached
    }

    /// The transfer function has run for this node at least once.
    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// The driver has decided this node either way.
    pub fn is_settled(&self) -> bool {
        self.reached || self.restricted
    }
}

/// Abstract states of every node of one method.
///
/// A dense arena indexed by each node's [`local`](absint_ir::NodeInfo::local)
/// position in the method body. One store belongs to exactly one in-flight
/// method analysis; touching a node of another method is reported as a
/// malformed CFG.
#[derive(Clone, Debug)]
pub struct StateStore<D> {
    method: Method,
    name: String,
    /// Body nodes by local index, for the owner check.
    nodes: Vec<Node>,
    /// Raw id of local 0. A body's nodes are allocated back to back.
    base: usize,
    states: Vec<AbstractState<D>>,
    passes: usize,
}

impl<D: AbstractDomain> StateStore<D> {
    /// Create a store with every node of `method` at bottom.
    pub fn new<K>(program: &Program<K>, method: Method) -> AnalysisOutcome<Self> {
        let name = program
            .method_name(method)
            .unwrap_or("<unknown>")
            .to_owned();
        let body = program
            .body(method)
            .ok_or_else(|| AnalysisError::MissingBody {
                method: name.clone(),
            })?;
        let base = body.nodes.first().map_or(0, |node| node.raw());
        for node in &body.nodes {
            let local = program.node(*node).map(|info| info.local);
            if local != Some(node.raw().wrapping_sub(base)) {
                return Err(AnalysisError::malformed(
                    &name,
                    format!("{node} is not at its local index"),
                ));
            }
        }
        Ok(Self {
            method,
            name,
            nodes: body.nodes.clone(),
            base,
            states: (0..body.nodes.len())
                .map(|_| AbstractState::bottom())
                .collect(),
            passes: 0,
        })
    }

    /// Seed the method entry node with `value`.
    pub fn seed(&mut self, node: Node, value: D) -> AnalysisOutcome<()> {
        let state = self.state_mut(node)?;
        state.pre = value;
        state.reached = true;
        state.restricted = false;
        Ok(())
    }

    /// Join `incoming` into `pre(node)` and mark the node reached.
    /// Returns whether anything changed.
    pub fn join_into_pre(&mut self, node: Node, incoming: &D) -> AnalysisOutcome<bool> {
        let state = self.state_mut(node)?;
        let joined = state.pre.join(incoming);
        let changed = joined != state.pre || !state.reached;
        state.pre = joined;
        state.reached = true;
        state.restricted = false;
        Ok(changed)
    }

    /// Overwrite `pre(node)` with the straight-line predecessor's post.
    pub fn assign_pre(&mut self, node: Node, value: D) -> AnalysisOutcome<bool> {
        let state = self.state_mut(node)?;
        let changed = value != state.pre || !state.reached;
        state.pre = value;
        state.reached = true;
        state.restricted = false;
        Ok(changed)
    }

    /// Mark `node` reachable without touching its value.
    pub fn mark_reached(&mut self, node: Node) -> AnalysisOutcome<bool> {
        let state = self.state_mut(node)?;
        let changed = !state.reached;
        state.reached = true;
        state.restricted = false;
        Ok(changed)
    }

    /// Restrict `node` unless something already reached it. Returns whether
    /// the flag was newly set.
    pub fn restrict(&mut self, node: Node) -> AnalysisOutcome<bool> {
        let state = self.state_mut(node)?;
        if state.reached || state.restricted {
            return Ok(false);
        }
        state.restricted = true;
        Ok(true)
    }

    /// Replace `post(node)`. Returns whether the value changed.
    pub fn set_post(&mut self, node: Node, value: D) -> AnalysisOutcome<bool> {
        let state = self.state_mut(node)?;
        let changed = value != state.post;
        state.post = value;
        state.executed = true;
        Ok(changed)
    }

    /// Reset `post(node)` to bottom.
    pub fn reset_post(&mut self, node: Node) -> AnalysisOutcome<()> {
        self.state_mut(node)?.post = D::bottom();
        Ok(())
    }

    pub(crate) fn mark_executed(&mut self, node: Node) -> AnalysisOutcome<()> {
        self.state_mut(node)?.executed = true;
        Ok(())
    }

    pub(crate) fn set_passes(&mut self, passes: usize) {
        self.passes = passes;
    }
}

impl<D> StateStore<D> {
    pub fn method(&self) -> Method {
        self.method
    }

    pub fn method_name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Block-driver passes the last fixpoint run needed.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Look a node's state up without failing.
    pub fn get(&self, node: Node) -> Option<&AbstractState<D>> {
        self.local(node).map(|local| &self.states[local])
    }

    pub fn state(&self, node: Node) -> AnalysisOutcome<&AbstractState<D>> {
        let slot = self.slot(node)?;
        Ok(&self.states[slot])
    }

    pub fn state_mut(&mut self, node: Node) -> AnalysisOutcome<&mut AbstractState<D>> {
        let slot = self.slot(node)?;
        Ok(&mut self.states[slot])
    }

    pub fn pre(&self, node: Node) -> AnalysisOutcome<&D> {
        Ok(&self.state(node)?.pre)
    }

    pub fn post(&self, node: Node) -> AnalysisOutcome<&D> {
        Ok(&self.state(node)?.post)
    }

    /// In-place access to `post(node)` for transfer functions that update
    /// the value rather than rebuild it.
    pub fn post_mut(&mut self, node: Node) -> AnalysisOutcome<&mut D> {
        let state = self.state_mut(node)?;
        state.executed = true;
        Ok(&mut state.post)
    }

    pub fn is_restricted(&self, node: Node) -> AnalysisOutcome<bool> {
        Ok(self.state(node)?.restricted)
    }

    pub fn is_executed(&self, node: Node) -> AnalysisOutcome<bool> {
        Ok(self.state(node)?.executed)
    }

    /// States in local index order.
    pub fn iter(&self) -> impl Iterator<Item = (Node, &AbstractState<D>)> {
        self.nodes.iter().copied().zip(&self.states)
    }

    fn local(&self, node: Node) -> Option<usize> {
        let local = node.raw().checked_sub(self.base)?;
        (self.nodes.get(local) == Some(&node)).then_some(local)
    }

    fn slot(&self, node: Node) -> AnalysisOutcome<usize> {
        self.local(node).ok_or_else(|| {
            AnalysisError::malformed(&self.name, format!("{node} is not a node of this method"))
        })
    }
}
