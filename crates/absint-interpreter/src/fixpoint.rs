use absint_ir::{Block, BlockInfo, Body, Method, Node, Program};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    AbstractDomain, AnalysisContext, AnalysisError, AnalysisOutcome, CallHandler, EdgeContext,
    NodeContext, StateStore, TransferFunction,
};

/// Run the block-level fixpoint of the method owning `store`, entering it
/// with `entry`, and return its exit state.
///
/// Blocks are visited in reverse postorder. A further pass is made only
/// while some back edge still carries state its loop header has not
/// absorbed, so an acyclic body takes exactly one pass.
pub fn run_intraprocedural<K, D, T>(
    program: &Program<K>,
    entry: D,
    transfer: &T,
    store: &mut StateStore<D>,
    calls: &mut dyn CallHandler<D>,
    cx: &AnalysisContext,
) -> AnalysisOutcome<D>
where
    D: AbstractDomain,
    T: TransferFunction<K, D> + ?Sized,
{
    let driver = BlockDriver::new(program, transfer, cx, store.method())?;
    driver.run(entry, store, calls)
}

struct BlockDriver<'a, K, T: ?Sized> {
    program: &'a Program<K>,
    transfer: &'a T,
    cx: &'a AnalysisContext,
    method: Method,
    name: &'a str,
    body: &'a Body,
    back_edges: Vec<(Block, Block)>,
    headers: FxHashSet<Block>,
}

impl<'a, K, T: ?Sized> BlockDriver<'a, K, T> {
    fn new(
        program: &'a Program<K>,
        transfer: &'a T,
        cx: &'a AnalysisContext,
        method: Method,
    ) -> AnalysisOutcome<Self> {
        let name = program.method_name(method).unwrap_or("<unknown>");
        let body = program
            .body(method)
            .ok_or_else(|| AnalysisError::MissingBody {
                method: name.to_owned(),
            })?;
        let mut driver = Self {
            program,
            transfer,
            cx,
            method,
            name,
            body,
            back_edges: Vec::new(),
            headers: FxHashSet::default(),
        };
        driver.validate()?;
        for (position, &block) in body.order.iter().enumerate() {
            for &pred in &driver.block_info(block)?.predecessors {
                if body.position(pred).is_some_and(|p| p >= position) {
                    driver.back_edges.push((pred, block));
                    driver.headers.insert(block);
                }
            }
        }
        Ok(driver)
    }

    fn malformed(&self, detail: impl Into<String>) -> AnalysisError {
        AnalysisError::malformed(self.name, detail)
    }

    fn block_info(&self, block: Block) -> AnalysisOutcome<&'a BlockInfo> {
        self.program
            .block(block)
            .ok_or_else(|| self.malformed(format!("{block} is not allocated")))
    }

    fn first_node(&self, block: Block) -> AnalysisOutcome<Node> {
        self.program
            .first_node(block)
            .ok_or_else(|| self.malformed(format!("{block} is empty")))
    }

    fn last_node(&self, block: Block) -> AnalysisOutcome<Node> {
        self.program
            .last_node(block)
            .ok_or_else(|| self.malformed(format!("{block} is empty")))
    }

    fn is_back_edge(&self, from: Block, to: Block) -> bool {
        self.back_edges.contains(&(from, to))
    }

    fn edge(&self, source: Node, target: Node) -> EdgeContext<'a, K> {
        EdgeContext {
            program: self.program,
            source,
            target,
            cx: self.cx,
        }
    }

    /// Check the reachable part of the CFG for inconsistencies.
    fn validate(&self) -> AnalysisOutcome<()> {
        for &block in &self.body.order {
            let info = self.block_info(block)?;
            if info.method != self.method {
                return Err(self.malformed(format!("{block} belongs to another method")));
            }
            if info.nodes.is_empty() {
                return Err(self.malformed(format!("{block} is empty")));
            }
            for &node in &info.nodes {
                let owner = self
                    .program
                    .node(node)
                    .ok_or_else(|| self.malformed(format!("{node} is not allocated")))?;
                if owner.block != block || owner.method != self.method {
                    return Err(self.malformed(format!(
                        "{node} is listed in {block} but belongs to {}",
                        owner.block
                    )));
                }
            }
            for &pred in &info.predecessors {
                let pred_info = self.block_info(pred)?;
                if pred_info.method != self.method {
                    return Err(self.malformed(format!(
                        "predecessor {pred} of {block} belongs to another method"
                    )));
                }
                if !pred_info.successors.contains(&block) {
                    return Err(self.malformed(format!(
                        "{block} lists {pred} as predecessor but {pred} has no edge to it"
                    )));
                }
            }
            for &succ in &info.successors {
                if !self.block_info(succ)?.predecessors.contains(&block) {
                    return Err(self.malformed(format!(
                        "{block} has an edge to {succ} missing from its predecessors"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl<'a, K, T: ?Sized> BlockDriver<'a, K, T> {
    fn run<D>(
        &self,
        entry: D,
        store: &mut StateStore<D>,
        calls: &mut dyn CallHandler<D>,
    ) -> AnalysisOutcome<D>
    where
        D: AbstractDomain,
        T: TransferFunction<K, D>,
    {
        let entry_node = self.first_node(self.body.entry)?;
        store.seed(entry_node, entry)?;

        let max_passes = self.cx.config().max_passes;
        let mut visits: FxHashMap<Block, usize> = FxHashMap::default();
        let mut passes = 0;
        loop {
            passes += 1;
            if passes > max_passes {
                return Err(AnalysisError::NonTermination {
                    chain: vec![self.name.to_owned()],
                    iterations: max_passes,
                });
            }
            for &block in &self.body.order {
                self.visit_block(block, store, calls, &mut visits)?;
            }
            store.set_passes(passes);
            if !self.needs_another_pass(store)? {
                break;
            }
            self.cx.debug(format_args!(
                "{}: loop state still growing after pass {passes}",
                self.name
            ));
        }
        self.cx
            .debug(format_args!("{}: fixpoint after {passes} pass(es)", self.name));
        self.exit_value(store)
    }

    fn visit_block<D>(
        &self,
        block: Block,
        store: &mut StateStore<D>,
        calls: &mut dyn CallHandler<D>,
        visits: &mut FxHashMap<Block, usize>,
    ) -> AnalysisOutcome<()>
    where
        D: AbstractDomain,
        T: TransferFunction<K, D>,
    {
        let info = self.block_info(block)?;
        let first = self.first_node(block)?;
        let collect = self.transfer.collect_at_block_entry(block);
        if collect {
            self.merge_block_entry(block, first, store, visits)?;
        }

        let mut previous = None;
        for &node in &info.nodes {
            if let Some(prev) = previous {
                self.straight_line(prev, node, store)?;
            }
            previous = Some(node);

            let pulls_itself = node == first && !collect;
            let skip = if pulls_itself {
                let dead = self.only_restricted_incoming(node, store)?;
                if dead {
                    store.restrict(node)?;
                }
                dead && store.is_restricted(node)?
            } else {
                store.is_restricted(node)?
            };
            if skip {
                store.reset_post(node)?;
                continue;
            }
            if !store.state(node)?.is_reached() && !pulls_itself {
                return Err(self.malformed(format!("{node} has no computed predecessor state")));
            }

            let node_cx = NodeContext {
                program: self.program,
                node,
                info: self
                    .program
                    .node(node)
                    .ok_or_else(|| self.malformed(format!("{node} is not allocated")))?,
                cx: self.cx,
            };
            let header_pre = if pulls_itself && self.headers.contains(&block) {
                Some(store.pre(node)?.clone())
            } else {
                None
            };
            self.transfer.exec_node(&node_cx, store, calls)?;
            if let Some(before) = header_pre {
                // the node merged its own predecessors; rerun it on the widened state
                if self.widen_header(block, node, before, store, visits)? {
                    self.transfer.exec_node(&node_cx, store, calls)?;
                }
            }

            let state = store.state(node)?;
            if state.is_restricted() {
                store.reset_post(node)?;
            } else if !state.is_reached() {
                return Err(self.malformed(format!("{node} has no computed predecessor state")));
            } else {
                store.mark_executed(node)?;
            }
        }
        Ok(())
    }

    /// Whether some predecessor of `node` is settled and every settled one
    /// is restricted or reaches `node` over an infeasible edge.
    fn only_restricted_incoming<D>(&self, node: Node, store: &StateStore<D>) -> AnalysisOutcome<bool>
    where
        D: AbstractDomain,
        T: TransferFunction<K, D>,
    {
        let mut settled = false;
        for source in self.program.node_predecessors(node) {
            let state = store.state(source)?;
            if !state.is_settled() {
                continue;
            }
            settled = true;
            if !state.is_restricted() && self.transfer.is_feasible(&self.edge(source, node), store) {
                return Ok(false);
            }
        }
        Ok(settled)
    }

    /// Merge every reachable predecessor into the block's first node.
    fn merge_block_entry<D>(
        &self,
        block: Block,
        first: Node,
        store: &mut StateStore<D>,
        visits: &mut FxHashMap<Block, usize>,
    ) -> AnalysisOutcome<()>
    where
        D: AbstractDomain,
        T: TransferFunction<K, D>,
    {
        let header = self.headers.contains(&block);
        let before = if header {
            Some(store.pre(first)?.clone())
        } else {
            None
        };

        for &pred in &self.block_info(block)?.predecessors {
            if self.body.position(pred).is_none() {
                continue;
            }
            let source = self.last_node(pred)?;
            if !store.state(source)?.is_settled() {
                if self.is_back_edge(pred, block) {
                    continue;
                }
                return Err(self.malformed(format!(
                    "predecessor {pred} of {block} has no computed state"
                )));
            }
            self.transfer.exec_edge(&self.edge(source, first), store)?;
        }

        if let Some(before) = before {
            self.widen_header(block, first, before, store, visits)?;
        }
        Ok(())
    }

    /// Widen the merged `pre(first)` of loop header `block` against its
    /// value `before` the merge. Returns whether widening changed it.
    fn widen_header<D>(
        &self,
        block: Block,
        first: Node,
        before: D,
        store: &mut StateStore<D>,
        visits: &mut FxHashMap<Block, usize>,
    ) -> AnalysisOutcome<bool>
    where
        D: AbstractDomain,
    {
        let visit = visits.entry(block).or_insert(0);
        let mut changed = false;
        if *visit > 0 && store.state(first)?.is_reached() {
            let merged = store.pre(first)?.clone();
            let widened = self.cx.config().widening.merge(&before, &merged, *visit);
            if widened != merged {
                self.cx
                    .debug(format_args!("{}: widened header {block}", self.name));
                store.assign_pre(first, widened)?;
                changed = true;
            }
        }
        *visit += 1;
        Ok(changed)
    }

    fn straight_line<D>(&self, prev: Node, node: Node, store: &mut StateStore<D>) -> AnalysisOutcome<()>
    where
        D: AbstractDomain,
        T: TransferFunction<K, D>,
    {
        let edge = self.edge(prev, node);
        if store.is_restricted(prev)? || !self.transfer.is_feasible(&edge, store) {
            store.restrict(node)?;
            return Ok(());
        }
        let value = store.post(prev)?.clone();
        store.assign_pre(node, value)?;
        Ok(())
    }

    /// Whether some feasible back edge carries state its header lacks.
    fn needs_another_pass<D>(&self, store: &StateStore<D>) -> AnalysisOutcome<bool>
    where
        D: AbstractDomain,
        T: TransferFunction<K, D>,
    {
        for &(from, header) in &self.back_edges {
            let source = self.last_node(from)?;
            let target = self.first_node(header)?;
            let source_state = store.state(source)?;
            if !source_state.is_reached() {
                continue;
            }
            if !self.transfer.is_feasible(&self.edge(source, target), store) {
                continue;
            }
            let target_state = store.state(target)?;
            if !target_state.is_reached() || !source_state.post.is_subseteq(&target_state.pre) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Join of the post states of every reached return node, or of the
    /// last nodes of exit blocks when the method has no return node.
    fn exit_value<D: AbstractDomain>(&self, store: &StateStore<D>) -> AnalysisOutcome<D> {
        let mut exit = D::bottom();
        let mut has_return = false;
        for &block in &self.body.order {
            for &node in &self.block_info(block)?.nodes {
                let is_return = self.program.node(node).is_some_and(|info| info.is_return());
                if !is_return {
                    continue;
                }
                has_return = true;
                let state = store.state(node)?;
                if state.is_reached() {
                    exit = exit.join(&state.post);
                }
            }
        }
        if has_return {
            return Ok(exit);
        }
        for &block in &self.body.order {
            if !self.block_info(block)?.successors.is_empty() {
                continue;
            }
            let state = store.state(self.last_node(block)?)?;
            if state.is_reached() {
                exit = exit.join(&state.post);
            }
        }
        Ok(exit)
    }
}
