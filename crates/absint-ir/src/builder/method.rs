use petgraph::graphmap::DiGraphMap;
use petgraph::visit::DfsPostOrder;
use smallvec::SmallVec;

use super::error::BuildError;
use crate::node::*;
use crate::{GetInfo, Program};

/// Assembles the body of one declared method.
///
/// Obtained via [`Program::define`]. Blocks and nodes are allocated
/// eagerly; successor edges are recorded and turned into symmetric
/// predecessor lists, dense node indices and a reverse postorder on
/// [`MethodBuilder::finish`].
pub struct MethodBuilder<'a, K> {
    program: &'a mut Program<K>,
    method: Method,
    blocks: Vec<Block>,
    nodes: Vec<Node>,
    edges: Vec<(Block, Block)>,
    error: Option<BuildError>,
}

impl<K> Program<K> {
    /// Start building the body of `method`.
    pub fn define(&mut self, method: Method) -> Result<MethodBuilder<'_, K>, BuildError> {
        let info = method
            .get_info(self)
            .ok_or(BuildError::UnknownMethod { method })?;
        if info.body.is_some() {
            return Err(BuildError::AlreadyDefined { method });
        }
        Ok(MethodBuilder {
            program: self,
            method,
            blocks: Vec::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            error: None,
        })
    }
}

#[bon::bon]
impl<'a, K> MethodBuilder<'a, K> {
    /// Append a node to `block`.
    #[builder(finish_fn = new)]
    pub fn node(
        &mut self,
        block: Block,
        kind: K,
        #[builder(default)] operands: Vec<Node>,
        call: Option<CallSite>,
        ret: Option<ReturnSite>,
    ) -> Node {
        let node = self.program.nodes.alloc(NodeInfo {
            kind,
            method: self.method,
            block,
            local: self.nodes.len(),
            operands: SmallVec::from_vec(operands),
            call,
            ret,
        });
        self.nodes.push(node);
        match self.program.blocks.get_mut(block) {
            Some(info) if info.method == self.method => info.nodes.push(node),
            _ => self.fail(BuildError::ForeignBlock {
                method: self.method,
                block,
            }),
        }
        node
    }
}

impl<K> MethodBuilder<'_, K> {
    pub fn method(&self) -> Method {
        self.method
    }

    /// Allocate an empty block owned by this method.
    pub fn block(&mut self) -> Block {
        let block = self.program.blocks.alloc(BlockInfo::new(self.method));
        self.blocks.push(block);
        block
    }

    /// Append a plain node.
    pub fn op(&mut self, block: Block, kind: K) -> Node {
        self.node().block(block).kind(kind).new()
    }

    /// Append a call node.
    pub fn call(&mut self, block: Block, kind: K, site: CallSite) -> Node {
        self.node().block(block).kind(kind).call(site).new()
    }

    /// Append a return node.
    pub fn ret(&mut self, block: Block, kind: K, value: Option<Node>) -> Node {
        self.node()
            .block(block)
            .kind(kind)
            .ret(ReturnSite { value })
            .new()
    }

    /// Record a control-flow edge `from -> to`.
    pub fn edge(&mut self, from: Block, to: Block) -> &mut Self {
        for block in [from, to] {
            if !self.blocks.contains(&block) {
                self.fail(BuildError::ForeignBlock {
                    method: self.method,
                    block,
                });
            }
        }
        if !self.edges.contains(&(from, to)) {
            self.edges.push((from, to));
        }
        self
    }

    /// Install the body with `entry` as its entry block.
    pub fn finish(mut self, entry: Block) -> Result<Method, BuildError> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        if self.blocks.is_empty() {
            return Err(BuildError::EmptyBody {
                method: self.method,
            });
        }
        if !self.blocks.contains(&entry) {
            return Err(BuildError::ForeignBlock {
                method: self.method,
                block: entry,
            });
        }

        let mut graph = DiGraphMap::<Block, ()>::new();
        for &block in &self.blocks {
            graph.add_node(block);
        }
        for &(from, to) in &self.edges {
            graph.add_edge(from, to, ());
            self.program.blocks[from].successors.push(to);
            self.program.blocks[to].predecessors.push(from);
        }

        let mut order = Vec::with_capacity(self.blocks.len());
        let mut dfs = DfsPostOrder::new(&graph, entry);
        while let Some(block) = dfs.next(&graph) {
            order.push(block);
        }
        order.reverse();

        let method = self.method;
        self.program.methods[method].body = Some(Body {
            entry,
            blocks: std::mem::take(&mut self.blocks),
            order,
            nodes: std::mem::take(&mut self.nodes),
        });
        Ok(method)
    }

    fn fail(&mut self, error: BuildError) {
        self.error.get_or_insert(error);
    }
}
