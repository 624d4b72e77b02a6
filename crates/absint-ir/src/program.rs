use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::arena::Arena;
use crate::node::*;

/// Arena-backed program: methods, their blocks and their nodes.
///
/// `K` is the client's node kind. The program is built once and then only
/// borrowed by analyses.
#[derive(Clone, Debug)]
pub struct Program<K> {
    pub(crate) methods: Arena<Method, MethodInfo>,
    pub(crate) blocks: Arena<Block, BlockInfo>,
    pub(crate) nodes: Arena<Node, NodeInfo<K>>,
    pub(crate) names: IndexMap<String, Method>,
}

impl<K> Default for Program<K> {
    fn default() -> Self {
        Self {
            methods: Arena::default(),
            blocks: Arena::default(),
            nodes: Arena::default(),
            names: IndexMap::new(),
        }
    }
}

impl<K> Program<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a method by name. Declaring an existing name returns the
    /// method that already carries it.
    pub fn declare(&mut self, name: impl Into<String>) -> Method {
        let name = name.into();
        if let Some(method) = self.names.get(&name) {
            return *method;
        }
        let method = self.methods.alloc(MethodInfo {
            name: name.clone(),
            body: None,
        });
        self.names.insert(name, method);
        method
    }

    /// Look a method up by name.
    pub fn resolve(&self, name: &str) -> Option<Method> {
        self.names.get(name).copied()
    }

    pub fn method_name(&self, method: Method) -> Option<&str> {
        self.methods.get(method).map(|info| info.name.as_str())
    }

    pub fn body(&self, method: Method) -> Option<&Body> {
        self.methods.get(method)?.body.as_ref()
    }

    pub fn methods(&self) -> impl Iterator<Item = (Method, &MethodInfo)> {
        self.methods.iter()
    }

    pub fn node(&self, node: Node) -> Option<&NodeInfo<K>> {
        self.nodes.get(node)
    }

    pub fn block(&self, block: Block) -> Option<&BlockInfo> {
        self.blocks.get(block)
    }

    pub fn first_node(&self, block: Block) -> Option<Node> {
        self.blocks.get(block)?.first_node()
    }

    pub fn last_node(&self, block: Block) -> Option<Node> {
        self.blocks.get(block)?.last_node()
    }

    /// Node-level successors: the next node in the same block, or the first
    /// node of every successor block when `node` ends its block.
    pub fn node_successors(&self, node: Node) -> SmallVec<[Node; 2]> {
        let mut out = SmallVec::new();
        let Some(info) = self.nodes.get(node) else {
            return out;
        };
        let Some(block) = self.blocks.get(info.block) else {
            return out;
        };
        match block.nodes.iter().position(|n| *n == node) {
            Some(index) if index + 1 < block.nodes.len() => out.push(block.nodes[index + 1]),
            Some(_) => out.extend(block.successors.iter().filter_map(|b| self.first_node(*b))),
            None => {}
        }
        out
    }

    /// Node-level predecessors: the previous node in the same block, or the
    /// last node of every predecessor block when `node` starts its block.
    pub fn node_predecessors(&self, node: Node) -> SmallVec<[Node; 2]> {
        let mut out = SmallVec::new();
        let Some(info) = self.nodes.get(node) else {
            return out;
        };
        let Some(block) = self.blocks.get(info.block) else {
            return out;
        };
        match block.nodes.iter().position(|n| *n == node) {
            Some(0) => out.extend(block.predecessors.iter().filter_map(|b| self.last_node(*b))),
            Some(index) => out.push(block.nodes[index - 1]),
            None => {}
        }
        out
    }

    /// Number of nodes across all methods.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
