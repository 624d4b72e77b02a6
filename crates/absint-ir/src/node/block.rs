use smallvec::SmallVec;

use crate::{GetInfo, Program, identifier};

use super::{method::Method, node::Node};

identifier! {
    /// A unique identifier for a basic block.
    struct Block, "b"
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    pub method: Method,
    /// Nodes in program order.
    pub nodes: Vec<Node>,
    pub successors: SmallVec<[Block; 2]>,
    pub predecessors: SmallVec<[Block; 2]>,
}

impl BlockInfo {
    pub(crate) fn new(method: Method) -> Self {
        Self {
            method,
            nodes: Vec::new(),
            successors: SmallVec::new(),
            predecessors: SmallVec::new(),
        }
    }

    pub fn first_node(&self) -> Option<Node> {
        self.nodes.first().copied()
    }

    pub fn last_node(&self) -> Option<Node> {
        self.nodes.last().copied()
    }
}

impl<K> GetInfo<K> for Block {
    type Info = BlockInfo;

    fn get_info<'a>(&self, program: &'a Program<K>) -> Option<&'a Self::Info> {
        program.blocks.get(*self)
    }

    fn get_info_mut<'a>(&self, program: &'a mut Program<K>) -> Option<&'a mut Self::Info> {
        program.blocks.get_mut(*self)
    }
}
