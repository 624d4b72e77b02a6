use crate::{GetInfo, Program, identifier};

use super::{block::Block, node::Node};

identifier! {
    /// A unique identifier for a method.
    struct Method, "m"
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Body {
    pub entry: Block,
    /// All blocks of the method in creation order.
    pub blocks: Vec<Block>,
    /// Reverse postorder from `entry`. Unreachable blocks are absent.
    pub order: Vec<Block>,
    /// Nodes indexed by their dense `local` position.
    pub nodes: Vec<Node>,
}

impl Body {
    /// Position of `block` in [`Body::order`], if reachable.
    pub fn position(&self, block: Block) -> Option<usize> {
        self.order.iter().position(|b| *b == block)
    }
}

#[derive(Clone, Debug)]
pub struct MethodInfo {
    pub name: String,
    /// `None` while the method is only declared.
    pub body: Option<Body>,
}

impl<K> GetInfo<K> for Method {
    type Info = MethodInfo;

    fn get_info<'a>(&self, program: &'a Program<K>) -> Option<&'a Self::Info> {
        program.methods.get(*self)
    }

    fn get_info_mut<'a>(&self, program: &'a mut Program<K>) -> Option<&'a mut Self::Info> {
        program.methods.get_mut(*self)
    }
}
