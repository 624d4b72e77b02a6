use smallvec::SmallVec;

use crate::{GetInfo, Program, identifier};

use super::{block::Block, method::Method};

identifier! {
    /// A unique identifier for an IR node.
    struct Node, "n"
}

/// A resolved-by-name call target with its receiver and argument nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallSite {
    pub callee: String,
    pub receiver: Option<Node>,
    pub arguments: SmallVec<[Node; 4]>,
}

impl CallSite {
    pub fn new(callee: impl Into<String>) -> Self {
        Self {
            callee: callee.into(),
            receiver: None,
            arguments: SmallVec::new(),
        }
    }

    pub fn with_receiver(mut self, receiver: Node) -> Self {
        self.receiver = Some(receiver);
        self
    }

    pub fn with_arguments(mut self, arguments: impl IntoIterator<Item = Node>) -> Self {
        self.arguments.extend(arguments);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReturnSite {
    pub value: Option<Node>,
}

#[derive(Clone, Debug)]
pub struct NodeInfo<K> {
    pub kind: K,
    pub method: Method,
    pub block: Block,
    /// Dense position of this node inside its method.
    pub local: usize,
    pub operands: SmallVec<[Node; 2]>,
    pub call: Option<CallSite>,
    pub ret: Option<ReturnSite>,
}

impl<K> NodeInfo<K> {
    pub fn is_call(&self) -> bool {
        self.call.is_some()
    }

    pub fn is_return(&self) -> bool {
        self.ret.is_some()
    }

    /// The receiver of a call node, if any.
    pub fn receiver(&self) -> Option<Node> {
        self.call.as_ref().and_then(|c| c.receiver)
    }
}

impl<K> GetInfo<K> for Node {
    type Info = NodeInfo<K>;

    fn get_info<'a>(&self, program: &'a Program<K>) -> Option<&'a Self::Info> {
        program.nodes.get(*self)
    }

    fn get_info_mut<'a>(&self, program: &'a mut Program<K>) -> Option<&'a mut Self::Info> {
        program.nodes.get_mut(*self)
    }
}
