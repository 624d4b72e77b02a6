mod block;
mod method;
mod node;

pub use block::{Block, BlockInfo};
pub use method::{Body, Method, MethodInfo};
pub use node::{CallSite, Node, NodeInfo, ReturnSite};
