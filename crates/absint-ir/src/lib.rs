mod arena;
mod builder;
mod lattice;
mod node;
mod program;

pub use arena::{Arena, GetInfo, Id, Identifier};
pub use builder::MethodBuilder;
pub use builder::error::BuildError;
pub use lattice::{HasBottom, HasTop, Lattice};
pub use node::{
    Block, BlockInfo, Body, CallSite, Method, MethodInfo, Node, NodeInfo, ReturnSite,
};
pub use program::Program;
