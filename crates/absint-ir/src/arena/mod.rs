mod data;
mod id;

pub use data::Arena;
pub use id::{GetInfo, Id, Identifier};
