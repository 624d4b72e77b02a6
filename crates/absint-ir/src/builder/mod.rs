pub(crate) mod error;
mod method;

pub use method::MethodBuilder;
