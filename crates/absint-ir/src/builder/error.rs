use crate::{Block, Method};

/// Errors raised while assembling a method body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("method {method} already has a body")]
    AlreadyDefined { method: Method },
    #[error("unknown method {method}")]
    UnknownMethod { method: Method },
    #[error("block {block} does not belong to method {method}")]
    ForeignBlock { method: Method, block: Block },
    #[error("method {method} has no blocks")]
    EmptyBody { method: Method },
}
