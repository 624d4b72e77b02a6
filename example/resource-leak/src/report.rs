use std::fmt;

use absint_ir::{Method, Program};

use crate::{ResourceId, ResourceOp, Resources};

/// A resource that may still be open when the root returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leak {
    pub resource: ResourceId,
    pub kind: &'static str,
    /// Method containing the acquiring node.
    pub method: String,
}

/// Resources possibly open at the exit of a root method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakReport {
    pub root: String,
    pub leaks: Vec<Leak>,
}

impl LeakReport {
    pub fn new(program: &Program<ResourceOp>, root: Method, open: &Resources) -> Self {
        let leaks = open
            .iter()
            .map(|&resource| {
                let info = program.node(resource.0);
                let kind = match info.map(|info| info.kind) {
                    Some(ResourceOp::Acquire(kind)) => kind,
                    _ => "resource",
                };
                let method = info
                    .and_then(|info| program.method_name(info.method))
                    .unwrap_or("<unknown>")
                    .to_owned();
                Leak {
                    resource,
                    kind,
                    method,
                }
            })
            .collect();
        Self {
            root: program.method_name(root).unwrap_or("<unknown>").to_owned(),
            leaks,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.leaks.is_empty()
    }
}

impl fmt::Display for LeakReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.leaks.len() {
            0 => return write!(f, "{}: no leaks", self.root),
            1 => writeln!(f, "{}: 1 resource possibly leaked", self.root)?,
            n => writeln!(f, "{}: {n} resources possibly leaked", self.root)?,
        }
        for (i, leak) in self.leaks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "  {} acquired at {} in '{}'",
                leak.kind, leak.resource.0, leak.method
            )?;
        }
        Ok(())
    }
}
