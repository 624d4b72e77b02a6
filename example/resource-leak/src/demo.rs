//! Demo programs bundled with the checker.

use absint_ir::{Block, BuildError, CallSite, Method, MethodBuilder, Node, Program};

use crate::ResourceOp;

/// A bundled demo program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Scenario {
    /// Acquire a file, maybe a socket, then release the file.
    Branch,
    /// Two call sites of one helper that leaks a log handle.
    Helper,
    /// A self-recursive walker that releases what it opens.
    Recursive,
    /// An aborting error path beside a path that leaks a lock.
    Leaky,
}

/// A built demo: its program, the root to analyze and a few labelled
/// nodes tests refer to.
#[derive(Debug)]
pub struct Demo {
    pub program: Program<ResourceOp>,
    pub root: Method,
    labels: Vec<(&'static str, Node)>,
}

impl Demo {
    pub fn node(&self, label: &str) -> Option<Node> {
        self.labels
            .iter()
            .find(|(name, _)| *name == label)
            .map(|(_, node)| *node)
    }
}

impl Scenario {
    pub fn build(self) -> Result<Demo, BuildError> {
        let mut program = Program::new();
        let (root, labels) = match self {
            Scenario::Branch => branch(&mut program)?,
            Scenario::Helper => helper(&mut program)?,
            Scenario::Recursive => recursive(&mut program)?,
            Scenario::Leaky => leaky(&mut program)?,
        };
        Ok(Demo {
            program,
            root,
            labels,
        })
    }
}

type Built = (Method, Vec<(&'static str, Node)>);

fn release(body: &mut MethodBuilder<'_, ResourceOp>, block: Block, resource: Node) -> Node {
    body.node()
        .block(block)
        .kind(ResourceOp::Release)
        .operands(vec![resource])
        .new()
}

fn invoke(body: &mut MethodBuilder<'_, ResourceOp>, block: Block, callee: &str) -> Node {
    body.call(block, ResourceOp::Invoke, CallSite::new(callee))
}

/// ```text
/// file = acquire
/// if cond { socket = acquire }
/// release(file)
/// ```
fn branch(program: &mut Program<ResourceOp>) -> Result<Built, BuildError> {
    let main = program.declare("main");
    let mut body = program.define(main)?;
    let entry = body.block();
    let then = body.block();
    let join = body.block();

    let file = body.op(entry, ResourceOp::Acquire("file"));
    body.op(entry, ResourceOp::Branch);
    let socket = body.op(then, ResourceOp::Acquire("socket"));
    let close = release(&mut body, join, file);
    body.ret(join, ResourceOp::Return, None);

    body.edge(entry, then).edge(entry, join).edge(then, join);
    let main = body.finish(entry)?;
    Ok((main, vec![("file", file), ("socket", socket), ("release", close)]))
}

/// `main` calls `helper` on both sides of a branch.
fn helper(program: &mut Program<ResourceOp>) -> Result<Built, BuildError> {
    let helper = program.declare("helper");
    let mut body = program.define(helper)?;
    let entry = body.block();
    let buffer = body.op(entry, ResourceOp::Acquire("buffer"));
    release(&mut body, entry, buffer);
    let log = body.op(entry, ResourceOp::Acquire("log"));
    body.ret(entry, ResourceOp::Return, None);
    body.finish(entry)?;

    let main = program.declare("main");
    let mut body = program.define(main)?;
    let entry = body.block();
    let left = body.block();
    let right = body.block();
    let exit = body.block();
    body.op(entry, ResourceOp::Branch);
    let first = invoke(&mut body, left, "helper");
    let second = invoke(&mut body, right, "helper");
    body.ret(exit, ResourceOp::Return, None);
    body.edge(entry, left)
        .edge(entry, right)
        .edge(left, exit)
        .edge(right, exit);
    let main = body.finish(entry)?;
    Ok((main, vec![("log", log), ("first", first), ("second", second)]))
}

/// ```text
/// walk: handle = acquire
///       if done { release(handle) } else { walk(); release(handle) }
/// main: walk()
/// ```
fn recursive(program: &mut Program<ResourceOp>) -> Result<Built, BuildError> {
    let walk = program.declare("walk");
    let mut body = program.define(walk)?;
    let entry = body.block();
    let done = body.block();
    let deeper = body.block();
    let handle = body.op(entry, ResourceOp::Acquire("handle"));
    body.op(entry, ResourceOp::Branch);
    release(&mut body, done, handle);
    body.ret(done, ResourceOp::Return, None);
    let inner = invoke(&mut body, deeper, "walk");
    release(&mut body, deeper, handle);
    body.ret(deeper, ResourceOp::Return, None);
    body.edge(entry, done).edge(entry, deeper);
    body.finish(entry)?;

    let main = program.declare("main");
    let mut body = program.define(main)?;
    let entry = body.block();
    invoke(&mut body, entry, "walk");
    body.ret(entry, ResourceOp::Return, None);
    let main = body.finish(entry)?;
    Ok((main, vec![("handle", handle), ("inner", inner)]))
}

/// ```text
/// file = acquire
/// if failed { abort } else { lock = acquire }
/// release(file)
/// ```
fn leaky(program: &mut Program<ResourceOp>) -> Result<Built, BuildError> {
    let main = program.declare("main");
    let mut body = program.define(main)?;
    let entry = body.block();
    let fail = body.block();
    let work = body.block();
    let exit = body.block();

    let file = body.op(entry, ResourceOp::Acquire("file"));
    body.op(entry, ResourceOp::Branch);
    let abort = body.op(fail, ResourceOp::Abort);
    let lock = body.op(work, ResourceOp::Acquire("lock"));
    let close = release(&mut body, exit, file);
    body.ret(exit, ResourceOp::Return, None);

    body.edge(entry, fail)
        .edge(entry, work)
        .edge(fail, exit)
        .edge(work, exit);
    let main = body.finish(entry)?;
    Ok((
        main,
        vec![("file", file), ("abort", abort), ("lock", lock), ("release", close)],
    ))
}
