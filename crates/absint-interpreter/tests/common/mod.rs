#![allow(dead_code)]

use absint_interpreter::{
    AbstractDomain, AnalysisOutcome, DispatchTable, NodeContext, NodeKind,
    SetLattice, StateStore, call_site,
};
use absint_ir::{HasBottom, Lattice, Method, Program};

// ---------------------------------------------------------------------------
// Gen/kill client over sets of fact ids
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// Add a fact.
    Gen(u32),
    /// Remove a fact.
    Kill(u32),
    Nop,
    Call,
    Return,
    /// Does not return: every out-edge is infeasible.
    Halt,
    /// Add `largest fact + 1`, saturating at the given bound.
    Succ(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Gen,
    Kill,
    Pass,
    Call,
    Succ,
}

impl NodeKind for Op {
    type Category = Category;

    fn category(&self) -> Category {
        match self {
            Op::Gen(_) => Category::Gen,
            Op::Kill(_) => Category::Kill,
            Op::Nop | Op::Return | Op::Halt => Category::Pass,
            Op::Call => Category::Call,
            Op::Succ(_) => Category::Succ,
        }
    }
}

pub type Facts = SetLattice<u32>;

pub fn facts(items: &[u32]) -> Facts {
    items.iter().copied().collect()
}

fn update(
    node: &NodeContext<'_, Op>,
    store: &mut StateStore<Facts>,
    f: impl FnOnce(Op, &mut Facts),
) -> AnalysisOutcome<()> {
    let mut post = store.pre(node.node)?.clone();
    f(node.info.kind, &mut post);
    store.set_post(node.node, post)?;
    Ok(())
}

pub fn transfer() -> DispatchTable<Op, Facts> {
    DispatchTable::<Op, Facts>::new()
        .with(Category::Gen, |node, store, _calls| {
            update(node, store, |op, facts| {
                if let Op::Gen(fact) = op {
                    facts.insert(fact);
                }
            })
        })
        .with(Category::Kill, |node, store, _calls| {
            update(node, store, |op, facts| {
                if let Op::Kill(fact) = op {
                    facts.remove(&fact);
                }
            })
        })
        .with(Category::Pass, |node, store, _calls| update(node, store, |_, _| {}))
        .with(Category::Succ, |node, store, _calls| {
            update(node, store, |op, facts| {
                if let Op::Succ(bound) = op {
                    let next = facts.iter().max().map_or(0, |top| (top + 1).min(bound));
                    facts.insert(next);
                }
            })
        })
        .with(Category::Call, |node, store, calls| {
            let post = call_site(node, store, calls)?;
            store.set_post(node.node, post)?;
            Ok(())
        })
        .with_feasibility(|edge, _store| {
            !matches!(edge.source_info().map(|info| info.kind), Some(Op::Halt))
        })
}

// ---------------------------------------------------------------------------
// Program helpers
// ---------------------------------------------------------------------------

/// A method whose single block runs `ops` and returns.
pub fn straight(program: &mut Program<Op>, name: &str, ops: &[Op]) -> Method {
    let method = program.declare(name);
    let mut body = program.define(method).unwrap();
    let entry = body.block();
    for op in ops {
        body.op(entry, *op);
    }
    body.ret(entry, Op::Return, None);
    body.finish(entry).unwrap()
}

/// A method whose single block runs `before`, calls `callee` and returns.
pub fn calling(program: &mut Program<Op>, name: &str, before: &[Op], callee: &str) -> Method {
    let method = program.declare(name);
    let mut body = program.define(method).unwrap();
    let entry = body.block();
    for op in before {
        body.op(entry, *op);
    }
    body.call(entry, Op::Call, absint_ir::CallSite::new(callee));
    body.ret(entry, Op::Return, None);
    body.finish(entry).unwrap()
}

// ---------------------------------------------------------------------------
// Unbounded counter domain, only terminating with widening
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Nat {
    At(u32),
    Inf,
}

impl Lattice for Nat {
    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Nat::At(a), Nat::At(b)) => Nat::At(*a.max(b)),
            _ => Nat::Inf,
        }
    }

    fn is_subseteq(&self, other: &Self) -> bool {
        match (self, other) {
            (_, Nat::Inf) => true,
            (Nat::Inf, Nat::At(_)) => false,
            (Nat::At(a), Nat::At(b)) => a <= b,
        }
    }
}

impl HasBottom for Nat {
    fn bottom() -> Self {
        Nat::At(0)
    }
}

impl AbstractDomain for Nat {
    fn widen(&self, next: &Self) -> Self {
        if next.is_subseteq(self) {
            *self
        } else {
            Nat::Inf
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Counter {
    Inc,
    Nop,
}

impl NodeKind for Counter {
    type Category = Counter;

    fn category(&self) -> Counter {
        *self
    }
}

pub fn counter_transfer() -> DispatchTable<Counter, Nat> {
    DispatchTable::<Counter, Nat>::new()
        .with(Counter::Inc, |node, store, _calls| {
            let next = match store.pre(node.node)? {
                Nat::At(n) => Nat::At(n + 1),
                Nat::Inf => Nat::Inf,
            };
            store.set_post(node.node, next)?;
            Ok(())
        })
        .with(Counter::Nop, |node, store, _calls| {
            let pre = *store.pre(node.node)?;
            store.set_post(node.node, pre)?;
            Ok(())
        })
}

/// `header: nop -> body: inc -> header`, exiting from the header.
pub fn counting_loop(program: &mut Program<Counter>) -> Method {
    let method = program.declare("count");
    let mut body = program.define(method).unwrap();
    let entry = body.block();
    let header = body.block();
    let step = body.block();
    let exit = body.block();
    body.op(entry, Counter::Nop);
    body.op(header, Counter::Nop);
    body.op(step, Counter::Inc);
    body.ret(exit, Counter::Nop, None);
    body.edge(entry, header)
        .edge(header, step)
        .edge(step, header)
        .edge(header, exit);
    body.finish(entry).unwrap()
}
