//! Block-level fixpoint driver tests with the gen/kill client.

mod common;

use std::sync::Arc;

use absint_interpreter::*;
use absint_ir::{Block, GetInfo, Method, Node, Program};
use common::*;
use test_log::test;

fn analyze(program: &Program<Op>, method: Method, entry: Facts) -> (Facts, StateStore<Facts>) {
    analyze_with(program, method, entry, &AnalysisContext::default())
}

fn analyze_with(
    program: &Program<Op>,
    method: Method,
    entry: Facts,
    cx: &AnalysisContext,
) -> (Facts, StateStore<Facts>) {
    let mut store = StateStore::new(program, method).unwrap();
    let exit = run_intraprocedural(
        program,
        entry,
        &transfer(),
        &mut store,
        &mut OpaqueCalls::new(program),
        cx,
    )
    .unwrap();
    (exit, store)
}

/// `entry: gen 1 -> (then: gen 2 | join)`, `then -> join`, `join: return`
fn diamond(program: &mut Program<Op>) -> (Method, Node, Node) {
    let method = program.declare("diamond");
    let mut body = program.define(method).unwrap();
    let entry = body.block();
    let then = body.block();
    let join = body.block();
    body.op(entry, Op::Gen(1));
    body.op(then, Op::Gen(2));
    let merge = body.op(join, Op::Nop);
    let ret = body.ret(join, Op::Return, None);
    body.edge(entry, then).edge(entry, join).edge(then, join);
    body.finish(entry).unwrap();
    (method, merge, ret)
}

/// `entry -> header`, `header -> step -> header`, `header -> exit`, with
/// `step: succ bound`.
fn succ_loop(program: &mut Program<Op>, bound: u32) -> (Method, Node, Node) {
    let method = program.declare("succ_loop");
    let mut body = program.define(method).unwrap();
    let entry = body.block();
    let header = body.block();
    let step = body.block();
    let exit = body.block();
    body.op(entry, Op::Nop);
    let head = body.op(header, Op::Nop);
    body.op(step, Op::Succ(bound));
    let ret = body.ret(exit, Op::Return, None);
    body.edge(entry, header)
        .edge(header, step)
        .edge(step, header)
        .edge(header, exit);
    body.finish(entry).unwrap();
    (method, head, ret)
}

// ---------------------------------------------------------------------------
// Convergence
// ---------------------------------------------------------------------------

#[test]
fn test_acyclic_cfg_takes_one_pass() {
    let mut program = Program::new();
    let (method, merge, _) = diamond(&mut program);

    let (exit, store) = analyze(&program, method, Facts::new());
    assert_eq!(store.passes(), 1);
    assert_eq!(store.pre(merge).unwrap(), &facts(&[1, 2]));
    assert_eq!(exit, facts(&[1, 2]));
}

#[test]
fn test_loop_converges_within_height_plus_one() {
    let mut program = Program::new();
    let (method, head, _) = succ_loop(&mut program, 3);

    let (exit, store) = analyze(&program, method, facts(&[0]));
    // subsets of {0, 1, 2, 3} form a lattice of height 4
    let height = 4;
    assert!(store.passes() <= height + 1);
    assert_eq!(store.passes(), 4);
    assert_eq!(store.pre(head).unwrap(), &facts(&[0, 1, 2, 3]));
    assert_eq!(exit, facts(&[0, 1, 2, 3]));
}

#[test]
fn test_exec_edge_is_idempotent() {
    let mut program = Program::new();
    let (method, merge, _) = diamond(&mut program);
    let body = program.body(method).unwrap();
    let source = body.nodes[1];

    let cx = AnalysisContext::default();
    let transfer = transfer();
    let mut store = StateStore::new(&program, method).unwrap();
    store.seed(source, Facts::new()).unwrap();
    store.set_post(source, facts(&[1, 2])).unwrap();

    let edge = EdgeContext {
        program: &program,
        source,
        target: merge,
        cx: &cx,
    };
    assert!(transfer.exec_edge(&edge, &mut store).unwrap());
    let once = store.pre(merge).unwrap().clone();
    assert!(!transfer.exec_edge(&edge, &mut store).unwrap());
    assert_eq!(store.pre(merge).unwrap(), &once);
    assert_eq!(once, facts(&[1, 2]));
}

#[test]
fn test_states_are_kept_per_node() {
    let mut program = Program::new();
    let method = straight(&mut program, "main", &[Op::Gen(1), Op::Gen(2), Op::Kill(1)]);
    let nodes = program.body(method).unwrap().nodes.clone();

    let (exit, store) = analyze(&program, method, Facts::new());
    assert_eq!(store.post(nodes[0]).unwrap(), &facts(&[1]));
    assert_eq!(store.pre(nodes[2]).unwrap(), &facts(&[1, 2]));
    assert_eq!(store.post(nodes[2]).unwrap(), &facts(&[2]));
    assert_eq!(exit, facts(&[2]));
    assert!(store.iter().all(|(_, state)| state.is_executed()));
}

// ---------------------------------------------------------------------------
// Restriction
// ---------------------------------------------------------------------------

#[test]
fn test_restriction_propagates_past_non_returning_node() {
    let mut program = Program::new();
    let method = program.declare("main");
    let mut body = program.define(method).unwrap();
    let entry = body.block();
    let after = body.block();
    body.op(entry, Op::Gen(1));
    let halt = body.op(entry, Op::Halt);
    let dead_op = body.op(entry, Op::Gen(3));
    let dead_gen = body.op(after, Op::Gen(2));
    let dead_ret = body.ret(after, Op::Return, None);
    body.edge(entry, after);
    body.finish(entry).unwrap();

    let (exit, store) = analyze(&program, method, Facts::new());

    assert!(store.state(halt).unwrap().is_executed());
    for node in [dead_op, dead_gen, dead_ret] {
        let state = store.state(node).unwrap();
        assert!(state.is_restricted(), "{node} should be restricted");
        assert!(!state.is_executed());
        assert!(state.pre.is_empty() && state.post.is_empty());
    }
    assert!(exit.is_empty());
}

#[test]
fn test_restricted_branch_does_not_reach_join() {
    let mut program = Program::new();
    let method = program.declare("main");
    let mut body = program.define(method).unwrap();
    let entry = body.block();
    let halting = body.block();
    let live = body.block();
    let join = body.block();
    body.op(entry, Op::Gen(1));
    body.op(halting, Op::Gen(9));
    body.op(halting, Op::Halt);
    body.op(live, Op::Gen(2));
    let merge = body.ret(join, Op::Return, None);
    body.edge(entry, halting)
        .edge(entry, live)
        .edge(halting, join)
        .edge(live, join);
    body.finish(entry).unwrap();

    let (exit, store) = analyze(&program, method, Facts::new());
    assert!(!store.is_restricted(merge).unwrap());
    assert_eq!(store.pre(merge).unwrap(), &facts(&[1, 2]));
    assert_eq!(exit, facts(&[1, 2]));
}

// ---------------------------------------------------------------------------
// Malformed CFGs
// ---------------------------------------------------------------------------

fn expect_malformed(program: &Program<Op>, method: Method, needle: &str) {
    let mut store = StateStore::new(program, method).unwrap();
    let err = run_intraprocedural(
        program,
        Facts::new(),
        &transfer(),
        &mut store,
        &mut OpaqueCalls::new(program),
        &AnalysisContext::default(),
    )
    .unwrap_err();
    match err {
        AnalysisError::MalformedCfg { detail, .. } => {
            assert!(detail.contains(needle), "unexpected detail: {detail}")
        }
        other => panic!("expected MalformedCfg, got {other:?}"),
    }
}

#[test]
fn test_empty_block_is_malformed() {
    let mut program = Program::new();
    let method = program.declare("main");
    let mut body = program.define(method).unwrap();
    let entry = body.block();
    let empty = body.block();
    body.op(entry, Op::Nop);
    body.edge(entry, empty);
    body.finish(entry).unwrap();

    expect_malformed(&program, method, "is empty");
}

#[test]
fn test_asymmetric_edges_are_malformed() {
    let mut program = Program::new();
    let (method, merge, _) = diamond(&mut program);
    let join: Block = merge.expect_info(&program).block;
    join.expect_info_mut(&mut program).predecessors.clear();

    expect_malformed(&program, method, "missing from its predecessors");
}

#[test]
fn test_foreign_predecessor_is_malformed() {
    let mut program = Program::new();
    let (method, merge, _) = diamond(&mut program);
    let other = straight(&mut program, "other", &[]);
    let foreign = program.body(other).unwrap().entry;
    let join = merge.expect_info(&program).block;
    join.expect_info_mut(&mut program).predecessors.push(foreign);

    expect_malformed(&program, method, "belongs to another method");
}

#[test]
fn test_missing_body_is_reported() {
    let mut program: Program<Op> = Program::new();
    let declared = program.declare("extern");
    assert!(matches!(
        StateStore::<Facts>::new(&program, declared),
        Err(AnalysisError::MissingBody { .. })
    ));
}

// ---------------------------------------------------------------------------
// Widening
// ---------------------------------------------------------------------------

fn count(widening: WideningStrategy) -> AnalysisOutcome<(Nat, usize)> {
    count_with(&counter_transfer(), widening)
}

fn count_with(
    transfer: &impl TransferFunction<Counter, Nat>,
    widening: WideningStrategy,
) -> AnalysisOutcome<(Nat, usize)> {
    let mut program = Program::new();
    let method = counting_loop(&mut program);
    let cx = AnalysisContext::new(
        AnalysisConfig::default()
            .with_max_passes(50)
            .with_widening(widening),
    );
    let mut store = StateStore::new(&program, method)?;
    let exit = run_intraprocedural(
        &program,
        Nat::At(0),
        transfer,
        &mut store,
        &mut OpaqueCalls::new(&program),
        &cx,
    )?;
    Ok((exit, store.passes()))
}

#[test]
fn test_unbounded_loop_without_widening_reports_non_termination() {
    let err = count(WideningStrategy::Never).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::NonTermination { ref chain, iterations: 50 } if chain == &["count"]
    ));
}

#[test]
fn test_widening_forces_convergence() {
    assert_eq!(count(WideningStrategy::AllJoins).unwrap(), (Nat::Inf, 2));
    assert_eq!(count(WideningStrategy::Delayed(2)).unwrap(), (Nat::Inf, 4));
}

// ---------------------------------------------------------------------------
// Policies and logging
// ---------------------------------------------------------------------------

/// Merges predecessor state at each block's first node instead of letting
/// the driver do it.
struct PerNode<T>(T);

impl<K, D: AbstractDomain, T: TransferFunction<K, D>> TransferFunction<K, D> for PerNode<T> {
    fn is_feasible(&self, edge: &EdgeContext<'_, K>, store: &StateStore<D>) -> bool {
        self.0.is_feasible(edge, store)
    }

    fn exec_node(
        &self,
        node: &NodeContext<'_, K>,
        store: &mut StateStore<D>,
        calls: &mut dyn CallHandler<D>,
    ) -> AnalysisOutcome<()> {
        let starts_block = node.program.first_node(node.info.block) == Some(node.node);
        if starts_block && !merge_predecessors(self, node, store)? {
            return Ok(());
        }
        self.0.exec_node(node, store, calls)
    }

    fn collect_at_block_entry(&self, _block: Block) -> bool {
        false
    }
}

/// Per-node merging that runs the semantics whatever the merge found.
struct Unguarded<T>(T);

impl<K, D: AbstractDomain, T: TransferFunction<K, D>> TransferFunction<K, D> for Unguarded<T> {
    fn is_feasible(&self, edge: &EdgeContext<'_, K>, store: &StateStore<D>) -> bool {
        self.0.is_feasible(edge, store)
    }

    fn exec_node(
        &self,
        node: &NodeContext<'_, K>,
        store: &mut StateStore<D>,
        calls: &mut dyn CallHandler<D>,
    ) -> AnalysisOutcome<()> {
        if node.program.first_node(node.info.block) == Some(node.node) {
            merge_predecessors(self, node, store)?;
        }
        self.0.exec_node(node, store, calls)
    }

    fn collect_at_block_entry(&self, _block: Block) -> bool {
        false
    }
}

#[test]
fn test_per_node_merge_matches_block_entry_merge() {
    let mut program = Program::new();
    let (diamond, _, _) = diamond(&mut program);
    let (looping, _, _) = succ_loop(&mut program, 3);
    let cx = AnalysisContext::default();

    for method in [diamond, looping] {
        let (expected_exit, expected) = analyze(&program, method, facts(&[0]));

        let mut store = StateStore::new(&program, method).unwrap();
        let exit = run_intraprocedural(
            &program,
            facts(&[0]),
            &PerNode(transfer()),
            &mut store,
            &mut OpaqueCalls::new(&program),
            &cx,
        )
        .unwrap();

        assert_eq!(exit, expected_exit);
        for (node, state) in expected.iter() {
            assert_eq!(store.post(node).unwrap(), &state.post, "post of {node}");
        }
    }
}

/// Widening applies at loop headers whose first node merges its own
/// predecessors.
#[test]
fn test_per_node_merge_widens_loop_headers() {
    let per_node = PerNode(counter_transfer());
    assert_eq!(count_with(&per_node, WideningStrategy::AllJoins).unwrap(), (Nat::Inf, 2));
    assert_eq!(
        count_with(&per_node, WideningStrategy::Delayed(2)).unwrap(),
        count(WideningStrategy::Delayed(2)).unwrap()
    );
    assert!(matches!(
        count_with(&per_node, WideningStrategy::Never),
        Err(AnalysisError::NonTermination { iterations: 50, .. })
    ));
}

/// A block reached only over an infeasible edge is skipped even when the
/// client would run its semantics regardless of the merge.
#[test]
fn test_per_node_block_behind_halt_is_not_executed() {
    let mut program = Program::new();
    let method = program.declare("main");
    let mut body = program.define(method).unwrap();
    let entry = body.block();
    let after = body.block();
    body.op(entry, Op::Gen(1));
    body.op(entry, Op::Halt);
    let dead_gen = body.op(after, Op::Gen(2));
    let dead_ret = body.ret(after, Op::Return, None);
    body.edge(entry, after);
    body.finish(entry).unwrap();

    let mut store = StateStore::new(&program, method).unwrap();
    let exit = run_intraprocedural(
        &program,
        Facts::new(),
        &Unguarded(transfer()),
        &mut store,
        &mut OpaqueCalls::new(&program),
        &AnalysisContext::default(),
    )
    .unwrap();

    for node in [dead_gen, dead_ret] {
        let state = store.state(node).unwrap();
        assert!(state.is_restricted(), "{node} should be restricted");
        assert!(!state.is_executed(), "{node} should not run");
        assert!(state.post.is_empty());
    }
    assert!(exit.is_empty());
}

#[test]
fn test_driver_logs_through_context_sink() {
    let mut program = Program::new();
    let (method, _, _) = succ_loop(&mut program, 2);
    let sink = Arc::new(MemorySink::new());
    let cx = AnalysisContext::default().with_logger(sink.clone());

    analyze_with(&program, method, facts(&[0]), &cx);

    assert!(sink.contains(Level::Debug, "succ_loop: loop state still growing after pass 1"));
    assert!(sink.contains(Level::Debug, "succ_loop: fixpoint after 3 pass(es)"));
}
