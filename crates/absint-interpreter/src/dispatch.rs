use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::{
    AbstractDomain, AnalysisError, AnalysisOutcome, CallHandler, EdgeContext, NodeContext,
    StateStore, TransferFunction,
};

/// Node kinds that can be grouped into dispatch categories.
pub trait NodeKind {
    type Category: Copy + Eq + Hash + Debug;

    fn category(&self) -> Self::Category;
}

/// Semantics of one node category.
pub trait NodeSemantics<K, D>: Send + Sync {
    fn exec(
        &self,
        node: &NodeContext<'_, K>,
        store: &mut StateStore<D>,
        calls: &mut dyn CallHandler<D>,
    ) -> AnalysisOutcome<()>;
}

impl<K, D, F> NodeSemantics<K, D> for F
where
    F: Fn(&NodeContext<'_, K>, &mut StateStore<D>, &mut dyn CallHandler<D>) -> AnalysisOutcome<()>
        + Send
        + Sync,
{
    fn exec(
        &self,
        node: &NodeContext<'_, K>,
        store: &mut StateStore<D>,
        calls: &mut dyn CallHandler<D>,
    ) -> AnalysisOutcome<()> {
        self(node, store, calls)
    }
}

type Feasibility<K, D> = dyn Fn(&EdgeContext<'_, K>, &StateStore<D>) -> bool + Send + Sync;

/// Transfer function assembled from per-category handlers.
///
/// New node kinds are added with [`with`](Self::with) without touching the
/// handlers already registered. Nodes whose category has no handler go to
/// the fallback, or fail with [`AnalysisError::UnhandledNode`].
pub struct DispatchTable<K: NodeKind, D> {
    handlers: FxHashMap<K::Category, Box<dyn NodeSemantics<K, D>>>,
    fallback: Option<Box<dyn NodeSemantics<K, D>>>,
    feasibility: Option<Box<Feasibility<K, D>>>,
}

impl<K: NodeKind, D> Default for DispatchTable<K, D> {
    fn default() -> Self {
        Self {
            handlers: FxHashMap::default(),
            fallback: None,
            feasibility: None,
        }
    }
}

impl<K: NodeKind, D> DispatchTable<K, D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closure for `category`, replacing any previous handler.
    pub fn with<F>(self, category: K::Category, handler: F) -> Self
    where
        F: Fn(&NodeContext<'_, K>, &mut StateStore<D>, &mut dyn CallHandler<D>) -> AnalysisOutcome<()>
            + Send
            + Sync
            + 'static,
    {
        self.with_semantics(category, handler)
    }

    /// Register a [`NodeSemantics`] implementation for `category`.
    pub fn with_semantics(
        mut self,
        category: K::Category,
        semantics: impl NodeSemantics<K, D> + 'static,
    ) -> Self {
        self.handlers.insert(category, Box::new(semantics));
        self
    }

    /// Handler for every category without a registered one.
    pub fn with_fallback<F>(mut self, handler: F) -> Self
    where
        F: Fn(&NodeContext<'_, K>, &mut StateStore<D>, &mut dyn CallHandler<D>) -> AnalysisOutcome<()>
            + Send
            + Sync
            + 'static,
    {
        self.fallback = Some(Box::new(handler));
        self
    }

    /// Edge feasibility predicate. Defaults to every edge being feasible.
    pub fn with_feasibility<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&EdgeContext<'_, K>, &StateStore<D>) -> bool + Send + Sync + 'static,
    {
        self.feasibility = Some(Box::new(predicate));
        self
    }

    pub fn handles(&self, category: K::Category) -> bool {
        self.handlers.contains_key(&category)
    }
}

impl<K: NodeKind, D: AbstractDomain> TransferFunction<K, D> for DispatchTable<K, D> {
    fn is_feasible(&self, edge: &EdgeContext<'_, K>, store: &StateStore<D>) -> bool {
        self.feasibility
            .as_ref()
            .is_none_or(|predicate| predicate(edge, store))
    }

    fn exec_node(
        &self,
        node: &NodeContext<'_, K>,
        store: &mut StateStore<D>,
        calls: &mut dyn CallHandler<D>,
    ) -> AnalysisOutcome<()> {
        let category = node.info.kind.category();
        match self.handlers.get(&category).or(self.fallback.as_ref()) {
            Some(handler) => handler.exec(node, store, calls),
            None => Err(AnalysisError::UnhandledNode {
                node: node.node,
                category: format!("{category:?}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use absint_ir::Program;

    use super::*;
    use crate::{AnalysisContext, OpaqueCalls, SetLattice};

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum Kind {
        Gen,
        Other,
    }

    impl NodeKind for Kind {
        type Category = Kind;

        fn category(&self) -> Kind {
            *self
        }
    }

    fn gen_table() -> DispatchTable<Kind, SetLattice<u32>> {
        DispatchTable::<Kind, SetLattice<u32>>::new().with(Kind::Gen, |node, store, _calls| {
            let mut post = store.pre(node.node)?.clone();
            post.insert(node.info.local as u32);
            store.set_post(node.node, post)?;
            Ok(())
        })
    }

    fn program() -> (Program<Kind>, absint_ir::Method) {
        let mut program = Program::new();
        let main = program.declare("main");
        let mut body = program.define(main).unwrap();
        let entry = body.block();
        body.op(entry, Kind::Gen);
        body.op(entry, Kind::Other);
        body.finish(entry).unwrap();
        (program, main)
    }

    fn exec(
        table: &DispatchTable<Kind, SetLattice<u32>>,
        program: &Program<Kind>,
        store: &mut StateStore<SetLattice<u32>>,
        local: usize,
    ) -> AnalysisOutcome<()> {
        let cx = AnalysisContext::default();
        let node = program.body(store.method()).unwrap().nodes[local];
        let node_cx = NodeContext {
            program,
            node,
            info: program.node(node).unwrap(),
            cx: &cx,
        };
        table.exec_node(&node_cx, store, &mut OpaqueCalls::new(program))
    }

    #[test]
    fn test_dispatch_by_category() {
        let (program, main) = program();
        let table = gen_table();
        let mut store = StateStore::new(&program, main).unwrap();

        exec(&table, &program, &mut store, 0).unwrap();
        let first = program.body(main).unwrap().nodes[0];
        assert_eq!(store.post(first).unwrap(), &SetLattice::singleton(0));
        assert!(table.handles(Kind::Gen));
        assert!(!table.handles(Kind::Other));
    }

    #[test]
    fn test_missing_handler_is_reported() {
        let (program, main) = program();
        let table = gen_table();
        let mut store = StateStore::new(&program, main).unwrap();

        let err = exec(&table, &program, &mut store, 1).unwrap_err();
        assert!(matches!(err, AnalysisError::UnhandledNode { category, .. } if category == "Other"));
    }

    #[test]
    fn test_fallback_covers_unregistered_categories() {
        let (program, main) = program();
        let table = gen_table().with_fallback(|node, store, _calls| {
            let pre = store.pre(node.node)?.clone();
            store.set_post(node.node, pre)?;
            Ok(())
        });
        let mut store = StateStore::new(&program, main).unwrap();

        exec(&table, &program, &mut store, 1).unwrap();
        let second = program.body(main).unwrap().nodes[1];
        assert!(store.state(second).unwrap().is_executed());
    }
}
