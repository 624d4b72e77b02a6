use absint_ir::{Method, Node};

use crate::{AbstractDomain, AnalysisError, StateStore, Summary};

/// Final state of one analyzed method.
#[derive(Debug, Clone)]
pub struct MethodResult<D> {
    pub method: Method,
    /// Entry state the method was finally analyzed with. Wider than the
    /// requested one when recursive calls entered it with more.
    pub entry: D,
    pub exit: D,
    pub states: StateStore<D>,
    /// Summary refinement rounds; 1 unless the method is recursive.
    pub rounds: usize,
}

impl<D: AbstractDomain> MethodResult<D> {
    pub fn pre(&self, node: Node) -> Option<&D> {
        self.states.get(node).map(|state| &state.pre)
    }

    pub fn post(&self, node: Node) -> Option<&D> {
        self.states.get(node).map(|state| &state.post)
    }

    pub fn summary(&self) -> Summary<D> {
        Summary::new(self.method, self.entry.clone(), self.exit.clone())
    }
}

/// Outcome of analyzing several roots: each root either produced a result
/// or is excluded with the error that aborted it.
#[derive(Debug)]
pub struct ProgramResult<D> {
    pub results: Vec<MethodResult<D>>,
    pub failures: Vec<(Method, AnalysisError)>,
}

impl<D> Default for ProgramResult<D> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<D> ProgramResult<D> {
    pub fn result(&self, method: Method) -> Option<&MethodResult<D>> {
        self.results.iter().find(|r| r.method == method)
    }

    pub fn failure(&self, method: Method) -> Option<&AnalysisError> {
        self.failures
            .iter()
            .find(|(m, _)| *m == method)
            .map(|(_, error)| error)
    }

    /// Whether every root was analyzed successfully.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
