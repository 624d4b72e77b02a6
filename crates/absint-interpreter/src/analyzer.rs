use absint_ir::{Method, Node, Program};
use rustc_hash::FxHashMap;

use crate::{
    AbstractDomain, AnalysisContext, AnalysisError, AnalysisOutcome, CallHandler, MethodResult,
    ProgramResult, StateStore, Summary, SummaryCache, TransferFunction, run_intraprocedural,
};

/// Analysis state of one method within an [`Analyzer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodStatus {
    /// Not analyzed yet, or only provisionally.
    Pending,
    /// On the analysis stack.
    InProgress,
    /// Converged; its summary is cached.
    Summarized,
    /// The last attempt failed.
    Error,
}

/// One method on the analysis stack.
#[derive(Debug)]
struct Frame<D> {
    method: Method,
    entry: D,
    /// Exit estimate handed to recursive calls.
    tentative: D,
    /// Join of the entries recursive calls asked for.
    requested: D,
    /// A recursive call hit this frame during the current round.
    hit: bool,
    /// Lowest frame below whose tentative summary this frame's result
    /// depends on.
    depends_on: Option<usize>,
    /// Summaries computed against this frame's tentative summary, cached
    /// once it converges.
    pending: Vec<Summary<D>>,
}

impl<D: AbstractDomain> Frame<D> {
    fn new(method: Method, entry: D) -> Self {
        Self {
            method,
            entry,
            tentative: D::bottom(),
            requested: D::bottom(),
            hit: false,
            depends_on: None,
            pending: Vec::new(),
        }
    }
}

/// Interprocedural driver for one top-level invocation.
///
/// Callees are summarized on demand and memoized in a [`SummaryCache`] that
/// may be shared with other analyzers. A call into a method already on the
/// stack is answered with its tentative summary; the method is then
/// re-analyzed, with its entry grown by the recursive requests and its exit
/// widened across rounds, until the tentative summary stops changing.
pub struct Analyzer<'a, K, D, T: ?Sized> {
    program: &'a Program<K>,
    transfer: &'a T,
    cache: &'a SummaryCache<D>,
    cx: &'a AnalysisContext,
    frames: Vec<Frame<D>>,
    status: FxHashMap<Method, MethodStatus>,
}

impl<'a, K, D, T> Analyzer<'a, K, D, T>
where
    D: AbstractDomain,
    T: TransferFunction<K, D> + ?Sized,
{
    pub fn new(
        program: &'a Program<K>,
        transfer: &'a T,
        cache: &'a SummaryCache<D>,
        cx: &'a AnalysisContext,
    ) -> Self {
        Self {
            program,
            transfer,
            cache,
            cx,
            frames: Vec::new(),
            status: FxHashMap::default(),
        }
    }

    pub fn status(&self, method: Method) -> MethodStatus {
        self.status
            .get(&method)
            .copied()
            .unwrap_or(MethodStatus::Pending)
    }

    /// Analyze `root` entered with `entry`, summarizing callees as needed.
    pub fn analyze(&mut self, root: Method, entry: D) -> AnalysisOutcome<MethodResult<D>> {
        let (result, _) = self.compute(root, entry)?;
        Ok(result)
    }

    /// Summary of `method` for a call entering with `entry`.
    pub fn request(&mut self, method: Method, entry: &D) -> AnalysisOutcome<Summary<D>> {
        if let Some(index) = self.frames.iter().position(|frame| frame.method == method) {
            return Ok(self.recursive_request(index, entry));
        }
        if let Some(summary) = self.cache.lookup(method, entry) {
            return Ok(summary);
        }
        let (result, provisional) = self.compute(method, entry.clone())?;
        let summary = result.summary();
        if provisional {
            return Ok(summary);
        }
        Ok(self.cache.lookup(method, entry).unwrap_or(summary))
    }

    fn name(&self, method: Method) -> &'a str {
        self.program.method_name(method).unwrap_or("<unknown>")
    }

    fn chain(&self) -> Vec<String> {
        self.frames
            .iter()
            .map(|frame| self.name(frame.method).to_owned())
            .collect()
    }

    fn recursive_request(&mut self, index: usize, entry: &D) -> Summary<D> {
        for frame in &mut self.frames[index + 1..] {
            frame.depends_on = Some(frame.depends_on.map_or(index, |lower| lower.min(index)));
        }
        let frame = &mut self.frames[index];
        frame.hit = true;
        frame.requested = frame.requested.join(entry);
        self.cx.debug(format_args!(
            "recursive call into '{}' answered with its tentative summary",
            self.program.method_name(frame.method).unwrap_or("<unknown>")
        ));
        Summary::new(frame.method, frame.entry.join(entry), frame.tentative.clone())
    }

    /// Push a frame for `method`, run it to convergence and pop it.
    /// Returns the result and whether it is provisional.
    fn compute(&mut self, method: Method, entry: D) -> AnalysisOutcome<(MethodResult<D>, bool)> {
        let index = self.frames.len();
        self.status.insert(method, MethodStatus::InProgress);
        self.frames.push(Frame::new(method, entry));
        self.cx
            .debug(format_args!("analyzing '{}'", self.name(method)));

        let outcome = self.iterate(index);
        let frame = self.frames.drain(index..).next();
        let (depends_on, pending) = frame
            .map(|frame| (frame.depends_on, frame.pending))
            .unwrap_or_default();

        let result = match outcome {
            Ok(result) => result,
            Err(error) => {
                self.status.insert(method, MethodStatus::Error);
                return Err(error);
            }
        };

        match depends_on.and_then(|lower| self.frames.get_mut(lower)) {
            Some(head) => {
                head.pending.extend(pending);
                head.pending.push(result.summary());
                self.status.insert(method, MethodStatus::Pending);
                Ok((result, true))
            }
            None => {
                for summary in pending {
                    self.status.insert(summary.method, MethodStatus::Summarized);
                    self.cache.insert_if_absent(summary);
                }
                self.cache.insert_if_absent(result.summary());
                self.status.insert(method, MethodStatus::Summarized);
                self.cx.info(format_args!(
                    "summarized '{}' after {} round(s)",
                    self.name(method),
                    result.rounds
                ));
                Ok((result, false))
            }
        }
    }

    /// Refine the summary of the frame at `index` until it is stable.
    fn iterate(&mut self, index: usize) -> AnalysisOutcome<MethodResult<D>> {
        let (program, transfer, cx) = (self.program, self.transfer, self.cx);
        let method = self.frames[index].method;
        let max_rounds = cx.config().max_summary_iterations;

        let mut rounds = 0;
        loop {
            rounds += 1;
            if rounds > max_rounds {
                return Err(AnalysisError::NonTermination {
                    chain: self.chain(),
                    iterations: max_rounds,
                });
            }

            let frame = &mut self.frames[index];
            frame.hit = false;
            frame.pending.clear();
            let entry = frame.entry.clone();

            let mut states = StateStore::new(program, method)?;
            let exit = run_intraprocedural(program, entry.clone(), transfer, &mut states, &mut *self, cx)?;

            let frame = &mut self.frames[index];
            if !frame.hit {
                return Ok(MethodResult {
                    method,
                    entry,
                    exit,
                    states,
                    rounds,
                });
            }
            let next_entry = frame.entry.join(&frame.requested);
            if next_entry == frame.entry && exit.is_subseteq(&frame.tentative) {
                return Ok(MethodResult {
                    method,
                    entry,
                    exit: frame.tentative.clone(),
                    states,
                    rounds,
                });
            }
            frame.tentative = cx.config().widening.merge(&frame.tentative, &exit, rounds - 1);
            frame.entry = next_entry;
            cx.debug(format_args!(
                "'{}': tentative summary changed in round {rounds}",
                self.name(method)
            ));
        }
    }
}

impl<K, D, T> CallHandler<D> for Analyzer<'_, K, D, T>
where
    D: AbstractDomain,
    T: TransferFunction<K, D> + ?Sized,
{
    fn call(&mut self, site: Node, callee: &str, entry: &D) -> AnalysisOutcome<Summary<D>> {
        let method = self
            .program
            .resolve(callee)
            .ok_or_else(|| AnalysisError::UnresolvedCallee {
                site,
                callee: callee.to_owned(),
            })?;
        self.request(method, entry)
    }
}

/// Analyze `root` entered with `entry`, resolving calls through `cache`.
pub fn run_interprocedural<K, D, T>(
    program: &Program<K>,
    root: Method,
    entry: D,
    transfer: &T,
    cache: &SummaryCache<D>,
    cx: &AnalysisContext,
) -> AnalysisOutcome<MethodResult<D>>
where
    D: AbstractDomain,
    T: TransferFunction<K, D> + ?Sized,
{
    Analyzer::new(program, transfer, cache, cx).analyze(root, entry)
}

/// Analyze every root. A root whose analysis fails is excluded from the
/// results and reported with its error; the others are unaffected.
pub fn analyze_program<K, D, T>(
    program: &Program<K>,
    roots: impl IntoIterator<Item = (Method, D)>,
    transfer: &T,
    cache: &SummaryCache<D>,
    cx: &AnalysisContext,
) -> ProgramResult<D>
where
    D: AbstractDomain,
    T: TransferFunction<K, D> + ?Sized,
{
    let mut analyzer = Analyzer::new(program, transfer, cache, cx);
    let mut outcome = ProgramResult::default();
    for (root, entry) in roots {
        match analyzer.analyze(root, entry) {
            Ok(result) => outcome.results.push(result),
            Err(error) => {
                cx.warn(format_args!(
                    "excluding '{}': {error}",
                    program.method_name(root).unwrap_or("<unknown>")
                ));
                outcome.failures.push((root, error));
            }
        }
    }
    outcome
}
