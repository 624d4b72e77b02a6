use std::fmt;

use crate::log::{Level, LogFacade, LogSink};
use crate::{AbstractDomain, AnalysisOutcome, WideningStrategy, check_join};

/// Tunables for one analysis invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AnalysisConfig {
    /// Maximum passes over a method's blocks before giving up.
    pub max_passes: usize,
    /// Maximum refinement rounds of a recursive method's summary.
    pub max_summary_iterations: usize,
    /// Widening applied at loop headers and to recursive summaries.
    pub widening: WideningStrategy,
    /// Fail on a detected domain violation instead of logging a warning.
    pub strict_domain_checks: bool,
    /// Run the best-effort join checks at all.
    pub check_domain: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_passes: 1000,
            max_summary_iterations: 100,
            widening: WideningStrategy::Never,
            strict_domain_checks: cfg!(debug_assertions),
            check_domain: true,
        }
    }
}

impl AnalysisConfig {
    /// Configure the maximum block-driver passes per method.
    pub fn with_max_passes(mut self, max: usize) -> Self {
        self.max_passes = max;
        self
    }

    /// Configure maximum summary refinement rounds for recursive methods.
    pub fn with_max_summary_iterations(mut self, n: usize) -> Self {
        self.max_summary_iterations = n;
        self
    }

    /// Configure widening behavior.
    pub fn with_widening(mut self, strategy: WideningStrategy) -> Self {
        self.widening = strategy;
        self
    }

    pub fn with_strict_domain_checks(mut self, strict: bool) -> Self {
        self.strict_domain_checks = strict;
        self
    }

    pub fn with_domain_checks(mut self, enabled: bool) -> Self {
        self.check_domain = enabled;
        self
    }
}

/// Everything one top-level analysis invocation threads through its calls:
/// configuration and the log sink.
pub struct AnalysisContext {
    config: AnalysisConfig,
    logger: Box<dyn LogSink>,
}

impl Default for AnalysisContext {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl fmt::Debug for AnalysisContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AnalysisContext {
    /// Context logging through the `log` facade.
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            logger: Box::new(LogFacade),
        }
    }

    /// Replace the log sink.
    pub fn with_logger(mut self, logger: impl LogSink + 'static) -> Self {
        self.logger = Box::new(logger);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if self.logger.enabled(level) {
            self.logger.log(level, args);
        }
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    /// Run [`check_join`] when enabled. Outside strict mode a violation is
    /// downgraded to a warning.
    pub fn check_join<D: AbstractDomain>(&self, lhs: &D, rhs: &D, joined: &D) -> AnalysisOutcome<()> {
        if !self.config.check_domain {
            return Ok(());
        }
        match check_join(lhs, rhs, joined) {
            Err(error) if !self.config.strict_domain_checks => {
                self.warn(format_args!("{error}"));
                Ok(())
            }
            other => other,
        }
    }
}
