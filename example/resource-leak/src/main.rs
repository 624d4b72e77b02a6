use absint_interpreter::{AnalysisConfig, AnalysisContext, SummaryCache};
use anyhow::{Context, Result, bail};
use clap::Parser;
use resource_leak::LeakReport;
use resource_leak::demo::Scenario;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

#[derive(Parser)]
#[command(author, version, about = "Resource leak checker over bundled demo programs")]
struct Cli {
    /// Demo program to analyze
    #[arg(value_enum)]
    scenario: Scenario,

    /// Log engine progress and print the root's per-node states
    #[arg(short, long)]
    verbose: bool,

    /// Fail when a leak is found
    #[arg(long)]
    deny: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let demo = cli
        .scenario
        .build()
        .with_context(|| format!("building the {:?} demo", cli.scenario))?;
    log::debug!(
        "{:?} demo: {} method(s)",
        cli.scenario,
        demo.program.methods().count()
    );
    let cache = SummaryCache::new();
    let cx = AnalysisContext::new(AnalysisConfig::default());
    let result = resource_leak::analyze(&demo.program, demo.root, &cache, &cx)
        .with_context(|| format!("analyzing the {:?} demo", cli.scenario))?;

    if cli.verbose {
        for (node, state) in result.states.iter() {
            println!("{node}: {} -> {}", state.pre, state.post);
        }
        let stats = cache.stats();
        println!(
            "summaries: {} computed, {} hits, {} misses",
            stats.computed, stats.hits, stats.misses
        );
    }

    let report = LeakReport::new(&demo.program, demo.root, &result.exit);
    println!("{report}");
    if !report.is_clean() {
        log::warn!(
            "{:?} demo: {} possible leak(s)",
            cli.scenario,
            report.leaks.len()
        );
    }
    if cli.deny && !report.is_clean() {
        bail!("{} possible leak(s)", report.leaks.len());
    }
    Ok(())
}
