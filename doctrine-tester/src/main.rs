mod reports;
mod scenarios;
mod stream;
mod util;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use doctrine_engine::{DoctrineEngine, DoctrineRegistry, Purse, run_command};
use log::{debug, info};
use std::fs::{self, File};
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use scenarios::{ScenarioResult, expand_scenarios, get_scenario, list_scenarios};
use util::{parse_seeds, split_csv};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
}

#[derive(Debug, Parser)]
#[command(name = "doctrine-tester", version)]
#[command(about = "Scenario runner and debug console for the doctrine progression engine")]
struct Args {
    /// Doctrine catalog JSON to load instead of the bundled one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Scenarios to run (comma-separated, or `all`)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated, decimal or 0x-prefixed hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Console command to run against a fresh engine (repeatable); skips scenarios
    #[arg(long = "command")]
    commands: Vec<String>,

    /// Gold available to `doctrine_acquire` console commands
    #[arg(long, default_value_t = 1_000_000)]
    gold: i64,

    /// Influence available to `doctrine_acquire` console commands
    #[arg(long, default_value_t = 10_000)]
    influence: i64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    let registry = load_registry(args.catalog.as_ref())?;
    debug!("{} doctrines registered", registry.len());

    if !args.commands.is_empty() {
        return run_console(&args, registry);
    }

    announce_banner();

    let start_time = Instant::now();
    let scenarios = expand_scenarios(&split_csv(&args.scenarios));
    let seeds = parse_seeds(&args.seeds)?;
    let results = run_scenarios(&args, &registry, &scenarios, &seeds);

    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:25} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "📜 Doctrine Engine Tester".bright_cyan().bold());
    println!("{}", "=========================".cyan());
}

fn load_registry(path: Option<&PathBuf>) -> Result<DoctrineRegistry> {
    let Some(path) = path else {
        return Ok(DoctrineRegistry::load_from_static());
    };
    info!("loading doctrine catalog from {}", path.display());
    let json =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    DoctrineRegistry::from_json(&json)
        .with_context(|| format!("failed to parse catalog {}", path.display()))
}

fn run_console(args: &Args, registry: DoctrineRegistry) -> Result<()> {
    let mut engine = DoctrineEngine::new(registry);
    let mut purse = Purse::new(args.gold, args.influence);
    let mut output_target = OutputTarget::new(args.output.clone())?;
    let mut failed = false;

    for line in &args.commands {
        writeln!(output_target.writer(), "> {line}")?;
        match run_command(&mut engine, &mut purse, line) {
            Ok(text) => writeln!(output_target.writer(), "{}", text.trim_end())?,
            Err(err) => {
                failed = true;
                writeln!(output_target.writer(), "error: {err}")?;
            }
        }
    }
    output_target.flush_inner()?;

    if failed {
        std::process::exit(2);
    }
    Ok(())
}

fn run_scenarios(
    args: &Args,
    registry: &DoctrineRegistry,
    scenarios: &[String],
    seeds: &[u64],
) -> Vec<ScenarioResult> {
    println!("{}", "🧠 Running Scenarios".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let mut results = Vec::new();
    for scenario_name in scenarios {
        let Some(scenario) = get_scenario(scenario_name) else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
            continue;
        };
        for &seed in seeds {
            if args.verbose {
                println!(
                    "🧪 Testing scenario: {} (seed: {seed})",
                    scenario_name.bright_white()
                );
            }
            results.push(scenario.run(registry, seed, args.iterations, args.verbose));
        }
    }
    results
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report {
        ReportFormat::Json => reports::generate_json_report(&mut output_target, results)?,
        ReportFormat::Markdown => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Doctrine Scenario Results\n\n_No scenarios executed._"
                )?;
            } else {
                reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        ReportFormat::Console => {
            if results.is_empty() {
                writeln!(&mut output_target, "No scenarios executed.")?;
            } else {
                reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(
                &mut output_target,
                "🏁 Total time: {:?}",
                start_time.elapsed()
            )?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            catalog: None,
            scenarios: "smoke".to_string(),
            list_scenarios: false,
            seeds: "1337".to_string(),
            iterations: 1,
            report: ReportFormat::Json,
            output: None,
            verbose: false,
            commands: Vec::new(),
            gold: 0,
            influence: 0,
        }
    }

    #[test]
    fn args_parse_repeated_commands() {
        let args = Args::parse_from([
            "doctrine-tester",
            "--command",
            "feat_list",
            "--command",
            "feat_unlock_all",
            "--report",
            "markdown",
        ]);
        assert_eq!(args.commands, vec!["feat_list", "feat_unlock_all"]);
        assert_eq!(args.report, ReportFormat::Markdown);
        assert_eq!(args.gold, 1_000_000);
    }

    #[test]
    fn missing_catalog_file_is_an_error() {
        let path = PathBuf::from("/definitely/not/here.json");
        let err = load_registry(Some(&path)).expect_err("missing file");
        assert!(format!("{err:#}").contains("failed to read"));
    }

    #[test]
    fn unknown_scenarios_are_skipped() {
        let args = base_args();
        let registry = DoctrineRegistry::load_from_static();
        let results = run_scenarios(&args, &registry, &["nope".to_string()], &[1]);
        assert!(results.is_empty());
        let results = run_scenarios(&args, &registry, &["smoke".to_string()], &[1, 2]);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed));
    }
}
