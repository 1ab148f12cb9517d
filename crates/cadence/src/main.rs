use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use cadence_core::analysis::{analyze, AnalysisReport};
use cadence_core::config::{Config, CONFIG_FILE};
use cadence_core::grading::Contributions;
use cadence_core::history::{build_history_model, RawHistory};
use cadence_core::identity::IdentityTable;
use cadence_core::types::Severity;

use cadence_report::{json, text};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Audit a repository's history against target collaboration workflows")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(clap::Args)]
struct SnapshotArgs {
    /// History snapshot (JSON with commits, branches and tags)
    snapshot: PathBuf,
    /// Config file path (defaults to .cadence.toml next to the snapshot or in any ancestor)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// TOML table mapping logins to their commit emails
    #[arg(long)]
    identities: Option<PathBuf>,
    /// TOML table of contribution counts per login (defaults to commit counts)
    #[arg(long)]
    contributions: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: Format,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a history snapshot and print a full workflow report
    Analyze {
        #[command(flatten)]
        args: SnapshotArgs,
    },
    /// Analyze and exit with code 0 (pass) or 1 (fail)
    Check {
        #[command(flatten)]
        args: SnapshotArgs,
        /// Minimum severity to cause failure
        #[arg(long, default_value = "violated")]
        fail_on: String,
    },
    /// Create a default .cadence.toml configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("CADENCE_LOG").unwrap_or_else(|_| EnvFilter::new("cadence=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze { args } => cmd_analyze(&args),
        Commands::Check { args, fail_on } => cmd_check(&args, &fail_on),
        Commands::Init { force } => cmd_init(force),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(2);
    }
}

fn cmd_analyze(args: &SnapshotArgs) -> Result<()> {
    let report = run_analysis(args)?;
    match args.format {
        Format::Text => print!("{}", text::format_report(&report)),
        Format::Json => println!("{}", json::format_report(&report, false)?),
    }
    Ok(())
}

fn cmd_check(args: &SnapshotArgs, fail_on_str: &str) -> Result<()> {
    let fail_on: Severity = fail_on_str.parse()?;
    let report = run_analysis(args)?;
    let (output, passed) = match args.format {
        Format::Text => text::format_check(&report, fail_on),
        Format::Json => {
            let (json, passed) = json::format_check(&report, fail_on, false)?;
            (format!("{json}\n"), passed)
        }
    };
    print!("{output}");
    if !passed {
        process::exit(1);
    }
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let target = PathBuf::from(CONFIG_FILE);
    if target.exists() && !force {
        anyhow::bail!("{CONFIG_FILE} already exists. Use --force to overwrite.");
    }
    std::fs::write(&target, Config::default_toml())
        .with_context(|| format!("failed to write {CONFIG_FILE}"))?;
    println!("Created {CONFIG_FILE} with default configuration.");
    Ok(())
}

fn load_config(snapshot: &Path, config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(p) => Config::load(p),
        None => {
            let dir = snapshot
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            Ok(Config::load_or_default(dir))
        }
    }
}

fn load_snapshot(path: &Path) -> Result<RawHistory> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot '{}'", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse snapshot '{}'", path.display()))
}

fn load_contributions(path: &Path) -> Result<Contributions> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read contributions '{}'", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("failed to parse contributions '{}'", path.display()))
}

fn run_analysis(args: &SnapshotArgs) -> Result<AnalysisReport> {
    let config = load_config(&args.snapshot, args.config.as_deref())?;
    let raw = load_snapshot(&args.snapshot)?;
    let model = build_history_model(&raw)
        .with_context(|| format!("invalid history in '{}'", args.snapshot.display()))?;
    tracing::debug!(
        commits = model.commit_count(),
        branches = model.branches().len(),
        "history model built"
    );

    let identities = match &args.identities {
        Some(path) => IdentityTable::load(path)?,
        None => IdentityTable::default(),
    };
    let contributions = args
        .contributions
        .as_deref()
        .map(load_contributions)
        .transpose()?;

    Ok(analyze(&model, &config, &identities, contributions.as_ref()))
}
