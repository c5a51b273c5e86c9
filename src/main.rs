use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use smartschool_api::config::GroupPolicy;
use smartschool_api::io::{markup, snapshot};
use smartschool_api::{ApiError, Result, compare, logging, tree};

fn main() {
    let cli = Cli::parse();
    if let Err(error) = logging::init(cli.log.as_deref()) {
        eprintln!("warning: {error}");
    }
    match run(cli.command) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(2);
        }
    }
}

fn run(command: Command) -> Result<bool> {
    match command {
        Command::Snapshot(args) => execute_snapshot(args).map(|_| true),
        Command::Compare(args) => execute_compare(args),
        Command::Stats(args) => execute_stats(args).map(|_| true),
        Command::Parent(args) => execute_parent(args).map(|_| true),
    }
}

fn execute_snapshot(args: SnapshotArgs) -> Result<()> {
    let source = read_input(&args.input)?;
    let ingested = if args.base64 {
        markup::ingest_payload(&source)?
    } else {
        markup::ingest(&source)?
    };
    for diagnostic in &ingested.diagnostics {
        eprintln!("warning: {diagnostic}");
    }

    let mut tree = ingested.tree;
    let root = tree.root();
    tree::sort(&mut tree, root);
    let top = tree
        .top_level()
        .ok_or_else(|| ApiError::Snapshot("markup contains no group".into()))?;
    snapshot::write_snapshot(&args.output, &tree, top)
}

fn execute_compare(args: CompareArgs) -> Result<bool> {
    let left = snapshot::read_snapshot(&args.left)?;
    let right = snapshot::read_snapshot(&args.right)?;
    let comparison = compare::equals(&left, left.root(), &right, right.root(), !args.shallow);
    if comparison.is_equal() {
        println!("equal");
    } else {
        for difference in comparison.differences() {
            println!("{difference}");
        }
    }
    Ok(comparison.is_equal())
}

fn execute_stats(args: StatsArgs) -> Result<()> {
    let policy = load_policy(args.policy.as_deref())?;
    let groups = snapshot::read_snapshot(&args.input)?;
    let root = groups.root();
    let exclusions = &policy.discard_subgroups;
    println!("groups: {}", tree::count(&groups, root, exclusions, false));
    println!("classes: {}", tree::count(&groups, root, exclusions, true));
    if let Some(name) = args.find {
        match tree::find(&groups, root, exclusions, &name) {
            Some(id) => {
                let group = groups.group(id);
                println!("{}: {} ({}, code {})", name, group.description, group.kind, group.code);
            }
            None => println!("{name}: not found"),
        }
    }
    Ok(())
}

fn execute_parent(args: ParentArgs) -> Result<()> {
    let policy = load_policy(Some(args.policy.as_path()))?;
    println!("{}", policy.logical_parent(&args.class));
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(ApiError::MissingInput(path.to_path_buf()));
    }
    Ok(std::fs::read_to_string(path)?)
}

fn load_policy(path: Option<&Path>) -> Result<GroupPolicy> {
    match path {
        Some(path) => GroupPolicy::load(path),
        None => Ok(GroupPolicy::default()),
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Inspect group trees mirrored from the school platform."
)]
struct Cli {
    /// Log filter directives, e.g. `debug` or `smartschool_api=trace`.
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert group markup into a JSON snapshot.
    Snapshot(SnapshotArgs),
    /// Compare two snapshots and print the first difference.
    Compare(CompareArgs),
    /// Print group counts for a snapshot.
    Stats(StatsArgs),
    /// Print the logical parent group of a class.
    Parent(ParentArgs),
}

#[derive(clap::Args)]
struct SnapshotArgs {
    /// Markup file as served by the platform.
    #[arg(long)]
    input: PathBuf,

    /// The input is base64 encoded.
    #[arg(long)]
    base64: bool,

    /// Output snapshot path.
    #[arg(long)]
    output: PathBuf,
}

#[derive(clap::Args)]
struct CompareArgs {
    #[arg(long)]
    left: PathBuf,

    #[arg(long)]
    right: PathBuf,

    /// Only compare the top groups, not their children.
    #[arg(long)]
    shallow: bool,
}

#[derive(clap::Args)]
struct StatsArgs {
    /// Snapshot file.
    #[arg(long)]
    input: PathBuf,

    /// Group policy with the exclusion set.
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Also look up a group by name.
    #[arg(long)]
    find: Option<String>,
}

#[derive(clap::Args)]
struct ParentArgs {
    /// Group policy with year and grade names.
    #[arg(long)]
    policy: PathBuf,

    /// Class name starting with its year digit.
    class: String,
}
