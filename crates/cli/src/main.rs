use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use cmdtree::manifest::{DEFAULT_MANIFEST_NAME, load_manifest, write_default_manifest};
use cmdtree::{
    Application, CliError, Invocation, LoadedManifest, ManifestNotFound, OptionValues, Session,
    exit_code,
};
use cmdtree_argparse::help;
use cmdtree_resolve::{CommandTree, NodeId, ResolveError};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "cmdtree")]
#[command(version, about = "Resolve and dispatch commands declared in cmdtree.json", long_about = None)]
#[command(disable_help_subcommand = true)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a sample cmdtree.json
    Init(InitArgs),

    /// Validate the command table
    Check(CheckArgs),

    /// List registered commands, optionally below a command path
    Commands(CommandsArgs),

    /// Resolve (possibly abbreviated) command words
    Resolve(ResolveArgs),

    /// Dispatch a full argument vector and print the invocation as JSON
    Run(RunArgs),

    /// Show help for the application or a command
    Help(HelpArgs),
}

#[derive(Args)]
struct ManifestArg {
    /// Path to cmdtree.json manifest
    #[arg(short, long, default_value = DEFAULT_MANIFEST_NAME, value_name = "FILE")]
    manifest: PathBuf,
}

#[derive(Parser)]
struct InitArgs {
    /// Project directory (default: current directory)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Overwrite an existing manifest
    #[arg(long)]
    force: bool,
}

#[derive(Parser)]
struct CheckArgs {
    #[command(flatten)]
    manifest: ManifestArg,

    /// Only output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct CommandsArgs {
    #[command(flatten)]
    manifest: ManifestArg,

    /// Command path to list below
    #[arg(value_name = "PATH")]
    path: Vec<String>,

    /// Only output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct ResolveArgs {
    #[command(flatten)]
    manifest: ManifestArg,

    /// Command words as a user would type them
    #[arg(value_name = "TOKENS", required = true)]
    tokens: Vec<String>,

    /// Only output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct RunArgs {
    #[command(flatten)]
    manifest: ManifestArg,

    /// Arguments exactly as the application would receive them
    #[arg(value_name = "ARGV", trailing_var_arg = true, allow_hyphen_values = true)]
    argv: Vec<String>,
}

#[derive(Parser)]
struct HelpArgs {
    #[command(flatten)]
    manifest: ManifestArg,

    /// Command path
    #[arg(value_name = "PATH")]
    path: Vec<String>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // --help and --version print to stdout and succeed.
            return if err.use_stderr() {
                ExitCode::from(exit_code::SYNTAX_ERROR)
            } else {
                ExitCode::from(exit_code::SUCCESS)
            };
        }
    };
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(err) => {
            eprintln!("error: {err:#}");
            if let Some(hint) = hint(&err) {
                eprintln!("{hint}");
            }
            ExitCode::from(exit_status(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init(args) => init(args),
        Commands::Check(args) => check(args),
        Commands::Commands(args) => commands(args),
        Commands::Resolve(args) => resolve(args),
        Commands::Run(args) => dispatch(args),
        Commands::Help(args) => show_help(args),
    }
}

fn init(args: InitArgs) -> Result<()> {
    let dir = args.dir.unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let manifest_path = dir.join(DEFAULT_MANIFEST_NAME);
    if manifest_path.exists() && !args.force {
        bail!(
            "{DEFAULT_MANIFEST_NAME} already exists in {} (use --force to overwrite)",
            dir.display()
        );
    }

    let written = write_default_manifest(&dir, args.force)?;
    tracing::info!(path = %written.display(), "wrote manifest");

    eprintln!("Created: {}", written.display());
    eprintln!("\nNext steps:");
    eprintln!("  1. Edit {DEFAULT_MANIFEST_NAME} to declare your commands");
    eprintln!("  2. Run: cmdtree check");
    eprintln!("  3. Try: cmdtree run cp b in.bin -o out.bin");
    Ok(())
}

fn check(args: CheckArgs) -> Result<()> {
    let loaded = require_manifest(&args.manifest.manifest)?;
    let app = Application::from_manifest(&loaded.manifest)?;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct CheckReport<'a> {
        manifest: String,
        name: &'a str,
        commands: usize,
        common_option_groups: usize,
    }

    let report = CheckReport {
        manifest: loaded.path.display().to_string(),
        name: loaded.manifest.program_name(),
        commands: app.tree().len(),
        common_option_groups: app.common_groups().len(),
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "OK: {} commands, {} common option groups ({})",
            report.commands, report.common_option_groups, report.manifest
        );
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CommandEntry {
    name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    aliases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    implementation: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    summary: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sub_commands: Vec<CommandEntry>,
}

fn command_entries(tree: &CommandTree, id: NodeId) -> Vec<CommandEntry> {
    tree.children(id)
        .map(|child| {
            let node = tree.node(child);
            CommandEntry {
                name: node.name().to_string(),
                aliases: node.aliases().to_vec(),
                implementation: node.implementation().map(str::to_string),
                summary: node.help().summary.clone(),
                sub_commands: command_entries(tree, child),
            }
        })
        .collect()
}

fn command_rows(entries: &[CommandEntry], indent: usize, rows: &mut Vec<(String, String)>) {
    for entry in entries {
        let mut name = format!("{:indent$}{}", "", entry.name, indent = indent);
        if !entry.aliases.is_empty() {
            name.push_str(&format!(" ({})", entry.aliases.join(", ")));
        }
        rows.push((name, entry.summary.clone()));
        command_rows(&entry.sub_commands, indent + 2, rows);
    }
}

fn commands(args: CommandsArgs) -> Result<()> {
    let loaded = require_manifest(&args.manifest.manifest)?;
    let app = Application::from_manifest(&loaded.manifest)?;
    let tree = app.tree();
    let node = node_for(tree, &args.path)?;

    let entries = command_entries(tree, node);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let mut rows = Vec::new();
    command_rows(&entries, 0, &mut rows);
    print!("{}", help::commands(&rows));
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Resolution {
    canonical_path: Vec<String>,
    depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    implementation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    class_name: Option<String>,
    /// `implementation` located against the manifest's directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    module_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sub_commands: Vec<String>,
    unused: Vec<String>,
}

fn resolve(args: ResolveArgs) -> Result<()> {
    let loaded = require_manifest(&args.manifest.manifest)?;
    let app = Application::from_manifest(&loaded.manifest)?;
    let tree = app.tree();

    let resolved = tree
        .find_command_node(&args.tokens)
        .map_err(CliError::from)?;
    let node = tree.node(resolved.node);
    let resolution = Resolution {
        canonical_path: tree
            .canonical_path(resolved.node)
            .into_iter()
            .map(str::to_string)
            .collect(),
        depth: node.depth(),
        implementation: node.implementation().map(str::to_string),
        class_name: node.class_name().map(str::to_string),
        module_path: node.implementation().map(|m| loaded.locate(m)),
        sub_commands: tree
            .children_names(resolved.node)
            .into_iter()
            .map(str::to_string)
            .collect(),
        unused: resolved.unused,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
        return Ok(());
    }

    let path = resolution.canonical_path.join(" ");
    match (&resolution.implementation, &resolution.class_name) {
        (Some(implementation), Some(class)) => println!("{path} -> {implementation} ({class})"),
        (Some(implementation), None) => println!("{path} -> {implementation}"),
        (None, _) => println!("{path} (subcommands: {})", resolution.sub_commands.join(", ")),
    }
    if !resolution.unused.is_empty() {
        println!("unused: {}", resolution.unused.join(" "));
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport<'a> {
    #[serde(flatten)]
    invocation: &'a Invocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    module_path: Option<PathBuf>,
    options: &'a OptionValues,
}

fn dispatch(args: RunArgs) -> Result<()> {
    let loaded = require_manifest(&args.manifest.manifest)?;
    let app = Arc::new(Application::from_manifest(&loaded.manifest)?);

    let mut session = Session::new(app, OptionValues::default());
    let invocation = session.dispatch(&args.argv)?.ensure_complete()?;

    let report = RunReport {
        invocation: &invocation,
        module_path: invocation
            .command
            .as_ref()
            .map(|command| loaded.locate(&command.implementation)),
        options: session.config(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn show_help(args: HelpArgs) -> Result<()> {
    let loaded = require_manifest(&args.manifest.manifest)?;
    let app = Application::from_manifest(&loaded.manifest)?;
    let node = node_for(app.tree(), &args.path)?;
    print!("{}", app.help(node, loaded.manifest.program_name()));
    Ok(())
}

fn require_manifest(path: &Path) -> Result<LoadedManifest> {
    load_manifest(Some(path))?.ok_or_else(|| ManifestNotFound(path.to_path_buf()).into())
}

fn node_for(tree: &CommandTree, path: &[String]) -> Result<NodeId, CliError> {
    if path.is_empty() {
        return Ok(tree.root());
    }
    Ok(tree.find_command_node(path)?.node)
}

fn hint(err: &anyhow::Error) -> Option<String> {
    match err.downcast_ref::<CliError>()? {
        CliError::Resolve(ResolveError::Misspelled { suggestion, .. }) => {
            Some(format!("Did you mean '{suggestion}'?"))
        }
        CliError::Resolve(ResolveError::MissingSubcommand { available, .. }) => {
            Some(format!("Available subcommands: {}", available.join(", ")))
        }
        _ => None,
    }
}

fn exit_status(err: &anyhow::Error) -> u8 {
    if let Some(err) = err.downcast_ref::<CliError>() {
        return err.exit_code();
    }
    if err.downcast_ref::<ManifestNotFound>().is_some()
        || err.downcast_ref::<std::io::Error>().is_some()
        || err.downcast_ref::<serde_json::Error>().is_some()
    {
        return exit_code::INPUT_ERROR;
    }
    exit_code::APPLICATION_ERROR
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
