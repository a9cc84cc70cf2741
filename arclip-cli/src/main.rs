use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "arclip", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse and validate a session configuration.
    Check(CheckArgs),
    /// Print the scene markup the engines will receive.
    Markup(MarkupArgs),
    /// Replay a scripted session against the simulated host and print what happened.
    Replay(ReplayArgs),
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Session configuration JSON.
    #[arg(long)]
    config: PathBuf,
}

#[derive(Parser, Debug)]
struct MarkupArgs {
    /// Session configuration JSON (defaults when omitted).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ReplayArgs {
    /// Replay script JSON.
    #[arg(long)]
    script: PathBuf,

    /// Session configuration JSON (defaults when omitted).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print compact JSON instead of pretty-printed.
    #[arg(long, default_value_t = false)]
    compact: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Check(args) => cmd_check(args),
        Command::Markup(args) => cmd_markup(args),
        Command::Replay(args) => cmd_replay(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<arclip::SessionConfig> {
    let Some(path) = path else {
        return Ok(arclip::SessionConfig::default());
    };
    let config = arclip::SessionConfig::from_path(path)
        .with_context(|| format!("load config '{}'", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config '{}'", path.display()))?;
    Ok(config)
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let config = load_config(Some(&args.config))?;
    tracing::debug!(?config, "config accepted");
    eprintln!("ok {}", args.config.display());
    Ok(())
}

fn cmd_markup(args: MarkupArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    println!("{}", config.scene.to_markup(config.surface_z_index));
    Ok(())
}

fn cmd_replay(args: ReplayArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let script = arclip::ReplayScript::from_path(&args.script)
        .with_context(|| format!("load replay script '{}'", args.script.display()))?;
    let report = arclip::replay(config, &script)
        .with_context(|| format!("replay '{}'", args.script.display()))?;

    let json = if args.compact {
        serde_json::to_string(&report)
    } else {
        serde_json::to_string_pretty(&report)
    }
    .context("serialize replay report")?;
    println!("{json}");
    Ok(())
}
