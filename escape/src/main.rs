//! Container escape room CLI.
//!
//! `escape play` opens the simulated container terminal (level 1);
//! `escape check <manifest>` grades a deployment manifest (level 2). Progress is
//! kept on the progress store unless `--offline` is given.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use escape::check::{fetch_saved_manifest, render_report, run_check};
use escape::core::rubric::{PASSING_MANIFEST, STARTER_MANIFEST};
use escape::core::types::{Level, task_label};
use escape::exit_codes;
use escape::io::config::{DEFAULT_CONFIG_PATH, EscapeConfig, load_config, write_config};
use escape::io::player::load_or_create_player_id;
use escape::io::progress::{HttpProgressStore, ProgressStore};
use escape::io::sync::SyncClient;
use escape::logging;
use escape::play::{DockerLevel, run_repl};
use tokio::io::BufReader;
use tracing::info;

const OFFLINE_PLAYER: &str = "offline";

#[derive(Parser)]
#[command(name = "escape", version, about = "Container escape room puzzles")]
struct Cli {
    /// Path to the client configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Progress store base URL (overrides the config file).
    #[arg(long, global = true, env = "ESCAPE_SERVER_URL")]
    server_url: Option<String>,

    /// Play without the progress store; nothing is saved.
    #[arg(long, global = true)]
    offline: bool,

    /// Debug logging on stderr when `RUST_LOG` is unset.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Level 1: a simulated container terminal on stdin/stdout.
    Play,
    /// Level 2: check a Deployment manifest against the rubric.
    Check {
        /// Manifest file to submit.
        path: PathBuf,
    },
    /// Print the starter manifest for level 2.
    Manifest {
        /// Print a manifest that passes every check instead.
        #[arg(long, conflicts_with = "saved")]
        solution: bool,
        /// Print the manifest last accepted by the progress store, if any.
        #[arg(long)]
        saved: bool,
    },
    /// Show stored task progress for a level.
    Progress {
        #[arg(long, default_value_t = 1)]
        level: u8,
    },
    /// Print the player id, creating it on first use.
    Whoami,
    /// Write the client configuration file, applying `--server-url`.
    Init {
        /// Replace an existing configuration file.
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    match &cli.command {
        Command::Play => cmd_play(cli),
        Command::Check { path } => cmd_check(cli, path),
        Command::Manifest { solution, saved } => cmd_manifest(cli, *solution, *saved),
        Command::Progress { level } => cmd_progress(cli, *level),
        Command::Whoami => cmd_whoami(cli),
        Command::Init { force } => cmd_init(cli, *force),
    }
}

fn cmd_play(cli: &Cli) -> Result<i32> {
    let cfg = resolve_config(cli)?;
    runtime()?.block_on(async {
        let (store, player_id) = connect(cli, &cfg)?;
        let (sync, events) = SyncClient::new(store, player_id, Level::Docker);
        let input = BufReader::new(tokio::io::stdin());
        let mut out = std::io::stdout().lock();
        run_repl(DockerLevel::new(sync), events, input, &mut out).await?;
        Ok::<_, anyhow::Error>(exit_codes::OK)
    })
}

fn cmd_check(cli: &Cli, path: &Path) -> Result<i32> {
    let manifest =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg = resolve_config(cli)?;
    runtime()?.block_on(async {
        let (store, player_id) = connect(cli, &cfg)?;
        let report = run_check(store.as_deref(), &player_id, &manifest).await;
        render_report(&mut std::io::stdout().lock(), &report)?;
        Ok::<_, anyhow::Error>(if report.verdict.ok {
            exit_codes::OK
        } else {
            exit_codes::NOT_PASSED
        })
    })
}

fn cmd_manifest(cli: &Cli, solution: bool, saved: bool) -> Result<i32> {
    if !saved {
        print!("{}", if solution { PASSING_MANIFEST } else { STARTER_MANIFEST });
        return Ok(exit_codes::OK);
    }
    if cli.offline {
        bail!("saved manifests are kept on the progress store; drop --offline");
    }
    let cfg = resolve_config(cli)?;
    let manifest = runtime()?.block_on(async {
        let (store, player_id) = connect(cli, &cfg)?;
        let store = store.context("no progress store configured")?;
        fetch_saved_manifest(store.as_ref(), &player_id).await
    })?;
    match manifest {
        Some(manifest) => print!("{manifest}"),
        None => {
            eprintln!("No saved manifest yet; printing the starter.");
            print!("{STARTER_MANIFEST}");
        }
    }
    Ok(exit_codes::OK)
}

fn cmd_progress(cli: &Cli, level: u8) -> Result<i32> {
    if cli.offline {
        bail!("progress is kept on the progress store; drop --offline");
    }
    let level = Level::try_from(level).map_err(|err| anyhow!(err))?;
    let cfg = resolve_config(cli)?;
    runtime()?.block_on(async {
        let (store, player_id) = connect(cli, &cfg)?;
        let store = store.context("no progress store configured")?;
        let progress = store
            .fetch(&player_id, level)
            .await
            .with_context(|| format!("fetch progress for level {level}"))?;
        println!("{}", level.title());
        for task in level.required_tasks() {
            let mark = if progress.tasks.is_done(task) { 'x' } else { ' ' };
            println!("  [{mark}] {}", task_label(task));
        }
        println!("done: {}", if progress.done { "yes" } else { "no" });
        Ok::<_, anyhow::Error>(exit_codes::OK)
    })
}

fn cmd_init(cli: &Cli, force: bool) -> Result<i32> {
    if cli.config.exists() && !force {
        bail!(
            "{} already exists; pass --force to replace it",
            cli.config.display()
        );
    }
    let cfg = resolve_config(cli)?;
    write_config(&cli.config, &cfg)?;
    info!(path = %cli.config.display(), server_url = %cfg.server_url, "config written");
    println!("Wrote {}", cli.config.display());
    Ok(exit_codes::OK)
}

fn cmd_whoami(cli: &Cli) -> Result<i32> {
    let cfg = resolve_config(cli)?;
    println!("{}", load_or_create_player_id(&cfg.player_id_path)?);
    Ok(exit_codes::OK)
}

/// Config file values, with the command line taking precedence.
fn resolve_config(cli: &Cli) -> Result<EscapeConfig> {
    let mut cfg = load_config(&cli.config)?;
    if let Some(url) = &cli.server_url {
        cfg.server_url = url.clone();
        cfg.validate().context("--server-url")?;
    }
    Ok(cfg)
}

/// Progress store and player id, or neither when offline.
fn connect(cli: &Cli, cfg: &EscapeConfig) -> Result<(Option<Arc<dyn ProgressStore>>, String)> {
    if cli.offline {
        return Ok((None, OFFLINE_PLAYER.to_string()));
    }
    let player_id = load_or_create_player_id(&cfg.player_id_path)?;
    let store: Arc<dyn ProgressStore> = Arc::new(HttpProgressStore::new(
        &cfg.server_url,
        Duration::from_secs(cfg.request_timeout_secs),
    )?);
    Ok((Some(store), player_id))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("start async runtime")
}
