//! lxcport - container lifecycle port process.
//!
//! Serves lifecycle operations for a single container over a
//! length-prefixed binary message channel on stdin/stdout, for a parent
//! supervisor that owns the process.

use clap::Parser;
use lxcport_port::{Config, Dispatcher, LifecyclePolicy, LxcContainer, Port};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lxcport")]
#[command(about = "Container lifecycle port process on stdio")]
#[command(version)]
struct Cli {
    /// Container name
    #[arg(short, long)]
    name: String,

    /// Container storage path
    #[arg(short = 'P', long)]
    path: Option<PathBuf>,

    /// Redirect the error log to a file
    #[arg(short = 'o', long)]
    errlog: Option<PathBuf>,

    /// Container lifecycle on exit: permanent, transient or temporary
    #[arg(short = 't', long = "type", default_value = "temporary")]
    policy: LifecyclePolicy,

    /// Verbose mode (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Debug: do not daemonize started containers
    #[arg(long)]
    no_daemonize: bool,

    /// Debug: do not close inherited file descriptors on start
    #[arg(long)]
    no_close_fds: bool,
}

fn init_logging(verbose: u8, errlog: Option<&PathBuf>) -> io::Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false);

    match errlog {
        Some(path) => {
            let file = Arc::new(File::create(path)?);
            builder.with_writer(file).init();
        }
        None => {
            builder.with_writer(io::stderr).init();
        }
    }
    Ok(())
}

fn run() -> i32 {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.errlog.as_ref()) {
        eprintln!("lxcport: failed to open error log: {e}");
        return 1;
    }

    let mut config = Config::new(&cli.name)
        .with_policy(cli.policy)
        .with_verbose(cli.verbose);
    config.path = cli.path.clone();
    config.errlog = cli.errlog.clone();
    config.daemonize = !cli.no_daemonize;
    config.close_fds = !cli.no_close_fds;

    let container = match LxcContainer::new(&cli.name, cli.path) {
        Ok(container) => container
            .with_daemonize(config.daemonize)
            .with_close_fds(config.close_fds),
        Err(e) => {
            tracing::error!(container = %cli.name, error = %e, "failed to open container");
            return 1;
        }
    };

    tracing::info!(
        container = %cli.name,
        policy = %config.policy,
        "port starting"
    );

    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();
    let mut port = Port::new(
        stdin,
        stdout,
        Dispatcher::with_container_commands(),
        container,
        config,
    );

    match port.run() {
        Ok(shutdown) => {
            port.apply_exit_policy();
            tracing::info!(graceful = shutdown.is_graceful(), "port stopped");
            shutdown.exit_code()
        }
        Err(e) => {
            tracing::error!(error = %e, "session failed");
            1
        }
    }
}

fn main() {
    std::process::exit(run());
}
