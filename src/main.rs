//! Scanpane - run a scan template and re-emit the scanner's colored output
//!
//! Loads a template file, writes it to the session's temporary file, runs
//! the scanner against the target and prints the rendered output to stdout.
//! Logs go to stderr.

use std::env;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, warn};

use scanpane::config::Config;
use scanpane::sinks::TracingErrorSink;
use scanpane::{AnsiWriter, TemplateSession};

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "scanpane", version, about = "Run a scan template and print its output")]
struct Args {
    /// Target URL passed to the scanner with -u
    #[arg(short = 'u', long)]
    target: String,

    /// Template file to scan with
    #[arg(short = 't', long)]
    template: PathBuf,

    /// Scanner executable; defaults to tool.default_path from the config
    #[arg(long)]
    tool: Option<PathBuf>,

    /// Replace the generated command line entirely
    #[arg(long)]
    command: Option<String>,

    /// Print text without styling even on a terminal
    #[arg(long)]
    no_color: bool,

    /// Path to configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.debug
        || env::var("SCANPANE_DEBUG").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
    {
        "debug"
    } else {
        "info"
    };
    let env_filter = env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(env_filter))
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    let config = match load_configuration(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", scanpane::handle_startup_error(&e));
            process::exit(2);
        }
    };

    let template = fs::read_to_string(&args.template)
        .with_context(|| format!("reading template {}", args.template.display()))?;
    let tool = args
        .tool
        .clone()
        .unwrap_or_else(|| config.tool.default_path.clone());

    let color = !args.no_color && io::stdout().is_terminal();
    let mut session = TemplateSession::with_surface(
        &tool,
        &args.target,
        template,
        config,
        AnsiWriter::new(io::stdout(), color),
        Arc::new(TracingErrorSink),
    )?;
    if let Some(command) = &args.command {
        session.set_command_line(command.clone());
    }
    debug!("Command line: {}", session.command_line());

    if let Err(e) = session.execute().await {
        eprintln!("{}", scanpane::handle_startup_error(&e));
        let _ = session.close();
        process::exit(2);
    }

    if let Some(canceller) = session.canceller() {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping scanner");
                canceller.cancel();
            }
        });
    }

    let code = session.wait().await;
    let _ = io::stdout().write_all(b"\n");
    let _ = io::stdout().flush();
    session.close()?;

    info!("Scanner finished with {:?}", code);
    process::exit(match code {
        Some(code) if code >= 0 => code,
        _ => 1,
    });
}

/// Load configuration from --config, the environment, or default locations
fn load_configuration(args: &Args) -> scanpane::Result<Config> {
    match &args.config {
        Some(path) => scanpane::init_with_config(path),
        None => scanpane::init(),
    }
}
