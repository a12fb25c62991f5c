//! Landing Tracker CLI.
//!
//! Replays scripted landing page visits through the tracker and prints the
//! resulting sink calls as JSON lines, so event mappings can be checked
//! without a browser.
//!
//! # Commands
//!
//! - `landing-tracker replay <SCRIPT>`: replay a page session
//! - `landing-tracker classify`: show the device/browser/OS classification
//!
//! # Environment Variables
//!
//! See the [`config`](landing_tracker::config) module for available
//! configuration options.

use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use landing_tracker::config::{EventNaming, TrackerOptions, ENV_TOKEN};
use landing_tracker::context;
use landing_tracker::replay::{replay, ReplayScript};
use landing_tracker::sink::JsonLinesSink;

/// Landing Tracker - analytics instrumentation for landing pages.
#[derive(Parser, Debug)]
#[command(name = "landing-tracker")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    LANDING_TRACKER_TOKEN      Sink token (used when the script has none)
    LANDING_TRACKER_PROJECT    Project label for prefixed event names
    LANDING_TRACKER_NAMING     Event naming: 'bare' or 'prefixed'
    LANDING_TRACKER_DEBUG      Verbose tracking (true/false)
    LANDING_TRACKER_SCROLL     Scroll milestone tracking (true/false)
    LANDING_TRACKER_TIME       Time milestone tracking (true/false)

EXAMPLES:
    # Replay a visit instantly on a virtual clock
    landing-tracker replay visit.json

    # Replay in real time with bare event names
    landing-tracker replay visit.json --realtime --naming bare

    # Check how a user agent is classified
    landing-tracker classify --width 390 --user-agent 'Mozilla/5.0 (iPhone...)'
")]
struct Cli {
    /// Enable debug logging.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a scripted page session.
    ///
    /// Sink calls are written to stdout as JSON lines; logs go to stderr.
    Replay {
        /// Path to the replay script (JSON).
        script: PathBuf,

        /// Sink token. Overrides the script and LANDING_TRACKER_TOKEN.
        #[arg(long)]
        token: Option<String>,

        /// Project label. Overrides the script's projectName.
        #[arg(long)]
        project: Option<String>,

        /// Event naming convention.
        #[arg(long, value_parser = parse_naming)]
        naming: Option<EventNaming>,

        /// Run on the wall clock instead of a paused virtual clock.
        #[arg(long)]
        realtime: bool,
    },

    /// Print the context classification for a user agent and viewport.
    Classify {
        #[arg(long)]
        user_agent: String,

        /// Viewport width in CSS pixels.
        #[arg(long, default_value_t = 1280.0)]
        width: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match cli.command {
        Command::Replay {
            script,
            token,
            project,
            naming,
            realtime,
        } => run_replay(script, token, project, naming, realtime, cli.debug),
        Command::Classify { user_agent, width } => run_classify(&user_agent, width),
    }
}

/// Runs the replay command.
fn run_replay(
    path: PathBuf,
    token: Option<String>,
    project: Option<String>,
    naming: Option<EventNaming>,
    realtime: bool,
    debug: bool,
) -> Result<()> {
    let mut script = ReplayScript::from_path(&path)
        .with_context(|| format!("Failed to load replay script {}", path.display()))?;

    script.token = token
        .or_else(|| script.token.take())
        .or_else(|| std::env::var(ENV_TOKEN).ok());
    if script.token.is_none() {
        warn!("No sink token in flags, script or {ENV_TOKEN}");
    }

    let env_options = TrackerOptions::from_env().context("Invalid LANDING_TRACKER_* settings")?;
    script.options = merge_options(script.options, env_options);
    if let Some(project) = project {
        script.options.project_name = Some(project);
    }
    if let Some(naming) = naming {
        script.options.naming = Some(naming);
    }
    if debug {
        script.options.debug = Some(true);
    }

    debug!(options = ?script.options, realtime, "Starting replay");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(!realtime)
        .build()
        .context("Failed to create tokio runtime")?;

    let sink = JsonLinesSink::new(io::stdout());
    let (report, _sink) = runtime.block_on(replay(script, sink));

    if !report.active {
        bail!("tracker did not initialize; no events were emitted");
    }

    eprintln!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Runs the classify command.
fn run_classify(user_agent: &str, width: f64) -> Result<()> {
    let classification = json!({
        "deviceType": context::device_type(width),
        "browser": context::browser(user_agent),
        "os": context::os(user_agent),
    });
    println!("{}", serde_json::to_string_pretty(&classification)?);
    Ok(())
}

/// Fills options the script left unset from the environment.
fn merge_options(script: TrackerOptions, env: TrackerOptions) -> TrackerOptions {
    TrackerOptions {
        project_name: script.project_name.or(env.project_name),
        debug: script.debug.or(env.debug),
        throttle_scroll: script.throttle_scroll.or(env.throttle_scroll),
        throttle_time: script.throttle_time.or(env.throttle_time),
        naming: script.naming.or(env.naming),
    }
}

fn parse_naming(value: &str) -> Result<EventNaming, String> {
    value.parse::<EventNaming>().map_err(|e| e.to_string())
}

/// Initializes the tracing subscriber on stderr.
///
/// Stdout carries only sink output, so logs must stay off it.
fn init_logging(debug: bool) {
    let default = if debug {
        "landing_tracker=debug"
    } else {
        "landing_tracker=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .with_level(true)
        .init();
}
