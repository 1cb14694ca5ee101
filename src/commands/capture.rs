//! Capture command.
//!
//! `remote-pcap <REMOTE> -i <iface>` streams a remote tcpdump capture
//! through sshdump into a local Wireshark or sngrep until either side exits
//! or Ctrl+C is pressed.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use remote_pcap::config::{Config, LogFormat, LoggingConfig};
use remote_pcap::diagnostics::Logger;
use remote_pcap::paths;
use remote_pcap::session::{Session, ToolSlot};
use remote_pcap::supervisor::Tool;
use remote_pcap::tools::{
    Analyzer, Credentials, RemoteTarget, SngrepTool, SshdumpTool, WiresharkTool, ensure_executable,
};

/// Default SSH port when `REMOTE` has none.
const DEFAULT_SSH_PORT: u16 = 22;

/// Options of the capture command after CLI parsing.
#[derive(Debug)]
pub struct CaptureArgs {
    pub remote: String,
    pub interface: String,
    pub user: String,
    pub password: Option<String>,
    pub identity_file: Option<PathBuf>,
    pub analyzer: Analyzer,
    pub config: Option<PathBuf>,
}

/// Execute the capture command.
pub async fn execute(args: CaptureArgs) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    init_tracing(&config.logging);

    let validation = config.validate()?;
    for warning in &validation.warnings {
        warn!("{warning}");
    }

    let (hostname, port) = parse_remote(&args.remote)?;
    let ssh_dir = paths::get_ssh_dir().ok();
    let credentials = Credentials::resolve(args.password, args.identity_file, ssh_dir.as_deref())?;

    ensure_executable(&config.tools.sshdump)?;
    match args.analyzer {
        Analyzer::Wireshark => ensure_executable(&config.tools.wireshark)?,
        Analyzer::Sngrep => ensure_executable(&config.tools.sngrep)?,
    }

    let target = RemoteTarget {
        hostname,
        port,
        user: args.user,
        credentials,
        interface: args.interface,
        tcpdump: config.tools.tcpdump.clone(),
    };
    info!(
        host = %target.hostname,
        port = target.port,
        user = %target.user,
        interface = %target.interface,
        analyzer = args.analyzer.name(),
        "Resolved capture target"
    );

    let session = build_session(&config, target, args.analyzer);
    let handle = session.handle();
    let worker = session.spawn().context("Failed to start session thread")?;

    let joined = tokio::task::spawn_blocking(move || worker.join());
    tokio::pin!(joined);

    tokio::select! {
        result = &mut joined => return finish(result),
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            info!("Interrupted, stopping capture session");
            handle.stop();
        },
    }

    finish(joined.await)
}

type Joined = std::result::Result<std::thread::Result<remote_pcap::Result<()>>, tokio::task::JoinError>;

fn finish(joined: Joined) -> Result<()> {
    match joined.context("Session task failed")? {
        Ok(result) => result.context("Capture session failed"),
        Err(_) => anyhow::bail!("Capture session thread panicked"),
    }
}

/// Wire the configured tools into a session.
fn build_session(config: &Config, target: RemoteTarget, analyzer: Analyzer) -> Session {
    let sshdump = config.tools.sshdump.clone();
    let capture = ToolSlot::new("dumper", move |pipe: &Path, logger| -> Arc<dyn Tool> {
        Arc::new(SshdumpTool::new(logger, &sshdump, pipe, target))
    });

    let viewer = match analyzer {
        Analyzer::Wireshark => {
            let program = config.tools.wireshark.clone();
            ToolSlot::new(analyzer.name(), move |pipe: &Path, logger| -> Arc<dyn Tool> {
                Arc::new(WiresharkTool::new(logger, &program, pipe))
            })
        },
        Analyzer::Sngrep => {
            let program = config.tools.sngrep.clone();
            let terminal = config.tools.terminal.clone();
            ToolSlot::new(analyzer.name(), move |pipe: &Path, logger| -> Arc<dyn Tool> {
                Arc::new(SngrepTool::new(logger, &terminal, &program, pipe))
            })
        },
    };

    Session::new(
        Logger::tracing("main_runner"),
        config.session.settings(),
        capture,
        viewer,
    )
}

/// Split `host[:port]`.
fn parse_remote(remote: &str) -> Result<(String, u16)> {
    let (host, port) = match remote.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .with_context(|| format!("Invalid port in remote address: {remote}"))?;
            (host, port)
        },
        None => (remote, DEFAULT_SSH_PORT),
    };
    if host.is_empty() {
        anyhow::bail!("Remote host cannot be empty");
    }
    Ok((host.to_string(), port))
}

/// Initialize stdout logging. `RUST_LOG` overrides the configured level.
fn init_tracing(config: &LoggingConfig) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("debug"));

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Text => registry.with(fmt::layer().with_thread_names(true)).init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_thread_names(true))
            .init(),
    }
}
