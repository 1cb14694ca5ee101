//! remote-pcap command line entry point.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use commands::capture::{self, CaptureArgs};
use remote_pcap::tools::Analyzer;

/// Remote capture network traffic into a local analyzer.
#[derive(Debug, Parser)]
#[command(name = "remote-pcap", version, about)]
struct Cli {
    /// Capture host address, `host` or `host:port`
    #[arg(value_name = "REMOTE HOST")]
    remote: String,

    /// Interface to capture on the remote host
    #[arg(short, long)]
    interface: String,

    /// Username for login
    #[arg(short, long)]
    user: String,

    /// Password for login
    #[arg(short, long, conflicts_with = "identityfile")]
    password: Option<String>,

    /// File with custom private key
    #[arg(short = 'k', long)]
    identityfile: Option<PathBuf>,

    /// Packet analyzer
    #[arg(short, long, value_enum, default_value_t = Analyzer::Wireshark)]
    analyzer: Analyzer,

    /// Configuration file (default: ~/.remote-pcap/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    capture::execute(CaptureArgs {
        remote: cli.remote,
        interface: cli.interface,
        user: cli.user,
        password: cli.password,
        identity_file: cli.identityfile,
        analyzer: cli.analyzer,
        config: cli.config,
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_password_and_key_conflict() {
        let parsed = Cli::try_parse_from([
            "remote-pcap", "host", "-i", "eth0", "-u", "ops", "-p", "pw", "-k", "/key",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["remote-pcap", "host:2222", "-i", "eth0", "-u", "ops"])
            .unwrap();
        assert_eq!(cli.analyzer, Analyzer::Wireshark);
        assert_eq!(cli.remote, "host:2222");
        assert!(cli.password.is_none());

        let cli = Cli::try_parse_from([
            "remote-pcap", "host", "-i", "eth0", "-u", "ops", "-a", "sngrep",
        ])
        .unwrap();
        assert_eq!(cli.analyzer, Analyzer::Sngrep);
    }
}
