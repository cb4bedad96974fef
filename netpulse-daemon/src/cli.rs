//! CLI argument definitions for netpulse-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Netpulse network telemetry collection daemon.
///
/// Runs the SNMP poller, SNMP trap receiver, syslog listeners, and
/// NetFlow/IPFIX collector, and forwards normalized events to the
/// central ingestion API.
#[derive(Parser, Debug)]
#[command(name = "netpulse-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to netpulse.toml configuration file.
    #[arg(short, long, default_value = "/etc/netpulse/netpulse.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}
