//! Collector orchestration -- assembly, channel wiring, and lifecycle.
//!
//! The [`Orchestrator`] is the central coordinator of `netpulse-daemon`.
//! It loads configuration, creates the bounded event queue, binds every
//! enabled listener socket, spawns one task per device-poll loop and per
//! listener, plus the batch sender, heartbeat, and stats logging tasks,
//! and coordinates cooperative shutdown.
//!
//! # Task Layout
//!
//! - one task per enabled device (SNMP poll loop)
//! - one task per listener socket (trap, syslog UDP, syslog TCP, NetFlow)
//! - one batch sender task (single queue consumer)
//! - one heartbeat task
//! - one stats logging task
//!
//! # Failure Isolation
//!
//! Collector tasks never abort the process: decode failures and device
//! unreachability stay inside the owning task as logs and counters.
//! Only configuration/bind errors during startup are fatal, before any
//! listener begins accepting input.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use netpulse_core::config::NetpulseConfig;
use netpulse_core::queue::{EventReceiver, EventSender};
use netpulse_core::stats::StatsRegistry;
use netpulse_discovery::DiscoveryScanner;
use netpulse_export::{AgentIdentity, BatchSender, HeartbeatTask, IngestClient};
use netpulse_flow::FlowCollector;
use netpulse_snmp::poller::{DevicePoller, SnapshotCache, new_snapshot_cache};
use netpulse_snmp::trap::TrapReceiver;
use netpulse_syslog::{ParseMode, SourcePolicy, SyslogTcpCollector, SyslogUdpCollector};

use crate::health;
use crate::metrics_server;

/// Interval between periodic aggregate statistics log lines.
const STATS_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Delay between agent registration attempts.
const REGISTER_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Grace period for tasks to finish after the shutdown broadcast.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The main daemon orchestrator.
pub struct Orchestrator {
    config: NetpulseConfig,
    identity: AgentIdentity,
    registry: Arc<StatsRegistry>,
    queue_tx: EventSender,
    queue_rx: Option<EventReceiver>,
    client: Arc<IngestClient>,
    snapshot_cache: SnapshotCache,
    shutdown_tx: broadcast::Sender<()>,
    start_time: Instant,
}

impl Orchestrator {
    /// Load configuration from a file and build the orchestrator.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = NetpulseConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration.
    ///
    /// Useful for testing or when config has already been loaded.
    pub fn build_from_config(config: NetpulseConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        // Install metrics recorder before any collector records metrics
        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            metrics::gauge!(
                netpulse_core::metrics::DAEMON_BUILD_INFO,
                "version" => env!("CARGO_PKG_VERSION")
            )
            .set(1.0);
        }

        let identity = resolve_identity(&config);
        tracing::info!(
            agent_id = %identity.agent_id,
            hostname = %identity.hostname,
            "agent identity resolved"
        );

        let (queue_tx, queue_rx) = netpulse_core::queue::bounded(config.performance.max_queue_size);
        let client = Arc::new(
            IngestClient::new(&config.ingest, identity.clone())
                .context("failed to build ingest client")?,
        );
        let (shutdown_tx, _) = broadcast::channel(16);

        Ok(Self {
            config,
            identity,
            registry: Arc::new(StatsRegistry::new()),
            queue_tx,
            queue_rx: Some(queue_rx),
            client,
            snapshot_cache: new_snapshot_cache(),
            shutdown_tx,
            start_time: Instant::now(),
        })
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &NetpulseConfig {
        &self.config
    }

    /// Get the resolved agent identity.
    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    /// Start every enabled collector and block until a shutdown signal.
    pub async fn run(&mut self) -> Result<()> {
        self.register_agent().await;

        let mut tasks: Vec<(&'static str, JoinHandle<()>)> = Vec::new();

        // SNMP device pollers -- one independent loop per enabled device
        let enabled_devices: Vec<_> = self
            .config
            .devices
            .iter()
            .filter(|d| d.enabled)
            .cloned()
            .collect();
        if !enabled_devices.is_empty() {
            let stats = self.registry.register("snmp_poller");
            for device in enabled_devices {
                let poller = DevicePoller::new(
                    device,
                    self.config.snmp.clone(),
                    self.queue_tx.clone(),
                    Arc::clone(&stats),
                    Arc::clone(&self.snapshot_cache),
                );
                tasks.push((
                    "snmp_poller",
                    tokio::spawn(poller.run(self.shutdown_tx.subscribe())),
                ));
            }
        }

        // SNMP trap receiver
        if self.config.snmp.trap_enabled {
            let bind = parse_bind(&self.config.snmp.trap_bind)?;
            let stats = self.registry.register("snmp_trap");
            let receiver = TrapReceiver::bind(bind, self.queue_tx.clone(), stats)
                .await
                .with_context(|| format!("failed to bind trap listener on {bind}"))?;
            let shutdown = self.shutdown_tx.subscribe();
            tasks.push((
                "snmp_trap",
                tokio::spawn(async move {
                    if let Err(e) = receiver.run(shutdown).await {
                        tracing::error!(error = %e, "trap receiver terminated");
                    }
                }),
            ));
        }

        // Syslog listeners share one source policy built from config + devices
        if self.config.syslog.udp_enabled || self.config.syslog.tcp_enabled {
            let policy = Arc::new(SourcePolicy::from_config(
                &self.config.syslog,
                &self.config.devices,
            ));
            let mode = ParseMode::from_config(&self.config.syslog.format);
            let stats = self.registry.register("syslog");

            if self.config.syslog.udp_enabled {
                let bind = parse_bind(&self.config.syslog.udp_bind)?;
                let collector = SyslogUdpCollector::bind(
                    bind,
                    self.config.syslog.max_message_size,
                    mode,
                    Arc::clone(&policy),
                    self.queue_tx.clone(),
                    Arc::clone(&stats),
                )
                .await
                .with_context(|| format!("failed to bind syslog udp listener on {bind}"))?;
                let shutdown = self.shutdown_tx.subscribe();
                tasks.push((
                    "syslog_udp",
                    tokio::spawn(async move {
                        if let Err(e) = collector.run(shutdown).await {
                            tracing::error!(error = %e, "syslog udp collector terminated");
                        }
                    }),
                ));
            }

            if self.config.syslog.tcp_enabled {
                let bind = parse_bind(&self.config.syslog.tcp_bind)?;
                let collector = SyslogTcpCollector::bind(
                    bind,
                    self.config.syslog.max_message_size,
                    mode,
                    policy,
                    self.queue_tx.clone(),
                    stats,
                )
                .await
                .with_context(|| format!("failed to bind syslog tcp listener on {bind}"))?;
                let shutdown = self.shutdown_tx.subscribe();
                tasks.push((
                    "syslog_tcp",
                    tokio::spawn(async move {
                        if let Err(e) = collector.run(shutdown).await {
                            tracing::error!(error = %e, "syslog tcp collector terminated");
                        }
                    }),
                ));
            }
        }

        // NetFlow/IPFIX collector
        if self.config.netflow.enabled {
            let bind = parse_bind(&self.config.netflow.bind)?;
            let stats = self.registry.register("netflow");
            let collector = FlowCollector::bind(bind, self.queue_tx.clone(), stats)
                .await
                .with_context(|| format!("failed to bind netflow listener on {bind}"))?;
            let shutdown = self.shutdown_tx.subscribe();
            tasks.push((
                "netflow",
                tokio::spawn(async move {
                    if let Err(e) = collector.run(shutdown).await {
                        tracing::error!(error = %e, "netflow collector terminated");
                    }
                }),
            ));
        }

        // Discovery sweep runs once at startup, off the critical path
        if self.config.discovery.enabled {
            let scanner = DiscoveryScanner::new(self.config.discovery.clone());
            tasks.push((
                "discovery",
                tokio::spawn(async move {
                    match scanner.sweep().await {
                        Ok(devices) => {
                            for device in &devices {
                                tracing::info!(
                                    ip = %device.ip,
                                    device_type = %device.device_type,
                                    sys_descr = device.sys_descr.as_deref().unwrap_or(""),
                                    "discovered device"
                                );
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "discovery sweep failed"),
                    }
                }),
            ));
        }

        // Batch sender -- the single queue consumer
        let receiver = self
            .queue_rx
            .take()
            .context("orchestrator run() called twice")?;
        let sender = BatchSender::new(
            Arc::clone(&self.client),
            receiver,
            self.config.ingest.batch_size,
            Duration::from_secs(self.config.ingest.flush_interval_secs),
        );
        tasks.push((
            "batch_sender",
            tokio::spawn(sender.run(self.shutdown_tx.subscribe())),
        ));

        // Heartbeat task
        let heartbeat = HeartbeatTask::new(
            Arc::clone(&self.client),
            self.identity.clone(),
            Arc::clone(&self.registry),
            self.queue_tx.clone(),
            Duration::from_secs(self.config.ingest.heartbeat_interval_secs),
        );
        tasks.push((
            "heartbeat",
            tokio::spawn(heartbeat.run(self.shutdown_tx.subscribe())),
        ));

        // Periodic aggregate statistics log
        tasks.push((
            "stats_logger",
            spawn_stats_logger(
                Arc::clone(&self.registry),
                self.queue_tx.clone(),
                Arc::clone(&self.snapshot_cache),
                self.start_time,
                self.shutdown_tx.subscribe(),
            ),
        ));

        tracing::info!(tasks = tasks.len(), "all collectors started");

        // Block until SIGTERM/SIGINT
        let signal = wait_for_shutdown_signal().await?;
        tracing::info!(signal, "shutdown signal received");

        // Cooperative cancellation: every task selects on this broadcast
        let _ = self.shutdown_tx.send(());

        for (name, task) in tasks {
            if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
                tracing::warn!(task = name, "task did not finish within shutdown grace");
            }
        }

        let uptime = self.start_time.elapsed().as_secs();
        tracing::info!(uptime_secs = uptime, "netpulse daemon stopped");
        Ok(())
    }

    /// Register this agent with the ingestion API.
    ///
    /// Retried a bounded number of times; permanent failure is logged
    /// and the daemon continues (events will queue and heartbeats will
    /// keep reporting).
    async fn register_agent(&self) {
        let mut capabilities: Vec<&str> = Vec::new();
        if !self.config.devices.is_empty() {
            capabilities.push("snmp");
        }
        if self.config.snmp.trap_enabled {
            capabilities.push("snmp_trap");
        }
        if self.config.syslog.udp_enabled || self.config.syslog.tcp_enabled {
            capabilities.push("syslog");
        }
        if self.config.netflow.enabled {
            capabilities.push("netflow");
        }
        if self.config.discovery.enabled {
            capabilities.push("discovery");
        }

        let attempts = self.config.ingest.register_retries + 1;
        for attempt in 1..=attempts {
            match self.client.register(&capabilities).await {
                Ok(()) => {
                    tracing::info!(?capabilities, "agent registered with ingestion api");
                    return;
                }
                Err(e) if attempt < attempts => {
                    tracing::warn!(attempt, error = %e, "agent registration failed, retrying");
                    tokio::time::sleep(REGISTER_RETRY_DELAY).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "agent registration failed, continuing unregistered");
                }
            }
        }
    }
}

/// Resolve the agent identity from config, falling back to runtime defaults.
fn resolve_identity(config: &NetpulseConfig) -> AgentIdentity {
    let agent_id = if config.agent.id.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        config.agent.id.clone()
    };
    let hostname = if config.agent.hostname.is_empty() {
        std::env::var("HOSTNAME").unwrap_or_else(|_| "netpulse-agent".to_owned())
    } else {
        config.agent.hostname.clone()
    };
    AgentIdentity {
        agent_id,
        hostname,
        version: env!("CARGO_PKG_VERSION").to_owned(),
    }
}

fn parse_bind(bind: &str) -> Result<SocketAddr> {
    bind.parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address '{}': {}", bind, e))
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Spawn a background task that periodically logs aggregate statistics
/// and the derived health status, and refreshes the uptime gauge.
fn spawn_stats_logger(
    registry: Arc<StatsRegistry>,
    queue: EventSender,
    snapshots_by_device: SnapshotCache,
    start_time: Instant,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(STATS_LOG_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(netpulse_core::metrics::DAEMON_UPTIME_SECONDS)
                        .set(start_time.elapsed().as_secs() as f64);
                    let snapshots = registry.snapshot_all();
                    let status = health::evaluate(queue.depth(), queue.max_capacity(), &snapshots);
                    for snapshot in &snapshots {
                        tracing::info!(
                            collector = %snapshot.name,
                            received = snapshot.received,
                            parsed = snapshot.parsed,
                            dropped = snapshot.dropped,
                            errors = snapshot.errors,
                            "collector statistics"
                        );
                    }
                    // Snapshot copies only -- the poll tasks stay the sole writers
                    for poll in snapshots_by_device.read().await.values() {
                        tracing::info!(
                            device = %poll.device,
                            metrics = poll.metrics.len(),
                            poll_latency_ms = poll.poll_latency_ms,
                            last_poll = %poll.timestamp.to_rfc3339(),
                            "device poll snapshot"
                        );
                    }
                    tracing::info!(
                        queue_depth = queue.depth(),
                        health = %status,
                        "aggregate status"
                    );
                }
                _ = shutdown.recv() => {
                    tracing::debug!("stats logger shutting down");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use netpulse_core::config::NetpulseConfig;

    fn quiet_config() -> NetpulseConfig {
        let mut config = NetpulseConfig::default();
        // Avoid binding privileged/real ports in tests
        config.snmp.trap_enabled = false;
        config.syslog.udp_enabled = false;
        config.netflow.enabled = false;
        config
    }

    #[tokio::test]
    async fn build_from_config_resolves_identity() {
        let mut config = quiet_config();
        config.agent.id = "agent-fixed".to_owned();
        config.agent.hostname = "collector-test".to_owned();
        let orchestrator = Orchestrator::build_from_config(config).unwrap();
        assert_eq!(orchestrator.identity().agent_id, "agent-fixed");
        assert_eq!(orchestrator.identity().hostname, "collector-test");
    }

    #[tokio::test]
    async fn build_generates_agent_id_when_empty() {
        let orchestrator = Orchestrator::build_from_config(quiet_config()).unwrap();
        // UUID v4 형식: 8-4-4-4-12
        assert_eq!(orchestrator.identity().agent_id.len(), 36);
    }

    #[tokio::test]
    async fn build_rejects_invalid_config() {
        let mut config = quiet_config();
        config.ingest.batch_size = 0;
        assert!(Orchestrator::build_from_config(config).is_err());
    }

    #[tokio::test]
    async fn build_loads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netpulse.toml");
        tokio::fs::write(
            &path,
            r#"
[general]
log_level = "debug"

[snmp]
trap_enabled = false

[syslog]
udp_enabled = false

[netflow]
enabled = false
"#,
        )
        .await
        .unwrap();

        let orchestrator = Orchestrator::build(&path).await.unwrap();
        assert_eq!(orchestrator.config().general.log_level, "debug");
    }

    #[tokio::test]
    async fn build_fails_on_missing_config_file() {
        let result = Orchestrator::build(Path::new("/nonexistent/netpulse.toml")).await;
        assert!(result.is_err());
    }
}
