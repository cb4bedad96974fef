//! Aggregated health reporting for the daemon.
//!
//! Health is derived from observable collector state: per-collector
//! error ratios and event queue utilization. The overall status is the
//! worst individual finding.
//!
//! # Aggregation Rule
//!
//! - queue utilization > 90% -> Degraded
//! - a collector whose errors exceed half of its received inputs -> Degraded
//! - a collector that has only ever produced errors -> Unhealthy

use std::fmt;

use serde::Serialize;

use netpulse_core::stats::StatsSnapshot;

/// Health status of the daemon or a single collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    /// Operating normally.
    Healthy,
    /// Operating with reduced quality (reason attached).
    Degraded(String),
    /// Not operating usefully (reason attached).
    Unhealthy(String),
}

impl HealthStatus {
    /// Returns true for `Healthy`.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

/// Evaluate overall daemon health from queue depth and collector stats.
pub fn evaluate(queue_depth: usize, queue_capacity: usize, stats: &[StatsSnapshot]) -> HealthStatus {
    let mut worst = HealthStatus::Healthy;
    let mut reasons: Vec<String> = Vec::new();

    if queue_capacity > 0 && queue_depth * 10 > queue_capacity * 9 {
        reasons.push(format!(
            "event queue utilization high: {queue_depth}/{queue_capacity}"
        ));
        worst = HealthStatus::Degraded(String::new());
    }

    for snapshot in stats {
        if snapshot.received == 0 {
            continue;
        }
        if snapshot.errors == snapshot.received {
            reasons.push(format!("{}: all inputs failed", snapshot.name));
            worst = HealthStatus::Unhealthy(String::new());
        } else if snapshot.errors * 2 > snapshot.received && !matches!(worst, HealthStatus::Unhealthy(_)) {
            reasons.push(format!(
                "{}: error ratio high ({}/{})",
                snapshot.name, snapshot.errors, snapshot.received
            ));
            worst = HealthStatus::Degraded(String::new());
        }
    }

    match worst {
        HealthStatus::Healthy => HealthStatus::Healthy,
        HealthStatus::Degraded(_) => HealthStatus::Degraded(reasons.join("; ")),
        HealthStatus::Unhealthy(_) => HealthStatus::Unhealthy(reasons.join("; ")),
    }
}
