//! 하트비트 태스크 — 주기적 집계 상태 보고
//!
//! 자체 주기로 수집기별 카운터 스냅샷과 큐 깊이를 모아
//! 하트비트 엔드포인트로 전송합니다. 하트비트 실패는 로그만 남기고
//! 무시됩니다 — 절대 치명적이지 않습니다.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::broadcast;

use netpulse_core::metrics as m;
use netpulse_core::queue::EventSender;
use netpulse_core::stats::StatsRegistry;

use crate::api::{AgentIdentity, HeartbeatPayload, IngestApi, SystemStatus};

/// 하트비트 태스크
pub struct HeartbeatTask<A: IngestApi> {
    api: Arc<A>,
    identity: AgentIdentity,
    registry: Arc<StatsRegistry>,
    /// 큐 깊이 조회용 (이벤트 전송에는 사용하지 않음)
    queue: EventSender,
    interval: Duration,
    start_time: Instant,
}

impl<A: IngestApi> HeartbeatTask<A> {
    /// 새 하트비트 태스크를 생성합니다.
    pub fn new(
        api: Arc<A>,
        identity: AgentIdentity,
        registry: Arc<StatsRegistry>,
        queue: EventSender,
        interval: Duration,
    ) -> Self {
        Self {
            api,
            identity,
            registry,
            queue,
            interval,
            start_time: Instant::now(),
        }
    }

    /// 하트비트 루프를 실행합니다.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "heartbeat task started"
        );
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // 첫 틱(즉시 발화)은 소모
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.beat().await;
                }
                _ = shutdown.recv() => {
                    tracing::debug!("heartbeat task shutting down");
                    break;
                }
            }
        }
    }

    /// 하트비트 하나를 구성하여 전송합니다.
    pub async fn beat(&self) {
        let payload = HeartbeatPayload {
            agent_id: self.identity.agent_id.clone(),
            hostname: self.identity.hostname.clone(),
            status: "healthy".to_owned(),
            timestamp: Utc::now().to_rfc3339(),
            stats: self.registry.snapshot_all(),
            system: SystemStatus {
                queue_depth: self.queue.depth(),
                uptime_secs: self.start_time.elapsed().as_secs(),
                version: self.identity.version.clone(),
            },
        };

        match self.api.send_heartbeat(&payload).await {
            Ok(()) => {
                metrics::counter!(m::EXPORT_HEARTBEATS_TOTAL, m::LABEL_RESULT => "success")
                    .increment(1);
                tracing::debug!(queue_depth = payload.system.queue_depth, "heartbeat sent");
            }
            Err(e) => {
                // 하트비트 실패는 수집 경로에 영향을 주지 않음
                metrics::counter!(m::EXPORT_HEARTBEATS_TOTAL, m::LABEL_RESULT => "failure")
                    .increment(1);
                tracing::warn!(error = %e, "heartbeat failed");
            }
        }
    }
}
