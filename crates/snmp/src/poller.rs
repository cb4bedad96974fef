//! SNMP 폴러 — 장비별 독립 폴링 루프
//!
//! 활성화된 장비마다 [`DevicePoller`] 태스크가 하나씩 실행됩니다.
//! 사이클마다 프로파일의 OID 테이블을 순회하며 OID별로 GET을 보내고,
//! 부분 실패를 허용합니다. 사이클 완료 후에는 스냅샷 캐시를 갱신하고,
//! 메트릭 이벤트 하나와 이상 징후별 이벤트를 큐에 넣습니다.
//!
//! 장비 하나가 전혀 응답하지 않아도 해당 장비의 루프만 에러 이벤트를
//! 남기고 다음 주기를 기다립니다. 다른 장비의 루프에는 영향이 없습니다.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{RwLock, broadcast};

use netpulse_core::config::SnmpConfig;
use netpulse_core::event::{
    CODE_ANOMALY_BASE, CODE_METRICS, CODE_POLL_ERROR, EventSource, NormalizedEvent,
};
use netpulse_core::metrics as m;
use netpulse_core::queue::EventSender;
use netpulse_core::stats::CollectorStats;
use netpulse_core::types::{DeviceConfig, Severity};

use crate::ber::Oid;
use crate::client::SnmpClient;
use crate::profile::{Anomaly, MetricMap, profile_for};

/// 이벤트 provider 필드 값
const PROVIDER: &str = "NetPulse-SNMP";

/// 한 폴링 사이클의 결과 스냅샷
///
/// 장비의 폴러 태스크만 쓰고, 하트비트/통계 경로는 복사본을 읽습니다.
#[derive(Debug, Clone, Serialize)]
pub struct PollSnapshot {
    /// 장비 이름
    pub device: String,
    /// 장비 IP
    pub ip: IpAddr,
    /// 해석된 메트릭
    pub metrics: MetricMap,
    /// 사이클 완료 시각
    pub timestamp: DateTime<Utc>,
    /// 사이클 소요 시간 (밀리초)
    pub poll_latency_ms: u64,
}

/// 장비 이름 → 최신 스냅샷 캐시
///
/// 장비마다 쓰기 주체는 자신의 폴러 하나뿐입니다.
pub type SnapshotCache = Arc<RwLock<HashMap<String, PollSnapshot>>>;

/// 새 스냅샷 캐시를 생성합니다.
pub fn new_snapshot_cache() -> SnapshotCache {
    Arc::new(RwLock::new(HashMap::new()))
}

/// 장비 하나의 폴링 루프
pub struct DevicePoller {
    device: DeviceConfig,
    config: SnmpConfig,
    oids: Vec<(String, Oid)>,
    events: EventSender,
    stats: Arc<CollectorStats>,
    cache: SnapshotCache,
}

impl DevicePoller {
    /// 폴러를 생성합니다.
    ///
    /// 프로파일 OID 테이블에 장비의 사용자 정의 OID를
    /// `custom_<n>` 이름으로 병합합니다. 파싱 불가능한 사용자 정의 OID는
    /// 경고를 남기고 건너뜁니다.
    pub fn new(
        device: DeviceConfig,
        config: SnmpConfig,
        events: EventSender,
        stats: Arc<CollectorStats>,
        cache: SnapshotCache,
    ) -> Self {
        let mut oids = profile_for(device.device_type).monitoring_oids();
        for (idx, raw) in device.custom_oids.iter().enumerate() {
            match Oid::parse(raw) {
                Ok(oid) => oids.push((format!("custom_{}", idx + 1), oid)),
                Err(_) => {
                    tracing::warn!(
                        device = %device.name,
                        oid = %raw,
                        "skipping unparsable custom oid"
                    );
                }
            }
        }
        Self {
            device,
            config,
            oids,
            events,
            stats,
            cache,
        }
    }

    /// 폴링 루프를 실행합니다. 종료 신호를 받으면 반환합니다.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        tracing::info!(device = %self.device.name, ip = %self.device.ip, "device poller started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.poll_once().await;
                }
                _ = shutdown.recv() => {
                    tracing::debug!(device = %self.device.name, "device poller shutting down");
                    break;
                }
            }
        }
    }

    /// 폴링 사이클 하나를 수행합니다.
    ///
    /// OID별 실패는 허용하고, 전체 실패 시에만 폴링 에러 이벤트를 만듭니다.
    pub async fn poll_once(&mut self) {
        self.stats.record_received();

        // v3 전용 장비: 코덱이 v2c만 지원하므로 이번 사이클은 건너뜀
        if self.device.v3.is_some() {
            tracing::warn!(
                device = %self.device.name,
                "snmpv3 usm not supported, skipping poll cycle"
            );
            self.stats.record_error();
            return;
        }

        let started = Instant::now();
        let target = SocketAddr::new(self.device.ip, self.device.port);
        let timeout = Duration::from_secs(self.config.timeout_secs);

        let mut client =
            match SnmpClient::connect(target, &self.device.community, timeout, self.config.retries)
                .await
            {
                Ok(client) => client,
                Err(e) => {
                    tracing::warn!(device = %self.device.name, error = %e, "snmp socket setup failed");
                    self.emit_poll_error(format!("socket setup failed: {e}")).await;
                    return;
                }
            };

        let profile = profile_for(self.device.device_type);
        let mut metrics = MetricMap::new();
        let mut failed_oids = 0usize;

        for (name, oid) in &self.oids {
            match client.get(oid).await {
                Ok(value) => {
                    for (metric_name, metric_value) in profile.parse_value(name, &value) {
                        metrics.insert(metric_name, metric_value);
                    }
                }
                Err(e) => {
                    // OID 하나의 실패는 나머지 OID 조회를 막지 않음
                    failed_oids += 1;
                    tracing::debug!(
                        device = %self.device.name,
                        oid = %oid,
                        error = %e,
                        "oid query failed"
                    );
                }
            }
        }

        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if metrics.is_empty() && failed_oids > 0 {
            tracing::warn!(
                device = %self.device.name,
                failed_oids,
                "device unreachable for entire poll cycle"
            );
            self.emit_poll_error(format!(
                "device unreachable: all {failed_oids} oid queries failed"
            ))
            .await;
            return;
        }

        self.stats.record_parsed();
        metrics::counter!(m::SNMP_POLLS_TOTAL, m::LABEL_DEVICE => self.device.name.clone())
            .increment(1);

        let snapshot = PollSnapshot {
            device: self.device.name.clone(),
            ip: self.device.ip,
            metrics: metrics.clone(),
            timestamp: Utc::now(),
            poll_latency_ms: latency_ms,
        };
        self.cache
            .write()
            .await
            .insert(self.device.name.clone(), snapshot);

        let anomalies = profile.detect_anomaly(&metrics, &self.config.thresholds);

        self.emit_metrics_event(&metrics, latency_ms).await;
        for anomaly in anomalies {
            metrics::counter!(m::SNMP_ANOMALIES_TOTAL, m::LABEL_DEVICE => self.device.name.clone())
                .increment(1);
            self.emit_anomaly_event(anomaly).await;
        }
    }

    /// 메트릭 스냅샷 이벤트(코드 1000)를 큐에 넣습니다.
    async fn emit_metrics_event(&self, metrics: &MetricMap, latency_ms: u64) {
        let mut event = NormalizedEvent::new(EventSource::NetworkDevice, CODE_METRICS, Severity::Info)
            .with_computer(&self.device.name)
            .with_ip(self.device.ip.to_string())
            .with_provider(PROVIDER)
            .with_channel("network")
            .with_message(format!(
                "metrics snapshot for {} ({} values)",
                self.device.name,
                metrics.len()
            ))
            .with_data("device_type", self.device.device_type.to_string())
            .with_data("poll_latency_ms", latency_ms);
        for (name, value) in metrics {
            event = event.with_data(name.clone(), value.to_json());
        }
        self.enqueue(event).await;
    }

    /// 이상 징후 이벤트(코드 2000+심각도)를 큐에 넣습니다.
    async fn emit_anomaly_event(&self, anomaly: Anomaly) {
        let event = NormalizedEvent::new(
            EventSource::NetworkDevice,
            CODE_ANOMALY_BASE + u32::from(anomaly.severity.level()),
            anomaly.severity,
        )
        .with_computer(&self.device.name)
        .with_ip(self.device.ip.to_string())
        .with_provider(PROVIDER)
        .with_channel("network")
        .with_message(anomaly.message.clone())
        .with_data("device_type", self.device.device_type.to_string())
        .with_data("anomaly_type", anomaly.anomaly_type)
        .with_data("value", anomaly.value)
        .with_data("threshold", anomaly.threshold);
        self.enqueue(event).await;
    }

    /// 장비 전체 폴링 실패 이벤트(코드 3000, 심각도 4)를 큐에 넣습니다.
    async fn emit_poll_error(&self, reason: String) {
        self.stats.record_error();
        metrics::counter!(m::SNMP_POLL_ERRORS_TOTAL, m::LABEL_DEVICE => self.device.name.clone())
            .increment(1);
        let event = NormalizedEvent::new(EventSource::NetworkDevice, CODE_POLL_ERROR, Severity::High)
            .with_computer(&self.device.name)
            .with_ip(self.device.ip.to_string())
            .with_provider(PROVIDER)
            .with_channel("network")
            .with_message(reason)
            .with_data("device_type", self.device.device_type.to_string());
        self.enqueue(event).await;
    }

    async fn enqueue(&self, event: NormalizedEvent) {
        if let Err(e) = self.events.send(event).await {
            tracing::error!(device = %self.device.name, error = %e, "event queue closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netpulse_core::types::DeviceType;

    fn make_device(device_type: DeviceType, custom_oids: Vec<String>) -> DeviceConfig {
        DeviceConfig {
            name: "test-device".to_owned(),
            ip: "127.0.0.1".parse().unwrap(),
            port: 16161,
            device_type,
            community: "public".to_owned(),
            v3: None,
            enabled: true,
            custom_oids,
        }
    }

    #[test]
    fn custom_oids_merge_under_synthetic_names() {
        let (events, _rx) = netpulse_core::queue::bounded(16);
        let stats = Arc::new(CollectorStats::new("snmp"));
        let poller = DevicePoller::new(
            make_device(
                DeviceType::Unknown,
                vec!["1.3.6.1.4.1.2021.4.5.0".to_owned(), "garbage".to_owned()],
            ),
            SnmpConfig::default(),
            events,
            stats,
            new_snapshot_cache(),
        );
        // 기본 3개 + 유효한 custom 1개 (깨진 OID는 건너뜀)
        assert_eq!(poller.oids.len(), 4);
        assert_eq!(poller.oids[3].0, "custom_1");
    }

    #[tokio::test]
    async fn v3_device_is_skipped_with_error_counted() {
        let (events, mut rx) = netpulse_core::queue::bounded(16);
        let stats = Arc::new(CollectorStats::new("snmp"));
        let mut device = make_device(DeviceType::Switch, Vec::new());
        device.v3 = Some(netpulse_core::types::SnmpV3Credentials {
            username: "ops".to_owned(),
            auth_protocol: "sha".to_owned(),
            auth_password: "secret".to_owned(),
            priv_protocol: String::new(),
            priv_password: String::new(),
        });
        let mut poller = DevicePoller::new(
            device,
            SnmpConfig::default(),
            events,
            Arc::clone(&stats),
            new_snapshot_cache(),
        );

        poller.poll_once().await;

        let snap = stats.snapshot();
        assert_eq!(snap.received, 1);
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.parsed, 0);
        // 이벤트는 만들어지지 않음
        drop(poller);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn unreachable_device_emits_single_poll_error_event() {
        let (events, mut rx) = netpulse_core::queue::bounded(16);
        let stats = Arc::new(CollectorStats::new("snmp"));
        let mut config = SnmpConfig::default();
        config.timeout_secs = 1;
        config.retries = 0;
        // 응답할 에이전트가 없는 포트
        let mut poller = DevicePoller::new(
            make_device(DeviceType::Switch, Vec::new()),
            config,
            events,
            Arc::clone(&stats),
            new_snapshot_cache(),
        );

        poller.poll_once().await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_code, CODE_POLL_ERROR);
        assert_eq!(event.severity, Severity::High);
        assert_eq!(event.computer, "test-device");
        assert_eq!(stats.snapshot().errors, 1);

        // 이벤트는 정확히 하나
        drop(poller);
        assert!(rx.recv().await.is_none());
    }
}
