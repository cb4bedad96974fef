//! NetFlow/IPFIX UDP 수집기 태스크
//!
//! UDP 데이터그램을 수신해 디코딩하고, 플로우마다 의심 휴리스틱을
//! 평가한 뒤 정규화 이벤트로 변환합니다. 템플릿 캐시는 이 태스크가
//! 단독으로 소유합니다 — 외부에서 쓰는 경로가 없습니다.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use netpulse_core::event::{CODE_FLOW, CODE_FLOW_SUSPICIOUS, EventSource, NormalizedEvent};
use netpulse_core::metrics as m;
use netpulse_core::queue::EventSender;
use netpulse_core::stats::CollectorStats;
use netpulse_core::types::Severity;

use crate::decode::{FlowRecord, decode_packet};
use crate::error::FlowError;
use crate::template::TemplateCache;

/// 이벤트 provider 필드 값
const PROVIDER: &str = "NetPulse-NetFlow";

/// 수신 버퍼 크기
const RECV_BUFFER_SIZE: usize = 65_535;

/// 의심 바이트 임계값 — 단일 플로우 100 MiB 초과
const SUSPICIOUS_BYTES: u64 = 100 * 1024 * 1024;

/// 민감 목적지 포트 집합
const SENSITIVE_PORTS: [u16; 7] = [22, 23, 3389, 445, 139, 1433, 3306];

/// 스캔 의심 판단 기준: 패킷 수 하한
const SCAN_MIN_PACKETS: u64 = 100;
/// 스캔 의심 판단 기준: 패킷당 평균 페이로드 상한 (바이트)
const SCAN_MAX_AVG_PAYLOAD: u64 = 100;

/// 플로우 의심 휴리스틱
///
/// 다음 중 하나면 의심으로 판정합니다:
/// - 전송량이 100 MiB를 초과
/// - 목적지 포트가 민감 포트 집합에 포함
/// - 패킷 100개 초과이면서 평균 페이로드가 100바이트 미만 (스캔 패턴)
pub fn is_suspicious(record: &FlowRecord) -> bool {
    if record.bytes > SUSPICIOUS_BYTES {
        return true;
    }
    if SENSITIVE_PORTS.contains(&record.dst_port) {
        return true;
    }
    if record.packets > SCAN_MIN_PACKETS && record.bytes / record.packets < SCAN_MAX_AVG_PAYLOAD {
        return true;
    }
    false
}

/// NetFlow/IPFIX UDP 수집기
pub struct FlowCollector {
    socket: UdpSocket,
    templates: TemplateCache,
    events: EventSender,
    stats: Arc<CollectorStats>,
}

impl FlowCollector {
    /// 소켓을 바인드하고 수집기를 생성합니다.
    pub async fn bind(
        bind: SocketAddr,
        events: EventSender,
        stats: Arc<CollectorStats>,
    ) -> Result<Self, FlowError> {
        let socket = UdpSocket::bind(bind).await?;
        Ok(Self {
            socket,
            templates: TemplateCache::new(),
            events,
            stats,
        })
    }

    /// 실제 바인드된 주소를 반환합니다.
    pub fn local_addr(&self) -> Result<SocketAddr, FlowError> {
        Ok(self.socket.local_addr()?)
    }

    /// 수신 루프를 실행합니다. 종료 신호를 받으면 소켓을 놓고 반환합니다.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<(), FlowError> {
        tracing::info!(bind = %self.socket.local_addr()?, "netflow collector started");

        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, peer)) => {
                            self.handle_datagram(&buf[..len], peer).await;
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "netflow socket recv failed");
                            self.stats.record_error();
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("netflow collector shutting down");
                    break;
                }
            }
        }
        Ok(())
    }

    /// 데이터그램 하나를 처리합니다.
    ///
    /// 디코딩 실패는 패킷 드롭 + 에러 카운터로 끝나며,
    /// 다음 데이터그램 처리에 영향을 주지 않습니다.
    async fn handle_datagram(&mut self, datagram: &[u8], peer: SocketAddr) {
        self.stats.record_received();
        metrics::counter!(m::NETFLOW_PACKETS_TOTAL).increment(1);

        let outcome = match decode_packet(peer.ip(), datagram, &mut self.templates) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.stats.record_error();
                tracing::debug!(exporter = %peer.ip(), error = %e, "undecodable flow packet dropped");
                return;
            }
        };

        if outcome.templates_added > 0 {
            metrics::gauge!(m::NETFLOW_TEMPLATES_CACHED).set(self.templates.len() as f64);
        }
        if outcome.missing_template_drops > 0 {
            // Data FlowSet이 Template FlowSet보다 먼저 도착한 경우 — 드롭하고 집계
            for _ in 0..outcome.missing_template_drops {
                self.stats.record_dropped();
            }
            metrics::counter!(m::NETFLOW_MISSING_TEMPLATE_TOTAL)
                .increment(outcome.missing_template_drops as u64);
            tracing::debug!(
                exporter = %peer.ip(),
                drops = outcome.missing_template_drops,
                "data flowset(s) dropped, template not yet cached"
            );
        }

        for mut record in outcome.records {
            record.is_suspicious = is_suspicious(&record);
            self.stats.record_parsed();
            metrics::counter!(m::NETFLOW_RECORDS_TOTAL).increment(1);
            let event = flow_to_event(&record, peer.ip());
            if let Err(e) = self.events.send(event).await {
                tracing::error!(error = %e, "event queue closed");
                return;
            }
        }
    }
}

/// 플로우 레코드를 정규화 이벤트로 변환합니다.
///
/// 의심 플로우는 코드 5001/심각도 3, 정상 플로우는 코드 5000/심각도 1입니다.
pub fn flow_to_event(record: &FlowRecord, exporter: std::net::IpAddr) -> NormalizedEvent {
    let (code, severity) = if record.is_suspicious {
        (CODE_FLOW_SUSPICIOUS, Severity::Medium)
    } else {
        (CODE_FLOW, Severity::Info)
    };
    NormalizedEvent::new(EventSource::NetFlow, code, severity)
        .with_computer(exporter.to_string())
        .with_ip(exporter.to_string())
        .with_provider(PROVIDER)
        .with_channel("network")
        .with_message(format!(
            "flow {}:{} -> {}:{} proto={} bytes={}",
            record.src_addr,
            record.src_port,
            record.dst_addr,
            record.dst_port,
            record.protocol,
            record.bytes,
        ))
        .with_data("flow_version", record.version)
        .with_data("src_addr", record.src_addr.to_string())
        .with_data("src_port", record.src_port)
        .with_data("dst_addr", record.dst_addr.to_string())
        .with_data("dst_port", record.dst_port)
        .with_data("protocol", record.protocol)
        .with_data("bytes", record.bytes)
        .with_data("packets", record.packets)
        .with_data("flow_timestamp", record.timestamp.to_rfc3339())
}
