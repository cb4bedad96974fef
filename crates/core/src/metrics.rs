//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 수집기는 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `netpulse_`
//! - 수집기명: `snmp_`, `trap_`, `syslog_`, `netflow_`, `export_`
//! - 접미어: `_total` (counter), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 장비 이름 레이블 키
pub const LABEL_DEVICE: &str = "device";

/// 심각도 레이블 키 (1~5)
pub const LABEL_SEVERITY: &str = "severity";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── SNMP 폴링 메트릭 ──────────────────────────────────────────────

/// SNMP: 완료된 폴링 사이클 수 (counter, label: device)
pub const SNMP_POLLS_TOTAL: &str = "netpulse_snmp_polls_total";

/// SNMP: 폴링 실패 수 (counter, label: device)
pub const SNMP_POLL_ERRORS_TOTAL: &str = "netpulse_snmp_poll_errors_total";

/// SNMP: 탐지된 이상 징후 수 (counter, label: device)
pub const SNMP_ANOMALIES_TOTAL: &str = "netpulse_snmp_anomalies_total";

// ─── SNMP 트랩 메트릭 ──────────────────────────────────────────────

/// Trap: 수신한 트랩 수 (counter)
pub const TRAP_RECEIVED_TOTAL: &str = "netpulse_trap_received_total";

/// Trap: 디코딩 실패 수 (counter)
pub const TRAP_DECODE_ERRORS_TOTAL: &str = "netpulse_trap_decode_errors_total";

// ─── Syslog 메트릭 ─────────────────────────────────────────────────

/// Syslog: 수신한 메시지 수 (counter)
pub const SYSLOG_MESSAGES_TOTAL: &str = "netpulse_syslog_messages_total";

/// Syslog: 파싱 실패 수 (counter)
pub const SYSLOG_PARSE_ERRORS_TOTAL: &str = "netpulse_syslog_parse_errors_total";

/// Syslog: 소스 정책으로 거부된 메시지 수 (counter)
pub const SYSLOG_REJECTED_TOTAL: &str = "netpulse_syslog_rejected_total";

// ─── NetFlow 메트릭 ────────────────────────────────────────────────

/// NetFlow: 수신한 패킷 수 (counter)
pub const NETFLOW_PACKETS_TOTAL: &str = "netpulse_netflow_packets_total";

/// NetFlow: 디코딩된 플로우 레코드 수 (counter)
pub const NETFLOW_RECORDS_TOTAL: &str = "netpulse_netflow_records_total";

/// NetFlow: 템플릿 부재로 드롭된 Data FlowSet 수 (counter)
pub const NETFLOW_MISSING_TEMPLATE_TOTAL: &str = "netpulse_netflow_missing_template_total";

/// NetFlow: 캐시된 템플릿 수 (gauge)
pub const NETFLOW_TEMPLATES_CACHED: &str = "netpulse_netflow_templates_cached";

// ─── 전송 경로 메트릭 ──────────────────────────────────────────────

/// Export: 전송된 배치 수 (counter, label: result)
pub const EXPORT_BATCHES_TOTAL: &str = "netpulse_export_batches_total";

/// Export: 전송 성공한 이벤트 수 (counter)
pub const EXPORT_EVENTS_SENT_TOTAL: &str = "netpulse_export_events_sent_total";

/// Export: 현재 이벤트 큐 깊이 (gauge)
pub const EXPORT_QUEUE_DEPTH: &str = "netpulse_export_queue_depth";

/// Export: 전송된 하트비트 수 (counter, label: result)
pub const EXPORT_HEARTBEATS_TOTAL: &str = "netpulse_export_heartbeats_total";

// ─── 데몬 메트릭 ───────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "netpulse_daemon_uptime_seconds";

/// Daemon: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "netpulse_daemon_build_info";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 데몬 시작 시점에 한 번만 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        SNMP_POLLS_TOTAL,
        "Total number of completed SNMP poll cycles per device"
    );
    describe_counter!(
        SNMP_POLL_ERRORS_TOTAL,
        "Total number of failed SNMP poll cycles per device"
    );
    describe_counter!(
        SNMP_ANOMALIES_TOTAL,
        "Total number of anomalies detected by device profiles"
    );

    describe_counter!(TRAP_RECEIVED_TOTAL, "Total number of SNMP traps received");
    describe_counter!(
        TRAP_DECODE_ERRORS_TOTAL,
        "Total number of malformed SNMP traps"
    );

    describe_counter!(
        SYSLOG_MESSAGES_TOTAL,
        "Total number of syslog messages received"
    );
    describe_counter!(
        SYSLOG_PARSE_ERRORS_TOTAL,
        "Total number of syslog parse failures"
    );
    describe_counter!(
        SYSLOG_REJECTED_TOTAL,
        "Total number of syslog messages rejected by source policy"
    );

    describe_counter!(
        NETFLOW_PACKETS_TOTAL,
        "Total number of NetFlow/IPFIX export packets received"
    );
    describe_counter!(
        NETFLOW_RECORDS_TOTAL,
        "Total number of flow records decoded"
    );
    describe_counter!(
        NETFLOW_MISSING_TEMPLATE_TOTAL,
        "Total number of data flowsets dropped because no template was cached"
    );
    describe_gauge!(
        NETFLOW_TEMPLATES_CACHED,
        "Number of NetFlow/IPFIX templates currently cached"
    );

    describe_counter!(
        EXPORT_BATCHES_TOTAL,
        "Total number of event batch submissions by result"
    );
    describe_counter!(
        EXPORT_EVENTS_SENT_TOTAL,
        "Total number of events successfully forwarded to the ingest API"
    );
    describe_gauge!(EXPORT_QUEUE_DEPTH, "Current event queue depth");
    describe_counter!(
        EXPORT_HEARTBEATS_TOTAL,
        "Total number of heartbeat submissions by result"
    );

    describe_gauge!(DAEMON_UPTIME_SECONDS, "Netpulse daemon uptime in seconds");
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version label)"
    );
}
