//! 설정 관리 — netpulse.toml 파싱 및 런타임 설정
//!
//! [`NetpulseConfig`]는 에이전트 전체의 설정을 담는 최상위 구조체입니다.
//! 시작 시 한 번 로드/검증되며, 검증 실패는 치명적입니다
//! (리스너가 하나라도 열리기 전에 프로세스가 종료됩니다).
//!
//! # 설정 로딩 우선순위
//! 1. 환경변수 (`NETPULSE_INGEST_ENDPOINT=...` 형식)
//! 2. 설정 파일 (`netpulse.toml`)
//! 3. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), netpulse_core::error::NetpulseError> {
//! use netpulse_core::config::NetpulseConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = NetpulseConfig::load("netpulse.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = NetpulseConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, NetpulseError};
use crate::types::DeviceConfig;

/// Netpulse 통합 설정
///
/// `netpulse.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 수집기는 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetpulseConfig {
    /// 일반 설정 (로깅)
    #[serde(default)]
    pub general: GeneralConfig,
    /// 에이전트 식별 설정
    #[serde(default)]
    pub agent: AgentConfig,
    /// 수집 API 전송 설정
    #[serde(default)]
    pub ingest: IngestConfig,
    /// SNMP 폴링/트랩 설정
    #[serde(default)]
    pub snmp: SnmpConfig,
    /// Syslog 수신 설정
    #[serde(default)]
    pub syslog: SyslogConfig,
    /// NetFlow/IPFIX 수신 설정
    #[serde(default)]
    pub netflow: NetflowConfig,
    /// 장비 디스커버리 설정
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// 성능 관련 설정
    #[serde(default)]
    pub performance: PerformanceConfig,
    /// Prometheus 메트릭 노출 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// 모니터링 대상 장비 목록
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

impl NetpulseConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, NetpulseError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, NetpulseError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                NetpulseError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                NetpulseError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, NetpulseError> {
        toml::from_str(toml_str).map_err(|e| {
            NetpulseError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `NETPULSE_{SECTION}_{FIELD}`
    /// 예: `NETPULSE_INGEST_ENDPOINT=https://siem.example.com`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "NETPULSE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "NETPULSE_GENERAL_LOG_FORMAT");

        // Agent
        override_string(&mut self.agent.id, "NETPULSE_AGENT_ID");
        override_string(&mut self.agent.hostname, "NETPULSE_AGENT_HOSTNAME");

        // Ingest
        override_string(&mut self.ingest.endpoint, "NETPULSE_INGEST_ENDPOINT");
        override_string(&mut self.ingest.api_key, "NETPULSE_INGEST_API_KEY");
        override_u64(&mut self.ingest.timeout_secs, "NETPULSE_INGEST_TIMEOUT_SECS");
        override_u32(
            &mut self.ingest.register_retries,
            "NETPULSE_INGEST_REGISTER_RETRIES",
        );
        override_usize(&mut self.ingest.batch_size, "NETPULSE_INGEST_BATCH_SIZE");
        override_u64(
            &mut self.ingest.flush_interval_secs,
            "NETPULSE_INGEST_FLUSH_INTERVAL_SECS",
        );
        override_u64(
            &mut self.ingest.heartbeat_interval_secs,
            "NETPULSE_INGEST_HEARTBEAT_INTERVAL_SECS",
        );

        // SNMP
        override_u64(
            &mut self.snmp.poll_interval_secs,
            "NETPULSE_SNMP_POLL_INTERVAL_SECS",
        );
        override_u64(&mut self.snmp.timeout_secs, "NETPULSE_SNMP_TIMEOUT_SECS");
        override_u32(&mut self.snmp.retries, "NETPULSE_SNMP_RETRIES");
        override_bool(&mut self.snmp.trap_enabled, "NETPULSE_SNMP_TRAP_ENABLED");
        override_string(&mut self.snmp.trap_bind, "NETPULSE_SNMP_TRAP_BIND");

        // Syslog
        override_bool(&mut self.syslog.udp_enabled, "NETPULSE_SYSLOG_UDP_ENABLED");
        override_string(&mut self.syslog.udp_bind, "NETPULSE_SYSLOG_UDP_BIND");
        override_bool(&mut self.syslog.tcp_enabled, "NETPULSE_SYSLOG_TCP_ENABLED");
        override_string(&mut self.syslog.tcp_bind, "NETPULSE_SYSLOG_TCP_BIND");
        override_string(&mut self.syslog.format, "NETPULSE_SYSLOG_FORMAT");
        override_csv(
            &mut self.syslog.allow_sources,
            "NETPULSE_SYSLOG_ALLOW_SOURCES",
        );
        override_csv(
            &mut self.syslog.block_sources,
            "NETPULSE_SYSLOG_BLOCK_SOURCES",
        );
        override_bool(
            &mut self.syslog.accept_known_devices,
            "NETPULSE_SYSLOG_ACCEPT_KNOWN_DEVICES",
        );

        // NetFlow
        override_bool(&mut self.netflow.enabled, "NETPULSE_NETFLOW_ENABLED");
        override_string(&mut self.netflow.bind, "NETPULSE_NETFLOW_BIND");

        // Discovery
        override_bool(&mut self.discovery.enabled, "NETPULSE_DISCOVERY_ENABLED");
        override_string(&mut self.discovery.cidr, "NETPULSE_DISCOVERY_CIDR");
        override_usize(
            &mut self.discovery.max_concurrency,
            "NETPULSE_DISCOVERY_MAX_CONCURRENCY",
        );

        // Performance
        override_usize(
            &mut self.performance.max_queue_size,
            "NETPULSE_PERFORMANCE_MAX_QUEUE_SIZE",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "NETPULSE_METRICS_ENABLED");
        override_string(&mut self.metrics.bind, "NETPULSE_METRICS_BIND");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), NetpulseError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if !self.ingest.endpoint.starts_with("http://")
            && !self.ingest.endpoint.starts_with("https://")
        {
            return Err(invalid(
                "ingest.endpoint",
                "must start with http:// or https://",
            ));
        }

        const MAX_BATCH_SIZE: usize = 100_000;
        if self.ingest.batch_size == 0 || self.ingest.batch_size > MAX_BATCH_SIZE {
            return Err(invalid(
                "ingest.batch_size",
                format!("must be 1-{MAX_BATCH_SIZE}"),
            ));
        }

        const MAX_FLUSH_INTERVAL_SECS: u64 = 3600;
        if self.ingest.flush_interval_secs == 0
            || self.ingest.flush_interval_secs > MAX_FLUSH_INTERVAL_SECS
        {
            return Err(invalid(
                "ingest.flush_interval_secs",
                format!("must be 1-{MAX_FLUSH_INTERVAL_SECS}"),
            ));
        }

        if self.ingest.heartbeat_interval_secs == 0 {
            return Err(invalid(
                "ingest.heartbeat_interval_secs",
                "must be greater than 0",
            ));
        }

        if self.ingest.timeout_secs == 0 {
            return Err(invalid("ingest.timeout_secs", "must be greater than 0"));
        }

        if self.snmp.poll_interval_secs == 0 {
            return Err(invalid("snmp.poll_interval_secs", "must be greater than 0"));
        }

        if self.snmp.timeout_secs == 0 {
            return Err(invalid("snmp.timeout_secs", "must be greater than 0"));
        }

        if self.snmp.trap_enabled {
            validate_bind("snmp.trap_bind", &self.snmp.trap_bind)?;
        }

        self.snmp.thresholds.validate()?;

        if self.syslog.udp_enabled {
            validate_bind("syslog.udp_bind", &self.syslog.udp_bind)?;
        }
        if self.syslog.tcp_enabled {
            validate_bind("syslog.tcp_bind", &self.syslog.tcp_bind)?;
        }
        let valid_syslog_formats = ["auto", "rfc5424", "rfc3164"];
        if !valid_syslog_formats.contains(&self.syslog.format.as_str()) {
            return Err(invalid(
                "syslog.format",
                format!("must be one of: {}", valid_syslog_formats.join(", ")),
            ));
        }
        for source in self
            .syslog
            .allow_sources
            .iter()
            .chain(self.syslog.block_sources.iter())
        {
            if source.parse::<std::net::IpAddr>().is_err() {
                return Err(invalid(
                    "syslog.allow_sources/block_sources",
                    format!("'{source}' is not a valid IP address"),
                ));
            }
        }

        if self.netflow.enabled {
            validate_bind("netflow.bind", &self.netflow.bind)?;
        }

        if self.discovery.enabled {
            validate_cidr("discovery.cidr", &self.discovery.cidr)?;
            if self.discovery.max_concurrency == 0 {
                return Err(invalid(
                    "discovery.max_concurrency",
                    "must be greater than 0",
                ));
            }
        }

        if self.performance.max_queue_size == 0 {
            return Err(invalid(
                "performance.max_queue_size",
                "must be greater than 0",
            ));
        }

        if self.metrics.enabled {
            validate_bind("metrics.bind", &self.metrics.bind)?;
        }

        for device in &self.devices {
            if device.name.is_empty() {
                return Err(invalid("devices.name", "device name must not be empty"));
            }
            if device.community.is_empty() && device.v3.is_none() {
                return Err(invalid(
                    "devices.community",
                    format!(
                        "device '{}' must have a community string or v3 credentials",
                        device.name
                    ),
                ));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> NetpulseError {
    NetpulseError::Config(ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    })
}

fn validate_bind(field: &str, bind: &str) -> Result<(), NetpulseError> {
    bind.parse::<SocketAddr>().map(|_| ()).map_err(|_| {
        invalid(
            field,
            format!("'{bind}' is not a valid socket address (expected ip:port)"),
        )
    })
}

fn validate_cidr(field: &str, cidr: &str) -> Result<(), NetpulseError> {
    let Some((addr, prefix)) = cidr.split_once('/') else {
        return Err(invalid(
            field,
            format!("'{cidr}' is not CIDR notation (expected a.b.c.d/len)"),
        ));
    };
    if addr.parse::<std::net::Ipv4Addr>().is_err() {
        return Err(invalid(
            field,
            format!("'{addr}' is not a valid IPv4 address"),
        ));
    }
    match prefix.parse::<u8>() {
        Ok(len) if len <= 32 => Ok(()),
        _ => Err(invalid(
            field,
            format!("'{prefix}' is not a valid prefix length (0-32)"),
        )),
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 에이전트 식별 설정
///
/// 비어 있으면 시작 시점에 런타임 기본값이 채워집니다
/// (id는 UUID v4, hostname은 OS 호스트명).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// 에이전트 고유 ID (비워두면 UUID v4 자동 생성)
    pub id: String,
    /// 에이전트 호스트명 (비워두면 환경에서 결정)
    pub hostname: String,
}

/// 수집 API 전송 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// 수집 API 베이스 URL
    pub endpoint: String,
    /// API 키 (비어 있으면 헤더 생략)
    pub api_key: String,
    /// HTTP 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 에이전트 등록 재시도 횟수
    pub register_retries: u32,
    /// 배치 플러시 크기
    pub batch_size: usize,
    /// 배치 플러시 간격 (초)
    pub flush_interval_secs: u64,
    /// 하트비트 주기 (초)
    pub heartbeat_interval_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080".to_owned(),
            api_key: String::new(),
            timeout_secs: 10,
            register_retries: 3,
            batch_size: 100,
            flush_interval_secs: 30,
            heartbeat_interval_secs: 60,
        }
    }
}

/// 이상 탐지 임계값
///
/// 비교는 엄격 부등호로 수행됩니다. 예를 들어 toner_percent가 20이면
/// 토너 잔량 19에서 이상 징후가 발생하고, 정확히 20에서는 발생하지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyThresholds {
    /// CPU 사용률 상한 (%)
    pub cpu_percent: i64,
    /// 메모리 사용률 상한 (%)
    pub memory_percent: i64,
    /// 토너/잉크 잔량 하한 (%)
    pub toner_percent: i64,
    /// UPS 배터리 잔량 하한 (%)
    pub battery_percent: i64,
    /// UPS 부하율 상한 (%)
    pub load_percent: i64,
    /// 온도 상한 (섭씨)
    pub temperature_celsius: i64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            cpu_percent: 80,
            memory_percent: 90,
            toner_percent: 20,
            battery_percent: 30,
            load_percent: 80,
            temperature_celsius: 45,
        }
    }
}

impl AnomalyThresholds {
    /// 퍼센트 임계값이 0~100 범위인지 검증합니다.
    pub fn validate(&self) -> Result<(), NetpulseError> {
        let percents = [
            ("snmp.thresholds.cpu_percent", self.cpu_percent),
            ("snmp.thresholds.memory_percent", self.memory_percent),
            ("snmp.thresholds.toner_percent", self.toner_percent),
            ("snmp.thresholds.battery_percent", self.battery_percent),
            ("snmp.thresholds.load_percent", self.load_percent),
        ];
        for (field, value) in percents {
            if !(0..=100).contains(&value) {
                return Err(invalid(field, "must be 0-100"));
            }
        }
        Ok(())
    }
}

/// SNMP 폴링/트랩 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnmpConfig {
    /// 장비당 폴링 주기 (초)
    pub poll_interval_secs: u64,
    /// OID별 응답 대기 타임아웃 (초)
    pub timeout_secs: u64,
    /// OID별 재시도 횟수 (타임아웃 시)
    pub retries: u32,
    /// 트랩 수신기 활성화 여부
    pub trap_enabled: bool,
    /// 트랩 수신 바인드 주소
    pub trap_bind: String,
    /// 이상 탐지 임계값
    pub thresholds: AnomalyThresholds,
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            timeout_secs: 2,
            retries: 1,
            trap_enabled: true,
            trap_bind: "0.0.0.0:162".to_owned(),
            thresholds: AnomalyThresholds::default(),
        }
    }
}

/// Syslog 수신 설정
///
/// 소스 정책은 기본 거부(default-deny)입니다. allow_sources에 있거나,
/// accept_known_devices가 켜져 있고 `[[devices]]`에 선언된 IP인 경우에만
/// 수신하며, block_sources는 항상 우선 거부됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyslogConfig {
    /// UDP 리스너 활성화 여부
    pub udp_enabled: bool,
    /// UDP 바인드 주소
    pub udp_bind: String,
    /// TCP 리스너 활성화 여부
    pub tcp_enabled: bool,
    /// TCP 바인드 주소
    pub tcp_bind: String,
    /// 메시지 형식 (auto, rfc5424, rfc3164)
    ///
    /// auto는 RFC 5424를 먼저 시도하고 실패 시 RFC 3164로 폴백합니다.
    pub format: String,
    /// 허용 소스 IP 목록
    pub allow_sources: Vec<String>,
    /// 차단 소스 IP 목록 (항상 우선)
    pub block_sources: Vec<String>,
    /// `[[devices]]`에 선언된 장비 IP를 허용할지 여부
    pub accept_known_devices: bool,
    /// 메시지 최대 크기 (바이트)
    pub max_message_size: usize,
}

impl Default for SyslogConfig {
    fn default() -> Self {
        Self {
            udp_enabled: true,
            udp_bind: "0.0.0.0:514".to_owned(),
            tcp_enabled: false,
            tcp_bind: "0.0.0.0:514".to_owned(),
            format: "auto".to_owned(),
            allow_sources: Vec::new(),
            block_sources: Vec::new(),
            accept_known_devices: true,
            max_message_size: 64 * 1024,
        }
    }
}

/// NetFlow/IPFIX 수신 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetflowConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// UDP 바인드 주소
    pub bind: String,
}

impl Default for NetflowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "0.0.0.0:2055".to_owned(),
        }
    }
}

/// 장비 디스커버리 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 스캔 대상 CIDR 블록 (예: "192.168.10.0/24")
    pub cidr: String,
    /// 동시 프로브 상한
    pub max_concurrency: usize,
    /// ping 타임아웃 (초)
    pub ping_timeout_secs: u64,
    /// 핑거프린트용 SNMP 커뮤니티
    pub community: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cidr: String::new(),
            max_concurrency: 32,
            ping_timeout_secs: 1,
            community: "public".to_owned(),
        }
    }
}

/// 성능 관련 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// 이벤트 큐 최대 용량 (가득 차면 생산자가 대기)
    pub max_queue_size: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 10_000,
        }
    }
}

/// Prometheus 메트릭 노출 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 메트릭 HTTP 리스너 바인드 주소
    pub bind: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: "127.0.0.1:9184".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split(',').map(|s| s.trim().to_owned()).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeviceType;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = NetpulseConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.ingest.batch_size, 100);
        assert_eq!(config.ingest.flush_interval_secs, 30);
        assert_eq!(config.snmp.poll_interval_secs, 60);
        assert!(config.syslog.udp_enabled);
        assert!(config.netflow.enabled);
        assert!(!config.discovery.enabled);
        assert_eq!(config.performance.max_queue_size, 10_000);
        assert!(config.devices.is_empty());
    }

    #[test]
    fn default_config_passes_validation() {
        NetpulseConfig::default().validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = NetpulseConfig::parse("").unwrap();
        assert_eq!(config.ingest.endpoint, "http://127.0.0.1:8080");
        assert_eq!(config.netflow.bind, "0.0.0.0:2055");
    }

    #[test]
    fn parse_partial_toml_merges_with_defaults() {
        let toml = r#"
[general]
log_level = "debug"

[ingest]
endpoint = "https://siem.example.com"
batch_size = 250
"#;
        let config = NetpulseConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        // log_format은 기본값 유지
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.ingest.endpoint, "https://siem.example.com");
        assert_eq!(config.ingest.batch_size, 250);
        assert_eq!(config.ingest.flush_interval_secs, 30);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[general]
log_level = "warn"
log_format = "pretty"

[agent]
id = "agent-7f3a"
hostname = "collector-01"

[ingest]
endpoint = "https://siem.example.com"
api_key = "secret"
timeout_secs = 5
batch_size = 500
flush_interval_secs = 15
heartbeat_interval_secs = 30

[snmp]
poll_interval_secs = 30
timeout_secs = 3
retries = 2
trap_bind = "0.0.0.0:1162"

[snmp.thresholds]
cpu_percent = 75
toner_percent = 15

[syslog]
udp_bind = "0.0.0.0:5514"
tcp_enabled = true
tcp_bind = "0.0.0.0:5514"
allow_sources = ["10.0.0.5"]
block_sources = ["10.0.0.66"]

[netflow]
bind = "0.0.0.0:9995"

[discovery]
enabled = true
cidr = "192.168.10.0/24"
max_concurrency = 16

[performance]
max_queue_size = 5000

[metrics]
enabled = true
bind = "127.0.0.1:9100"

[[devices]]
name = "core-sw-01"
ip = "192.168.10.2"
device_type = "switch"

[[devices]]
name = "ups-01"
ip = "192.168.10.40"
device_type = "ups"
community = "ops"
"#;
        let config = NetpulseConfig::parse(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.agent.id, "agent-7f3a");
        assert_eq!(config.snmp.thresholds.cpu_percent, 75);
        assert_eq!(config.snmp.thresholds.toner_percent, 15);
        // 지정하지 않은 임계값은 기본값 유지
        assert_eq!(config.snmp.thresholds.battery_percent, 30);
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[0].device_type, DeviceType::Switch);
        assert_eq!(config.devices[1].community, "ops");
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let result = NetpulseConfig::parse("invalid = [[[toml");
        assert!(matches!(
            result.unwrap_err(),
            NetpulseError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = NetpulseConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_bad_endpoint() {
        let mut config = NetpulseConfig::default();
        config.ingest.endpoint = "siem.example.com".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("endpoint"));
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let mut config = NetpulseConfig::default();
        config.ingest.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_bind() {
        let mut config = NetpulseConfig::default();
        config.netflow.bind = "not-an-addr".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("netflow.bind"));
    }

    #[test]
    fn validate_skips_bind_when_disabled() {
        let mut config = NetpulseConfig::default();
        config.netflow.enabled = false;
        config.netflow.bind = "not-an-addr".to_owned();
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_bad_cidr_when_discovery_enabled() {
        let mut config = NetpulseConfig::default();
        config.discovery.enabled = true;
        config.discovery.cidr = "192.168.10.0".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cidr"));

        config.discovery.cidr = "192.168.10.0/33".to_owned();
        assert!(config.validate().is_err());

        config.discovery.cidr = "192.168.10.0/24".to_owned();
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_threshold_out_of_range() {
        let mut config = NetpulseConfig::default();
        config.snmp.thresholds.cpu_percent = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_syslog_format() {
        let mut config = NetpulseConfig::default();
        config.syslog.format = "rfc9999".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("syslog.format"));
    }

    #[test]
    fn validate_rejects_bad_source_ip() {
        let mut config = NetpulseConfig::default();
        config.syslog.allow_sources = vec!["10.0.0.999".to_owned()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_device_without_credentials() {
        let toml = r#"
[[devices]]
name = "bad"
ip = "10.0.0.1"
community = ""
"#;
        let config = NetpulseConfig::parse(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn env_override_endpoint() {
        let mut config = NetpulseConfig::default();
        // SAFETY: serial_test로 직렬화된 테스트에서만 환경변수를 조작합니다.
        unsafe { std::env::set_var("NETPULSE_INGEST_ENDPOINT", "https://override.example.com") };
        config.apply_env_overrides();
        assert_eq!(config.ingest.endpoint, "https://override.example.com");
        unsafe { std::env::remove_var("NETPULSE_INGEST_ENDPOINT") };
    }

    #[test]
    #[serial]
    fn env_override_csv_sources() {
        let mut config = NetpulseConfig::default();
        // SAFETY: serial_test로 직렬화된 테스트에서만 환경변수를 조작합니다.
        unsafe { std::env::set_var("NETPULSE_SYSLOG_ALLOW_SOURCES", "10.0.0.1, 10.0.0.2") };
        config.apply_env_overrides();
        assert_eq!(config.syslog.allow_sources, vec!["10.0.0.1", "10.0.0.2"]);
        unsafe { std::env::remove_var("NETPULSE_SYSLOG_ALLOW_SOURCES") };
    }

    #[test]
    #[serial]
    fn env_override_invalid_number_keeps_original() {
        let mut config = NetpulseConfig::default();
        // SAFETY: serial_test로 직렬화된 테스트에서만 환경변수를 조작합니다.
        unsafe { std::env::set_var("NETPULSE_INGEST_BATCH_SIZE", "not-a-number") };
        config.apply_env_overrides();
        assert_eq!(config.ingest.batch_size, 100);
        unsafe { std::env::remove_var("NETPULSE_INGEST_BATCH_SIZE") };
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = NetpulseConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = NetpulseConfig::parse(&toml_str).unwrap();
        assert_eq!(config.ingest.endpoint, parsed.ingest.endpoint);
        assert_eq!(config.snmp.poll_interval_secs, parsed.snmp.poll_interval_secs);
        assert_eq!(
            config.performance.max_queue_size,
            parsed.performance.max_queue_size
        );
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = NetpulseConfig::from_file("/nonexistent/netpulse.toml").await;
        assert!(matches!(
            result.unwrap_err(),
            NetpulseError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
