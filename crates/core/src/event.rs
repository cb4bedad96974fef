//! 정규화 이벤트 — 모든 수집기의 공통 출력 단위
//!
//! 네 개의 프로토콜 수집기(SNMP 폴링, SNMP 트랩, syslog, NetFlow)는
//! 서로 다른 원시 입력을 [`NormalizedEvent`] 하나의 스키마로 정규화하여
//! 이벤트 큐에 넣습니다. 큐에 들어간 이벤트는 불변이며,
//! 전송 성공 시 소멸됩니다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Severity;

// --- 이벤트 코드 상수 ---
// 프로토콜별 코드 대역: 1000 메트릭, 2000+심각도 이상 징후, 3000 폴링 에러,
// 4000 syslog, 5000/5001 플로우 정상/의심, 6000+심각도 트랩

/// SNMP 폴링 메트릭 스냅샷 이벤트
pub const CODE_METRICS: u32 = 1000;
/// 이상 징후 이벤트 베이스 (+ 심각도 레벨)
pub const CODE_ANOMALY_BASE: u32 = 2000;
/// 장비 전체 폴링 실패 이벤트
pub const CODE_POLL_ERROR: u32 = 3000;
/// syslog 메시지 이벤트
pub const CODE_SYSLOG: u32 = 4000;
/// 정상 플로우 이벤트
pub const CODE_FLOW: u32 = 5000;
/// 의심 플로우 이벤트
pub const CODE_FLOW_SUSPICIOUS: u32 = 5001;
/// SNMP 트랩 이벤트 베이스 (+ 심각도 레벨)
pub const CODE_TRAP_BASE: u32 = 6000;

/// 이벤트를 생성한 수집 경로
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// SNMP 폴링 (메트릭, 이상 징후, 폴링 에러)
    NetworkDevice,
    /// SNMP 트랩 수신기
    SnmpTrap,
    /// Syslog 수신기
    Syslog,
    /// NetFlow/IPFIX 수집기
    NetFlow,
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkDevice => write!(f, "network_device"),
            Self::SnmpTrap => write!(f, "snmp_trap"),
            Self::Syslog => write!(f, "syslog"),
            Self::NetFlow => write!(f, "netflow"),
        }
    }
}

/// 정규화된 텔레메트리 이벤트
///
/// 수집기가 생성하고 배치 전송기가 소비하는 공통 스키마입니다.
/// `event_data`는 프로토콜별 추가 필드를 담는 개방형 키/값 맵입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// 수집 경로
    pub source_type: EventSource,
    /// 프로토콜별 이벤트 코드 (코드 상수 참조)
    pub event_code: u32,
    /// 심각도 (직렬화 시 1~5)
    pub severity: Severity,
    /// 이벤트를 발생시킨 장비/호스트 이름
    pub computer: String,
    /// 장비 IP 주소 (문자열 표현)
    pub ip_address: String,
    /// 이벤트 공급자 식별자 (예: "NetPulse-SNMP")
    pub provider: String,
    /// 논리 채널 (예: "network", "security")
    pub channel: String,
    /// 사람이 읽는 메시지
    pub message: String,
    /// 생성 시각
    pub timestamp: DateTime<Utc>,
    /// 프로토콜별 추가 데이터
    #[serde(default)]
    pub event_data: serde_json::Map<String, Value>,
}

impl NormalizedEvent {
    /// 새 이벤트를 생성합니다. 나머지 필드는 `with_*` 메서드로 채웁니다.
    pub fn new(source_type: EventSource, event_code: u32, severity: Severity) -> Self {
        Self {
            source_type,
            event_code,
            severity,
            computer: String::new(),
            ip_address: String::new(),
            provider: String::new(),
            channel: String::new(),
            message: String::new(),
            timestamp: Utc::now(),
            event_data: serde_json::Map::new(),
        }
    }

    /// 장비/호스트 이름을 설정합니다.
    pub fn with_computer(mut self, computer: impl Into<String>) -> Self {
        self.computer = computer.into();
        self
    }

    /// IP 주소를 설정합니다.
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = ip.into();
        self
    }

    /// 공급자 식별자를 설정합니다.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// 논리 채널을 설정합니다.
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// 메시지를 설정합니다.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// event_data에 항목 하나를 추가합니다.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.event_data.insert(key.into(), value.into());
        self
    }

    /// event_data 맵 전체를 설정합니다.
    pub fn with_data_map(mut self, data: serde_json::Map<String, Value>) -> Self {
        self.event_data = data;
        self
    }
}

impl fmt::Display for NormalizedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] code={} severity={} computer={} {}",
            self.source_type, self.event_code, self.severity, self.computer, self.message,
        )
    }
}
