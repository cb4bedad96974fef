//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 모든 수집기가 공유하는 데이터 구조를 정의합니다.
//! 장비 설정([`DeviceConfig`]), 장비 유형([`DeviceType`]),
//! 심각도([`Severity`])는 수집기와 전송 경로 전반에서 사용됩니다.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// 심각도 레벨
///
/// 수집 경로 전체에서 사용되는 5단계 심각도입니다.
/// 수집 API로 직렬화될 때는 1(Info)~5(Critical)의 숫자로 표현되며,
/// 역직렬화 시 범위를 벗어난 값은 거부됩니다.
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Info < Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "u8", try_from = "u8")]
pub enum Severity {
    /// 정보성 이벤트 (레벨 1)
    #[default]
    Info,
    /// 낮은 심각도 (레벨 2)
    Low,
    /// 중간 심각도 (레벨 3)
    Medium,
    /// 높은 심각도 (레벨 4)
    High,
    /// 치명적 — 즉시 대응 필요 (레벨 5)
    Critical,
}

impl Severity {
    /// 숫자 레벨(1~5)을 반환합니다.
    pub fn level(self) -> u8 {
        match self {
            Self::Info => 1,
            Self::Low => 2,
            Self::Medium => 3,
            Self::High => 4,
            Self::Critical => 5,
        }
    }

    /// 숫자 레벨에서 심각도를 생성합니다. 1~5 범위만 유효합니다.
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Info),
            2 => Some(Self::Low),
            3 => Some(Self::Medium),
            4 => Some(Self::High),
            5 => Some(Self::Critical),
            _ => None,
        }
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity.level()
    }
}

impl TryFrom<u8> for Severity {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::from_level(level).ok_or_else(|| format!("severity level {level} out of range (1-5)"))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// 모니터링 대상 장비 유형
///
/// 유형에 따라 폴링할 OID 집합과 이상 탐지 규칙이 결정됩니다.
/// `Server`는 디스커버리가 분류하는 유형으로, 직접 폴링 대상은 아닙니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// 네트워크 프린터
    Printer,
    /// L2/L3 스위치
    Switch,
    /// 라우터
    Router,
    /// 방화벽
    Firewall,
    /// 무정전 전원 장치
    Ups,
    /// 일반 서버 (디스커버리 분류 전용)
    Server,
    /// 미확인 장비 — 기본 시스템 OID만 폴링
    #[default]
    Unknown,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Printer => write!(f, "printer"),
            Self::Switch => write!(f, "switch"),
            Self::Router => write!(f, "router"),
            Self::Firewall => write!(f, "firewall"),
            Self::Ups => write!(f, "ups"),
            Self::Server => write!(f, "server"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// SNMPv3 USM 자격 증명
///
/// 설정에서 선언되며, v3 전용 장비를 식별하는 데 사용됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnmpV3Credentials {
    /// USM 사용자명
    pub username: String,
    /// 인증 프로토콜 (예: "sha", "md5")
    #[serde(default)]
    pub auth_protocol: String,
    /// 인증 비밀번호
    #[serde(default)]
    pub auth_password: String,
    /// 암호화 프로토콜 (예: "aes", "des")
    #[serde(default)]
    pub priv_protocol: String,
    /// 암호화 비밀번호
    #[serde(default)]
    pub priv_password: String,
}

/// 운영자가 선언한 모니터링 대상 장비
///
/// 시작 시 설정 파일의 `[[devices]]` 배열에서 한 번 로드되며,
/// 런타임에는 변경되지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// 장비 이름 (이벤트의 computer 필드로 사용)
    pub name: String,
    /// 장비 IP 주소
    pub ip: IpAddr,
    /// SNMP 에이전트 포트 (기본 161)
    #[serde(default = "default_snmp_port")]
    pub port: u16,
    /// 장비 유형
    #[serde(default)]
    pub device_type: DeviceType,
    /// SNMP v2c 커뮤니티 문자열
    #[serde(default = "default_community")]
    pub community: String,
    /// SNMPv3 USM 자격 증명 (설정 시 v3 장비로 취급)
    #[serde(default)]
    pub v3: Option<SnmpV3Credentials>,
    /// 폴링 활성화 여부
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 프로파일 OID에 추가로 폴링할 사용자 정의 OID 목록
    #[serde(default)]
    pub custom_oids: Vec<String>,
}

fn default_community() -> String {
    "public".to_owned()
}

fn default_snmp_port() -> u16 {
    161
}

fn default_enabled() -> bool {
    true
}

impl fmt::Display for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) type={} enabled={}",
            self.name, self.ip, self.device_type, self.enabled,
        )
    }
}
