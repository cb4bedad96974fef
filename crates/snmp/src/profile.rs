//! 장비 프로파일 엔진 — 유형별 OID 테이블, 값 해석, 이상 탐지
//!
//! 장비 유형마다 [`DeviceProfile`] 구현이 하나씩 있으며,
//! [`profile_for`] 레지스트리로 선택합니다. 프로파일은 상태가 없고
//! 폴링 사이클마다 동일하게 동작합니다.
//!
//! 이상 탐지는 순수 함수이며 엄격 부등호를 사용합니다:
//! 토너 임계값 20에서 잔량 19는 이상 징후, 정확히 20은 정상입니다.
//! 메트릭 맵에 없는 키는 조용히 건너뜁니다.

use std::collections::BTreeMap;

use serde::Serialize;

use netpulse_core::config::AnomalyThresholds;
use netpulse_core::types::{DeviceType, Severity};

use crate::ber::{Oid, SnmpValue};

/// 해석된 메트릭 값
///
/// SNMP 정수 계열은 `Integer`로, 문자열/OID/주소는 `Text`로 담깁니다.
/// JSON 직렬화 시 태그 없이 값 그대로 표현됩니다.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// 정수 값
    Integer(i64),
    /// 문자열 값
    Text(String),
}

impl MetricValue {
    /// 정수 값이면 i64를 반환합니다.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// JSON 값으로 변환합니다.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Integer(v) => serde_json::Value::from(*v),
            Self::Text(s) => serde_json::Value::from(s.clone()),
        }
    }
}

/// 메트릭 이름 → 값 맵 (이름순 정렬 유지)
pub type MetricMap = BTreeMap<String, MetricValue>;

/// 탐지된 이상 징후
#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    /// 이상 유형 (예: "high_cpu", "low_toner")
    pub anomaly_type: String,
    /// 고정 심각도 (유형별로 결정됨)
    pub severity: Severity,
    /// 사람이 읽는 설명
    pub message: String,
    /// 관측된 값
    pub value: i64,
    /// 적용된 임계값 (상태 기반 이상은 0)
    pub threshold: i64,
}

/// 장비 유형별 수집 능력 집합
///
/// 세 가지 연산을 제공합니다:
/// - [`monitoring_oids`](Self::monitoring_oids): 폴링할 OID 테이블
/// - [`parse_value`](Self::parse_value): 원시 SNMP 값 → 메트릭 항목
/// - [`detect_anomaly`](Self::detect_anomaly): 메트릭 → 이상 징후 목록
pub trait DeviceProfile: Send + Sync {
    /// 프로파일이 담당하는 장비 유형
    fn device_type(&self) -> DeviceType;

    /// 폴링할 (메트릭 이름, OID) 테이블
    ///
    /// 기본 시스템 OID(sysDescr, sysUpTime, sysName)에
    /// 유형별 OID가 더해집니다.
    fn monitoring_oids(&self) -> Vec<(String, Oid)>;

    /// 원시 SNMP 값을 메트릭 항목으로 해석합니다.
    ///
    /// 하나의 OID가 여러 메트릭을 낳을 수 있습니다
    /// (예: 상태 코드 → 코드 + 심볼 텍스트).
    /// 해석 불가능한 값(NULL, 예외)은 빈 벡터를 반환합니다.
    fn parse_value(&self, name: &str, value: &SnmpValue) -> Vec<(String, MetricValue)> {
        coerce(name, value).into_iter().collect()
    }

    /// 메트릭에 임계값 규칙을 적용하여 이상 징후를 반환합니다.
    ///
    /// 절대 실패하지 않으며, 없는 메트릭 키는 건너뜁니다.
    fn detect_anomaly(&self, metrics: &MetricMap, thresholds: &AnomalyThresholds) -> Vec<Anomaly> {
        let _ = (metrics, thresholds);
        Vec::new()
    }
}

/// 기본 시스템 OID — 모든 유형이 공통으로 폴링
fn base_oids() -> Vec<(String, Oid)> {
    vec![
        ("sys_descr".to_owned(), Oid::from_arcs(vec![1, 3, 6, 1, 2, 1, 1, 1, 0])),
        ("sys_uptime".to_owned(), Oid::from_arcs(vec![1, 3, 6, 1, 2, 1, 1, 3, 0])),
        ("sys_name".to_owned(), Oid::from_arcs(vec![1, 3, 6, 1, 2, 1, 1, 5, 0])),
    ]
}

/// SNMP 값을 기본 규칙으로 메트릭 값으로 변환합니다.
fn coerce(name: &str, value: &SnmpValue) -> Option<(String, MetricValue)> {
    match value {
        SnmpValue::Null
        | SnmpValue::NoSuchObject
        | SnmpValue::NoSuchInstance
        | SnmpValue::EndOfMibView => None,
        other => match other.as_i64() {
            Some(v) => Some((name.to_owned(), MetricValue::Integer(v))),
            None => Some((name.to_owned(), MetricValue::Text(other.display_string()))),
        },
    }
}

/// 메트릭 맵에서 정수 값을 꺼냅니다. 없거나 정수가 아니면 None.
fn metric_int(metrics: &MetricMap, key: &str) -> Option<i64> {
    metrics.get(key).and_then(MetricValue::as_i64)
}

// ─── 프린터 ──────────────────────────────────────────────────────────

/// 네트워크 프린터 프로파일
///
/// 토너 잔량은 백분율로 보고된다고 가정합니다 (Printer-MIB의
/// prtMarkerSuppliesLevel을 백분율로 노출하는 일반적인 구성).
pub struct PrinterProfile;

impl DeviceProfile for PrinterProfile {
    fn device_type(&self) -> DeviceType {
        DeviceType::Printer
    }

    fn monitoring_oids(&self) -> Vec<(String, Oid)> {
        let mut oids = base_oids();
        oids.push((
            "printer_status".to_owned(),
            Oid::from_arcs(vec![1, 3, 6, 1, 2, 1, 25, 3, 2, 1, 5, 1]),
        ));
        oids.push((
            "toner_level".to_owned(),
            Oid::from_arcs(vec![1, 3, 6, 1, 2, 1, 43, 11, 1, 1, 9, 1, 1]),
        ));
        oids.push((
            "page_count".to_owned(),
            Oid::from_arcs(vec![1, 3, 6, 1, 2, 1, 43, 10, 2, 1, 4, 1, 1]),
        ));
        oids
    }

    fn parse_value(&self, name: &str, value: &SnmpValue) -> Vec<(String, MetricValue)> {
        if name == "printer_status" {
            if let Some(code) = value.as_i64() {
                // hrDeviceStatus: 1 unknown, 2 running, 3 warning, 4 testing, 5 down
                let text = match code {
                    1 => "unknown",
                    2 => "running",
                    3 => "warning",
                    4 => "testing",
                    5 => "down",
                    _ => "invalid",
                };
                return vec![
                    (name.to_owned(), MetricValue::Integer(code)),
                    ("printer_status_text".to_owned(), MetricValue::Text(text.to_owned())),
                ];
            }
        }
        coerce(name, value).into_iter().collect()
    }

    fn detect_anomaly(&self, metrics: &MetricMap, thresholds: &AnomalyThresholds) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();
        if let Some(level) = metric_int(metrics, "toner_level") {
            if level < thresholds.toner_percent {
                anomalies.push(Anomaly {
                    anomaly_type: "low_toner".to_owned(),
                    severity: Severity::Medium,
                    message: format!(
                        "toner level {level}% below threshold {}%",
                        thresholds.toner_percent
                    ),
                    value: level,
                    threshold: thresholds.toner_percent,
                });
            }
        }
        if let Some(status) = metric_int(metrics, "printer_status") {
            if status == 5 {
                anomalies.push(Anomaly {
                    anomaly_type: "printer_offline".to_owned(),
                    severity: Severity::High,
                    message: "printer reports down status".to_owned(),
                    value: status,
                    threshold: 0,
                });
            }
        }
        anomalies
    }
}

// ─── 스위치 ──────────────────────────────────────────────────────────

/// L2/L3 스위치 프로파일
pub struct SwitchProfile;

impl DeviceProfile for SwitchProfile {
    fn device_type(&self) -> DeviceType {
        DeviceType::Switch
    }

    fn monitoring_oids(&self) -> Vec<(String, Oid)> {
        let mut oids = base_oids();
        oids.push((
            "cpu_usage".to_owned(),
            Oid::from_arcs(vec![1, 3, 6, 1, 4, 1, 9, 2, 1, 58, 0]),
        ));
        oids.push((
            "if_in_errors".to_owned(),
            Oid::from_arcs(vec![1, 3, 6, 1, 2, 1, 2, 2, 1, 14, 1]),
        ));
        oids.push((
            "if_out_errors".to_owned(),
            Oid::from_arcs(vec![1, 3, 6, 1, 2, 1, 2, 2, 1, 20, 1]),
        ));
        oids
    }

    fn detect_anomaly(&self, metrics: &MetricMap, thresholds: &AnomalyThresholds) -> Vec<Anomaly> {
        detect_cpu(metrics, thresholds).into_iter().collect()
    }
}

// ─── 라우터 ──────────────────────────────────────────────────────────

/// 라우터 프로파일
pub struct RouterProfile;

impl DeviceProfile for RouterProfile {
    fn device_type(&self) -> DeviceType {
        DeviceType::Router
    }

    fn monitoring_oids(&self) -> Vec<(String, Oid)> {
        let mut oids = base_oids();
        oids.push((
            "cpu_usage".to_owned(),
            Oid::from_arcs(vec![1, 3, 6, 1, 4, 1, 9, 2, 1, 58, 0]),
        ));
        oids.push((
            "memory_usage".to_owned(),
            Oid::from_arcs(vec![1, 3, 6, 1, 4, 1, 9, 9, 109, 1, 1, 1, 1, 12, 1]),
        ));
        oids.push((
            "temperature".to_owned(),
            Oid::from_arcs(vec![1, 3, 6, 1, 4, 1, 9, 9, 13, 1, 3, 1, 3, 1]),
        ));
        oids
    }

    fn detect_anomaly(&self, metrics: &MetricMap, thresholds: &AnomalyThresholds) -> Vec<Anomaly> {
        let mut anomalies: Vec<Anomaly> = detect_cpu(metrics, thresholds).into_iter().collect();
        anomalies.extend(detect_memory(metrics, thresholds));
        anomalies.extend(detect_temperature(metrics, thresholds));
        anomalies
    }
}

// ─── 방화벽 ──────────────────────────────────────────────────────────

/// 방화벽 프로파일
pub struct FirewallProfile;

impl DeviceProfile for FirewallProfile {
    fn device_type(&self) -> DeviceType {
        DeviceType::Firewall
    }

    fn monitoring_oids(&self) -> Vec<(String, Oid)> {
        let mut oids = base_oids();
        oids.push((
            "cpu_usage".to_owned(),
            Oid::from_arcs(vec![1, 3, 6, 1, 4, 1, 9, 2, 1, 58, 0]),
        ));
        oids.push((
            "memory_usage".to_owned(),
            Oid::from_arcs(vec![1, 3, 6, 1, 4, 1, 9, 9, 109, 1, 1, 1, 1, 12, 1]),
        ));
        oids.push((
            "session_count".to_owned(),
            Oid::from_arcs(vec![1, 3, 6, 1, 4, 1, 9, 9, 147, 1, 2, 2, 2, 1, 5, 40, 6]),
        ));
        oids
    }

    fn detect_anomaly(&self, metrics: &MetricMap, thresholds: &AnomalyThresholds) -> Vec<Anomaly> {
        let mut anomalies: Vec<Anomaly> = detect_cpu(metrics, thresholds).into_iter().collect();
        anomalies.extend(detect_memory(metrics, thresholds));
        anomalies
    }
}

// ─── UPS ─────────────────────────────────────────────────────────────

/// 무정전 전원 장치 프로파일 (UPS-MIB, RFC 1628)
pub struct UpsProfile;

impl DeviceProfile for UpsProfile {
    fn device_type(&self) -> DeviceType {
        DeviceType::Ups
    }

    fn monitoring_oids(&self) -> Vec<(String, Oid)> {
        let mut oids = base_oids();
        oids.push((
            "battery_status".to_owned(),
            Oid::from_arcs(vec![1, 3, 6, 1, 2, 1, 33, 1, 2, 1, 0]),
        ));
        oids.push((
            "battery_charge".to_owned(),
            Oid::from_arcs(vec![1, 3, 6, 1, 2, 1, 33, 1, 2, 4, 0]),
        ));
        oids.push((
            "battery_runtime".to_owned(),
            Oid::from_arcs(vec![1, 3, 6, 1, 2, 1, 33, 1, 2, 3, 0]),
        ));
        oids.push((
            "output_load".to_owned(),
            Oid::from_arcs(vec![1, 3, 6, 1, 2, 1, 33, 1, 4, 4, 1, 5, 1]),
        ));
        oids
    }

    fn parse_value(&self, name: &str, value: &SnmpValue) -> Vec<(String, MetricValue)> {
        if name == "battery_status" {
            if let Some(code) = value.as_i64() {
                // upsBatteryStatus: 1 unknown, 2 batteryNormal, 3 batteryLow, 4 batteryDepleted
                let text = match code {
                    1 => "unknown",
                    2 => "normal",
                    3 => "low",
                    4 => "depleted",
                    _ => "invalid",
                };
                return vec![
                    (name.to_owned(), MetricValue::Integer(code)),
                    ("battery_status_text".to_owned(), MetricValue::Text(text.to_owned())),
                ];
            }
        }
        coerce(name, value).into_iter().collect()
    }

    fn detect_anomaly(&self, metrics: &MetricMap, thresholds: &AnomalyThresholds) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();
        if let Some(charge) = metric_int(metrics, "battery_charge") {
            if charge < thresholds.battery_percent {
                anomalies.push(Anomaly {
                    anomaly_type: "low_battery".to_owned(),
                    severity: Severity::High,
                    message: format!(
                        "battery charge {charge}% below threshold {}%",
                        thresholds.battery_percent
                    ),
                    value: charge,
                    threshold: thresholds.battery_percent,
                });
            }
        }
        if let Some(load) = metric_int(metrics, "output_load") {
            if load > thresholds.load_percent {
                anomalies.push(Anomaly {
                    anomaly_type: "high_load".to_owned(),
                    severity: Severity::Medium,
                    message: format!(
                        "output load {load}% above threshold {}%",
                        thresholds.load_percent
                    ),
                    value: load,
                    threshold: thresholds.load_percent,
                });
            }
        }
        if let Some(status) = metric_int(metrics, "battery_status") {
            if status >= 3 {
                anomalies.push(Anomaly {
                    anomaly_type: "battery_degraded".to_owned(),
                    severity: Severity::High,
                    message: "ups reports degraded battery status".to_owned(),
                    value: status,
                    threshold: 0,
                });
            }
        }
        anomalies
    }
}

// ─── 일반 (unknown) ──────────────────────────────────────────────────

/// 미확인 장비용 일반 프로파일 — 기본 시스템 OID만 폴링하고 이상 탐지는 없음
pub struct GenericProfile;

impl DeviceProfile for GenericProfile {
    fn device_type(&self) -> DeviceType {
        DeviceType::Unknown
    }

    fn monitoring_oids(&self) -> Vec<(String, Oid)> {
        base_oids()
    }
}

// ─── 공용 탐지 헬퍼 ──────────────────────────────────────────────────

fn detect_cpu(metrics: &MetricMap, thresholds: &AnomalyThresholds) -> Option<Anomaly> {
    let cpu = metric_int(metrics, "cpu_usage")?;
    (cpu > thresholds.cpu_percent).then(|| Anomaly {
        anomaly_type: "high_cpu".to_owned(),
        severity: Severity::Medium,
        message: format!("cpu usage {cpu}% above threshold {}%", thresholds.cpu_percent),
        value: cpu,
        threshold: thresholds.cpu_percent,
    })
}

fn detect_memory(metrics: &MetricMap, thresholds: &AnomalyThresholds) -> Option<Anomaly> {
    let memory = metric_int(metrics, "memory_usage")?;
    (memory > thresholds.memory_percent).then(|| Anomaly {
        anomaly_type: "high_memory".to_owned(),
        severity: Severity::Medium,
        message: format!(
            "memory usage {memory}% above threshold {}%",
            thresholds.memory_percent
        ),
        value: memory,
        threshold: thresholds.memory_percent,
    })
}

fn detect_temperature(metrics: &MetricMap, thresholds: &AnomalyThresholds) -> Option<Anomaly> {
    let temp = metric_int(metrics, "temperature")?;
    (temp > thresholds.temperature_celsius).then(|| Anomaly {
        anomaly_type: "high_temperature".to_owned(),
        severity: Severity::High,
        message: format!(
            "temperature {temp}C above threshold {}C",
            thresholds.temperature_celsius
        ),
        value: temp,
        threshold: thresholds.temperature_celsius,
    })
}

// ─── 레지스트리 ──────────────────────────────────────────────────────

static PRINTER: PrinterProfile = PrinterProfile;
static SWITCH: SwitchProfile = SwitchProfile;
static ROUTER: RouterProfile = RouterProfile;
static FIREWALL: FirewallProfile = FirewallProfile;
static UPS: UpsProfile = UpsProfile;
static GENERIC: GenericProfile = GenericProfile;

/// 장비 유형에 맞는 프로파일을 반환합니다.
///
/// `Server`와 `Unknown`은 일반 프로파일로 폴링됩니다.
pub fn profile_for(device_type: DeviceType) -> &'static dyn DeviceProfile {
    match device_type {
        DeviceType::Printer => &PRINTER,
        DeviceType::Switch => &SWITCH,
        DeviceType::Router => &ROUTER,
        DeviceType::Firewall => &FIREWALL,
        DeviceType::Ups => &UPS,
        DeviceType::Server | DeviceType::Unknown => &GENERIC,
    }
}
