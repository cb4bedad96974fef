//! 장비 유형 분류 — sysDescr/sysObjectID 휴리스틱
//!
//! sysDescr의 벤더 키워드를 대소문자 구분 없이 먼저 검사하고,
//! 매칭이 없으면 sysObjectID의 엔터프라이즈 번호
//! (`1.3.6.1.4.1.<enterprise>`)로 폴백합니다.
//! 어느 쪽으로도 분류되지 않으면 `Unknown`입니다.

use netpulse_core::types::DeviceType;

/// sysDescr 키워드 테이블 — 검사 순서 유지
///
/// 방화벽 키워드를 스위치/라우터보다 먼저 검사합니다
/// (예: "Cisco ASA"는 방화벽이지만 "cisco"는 라우터에도 흔함).
const DESCR_KEYWORDS: &[(&str, DeviceType)] = &[
    ("fortigate", DeviceType::Firewall),
    ("palo alto", DeviceType::Firewall),
    ("pfsense", DeviceType::Firewall),
    ("sonicwall", DeviceType::Firewall),
    ("adaptive security appliance", DeviceType::Firewall),
    ("asa", DeviceType::Firewall),
    ("firewall", DeviceType::Firewall),
    ("laserjet", DeviceType::Printer),
    ("officejet", DeviceType::Printer),
    ("jetdirect", DeviceType::Printer),
    ("lexmark", DeviceType::Printer),
    ("kyocera", DeviceType::Printer),
    ("printer", DeviceType::Printer),
    ("smart-ups", DeviceType::Ups),
    ("apc web/snmp", DeviceType::Ups),
    ("eaton", DeviceType::Ups),
    ("ups", DeviceType::Ups),
    ("catalyst", DeviceType::Switch),
    ("nexus", DeviceType::Switch),
    ("procurve", DeviceType::Switch),
    ("aruba", DeviceType::Switch),
    ("switch", DeviceType::Switch),
    ("routeros", DeviceType::Router),
    ("mikrotik", DeviceType::Router),
    ("junos", DeviceType::Router),
    ("router", DeviceType::Router),
    ("linux", DeviceType::Server),
    ("windows", DeviceType::Server),
    ("ubuntu", DeviceType::Server),
    ("debian", DeviceType::Server),
    ("vmware", DeviceType::Server),
];

/// 엔터프라이즈 번호 테이블 (sysObjectID = 1.3.6.1.4.1.<enterprise>...)
const ENTERPRISE_TYPES: &[(&str, DeviceType)] = &[
    ("318", DeviceType::Ups),      // APC
    ("534", DeviceType::Ups),      // Eaton
    ("641", DeviceType::Printer),  // Lexmark
    ("1602", DeviceType::Printer), // Canon
    ("2435", DeviceType::Printer), // Brother
    ("2636", DeviceType::Router),  // Juniper
    ("14988", DeviceType::Router), // MikroTik
    ("12356", DeviceType::Firewall), // Fortinet
    ("25461", DeviceType::Firewall), // Palo Alto
];

/// sysDescr/sysObjectID로 장비 유형을 추정합니다.
pub fn classify(sys_descr: &str, sys_object_id: &str) -> DeviceType {
    let descr = sys_descr.to_lowercase();
    for (keyword, device_type) in DESCR_KEYWORDS {
        if descr.contains(keyword) {
            return *device_type;
        }
    }

    if let Some(enterprise) = enterprise_number(sys_object_id) {
        for (number, device_type) in ENTERPRISE_TYPES {
            if enterprise == *number {
                return *device_type;
            }
        }
    }

    DeviceType::Unknown
}

/// sysObjectID에서 엔터프라이즈 번호 부분을 추출합니다.
fn enterprise_number(sys_object_id: &str) -> Option<&str> {
    sys_object_id
        .trim_start_matches('.')
        .strip_prefix("1.3.6.1.4.1.")
        .and_then(|rest| rest.split('.').next())
}
