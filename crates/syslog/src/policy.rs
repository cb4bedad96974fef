//! 소스 정책 — 기본 거부(default-deny) 송신자 필터
//!
//! 소스 IP는 다음 순서로 판정합니다:
//! 1. 차단 목록에 있으면 항상 거부
//! 2. 허용 목록에 있으면 수락
//! 3. `accept_known_devices`가 켜져 있고 `[[devices]]`에 선언된 IP면 수락
//! 4. 그 외는 거부 (조용히 수락되는 미지의 소스는 없음)
//!
//! 거부된 메시지는 드롭되고 카운터로 집계됩니다.

use std::collections::HashSet;
use std::net::IpAddr;

use netpulse_core::config::SyslogConfig;
use netpulse_core::types::DeviceConfig;

/// Syslog 소스 수락 정책
#[derive(Debug, Clone)]
pub struct SourcePolicy {
    allow: HashSet<IpAddr>,
    block: HashSet<IpAddr>,
    known_devices: HashSet<IpAddr>,
    accept_known_devices: bool,
}

impl SourcePolicy {
    /// 설정과 장비 목록에서 정책을 구성합니다.
    ///
    /// 파싱 불가능한 주소는 설정 검증 단계에서 이미 걸러졌으므로
    /// 여기서는 조용히 건너뜁니다.
    pub fn from_config(config: &SyslogConfig, devices: &[DeviceConfig]) -> Self {
        let parse_all = |list: &[String]| {
            list.iter()
                .filter_map(|s| s.parse::<IpAddr>().ok())
                .collect::<HashSet<_>>()
        };
        Self {
            allow: parse_all(&config.allow_sources),
            block: parse_all(&config.block_sources),
            known_devices: devices.iter().map(|d| d.ip).collect(),
            accept_known_devices: config.accept_known_devices,
        }
    }

    /// 소스 IP의 수락 여부를 판정합니다.
    pub fn permits(&self, source: IpAddr) -> bool {
        if self.block.contains(&source) {
            return false;
        }
        if self.allow.contains(&source) {
            return true;
        }
        self.accept_known_devices && self.known_devices.contains(&source)
    }
}
