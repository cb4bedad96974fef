//! 네트워크 스윕 — 유한 동시성 ping 프로브 + SNMP 핑거프린트
//!
//! CIDR 블록을 호스트 목록으로 전개하고, 세마포어로 동시성을 제한한
//! ping 프로브로 살아있는 호스트를 찾은 뒤, 응답한 호스트에
//! sysDescr/sysObjectID GET을 보내 장비 유형을 분류합니다.
//!
//! 읽기 전용 보조 컴포넌트입니다 — 결과는 자체 발견 목록에만 담기고,
//! 모니터링 장비 레지스트리를 자동으로 변경하지 않습니다.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;

use netpulse_core::config::DiscoveryConfig;
use netpulse_core::types::DeviceType;
use netpulse_snmp::ber::Oid;
use netpulse_snmp::client::SnmpClient;

use crate::classify::classify;
use crate::error::DiscoveryError;

/// SNMP 핑거프린트 타임아웃 — 디스커버리는 짧게 유지
const FINGERPRINT_TIMEOUT: Duration = Duration::from_secs(2);

/// 발견된 호스트
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredDevice {
    /// 호스트 IP
    pub ip: IpAddr,
    /// 추정 장비 유형
    pub device_type: DeviceType,
    /// sysDescr 응답 (SNMP 미응답이면 None)
    pub sys_descr: Option<String>,
    /// sysObjectID 응답
    pub sys_object_id: Option<String>,
}

/// CIDR 표기를 호스트 주소 목록으로 전개합니다.
///
/// /31과 /32는 모든 주소를 포함하고, 그보다 큰 네트워크는
/// 네트워크/브로드캐스트 주소를 제외합니다.
pub fn expand_cidr(cidr: &str) -> Result<Vec<Ipv4Addr>, DiscoveryError> {
    let (addr_str, prefix_str) = cidr
        .split_once('/')
        .ok_or_else(|| DiscoveryError::InvalidCidr(cidr.to_owned()))?;
    let addr: Ipv4Addr = addr_str
        .parse()
        .map_err(|_| DiscoveryError::InvalidCidr(cidr.to_owned()))?;
    let prefix: u8 = prefix_str
        .parse()
        .ok()
        .filter(|p| *p <= 32)
        .ok_or_else(|| DiscoveryError::InvalidCidr(cidr.to_owned()))?;

    let base = u32::from(addr);
    let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
    let network = base & mask;
    let host_count = 1u64 << (32 - prefix);

    let hosts = if prefix >= 31 {
        (0..host_count).map(|i| network + i as u32).collect::<Vec<_>>()
    } else {
        // 네트워크 주소와 브로드캐스트 주소 제외
        (1..host_count - 1).map(|i| network + i as u32).collect()
    };
    Ok(hosts.into_iter().map(Ipv4Addr::from).collect())
}

/// 디스커버리 스캐너
pub struct DiscoveryScanner {
    config: DiscoveryConfig,
}

impl DiscoveryScanner {
    /// 새 스캐너를 생성합니다.
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    /// 설정된 CIDR 블록을 스캔하여 발견된 호스트 목록을 반환합니다.
    pub async fn sweep(&self) -> Result<Vec<DiscoveredDevice>, DiscoveryError> {
        let hosts = expand_cidr(&self.config.cidr)?;
        tracing::info!(
            cidr = %self.config.cidr,
            hosts = hosts.len(),
            max_concurrency = self.config.max_concurrency,
            "starting discovery sweep"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut tasks = Vec::with_capacity(hosts.len());
        for host in hosts {
            let semaphore = Arc::clone(&semaphore);
            let ping_timeout = self.config.ping_timeout_secs;
            let community = self.config.community.clone();
            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.ok()?;
                if !ping_host(host, ping_timeout).await {
                    return None;
                }
                Some(fingerprint_host(host, &community).await)
            }));
        }

        let mut discovered = Vec::new();
        for task in tasks {
            if let Ok(Some(device)) = task.await {
                discovered.push(device);
            }
        }

        tracing::info!(found = discovered.len(), "discovery sweep finished");
        Ok(discovered)
    }
}

/// 시스템 ping 명령으로 호스트 생존 여부를 확인합니다.
///
/// raw ICMP 소켓 대신 ping 바이너리를 사용하므로 CAP_NET_RAW가
/// 필요하지 않습니다. ping 실행 자체가 실패하면 호스트를 죽은 것으로
/// 취급합니다 (스윕은 계속 진행).
async fn ping_host(host: Ipv4Addr, timeout_secs: u64) -> bool {
    let result = tokio::process::Command::new("ping")
        .arg("-c")
        .arg("1")
        .arg("-W")
        .arg(timeout_secs.to_string())
        .arg(host.to_string())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(true)
        .status()
        .await;
    match result {
        Ok(status) => status.success(),
        Err(e) => {
            tracing::debug!(host = %host, error = %e, "ping command failed");
            false
        }
    }
}

/// 살아있는 호스트에 SNMP 핑거프린트를 시도합니다.
async fn fingerprint_host(host: Ipv4Addr, community: &str) -> DiscoveredDevice {
    let target = SocketAddr::new(IpAddr::V4(host), 161);
    let mut device = DiscoveredDevice {
        ip: IpAddr::V4(host),
        device_type: DeviceType::Unknown,
        sys_descr: None,
        sys_object_id: None,
    };

    let Ok(mut client) = SnmpClient::connect(target, community, FINGERPRINT_TIMEOUT, 0).await
    else {
        return device;
    };

    let sys_descr_oid = Oid::from_arcs(vec![1, 3, 6, 1, 2, 1, 1, 1, 0]);
    let sys_object_id_oid = Oid::from_arcs(vec![1, 3, 6, 1, 2, 1, 1, 2, 0]);

    if let Ok(value) = client.get(&sys_descr_oid).await {
        device.sys_descr = Some(value.display_string());
    }
    if let Ok(value) = client.get(&sys_object_id_oid).await {
        device.sys_object_id = Some(value.display_string());
    }

    device.device_type = classify(
        device.sys_descr.as_deref().unwrap_or(""),
        device.sys_object_id.as_deref().unwrap_or(""),
    );
    device
}
