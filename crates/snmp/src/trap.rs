//! SNMP 트랩 수신기 — UDP/162 비동기 알림 수신
//!
//! SNMPv2c 트랩 PDU를 수신하여 이벤트로 변환합니다.
//! snmpTrapOID varbind를 고정 심볼 테이블로 매핑하고,
//! 심볼별 고정 정책으로 심각도를 부여합니다.
//! 깨진 트랩 하나는 에러 카운터만 증가시키고 다음 트랩 처리에
//! 영향을 주지 않습니다.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use netpulse_core::event::{CODE_TRAP_BASE, EventSource, NormalizedEvent};
use netpulse_core::metrics as m;
use netpulse_core::queue::EventSender;
use netpulse_core::stats::CollectorStats;
use netpulse_core::types::Severity;

use crate::ber::{self, Oid, PduType, SnmpValue};
use crate::error::SnmpError;

/// 이벤트 provider 필드 값
const PROVIDER: &str = "NetPulse-Trap";

/// 수신 버퍼 크기
const RECV_BUFFER_SIZE: usize = 65_535;

/// 디코딩된 트랩 알림
///
/// 일시적 구조체 — 즉시 이벤트로 변환됩니다.
#[derive(Debug, Clone)]
pub struct TrapNotification {
    /// 트랩을 보낸 장비 IP
    pub source_ip: IpAddr,
    /// snmpTrapOID 값 (점 표기)
    pub trap_oid: String,
    /// 심볼 이름 (테이블에 없으면 원시 OID 문자열)
    pub trap_type: String,
    /// 나머지 varbind (OID → 값)
    pub varbinds: Vec<(String, SnmpValue)>,
}

/// snmpTrapOID.0 — 트랩 종류를 담는 varbind의 OID
fn snmp_trap_oid() -> Oid {
    Oid::from_arcs(vec![1, 3, 6, 1, 6, 3, 1, 1, 4, 1, 0])
}

/// 표준 트랩 OID를 심볼 이름으로 변환합니다.
///
/// 테이블에 없는 OID는 원시 점 표기 그대로 통과시킵니다.
fn symbolic_trap_type(oid: &Oid) -> String {
    // SNMPv2-MIB snmpTraps: 1.3.6.1.6.3.1.1.5.x
    const PREFIX: [u64; 9] = [1, 3, 6, 1, 6, 3, 1, 1, 5];
    let arcs = oid.arcs();
    if arcs.len() == 10 && arcs[..9] == PREFIX {
        match arcs[9] {
            1 => return "coldStart".to_owned(),
            2 => return "warmStart".to_owned(),
            3 => return "linkDown".to_owned(),
            4 => return "linkUp".to_owned(),
            5 => return "authenticationFailure".to_owned(),
            6 => return "egpNeighborLoss".to_owned(),
            _ => {}
        }
    }
    oid.to_string()
}

/// 트랩 심볼에 고정 정책으로 심각도를 부여합니다.
fn trap_severity(trap_type: &str) -> Severity {
    match trap_type {
        "authenticationFailure" | "linkDown" => Severity::High,
        "linkUp" | "warmStart" => Severity::Medium,
        _ => Severity::Low,
    }
}

/// SNMP 트랩 수신기
///
/// 생성 시점에 소켓을 바인드하므로, 바인드 실패는 시작 단계에서
/// 바로 드러납니다.
pub struct TrapReceiver {
    socket: UdpSocket,
    events: EventSender,
    stats: Arc<CollectorStats>,
}

impl TrapReceiver {
    /// 소켓을 바인드하고 수신기를 생성합니다.
    pub async fn bind(
        bind: SocketAddr,
        events: EventSender,
        stats: Arc<CollectorStats>,
    ) -> Result<Self, SnmpError> {
        let socket = UdpSocket::bind(bind).await?;
        Ok(Self {
            socket,
            events,
            stats,
        })
    }

    /// 실제 바인드된 주소를 반환합니다 (포트 0 바인드 시 확인용).
    pub fn local_addr(&self) -> Result<SocketAddr, SnmpError> {
        Ok(self.socket.local_addr()?)
    }

    /// 수신 루프를 실행합니다. 종료 신호를 받으면 소켓을 놓고 반환합니다.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), SnmpError> {
        tracing::info!(bind = %self.socket.local_addr()?, "snmp trap receiver started");

        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, peer)) => {
                            self.handle_datagram(&buf[..len], peer.ip()).await;
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "trap socket recv failed");
                            self.stats.record_error();
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("trap receiver shutting down");
                    break;
                }
            }
        }
        Ok(())
    }

    /// 데이터그램 하나를 처리합니다. 실패는 카운터로만 남깁니다.
    async fn handle_datagram(&self, datagram: &[u8], source_ip: IpAddr) {
        self.stats.record_received();
        metrics::counter!(m::TRAP_RECEIVED_TOTAL).increment(1);

        match decode_trap(datagram, source_ip) {
            Ok(trap) => {
                self.stats.record_parsed();
                let event = trap_to_event(&trap);
                if let Err(e) = self.events.send(event).await {
                    tracing::error!(error = %e, "event queue closed");
                }
            }
            Err(e) => {
                self.stats.record_error();
                metrics::counter!(m::TRAP_DECODE_ERRORS_TOTAL).increment(1);
                tracing::debug!(source = %source_ip, error = %e, "malformed trap dropped");
            }
        }
    }
}

/// 데이터그램을 트랩 알림으로 디코딩합니다.
///
/// v2c 트랩 PDU가 아니거나 snmpTrapOID varbind가 없으면 에러입니다.
pub fn decode_trap(datagram: &[u8], source_ip: IpAddr) -> Result<TrapNotification, SnmpError> {
    let msg = ber::decode_message(datagram)?;
    if msg.pdu.pdu_type != PduType::TrapV2 {
        return Err(SnmpError::Decode {
            offset: 0,
            reason: format!("expected SNMPv2-Trap pdu, got {:?}", msg.pdu.pdu_type),
        });
    }

    let trap_oid_key = snmp_trap_oid();
    let mut trap_oid = None;
    let mut varbinds = Vec::new();
    for vb in msg.pdu.varbinds {
        if vb.oid == trap_oid_key {
            match vb.value {
                SnmpValue::Oid(oid) => trap_oid = Some(oid),
                other => {
                    return Err(SnmpError::Decode {
                        offset: 0,
                        reason: format!("snmpTrapOID varbind is not an oid: {other:?}"),
                    });
                }
            }
        } else {
            varbinds.push((vb.oid.to_string(), vb.value));
        }
    }

    let trap_oid = trap_oid.ok_or(SnmpError::Decode {
        offset: 0,
        reason: "trap missing snmpTrapOID varbind".to_owned(),
    })?;

    Ok(TrapNotification {
        source_ip,
        trap_type: symbolic_trap_type(&trap_oid),
        trap_oid: trap_oid.to_string(),
        varbinds,
    })
}

/// 트랩 알림을 정규화 이벤트(코드 6000+심각도)로 변환합니다.
pub fn trap_to_event(trap: &TrapNotification) -> NormalizedEvent {
    let severity = trap_severity(&trap.trap_type);
    let mut event = NormalizedEvent::new(
        EventSource::SnmpTrap,
        CODE_TRAP_BASE + u32::from(severity.level()),
        severity,
    )
    .with_computer(trap.source_ip.to_string())
    .with_ip(trap.source_ip.to_string())
    .with_provider(PROVIDER)
    .with_channel("network")
    .with_message(format!("snmp trap: {}", trap.trap_type))
    .with_data("trap_oid", trap.trap_oid.clone())
    .with_data("trap_type", trap.trap_type.clone());
    for (oid, value) in &trap.varbinds {
        event = event.with_data(oid.clone(), value.to_json());
    }
    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::{Pdu, SnmpMessage, VarBind, encode_message, VERSION_2C};

    fn trap_datagram(trap_oid: &str, extra: Vec<VarBind>) -> Vec<u8> {
        let mut varbinds = vec![
            VarBind {
                oid: Oid::parse("1.3.6.1.2.1.1.3.0").unwrap(),
                value: SnmpValue::TimeTicks(4242),
            },
            VarBind {
                oid: snmp_trap_oid(),
                value: SnmpValue::Oid(Oid::parse(trap_oid).unwrap()),
            },
        ];
        varbinds.extend(extra);
        encode_message(&SnmpMessage {
            version: VERSION_2C,
            community: "public".to_owned(),
            pdu: Pdu {
                pdu_type: PduType::TrapV2,
                request_id: 1,
                error_status: 0,
                error_index: 0,
                varbinds,
            },
        })
    }

    #[test]
    fn standard_traps_map_to_symbols() {
        let cases = [
            ("1.3.6.1.6.3.1.1.5.1", "coldStart"),
            ("1.3.6.1.6.3.1.1.5.2", "warmStart"),
            ("1.3.6.1.6.3.1.1.5.3", "linkDown"),
            ("1.3.6.1.6.3.1.1.5.4", "linkUp"),
            ("1.3.6.1.6.3.1.1.5.5", "authenticationFailure"),
            ("1.3.6.1.6.3.1.1.5.6", "egpNeighborLoss"),
        ];
        for (oid, expected) in cases {
            assert_eq!(symbolic_trap_type(&Oid::parse(oid).unwrap()), expected);
        }
    }

    #[test]
    fn unknown_trap_oid_passes_through_raw() {
        let oid = Oid::parse("1.3.6.1.4.1.9.9.41.2.0.1").unwrap();
        assert_eq!(symbolic_trap_type(&oid), "1.3.6.1.4.1.9.9.41.2.0.1");
    }

    #[test]
    fn severity_policy_is_fixed() {
        assert_eq!(trap_severity("authenticationFailure"), Severity::High);
        assert_eq!(trap_severity("linkDown"), Severity::High);
        assert_eq!(trap_severity("linkUp"), Severity::Medium);
        assert_eq!(trap_severity("warmStart"), Severity::Medium);
        assert_eq!(trap_severity("coldStart"), Severity::Low);
        assert_eq!(trap_severity("1.3.6.1.4.1.9.9.41.2.0.1"), Severity::Low);
    }

    #[test]
    fn decode_link_down_trap() {
        let datagram = trap_datagram(
            "1.3.6.1.6.3.1.1.5.3",
            vec![VarBind {
                oid: Oid::parse("1.3.6.1.2.1.2.2.1.1.3").unwrap(),
                value: SnmpValue::Integer(3),
            }],
        );
        let source: IpAddr = "192.168.10.2".parse().unwrap();
        let trap = decode_trap(&datagram, source).unwrap();

        assert_eq!(trap.trap_type, "linkDown");
        assert_eq!(trap.trap_oid, "1.3.6.1.6.3.1.1.5.3");
        assert_eq!(trap.source_ip, source);
        // sysUpTime과 ifIndex varbind가 남음
        assert_eq!(trap.varbinds.len(), 2);
    }

    #[test]
    fn trap_event_code_embeds_severity() {
        let datagram = trap_datagram("1.3.6.1.6.3.1.1.5.3", Vec::new());
        let trap = decode_trap(&datagram, "10.0.0.1".parse().unwrap()).unwrap();
        let event = trap_to_event(&trap);

        assert_eq!(event.source_type, EventSource::SnmpTrap);
        assert_eq!(event.severity, Severity::High);
        assert_eq!(event.event_code, 6004);
        assert_eq!(event.event_data.get("trap_type").unwrap(), "linkDown");
    }

    #[test]
    fn link_up_event_has_medium_severity() {
        let datagram = trap_datagram("1.3.6.1.6.3.1.1.5.4", Vec::new());
        let trap = decode_trap(&datagram, "10.0.0.1".parse().unwrap()).unwrap();
        let event = trap_to_event(&trap);
        assert_eq!(event.severity, Severity::Medium);
        assert_eq!(event.event_code, 6003);
    }

    #[test]
    fn decode_rejects_non_trap_pdu() {
        let get = ber::encode_get_request("public", 1, &[Oid::parse("1.3.6.1.2.1.1.1.0").unwrap()]);
        let err = decode_trap(&get, "10.0.0.1".parse().unwrap()).unwrap_err();
        assert!(err.to_string().contains("SNMPv2-Trap"));
    }

    #[test]
    fn decode_rejects_trap_without_trap_oid() {
        let datagram = encode_message(&SnmpMessage {
            version: VERSION_2C,
            community: "public".to_owned(),
            pdu: Pdu {
                pdu_type: PduType::TrapV2,
                request_id: 1,
                error_status: 0,
                error_index: 0,
                varbinds: vec![VarBind {
                    oid: Oid::parse("1.3.6.1.2.1.1.3.0").unwrap(),
                    value: SnmpValue::TimeTicks(1),
                }],
            },
        });
        let err = decode_trap(&datagram, "10.0.0.1".parse().unwrap()).unwrap_err();
        assert!(err.to_string().contains("snmpTrapOID"));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_trap(&[0xFF, 0x00, 0x13], "10.0.0.1".parse().unwrap()).is_err());
    }

    #[tokio::test]
    async fn receiver_survives_malformed_trap_between_valid_ones() {
        let (events, mut rx) = netpulse_core::queue::bounded(16);
        let stats = Arc::new(CollectorStats::new("snmp_trap"));
        let receiver = TrapReceiver::bind(
            "127.0.0.1:0".parse().unwrap(),
            events,
            Arc::clone(&stats),
        )
        .await
        .unwrap();
        let bind = receiver.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(receiver.run(shutdown_rx));

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender
            .send_to(&trap_datagram("1.3.6.1.6.3.1.1.5.3", Vec::new()), bind)
            .await
            .unwrap();
        sender.send_to(b"not a trap", bind).await.unwrap();
        sender
            .send_to(&trap_datagram("1.3.6.1.6.3.1.1.5.4", Vec::new()), bind)
            .await
            .unwrap();

        let first = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let second = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.event_data.get("trap_type").unwrap(), "linkDown");
        assert_eq!(second.event_data.get("trap_type").unwrap(), "linkUp");

        let snap = stats.snapshot();
        assert_eq!(snap.received, 3);
        assert_eq!(snap.parsed, 2);
        assert_eq!(snap.errors, 1);

        let _ = shutdown_tx.send(());
        let _ = tokio::time::timeout(std::time::Duration::from_secs(1), handle).await;
    }
}
