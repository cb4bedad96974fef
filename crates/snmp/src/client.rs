//! SNMP v2c 클라이언트 — UDP GET 요청과 응답 대조
//!
//! 장비당 폴링 사이클마다 하나의 [`SnmpClient`]를 생성하여
//! OID별 GET 요청을 보냅니다. OID마다 독립된 타임아웃/재시도를 적용하므로
//! 하나의 OID 실패가 같은 사이클의 다른 OID 조회를 막지 않습니다.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::ber::{self, Oid, PduType, SnmpValue, VERSION_2C};
use crate::error::SnmpError;

/// 수신 버퍼 크기 — UDP 데이터그램 최대 크기
const RECV_BUFFER_SIZE: usize = 65_535;

/// SNMP v2c 클라이언트
///
/// 소켓 하나를 폴링 사이클 동안 재사용합니다.
/// 요청마다 request-id를 증가시키고, 응답의 request-id가 일치하지 않으면
/// 타임아웃 창 안에서 계속 수신을 시도합니다 (지연 도착한 이전 응답 무시).
pub struct SnmpClient {
    socket: UdpSocket,
    community: String,
    timeout: Duration,
    retries: u32,
    next_request_id: i64,
}

impl SnmpClient {
    /// 대상 에이전트에 연결된 클라이언트를 생성합니다.
    ///
    /// `retries`는 타임아웃 시 추가 시도 횟수입니다 (0 = 한 번만 시도).
    pub async fn connect(
        target: SocketAddr,
        community: impl Into<String>,
        request_timeout: Duration,
        retries: u32,
    ) -> Result<Self, SnmpError> {
        let bind_addr = if target.is_ipv4() {
            SocketAddr::from((std::net::Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((std::net::Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(target).await?;
        Ok(Self {
            socket,
            community: community.into(),
            timeout: request_timeout,
            retries,
            // 같은 사이클 내 요청 구분만 필요하므로 시작값은 임의로 1
            next_request_id: 1,
        })
    }

    /// OID 하나를 GET으로 조회합니다.
    ///
    /// 타임아웃 시 `retries`만큼 재전송하고, 소진되면
    /// [`SnmpError::Timeout`]을 반환합니다.
    pub async fn get(&mut self, oid: &Oid) -> Result<SnmpValue, SnmpError> {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);

        let request = ber::encode_get_request(&self.community, request_id, std::slice::from_ref(oid));
        let attempts = self.retries + 1;

        for _ in 0..attempts {
            self.socket.send(&request).await?;
            match self.recv_response(request_id).await {
                Ok(Some(value)) => return self.interpret_value(oid, value),
                Ok(None) => continue, // 타임아웃, 재시도
                Err(e) => return Err(e),
            }
        }

        Err(SnmpError::Timeout {
            oid: oid.to_string(),
            attempts,
        })
    }

    /// request-id가 일치하는 응답을 타임아웃 창 안에서 수신합니다.
    ///
    /// 타임아웃이면 `Ok(None)`, 일치하는 응답이면 첫 varbind 값을 반환합니다.
    async fn recv_response(&mut self, request_id: i64) -> Result<Option<SnmpValue>, SnmpError> {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        let deadline = tokio::time::Instant::now() + self.timeout;

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            let len = match timeout(remaining, self.socket.recv(&mut buf)).await {
                Ok(Ok(len)) => len,
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => return Ok(None),
            };

            let msg = match ber::decode_message(&buf[..len]) {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!(error = %e, "discarding undecodable snmp datagram");
                    continue;
                }
            };

            if msg.version != VERSION_2C || msg.pdu.pdu_type != PduType::Response {
                continue;
            }
            if msg.pdu.request_id != request_id {
                // 이전 요청의 지연 응답 — 무시하고 계속 수신
                tracing::trace!(
                    expected = request_id,
                    got = msg.pdu.request_id,
                    "ignoring stale snmp response"
                );
                continue;
            }

            if msg.pdu.error_status != 0 {
                return Err(SnmpError::ErrorStatus {
                    status: msg.pdu.error_status,
                    index: msg.pdu.error_index,
                });
            }

            let value = msg
                .pdu
                .varbinds
                .into_iter()
                .next()
                .map(|vb| vb.value)
                .unwrap_or(SnmpValue::Null);
            return Ok(Some(value));
        }
    }

    /// v2c 예외 값을 에러로 변환합니다.
    fn interpret_value(&self, oid: &Oid, value: SnmpValue) -> Result<SnmpValue, SnmpError> {
        match value {
            SnmpValue::NoSuchObject | SnmpValue::NoSuchInstance | SnmpValue::EndOfMibView => {
                Err(SnmpError::NoSuchObject(oid.to_string()))
            }
            value => Ok(value),
        }
    }
}
