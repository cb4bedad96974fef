//! SNMP 수집기 에러 타입
//!
//! [`SnmpError`]는 BER 코덱, 클라이언트, 폴러, 트랩 수신기에서 발생하는
//! 모든 에러를 표현합니다. 폴링 루프는 이 에러를 상위로 전파하지 않고
//! 로그와 카운터, 그리고 폴링 에러 이벤트로 변환합니다.

use netpulse_core::error::NetpulseError;

/// SNMP 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum SnmpError {
    /// 응답 대기 타임아웃 (재시도 소진 후)
    #[error("timeout waiting for response to {oid} after {attempts} attempt(s)")]
    Timeout {
        /// 요청한 OID
        oid: String,
        /// 시도 횟수 (최초 시도 포함)
        attempts: u32,
    },

    /// BER 디코딩 실패
    #[error("ber decode error at offset {offset}: {reason}")]
    Decode {
        /// 실패 위치 (바이트 오프셋)
        offset: usize,
        /// 실패 사유
        reason: String,
    },

    /// 유효하지 않은 OID 문자열
    #[error("invalid oid '{0}'")]
    InvalidOid(String),

    /// 에이전트가 에러 상태를 반환함
    #[error("agent returned error-status {status} at index {index}")]
    ErrorStatus {
        /// SNMP error-status 값
        status: i64,
        /// error-index 값
        index: i64,
    },

    /// 요청한 OID가 장비에 존재하지 않음
    #[error("no such object: {0}")]
    NoSuchObject(String),

    /// 응답의 request-id가 요청과 일치하지 않음
    #[error("response request-id {got} does not match request {expected}")]
    RequestIdMismatch {
        /// 기대한 request-id
        expected: i64,
        /// 수신한 request-id
        got: i64,
    },

    /// 지원하지 않는 인증 방식 (SNMPv3 USM)
    #[error("unsupported snmp auth for device '{device}': {reason}")]
    UnsupportedAuth {
        /// 장비 이름
        device: String,
        /// 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SnmpError> for NetpulseError {
    fn from(err: SnmpError) -> Self {
        NetpulseError::Collector {
            component: "snmp".to_owned(),
            reason: err.to_string(),
        }
    }
}
