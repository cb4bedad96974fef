//! NetFlow 수집기 에러 타입
//!
//! 디코딩 실패는 수집기 밖으로 전파되지 않습니다 — 패킷 단위로
//! 드롭하고 카운터에 기록합니다. 템플릿 부재는 에러가 아니라
//! 카운터로만 집계되는 정상 경로입니다 (UDP 재정렬로 Data FlowSet이
//! Template FlowSet보다 먼저 도착할 수 있음).

use netpulse_core::error::NetpulseError;

/// NetFlow 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// 패킷 디코딩 실패
    #[error("flow decode error at offset {offset}: {reason}")]
    Decode {
        /// 실패 위치 (바이트 오프셋)
        offset: usize,
        /// 실패 사유
        reason: String,
    },

    /// 지원하지 않는 버전 (5/9/10만 지원)
    #[error("unsupported flow version {0}")]
    UnsupportedVersion(u16),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FlowError> for NetpulseError {
    fn from(err: FlowError) -> Self {
        NetpulseError::Collector {
            component: "netflow".to_owned(),
            reason: err.to_string(),
        }
    }
}
