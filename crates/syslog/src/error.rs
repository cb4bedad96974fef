//! Syslog 수신기 에러 타입

use netpulse_core::error::NetpulseError;

/// Syslog 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum SyslogError {
    /// 메시지 파싱 실패
    #[error("syslog parse error: {reason}")]
    Parse {
        /// 실패 사유
        reason: String,
    },

    /// 입력 크기 초과
    #[error("syslog message too large: {size} bytes (max: {max})")]
    TooLarge {
        /// 입력 크기
        size: usize,
        /// 허용 최대 크기
        max: usize,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SyslogError> for NetpulseError {
    fn from(err: SyslogError) -> Self {
        NetpulseError::Collector {
            component: "syslog".to_owned(),
            reason: err.to_string(),
        }
    }
}
