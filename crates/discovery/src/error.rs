//! 디스커버리 에러 타입

use netpulse_core::error::NetpulseError;

/// 디스커버리 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// CIDR 표기 오류
    #[error("invalid cidr '{0}'")]
    InvalidCidr(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DiscoveryError> for NetpulseError {
    fn from(err: DiscoveryError) -> Self {
        NetpulseError::Collector {
            component: "discovery".to_owned(),
            reason: err.to_string(),
        }
    }
}
