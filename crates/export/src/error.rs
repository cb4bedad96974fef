//! 전송 경로 에러 타입

use netpulse_core::error::NetpulseError;

/// 전송 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// HTTP 전송 실패 (연결, 타임아웃 등)
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// 수집 API가 비성공 상태를 반환함
    #[error("{endpoint} returned status {status}")]
    Status {
        /// 호출한 엔드포인트 경로
        endpoint: String,
        /// HTTP 상태 코드
        status: u16,
    },
}

impl From<ExportError> for NetpulseError {
    fn from(err: ExportError) -> Self {
        NetpulseError::Export(err.to_string())
    }
}
