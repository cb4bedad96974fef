//! 에러 타입 — 도메인별 에러 정의

/// Netpulse 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum NetpulseError {
    /// 설정 관련 에러 — 시작 시에만 발생하며 치명적
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 수집기 내부 에러 (수집기 밖으로 전파되지 않고 로그/카운터로 처리)
    #[error("collector error: {component}: {reason}")]
    Collector {
        /// 수집기 이름 (snmp, syslog, netflow, trap 등)
        component: String,
        /// 에러 사유
        reason: String,
    },

    /// 전송 경로 에러 (배치 전송, 하트비트, 등록)
    #[error("export error: {0}")]
    Export(String),

    /// 이벤트 큐가 닫힘 (소비자 종료 후 enqueue 시도)
    #[error("event queue closed")]
    QueueClosed,

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
