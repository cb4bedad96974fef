//! Netpulse 전송 경로 — 이벤트 배치 전송, 하트비트, 에이전트 등록
//!
//! # 모듈 구성
//!
//! - [`api`]: 수집 API 클라이언트와 [`IngestApi`](api::IngestApi) trait
//! - [`sender`]: 배치 전송 루프 (크기/시간 플러시, 실패 시 배치 유지)
//! - [`heartbeat`]: 주기 상태 보고 태스크
//! - [`error`]: 도메인 에러 타입
//!
//! # 전달 의미론
//!
//! 배치 전송 실패는 배치를 유지한 채 루프 주기로 무한 재시도합니다.
//! 프로세스가 종료되면 큐에 남은 이벤트는 유실됩니다
//! (재시작 간 전달 보장 없음 — 수용된 손실 창).

pub mod api;
pub mod error;
pub mod heartbeat;
pub mod sender;

// --- 주요 타입 re-export ---

pub use api::{AgentIdentity, HeartbeatPayload, IngestApi, IngestClient, SystemStatus};
pub use error::ExportError;
pub use heartbeat::HeartbeatTask;
pub use sender::BatchSender;
