//! Netpulse NetFlow/IPFIX 수집기
//!
//! # 모듈 구성
//!
//! - [`decode`]: v5/v9/IPFIX 바이너리 디코더
//! - [`template`]: `(exporter, source_id, template_id)` 키의 템플릿 캐시
//! - [`collector`]: UDP 수집 태스크와 의심 플로우 휴리스틱
//! - [`error`]: 도메인 에러 타입
//!
//! # 상태 의존성
//!
//! v9/IPFIX Data FlowSet은 같은 익스포터가 먼저 보낸 Template FlowSet
//! 없이는 해석할 수 없습니다. UDP는 순서를 보장하지 않으므로 데이터가
//! 템플릿보다 먼저 도착하는 일이 실제로 일어나며, 이 경우 해당
//! FlowSet은 드롭되고 카운터로만 집계됩니다 (재시도 없음).

pub mod collector;
pub mod decode;
pub mod error;
pub mod template;

// --- 주요 타입 re-export ---

pub use collector::{FlowCollector, flow_to_event, is_suspicious};
pub use decode::{DecodeOutcome, FlowRecord, decode_packet};
pub use error::FlowError;
pub use template::{FlowTemplate, TemplateCache};
