//! Netpulse SNMP 수집기 — 폴링, 장비 프로파일, 트랩 수신
//!
//! # 모듈 구성
//!
//! - [`ber`]: SNMP v2c 메시지의 BER 인코딩/디코딩
//! - [`client`]: UDP GET 클라이언트 (OID별 타임아웃/재시도)
//! - [`profile`]: 장비 유형별 OID 테이블, 값 해석, 이상 탐지
//! - [`poller`]: 장비별 폴링 루프와 스냅샷 캐시
//! - [`trap`]: UDP/162 트랩 수신기
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! DevicePoller --GET--> SnmpClient --BER--> UDP/161
//!      |                                       |
//!      +-- profile.parse_value <---------------+
//!      +-- profile.detect_anomaly --> NormalizedEvent --> EventSender
//!
//! TrapReceiver <--BER-- UDP/162 --> NormalizedEvent --> EventSender
//! ```

pub mod ber;
pub mod client;
pub mod error;
pub mod poller;
pub mod profile;
pub mod trap;

// --- 주요 타입 re-export ---

pub use ber::{Oid, SnmpValue};
pub use client::SnmpClient;
pub use error::SnmpError;
pub use poller::{DevicePoller, PollSnapshot, SnapshotCache, new_snapshot_cache};
pub use profile::{Anomaly, DeviceProfile, MetricMap, MetricValue, profile_for};
pub use trap::{TrapNotification, TrapReceiver};
