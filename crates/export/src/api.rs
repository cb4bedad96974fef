//! 수집 API 클라이언트 — register / heartbeat / event batch
//!
//! 수집 협력 서비스가 노출하는 세 개의 HTTP 연산을 호출합니다:
//!
//! - `POST /api/v1/agents/register` — 시작 시 1회 (유한 재시도, 실패해도 비치명)
//! - `POST /api/v1/agents/heartbeat` — 주기 보고 (실패는 로그 후 무시)
//! - `POST /api/v1/events/batch` — 이벤트 배치 (비 2xx는 에러 → 배치 유지)
//!
//! 배치의 각 이벤트에는 `agent_id`, `event_time`, `collected_at` 필드가
//! 추가됩니다. API 키가 설정되어 있으면 `X-API-Key` 헤더를 붙입니다.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use netpulse_core::config::IngestConfig;
use netpulse_core::event::NormalizedEvent;
use netpulse_core::stats::StatsSnapshot;

use crate::error::ExportError;

const REGISTER_PATH: &str = "/api/v1/agents/register";
const HEARTBEAT_PATH: &str = "/api/v1/agents/heartbeat";
const BATCH_PATH: &str = "/api/v1/events/batch";

/// 에이전트 식별 정보
#[derive(Debug, Clone)]
pub struct AgentIdentity {
    /// 에이전트 고유 ID
    pub agent_id: String,
    /// 에이전트 호스트명
    pub hostname: String,
    /// 에이전트 버전
    pub version: String,
}

/// 하트비트 페이로드의 시스템 섹션
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    /// 현재 이벤트 큐 깊이
    pub queue_depth: usize,
    /// 에이전트 가동 시간 (초)
    pub uptime_secs: u64,
    /// 에이전트 버전
    pub version: String,
}

/// 하트비트 페이로드
#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatPayload {
    /// 에이전트 고유 ID
    pub agent_id: String,
    /// 에이전트 호스트명
    pub hostname: String,
    /// 상태 문자열 (예: "healthy")
    pub status: String,
    /// 보고 시각 (RFC 3339)
    pub timestamp: String,
    /// 수집기별 카운터 스냅샷
    pub stats: Vec<StatsSnapshot>,
    /// 시스템 상태
    pub system: SystemStatus,
}

/// 전송 경로가 의존하는 수집 API 연산 집합
///
/// 배치 전송기와 하트비트 태스크는 이 trait에만 의존하므로
/// 테스트에서 모의 구현으로 대체할 수 있습니다.
pub trait IngestApi: Send + Sync {
    /// 이벤트 배치를 전송합니다. 비 2xx 응답은 에러입니다.
    fn submit_batch(
        &self,
        events: &[NormalizedEvent],
    ) -> impl Future<Output = Result<(), ExportError>> + Send;

    /// 하트비트를 전송합니다.
    fn send_heartbeat(
        &self,
        payload: &HeartbeatPayload,
    ) -> impl Future<Output = Result<(), ExportError>> + Send;
}

/// reqwest 기반 수집 API 클라이언트
pub struct IngestClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    identity: AgentIdentity,
}

impl IngestClient {
    /// 설정에서 클라이언트를 생성합니다.
    pub fn new(config: &IngestConfig, identity: AgentIdentity) -> Result<Self, ExportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.endpoint.trim_end_matches('/').to_owned(),
            api_key: (!config.api_key.is_empty()).then(|| config.api_key.clone()),
            identity,
        })
    }

    /// 에이전트 식별 정보를 반환합니다.
    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.post(format!("{}{path}", self.base_url));
        if let Some(key) = &self.api_key {
            builder = builder.header("X-API-Key", key);
        }
        builder
    }

    async fn check_status(path: &str, response: reqwest::Response) -> Result<(), ExportError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ExportError::Status {
                endpoint: path.to_owned(),
                status: status.as_u16(),
            })
        }
    }

    /// 에이전트를 등록합니다. 시작 시 1회 호출됩니다.
    pub async fn register(&self, capabilities: &[&str]) -> Result<(), ExportError> {
        let body = serde_json::json!({
            "agent_id": self.identity.agent_id,
            "hostname": self.identity.hostname,
            "agent_type": "network_collector",
            "version": self.identity.version,
            "capabilities": capabilities,
        });
        let response = self.post(REGISTER_PATH).json(&body).send().await?;
        Self::check_status(REGISTER_PATH, response).await
    }

    /// 배치의 각 이벤트에 전송 메타데이터를 추가합니다.
    fn augment(&self, events: &[NormalizedEvent]) -> Vec<Value> {
        let collected_at = Utc::now().to_rfc3339();
        events
            .iter()
            .map(|event| {
                let mut value = serde_json::to_value(event).unwrap_or(Value::Null);
                if let Value::Object(map) = &mut value {
                    map.insert(
                        "agent_id".to_owned(),
                        Value::from(self.identity.agent_id.clone()),
                    );
                    map.insert(
                        "event_time".to_owned(),
                        Value::from(event.timestamp.to_rfc3339()),
                    );
                    map.insert("collected_at".to_owned(), Value::from(collected_at.clone()));
                }
                value
            })
            .collect()
    }
}

impl IngestApi for IngestClient {
    async fn submit_batch(&self, events: &[NormalizedEvent]) -> Result<(), ExportError> {
        let body = self.augment(events);
        let response = self.post(BATCH_PATH).json(&body).send().await?;
        Self::check_status(BATCH_PATH, response).await
    }

    async fn send_heartbeat(&self, payload: &HeartbeatPayload) -> Result<(), ExportError> {
        let response = self.post(HEARTBEAT_PATH).json(payload).send().await?;
        Self::check_status(HEARTBEAT_PATH, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netpulse_core::event::{CODE_SYSLOG, EventSource};
    use netpulse_core::types::Severity;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn identity() -> AgentIdentity {
        AgentIdentity {
            agent_id: "agent-test".to_owned(),
            hostname: "collector-01".to_owned(),
            version: "0.1.0".to_owned(),
        }
    }

    fn config_for(server: &MockServer, api_key: &str) -> IngestConfig {
        IngestConfig {
            endpoint: server.uri(),
            api_key: api_key.to_owned(),
            timeout_secs: 5,
            ..IngestConfig::default()
        }
    }

    #[tokio::test]
    async fn register_posts_identity_and_capabilities() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/agents/register"))
            .and(body_partial_json(serde_json::json!({
                "agent_id": "agent-test",
                "agent_type": "network_collector",
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = IngestClient::new(&config_for(&server, ""), identity()).unwrap();
        client.register(&["snmp", "syslog", "netflow"]).await.unwrap();
    }

    #[tokio::test]
    async fn api_key_header_is_sent_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/agents/heartbeat"))
            .and(header("X-API-Key", "secret-key"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = IngestClient::new(&config_for(&server, "secret-key"), identity()).unwrap();
        let payload = HeartbeatPayload {
            agent_id: "agent-test".to_owned(),
            hostname: "collector-01".to_owned(),
            status: "healthy".to_owned(),
            timestamp: Utc::now().to_rfc3339(),
            stats: Vec::new(),
            system: SystemStatus {
                queue_depth: 0,
                uptime_secs: 1,
                version: "0.1.0".to_owned(),
            },
        };
        client.send_heartbeat(&payload).await.unwrap();
    }

    #[tokio::test]
    async fn batch_events_are_augmented_with_agent_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/events/batch"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = IngestClient::new(&config_for(&server, ""), identity()).unwrap();
        let event = NormalizedEvent::new(EventSource::Syslog, CODE_SYSLOG, Severity::Info)
            .with_computer("host-a")
            .with_message("hello");
        client.submit_batch(&[event]).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Vec<Value> = requests[0].body_json().unwrap();
        assert_eq!(body.len(), 1);
        assert_eq!(body[0]["agent_id"], "agent-test");
        assert!(body[0]["event_time"].is_string());
        assert!(body[0]["collected_at"].is_string());
        assert_eq!(body[0]["computer"], "host-a");
        assert_eq!(body[0]["severity"], 1);
    }

    #[tokio::test]
    async fn non_2xx_batch_response_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/events/batch"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = IngestClient::new(&config_for(&server, ""), identity()).unwrap();
        let event = NormalizedEvent::new(EventSource::Syslog, CODE_SYSLOG, Severity::Info);
        let err = client.submit_batch(&[event]).await.unwrap_err();
        assert!(matches!(err, ExportError::Status { status: 503, .. }));
    }
}
