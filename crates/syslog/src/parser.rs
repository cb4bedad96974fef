//! Syslog 파서 — RFC 5424 우선, RFC 3164 폴백
//!
//! [RFC 5424](https://tools.ietf.org/html/rfc5424) 형식을 먼저 시도하고,
//! 버전 필드가 없으면 BSD syslog(RFC 3164)로 해석합니다.
//!
//! # 메시지 형식
//! ```text
//! RFC 5424: <PRI>1 TIMESTAMP HOSTNAME APP-NAME PROCID MSGID SD MSG
//! RFC 3164: <PRI>MMM DD HH:MM:SS hostname tag: message
//! ```
//!
//! PRI는 `facility * 8 + severity`로 분해됩니다 (`<165>` → facility 20,
//! severity 5). RFC 3164에서 타임스탬프+호스트명 패턴이 맞지 않으면
//! 나머지 전체가 메시지가 되고 tag는 `"unknown"`이 됩니다.

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};

use netpulse_core::event::{CODE_SYSLOG, EventSource, NormalizedEvent};
use netpulse_core::types::Severity;

use crate::error::SyslogError;

/// RFC 5424에서 유효한 최대 PRI 값
/// facility 최댓값 23 * 8 + severity 최댓값 7 = 191
const MAX_SYSLOG_PRI: u16 = 191;

/// 이벤트 provider 필드 값
const PROVIDER: &str = "NetPulse-Syslog";

/// 파싱된 syslog 레코드
///
/// 일시적 구조체 — 즉시 정규화 이벤트로 변환됩니다.
/// severity는 syslog 스케일(0 Emergency ~ 7 Debug)을 그대로 보존합니다.
#[derive(Debug, Clone, PartialEq)]
pub struct SyslogRecord {
    /// Facility (0~23)
    pub facility: u8,
    /// Syslog severity (0~7)
    pub severity: u8,
    /// 메시지 타임스탬프
    pub timestamp: DateTime<Utc>,
    /// 호스트명 (없으면 빈 문자열)
    pub hostname: String,
    /// 태그/앱 이름 (RFC 3164에서 패턴 불일치 시 "unknown")
    pub tag: String,
    /// 메시지 본문
    pub message: String,
    /// RFC 5424 Structured Data에서 추출한 키/값 쌍
    pub structured_data: Vec<(String, String)>,
}

/// Syslog severity(0~7)를 수집 심각도(1~5)로 변환합니다.
///
/// 고정 매핑 테이블:
/// 0,1,2 → Critical(5) / 3 → High(4) / 4 → Medium(3) / 5 → Low(2) / 6,7 → Info(1)
pub fn map_severity(syslog_severity: u8) -> Severity {
    match syslog_severity {
        0..=2 => Severity::Critical,
        3 => Severity::High,
        4 => Severity::Medium,
        5 => Severity::Low,
        _ => Severity::Info,
    }
}

/// 파서 형식 모드
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// RFC 5424를 먼저 시도하고 실패 시 RFC 3164로 폴백 (기본값)
    #[default]
    Auto,
    /// RFC 5424만 허용 — 폴백 없음
    Rfc5424,
    /// RFC 3164로만 해석
    Rfc3164,
}

impl ParseMode {
    /// 설정 문자열에서 모드를 파싱합니다. 모르는 값은 Auto로 취급합니다.
    pub fn from_config(format: &str) -> Self {
        match format {
            "rfc5424" => Self::Rfc5424,
            "rfc3164" => Self::Rfc3164,
            _ => Self::Auto,
        }
    }
}

/// Syslog 파서
///
/// 상태가 없으며, UDP/TCP 수신기가 공유합니다.
pub struct SyslogParser {
    /// 최대 허용 입력 크기 (바이트)
    max_input_size: usize,
    /// 형식 모드
    mode: ParseMode,
}

impl SyslogParser {
    /// 기본 설정으로 새 파서를 생성합니다.
    pub fn new() -> Self {
        Self {
            max_input_size: 64 * 1024,
            mode: ParseMode::Auto,
        }
    }

    /// 최대 입력 크기를 설정합니다.
    pub fn with_max_input_size(mut self, size: usize) -> Self {
        self.max_input_size = size;
        self
    }

    /// 형식 모드를 설정합니다.
    pub fn with_mode(mut self, mode: ParseMode) -> Self {
        self.mode = mode;
        self
    }

    /// 원시 syslog 메시지를 파싱합니다.
    pub fn parse(&self, raw: &[u8]) -> Result<SyslogRecord, SyslogError> {
        if raw.len() > self.max_input_size {
            return Err(SyslogError::TooLarge {
                size: raw.len(),
                max: self.max_input_size,
            });
        }

        let input = String::from_utf8_lossy(raw);
        let input = input.trim();

        if input.is_empty() {
            return Err(SyslogError::Parse {
                reason: "empty input".to_owned(),
            });
        }

        // PRI 파싱: <NNN>
        if !input.starts_with('<') {
            return Err(SyslogError::Parse {
                reason: "missing PRI field (expected '<')".to_owned(),
            });
        }
        let pri_end = input.find('>').ok_or_else(|| SyslogError::Parse {
            reason: "unterminated PRI field".to_owned(),
        })?;
        let pri_str = &input[1..pri_end];
        let pri: u16 = pri_str.parse().map_err(|_| SyslogError::Parse {
            reason: format!("invalid PRI value: '{pri_str}'"),
        })?;
        if pri > MAX_SYSLOG_PRI {
            return Err(SyslogError::Parse {
                reason: format!("PRI value {pri} out of valid range (0-{MAX_SYSLOG_PRI})"),
            });
        }

        let facility = (pri >> 3) as u8;
        let severity = (pri & 0x7) as u8;

        let remainder = &input[pri_end + 1..];

        // VERSION 확인 (RFC 5424: "1 "), Auto 모드는 실패 시 RFC 3164 폴백
        if self.mode != ParseMode::Rfc3164 {
            match remainder.strip_prefix("1 ") {
                Some(body) => match self.parse_rfc5424_body(body) {
                    Ok((timestamp, hostname, tag, message, structured_data)) => {
                        return Ok(SyslogRecord {
                            facility,
                            severity,
                            timestamp,
                            hostname,
                            tag,
                            message,
                            structured_data,
                        });
                    }
                    Err(e) if self.mode == ParseMode::Rfc5424 => return Err(e),
                    Err(e) => {
                        tracing::trace!(error = %e, "rfc5424 parse failed, falling back to rfc3164");
                    }
                },
                None if self.mode == ParseMode::Rfc5424 => {
                    return Err(SyslogError::Parse {
                        reason: "missing rfc5424 version field".to_owned(),
                    });
                }
                None => {}
            }
        }

        let (timestamp, hostname, tag, message) = Self::parse_rfc3164_body(remainder);
        Ok(SyslogRecord {
            facility,
            severity,
            timestamp,
            hostname,
            tag,
            message,
            structured_data: Vec::new(),
        })
    }

    /// RFC 5424 메시지 본문을 파싱합니다.
    ///
    /// 형식: `TIMESTAMP HOSTNAME APP-NAME PROCID MSGID STRUCTURED-DATA MSG`
    #[allow(clippy::type_complexity)]
    fn parse_rfc5424_body(
        &self,
        body: &str,
    ) -> Result<(DateTime<Utc>, String, String, String, Vec<(String, String)>), SyslogError> {
        let parts: Vec<&str> = body.splitn(6, ' ').collect();
        if parts.len() < 6 {
            return Err(SyslogError::Parse {
                reason: format!(
                    "rfc5424 requires at least 6 fields after version, got {}",
                    parts.len()
                ),
            });
        }

        let timestamp_str = nilvalue_to_empty(parts[0]);
        let timestamp = if timestamp_str.is_empty() {
            Utc::now()
        } else {
            Self::parse_rfc3339(timestamp_str)?
        };

        let hostname = nilvalue_to_empty(parts[1]).to_owned();
        let app_name = nilvalue_to_empty(parts[2]).to_owned();
        // PROCID(parts[3]), MSGID(parts[4])는 보존하지 않음

        let sd_and_msg = parts[5];
        let (message, structured_data) = if sd_and_msg.starts_with('[') {
            let (sd_part, msg_part) = split_sd_and_message(sd_and_msg);
            let fields = parse_structured_data(&sd_part)?;
            (msg_part, fields)
        } else if let Some(msg) = sd_and_msg.strip_prefix("- ") {
            (msg.to_owned(), Vec::new())
        } else if sd_and_msg == "-" {
            (String::new(), Vec::new())
        } else {
            (sd_and_msg.to_owned(), Vec::new())
        };

        Ok((timestamp, hostname, app_name, message, structured_data))
    }

    /// RFC 3164 (BSD syslog) 본문을 최선 노력으로 파싱합니다.
    ///
    /// `MMM DD HH:MM:SS hostname tag: message` 패턴이 맞으면 분해하고,
    /// 아니면 전체를 메시지로 취급하고 tag를 "unknown"으로 둡니다.
    fn parse_rfc3164_body(body: &str) -> (DateTime<Utc>, String, String, String) {
        let parts: Vec<&str> = body.splitn(4, ' ').collect();
        if parts.len() == 4 {
            let timestamp_str = format!("{} {} {}", parts[0], parts[1], parts[2]);
            if let Ok(timestamp) = Self::parse_bsd_timestamp(&timestamp_str) {
                let remainder = parts[3];
                if let Some((hostname, rest)) = remainder.split_once(' ') {
                    if let Some((tag, message)) = rest.split_once(':') {
                        return (
                            timestamp,
                            hostname.to_owned(),
                            tag.trim().to_owned(),
                            message.trim_start().to_owned(),
                        );
                    }
                    return (
                        timestamp,
                        hostname.to_owned(),
                        "unknown".to_owned(),
                        rest.to_owned(),
                    );
                }
                return (
                    timestamp,
                    remainder.to_owned(),
                    "unknown".to_owned(),
                    String::new(),
                );
            }
        }
        // 타임스탬프 패턴 불일치 — 나머지 전체가 메시지
        (Utc::now(), String::new(), "unknown".to_owned(), body.to_owned())
    }

    /// RFC 3339 타임스탬프를 파싱합니다.
    fn parse_rfc3339(timestamp: &str) -> Result<DateTime<Utc>, SyslogError> {
        DateTime::parse_from_rfc3339(timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| SyslogError::Parse {
                reason: format!("invalid rfc3339 timestamp '{timestamp}': {e}"),
            })
    }

    /// BSD syslog 타임스탬프(`MMM DD HH:MM:SS`)를 파싱합니다.
    ///
    /// 연도 정보가 없으므로 현재 연도를 가정합니다.
    fn parse_bsd_timestamp(timestamp: &str) -> Result<DateTime<Utc>, SyslogError> {
        let current_year = Utc::now().year();
        let with_year = format!("{current_year} {timestamp}");
        let dt = NaiveDateTime::parse_from_str(&with_year, "%Y %b %e %H:%M:%S").map_err(|e| {
            SyslogError::Parse {
                reason: format!("invalid bsd timestamp '{timestamp}': {e}"),
            }
        })?;
        Ok(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
    }
}

impl Default for SyslogParser {
    fn default() -> Self {
        Self::new()
    }
}

/// NILVALUE (`-`)를 빈 문자열로 변환합니다.
fn nilvalue_to_empty(value: &str) -> &str {
    if value == "-" { "" } else { value }
}

/// Structured Data 부분과 메시지 부분을 분리합니다.
///
/// SD는 하나 이상의 `[...]` 블록으로 구성되며, 그 이후가 메시지입니다.
fn split_sd_and_message(input: &str) -> (String, String) {
    let mut sd_part = String::new();
    let mut depth = 0;
    let mut in_quote = false;
    let mut escaped = false;

    for (idx, ch) in input.char_indices() {
        if escaped {
            sd_part.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quote => {
                sd_part.push(ch);
                escaped = true;
            }
            '"' => {
                sd_part.push(ch);
                in_quote = !in_quote;
            }
            '[' if !in_quote => {
                sd_part.push(ch);
                depth += 1;
            }
            ']' if !in_quote => {
                sd_part.push(ch);
                depth -= 1;
                if depth == 0 {
                    let remaining = &input[idx + ch.len_utf8()..];
                    if remaining.starts_with('[') {
                        continue;
                    }
                    return (sd_part, remaining.trim_start().to_owned());
                }
            }
            _ => {
                sd_part.push(ch);
            }
        }
    }

    // 닫히지 않은 SD는 전체를 SD로 간주
    (sd_part, String::new())
}

/// RFC 5424 Structured Data를 파싱합니다.
///
/// `[sd-id param1="value1"][sd-id2 ...]` 형식에서
/// `sd_{id}_{param}` 키의 쌍을 추출합니다.
fn parse_structured_data(sd: &str) -> Result<Vec<(String, String)>, SyslogError> {
    let mut fields = Vec::new();
    let mut chars = sd.chars().peekable();

    while chars.peek().is_some() {
        if chars.next() != Some('[') {
            break;
        }

        let mut sd_id = String::new();
        while let Some(&ch) = chars.peek() {
            if ch == ']' || ch == ' ' {
                break;
            }
            sd_id.push(ch);
            chars.next();
        }
        if sd_id.is_empty() {
            return Err(SyslogError::Parse {
                reason: "empty SD-ID in structured data".to_owned(),
            });
        }

        while let Some(&ch) = chars.peek() {
            if ch == ']' {
                chars.next();
                break;
            }
            if ch == ' ' {
                chars.next();
                continue;
            }

            let mut param_name = String::new();
            while let Some(&ch) = chars.peek() {
                if ch == '=' {
                    break;
                }
                param_name.push(ch);
                chars.next();
            }
            if chars.next() != Some('=') {
                break;
            }
            if chars.next() != Some('"') {
                return Err(SyslogError::Parse {
                    reason: "SD-PARAM value must be quoted".to_owned(),
                });
            }

            let mut param_value = String::new();
            let mut escaped = false;
            for ch in chars.by_ref() {
                if escaped {
                    param_value.push(ch);
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == '"' {
                    break;
                } else {
                    param_value.push(ch);
                }
            }

            fields.push((format!("sd_{sd_id}_{param_name}"), param_value));
        }
    }

    Ok(fields)
}

/// Syslog 레코드를 정규화 이벤트(코드 4000)로 변환합니다.
///
/// `source_ip`는 송신 소켓의 피어 주소로, 호스트명이 비어 있으면
/// computer 필드를 대신 채웁니다.
pub fn record_to_event(record: &SyslogRecord, source_ip: std::net::IpAddr) -> NormalizedEvent {
    let severity = map_severity(record.severity);
    let computer = if record.hostname.is_empty() {
        source_ip.to_string()
    } else {
        record.hostname.clone()
    };
    let mut event = NormalizedEvent::new(EventSource::Syslog, CODE_SYSLOG, severity)
        .with_computer(computer)
        .with_ip(source_ip.to_string())
        .with_provider(PROVIDER)
        .with_channel("syslog")
        .with_message(record.message.clone())
        .with_data("facility", record.facility)
        .with_data("syslog_severity", record.severity)
        .with_data("tag", record.tag.clone());
    for (key, value) in &record.structured_data {
        event = event.with_data(key.clone(), value.clone());
    }
    event
}
