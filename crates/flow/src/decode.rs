//! NetFlow v5 / v9 / IPFIX 디코더
//!
//! 패킷 첫 2바이트의 버전 필드로 포맷을 분기합니다.
//!
//! - **v5**: 고정 24바이트 헤더 + 48바이트 고정 레코드 × count.
//!   버퍼가 모자라면 예외 없이 그 지점에서 잘라냅니다.
//! - **v9/IPFIX**: Template FlowSet이 레코드 레이아웃을 선언하고,
//!   Data FlowSet은 캐시된 템플릿으로 해석합니다. 템플릿이 없는
//!   Data FlowSet은 통째로 드롭됩니다 (레코드 0개, 에러 아님).
//!
//! 필드 타입은 IANA IPFIX 레지스트리 번호를 따릅니다:
//! 1 octetDeltaCount, 2 packetDeltaCount, 4 protocolIdentifier,
//! 7/11 src/dst 포트, 8/12 IPv4 src/dst 주소.
//! 그 외 타입은 길이만큼 건너뜁니다.

use std::net::{IpAddr, Ipv4Addr};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::FlowError;
use crate::template::{FlowTemplate, TemplateCache};

/// NetFlow v5 버전 값
pub const VERSION_V5: u16 = 5;
/// NetFlow v9 버전 값
pub const VERSION_V9: u16 = 9;
/// IPFIX 버전 값
pub const VERSION_IPFIX: u16 = 10;

const V5_HEADER_LEN: usize = 24;
const V5_RECORD_LEN: usize = 48;
const V9_HEADER_LEN: usize = 20;
const IPFIX_HEADER_LEN: usize = 16;

// IANA IPFIX information element 번호
const FIELD_BYTES: u16 = 1;
const FIELD_PACKETS: u16 = 2;
const FIELD_PROTOCOL: u16 = 4;
const FIELD_SRC_PORT: u16 = 7;
const FIELD_SRC_ADDR_V4: u16 = 8;
const FIELD_DST_PORT: u16 = 11;
const FIELD_DST_ADDR_V4: u16 = 12;

/// 디코딩된 플로우 레코드
///
/// 일시적 구조체 — 수집기가 즉시 정규화 이벤트로 변환합니다.
#[derive(Debug, Clone, Serialize)]
pub struct FlowRecord {
    /// 익스포트 포맷 버전 (5/9/10)
    pub version: u16,
    /// 출발지 주소
    pub src_addr: IpAddr,
    /// 출발지 포트
    pub src_port: u16,
    /// 목적지 주소
    pub dst_addr: IpAddr,
    /// 목적지 포트
    pub dst_port: u16,
    /// IP 프로토콜 번호
    pub protocol: u8,
    /// 전송 바이트 수
    pub bytes: u64,
    /// 전송 패킷 수
    pub packets: u64,
    /// 익스포터 기준 타임스탬프
    pub timestamp: DateTime<Utc>,
    /// 의심 플로우 플래그 (수집기의 휴리스틱이 설정)
    pub is_suspicious: bool,
}

impl FlowRecord {
    fn empty(version: u16, timestamp: DateTime<Utc>) -> Self {
        Self {
            version,
            src_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            src_port: 0,
            dst_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            dst_port: 0,
            protocol: 0,
            bytes: 0,
            packets: 0,
            timestamp,
            is_suspicious: false,
        }
    }
}

/// 패킷 하나의 디코딩 결과
#[derive(Debug, Default)]
pub struct DecodeOutcome {
    /// 디코딩된 플로우 레코드
    pub records: Vec<FlowRecord>,
    /// 이 패킷에서 저장/갱신된 템플릿 수
    pub templates_added: usize,
    /// 템플릿 부재로 드롭된 Data FlowSet 수
    pub missing_template_drops: usize,
}

impl DecodeOutcome {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            templates_added: 0,
            missing_template_drops: 0,
        }
    }
}

fn be_u16(data: &[u8]) -> u16 {
    u16::from_be_bytes([data[0], data[1]])
}

fn be_u32(data: &[u8]) -> u32 {
    u32::from_be_bytes([data[0], data[1], data[2], data[3]])
}

/// 가변 길이(1~8바이트) big-endian 정수를 읽습니다.
fn be_uint(data: &[u8]) -> u64 {
    data.iter().take(8).fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
}

fn epoch_timestamp(secs: u32) -> DateTime<Utc> {
    DateTime::from_timestamp(i64::from(secs), 0).unwrap_or_else(Utc::now)
}

/// UDP 데이터그램 하나를 디코딩합니다.
///
/// `exporter`는 데이터그램의 소스 IP로, v9/IPFIX 템플릿 캐시 키의
/// 일부입니다. 템플릿 캐시는 호출자(수집기 태스크)가 소유합니다.
pub fn decode_packet(
    exporter: IpAddr,
    data: &[u8],
    templates: &mut TemplateCache,
) -> Result<DecodeOutcome, FlowError> {
    if data.len() < 2 {
        return Err(FlowError::Decode {
            offset: 0,
            reason: format!("packet too short for version field ({} bytes)", data.len()),
        });
    }
    match be_u16(&data[0..2]) {
        VERSION_V5 => decode_v5(data),
        VERSION_V9 => decode_v9(exporter, data, templates),
        VERSION_IPFIX => decode_ipfix(exporter, data, templates),
        other => Err(FlowError::UnsupportedVersion(other)),
    }
}

// ─── NetFlow v5 ──────────────────────────────────────────────────────

fn decode_v5(data: &[u8]) -> Result<DecodeOutcome, FlowError> {
    if data.len() < V5_HEADER_LEN {
        return Err(FlowError::Decode {
            offset: 0,
            reason: format!("v5 header needs {V5_HEADER_LEN} bytes, got {}", data.len()),
        });
    }

    let count = usize::from(be_u16(&data[2..4]));
    let unix_secs = be_u32(&data[8..12]);
    let timestamp = epoch_timestamp(unix_secs);

    let mut outcome = DecodeOutcome::new();
    let mut offset = V5_HEADER_LEN;
    for _ in 0..count {
        // 선언된 count보다 버퍼가 짧으면 조용히 중단
        if data.len() < offset + V5_RECORD_LEN {
            break;
        }
        let rec = &data[offset..offset + V5_RECORD_LEN];
        let mut record = FlowRecord::empty(VERSION_V5, timestamp);
        record.src_addr = IpAddr::V4(Ipv4Addr::new(rec[0], rec[1], rec[2], rec[3]));
        record.dst_addr = IpAddr::V4(Ipv4Addr::new(rec[4], rec[5], rec[6], rec[7]));
        record.packets = u64::from(be_u32(&rec[16..20]));
        record.bytes = u64::from(be_u32(&rec[20..24]));
        record.src_port = be_u16(&rec[32..34]);
        record.dst_port = be_u16(&rec[34..36]);
        record.protocol = rec[38];
        outcome.records.push(record);
        offset += V5_RECORD_LEN;
    }
    Ok(outcome)
}

// ─── NetFlow v9 ──────────────────────────────────────────────────────

fn decode_v9(
    exporter: IpAddr,
    data: &[u8],
    templates: &mut TemplateCache,
) -> Result<DecodeOutcome, FlowError> {
    if data.len() < V9_HEADER_LEN {
        return Err(FlowError::Decode {
            offset: 0,
            reason: format!("v9 header needs {V9_HEADER_LEN} bytes, got {}", data.len()),
        });
    }
    let unix_secs = be_u32(&data[8..12]);
    let source_id = be_u32(&data[16..20]);
    walk_flowsets(
        exporter,
        source_id,
        VERSION_V9,
        epoch_timestamp(unix_secs),
        &data[V9_HEADER_LEN..],
        V9_HEADER_LEN,
        0, // v9 Template FlowSet id
        templates,
    )
}

// ─── IPFIX ───────────────────────────────────────────────────────────

fn decode_ipfix(
    exporter: IpAddr,
    data: &[u8],
    templates: &mut TemplateCache,
) -> Result<DecodeOutcome, FlowError> {
    if data.len() < IPFIX_HEADER_LEN {
        return Err(FlowError::Decode {
            offset: 0,
            reason: format!(
                "ipfix header needs {IPFIX_HEADER_LEN} bytes, got {}",
                data.len()
            ),
        });
    }
    let export_time = be_u32(&data[4..8]);
    let observation_domain_id = be_u32(&data[12..16]);
    walk_flowsets(
        exporter,
        observation_domain_id,
        VERSION_IPFIX,
        epoch_timestamp(export_time),
        &data[IPFIX_HEADER_LEN..],
        IPFIX_HEADER_LEN,
        2, // IPFIX Template Set id
        templates,
    )
}

// ─── FlowSet 순회 (v9/IPFIX 공통) ────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn walk_flowsets(
    exporter: IpAddr,
    source_id: u32,
    version: u16,
    timestamp: DateTime<Utc>,
    mut body: &[u8],
    mut base_offset: usize,
    template_set_id: u16,
    templates: &mut TemplateCache,
) -> Result<DecodeOutcome, FlowError> {
    let mut outcome = DecodeOutcome::new();

    while body.len() >= 4 {
        let set_id = be_u16(&body[0..2]);
        let set_len = usize::from(be_u16(&body[2..4]));
        if set_len < 4 {
            return Err(FlowError::Decode {
                offset: base_offset,
                reason: format!("flowset length {set_len} below minimum 4"),
            });
        }
        if set_len > body.len() {
            // 선언된 길이보다 버퍼가 짧음 — 이 지점부터 폐기
            tracing::debug!(
                set_id,
                set_len,
                remaining = body.len(),
                "truncated flowset, discarding rest of packet"
            );
            break;
        }
        let content = &body[4..set_len];

        if set_id == template_set_id {
            outcome.templates_added +=
                parse_templates(exporter, source_id, content, base_offset, templates)?;
        } else if set_id >= 256 {
            match templates.get(exporter, source_id, set_id) {
                Some(template) => {
                    decode_data_records(version, timestamp, content, template, &mut outcome);
                }
                None => {
                    // 템플릿이 아직 도착하지 않음 — FlowSet 전체 드롭, 에러 아님
                    outcome.missing_template_drops += 1;
                }
            }
        }
        // 그 외 (옵션 템플릿 등)는 길이만큼 건너뜀

        body = &body[set_len..];
        base_offset += set_len;
    }

    Ok(outcome)
}

/// Template FlowSet 컨텐츠를 파싱해 캐시에 저장합니다.
fn parse_templates(
    exporter: IpAddr,
    source_id: u32,
    mut content: &[u8],
    offset: usize,
    templates: &mut TemplateCache,
) -> Result<usize, FlowError> {
    let mut added = 0usize;
    // 꼬리의 4바이트 미만은 패딩으로 취급
    while content.len() >= 4 {
        let template_id = be_u16(&content[0..2]);
        let field_count = usize::from(be_u16(&content[2..4]));
        content = &content[4..];

        let mut fields = Vec::with_capacity(field_count);
        for _ in 0..field_count {
            if content.len() < 4 {
                return Err(FlowError::Decode {
                    offset,
                    reason: format!(
                        "template {template_id} truncated: expected {field_count} field specs"
                    ),
                });
            }
            let field_type = be_u16(&content[0..2]);
            let field_len = be_u16(&content[2..4]);
            content = &content[4..];
            // IPFIX 엔터프라이즈 필드: 타입 최상위 비트가 켜지면 4바이트 기업 번호가 뒤따름
            if field_type & 0x8000 != 0 {
                if content.len() < 4 {
                    return Err(FlowError::Decode {
                        offset,
                        reason: format!("template {template_id} truncated enterprise number"),
                    });
                }
                content = &content[4..];
            }
            fields.push((field_type & 0x7FFF, field_len));
        }

        templates.insert(exporter, source_id, template_id, FlowTemplate { fields });
        added += 1;
    }
    Ok(added)
}

/// Data FlowSet 컨텐츠를 템플릿으로 해석합니다.
///
/// 남은 바이트가 레코드 하나 길이보다 짧아지면 멈춥니다 (패딩 허용).
fn decode_data_records(
    version: u16,
    timestamp: DateTime<Utc>,
    mut content: &[u8],
    template: &FlowTemplate,
    outcome: &mut DecodeOutcome,
) {
    let Some(record_len) = template.record_len() else {
        tracing::debug!("template contains variable-length fields, dropping flowset");
        return;
    };
    if record_len == 0 {
        return;
    }

    while content.len() >= record_len {
        let mut record = FlowRecord::empty(version, timestamp);
        let mut cursor = content;
        for (field_type, field_len) in &template.fields {
            let len = usize::from(*field_len);
            let field_data = &cursor[..len];
            match (*field_type, len) {
                (FIELD_BYTES, 1..=8) => record.bytes = be_uint(field_data),
                (FIELD_PACKETS, 1..=8) => record.packets = be_uint(field_data),
                (FIELD_PROTOCOL, 1) => record.protocol = field_data[0],
                (FIELD_SRC_PORT, 2) => record.src_port = be_u16(field_data),
                (FIELD_DST_PORT, 2) => record.dst_port = be_u16(field_data),
                (FIELD_SRC_ADDR_V4, 4) => {
                    record.src_addr = IpAddr::V4(Ipv4Addr::new(
                        field_data[0],
                        field_data[1],
                        field_data[2],
                        field_data[3],
                    ));
                }
                (FIELD_DST_ADDR_V4, 4) => {
                    record.dst_addr = IpAddr::V4(Ipv4Addr::new(
                        field_data[0],
                        field_data[1],
                        field_data[2],
                        field_data[3],
                    ));
                }
                // 인식하지 못하는 타입/길이는 건너뜀
                _ => {}
            }
            cursor = &cursor[len..];
        }
        outcome.records.push(record);
        content = &content[record_len..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exporter() -> IpAddr {
        "10.0.0.1".parse().unwrap()
    }

    /// v5 패킷을 조립합니다.
    fn build_v5(count: u16, records: usize) -> Vec<u8> {
        let mut packet = Vec::new();
        packet.extend_from_slice(&VERSION_V5.to_be_bytes());
        packet.extend_from_slice(&count.to_be_bytes());
        packet.extend_from_slice(&100u32.to_be_bytes()); // sys_uptime
        packet.extend_from_slice(&1_700_000_000u32.to_be_bytes()); // unix_secs
        packet.extend_from_slice(&0u32.to_be_bytes()); // unix_nsecs
        packet.extend_from_slice(&1u32.to_be_bytes()); // flow_sequence
        packet.extend_from_slice(&[0, 0]); // engine_type, engine_id
        packet.extend_from_slice(&0u16.to_be_bytes()); // sampling

        for i in 0..records {
            let mut rec = [0u8; 48];
            rec[0..4].copy_from_slice(&[192, 168, 1, i as u8]); // srcaddr
            rec[4..8].copy_from_slice(&[10, 0, 0, 99]); // dstaddr
            rec[16..20].copy_from_slice(&50u32.to_be_bytes()); // dPkts
            rec[20..24].copy_from_slice(&4096u32.to_be_bytes()); // dOctets
            rec[32..34].copy_from_slice(&40000u16.to_be_bytes()); // srcport
            rec[34..36].copy_from_slice(&443u16.to_be_bytes()); // dstport
            rec[38] = 6; // tcp
            packet.extend_from_slice(&rec);
        }
        packet
    }

    /// v9 템플릿 패킷을 조립합니다.
    fn build_v9_template(source_id: u32, template_id: u16) -> Vec<u8> {
        let fields: [(u16, u16); 7] = [
            (8, 4),  // src addr
            (12, 4), // dst addr
            (7, 2),  // src port
            (11, 2), // dst port
            (4, 1),  // protocol
            (1, 4),  // bytes
            (2, 4),  // packets
        ];
        let mut set = Vec::new();
        set.extend_from_slice(&template_id.to_be_bytes());
        set.extend_from_slice(&(fields.len() as u16).to_be_bytes());
        for (ftype, flen) in fields {
            set.extend_from_slice(&ftype.to_be_bytes());
            set.extend_from_slice(&flen.to_be_bytes());
        }

        let mut packet = Vec::new();
        packet.extend_from_slice(&VERSION_V9.to_be_bytes());
        packet.extend_from_slice(&1u16.to_be_bytes()); // count
        packet.extend_from_slice(&100u32.to_be_bytes());
        packet.extend_from_slice(&1_700_000_000u32.to_be_bytes());
        packet.extend_from_slice(&1u32.to_be_bytes()); // sequence
        packet.extend_from_slice(&source_id.to_be_bytes());
        packet.extend_from_slice(&0u16.to_be_bytes()); // flowset id 0 (template)
        packet.extend_from_slice(&((4 + set.len()) as u16).to_be_bytes());
        packet.extend(set);
        packet
    }

    /// 위 템플릿 레이아웃에 맞는 v9 데이터 패킷을 조립합니다.
    fn build_v9_data(source_id: u32, template_id: u16, flows: &[(u16, u64)]) -> Vec<u8> {
        let mut set = Vec::new();
        for (dst_port, bytes) in flows {
            set.extend_from_slice(&[172, 16, 0, 5]); // src addr
            set.extend_from_slice(&[10, 0, 0, 20]); // dst addr
            set.extend_from_slice(&51000u16.to_be_bytes()); // src port
            set.extend_from_slice(&dst_port.to_be_bytes());
            set.push(6); // protocol
            set.extend_from_slice(&(*bytes as u32).to_be_bytes());
            set.extend_from_slice(&10u32.to_be_bytes()); // packets
        }

        let mut packet = Vec::new();
        packet.extend_from_slice(&VERSION_V9.to_be_bytes());
        packet.extend_from_slice(&(flows.len() as u16).to_be_bytes());
        packet.extend_from_slice(&100u32.to_be_bytes());
        packet.extend_from_slice(&1_700_000_000u32.to_be_bytes());
        packet.extend_from_slice(&2u32.to_be_bytes());
        packet.extend_from_slice(&source_id.to_be_bytes());
        packet.extend_from_slice(&template_id.to_be_bytes());
        packet.extend_from_slice(&((4 + set.len()) as u16).to_be_bytes());
        packet.extend(set);
        packet
    }

    #[test]
    fn v5_exact_buffer_yields_declared_count() {
        let packet = build_v5(3, 3);
        assert_eq!(packet.len(), 24 + 48 * 3);
        let mut cache = TemplateCache::new();
        let outcome = decode_packet(exporter(), &packet, &mut cache).unwrap();

        assert_eq!(outcome.records.len(), 3);
        let record = &outcome.records[0];
        assert_eq!(record.version, 5);
        assert_eq!(record.src_addr.to_string(), "192.168.1.0");
        assert_eq!(record.dst_port, 443);
        assert_eq!(record.protocol, 6);
        assert_eq!(record.bytes, 4096);
        assert_eq!(record.packets, 50);
    }

    #[test]
    fn v5_one_byte_short_yields_one_less_record() {
        let mut packet = build_v5(3, 3);
        packet.pop();
        let mut cache = TemplateCache::new();
        let outcome = decode_packet(exporter(), &packet, &mut cache).unwrap();
        assert_eq!(outcome.records.len(), 2);
    }

    #[test]
    fn v5_count_larger_than_buffer_is_safe() {
        let packet = build_v5(100, 2);
        let mut cache = TemplateCache::new();
        let outcome = decode_packet(exporter(), &packet, &mut cache).unwrap();
        assert_eq!(outcome.records.len(), 2);
    }

    #[test]
    fn data_without_template_is_dropped_without_error() {
        let mut cache = TemplateCache::new();
        let packet = build_v9_data(0, 300, &[(80, 1000)]);
        let outcome = decode_packet(exporter(), &packet, &mut cache).unwrap();

        assert!(outcome.records.is_empty());
        assert_eq!(outcome.missing_template_drops, 1);
    }

    #[test]
    fn data_after_template_is_decoded() {
        let mut cache = TemplateCache::new();
        decode_packet(exporter(), &build_v9_template(0, 300), &mut cache).unwrap();
        assert_eq!(cache.len(), 1);

        let outcome =
            decode_packet(exporter(), &build_v9_data(0, 300, &[(80, 1000)]), &mut cache).unwrap();
        assert_eq!(outcome.records.len(), 1);
        let record = &outcome.records[0];
        assert_eq!(record.version, 9);
        assert_eq!(record.src_addr.to_string(), "172.16.0.5");
        assert_eq!(record.dst_port, 80);
        assert_eq!(record.bytes, 1000);
        assert_eq!(record.packets, 10);
    }

    #[test]
    fn template_from_other_exporter_does_not_apply() {
        let mut cache = TemplateCache::new();
        decode_packet(exporter(), &build_v9_template(0, 300), &mut cache).unwrap();

        let other: IpAddr = "10.0.0.99".parse().unwrap();
        let outcome = decode_packet(other, &build_v9_data(0, 300, &[(80, 1000)]), &mut cache).unwrap();
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.missing_template_drops, 1);
    }

    #[test]
    fn template_and_data_in_single_packet() {
        // 템플릿 FlowSet과 데이터 FlowSet이 한 패킷에 연속으로 담긴 경우
        let template_packet = build_v9_template(0, 300);
        let data_packet = build_v9_data(0, 300, &[(443, 2000), (22, 100)]);
        let mut combined = template_packet.clone();
        combined.extend_from_slice(&data_packet[V9_HEADER_LEN..]);

        let mut cache = TemplateCache::new();
        let outcome = decode_packet(exporter(), &combined, &mut cache).unwrap();
        assert_eq!(outcome.templates_added, 1);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[1].dst_port, 22);
    }

    #[test]
    fn multiple_records_walk_sequentially() {
        let mut cache = TemplateCache::new();
        decode_packet(exporter(), &build_v9_template(0, 300), &mut cache).unwrap();
        let outcome = decode_packet(
            exporter(),
            &build_v9_data(0, 300, &[(80, 1), (81, 2), (82, 3)]),
            &mut cache,
        )
        .unwrap();
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.records[2].dst_port, 82);
        assert_eq!(outcome.records[2].bytes, 3);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut cache = TemplateCache::new();
        let packet = 7u16.to_be_bytes().to_vec();
        let err = decode_packet(exporter(), &packet, &mut cache).unwrap_err();
        assert!(matches!(err, FlowError::UnsupportedVersion(7)));
    }

    #[test]
    fn short_packet_is_rejected() {
        let mut cache = TemplateCache::new();
        assert!(decode_packet(exporter(), &[5], &mut cache).is_err());
        assert!(decode_packet(exporter(), &[0, 9, 0, 1], &mut cache).is_err());
    }

    #[test]
    fn ipfix_template_and_data_roundtrip() {
        // IPFIX: 템플릿 Set id 2, 16바이트 헤더
        let fields: [(u16, u16); 4] = [(8, 4), (12, 4), (11, 2), (1, 8)];
        let mut template_set = Vec::new();
        template_set.extend_from_slice(&400u16.to_be_bytes());
        template_set.extend_from_slice(&(fields.len() as u16).to_be_bytes());
        for (ftype, flen) in fields {
            template_set.extend_from_slice(&ftype.to_be_bytes());
            template_set.extend_from_slice(&flen.to_be_bytes());
        }

        let mut packet = Vec::new();
        packet.extend_from_slice(&VERSION_IPFIX.to_be_bytes());
        packet.extend_from_slice(&0u16.to_be_bytes()); // length (미사용)
        packet.extend_from_slice(&1_700_000_000u32.to_be_bytes());
        packet.extend_from_slice(&1u32.to_be_bytes());
        packet.extend_from_slice(&9u32.to_be_bytes()); // observation domain
        packet.extend_from_slice(&2u16.to_be_bytes()); // template set id
        packet.extend_from_slice(&((4 + template_set.len()) as u16).to_be_bytes());
        packet.extend(template_set);

        let mut cache = TemplateCache::new();
        let outcome = decode_packet(exporter(), &packet, &mut cache).unwrap();
        assert_eq!(outcome.templates_added, 1);

        // 데이터 패킷
        let mut data_set = Vec::new();
        data_set.extend_from_slice(&[1, 2, 3, 4]);
        data_set.extend_from_slice(&[5, 6, 7, 8]);
        data_set.extend_from_slice(&3389u16.to_be_bytes());
        data_set.extend_from_slice(&123_456_789u64.to_be_bytes());

        let mut data_packet = Vec::new();
        data_packet.extend_from_slice(&VERSION_IPFIX.to_be_bytes());
        data_packet.extend_from_slice(&0u16.to_be_bytes());
        data_packet.extend_from_slice(&1_700_000_100u32.to_be_bytes());
        data_packet.extend_from_slice(&2u32.to_be_bytes());
        data_packet.extend_from_slice(&9u32.to_be_bytes());
        data_packet.extend_from_slice(&400u16.to_be_bytes());
        data_packet.extend_from_slice(&((4 + data_set.len()) as u16).to_be_bytes());
        data_packet.extend(data_set);

        let outcome = decode_packet(exporter(), &data_packet, &mut cache).unwrap();
        assert_eq!(outcome.records.len(), 1);
        let record = &outcome.records[0];
        assert_eq!(record.version, 10);
        assert_eq!(record.dst_port, 3389);
        assert_eq!(record.bytes, 123_456_789);
        assert_eq!(record.dst_addr.to_string(), "5.6.7.8");
    }

    #[test]
    fn unknown_field_types_are_skipped_by_length() {
        // 템플릿: 알려지지 않은 타입(210 padding) 2바이트 + dst port
        let fields: [(u16, u16); 2] = [(210, 2), (11, 2)];
        let mut set = Vec::new();
        set.extend_from_slice(&500u16.to_be_bytes());
        set.extend_from_slice(&2u16.to_be_bytes());
        for (ftype, flen) in fields {
            set.extend_from_slice(&ftype.to_be_bytes());
            set.extend_from_slice(&flen.to_be_bytes());
        }
        let mut packet = Vec::new();
        packet.extend_from_slice(&VERSION_V9.to_be_bytes());
        packet.extend_from_slice(&1u16.to_be_bytes());
        packet.extend_from_slice(&100u32.to_be_bytes());
        packet.extend_from_slice(&1_700_000_000u32.to_be_bytes());
        packet.extend_from_slice(&1u32.to_be_bytes());
        packet.extend_from_slice(&0u32.to_be_bytes());
        packet.extend_from_slice(&0u16.to_be_bytes());
        packet.extend_from_slice(&((4 + set.len()) as u16).to_be_bytes());
        packet.extend(set);

        let mut cache = TemplateCache::new();
        decode_packet(exporter(), &packet, &mut cache).unwrap();

        let mut data = Vec::new();
        data.extend_from_slice(&0xBEEFu16.to_be_bytes()); // 건너뛸 필드
        data.extend_from_slice(&8080u16.to_be_bytes());
        let mut data_packet = Vec::new();
        data_packet.extend_from_slice(&VERSION_V9.to_be_bytes());
        data_packet.extend_from_slice(&1u16.to_be_bytes());
        data_packet.extend_from_slice(&100u32.to_be_bytes());
        data_packet.extend_from_slice(&1_700_000_000u32.to_be_bytes());
        data_packet.extend_from_slice(&2u32.to_be_bytes());
        data_packet.extend_from_slice(&0u32.to_be_bytes());
        data_packet.extend_from_slice(&500u16.to_be_bytes());
        data_packet.extend_from_slice(&((4 + data.len()) as u16).to_be_bytes());
        data_packet.extend(data);

        let outcome = decode_packet(exporter(), &data_packet, &mut cache).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].dst_port, 8080);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn decode_arbitrary_bytes_does_not_panic(bytes in prop::collection::vec(any::<u8>(), 0..1024)) {
                let mut cache = TemplateCache::new();
                let _ = decode_packet("10.0.0.1".parse().unwrap(), &bytes, &mut cache);
            }

            #[test]
            fn v5_truncation_never_panics(cut in 0usize..168) {
                let packet = build_v5(3, 3);
                let truncated = &packet[..packet.len().min(24 + cut)];
                let mut cache = TemplateCache::new();
                let _ = decode_packet("10.0.0.1".parse().unwrap(), truncated, &mut cache);
            }
        }
    }
}
