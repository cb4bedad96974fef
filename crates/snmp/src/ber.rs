//! SNMP BER 코덱 — v2c 메시지의 인코딩/디코딩
//!
//! SNMP가 사용하는 ASN.1 BER 부분집합을 구현합니다.
//! GET 요청 인코딩과 응답/트랩 디코딩에 필요한 타입만 다룹니다.
//!
//! # 메시지 구조
//! ```text
//! SEQUENCE {
//!   INTEGER      version     (v2c = 1)
//!   OCTET STRING community
//!   PDU {                    (컨텍스트 태그: A0 get, A2 response, A7 trap)
//!     INTEGER request-id
//!     INTEGER error-status
//!     INTEGER error-index
//!     SEQUENCE OF { SEQUENCE { OID, value } }
//!   }
//! }
//! ```

use std::fmt;
use std::net::Ipv4Addr;

use crate::error::SnmpError;

// --- 유니버설 태그 ---
const TAG_INTEGER: u8 = 0x02;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_NULL: u8 = 0x05;
const TAG_OID: u8 = 0x06;
const TAG_SEQUENCE: u8 = 0x30;

// --- SNMP 애플리케이션 태그 ---
const TAG_IPADDRESS: u8 = 0x40;
const TAG_COUNTER32: u8 = 0x41;
const TAG_GAUGE32: u8 = 0x42;
const TAG_TIMETICKS: u8 = 0x43;
const TAG_COUNTER64: u8 = 0x46;

// --- v2c 예외 (컨텍스트 태그) ---
const TAG_NO_SUCH_OBJECT: u8 = 0x80;
const TAG_NO_SUCH_INSTANCE: u8 = 0x81;
const TAG_END_OF_MIB_VIEW: u8 = 0x82;

/// SNMP v2c 프로토콜 버전 값
pub const VERSION_2C: i64 = 1;

/// 객체 식별자 (OID)
///
/// 점으로 구분된 정수 경로입니다. 비교/해시가 가능하여
/// 프로파일 테이블과 트랩 심볼 매핑의 키로 사용됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid(Vec<u64>);

impl Oid {
    /// 정수 경로에서 OID를 생성합니다.
    pub fn from_arcs(arcs: impl Into<Vec<u64>>) -> Self {
        Self(arcs.into())
    }

    /// 점 표기 문자열을 파싱합니다. 최소 두 개의 arc가 필요합니다.
    pub fn parse(s: &str) -> Result<Self, SnmpError> {
        let arcs: Result<Vec<u64>, _> = s
            .trim()
            .trim_start_matches('.')
            .split('.')
            .map(|part| part.parse::<u64>())
            .collect();
        match arcs {
            Ok(arcs) if arcs.len() >= 2 && arcs[0] <= 2 && arcs[1] < 40 => Ok(Self(arcs)),
            _ => Err(SnmpError::InvalidOid(s.to_owned())),
        }
    }

    /// arc 슬라이스를 반환합니다.
    pub fn arcs(&self) -> &[u64] {
        &self.0
    }

    /// BER 컨텐츠 바이트로 인코딩합니다.
    fn encode_content(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.0.len() + 1);
        // 처음 두 arc는 40*x+y 한 바이트로 합쳐짐
        out.extend(encode_base128(self.0[0] * 40 + self.0[1]));
        for arc in &self.0[2..] {
            out.extend(encode_base128(*arc));
        }
        out
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.0 {
            if first {
                write!(f, "{arc}")?;
                first = false;
            } else {
                write!(f, ".{arc}")?;
            }
        }
        Ok(())
    }
}

/// SNMP 값 타입
#[derive(Debug, Clone, PartialEq)]
pub enum SnmpValue {
    /// INTEGER
    Integer(i64),
    /// OCTET STRING
    OctetString(Vec<u8>),
    /// NULL (GET 요청의 자리표시 값)
    Null,
    /// OBJECT IDENTIFIER
    Oid(Oid),
    /// IpAddress (네트워크 바이트 순서 4바이트)
    IpAddress(Ipv4Addr),
    /// Counter32
    Counter32(u32),
    /// Gauge32 / Unsigned32
    Gauge32(u32),
    /// TimeTicks (1/100초)
    TimeTicks(u32),
    /// Counter64
    Counter64(u64),
    /// noSuchObject 예외
    NoSuchObject,
    /// noSuchInstance 예외
    NoSuchInstance,
    /// endOfMibView 예외
    EndOfMibView,
}

impl SnmpValue {
    /// 정수로 해석 가능한 값을 i64로 반환합니다.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Counter32(v) | Self::Gauge32(v) | Self::TimeTicks(v) => Some(i64::from(*v)),
            Self::Counter64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// 값의 사람이 읽는 문자열 표현을 반환합니다.
    pub fn display_string(&self) -> String {
        match self {
            Self::Integer(v) => v.to_string(),
            Self::OctetString(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Self::Null => "null".to_owned(),
            Self::Oid(oid) => oid.to_string(),
            Self::IpAddress(addr) => addr.to_string(),
            Self::Counter32(v) | Self::Gauge32(v) | Self::TimeTicks(v) => v.to_string(),
            Self::Counter64(v) => v.to_string(),
            Self::NoSuchObject => "noSuchObject".to_owned(),
            Self::NoSuchInstance => "noSuchInstance".to_owned(),
            Self::EndOfMibView => "endOfMibView".to_owned(),
        }
    }

    /// JSON 값으로 변환합니다 (트랩 varbind를 event_data에 담을 때 사용).
    pub fn to_json(&self) -> serde_json::Value {
        match self.as_i64() {
            Some(v) => serde_json::Value::from(v),
            None => serde_json::Value::from(self.display_string()),
        }
    }
}

/// PDU 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduType {
    /// GetRequest (A0)
    GetRequest,
    /// GetNextRequest (A1)
    GetNextRequest,
    /// Response (A2)
    Response,
    /// SetRequest (A3)
    SetRequest,
    /// GetBulkRequest (A5)
    GetBulkRequest,
    /// InformRequest (A6)
    InformRequest,
    /// SNMPv2-Trap (A7)
    TrapV2,
    /// Report (A8)
    Report,
}

impl PduType {
    fn tag(self) -> u8 {
        match self {
            Self::GetRequest => 0xA0,
            Self::GetNextRequest => 0xA1,
            Self::Response => 0xA2,
            Self::SetRequest => 0xA3,
            Self::GetBulkRequest => 0xA5,
            Self::InformRequest => 0xA6,
            Self::TrapV2 => 0xA7,
            Self::Report => 0xA8,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0xA0 => Some(Self::GetRequest),
            0xA1 => Some(Self::GetNextRequest),
            0xA2 => Some(Self::Response),
            0xA3 => Some(Self::SetRequest),
            0xA5 => Some(Self::GetBulkRequest),
            0xA6 => Some(Self::InformRequest),
            0xA7 => Some(Self::TrapV2),
            0xA8 => Some(Self::Report),
            _ => None,
        }
    }
}

/// 변수 바인딩 (OID + 값)
#[derive(Debug, Clone, PartialEq)]
pub struct VarBind {
    /// 객체 식별자
    pub oid: Oid,
    /// 값
    pub value: SnmpValue,
}

/// SNMP PDU
#[derive(Debug, Clone, PartialEq)]
pub struct Pdu {
    /// PDU 유형
    pub pdu_type: PduType,
    /// 요청/응답 대조용 ID
    pub request_id: i64,
    /// 에러 상태 (0 = noError)
    pub error_status: i64,
    /// 에러가 난 varbind 인덱스
    pub error_index: i64,
    /// 변수 바인딩 목록
    pub varbinds: Vec<VarBind>,
}

/// SNMP v2c 메시지
#[derive(Debug, Clone, PartialEq)]
pub struct SnmpMessage {
    /// 프로토콜 버전 (v2c = 1)
    pub version: i64,
    /// 커뮤니티 문자열
    pub community: String,
    /// PDU
    pub pdu: Pdu,
}

// ─── 인코딩 ──────────────────────────────────────────────────────────

fn encode_base128(mut value: u64) -> Vec<u8> {
    let mut out = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        out.insert(0, ((value & 0x7F) as u8) | 0x80);
        value >>= 7;
    }
    out
}

fn encode_length(len: usize) -> Vec<u8> {
    if len < 128 {
        vec![len as u8]
    } else {
        let bytes: Vec<u8> = len
            .to_be_bytes()
            .into_iter()
            .skip_while(|b| *b == 0)
            .collect();
        let mut out = vec![0x80 | bytes.len() as u8];
        out.extend(bytes);
        out
    }
}

fn encode_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    out.extend(encode_length(content.len()));
    out.extend_from_slice(content);
    out
}

fn encode_integer_content(value: i64) -> Vec<u8> {
    let mut bytes = value.to_be_bytes().to_vec();
    // 부호를 보존하는 최소 길이로 축약
    while bytes.len() > 1 {
        let redundant = (bytes[0] == 0x00 && bytes[1] & 0x80 == 0)
            || (bytes[0] == 0xFF && bytes[1] & 0x80 != 0);
        if redundant {
            bytes.remove(0);
        } else {
            break;
        }
    }
    bytes
}

fn encode_unsigned_content(value: u64) -> Vec<u8> {
    let mut bytes: Vec<u8> = value
        .to_be_bytes()
        .into_iter()
        .skip_while(|b| *b == 0)
        .collect();
    if bytes.is_empty() {
        bytes.push(0);
    }
    // 최상위 비트가 켜져 있으면 음수로 읽히지 않도록 0x00 패딩
    if bytes[0] & 0x80 != 0 {
        bytes.insert(0, 0x00);
    }
    bytes
}

fn encode_value(value: &SnmpValue) -> Vec<u8> {
    match value {
        SnmpValue::Integer(v) => encode_tlv(TAG_INTEGER, &encode_integer_content(*v)),
        SnmpValue::OctetString(bytes) => encode_tlv(TAG_OCTET_STRING, bytes),
        SnmpValue::Null => encode_tlv(TAG_NULL, &[]),
        SnmpValue::Oid(oid) => encode_tlv(TAG_OID, &oid.encode_content()),
        SnmpValue::IpAddress(addr) => encode_tlv(TAG_IPADDRESS, &addr.octets()),
        SnmpValue::Counter32(v) => {
            encode_tlv(TAG_COUNTER32, &encode_unsigned_content(u64::from(*v)))
        }
        SnmpValue::Gauge32(v) => encode_tlv(TAG_GAUGE32, &encode_unsigned_content(u64::from(*v))),
        SnmpValue::TimeTicks(v) => {
            encode_tlv(TAG_TIMETICKS, &encode_unsigned_content(u64::from(*v)))
        }
        SnmpValue::Counter64(v) => encode_tlv(TAG_COUNTER64, &encode_unsigned_content(*v)),
        SnmpValue::NoSuchObject => encode_tlv(TAG_NO_SUCH_OBJECT, &[]),
        SnmpValue::NoSuchInstance => encode_tlv(TAG_NO_SUCH_INSTANCE, &[]),
        SnmpValue::EndOfMibView => encode_tlv(TAG_END_OF_MIB_VIEW, &[]),
    }
}

/// SNMP 메시지를 BER 바이트로 인코딩합니다.
pub fn encode_message(msg: &SnmpMessage) -> Vec<u8> {
    let mut varbind_list = Vec::new();
    for vb in &msg.pdu.varbinds {
        let mut entry = encode_tlv(TAG_OID, &vb.oid.encode_content());
        entry.extend(encode_value(&vb.value));
        varbind_list.extend(encode_tlv(TAG_SEQUENCE, &entry));
    }

    let mut pdu_content = encode_tlv(TAG_INTEGER, &encode_integer_content(msg.pdu.request_id));
    pdu_content.extend(encode_tlv(
        TAG_INTEGER,
        &encode_integer_content(msg.pdu.error_status),
    ));
    pdu_content.extend(encode_tlv(
        TAG_INTEGER,
        &encode_integer_content(msg.pdu.error_index),
    ));
    pdu_content.extend(encode_tlv(TAG_SEQUENCE, &varbind_list));

    let mut msg_content = encode_tlv(TAG_INTEGER, &encode_integer_content(msg.version));
    msg_content.extend(encode_tlv(TAG_OCTET_STRING, msg.community.as_bytes()));
    msg_content.extend(encode_tlv(msg.pdu.pdu_type.tag(), &pdu_content));

    encode_tlv(TAG_SEQUENCE, &msg_content)
}

/// GET 요청 메시지를 인코딩합니다. 각 OID의 값 자리는 NULL입니다.
pub fn encode_get_request(community: &str, request_id: i64, oids: &[Oid]) -> Vec<u8> {
    let varbinds = oids
        .iter()
        .map(|oid| VarBind {
            oid: oid.clone(),
            value: SnmpValue::Null,
        })
        .collect();
    encode_message(&SnmpMessage {
        version: VERSION_2C,
        community: community.to_owned(),
        pdu: Pdu {
            pdu_type: PduType::GetRequest,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds,
        },
    })
}

// ─── 디코딩 ──────────────────────────────────────────────────────────

struct BerReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BerReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn error(&self, reason: impl Into<String>) -> SnmpError {
        SnmpError::Decode {
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn read_byte(&mut self) -> Result<u8, SnmpError> {
        let byte = *self
            .buf
            .get(self.pos)
            .ok_or_else(|| self.error("unexpected end of input"))?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_length(&mut self) -> Result<usize, SnmpError> {
        let first = self.read_byte()?;
        if first & 0x80 == 0 {
            return Ok(usize::from(first));
        }
        let num_bytes = usize::from(first & 0x7F);
        if num_bytes == 0 || num_bytes > 4 {
            return Err(self.error(format!("unsupported length-of-length {num_bytes}")));
        }
        let mut len = 0usize;
        for _ in 0..num_bytes {
            len = (len << 8) | usize::from(self.read_byte()?);
        }
        Ok(len)
    }

    /// TLV 하나를 읽어 (tag, content) 쌍을 반환합니다.
    fn read_tlv(&mut self) -> Result<(u8, &'a [u8]), SnmpError> {
        let tag = self.read_byte()?;
        let len = self.read_length()?;
        if len > self.remaining() {
            return Err(self.error(format!(
                "length {len} exceeds remaining {} bytes",
                self.remaining()
            )));
        }
        let content = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok((tag, content))
    }

    fn expect_tlv(&mut self, expected: u8, what: &str) -> Result<&'a [u8], SnmpError> {
        let offset = self.pos;
        let (tag, content) = self.read_tlv()?;
        if tag != expected {
            return Err(SnmpError::Decode {
                offset,
                reason: format!("expected {what} (tag {expected:#04x}), got tag {tag:#04x}"),
            });
        }
        Ok(content)
    }
}

fn decode_integer_content(content: &[u8], offset: usize) -> Result<i64, SnmpError> {
    if content.is_empty() || content.len() > 8 {
        return Err(SnmpError::Decode {
            offset,
            reason: format!("invalid integer length {}", content.len()),
        });
    }
    // 부호 확장
    let mut value: i64 = if content[0] & 0x80 != 0 { -1 } else { 0 };
    for byte in content {
        value = (value << 8) | i64::from(*byte);
    }
    Ok(value)
}

fn decode_unsigned_content(content: &[u8], offset: usize) -> Result<u64, SnmpError> {
    let trimmed = if content.first() == Some(&0x00) {
        &content[1..]
    } else {
        content
    };
    if trimmed.len() > 8 {
        return Err(SnmpError::Decode {
            offset,
            reason: format!("invalid unsigned length {}", content.len()),
        });
    }
    let mut value = 0u64;
    for byte in trimmed {
        value = (value << 8) | u64::from(*byte);
    }
    Ok(value)
}

fn decode_oid_content(content: &[u8], offset: usize) -> Result<Oid, SnmpError> {
    if content.is_empty() {
        return Err(SnmpError::Decode {
            offset,
            reason: "empty oid".to_owned(),
        });
    }
    let mut arcs = Vec::new();
    let mut iter = content.iter().peekable();

    let mut first = 0u64;
    loop {
        let byte = *iter.next().ok_or(SnmpError::Decode {
            offset,
            reason: "truncated oid arc".to_owned(),
        })?;
        first = (first << 7) | u64::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            break;
        }
    }
    // 첫 바이트 묶음은 40*x+y
    if first < 80 {
        arcs.push(first / 40);
        arcs.push(first % 40);
    } else {
        arcs.push(2);
        arcs.push(first - 80);
    }

    let mut current = 0u64;
    let mut pending = false;
    for byte in iter {
        current = (current << 7) | u64::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            arcs.push(current);
            current = 0;
            pending = false;
        } else {
            pending = true;
        }
    }
    if pending {
        return Err(SnmpError::Decode {
            offset,
            reason: "truncated oid arc".to_owned(),
        });
    }
    Ok(Oid(arcs))
}

fn decode_value(tag: u8, content: &[u8], offset: usize) -> Result<SnmpValue, SnmpError> {
    match tag {
        TAG_INTEGER => Ok(SnmpValue::Integer(decode_integer_content(content, offset)?)),
        TAG_OCTET_STRING => Ok(SnmpValue::OctetString(content.to_vec())),
        TAG_NULL => Ok(SnmpValue::Null),
        TAG_OID => Ok(SnmpValue::Oid(decode_oid_content(content, offset)?)),
        TAG_IPADDRESS => {
            let octets: [u8; 4] = content.try_into().map_err(|_| SnmpError::Decode {
                offset,
                reason: format!("ipaddress must be 4 bytes, got {}", content.len()),
            })?;
            Ok(SnmpValue::IpAddress(Ipv4Addr::from(octets)))
        }
        TAG_COUNTER32 => Ok(SnmpValue::Counter32(
            decode_unsigned_content(content, offset)? as u32,
        )),
        TAG_GAUGE32 => Ok(SnmpValue::Gauge32(
            decode_unsigned_content(content, offset)? as u32,
        )),
        TAG_TIMETICKS => Ok(SnmpValue::TimeTicks(
            decode_unsigned_content(content, offset)? as u32,
        )),
        TAG_COUNTER64 => Ok(SnmpValue::Counter64(decode_unsigned_content(
            content, offset,
        )?)),
        TAG_NO_SUCH_OBJECT => Ok(SnmpValue::NoSuchObject),
        TAG_NO_SUCH_INSTANCE => Ok(SnmpValue::NoSuchInstance),
        TAG_END_OF_MIB_VIEW => Ok(SnmpValue::EndOfMibView),
        _ => Err(SnmpError::Decode {
            offset,
            reason: format!("unsupported value tag {tag:#04x}"),
        }),
    }
}

/// BER 바이트에서 SNMP 메시지를 디코딩합니다.
pub fn decode_message(buf: &[u8]) -> Result<SnmpMessage, SnmpError> {
    let mut outer = BerReader::new(buf);
    let msg_content = outer.expect_tlv(TAG_SEQUENCE, "message sequence")?;

    let mut reader = BerReader::new(msg_content);
    let version_content = reader.expect_tlv(TAG_INTEGER, "version")?;
    let version = decode_integer_content(version_content, reader.pos)?;

    let community_content = reader.expect_tlv(TAG_OCTET_STRING, "community")?;
    let community = String::from_utf8_lossy(community_content).into_owned();

    let pdu_offset = reader.pos;
    let (pdu_tag, pdu_content) = reader.read_tlv()?;
    let pdu_type = PduType::from_tag(pdu_tag).ok_or(SnmpError::Decode {
        offset: pdu_offset,
        reason: format!("unknown pdu tag {pdu_tag:#04x}"),
    })?;

    let mut pdu_reader = BerReader::new(pdu_content);
    let request_id =
        decode_integer_content(pdu_reader.expect_tlv(TAG_INTEGER, "request-id")?, pdu_reader.pos)?;
    let error_status = decode_integer_content(
        pdu_reader.expect_tlv(TAG_INTEGER, "error-status")?,
        pdu_reader.pos,
    )?;
    let error_index = decode_integer_content(
        pdu_reader.expect_tlv(TAG_INTEGER, "error-index")?,
        pdu_reader.pos,
    )?;

    let varbind_list = pdu_reader.expect_tlv(TAG_SEQUENCE, "varbind list")?;
    let mut vb_reader = BerReader::new(varbind_list);
    let mut varbinds = Vec::new();
    while vb_reader.remaining() > 0 {
        let entry = vb_reader.expect_tlv(TAG_SEQUENCE, "varbind")?;
        let mut entry_reader = BerReader::new(entry);
        let oid_content = entry_reader.expect_tlv(TAG_OID, "varbind oid")?;
        let oid = decode_oid_content(oid_content, entry_reader.pos)?;
        let value_offset = entry_reader.pos;
        let (value_tag, value_content) = entry_reader.read_tlv()?;
        let value = decode_value(value_tag, value_content, value_offset)?;
        varbinds.push(VarBind { oid, value });
    }

    Ok(SnmpMessage {
        version,
        community,
        pdu: Pdu {
            pdu_type,
            request_id,
            error_status,
            error_index,
            varbinds,
        },
    })
}
