//! 템플릿 캐시 — NetFlow v9/IPFIX 레코드 레이아웃 추적
//!
//! v9/IPFIX는 Data FlowSet의 레이아웃을 별도의 Template FlowSet으로
//! 먼저 선언합니다. 캐시 키는 `(exporter_ip, source_id, template_id)`로,
//! 서로 다른 익스포터가 같은 template_id를 써도 충돌하지 않습니다.
//!
//! 같은 키의 재정의는 덮어쓰며, 만료는 없습니다
//! (프로세스 수명 동안 유지 — 수용된 리소스 증가 특성).
//! 캐시는 NetFlow 수집기 태스크가 단독으로 소유/변경합니다.

use std::collections::HashMap;
use std::net::IpAddr;

/// 템플릿 하나 — 필드 (type, length) 목록의 순서 보존
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowTemplate {
    /// (field_type, field_length) 목록, 선언 순서 유지
    pub fields: Vec<(u16, u16)>,
}

impl FlowTemplate {
    /// 레코드 하나의 총 길이(바이트)를 반환합니다.
    ///
    /// 가변 길이 필드(길이 0xFFFF)가 있으면 `None` — 이 구현은
    /// 고정 길이 레코드만 처리합니다.
    pub fn record_len(&self) -> Option<usize> {
        let mut total = 0usize;
        for (_, len) in &self.fields {
            if *len == 0xFFFF {
                return None;
            }
            total += usize::from(*len);
        }
        Some(total)
    }
}

/// 익스포터별 템플릿 캐시
#[derive(Debug, Default)]
pub struct TemplateCache {
    templates: HashMap<(IpAddr, u32, u16), FlowTemplate>,
}

impl TemplateCache {
    /// 빈 캐시를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 템플릿을 저장합니다. 같은 키의 기존 정의는 덮어씁니다.
    pub fn insert(
        &mut self,
        exporter: IpAddr,
        source_id: u32,
        template_id: u16,
        template: FlowTemplate,
    ) {
        self.templates
            .insert((exporter, source_id, template_id), template);
    }

    /// 템플릿을 조회합니다.
    pub fn get(&self, exporter: IpAddr, source_id: u32, template_id: u16) -> Option<&FlowTemplate> {
        self.templates.get(&(exporter, source_id, template_id))
    }

    /// 캐시된 템플릿 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// 캐시가 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exporter() -> IpAddr {
        "10.0.0.1".parse().unwrap()
    }

    #[test]
    fn insert_and_get() {
        let mut cache = TemplateCache::new();
        let template = FlowTemplate {
            fields: vec![(8, 4), (12, 4), (7, 2), (11, 2)],
        };
        cache.insert(exporter(), 0, 256, template.clone());

        assert_eq!(cache.get(exporter(), 0, 256), Some(&template));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn keys_isolate_exporters_and_source_ids() {
        let mut cache = TemplateCache::new();
        let template_a = FlowTemplate {
            fields: vec![(8, 4)],
        };
        let template_b = FlowTemplate {
            fields: vec![(12, 4)],
        };
        cache.insert(exporter(), 0, 256, template_a.clone());
        cache.insert("10.0.0.2".parse().unwrap(), 0, 256, template_b.clone());
        cache.insert(exporter(), 7, 256, template_b.clone());

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(exporter(), 0, 256), Some(&template_a));
        assert_eq!(
            cache.get("10.0.0.2".parse().unwrap(), 0, 256),
            Some(&template_b)
        );
        assert_eq!(cache.get(exporter(), 7, 256), Some(&template_b));
    }

    #[test]
    fn redefinition_overwrites() {
        let mut cache = TemplateCache::new();
        cache.insert(
            exporter(),
            0,
            256,
            FlowTemplate {
                fields: vec![(8, 4)],
            },
        );
        let replacement = FlowTemplate {
            fields: vec![(8, 4), (12, 4)],
        };
        cache.insert(exporter(), 0, 256, replacement.clone());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(exporter(), 0, 256), Some(&replacement));
    }

    #[test]
    fn record_len_sums_field_lengths() {
        let template = FlowTemplate {
            fields: vec![(8, 4), (12, 4), (7, 2), (11, 2), (1, 8)],
        };
        assert_eq!(template.record_len(), Some(20));
    }

    #[test]
    fn record_len_rejects_variable_length_fields() {
        let template = FlowTemplate {
            fields: vec![(8, 4), (300, 0xFFFF)],
        };
        assert_eq!(template.record_len(), None);
    }
}
