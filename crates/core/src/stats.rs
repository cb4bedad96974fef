//! 수집기 통계 — 수집기별 카운터와 스냅샷
//!
//! 각 수집기는 자신의 [`CollectorStats`]만 증가시키고,
//! 하트비트 태스크와 통계 로그 태스크는 [`StatsRegistry`]를 통해
//! 스냅샷 복사본을 읽습니다. 카운터는 원자적이므로 잠금이 필요 없습니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// 수집기 하나의 누적 카운터
///
/// 소유 수집기만 증가시키고, 외부에서는 [`CollectorStats::snapshot`]으로
/// 복사본을 읽습니다.
#[derive(Debug)]
pub struct CollectorStats {
    name: String,
    received: AtomicU64,
    parsed: AtomicU64,
    dropped: AtomicU64,
    errors: AtomicU64,
}

impl CollectorStats {
    /// 제로 초기화된 카운터를 생성합니다.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            received: AtomicU64::new(0),
            parsed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    /// 수집기 이름을 반환합니다.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 수신 카운터를 1 증가시킵니다.
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    /// 파싱 성공 카운터를 1 증가시킵니다.
    pub fn record_parsed(&self) {
        self.parsed.fetch_add(1, Ordering::Relaxed);
    }

    /// 드롭 카운터를 1 증가시킵니다.
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// 에러 카운터를 1 증가시킵니다.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// 현재 카운터 값의 복사본을 반환합니다.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            name: self.name.clone(),
            received: self.received.load(Ordering::Relaxed),
            parsed: self.parsed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// 특정 시점의 수집기 카운터 복사본
///
/// 하트비트 페이로드와 주기 통계 로그에 직렬화됩니다.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    /// 수집기 이름
    pub name: String,
    /// 수신한 원시 입력 수 (데이터그램, 메시지, 폴링)
    pub received: u64,
    /// 정규화에 성공한 수
    pub parsed: u64,
    /// 정책/상태로 인해 드롭된 수
    pub dropped: u64,
    /// 에러 수
    pub errors: u64,
}

/// 수집기 통계 레지스트리
///
/// 데몬이 시작 시 수집기마다 [`StatsRegistry::register`]로 카운터를 만들어
/// 나눠주고, 하트비트가 [`StatsRegistry::snapshot_all`]로 전체를 읽습니다.
/// 등록은 시작 시에만 일어나므로 내부 벡터는 잠금 없이 공유됩니다.
#[derive(Debug, Default)]
pub struct StatsRegistry {
    collectors: std::sync::RwLock<Vec<Arc<CollectorStats>>>,
}

impl StatsRegistry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 수집기 카운터를 등록하고 핸들을 반환합니다.
    pub fn register(&self, name: impl Into<String>) -> Arc<CollectorStats> {
        let stats = Arc::new(CollectorStats::new(name));
        self.collectors
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(Arc::clone(&stats));
        stats
    }

    /// 등록된 모든 수집기의 스냅샷을 반환합니다.
    pub fn snapshot_all(&self) -> Vec<StatsSnapshot> {
        self.collectors
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .map(|stats| stats.snapshot())
            .collect()
    }

    /// 등록된 수집기 수를 반환합니다.
    pub fn count(&self) -> usize {
        self.collectors
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = CollectorStats::new("netflow");
        stats.record_received();
        stats.record_received();
        stats.record_parsed();
        stats.record_dropped();
        stats.record_error();

        let snap = stats.snapshot();
        assert_eq!(snap.name, "netflow");
        assert_eq!(snap.received, 2);
        assert_eq!(snap.parsed, 1);
        assert_eq!(snap.dropped, 1);
        assert_eq!(snap.errors, 1);
    }

    #[test]
    fn registry_snapshots_all_collectors() {
        let registry = StatsRegistry::new();
        let syslog = registry.register("syslog");
        let trap = registry.register("snmp_trap");

        syslog.record_received();
        trap.record_error();

        let snapshots = registry.snapshot_all();
        assert_eq!(registry.count(), 2);
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].name, "syslog");
        assert_eq!(snapshots[0].received, 1);
        assert_eq!(snapshots[1].name, "snmp_trap");
        assert_eq!(snapshots[1].errors, 1);
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let stats = CollectorStats::new("syslog");
        stats.record_parsed();
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["name"], "syslog");
        assert_eq!(json["parsed"], 1);
    }

    #[test]
    fn stats_shared_across_threads() {
        let stats = Arc::new(CollectorStats::new("shared"));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let stats = Arc::clone(&stats);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    stats.record_received();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.snapshot().received, 4000);
    }
}
