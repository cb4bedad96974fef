//! 배치 전송기 — 큐 드레인, 크기/시간 플러시, 실패 시 배치 유지
//!
//! 이벤트 큐의 단일 소비자입니다. 배치는 다음 중 먼저 오는 조건에서
//! 플러시됩니다:
//!
//! - 누적 이벤트 수가 `batch_size`에 도달
//! - 마지막 플러시 이후 `flush_interval`이 경과
//!
//! 전송 실패 시 배치는 비워지지 않고 다음 루프 반복에서 다시
//! 시도됩니다. 시도 횟수 제한은 없으며(프로세스 수명이 한계),
//! 루프 주기 외의 추가 백오프도 없습니다.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use netpulse_core::event::NormalizedEvent;
use netpulse_core::metrics as m;
use netpulse_core::queue::EventReceiver;

use crate::api::IngestApi;

/// 배치 전송기
pub struct BatchSender<A: IngestApi> {
    api: Arc<A>,
    receiver: EventReceiver,
    batch_size: usize,
    flush_interval: Duration,
    pending: Vec<NormalizedEvent>,
}

impl<A: IngestApi> BatchSender<A> {
    /// 새 배치 전송기를 생성합니다.
    pub fn new(
        api: Arc<A>,
        receiver: EventReceiver,
        batch_size: usize,
        flush_interval: Duration,
    ) -> Self {
        Self {
            api,
            receiver,
            batch_size,
            flush_interval,
            pending: Vec::with_capacity(batch_size),
        }
    }

    /// 전송 루프를 실행합니다.
    ///
    /// 종료 신호를 받으면 남은 배치를 한 번 더 전송 시도한 뒤
    /// 반환합니다 (실패 시 유실 — 수용된 손실 창).
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            batch_size = self.batch_size,
            flush_interval_secs = self.flush_interval.as_secs(),
            "batch sender started"
        );

        let mut flush_timer = tokio::time::interval(self.flush_interval);
        flush_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // interval의 첫 틱은 즉시 발화하므로 소모해 둠
        flush_timer.tick().await;

        loop {
            metrics::gauge!(m::EXPORT_QUEUE_DEPTH).set(self.receiver.len() as f64);

            tokio::select! {
                event = self.receiver.recv() => {
                    match event {
                        Some(event) => {
                            self.pending.push(event);
                            if self.pending.len() >= self.batch_size {
                                self.flush().await;
                                flush_timer.reset();
                            }
                        }
                        None => {
                            // 모든 생산자가 종료됨 — 남은 배치 전송 후 종료
                            tracing::debug!("event queue closed, flushing remainder");
                            self.flush().await;
                            break;
                        }
                    }
                }
                _ = flush_timer.tick() => {
                    self.flush().await;
                }
                _ = shutdown.recv() => {
                    tracing::debug!(pending = self.pending.len(), "batch sender shutting down");
                    self.flush().await;
                    break;
                }
            }
        }
    }

    /// 현재 배치를 전송합니다.
    ///
    /// 성공하면 배치를 비우고, 실패하면 그대로 유지합니다.
    async fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        match self.api.submit_batch(&self.pending).await {
            Ok(()) => {
                metrics::counter!(m::EXPORT_BATCHES_TOTAL, m::LABEL_RESULT => "success")
                    .increment(1);
                metrics::counter!(m::EXPORT_EVENTS_SENT_TOTAL)
                    .increment(self.pending.len() as u64);
                tracing::debug!(events = self.pending.len(), "event batch forwarded");
                self.pending.clear();
            }
            Err(e) => {
                // 배치 유지 — 다음 루프 반복에서 재시도
                metrics::counter!(m::EXPORT_BATCHES_TOTAL, m::LABEL_RESULT => "failure")
                    .increment(1);
                tracing::warn!(
                    events = self.pending.len(),
                    error = %e,
                    "batch send failed, retaining batch for retry"
                );
            }
        }
    }
}
