//! 이벤트 큐 — 수집기와 전송기를 분리하는 유한 버퍼
//!
//! 다중 생산자(수집기) / 단일 소비자(배치 전송기) FIFO 큐입니다.
//! 큐가 가득 차면 [`EventSender::send`]가 대기하여 생산자에게
//! 역압(backpressure)을 전달합니다. 드롭 정책은 없습니다.

use tokio::sync::mpsc;

use crate::error::NetpulseError;
use crate::event::NormalizedEvent;

/// 유한 이벤트 큐를 생성합니다.
///
/// `capacity`는 큐에 동시에 머무를 수 있는 이벤트 수의 상한입니다.
/// 반환된 [`EventSender`]는 자유롭게 복제하여 여러 수집기에 나눠줄 수 있습니다.
pub fn bounded(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        EventSender {
            tx,
            capacity,
        },
        EventReceiver { rx },
    )
}

/// 이벤트 큐 생산자 핸들
///
/// 각 수집기가 복제본을 소유합니다. 큐가 가득 차면 `send`가
/// 빈자리가 날 때까지 대기합니다.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<NormalizedEvent>,
    capacity: usize,
}

impl EventSender {
    /// 이벤트를 큐에 넣습니다. 큐가 가득 차면 대기합니다.
    ///
    /// 소비자가 이미 종료되었으면 [`NetpulseError::QueueClosed`]를 반환합니다.
    pub async fn send(&self, event: NormalizedEvent) -> Result<(), NetpulseError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| NetpulseError::QueueClosed)
    }

    /// 현재 큐에 대기 중인 이벤트 수를 반환합니다.
    ///
    /// 채널의 남은 허가 수에서 역산하므로 잠금 없이 조회할 수 있습니다.
    pub fn depth(&self) -> usize {
        self.capacity.saturating_sub(self.tx.capacity())
    }

    /// 큐 최대 용량을 반환합니다.
    pub fn max_capacity(&self) -> usize {
        self.capacity
    }
}

/// 이벤트 큐 소비자 핸들
///
/// 배치 전송기가 단독으로 소유합니다.
pub struct EventReceiver {
    rx: mpsc::Receiver<NormalizedEvent>,
}

impl EventReceiver {
    /// 다음 이벤트를 수신합니다. 모든 생산자가 종료되면 `None`을 반환합니다.
    pub async fn recv(&mut self) -> Option<NormalizedEvent> {
        self.rx.recv().await
    }

    /// 현재 큐에 대기 중인 이벤트 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// 큐가 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CODE_SYSLOG, EventSource};
    use crate::types::Severity;
    use std::time::Duration;

    fn make_event(n: u32) -> NormalizedEvent {
        NormalizedEvent::new(EventSource::Syslog, CODE_SYSLOG, Severity::Info)
            .with_message(format!("event {n}"))
    }

    #[tokio::test]
    async fn send_and_recv_fifo() {
        let (tx, mut rx) = bounded(16);
        tx.send(make_event(1)).await.unwrap();
        tx.send(make_event(2)).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().message, "event 1");
        assert_eq!(rx.recv().await.unwrap().message, "event 2");
    }

    #[tokio::test]
    async fn depth_tracks_queued_events() {
        let (tx, mut rx) = bounded(8);
        assert_eq!(tx.depth(), 0);

        tx.send(make_event(1)).await.unwrap();
        tx.send(make_event(2)).await.unwrap();
        assert_eq!(tx.depth(), 2);

        rx.recv().await.unwrap();
        assert_eq!(tx.depth(), 1);
    }

    #[tokio::test]
    async fn full_queue_blocks_second_enqueue_until_dequeue() {
        let (tx, mut rx) = bounded(1);
        tx.send(make_event(1)).await.unwrap();

        // 용량 1에서 두 번째 전송은 소비가 일어날 때까지 완료되지 않음
        let tx2 = tx.clone();
        let blocked = tokio::spawn(async move { tx2.send(make_event(2)).await });
        tokio::task::yield_now().await;
        assert!(!blocked.is_finished());

        // 첫 이벤트 소비 후 대기 중이던 전송이 순서대로 완료됨
        assert_eq!(rx.recv().await.unwrap().message, "event 1");
        tokio::time::timeout(Duration::from_secs(1), blocked)
            .await
            .expect("blocked send should complete after dequeue")
            .unwrap()
            .unwrap();
        assert_eq!(rx.recv().await.unwrap().message, "event 2");
    }

    #[tokio::test]
    async fn send_after_receiver_dropped_returns_closed() {
        let (tx, rx) = bounded(4);
        drop(rx);
        let err = tx.send(make_event(1)).await.unwrap_err();
        assert!(matches!(err, NetpulseError::QueueClosed));
    }

    #[tokio::test]
    async fn receiver_len_matches_sender_depth() {
        let (tx, rx) = bounded(4);
        tx.send(make_event(1)).await.unwrap();
        tx.send(make_event(2)).await.unwrap();
        assert_eq!(rx.len(), 2);
        assert_eq!(tx.depth(), rx.len());
        assert!(!rx.is_empty());
    }
}
