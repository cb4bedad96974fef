//! TCP Syslog 수신기
//!
//! 연결당 태스크를 띄워 개행 구분 프레이밍으로 메시지를 읽습니다
//! (RFC 6587의 octet-counting 프레이밍은 지원하지 않음).
//! 소스 정책은 연결 수락 시점에 한 번 판정하며,
//! 거부된 피어의 연결은 즉시 닫습니다.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use netpulse_core::metrics as m;
use netpulse_core::queue::EventSender;
use netpulse_core::stats::CollectorStats;

use crate::error::SyslogError;
use crate::parser::{ParseMode, SyslogParser, record_to_event};
use crate::policy::SourcePolicy;

/// TCP Syslog 수신기
pub struct SyslogTcpCollector {
    listener: TcpListener,
    max_message_size: usize,
    mode: ParseMode,
    policy: Arc<SourcePolicy>,
    events: EventSender,
    stats: Arc<CollectorStats>,
}

impl SyslogTcpCollector {
    /// 리스너를 바인드하고 수신기를 생성합니다.
    pub async fn bind(
        bind: SocketAddr,
        max_message_size: usize,
        mode: ParseMode,
        policy: Arc<SourcePolicy>,
        events: EventSender,
        stats: Arc<CollectorStats>,
    ) -> Result<Self, SyslogError> {
        let listener = TcpListener::bind(bind).await?;
        Ok(Self {
            listener,
            max_message_size,
            mode,
            policy,
            events,
            stats,
        })
    }

    /// 실제 바인드된 주소를 반환합니다.
    pub fn local_addr(&self) -> Result<SocketAddr, SyslogError> {
        Ok(self.listener.local_addr()?)
    }

    /// 수락 루프를 실행합니다.
    ///
    /// 종료 신호를 받으면 진행 중인 연결 태스크까지 함께 취소합니다.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), SyslogError> {
        tracing::info!(bind = %self.listener.local_addr()?, "syslog tcp collector started");
        let cancel = CancellationToken::new();

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            if !self.policy.permits(peer.ip()) {
                                self.stats.record_dropped();
                                metrics::counter!(m::SYSLOG_REJECTED_TOTAL).increment(1);
                                tracing::debug!(source = %peer.ip(), "syslog tcp connection rejected by source policy");
                                continue;
                            }
                            let task = ConnectionTask {
                                max_message_size: self.max_message_size,
                                mode: self.mode,
                                events: self.events.clone(),
                                stats: Arc::clone(&self.stats),
                                cancel: cancel.child_token(),
                            };
                            tokio::spawn(task.run(stream, peer));
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "syslog tcp accept failed");
                            self.stats.record_error();
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("syslog tcp collector shutting down");
                    cancel.cancel();
                    break;
                }
            }
        }
        Ok(())
    }
}

/// 연결 하나의 읽기 태스크
struct ConnectionTask {
    max_message_size: usize,
    mode: ParseMode,
    events: EventSender,
    stats: Arc<CollectorStats>,
    cancel: CancellationToken,
}

impl ConnectionTask {
    async fn run(self, stream: TcpStream, peer: SocketAddr) {
        let parser = SyslogParser::new()
            .with_max_input_size(self.max_message_size)
            .with_mode(self.mode);
        let mut reader = BufReader::new(stream);
        let mut line = String::new();

        loop {
            line.clear();
            tokio::select! {
                result = reader.read_line(&mut line) => {
                    match result {
                        Ok(0) => break, // EOF
                        Ok(_) => {
                            self.handle_line(&parser, line.as_bytes(), peer).await;
                        }
                        Err(e) => {
                            tracing::debug!(source = %peer.ip(), error = %e, "syslog tcp read failed");
                            self.stats.record_error();
                            break;
                        }
                    }
                }
                _ = self.cancel.cancelled() => {
                    tracing::trace!(source = %peer.ip(), "syslog tcp connection cancelled");
                    break;
                }
            }
        }
    }

    async fn handle_line(&self, parser: &SyslogParser, raw: &[u8], peer: SocketAddr) {
        let trimmed = raw.strip_suffix(b"\n").unwrap_or(raw);
        let trimmed = trimmed.strip_suffix(b"\r").unwrap_or(trimmed);
        if trimmed.is_empty() {
            return;
        }
        self.stats.record_received();
        metrics::counter!(m::SYSLOG_MESSAGES_TOTAL).increment(1);

        match parser.parse(trimmed) {
            Ok(record) => {
                self.stats.record_parsed();
                let event = record_to_event(&record, peer.ip());
                if let Err(e) = self.events.send(event).await {
                    tracing::error!(error = %e, "event queue closed");
                }
            }
            Err(e) => {
                self.stats.record_error();
                metrics::counter!(m::SYSLOG_PARSE_ERRORS_TOTAL).increment(1);
                tracing::debug!(source = %peer.ip(), error = %e, "unparsable syslog line dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netpulse_core::config::SyslogConfig;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    fn loopback_policy() -> Arc<SourcePolicy> {
        let config = SyslogConfig {
            allow_sources: vec!["127.0.0.1".to_owned()],
            accept_known_devices: false,
            ..SyslogConfig::default()
        };
        Arc::new(SourcePolicy::from_config(&config, &[]))
    }

    #[tokio::test]
    async fn tcp_collector_reads_newline_framed_messages() {
        let (events, mut rx) = netpulse_core::queue::bounded(16);
        let stats = Arc::new(CollectorStats::new("syslog"));
        let collector = SyslogTcpCollector::bind(
            "127.0.0.1:0".parse().unwrap(),
            64 * 1024,
            ParseMode::Auto,
            loopback_policy(),
            events,
            Arc::clone(&stats),
        )
        .await
        .unwrap();
        let bind = collector.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(collector.run(shutdown_rx));

        let mut stream = TcpStream::connect(bind).await.unwrap();
        stream
            .write_all(b"<34>Jan 15 12:00:00 host sshd: first\n<13>Jan 15 12:00:01 host app: second\n")
            .await
            .unwrap();
        stream.shutdown().await.unwrap();

        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let second = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(first.message.contains("first"));
        assert!(second.message.contains("second"));
        assert_eq!(stats.snapshot().parsed, 2);

        let _ = shutdown_tx.send(());
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
    }
}
