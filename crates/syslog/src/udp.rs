//! UDP Syslog 수신기
//!
//! 각 UDP 데이터그램을 메시지 하나로 취급합니다.
//! 소스 정책을 통과한 메시지만 파싱/정규화되며,
//! 거부·파싱 실패는 카운터로만 집계됩니다.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use netpulse_core::metrics as m;
use netpulse_core::queue::EventSender;
use netpulse_core::stats::CollectorStats;

use crate::error::SyslogError;
use crate::parser::{ParseMode, SyslogParser, record_to_event};
use crate::policy::SourcePolicy;

/// 수신 버퍼 크기 — UDP syslog 메시지 최대 크기
const RECV_BUFFER_SIZE: usize = 65_535;

/// UDP Syslog 수신기
pub struct SyslogUdpCollector {
    socket: UdpSocket,
    parser: SyslogParser,
    policy: Arc<SourcePolicy>,
    events: EventSender,
    stats: Arc<CollectorStats>,
}

impl SyslogUdpCollector {
    /// 소켓을 바인드하고 수신기를 생성합니다.
    pub async fn bind(
        bind: SocketAddr,
        max_message_size: usize,
        mode: ParseMode,
        policy: Arc<SourcePolicy>,
        events: EventSender,
        stats: Arc<CollectorStats>,
    ) -> Result<Self, SyslogError> {
        let socket = UdpSocket::bind(bind).await?;
        Ok(Self {
            socket,
            parser: SyslogParser::new()
                .with_max_input_size(max_message_size)
                .with_mode(mode),
            policy,
            events,
            stats,
        })
    }

    /// 실제 바인드된 주소를 반환합니다.
    pub fn local_addr(&self) -> Result<SocketAddr, SyslogError> {
        Ok(self.socket.local_addr()?)
    }

    /// 수신 루프를 실행합니다. 종료 신호를 받으면 소켓을 놓고 반환합니다.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), SyslogError> {
        tracing::info!(bind = %self.socket.local_addr()?, "syslog udp collector started");

        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, peer)) => {
                            self.handle_message(&buf[..len], peer).await;
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "syslog udp recv failed");
                            self.stats.record_error();
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("syslog udp collector shutting down");
                    break;
                }
            }
        }
        Ok(())
    }

    async fn handle_message(&self, raw: &[u8], peer: SocketAddr) {
        self.stats.record_received();
        metrics::counter!(m::SYSLOG_MESSAGES_TOTAL).increment(1);

        if !self.policy.permits(peer.ip()) {
            self.stats.record_dropped();
            metrics::counter!(m::SYSLOG_REJECTED_TOTAL).increment(1);
            tracing::debug!(source = %peer.ip(), "syslog message rejected by source policy");
            return;
        }

        match self.parser.parse(raw) {
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
                tracing::debug!(source = %peer.ip(), error = %e, "unparsable syslog message dropped");
            }
        }
    }
}
