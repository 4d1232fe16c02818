// crab-notifier/src/message/mod.rs
// 消息模块 - 订单频道传输配置、事件和错误类型

pub mod codec;
pub mod transport;

pub use shared::message::{ChannelEvent, ClientRequest};
pub use transport::{MemoryServer, MemoryTransport, SocketIoTransport, Transport};

use std::time::Duration;
use thiserror::Error;

/// 传输层错误
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection could not be established
    #[error("Connection error: {0}")]
    Connection(String),

    /// Peer violated the Engine.IO / Socket.IO protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Namespace connect refused by the server
    #[error("Connect refused: {0}")]
    Refused(String),

    /// Emit attempted while the channel is down
    #[error("Not connected")]
    NotConnected,

    /// Transport has been shut down
    #[error("Transport closed")]
    Closed,

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] codec::CodecError),
}

/// What the transport reports to the notifier
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Namespace connect acknowledged
    Connected,
    /// Channel lost; the transport is already trying to reconnect
    Disconnected { reason: String },
    /// Named server event
    Event(ChannelEvent),
}

/// 传输配置
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Websocket connect + Socket.IO handshake timeout
    pub connect_timeout: Duration,
    /// 首次重连延迟
    pub reconnect_delay: Duration,
    /// 最大重连延迟 (指数退避上限)
    pub max_reconnect_delay: Duration,
    /// 最大重连尝试次数 (0 表示无限重试)
    pub max_reconnect_attempts: u32,
    /// Used until the server's open packet says otherwise
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_millis(500),
            max_reconnect_delay: Duration::from_secs(10),
            max_reconnect_attempts: 0,
            ping_interval: Duration::from_secs(25),
            ping_timeout: Duration::from_secs(20),
        }
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置最大重连尝试次数 (0 表示无限重试)
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// 设置重连延迟范围
    pub fn with_reconnect_delay(mut self, initial: Duration, max: Duration) -> Self {
        self.reconnect_delay = initial;
        self.max_reconnect_delay = max;
        self
    }

    /// Delay before reconnect attempt `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.reconnect_delay
            .saturating_mul(factor)
            .min(self.max_reconnect_delay)
    }

    /// Whether another attempt is allowed after `attempts` failures
    pub fn may_retry(&self, attempts: u32) -> bool {
        self.max_reconnect_attempts == 0 || attempts < self.max_reconnect_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = TransportConfig::default();
        assert_eq!(config.reconnect_delay, Duration::from_millis(500));
        assert_eq!(config.max_reconnect_attempts, 0);
        assert!(config.may_retry(u32::MAX - 1));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = TransportConfig::new()
            .with_reconnect_delay(Duration::from_millis(500), Duration::from_secs(10));
        assert_eq!(config.backoff(1), Duration::from_millis(500));
        assert_eq!(config.backoff(2), Duration::from_secs(1));
        assert_eq!(config.backoff(3), Duration::from_secs(2));
        assert_eq!(config.backoff(6), Duration::from_secs(10));
        assert_eq!(config.backoff(40), Duration::from_secs(10));
    }

    #[test]
    fn test_max_attempts() {
        let config = TransportConfig::new().with_max_reconnect_attempts(3);
        assert!(config.may_retry(2));
        assert!(!config.may_retry(3));
    }
}
