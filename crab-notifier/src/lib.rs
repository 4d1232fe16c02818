//! Crab Notifier - 后台订单实时通知客户端
//!
//! Keeps one Socket.IO channel open to the admin server and turns order
//! events into notifications: cards, toasts, a pending counter, row badges
//! and a sound. Two actions travel back: quick-accept over HTTP and the
//! mute toggle.
//!
//! # 模块结构
//!
//! ```text
//! crab-notifier/src/
//! ├── client/        # 事件循环、NotifierHandle
//! ├── message/       # Socket.IO 编解码与传输
//! ├── view/          # OrderView、卡片、控制台/录制实现
//! ├── http.rs        # 接单 HTTP 接口
//! ├── preference.rs  # 静音偏好
//! ├── sound.rs       # 提示音
//! ├── config.rs      # 环境变量配置
//! └── logger.rs      # tracing 初始化
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod logger;
pub mod message;
pub mod preference;
pub mod sound;
pub mod view;

pub use client::{NotificationClient, NotifierHandle};
pub use config::NotifierConfig;
pub use error::{ClientError, ClientResult};
pub use http::{AcceptResponse, HttpClient, OrderApi};
pub use logger::init_logger;
pub use message::{
    MemoryServer, MemoryTransport, SocketIoTransport, Transport, TransportConfig,
    TransportError, TransportEvent,
};
pub use preference::PreferenceStorage;
pub use sound::{SoundError, SoundPlayer};
pub use view::{ConsoleView, OrderView, RecordingView};

// Re-export shared wire types for convenience
pub use shared::message::{ChannelEvent, ClientRequest};
pub use shared::order::{NewOrder, OrderStatus, OrderSummary, OrderUpdate};
