//! Notifier configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::{ClientError, ClientResult};

/// Path prefix the channel is restricted to
pub const ADMIN_PREFIX: &str = "/admin";
/// Orders list page; status changes reload it
pub const ORDERS_PAGE: &str = "/admin/pedidos";
/// Upper bound for every client timer (poll, card, toast, reload)
pub const MAX_TIMER: Duration = Duration::from_secs(24 * 60 * 60);

/// 通知客户端配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | SERVER_URL | http://localhost:5000 | 管理后台地址 |
/// | SESSION_COOKIE | - | 登录会话 Cookie (`session=...`) |
/// | CSRF_TOKEN | - | 接单接口的 CSRF token |
/// | PAGE_PATH | /admin/pedidos | 当前页面路径 |
/// | WORK_DIR | ./.crab-notifier | 偏好设置目录 |
/// | POLL_INTERVAL_SECS | 30 | 订单快照轮询间隔 |
/// | CARD_TIMEOUT_SECS | 10 | 订单卡片自动关闭 |
/// | TOAST_TIMEOUT_SECS | 3 | 提示自动关闭 |
/// | RELOAD_DELAY_SECS | 2 | 状态变更后重新加载延迟 |
/// | REQUEST_TIMEOUT_SECS | 10 | HTTP 请求超时 |
/// | SOUND_COMMAND | - | 提示音命令 (未设置时使用终端响铃) |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | - | 日志目录 (按天滚动) |
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Admin server base URL (e.g., "http://localhost:5000")
    pub server_url: String,
    /// Session cookie sent with the channel handshake and HTTP calls
    pub session_cookie: Option<String>,
    /// Sent as `X-CSRFToken` on quick-accept
    pub csrf_token: Option<String>,
    /// Page the operator is "on"
    pub page_path: String,
    /// Directory holding the mute preference
    pub work_dir: PathBuf,
    pub poll_interval: Duration,
    pub card_timeout: Duration,
    pub toast_timeout: Duration,
    pub reload_delay: Duration,
    pub request_timeout: Duration,
    /// Program and arguments used to play the notification sound
    pub sound_command: Option<Vec<String>>,
    pub log_level: String,
    pub log_dir: Option<String>,
}

impl NotifierConfig {
    /// Create a configuration with defaults for the given server
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            session_cookie: None,
            csrf_token: None,
            page_path: ORDERS_PAGE.to_string(),
            work_dir: PathBuf::from("./.crab-notifier"),
            poll_interval: Duration::from_secs(30),
            card_timeout: Duration::from_secs(10),
            toast_timeout: Duration::from_secs(3),
            reload_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(10),
            sound_command: None,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }

    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值; 定时器超出 [`MAX_TIMER`] 时报错
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup (the process environment in production)
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> ClientResult<Self> {
        let secs = |key: &str| -> ClientResult<Option<Duration>> {
            var(key)
                .map(|v| {
                    v.trim().parse().map(Duration::from_secs).map_err(|_| {
                        ClientError::Config(format!("{key} must be a number of seconds, got {v}"))
                    })
                })
                .transpose()
        };

        let mut config =
            Self::new(var("SERVER_URL").unwrap_or_else(|| "http://localhost:5000".into()));
        config.session_cookie = var("SESSION_COOKIE").filter(|v| !v.is_empty());
        config.csrf_token = var("CSRF_TOKEN").filter(|v| !v.is_empty());
        if let Some(path) = var("PAGE_PATH") {
            config.page_path = path;
        }
        if let Some(dir) = var("WORK_DIR") {
            config.work_dir = PathBuf::from(dir);
        }
        config.poll_interval = secs("POLL_INTERVAL_SECS")?.unwrap_or(config.poll_interval);
        config.card_timeout = secs("CARD_TIMEOUT_SECS")?.unwrap_or(config.card_timeout);
        config.toast_timeout = secs("TOAST_TIMEOUT_SECS")?.unwrap_or(config.toast_timeout);
        config.reload_delay = secs("RELOAD_DELAY_SECS")?.unwrap_or(config.reload_delay);
        config.request_timeout = secs("REQUEST_TIMEOUT_SECS")?.unwrap_or(config.request_timeout);
        config.sound_command = var("SOUND_COMMAND")
            .map(|cmd| cmd.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|parts| !parts.is_empty());
        config.log_level = var("LOG_LEVEL").unwrap_or_else(|| "info".into());
        config.log_dir = var("LOG_DIR");

        config.validate()?;
        Ok(config)
    }

    /// Reject timers the event loop cannot schedule
    pub fn validate(&self) -> ClientResult<()> {
        let timers = [
            ("POLL_INTERVAL_SECS", self.poll_interval),
            ("CARD_TIMEOUT_SECS", self.card_timeout),
            ("TOAST_TIMEOUT_SECS", self.toast_timeout),
            ("RELOAD_DELAY_SECS", self.reload_delay),
            ("REQUEST_TIMEOUT_SECS", self.request_timeout),
        ];
        for (key, value) in timers {
            if value > MAX_TIMER {
                return Err(ClientError::Config(format!(
                    "{key} is {}s, at most {}s allowed",
                    value.as_secs(),
                    MAX_TIMER.as_secs()
                )));
            }
        }
        Ok(())
    }

    /// Set the session cookie
    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }

    /// Set the CSRF token
    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    /// Set the current page path
    pub fn with_page_path(mut self, path: impl Into<String>) -> Self {
        self.page_path = path.into();
        self
    }

    /// Set the work directory
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Set the snapshot poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Whether the channel may be opened from the current page
    pub fn is_admin_page(&self) -> bool {
        is_admin_path(&self.page_path)
    }

    /// Whether status changes should reload the current page
    pub fn is_orders_page(&self) -> bool {
        self.page_path.contains(ORDERS_PAGE)
    }

    /// Absolute URL for a server path
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.server_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Socket.IO websocket endpoint
    pub fn socket_url(&self) -> ClientResult<String> {
        let base = self.server_url.trim_end_matches('/');
        let ws = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            return Err(ClientError::Config(format!(
                "SERVER_URL must start with http:// or https://, got {base}"
            )));
        };
        Ok(format!("{ws}/socket.io/?EIO=4&transport=websocket"))
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self::new("http://localhost:5000")
    }
}

/// `/admin` itself or anything below it
pub fn is_admin_path(path: &str) -> bool {
    path.strip_prefix(ADMIN_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
