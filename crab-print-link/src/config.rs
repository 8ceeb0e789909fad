// crab-print-link/src/config.rs
// 打印守护进程连接配置

use std::time::Duration;

/// Default daemon endpoint (local WebSocket)
pub const DEFAULT_DAEMON_URL: &str = "ws://localhost:8765";

/// 打印守护进程连接配置
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// 守护进程地址
    pub url: String,
    /// 重连间隔 (固定)
    pub reconnect_delay: Duration,
    /// 最大重连次数，超过后进入 GivenUp
    pub max_reconnect_attempts: u32,
    /// 是否启用指数退避
    pub exponential_backoff: bool,
    /// 指数退避上限
    pub max_reconnect_delay: Duration,
    /// 建立连接并收到 `connected` 的超时
    pub handshake_timeout: Duration,
    /// 心跳间隔 (None 表示禁用)
    pub heartbeat_interval: Option<Duration>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DAEMON_URL.to_string(),
            reconnect_delay: Duration::from_secs(3),
            max_reconnect_attempts: 10,
            exponential_backoff: false,
            max_reconnect_delay: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(5),
            heartbeat_interval: None,
        }
    }
}

impl LinkConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// 从环境变量加载配置
    ///
    /// | 环境变量 | 默认值 |
    /// |----------|--------|
    /// | CRAB_PRINT_DAEMON_URL | ws://localhost:8765 |
    /// | CRAB_PRINT_RECONNECT_MS | 3000 |
    /// | CRAB_PRINT_MAX_RECONNECTS | 10 |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var("CRAB_PRINT_DAEMON_URL").unwrap_or(defaults.url),
            reconnect_delay: std::env::var("CRAB_PRINT_RECONNECT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconnect_delay),
            max_reconnect_attempts: std::env::var("CRAB_PRINT_MAX_RECONNECTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_reconnect_attempts),
            ..defaults
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// 启用指数退避 (上限 `max_delay`)
    pub fn with_exponential_backoff(mut self, max_delay: Duration) -> Self {
        self.exponential_backoff = true;
        self.max_reconnect_delay = max_delay;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = Some(interval);
        self
    }

    /// Delay before the reconnect attempt following `attempts` failed ones
    pub fn reconnect_delay_for(&self, attempts: u32) -> Duration {
        if !self.exponential_backoff {
            return self.reconnect_delay;
        }
        let factor = 2u32.saturating_pow(attempts.min(16));
        self.reconnect_delay
            .saturating_mul(factor)
            .min(self.max_reconnect_delay)
    }
}
