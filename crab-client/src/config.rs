//! Client configuration

use std::time::Duration;

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Default refresh endpoint
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Default login endpoint
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";

/// Default logout endpoint
pub const DEFAULT_LOGOUT_PATH: &str = "/auth/logout";

/// Client configuration for connecting to the backend API
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | CRAB_API_URL | http://localhost:3000 | API 地址 |
/// | CRAB_REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
/// | CRAB_DEBUG_HTTP | false | 记录请求/响应日志 |
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (e.g., "http://localhost:3000")
    pub base_url: String,

    /// Request timeout
    pub timeout: Duration,

    /// Log request/response traffic at debug level
    pub debug_traffic: bool,

    /// Path of the credential refresh endpoint
    pub refresh_path: String,

    /// Path of the login endpoint
    pub login_path: String,

    /// Path of the logout endpoint
    pub logout_path: String,

    /// Paths exempt from refresh-on-401 (login, signup, refresh)
    pub auth_paths: Vec<String>,
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            debug_traffic: false,
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            logout_path: DEFAULT_LOGOUT_PATH.to_string(),
            auth_paths: vec![
                DEFAULT_LOGIN_PATH.to_string(),
                "/auth/signup".to_string(),
                DEFAULT_REFRESH_PATH.to_string(),
            ],
        }
    }

    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let base_url = std::env::var("CRAB_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let timeout_ms = std::env::var("CRAB_REQUEST_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30_000);
        let debug_traffic = std::env::var("CRAB_DEBUG_HTTP")
            .ok()
            .and_then(|v| parse_flag(&v))
            .unwrap_or(false);

        Self::new(base_url)
            .with_timeout(Duration::from_millis(timeout_ms))
            .with_debug_traffic(debug_traffic)
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable request/response traffic logging
    pub fn with_debug_traffic(mut self, enabled: bool) -> Self {
        self.debug_traffic = enabled;
        self
    }

    /// Set the refresh endpoint (also added to the auth path list)
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        if !self.auth_paths.contains(&path) {
            self.auth_paths.push(path.clone());
        }
        self.refresh_path = path;
        self
    }

    /// Add an endpoint that must never trigger a refresh
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.auth_paths.push(path.into());
        self
    }

    /// Whether `path` targets an authentication endpoint.
    ///
    /// Query strings and trailing slashes are ignored.
    pub fn is_auth_path(&self, path: &str) -> bool {
        let path = path.split('?').next().unwrap_or(path);
        let path = path.trim_end_matches('/');
        self.auth_paths
            .iter()
            .any(|p| path.ends_with(p.trim_end_matches('/')))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
