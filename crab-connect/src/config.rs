//! Process configuration
//!
//! | 环境变量 | 说明 | 默认值 |
//! |----------|------|--------|
//! | LOG_LEVEL | 日志级别 | info |
//! | LOG_JSON | JSON 日志格式 | false |
//! | LOG_DIR | 日志目录 (不设置则只输出到控制台) | - |
//! | CRAB_CREDENTIAL_FILE | 凭证缓存文件 (不设置则只保存在内存) | - |
//! | CRAB_USERNAME / CRAB_PASSWORD | 启动时自动登录 | - |
//!
//! Client and print link variables are read by their own crates
//! (`ClientConfig::from_env`, `LinkConfig::from_env`).

use std::path::PathBuf;

use crab_client::ClientConfig;
use crab_print_link::LinkConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    pub credential_file: Option<PathBuf>,
    pub login: Option<(String, String)>,
    pub client: ClientConfig,
    pub link: LinkConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let login = match (non_empty("CRAB_USERNAME"), get("CRAB_PASSWORD")) {
            (Some(username), Some(password)) => Some((username, password)),
            _ => None,
        };

        Self {
            log_level: non_empty("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: get("LOG_JSON")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            log_dir: non_empty("LOG_DIR"),
            credential_file: non_empty("CRAB_CREDENTIAL_FILE").map(PathBuf::from),
            login,
            client: ClientConfig::from_env(),
            link: LinkConfig::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
        assert!(config.log_dir.is_none());
        assert!(config.credential_file.is_none());
        assert!(config.login.is_none());
    }

    #[test]
    fn test_login_needs_both_parts() {
        let config = AppConfig::from_lookup(lookup(&[("CRAB_USERNAME", "cashier")]));
        assert!(config.login.is_none());

        let config = AppConfig::from_lookup(lookup(&[
            ("CRAB_USERNAME", "cashier"),
            ("CRAB_PASSWORD", "1234"),
            ("LOG_JSON", "TRUE"),
            ("LOG_DIR", "  "),
        ]));
        assert_eq!(config.login, Some(("cashier".into(), "1234".into())));
        assert!(config.log_json);
        assert!(config.log_dir.is_none());
    }
}
