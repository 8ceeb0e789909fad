//! crab-connect - keeps the API session and the print daemon link alive
//!
//! Logs session and printer status changes until Ctrl-C.

mod config;
mod logger;

use std::sync::Arc;

use crab_client::{
    AuthenticatingClient, CredentialStore, FileCredentialStore, MemoryCredentialStore, SessionEvent,
};
use crab_print_link::{DeliveryOutcome, DeviceLink, PrintJobDispatcher};
use tokio::sync::broadcast::error::RecvError;

use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境 (.env) 与配置
    dotenv::dotenv().ok();
    let config = AppConfig::from_env();

    // 2. 日志
    logger::init_logger(&config.log_level, config.log_json, config.log_dir.as_deref())?;
    tracing::info!(
        api = %config.client.base_url,
        daemon = %config.link.url,
        "🦀 crab-connect starting..."
    );

    // 3. API 会话
    let store: Arc<dyn CredentialStore> = match &config.credential_file {
        Some(path) => Arc::new(FileCredentialStore::open(path)),
        None => Arc::new(MemoryCredentialStore::new()),
    };
    let client = AuthenticatingClient::new(config.client.clone(), store)?;
    tokio::spawn(log_session_events(client.subscribe()));

    if !client.is_authenticated()
        && let Some((username, password)) = &config.login
    {
        match client.login(username, password).await {
            Ok(response) => tracing::info!(
                user = ?response.user.map(|u| u.username),
                "Logged in"
            ),
            Err(e) => tracing::warn!(error = %e, "Login failed, continuing without a session"),
        }
    }

    // 4. 打印守护进程连接
    let link = DeviceLink::new(config.link.clone());
    let dispatcher = PrintJobDispatcher::new(link.clone());
    dispatcher
        .subscribe_status(|online| {
            if online {
                tracing::info!("Printer service online");
            } else {
                tracing::warn!("Printer service offline");
            }
        })
        .detach();
    tokio::spawn(log_deliveries(link.clone()));
    link.connect().await;

    // 5. 等待退出
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    link.disconnect().await;
    client.close();
    Ok(())
}

async fn log_session_events(mut events: tokio::sync::broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::Refreshed) => tracing::info!("Session credential renewed"),
            Ok(SessionEvent::Expired) => {
                tracing::warn!("Session expired, a new login is required")
            }
            Ok(SessionEvent::LoggedOut) => tracing::info!("Logged out"),
            Err(RecvError::Lagged(n)) => tracing::debug!(skipped = n, "Session events lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

async fn log_deliveries(link: DeviceLink) {
    let mut reports = link.subscribe_deliveries();
    drop(link);
    loop {
        match reports.recv().await {
            Ok(report) => {
                if let DeliveryOutcome::Failed(error) = &report.outcome {
                    tracing::warn!(
                        job_id = ?report.job_id,
                        error = %error,
                        "Printer reported a failed job"
                    );
                }
            }
            Err(RecvError::Lagged(n)) => tracing::debug!(skipped = n, "Delivery reports lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}
