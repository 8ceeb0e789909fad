//! Crab Client - authenticated HTTP client for the backend API
//!
//! Attaches the current access credential to every call and renews it
//! transparently when the server rejects it.
//!
//! ```no_run
//! use std::sync::Arc;
//! use crab_client::{AuthenticatingClient, ClientConfig, MemoryCredentialStore};
//!
//! # async fn example() -> Result<(), crab_client::ClientError> {
//! let client = AuthenticatingClient::new(
//!     ClientConfig::from_env(),
//!     Arc::new(MemoryCredentialStore::new()),
//! )?;
//! client.login("cashier", "1234").await?;
//! let order: serde_json::Value = client.get("/orders/42").await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod credential;
pub mod error;
pub mod http;
pub mod request;

pub use auth::{AuthenticatingClient, SessionEvent};
pub use config::ClientConfig;
pub use credential::{Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::{ClientError, ClientResult};
pub use http::{ReqwestTransport, RequestTransport};
pub use request::{ApiRequest, HttpResponse, PendingRequest};

// Re-export shared types for convenience
pub use shared::client::{LoginResponse, RefreshResponse, UserInfo};
