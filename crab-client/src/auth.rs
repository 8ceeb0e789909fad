//! Authenticating client - credential refresh & retry protocol
//!
//! Every call made through [`AuthenticatingClient::send`] carries the current
//! credential. A 401 triggers one refresh through the refresh endpoint and a
//! single retry with the renewed credential. Refresh is single-flight: callers
//! that hit 401 while a refresh is running wait for it and share its outcome.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::client::{LoginRequest, LoginResponse, RefreshResponse};
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::credential::{Credential, CredentialStore};
use crate::error::{ClientError, ClientResult};
use crate::http::{ReqwestTransport, RequestTransport};
use crate::request::{ApiRequest, HttpResponse, PendingRequest};

/// Session lifecycle notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Credential renewed by the refresh endpoint
    Refreshed,
    /// Credential wiped after an unrecoverable rejection; log in again
    Expired,
    /// Explicit logout
    LoggedOut,
}

#[derive(Debug, Clone)]
enum RefreshOutcome {
    Renewed(Credential),
    Failed,
    Cancelled,
}

impl RefreshOutcome {
    fn into_result(self) -> ClientResult<Credential> {
        match self {
            RefreshOutcome::Renewed(credential) => Ok(credential),
            RefreshOutcome::Failed => Err(ClientError::AuthenticationExpired),
            RefreshOutcome::Cancelled => Err(ClientError::Closed),
        }
    }
}

/// Guarded by the refresh lock. `epoch` counts completed refreshes.
#[derive(Debug, Default)]
struct RefreshState {
    epoch: u64,
    last: Option<RefreshOutcome>,
}

struct Inner<T> {
    config: ClientConfig,
    transport: T,
    store: Arc<dyn CredentialStore>,
    refresh: Mutex<RefreshState>,
    /// Lock-free copy of `RefreshState::epoch`, sampled before each send
    epoch: AtomicU64,
    events: broadcast::Sender<SessionEvent>,
    shutdown: CancellationToken,
}

/// HTTP client that keeps the API session alive across credential expiry.
///
/// Cheap to clone; clones share the credential store and the refresh latch.
pub struct AuthenticatingClient<T: RequestTransport = ReqwestTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: RequestTransport> Clone for AuthenticatingClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl AuthenticatingClient<ReqwestTransport> {
    /// Create a client over the reqwest transport
    pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> ClientResult<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, transport, store))
    }
}

impl<T: RequestTransport> AuthenticatingClient<T> {
    /// Create a client over a custom transport
    pub fn with_transport(config: ClientConfig, transport: T, store: Arc<dyn CredentialStore>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                store,
                refresh: Mutex::new(RefreshState::default()),
                epoch: AtomicU64::new(0),
                events,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Current credential, if any
    pub fn credential(&self) -> Option<Credential> {
        self.inner.store.get()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.store.get().is_some()
    }

    /// Subscribe to session events. `Expired` means the caller must show the login surface.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Send a request, transparently renewing the credential on 401.
    ///
    /// - transport failures → `Transport`
    /// - non-2xx other than a refreshable 401 → `Server`
    /// - 401 after the single retry, or failed refresh → `AuthenticationExpired`
    pub async fn send(&self, request: ApiRequest) -> ClientResult<HttpResponse> {
        if self.inner.shutdown.is_cancelled() {
            return Err(ClientError::Closed);
        }

        // epoch first: a refresh finishing between the two reads only makes
        // the credential newer, never older than the epoch claims
        let seen_epoch = self.inner.epoch.load(Ordering::Acquire);
        let mut credential = self.inner.store.get();
        let mut pending = PendingRequest::first(request);

        loop {
            let response = self.dispatch(&pending.request, credential.as_ref()).await?;
            if !response.is_unauthorized() {
                return response.error_for_status();
            }

            if self.inner.config.is_auth_path(&pending.request.path) {
                debug!(path = %pending.request.path, "401 from auth endpoint, not refreshing");
                return response.error_for_status();
            }

            if pending.retried {
                warn!(path = %pending.request.path, "Renewed credential rejected");
                self.expire_session();
                return Err(ClientError::AuthenticationExpired);
            }

            credential = Some(self.refresh_after(seen_epoch).await?);
            pending = pending.into_retry();
        }
    }

    /// GET and decode JSON
    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> ClientResult<R> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    /// POST a JSON body and decode JSON
    pub async fn post<R: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<R> {
        self.send(ApiRequest::post(path).json(body)?).await?.json()
    }

    /// PUT a JSON body and decode JSON
    pub async fn put<R: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<R> {
        self.send(ApiRequest::put(path).json(body)?).await?.json()
    }

    /// DELETE and decode JSON
    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> ClientResult<R> {
        self.send(ApiRequest::delete(path)).await?.json()
    }

    /// Log in and store the returned credential
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<LoginResponse> {
        let request = ApiRequest::post(self.inner.config.login_path.as_str()).json(&LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        })?;
        let login: LoginResponse = self.send(request).await?.json()?;
        self.inner
            .store
            .set(Credential::new(login.access_token.clone()))?;

        info!(username = %username, "Logged in");
        Ok(login)
    }

    /// Log out. The server call is best-effort; the local session is always cleared.
    pub async fn logout(&self) -> ClientResult<()> {
        let request = ApiRequest::post(self.inner.config.logout_path.as_str());
        if let Err(e) = self.send(request).await {
            debug!(error = %e, "Logout request failed, clearing local session anyway");
        }
        self.inner.store.clear()?;
        let _ = self.inner.events.send(SessionEvent::LoggedOut);

        info!("Logged out");
        Ok(())
    }

    /// Close the client.
    ///
    /// An in-flight refresh is abandoned; it and everyone waiting on it
    /// resolve with `Closed`, as do all later sends.
    pub fn close(&self) {
        self.inner.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        credential: Option<&Credential>,
    ) -> ClientResult<HttpResponse> {
        let request = request.with_credential(credential);
        self.inner.transport.execute(&request).await
    }

    /// Obtain a credential newer than `seen_epoch`, refreshing at most once.
    async fn refresh_after(&self, seen_epoch: u64) -> ClientResult<Credential> {
        let mut state = tokio::select! {
            state = self.inner.refresh.lock() => state,
            _ = self.inner.shutdown.cancelled() => return Err(ClientError::Closed),
        };

        if state.epoch != seen_epoch {
            // another caller refreshed after this request went out
            debug!(epoch = state.epoch, "Reusing outcome of completed refresh");
            return state
                .last
                .clone()
                .unwrap_or(RefreshOutcome::Failed)
                .into_result();
        }

        let outcome = tokio::select! {
            outcome = self.perform_refresh() => outcome,
            _ = self.inner.shutdown.cancelled() => RefreshOutcome::Cancelled,
        };

        state.epoch += 1;
        state.last = Some(outcome.clone());
        self.inner.epoch.store(state.epoch, Ordering::Release);

        outcome.into_result()
    }

    async fn perform_refresh(&self) -> RefreshOutcome {
        info!("Access credential rejected, refreshing");

        // no body and no Authorization: the session cookie identifies the subject
        let request = ApiRequest::post(self.inner.config.refresh_path.as_str());
        let refreshed = match self.inner.transport.execute(&request).await {
            Ok(response) if response.is_success() => response
                .json::<RefreshResponse>()
                .map(|body| Credential::new(body.access_token)),
            Ok(response) => Err(ClientError::Server {
                status: response.status.as_u16(),
                body: response.body,
            }),
            Err(e) => Err(e),
        };

        match refreshed {
            Ok(credential) => {
                if let Err(e) = self.inner.store.set(credential.clone()) {
                    warn!(error = %e, "Failed to persist refreshed credential");
                }
                let _ = self.inner.events.send(SessionEvent::Refreshed);
                info!("Access credential refreshed");
                RefreshOutcome::Renewed(credential)
            }
            Err(e) => {
                warn!(error = %e, "Credential refresh failed");
                self.expire_session();
                RefreshOutcome::Failed
            }
        }
    }

    fn expire_session(&self) {
        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "Failed to clear credential store");
        }
        let _ = self.inner.events.send(SessionEvent::Expired);
    }
}
