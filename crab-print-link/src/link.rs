//! DeviceLink - reconnecting persistent connection to the print daemon
//!
//! 1. `connect()` spawns a supervisor task: open socket → wait for `connected`
//! 2. While Connected, inbound frames are logged (acks, errors, pongs)
//! 3. On close/error: Reconnecting → fixed delay → Connecting, counting attempts
//! 4. Attempt budget spent → GivenUp, no further automatic attempts
//! 5. `disconnect()` cancels the supervisor (and any pending reconnect timer)

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use futures::{SinkExt, StreamExt, future};
use shared::printing::{DaemonCommand, DaemonEvent, PrintJobPayload};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::config::LinkConfig;
use crate::connector::{Connection, Connector, FrameSink, FrameStream, WsConnector};
use crate::error::{LinkError, LinkResult};
use crate::state::{ConnectionState, StatusHub, StatusSubscription};

/// Daemon acknowledgement of a submitted job (advisory only)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Absent when the daemon could not attribute the failure
    pub job_id: Option<String>,
    pub outcome: DeliveryOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
}

struct Supervisor {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Supervisor {
    async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Print link supervisor ended abnormally");
        }
    }

    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

struct Inner {
    config: LinkConfig,
    connector: Arc<dyn Connector>,
    hub: Arc<StatusHub>,
    attempts: AtomicU32,
    /// Write lock: one frame at a time
    writer: Mutex<Option<FrameSink>>,
    supervisor: Mutex<Option<Supervisor>>,
    deliveries: broadcast::Sender<DeliveryReport>,
    /// Parent of every supervisor token; cancelled when the last handle drops
    root: CancellationToken,
}

/// Persistent connection to the local print daemon.
///
/// Cheap to clone. When the last clone is dropped the supervisor stops.
#[derive(Clone)]
pub struct DeviceLink {
    inner: Arc<Inner>,
    _guard: Arc<DropGuard>,
}

impl DeviceLink {
    /// Link over WebSocket
    pub fn new(config: LinkConfig) -> Self {
        Self::with_connector(config, WsConnector)
    }

    pub fn with_connector(config: LinkConfig, connector: impl Connector) -> Self {
        let root = CancellationToken::new();
        let (deliveries, _) = broadcast::channel(64);
        Self {
            _guard: Arc::new(root.clone().drop_guard()),
            inner: Arc::new(Inner {
                config,
                connector: Arc::new(connector),
                hub: StatusHub::new(),
                attempts: AtomicU32::new(0),
                writer: Mutex::new(None),
                supervisor: Mutex::new(None),
                deliveries,
                root,
            }),
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.inner.config
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.hub.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_usable()
    }

    /// Reconnect attempts since the last successful connection
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Register a usability callback.
    ///
    /// The callback runs immediately with the current status, then on every
    /// transition into or out of Connected. Drop the handle to unsubscribe.
    pub fn subscribe_status(
        &self,
        callback: impl Fn(bool) + Send + Sync + 'static,
    ) -> StatusSubscription {
        self.inner.hub.subscribe(callback)
    }

    /// Full state stream for async observers
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.hub.watch()
    }

    /// Daemon acknowledgements, for advisory consumers
    pub fn subscribe_deliveries(&self) -> broadcast::Receiver<DeliveryReport> {
        self.inner.deliveries.subscribe()
    }

    /// Start connecting.
    ///
    /// No-op while Connecting or Connected. From any other state this cancels
    /// a pending reconnect timer, resets the attempt counter and starts over.
    pub async fn connect(&self) {
        let mut slot = self.inner.supervisor.lock().await;

        let running = slot.as_ref().is_some_and(Supervisor::is_running);
        if running
            && matches!(
                self.state(),
                ConnectionState::Connecting | ConnectionState::Connected
            )
        {
            debug!(state = %self.state(), "Print link already active");
            return;
        }

        if let Some(previous) = slot.take() {
            previous.stop().await;
        }

        self.inner.attempts.store(0, Ordering::SeqCst);
        self.inner.hub.transition(ConnectionState::Connecting);
        info!(url = %self.inner.config.url, "Connecting to print daemon");

        let cancel = self.inner.root.child_token();
        let handle = tokio::spawn(run(self.inner.clone(), cancel.clone()));
        *slot = Some(Supervisor { cancel, handle });
    }

    /// Tear the link down without triggering a reconnect
    pub async fn disconnect(&self) {
        let mut slot = self.inner.supervisor.lock().await;
        if let Some(supervisor) = slot.take() {
            supervisor.stop().await;
        }
        self.inner.close_writer().await;
        self.inner.attempts.store(0, Ordering::SeqCst);
        self.inner.hub.transition(ConnectionState::Disconnected);
        info!("Print daemon link closed");
    }

    /// Write one job frame.
    ///
    /// Returns once the socket accepted the frame; delivery is reported later
    /// through `print-success` / `print-error`.
    pub async fn submit(&self, job: PrintJobPayload) -> LinkResult<()> {
        if !self.is_connected() {
            return Err(LinkError::LinkUnavailable);
        }
        let job_id = job.id.clone();
        self.inner.write(&DaemonCommand::PrintJob { job }).await?;
        debug!(job_id = %job_id, "Print job written");
        Ok(())
    }

    /// Send a keepalive. The reply is only logged and never changes state.
    pub async fn ping(&self) -> LinkResult<()> {
        if !self.is_connected() {
            return Err(LinkError::LinkUnavailable);
        }
        self.inner.write(&DaemonCommand::Ping).await
    }
}

impl Inner {
    async fn write(&self, command: &DaemonCommand) -> LinkResult<()> {
        let frame = command.to_frame()?;
        let mut writer = self.writer.lock().await;
        let sink = writer.as_mut().ok_or(LinkError::LinkUnavailable)?;
        sink.send(frame).await
    }

    async fn close_writer(&self) {
        let sink = self.writer.lock().await.take();
        if let Some(mut sink) = sink
            && let Err(e) = sink.close().await
        {
            debug!(error = %e, "Closing print daemon socket");
        }
    }

    /// Open the socket and wait for the daemon's `connected` frame
    async fn open(&self) -> LinkResult<FrameStream> {
        let (sink, stream) = tokio::time::timeout(self.config.handshake_timeout, self.handshake())
            .await
            .map_err(|_| LinkError::Timeout("print daemon handshake".into()))??;

        *self.writer.lock().await = Some(sink);
        Ok(stream)
    }

    async fn handshake(&self) -> LinkResult<(FrameSink, FrameStream)> {
        let Connection { sink, mut stream } = self.connector.connect(&self.config.url).await?;
        loop {
            match stream.next().await {
                Some(Ok(frame)) => match DaemonEvent::parse(&frame) {
                    Ok(DaemonEvent::Connected { message }) => {
                        debug!(message = ?message, "Print daemon ready");
                        return Ok((sink, stream));
                    }
                    Ok(other) => debug!(event = ?other, "Ignoring frame before handshake"),
                    Err(e) => log_malformed(&frame, e),
                },
                Some(Err(e)) => return Err(e),
                None => return Err(LinkError::Closed),
            }
        }
    }

    /// Read frames until the socket ends; returns the reason
    async fn pump(&self, mut stream: FrameStream, cancel: &CancellationToken) -> String {
        let mut heartbeat = self.config.heartbeat_interval.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return "cancelled".into(),

                frame = stream.next() => match frame {
                    Some(Ok(frame)) => self.handle_frame(&frame),
                    Some(Err(e)) => return e.to_string(),
                    None => return "closed by daemon".into(),
                },

                _ = next_tick(&mut heartbeat) => {
                    if let Err(e) = self.write(&DaemonCommand::Ping).await {
                        return format!("heartbeat failed: {}", e);
                    }
                }
            }
        }
    }

    fn handle_frame(&self, frame: &str) {
        match DaemonEvent::parse(frame) {
            Ok(DaemonEvent::PrintSuccess { job_id }) => {
                info!(job_id = %job_id, "Print job delivered");
                let _ = self.deliveries.send(DeliveryReport {
                    job_id: Some(job_id),
                    outcome: DeliveryOutcome::Delivered,
                });
            }
            Ok(DaemonEvent::PrintError { job_id, error }) => {
                warn!(job_id = ?job_id, error = %error, "Print job failed");
                let _ = self.deliveries.send(DeliveryReport {
                    job_id,
                    outcome: DeliveryOutcome::Failed(error),
                });
            }
            Ok(DaemonEvent::Pong) => debug!("Print daemon pong"),
            Ok(DaemonEvent::Error { error }) => {
                warn!(error = %error, "Print daemon reported an error")
            }
            Ok(DaemonEvent::Connected { message }) => {
                debug!(message = ?message, "Print daemon re-announced readiness")
            }
            Err(e) => log_malformed(frame, e),
        }
    }
}

fn log_malformed(frame: &str, e: serde_json::Error) {
    let err = LinkError::MalformedMessage(e.to_string());
    warn!(error = %err, frame = %frame, "Dropping daemon frame");
}

async fn next_tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => future::pending::<()>().await,
    }
}

/// Supervisor loop. Entered in Connecting; exits on cancel or GivenUp.
async fn run(inner: Arc<Inner>, cancel: CancellationToken) {
    loop {
        let opened = tokio::select! {
            _ = cancel.cancelled() => return,
            opened = inner.open() => opened,
        };

        match opened {
            Ok(stream) => {
                inner.attempts.store(0, Ordering::SeqCst);
                inner.hub.transition(ConnectionState::Connected);
                info!("Print daemon connected");

                let reason = inner.pump(stream, &cancel).await;
                inner.close_writer().await;
                if cancel.is_cancelled() {
                    return;
                }
                warn!(reason = %reason, "Print daemon connection lost");
            }
            Err(e) => {
                if cancel.is_cancelled() {
                    return;
                }
                inner.close_writer().await;
                warn!(
                    attempt = inner.attempts.load(Ordering::SeqCst),
                    error = %e,
                    "Print daemon connection failed"
                );
            }
        }

        inner.hub.transition(ConnectionState::Reconnecting);
        let attempts = inner.attempts.load(Ordering::SeqCst);
        if attempts >= inner.config.max_reconnect_attempts {
            warn!(attempts, "Print daemon unreachable, giving up");
            inner.hub.transition(ConnectionState::GivenUp);
            return;
        }

        let delay = inner.config.reconnect_delay_for(attempts);
        debug!(delay_ms = delay.as_millis() as u64, "Scheduling print daemon reconnect");
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }

        inner.attempts.fetch_add(1, Ordering::SeqCst);
        inner.hub.transition(ConnectionState::Connecting);
    }
}
