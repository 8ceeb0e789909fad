//! # crab-print-link
//!
//! Persistent link to the local print daemon.
//!
//! ## Scope
//!
//! - WebSocket connection with automatic reconnect (bounded attempts)
//! - Status subscription for UI indicators (usable / not usable)
//! - Receipt and kitchen ticket job submission
//!
//! Rendering documents is the caller's job; this crate only frames and
//! delivers them.
//!
//! ## Example
//!
//! ```ignore
//! use crab_print_link::{DeviceLink, LinkConfig, PrintDocument, PrintJobDispatcher};
//!
//! let link = DeviceLink::new(LinkConfig::from_env());
//! link.connect().await;
//!
//! let dispatcher = PrintJobDispatcher::new(link.clone());
//! let _status = dispatcher.subscribe_status(|online| println!("printer online: {online}"));
//! dispatcher
//!     .print_kitchen_ticket("42", PrintDocument::Pdf(pdf_base64), None)
//!     .await?;
//! ```

mod config;
mod connector;
mod dispatcher;
mod error;
mod link;
mod state;

// Re-exports
pub use config::{DEFAULT_DAEMON_URL, LinkConfig};
pub use connector::{Connection, Connector, FrameSink, FrameStream, WsConnector};
pub use dispatcher::{PrintDocument, PrintJobDispatcher, PrintRequest};
pub use error::{LinkError, LinkResult};
pub use link::{DeliveryOutcome, DeliveryReport, DeviceLink};
pub use state::{ConnectionState, StatusSubscription};

pub use shared::printing::{DaemonCommand, DaemonEvent, JobKind, PrintData, PrintJobPayload};
