//! Socket seam between DeviceLink and the daemon
//!
//! A [`Connector`] opens one message-oriented connection and hands back its
//! two halves as a text-frame sink and stream. The WebSocket implementation
//! is the production one; tests plug in channel-backed connectors.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt, future};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::error::{LinkError, LinkResult};

/// Outbound half: one item per frame
pub type FrameSink = Pin<Box<dyn Sink<String, Error = LinkError> + Send>>;

/// Inbound half: ends when the socket closes
pub type FrameStream = Pin<Box<dyn Stream<Item = LinkResult<String>> + Send>>;

/// An open connection
pub struct Connection {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl Connection {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

/// Opens connections to the daemon
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> LinkResult<Connection>;
}

/// WebSocket connector (tokio-tungstenite)
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> LinkResult<Connection> {
        let (ws, _response) = connect_async(url)
            .await
            .map_err(|e| LinkError::Connection(format!("{}: {}", url, e)))?;
        let (ws_sink, ws_stream) = ws.split();

        let sink = ws_sink
            .with(|frame: String| future::ready(Ok::<_, tungstenite::Error>(Message::text(frame))))
            .sink_map_err(|e| LinkError::Send(e.to_string()));

        let stream = ws_stream.filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => Some(Ok(String::from_utf8_lossy(&bytes).into_owned())),
                // control frames are answered by tungstenite itself
                Ok(_) => None,
                Err(e) => Some(Err(LinkError::Connection(e.to_string()))),
            })
        });

        Ok(Connection::new(Box::pin(sink), Box::pin(stream)))
    }
}
