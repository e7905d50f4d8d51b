use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::transport::{
    ChannelEvent, ChannelLink, Connector, DisconnectReason, Frame, TransportError,
};

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens WebSocket channels carrying JSON `{"event", "data"}` text frames.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Connector for WebSocketConnector {
    fn connect(&self) -> BoxFuture<'static, Result<ChannelLink, TransportError>> {
        let url = self.url.clone();
        Box::pin(async move {
            let (stream, _) = connect_async(url.as_str()).await?;
            let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
            let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
            tokio::spawn(pump(stream, outbound_rx, inbound_tx));
            Ok(ChannelLink {
                outbound: outbound_tx,
                inbound: inbound_rx,
            })
        })
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Moves frames between the socket and the link until either side closes.
async fn pump(
    mut stream: Stream,
    mut outbound: UnboundedReceiver<Frame>,
    inbound: UnboundedSender<ChannelEvent>,
) {
    let reason = loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(frame) = frame else {
                    let _ = stream.close(None).await;
                    return;
                };
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(error) => {
                        log::error!("Failed to encode {}: {error}", frame.event);
                        continue;
                    }
                };
                if let Err(error) = stream.send(Message::text(text)).await {
                    log::error!("WebSocket send failed: {error}");
                    break DisconnectReason::TransportClose;
                }
            }
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<Frame>(text.as_str()) {
                        Ok(frame) => {
                            if inbound.send(ChannelEvent::Frame(frame)).is_err() {
                                return;
                            }
                        }
                        Err(error) => log::warn!("Failed to decode message: {error}"),
                    }
                }
                Some(Ok(Message::Close(_))) => break DisconnectReason::ServerDisconnect,
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    log::error!("WebSocket error: {error}");
                    break DisconnectReason::TransportClose;
                }
                None => break DisconnectReason::TransportClose,
            },
        }
    };
    let _ = inbound.send(ChannelEvent::Closed(reason));
}
