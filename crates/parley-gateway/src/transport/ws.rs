//! tokio-tungstenite transport

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{Connector, Frame, Transport};
use crate::error::GatewayError;

/// Real websocket connector
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, GatewayError> {
        let (socket, _response) = connect_async(url)
            .await
            .map_err(|e| GatewayError::Connect(e.to_string()))?;
        tracing::debug!(url = %url, "websocket established");
        Ok(Box::new(WsTransport { socket }))
    }
}

struct WsTransport {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn recv(&mut self) -> Option<Result<Frame, GatewayError>> {
        loop {
            let message = match self.socket.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(e.into())),
            };
            match message {
                Message::Text(text) => return Some(Ok(Frame::Text(text))),
                Message::Close(frame) => {
                    let (code, reason) = frame
                        .map(|f| (Some(u16::from(f.code)), f.reason.into_owned()))
                        .unwrap_or((None, String::new()));
                    return Some(Ok(Frame::Close { code, reason }));
                }
                Message::Ping(data) => {
                    if let Err(e) = self.socket.send(Message::Pong(data)).await {
                        return Some(Err(e.into()));
                    }
                }
                // binary frames and pongs are not part of the protocol
                Message::Binary(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn send(&mut self, frame: Frame) -> Result<(), GatewayError> {
        let message = match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Close { code, reason } => Message::Close(Some(CloseFrame {
                code: WsCloseCode::from(code.unwrap_or(1000)),
                reason: reason.into(),
            })),
        };
        self.socket.send(message).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), GatewayError> {
        // tungstenite makes a repeated close a no-op
        self.socket.close(None).await.or_else(|e| match e {
            tokio_tungstenite::tungstenite::Error::ConnectionClosed
            | tokio_tungstenite::tungstenite::Error::AlreadyClosed => Ok(()),
            other => Err(other.into()),
        })
    }
}
