use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream, StreamExt};
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::error::{Result, StreamError};

/// Outbound half of a message connection
#[async_trait]
pub trait MessageSink: Send {
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Close the outbound half; a no-op by default
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Inbound half of a message connection
#[async_trait]
pub trait MessageSource: Send {
    /// Next text message, `None` once the peer has closed
    ///
    /// Must be cancel safe: the pump wraps it in a timeout.
    async fn recv_text(&mut self) -> Result<Option<String>>;
}

/// Where and how to reach the realtime service
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub url: String,
    pub model: String,
    pub api_key: String,
    pub log_session: bool,
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WsSink(SplitSink<WsStream, Message>);

pub struct WsSource(SplitStream<WsStream>);

/// Open the websocket and split it into its two directions
pub async fn connect(options: &ConnectOptions) -> Result<(WsSink, WsSource)> {
    let url = format!("{}?model={}", options.url, options.model);
    info!("Connecting to realtime service at {}", url);

    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| StreamError::transport(format!("invalid service url: {}", e)))?;

    let bearer = HeaderValue::from_str(&format!("Bearer {}", options.api_key))
        .map_err(|e| StreamError::config(format!("api key is not a valid header value: {}", e)))?;

    let headers = request.headers_mut();
    headers.insert(AUTHORIZATION, bearer);
    headers.insert("openai-beta", HeaderValue::from_static("realtime=v1"));
    if options.log_session {
        headers.insert("openai-log-session", HeaderValue::from_static("1"));
    }

    let (ws, response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| StreamError::transport(format!("failed to connect: {}", e)))?;

    info!("Connected to realtime service (HTTP {})", response.status());

    let (sink, stream) = ws.split();
    Ok((WsSink(sink), WsSource(stream)))
}

#[async_trait]
impl MessageSink for WsSink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.0
            .send(Message::text(text))
            .await
            .map_err(|e| StreamError::transport(format!("send failed: {}", e)))
    }

    async fn close(&mut self) -> Result<()> {
        self.0
            .close()
            .await
            .map_err(|e| StreamError::transport(format!("close failed: {}", e)))
    }
}

#[async_trait]
impl MessageSource for WsSource {
    async fn recv_text(&mut self) -> Result<Option<String>> {
        loop {
            match self.0.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                Some(Ok(Message::Binary(bytes))) => {
                    return String::from_utf8(bytes.to_vec())
                        .map(Some)
                        .map_err(|e| StreamError::malformed(format!("binary frame is not utf-8: {}", e)));
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!("Realtime service closed the connection: {:?}", frame);
                    return Ok(None);
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(StreamError::transport(format!("receive failed: {}", e))),
                None => return Ok(None),
            }
        }
    }
}

#[async_trait]
impl MessageSink for mpsc::UnboundedSender<String> {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.send(text)
            .map_err(|_| StreamError::transport("channel receiver dropped"))
    }
}

#[async_trait]
impl MessageSource for mpsc::UnboundedReceiver<String> {
    async fn recv_text(&mut self) -> Result<Option<String>> {
        Ok(self.recv().await)
    }
}
