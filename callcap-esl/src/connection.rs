//! Inbound event socket connection.

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, instrument, trace, warn};

use callcap_core::events::{EventSource, SignalEvent};
use callcap_core::SourceError;

use crate::codec::{decode_frame, parse_event_plain, Frame};
use crate::EslError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// An authenticated connection to the switch's event socket.
#[derive(Debug)]
pub struct EslConnection {
    stream: Option<TcpStream>,
    buf: BytesMut,
    peer: String,
}

impl EslConnection {
    /// Connects and authenticates. Does not subscribe to anything yet.
    #[instrument(level = "info", skip(password))]
    pub async fn connect(host: &str, port: u16, password: &str) -> Result<Self, EslError> {
        let peer = format!("{}:{}", host, port);
        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port)))
            .await
            .map_err(|_| EslError::ConnectTimeout(peer.clone()))??;

        let mut conn = Self {
            stream: Some(stream),
            buf: BytesMut::with_capacity(8 * 1024),
            peer,
        };

        let greeting = conn.read_frame().await?.ok_or(EslError::Closed)?;
        if greeting.content_type() != Some("auth/request") {
            return Err(EslError::UnexpectedFrame(
                greeting.content_type().unwrap_or("untyped").to_string(),
            ));
        }

        let reply = conn.send_command(&format!("auth {}", password)).await?;
        if !reply.starts_with("+OK") {
            return Err(EslError::AuthRejected(reply));
        }

        info!("Connected to event socket at {}", conn.peer);
        Ok(conn)
    }

    /// Subscribes to plain-text events of the given names.
    pub async fn subscribe(&mut self, events: &[&str]) -> Result<(), EslError> {
        let command = format!("event plain {}", events.join(" "));
        let reply = self.send_command(&command).await?;
        if !reply.starts_with("+OK") {
            return Err(EslError::CommandRejected { command, reply });
        }
        debug!("Subscribed to {:?}", events);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn send_command(&mut self, command: &str) -> Result<String, EslError> {
        let stream = self.stream.as_mut().ok_or(EslError::Closed)?;
        stream.write_all(format!("{}\n\n", command).as_bytes()).await?;

        loop {
            let frame = self.read_frame().await?.ok_or(EslError::Closed)?;
            match frame.content_type() {
                Some("command/reply") => {
                    return Ok(frame.reply_text().unwrap_or_default().to_string());
                }
                Some("text/disconnect-notice") => return Err(EslError::Closed),
                other => trace!("Skipping {:?} frame while awaiting reply", other),
            }
        }
    }

    /// Reads one frame. `Ok(None)` on orderly end of stream.
    async fn read_frame(&mut self) -> Result<Option<Frame>, EslError> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf)? {
                return Ok(Some(frame));
            }
            let stream = self.stream.as_mut().ok_or(EslError::Closed)?;
            if stream.read_buf(&mut self.buf).await? == 0 {
                if !self.buf.is_empty() {
                    warn!("Event socket closed with {} unread bytes", self.buf.len());
                }
                self.stream = None;
                return Ok(None);
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.write_all(b"exit\n\n").await;
            let _ = stream.shutdown().await;
            info!("Disconnected from event socket at {}", self.peer);
        }
    }
}

#[async_trait]
impl EventSource for EslConnection {
    async fn next_event(&mut self) -> Result<Option<SignalEvent>, SourceError> {
        loop {
            if self.stream.is_none() && self.buf.is_empty() {
                return Ok(None);
            }
            let Some(frame) = self.read_frame().await? else {
                return Ok(None);
            };
            match frame.content_type() {
                Some("text/event-plain") => {
                    let body = frame.body().map(|b| &b[..]).unwrap_or_default();
                    match parse_event_plain(body) {
                        Ok(event) => return Ok(Some(event)),
                        Err(e) => warn!("Dropping unparsable event: {}", e),
                    }
                }
                Some("text/disconnect-notice") => {
                    info!("Switch sent disconnect notice");
                    self.close().await;
                    return Ok(None);
                }
                other => trace!("Ignoring {:?} frame", other),
            }
        }
    }

    async fn disconnect(&mut self) {
        self.close().await;
    }
}
