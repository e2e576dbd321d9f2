//! Stdio transport.
//!
//! One JSON-RPC request per input line, one compact response per output line.
//! Lines are handled strictly in order: line N+1 is not dispatched until the
//! response to line N has been written and flushed.

use std::io;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout,
};
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;
use crate::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};

/// Message read from the input stream.
#[derive(Debug)]
pub enum IncomingMessage {
    Request(JsonRpcRequest),
    /// Line that did not decode as a request, with the decoder's description
    Malformed(String),
}

/// Line-delimited JSON-RPC transport.
pub struct StdioTransport<R, W> {
    reader: R,
    writer: W,
}

impl StdioTransport<BufReader<Stdin>, Stdout> {
    /// Create a transport using stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Create a transport with custom reader/writer.
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Read the next non-blank line. `None` means end of stream.
    pub async fn read_message(&mut self) -> io::Result<Option<IncomingMessage>> {
        let mut line = Vec::new();

        loop {
            line.clear();
            if self.reader.read_until(b'\n', &mut line).await? == 0 {
                return Ok(None);
            }

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            debug!(line = %String::from_utf8_lossy(&line).trim_end(), "Received");

            return Ok(Some(match serde_json::from_slice::<JsonRpcRequest>(&line) {
                Ok(request) => IncomingMessage::Request(request),
                Err(e) => IncomingMessage::Malformed(e.to_string()),
            }));
        }
    }

    /// Write a JSON-RPC response as one line and flush.
    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> io::Result<()> {
        let mut json = serde_json::to_vec(response).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("Serialization error: {}", e))
        })?;

        debug!(response = %String::from_utf8_lossy(&json), "Sending");

        json.push(b'\n');
        self.writer.write_all(&json).await?;
        self.writer.flush().await
    }

    /// Serve requests until end of stream.
    ///
    /// Returns `Ok(())` once the input is exhausted and `Err` when reading or
    /// writing fails.
    pub async fn serve(&mut self, dispatcher: &Dispatcher) -> io::Result<()> {
        info!("Stdio transport ready");

        while let Some(message) = self.read_message().await? {
            let response = match message {
                IncomingMessage::Request(request) => dispatcher.dispatch(request).await,
                IncomingMessage::Malformed(detail) => {
                    warn!(error = %detail, "Failed to parse request");
                    JsonRpcResponse::error(RequestId::Null, JsonRpcError::parse_error(&detail))
                }
            };
            self.write_response(&response).await?;
        }

        info!("Input stream closed");
        self.writer.flush().await
    }
}
