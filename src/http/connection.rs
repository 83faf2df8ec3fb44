use std::sync::Arc;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use crate::http::parser::{ParseError, parse_http_request};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::vanity::Resolver;

pub struct Connection<S> {
    stream: S,
    buffer: BytesMut,
    state: ConnectionState,
    resolver: Arc<Resolver>,
}

/// Why no request could be read.
#[derive(Debug)]
pub enum ReadError {
    /// The bytes received are not a request we accept.
    Parse(ParseError),
    /// The socket failed; nothing more can be sent on it.
    Io(std::io::Error),
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::Parse(e) => write!(f, "HTTP parse error: {:?}", e),
            ReadError::Io(e) => write!(f, "read failed: {}", e),
        }
    }
}

impl std::error::Error for ReadError {}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter, bool), // bool = keep_alive?
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, resolver: Arc<Resolver>) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(4096),
            state: ConnectionState::Reading,
            resolver,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);
            match state {
                ConnectionState::Reading => match self.read_request().await {
                    Ok(Some(req)) => {
                        self.state = ConnectionState::Processing(req);
                    }
                    Ok(None) => {
                        self.state = ConnectionState::Closed;
                    }
                    Err(ReadError::Parse(e)) => {
                        tracing::warn!(error = ?e, "rejecting malformed request");
                        let writer = ResponseWriter::new(&Response::bad_request(), false);
                        self.state = ConnectionState::Writing(writer, false);
                    }
                    Err(ReadError::Io(e)) => {
                        tracing::debug!(error = %e, "connection read failed");
                        self.state = ConnectionState::Closed;
                    }
                },

                ConnectionState::Processing(req) => {
                    let response = self.resolver.handle(&req).await;
                    tracing::info!(
                        method = req.method.as_str(),
                        path = %req.path,
                        status = response.status.as_u16(),
                        "request handled"
                    );
                    let keep_alive = req.keep_alive();
                    let writer = ResponseWriter::new(&response, keep_alive);
                    self.state = ConnectionState::Writing(writer, keep_alive);
                }

                ConnectionState::Writing(mut writer, keep_alive) => {
                    // Headers may already be on the wire; report and drop the connection.
                    if let Err(e) = writer.write_to_stream(&mut self.stream).await {
                        self.resolver.log_error(&format!("vanity: i/o error: {}", e));
                        self.state = ConnectionState::Closed;
                        continue;
                    }

                    if keep_alive {
                        self.state = ConnectionState::Reading;
                    } else {
                        self.state = ConnectionState::Closed;
                    }
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    pub async fn read_request(&mut self) -> Result<Option<Request>, ReadError> {
        loop {
            match parse_http_request(&self.buffer) {
                Ok((request, consumed)) => {
                    self.buffer.advance(consumed);
                    return Ok(Some(request));
                }

                Err(ParseError::Incomplete) => {}

                Err(e) => return Err(ReadError::Parse(e)),
            }

            let n = self
                .stream
                .read_buf(&mut self.buffer)
                .await
                .map_err(ReadError::Io)?;

            if n == 0 {
                // Client closed connection
                return Ok(None);
            }
        }
    }
}
