//! A synchronous TCP listener (§5/§6): one connection handled at a time,
//! matching this crate's single-threaded concurrency model. Framing is
//! newline-delimited JSON — simple enough to not be the point; the point
//! is exercising the core end to end.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener as StdTcpListener;

use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::net::subprocess::{ExecutionHarness, ExecutionRequest};

pub struct Listener {
    inner: StdTcpListener,
}

impl Listener {
    pub fn bind(hostname: &str, port: u16) -> Result<Self> {
        let inner = StdTcpListener::bind((hostname, port))?;
        info!(hostname, port, "listening");
        Ok(Self { inner })
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.inner.local_addr()?)
    }

    /// Accept and handle connections forever, one at a time. Each
    /// connection is expected to send exactly one newline-terminated JSON
    /// [`ExecutionRequest`] and receive one newline-terminated
    /// `ExecutionResponse` in return.
    pub fn serve_forever(&self, harness: &mut impl ExecutionHarness) -> Result<()> {
        for stream in self.inner.incoming() {
            let stream = stream?;
            if let Err(err) = self.handle_connection(stream, harness) {
                warn!(?err, "connection handling failed");
            }
        }
        Ok(())
    }

    #[instrument(skip(self, stream, harness))]
    fn handle_connection(&self, stream: std::net::TcpStream, harness: &mut impl ExecutionHarness) -> Result<()> {
        let peer = stream.peer_addr().ok();
        info!(?peer, "accepted connection");
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut line = String::new();
        reader.read_line(&mut line)?;
        if line.trim().is_empty() {
            return Ok(());
        }
        let request: ExecutionRequest = serde_json::from_str(line.trim())?;
        let response = harness.execute(request);
        let mut writer = stream;
        let mut payload = serde_json::to_string(&response)?;
        payload.push('\n');
        writer.write_all(payload.as_bytes())?;
        Ok(())
    }
}
