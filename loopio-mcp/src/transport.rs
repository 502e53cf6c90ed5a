//! Newline-delimited JSON-RPC transport over stdio.
//!
//! Each line read is one JSON-RPC message. Requests are dispatched as
//! independent tasks so several tool calls can be in flight at once; replies
//! are funneled through a single writer so lines never interleave.

use crate::server::McpServer;
use crate::types::{McpError, McpRequest, McpResponse, RequestId};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Serve the MCP protocol on the process's stdin and stdout until stdin closes.
pub async fn serve_stdio(server: Arc<McpServer>) -> std::io::Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let writer = BufWriter::new(tokio::io::stdout());
    serve(server, reader, writer).await
}

/// Serve the MCP protocol over any line-oriented reader and writer.
///
/// Returns once the reader reaches EOF and every in-flight request has been
/// answered.
pub async fn serve<R, W>(server: Arc<McpServer>, reader: R, writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    let writer_task = tokio::spawn(write_lines(writer, rx));

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let request = match parse_request(trimmed) {
            Ok(request) => request,
            Err(error) => {
                warn!("Rejected malformed message: {}", error.message);
                send(&tx, &McpResponse::error(RequestId::Null, error));
                continue;
            }
        };

        let server = server.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Some(response) = server.handle_request(request).await {
                send(&tx, &response);
            }
        });
    }

    info!("stdin closed, draining in-flight requests");
    drop(tx);

    match writer_task.await {
        Ok(result) => result,
        Err(join_err) => Err(std::io::Error::new(std::io::ErrorKind::Other, join_err)),
    }
}

fn parse_request(line: &str) -> Result<McpRequest, McpError> {
    let value: Value = serde_json::from_str(line).map_err(|_| McpError::parse_error())?;
    serde_json::from_value(value).map_err(|_| McpError::invalid_request())
}

fn send(tx: &mpsc::UnboundedSender<String>, response: &McpResponse) {
    match serde_json::to_string(response) {
        Ok(payload) => {
            if tx.send(payload).is_err() {
                debug!("Writer closed before response {:?} could be sent", response.id);
            }
        }
        Err(e) => warn!("Failed to serialize response: {}", e),
    }
}

async fn write_lines<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(payload) = rx.recv().await {
        writer.write_all(payload.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}
