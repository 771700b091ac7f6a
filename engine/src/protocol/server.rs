//! Line-oriented protocol server
//!
//! Reads one message per line, writes one response per line and flushes
//! before reading the next. Only end of input stops the loop.

use super::ProtocolHandler;
use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

/// Serve protocol messages from `reader` to `writer` until end of input
///
/// Returns the number of responses written.
pub async fn serve<R, W>(handler: &ProtocolHandler, mut reader: R, mut writer: W) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    let mut handled = 0u64;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        debug!("Received protocol message ({} bytes)", buf.len());

        let response = handler.handle_bytes(&buf);
        writer.write_all(response.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        handled += 1;
    }

    info!("Protocol input closed after {} message(s)", handled);
    Ok(handled)
}

/// Serve over the process's stdin and stdout
pub async fn serve_stdio(handler: &ProtocolHandler) -> Result<u64> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve(handler, stdin, stdout).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guidance::GuidanceCatalog;
    use crate::prompts::PromptStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_serve_keeps_going_after_bad_line() {
        let handler = ProtocolHandler::new(
            Arc::new(GuidanceCatalog::reference()),
            Arc::new(PromptStore::default()),
        );
        let input = "garbage\n{\"method\":\"tools/list\",\"id\":2}\n";
        let mut output = Vec::new();

        let handled = serve(&handler, input.as_bytes(), &mut output).await.unwrap();
        assert_eq!(handled, 2);

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["error"]["code"], -32700);
        assert_eq!(lines[1]["id"], 2);
    }

    #[tokio::test]
    async fn test_serve_survives_invalid_utf8() {
        let handler = ProtocolHandler::new(
            Arc::new(GuidanceCatalog::reference()),
            Arc::new(PromptStore::default()),
        );
        let mut input = b"{\"method\":\"tools/list\",\"id\":1}\n".to_vec();
        input.extend_from_slice(&[0xff, 0xfe, b'\n']);
        input.extend_from_slice(b"{\"method\":\"tools/list\",\"id\":3}\n");
        let mut output = Vec::new();

        let handled = serve(&handler, input.as_slice(), &mut output).await.unwrap();
        assert_eq!(handled, 3);

        let lines: Vec<serde_json::Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["id"], serde_json::Value::Null);
        assert_eq!(lines[1]["error"]["code"], -32700);
        assert_eq!(lines[2]["id"], 3);
    }
}
