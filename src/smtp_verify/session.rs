use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::smtp_verify::error::SmtpVerifyError;

/// A reply line starts with a 3-digit code followed by a space or the end of
/// the line. `250-` continuation lines do not match.
static REPLY_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{3})(?:\s|$)").expect("reply code pattern"));

pub(crate) fn reply_code(line: &str) -> Option<u16> {
    REPLY_CODE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|code| code.as_str().parse().ok())
}

/// Line-oriented SMTP client half over any buffered duplex stream (a direct
/// TCP socket or a CONNECT tunnel).
pub(crate) struct SmtpSession<S> {
    mx: String,
    stream: S,
}

impl<S> SmtpSession<S>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(mx: impl Into<String>, stream: S) -> Self {
        Self {
            mx: mx.into(),
            stream,
        }
    }

    pub(crate) fn mx(&self) -> &str {
        &self.mx
    }

    /// Next line without its terminator, `None` at end of stream.
    pub(crate) async fn read_line(&mut self) -> Result<Option<String>, SmtpVerifyError> {
        let mut raw = Vec::new();
        let read = self
            .stream
            .read_until(b'\n', &mut raw)
            .await
            .map_err(|err| SmtpVerifyError::io(&self.mx, err))?;
        if read == 0 {
            return Ok(None);
        }
        while matches!(raw.last(), Some(b'\n' | b'\r')) {
            raw.pop();
        }
        Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
    }

    /// Skips lines until one carries a final reply code. `None` when the
    /// peer closes first.
    pub(crate) async fn read_code(&mut self) -> Result<Option<u16>, SmtpVerifyError> {
        while let Some(line) = self.read_line().await? {
            trace!(mx = %self.mx, "S: {line}");
            if let Some(code) = reply_code(&line) {
                return Ok(Some(code));
            }
        }
        Ok(None)
    }

    pub(crate) async fn send(&mut self, command: &str) -> Result<(), SmtpVerifyError> {
        trace!(mx = %self.mx, "C: {command}");
        let mut data = command.as_bytes().to_vec();
        data.extend_from_slice(b"\r\n");
        self.stream
            .write_all(&data)
            .await
            .map_err(|err| SmtpVerifyError::io(&self.mx, err))?;
        self.stream
            .flush()
            .await
            .map_err(|err| SmtpVerifyError::io(&self.mx, err))
    }

    /// Best effort: errors and a missing reply are ignored.
    pub(crate) async fn quit(&mut self, wait: Duration) {
        let exchange = async {
            self.send("QUIT").await?;
            self.read_code().await
        };
        if let Ok(Err(err)) = tokio::time::timeout(wait, exchange).await {
            trace!(mx = %self.mx, error = %err, "QUIT failed");
        }
    }

    pub(crate) async fn close(mut self) {
        if let Err(err) = self.stream.shutdown().await {
            trace!(mx = %self.mx, error = %err, "socket shutdown failed");
        }
    }
}
