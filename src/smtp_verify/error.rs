use std::fmt;

use thiserror::Error;

/// Step of the SMTP dialogue a reply belongs to.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStage {
    Greeting,
    Helo,
    MailFrom,
    Recipient,
}

impl fmt::Display for ReplyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Greeting => "SMTP invitation",
            Self::Helo => "HELO",
            Self::MailFrom => "MAIL",
            Self::Recipient => "check request",
        })
    }
}

/// Failure of a probe attempt. Applies to every address of the batch.
#[derive(Debug, Error)]
pub enum SmtpVerifyError {
    #[error("{mx}: invalid proxy URL `{proxy}`: {reason}")]
    InvalidProxy {
        mx: String,
        proxy: String,
        reason: String,
    },
    #[error("{mx}: proxy protocol `{scheme}` is not supported")]
    UnsupportedProxyProtocol { mx: String, scheme: String },
    #[error("{mx}: timeout connecting to mailserver")]
    ProxyConnectTimeout { mx: String },
    #[error("{mx}: tunneling refused ({reason})")]
    TunnelRefused { mx: String, reason: String },
    #[error("connection to {mx} failed: {source}")]
    Connect {
        mx: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{mx}: I/O error: {source}")]
    Io {
        mx: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{mx}: bad reply after {stage}: {}", code_text(.code))]
    BadSmtpReply {
        mx: String,
        stage: ReplyStage,
        code: Option<u16>,
    },
    #[error("{mx}: timeout")]
    BatchTimeout { mx: String },
    #[error("{mx}: no candidate connection to try")]
    NoCandidates { mx: String },
    #[error("{mx}: probe aborted: {reason}")]
    Aborted { mx: String, reason: String },
}

fn code_text(code: &Option<u16>) -> String {
    code.map_or_else(|| "connection closed".to_string(), |c| c.to_string())
}

impl SmtpVerifyError {
    pub(crate) fn connect(mx: &str, source: std::io::Error) -> Self {
        Self::Connect {
            mx: mx.to_string(),
            source,
        }
    }

    pub(crate) fn io(mx: &str, source: std::io::Error) -> Self {
        Self::Io {
            mx: mx.to_string(),
            source,
        }
    }

    pub(crate) fn bad_reply(mx: &str, stage: ReplyStage, code: Option<u16>) -> Self {
        Self::BadSmtpReply {
            mx: mx.to_string(),
            stage,
            code,
        }
    }

    pub(crate) fn tunnel_refused(mx: &str, reason: impl Into<String>) -> Self {
        Self::TunnelRefused {
            mx: mx.to_string(),
            reason: reason.into(),
        }
    }

    /// Exchange the failed attempt was talking to.
    pub fn mx(&self) -> &str {
        match self {
            Self::InvalidProxy { mx, .. }
            | Self::UnsupportedProxyProtocol { mx, .. }
            | Self::ProxyConnectTimeout { mx }
            | Self::TunnelRefused { mx, .. }
            | Self::Connect { mx, .. }
            | Self::Io { mx, .. }
            | Self::BadSmtpReply { mx, .. }
            | Self::BatchTimeout { mx }
            | Self::NoCandidates { mx }
            | Self::Aborted { mx, .. } => mx,
        }
    }
}
