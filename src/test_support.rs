//! Loopback SMTP servers and CONNECT proxies for tests.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Plays `replies` against one client: the first reply is sent on connect,
/// each following one after a command line. Once the script is exhausted the
/// write half is shut and remaining commands are only recorded. Returns
/// every command received.
pub(crate) async fn serve_script<S>(stream: S, replies: Vec<String>) -> Vec<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufReader::new(stream);
    let mut commands = Vec::new();
    let mut replies = replies.into_iter();

    if let Some(greeting) = replies.next() {
        if write_line(&mut stream, &greeting).await.is_err() {
            return commands;
        }
    }
    for reply in replies {
        match read_command(&mut stream).await {
            Some(command) => commands.push(command),
            None => return commands,
        }
        if write_line(&mut stream, &reply).await.is_err() {
            return commands;
        }
    }

    let _ = stream.shutdown().await;
    while let Some(command) = read_command(&mut stream).await {
        commands.push(command);
    }
    commands
}

async fn write_line<S>(stream: &mut S, line: &str) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(format!("{line}\r\n").as_bytes()).await?;
    stream.flush().await
}

async fn read_command<S>(stream: &mut S) -> Option<String>
where
    S: tokio::io::AsyncBufRead + Unpin,
{
    let mut line = String::new();
    match stream.read_line(&mut line).await {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end().to_string()),
    }
}

/// How the mock mail server answers `RCPT TO`.
#[derive(Debug, Clone, Default)]
pub(crate) struct Mailboxes {
    /// Accepted mailboxes, lowercase. Everything else gets 550.
    pub(crate) known: HashSet<String>,
    /// Mailboxes answered with 451.
    pub(crate) tempfail: HashSet<String>,
    pub(crate) catch_all: bool,
}

impl Mailboxes {
    pub(crate) fn known(mailboxes: &[&str]) -> Self {
        Self {
            known: mailboxes.iter().map(|m| m.to_lowercase()).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn catch_all() -> Self {
        Self {
            catch_all: true,
            ..Self::default()
        }
    }

    pub(crate) fn with_tempfail(mut self, mailbox: &str) -> Self {
        self.tempfail.insert(mailbox.to_lowercase());
        self
    }

    fn answer(&self, mailbox: &str) -> &'static str {
        let mailbox = mailbox.to_lowercase();
        if self.tempfail.contains(&mailbox) {
            "451 try again later"
        } else if self.catch_all || self.known.contains(&mailbox) {
            "250 ok"
        } else {
            "550 no such user"
        }
    }
}

/// Behavioural SMTP server bound on 127.0.0.1.
pub(crate) struct MockSmtp {
    pub(crate) addr: SocketAddr,
    sessions: Arc<AtomicUsize>,
    recipients: Arc<Mutex<Vec<String>>>,
}

impl MockSmtp {
    pub(crate) async fn start(mailboxes: Mailboxes) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind smtp");
        let addr = listener.local_addr().expect("smtp addr");
        let sessions = Arc::new(AtomicUsize::new(0));
        let recipients = Arc::new(Mutex::new(Vec::new()));
        let mailboxes = Arc::new(mailboxes);

        let (counter, seen) = (sessions.clone(), recipients.clone());
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(smtp_session(socket, mailboxes.clone(), seen.clone()));
            }
        });

        Self {
            addr,
            sessions,
            recipients,
        }
    }

    pub(crate) fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Sessions accepted so far.
    pub(crate) fn sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    /// Every `RCPT TO` mailbox, bogus probes included.
    pub(crate) fn recipients(&self) -> Vec<String> {
        self.recipients.lock().expect("recipients lock").clone()
    }
}

async fn smtp_session(socket: TcpStream, mailboxes: Arc<Mailboxes>, seen: Arc<Mutex<Vec<String>>>) {
    let mut stream = BufReader::new(socket);
    if write_line(&mut stream, "220 mock.test ESMTP").await.is_err() {
        return;
    }
    while let Some(command) = read_command(&mut stream).await {
        let upper = command.to_ascii_uppercase();
        let reply = if upper.starts_with("HELO") || upper.starts_with("MAIL FROM:") {
            "250 ok"
        } else if upper.starts_with("RCPT TO:<") {
            let mailbox = command["RCPT TO:<".len()..].trim_end_matches('>').to_string();
            let answer = mailboxes.answer(&mailbox);
            seen.lock().expect("recipients lock").push(mailbox);
            answer
        } else if upper == "QUIT" {
            let _ = write_line(&mut stream, "221 bye").await;
            return;
        } else {
            "500 unrecognised command"
        };
        if write_line(&mut stream, reply).await.is_err() {
            return;
        }
    }
}

/// Accepts connections and never writes a byte.
pub(crate) async fn mute_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mute");
    let addr = listener.local_addr().expect("mute addr");
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(drain(socket));
        }
    });
    addr
}

async fn drain<S: AsyncRead + Unpin>(mut socket: S) {
    let mut sink = Vec::new();
    let _ = socket.read_to_end(&mut sink).await;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProxyMode {
    /// Honours `CONNECT`, optionally requiring this `Proxy-Authorization` value.
    Tunnel { authorization: Option<String> },
    /// Answers 403.
    Refuse,
    /// Reads the request and never answers.
    Silent,
}

pub(crate) struct MockProxy {
    pub(crate) addr: SocketAddr,
    connections: Arc<AtomicUsize>,
}

impl MockProxy {
    pub(crate) async fn start(mode: ProxyMode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind proxy");
        let addr = listener.local_addr().expect("proxy addr");
        let connections = Arc::new(AtomicUsize::new(0));
        let mode = Arc::new(mode);

        let counter = connections.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(proxy_session(socket, mode.clone()));
            }
        });

        Self { addr, connections }
    }

    pub(crate) fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub(crate) fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

async fn proxy_session(socket: TcpStream, mode: Arc<ProxyMode>) {
    let mut client = BufReader::new(socket);
    let Some(request) = read_command(&mut client).await else {
        return;
    };
    let mut authorization = None;
    while let Some(header) = read_command(&mut client).await {
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("proxy-authorization") {
                authorization = Some(value.trim().to_string());
            }
        }
    }

    match mode.as_ref() {
        ProxyMode::Silent => drain(client).await,
        ProxyMode::Refuse => {
            let _ = write_line(&mut client, "HTTP/1.1 403 Forbidden\r\n").await;
        }
        ProxyMode::Tunnel {
            authorization: expected,
        } => {
            if expected.is_some() && authorization != *expected {
                let _ = write_line(
                    &mut client,
                    "HTTP/1.1 407 Proxy Authentication Required\r\n",
                )
                .await;
                return;
            }
            let target = request.split_whitespace().nth(1).unwrap_or_default().to_string();
            let Ok(mut upstream) = TcpStream::connect(target.as_str()).await else {
                let _ = write_line(&mut client, "HTTP/1.1 502 Bad Gateway\r\n").await;
                return;
            };
            if write_line(&mut client, "HTTP/1.1 200 Connection established\r\n")
                .await
                .is_err()
            {
                return;
            }
            let mut client = client.into_inner();
            let _ = tokio::io::copy_bidirectional(&mut client, &mut upstream).await;
        }
    }
}
