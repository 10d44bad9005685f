use std::collections::BTreeMap;

use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::debug;

use crate::address::Address;
use crate::batch::ProbeBatch;
use crate::smtp_verify::error::{ReplyStage, SmtpVerifyError};
use crate::smtp_verify::options::SmtpOptions;
use crate::smtp_verify::session::SmtpSession;
use crate::smtp_verify::tunnel::{self, Candidate};
use crate::smtp_verify::types::{BatchVerdict, Classification};
use crate::smtp_verify::util::bogus_recipient;

const READY: u16 = 220;
const OK: u16 = 250;
const NO_MAILBOX: u16 = 550;

enum ProbeState {
    Connected,
    Greeted,
    HeloOk,
    MailOk,
    SenderProbed,
    Done(BatchVerdict),
}

/// Runs one SMTP session for `batch` through `candidate`.
///
/// `QUIT` is only attempted when the dialogue concluded; the socket is shut
/// down on every path that reaches the dialogue.
pub(crate) async fn probe_batch(
    candidate: &Candidate,
    batch: &ProbeBatch,
    options: &SmtpOptions,
) -> Result<BatchVerdict, SmtpVerifyError> {
    if batch.is_empty() {
        return Ok(BatchVerdict::Classified(BTreeMap::new()));
    }

    let transport = tunnel::open(candidate, &batch.mx, options).await?;
    let mut session = SmtpSession::new(&batch.mx, transport);
    let verdict = converse(&mut session, &batch.addresses, options).await;

    match &verdict {
        Ok(_) => session.quit(options.proxy_email_timeout()).await,
        Err(err) => debug!(mx = %batch.mx, via = %candidate, error = %err, "probe failed"),
    }
    session.close().await;
    verdict
}

/// SMTP dialogue once the transport is open.
pub(crate) async fn converse<S>(
    session: &mut SmtpSession<S>,
    addresses: &[Address],
    options: &SmtpOptions,
) -> Result<BatchVerdict, SmtpVerifyError>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    let mut state = ProbeState::Connected;
    loop {
        state = match state {
            ProbeState::Connected => match session.read_code().await? {
                Some(READY) => ProbeState::Greeted,
                None => {
                    return Err(SmtpVerifyError::tunnel_refused(
                        session.mx(),
                        "connection closed before SMTP invitation",
                    ));
                }
                code => {
                    return Err(SmtpVerifyError::bad_reply(
                        session.mx(),
                        ReplyStage::Greeting,
                        code,
                    ));
                }
            },
            ProbeState::Greeted => {
                session.send(&format!("HELO {}", options.helo_domain)).await?;
                expect_ok(session, ReplyStage::Helo).await?;
                ProbeState::HeloOk
            }
            ProbeState::HeloOk => {
                session
                    .send(&format!("MAIL FROM:<{}>", options.mail_from))
                    .await?;
                expect_ok(session, ReplyStage::MailFrom).await?;
                ProbeState::MailOk
            }
            ProbeState::MailOk => {
                let Some(first) = addresses.first() else {
                    return Ok(BatchVerdict::Classified(BTreeMap::new()));
                };
                let bogus = bogus_recipient(first);
                session.send(&format!("RCPT TO:<{bogus}>")).await?;
                match session.read_code().await? {
                    Some(NO_MAILBOX) => ProbeState::SenderProbed,
                    code => {
                        debug!(mx = %session.mx(), ?code, "bogus recipient not rejected");
                        ProbeState::Done(BatchVerdict::Unknown)
                    }
                }
            }
            ProbeState::SenderProbed => {
                let mut classified = Classification::new();
                for address in addresses {
                    session
                        .send(&format!("RCPT TO:<{}>", address.mailbox()))
                        .await?;
                    let exists = match session.read_code().await? {
                        Some(OK) => true,
                        Some(NO_MAILBOX) => false,
                        code => {
                            return Err(SmtpVerifyError::bad_reply(
                                session.mx(),
                                ReplyStage::Recipient,
                                code,
                            ));
                        }
                    };
                    classified.insert(address.as_str().to_string(), exists);
                }
                ProbeState::Done(BatchVerdict::Classified(classified))
            }
            ProbeState::Done(verdict) => return Ok(verdict),
        };
    }
}

async fn expect_ok<S>(
    session: &mut SmtpSession<S>,
    stage: ReplyStage,
) -> Result<(), SmtpVerifyError>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    match session.read_code().await? {
        Some(OK) => Ok(()),
        code => Err(SmtpVerifyError::bad_reply(session.mx(), stage, code)),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::BufReader;

    use super::*;
    use crate::test_support::serve_script;

    fn addresses(raw: &[&str]) -> Vec<Address> {
        raw.iter()
            .map(|s| Address::parse(s).expect("valid test address"))
            .collect()
    }

    async fn run(
        replies: &[&str],
        raw: &[&str],
    ) -> (Result<BatchVerdict, SmtpVerifyError>, Vec<String>) {
        let (client, server) = tokio::io::duplex(4096);
        let script = replies.iter().map(|r| r.to_string()).collect();
        let peer = tokio::spawn(serve_script(server, script));

        let mut session = SmtpSession::new("mx.test", BufReader::new(client));
        let verdict = converse(&mut session, &addresses(raw), &SmtpOptions::default()).await;
        session.quit(Duration::from_millis(200)).await;
        session.close().await;

        (verdict, peer.await.expect("peer task"))
    }

    #[tokio::test]
    async fn classifies_every_address() {
        let (verdict, commands) = run(
            &[
                "220 ready",
                "250 hello",
                "250 sender ok",
                "550 no such user",
                "250 ok",
                "550 unknown",
                "221 bye",
            ],
            &["a@x.com", "b@x.com"],
        )
        .await;

        let expected: Classification = [
            ("a@x.com".to_string(), true),
            ("b@x.com".to_string(), false),
        ]
        .into_iter()
        .collect();
        assert_eq!(verdict.expect("dialogue concluded"), BatchVerdict::Classified(expected));

        assert_eq!(commands[0], "HELO mail.example.org");
        assert_eq!(commands[1], "MAIL FROM:<name@example.org>");
        assert!(commands[2].starts_with("RCPT TO:<"));
        assert!(commands[2].ends_with("a@x.com>"));
        assert_ne!(commands[2], "RCPT TO:<a@x.com>");
        assert_eq!(commands[3], "RCPT TO:<a@x.com>");
        assert_eq!(commands[4], "RCPT TO:<b@x.com>");
        assert_eq!(commands[5], "QUIT");
    }

    #[tokio::test]
    async fn accepted_bogus_recipient_means_unknown() {
        let (verdict, commands) = run(
            &["220 ready", "250 hello", "250 sender ok", "250 accepted", "221 bye"],
            &["a@x.com", "b@x.com"],
        )
        .await;
        assert_eq!(verdict.expect("dialogue concluded"), BatchVerdict::Unknown);
        // no real recipient is ever asked for
        assert_eq!(commands.len(), 4);
        assert_eq!(commands[3], "QUIT");
    }

    #[tokio::test]
    async fn closed_after_bogus_recipient_means_unknown() {
        let (verdict, _) = run(&["220 ready", "250 hello", "250 sender ok"], &["a@x.com"]).await;
        assert_eq!(verdict.expect("dialogue concluded"), BatchVerdict::Unknown);
    }

    #[tokio::test]
    async fn unexpected_code_fails_the_whole_batch() {
        let (verdict, _) = run(
            &["220 ready", "250 hello", "250 sender ok", "550 no", "250 ok", "451 try later"],
            &["a@x.com", "b@x.com", "c@x.com"],
        )
        .await;
        let err = verdict.expect_err("partial results are discarded");
        assert!(matches!(
            err,
            SmtpVerifyError::BadSmtpReply { stage: ReplyStage::Recipient, code: Some(451), .. }
        ));
    }

    #[tokio::test]
    async fn greeting_must_be_220() {
        let (verdict, _) = run(&["554 go away"], &["a@x.com"]).await;
        assert!(matches!(
            verdict.expect_err("bad greeting"),
            SmtpVerifyError::BadSmtpReply { stage: ReplyStage::Greeting, code: Some(554), .. }
        ));
    }

    #[tokio::test]
    async fn silent_close_before_greeting_is_a_refused_tunnel() {
        let (verdict, _) = run(&[], &["a@x.com"]).await;
        assert!(matches!(
            verdict.expect_err("no greeting"),
            SmtpVerifyError::TunnelRefused { .. }
        ));
    }

    #[tokio::test]
    async fn helo_and_mail_from_need_250() {
        let (verdict, _) = run(&["220 ready", "501 bad helo"], &["a@x.com"]).await;
        assert!(matches!(
            verdict.expect_err("helo refused"),
            SmtpVerifyError::BadSmtpReply { stage: ReplyStage::Helo, .. }
        ));

        let replies = ["220 ready", "250 hello", "553 sender rejected"];
        let (verdict, _) = run(&replies, &["a@x.com"]).await;
        let err = verdict.expect_err("sender refused");
        assert!(matches!(
            err,
            SmtpVerifyError::BadSmtpReply { stage: ReplyStage::MailFrom, code: Some(553), .. }
        ));
        assert_eq!(err.to_string(), "mx.test: bad reply after MAIL: 553");
    }

    #[tokio::test]
    async fn multiline_greeting_is_accepted() {
        let (verdict, _) = run(
            &[
                "220-mx.test ESMTP\r\n220-no UCE\r\n220 ready",
                "250 hello",
                "250 ok",
                "550 no",
                "250 ok",
            ],
            &["a@x.com"],
        )
        .await;
        let expected: Classification = [("a@x.com".to_string(), true)].into_iter().collect();
        assert_eq!(verdict.expect("concluded"), BatchVerdict::Classified(expected));
    }
}
