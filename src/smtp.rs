//! SMTP implementation of the [`Dispatcher`] contract using `lettre`.
//!
//! Port 465 gets an implicit-TLS relay; any other port goes through
//! STARTTLS. Credentials are the same account the mailbox side uses.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, instrument};

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::report::{Dispatcher, MessageReceipt, OutgoingReport};

const IMPLICIT_TLS_PORT: u16 = 465;

/// Dispatcher that delivers reports through an authenticated SMTP relay.
///
/// # Example
///
/// ```no_run
/// use signup_sync::{SmtpDispatcher, SyncConfig};
///
/// # fn run() -> signup_sync::Result<()> {
/// let config = SyncConfig::builder()
///     .account("signups@example.org")
///     .password("app-password")
///     .report_recipient("reports@example.org")
///     .build()?;
/// let dispatcher = SmtpDispatcher::new(&config)?;
/// # Ok(())
/// # }
/// ```
pub struct SmtpDispatcher {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpDispatcher {
    /// Builds the SMTP transport for the configured relay.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when the relay host cannot be used
    /// as a TLS server name.
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let host = config.effective_smtp_host();
        // The lettre builder accepts any host string; TLS server-name
        // checking only happens at connect time. Validate it up front.
        rustls::ServerName::try_from(host.as_str()).map_err(|err| Error::InvalidConfig {
            message: format!("invalid SMTP relay '{host}': {err}"),
        })?;
        let builder = if config.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
        }
        .map_err(|err| Error::InvalidConfig {
            message: format!("invalid SMTP relay '{host}': {err}"),
        })?;

        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.account().to_owned(),
                config.password().to_owned(),
            ))
            .build();

        Ok(Self { transport })
    }

    fn build_message(report: &OutgoingReport) -> Result<Message> {
        let send_error = |err: Box<dyn std::error::Error + Send + Sync>| Error::ReportSend {
            recipient: report.to.clone(),
            source: err,
        };

        let from = report
            .from
            .parse()
            .map_err(|err: lettre::address::AddressError| send_error(Box::new(err)))?;
        let to = report
            .to
            .parse()
            .map_err(|err: lettre::address::AddressError| send_error(Box::new(err)))?;

        let content_type = ContentType::parse(&report.attachment.content_type)
            .unwrap_or(ContentType::TEXT_PLAIN);
        let attachment = Attachment::new(report.attachment.filename.clone())
            .body(report.attachment.bytes.clone(), content_type);

        Message::builder()
            .from(from)
            .to(to)
            .subject(report.subject.clone())
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(report.body.clone()))
                    .singlepart(attachment),
            )
            .map_err(|err| send_error(Box::new(err)))
    }
}

impl std::fmt::Debug for SmtpDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpDispatcher").finish_non_exhaustive()
    }
}

#[async_trait]
impl Dispatcher for SmtpDispatcher {
    #[instrument(name = "SmtpDispatcher::send", skip_all, fields(recipient = %report.to))]
    async fn send(&mut self, report: &OutgoingReport) -> Result<MessageReceipt> {
        let message = Self::build_message(report)?;
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|err| Error::ReportSend {
                recipient: report.to.clone(),
                source: Box::new(err),
            })?;
        info!(recipient = %report.to, "report delivered");
        // Relays that assign a queue id put it in the first reply line
        let transport_id = response.message().next().map(str::to_owned);
        Ok(MessageReceipt { transport_id })
    }
}
