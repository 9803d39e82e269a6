// mysqlbackup/src/notify/email.rs
use lettre::{
    message,
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
        SMTP_PORT, SUBMISSIONS_PORT, SUBMISSION_PORT,
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, info};

use super::{Notifier, Report};
use crate::config::{SmtpConfig, SmtpTls};
use crate::errors::Result;

/// Sends the run report over authenticated SMTP.
#[derive(Debug, Clone)]
pub struct SmtpNotifier {
    smtp: SmtpConfig,
}

impl SmtpNotifier {
    pub fn new(smtp: SmtpConfig) -> Self {
        SmtpNotifier { smtp }
    }

    fn build_message(&self, report: &Report) -> Result<Message> {
        let email = Message::builder()
            .from(self.smtp.from.parse()?)
            .to(self.smtp.recipient.parse()?)
            .subject(report.subject.as_str())
            .header(message::header::ContentType::TEXT_HTML)
            .body(report.html_body.clone())?;
        Ok(email)
    }

    /// TLS mode and port for the configured connection security.
    fn connection(&self) -> Result<(Tls, u16)> {
        let (tls, default_port) = match self.smtp.tls {
            SmtpTls::Wrapper => (Tls::Wrapper(TlsParameters::new(self.smtp.host.clone())?), SUBMISSIONS_PORT),
            SmtpTls::Starttls => (Tls::Required(TlsParameters::new(self.smtp.host.clone())?), SUBMISSION_PORT),
            SmtpTls::None => (Tls::None, SMTP_PORT),
        };
        Ok((tls, self.smtp.port.unwrap_or(default_port)))
    }

    fn mailer(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let (tls, port) = self.connection()?;
        debug!("Connecting to {}:{} ({:?})", self.smtp.host, port, self.smtp.tls);

        let credentials = Credentials::new(self.smtp.user.clone(), self.smtp.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(self.smtp.host.as_str())
            .port(port)
            .tls(tls)
            .credentials(credentials)
            .build();
        Ok(mailer)
    }
}

impl Notifier for SmtpNotifier {
    async fn notify(&self, report: &Report) -> Result<()> {
        let email = self.build_message(report)?;
        let mailer = self.mailer()?;

        mailer.send(email).await?;
        info!("Backup log mailed to {}", self.smtp.recipient);
        Ok(())
    }
}
