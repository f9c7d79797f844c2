use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::AsyncSmtpTransport;
use lettre::AsyncTransport;
use lettre::Message;
use lettre::Tokio1Executor;

use super::Notifier;
use crate::DispatchError;
use crate::EmailConfig;

/// Sends plain-text mails over SMTP
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    server: String,
    from: Mailbox,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    bcc: Vec<Mailbox>,
}

impl EmailNotifier {
    /// No connection is opened until the first message is sent.
    pub fn new(config: &EmailConfig) -> std::result::Result<Self, DispatchError> {
        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_server)
        }
        .map_err(|e| DispatchError::InvalidConfiguration(e.to_string()))?;

        let mut builder = builder.port(config.smtp_port);
        if let Some(password) = &config.sender_password {
            builder = builder.credentials(Credentials::new(
                config.sender_address.clone(),
                password.clone(),
            ));
        }

        Ok(EmailNotifier {
            transport: builder.build(),
            server: config.smtp_server.clone(),
            from: parse_mailbox(&config.sender_address)?,
            to: parse_mailboxes(&config.recipient_addresses)?,
            cc: parse_mailboxes(&config.cc_addresses)?,
            bcc: parse_mailboxes(&config.bcc_addresses)?,
        })
    }

    pub(crate) fn build_message(
        &self,
        title: &str,
        body: &str,
    ) -> std::result::Result<Message, DispatchError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(title)
            .header(ContentType::TEXT_PLAIN);
        for to in &self.to {
            builder = builder.to(to.clone());
        }
        for cc in &self.cc {
            builder = builder.cc(cc.clone());
        }
        for bcc in &self.bcc {
            builder = builder.bcc(bcc.clone());
        }
        builder
            .body(body.to_string())
            .map_err(|e| DispatchError::InvalidConfiguration(e.to_string()))
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send_message(
        &self,
        title: &str,
        body: &str,
    ) -> std::result::Result<(), DispatchError> {
        let message = self.build_message(title, body)?;
        match self.transport.send(message).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_permanent() => Err(DispatchError::Rejected {
                channel: self.name(),
                message: e.to_string(),
            }),
            Err(e) => Err(DispatchError::Transport {
                channel: self.name(),
                message: e.to_string(),
            }),
        }
    }

    fn name(&self) -> String {
        format!("email:{}", self.server)
    }
}

fn parse_mailbox(address: &str) -> std::result::Result<Mailbox, DispatchError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| DispatchError::InvalidConfiguration(format!("invalid address {}: {}", address, e)))
}

fn parse_mailboxes(addresses: &[String]) -> std::result::Result<Vec<Mailbox>, DispatchError> {
    addresses.iter().map(|a| parse_mailbox(a)).collect()
}
