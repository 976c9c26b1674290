//! Settlement notification emails.
//!
//! Plain-text donor receipts and NGO notifications over SMTP. Sending is
//! fire-and-forget: settlement handlers spawn the send and never await it
//! inside the request, so a slow or failing relay cannot block a
//! confirmation response.

use crate::config::EmailConfig;
use anyhow::{anyhow, Result};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;

#[derive(Clone)]
pub struct Mailer {
    config: EmailConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl Mailer {
    pub fn new(config: EmailConfig) -> Result<Self> {
        if !config.enabled {
            return Ok(Self {
                config,
                transport: None,
            });
        }

        let creds = Credentials::new(
            config.user.clone(),
            config.password.expose_secret().clone(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| anyhow!("Failed to create SMTP relay: {}", e))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            config,
            transport: Some(transport),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Thank the donor for a settled donation.
    pub async fn send_donation_receipt(
        &self,
        donor_email: &str,
        donor_name: &str,
        campaign_title: &str,
        ngo_amount: f64,
    ) -> Result<()> {
        let subject = "Thank You for Your Donation!";
        let body = format!(
            "Hi {donor_name},\n\n\
             Thank you for your donation of {ngo_amount:.2} USD to \"{campaign_title}\".\n\
             Your support makes this campaign possible.\n\n\
             {from_name}",
            from_name = self.config.from_name,
        );
        self.send(donor_email, subject, body).await
    }

    /// Tell the NGO a donation settled against one of its campaigns.
    pub async fn send_ngo_notification(
        &self,
        ngo_email: &str,
        ngo_name: &str,
        campaign_title: &str,
        donor_name: &str,
        ngo_amount: f64,
    ) -> Result<()> {
        let subject = format!("New Donation Received for {}", campaign_title);
        let body = format!(
            "Hi {ngo_name},\n\n\
             {donor_name} donated {ngo_amount:.2} USD to your campaign \
             \"{campaign_title}\".\n\n\
             {from_name}",
            from_name = self.config.from_name,
        );
        self.send(ngo_email, &subject, body).await
    }

    async fn send(&self, to: &str, subject: &str, body: String) -> Result<()> {
        if !self.config.enabled {
            tracing::debug!(to = %to, subject = %subject, "Email disabled, skipping send");
            return Ok(());
        }

        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| anyhow!("SMTP transport not initialized"))?;

        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| anyhow!("Invalid from address: {}", e))?;
        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| anyhow!("Invalid recipient address: {}", e))?;

        let message = Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        transport.send(message).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent");
        Ok(())
    }
}
