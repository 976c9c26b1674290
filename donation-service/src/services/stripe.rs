//! Stripe payment rail client.
//!
//! Implements the slice of Stripe's REST API the donation flow needs:
//! destination-charge payment intents, the product/price/customer/
//! subscription chain for recurring donations, and Express account
//! onboarding. Stripe's API is form-encoded; every method builds its
//! parameter list explicitly and surfaces Stripe's own error message on
//! any non-success response.

use crate::config::StripeConfig;
use anyhow::{anyhow, Result};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::collections::HashMap;

pub const CURRENCY: &str = "usd";

/// Stripe client for interacting with the Stripe API on behalf of the
/// platform account.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    config: StripeConfig,
}

/// A Stripe field that is an id unless the call expanded it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Object(Box<T>),
    Id(String),
}

impl<T> Expandable<T> {
    pub fn as_object(&self) -> Option<&T> {
        match self {
            Expandable::Object(obj) => Some(obj),
            Expandable::Id(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Rail status; settlement requires "succeeded".
    pub status: String,
    /// Amount in cents.
    pub amount: i64,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct Product {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct Price {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct Customer {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub status: Option<String>,
    pub payment_intent: Option<Expandable<PaymentIntent>>,
}

#[derive(Debug, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub status: String,
    pub latest_invoice: Option<Expandable<Invoice>>,
}

impl Subscription {
    /// Client secret of the first invoice's payment intent, when the rail
    /// did not settle the invoice synchronously.
    pub fn first_invoice_client_secret(&self) -> Option<(&str, &str)> {
        let invoice = self.latest_invoice.as_ref()?.as_object()?;
        let intent = invoice.payment_intent.as_ref()?.as_object()?;
        let secret = intent.client_secret.as_deref()?;
        Some((intent.id.as_str(), secret))
    }
}

#[derive(Debug, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub charges_enabled: bool,
    #[serde(default)]
    pub payouts_enabled: bool,
    #[serde(default)]
    pub details_submitted: bool,
    pub requirements: Option<AccountRequirements>,
}

#[derive(Debug, Deserialize)]
pub struct AccountRequirements {
    #[serde(default)]
    pub currently_due: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(rename = "type")]
    error_type: Option<String>,
    message: Option<String>,
}

/// Parameters for a one-time destination charge.
#[derive(Debug)]
pub struct CreatePaymentIntent<'a> {
    pub amount_cents: i64,
    pub payment_method: &'a str,
    /// The NGO's connected account, destination of the transfer.
    pub destination_account: &'a str,
    /// The platform's share, withheld at the source.
    pub application_fee_cents: i64,
    pub campaign_id: &'a str,
    pub donor_name: &'a str,
    pub donor_email: Option<&'a str>,
    pub tip_amount: f64,
}

impl CreatePaymentIntent<'_> {
    fn to_params(&self) -> Vec<(String, String)> {
        vec![
            ("amount".into(), self.amount_cents.to_string()),
            ("currency".into(), CURRENCY.into()),
            ("payment_method".into(), self.payment_method.to_string()),
            ("confirmation_method".into(), "automatic".into()),
            (
                "transfer_data[destination]".into(),
                self.destination_account.to_string(),
            ),
            (
                "application_fee_amount".into(),
                self.application_fee_cents.to_string(),
            ),
            ("metadata[campaign_id]".into(), self.campaign_id.to_string()),
            ("metadata[donor_name]".into(), self.donor_name.to_string()),
            (
                "metadata[donor_email]".into(),
                self.donor_email.unwrap_or_default().to_string(),
            ),
            ("metadata[frequency]".into(), "once".into()),
            ("metadata[tip_amount]".into(), self.tip_amount.to_string()),
        ]
    }
}

/// Parameters for a recurring destination subscription.
#[derive(Debug)]
pub struct CreateSubscription<'a> {
    pub customer_id: &'a str,
    pub price_id: &'a str,
    pub payment_method: &'a str,
    pub destination_account: &'a str,
    /// Percent of each invoice skimmed as the platform fee.
    pub application_fee_percent: f64,
}

impl CreateSubscription<'_> {
    fn to_params(&self) -> Vec<(String, String)> {
        vec![
            ("customer".into(), self.customer_id.to_string()),
            ("items[0][price]".into(), self.price_id.to_string()),
            (
                "default_payment_method".into(),
                self.payment_method.to_string(),
            ),
            ("collection_method".into(), "charge_automatically".into()),
            (
                "transfer_data[destination]".into(),
                self.destination_account.to_string(),
            ),
            (
                "application_fee_percent".into(),
                self.application_fee_percent.to_string(),
            ),
            ("expand[]".into(), "latest_invoice.payment_intent".into()),
        ]
    }
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.secret_key.expose_secret().is_empty()
    }

    /// Open a one-time payment intent addressed to the NGO's connected
    /// account, with the platform fee carved out at the source.
    pub async fn create_payment_intent(
        &self,
        request: &CreatePaymentIntent<'_>,
    ) -> Result<PaymentIntent> {
        let intent: PaymentIntent = self
            .post_form("/payment_intents", &request.to_params())
            .await?;
        tracing::info!(
            intent_id = %intent.id,
            amount = intent.amount,
            "Stripe payment intent created"
        );
        Ok(intent)
    }

    pub async fn retrieve_payment_intent(&self, intent_id: &str) -> Result<PaymentIntent> {
        self.get(&format!("/payment_intents/{}", intent_id)).await
    }

    pub async fn create_product(&self, name: &str) -> Result<Product> {
        self.post_form("/products", &[("name".to_string(), name.to_string())])
            .await
    }

    /// One price per campaign+amount; prices are not reused across donors.
    pub async fn create_monthly_price(
        &self,
        unit_amount_cents: i64,
        product_id: &str,
    ) -> Result<Price> {
        self.post_form(
            "/prices",
            &[
                ("unit_amount".to_string(), unit_amount_cents.to_string()),
                ("currency".to_string(), CURRENCY.to_string()),
                ("recurring[interval]".to_string(), "month".to_string()),
                ("product".to_string(), product_id.to_string()),
            ],
        )
        .await
    }

    pub async fn create_customer(
        &self,
        name: &str,
        email: Option<&str>,
        campaign_id: &str,
    ) -> Result<Customer> {
        self.post_form(
            "/customers",
            &[
                ("name".to_string(), name.to_string()),
                ("email".to_string(), email.unwrap_or_default().to_string()),
                (
                    "metadata[campaign_id]".to_string(),
                    campaign_id.to_string(),
                ),
            ],
        )
        .await
    }

    pub async fn attach_payment_method(
        &self,
        payment_method: &str,
        customer_id: &str,
    ) -> Result<()> {
        let _: serde_json::Value = self
            .post_form(
                &format!("/payment_methods/{}/attach", payment_method),
                &[("customer".to_string(), customer_id.to_string())],
            )
            .await?;
        Ok(())
    }

    pub async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method: &str,
    ) -> Result<()> {
        let _: serde_json::Value = self
            .post_form(
                &format!("/customers/{}", customer_id),
                &[(
                    "invoice_settings[default_payment_method]".to_string(),
                    payment_method.to_string(),
                )],
            )
            .await?;
        Ok(())
    }

    pub async fn create_subscription(
        &self,
        request: &CreateSubscription<'_>,
    ) -> Result<Subscription> {
        let subscription: Subscription = self
            .post_form("/subscriptions", &request.to_params())
            .await?;
        tracing::info!(
            subscription_id = %subscription.id,
            status = %subscription.status,
            "Stripe subscription created"
        );
        Ok(subscription)
    }

    /// Create an Express connected account for an NGO.
    pub async fn create_express_account(&self, email: &str, country: &str) -> Result<Account> {
        self.post_form(
            "/accounts",
            &[
                ("type".to_string(), "express".to_string()),
                ("country".to_string(), country.to_uppercase()),
                ("email".to_string(), email.to_string()),
                (
                    "capabilities[card_payments][requested]".to_string(),
                    "true".to_string(),
                ),
                (
                    "capabilities[transfers][requested]".to_string(),
                    "true".to_string(),
                ),
            ],
        )
        .await
    }

    pub async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String> {
        #[derive(Deserialize)]
        struct AccountLink {
            url: String,
        }
        let link: AccountLink = self
            .post_form(
                "/account_links",
                &[
                    ("account".to_string(), account_id.to_string()),
                    ("refresh_url".to_string(), refresh_url.to_string()),
                    ("return_url".to_string(), return_url.to_string()),
                    ("type".to_string(), "account_onboarding".to_string()),
                ],
            )
            .await?;
        Ok(link.url)
    }

    pub async fn retrieve_account(&self, account_id: &str) -> Result<Account> {
        self.get(&format!("/accounts/{}", account_id)).await
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T> {
        if !self.is_configured() {
            return Err(anyhow!("Stripe credentials not configured"));
        }

        let url = format!("{}{}", self.config.api_base_url, path);
        let response = self
            .client
            .post(&url)
            .basic_auth(self.config.secret_key.expose_secret(), None::<&str>)
            .form(params)
            .send()
            .await?;

        Self::parse_response(path, response).await
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        if !self.is_configured() {
            return Err(anyhow!("Stripe credentials not configured"));
        }

        let url = format!("{}{}", self.config.api_base_url, path);
        let response = self
            .client
            .get(&url)
            .basic_auth(self.config.secret_key.expose_secret(), None::<&str>)
            .send()
            .await?;

        Self::parse_response(path, response).await
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(path = %path, status = %status, "Stripe response");

        if status.is_success() {
            Ok(serde_json::from_str(&body)?)
        } else {
            let detail = serde_json::from_str::<StripeErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or(StripeErrorDetail {
                    error_type: None,
                    message: Some(body.clone()),
                });
            let message = detail.message.unwrap_or_else(|| "unknown error".to_string());
            tracing::error!(
                path = %path,
                error_type = ?detail.error_type,
                message = %message,
                "Stripe request failed"
            );
            Err(anyhow!("Stripe error: {}", message))
        }
    }
}
