use anyhow::Result;
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub stripe: StripeConfig,
    pub paypal: PayPalConfig,
    pub email: EmailConfig,
    /// Base URL of the public frontend, used for rail redirect targets.
    pub frontend_url: String,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub db_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct StripeConfig {
    pub secret_key: Secret<String>,
    pub api_base_url: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct PayPalConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    /// Resolved from PAYPAL_MODE ("sandbox" or "live") at load time.
    pub api_base_url: String,
    /// The platform's own merchant id, payee of platform-fee line items.
    pub platform_merchant_id: String,
    /// Partner id used for merchant-integration (onboarding) calls.
    pub partner_id: String,
    /// Catalog product that recurring billing plans are created under.
    pub product_id: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret<String>,
    pub from_email: String,
    pub from_name: String,
    pub enabled: bool,
}

/// PayPal API host for the given mode.
pub fn paypal_base_url(mode: &str) -> &'static str {
    if mode == "live" {
        "https://api-m.paypal.com"
    } else {
        "https://api-m.sandbox.paypal.com"
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("DONATION_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("DONATION_SERVICE_PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()?;

        let db_url = env::var("DONATION_DATABASE_URL").expect("DONATION_DATABASE_URL must be set");
        let db_name =
            env::var("DONATION_DATABASE_NAME").unwrap_or_else(|_| "donation_db".to_string());

        let stripe_secret_key =
            env::var("STRIPE_SECRET_KEY").expect("STRIPE_SECRET_KEY must be set");
        let stripe_api_base_url = env::var("STRIPE_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.stripe.com/v1".to_string());

        let paypal_client_id = env::var("PAYPAL_CLIENT_ID").unwrap_or_default();
        let paypal_client_secret = env::var("PAYPAL_CLIENT_SECRET").unwrap_or_default();
        let paypal_mode = env::var("PAYPAL_MODE").unwrap_or_else(|_| "sandbox".to_string());
        let paypal_platform_merchant_id =
            env::var("PAYPAL_PLATFORM_MERCHANT_ID").unwrap_or_default();
        let paypal_partner_id = env::var("PAYPAL_PARTNER_ID").unwrap_or_default();
        let paypal_product_id = env::var("PAYPAL_PRODUCT_ID").unwrap_or_default();

        let email = EmailConfig {
            host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .unwrap_or(587),
            user: env::var("SMTP_USER").unwrap_or_default(),
            password: Secret::new(env::var("SMTP_PASSWORD").unwrap_or_default()),
            from_email: env::var("SMTP_FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@example.org".to_string()),
            from_name: env::var("SMTP_FROM_NAME")
                .unwrap_or_else(|_| "Donation Platform".to_string()),
            enabled: env::var("SMTP_ENABLED")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
        };

        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: Secret::new(db_url),
                db_name,
            },
            stripe: StripeConfig {
                secret_key: Secret::new(stripe_secret_key),
                api_base_url: stripe_api_base_url,
            },
            paypal: PayPalConfig {
                client_id: paypal_client_id,
                client_secret: Secret::new(paypal_client_secret),
                api_base_url: paypal_base_url(&paypal_mode).to_string(),
                platform_merchant_id: paypal_platform_merchant_id,
                partner_id: paypal_partner_id,
                product_id: paypal_product_id,
            },
            email,
            frontend_url,
            service_name: "donation-service".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paypal_base_url_follows_mode() {
        assert_eq!(
            paypal_base_url("sandbox"),
            "https://api-m.sandbox.paypal.com"
        );
        assert_eq!(paypal_base_url("live"), "https://api-m.paypal.com");
        assert_eq!(
            paypal_base_url("anything-else"),
            "https://api-m.sandbox.paypal.com"
        );
    }
}
