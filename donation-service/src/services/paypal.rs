//! PayPal payment rail client.
//!
//! Covers the checkout Orders API (one-time), the Billing Plans +
//! Subscriptions API (recurring) and partner onboarding. Every operation
//! exchanges the platform's client credentials for a short-lived access
//! token first; request volume is low enough that tokens are not cached.

use crate::config::PayPalConfig;
use anyhow::{anyhow, Result};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

pub const CURRENCY_CODE: &str = "USD";

#[derive(Clone)]
pub struct PayPalClient {
    client: Client,
    config: PayPalConfig,
}

/// Render cents as the decimal string PayPal's API expects.
pub fn format_amount(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

fn find_link<'a>(links: &'a [Link], rel: &str) -> Option<&'a str> {
    links.iter().find(|l| l.rel == rel).map(|l| l.href.as_str())
}

#[derive(Debug, Deserialize)]
pub struct Order {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Order {
    pub fn approval_url(&self) -> Option<&str> {
        find_link(&self.links, "approve")
    }
}

#[derive(Debug, Deserialize)]
pub struct Capture {
    pub id: String,
    /// Settlement requires "COMPLETED".
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct BillingPlan {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct Subscription {
    pub id: String,
    /// Settlement (activation) requires "ACTIVE".
    pub status: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Subscription {
    pub fn approval_url(&self) -> Option<&str> {
        find_link(&self.links, "approve")
    }
}

#[derive(Debug, Deserialize)]
pub struct PartnerReferral {
    #[serde(default)]
    pub links: Vec<Link>,
}

impl PartnerReferral {
    pub fn action_url(&self) -> Option<&str> {
        find_link(&self.links, "action_url")
    }
}

// Order-creation body.

#[derive(Debug, Serialize)]
struct OrderRequest<'a> {
    intent: &'a str,
    purchase_units: Vec<PurchaseUnit<'a>>,
    application_context: AppContext<'a>,
}

#[derive(Debug, Serialize)]
struct PurchaseUnit<'a> {
    amount: AmountWithBreakdown,
    payee: Payee<'a>,
    payment_instruction: PaymentInstruction<'a>,
}

#[derive(Debug, Serialize)]
struct AmountWithBreakdown {
    currency_code: &'static str,
    value: String,
    breakdown: Breakdown,
}

#[derive(Debug, Serialize)]
struct Breakdown {
    item_total: Money,
    handling: Money,
}

#[derive(Debug, Serialize)]
struct Money {
    currency_code: &'static str,
    value: String,
}

impl Money {
    fn from_cents(cents: i64) -> Self {
        Self {
            currency_code: CURRENCY_CODE,
            value: format_amount(cents),
        }
    }
}

#[derive(Debug, Serialize)]
struct Payee<'a> {
    merchant_id: &'a str,
}

#[derive(Debug, Serialize)]
struct PaymentInstruction<'a> {
    disbursement_mode: &'a str,
    platform_fees: Vec<PlatformFee<'a>>,
}

#[derive(Debug, Serialize)]
struct PlatformFee<'a> {
    amount: Money,
    payee: Payee<'a>,
}

#[derive(Debug, Serialize)]
struct AppContext<'a> {
    shipping_preference: &'a str,
    user_action: &'a str,
}

// Billing-plan / subscription bodies.

#[derive(Debug, Serialize)]
struct PlanRequest<'a> {
    product_id: &'a str,
    name: String,
    description: String,
    billing_cycles: Vec<BillingCycle>,
    payment_preferences: PaymentPreferences,
}

#[derive(Debug, Serialize)]
struct BillingCycle {
    frequency: CycleFrequency,
    tenure_type: &'static str,
    sequence: u32,
    total_cycles: u32,
    pricing_scheme: PricingScheme,
}

#[derive(Debug, Serialize)]
struct CycleFrequency {
    interval_unit: &'static str,
    interval_count: u32,
}

#[derive(Debug, Serialize)]
struct PricingScheme {
    fixed_price: Money,
}

#[derive(Debug, Serialize)]
struct PaymentPreferences {
    auto_bill_outstanding: bool,
    setup_fee_failure_action: &'static str,
    payment_failure_threshold: u32,
}

#[derive(Debug, Serialize)]
struct SubscriptionRequest<'a> {
    plan_id: &'a str,
    subscriber: Subscriber<'a>,
    application_context: AppContext<'a>,
}

#[derive(Debug, Serialize)]
struct Subscriber<'a> {
    name: SubscriberName<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email_address: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SubscriberName<'a> {
    given_name: &'a str,
}

impl PayPalClient {
    pub fn new(config: PayPalConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.client_id.is_empty() && !self.config.client_secret.expose_secret().is_empty()
    }

    /// Exchange platform credentials for a short-lived access token.
    async fn get_access_token(&self) -> Result<String> {
        if !self.is_configured() {
            return Err(anyhow!("PayPal credentials not configured"));
        }

        let url = format!("{}/v1/oauth2/token", self.config.api_base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(
                &self.config.client_id,
                Some(self.config.client_secret.expose_secret()),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::error!(status = %status, "PayPal token request failed");
            return Err(anyhow!("PayPal auth failed: {}", body));
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        Ok(token.access_token)
    }

    /// Create a CAPTURE-intent order with the NGO as payee and the tip as
    /// a platform-fee line item directed at the platform's merchant id.
    pub async fn create_order(
        &self,
        amount_cents: i64,
        tip_cents: i64,
        ngo_merchant_id: &str,
    ) -> Result<Order> {
        let request = OrderRequest {
            intent: "CAPTURE",
            purchase_units: vec![PurchaseUnit {
                amount: AmountWithBreakdown {
                    currency_code: CURRENCY_CODE,
                    value: format_amount(amount_cents + tip_cents),
                    breakdown: Breakdown {
                        item_total: Money::from_cents(amount_cents),
                        handling: Money::from_cents(tip_cents),
                    },
                },
                payee: Payee {
                    merchant_id: ngo_merchant_id,
                },
                payment_instruction: PaymentInstruction {
                    disbursement_mode: "INSTANT",
                    platform_fees: vec![PlatformFee {
                        amount: Money::from_cents(tip_cents),
                        payee: Payee {
                            merchant_id: &self.config.platform_merchant_id,
                        },
                    }],
                },
            }],
            application_context: AppContext {
                shipping_preference: "NO_SHIPPING",
                user_action: "PAY_NOW",
            },
        };

        let order: Order = self.post_json("/v2/checkout/orders", &request).await?;
        tracing::info!(order_id = %order.id, status = %order.status, "PayPal order created");
        Ok(order)
    }

    pub async fn capture_order(&self, order_id: &str) -> Result<Capture> {
        let capture: Capture = self
            .post_json(
                &format!("/v2/checkout/orders/{}/capture", order_id),
                &serde_json::json!({}),
            )
            .await?;
        tracing::info!(order_id = %order_id, status = %capture.status, "PayPal order captured");
        Ok(capture)
    }

    /// Create a monthly billing plan scoped to this NGO+campaign+price.
    pub async fn create_billing_plan(
        &self,
        ngo_name: &str,
        campaign_title: &str,
        total_cents: i64,
    ) -> Result<BillingPlan> {
        let request = PlanRequest {
            product_id: &self.config.product_id,
            name: format!("Monthly Donation for {}", ngo_name),
            description: format!("Recurring donation for {}", campaign_title),
            billing_cycles: vec![BillingCycle {
                frequency: CycleFrequency {
                    interval_unit: "MONTH",
                    interval_count: 1,
                },
                tenure_type: "REGULAR",
                sequence: 1,
                total_cycles: 0,
                pricing_scheme: PricingScheme {
                    fixed_price: Money::from_cents(total_cents),
                },
            }],
            payment_preferences: PaymentPreferences {
                auto_bill_outstanding: true,
                setup_fee_failure_action: "CONTINUE",
                payment_failure_threshold: 1,
            },
        };

        self.post_json("/v1/billing/plans", &request).await
    }

    pub async fn create_subscription(
        &self,
        plan_id: &str,
        donor_name: &str,
        donor_email: Option<&str>,
    ) -> Result<Subscription> {
        let request = SubscriptionRequest {
            plan_id,
            subscriber: Subscriber {
                name: SubscriberName {
                    given_name: donor_name,
                },
                email_address: donor_email,
            },
            application_context: AppContext {
                shipping_preference: "NO_SHIPPING",
                user_action: "SUBSCRIBE_NOW",
            },
        };

        let subscription: Subscription =
            self.post_json("/v1/billing/subscriptions", &request).await?;
        tracing::info!(
            subscription_id = %subscription.id,
            status = %subscription.status,
            "PayPal subscription created"
        );
        Ok(subscription)
    }

    pub async fn get_subscription(&self, subscription_id: &str) -> Result<Subscription> {
        self.get_json(&format!("/v1/billing/subscriptions/{}", subscription_id))
            .await
    }

    /// Generate a partner-referral onboarding link for an NGO.
    pub async fn create_partner_referral(
        &self,
        tracking_id: &str,
        frontend_url: &str,
    ) -> Result<PartnerReferral> {
        let request = serde_json::json!({
            "tracking_id": tracking_id,
            "partner_config_override": {
                "return_url": format!("{}/ngo/{}/paypal-complete", frontend_url, tracking_id),
                "action_renewal_url": format!("{}/ngo/{}/paypal-refresh", frontend_url, tracking_id),
            },
            "operations": [{
                "operation": "API_INTEGRATION",
                "api_integration_preference": {
                    "rest_api_integration": {
                        "integration_method": "PAYPAL",
                        "integration_type": "THIRD_PARTY",
                        "third_party_details": {
                            "features": ["PAYMENT", "REFUND", "PARTNER_FEE"],
                        },
                    },
                },
            }],
            "products": ["PPCP"],
            "legal_consents": [{ "type": "SHARE_DATA_CONSENT", "granted": true }],
        });

        self.post_json("/v2/customer/partner-referrals", &request)
            .await
    }

    /// Exchange the onboarding authorization code for the NGO's merchant id.
    pub async fn exchange_merchant_code(&self, code: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct MerchantIntegration {
            merchant_id: String,
        }

        let path = format!(
            "/v1/customer/partners/{}/merchant-integrations",
            self.config.partner_id
        );
        let integration: MerchantIntegration = self
            .post_json(&path, &serde_json::json!({ "code": code }))
            .await?;
        Ok(integration.merchant_id)
    }

    async fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let token = self.get_access_token().await?;
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        Self::parse_response(path, response).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let token = self.get_access_token().await?;
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self.client.get(&url).bearer_auth(token).send().await?;

        Self::parse_response(path, response).await
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(path = %path, status = %status, "PayPal response");

        if status.is_success() {
            Ok(serde_json::from_str(&body)?)
        } else {
            tracing::error!(path = %path, status = %status, body = %body, "PayPal request failed");
            Err(anyhow!("PayPal error: {}", body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_base_url: &str) -> PayPalConfig {
        PayPalConfig {
            client_id: "client_123".to_string(),
            client_secret: Secret::new("secret_123".to_string()),
            api_base_url: api_base_url.to_string(),
            platform_merchant_id: "PLATFORM1".to_string(),
            partner_id: "PARTNER1".to_string(),
            product_id: "PROD-1".to_string(),
        }
    }

    async fn mock_token_endpoint(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "A21.test",
                "token_type": "Bearer",
                "expires_in": 32400
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn format_amount_renders_two_decimals() {
        assert_eq!(format_amount(5500), "55.00");
        assert_eq!(format_amount(205), "2.05");
        assert_eq!(format_amount(30), "0.30");
        assert_eq!(format_amount(100000), "1000.00");
    }

    #[test]
    fn approval_url_picks_the_approve_link() {
        let order = Order {
            id: "O-1".to_string(),
            status: "CREATED".to_string(),
            links: vec![
                Link {
                    rel: "self".to_string(),
                    href: "https://api.example/self".to_string(),
                },
                Link {
                    rel: "approve".to_string(),
                    href: "https://paypal.example/approve".to_string(),
                },
            ],
        };
        assert_eq!(order.approval_url(), Some("https://paypal.example/approve"));
    }

    #[test]
    fn unconfigured_client_is_detected() {
        let mut config = test_config("https://api-m.sandbox.paypal.com");
        config.client_id = String::new();
        assert!(!PayPalClient::new(config).is_configured());

        let configured = test_config("https://api-m.sandbox.paypal.com");
        assert!(PayPalClient::new(configured).is_configured());
    }

    #[test]
    fn order_body_carries_platform_fee_breakdown() {
        let request = OrderRequest {
            intent: "CAPTURE",
            purchase_units: vec![PurchaseUnit {
                amount: AmountWithBreakdown {
                    currency_code: CURRENCY_CODE,
                    value: format_amount(5500),
                    breakdown: Breakdown {
                        item_total: Money::from_cents(5000),
                        handling: Money::from_cents(500),
                    },
                },
                payee: Payee {
                    merchant_id: "NGO123",
                },
                payment_instruction: PaymentInstruction {
                    disbursement_mode: "INSTANT",
                    platform_fees: vec![PlatformFee {
                        amount: Money::from_cents(500),
                        payee: Payee {
                            merchant_id: "PLATFORM1",
                        },
                    }],
                },
            }],
            application_context: AppContext {
                shipping_preference: "NO_SHIPPING",
                user_action: "PAY_NOW",
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        let unit = &value["purchase_units"][0];
        assert_eq!(unit["amount"]["value"], "55.00");
        assert_eq!(unit["amount"]["breakdown"]["item_total"]["value"], "50.00");
        assert_eq!(unit["amount"]["breakdown"]["handling"]["value"], "5.00");
        assert_eq!(unit["payee"]["merchant_id"], "NGO123");
        assert_eq!(
            unit["payment_instruction"]["platform_fees"][0]["payee"]["merchant_id"],
            "PLATFORM1"
        );
    }

    #[tokio::test]
    async fn create_order_fetches_token_then_posts_order() {
        let server = MockServer::start().await;
        mock_token_endpoint(&server).await;

        Mock::given(method("POST"))
            .and(path("/v2/checkout/orders"))
            .and(body_string_contains("\"merchant_id\":\"NGO123\""))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "ORDER-1",
                "status": "CREATED",
                "links": [
                    { "rel": "self", "href": "https://x/self", "method": "GET" },
                    { "rel": "approve", "href": "https://x/approve", "method": "GET" }
                ]
            })))
            .mount(&server)
            .await;

        let client = PayPalClient::new(test_config(&server.uri()));
        let order = client.create_order(5000, 500, "NGO123").await.unwrap();
        assert_eq!(order.id, "ORDER-1");
        assert_eq!(order.approval_url(), Some("https://x/approve"));
    }

    #[tokio::test]
    async fn capture_failure_surfaces_rail_payload() {
        let server = MockServer::start().await;
        mock_token_endpoint(&server).await;

        Mock::given(method("POST"))
            .and(path("/v2/checkout/orders/ORDER-404/capture"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "name": "RESOURCE_NOT_FOUND",
                "message": "The specified resource does not exist."
            })))
            .mount(&server)
            .await;

        let client = PayPalClient::new(test_config(&server.uri()));
        let err = client.capture_order("ORDER-404").await.unwrap_err();
        assert!(err.to_string().contains("RESOURCE_NOT_FOUND"));
    }

    #[tokio::test]
    async fn get_subscription_parses_status() {
        let server = MockServer::start().await;
        mock_token_endpoint(&server).await;

        Mock::given(method("GET"))
            .and(path("/v1/billing/subscriptions/I-SUB1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "I-SUB1",
                "status": "ACTIVE",
                "links": []
            })))
            .mount(&server)
            .await;

        let client = PayPalClient::new(test_config(&server.uri()));
        let subscription = client.get_subscription("I-SUB1").await.unwrap();
        assert_eq!(subscription.status, "ACTIVE");
    }
}
