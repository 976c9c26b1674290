//! Donation creation and confirmation handlers for both rails.
//!
//! Creation computes the fee split, opens the charge or subscription on
//! the rail, and appends a pending ledger row keyed by the rail id.
//! Confirmation re-reads the rail object and migrates pending rows into
//! the settled sub-ledgers through a single conditional update, so a
//! repeated confirmation can never double-increment the raised total.

use axum::{extract::State, Json};
use mongodb::bson::DateTime;
use platform_core::error::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::{
        Campaign, Donation, DonationFrequency, Ngo, PaymentRail, PendingPayment,
        PendingRecurringPayment, RecurringPayment,
    },
    services::{
        fees::{self, RecurringFee},
        metrics,
        stripe::{CreatePaymentIntent, CreateSubscription},
    },
    AppState,
};

/// Request to open a Stripe payment intent or subscription.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStripeDonationRequest {
    /// NGO-directed amount in USD.
    #[validate(range(min = 0.01))]
    pub amount: f64,
    /// Platform-directed tip in USD.
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub tip_amount: f64,
    pub campaign_id: Uuid,
    #[validate(length(min = 1, max = 120))]
    pub donor_name: String,
    #[validate(email)]
    pub donor_email: Option<String>,
    /// Stripe payment-method id collected client-side.
    #[validate(length(min = 1))]
    pub payment_method: String,
    pub frequency: DonationFrequency,
}

#[derive(Debug, Serialize)]
pub struct CreateStripeDonationResponse {
    /// Client-side completion secret; absent when the first subscription
    /// invoice settled synchronously.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    pub total_amount: f64,
    pub currency: &'static str,
    pub frequency: DonationFrequency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Request to confirm a Stripe payment after client-side completion.
#[derive(Debug, Deserialize)]
pub struct ConfirmStripeDonationRequest {
    pub payment_intent_id: String,
    pub frequency: DonationFrequency,
    /// Required for monthly confirmations; links the invoice payment back
    /// to the pending subscription row.
    pub subscription_id: Option<String>,
}

/// Request to open a PayPal order or billing subscription.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePayPalDonationRequest {
    #[validate(range(min = 0.01))]
    pub amount: f64,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub tip_amount: f64,
    pub campaign_id: Uuid,
    #[validate(length(min = 1, max = 120))]
    pub donor_name: String,
    #[validate(email)]
    pub donor_email: Option<String>,
    pub frequency: DonationFrequency,
}

#[derive(Debug, Serialize)]
pub struct CreatePayPalDonationResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    /// Redirect target where the donor approves the payment.
    pub approval_url: String,
    pub total_amount: f64,
    pub currency: &'static str,
    pub frequency: DonationFrequency,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPayPalDonationRequest {
    pub frequency: DonationFrequency,
    pub order_id: Option<String>,
    pub subscription_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConfirmDonationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donation: Option<SettledDonationView>,
}

#[derive(Debug, Serialize)]
pub struct SettledDonationView {
    pub donor_name: String,
    pub amount: f64,
    pub ngo_amount: f64,
    pub tip_amount: f64,
    pub frequency: DonationFrequency,
}

impl ConfirmDonationResponse {
    fn not_completed(status: impl Into<Option<String>>, message: &str) -> Self {
        Self {
            success: false,
            status: status.into(),
            message: message.to_string(),
            donation: None,
        }
    }
}

/// Load a campaign and its owning NGO, or fail with 404.
async fn load_campaign_and_ngo(
    state: &AppState,
    campaign_id: Uuid,
) -> Result<(Campaign, Ngo), AppError> {
    let campaign = state
        .campaigns
        .get_campaign(campaign_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Campaign not found")))?;

    let ngo = state
        .ngos
        .get_ngo(campaign.ngo_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("NGO not found")))?;

    Ok((campaign, ngo))
}

fn spawn_settlement_emails(
    state: &AppState,
    ngo: &Ngo,
    campaign_title: &str,
    donor_name: &str,
    donor_email: Option<&str>,
    ngo_amount: f64,
) {
    let mailer = state.mailer.clone();
    let ngo_email = ngo.email.clone();
    let ngo_name = ngo.org_name.clone();
    let campaign_title = campaign_title.to_string();
    let donor_name = donor_name.to_string();
    let donor_email = donor_email.map(|s| s.to_string());

    tokio::spawn(async move {
        if let Some(donor_email) = donor_email {
            if let Err(e) = mailer
                .send_donation_receipt(&donor_email, &donor_name, &campaign_title, ngo_amount)
                .await
            {
                tracing::warn!(error = %e, "Failed to send donor receipt");
            }
        }
        if let Err(e) = mailer
            .send_ngo_notification(&ngo_email, &ngo_name, &campaign_title, &donor_name, ngo_amount)
            .await
        {
            tracing::warn!(error = %e, "Failed to send NGO notification");
        }
    });
}

/// Open a Stripe payment intent (one-time) or subscription (monthly) for
/// a campaign donation. Public: the donation flow is unauthenticated.
pub async fn create_stripe_donation(
    State(state): State<AppState>,
    Json(payload): Json<CreateStripeDonationRequest>,
) -> Result<Json<CreateStripeDonationResponse>, AppError> {
    payload.validate()?;

    let amount_cents = fees::to_cents(payload.amount);
    let tip_cents = fees::to_cents(payload.tip_amount);
    let split = fees::compute(
        amount_cents,
        tip_cents,
        PaymentRail::Stripe,
        payload.frequency,
    )
    .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let (campaign, ngo) = load_campaign_and_ngo(&state, payload.campaign_id).await?;

    let stripe_account_id = ngo.stripe_account_id.as_deref().ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!("NGO Stripe account not connected"))
    })?;

    tracing::info!(
        campaign_id = %campaign.id,
        amount = payload.amount,
        tip = payload.tip_amount,
        frequency = ?payload.frequency,
        "Creating Stripe donation"
    );

    match payload.frequency {
        DonationFrequency::Once => {
            let intent = state
                .stripe
                .create_payment_intent(&CreatePaymentIntent {
                    amount_cents: split.total_cents,
                    payment_method: &payload.payment_method,
                    destination_account: stripe_account_id,
                    application_fee_cents: split.platform_cents,
                    campaign_id: &campaign.id.to_string(),
                    donor_name: &payload.donor_name,
                    donor_email: payload.donor_email.as_deref(),
                    tip_amount: payload.tip_amount,
                })
                .await
                .map_err(AppError::RailError)?;

            let pending = PendingPayment {
                order_id: intent.id.clone(),
                amount: payload.amount,
                tip_amount: payload.tip_amount,
                donor_name: payload.donor_name.clone(),
                donor_email: payload.donor_email.clone(),
                payment_method: "card".to_string(),
                rail: PaymentRail::Stripe,
                timestamp: DateTime::now(),
            };
            state
                .campaigns
                .append_pending_payment(campaign.id, &pending)
                .await?;

            metrics::record_donation("stripe", "created");

            Ok(Json(CreateStripeDonationResponse {
                client_secret: intent.client_secret,
                subscription_id: None,
                total_amount: fees::to_dollars(split.total_cents),
                currency: "USD",
                frequency: DonationFrequency::Once,
                message: None,
            }))
        }
        DonationFrequency::Monthly => {
            let Some(RecurringFee::Percent(fee_percent)) = split.recurring_fee else {
                return Err(AppError::InternalError(anyhow::anyhow!(
                    "fee split produced no percent fee for a monthly Stripe donation"
                )));
            };

            // One product+price per campaign+amount; not reused across donors.
            let product = state
                .stripe
                .create_product(&format!("Monthly donation for {}", campaign.title))
                .await
                .map_err(AppError::RailError)?;
            let price = state
                .stripe
                .create_monthly_price(split.total_cents, &product.id)
                .await
                .map_err(AppError::RailError)?;

            let customer = state
                .stripe
                .create_customer(
                    &payload.donor_name,
                    payload.donor_email.as_deref(),
                    &campaign.id.to_string(),
                )
                .await
                .map_err(AppError::RailError)?;
            state
                .stripe
                .attach_payment_method(&payload.payment_method, &customer.id)
                .await
                .map_err(AppError::RailError)?;
            state
                .stripe
                .set_default_payment_method(&customer.id, &payload.payment_method)
                .await
                .map_err(AppError::RailError)?;

            let subscription = state
                .stripe
                .create_subscription(&CreateSubscription {
                    customer_id: &customer.id,
                    price_id: &price.id,
                    payment_method: &payload.payment_method,
                    destination_account: stripe_account_id,
                    application_fee_percent: fee_percent,
                })
                .await
                .map_err(AppError::RailError)?;

            let pending = PendingRecurringPayment {
                setup_token_id: subscription.id.clone(),
                amount: payload.amount,
                tip_amount: payload.tip_amount,
                donor_name: payload.donor_name.clone(),
                donor_email: payload.donor_email.clone(),
                rail: PaymentRail::Stripe,
                timestamp: DateTime::now(),
            };
            state
                .campaigns
                .append_pending_recurring(campaign.id, &pending)
                .await?;

            metrics::record_donation("stripe", "created");

            let client_secret = subscription
                .first_invoice_client_secret()
                .map(|(_, secret)| secret.to_string());
            // No client secret means the first invoice settled
            // synchronously; nothing is left to complete client-side, but
            // settlement still needs the confirmation call.
            let message = if client_secret.is_none() {
                Some("Subscription created and invoice already paid".to_string())
            } else {
                None
            };

            Ok(Json(CreateStripeDonationResponse {
                client_secret,
                subscription_id: Some(subscription.id),
                total_amount: fees::to_dollars(split.total_cents),
                currency: "USD",
                frequency: DonationFrequency::Monthly,
                message,
            }))
        }
    }
}

/// Confirm a Stripe payment by re-reading the intent from the rail and
/// migrating the pending ledger row on success.
pub async fn confirm_stripe_donation(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmStripeDonationRequest>,
) -> Result<Json<ConfirmDonationResponse>, AppError> {
    if payload.payment_intent_id.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Missing payment_intent_id"
        )));
    }

    let intent = state
        .stripe
        .retrieve_payment_intent(&payload.payment_intent_id)
        .await
        .map_err(AppError::RailError)?;

    if intent.status != "succeeded" {
        tracing::info!(
            intent_id = %intent.id,
            status = %intent.status,
            "Stripe payment not completed yet"
        );
        return Ok(Json(ConfirmDonationResponse::not_completed(
            Some(intent.status),
            "Payment not completed yet",
        )));
    }

    match payload.frequency {
        DonationFrequency::Once => {
            let campaign_id = intent
                .metadata
                .get("campaign_id")
                .and_then(|raw| Uuid::parse_str(raw).ok())
                .ok_or_else(|| {
                    AppError::BadRequest(anyhow::anyhow!(
                        "Payment intent is missing campaign metadata"
                    ))
                })?;

            let (campaign, ngo) = load_campaign_and_ngo(&state, campaign_id).await?;

            let tip_amount = intent
                .metadata
                .get("tip_amount")
                .and_then(|t| t.parse::<f64>().ok())
                .unwrap_or(0.0);
            let total_charged = fees::to_dollars(intent.amount);
            let ngo_amount = total_charged - tip_amount;

            let donation = Donation {
                donor_name: intent
                    .metadata
                    .get("donor_name")
                    .cloned()
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| "Anonymous".to_string()),
                donor_email: intent
                    .metadata
                    .get("donor_email")
                    .cloned()
                    .filter(|e| !e.is_empty()),
                amount: total_charged,
                ngo_amount,
                tip_amount,
                payment_method: "card".to_string(),
                frequency: DonationFrequency::Once,
                rail_id: intent.id.clone(),
                timestamp: DateTime::now(),
            };

            let settled = state
                .campaigns
                .settle_one_time(campaign.id, &intent.id, &donation)
                .await?;

            if !settled {
                // Pending row already migrated or never existed; the
                // ledger must not move again.
                return Ok(Json(ConfirmDonationResponse::not_completed(
                    Some(intent.status),
                    "Payment already confirmed or unknown",
                )));
            }

            metrics::record_donation("stripe", "settled");
            metrics::record_settled_amount("stripe", fees::to_cents(ngo_amount).max(0) as u64);
            spawn_settlement_emails(
                &state,
                &ngo,
                &campaign.title,
                &donation.donor_name,
                donation.donor_email.as_deref(),
                ngo_amount,
            );

            tracing::info!(
                intent_id = %intent.id,
                campaign_id = %campaign.id,
                ngo_amount,
                "One-time Stripe donation settled"
            );

            Ok(Json(ConfirmDonationResponse {
                success: true,
                status: Some("succeeded".to_string()),
                message: "Donation recorded".to_string(),
                donation: Some(SettledDonationView {
                    donor_name: donation.donor_name,
                    amount: donation.amount,
                    ngo_amount: donation.ngo_amount,
                    tip_amount: donation.tip_amount,
                    frequency: DonationFrequency::Once,
                }),
            }))
        }
        DonationFrequency::Monthly => {
            let subscription_id = payload.subscription_id.as_deref().ok_or_else(|| {
                AppError::BadRequest(anyhow::anyhow!(
                    "Missing subscription_id for monthly confirmation"
                ))
            })?;

            let campaign = state
                .campaigns
                .find_by_pending_subscription(subscription_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(anyhow::anyhow!(
                        "No pending subscription found for this id"
                    ))
                })?;

            let pending = campaign
                .pending_recurring_payments
                .iter()
                .find(|p| p.setup_token_id == subscription_id)
                .ok_or_else(|| {
                    AppError::NotFound(anyhow::anyhow!(
                        "No pending subscription found for this id"
                    ))
                })?;

            let ngo = state
                .ngos
                .get_ngo(campaign.ngo_id)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("NGO not found")))?;

            let record = RecurringPayment {
                payment_token: subscription_id.to_string(),
                amount: pending.amount + pending.tip_amount,
                ngo_amount: pending.amount,
                tip_amount: pending.tip_amount,
                donor_name: pending.donor_name.clone(),
                donor_email: pending.donor_email.clone(),
                payment_method: "card".to_string(),
                frequency: DonationFrequency::Monthly,
                timestamp: DateTime::now(),
            };

            let settled = state
                .campaigns
                .activate_recurring(campaign.id, subscription_id, &record)
                .await?;

            if !settled {
                return Ok(Json(ConfirmDonationResponse::not_completed(
                    Some(intent.status),
                    "Subscription already confirmed or unknown",
                )));
            }

            metrics::record_donation("stripe", "settled");
            metrics::record_settled_amount(
                "stripe",
                fees::to_cents(record.ngo_amount).max(0) as u64,
            );
            spawn_settlement_emails(
                &state,
                &ngo,
                &campaign.title,
                &record.donor_name,
                record.donor_email.as_deref(),
                record.ngo_amount,
            );

            tracing::info!(
                subscription_id = %subscription_id,
                campaign_id = %campaign.id,
                ngo_amount = record.ngo_amount,
                "Monthly Stripe donation settled"
            );

            Ok(Json(ConfirmDonationResponse {
                success: true,
                status: Some("succeeded".to_string()),
                message: "Recurring donation recorded".to_string(),
                donation: Some(SettledDonationView {
                    donor_name: record.donor_name,
                    amount: record.amount,
                    ngo_amount: record.ngo_amount,
                    tip_amount: record.tip_amount,
                    frequency: DonationFrequency::Monthly,
                }),
            }))
        }
    }
}

/// Open a PayPal order (one-time) or billing subscription (monthly) for a
/// campaign donation. Public, like the Stripe flow.
pub async fn create_paypal_donation(
    State(state): State<AppState>,
    Json(payload): Json<CreatePayPalDonationRequest>,
) -> Result<Json<CreatePayPalDonationResponse>, AppError> {
    payload.validate()?;

    let amount_cents = fees::to_cents(payload.amount);
    let tip_cents = fees::to_cents(payload.tip_amount);
    let split = fees::compute(
        amount_cents,
        tip_cents,
        PaymentRail::Paypal,
        payload.frequency,
    )
    .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let (campaign, ngo) = load_campaign_and_ngo(&state, payload.campaign_id).await?;

    let merchant_id = ngo.paypal_merchant_id.as_deref().ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!("NGO PayPal account not connected"))
    })?;

    tracing::info!(
        campaign_id = %campaign.id,
        amount = payload.amount,
        tip = payload.tip_amount,
        frequency = ?payload.frequency,
        "Creating PayPal donation"
    );

    match payload.frequency {
        DonationFrequency::Once => {
            let order = state
                .paypal
                .create_order(amount_cents, tip_cents, merchant_id)
                .await
                .map_err(AppError::RailError)?;

            let approval_url = order
                .approval_url()
                .ok_or_else(|| {
                    AppError::BadGateway("PayPal order carried no approval link".to_string())
                })?
                .to_string();

            let pending = PendingPayment {
                order_id: order.id.clone(),
                amount: payload.amount,
                tip_amount: payload.tip_amount,
                donor_name: payload.donor_name.clone(),
                donor_email: payload.donor_email.clone(),
                payment_method: "paypal".to_string(),
                rail: PaymentRail::Paypal,
                timestamp: DateTime::now(),
            };
            state
                .campaigns
                .append_pending_payment(campaign.id, &pending)
                .await?;

            metrics::record_donation("paypal", "created");

            Ok(Json(CreatePayPalDonationResponse {
                order_id: Some(order.id),
                subscription_id: None,
                approval_url,
                total_amount: fees::to_dollars(split.total_cents),
                currency: "USD",
                frequency: DonationFrequency::Once,
            }))
        }
        DonationFrequency::Monthly => {
            let plan = state
                .paypal
                .create_billing_plan(&ngo.org_name, &campaign.title, split.total_cents)
                .await
                .map_err(AppError::RailError)?;

            let subscription = state
                .paypal
                .create_subscription(
                    &plan.id,
                    &payload.donor_name,
                    payload.donor_email.as_deref(),
                )
                .await
                .map_err(AppError::RailError)?;

            let approval_url = subscription
                .approval_url()
                .ok_or_else(|| {
                    AppError::BadGateway(
                        "PayPal subscription carried no approval link".to_string(),
                    )
                })?
                .to_string();

            let pending = PendingRecurringPayment {
                setup_token_id: subscription.id.clone(),
                amount: payload.amount,
                tip_amount: payload.tip_amount,
                donor_name: payload.donor_name.clone(),
                donor_email: payload.donor_email.clone(),
                rail: PaymentRail::Paypal,
                timestamp: DateTime::now(),
            };
            state
                .campaigns
                .append_pending_recurring(campaign.id, &pending)
                .await?;

            metrics::record_donation("paypal", "created");

            Ok(Json(CreatePayPalDonationResponse {
                order_id: None,
                subscription_id: Some(subscription.id),
                approval_url,
                total_amount: fees::to_dollars(split.total_cents),
                currency: "USD",
                frequency: DonationFrequency::Monthly,
            }))
        }
    }
}

/// Confirm a PayPal payment: capture the order (one-time) or verify the
/// subscription is active (monthly), then migrate the pending row.
pub async fn confirm_paypal_donation(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmPayPalDonationRequest>,
) -> Result<Json<ConfirmDonationResponse>, AppError> {
    match payload.frequency {
        DonationFrequency::Once => {
            let order_id = payload.order_id.as_deref().ok_or_else(|| {
                AppError::BadRequest(anyhow::anyhow!("Missing order_id"))
            })?;

            let campaign = state
                .campaigns
                .find_by_pending_order(order_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(anyhow::anyhow!("No pending payment found for this order"))
                })?;

            let pending = campaign
                .pending_payments
                .iter()
                .find(|p| p.order_id == order_id)
                .ok_or_else(|| {
                    AppError::NotFound(anyhow::anyhow!("No pending payment found for this order"))
                })?;

            let capture = state
                .paypal
                .capture_order(order_id)
                .await
                .map_err(AppError::RailError)?;

            if capture.status != "COMPLETED" {
                tracing::info!(
                    order_id = %order_id,
                    status = %capture.status,
                    "PayPal capture not completed"
                );
                return Ok(Json(ConfirmDonationResponse::not_completed(
                    Some(capture.status),
                    "Payment not completed",
                )));
            }

            let ngo = state
                .ngos
                .get_ngo(campaign.ngo_id)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("NGO not found")))?;

            let donation = Donation {
                donor_name: pending.donor_name.clone(),
                donor_email: pending.donor_email.clone(),
                amount: pending.amount + pending.tip_amount,
                ngo_amount: pending.amount,
                tip_amount: pending.tip_amount,
                payment_method: "paypal".to_string(),
                frequency: DonationFrequency::Once,
                rail_id: order_id.to_string(),
                timestamp: DateTime::now(),
            };

            let settled = state
                .campaigns
                .settle_one_time(campaign.id, order_id, &donation)
                .await?;

            if !settled {
                return Ok(Json(ConfirmDonationResponse::not_completed(
                    Some("COMPLETED".to_string()),
                    "Payment already confirmed or unknown",
                )));
            }

            metrics::record_donation("paypal", "settled");
            metrics::record_settled_amount(
                "paypal",
                fees::to_cents(donation.ngo_amount).max(0) as u64,
            );
            spawn_settlement_emails(
                &state,
                &ngo,
                &campaign.title,
                &donation.donor_name,
                donation.donor_email.as_deref(),
                donation.ngo_amount,
            );

            tracing::info!(
                order_id = %order_id,
                campaign_id = %campaign.id,
                ngo_amount = donation.ngo_amount,
                "One-time PayPal donation settled"
            );

            Ok(Json(ConfirmDonationResponse {
                success: true,
                status: Some("COMPLETED".to_string()),
                message: "Donation recorded".to_string(),
                donation: Some(SettledDonationView {
                    donor_name: donation.donor_name,
                    amount: donation.amount,
                    ngo_amount: donation.ngo_amount,
                    tip_amount: donation.tip_amount,
                    frequency: DonationFrequency::Once,
                }),
            }))
        }
        DonationFrequency::Monthly => {
            let subscription_id = payload.subscription_id.as_deref().ok_or_else(|| {
                AppError::BadRequest(anyhow::anyhow!("Missing subscription_id"))
            })?;

            let campaign = state
                .campaigns
                .find_by_pending_subscription(subscription_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(anyhow::anyhow!(
                        "No pending subscription found for this id"
                    ))
                })?;

            let pending = campaign
                .pending_recurring_payments
                .iter()
                .find(|p| p.setup_token_id == subscription_id)
                .ok_or_else(|| {
                    AppError::NotFound(anyhow::anyhow!(
                        "No pending subscription found for this id"
                    ))
                })?;

            let subscription = state
                .paypal
                .get_subscription(subscription_id)
                .await
                .map_err(AppError::RailError)?;

            if subscription.status != "ACTIVE" {
                tracing::info!(
                    subscription_id = %subscription_id,
                    status = %subscription.status,
                    "PayPal subscription not active yet"
                );
                return Ok(Json(ConfirmDonationResponse::not_completed(
                    Some(subscription.status),
                    "Subscription not active yet",
                )));
            }

            let ngo = state
                .ngos
                .get_ngo(campaign.ngo_id)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("NGO not found")))?;

            let record = RecurringPayment {
                payment_token: subscription_id.to_string(),
                amount: pending.amount + pending.tip_amount,
                ngo_amount: pending.amount,
                tip_amount: pending.tip_amount,
                donor_name: pending.donor_name.clone(),
                donor_email: pending.donor_email.clone(),
                payment_method: "paypal".to_string(),
                frequency: DonationFrequency::Monthly,
                timestamp: DateTime::now(),
            };

            let settled = state
                .campaigns
                .activate_recurring(campaign.id, subscription_id, &record)
                .await?;

            if !settled {
                return Ok(Json(ConfirmDonationResponse::not_completed(
                    Some("ACTIVE".to_string()),
                    "Subscription already confirmed or unknown",
                )));
            }

            metrics::record_donation("paypal", "settled");
            metrics::record_settled_amount(
                "paypal",
                fees::to_cents(record.ngo_amount).max(0) as u64,
            );
            spawn_settlement_emails(
                &state,
                &ngo,
                &campaign.title,
                &record.donor_name,
                record.donor_email.as_deref(),
                record.ngo_amount,
            );

            tracing::info!(
                subscription_id = %subscription_id,
                campaign_id = %campaign.id,
                ngo_amount = record.ngo_amount,
                "Monthly PayPal donation activated"
            );

            Ok(Json(ConfirmDonationResponse {
                success: true,
                status: Some("ACTIVE".to_string()),
                message: "Recurring donation recorded".to_string(),
                donation: Some(SettledDonationView {
                    donor_name: record.donor_name,
                    amount: record.amount,
                    ngo_amount: record.ngo_amount,
                    tip_amount: record.tip_amount,
                    frequency: DonationFrequency::Monthly,
                }),
            }))
        }
    }
}
