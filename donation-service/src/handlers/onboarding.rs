//! Rail onboarding handlers.
//!
//! Stripe: create the Express account on first request, then hand back an
//! account link; readiness is a one-shot status probe the client polls,
//! never an in-request wait. PayPal: partner referral link, then an
//! authorization-code exchange that persists the merchant id.

use axum::{
    extract::{Path, State},
    Json,
};
use platform_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::{
        CompletePaypalOnboardingRequest, CompletePaypalOnboardingResponse, OnboardingLinkResponse,
        StripeAccountStatusResponse,
    },
    models::Ngo,
    AppState,
};

async fn load_ngo(state: &AppState, ngo_id: Uuid) -> Result<Ngo, AppError> {
    state
        .ngos
        .get_ngo(ngo_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("NGO not found")))
}

/// Create (or reuse) the NGO's Express account and mint an onboarding link.
pub async fn stripe_onboarding_link(
    State(state): State<AppState>,
    Path(ngo_id): Path<Uuid>,
) -> Result<Json<OnboardingLinkResponse>, AppError> {
    let ngo = load_ngo(&state, ngo_id).await?;

    let account_id = match ngo.stripe_account_id {
        Some(account_id) => account_id,
        None => {
            let account = state
                .stripe
                .create_express_account(&ngo.email, &ngo.country)
                .await
                .map_err(AppError::RailError)?;
            state
                .ngos
                .set_stripe_account(ngo.id, &account.id)
                .await?;
            tracing::info!(ngo_id = %ngo.id, account_id = %account.id, "Stripe account created");
            account.id
        }
    };

    let refresh_url = format!("{}/ngo/{}/stripe-refresh", state.config.frontend_url, ngo.id);
    let return_url = format!("{}/ngo/{}/stripe-complete", state.config.frontend_url, ngo.id);

    let url = state
        .stripe
        .create_account_link(&account_id, &refresh_url, &return_url)
        .await
        .map_err(AppError::RailError)?;

    Ok(Json(OnboardingLinkResponse {
        onboarding_url: url,
    }))
}

/// One-shot Stripe account readiness probe, polled client-side.
pub async fn stripe_account_status(
    State(state): State<AppState>,
    Path(ngo_id): Path<Uuid>,
) -> Result<Json<StripeAccountStatusResponse>, AppError> {
    let ngo = load_ngo(&state, ngo_id).await?;

    let account_id = ngo.stripe_account_id.as_deref().ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!("Stripe onboarding has not started"))
    })?;

    let account = state
        .stripe
        .retrieve_account(account_id)
        .await
        .map_err(AppError::RailError)?;

    let ready = account.charges_enabled && account.payouts_enabled;

    Ok(Json(StripeAccountStatusResponse {
        account_id: account.id,
        charges_enabled: account.charges_enabled,
        payouts_enabled: account.payouts_enabled,
        details_submitted: account.details_submitted,
        ready,
        missing_requirements: account
            .requirements
            .map(|r| r.currently_due)
            .unwrap_or_default(),
    }))
}

/// Generate a PayPal partner-referral onboarding link for the NGO.
pub async fn paypal_onboarding_link(
    State(state): State<AppState>,
    Path(ngo_id): Path<Uuid>,
) -> Result<Json<OnboardingLinkResponse>, AppError> {
    let ngo = load_ngo(&state, ngo_id).await?;

    let referral = state
        .paypal
        .create_partner_referral(&ngo.id.to_string(), &state.config.frontend_url)
        .await
        .map_err(AppError::RailError)?;

    let url = referral
        .action_url()
        .ok_or_else(|| {
            AppError::BadGateway("PayPal referral carried no action link".to_string())
        })?
        .to_string();

    state.ngos.set_paypal_onboarding_link(ngo.id, &url).await?;

    tracing::info!(ngo_id = %ngo.id, "PayPal onboarding link generated");

    Ok(Json(OnboardingLinkResponse {
        onboarding_url: url,
    }))
}

/// Exchange the onboarding authorization code for the merchant id and
/// mark the NGO ready to accept PayPal donations.
pub async fn complete_paypal_onboarding(
    State(state): State<AppState>,
    Path(ngo_id): Path<Uuid>,
    Json(payload): Json<CompletePaypalOnboardingRequest>,
) -> Result<Json<CompletePaypalOnboardingResponse>, AppError> {
    if payload.code.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!("Missing code")));
    }

    let ngo = load_ngo(&state, ngo_id).await?;

    let merchant_id = state
        .paypal
        .exchange_merchant_code(&payload.code)
        .await
        .map_err(AppError::RailError)?;

    state
        .ngos
        .complete_paypal_onboarding(ngo.id, &merchant_id)
        .await?;

    tracing::info!(ngo_id = %ngo.id, merchant_id = %merchant_id, "PayPal onboarding completed");

    Ok(Json(CompletePaypalOnboardingResponse { merchant_id }))
}
