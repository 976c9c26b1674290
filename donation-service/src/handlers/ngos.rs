//! NGO account handlers: the minimal surface needed to own campaigns and
//! hold rail identifiers. Registration, credentials and document upload
//! live in the upstream identity service.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use mongodb::bson::DateTime;
use platform_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{CreateNgoRequest, NgoResponse},
    models::{Ngo, PaypalOnboardingStatus},
    AppState,
};

pub async fn create_ngo(
    State(state): State<AppState>,
    Json(payload): Json<CreateNgoRequest>,
) -> Result<(StatusCode, Json<NgoResponse>), AppError> {
    payload.validate()?;

    let now = DateTime::now();
    let ngo = Ngo {
        id: Uuid::new_v4(),
        org_name: payload.org_name,
        email: payload.email,
        country: payload.country.to_uppercase(),
        website: payload.website,
        description: payload.description,
        stripe_account_id: None,
        paypal_merchant_id: None,
        paypal_status: PaypalOnboardingStatus::NotStarted,
        paypal_onboarding_link: None,
        created_at: now,
        updated_at: now,
    };

    tracing::info!(ngo_id = %ngo.id, org_name = %ngo.org_name, "Creating NGO");

    state.ngos.create_ngo(ngo.clone()).await.map_err(|e| {
        // The unique email index turns duplicates into E11000 write errors.
        if e.to_string().contains("E11000") {
            AppError::Conflict(anyhow::anyhow!("An NGO with this email already exists"))
        } else {
            AppError::DatabaseError(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(NgoResponse::from(ngo))))
}

pub async fn get_ngo(
    State(state): State<AppState>,
    Path(ngo_id): Path<Uuid>,
) -> Result<Json<NgoResponse>, AppError> {
    let ngo = state
        .ngos
        .get_ngo(ngo_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("NGO not found")))?;

    Ok(Json(NgoResponse::from(ngo)))
}
