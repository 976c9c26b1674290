//! Campaign handlers.
//!
//! The minimal campaign surface the donation ledger needs: creation by an
//! authenticated NGO, public reads, and owner-only status transitions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use mongodb::bson::DateTime;
use platform_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        CampaignListResponse, CampaignResponse, CreateCampaignRequest, ListCampaignsQuery,
        UpdateCampaignStatusRequest,
    },
    middleware::NgoIdentity,
    models::{campaign::slugify, Campaign, CampaignMedia, CampaignStatus},
    AppState,
};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Create a campaign owned by the authenticated NGO.
pub async fn create_campaign(
    State(state): State<AppState>,
    identity: NgoIdentity,
    Json(payload): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<CampaignResponse>), AppError> {
    payload.validate()?;

    let ngo = state
        .ngos
        .get_ngo(identity.ngo_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("NGO not found")))?;

    let slug = unique_slug(&state, &payload.title).await?;

    let now = DateTime::now();
    let campaign = Campaign {
        id: Uuid::new_v4(),
        title: payload.title,
        description: payload.description,
        ngo_id: ngo.id,
        funding_goal: payload.funding_goal,
        total_raised: 0.0,
        cause: payload.cause,
        country: payload.country,
        media: CampaignMedia {
            main_image: payload.main_image,
            additional_images: payload.additional_images,
        },
        status: CampaignStatus::Draft,
        donations: Vec::new(),
        pending_payments: Vec::new(),
        recurring_payments: Vec::new(),
        pending_recurring_payments: Vec::new(),
        deadline: payload.deadline,
        campaign_slug: slug,
        created_at: now,
        updated_at: now,
    };

    tracing::info!(
        campaign_id = %campaign.id,
        ngo_id = %ngo.id,
        slug = %campaign.campaign_slug,
        "Creating campaign"
    );

    state.campaigns.create_campaign(campaign.clone()).await?;

    Ok((StatusCode::CREATED, Json(CampaignResponse::from(campaign))))
}

/// Derive a slug from the title, suffixing on collision.
async fn unique_slug(state: &AppState, title: &str) -> Result<String, AppError> {
    let base = slugify(title);
    let base = if base.is_empty() {
        "campaign".to_string()
    } else {
        base
    };

    if !state.campaigns.slug_exists(&base).await? {
        return Ok(base);
    }

    let suffix = Uuid::new_v4().simple().to_string();
    Ok(format!("{}-{}", base, &suffix[..6]))
}

pub async fn list_campaigns(
    State(state): State<AppState>,
    Query(query): Query<ListCampaignsQuery>,
) -> Result<Json<CampaignListResponse>, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    let (campaigns, total) = state
        .campaigns
        .list_campaigns(query.status, limit, offset)
        .await?;

    Ok(Json(CampaignListResponse {
        campaigns: campaigns.into_iter().map(CampaignResponse::from).collect(),
        total,
    }))
}

pub async fn get_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<CampaignResponse>, AppError> {
    let campaign = state
        .campaigns
        .get_campaign(campaign_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Campaign not found")))?;

    Ok(Json(CampaignResponse::from(campaign)))
}

pub async fn get_campaign_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<CampaignResponse>, AppError> {
    let campaign = state
        .campaigns
        .get_campaign_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Campaign not found")))?;

    Ok(Json(CampaignResponse::from(campaign)))
}

/// Transition a campaign's lifecycle status. Owner only.
pub async fn update_campaign_status(
    State(state): State<AppState>,
    identity: NgoIdentity,
    Path(campaign_id): Path<Uuid>,
    Json(payload): Json<UpdateCampaignStatusRequest>,
) -> Result<StatusCode, AppError> {
    let campaign = state
        .campaigns
        .get_campaign(campaign_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Campaign not found")))?;

    if campaign.ngo_id != identity.ngo_id {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Campaign belongs to a different NGO"
        )));
    }

    tracing::info!(
        campaign_id = %campaign_id,
        new_status = ?payload.status,
        "Updating campaign status"
    );

    state
        .campaigns
        .update_campaign_status(campaign_id, payload.status)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
