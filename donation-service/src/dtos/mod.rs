use crate::models::{Campaign, CampaignMedia, CampaignStatus, Ngo, PaypalOnboardingStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCampaignRequest {
    #[validate(length(min = 3, max = 120))]
    pub title: String,
    #[validate(length(min = 10))]
    pub description: String,
    #[validate(range(min = 1.0))]
    pub funding_goal: f64,
    #[validate(length(min = 1))]
    pub cause: String,
    #[validate(length(min = 2, max = 2))]
    pub country: String,
    pub main_image: String,
    #[serde(default)]
    pub additional_images: Vec<String>,
    pub deadline: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCampaignStatusRequest {
    pub status: CampaignStatus,
}

#[derive(Debug, Deserialize)]
pub struct ListCampaignsQuery {
    pub status: Option<CampaignStatus>,
    pub limit: Option<i64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub ngo_id: Uuid,
    pub funding_goal: f64,
    pub total_raised: f64,
    pub cause: String,
    pub country: String,
    pub media: CampaignMedia,
    pub status: CampaignStatus,
    pub campaign_slug: String,
    /// Settled donor count across both sub-ledgers.
    pub donors: usize,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Campaign> for CampaignResponse {
    fn from(c: Campaign) -> Self {
        Self {
            id: c.id,
            title: c.title,
            description: c.description,
            ngo_id: c.ngo_id,
            funding_goal: c.funding_goal,
            total_raised: c.total_raised,
            cause: c.cause,
            country: c.country,
            media: c.media,
            status: c.status,
            campaign_slug: c.campaign_slug,
            donors: c.donations.len() + c.recurring_payments.len(),
            created_at: c.created_at.to_string(),
            updated_at: c.updated_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CampaignListResponse {
    pub campaigns: Vec<CampaignResponse>,
    pub total: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNgoRequest {
    #[validate(length(min = 2, max = 120))]
    pub org_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 2, max = 2))]
    pub country: String,
    #[validate(url)]
    pub website: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NgoResponse {
    pub id: Uuid,
    pub org_name: String,
    pub email: String,
    pub country: String,
    pub stripe_connected: bool,
    pub paypal_connected: bool,
    pub paypal_status: PaypalOnboardingStatus,
}

impl From<Ngo> for NgoResponse {
    fn from(n: Ngo) -> Self {
        let stripe_connected = n.can_accept_stripe();
        let paypal_connected = n.can_accept_paypal();
        Self {
            id: n.id,
            org_name: n.org_name,
            email: n.email,
            country: n.country,
            stripe_connected,
            paypal_connected,
            paypal_status: n.paypal_status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OnboardingLinkResponse {
    pub onboarding_url: String,
}

#[derive(Debug, Serialize)]
pub struct StripeAccountStatusResponse {
    pub account_id: String,
    pub charges_enabled: bool,
    pub payouts_enabled: bool,
    pub details_submitted: bool,
    /// True once the account can both charge and receive payouts.
    pub ready: bool,
    pub missing_requirements: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletePaypalOnboardingRequest {
    /// Authorization code handed back by PayPal's onboarding redirect.
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct CompletePaypalOnboardingResponse {
    pub merchant_id: String,
}
