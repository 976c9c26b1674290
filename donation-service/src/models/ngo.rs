//! NGO account document.
//!
//! Holds the rail-specific connected-account identifiers. A campaign can
//! only accept donations on a rail when its NGO carries that rail's id.

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Ngo {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub org_name: String,
    pub email: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Stripe connected-account id, set once Connect onboarding starts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_account_id: Option<String>,
    /// PayPal merchant id, set once partner onboarding completes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paypal_merchant_id: Option<String>,
    pub paypal_status: PaypalOnboardingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paypal_onboarding_link: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaypalOnboardingStatus {
    NotStarted,
    Pending,
    Completed,
}

impl Ngo {
    pub fn can_accept_stripe(&self) -> bool {
        self.stripe_account_id.is_some()
    }

    pub fn can_accept_paypal(&self) -> bool {
        self.paypal_merchant_id.is_some()
    }
}
