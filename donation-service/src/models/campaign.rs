//! Campaign document and its embedded donation sub-ledgers.
//!
//! A campaign owns four ordered sequences: settled one-time donations,
//! pending one-time payments, settled recurring payments, and pending
//! recurring payments. `total_raised` equals the sum of the settled
//! NGO shares and is only ever incremented by the confirmation path.

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Campaign {
    #[serde(rename = "_id")]
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
    pub donations: Vec<Donation>,
    pub pending_payments: Vec<PendingPayment>,
    pub recurring_payments: Vec<RecurringPayment>,
    pub pending_recurring_payments: Vec<PendingRecurringPayment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<i64>,
    pub campaign_slug: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CampaignMedia {
    pub main_image: String,
    #[serde(default)]
    pub additional_images: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Ongoing,
    Paused,
    Completed,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentRail {
    Stripe,
    Paypal,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DonationFrequency {
    Once,
    Monthly,
}

/// A settled one-time donation. Immutable once appended.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Donation {
    pub donor_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donor_email: Option<String>,
    /// Total charged to the donor (NGO share + tip).
    pub amount: f64,
    /// The NGO's net share, the amount added to `total_raised`.
    pub ngo_amount: f64,
    /// The platform's fee share.
    pub tip_amount: f64,
    pub payment_method: String,
    pub frequency: DonationFrequency,
    /// Rail-assigned intent/order id; the idempotency key for settlement.
    pub rail_id: String,
    pub timestamp: DateTime,
}

/// A one-time payment initiated with a rail but not yet confirmed.
/// Keyed by the rail-assigned `order_id` for later migration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PendingPayment {
    pub order_id: String,
    pub amount: f64,
    pub tip_amount: f64,
    pub donor_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donor_email: Option<String>,
    pub payment_method: String,
    pub rail: PaymentRail,
    pub timestamp: DateTime,
}

/// A settled (active) recurring payment.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecurringPayment {
    /// Rail-assigned subscription id; stable across renewal cycles.
    pub payment_token: String,
    pub amount: f64,
    pub ngo_amount: f64,
    pub tip_amount: f64,
    pub donor_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donor_email: Option<String>,
    pub payment_method: String,
    pub frequency: DonationFrequency,
    pub timestamp: DateTime,
}

/// A recurring subscription created with a rail but not yet confirmed active.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PendingRecurringPayment {
    pub setup_token_id: String,
    pub amount: f64,
    pub tip_amount: f64,
    pub donor_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donor_email: Option<String>,
    pub rail: PaymentRail,
    pub timestamp: DateTime,
}

/// Build a URL slug from a campaign title: lowercased, runs of
/// non-alphanumerics collapsed to single dashes, trimmed.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
