//! Campaign and NGO persistence.
//!
//! Settlement is a single conditional `update_one` combining `$pull`,
//! `$push` and `$inc`: the filter requires the pending row to still
//! exist, so a confirmation that already ran matches zero documents and
//! the raised total can never be incremented twice for one rail id.

use crate::models::{
    Campaign, CampaignStatus, Donation, Ngo, PaypalOnboardingStatus, PendingPayment,
    PendingRecurringPayment, RecurringPayment,
};
use anyhow::Result;
use futures::TryStreamExt;
use mongodb::bson::{doc, to_bson, DateTime};
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{Collection, Database, IndexModel};
use uuid::Uuid;

#[derive(Clone)]
pub struct CampaignRepository {
    campaigns: Collection<Campaign>,
}

#[derive(Clone)]
pub struct NgoRepository {
    ngos: Collection<Ngo>,
}

impl CampaignRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            campaigns: db.collection("campaigns"),
        }
    }

    /// Initialize indexes for slug lookups and pending-row migration.
    pub async fn init_indexes(&self) -> Result<()> {
        let slug_index = IndexModel::builder()
            .keys(doc! { "campaign_slug": 1 })
            .options(
                IndexOptions::builder()
                    .name("campaign_slug_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        let ngo_index = IndexModel::builder()
            .keys(doc! { "ngo_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("campaign_ngo_idx".to_string())
                    .build(),
            )
            .build();

        let pending_order_index = IndexModel::builder()
            .keys(doc! { "pending_payments.order_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("pending_order_idx".to_string())
                    .build(),
            )
            .build();

        let pending_subscription_index = IndexModel::builder()
            .keys(doc! { "pending_recurring_payments.setup_token_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("pending_subscription_idx".to_string())
                    .build(),
            )
            .build();

        self.campaigns
            .create_indexes(
                [
                    slug_index,
                    ngo_index,
                    pending_order_index,
                    pending_subscription_index,
                ],
                None,
            )
            .await?;

        tracing::info!("Campaign indexes initialized");
        Ok(())
    }

    pub async fn create_campaign(&self, campaign: Campaign) -> Result<()> {
        self.campaigns.insert_one(campaign, None).await?;
        Ok(())
    }

    pub async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>> {
        let filter = doc! { "_id": id.to_string() };
        Ok(self.campaigns.find_one(filter, None).await?)
    }

    pub async fn get_campaign_by_slug(&self, slug: &str) -> Result<Option<Campaign>> {
        let filter = doc! { "campaign_slug": slug };
        Ok(self.campaigns.find_one(filter, None).await?)
    }

    pub async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let filter = doc! { "campaign_slug": slug };
        Ok(self.campaigns.find_one(filter, None).await?.is_some())
    }

    /// List campaigns, newest first, with an optional status filter.
    pub async fn list_campaigns(
        &self,
        status_filter: Option<CampaignStatus>,
        limit: i64,
        offset: u64,
    ) -> Result<(Vec<Campaign>, i64)> {
        let mut filter = doc! {};
        if let Some(status) = status_filter {
            filter.insert("status", to_bson(&status)?);
        }

        let total_count = self
            .campaigns
            .count_documents(filter.clone(), None)
            .await? as i64;

        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .skip(offset)
            .limit(limit)
            .build();

        let cursor = self.campaigns.find(filter, Some(options)).await?;
        let campaigns: Vec<Campaign> = cursor.try_collect().await?;

        Ok((campaigns, total_count))
    }

    pub async fn update_campaign_status(&self, id: Uuid, status: CampaignStatus) -> Result<bool> {
        let filter = doc! { "_id": id.to_string() };
        let update = doc! {
            "$set": {
                "status": to_bson(&status)?,
                "updated_at": DateTime::now(),
            }
        };
        let result = self.campaigns.update_one(filter, update, None).await?;
        Ok(result.matched_count == 1)
    }

    /// Record a one-time payment initiated with a rail. Does not touch
    /// `total_raised`; only settlement moves the total.
    pub async fn append_pending_payment(
        &self,
        campaign_id: Uuid,
        pending: &PendingPayment,
    ) -> Result<()> {
        let filter = doc! { "_id": campaign_id.to_string() };
        let update = doc! {
            "$push": { "pending_payments": to_bson(pending)? },
            "$set": { "updated_at": DateTime::now() },
        };
        self.campaigns.update_one(filter, update, None).await?;
        Ok(())
    }

    /// Record a recurring subscription initiated with a rail.
    pub async fn append_pending_recurring(
        &self,
        campaign_id: Uuid,
        pending: &PendingRecurringPayment,
    ) -> Result<()> {
        let filter = doc! { "_id": campaign_id.to_string() };
        let update = doc! {
            "$push": { "pending_recurring_payments": to_bson(pending)? },
            "$set": { "updated_at": DateTime::now() },
        };
        self.campaigns.update_one(filter, update, None).await?;
        Ok(())
    }

    /// Migrate a confirmed one-time payment from the pending sub-ledger
    /// into the settled donations, incrementing the raised total by the
    /// NGO share. Returns false when no pending row matched, i.e. the
    /// payment was already settled or was never recorded.
    pub async fn settle_one_time(
        &self,
        campaign_id: Uuid,
        order_id: &str,
        donation: &Donation,
    ) -> Result<bool> {
        let filter = doc! {
            "_id": campaign_id.to_string(),
            "pending_payments.order_id": order_id,
        };
        let update = doc! {
            "$pull": { "pending_payments": { "order_id": order_id } },
            "$push": { "donations": to_bson(donation)? },
            "$inc": { "total_raised": donation.ngo_amount },
            "$set": { "updated_at": DateTime::now() },
        };
        let result = self.campaigns.update_one(filter, update, None).await?;
        Ok(result.modified_count == 1)
    }

    /// Migrate a confirmed recurring subscription from the pending
    /// recurring sub-ledger into the active recurring payments,
    /// incrementing the raised total by the first cycle's NGO share.
    /// Same idempotency contract as [`settle_one_time`].
    pub async fn activate_recurring(
        &self,
        campaign_id: Uuid,
        setup_token_id: &str,
        payment: &RecurringPayment,
    ) -> Result<bool> {
        let filter = doc! {
            "_id": campaign_id.to_string(),
            "pending_recurring_payments.setup_token_id": setup_token_id,
        };
        let update = doc! {
            "$pull": { "pending_recurring_payments": { "setup_token_id": setup_token_id } },
            "$push": { "recurring_payments": to_bson(payment)? },
            "$inc": { "total_raised": payment.ngo_amount },
            "$set": { "updated_at": DateTime::now() },
        };
        let result = self.campaigns.update_one(filter, update, None).await?;
        Ok(result.modified_count == 1)
    }

    /// Locate the campaign holding a pending one-time payment by its
    /// rail-assigned order id.
    pub async fn find_by_pending_order(&self, order_id: &str) -> Result<Option<Campaign>> {
        let filter = doc! { "pending_payments.order_id": order_id };
        Ok(self.campaigns.find_one(filter, None).await?)
    }

    /// Locate the campaign holding a pending recurring subscription by its
    /// rail-assigned subscription id.
    pub async fn find_by_pending_subscription(
        &self,
        setup_token_id: &str,
    ) -> Result<Option<Campaign>> {
        let filter = doc! { "pending_recurring_payments.setup_token_id": setup_token_id };
        Ok(self.campaigns.find_one(filter, None).await?)
    }
}

impl NgoRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            ngos: db.collection("ngos"),
        }
    }

    pub async fn init_indexes(&self) -> Result<()> {
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .name("ngo_email_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.ngos.create_indexes([email_index], None).await?;

        tracing::info!("NGO indexes initialized");
        Ok(())
    }

    pub async fn create_ngo(&self, ngo: Ngo) -> Result<()> {
        self.ngos.insert_one(ngo, None).await?;
        Ok(())
    }

    pub async fn get_ngo(&self, id: Uuid) -> Result<Option<Ngo>> {
        let filter = doc! { "_id": id.to_string() };
        Ok(self.ngos.find_one(filter, None).await?)
    }

    pub async fn set_stripe_account(&self, id: Uuid, account_id: &str) -> Result<()> {
        let filter = doc! { "_id": id.to_string() };
        let update = doc! {
            "$set": {
                "stripe_account_id": account_id,
                "updated_at": DateTime::now(),
            }
        };
        self.ngos.update_one(filter, update, None).await?;
        Ok(())
    }

    pub async fn set_paypal_onboarding_link(&self, id: Uuid, link: &str) -> Result<()> {
        let filter = doc! { "_id": id.to_string() };
        let update = doc! {
            "$set": {
                "paypal_onboarding_link": link,
                "paypal_status": to_bson(&PaypalOnboardingStatus::Pending)?,
                "updated_at": DateTime::now(),
            }
        };
        self.ngos.update_one(filter, update, None).await?;
        Ok(())
    }

    pub async fn complete_paypal_onboarding(&self, id: Uuid, merchant_id: &str) -> Result<()> {
        let filter = doc! { "_id": id.to_string() };
        let update = doc! {
            "$set": {
                "paypal_merchant_id": merchant_id,
                "paypal_status": to_bson(&PaypalOnboardingStatus::Completed)?,
                "updated_at": DateTime::now(),
            }
        };
        self.ngos.update_one(filter, update, None).await?;
        Ok(())
    }
}
