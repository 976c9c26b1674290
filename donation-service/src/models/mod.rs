pub mod campaign;
pub mod ngo;

pub use campaign::{
    Campaign, CampaignMedia, CampaignStatus, Donation, DonationFrequency, PaymentRail,
    PendingPayment, PendingRecurringPayment, RecurringPayment,
};
pub use ngo::{Ngo, PaypalOnboardingStatus};
