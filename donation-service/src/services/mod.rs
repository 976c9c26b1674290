pub mod fees;
pub mod mailer;
pub mod metrics;
pub mod paypal;
pub mod repository;
pub mod stripe;

pub use mailer::Mailer;
pub use metrics::{get_metrics, init_metrics};
pub use paypal::PayPalClient;
pub use repository::{CampaignRepository, NgoRepository};
pub use stripe::StripeClient;
