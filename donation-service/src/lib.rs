pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::middleware::from_fn;
use axum::{
    routing::{get, patch, post},
    Router,
};
use mongodb::{options::ClientOptions, Client};
use platform_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware,
};
use secrecy::ExposeSecret;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

use config::Config;
use services::{CampaignRepository, Mailer, NgoRepository, PayPalClient, StripeClient};

#[derive(Clone)]
pub struct AppState {
    pub db: mongodb::Database,
    pub config: Config,
    pub campaigns: CampaignRepository,
    pub ngos: NgoRepository,
    pub stripe: StripeClient,
    pub paypal: PayPalClient,
    pub mailer: Mailer,
}

pub struct Application {
    port: u16,
    listener: tokio::net::TcpListener,
    router: Router,
    db: mongodb::Database,
}

impl Application {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let mut client_options = ClientOptions::parse(config.database.url.expose_secret()).await?;
        client_options.app_name = Some("donation-service".to_string());

        let client = Client::with_options(client_options)?;
        let db = client.database(&config.database.db_name);

        let campaigns = CampaignRepository::new(&db);
        let ngos = NgoRepository::new(&db);

        // Indexes back the slug uniqueness and pending-row migrations.
        campaigns.init_indexes().await?;
        ngos.init_indexes().await?;

        // Rail clients are built once here and injected through state;
        // handlers never construct their own.
        let stripe = StripeClient::new(config.stripe.clone());
        if stripe.is_configured() {
            tracing::info!("Stripe client initialized");
        } else {
            tracing::warn!("Stripe credentials not configured - card donations will be rejected");
        }

        let paypal = PayPalClient::new(config.paypal.clone());
        if paypal.is_configured() {
            tracing::info!("PayPal client initialized");
        } else {
            tracing::warn!("PayPal credentials not configured - PayPal donations will be rejected");
        }

        let mailer = Mailer::new(config.email.clone())?;
        if !mailer.is_enabled() {
            tracing::warn!("SMTP disabled - settlement emails will be skipped");
        }

        let state = AppState {
            db: db.clone(),
            config: config.clone(),
            campaigns,
            ngos,
            stripe,
            paypal,
            mailer,
        };

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/metrics", get(handlers::metrics))
            // Campaigns
            .route(
                "/campaigns",
                post(handlers::campaigns::create_campaign).get(handlers::campaigns::list_campaigns),
            )
            .route("/campaigns/:id", get(handlers::campaigns::get_campaign))
            .route(
                "/campaigns/slug/:slug",
                get(handlers::campaigns::get_campaign_by_slug),
            )
            .route(
                "/campaigns/:id/status",
                patch(handlers::campaigns::update_campaign_status),
            )
            // NGOs and rail onboarding
            .route("/ngos", post(handlers::ngos::create_ngo))
            .route("/ngos/:id", get(handlers::ngos::get_ngo))
            .route(
                "/ngos/:id/stripe/onboarding-link",
                post(handlers::onboarding::stripe_onboarding_link),
            )
            .route(
                "/ngos/:id/stripe/status",
                get(handlers::onboarding::stripe_account_status),
            )
            .route(
                "/ngos/:id/paypal/onboarding-link",
                post(handlers::onboarding::paypal_onboarding_link),
            )
            .route(
                "/ngos/:id/paypal/complete",
                post(handlers::onboarding::complete_paypal_onboarding),
            )
            // Donation flow (public)
            .route(
                "/payments/stripe",
                post(handlers::payments::create_stripe_donation),
            )
            .route(
                "/payments/stripe/confirm",
                post(handlers::payments::confirm_stripe_donation),
            )
            .route(
                "/payments/paypal",
                post(handlers::payments::create_paypal_donation),
            )
            .route(
                "/payments/paypal/confirm",
                post(handlers::payments::confirm_paypal_donation),
            )
            .layer(from_fn(security_headers_middleware))
            .layer(from_fn(metrics_middleware))
            .layer(from_fn(request_id_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                }),
            )
            .with_state(state);

        // Port 0 binds a random free port, used by the test harness.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router,
            db,
        })
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        tracing::info!("Listening on port {}", self.port);
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn db(&self) -> &mongodb::Database {
        &self.db
    }
}
