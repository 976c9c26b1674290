use donation_service::config::{
    Config, DatabaseConfig, EmailConfig, PayPalConfig, ServerConfig, StripeConfig,
};
use donation_service::Application;
use secrecy::Secret;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db: mongodb::Database,
    pub db_name: String,
}

/// Rail endpoints the test app should talk to; point these at wiremock
/// servers to exercise the donation flow without the real rails.
#[derive(Default)]
pub struct RailEndpoints {
    pub stripe_base_url: Option<String>,
    pub paypal_base_url: Option<String>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_rails(RailEndpoints::default()).await
    }

    pub async fn spawn_with_rails(rails: RailEndpoints) -> Self {
        let db_name = format!("donation_test_{}", uuid::Uuid::new_v4().simple());

        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port
            },
            database: DatabaseConfig {
                url: Secret::new(
                    std::env::var("TEST_MONGODB_URI")
                        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
                ),
                db_name: db_name.clone(),
            },
            stripe: StripeConfig {
                secret_key: Secret::new("sk_test_key".to_string()),
                api_base_url: rails
                    .stripe_base_url
                    .unwrap_or_else(|| "https://api.stripe.com/v1".to_string()),
            },
            paypal: PayPalConfig {
                client_id: "test_client_id".to_string(),
                client_secret: Secret::new("test_client_secret".to_string()),
                api_base_url: rails
                    .paypal_base_url
                    .unwrap_or_else(|| "https://api-m.sandbox.paypal.com".to_string()),
                platform_merchant_id: "PLATFORM_TEST".to_string(),
                partner_id: "PARTNER_TEST".to_string(),
                product_id: "PROD-TEST".to_string(),
            },
            email: EmailConfig {
                host: "smtp.example.org".to_string(),
                port: 587,
                user: String::new(),
                password: Secret::new(String::new()),
                from_email: "noreply@example.org".to_string(),
                from_name: "Donation Platform Test".to_string(),
                enabled: false,
            },
            frontend_url: "http://localhost:3000".to_string(),
            service_name: "donation-service-test".to_string(),
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);
        let db = app.db().clone();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept connections.
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            db,
            db_name,
        }
    }

    /// Cleanup test database after test completes.
    pub async fn cleanup(&self) {
        self.db
            .drop(None)
            .await
            .expect("Failed to drop test database");
    }
}
