//! End-to-end donation flow tests against wiremock rails.
//!
//! These exercise the full pending-then-settled lifecycle over HTTP with
//! the rail APIs stubbed out; they need a local MongoDB and are ignored
//! by default.

mod common;

use common::{RailEndpoints, TestApp};
use donation_service::services::NgoRepository;
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn create_ngo(client: &reqwest::Client, app: &TestApp) -> Uuid {
    let response = client
        .post(format!("{}/ngos", app.address))
        .json(&json!({
            "org_name": "Water for All",
            "email": format!("{}@example.org", Uuid::new_v4().simple()),
            "country": "US"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    body["id"].as_str().unwrap().parse().unwrap()
}

async fn create_campaign(client: &reqwest::Client, app: &TestApp, ngo_id: Uuid) -> Uuid {
    let response = client
        .post(format!("{}/campaigns", app.address))
        .header("X-Ngo-ID", ngo_id.to_string())
        .json(&json!({
            "title": "Clean Water for Kano",
            "description": "Boreholes for three rural communities.",
            "funding_goal": 10000.0,
            "cause": "Clean Water & Sanitation",
            "country": "NG",
            "main_image": "https://cdn.example.org/water.jpg"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    body["id"].as_str().unwrap().parse().unwrap()
}

async fn get_campaign(client: &reqwest::Client, app: &TestApp, id: Uuid) -> Value {
    client
        .get(format!("{}/campaigns/{}", app.address, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn mock_paypal_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A21.test", "token_type": "Bearer", "expires_in": 32400
        })))
        .mount(server)
        .await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB (TEST_MONGODB_URI)"]
async fn stripe_one_time_donation_settles_exactly_once() {
    let stripe = MockServer::start().await;
    let app = TestApp::spawn_with_rails(RailEndpoints {
        stripe_base_url: Some(stripe.uri()),
        paypal_base_url: None,
    })
    .await;
    let client = reqwest::Client::new();

    let ngo_id = create_ngo(&client, &app).await;
    NgoRepository::new(&app.db)
        .set_stripe_account(ngo_id, "acct_test_1")
        .await
        .unwrap();
    let campaign_id = create_campaign(&client, &app, ngo_id).await;

    Mock::given(method("POST"))
        .and(path("/payment_intents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_test_1",
            "status": "requires_confirmation",
            "amount": 5500,
            "client_secret": "pi_test_1_secret",
            "metadata": {}
        })))
        .mount(&stripe)
        .await;

    // A = 50, T = 5 -> total charge 55.00 USD.
    let response = client
        .post(format!("{}/payments/stripe", app.address))
        .json(&json!({
            "amount": 50.0,
            "tip_amount": 5.0,
            "campaign_id": campaign_id,
            "donor_name": "Ada",
            "donor_email": "ada@example.org",
            "payment_method": "pm_card_visa",
            "frequency": "once"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["client_secret"], "pi_test_1_secret");
    assert_eq!(body["total_amount"], 55.0);

    // Pending row exists, raised total untouched.
    let campaign = get_campaign(&client, &app, campaign_id).await;
    assert_eq!(campaign["total_raised"], 0.0);

    Mock::given(method("GET"))
        .and(path("/payment_intents/pi_test_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_test_1",
            "status": "succeeded",
            "amount": 5500,
            "client_secret": null,
            "metadata": {
                "campaign_id": campaign_id.to_string(),
                "donor_name": "Ada",
                "donor_email": "ada@example.org",
                "frequency": "once",
                "tip_amount": "5"
            }
        })))
        .mount(&stripe)
        .await;

    let confirm = client
        .post(format!("{}/payments/stripe/confirm", app.address))
        .json(&json!({ "payment_intent_id": "pi_test_1", "frequency": "once" }))
        .send()
        .await
        .unwrap();
    assert_eq!(confirm.status(), 200);
    let confirm_body: Value = confirm.json().await.unwrap();
    assert_eq!(confirm_body["success"], true);
    assert_eq!(confirm_body["donation"]["ngo_amount"], 50.0);

    // NGO share appended to the raised total, pending row migrated.
    let campaign = get_campaign(&client, &app, campaign_id).await;
    assert_eq!(campaign["total_raised"], 50.0);
    assert_eq!(campaign["donors"], 1);

    // Confirming the same intent again must not move the ledger.
    let second = client
        .post(format!("{}/payments/stripe/confirm", app.address))
        .json(&json!({ "payment_intent_id": "pi_test_1", "frequency": "once" }))
        .send()
        .await
        .unwrap();
    let second_body: Value = second.json().await.unwrap();
    assert_eq!(second_body["success"], false);

    let campaign = get_campaign(&client, &app, campaign_id).await;
    assert_eq!(campaign["total_raised"], 50.0);
    assert_eq!(campaign["donors"], 1);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB (TEST_MONGODB_URI)"]
async fn stripe_monthly_donation_creates_priced_subscription() {
    let stripe = MockServer::start().await;
    let app = TestApp::spawn_with_rails(RailEndpoints {
        stripe_base_url: Some(stripe.uri()),
        paypal_base_url: None,
    })
    .await;
    let client = reqwest::Client::new();

    let ngo_id = create_ngo(&client, &app).await;
    NgoRepository::new(&app.db)
        .set_stripe_account(ngo_id, "acct_test_2")
        .await
        .unwrap();
    let campaign_id = create_campaign(&client, &app, ngo_id).await;

    Mock::given(method("POST"))
        .and(path("/products"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "prod_1" })),
        )
        .mount(&stripe)
        .await;
    // A = 20, T = 2 -> a 22.00/month price.
    Mock::given(method("POST"))
        .and(path("/prices"))
        .and(wiremock::matchers::body_string_contains("unit_amount=2200"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "price_1" })),
        )
        .mount(&stripe)
        .await;
    Mock::given(method("POST"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cus_1" })))
        .mount(&stripe)
        .await;
    Mock::given(method("POST"))
        .and(path("/payment_methods/pm_card_visa/attach"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "pm_card_visa" })))
        .mount(&stripe)
        .await;
    Mock::given(method("POST"))
        .and(path("/customers/cus_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cus_1" })))
        .mount(&stripe)
        .await;
    // The tip converts to a 10% per-invoice fee.
    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .and(wiremock::matchers::body_string_contains(
            "application_fee_percent=10",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "sub_1",
            "status": "incomplete",
            "latest_invoice": {
                "id": "in_1",
                "status": "open",
                "payment_intent": {
                    "id": "pi_sub_1",
                    "status": "requires_confirmation",
                    "amount": 2200,
                    "client_secret": "pi_sub_1_secret"
                }
            }
        })))
        .mount(&stripe)
        .await;

    let response = client
        .post(format!("{}/payments/stripe", app.address))
        .json(&json!({
            "amount": 20.0,
            "tip_amount": 2.0,
            "campaign_id": campaign_id,
            "donor_name": "Grace",
            "donor_email": "grace@example.org",
            "payment_method": "pm_card_visa",
            "frequency": "monthly"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["client_secret"], "pi_sub_1_secret");
    assert_eq!(body["subscription_id"], "sub_1");
    assert_eq!(body["total_amount"], 22.0);

    // Subscription is pending until confirmed; nothing settled yet.
    let campaign = get_campaign(&client, &app, campaign_id).await;
    assert_eq!(campaign["total_raised"], 0.0);

    // Confirmation settles the first cycle once.
    Mock::given(method("GET"))
        .and(path("/payment_intents/pi_sub_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_sub_1",
            "status": "succeeded",
            "amount": 2200,
            "client_secret": null,
            "metadata": {}
        })))
        .mount(&stripe)
        .await;

    let confirm = client
        .post(format!("{}/payments/stripe/confirm", app.address))
        .json(&json!({
            "payment_intent_id": "pi_sub_1",
            "frequency": "monthly",
            "subscription_id": "sub_1"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(confirm.status(), 200);
    let confirm_body: Value = confirm.json().await.unwrap();
    assert_eq!(confirm_body["success"], true);

    let campaign = get_campaign(&client, &app, campaign_id).await;
    assert_eq!(campaign["total_raised"], 20.0);
    assert_eq!(campaign["donors"], 1);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB (TEST_MONGODB_URI)"]
async fn stripe_donation_rejected_without_connected_account() {
    let stripe = MockServer::start().await;
    let app = TestApp::spawn_with_rails(RailEndpoints {
        stripe_base_url: Some(stripe.uri()),
        paypal_base_url: None,
    })
    .await;
    let client = reqwest::Client::new();

    // The rail must never be called for an unconnected NGO.
    Mock::given(method("POST"))
        .and(path("/payment_intents"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&stripe)
        .await;

    let ngo_id = create_ngo(&client, &app).await;
    let campaign_id = create_campaign(&client, &app, ngo_id).await;

    let response = client
        .post(format!("{}/payments/stripe", app.address))
        .json(&json!({
            "amount": 50.0,
            "tip_amount": 5.0,
            "campaign_id": campaign_id,
            "donor_name": "Ada",
            "payment_method": "pm_card_visa",
            "frequency": "once"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "NGO Stripe account not connected");

    let campaign = get_campaign(&client, &app, campaign_id).await;
    assert_eq!(campaign["total_raised"], 0.0);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB (TEST_MONGODB_URI)"]
async fn zero_amount_donation_fails_validation() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/payments/stripe", app.address))
        .json(&json!({
            "amount": 0.0,
            "tip_amount": 5.0,
            "campaign_id": Uuid::new_v4(),
            "donor_name": "Ada",
            "payment_method": "pm_card_visa",
            "frequency": "monthly"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB (TEST_MONGODB_URI)"]
async fn paypal_one_time_donation_captures_and_settles() {
    let paypal = MockServer::start().await;
    let app = TestApp::spawn_with_rails(RailEndpoints {
        stripe_base_url: None,
        paypal_base_url: Some(paypal.uri()),
    })
    .await;
    let client = reqwest::Client::new();

    let ngo_id = create_ngo(&client, &app).await;
    let ngos = NgoRepository::new(&app.db);
    ngos.complete_paypal_onboarding(ngo_id, "MERCHANT_NGO_1")
        .await
        .unwrap();
    let campaign_id = create_campaign(&client, &app, ngo_id).await;

    mock_paypal_token(&paypal).await;
    Mock::given(method("POST"))
        .and(path("/v2/checkout/orders"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "ORDER-77",
            "status": "CREATED",
            "links": [{ "rel": "approve", "href": "https://paypal.example/approve/77" }]
        })))
        .mount(&paypal)
        .await;

    let response = client
        .post(format!("{}/payments/paypal", app.address))
        .json(&json!({
            "amount": 20.0,
            "tip_amount": 2.0,
            "campaign_id": campaign_id,
            "donor_name": "Grace",
            "donor_email": "grace@example.org",
            "frequency": "once"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["order_id"], "ORDER-77");
    assert_eq!(body["approval_url"], "https://paypal.example/approve/77");
    assert_eq!(body["total_amount"], 22.0);

    Mock::given(method("POST"))
        .and(path("/v2/checkout/orders/ORDER-77/capture"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "ORDER-77",
            "status": "COMPLETED"
        })))
        .mount(&paypal)
        .await;

    let confirm = client
        .post(format!("{}/payments/paypal/confirm", app.address))
        .json(&json!({ "frequency": "once", "order_id": "ORDER-77" }))
        .send()
        .await
        .unwrap();
    assert_eq!(confirm.status(), 200);
    let confirm_body: Value = confirm.json().await.unwrap();
    assert_eq!(confirm_body["success"], true);

    let campaign = get_campaign(&client, &app, campaign_id).await;
    assert_eq!(campaign["total_raised"], 20.0);

    // Second confirmation finds no pending row and reports not-found.
    let second = client
        .post(format!("{}/payments/paypal/confirm", app.address))
        .json(&json!({ "frequency": "once", "order_id": "ORDER-77" }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 404);

    let campaign = get_campaign(&client, &app, campaign_id).await;
    assert_eq!(campaign["total_raised"], 20.0);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB (TEST_MONGODB_URI)"]
async fn unknown_stripe_intent_reports_not_completed() {
    let stripe = MockServer::start().await;
    let app = TestApp::spawn_with_rails(RailEndpoints {
        stripe_base_url: Some(stripe.uri()),
        paypal_base_url: None,
    })
    .await;
    let client = reqwest::Client::new();

    Mock::given(method("GET"))
        .and(path("/payment_intents/pi_unknown"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_unknown",
            "status": "requires_payment_method",
            "amount": 100,
            "client_secret": null,
            "metadata": {}
        })))
        .mount(&stripe)
        .await;

    let confirm = client
        .post(format!("{}/payments/stripe/confirm", app.address))
        .json(&json!({ "payment_intent_id": "pi_unknown", "frequency": "once" }))
        .send()
        .await
        .unwrap();
    assert_eq!(confirm.status(), 200);
    let body: Value = confirm.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Payment not completed yet");

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB (TEST_MONGODB_URI)"]
async fn campaign_status_transition_is_owner_only() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let ngo_id = create_ngo(&client, &app).await;
    let campaign_id = create_campaign(&client, &app, ngo_id).await;

    // A different NGO cannot pause the campaign.
    let forbidden = client
        .patch(format!("{}/campaigns/{}/status", app.address, campaign_id))
        .header("X-Ngo-ID", Uuid::new_v4().to_string())
        .json(&json!({ "status": "paused" }))
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), 403);

    // The owner can.
    let ok = client
        .patch(format!("{}/campaigns/{}/status", app.address, campaign_id))
        .header("X-Ngo-ID", ngo_id.to_string())
        .json(&json!({ "status": "ongoing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), 204);

    let campaign = get_campaign(&client, &app, campaign_id).await;
    assert_eq!(campaign["status"], "ongoing");

    app.cleanup().await;
}
