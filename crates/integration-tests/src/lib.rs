//! End-to-end test harness for the Duct Order server.
//!
//! Each [`TestApp`] runs the real router on an ephemeral port, backed by a
//! private in-memory SQLite database, with SMS and email in demo mode.
//! Requests go through `reqwest` with a cookie store, so the session
//! behaves as it does in a browser.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p duct-order-integration-tests
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use duct_order_core::{Email, PhoneNumber, Role};
use duct_order_server::config::AppConfig;
use duct_order_server::db::{Database, UserRepository};
use duct_order_server::services::auth::AuthService;
use duct_order_server::services::otp::OtpPurpose;
use duct_order_server::state::AppState;
use reqwest::{Client, Response};
use serde_json::{Value, json};

/// Body of the SPA's `index.html` in every test app.
pub const INDEX_HTML: &str = "<!doctype html><title>Duct Order</title>";

/// Password used by [`TestApp::register`].
pub const PASSWORD: &str = "Gizli123";

/// A running server plus a cookie-carrying client.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub state: AppState,
    static_dir: PathBuf,
}

impl TestApp {
    /// Start a server with rate limiting off.
    ///
    /// # Panics
    ///
    /// Panics if the server can't be started.
    pub async fn spawn() -> Self {
        Self::spawn_with(&[("RATE_LIMIT_ENABLED", "false")]).await
    }

    /// Start a server with extra environment variables.
    ///
    /// # Panics
    ///
    /// Panics if the server can't be started.
    pub async fn spawn_with(vars: &[(&str, &str)]) -> Self {
        let static_dir = std::env::temp_dir().join(format!("duct-order-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&static_dir).expect("Failed to create static dir");
        std::fs::write(static_dir.join("index.html"), INDEX_HTML)
            .expect("Failed to write index.html");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let port = listener
            .local_addr()
            .expect("Failed to read local address")
            .port();
        let address = format!("http://127.0.0.1:{port}");

        let mut env: HashMap<String, String> = HashMap::from([
            ("DATABASE_URL".to_string(), "sqlite::memory:".to_string()),
            ("APP_PORT".to_string(), port.to_string()),
            ("APP_BASE_URL".to_string(), address.clone()),
            ("STATIC_DIR".to_string(), static_dir.display().to_string()),
            ("DEMO_MODE".to_string(), "true".to_string()),
        ]);
        for (key, value) in vars {
            env.insert((*key).to_string(), (*value).to_string());
        }

        let config =
            AppConfig::from_lookup(|key| env.get(key).cloned()).expect("Invalid test configuration");
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to open database");
        db.migrate().await.expect("Failed to migrate database");

        let state = AppState::new(config, db).expect("Failed to build state");
        let router = duct_order_server::app(state.clone())
            .await
            .expect("Failed to build router");

        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Server error");
        });

        let client = Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            address,
            client,
            state,
            static_dir,
        }
    }

    /// A second client with its own, empty cookie jar.
    ///
    /// # Panics
    ///
    /// Panics if the client can't be built.
    #[must_use]
    pub fn new_client() -> Client {
        Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client")
    }

    /// Full URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.address)
    }

    /// `GET path` with the app's client.
    ///
    /// # Panics
    ///
    /// Panics if the request can't be sent.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send request")
    }

    /// `POST path` with a JSON body, using the app's client.
    ///
    /// # Panics
    ///
    /// Panics if the request can't be sent.
    pub async fn post(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send request")
    }

    /// Register (and sign in) an email user with [`PASSWORD`].
    ///
    /// # Panics
    ///
    /// Panics if registration doesn't succeed.
    pub async fn register(&self, email: &str) -> Value {
        let response = self
            .post(
                "/api/register",
                &json!({
                    "email": email,
                    "password": PASSWORD,
                    "firstName": "Ali",
                    "lastName": "Kaya",
                }),
            )
            .await;
        assert_eq!(response.status(), 200, "registration failed");
        response.json().await.expect("Invalid JSON body")
    }

    /// Give the user with `email` the admin role, directly in the database.
    ///
    /// # Panics
    ///
    /// Panics if the user doesn't exist.
    pub async fn promote(&self, email: &str) {
        let users = UserRepository::new(self.state.db());
        let email = Email::parse(email).expect("Invalid email");
        let user = users
            .get_by_email(&email)
            .await
            .expect("Failed to load user")
            .expect("User not found");
        users
            .set_role(user.id, Role::Admin)
            .await
            .expect("Failed to set role");
    }

    /// Issue a fresh OTP for `phone`, as the SMS would have carried it.
    ///
    /// # Panics
    ///
    /// Panics if the number is invalid.
    pub async fn otp_for(&self, phone: &str, purpose: OtpPurpose) -> String {
        let phone = PhoneNumber::parse(phone).expect("Invalid phone");
        self.state.otp().issue(&phone, purpose).await
    }

    /// Create a reset token for `email`, as the email would have carried it.
    ///
    /// # Panics
    ///
    /// Panics if the user doesn't exist.
    pub async fn reset_token_for(&self, email: &str) -> String {
        AuthService::new(self.state.db())
            .request_password_reset(email)
            .await
            .expect("Failed to request reset")
            .map(|(_, token)| token)
            .expect("User not found")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.static_dir);
    }
}

/// A minimal valid order list.
#[must_use]
pub fn sample_order() -> Value {
    json!({
        "items": [{
            "id": "1",
            "partKey": "1-duz-kanal.png",
            "quantity": 2,
            "measurements": { "w1": 40, "h1": 30, "l": 120 },
            "notes": "Kat 2"
        }]
    })
}
