//! Shared harness for the integration tests: a server on a random port
//! backed by the in-memory user store.

#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;

use chainsim_auth::configuration::{
    ApplicationSettings, DatabaseSettings, Environment, JwtSettings, PasswordResetSettings,
    RateLimitSettings, Settings,
};
use chainsim_auth::startup::run;
use chainsim_auth::user_store::InMemoryUserRepository;
use serde_json::{json, Value};

pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub address: String,
    pub users: Arc<InMemoryUserRepository>,
    pub settings: Settings,
    pub client: reqwest::Client,
}

pub fn test_settings() -> Settings {
    Settings {
        application: ApplicationSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: Environment::Local,
            log_filter: "warn".to_string(),
        },
        database: DatabaseSettings {
            username: "postgres".to_string(),
            password: "password".to_string(),
            port: 5432,
            host: "localhost".to_string(),
            database_name: "unused".to_string(),
            acquire_timeout_seconds: 1,
        },
        jwt: JwtSettings {
            access_secret: "integration-access-secret-0123456789abcdef".to_string(),
            access_token_expiry: 900,
            refresh_secret: "integration-refresh-secret-0123456789abcdef".to_string(),
            refresh_token_expiry: 3600,
            issuer: "chainsim-auth-test".to_string(),
        },
        password_reset: PasswordResetSettings::default(),
        rate_limit: RateLimitSettings {
            requests_per_minute: 10_000,
        },
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_settings()).await
}

pub async fn spawn_app_with(settings: Settings) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let users = Arc::new(InMemoryUserRepository::new());
    let server = run(listener, users.clone(), settings.clone()).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        users,
        settings,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(&format!("{}{}", self.address, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_with_token(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", self.address, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn register(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_json(
            "/auth/register",
            &json!({ "name": "Test User", "email": email, "password": password }),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_json("/auth/login", &json!({ "email": email, "password": password }))
            .await
    }

    /// Register and return the parsed 201 body
    pub async fn register_ok(&self, email: &str) -> Value {
        let response = self.register(email, PASSWORD).await;
        assert_eq!(201, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }

    pub async fn me(&self, token: &str) -> reqwest::Response {
        self.get_with_token("/auth/me", token).await
    }
}

pub fn token_of(body: &Value) -> String {
    body["token"].as_str().expect("missing token").to_string()
}

pub fn refresh_token_of(body: &Value) -> String {
    body["refreshToken"]
        .as_str()
        .expect("missing refreshToken")
        .to_string()
}
