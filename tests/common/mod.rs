// Shared test helpers

#![allow(dead_code)]

use clusterview::config::AppConfig;
use clusterview::upstream_repo::{FetchError, Upstream};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub const TEST_CONFIG: &str = r#"
[server]
port = 8081
host = "0.0.0.0"

[upstream]
base_url = "http://127.0.0.1:9"
request_timeout_ms = 1000
"#;

pub fn test_app_config() -> AppConfig {
    AppConfig::load_from_str(TEST_CONFIG).unwrap()
}

/// Canned upstream: known paths answer with their body, anything else is a 404.
#[derive(Default)]
pub struct StubUpstream {
    responses: HashMap<String, Value>,
    delays: HashMap<String, Duration>,
    requests: Mutex<Vec<String>>,
}

impl StubUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, body: Value) -> Self {
        self.responses.insert(path.to_string(), body);
        self
    }

    /// Holds the response for `path` back by `delay`.
    pub fn delayed(mut self, path: &str, delay: Duration) -> Self {
        self.delays.insert(path.to_string(), delay);
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Upstream for StubUpstream {
    async fn get_json(&self, path: &str) -> Result<Value, FetchError> {
        self.requests.lock().unwrap().push(path.to_string());
        if let Some(delay) = self.delays.get(path) {
            tokio::time::sleep(*delay).await;
        }
        self.responses
            .get(path)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                path: path.to_string(),
                status: 404,
            })
    }
}
