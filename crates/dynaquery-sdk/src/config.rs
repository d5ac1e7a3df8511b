//! Client configuration.

use std::env;

use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::{Credentials, Region};
use tracing::debug;

/// Where and how to reach the store.
#[derive(Debug, Clone)]
pub struct SdkConfig {
    /// Endpoint override, e.g. a local store.
    pub endpoint_url: Option<String>,
    /// AWS region.
    pub region: String,
    /// Use fixed `test`/`test` credentials instead of the default chain.
    pub static_credentials: bool,
}

impl SdkConfig {
    /// Create configuration from environment variables.
    ///
    /// `DYNAMODB_ENDPOINT_URL`, `AWS_REGION` (default `us-east-1`) and
    /// `DYNAMODB_STATIC_CREDENTIALS` (default false).
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            endpoint_url: env::var("DYNAMODB_ENDPOINT_URL")
                .ok()
                .filter(|v| !v.is_empty()),
            region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_owned()),
            static_credentials: env_bool("DYNAMODB_STATIC_CREDENTIALS", false),
        }
    }

    /// Build a client from this configuration.
    pub async fn load_client(&self) -> aws_sdk_dynamodb::Client {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()));
        if self.static_credentials {
            loader = loader.credentials_provider(Credentials::new(
                "test",
                "test",
                None,
                None,
                "dynaquery-static",
            ));
        }
        if let Some(url) = &self.endpoint_url {
            loader = loader.endpoint_url(url);
        }

        let shared = loader.load().await;
        debug!(
            region = %self.region,
            endpoint = self.endpoint_url.as_deref(),
            static_credentials = self.static_credentials,
            "loaded client configuration"
        );
        aws_sdk_dynamodb::Client::new(&shared)
    }
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            region: "us-east-1".to_owned(),
            static_credentials: false,
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).map_or(default, |v| {
        matches!(v.as_str(), "1" | "true" | "yes" | "TRUE" | "YES")
    })
}
