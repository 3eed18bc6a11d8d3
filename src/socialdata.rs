use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::SocialDataConfig;

/// Monitor categories supported by the upstream registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorType {
    UserTweets,
    UserFollowing,
    UserProfile,
}

impl MonitorType {
    /// Path segment of the creation endpoint for this monitor type.
    fn create_route(&self) -> &'static str {
        match self {
            MonitorType::UserTweets => "/monitors/user-tweets",
            MonitorType::UserFollowing => "/monitors/user-following",
            MonitorType::UserProfile => "/monitors/user-profile",
        }
    }
}

impl std::fmt::Display for MonitorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorType::UserTweets => write!(f, "user_tweets"),
            MonitorType::UserFollowing => write!(f, "user_following"),
            MonitorType::UserProfile => write!(f, "user_profile"),
        }
    }
}

/// A monitor record as returned by the registry. Held only for the scope of
/// a single operation, never cached.
#[derive(Debug, Clone, Deserialize)]
pub struct Monitor {
    pub id: String,
    pub monitor_type: MonitorType,
    #[serde(default)]
    pub parameters: MonitorParameters,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonitorParameters {
    #[serde(default)]
    pub user_screen_name: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl Monitor {
    /// Handle the monitor targets, if the registry recorded one.
    pub fn handle(&self) -> Option<&str> {
        self.parameters.user_screen_name.as_deref()
    }

    /// Case-insensitive handle match.
    pub fn matches_handle(&self, handle: &str) -> bool {
        self.handle()
            .map(|h| h.eq_ignore_ascii_case(handle))
            .unwrap_or(false)
    }
}

/// Creation parameters for a new monitor.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorParams {
    pub user_screen_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    /// A monitor for this handle already exists upstream.
    #[error("{message}")]
    Duplicate { message: String },
    #[error("monitor not found")]
    NotFound,
    /// Any other upstream rejection, message passed through verbatim.
    #[error("{0}")]
    Api(String),
    #[error("SocialData request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// The monitor registry surface the conversation engine consumes.
#[async_trait]
pub trait MonitorRegistry: Send + Sync {
    async fn create_monitor(
        &self,
        monitor_type: MonitorType,
        params: MonitorParams,
    ) -> Result<Monitor, RegistryError>;

    async fn delete_monitor(&self, id: &str) -> Result<(), RegistryError>;

    async fn get_monitor(&self, id: &str) -> Result<Monitor, RegistryError>;

    async fn list_monitors(&self, page: u32) -> Result<Vec<Monitor>, RegistryError>;

    async fn set_global_webhook(&self, url: &str) -> Result<(), RegistryError>;
}

// ── Wire envelopes ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

/// SocialData API client. All monitor endpoints share the bearer-auth JSON
/// client; error bodies are classified into `RegistryError` kinds.
pub struct SocialDataClient {
    client: reqwest::Client,
    config: SocialDataConfig,
}

impl SocialDataClient {
    pub fn new(config: SocialDataConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.effective_base_url(), path)
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Accept", "application/json")
    }

    /// Map a non-success response into the matching error kind.
    async fn classify_error(response: reqwest::Response) -> RegistryError {
        let status = response.status();
        let message = match response.json::<ApiErrorBody>().await {
            Ok(body) if !body.message.is_empty() => body.message,
            _ => format!("SocialData API error ({})", status),
        };

        if status == reqwest::StatusCode::NOT_FOUND {
            return RegistryError::NotFound;
        }
        if message.contains("already exists") {
            return RegistryError::Duplicate { message };
        }
        RegistryError::Api(message)
    }
}

#[async_trait]
impl MonitorRegistry for SocialDataClient {
    async fn create_monitor(
        &self,
        monitor_type: MonitorType,
        params: MonitorParams,
    ) -> Result<Monitor, RegistryError> {
        let url = self.url(monitor_type.create_route());
        debug!("Creating {} monitor for @{}", monitor_type, params.user_screen_name);

        let response = self.auth(self.client.post(&url)).json(&params).send().await?;
        if !response.status().is_success() {
            return Err(Self::classify_error(response).await);
        }

        let envelope: DataEnvelope<Monitor> = response.json().await?;
        Ok(envelope.data)
    }

    async fn delete_monitor(&self, id: &str) -> Result<(), RegistryError> {
        let url = self.url(&format!("/monitors/{}", id));
        debug!("Deleting monitor {}", id);

        let response = self.auth(self.client.delete(&url)).send().await?;
        if !response.status().is_success() {
            return Err(Self::classify_error(response).await);
        }
        Ok(())
    }

    async fn get_monitor(&self, id: &str) -> Result<Monitor, RegistryError> {
        let url = self.url(&format!("/monitors/{}", id));
        debug!("Fetching monitor {}", id);

        let response = self.auth(self.client.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(Self::classify_error(response).await);
        }

        let envelope: DataEnvelope<Monitor> = response.json().await?;
        Ok(envelope.data)
    }

    async fn list_monitors(&self, page: u32) -> Result<Vec<Monitor>, RegistryError> {
        let url = self.url("/monitors");
        debug!("Listing monitors (page {})", page);

        let response = self
            .auth(self.client.get(&url))
            .query(&[("page", page)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::classify_error(response).await);
        }

        let envelope: DataEnvelope<Vec<Monitor>> = response.json().await?;
        Ok(envelope.data)
    }

    async fn set_global_webhook(&self, url: &str) -> Result<(), RegistryError> {
        let endpoint = self.url("/user/webhook");
        debug!("Registering global webhook URL: {}", url);

        let response = self
            .auth(self.client.post(&endpoint))
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::classify_error(response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&MonitorType::UserTweets).unwrap(),
            "\"user_tweets\""
        );
        let parsed: MonitorType = serde_json::from_str("\"user_following\"").unwrap();
        assert_eq!(parsed, MonitorType::UserFollowing);
    }

    #[test]
    fn test_monitor_deserializes_with_missing_optionals() {
        let monitor: Monitor = serde_json::from_str(
            r#"{"id": "123", "monitor_type": "user_profile"}"#,
        )
        .unwrap();
        assert_eq!(monitor.id, "123");
        assert!(monitor.handle().is_none());
        assert!(monitor.created_at.is_none());
    }

    #[test]
    fn test_matches_handle_case_insensitive() {
        let monitor: Monitor = serde_json::from_str(
            r#"{
                "id": "1",
                "monitor_type": "user_tweets",
                "parameters": {"user_screen_name": "ElonMusk"}
            }"#,
        )
        .unwrap();
        assert!(monitor.matches_handle("elonmusk"));
        assert!(monitor.matches_handle("ELONMUSK"));
        assert!(!monitor.matches_handle("someoneelse"));
    }

    #[test]
    fn test_create_params_omit_absent_webhook() {
        let params = MonitorParams {
            user_screen_name: "alice".to_string(),
            webhook_url: None,
        };
        let json = serde_json::to_string(&params).unwrap();
        assert!(!json.contains("webhook_url"));
    }
}
