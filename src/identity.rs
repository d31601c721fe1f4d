use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("identity service returned {status}: {message}")]
    Status { status: u16, message: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityUser {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityDeletion {
    Deleted,
    /// The identity was already gone. Cascades treat this as success.
    AlreadyAbsent,
}

/// Admin surface of the identity provider: disable/enable a login, remove
/// it entirely, and enumerate users (for the profile email backfill).
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn set_disabled(&self, user_id: Uuid, disabled: bool) -> Result<(), IdentityError>;

    async fn delete_user(&self, user_id: Uuid) -> Result<IdentityDeletion, IdentityError>;

    async fn list_users(&self) -> Result<Vec<IdentityUser>, IdentityError>;
}

pub struct HttpIdentityDirectory {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpIdentityDirectory {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, IdentityError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        Err(IdentityError::Status { status, message })
    }
}

#[derive(Serialize)]
struct DisabledPatch {
    disabled: bool,
}

#[async_trait]
impl IdentityDirectory for HttpIdentityDirectory {
    async fn set_disabled(&self, user_id: Uuid, disabled: bool) -> Result<(), IdentityError> {
        let response = self
            .client
            .patch(format!("{}/admin/users/{}", self.base_url, user_id))
            .bearer_auth(&self.api_key)
            .json(&DisabledPatch { disabled })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<IdentityDeletion, IdentityError> {
        let response = self
            .client
            .delete(format!("{}/admin/users/{}", self.base_url, user_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(IdentityDeletion::AlreadyAbsent);
        }
        Self::check(response).await?;
        Ok(IdentityDeletion::Deleted)
    }

    async fn list_users(&self) -> Result<Vec<IdentityUser>, IdentityError> {
        let response = self
            .client
            .get(format!("{}/admin/users", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }
}
