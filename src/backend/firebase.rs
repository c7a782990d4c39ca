// REST clients for Firebase Authentication (Identity Toolkit v1) and the Realtime Database

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use url::Url;

use super::{DbPath, IdentityService, NewUser, RealtimeDatabase, UserPage, UserRecord};
use crate::auth::credentials::{ServiceAccountTokenProvider, StaticToken, TokenProvider};
use crate::config::{CredentialSource, Settings};
use crate::error::{ConfigResultExt, SeedError};

/// Identity Toolkit error bodies look like `{"error": {"code": 400, "message": "EMAIL_EXISTS"}}`,
/// the Realtime Database uses `{"error": "Permission denied"}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detailed { error: ErrorDetail },
    Plain { error: String },
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

async fn backend_error(response: reqwest::Response) -> SeedError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(ErrorBody::Detailed { error }) => error.message,
        Ok(ErrorBody::Plain { error }) => error,
        Err(_) => text,
    };
    SeedError::Backend { status, message }
}

/// Build both clients from resolved settings, sharing one HTTP client and token source.
pub fn connect(settings: &Settings) -> Result<(FirebaseAuth, FirebaseDatabase), SeedError> {
    let http = reqwest::Client::builder()
        .timeout(settings.request_timeout)
        .build()
        .config_err("Failed to create HTTP client")?;

    let tokens: Arc<dyn TokenProvider> = match &settings.credentials {
        CredentialSource::ServiceAccount(key) => {
            Arc::new(ServiceAccountTokenProvider::new(key.clone()))
        }
        CredentialSource::StaticToken(token) => Arc::new(StaticToken::new(token.clone())),
    };

    let auth = FirebaseAuth::new(
        http.clone(),
        tokens.clone(),
        settings.auth_url.clone(),
        &settings.project_id,
    );
    let database = FirebaseDatabase::new(
        http,
        tokens,
        settings.database_url.clone(),
        settings.database_namespace.clone(),
    );
    Ok((auth, database))
}

pub struct FirebaseAuth {
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    base_url: Url,
    project_id: String,
}

impl FirebaseAuth {
    pub fn new(
        http: reqwest::Client,
        tokens: Arc<dyn TokenProvider>,
        base_url: Url,
        project_id: &str,
    ) -> Self {
        Self {
            http,
            tokens,
            base_url,
            project_id: project_id.to_string(),
        }
    }

    fn endpoint(&self, suffix: &str) -> Result<Url, SeedError> {
        let relative = format!(
            "v1/projects/{}/{}",
            urlencoding::encode(&self.project_id),
            suffix
        );
        self.base_url.join(&relative).config_err("identity endpoint")
    }
}

#[async_trait]
impl IdentityService for FirebaseAuth {
    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, SeedError> {
        let response = self
            .http
            .post(self.endpoint("accounts")?)
            .bearer_auth(self.tokens.access_token().await?)
            .json(user)
            .send()
            .await?;

        if !response.status().is_success() {
            return match backend_error(response).await {
                SeedError::Backend { message, .. } if message.starts_with("EMAIL_EXISTS") => {
                    Err(SeedError::AlreadyExists(user.email.clone()))
                }
                other => Err(other),
            };
        }

        let mut record: UserRecord = response.json().await?;
        // The create response does not always echo the email back
        if record.email.is_none() {
            record.email = Some(user.email.clone());
        }
        Ok(record)
    }

    async fn list_users(
        &self,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<UserPage, SeedError> {
        let mut url = self.endpoint("accounts:batchGet")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("maxResults", &max_results.to_string());
            if let Some(token) = page_token {
                query.append_pair("nextPageToken", token);
            }
        }

        let response = self
            .http
            .get(url)
            .bearer_auth(self.tokens.access_token().await?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        let mut page: UserPage = response.json().await?;
        // An empty token means no further pages
        if page.next_page_token.as_deref() == Some("") {
            page.next_page_token = None;
        }
        Ok(page)
    }

    async fn delete_user(&self, uid: &str) -> Result<(), SeedError> {
        let response = self
            .http
            .post(self.endpoint("accounts:delete")?)
            .bearer_auth(self.tokens.access_token().await?)
            .json(&json!({ "localId": uid }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }
        Ok(())
    }
}

pub struct FirebaseDatabase {
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    base_url: Url,
    namespace: Option<String>,
}

impl FirebaseDatabase {
    pub fn new(
        http: reqwest::Client,
        tokens: Arc<dyn TokenProvider>,
        base_url: Url,
        namespace: Option<String>,
    ) -> Self {
        Self {
            http,
            tokens,
            base_url,
            namespace,
        }
    }

    fn location(&self, path: &DbPath) -> Result<Url, SeedError> {
        let relative = if path.is_root() {
            ".json".to_string()
        } else {
            format!("{}.json", path.encoded())
        };
        let mut url = self.base_url.join(&relative).config_err("database url")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("print", "silent");
            if let Some(ns) = &self.namespace {
                query.append_pair("ns", ns);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl RealtimeDatabase for FirebaseDatabase {
    async fn set(&self, path: &DbPath, value: &serde_json::Value) -> Result<(), SeedError> {
        path.validate()?;

        let response = self
            .http
            .put(self.location(path)?)
            .bearer_auth(self.tokens.access_token().await?)
            .json(value)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }
        Ok(())
    }
}
