// OAuth2 access tokens for the Firebase REST APIs

use async_trait::async_trait;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::OnceCell;
use yup_oauth2::{ServiceAccountAuthenticator, ServiceAccountKey};

use crate::error::SeedError;

/// Scopes needed to manage Auth users and write to the Realtime Database.
const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/firebase.database",
    "https://www.googleapis.com/auth/identitytoolkit",
    "https://www.googleapis.com/auth/userinfo.email",
];

/// Token the local emulator suite accepts as an admin credential.
pub const EMULATOR_TOKEN: &str = "owner";

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, SeedError>;
}

/// A pre-minted token, e.g. from `gcloud auth print-access-token` or the emulator's `owner`.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, SeedError> {
        Ok(self.0.clone())
    }
}

pub fn parse_service_account_key(json: &str) -> Result<ServiceAccountKey, SeedError> {
    yup_oauth2::parse_service_account_key(json)
        .map_err(|e| SeedError::Credentials(format!("Invalid service account key: {}", e)))
}

pub fn load_service_account_key(path: &Path) -> Result<ServiceAccountKey, SeedError> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        SeedError::Credentials(format!("Could not read {}: {}", path.display(), e))
    })?;
    parse_service_account_key(&json)
}

type TokenFuture = Pin<Box<dyn Future<Output = Result<String, SeedError>> + Send>>;
type TokenFetcher = Box<dyn Fn() -> TokenFuture + Send + Sync>;

/// Service-account tokens from yup-oauth2, which signs the assertion and caches the token.
/// The authenticator is built on first use.
pub struct ServiceAccountTokenProvider {
    key: ServiceAccountKey,
    fetcher: OnceCell<TokenFetcher>,
}

impl ServiceAccountTokenProvider {
    pub fn new(key: ServiceAccountKey) -> Self {
        Self {
            key,
            fetcher: OnceCell::new(),
        }
    }

    async fn build_fetcher(key: ServiceAccountKey) -> Result<TokenFetcher, SeedError> {
        let client_email = key.client_email.clone();
        let authenticator = ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .map_err(|e| SeedError::Credentials(format!("Failed to build authenticator: {}", e)))?;
        let authenticator = Arc::new(authenticator);
        tracing::debug!(client_email = %client_email, "Service account authenticator ready");

        Ok(Box::new(move || -> TokenFuture {
            let authenticator = authenticator.clone();
            Box::pin(async move {
                let token = authenticator
                    .token(SCOPES)
                    .await
                    .map_err(|e| SeedError::Credentials(format!("Failed to mint token: {}", e)))?;
                token
                    .token()
                    .map(str::to_string)
                    .ok_or_else(|| SeedError::Credentials("Token response had no access token".to_string()))
            })
        }))
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self) -> Result<String, SeedError> {
        let fetch = self
            .fetcher
            .get_or_try_init(|| Self::build_fetcher(self.key.clone()))
            .await?;
        fetch().await
    }
}
