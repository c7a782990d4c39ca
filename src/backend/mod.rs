// Backend seams: the identity service and the realtime database

pub mod firebase;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SeedError;

/// Page size used when listing identity users.
pub const LIST_USERS_PAGE_SIZE: usize = 1000;

/// Profile sent to the identity service when provisioning a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "localId")]
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// One page of a user listing. `next_page_token` is None on the last page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Fails with `SeedError::AlreadyExists` when the email is taken.
    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, SeedError>;

    async fn list_users(
        &self,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<UserPage, SeedError>;

    async fn delete_user(&self, uid: &str) -> Result<(), SeedError>;
}

#[async_trait]
pub trait RealtimeDatabase: Send + Sync {
    /// Overwrite the value at `path`. Writing `Value::Null` deletes it.
    async fn set(&self, path: &DbPath, value: &serde_json::Value) -> Result<(), SeedError>;
}

/// Characters the Realtime Database refuses in a key.
const FORBIDDEN_KEY_CHARS: &[char] = &['.', '$', '#', '[', ']', '/'];

/// A location in the database tree, held as unencoded key segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DbPath {
    segments: Vec<String>,
}

impl DbPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(key.into());
        Self { segments }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Reject keys the database would refuse, before any request is made.
    pub fn validate(&self) -> Result<(), SeedError> {
        for segment in &self.segments {
            if segment.is_empty() {
                return Err(SeedError::Backend {
                    status: 400,
                    message: format!("Invalid path '{}': empty key", self),
                });
            }
            if segment.contains(FORBIDDEN_KEY_CHARS) || segment.chars().any(char::is_control) {
                return Err(SeedError::Backend {
                    status: 400,
                    message: format!("Invalid key '{}' in path '{}'", segment, self),
                });
            }
        }
        Ok(())
    }

    /// Percent-encoded form used in REST URLs, without a leading slash.
    pub fn encoded(&self) -> String {
        self.segments
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl fmt::Display for DbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}
