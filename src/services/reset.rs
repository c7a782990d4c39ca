// Destructive reset of the database and the identity service

use serde::Serialize;
use serde_json::Value;

use crate::backend::{DbPath, IdentityService, RealtimeDatabase, LIST_USERS_PAGE_SIZE};
use crate::error::SeedError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetReport {
    pub database_cleared: bool,
    pub list_calls: usize,
    pub users_deleted: usize,
}

/// Write null at the database root, removing everything.
pub async fn reset_database(database: &dyn RealtimeDatabase) -> Result<(), SeedError> {
    tracing::info!("Clearing Realtime Database");
    database.set(&DbPath::root(), &Value::Null).await?;
    tracing::info!("Database cleared");
    Ok(())
}

/// Delete every identity user, one page at a time, until a page comes back without a token.
/// Returns (listing calls, users deleted). The first failure aborts, as does a page token
/// that repeats the one just sent.
pub async fn clear_auth_users(identity: &dyn IdentityService) -> Result<(usize, usize), SeedError> {
    tracing::info!("Clearing Auth users");

    let mut list_calls = 0;
    let mut deleted = 0;
    let mut page_token: Option<String> = None;

    loop {
        let page = identity
            .list_users(LIST_USERS_PAGE_SIZE, page_token.as_deref())
            .await?;
        list_calls += 1;

        for user in &page.users {
            identity.delete_user(&user.uid).await?;
            deleted += 1;
            tracing::info!(
                uid = %user.uid,
                "Deleted user: {}",
                user.email.as_deref().unwrap_or("<no email>")
            );
        }

        match page.next_page_token {
            Some(token) if page_token.as_deref() == Some(token.as_str()) => {
                return Err(SeedError::Backend {
                    status: 500,
                    message: format!("Identity service repeated page token {}", token),
                });
            }
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    Ok((list_calls, deleted))
}

/// Run both reset steps: database first, then identity users.
pub async fn reset_all(
    identity: &dyn IdentityService,
    database: &dyn RealtimeDatabase,
) -> Result<ResetReport, SeedError> {
    reset_database(database).await?;
    let (list_calls, users_deleted) = clear_auth_users(identity).await?;
    Ok(ResetReport {
        database_cleared: true,
        list_calls,
        users_deleted,
    })
}
