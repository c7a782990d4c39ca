// In-memory identity service and database, used for dry runs

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard};

use super::{DbPath, IdentityService, NewUser, RealtimeDatabase, UserPage, UserRecord};
use crate::error::SeedError;

#[derive(Default)]
struct MemoryState {
    // Ordered by uid so page tokens stay valid while users are deleted
    users: BTreeMap<String, StoredUser>,
    tree: Value,
    list_calls: usize,
    failing_paths: HashSet<DbPath>,
    failing_prefixes: Vec<DbPath>,
    failing_emails: HashSet<String>,
}

struct StoredUser {
    email: String,
    display_name: String,
}

/// A single process-local backend implementing both traits.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means another test thread panicked; the data is still usable
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a user directly, bypassing duplicate checks. Returns the assigned uid.
    pub fn insert_user(&self, email: &str) -> String {
        let uid = new_uid();
        self.lock().users.insert(
            uid.clone(),
            StoredUser {
                email: email.to_string(),
                display_name: String::new(),
            },
        );
        uid
    }

    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    /// (uid, email, display name) for every user, ordered by uid.
    pub fn users(&self) -> Vec<(String, String, String)> {
        self.lock()
            .users
            .iter()
            .map(|(uid, u)| (uid.clone(), u.email.clone(), u.display_name.clone()))
            .collect()
    }

    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    /// Make every write to exactly `path` fail with a backend error.
    pub fn fail_writes_to(&self, path: DbPath) {
        self.lock().failing_paths.insert(path);
    }

    /// Make every write at or below `prefix` fail, for locations whose keys aren't known up front.
    pub fn fail_writes_under(&self, prefix: DbPath) {
        self.lock().failing_prefixes.push(prefix);
    }

    /// Make `create_user` fail with a server error for this email.
    pub fn fail_create_for(&self, email: &str) {
        self.lock().failing_emails.insert(email.to_string());
    }

    /// Value stored at `path`, or None when absent.
    pub fn read(&self, path: &DbPath) -> Option<Value> {
        let state = self.lock();
        let mut node = &state.tree;
        for segment in path.segments() {
            node = node.as_object()?.get(segment)?;
        }
        if node.is_null() {
            None
        } else {
            Some(node.clone())
        }
    }

    /// Number of children directly under `path`.
    pub fn child_count(&self, path: &DbPath) -> usize {
        self.read(path)
            .and_then(|v| v.as_object().map(Map::len))
            .unwrap_or(0)
    }

    /// Snapshot of the whole database.
    pub fn export(&self) -> Value {
        self.lock().tree.clone()
    }
}

fn new_uid() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Remove `segments` below `node`, pruning parents left empty. Returns true when `node` became empty.
fn remove_at(node: &mut Value, segments: &[String]) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return true;
    };
    if let Some(map) = node.as_object_mut() {
        let emptied = match map.get_mut(first) {
            Some(child) if !rest.is_empty() => remove_at(child, rest),
            Some(_) => true,
            None => false,
        };
        if emptied {
            map.remove(first);
        }
        return map.is_empty();
    }
    false
}

fn write_at(node: &mut Value, segments: &[String], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(first.clone()).or_insert(Value::Null);
        write_at(child, rest, value);
    }
}

#[async_trait]
impl IdentityService for MemoryBackend {
    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, SeedError> {
        let mut state = self.lock();
        if state.failing_emails.contains(&user.email) {
            return Err(SeedError::Backend {
                status: 500,
                message: format!("Injected create failure for {}", user.email),
            });
        }
        if state.users.values().any(|u| u.email == user.email) {
            return Err(SeedError::AlreadyExists(user.email.clone()));
        }
        let uid = new_uid();
        state.users.insert(
            uid.clone(),
            StoredUser {
                email: user.email.clone(),
                display_name: user.display_name.clone(),
            },
        );
        Ok(UserRecord {
            uid,
            email: Some(user.email.clone()),
        })
    }

    async fn list_users(
        &self,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<UserPage, SeedError> {
        let mut state = self.lock();
        state.list_calls += 1;

        let lower = match page_token {
            Some(token) => Bound::Excluded(token.to_string()),
            None => Bound::Unbounded,
        };
        let mut remaining = state.users.range((lower, Bound::Unbounded));
        let users: Vec<UserRecord> = remaining
            .by_ref()
            .take(max_results)
            .map(|(uid, u)| UserRecord {
                uid: uid.clone(),
                email: Some(u.email.clone()),
            })
            .collect();
        let more = remaining.next().is_some();

        let next_page_token = if more {
            users.last().map(|u| u.uid.clone())
        } else {
            None
        };
        Ok(UserPage {
            users,
            next_page_token,
        })
    }

    async fn delete_user(&self, uid: &str) -> Result<(), SeedError> {
        match self.lock().users.remove(uid) {
            Some(_) => Ok(()),
            None => Err(SeedError::Backend {
                status: 400,
                message: format!("USER_NOT_FOUND: {}", uid),
            }),
        }
    }
}

#[async_trait]
impl RealtimeDatabase for MemoryBackend {
    async fn set(&self, path: &DbPath, value: &Value) -> Result<(), SeedError> {
        path.validate()?;

        let mut state = self.lock();
        let under_prefix = state
            .failing_prefixes
            .iter()
            .any(|prefix| path.segments().starts_with(prefix.segments()));
        if under_prefix || state.failing_paths.contains(path) {
            return Err(SeedError::Backend {
                status: 500,
                message: format!("Injected write failure at {}", path),
            });
        }

        if value.is_null() {
            if remove_at(&mut state.tree, path.segments()) {
                state.tree = Value::Null;
            }
        } else {
            write_at(&mut state.tree, path.segments(), value.clone());
        }
        Ok(())
    }
}
