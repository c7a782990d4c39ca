// Seeding stages: one pass over each fixture collection

use serde::Serialize;

use super::records::{managers_path, KeyedFixture, ManagerRecord};
use crate::auth::PasswordStorage;
use crate::backend::{IdentityService, NewUser, RealtimeDatabase};
use crate::config::fixtures::ManagerFixture;
use crate::error::SeedError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFailure {
    /// Storage key, or the email for managers
    pub key: String,
    pub message: String,
}

/// Outcome of one seeding stage. Failures never stop a stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageReport {
    pub written: usize,
    pub already_existed: usize,
    pub failures: Vec<RecordFailure>,
}

impl StageReport {
    fn fail(&mut self, key: &str, err: impl std::fmt::Display) {
        self.failures.push(RecordFailure {
            key: key.to_string(),
            message: err.to_string(),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedManager {
    pub email: String,
    pub uid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerStageReport {
    #[serde(flatten)]
    pub report: StageReport,
    /// Managers provisioned in this run, in fixture order
    pub created: Vec<CreatedManager>,
}

/// Provision each manager in the identity service, then write its profile keyed by the new uid.
pub async fn seed_managers(
    identity: &dyn IdentityService,
    database: &dyn RealtimeDatabase,
    managers: &[ManagerFixture],
    password_storage: PasswordStorage,
) -> ManagerStageReport {
    tracing::info!(count = managers.len(), "Creating managers");
    if password_storage == PasswordStorage::Plaintext {
        tracing::warn!("Manager passwords will be stored in plaintext");
    }

    let mut stage = ManagerStageReport::default();

    for manager in managers {
        // Prepared before provisioning so a hashing error never leaves a user without a profile
        let stored_password = match password_storage.stored_value(&manager.password) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!("Error preparing record for {}: {:#}", manager.email, err);
                stage.report.fail(&manager.email, format!("{:#}", err));
                continue;
            }
        };

        let new_user = NewUser {
            email: manager.email.clone(),
            password: manager.password.clone(),
            display_name: manager.display_name.clone(),
        };

        let user = match identity.create_user(&new_user).await {
            Ok(user) => user,
            Err(err) if err.is_already_exists() => {
                tracing::warn!("User already exists: {}", manager.email);
                stage.report.already_existed += 1;
                continue;
            }
            Err(err) => {
                tracing::error!("Error creating user {}: {}", manager.email, err);
                stage.report.fail(&manager.email, err);
                continue;
            }
        };
        tracing::info!("Created user: {} ({})", manager.email, user.uid);

        let record = ManagerRecord::new(manager, stored_password);

        if let Err(err) = write_record(database, &managers_path().child(&user.uid), &record).await {
            tracing::error!("Error writing manager {}: {}", manager.email, err);
            stage.report.fail(&manager.email, err);
            continue;
        }

        stage.report.written += 1;
        stage.created.push(CreatedManager {
            email: manager.email.clone(),
            uid: user.uid,
        });
    }

    stage
}

/// Upsert each fixture at its caller-assigned key.
pub async fn seed_collection<F: KeyedFixture>(
    database: &dyn RealtimeDatabase,
    name: &str,
    fixtures: &[F],
) -> StageReport {
    tracing::info!(count = fixtures.len(), "Seeding {}", name);

    let mut report = StageReport::default();
    for fixture in fixtures {
        let record = F::Record::from(fixture);
        match write_record(database, &fixture.path(), &record).await {
            Ok(()) => {
                report.written += 1;
                tracing::info!(key = fixture.key(), "Added {}: {}", name, fixture.label());
            }
            Err(err) => {
                tracing::error!("Error seeding {} {}: {}", name, fixture.key(), err);
                report.fail(fixture.key(), err);
            }
        }
    }
    report
}

async fn write_record<T: Serialize>(
    database: &dyn RealtimeDatabase,
    path: &crate::backend::DbPath,
    record: &T,
) -> Result<(), SeedError> {
    let value = serde_json::to_value(record)
        .map_err(|e| SeedError::Fixture(format!("Could not serialize {}: {}", path, e)))?;
    database.set(path, &value).await
}
