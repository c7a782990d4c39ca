// Orchestrates a full run: reset, then every seeding stage in a fixed order

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::reset::{reset_all, ResetReport};
use super::seed::{seed_collection, seed_managers, ManagerStageReport, StageReport};
use crate::auth::PasswordStorage;
use crate::backend::{IdentityService, RealtimeDatabase};
use crate::config::fixtures::{Fixtures, UnsupportedCollection};
use crate::error::SeedError;

#[derive(Debug, Clone, Copy, Default)]
pub struct SeedOptions {
    pub skip_reset: bool,
    pub password_storage: PasswordStorage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IgnoredCollection {
    pub collection: UnsupportedCollection,
    pub records: usize,
}

/// Everything a run produced, returned instead of kept in globals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// None when the reset was skipped
    pub reset: Option<ResetReport>,
    pub managers: ManagerStageReport,
    pub suppliers: StageReport,
    pub customers: StageReport,
    pub items: StageReport,
    pub unsupported: Vec<IgnoredCollection>,
}

impl SeedSummary {
    pub fn manager_uids(&self) -> Vec<&str> {
        self.managers.created.iter().map(|m| m.uid.as_str()).collect()
    }

    pub fn failure_count(&self) -> usize {
        self.managers.report.failures.len()
            + self.suppliers.failures.len()
            + self.customers.failures.len()
            + self.items.failures.len()
    }
}

pub struct Seeder {
    identity: Arc<dyn IdentityService>,
    database: Arc<dyn RealtimeDatabase>,
    options: SeedOptions,
}

impl Seeder {
    pub fn new(
        identity: Arc<dyn IdentityService>,
        database: Arc<dyn RealtimeDatabase>,
        options: SeedOptions,
    ) -> Self {
        Self {
            identity,
            database,
            options,
        }
    }

    /// Reset errors propagate and end the run; per-record errors land in the summary.
    pub async fn run(&self, fixtures: &Fixtures) -> Result<SeedSummary, SeedError> {
        let started_at = Utc::now();
        let identity = self.identity.as_ref();
        let database = self.database.as_ref();

        let unsupported = report_ignored(fixtures);

        let reset = if self.options.skip_reset {
            tracing::info!("Skipping reset");
            None
        } else {
            Some(reset_all(identity, database).await?)
        };

        let managers = seed_managers(
            identity,
            database,
            &fixtures.managers,
            self.options.password_storage,
        )
        .await;
        let suppliers = seed_collection(database, "supplier", &fixtures.suppliers).await;
        let customers = seed_collection(database, "customer", &fixtures.customers).await;
        let items = seed_collection(database, "item", &fixtures.items).await;

        let summary = SeedSummary {
            started_at,
            finished_at: Utc::now(),
            reset,
            managers,
            suppliers,
            customers,
            items,
            unsupported,
        };

        tracing::info!(failures = summary.failure_count(), "Seeding finished");
        tracing::info!("Manager UIDs: {:?}", summary.manager_uids());
        Ok(summary)
    }
}

fn report_ignored(fixtures: &Fixtures) -> Vec<IgnoredCollection> {
    let (unsupported, unknown) = fixtures.ignored_collections();
    for key in unknown {
        tracing::warn!("Ignoring unknown fixture collection '{}'", key);
    }
    unsupported
        .into_iter()
        .map(|(collection, records)| {
            tracing::warn!(
                records,
                "Collection '{}' is not supported yet, skipping",
                collection.fixture_key()
            );
            IgnoredCollection {
                collection,
                records,
            }
        })
        .collect()
}
