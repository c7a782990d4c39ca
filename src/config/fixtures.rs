use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::SeedError;

/// Fixture set compiled into the binary, used when no `--fixtures` path is given.
const DEFAULT_FIXTURES: &str = include_str!("../../fixtures.yml");

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManagerFixture {
    pub display_name: String,
    pub password: String,
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SupplierFixture {
    #[serde(rename = "supplierID")]
    pub supplier_id: String,
    #[serde(rename = "supplierName")]
    pub supplier_name: String,
    #[serde(rename = "supplierEmail")]
    pub supplier_email: String,
    #[serde(rename = "supplierTel")]
    pub supplier_tel: String,
    #[serde(flatten)]
    pub address: Address,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CustomerFixture {
    #[serde(rename = "custID")]
    pub cust_id: String,
    #[serde(rename = "custName")]
    pub cust_name: String,
    #[serde(rename = "custEmail")]
    pub cust_email: String,
    #[serde(rename = "custTel")]
    pub cust_tel: String,
    #[serde(flatten)]
    pub address: Address,
}

/// Postal address shared by suppliers and customers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub address1: String,
    pub address2: String,
    pub postal_code: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemFixture {
    #[serde(rename = "itemID")]
    pub item_id: String,
    pub item_name: String,
    pub item_description: String,
    pub item_category: String,
    pub item_sub_category: String,
    pub item_price: f64,
    pub stock_quantity: i64,
    pub unit: String,
    pub low_stock_threshold: i64,
    pub item_image_url: String,
}

/// Collections that exist in the target schema but have no seeding support yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UnsupportedCollection {
    Mechanics,
    ItemUsage,
    ProcurementRequests,
    ItemRequests,
    Orders,
    Jobs,
    Invoices,
    CustomerChats,
}

impl UnsupportedCollection {
    pub const ALL: [UnsupportedCollection; 8] = [
        UnsupportedCollection::Mechanics,
        UnsupportedCollection::ItemUsage,
        UnsupportedCollection::ProcurementRequests,
        UnsupportedCollection::ItemRequests,
        UnsupportedCollection::Orders,
        UnsupportedCollection::Jobs,
        UnsupportedCollection::Invoices,
        UnsupportedCollection::CustomerChats,
    ];

    /// Key used for this collection in a fixture file.
    pub fn fixture_key(&self) -> &'static str {
        match self {
            UnsupportedCollection::Mechanics => "mechanics",
            UnsupportedCollection::ItemUsage => "itemUsage",
            UnsupportedCollection::ProcurementRequests => "procurementRequests",
            UnsupportedCollection::ItemRequests => "itemRequests",
            UnsupportedCollection::Orders => "orders",
            UnsupportedCollection::Jobs => "jobs",
            UnsupportedCollection::Invoices => "invoices",
            UnsupportedCollection::CustomerChats => "customerChats",
        }
    }

    pub fn from_fixture_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.fixture_key() == key)
    }
}

/// The full set of records to load.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Fixtures {
    #[serde(default)]
    pub managers: Vec<ManagerFixture>,
    #[serde(default)]
    pub suppliers: Vec<SupplierFixture>,
    #[serde(default)]
    pub customers: Vec<CustomerFixture>,
    #[serde(default)]
    pub items: Vec<ItemFixture>,
    /// Keys that are not seeded; reported by the orchestrator.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Fixtures {
    pub fn from_yaml(yml: &str) -> Result<Self, SeedError> {
        Ok(serde_yaml::from_str(yml)?)
    }

    /// Load fixtures from `path`, or the built-in set when no path is given.
    pub fn load(maybe_path: Option<&Path>) -> Result<Self, SeedError> {
        match maybe_path {
            Some(path) => {
                let yml = std::fs::read_to_string(path).map_err(|e| {
                    SeedError::Fixture(format!("Could not read {}: {}", path.display(), e))
                })?;
                Self::from_yaml(&yml)
            }
            None => Self::from_yaml(DEFAULT_FIXTURES),
        }
    }

    /// Record counts for every extra key, split into known-unsupported and unknown keys.
    pub fn ignored_collections(&self) -> (Vec<(UnsupportedCollection, usize)>, Vec<String>) {
        let mut unsupported = Vec::new();
        let mut unknown = Vec::new();
        for (key, value) in &self.extra {
            match UnsupportedCollection::from_fixture_key(key) {
                Some(collection) => {
                    let count = match value {
                        serde_yaml::Value::Sequence(seq) => seq.len(),
                        serde_yaml::Value::Mapping(map) => map.len(),
                        serde_yaml::Value::Null => 0,
                        _ => 1,
                    };
                    unsupported.push((collection, count));
                }
                None => unknown.push(key.clone()),
            }
        }
        (unsupported, unknown)
    }
}
