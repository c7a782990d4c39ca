// Database record shapes and their storage locations

use serde::Serialize;

use crate::backend::DbPath;
use crate::config::fixtures::{
    Address, CustomerFixture, ItemFixture, ManagerFixture, SupplierFixture,
};

const MANAGERS: [&str; 2] = ["users", "managers"];
const SUPPLIERS: [&str; 2] = ["users", "suppliers"];
const CUSTOMERS: [&str; 2] = ["users", "customers"];
const ITEMS: [&str; 2] = ["inventory", "items"];

pub fn managers_path() -> DbPath {
    DbPath::new(MANAGERS)
}

pub fn suppliers_path() -> DbPath {
    DbPath::new(SUPPLIERS)
}

pub fn customers_path() -> DbPath {
    DbPath::new(CUSTOMERS)
}

pub fn items_path() -> DbPath {
    DbPath::new(ITEMS)
}

/// Stored at `users/managers/{uid}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerRecord {
    pub manager_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_password: Option<String>,
    pub manager_email: String,
}

impl ManagerRecord {
    pub fn new(fixture: &ManagerFixture, stored_password: Option<String>) -> Self {
        Self {
            manager_name: fixture.display_name.clone(),
            manager_password: stored_password,
            manager_email: fixture.email.clone(),
        }
    }
}

/// Stored at `users/suppliers/{supplierID}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierRecord {
    pub supplier_name: String,
    pub supplier_email: String,
    pub supplier_tel: String,
    #[serde(flatten)]
    pub address: Address,
}

impl From<&SupplierFixture> for SupplierRecord {
    fn from(value: &SupplierFixture) -> Self {
        Self {
            supplier_name: value.supplier_name.clone(),
            supplier_email: value.supplier_email.clone(),
            supplier_tel: value.supplier_tel.clone(),
            address: value.address.clone(),
        }
    }
}

/// Stored at `users/customers/{custID}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    pub cust_name: String,
    pub cust_email: String,
    pub cust_tel: String,
    #[serde(flatten)]
    pub address: Address,
}

impl From<&CustomerFixture> for CustomerRecord {
    fn from(value: &CustomerFixture) -> Self {
        Self {
            cust_name: value.cust_name.clone(),
            cust_email: value.cust_email.clone(),
            cust_tel: value.cust_tel.clone(),
            address: value.address.clone(),
        }
    }
}

/// Stored at `inventory/items/{itemID}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
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

impl From<&ItemFixture> for ItemRecord {
    fn from(value: &ItemFixture) -> Self {
        Self {
            item_name: value.item_name.clone(),
            item_description: value.item_description.clone(),
            item_category: value.item_category.clone(),
            item_sub_category: value.item_sub_category.clone(),
            item_price: value.item_price,
            stock_quantity: value.stock_quantity,
            unit: value.unit.clone(),
            low_stock_threshold: value.low_stock_threshold,
            item_image_url: value.item_image_url.clone(),
        }
    }
}

/// A fixture written under a caller-assigned key.
pub trait KeyedFixture {
    type Record: Serialize + for<'a> From<&'a Self>;

    /// Collection the record is written under.
    fn collection() -> DbPath;

    /// Storage key, also used to identify the record in logs.
    fn key(&self) -> &str;

    /// Human readable label for success logs.
    fn label(&self) -> String;

    fn path(&self) -> DbPath {
        Self::collection().child(self.key())
    }
}

impl KeyedFixture for SupplierFixture {
    type Record = SupplierRecord;

    fn collection() -> DbPath {
        suppliers_path()
    }

    fn key(&self) -> &str {
        &self.supplier_id
    }

    fn label(&self) -> String {
        format!("{} ({})", self.supplier_name, self.supplier_email)
    }
}

impl KeyedFixture for CustomerFixture {
    type Record = CustomerRecord;

    fn collection() -> DbPath {
        customers_path()
    }

    fn key(&self) -> &str {
        &self.cust_id
    }

    fn label(&self) -> String {
        format!("{} ({})", self.cust_name, self.cust_email)
    }
}

impl KeyedFixture for ItemFixture {
    type Record = ItemRecord;

    fn collection() -> DbPath {
        items_path()
    }

    fn key(&self) -> &str {
        &self.item_id
    }

    fn label(&self) -> String {
        self.item_name.clone()
    }
}
