// Common test utilities shared across test files

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use fixero_seed::config::Fixtures;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub const TEST_TOKEN: &str = "test-token";

/// Two managers, one supplier, one customer, one item
#[allow(dead_code)]
pub fn small_fixtures() -> Fixtures {
    Fixtures::from_yaml(
        r#"
managers:
  - displayName: Aisyah Rahman
    password: "Fixero#2025a"
    email: aisyah@fixero.test
  - displayName: Daniel Lim
    password: "Fixero#2025b"
    email: daniel@fixero.test
suppliers:
  - supplierID: SUP001
    supplierName: Northern Auto Parts
    supplierEmail: sales@northern.test
    supplierTel: "+60 4-226 1188"
    address1: "No. 12"
    address2: Lorong Perusahaan 3
    postalCode: "13600"
    street: Kawasan Perindustrian Prai
    city: Prai
    state: Pulau Pinang
    country: Malaysia
customers:
  - custID: CUST001
    custName: Tan Wei Ming
    custEmail: weiming@mail.test
    custTel: "+60 12-345 6789"
    address1: "No. 3"
    address2: Jalan SS2/24
    postalCode: "47300"
    street: SS2
    city: Petaling Jaya
    state: Selangor
    country: Malaysia
items:
  - itemID: ITEM001
    itemName: Oil Filter
    itemDescription: Spin-on oil filter
    itemCategory: Filters
    itemSubCategory: Oil Filter
    itemPrice: 24.5
    stockQuantity: 60
    unit: piece
    lowStockThreshold: 15
    itemImageUrl: https://storage.fixero.test/items/oil-filter.png
"#,
    )
    .expect("test fixtures should parse")
}

/// State of the fake Firebase server: identity users plus every database write.
#[derive(Default)]
pub struct FakeFirebase {
    pub users: BTreeMap<String, String>,
    pub data: BTreeMap<String, Value>,
    pub next_uid: usize,
    pub list_calls: usize,
    pub unauthorized: usize,
}

pub type SharedFake = Arc<Mutex<FakeFirebase>>;

fn error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({"error": {"code": status.as_u16(), "message": message}})),
    )
        .into_response()
}

fn query_param(uri: &Uri, name: &str) -> Option<String> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

async fn handle(
    State(fake): State<SharedFake>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut fake = fake.lock().unwrap();

    let authorized = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TEST_TOKEN))
        .unwrap_or(false);
    if !authorized {
        fake.unauthorized += 1;
        return error(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED");
    }

    let path = uri.path().to_string();

    if method == Method::POST && path.ends_with("/accounts") {
        let request: Value = serde_json::from_slice(&body).unwrap();
        let email = request["email"].as_str().unwrap().to_string();
        if fake.users.values().any(|e| *e == email) {
            return error(StatusCode::BAD_REQUEST, "EMAIL_EXISTS");
        }
        fake.next_uid += 1;
        let uid = format!("uid{:06}", fake.next_uid);
        fake.users.insert(uid.clone(), email.clone());
        return Json(json!({"localId": uid, "email": email})).into_response();
    }

    if method == Method::GET && path.ends_with("/accounts:batchGet") {
        fake.list_calls += 1;
        let max: usize = query_param(&uri, "maxResults")
            .and_then(|m| m.parse().ok())
            .unwrap_or(1000);
        let after = query_param(&uri, "nextPageToken");
        let remaining: Vec<(String, String)> = fake
            .users
            .iter()
            .filter(|(uid, _)| after.as_ref().map(|a| *uid > a).unwrap_or(true))
            .map(|(uid, email)| (uid.clone(), email.clone()))
            .collect();
        let page: Vec<Value> = remaining
            .iter()
            .take(max)
            .map(|(uid, email)| json!({"localId": uid, "email": email}))
            .collect();
        let mut response = json!({ "users": page });
        if remaining.len() > max {
            response["nextPageToken"] = json!(remaining[max - 1].0);
        }
        return Json(response).into_response();
    }

    if method == Method::POST && path.ends_with("/accounts:delete") {
        let request: Value = serde_json::from_slice(&body).unwrap();
        let uid = request["localId"].as_str().unwrap();
        return match fake.users.remove(uid) {
            Some(_) => Json(json!({})).into_response(),
            None => error(StatusCode::BAD_REQUEST, "USER_NOT_FOUND"),
        };
    }

    if method == Method::PUT && path.ends_with(".json") {
        let raw = path.trim_start_matches('/').trim_end_matches(".json");
        let key = urlencoding::decode(raw).unwrap().into_owned();
        let value: Value = serde_json::from_slice(&body).unwrap();
        if value.is_null() {
            let prefix = format!("{}/", key);
            fake.data
                .retain(|k, _| !(key.is_empty() || *k == key || k.starts_with(&prefix)));
        } else {
            fake.data.insert(key, value);
        }
        return StatusCode::NO_CONTENT.into_response();
    }

    error(StatusCode::NOT_FOUND, "NOT_FOUND")
}

/// Start the fake server on an ephemeral port. Returns its base URL and shared state.
#[allow(dead_code)]
pub async fn spawn_fake_firebase() -> (String, SharedFake) {
    let state: SharedFake = Arc::new(Mutex::new(FakeFirebase::default()));
    let app = Router::new().fallback(handle).with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake Firebase server");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/", addr), state)
}
