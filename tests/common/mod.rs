#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use chrono::NaiveDate;
use opslog::access::BusinessUnitState;
use opslog::config::ServerConfig;
use opslog::records;
use opslog::server::{AppState, create_router};
use opslog::store::{SqliteStore, Store};
use opslog::types::{CurrentUser, GoodsIn, IncidentReport, Record, RecordFields};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct-horse-battery";

/// App wired to a store and blob directory inside a temp dir.
pub struct TestApp {
    pub temp_dir: TempDir,
    pub store: Arc<SqliteStore>,
    pub state: Arc<AppState>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            public_base_url: Some("http://opslog.test".to_string()),
            ..ServerConfig::default()
        };

        let store = Arc::new(SqliteStore::new(config.db_path()).expect("open store"));
        store.initialize().expect("initialize store");

        let state = Arc::new(AppState::new(store.clone(), &config));
        let router = create_router(state.clone());

        Self {
            temp_dir,
            store,
            state,
            router,
        }
    }

    /// Registers a user and signs them in. Returns the bearer token.
    pub fn sign_up(&self, email: &str, business_unit: Option<&str>) -> String {
        self.state
            .identity
            .register_user(email, PASSWORD, business_unit)
            .expect("register user");
        self.state
            .identity
            .sign_in(email, PASSWORD)
            .expect("sign in")
            .token
    }

    pub fn current_user(&self, token: &str) -> CurrentUser {
        let session = self.state.identity.restore(token).expect("restore session");
        CurrentUser::from(&session)
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.json(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.json(Method::POST, uri, Some(token), Some(body)).await
    }
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, d).expect("valid day")
}

pub fn goods_in(supplier: &str, date: NaiveDate) -> RecordFields {
    RecordFields::GoodsIn(GoodsIn {
        date,
        time: None,
        supplier: supplier.to_string(),
        description: "Pallets of cement".to_string(),
        quantity: Some(12.0),
        unit: Some("pallet".to_string()),
        vehicle_number: Some("KA-1234".to_string()),
        driver_name: None,
        received_by: "Gate 2".to_string(),
        remarks: None,
    })
}

pub fn goods_in_json(supplier: &str, date: &str) -> Value {
    json!({
        "date": date,
        "supplier": supplier,
        "description": "Pallets of cement",
        "quantity": 12,
        "received_by": "Gate 2",
    })
}

pub fn incident(location: &str) -> RecordFields {
    RecordFields::IncidentReport(IncidentReport {
        incident_date: day(10),
        incident_time: Some("23:40".to_string()),
        location: location.to_string(),
        category: "Trespass".to_string(),
        severity: Some("low".to_string()),
        description: "Fence cut near berth 4".to_string(),
        persons_involved: None,
        action_taken: Some("Patrol dispatched".to_string()),
        reported_by: "Night shift".to_string(),
    })
}

pub fn user(id: &str) -> CurrentUser {
    CurrentUser {
        id: id.to_string(),
        email: format!("{id}@example.com"),
    }
}

/// Saves `count` goods-in rows on consecutive January days for `unit`.
pub fn seed_goods_in(store: &dyn Store, unit: &str, count: u32) -> Vec<Record> {
    let state = BusinessUnitState::resolved(Some(unit.to_string()));
    (0..count)
        .map(|i| {
            records::save(
                store,
                Some(&user(unit)),
                &state,
                goods_in(&format!("{unit} supplier {i}"), day(i % 28 + 1)),
                None,
            )
            .expect("save goods in")
        })
        .collect()
}
