// libs/appointment-cell/tests/common/mod.rs
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use shared_utils::test_utils::MockRows;

/// In-memory `appointments` table behind PostgREST, including the partial unique
/// index on `(doctor_id, slot_start)` for rows whose status is not `Cancelled`.
#[derive(Clone, Default)]
pub struct FakeAppointments {
    rows: Arc<Mutex<Vec<Value>>>,
    pending_write: Arc<Mutex<Option<(String, Value)>>>,
}

impl FakeAppointments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, row: Value) {
        self.rows.lock().unwrap().push(row);
    }

    pub fn rows(&self) -> Vec<Value> {
        self.rows.lock().unwrap().clone()
    }

    /// Merge `changes` into row `id` right before the next PATCH is evaluated,
    /// as if another request had written between the service's read and its write.
    pub fn write_before_next_patch(&self, id: &str, changes: Value) {
        *self.pending_write.lock().unwrap() = Some((id.to_string(), changes));
    }

    pub fn live_rows_for(&self, doctor_id: &str, slot_start: DateTime<Utc>) -> usize {
        self.rows()
            .iter()
            .filter(|r| r["doctor_id"] == doctor_id && slot_of(r) == Some(slot_start) && r["status"] != "Cancelled")
            .count()
    }

    pub async fn mount(&self, server: &MockServer) {
        Mock::given(path("/rest/v1/appointments"))
            .respond_with(self.clone())
            .mount(server)
            .await;
    }

    fn insert(&self, body: Value) -> ResponseTemplate {
        let mut rows = self.rows.lock().unwrap();

        let doctor_id = body["doctor_id"].clone();
        let slot_start = slot_of(&body);
        let taken = rows.iter().any(|r| {
            r["doctor_id"] == doctor_id && slot_of(r) == slot_start && r["status"] != "Cancelled"
        });
        if taken {
            return ResponseTemplate::new(409).set_body_json(MockRows::error(
                "23505",
                "duplicate key value violates unique constraint \"appointments_live_slot_key\"",
            ));
        }

        let mut row = body;
        row["id"] = json!(Uuid::new_v4());
        rows.push(row.clone());
        ResponseTemplate::new(201).set_body_json(json!([row]))
    }

    fn patch(&self, filters: &[(String, String)], changes: Value) -> ResponseTemplate {
        let mut rows = self.rows.lock().unwrap();

        if let Some((id, interleaved)) = self.pending_write.lock().unwrap().take() {
            for row in rows.iter_mut().filter(|r| r["id"] == id.as_str()) {
                merge(row, &interleaved);
            }
        }

        let mut updated = Vec::new();

        for row in rows.iter_mut().filter(|r| matches_filters(r, filters)) {
            merge(row, &changes);
            updated.push(row.clone());
        }

        ResponseTemplate::new(200).set_body_json(Value::Array(updated))
    }

    fn select(&self, filters: &[(String, String)]) -> ResponseTemplate {
        let rows: Vec<Value> = self.rows()
            .into_iter()
            .filter(|r| matches_filters(r, filters))
            .collect();
        ResponseTemplate::new(200).set_body_json(Value::Array(rows))
    }
}

impl Respond for FakeAppointments {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let filters: Vec<(String, String)> = request.url.query_pairs().into_owned().collect();

        match request.method.as_str() {
            "POST" => match serde_json::from_slice(&request.body) {
                Ok(body) => self.insert(body),
                Err(_) => ResponseTemplate::new(400),
            },
            "PATCH" => match serde_json::from_slice(&request.body) {
                Ok(changes) => self.patch(&filters, changes),
                Err(_) => ResponseTemplate::new(400),
            },
            _ => self.select(&filters),
        }
    }
}

fn merge(row: &mut Value, changes: &Value) {
    if let (Some(target), Some(changes)) = (row.as_object_mut(), changes.as_object()) {
        for (k, v) in changes {
            target.insert(k.clone(), v.clone());
        }
    }
}

fn slot_of(row: &Value) -> Option<DateTime<Utc>> {
    row["slot_start"].as_str()?.parse().ok()
}

// Supports the `eq.` / `neq.` filters the service sends; other params are ignored.
fn matches_filters(row: &Value, filters: &[(String, String)]) -> bool {
    filters.iter().all(|(column, expr)| {
        if let Some(expected) = expr.strip_prefix("eq.") {
            row[column.as_str()].as_str() == Some(expected)
        } else if let Some(excluded) = expr.strip_prefix("neq.") {
            row[column.as_str()].as_str() != Some(excluded)
        } else {
            true
        }
    })
}

pub async fn mount_doctor(server: &MockServer, doctor: Value) {
    Mock::given(method("GET"))
        .and(path_regex("^/rest/v1/doctors$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([doctor])))
        .mount(server)
        .await;
}
