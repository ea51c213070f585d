//! In-process stand-ins for the portal backend and the AI service

#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, Sse},
    },
    routing::get,
};
use chrono::NaiveDateTime;
use pdm_dashboard::model::{DcpConfig, DcpConfigForm, Machine, MachineForm, MachinePatch, SensorReading};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};

/// Bind `router` on an ephemeral local port and return its base URL.
pub async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
}

#[derive(Default)]
pub struct PortalData {
    pub machines: Vec<Machine>,
    pub configs: Vec<DcpConfig>,
    pub readings: Vec<SensorReading>,
    /// SSE payloads sent on every connection before the stream closes
    pub alerts: Vec<Value>,
    pub next_id: i64,
    /// Request counts per route, for cache assertions
    pub hits: HashMap<String, usize>,
    pub sse_connections: usize,
}

#[derive(Clone, Default)]
pub struct MockPortal {
    pub data: Arc<Mutex<PortalData>>,
}

impl MockPortal {
    pub fn seeded() -> Self {
        let portal = Self::default();
        {
            let mut data = portal.data.lock().unwrap();
            data.machines = vec![
                Machine {
                    id: 1,
                    name: "Lathe A".to_string(),
                    machine_type: "LOW".to_string(),
                },
                Machine {
                    id: 2,
                    name: "Press B".to_string(),
                    machine_type: "HIGH".to_string(),
                },
            ];
            data.configs = vec![
                DcpConfig {
                    id: 10,
                    machine_id: 1,
                    collect_interval: 30,
                    api_endpoint: "http://collector.local/lathe".to_string(),
                },
                DcpConfig {
                    id: 11,
                    machine_id: 9,
                    collect_interval: 60,
                    api_endpoint: "http://collector.local/orphan".to_string(),
                },
            ];
            data.readings = (0..30)
                .map(|i| SensorReading {
                    id: i + 1,
                    machine_id: 1,
                    air_temperature: 298.0 + i as f64 * 0.1,
                    process_temperature: 308.0,
                    rotational_speed: 1500.0,
                    torque: 40.0,
                    tool_wear: i as f64,
                    created_at: at("2024-05-01T00:00:00") + chrono::Duration::minutes(i),
                })
                .collect();
            data.next_id = 100;
        }
        portal
    }

    pub fn hits(&self, route: &str) -> usize {
        self.data.lock().unwrap().hits.get(route).copied().unwrap_or(0)
    }

    pub fn sse_connections(&self) -> usize {
        self.data.lock().unwrap().sse_connections
    }

    fn hit(&self, route: &str) {
        *self
            .data
            .lock()
            .unwrap()
            .hits
            .entry(route.to_string())
            .or_default() += 1;
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/machine", get(list_machines).post(create_machine))
            .route(
                "/api/machine/{id}",
                get(get_machine).put(update_machine).delete(delete_machine),
            )
            .route("/api/dcp-config", get(list_configs).post(create_config))
            .route(
                "/api/dcp-config/{id}",
                get(get_config).put(update_config).delete(delete_config),
            )
            .route("/api/machine-sensor-data/{id}", get(sensor_data))
            .route("/api/sse/subscribe", get(subscribe))
            .with_state(self.clone())
    }
}

async fn list_machines(State(portal): State<MockPortal>) -> Json<Vec<Machine>> {
    portal.hit("machines");
    Json(portal.data.lock().unwrap().machines.clone())
}

async fn get_machine(State(portal): State<MockPortal>, Path(id): Path<i64>) -> impl IntoResponse {
    portal.hit("machine");
    let data = portal.data.lock().unwrap();
    match data.machines.iter().find(|m| m.id == id) {
        Some(m) => Json(m.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "machine not found").into_response(),
    }
}

async fn create_machine(State(portal): State<MockPortal>, Json(form): Json<MachineForm>) -> StatusCode {
    let mut data = portal.data.lock().unwrap();
    data.next_id += 1;
    let id = data.next_id;
    data.machines.push(Machine {
        id,
        name: form.name,
        machine_type: form.machine_type,
    });
    StatusCode::CREATED
}

async fn update_machine(
    State(portal): State<MockPortal>,
    Path(id): Path<i64>,
    Json(patch): Json<MachinePatch>,
) -> StatusCode {
    let mut data = portal.data.lock().unwrap();
    let Some(machine) = data.machines.iter_mut().find(|m| m.id == id) else {
        return StatusCode::NOT_FOUND;
    };
    if let Some(name) = patch.name {
        machine.name = name;
    }
    if let Some(machine_type) = patch.machine_type {
        machine.machine_type = machine_type;
    }
    StatusCode::OK
}

async fn delete_machine(State(portal): State<MockPortal>, Path(id): Path<i64>) -> StatusCode {
    let mut data = portal.data.lock().unwrap();
    let before = data.machines.len();
    data.machines.retain(|m| m.id != id);
    if data.machines.len() < before {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn list_configs(State(portal): State<MockPortal>) -> Json<Vec<DcpConfig>> {
    portal.hit("configs");
    Json(portal.data.lock().unwrap().configs.clone())
}

async fn get_config(State(portal): State<MockPortal>, Path(id): Path<i64>) -> impl IntoResponse {
    let data = portal.data.lock().unwrap();
    match data.configs.iter().find(|c| c.id == id) {
        Some(c) => Json(c.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn create_config(State(portal): State<MockPortal>, Json(form): Json<DcpConfigForm>) -> StatusCode {
    let mut data = portal.data.lock().unwrap();
    data.next_id += 1;
    let id = data.next_id;
    data.configs.push(DcpConfig {
        id,
        machine_id: form.machine_id,
        collect_interval: form.collect_interval,
        api_endpoint: form.api_endpoint,
    });
    StatusCode::CREATED
}

async fn update_config(
    State(portal): State<MockPortal>,
    Path(id): Path<i64>,
    Json(form): Json<DcpConfigForm>,
) -> StatusCode {
    let mut data = portal.data.lock().unwrap();
    let Some(config) = data.configs.iter_mut().find(|c| c.id == id) else {
        return StatusCode::NOT_FOUND;
    };
    config.machine_id = form.machine_id;
    config.collect_interval = form.collect_interval;
    config.api_endpoint = form.api_endpoint;
    StatusCode::OK
}

async fn delete_config(State(portal): State<MockPortal>, Path(id): Path<i64>) -> StatusCode {
    let mut data = portal.data.lock().unwrap();
    data.configs.retain(|c| c.id != id);
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeParams {
    start_date_time: String,
    end_date_time: String,
}

async fn sensor_data(
    State(portal): State<MockPortal>,
    Path(id): Path<i64>,
    Query(range): Query<RangeParams>,
) -> Json<Vec<SensorReading>> {
    portal.hit("sensor-data");
    let (start, end) = (at(&range.start_date_time), at(&range.end_date_time));
    let data = portal.data.lock().unwrap();
    Json(
        data.readings
            .iter()
            .filter(|r| r.machine_id == id && r.created_at >= start && r.created_at <= end)
            .cloned()
            .collect(),
    )
}

/// Sends a `connect` event and the configured alerts, then closes.
async fn subscribe(
    State(portal): State<MockPortal>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let alerts = {
        let mut data = portal.data.lock().unwrap();
        data.sse_connections += 1;
        data.alerts.clone()
    };

    let mut events = vec![Ok(Event::default().event("connect").data("connected"))];
    events.extend(
        alerts
            .into_iter()
            .map(|alert| Ok(Event::default().event("anomaly-alert").data(alert.to_string()))),
    );
    Sse::new(futures::stream::iter(events))
}

/// AI service stand-in; answers in snake_case like the real service
#[derive(Clone, Default)]
pub struct MockAi {
    pub histories: Arc<Mutex<Vec<Value>>>,
    pub hits: Arc<Mutex<HashMap<String, usize>>>,
}

pub fn history(id: i64, machine_id: i64, detected_at: &str, probability: f64, severity: &str) -> Value {
    json!({
        "id": id,
        "machine_id": machine_id,
        "detected_at": detected_at,
        "anomaly_probability": probability,
        "sensor_data": {
            "airTemperature": 301.5,
            "processTemperature": 311.2,
            "rotationalSpeed": 1380.0,
            "torque": 61.3,
            "toolWear": 210.0
        },
        "severity": severity,
        "created_at": detected_at
    })
}

impl MockAi {
    pub fn seeded() -> Self {
        let ai = Self::default();
        *ai.histories.lock().unwrap() = vec![
            history(1, 1, "2024-05-01T08:00:00", 0.55, "WARNING"),
            history(2, 2, "2024-05-03T09:30:00", 0.91, "CRITICAL"),
            history(3, 1, "2024-05-05T10:15:00", 0.72, "ALERT"),
            history(4, 2, "2024-05-07T11:45:00", 0.30, "WARNING"),
        ];
        ai
    }

    pub fn hits(&self, route: &str) -> usize {
        self.hits.lock().unwrap().get(route).copied().unwrap_or(0)
    }

    fn hit(&self, route: &str) {
        *self.hits.lock().unwrap().entry(route.to_string()).or_default() += 1;
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/anomaly-histories", get(ai_all))
            .route("/anomaly-histories/search", get(ai_search))
            .route("/anomaly-histories/machine/{id}", get(ai_machine))
            .with_state(self.clone())
    }
}

async fn ai_all(State(ai): State<MockAi>) -> Json<Vec<Value>> {
    ai.hit("all");
    Json(ai.histories.lock().unwrap().clone())
}

#[derive(Deserialize)]
struct SearchParams {
    start_date: String,
    end_date: String,
}

fn detected_at(history: &Value) -> NaiveDateTime {
    at(history["detected_at"].as_str().unwrap())
}

async fn ai_search(State(ai): State<MockAi>, Query(params): Query<SearchParams>) -> Json<Vec<Value>> {
    ai.hit("search");
    let (start, end) = (at(&params.start_date), at(&params.end_date));
    Json(
        ai.histories
            .lock()
            .unwrap()
            .iter()
            .filter(|h| {
                let t = detected_at(h);
                t >= start && t <= end
            })
            .cloned()
            .collect(),
    )
}

async fn ai_machine(State(ai): State<MockAi>, Path(id): Path<i64>) -> Json<Vec<Value>> {
    ai.hit("machine");
    Json(
        ai.histories
            .lock()
            .unwrap()
            .iter()
            .filter(|h| h["machine_id"] == id)
            .cloned()
            .collect(),
    )
}
